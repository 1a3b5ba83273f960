use embassy_time::Duration;

use super::{generic, DialerVariant, HookStep};
use crate::command::call_control::{HANG_UP, RELEASE_CALL};
use crate::module_timing::RELEASE_SETTLE;

// `AT+CHUP` releases the call, `ATH` catches whatever the first one left up
const HANGUP: &[HookStep] = &[
    HookStep::hang_up(RELEASE_CALL, RELEASE_SETTLE),
    HookStep::hang_up(HANG_UP, Duration::from_ticks(0)),
];

pub(crate) const GTM382: DialerVariant = DialerVariant {
    hangup: HANGUP,
    ..generic::ATD
};
