use embassy_time::Duration;

use super::{DialerVariant, HookStep};
use crate::command::call_control::{DialKeyword, HANG_UP};

const PRE_DIAL: &[HookStep] = &[HookStep::ESCAPE];

const HANGUP: &[HookStep] = &[HookStep::hang_up(HANG_UP, Duration::from_ticks(0))];

pub(crate) const ATD: DialerVariant = DialerVariant {
    pre_dial: PRE_DIAL,
    keyword: DialKeyword::Atd,
    hangup: HANGUP,
};

pub(crate) const ATDT: DialerVariant = DialerVariant {
    keyword: DialKeyword::Atdt,
    ..ATD
};
