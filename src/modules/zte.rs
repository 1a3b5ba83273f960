use super::{generic, DialerVariant, HookStep};
use crate::command::{call_control::ZTE_VOICE_MODE, Command, Terminator};
use crate::module_timing::ZTE_VOICE_MODE_SETTLE;

// The voice mode switch is fire and forget, some firmwares never answer it
const PRE_DIAL: &[HookStep] = &[
    HookStep::new(
        Command::fire(ZTE_VOICE_MODE, Terminator::CrLf),
        ZTE_VOICE_MODE_SETTLE,
    ),
    HookStep::ESCAPE,
];

pub(crate) const ZTE: DialerVariant = DialerVariant {
    pre_dial: PRE_DIAL,
    ..generic::ATD
};
