//! Per hardware dialing and SMS strategies.
//!
//! Modems differ in what they need before a voice call can be placed, which
//! dial keyword they accept and how reliably they hang up. Each supported
//! modem is described by a [`DialerVariant`] record, looked up from the
//! hardware identifier given in the configuration.
//!
//! Note: if you add a new hardware type here, you also need to add it to
//! [`Hardware::from_id`] and [`Hardware::variant`].

pub(crate) mod generic;
pub(crate) mod gtm382;
pub(crate) mod sms;
pub(crate) mod zte;

use core::fmt;

use embassy_time::Duration;
use serde::de::{self, Deserialize, Deserializer, Visitor};

use crate::command::{
    call_control::DialKeyword, markers, Command, Terminator, TimeoutPolicy, ESCAPE,
};
use crate::module_timing::{ESCAPE_SETTLE, HANGUP_TIMEOUT};

pub use sms::{SmsHardware, SmsVariant};

/// One command of a pre-dial or hangup hook, followed by a settle delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookStep {
    pub command: Command<'static>,
    /// Pause after the command before the next one is issued
    pub settle: Duration,
}

impl HookStep {
    pub const fn new(command: Command<'static>, settle: Duration) -> Self {
        Self { command, settle }
    }

    /// ESC buffer reset, not answered by the modem
    pub const ESCAPE: Self = Self::new(Command::fire(ESCAPE, Terminator::None), ESCAPE_SETTLE);

    /// Hang up command awaiting the final result code. A silent modem is not
    /// an error here, the call has already ended from our point of view.
    pub const fn hang_up(text: &'static str, settle: Duration) -> Self {
        Self::new(
            Command::new(text, HANGUP_TIMEOUT, markers::FINAL).with_policy(TimeoutPolicy::Partial),
            settle,
        )
    }
}

/// Dialing strategy of one kind of hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialerVariant {
    /// Issued in order before the dial command
    pub pre_dial: &'static [HookStep],
    pub keyword: DialKeyword,
    /// Issued in order once the call has ended, whatever the outcome
    pub hangup: &'static [HookStep],
}

/// Supported dialing hardware
///
/// Deserializes from its [`Hardware::id`]. Unknown ids fall back to
/// [`Hardware::Atd`] with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Hardware {
    /// Any modem following 3GPP TS 27.007, dialing with `ATD`
    #[default]
    Atd,
    /// As [`Hardware::Atd`], tone dialing with `ATDT`
    Atdt,
    /// ZTE sticks (e.g. MF192), need a voice mode switch before each call
    Zte,
    /// Option GTM382, does not always release the call on `ATH` alone
    Gtm382,
}

impl Hardware {
    pub fn from_id(id: &str) -> Self {
        match id {
            "atd" => Self::Atd,
            "atdt" => Self::Atdt,
            "zte" => Self::Zte,
            "gtm382" => Self::Gtm382,
            id => {
                warn!(
                    "Attempting to dial with {} using generic ATD parameters! This may or may not work.",
                    id
                );
                Self::Atd
            }
        }
    }

    pub const fn id(&self) -> &'static str {
        match self {
            Self::Atd => "atd",
            Self::Atdt => "atdt",
            Self::Zte => "zte",
            Self::Gtm382 => "gtm382",
        }
    }

    pub const fn variant(&self) -> DialerVariant {
        match self {
            Self::Atd => generic::ATD,
            Self::Atdt => generic::ATDT,
            Self::Zte => zte::ZTE,
            Self::Gtm382 => gtm382::GTM382,
        }
    }
}

impl<'de> Deserialize<'de> for Hardware {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl<'de> Visitor<'de> for IdVisitor {
            type Value = Hardware;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a hardware id")
            }

            fn visit_str<E: de::Error>(self, id: &str) -> Result<Hardware, E> {
                Ok(Hardware::from_id(id))
            }
        }

        deserializer.deserialize_str(IdVisitor)
    }
}
