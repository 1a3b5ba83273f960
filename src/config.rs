use embassy_time::Duration;
use serde::Deserialize;

use crate::command::call_control::DialKeyword;
use crate::module_timing::{DEFAULT_CALL_DURATION_SEC, DEFAULT_DIAL_TIMEOUT_SEC, POLL_INTERVAL};
use crate::modules::{DialerVariant, Hardware, SmsHardware, SmsVariant};

/// Voice call settings, fixed for the lifetime of one dial attempt.
///
/// Deserializes from the host's configuration keys:
///
/// ```yaml
/// hardware: zte
/// dial_timeout_sec: 20
/// call_duration_sec: 30
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DialerConfig {
    /// How long to wait for the callee's phone to start ringing
    #[serde(default = "default_dial_timeout")]
    pub dial_timeout_sec: u32,
    /// How long to let it ring once it does
    #[serde(default = "default_call_duration")]
    pub call_duration_sec: u32,
    #[serde(default)]
    pub hardware: Hardware,
    /// Superseded by `hardware`, kept so `at_command: ATDT` still selects
    /// tone dialing
    #[serde(default)]
    pub at_command: Option<DialKeyword>,
    #[serde(default)]
    pub poll_interval_ms: Option<u32>,
}

fn default_dial_timeout() -> u32 {
    DEFAULT_DIAL_TIMEOUT_SEC
}

fn default_call_duration() -> u32 {
    DEFAULT_CALL_DURATION_SEC
}

impl Default for DialerConfig {
    fn default() -> Self {
        Self::new(Hardware::Atd)
    }
}

impl DialerConfig {
    pub const fn new(hardware: Hardware) -> Self {
        Self {
            dial_timeout_sec: DEFAULT_DIAL_TIMEOUT_SEC,
            call_duration_sec: DEFAULT_CALL_DURATION_SEC,
            hardware,
            at_command: None,
            poll_interval_ms: None,
        }
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_sec.into())
    }

    pub fn call_duration(&self) -> Duration {
        Duration::from_secs(self.call_duration_sec.into())
    }

    /// Never below [`POLL_INTERVAL`]
    pub fn poll_interval(&self) -> Duration {
        match self.poll_interval_ms.map(|ms| Duration::from_millis(ms.into())) {
            Some(interval) if interval < POLL_INTERVAL => {
                warn!(
                    "Poll interval of {} ms is too short, using {} ms",
                    interval.as_millis(),
                    POLL_INTERVAL.as_millis()
                );
                POLL_INTERVAL
            }
            Some(interval) => interval,
            None => POLL_INTERVAL,
        }
    }

    /// The effective hardware, taking the legacy `at_command` into account
    pub fn effective_hardware(&self) -> Hardware {
        match (self.hardware, self.at_command) {
            (Hardware::Atd, Some(DialKeyword::Atdt)) => Hardware::Atdt,
            (hardware, _) => hardware,
        }
    }

    pub fn variant(&self) -> DialerVariant {
        self.effective_hardware().variant()
    }
}

/// Text message settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SmsConfig {
    #[serde(default)]
    pub hardware: SmsHardware,
}

impl SmsConfig {
    pub fn variant(&self) -> SmsVariant {
        self.hardware.variant()
    }
}
