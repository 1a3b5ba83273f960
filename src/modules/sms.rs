use embassy_time::Duration;

use crate::module_timing::ESCAPE_SETTLE;

/// SMS submission strategy of one kind of hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmsVariant {
    /// Send ESC and wait this long before selecting text mode
    pub reset_before: Option<Duration>,
    /// Tolerate a failed text mode selection and a missing `>` prompt
    pub lenient: bool,
    /// Treat a bare `OK` to the body as a successful submission
    pub accept_ok: bool,
    pub text_mode_timeout: Duration,
    /// Pause after text mode selection
    pub text_mode_settle: Duration,
    pub address_timeout: Duration,
    /// Pause after the address step, lets the modem open its text buffer
    pub prompt_settle: Duration,
    pub body_timeout: Duration,
}

impl SmsVariant {
    /// Modems that answer `AT+CMGS` with a newline terminated `>` prompt
    pub const STANDARD: Self = Self {
        reset_before: None,
        lenient: false,
        accept_ok: false,
        text_mode_timeout: Duration::from_secs(5),
        text_mode_settle: Duration::from_ticks(0),
        address_timeout: Duration::from_secs(10),
        prompt_settle: Duration::from_ticks(0),
        body_timeout: Duration::from_secs(30),
    };

    /// Modems (e.g. Huawei sticks) that print the `>` prompt without a
    /// trailing newline, so it can never be read as a line
    pub const LENIENT: Self = Self {
        reset_before: Some(ESCAPE_SETTLE),
        lenient: true,
        accept_ok: true,
        text_mode_timeout: Duration::from_secs(5),
        text_mode_settle: Duration::from_secs(1),
        address_timeout: Duration::from_secs(3),
        prompt_settle: Duration::from_secs(2),
        body_timeout: Duration::from_secs(25),
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "lowercase")]
pub enum SmsHardware {
    #[default]
    Standard,
    Lenient,
}

impl SmsHardware {
    pub const fn variant(&self) -> SmsVariant {
        match self {
            Self::Standard => SmsVariant::STANDARD,
            Self::Lenient => SmsVariant::LENIENT,
        }
    }
}
