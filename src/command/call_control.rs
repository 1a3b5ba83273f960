//! ### Call control
//!
//! Voice dial, current call list and hang up commands.

use embassy_time::Duration;
use heapless::String;

use super::{markers, Command, ResponseLines};
use crate::error::Error;

/// Longest dial string: keyword, `+`, up to 15 E.164 digits and `;`, with
/// headroom for unnormalized input
pub const DIAL_LEN: usize = 40;

pub type DialString = String<DIAL_LEN>;

/// Reply markers of the dial command `D`
pub const DIAL_MARKERS: &[&str] = &[
    markers::OK,
    markers::ERROR,
    markers::BUSY,
    markers::NO_CARRIER,
    markers::CME_ERROR,
];

pub const DIAL_TIMEOUT: Duration = Duration::from_secs(10);

/// List current calls +CLCC
///
/// Returns one `+CLCC: <id>,<dir>,<stat>,<mode>,<mpty>[,...]` line per call
/// known to the modem, followed by `OK`.
pub const LIST_CURRENT_CALLS: Command<'static> =
    Command::new("AT+CLCC", Duration::from_secs(2), markers::FINAL);

/// Hook control H, hangs up every call
pub const HANG_UP: &str = "ATH";

/// Hang up call +CHUP, releases the active call
pub const RELEASE_CALL: &str = "AT+CHUP";

/// ZTE specific voice mode switch, needed ahead of every voice call
pub const ZTE_VOICE_MODE: &str = "AT%icscall=1,0";

/// Call line prefix of the first, mobile originated call
const OUTGOING_CALL: &str = "+CLCC: 1,0";

/// Dial keyword, selects pulse or tone dialing
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DialKeyword {
    #[serde(rename = "ATD")]
    Atd,
    #[serde(rename = "ATDT")]
    Atdt,
}

impl DialKeyword {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Atd => "ATD",
            Self::Atdt => "ATDT",
        }
    }
}

/// Digits of `number`, without any `+`
pub fn normalize_number(number: &str) -> impl Iterator<Item = char> + '_ {
    number.chars().filter(|c| *c != '+')
}

/// Dial command D, voice call
///
/// The trailing `;` selects a voice call and is mandatory.
pub fn dial_string(keyword: DialKeyword, number: &str) -> Result<DialString, Error> {
    let mut s = DialString::new();
    s.push_str(keyword.as_str()).map_err(|_| Error::Overflow)?;
    s.push('+').map_err(|_| Error::Overflow)?;
    for c in normalize_number(number) {
        s.push(c).map_err(|_| Error::Overflow)?;
    }
    s.push(';').map_err(|_| Error::Overflow)?;
    Ok(s)
}

/// `+<digits>`, quoted as needed by the caller
pub fn international(number: &str) -> Result<DialString, Error> {
    let mut s = DialString::new();
    s.push('+').map_err(|_| Error::Overflow)?;
    for c in normalize_number(number) {
        s.push(c).map_err(|_| Error::Overflow)?;
    }
    Ok(s)
}

/// Progress of the outgoing call, derived from one `+CLCC` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CallStatus {
    /// Listed, but neither ringing nor active (dialing, alerting setup, held)
    Provisioning,
    /// `<stat>` 3, the callee's phone is ringing
    Ringing,
    /// `<stat>` 0, the callee answered
    Active,
    /// The call is not listed anymore
    Absent,
}

impl CallStatus {
    pub fn from_reply(reply: &ResponseLines) -> Self {
        match reply.iter().find_map(|l| l.strip_prefix(OUTGOING_CALL)) {
            None => Self::Absent,
            Some(rest) => match rest.strip_prefix(',').and_then(|r| r.split(',').next()) {
                Some(stat) if stat.trim() == "3" => Self::Ringing,
                Some(stat) if stat.trim() == "0" => Self::Active,
                _ => Self::Provisioning,
            },
        }
    }
}
