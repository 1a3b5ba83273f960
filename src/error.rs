use core::fmt;

use embedded_io_async::ErrorKind;
use heapless::String;

use crate::command::ResponseLines;

/// Maximum length of the modem reply carried by [`Error::Modem`]
pub const REPLY_LEN: usize = 128;

/// Space separated modem reply text, truncated to [`REPLY_LEN`] bytes
pub type Reply = String<REPLY_LEN>;

/// The step of a dial or send operation an error originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// Buffer reset or vendor command ahead of dialing
    PreDial,
    /// The `ATD` command itself
    Dial,
    /// `AT+CLCC` call status polling
    Poll,
    /// Hangup hook after the call ended
    Hangup,
    /// Buffer reset ahead of or after an SMS submission
    Reset,
    /// `AT+CMGF` text mode selection
    TextMode,
    /// `AT+CMGS` address submission
    Address,
    /// Message body submission
    Body,
}

impl Phase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::PreDial => "pre-dial",
            Self::Dial => "dial",
            Self::Poll => "poll",
            Self::Hangup => "hangup",
            Self::Reset => "reset",
            Self::TextMode => "text-mode",
            Self::Address => "address",
            Self::Body => "body",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// The callee is busy
    Busy,
    /// The modem answered with an error, or without the expected marker
    Modem(Phase, Reply),
    /// No end marker arrived within the command timeout, with the lines
    /// received until then
    Timeout(Phase, Reply),
    /// The channel failed or reached end of stream
    Connection(Phase, ErrorKind),
    /// Another operation of the same kind already owns the channel
    InUse,
    /// The command does not fit the transmit buffer
    Overflow,
}

impl Error {
    pub(crate) fn modem(phase: Phase, lines: &ResponseLines) -> Self {
        Self::Modem(phase, lines.joined())
    }

    /// The phase the error was raised in, when it is tied to one
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Modem(phase, _) | Self::Timeout(phase, _) | Self::Connection(phase, _) => {
                Some(*phase)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Busy => f.write_str("Busy"),
            Self::Modem(phase, reply) => {
                write!(f, "Modem replied with an error during {}: {}", phase, reply)
            }
            Self::Timeout(phase, reply) if reply.is_empty() => {
                write!(f, "Timeout during {}, no reply", phase)
            }
            Self::Timeout(phase, reply) => write!(f, "Timeout during {}: {}", phase, reply),
            Self::Connection(phase, kind) => {
                write!(f, "Connection error during {}: {:?}", phase, kind)
            }
            Self::InUse => f.write_str("Modem is already in use"),
            Self::Overflow => f.write_str("Command too long"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter<'_>) {
        match self {
            Self::Busy => defmt::write!(f, "Busy"),
            Self::Modem(phase, reply) => defmt::write!(f, "Modem({}, {})", phase, reply.as_str()),
            Self::Timeout(phase, reply) => {
                defmt::write!(f, "Timeout({}, {})", phase, reply.as_str())
            }
            Self::Connection(phase, kind) => defmt::write!(f, "Connection({}, {})", phase, kind),
            Self::InUse => defmt::write!(f, "InUse"),
            Self::Overflow => defmt::write!(f, "Overflow"),
        }
    }
}
