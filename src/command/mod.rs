//! AT command framing and reply collection types
//!
//! Commands are plain text, framed with a [`Terminator`] and answered by one
//! or more newline delimited lines. A reply is complete once a line matches
//! one of the command's end markers.

pub mod call_control;
pub mod sms;

use embassy_time::Duration;
use heapless::{String, Vec};

use crate::error::{Reply, REPLY_LEN};

/// Maximum number of bytes kept of a single reply line
pub const LINE_LEN: usize = 128;

/// Maximum number of lines kept of a single reply
pub const MAX_LINES: usize = 16;

pub type Line = String<LINE_LEN>;

/// Final result codes and markers, verbatim as emitted by the modem
pub mod markers {
    pub const OK: &str = "OK";
    pub const ERROR: &str = "ERROR";
    pub const CME_ERROR: &str = "+CME ERROR";
    pub const BUSY: &str = "BUSY";
    pub const NO_CARRIER: &str = "NO CARRIER";
    pub const PROMPT: &str = ">";
    pub const CMGS: &str = "+CMGS";

    /// Markers ending any plain command
    pub const FINAL: &[&str] = &[OK, ERROR, CME_ERROR];
}

/// Single ESC byte, drops whatever the modem has buffered (e.g. the SMS
/// text prompt)
pub const ESCAPE: &str = "\x1B";

/// Bytes appended to the command text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Terminator {
    /// `\r\n`
    CrLf,
    /// `\r` followed by Ctrl-Z (0x1A), submits an SMS body
    CtrlZ,
    /// Nothing appended
    None,
}

impl Terminator {
    pub const fn as_bytes(&self) -> &'static [u8] {
        match self {
            Self::CrLf => b"\r\n",
            Self::CtrlZ => b"\r\x1A",
            Self::None => b"",
        }
    }
}

/// What a command yields when its timeout elapses before an end marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimeoutPolicy {
    /// Fail with [`crate::error::Error::Timeout`]
    Fail,
    /// Succeed with whatever lines were collected so far
    Partial,
}

/// A single AT command transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    pub text: &'a str,
    pub terminator: Terminator,
    /// Total budget for the write and every line read
    pub timeout: Duration,
    /// An empty set means the reply is not awaited at all
    pub end_markers: &'a [&'a str],
    pub on_timeout: TimeoutPolicy,
}

impl<'a> Command<'a> {
    pub const fn new(text: &'a str, timeout: Duration, end_markers: &'a [&'a str]) -> Self {
        Self {
            text,
            terminator: Terminator::CrLf,
            timeout,
            end_markers,
            on_timeout: TimeoutPolicy::Fail,
        }
    }

    /// Write only, no reply is read
    pub const fn fire(text: &'a str, terminator: Terminator) -> Self {
        Self {
            text,
            terminator,
            timeout: Duration::from_secs(2),
            end_markers: &[],
            on_timeout: TimeoutPolicy::Partial,
        }
    }

    pub const fn with_terminator(mut self, terminator: Terminator) -> Self {
        self.terminator = terminator;
        self
    }

    pub const fn with_policy(mut self, on_timeout: TimeoutPolicy) -> Self {
        self.on_timeout = on_timeout;
        self
    }

    /// Whether `line` terminates the reply to this command
    pub fn is_end(&self, line: &str) -> bool {
        self.end_markers.iter().any(|m| line.starts_with(m))
    }
}

/// Decoded, trimmed and non-empty reply lines, in arrival order.
///
/// Holds at most [`MAX_LINES`] lines. On longer replies the lines between
/// the first `MAX_LINES - 1` and the terminating line are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseLines {
    lines: Vec<Line, MAX_LINES>,
}

impl ResponseLines {
    pub const fn new() -> Self {
        Self {
            lines: Vec::new(),
        }
    }

    /// Append `line`. Once full, the most recent line is replaced, so the
    /// earliest lines and the newest one are kept.
    pub fn push(&mut self, line: Line) {
        if self.lines.is_full() {
            if let Some(dropped) = self.lines.pop() {
                warn!("Reply too long, dropping line: {}", dropped.as_str());
            }
        }
        // Cannot fail, room was made above
        let _ = self.lines.push(line);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(|l| l.as_str())
    }

    pub fn last(&self) -> Option<&str> {
        self.lines.last().map(|l| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Any line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.iter().any(|l| l.contains(needle))
    }

    /// All lines joined with a single space, truncated to [`REPLY_LEN`]
    pub fn joined(&self) -> Reply {
        let mut out = Reply::new();
        for (i, line) in self.iter().enumerate() {
            if i > 0 && out.push(' ').is_err() {
                break;
            }
            if push_truncated(&mut out, line) {
                break;
            }
        }
        out
    }
}

impl<'a> FromIterator<&'a str> for ResponseLines {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut lines = Self::new();
        for l in iter {
            let mut line = Line::new();
            push_truncated(&mut line, l);
            lines.push(line);
        }
        lines
    }
}

/// Append as much of `s` as fits, on char boundaries. Returns `true` when `s`
/// was cut short.
fn push_truncated<const N: usize>(out: &mut String<N>, s: &str) -> bool {
    if out.push_str(s).is_ok() {
        return false;
    }
    for c in s.chars() {
        if out.push(c).is_err() {
            return true;
        }
    }
    false
}

/// Decode a raw line, silently dropping invalid UTF-8 sequences, and trim
/// surrounding whitespace. Returns an empty line for whitespace-only input.
pub fn decode_line(raw: &[u8]) -> Line {
    let mut decoded: String<LINE_LEN> = String::new();
    for chunk in raw.utf8_chunks() {
        if push_truncated(&mut decoded, chunk.valid()) {
            break;
        }
    }

    let mut line = Line::new();
    // Trimmed text is never longer than the source
    let _ = line.push_str(decoded.trim());
    line
}

const _: () = assert!(REPLY_LEN >= LINE_LEN);
