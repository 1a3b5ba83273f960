//! ### Short Messages Service
//!
//! Text mode submission: `AT+CMGF=1`, `AT+CMGS="+<number>"`, then the body
//! terminated with Ctrl-Z.

use heapless::String;

use super::{call_control, markers};
use crate::error::Error;

/// Message format +CMGF, text mode
pub const SET_TEXT_MODE: &str = "AT+CMGF=1";

/// Reply markers of the address step, `>` is the text entry prompt
pub const ADDRESS_MARKERS: &[&str] = &[markers::PROMPT, markers::ERROR, markers::CME_ERROR];

/// Reply markers of the body step
pub const BODY_MARKERS: &[&str] = &["+CMGS:", markers::OK, markers::ERROR, markers::CME_ERROR];

pub const SEND_LEN: usize = 56;

/// Send message +CMGS, text mode
pub fn send_message(number: &str) -> Result<String<SEND_LEN>, Error> {
    let mut s = String::new();
    s.push_str("AT+CMGS=\"").map_err(|_| Error::Overflow)?;
    s.push_str(&call_control::international(number)?)
        .map_err(|_| Error::Overflow)?;
    s.push('"').map_err(|_| Error::Overflow)?;
    Ok(s)
}
