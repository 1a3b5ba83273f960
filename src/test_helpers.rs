//! Scripted modem for unit tests.
//!
//! Every write of a command pops the next scripted reply into the receive
//! queue. A lone ESC byte is not answered by real modems and does not pop
//! anything. Reads with nothing queued pend forever, so a reply that never
//! completes runs into the command timeout.

use core::convert::Infallible;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::string::String;
use std::sync::Once;
use std::vec::Vec;

use embassy_time::{Duration, Timer};
use embedded_io_async::{ErrorType, Read, Write};

use crate::asynch::Channel;

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace"))
            .is_test(true)
            .try_init();
    });
}

#[derive(Debug, Clone)]
enum Rx {
    Data(Vec<u8>),
    Delay(Duration),
}

#[derive(Debug, Default)]
struct Shared {
    writes: Vec<Vec<u8>>,
    closed: bool,
}

/// What the mock saw, readable after the channel moved into a session
#[derive(Debug, Clone, Default)]
pub struct MockLog(Rc<RefCell<Shared>>);

impl MockLog {
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.0.borrow().writes.clone()
    }

    /// Writes as text, lossy
    pub fn sent(&self) -> Vec<String> {
        self.0
            .borrow()
            .writes
            .iter()
            .map(|w| String::from_utf8_lossy(w).into_owned())
            .collect()
    }

    pub fn closed(&self) -> bool {
        self.0.borrow().closed
    }

    /// The channel has been dropped, closed or not
    pub fn released(&self) -> bool {
        Rc::strong_count(&self.0) == 1
    }
}

#[derive(Debug, Default)]
pub struct MockChannel {
    script: VecDeque<Vec<Rx>>,
    rx: VecDeque<Rx>,
    eof: bool,
    log: MockLog,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to the next write, one `\r\n` framed chunk per line
    pub fn reply(mut self, lines: &[&str]) -> Self {
        self.script
            .push_back(lines.iter().map(|l| Rx::Data(frame(l))).collect());
        self
    }

    /// Reply to the next write with raw chunks, delivered one per read
    pub fn chunks(mut self, chunks: &[&[u8]]) -> Self {
        self.script
            .push_back(chunks.iter().map(|c| Rx::Data(c.to_vec())).collect());
        self
    }

    /// Reply to the next write, pausing `every` before each line
    pub fn trickle(mut self, lines: &[&str], every: Duration) -> Self {
        self.script.push_back(
            lines
                .iter()
                .flat_map(|l| [Rx::Delay(every), Rx::Data(frame(l))])
                .collect(),
        );
        self
    }

    /// The next write is not answered at all
    pub fn silence(mut self) -> Self {
        self.script.push_back(Vec::new());
        self
    }

    /// Report end of stream once everything queued has been read
    pub fn eof(mut self) -> Self {
        self.eof = true;
        self
    }

    pub fn build(self) -> (Self, MockLog) {
        let log = self.log.clone();
        (self, log)
    }
}

fn frame(line: &str) -> Vec<u8> {
    let mut data = Vec::from(&b"\r\n"[..]);
    data.extend_from_slice(line.as_bytes());
    data.extend_from_slice(b"\r\n");
    data
}

impl ErrorType for MockChannel {
    type Error = Infallible;
}

impl Read for MockChannel {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        loop {
            match self.rx.front_mut() {
                Some(Rx::Delay(d)) => {
                    Timer::after(*d).await;
                    self.rx.pop_front();
                }
                Some(Rx::Data(data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    data.drain(..n);
                    if data.is_empty() {
                        self.rx.pop_front();
                    }
                    return Ok(n);
                }
                None if self.eof => return Ok(0),
                None => core::future::pending::<()>().await,
            }
        }
    }
}

impl Write for MockChannel {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.log.0.borrow_mut().writes.push(buf.to_vec());
        if buf != b"\x1B" {
            if let Some(reply) = self.script.pop_front() {
                self.rx.extend(reply);
            }
        }
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Channel for MockChannel {
    async fn close(&mut self) -> Result<(), Self::Error> {
        self.log.0.borrow_mut().closed = true;
        Ok(())
    }
}
