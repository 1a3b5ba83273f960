use embassy_time::{with_timeout, Duration, Instant, Timer};
use embedded_io_async::{Error as _, ErrorKind, Read, Write};
use heapless::Vec;

use crate::command::{decode_line, Command, Line, ResponseLines, TimeoutPolicy, ESCAPE};
use crate::error::{Error, Phase, Reply};

/// Room for the longest command text plus its terminator
pub const CMD_BUF_SIZE: usize = 512;

/// Received bytes not yet split into lines
pub const INGRESS_BUF_SIZE: usize = 256;

const READ_CHUNK: usize = 64;

/// Duplex byte stream to the modem, e.g. a serial port.
///
/// Opening and configuring the device is up to the implementor. Dropping the
/// channel must release the device as well, since a cancelled operation
/// drops its session without calling [`Channel::close`].
#[allow(async_fn_in_trait)]
pub trait Channel: Read + Write {
    /// Flush pending output and release the underlying device
    async fn close(&mut self) -> Result<(), Self::Error>;
}

/// Exclusive handle over a [`Channel`] for the duration of one dial or send.
///
/// Commands are executed strictly one after the other; the next command is
/// only written once the previous one returned.
pub struct ModemSession<C: Channel> {
    channel: C,
    cmd_buf: Vec<u8, CMD_BUF_SIZE>,
    ingress: Vec<u8, INGRESS_BUF_SIZE>,
}

impl<C: Channel> ModemSession<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            cmd_buf: Vec::new(),
            ingress: Vec::new(),
        }
    }

    /// Write `cmd` and collect its reply.
    ///
    /// The command timeout is one budget for the write and all line reads.
    /// Returns as soon as a line matching an end marker was collected; that
    /// line is the last one of the result. Commands without end markers
    /// return right after the write.
    pub async fn execute(
        &mut self,
        phase: Phase,
        cmd: &Command<'_>,
    ) -> Result<ResponseLines, Error> {
        let deadline = Instant::now() + cmd.timeout;

        debug!("[{}] Sending: {}", phase, printable(cmd.text));
        self.cmd_buf.clear();
        self.cmd_buf
            .extend_from_slice(cmd.text.as_bytes())
            .and_then(|_| self.cmd_buf.extend_from_slice(cmd.terminator.as_bytes()))
            .map_err(|_| Error::Overflow)?;

        match with_timeout(remaining(deadline), self.write_cmd_buf(phase)).await {
            Ok(res) => res?,
            Err(_) => {
                warn!("[{}] Timeout while writing {}", phase, printable(cmd.text));
                return Err(Error::Timeout(phase, Reply::new()));
            }
        }

        if cmd.end_markers.is_empty() {
            return Ok(ResponseLines::new());
        }

        let mut lines = ResponseLines::new();
        loop {
            let line = match with_timeout(remaining(deadline), self.read_line(phase)).await {
                Ok(line) => line?,
                Err(_) => break,
            };
            if line.is_empty() {
                continue;
            }

            trace!("[{}] Received: {}", phase, line.as_str());
            let end = cmd.is_end(&line);
            lines.push(line);
            if end {
                return Ok(lines);
            }
        }

        match cmd.on_timeout {
            TimeoutPolicy::Fail => {
                debug!(
                    "[{}] Timeout while reading response to {}",
                    phase,
                    printable(cmd.text)
                );
                Err(Error::Timeout(phase, lines.joined()))
            }
            TimeoutPolicy::Partial => {
                warn!(
                    "[{}] Timeout while reading response, returning {} line(s) collected so far",
                    phase,
                    lines.len()
                );
                Ok(lines)
            }
        }
    }

    /// Settle delay between two commands
    pub async fn settle(&self, duration: Duration) {
        if duration > Duration::from_ticks(0) {
            Timer::after(duration).await;
        }
    }

    /// Close the channel, releasing the device. Close errors are only logged,
    /// the device is dropped either way.
    pub async fn close(mut self) {
        debug!("Closing connection to the modem...");
        if let Err(e) = self.channel.close().await {
            warn!("Failed to close the modem channel: {:?}", e.kind());
        }
    }

    async fn write_cmd_buf(&mut self, phase: Phase) -> Result<(), Error> {
        self.channel
            .write_all(&self.cmd_buf)
            .await
            .map_err(|e| Error::Connection(phase, e.kind()))?;
        self.channel
            .flush()
            .await
            .map_err(|e| Error::Connection(phase, e.kind()))
    }

    /// Next newline terminated line, decoded.
    ///
    /// Cancel safe: bytes of a partially received line stay buffered for the
    /// next call.
    async fn read_line(&mut self, phase: Phase) -> Result<Line, Error> {
        loop {
            if let Some(pos) = self.ingress.iter().position(|b| *b == b'\n') {
                return Ok(self.take_line(pos + 1));
            }

            if self.ingress.is_full() {
                warn!("Ingress buffer full without a newline, treating it as a line");
                return Ok(self.take_line(self.ingress.len()));
            }

            let mut buf = [0u8; READ_CHUNK];
            let free = (self.ingress.capacity() - self.ingress.len()).min(READ_CHUNK);
            let n = self
                .channel
                .read(&mut buf[..free])
                .await
                .map_err(|e| Error::Connection(phase, e.kind()))?;
            if n == 0 {
                error!("[{}] Modem channel closed", phase);
                return Err(Error::Connection(phase, ErrorKind::ConnectionReset));
            }

            // Cannot fail, bounded by the free space above
            let _ = self.ingress.extend_from_slice(&buf[..n]);
        }
    }

    fn take_line(&mut self, len: usize) -> Line {
        let line = decode_line(&self.ingress[..len]);
        let rest = self.ingress.len() - len;
        self.ingress.copy_within(len.., 0);
        self.ingress.truncate(rest);
        line
    }
}

fn remaining(deadline: Instant) -> Duration {
    deadline.saturating_duration_since(Instant::now())
}

fn printable(text: &str) -> &str {
    if text == ESCAPE {
        "<ESC>"
    } else {
        text
    }
}
