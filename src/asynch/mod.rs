pub mod dialer;
pub mod session;
pub mod sms;

use embassy_sync::{
    blocking_mutex::raw::{NoopRawMutex, RawMutex},
    mutex::Mutex,
};

use crate::config::{DialerConfig, SmsConfig};
use crate::error::Error;

pub use dialer::{Dialer, EndedReason, PollState, PollStep};
pub use session::{Channel, ModemSession};
pub use sms::SmsSender;

/// Entry point for hosts placing calls and sending messages over one modem.
///
/// Allows at most one call and at most one SMS submission at a time. A
/// request arriving while another one of the same kind is running is
/// rejected with [`Error::InUse`], it is never queued.
///
/// Each request takes ownership of a freshly opened [`Channel`] and closes
/// it when done, whatever the outcome. Dropping the returned future drops
/// the channel as well.
pub struct GsmModem<M: RawMutex = NoopRawMutex> {
    call: Mutex<M, ()>,
    sms: Mutex<M, ()>,
}

impl<M: RawMutex> Default for GsmModem<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: RawMutex> GsmModem<M> {
    pub const fn new() -> Self {
        Self {
            call: Mutex::new(()),
            sms: Mutex::new(()),
        }
    }

    /// Call `number` and report how the call ended
    pub async fn dial<C: Channel>(
        &self,
        channel: C,
        config: &DialerConfig,
        number: &str,
    ) -> Result<EndedReason, Error> {
        let Ok(_guard) = self.call.try_lock() else {
            warn!("A call is already in progress, rejecting dial request");
            return Err(Error::InUse);
        };

        let mut session = ModemSession::new(channel);
        let res = Dialer::new(config).dial(&mut session, number).await;
        session.close().await;
        res
    }

    /// Send `text` to `number`
    pub async fn send_sms<C: Channel>(
        &self,
        channel: C,
        config: &SmsConfig,
        number: &str,
        text: &str,
    ) -> Result<(), Error> {
        let Ok(_guard) = self.sms.try_lock() else {
            warn!("An SMS is already being sent, rejecting request");
            return Err(Error::InUse);
        };

        let mut session = ModemSession::new(channel);
        let res = SmsSender::new(config).send(&mut session, number, text).await;
        session.close().await;
        res
    }
}
