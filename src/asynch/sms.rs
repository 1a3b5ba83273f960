use super::session::{Channel, ModemSession};
use crate::command::sms::{send_message, ADDRESS_MARKERS, BODY_MARKERS, SET_TEXT_MODE};
use crate::command::{markers, Command, ResponseLines, Terminator, TimeoutPolicy, ESCAPE};
use crate::config::SmsConfig;
use crate::error::{Error, Phase};
use crate::modules::SmsVariant;

const RESET: Command<'static> = Command::fire(ESCAPE, Terminator::None);

/// Submits one text message in text mode: `AT+CMGF=1`, `AT+CMGS`, body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SmsSender {
    variant: SmsVariant,
}

impl SmsSender {
    pub fn new(config: &SmsConfig) -> Self {
        Self::with_variant(config.variant())
    }

    pub const fn with_variant(variant: SmsVariant) -> Self {
        Self { variant }
    }

    /// Send `text` to `number`. Any step failing aborts the submission.
    pub async fn send<C: Channel>(
        &self,
        session: &mut ModemSession<C>,
        number: &str,
        text: &str,
    ) -> Result<(), Error> {
        let address = send_message(number)?;

        if let Some(settle) = self.variant.reset_before {
            debug!("Clearing the modem input buffer");
            session.execute(Phase::Reset, &RESET).await?;
            session.settle(settle).await;
        }

        self.set_text_mode(session).await?;
        session.settle(self.variant.text_mode_settle).await;

        self.submit_address(session, &address).await?;
        session.settle(self.variant.prompt_settle).await;

        debug!("Sending message body: {}", text);
        let body = Command::new(text, self.variant.body_timeout, BODY_MARKERS)
            .with_terminator(Terminator::CtrlZ);
        let res = match session.execute(Phase::Body, &body).await {
            Ok(reply) => self.check_submitted(&reply),
            Err(e) => Err(e),
        };

        if let Err(e) = res {
            error!("Failed to send SMS: {}", e);
            // Leaves text entry, the modem may still be waiting for a body
            if let Err(reset_err) = session.execute(Phase::Reset, &RESET).await {
                debug!("Buffer reset after failed submission failed: {}", reset_err);
            }
            return Err(e);
        }

        info!("SMS sent successfully");
        Ok(())
    }

    async fn set_text_mode<C: Channel>(&self, session: &mut ModemSession<C>) -> Result<(), Error> {
        let cmd = Command::new(SET_TEXT_MODE, self.variant.text_mode_timeout, markers::FINAL)
            .with_policy(self.policy());
        let reply = session.execute(Phase::TextMode, &cmd).await?;

        if !reply.contains(markers::OK) {
            if !self.variant.lenient {
                error!("Failed to set SMS text mode: {}", reply.joined().as_str());
                return Err(Error::modem(Phase::TextMode, &reply));
            }
            warn!(
                "SMS text mode might not be set, continuing anyway: {}",
                reply.joined().as_str()
            );
        }
        Ok(())
    }

    async fn submit_address<C: Channel>(
        &self,
        session: &mut ModemSession<C>,
        address: &str,
    ) -> Result<(), Error> {
        let cmd = Command::new(address, self.variant.address_timeout, ADDRESS_MARKERS)
            .with_policy(self.policy());
        let reply = session.execute(Phase::Address, &cmd).await?;

        if reply.iter().any(|l| l.contains(markers::ERROR)) {
            error!("Recipient rejected: {}", reply.joined().as_str());
            return Err(Error::modem(Phase::Address, &reply));
        }

        if !reply.iter().any(|l| l.starts_with(markers::PROMPT)) {
            if !self.variant.lenient {
                error!("No '>' prompt after {}", address);
                return Err(Error::modem(Phase::Address, &reply));
            }
            debug!("No '>' prompt seen, proceeding with the body anyway");
        }
        Ok(())
    }

    fn check_submitted(&self, reply: &ResponseLines) -> Result<(), Error> {
        let submitted = reply.iter().any(|l| l.starts_with(markers::CMGS))
            || (self.variant.accept_ok && reply.iter().any(|l| l == markers::OK));
        if submitted {
            Ok(())
        } else {
            Err(Error::modem(Phase::Body, reply))
        }
    }

    fn policy(&self) -> TimeoutPolicy {
        if self.variant.lenient {
            TimeoutPolicy::Partial
        } else {
            TimeoutPolicy::Fail
        }
    }
}
