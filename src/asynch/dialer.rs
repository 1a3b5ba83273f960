use core::fmt;

use embassy_time::{with_timeout, Duration, Instant, Timer};

use super::session::{Channel, ModemSession};
use crate::command::call_control::{
    dial_string, CallStatus, DIAL_MARKERS, DIAL_TIMEOUT, LIST_CURRENT_CALLS,
};
use crate::command::{markers, Command, ResponseLines};
use crate::config::DialerConfig;
use crate::error::{Error, Phase};
use crate::modules::{DialerVariant, HookStep};

/// How a placed call ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EndedReason {
    /// The callee picked up
    Answered,
    /// The call disappeared from the call list before being answered
    Declined,
    /// Nobody picked up in time
    NotAnswered,
}

impl EndedReason {
    /// Name as reported in the host's call ended event
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Answered => "answered",
            Self::Declined => "declined",
            Self::NotAnswered => "not_answered",
        }
    }
}

impl fmt::Display for EndedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to do after feeding a call status into [`PollState::observe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    Finished(EndedReason),
    /// Query again right away
    PollNow,
    /// Sleep one poll interval, capped at the deadline, then query again
    PollLater,
}

/// Deadline bookkeeping of the wait for answer.
///
/// Starts out with the dial timeout. The first time the callee's phone is
/// seen ringing, the deadline moves to `now + call_duration`. This happens
/// at most once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollState {
    deadline: Instant,
    ringing: bool,
    call_duration: Duration,
}

impl PollState {
    pub fn new(now: Instant, dial_timeout: Duration, call_duration: Duration) -> Self {
        Self {
            deadline: now + dial_timeout,
            ringing: false,
            call_duration,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_ringing(&self) -> bool {
        self.ringing
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    pub fn observe(&mut self, status: CallStatus, now: Instant) -> PollStep {
        match status {
            CallStatus::Ringing if !self.ringing => {
                info!(
                    "Callee's phone started ringing, waiting up to {} seconds for answer...",
                    self.call_duration.as_secs()
                );
                self.ringing = true;
                self.deadline = now + self.call_duration;
                PollStep::PollNow
            }
            CallStatus::Active => PollStep::Finished(EndedReason::Answered),
            CallStatus::Absent => PollStep::Finished(EndedReason::Declined),
            CallStatus::Ringing | CallStatus::Provisioning => PollStep::PollLater,
        }
    }
}

/// Places one voice call: pre-dial hook, dial, wait for answer, hangup hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialer {
    variant: DialerVariant,
    dial_timeout: Duration,
    call_duration: Duration,
    poll_interval: Duration,
}

impl Dialer {
    pub fn new(config: &DialerConfig) -> Self {
        Self::with_variant(config, config.variant())
    }

    /// Dial with a custom variant instead of the configured hardware's
    pub fn with_variant(config: &DialerConfig, variant: DialerVariant) -> Self {
        Self {
            variant,
            dial_timeout: config.dial_timeout(),
            call_duration: config.call_duration(),
            poll_interval: config.poll_interval(),
        }
    }

    /// Call `number` and wait until the call ended.
    ///
    /// Not being answered is an outcome, not an error. Once the dial command
    /// was accepted the hangup hook runs whatever the outcome; a failing
    /// hangup is logged and does not change it.
    pub async fn dial<C: Channel>(
        &self,
        session: &mut ModemSession<C>,
        number: &str,
    ) -> Result<EndedReason, Error> {
        let dial = dial_string(self.variant.keyword, number)?;

        self.run_pre_dial(session).await?;

        info!("Dialing {}...", dial.as_str());
        let reply = session
            .execute(Phase::Dial, &Command::new(&dial, DIAL_TIMEOUT, DIAL_MARKERS))
            .await?;
        check_dial_reply(&reply)?;

        let outcome = self.wait_for_answer(session).await;
        self.hang_up(session).await;

        let reason = outcome?;
        info!("Call ended: {}", reason);
        Ok(reason)
    }

    async fn run_pre_dial<C: Channel>(&self, session: &mut ModemSession<C>) -> Result<(), Error> {
        for step in self.variant.pre_dial {
            run_step(session, Phase::PreDial, step).await?;
        }
        Ok(())
    }

    async fn wait_for_answer<C: Channel>(
        &self,
        session: &mut ModemSession<C>,
    ) -> Result<EndedReason, Error> {
        debug!(
            "Waiting up to {} seconds for the callee's phone to ring...",
            self.dial_timeout.as_secs()
        );
        let mut state = PollState::new(Instant::now(), self.dial_timeout, self.call_duration);

        loop {
            if state.is_expired(Instant::now()) {
                break;
            }

            // The deadline of this round is fixed before the query goes out
            let remaining = state.deadline().saturating_duration_since(Instant::now());
            let status = match with_timeout(remaining, query_status(session)).await {
                Ok(status) => status?,
                Err(_) => break,
            };
            trace!("Call status: {:?}", status);

            match state.observe(status, Instant::now()) {
                PollStep::Finished(reason) => return Ok(reason),
                PollStep::PollNow => {}
                PollStep::PollLater => {
                    let wake = Instant::now() + self.poll_interval;
                    Timer::at(wake.min(state.deadline())).await;
                }
            }
        }

        if state.is_ringing() {
            debug!("Callee did not pick up in time");
        } else {
            debug!("Callee's phone never started ringing");
        }
        Ok(EndedReason::NotAnswered)
    }

    async fn hang_up<C: Channel>(&self, session: &mut ModemSession<C>) {
        debug!("Hanging up...");
        for step in self.variant.hangup {
            if let Err(e) = run_step(session, Phase::Hangup, step).await {
                warn!("Hangup command {} failed: {}", step.command.text, e);
            }
        }
    }
}

async fn run_step<C: Channel>(
    session: &mut ModemSession<C>,
    phase: Phase,
    step: &HookStep,
) -> Result<(), Error> {
    session.execute(phase, &step.command).await?;
    session.settle(step.settle).await;
    Ok(())
}

/// A lost status reply is not conclusive, the call may still be setting up
async fn query_status<C: Channel>(session: &mut ModemSession<C>) -> Result<CallStatus, Error> {
    match session.execute(Phase::Poll, &LIST_CURRENT_CALLS).await {
        Ok(reply) => Ok(CallStatus::from_reply(&reply)),
        Err(Error::Timeout(..)) => {
            warn!("No reply to the call status query");
            Ok(CallStatus::Provisioning)
        }
        Err(e) => Err(e),
    }
}

fn check_dial_reply(reply: &ResponseLines) -> Result<(), Error> {
    if reply.contains(markers::BUSY) {
        info!("Callee is busy");
        return Err(Error::Busy);
    }
    if reply.contains(markers::ERROR) || reply.contains(markers::NO_CARRIER) {
        error!("Dialing failed: {}", reply.joined().as_str());
        return Err(Error::modem(Phase::Dial, reply));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Terminator, ESCAPE};
    use crate::modules::Hardware;
    use crate::test_helpers::{init_logger, MockChannel};
    use embassy_futures::block_on;

    const ESCAPE_NOW: HookStep =
        HookStep::new(Command::fire(ESCAPE, Terminator::None), Duration::from_ticks(0));

    const FAST: DialerVariant = DialerVariant {
        pre_dial: &[ESCAPE_NOW],
        ..Hardware::Atd.variant()
    };

    fn dialer(dial_timeout_sec: u32, call_duration_sec: u32, variant: DialerVariant) -> Dialer {
        let mut config = DialerConfig::default();
        config.dial_timeout_sec = dial_timeout_sec;
        config.call_duration_sec = call_duration_sec;
        Dialer::with_variant(&config, variant)
    }

    #[test]
    fn ended_reason_names() {
        assert_eq!(EndedReason::Answered.as_str(), "answered");
        assert_eq!(EndedReason::Declined.as_str(), "declined");
        assert_eq!(EndedReason::NotAnswered.as_str(), "not_answered");
    }

    #[test]
    fn ringing_moves_the_deadline_once() {
        let start = Instant::from_secs(100);
        let mut state = PollState::new(start, Duration::from_secs(20), Duration::from_secs(30));
        assert_eq!(state.deadline(), Instant::from_secs(120));

        let ring = Instant::from_secs(105);
        assert_eq!(state.observe(CallStatus::Ringing, ring), PollStep::PollNow);
        assert_eq!(state.deadline(), Instant::from_secs(135));
        assert!(state.is_ringing());

        assert_eq!(
            state.observe(CallStatus::Ringing, Instant::from_secs(110)),
            PollStep::PollLater
        );
        assert_eq!(state.deadline(), Instant::from_secs(135));
    }

    #[test]
    fn ringing_may_extend_past_the_dial_timeout() {
        let mut state = PollState::new(
            Instant::from_secs(0),
            Duration::from_secs(20),
            Duration::from_secs(30),
        );
        state.observe(CallStatus::Ringing, Instant::from_secs(19));
        assert!(!state.is_expired(Instant::from_secs(25)));
        assert!(state.is_expired(Instant::from_secs(49)));
    }

    #[test]
    fn terminal_statuses() {
        let mut state = PollState::new(
            Instant::from_secs(0),
            Duration::from_secs(20),
            Duration::from_secs(30),
        );
        assert_eq!(
            state.observe(CallStatus::Provisioning, Instant::from_secs(1)),
            PollStep::PollLater
        );
        assert_eq!(
            state.observe(CallStatus::Active, Instant::from_secs(2)),
            PollStep::Finished(EndedReason::Answered)
        );
        assert_eq!(
            state.observe(CallStatus::Absent, Instant::from_secs(2)),
            PollStep::Finished(EndedReason::Declined)
        );
        assert!(!state.is_ringing());
    }

    #[test]
    fn dial_reply_classification() {
        let reply = |lines: &[&str]| lines.iter().copied().collect::<ResponseLines>();

        assert_eq!(check_dial_reply(&reply(&["ATD+1555;", "OK"])), Ok(()));
        assert_eq!(check_dial_reply(&reply(&["BUSY"])), Err(Error::Busy));
        assert_eq!(
            check_dial_reply(&reply(&["ATD+1555;", "NO CARRIER"])),
            Err(Error::Modem(Phase::Dial, "ATD+1555; NO CARRIER".try_into().unwrap()))
        );
        assert!(matches!(
            check_dial_reply(&reply(&["+CME ERROR: 30"])),
            Err(Error::Modem(Phase::Dial, _))
        ));
    }

    #[test]
    fn answered_after_ringing() {
        init_logger();
        let (channel, log) = MockChannel::new()
            .reply(&["ATD+15551234567;", "OK"])
            .reply(&["+CLCC: 1,0,3,0,0", "OK"])
            .reply(&["+CLCC: 1,0,0,0,0", "OK"])
            .reply(&["OK"])
            .build();
        let mut session = ModemSession::new(channel);

        let res = block_on(dialer(20, 30, FAST).dial(&mut session, "+15551234567"));

        assert_eq!(res, Ok(EndedReason::Answered));
        assert_eq!(
            log.sent(),
            ["\x1B", "ATD+15551234567;\r\n", "AT+CLCC\r\n", "AT+CLCC\r\n", "ATH\r\n"]
        );
    }

    #[test]
    fn long_call_list_keeps_our_call() {
        init_logger();
        let mut poll = std::vec!["+CLCC: 1,0,0,0,0"];
        poll.extend(core::iter::repeat("+CLCC: 2,1,5,0,0").take(16));
        poll.push("OK");
        let (channel, _) = MockChannel::new()
            .reply(&["OK"])
            .reply(&poll)
            .reply(&["OK"])
            .build();
        let mut session = ModemSession::new(channel);

        let res = block_on(dialer(20, 30, FAST).dial(&mut session, "15551234567"));

        assert_eq!(res, Ok(EndedReason::Answered));
    }

    #[test]
    fn busy_does_not_poll_or_hang_up() {
        init_logger();
        let (channel, log) = MockChannel::new().reply(&["BUSY"]).build();
        let mut session = ModemSession::new(channel);

        let res = block_on(dialer(20, 30, FAST).dial(&mut session, "15551234567"));

        assert_eq!(res, Err(Error::Busy));
        assert_eq!(log.sent(), ["\x1B", "ATD+15551234567;\r\n"]);
    }

    #[test]
    fn declined_when_the_call_disappears() {
        init_logger();
        let (channel, log) = MockChannel::new()
            .reply(&["OK"])
            .reply(&["OK"])
            .reply(&["OK"])
            .build();
        let mut session = ModemSession::new(channel);

        let res = block_on(dialer(20, 30, FAST).dial(&mut session, "15551234567"));

        assert_eq!(res, Ok(EndedReason::Declined));
        assert_eq!(log.sent().last().map(|s| s.as_str()), Some("ATH\r\n"));
    }

    #[test]
    fn not_answered_after_dial_timeout() {
        init_logger();
        let (channel, log) = MockChannel::new()
            .reply(&["OK"])
            .reply(&["+CLCC: 1,0,2,0,0", "OK"])
            .silence()
            .silence()
            .silence()
            .build();
        let mut session = ModemSession::new(channel);

        let start = Instant::now();
        let res = block_on(dialer(2, 30, FAST).dial(&mut session, "15551234567"));

        assert_eq!(res, Ok(EndedReason::NotAnswered));
        assert!(Instant::now() - start >= Duration::from_secs(2));
        let sent = log.sent();
        assert!(sent.iter().filter(|s| *s == "AT+CLCC\r\n").count() >= 2);
        assert_eq!(sent.last().map(|s| s.as_str()), Some("ATH\r\n"));
    }

    #[test]
    fn not_answered_after_ringing_for_call_duration() {
        init_logger();
        let (channel, log) = MockChannel::new()
            .reply(&["OK"])
            .reply(&["+CLCC: 1,0,3,0,0", "OK"])
            .reply(&["+CLCC: 1,0,3,0,0", "OK"])
            .reply(&["+CLCC: 1,0,3,0,0", "OK"])
            .reply(&["+CLCC: 1,0,3,0,0", "OK"])
            .reply(&["+CLCC: 1,0,3,0,0", "OK"])
            .build();
        let mut session = ModemSession::new(channel);

        let start = Instant::now();
        let res = block_on(dialer(1, 2, FAST).dial(&mut session, "15551234567"));

        assert_eq!(res, Ok(EndedReason::NotAnswered));
        // Ringing pushed the deadline past the one second dial timeout
        assert!(Instant::now() - start >= Duration::from_secs(2));
        assert_eq!(log.sent().last().map(|s| s.as_str()), Some("ATH\r\n"));
    }

    #[test]
    fn gtm382_releases_before_hanging_up() {
        init_logger();
        const VARIANT: DialerVariant = DialerVariant {
            pre_dial: &[ESCAPE_NOW],
            ..Hardware::Gtm382.variant()
        };
        let (channel, log) = MockChannel::new()
            .reply(&["OK"])
            .reply(&["+CLCC: 1,0,0,0,0", "OK"])
            .reply(&["ERROR"])
            .reply(&["OK"])
            .build();
        let mut session = ModemSession::new(channel);

        let res = block_on(dialer(20, 30, VARIANT).dial(&mut session, "15551234567"));

        assert_eq!(res, Ok(EndedReason::Answered));
        assert_eq!(
            log.sent(),
            ["\x1B", "ATD+15551234567;\r\n", "AT+CLCC\r\n", "AT+CHUP\r\n", "ATH\r\n"]
        );
    }

    #[test]
    fn zte_switches_voice_mode_first() {
        init_logger();
        const VARIANT: DialerVariant = DialerVariant {
            pre_dial: &[
                HookStep::new(
                    Command::fire("AT%icscall=1,0", Terminator::CrLf),
                    Duration::from_ticks(0),
                ),
                ESCAPE_NOW,
            ],
            ..Hardware::Zte.variant()
        };
        let (channel, log) = MockChannel::new()
            .silence()
            .reply(&["NO CARRIER"])
            .build();
        let mut session = ModemSession::new(channel);

        let res = block_on(dialer(20, 30, VARIANT).dial(&mut session, "15551234567"));

        assert!(matches!(res, Err(Error::Modem(Phase::Dial, _))));
        assert_eq!(
            log.sent(),
            ["AT%icscall=1,0\r\n", "\x1B", "ATD+15551234567;\r\n"]
        );
    }

    #[test]
    fn poll_connection_loss_still_attempts_hangup() {
        init_logger();
        let (channel, log) = MockChannel::new().reply(&["OK"]).eof().build();
        let mut session = ModemSession::new(channel);

        let res = block_on(dialer(20, 30, FAST).dial(&mut session, "15551234567"));

        assert!(matches!(res, Err(Error::Connection(Phase::Poll, _))));
        assert_eq!(log.sent().last().map(|s| s.as_str()), Some("ATH\r\n"));
    }
}
