use embassy_time::Duration;

/// Pause after the ESC buffer reset before the modem accepts commands again
pub const ESCAPE_SETTLE: Duration = Duration::from_secs(1);

/// Pause after the ZTE voice mode switch
pub const ZTE_VOICE_MODE_SETTLE: Duration = Duration::from_millis(500);

/// Pause after `AT+CHUP` before the fallback `ATH`
pub const RELEASE_SETTLE: Duration = Duration::from_secs(1);

/// Timeout of the hangup commands
pub const HANGUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Interval between two `AT+CLCC` polls.
///
/// Some modems answer `+CME ERROR: 100` when polled more often than once a
/// second, so this is also the lower bound of any configured interval.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How long to wait for the callee to pick up a ringing phone
pub const DEFAULT_CALL_DURATION_SEC: u32 = 30;

/// How long to wait for the callee's phone to start ringing
pub const DEFAULT_DIAL_TIMEOUT_SEC: u32 = 20;
