// Admission worker constants (no magic values)
use std::time::Duration;

/// Attempts per invocation when the store reports a transaction conflict
pub const MAX_CONFLICT_ATTEMPTS: u32 = 3;

/// Pause between conflicting attempts (50ms)
pub const CONFLICT_RETRY_DELAY: Duration = Duration::from_millis(50);

/// Default timer interval between invocations in serve mode (5s)
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(5);

/// Sleep after a failed invocation before the next tick (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);
