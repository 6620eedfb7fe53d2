// Panic isolation for caller-supplied callbacks
use std::panic::{catch_unwind, UnwindSafe};

/// Result of a panic-guarded call
#[derive(Debug)]
pub enum PanicGuardResult<T> {
    /// Call returned normally
    Success(T),
    /// Call panicked, with the panic payload rendered as text
    Panicked(String),
}

impl<T> PanicGuardResult<T> {
    pub fn is_panicked(&self) -> bool {
        matches!(self, PanicGuardResult::Panicked(_))
    }
}

/// Run `f`, catching a panic instead of unwinding into the caller.
///
/// Long-lived tasks use this around listeners so that one faulty
/// callback does not silently end the task that drives it. Logging is
/// left to the caller, which knows what was being delivered.
pub fn execute_guarded<F, T>(f: F) -> PanicGuardResult<T>
where
    F: FnOnce() -> T + UnwindSafe,
{
    match catch_unwind(f) {
        Ok(result) => PanicGuardResult::Success(result),
        Err(payload) => {
            let message = if let Some(s) = payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            };
            PanicGuardResult::Panicked(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returns_value_when_no_panic() {
        match execute_guarded(|| 7) {
            PanicGuardResult::Success(v) => assert_eq!(v, 7),
            PanicGuardResult::Panicked(msg) => panic!("unexpected panic: {}", msg),
        }
    }

    #[test]
    fn test_captures_static_and_formatted_messages() {
        let result = execute_guarded::<_, ()>(|| panic!("listener broke"));
        assert!(matches!(result, PanicGuardResult::Panicked(ref m) if m == "listener broke"));

        let id = 3;
        let result = execute_guarded::<_, ()>(|| panic!("entry {} missing", id));
        assert!(matches!(result, PanicGuardResult::Panicked(ref m) if m == "entry 3 missing"));
    }

    #[test]
    fn test_unknown_payload() {
        let result = execute_guarded::<_, ()>(|| std::panic::panic_any(42u8));
        assert!(result.is_panicked());
        assert!(matches!(result, PanicGuardResult::Panicked(ref m) if m == "Unknown panic"));
    }
}
