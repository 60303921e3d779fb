//! Panic capture for test bodies.
//!
//! A process-wide panic hook is installed once. While a test body runs on a
//! thread, panics on that thread are recorded (message, location and a
//! forced backtrace) instead of being printed; other panics go to the
//! previous hook.

use crate::protocol::CapturedPanic;
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

thread_local! {
    static CAPTURING: Cell<bool> = const { Cell::new(false) };
    static CAPTURED: RefCell<Option<CapturedPanic>> = const { RefCell::new(None) };
}

static INSTALL: Once = Once::new();

fn install_hook() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !CAPTURING.with(Cell::get) {
                previous(info);
                return;
            }
            let record = CapturedPanic {
                message: payload_message(info.payload()),
                location: info
                    .location()
                    .map(|loc| (loc.file().to_string(), loc.line())),
                backtrace: Backtrace::force_capture().to_string(),
            };
            CAPTURED.with(|slot| *slot.borrow_mut() = Some(record));
        }));
    });
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Run `body`, turning a panic into a [`CapturedPanic`]
pub fn catch<R>(body: impl FnOnce() -> R) -> Result<R, CapturedPanic> {
    install_hook();
    CAPTURED.with(|slot| slot.borrow_mut().take());
    CAPTURING.with(|flag| flag.set(true));
    let result = panic::catch_unwind(AssertUnwindSafe(body));
    CAPTURING.with(|flag| flag.set(false));

    result.map_err(|payload| {
        CAPTURED
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_else(|| CapturedPanic {
                message: payload_message(payload.as_ref()),
                ..CapturedPanic::default()
            })
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_value_passes_through() {
        assert_eq!(catch(|| 7).unwrap(), 7);
    }

    #[test]
    fn test_panic_is_recorded() {
        let captured = catch(|| -> u32 { panic!("invariant broken: {}", 3) }).unwrap_err();
        assert_eq!(captured.message, "invariant broken: 3");
        let (file, line) = captured.location.unwrap();
        assert!(file.ends_with("capture.rs"));
        assert!(line > 0);
        assert!(!captured.backtrace.is_empty());
    }

    #[test]
    fn test_static_str_payload() {
        let captured = catch(|| std::panic::panic_any("plain")).unwrap_err();
        assert_eq!(captured.message, "plain");
    }

    #[test]
    fn test_capture_is_reset_between_runs() {
        let _ = catch(|| panic!("first"));
        assert!(catch(|| ()).is_ok());
        let captured = catch(|| panic!("second")).unwrap_err();
        assert_eq!(captured.message, "second");
    }
}
