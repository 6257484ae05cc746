//! Panic capture.
//!
//! `catch_unwind` only hands back the panic payload; the stack is gone by the
//! time it returns. A process-wide panic hook records a backtrace instead, but
//! only on threads that are currently polling a [`Guarded`] future. Panics
//! anywhere else go to the previously installed hook untouched.
//!
//! Captured backtraces are rewritten into a two-line-per-frame layout:
//!
//! ```text
//! thread 'tokio-runtime-worker' panicked:
//! panic_resolver::handlers::demo::panicking
//! 	./src/handlers/demo.rs:52:5
//! ```
//!
//! Function names sit flush left and source locations are tab-indented,
//! which is what [`crate::debug::StackLinker`] keys on.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::future::Future;
use std::panic::{self, PanicHookInfo};
use std::pin::Pin;
use std::sync::Once;
use std::task::{Context, Poll};

/// Everything known about one recovered panic.
#[derive(Debug, Clone)]
pub struct PanicReport {
    /// The panic payload rendered as text.
    pub message: String,
    /// `file:line:col` of the `panic!` call, if the hook saw it.
    pub location: Option<String>,
    /// Normalized stack trace.
    pub trace: String,
}

impl PanicReport {
    /// Build the report for a payload just returned by `catch_unwind`.
    ///
    /// Must run on the thread that caught the panic, before anything else is
    /// polled there.
    pub fn from_payload(payload: &(dyn Any + Send)) -> Self {
        let message = payload_message(payload);
        match CAPTURED.with(|slot| slot.borrow_mut().take()) {
            Some(captured) => Self {
                message,
                location: captured.location,
                trace: captured.trace,
            },
            None => Self {
                message,
                location: None,
                trace: "(no stack trace captured)\n".to_string(),
            },
        }
    }
}

struct Captured {
    location: Option<String>,
    trace: String,
}

thread_local! {
    static ARMED: Cell<usize> = const { Cell::new(0) };
    static CAPTURED: RefCell<Option<Captured>> = const { RefCell::new(None) };
}

static HOOK: Once = Once::new();

/// Install the capturing panic hook. Idempotent.
pub fn install_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if ARMED.with(Cell::get) == 0 {
                previous(info);
                return;
            }
            let captured = capture(info);
            CAPTURED.with(|slot| *slot.borrow_mut() = Some(captured));
        }));
    });
}

fn capture(info: &PanicHookInfo<'_>) -> Captured {
    let backtrace = Backtrace::force_capture();
    let thread = std::thread::current();
    let header = format!("thread '{}' panicked:", thread.name().unwrap_or("<unnamed>"));
    Captured {
        location: info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column())),
        trace: normalize_backtrace(&header, &backtrace.to_string()),
    }
}

/// Rewrite `std::backtrace` output into flush-left function lines followed by
/// tab-indented location lines.
pub fn normalize_backtrace(header: &str, raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    out.push_str(header);
    out.push('\n');
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(location) = line.strip_prefix("at ") {
            out.push('\t');
            out.push_str(location);
        } else {
            out.push_str(strip_frame_index(line));
        }
        out.push('\n');
    }
    out
}

/// `"12: core::panicking::panic"` → `"core::panicking::panic"`.
fn strip_frame_index(line: &str) -> &str {
    match line.split_once(": ") {
        Some((index, symbol)) if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) => {
            symbol
        }
        _ => line,
    }
}

/// Render a panic payload the way the default hook does.
pub fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Arms panic capture while the inner future is being polled.
pub struct Guarded<F> {
    inner: Pin<Box<F>>,
}

/// Wrap `future` so panics raised while polling it are captured.
pub fn guarded<F: Future>(future: F) -> Guarded<F> {
    Guarded {
        inner: Box::pin(future),
    }
}

impl<F: Future> Future for Guarded<F> {
    type Output = F::Output;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let _armed = Armed::enter();
        self.inner.as_mut().poll(cx)
    }
}

struct Armed;

impl Armed {
    fn enter() -> Self {
        // Drop anything left over from a panic the handler recovered itself.
        CAPTURED.with(|slot| slot.borrow_mut().take());
        ARMED.with(|armed| armed.set(armed.get() + 1));
        Armed
    }
}

impl Drop for Armed {
    fn drop(&mut self) {
        ARMED.with(|armed| armed.set(armed.get() - 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;
    use std::panic::AssertUnwindSafe;

    const RAW: &str = "   0: std::backtrace::Backtrace::force_capture
             at /rustc/abc/library/std/src/backtrace.rs:312:9
   1: panic_resolver::handlers::demo::panicking
             at ./src/handlers/demo.rs:52:5
   2: <F as core::future::into_future::IntoFuture>::into_future
";

    #[test]
    fn test_normalize_backtrace() {
        let trace = normalize_backtrace("thread 'main' panicked:", RAW);
        let lines: Vec<&str> = trace.lines().collect();
        assert_eq!(
            lines,
            vec![
                "thread 'main' panicked:",
                "std::backtrace::Backtrace::force_capture",
                "\t/rustc/abc/library/std/src/backtrace.rs:312:9",
                "panic_resolver::handlers::demo::panicking",
                "\t./src/handlers/demo.rs:52:5",
                "<F as core::future::into_future::IntoFuture>::into_future",
            ]
        );
    }

    #[test]
    fn test_strip_frame_index_keeps_unnumbered_lines() {
        assert_eq!(strip_frame_index("7: foo::bar"), "foo::bar");
        assert_eq!(strip_frame_index("note: something"), "note: something");
    }

    #[test]
    fn test_payload_message() {
        assert_eq!(payload_message(&"static"), "static");
        assert_eq!(payload_message(&String::from("owned")), "owned");
        assert_eq!(payload_message(&42_u8), "Box<dyn Any>");
    }

    #[tokio::test]
    async fn test_guarded_panic_is_captured() {
        install_hook();
        let result = AssertUnwindSafe(guarded(async { panic!("captured here") }))
            .catch_unwind()
            .await;
        let payload = result.unwrap_err();
        let report = PanicReport::from_payload(payload.as_ref());

        assert_eq!(report.message, "captured here");
        assert!(report.location.unwrap().contains("trace.rs"));
        assert!(report.trace.starts_with("thread '"));
    }

    #[tokio::test]
    async fn test_guarded_passes_output_through() {
        install_hook();
        let value = guarded(async { 7 }).await;
        assert_eq!(value, 7);
        assert_eq!(ARMED.with(Cell::get), 0);
    }
}
