//! Helpers shared by the integration tests that run under libtest-mimic.
use std::backtrace::BacktraceStatus;
use std::cell::Cell;
use std::ops::Deref;
use std::panic::{self, UnwindSafe};
use std::sync::Once;

use libtest_mimic::Failed;

thread_local! {
    /// Everything html5scrub logged on this thread since the last test finished.
    static OUTPUT: Cell<String> = Cell::default();
}

/// Buffers `log` records per thread, so that each failing test reports only its own trace.
///
/// Custom test harnesses cannot capture stdout, see [libtest-mimic issue
/// #9](https://github.com/LukasKalbertodt/libtest-mimic/issues/9).
struct BufferLogger;

impl log::Log for BufferLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.target().starts_with("html5scrub")
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            trace_log(&format!("{} {}", record.level(), record.args()));
        }
    }

    fn flush(&self) {}
}

static LOGGER: BufferLogger = BufferLogger;

fn trace_log(msg: &str) {
    OUTPUT.with(|cell| {
        let mut buf = cell.take();
        buf.push_str(msg);
        buf.push('\n');

        if buf.len() > 1024 * 1024 {
            buf.clear();
            buf.push_str("[truncated output]\n");
        }

        cell.set(buf);
    });
}

/// Run a test body, and turn a panic into a failure carrying the log output and a trimmed
/// backtrace.
///
/// libtest_mimic already catches panics but doesn't provide stacktraces for some reason.
pub fn catch_unwind_and_report(f: impl FnOnce() + UnwindSafe) -> Result<(), Failed> {
    static SETUP: Once = Once::new();
    SETUP.call_once(|| {
        // Another logger may already be installed, in which case the trace is simply absent.
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(log::LevelFilter::Trace);
        }

        panic::set_hook(Box::new(|_info| {
            let backtrace = std::backtrace::Backtrace::capture();
            if backtrace.status() != BacktraceStatus::Captured {
                trace_log("PANIC BACKTRACE: did not capture, use RUST_BACKTRACE=1");
            } else {
                let mut backtrace_str = String::new();
                let mut seen_begin_unwind = false;
                for line in format!("{:#?}", backtrace).lines() {
                    if line.contains("\"std::panicking::try::do_call\"") {
                        break;
                    } else if seen_begin_unwind {
                        backtrace_str.push_str(line);
                        backtrace_str.push('\n');
                    } else if line.contains("\"core::panicking::panic_fmt\"") {
                        seen_begin_unwind = true;
                    }
                }
                trace_log(&format!("\nPANIC BACKTRACE:\n{}", backtrace_str));
            }
        }));
    });

    let result = panic::catch_unwind(f);
    let mut msg = OUTPUT.with(Cell::take);

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            msg.push('\n');
            if let Some(s) = e
                .downcast_ref::<String>()
                .map(String::as_str)
                .or_else(|| e.downcast_ref::<&'static str>().map(Deref::deref))
            {
                msg.push_str("PANIC: ");
                msg.push_str(s);
            }

            Err(msg.into())
        }
    }
}
