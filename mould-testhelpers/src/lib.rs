#![warn(missing_docs)]
#![warn(clippy::std_instead_of_core)]
#![warn(clippy::std_instead_of_alloc)]
#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

pub use color_eyre::eyre;
pub use mould_testhelpers_macros::test;

use log::{Level, LevelFilter, Log, Metadata, Record};
use owo_colors::{OwoColorize, Style};
use std::io::Write;
use std::sync::Once;

/// Environment variable holding the most verbose level the test logger prints
/// (`off`, `error`, `warn`, `info`, `debug` or `trace`). Defaults to `trace`.
pub const LOG_ENV: &str = "MOULD_LOG";

struct TestLogger {
    max: LevelFilter,
}

impl Log for TestLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let level_style = match record.level() {
            Level::Error => Style::new().fg_rgb::<243, 139, 168>(),
            Level::Warn => Style::new().fg_rgb::<249, 226, 175>(),
            Level::Info => Style::new().fg_rgb::<166, 227, 161>(),
            Level::Debug => Style::new().fg_rgb::<137, 180, 250>(),
            Level::Trace => Style::new().fg_rgb::<148, 226, 213>(),
        };

        // Tests run on named threads; keep interleaved output attributable.
        let thread = std::thread::current();
        eprintln!(
            "{} {} - {}: {}",
            thread.name().unwrap_or("?").dimmed(),
            record.level().style(level_style),
            record
                .target()
                .style(Style::new().fg_rgb::<137, 180, 250>()),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn level_from_env() -> LevelFilter {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(LevelFilter::Trace)
}

#[cfg(not(miri))]
fn install_reporters() {
    use color_eyre::config::HookBuilder;
    use regex::Regex;
    use std::sync::LazyLock;

    /// Frames from panics, the test harness and thread plumbing.
    static IGNORE_FRAMES: LazyLock<Option<Regex>> = LazyLock::new(|| {
        Regex::new(r"^(std::panic|core::panic|test::run_test|__pthread_cond_wait|std::sys::(pal|backtrace)|std::thread::Builder|core::ops::function|test::__rust_begin_short_backtrace|<core::panic::|<alloc::boxed::Box<F,A> as core::ops::function::FnOnce<Args>>::call_once)")
            .ok()
    });

    fn keep(name: &str) -> bool {
        IGNORE_FRAMES.as_ref().is_none_or(|re| !re.is_match(name))
    }

    let eyre_filter = move |frames: &mut Vec<&color_eyre::config::Frame>| {
        frames.retain(|frame| frame.name.as_ref().is_none_or(|n| keep(&n.to_string())));
    };

    // Another harness may have installed its own hook already.
    let _ = HookBuilder::default()
        .add_frame_filter(Box::new(eyre_filter))
        .install();

    {
        use color_backtrace::{BacktracePrinter, Frame};

        let filter = move |frames: &mut Vec<&Frame>| {
            frames.retain(|frame| frame.name.as_ref().is_none_or(|name| keep(name)));
        };

        let stderr = color_backtrace::termcolor::StandardStream::stderr(
            color_backtrace::termcolor::ColorChoice::Auto,
        );
        let printer = BacktracePrinter::new().add_frame_filter(Box::new(filter));
        printer.install(Box::new(stderr));
    }
}

/// Installs color-eyre and color-backtrace (except on miri) and a logger
/// whose level comes from [`LOG_ENV`].
///
/// Safe to call from every test: only the first call in a process installs
/// anything.
pub fn setup() {
    static INSTALL: Once = Once::new();

    INSTALL.call_once(|| {
        #[cfg(not(miri))]
        install_reporters();

        let max = level_from_env();
        if log::set_boxed_logger(Box::new(TestLogger { max })).is_ok() {
            log::set_max_level(max);
        }
    });
}

/// [`setup`], then announce the test that is about to run.
///
/// This is what `#[mould_testhelpers::test]` calls.
pub fn setup_test(module: &str, name: &str) {
    setup();
    log::debug!(target: "mould_testhelpers", "{} {}::{}", "running".bold(), module, name.cyan());
}
