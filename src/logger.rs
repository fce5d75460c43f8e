//! Simulation aware tracing output.
//!
//! Every line starts with the virtual time. While a MAC handles one of
//! its events, the line also names that node.

use crate::{mac::MacAddress, time::SimTime};
use nu_ansi_term::{Color, Style};
use std::{
    fmt::{self, Arguments},
    sync::atomic::{AtomicU64, Ordering},
};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    filter::Directive,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, FormattedFields},
    registry::LookupSpan,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

const NO_NODE: u64 = u64::MAX;

static ACTIVE_NODE: AtomicU64 = AtomicU64::new(NO_NODE);

/// Runs `f` with all log lines attributed to `node`.
pub fn scoped<R>(node: MacAddress, f: impl FnOnce() -> R) -> R {
    let outer = ACTIVE_NODE.swap(node.raw(), Ordering::Relaxed);
    let result = f();
    ACTIVE_NODE.store(outer, Ordering::Relaxed);
    result
}

/// The node log lines are currently attributed to.
#[must_use]
pub fn active_node() -> Option<MacAddress> {
    match ACTIVE_NODE.load(Ordering::Relaxed) {
        NO_NODE => None,
        raw => Some(MacAddress::from_raw(raw)),
    }
}

/// Used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LEVEL: Level = Level::INFO;

/// Installs a global subscriber printing [`SimFormat`] lines, filtered
/// by `RUST_LOG`.
///
/// # Errors
///
/// Fails if a global subscriber is allready installed.
pub fn try_init() -> Result<(), TryInitError> {
    let filter = EnvFilter::builder()
        .with_default_directive(Directive::from(DEFAULT_LEVEL))
        .from_env_lossy();

    tracing_subscriber::fmt()
        .event_format(SimFormat)
        .with_env_filter(filter)
        .finish()
        .try_init()
}

/// Like [`try_init`], keeping an existing global subscriber.
pub fn init() {
    if let Err(e) = try_init() {
        tracing::debug!("keeping the installed subscriber: {e}");
    }
}

/// Formats events as `[time] LEVEL node span{fields}: target: message`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimFormat;

impl<S, N> FormatEvent<S, N> for SimFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let ansi = writer.has_ansi_escapes();
        let meta = event.metadata();
        let dimmed = Style::new().dimmed();
        let bold = Style::new().bold();

        paint(&mut writer, ansi, dimmed, format_args!("[{}] ", SimTime::now()))?;
        paint(
            &mut writer,
            ansi,
            level_style(*meta.level()),
            format_args!("{:<5} ", meta.level().as_str()),
        )?;
        if let Some(node) = active_node() {
            paint(&mut writer, ansi, bold, format_args!("{node} "))?;
        }

        for span in ctx.event_scope().into_iter().flat_map(|s| s.from_root()) {
            let name = span.metadata().name();
            let ext = span.extensions();
            match ext.get::<FormattedFields<N>>().filter(|f| !f.is_empty()) {
                Some(fields) => paint(&mut writer, ansi, bold, format_args!("{name}{{{fields}}}: "))?,
                None => paint(&mut writer, ansi, bold, format_args!("{name}: "))?,
            }
        }

        paint(&mut writer, ansi, dimmed, format_args!("{}: ", meta.target()))?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn level_style(level: Level) -> Style {
    let color = match level {
        Level::TRACE => Color::Cyan,
        Level::DEBUG => Color::Purple,
        Level::INFO => Color::Green,
        Level::WARN => Color::Yellow,
        Level::ERROR => Color::Red,
    };
    color.normal()
}

fn paint(writer: &mut Writer<'_>, ansi: bool, style: Style, text: Arguments<'_>) -> fmt::Result {
    if ansi {
        write!(writer, "{}{text}{}", style.prefix(), style.suffix())
    } else {
        write!(writer, "{text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    #[serial]
    fn scoped_restores_the_outer_node() {
        assert_eq!(active_node(), None);
        scoped(MacAddress::new(1), || {
            let inner = scoped(MacAddress::new(7), active_node);
            assert_eq!(inner, Some(MacAddress::new(7)));
            assert_eq!(active_node(), Some(MacAddress::new(1)));
        });
        assert_eq!(active_node(), None);
    }

    #[test]
    #[serial]
    fn lines_carry_time_and_node() {
        let buffer = Buffer::default();
        let sink = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .event_format(SimFormat)
            .with_writer(move || sink.clone())
            .finish();

        SimTime::set_now(SimTime::from_micros(1_500));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("idle");
            scoped(MacAddress::new(3), || tracing::warn!("backoff"));
        });
        SimTime::set_now(SimTime::ZERO);

        let out = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(
            out.lines().collect::<Vec<_>>(),
            vec![
                "[1.5ms] INFO  des_wifi::logger::tests: idle",
                "[1.5ms] WARN  00:00:00:00:00:03 des_wifi::logger::tests: backoff",
            ]
        );
    }
}
