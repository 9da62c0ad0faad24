//! Log sink and record formatting.
//!
//! The poller never installs a global subscriber. [`dispatch`] builds a
//! [`Dispatch`] bound to the configured sink, and the binary attaches it to
//! the run future, so the log handle is passed explicitly rather than
//! mutated process-wide.
//!
//! Environment variables:
//!   RUST_LOG    # Log filter (default: info)

use std::fmt;
use std::fs::OpenOptions;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use tracing::field::{Field, Visit};
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriter};
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LogTarget};
use crate::error::{PollError, Result};

/// Open the configured sink.
///
/// Files are opened for append and created when absent; an open failure is
/// returned rather than falling back to stdout.
pub fn open_sink(target: &LogTarget) -> Result<BoxMakeWriter> {
    match target {
        LogTarget::Stdout => Ok(BoxMakeWriter::new(std::io::stdout)),
        LogTarget::File(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| PollError::log_sink(path, err))?;
            Ok(BoxMakeWriter::new(Mutex::new(file)))
        }
    }
}

/// Filter from `RUST_LOG`, defaulting to `info`.
pub fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Build a dispatcher writing `format` records to `writer`.
pub fn dispatch<W>(format: LogFormat, filter: EnvFilter, writer: W) -> Dispatch
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false);

    match format {
        LogFormat::Ltsv => Dispatch::new(builder.event_format(Ltsv).finish()),
        LogFormat::Json => Dispatch::new(
            builder
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_span_list(false)
                .finish(),
        ),
        LogFormat::Text => Dispatch::new(builder.with_target(false).compact().finish()),
    }
}

/// Labelled tab-separated values, one record per line:
///
/// ```text
/// time:2026-10-19T08:00:00.000000Z	level:Info	numBackends:5	activityCount:3
/// ```
///
/// The event message, when present, is written as `msg`. Tabs, newlines and
/// backslashes inside values are escaped so a record always stays on one line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ltsv;

impl<S, N> FormatEvent<S, N> for Ltsv
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let time = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        write!(writer, "time:{}\tlevel:{}", time, level_label(event.metadata().level()))?;

        let mut fields = LtsvFields::default();
        event.record(&mut fields);
        for (label, value) in &fields.pairs {
            write!(writer, "\t{}:", label)?;
            write_escaped(&mut writer, value)?;
        }
        writeln!(writer)
    }
}

fn level_label(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "Error",
        Level::WARN => "Warn",
        Level::INFO => "Info",
        Level::DEBUG => "Debug",
        Level::TRACE => "Trace",
    }
}

fn write_escaped(writer: &mut Writer<'_>, value: &str) -> fmt::Result {
    for ch in value.chars() {
        match ch {
            '\t' => writer.write_str("\\t")?,
            '\n' => writer.write_str("\\n")?,
            '\r' => writer.write_str("\\r")?,
            '\\' => writer.write_str("\\\\")?,
            _ => writer.write_char(ch)?,
        }
    }
    Ok(())
}

#[derive(Default)]
struct LtsvFields {
    pairs: Vec<(&'static str, String)>,
}

impl LtsvFields {
    fn push(&mut self, field: &Field, value: String) {
        let label = match field.name() {
            "message" => "msg",
            name => name,
        };
        self.pairs.push((label, value));
    }
}

impl Visit for LtsvFields {
    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, value.to_string());
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.push(field, value.to_owned());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.push(field, format!("{:?}", value));
    }
}
