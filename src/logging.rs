//! Log output
//!
//! The crate only emits `tracing` events. [`init`] installs a `fmt`
//! subscriber that renders each event to one line and hands it, with its
//! level, to an emitter. In the browser the emitter is the devtools console
//! (see `web::init_logging`); tests pass a collector.

use std::io;

use tracing::{Level, Metadata};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::error::{Result, TelemetryError};

/// Default filter directive: this crate at `info`
pub const DEFAULT_LOG_FILTER: &str = "portfolio_telemetry=info";

/// [`MakeWriter`] that sends each formatted event to `emit` as a single line
#[derive(Clone)]
pub struct LineMakeWriter<F> {
    emit: F,
}

impl<F> LineMakeWriter<F>
where
    F: Fn(Level, &str) + Clone,
{
    pub fn new(emit: F) -> Self {
        Self { emit }
    }
}

/// Buffers one event; emits on drop
pub struct LineWriter<F: Fn(Level, &str)> {
    level: Level,
    buf: Vec<u8>,
    emit: F,
}

impl<F: Fn(Level, &str)> io::Write for LineWriter<F> {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<F: Fn(Level, &str)> Drop for LineWriter<F> {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.buf);
        let line = text.trim_end();
        if !line.is_empty() {
            (self.emit)(self.level, line);
        }
    }
}

impl<'a, F> MakeWriter<'a> for LineMakeWriter<F>
where
    F: Fn(Level, &str) + Clone + 'a,
{
    type Writer = LineWriter<F>;

    fn make_writer(&'a self) -> Self::Writer {
        self.writer(Level::INFO)
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        self.writer(*meta.level())
    }
}

impl<F: Fn(Level, &str) + Clone> LineMakeWriter<F> {
    fn writer(&self, level: Level) -> LineWriter<F> {
        LineWriter {
            level,
            buf: Vec::new(),
            emit: self.emit.clone(),
        }
    }
}

/// Parse an `EnvFilter` directive string
pub fn parse_filter(directives: &str) -> Result<EnvFilter> {
    EnvFilter::try_new(directives)
        .map_err(|e| TelemetryError::Config(format!("invalid log filter {directives:?}: {e}")))
}

/// Build the subscriber without installing it
pub fn subscriber<F>(directives: &str, emit: F) -> Result<impl tracing::Subscriber + Send + Sync>
where
    F: Fn(Level, &str) + Clone + Send + Sync + 'static,
{
    let filter = parse_filter(directives)?;
    // No wall clock on wasm32-unknown-unknown; the console stamps lines itself
    Ok(tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(LineMakeWriter::new(emit))
        .without_time()
        .finish())
}

/// Install the global subscriber.
///
/// Returns `false` when a global subscriber was already set (by an earlier
/// call or by the host), which is left in place.
pub fn init<F>(directives: &str, emit: F) -> Result<bool>
where
    F: Fn(Level, &str) + Clone + Send + Sync + 'static,
{
    let subscriber = subscriber(directives, emit)?;
    Ok(tracing::subscriber::set_global_default(subscriber).is_ok())
}
