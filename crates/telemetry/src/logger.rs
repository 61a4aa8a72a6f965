//! The process logger and its reload handle.
//!
//! One `tracing_subscriber::reload` layer holds the active formatting
//! layer (level filter + fmt layer + sinks). [`LoggerHandle::reload`]
//! builds a complete replacement and swaps it in a single step, so
//! concurrent log calls observe either the old logger or the new one and
//! never a half-built state.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use settings::LoggingSection;
use tracing::span::{Attributes, Id};
use tracing::{info, warn, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::{DefaultFields, JsonFields};
use tracing_subscriber::fmt::{FormatFields, FormattedFields};
use tracing_subscriber::layer::{Context, Layered, SubscriberExt};
use tracing_subscriber::registry::{ExtensionsMut, LookupSpan};
use tracing_subscriber::{fmt, reload, Layer, Registry};

use crate::config::{Encoding, LoggingConfig};
use crate::sinks::{OpenedSinks, SinkSet};
use crate::LoggingError;

type Base = Layered<SpanFields, Registry>;
type BoxedLayer = Box<dyn Layer<Base> + Send + Sync>;

/// The subscriber produced by [`build`].
pub type LoggingSubscriber = Layered<reload::Layer<BoxedLayer, Base>, Base>;

/// Renders span fields for both encodings when a span opens, so events
/// inside spans opened before an encoding switch can still be formatted.
/// Fields recorded later only reach the active encoding's copy.
pub struct SpanFields;

impl SpanFields {
    fn insert<N>(formatter: N, attrs: &Attributes<'_>, extensions: &mut ExtensionsMut<'_>)
    where
        N: for<'w> FormatFields<'w> + 'static,
    {
        if extensions.get_mut::<FormattedFields<N>>().is_some() {
            return;
        }
        let mut fields = FormattedFields::<N>::new(String::new());
        if formatter.format_fields(fields.as_writer(), attrs).is_ok() {
            extensions.insert(fields);
        }
    }
}

impl<S> Layer<S> for SpanFields
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };
        let mut extensions = span.extensions_mut();
        Self::insert(DefaultFields::new(), attrs, &mut extensions);
        Self::insert(JsonFields::new(), attrs, &mut extensions);
    }
}

fn base() -> Base {
    Registry::default().with(SpanFields)
}

struct LoggerState {
    config: LoggingConfig,
    sinks: SinkSet,
    reload: reload::Handle<BoxedLayer, Base>,
    generation: u64,
}

/// Cloneable handle to the process logger.
#[derive(Clone)]
pub struct LoggerHandle {
    state: Arc<Mutex<LoggerState>>,
}

fn prepare(section: &LoggingSection) -> (LoggingConfig, OpenedSinks) {
    let mut config = LoggingConfig::normalize(section);
    let opened = SinkSet::open(&config.outputs);
    config.outputs = opened.outputs.clone();
    (config, opened)
}

fn build_layer(config: &LoggingConfig, sinks: SinkSet) -> BoxedLayer {
    let filter = LevelFilter::from_level(config.level);
    match config.encoding {
        Encoding::Json => filter
            .and_then(fmt::layer().json().with_ansi(false).with_writer(sinks))
            .boxed(),
        Encoding::Console => filter
            .and_then(fmt::layer().with_ansi(false).with_writer(sinks))
            .boxed(),
    }
}

fn report_failures(opened: &OpenedSinks) {
    for (path, error) in &opened.failures {
        warn!(output = %path.display(), error = %error, "log output unavailable, using stdout");
    }
}

fn assemble(section: &LoggingSection) -> (LoggerHandle, LoggingSubscriber, OpenedSinks) {
    let (config, opened) = prepare(section);
    let (layer, reload) = reload::Layer::new(build_layer(&config, opened.sinks.clone()));
    let handle = LoggerHandle {
        state: Arc::new(Mutex::new(LoggerState {
            config,
            sinks: opened.sinks.clone(),
            reload,
            generation: 0,
        })),
    };
    (handle, base().with(layer), opened)
}

/// Build a logger without installing it. Outputs that could not be opened
/// are reported through the caller's current subscriber.
pub fn build(section: &LoggingSection) -> (LoggerHandle, LoggingSubscriber) {
    let (handle, subscriber, opened) = assemble(section);
    report_failures(&opened);
    (handle, subscriber)
}

/// Build a logger and install it as the global default subscriber.
pub fn init(section: &LoggingSection) -> Result<LoggerHandle, LoggingError> {
    let (handle, subscriber, opened) = assemble(section);
    tracing::subscriber::set_global_default(subscriber)?;
    report_failures(&opened);
    Ok(handle)
}

impl LoggerHandle {
    fn lock(&self) -> MutexGuard<'_, LoggerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the active logger. On error the previous logger stays active.
    pub fn reload(&self, section: &LoggingSection) -> Result<(), LoggingError> {
        let (config, opened) = prepare(section);
        let (applied, flushed) = {
            let mut state = self.lock();
            state
                .reload
                .reload(build_layer(&config, opened.sinks.clone()))?;
            let previous = std::mem::replace(&mut state.sinks, opened.sinks.clone());
            // Nothing writes to the previous sinks once the swap returns.
            let flushed = previous.flush();
            state.config = config;
            state.generation += 1;
            (state.config.clone(), flushed)
        };

        if let Err(e) = flushed {
            warn!(error = %e, "failed to flush previous log outputs");
        }
        report_failures(&opened);
        info!(
            level = %applied.level,
            encoding = applied.encoding.as_str(),
            outputs = ?applied.output_names(),
            "logger reloaded"
        );
        Ok(())
    }

    /// Flush buffered output of the active sinks.
    pub fn sync(&self) -> Result<(), LoggingError> {
        let sinks = self.lock().sinks.clone();
        sinks.flush().map_err(LoggingError::Flush)
    }

    /// Flush before shutdown. Logging keeps working afterwards.
    pub fn close(&self) -> Result<(), LoggingError> {
        self.sync()
    }

    pub fn current(&self) -> LoggingConfig {
        self.lock().config.clone()
    }

    /// Number of successful reloads.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }
}
