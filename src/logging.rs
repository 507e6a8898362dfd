//! Structured logging setup.
//!
//! `tracing` events with structured fields are emitted at every dispatch stage.
//! This module installs the subscriber: an `EnvFilter`, an optional sampling
//! layer and a JSON or pretty formatter, written synchronously or through a
//! `tracing-appender` non-blocking writer.
//!
//! | Variable | Values | Default |
//! |----------|--------|---------|
//! | `WAYPOINT_LOG_LEVEL` | trace/debug/info/warn/error | `info` |
//! | `WAYPOINT_LOG_FORMAT` | json/pretty | `json` |
//! | `WAYPOINT_LOG_ASYNC` | true/false | `true` |
//! | `WAYPOINT_LOG_TARGET_FILTER` | comma-separated directives | none |
//! | `WAYPOINT_LOG_INCLUDE_LOCATION` | true/false | `false` |
//! | `WAYPOINT_LOG_SAMPLING_MODE` | all/error-only/sampled | `all` |
//! | `WAYPOINT_LOG_SAMPLING_RATE` | 0.0-1.0 | `1.0` |
//!
//! `RUST_LOG`, when set, replaces the level.

use anyhow::{Context, Result};
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::subscriber::Interest;
use tracing::{Level, Metadata, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Context as LayerContext, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Which events reach the formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    All,
    /// WARN and ERROR only.
    ErrorOnly,
    /// Every WARN and ERROR, a fraction of everything else.
    Sampled,
}

impl SamplingMode {
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "error-only" | "error_only" => SamplingMode::ErrorOnly,
            "sampled" => SamplingMode::Sampled,
            _ => SamplingMode::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    pub log_level: String,
    pub format: LogFormat,
    pub sampling_mode: SamplingMode,
    /// Fraction of non-error events kept in `Sampled` mode.
    pub sampling_rate: f64,
    pub async_logging: bool,
    pub target_filter: Option<String>,
    /// Include file and line (dev only).
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            sampling_mode: SamplingMode::All,
            sampling_rate: 1.0,
            async_logging: true,
            target_filter: None,
            include_location: false,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl LogConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            log_level: lookup("WAYPOINT_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: lookup("WAYPOINT_LOG_FORMAT").map_or(defaults.format, |s| LogFormat::parse(&s)),
            sampling_mode: lookup("WAYPOINT_LOG_SAMPLING_MODE")
                .map_or(defaults.sampling_mode, |s| SamplingMode::parse(&s)),
            sampling_rate: lookup("WAYPOINT_LOG_SAMPLING_RATE")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.sampling_rate),
            async_logging: lookup("WAYPOINT_LOG_ASYNC")
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.async_logging),
            target_filter: lookup("WAYPOINT_LOG_TARGET_FILTER").filter(|s| !s.trim().is_empty()),
            include_location: lookup("WAYPOINT_LOG_INCLUDE_LOCATION")
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.include_location),
        }
    }

    /// Verbose, synchronous, human-readable output.
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            include_location: true,
            ..Self::default()
        }
    }

    fn level(&self) -> Level {
        match self.log_level.trim().to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

fn is_severe(metadata: &Metadata<'_>) -> bool {
    matches!(*metadata.level(), Level::WARN | Level::ERROR)
}

/// Drops a share of non-error events.
pub struct SamplingLayer {
    mode: SamplingMode,
    sampling_rate: f64,
    counter: AtomicU64,
}

impl SamplingLayer {
    #[must_use]
    pub fn new(mode: SamplingMode, sampling_rate: f64) -> Self {
        Self {
            mode,
            sampling_rate: sampling_rate.clamp(0.0, 1.0),
            counter: AtomicU64::new(0),
        }
    }

    fn should_sample(&self, metadata: &Metadata<'_>) -> bool {
        let severe = is_severe(metadata);
        match self.mode {
            SamplingMode::All => true,
            SamplingMode::ErrorOnly => severe,
            SamplingMode::Sampled => {
                if severe {
                    return true;
                }
                if self.sampling_rate <= 0.0 {
                    return false;
                }
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let interval = (1.0 / self.sampling_rate).round() as u64;
                let count = self.counter.fetch_add(1, Ordering::Relaxed);
                interval > 0 && count % interval == 0
            }
        }
    }
}

impl<S> Layer<S> for SamplingLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn register_callsite(&self, metadata: &'static Metadata<'static>) -> Interest {
        if !metadata.is_event() || is_severe(metadata) {
            return Interest::always();
        }
        match self.mode {
            SamplingMode::All => Interest::always(),
            SamplingMode::ErrorOnly => Interest::never(),
            // Cached interest would keep all or none of a callsite's events.
            SamplingMode::Sampled => Interest::sometimes(),
        }
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: LayerContext<'_, S>) -> bool {
        // Spans always pass; sampling applies to events.
        !metadata.is_event() || self.should_sample(metadata)
    }
}

fn build_filter(config: &LogConfig) -> EnvFilter {
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level().as_str()));

    // minihttp logs every client disconnect; keep warnings only.
    if let Ok(directive) = "may_minihttp=warn".parse() {
        filter = filter.add_directive(directive);
    }
    if let Some(targets) = &config.target_filter {
        for directive in targets.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            match directive.parse() {
                Ok(d) => filter = filter.add_directive(d),
                Err(err) => eprintln!("Ignoring invalid log filter directive '{directive}': {err}"),
            }
        }
    }
    filter
}

/// Install the global subscriber.
///
/// With async logging the returned guard owns the writer thread; keep it alive
/// until shutdown so buffered lines are flushed.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let (writer, guard) = if config.async_logging {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(writer), Some(guard))
    } else {
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stdout), None)
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(build_filter(config))
        .with(SamplingLayer::new(config.sampling_mode, config.sampling_rate))
        .with(fmt_layer)
        .try_init()
        .context("failed to install the tracing subscriber")?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use tracing::callsite::{Callsite, Identifier};
    use tracing::field::FieldSet;
    use tracing::metadata::Kind;

    struct NullCallsite;
    impl Callsite for NullCallsite {
        fn set_interest(&self, _interest: Interest) {}
        fn metadata(&self) -> &Metadata<'_> {
            unimplemented!()
        }
    }
    static CALLSITE: NullCallsite = NullCallsite;

    fn event(level: Level) -> Metadata<'static> {
        Metadata::new(
            "event",
            "waypoint::test",
            level,
            None,
            None,
            None,
            FieldSet::new(&[], Identifier(&CALLSITE)),
            Kind::EVENT,
        )
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("WAYPOINT_LOG_LEVEL", "debug"),
            ("WAYPOINT_LOG_FORMAT", "PRETTY"),
            ("WAYPOINT_LOG_ASYNC", "off"),
            ("WAYPOINT_LOG_SAMPLING_MODE", "error-only"),
            ("WAYPOINT_LOG_TARGET_FILTER", "waypoint::router=trace"),
            ("WAYPOINT_LOG_INCLUDE_LOCATION", "1"),
        ]
        .into_iter()
        .collect();
        let config = LogConfig::from_lookup(|k| vars.get(k).map(|v| (*v).to_string()));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.format, LogFormat::Pretty);
        assert!(!config.async_logging);
        assert_eq!(config.sampling_mode, SamplingMode::ErrorOnly);
        assert_eq!(config.target_filter.as_deref(), Some("waypoint::router=trace"));
        assert!(config.include_location);
    }

    #[test]
    fn test_config_defaults() {
        let config = LogConfig::from_lookup(|_| None);
        assert_eq!(config, LogConfig::default());
        assert_eq!(config.level(), Level::INFO);
        assert_eq!(LogConfig::default_dev().level(), Level::DEBUG);
    }

    #[test]
    fn test_parsers() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("whatever"), LogFormat::Json);
        assert_eq!(SamplingMode::parse("error_only"), SamplingMode::ErrorOnly);
        assert_eq!(SamplingMode::parse("sampled"), SamplingMode::Sampled);
        assert_eq!(SamplingMode::parse(""), SamplingMode::All);
    }

    #[test]
    fn test_error_only_sampling() {
        let layer = SamplingLayer::new(SamplingMode::ErrorOnly, 1.0);
        assert!(!layer.should_sample(&event(Level::INFO)));
        assert!(layer.should_sample(&event(Level::WARN)));
        assert!(layer.should_sample(&event(Level::ERROR)));
    }

    /// Counts the events that reach it.
    struct EventCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for EventCounter {
        fn on_event(&self, _event: &tracing::Event<'_>, _ctx: LayerContext<'_, S>) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn events_kept(layer: SamplingLayer, emit: impl Fn()) -> usize {
        let kept = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry()
            .with(layer)
            .with(EventCounter(Arc::clone(&kept)));
        tracing::subscriber::with_default(subscriber, emit);
        kept.load(Ordering::Relaxed)
    }

    #[test]
    fn test_sampled_mode_samples_one_callsite() {
        let kept = events_kept(SamplingLayer::new(SamplingMode::Sampled, 0.5), || {
            for i in 0..100 {
                tracing::info!(i, "sampled event");
            }
        });
        assert_eq!(kept, 50);

        let kept = events_kept(SamplingLayer::new(SamplingMode::Sampled, 0.5), || {
            for i in 0..10 {
                tracing::warn!(i, "severe event");
            }
        });
        assert_eq!(kept, 10);
    }

    #[test]
    fn test_error_only_through_subscriber() {
        let kept = events_kept(SamplingLayer::new(SamplingMode::ErrorOnly, 1.0), || {
            for i in 0..10 {
                tracing::info!(i, "quiet event");
                tracing::error!(i, "loud event");
            }
        });
        assert_eq!(kept, 10);
    }

    #[test]
    fn test_sampled_mode_keeps_rate() {
        let layer = SamplingLayer::new(SamplingMode::Sampled, 0.25);
        let kept = (0..100)
            .filter(|_| layer.should_sample(&event(Level::DEBUG)))
            .count();
        assert_eq!(kept, 25);
        assert!((0..10).all(|_| layer.should_sample(&event(Level::ERROR))));

        let silent = SamplingLayer::new(SamplingMode::Sampled, -1.0);
        assert!(!silent.should_sample(&event(Level::INFO)));
    }
}
