//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Own the request and function-timing instruments
//! - Record one sample per completed request
//! - Render the Prometheus text exposition for the metrics endpoint
//!
//! # Metrics
//! - `http_request_duration_seconds` (histogram): latency by method, route name
//! - `http_request_count` (counter): requests by status, route name
//! - `function_durations_seconds` (summary): self-instrumented code by pkg, fnc
//!
//! # Design Decisions
//! - The recorder is owned by the registry and never installed globally, so
//!   independent registries (one per test) cannot collide
//! - Instrument names are declared once; a repeated name fails construction
//! - Series updates are atomic per label set, no registry-wide lock
//! - Histogram buckets are fixed when the registry is built
//! - Pending histogram and summary samples are drained on a timer by the
//!   server, whether or not anything scrapes the endpoint

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use metrics::{Counter, Gauge, Histogram, Key, KeyName, Label, Metadata, Recorder, SharedString};
use metrics_exporter_prometheus::{
    BuildError, Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder,
};

pub const REQUEST_DURATION: &str = "http_request_duration_seconds";
pub const REQUEST_COUNT: &str = "http_request_count";
pub const FUNCTION_DURATIONS: &str = "function_durations_seconds";

/// Request latency buckets, in seconds.
pub const REQUEST_DURATION_BUCKETS: [f64; 10] =
    [0.01, 0.025, 0.05, 0.1, 0.2, 0.3, 0.4, 0.5, 1.0, 2.0];

/// Period between upkeep passes over histogram and summary samples.
pub const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

pub const EXPOSITION_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Error type for registry construction.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("instrument `{0}` is already registered")]
    DuplicateInstrument(&'static str),

    #[error("invalid buckets for instrument `{name}`: {source}")]
    Buckets {
        name: &'static str,
        #[source]
        source: BuildError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentKind {
    Counter,
    Gauge,
    Histogram,
    Summary,
}

/// Declaration of a named, labelled collector.
#[derive(Debug, Clone)]
pub struct Instrument {
    pub name: &'static str,
    pub kind: InstrumentKind,
    pub help: &'static str,
    pub labels: &'static [&'static str],
    /// Only meaningful for histograms.
    pub buckets: Vec<f64>,
}

impl Instrument {
    pub fn counter(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self::new(name, InstrumentKind::Counter, help, labels, Vec::new())
    }

    pub fn gauge(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self::new(name, InstrumentKind::Gauge, help, labels, Vec::new())
    }

    pub fn histogram(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
        buckets: &[f64],
    ) -> Self {
        Self::new(name, InstrumentKind::Histogram, help, labels, buckets.to_vec())
    }

    /// Quantile summary; rendered with the exporter's default quantiles.
    pub fn summary(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Self {
        Self::new(name, InstrumentKind::Summary, help, labels, Vec::new())
    }

    fn new(
        name: &'static str,
        kind: InstrumentKind,
        help: &'static str,
        labels: &'static [&'static str],
        buckets: Vec<f64>,
    ) -> Self {
        Self { name, kind, help, labels, buckets }
    }
}

/// The three instruments every service carries.
pub fn standard_instruments() -> Vec<Instrument> {
    vec![
        Instrument::histogram(
            REQUEST_DURATION,
            "Request duration seconds for HTTP Request",
            &["method", "name"],
            &REQUEST_DURATION_BUCKETS,
        ),
        Instrument::counter(REQUEST_COUNT, "Total number of HTTP requests", &["status", "name"]),
        Instrument::summary(
            FUNCTION_DURATIONS,
            "Elapsed time of instrumented functions",
            &["pkg", "fnc"],
        ),
    ]
}

/// Collects instrument declarations before the recorder is built.
#[derive(Debug, Clone)]
pub struct MetricsRegistryBuilder {
    instruments: Vec<Instrument>,
}

impl MetricsRegistryBuilder {
    /// Declare an additional instrument.
    pub fn instrument(mut self, instrument: Instrument) -> Self {
        self.instruments.push(instrument);
        self
    }

    /// Build the registry, rejecting repeated names and invalid buckets.
    pub fn build(self) -> Result<MetricsRegistry, MetricsError> {
        let mut declared: HashMap<&'static str, Instrument> = HashMap::new();
        let mut prometheus = PrometheusBuilder::new();

        for instrument in &self.instruments {
            if declared.contains_key(instrument.name) {
                return Err(MetricsError::DuplicateInstrument(instrument.name));
            }
            if instrument.kind == InstrumentKind::Histogram {
                prometheus = prometheus
                    .set_buckets_for_metric(
                        Matcher::Full(instrument.name.to_string()),
                        &instrument.buckets,
                    )
                    .map_err(|source| MetricsError::Buckets {
                        name: instrument.name,
                        source,
                    })?;
            }
            declared.insert(instrument.name, instrument.clone());
        }

        let recorder = prometheus.build_recorder();
        let handle = recorder.handle();

        for instrument in &self.instruments {
            let name = KeyName::from(instrument.name);
            let help = SharedString::from(instrument.help);
            match instrument.kind {
                InstrumentKind::Counter => recorder.describe_counter(name, None, help),
                InstrumentKind::Gauge => recorder.describe_gauge(name, None, help),
                InstrumentKind::Histogram | InstrumentKind::Summary => {
                    recorder.describe_histogram(name, None, help)
                }
            }
        }

        tracing::debug!(instruments = declared.len(), "Metrics registry built");

        Ok(MetricsRegistry {
            recorder,
            handle,
            instruments: declared,
        })
    }
}

/// Process-wide instrument holder, shared as `Arc<MetricsRegistry>`.
pub struct MetricsRegistry {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
    instruments: HashMap<&'static str, Instrument>,
}

impl fmt::Debug for MetricsRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.instruments.keys().collect();
        names.sort();
        f.debug_struct("MetricsRegistry")
            .field("instruments", &names)
            .finish()
    }
}

impl MetricsRegistry {
    /// Registry carrying only the standard instruments.
    pub fn new() -> Result<Self, MetricsError> {
        Self::builder().build()
    }

    /// Builder pre-loaded with the standard instruments.
    pub fn builder() -> MetricsRegistryBuilder {
        MetricsRegistryBuilder {
            instruments: standard_instruments(),
        }
    }

    /// Record one completed request.
    pub fn record_request(&self, elapsed: Duration, status: u16, method: &str, route_name: &str) {
        let duration = Key::from_parts(
            REQUEST_DURATION,
            vec![
                Label::new("method", method.to_owned()),
                Label::new("name", route_name.to_owned()),
            ],
        );
        let count = Key::from_parts(
            REQUEST_COUNT,
            vec![
                Label::new("status", status.to_string()),
                Label::new("name", route_name.to_owned()),
            ],
        );

        self.recorder
            .register_histogram(&duration, &metadata())
            .record(elapsed.as_secs_f64());
        self.recorder.register_counter(&count, &metadata()).increment(1);
    }

    /// Record the elapsed time of an instrumented function.
    pub fn record_function_duration(&self, elapsed: Duration, component: &str, function: &str) {
        let key = Key::from_parts(
            FUNCTION_DURATIONS,
            vec![
                Label::new("pkg", component.to_owned()),
                Label::new("fnc", function.to_owned()),
            ],
        );
        self.recorder
            .register_histogram(&key, &metadata())
            .record(elapsed.as_secs_f64());
    }

    /// Start timing a function; the sample is recorded when the guard drops.
    pub fn time_function(
        &self,
        component: impl Into<String>,
        function: impl Into<String>,
    ) -> FunctionTimer<'_> {
        FunctionTimer {
            registry: self,
            component: component.into(),
            function: function.into(),
            start: Instant::now(),
        }
    }

    /// Handle to a declared counter.
    pub fn counter(&self, name: &str, labels: &[(&str, &str)]) -> Option<Counter> {
        let key = self.key_for(name, InstrumentKind::Counter, labels)?;
        Some(self.recorder.register_counter(&key, &metadata()))
    }

    /// Handle to a declared gauge.
    pub fn gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<Gauge> {
        let key = self.key_for(name, InstrumentKind::Gauge, labels)?;
        Some(self.recorder.register_gauge(&key, &metadata()))
    }

    /// Handle to a declared histogram or summary.
    pub fn histogram(&self, name: &str, labels: &[(&str, &str)]) -> Option<Histogram> {
        let instrument = self.instruments.get(name)?;
        let key = match instrument.kind {
            InstrumentKind::Histogram | InstrumentKind::Summary => {
                Key::from_parts(instrument.name, to_labels(labels))
            }
            _ => return None,
        };
        Some(self.recorder.register_histogram(&key, &metadata()))
    }

    /// Whether an instrument with this name was declared.
    pub fn is_registered(&self, name: &str) -> bool {
        self.instruments.contains_key(name)
    }

    /// Render every instrument in the Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Fold pending histogram and summary samples into their aggregates.
    pub fn run_upkeep(&self) {
        self.handle.run_upkeep();
    }

    /// Run upkeep every `period` until `stop` resolves. Returns the number of passes.
    pub async fn run_upkeep_every(
        &self,
        period: Duration,
        stop: impl Future<Output = ()>,
    ) -> u64 {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tokio::pin!(stop);

        let mut passes = 0;
        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = ticker.tick() => {
                    self.run_upkeep();
                    passes += 1;
                }
            }
        }
        passes
    }

    fn key_for(&self, name: &str, kind: InstrumentKind, labels: &[(&str, &str)]) -> Option<Key> {
        let instrument = self.instruments.get(name)?;
        if instrument.kind != kind {
            return None;
        }
        Some(Key::from_parts(instrument.name, to_labels(labels)))
    }
}

fn metadata() -> Metadata<'static> {
    Metadata::new(module_path!(), metrics::Level::INFO, Some(module_path!()))
}

fn to_labels(labels: &[(&str, &str)]) -> Vec<Label> {
    labels
        .iter()
        .map(|(k, v)| Label::new(k.to_string(), v.to_string()))
        .collect()
}

/// RAII guard that records a function duration when dropped.
#[derive(Debug)]
pub struct FunctionTimer<'a> {
    registry: &'a MetricsRegistry,
    component: String,
    function: String,
    start: Instant,
}

impl Drop for FunctionTimer<'_> {
    fn drop(&mut self) {
        self.registry
            .record_function_duration(self.start.elapsed(), &self.component, &self.function);
    }
}

/// Router serving the exposition on `path`. Mounted on its own listener.
pub fn metrics_router(path: &str, registry: Arc<MetricsRegistry>) -> Router {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    };

    Router::new()
        .route(&path, get(metrics_handler))
        .with_state(registry)
}

async fn metrics_handler(State(registry): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)],
        registry.render(),
    )
}
