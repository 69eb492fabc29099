//! Shared utilities for integration tests.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use instrumented_router::{Config, HttpServer, MetricsRegistry, RouteTable, Shutdown};
use tokio::net::TcpListener;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

/// A service running on ephemeral ports. Shuts down when dropped.
#[allow(dead_code)]
pub struct TestService {
    pub addr: SocketAddr,
    pub metrics_addr: SocketAddr,
    pub metrics: Arc<MetricsRegistry>,
    pub config: Arc<Config>,
    shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestService {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn metrics_url(&self) -> String {
        format!("http://{}{}", self.metrics_addr, self.config.metrics_path)
    }
}

impl Drop for TestService {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a service with default config on two ephemeral ports.
#[allow(dead_code)]
pub async fn start_service(routes: RouteTable) -> TestService {
    start_service_with(Config::default(), routes).await
}

/// Start a service; listener ports in `config` are ignored.
pub async fn start_service_with(config: Config, routes: RouteTable) -> TestService {
    let config = Arc::new(config);
    let metrics = Arc::new(MetricsRegistry::new().unwrap());
    let server = HttpServer::new(config.clone(), routes, metrics.clone()).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let metrics_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let metrics_addr = metrics_listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, metrics_listener, server_shutdown).await;
    });

    TestService {
        addr,
        metrics_addr,
        metrics,
        config,
        shutdown,
    }
}

#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Value of the first exposition sample named `name` whose line carries all `labels`.
#[allow(dead_code)]
pub fn sample(text: &str, name: &str, labels: &[&str]) -> Option<f64> {
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .find(|line| {
            line.strip_prefix(name)
                .map(|rest| rest.starts_with('{'))
                .unwrap_or(false)
                && labels.iter().all(|label| line.contains(label))
        })
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}

/// One captured log event.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: HashMap<String, String>,
}

#[allow(dead_code)]
impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Log events recorded by [`capture_logs`].
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<CapturedEvent>>>);

#[allow(dead_code)]
impl CapturedLogs {
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.0.lock().unwrap().clone()
    }

    /// Per-request entries written by the dispatcher.
    pub fn request_entries(&self) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.field("log_type") == Some("request.run"))
            .collect()
    }

    pub fn at_level(&self, level: Level) -> Vec<CapturedEvent> {
        self.events().into_iter().filter(|e| e.level == level).collect()
    }
}

struct CaptureLayer(CapturedLogs);

struct FieldVisitor<'a>(&'a mut HashMap<String, String>);

impl Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldVisitor(&mut fields));
        (self.0).0.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields,
        });
    }
}

/// Capture every event on the current thread until the guard drops.
///
/// Use with a current-thread runtime so spawned tasks share the thread.
#[allow(dead_code)]
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::registry().with(CaptureLayer(logs.clone()));
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
