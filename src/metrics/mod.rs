use std::sync::Once;

use autometrics::prometheus_exporter;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use tokio::sync::watch;
use tracing::error;
use tracing::info;
use warp::Filter;
use warp::Rejection;
use warp::Reply;

lazy_static! {
    pub static ref VOTE_OPERATIONS_COUNTER: IntCounterVec = IntCounterVec::new(
        Opts::new("vote_operations_total", "Committed ledger mutations by action"),
        &["action"]
    )
    .expect("metric can not be created");

    pub static ref TRANSACTION_CONFLICT_COUNTER: IntCounterVec = IntCounterVec::new(
        Opts::new("transaction_conflicts_total", "Commit precondition failures by collection"),
        &["collection"]
    )
    .expect("metric can not be created");

    pub static ref AUDIT_FALLBACK_COUNTER: IntCounter = IntCounter::new(
        "audit_fallback_total",
        "Audit entries written to the fallback sink"
    )
    .expect("metric can not be created");

    pub static ref AUDIT_DROPPED_COUNTER: IntCounter = IntCounter::new(
        "audit_dropped_total",
        "Audit entries lost after every sink failed"
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER_ONCE: Once = Once::new();

fn register_custom_metrics(registry: &Registry) {
    let collectors: [Box<dyn prometheus::core::Collector>; 4] = [
        Box::new(VOTE_OPERATIONS_COUNTER.clone()),
        Box::new(TRANSACTION_CONFLICT_COUNTER.clone()),
        Box::new(AUDIT_FALLBACK_COUNTER.clone()),
        Box::new(AUDIT_DROPPED_COUNTER.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            error!("collector can not be registered: {}", e);
        }
    }
}

/// Registers the crate counters with [`REGISTRY`] and installs the
/// autometrics exporter. Later calls are no-ops.
pub fn init_metrics() {
    REGISTER_ONCE.call_once(|| {
        register_custom_metrics(&REGISTRY);
        if let Err(e) = prometheus_exporter::try_init() {
            error!("autometrics exporter can not be initialized: {}", e);
        }
    });
}

pub async fn start_server(
    port: u16,
    mut shutdown_signal: watch::Receiver<()>,
) {
    init_metrics();

    let metrics_route = warp::path!("metrics").and_then(metrics_handler);

    info!(port, "metrics server listening");
    let (_, server) =
        warp::serve(metrics_route).bind_with_graceful_shutdown(([0, 0, 0, 0], port), async move {
            let _ = shutdown_signal.changed().await;
        });
    server.await;
}

async fn metrics_handler() -> Result<impl Reply, Rejection> {
    Ok(encode_metrics())
}

/// Crate counters followed by the autometrics series, in the Prometheus
/// text format.
pub fn encode_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    };
    let mut res = match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    };

    res.push_str(&get_metrics_body());
    res
}

/// Export metrics for Prometheus to scrape
pub fn get_metrics_body() -> String {
    prometheus_exporter::encode_http_response().into_body()
}
