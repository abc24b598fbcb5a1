//! Pipeline counters and the optional Prometheus exporter.

use std::net::SocketAddr;
use std::sync::Once;

use tracing::{info, warn};

use crate::models::CraftKind;

static INIT: Once = Once::new();

/// Install the Prometheus exporter on `port`. Idempotent; later calls are ignored.
pub fn init_metrics(port: u16) {
    INIT.call_once(|| {
        let addr: SocketAddr = ([0, 0, 0, 0], port).into();
        let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
        match builder.install() {
            Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
            Err(e) => warn!("Prometheus exporter install failed: {}", e),
        }
    });
}

pub fn object_fetched() {
    metrics::counter!("craft_objects_fetched_total").increment(1);
}

pub fn fetch_failed() {
    metrics::counter!("craft_fetch_errors_total").increment(1);
}

pub fn batch_unrecognized() {
    metrics::counter!("craft_batches_unrecognized_total").increment(1);
}

pub fn rows_validated(kind: CraftKind, accepted: usize, rejected: usize) {
    metrics::counter!("craft_rows_validated_total", "kind" => kind.name()).increment(accepted as u64);
    metrics::counter!("craft_rows_rejected_total", "kind" => kind.name()).increment(rejected as u64);
}

pub fn stage_duration(stage: &'static str, secs: f64) {
    metrics::histogram!("craft_stage_duration_seconds", "stage" => stage).record(secs);
}
