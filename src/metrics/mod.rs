//! Per-handle prometheus metrics.
//!
//! Every cluster runtime owns its own [`Registry`], prefixed with
//! `metrics.namespace` and labelled with the handle name, so several handles
//! in one process never collide.


use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::Encoder;
use prometheus::Histogram;
use prometheus::HistogramOpts;
use prometheus::IntCounter;
use prometheus::IntCounterVec;
use prometheus::IntGauge;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;
use tracing::error;

use crate::Error;
use crate::Host;
use crate::LatencyTracker;
use crate::Result;
use crate::Statement;

lazy_static! {
    /// 0.5ms .. ~16s
    static ref LATENCY_BUCKETS: Vec<f64> =
        exponential_buckets(0.0005, 2.0, 16).expect("latency buckets are valid");
}

#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    registry: Registry,
    known_hosts: IntGauge,
    connected_to_hosts: IntGauge,
    open_connections: IntGauge,
    requests: IntCounter,
    errors: IntCounterVec,
    request_latency: Histogram,
}

impl Metrics {
    pub(crate) fn new(
        namespace: &str,
        cluster_name: &str,
    ) -> Result<Self> {
        let labels = HashMap::from([("cluster".to_string(), cluster_name.to_string())]);
        let registry = Registry::new_custom(Some(namespace.to_string()), Some(labels))?;

        let known_hosts = IntGauge::new("known_hosts", "Number of hosts known to the cluster metadata")?;
        let connected_to_hosts = IntGauge::new("connected_to_hosts", "Number of hosts currently considered up")?;
        let open_connections = IntGauge::new("open_connections", "Connections open across all session pools")?;
        let requests = IntCounter::new("requests_total", "Statements attempted against a host")?;
        let errors = IntCounterVec::new(Opts::new("errors_total", "Failed statement attempts by kind"), &["kind"])?;
        let request_latency = Histogram::with_opts(
            HistogramOpts::new("request_latency_seconds", "Latency of statement attempts")
                .buckets(LATENCY_BUCKETS.clone()),
        )?;

        registry.register(Box::new(known_hosts.clone()))?;
        registry.register(Box::new(connected_to_hosts.clone()))?;
        registry.register(Box::new(open_connections.clone()))?;
        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(errors.clone()))?;
        registry.register(Box::new(request_latency.clone()))?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                registry,
                known_hosts,
                connected_to_hosts,
                open_connections,
                requests,
                errors,
                request_latency,
            }),
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    pub fn known_hosts(&self) -> i64 {
        self.inner.known_hosts.get()
    }

    pub fn connected_to_hosts(&self) -> i64 {
        self.inner.connected_to_hosts.get()
    }

    pub fn open_connections(&self) -> i64 {
        self.inner.open_connections.get()
    }

    pub fn requests(&self) -> u64 {
        self.inner.requests.get()
    }

    pub fn errors(
        &self,
        kind: &str,
    ) -> u64 {
        self.inner.errors.with_label_values(&[kind]).get()
    }

    pub fn request_latency_samples(&self) -> u64 {
        self.inner.request_latency.get_sample_count()
    }

    /// Text exposition format of every metric of this handle
    pub fn export(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.inner.registry.gather(), &mut buffer) {
            error!("could not encode cluster metrics: {}", e);
        }
        String::from_utf8(buffer).unwrap_or_default()
    }

    pub(crate) fn set_hosts(
        &self,
        known: usize,
        up: usize,
    ) {
        self.inner.known_hosts.set(known as i64);
        self.inner.connected_to_hosts.set(up as i64);
    }

    pub(crate) fn connection_opened(&self) {
        self.inner.open_connections.inc();
    }

    pub(crate) fn connection_closed(&self) {
        self.inner.open_connections.dec();
    }
}

impl LatencyTracker for Metrics {
    fn update(
        &self,
        _host: &Host,
        _statement: &Statement,
        error: Option<&Error>,
        latency: Duration,
    ) {
        self.inner.requests.inc();
        if let Some(e) = error {
            self.inner.errors.with_label_values(&[e.kind()]).inc();
        }
        self.inner.request_latency.observe(latency.as_secs_f64());
    }
}

impl std::fmt::Debug for Metrics {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("known_hosts", &self.known_hosts())
            .field("open_connections", &self.open_connections())
            .field("requests", &self.requests())
            .finish()
    }
}
