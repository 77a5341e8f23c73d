//! Prometheus counters/gauges for the scheduler process, plus the axum
//! `/metrics` endpoint that serves them.
//!
//! Grounded on `commonware-node`'s `src/metrics.rs`: a tiny axum router with
//! a single `/metrics` route that encodes whatever registry it is handed as
//! `text/plain; version=0.0.4`. Unlike that registry (which wraps the
//! commonware runtime's own metrics surface), `corral-core` has no runtime
//! of its own to ask for counters, so this crate owns a `prometheus-client`
//! [`Registry`] directly and hands out pre-registered counters/gauges for
//! `corral-core` to increment inline.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{Response, StatusCode, header},
    routing::get,
};
use prometheus_client::{
    encoding::text::encode,
    metrics::{counter::Counter, gauge::Gauge},
    registry::Registry,
};

/// Every counter/gauge the scheduler process reports. Construct one per
/// driver and pass it to `SchedulerDriver::new`'s `metrics` parameter; each
/// field is independently cheap to clone and increment from the process's
/// single thread.
pub struct SchedulerMetrics {
    registry: Registry,
    /// Successful `FrameworkRegistered` callbacks delivered.
    pub registrations: Counter,
    /// Successful `FrameworkReregistered` callbacks delivered.
    pub reregistrations: Counter,
    /// Registration/reregistration retransmissions sent on the backoff timer.
    pub backoff_retries: Counter,
    /// Offers recorded into the offer table (one increment per offer, not
    /// per `ResourceOffers` message).
    pub offers_tracked: Counter,
    /// `StatusUpdateAcknowledgementMessage`s emitted.
    pub acknowledgements_sent: Counter,
    /// Offer-table entries currently outstanding (not yet rescinded or
    /// consumed by a launch).
    pub offers_open: Gauge,
}

impl Default for SchedulerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let registrations = Counter::default();
        registry.register(
            "corral_registrations",
            "Successful framework registrations",
            registrations.clone(),
        );

        let reregistrations = Counter::default();
        registry.register(
            "corral_reregistrations",
            "Successful framework reregistrations",
            reregistrations.clone(),
        );

        let backoff_retries = Counter::default();
        registry.register(
            "corral_registration_backoff_retries",
            "Registration/reregistration messages retransmitted by the backoff timer",
            backoff_retries.clone(),
        );

        let offers_tracked = Counter::default();
        registry.register(
            "corral_offers_tracked",
            "Offers inserted into the offer table",
            offers_tracked.clone(),
        );

        let acknowledgements_sent = Counter::default();
        registry.register(
            "corral_status_update_acks_sent",
            "StatusUpdateAcknowledgement messages emitted",
            acknowledgements_sent.clone(),
        );

        let offers_open = Gauge::default();
        registry.register(
            "corral_offers_open",
            "Offer-table entries not yet rescinded or consumed",
            offers_open.clone(),
        );

        Self {
            registry,
            registrations,
            reregistrations,
            backoff_retries,
            offers_tracked,
            acknowledgements_sent,
            offers_open,
        }
    }

    /// Renders the registry in Prometheus text exposition format.
    pub fn encode(&self) -> String {
        let mut buf = String::new();
        encode(&mut buf, &self.registry).expect("prometheus-client text encoding is infallible");
        buf
    }
}

/// Spawns a bare axum server exposing `metrics` at `GET /metrics` on
/// `listen_addr`. Mirrors `commonware-node::metrics::install`'s shape; the
/// caller holds the returned handle for the lifetime of the process.
pub fn serve(metrics: Arc<SchedulerMetrics>, listen_addr: SocketAddr) -> tokio::task::JoinHandle<std::io::Result<()>> {
    tokio::spawn(async move {
        let listener = tokio::net::TcpListener::bind(listen_addr).await?;
        let app = Router::new()
            .route("/metrics", get(metrics_handler))
            .with_state(metrics);
        tracing::info!(%listen_addr, "metrics endpoint listening");
        axum::serve(listener, app.into_make_service()).await
    })
}

async fn metrics_handler(State(metrics): State<Arc<SchedulerMetrics>>) -> Response<Body> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Body::from(metrics.encode()))
        .expect("response builder with a fixed set of valid headers cannot fail")
}
