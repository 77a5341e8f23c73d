//! Runnable demonstration of `corral-core`: parses a master address and an
//! optional `DriverConfig` TOML file, wires up a `SchedulerDriver` around a
//! toy scheduler that declines every offer it receives, and runs it to
//! completion. Not part of the core (`spec.md` §1: "no CLI") — this exists
//! purely to exercise the library end to end, the way `bin/tempo` exercises
//! `commonware-node`.

use std::{collections::BTreeMap, net::SocketAddr, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use clap::Parser;
use corral_core::{
    ActorRuntime, DriverConfig, LocalActorSystem, Scheduler, SchedulerDriver, StaticDetector,
};
use corral_proto::{
    Address, ExecutorId, Filters, FrameworkId, FrameworkInfo, MasterInfo, Offer, OfferId, SlaveId,
    TaskStatus,
};
use eyre::WrapErr as _;
use tracing_subscriber::{EnvFilter, prelude::*};

#[derive(Debug, clap::Parser)]
#[command(author, version, about = "runs a corral scheduler driver against a mock or real master")]
struct Args {
    /// Address of the master (or its detector's notion of one), `ip:port/name`.
    #[arg(long, value_name = "ADDRESS")]
    master: String,

    /// Framework id to reregister as, if this is a failover incarnation.
    #[arg(long, value_name = "ID")]
    framework_id: Option<String>,

    /// Human-readable name advertised in `FrameworkInfo`.
    #[arg(long, default_value = "corral-agent-demo")]
    framework_name: String,

    /// Optional TOML file overlaying `DriverConfig` defaults.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Listen address for the Prometheus `/metrics` endpoint.
    #[arg(long, default_value = "127.0.0.1:9090")]
    metrics_listen: SocketAddr,

    /// Tracing filter directives, same shape as `EnvFilter`.
    #[arg(long, default_value = "info")]
    log_filter: String,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::builder()
        .parse(&args.log_filter)
        .wrap_err("failed to parse --log-filter directives")?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    let config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .wrap_err_with(|| format!("failed reading driver config from `{}`", path.display()))?;
            DriverConfig::from_toml(&raw)
                .wrap_err_with(|| format!("failed parsing driver config from `{}`", path.display()))?
        }
        None => DriverConfig::default(),
    };

    let framework = FrameworkInfo {
        id: args.framework_id.map(FrameworkId::from),
        user: String::new(),
        name: args.framework_name,
        hostname: String::new(),
        principal: None,
        webui_url: None,
        extra: BTreeMap::new(),
    };

    let runtime: Arc<dyn ActorRuntime> = Arc::new(LocalActorSystem::with_capacity(config.mailbox_capacity));
    let self_address = Address::new(
        "127.0.0.1".parse().unwrap(),
        0,
        format!("scheduler-{:08x}@", rand::random::<u32>()),
    );

    let metrics = Arc::new(corral_metrics::SchedulerMetrics::new());
    tokio::spawn(corral_metrics::serve(metrics.clone(), args.metrics_listen));

    let driver = SchedulerDriver::new(
        self_address,
        framework,
        None,
        DecliningScheduler,
        runtime,
        config,
        Some(metrics),
    );

    let shutdown_driver = driver.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c; stopping driver");
            shutdown_driver.stop(false);
        }
    });

    let master_uri = args.master;
    let run_driver = driver.clone();
    let status = tokio::task::spawn_blocking(move || run_driver.run::<StaticDetector>(&master_uri))
        .await
        .wrap_err("driver thread panicked")??;
    tracing::info!(?status, "driver exited");

    Ok(())
}

/// A minimal policy: logs every callback and declines every offer it is
/// handed, the simplest possible `Scheduler` that still exercises the full
/// registration/offer/launch round trip.
struct DecliningScheduler;

#[async_trait]
impl Scheduler for DecliningScheduler {
    async fn registered(
        &mut self,
        _driver: &SchedulerDriver,
        framework_id: FrameworkId,
        master_info: MasterInfo,
    ) {
        tracing::info!(%framework_id, master = %master_info.address, "registered");
    }

    async fn reregistered(&mut self, _driver: &SchedulerDriver, master_info: MasterInfo) {
        tracing::info!(master = %master_info.address, "reregistered");
    }

    async fn disconnected(&mut self, _driver: &SchedulerDriver) {
        tracing::warn!("disconnected from master");
    }

    async fn resource_offers(&mut self, driver: &SchedulerDriver, offers: Vec<Offer>) {
        for offer in offers {
            tracing::info!(offer_id = %offer.id, slave_id = %offer.slave_id, "declining offer");
            driver.decline_offer(offer.id, Filters::default());
        }
    }

    async fn offer_rescinded(&mut self, _driver: &SchedulerDriver, offer_id: OfferId) {
        tracing::info!(%offer_id, "offer rescinded");
    }

    async fn status_update(&mut self, _driver: &SchedulerDriver, status: TaskStatus) {
        tracing::info!(task_id = %status.task_id, state = %status.state, message = %status.message, "status update");
    }

    async fn framework_message(
        &mut self,
        _driver: &SchedulerDriver,
        executor_id: ExecutorId,
        slave_id: SlaveId,
        data: Vec<u8>,
    ) {
        tracing::info!(%executor_id, %slave_id, bytes = data.len(), "framework message");
    }

    async fn slave_lost(&mut self, _driver: &SchedulerDriver, slave_id: SlaveId) {
        tracing::warn!(%slave_id, "slave lost");
    }

    async fn error(&mut self, _driver: &SchedulerDriver, message: String) {
        tracing::error!(%message, "framework error");
    }
}
