use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use corral_proto::{
    Address, Credential, ExecutorId, Filters, FrameworkInfo, Message, Offer, OfferId,
    ResourceRequest, SlaveId, TaskId, TaskInfo, TaskStatus,
};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::{Command, SchedulerMailbox};
use crate::{
    config::DriverConfig,
    detector::{DetectorOutcome, MasterDetector},
    driver::SchedulerDriver,
    error::MalformedTaskReason,
    runtime::{ActorRuntime, Mailbox},
    scheduler::Scheduler,
};

/// The single-threaded actor owning all connection, registration, failover,
/// and offer/slave bookkeeping state (`spec.md` §4.1). Every method that
/// touches `offer_table`, `slave_cache`, or the event flags runs on this
/// actor's task and nowhere else.
pub(crate) struct SchedulerProcess {
    self_address: Address,
    runtime: Arc<dyn ActorRuntime>,
    detector: Arc<dyn MasterDetector>,
    scheduler: Box<dyn Scheduler>,
    driver: SchedulerDriver,
    config: DriverConfig,

    framework: FrameworkInfo,
    #[allow(dead_code)] // stored per spec.md §3 as the named extension point; never forwarded.
    credential: Option<Credential>,

    master: Option<Address>,
    connected: bool,
    failover: bool,
    aborted: Arc<AtomicBool>,

    offer_table: HashMap<OfferId, HashMap<SlaveId, Address>>,
    slave_cache: HashMap<SlaveId, Address>,

    commands: mpsc::UnboundedReceiver<Command>,
    self_mailbox: SchedulerMailbox,
    inbound: Mailbox,
    metrics: Option<Arc<corral_metrics::SchedulerMetrics>>,
}

#[allow(clippy::too_many_arguments)]
impl SchedulerProcess {
    pub(crate) fn new(
        self_address: Address,
        runtime: Arc<dyn ActorRuntime>,
        detector: Arc<dyn MasterDetector>,
        scheduler: Box<dyn Scheduler>,
        driver: SchedulerDriver,
        config: DriverConfig,
        framework: FrameworkInfo,
        credential: Option<Credential>,
        commands: mpsc::UnboundedReceiver<Command>,
        self_mailbox: SchedulerMailbox,
        aborted: Arc<AtomicBool>,
        metrics: Option<Arc<corral_metrics::SchedulerMetrics>>,
    ) -> Self {
        let inbound = runtime.register(self_address.clone());
        let failover = framework.id.is_some();
        Self {
            self_address,
            runtime,
            detector,
            scheduler,
            driver,
            config,
            framework,
            credential,
            master: None,
            connected: false,
            failover,
            aborted,
            offer_table: HashMap::new(),
            slave_cache: HashMap::new(),
            commands,
            self_mailbox,
            inbound,
            metrics,
        }
    }

    pub(crate) async fn run(mut self) {
        self.handle_detect();
        loop {
            tokio::select! {
                biased;

                command = self.commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => break,
                    }
                }
                inbound = self.inbound.recv() => {
                    match inbound {
                        Some((from, message)) => self.handle_inbound(from, message).await,
                        None => break,
                    }
                }
            }
        }
        self.runtime.unregister(&self.self_address);
    }

    fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }

    fn origin_ok(&self, from: &Address) -> bool {
        self.master.as_ref() == Some(from)
    }

    fn send_to_master(&self, message: Message) {
        match &self.master {
            Some(master) => self.runtime.send(self.self_address.clone(), master, message),
            None => warn!(?message, "dropping outbound message: no known master"),
        }
    }

    // --- outbound commands (spec.md §4.1 "Outbound commands") ---

    #[instrument(skip(self))]
    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Detect => self.handle_detect(),
            Command::Detected(outcome) => self.handle_detected(outcome).await,
            Command::MasterExited(address) => self.handle_master_exited(address),
            Command::DoRegistration(backoff) => self.handle_do_registration(backoff),
            Command::Stop(failover) => self.handle_stop(failover),
            Command::Abort => self.handle_abort(),
            Command::KillTask(task_id) => self.handle_kill_task(task_id),
            Command::RequestResources(requests) => self.handle_request_resources(requests),
            Command::ReviveOffers => self.handle_revive_offers(),
            Command::ReconcileTasks(statuses) => self.handle_reconcile_tasks(statuses),
            Command::SendFrameworkMessage {
                executor_id,
                slave_id,
                data,
            } => self.handle_send_framework_message(executor_id, slave_id, data),
            Command::LaunchTasks {
                offer_ids,
                tasks,
                filters,
            } => self.handle_launch_tasks(offer_ids, tasks, filters).await,
        }
    }

    /// Asks the detector for a leader distinct from the current `master`.
    /// Detection itself must not block this actor's mailbox, so it runs on
    /// a spawned task that reports back through `Command::Detected`.
    fn handle_detect(&self) {
        let detector = self.detector.clone();
        let previous = self.master.clone();
        let mailbox = self.self_mailbox.clone();
        tokio::spawn(async move {
            let outcome = detector.detect(previous.as_ref()).await;
            mailbox.detected(outcome);
        });
    }

    async fn handle_detected(&mut self, outcome: DetectorOutcome) {
        let new_master = match outcome {
            Err(error) => {
                warn!(%error, "master detection failed; retrying");
                let mailbox = self.self_mailbox.clone();
                let retry = self.config.master_detection_retry;
                tokio::spawn(async move {
                    tokio::time::sleep(retry).await;
                    mailbox.detect();
                });
                return;
            }
            Ok(new_master) => new_master,
        };

        if self.connected {
            self.connected = false;
            self.scheduler.disconnected(&self.driver).await;
        }
        self.master = new_master.clone();
        if let Some(address) = new_master {
            tracing::info!(%address, "new master detected");
            let link_exit = self.runtime.link(address.clone());
            let mailbox = self.self_mailbox.clone();
            tokio::spawn(async move {
                let _ = link_exit.await;
                mailbox.master_exited(address);
            });
            self.handle_do_registration(self.config.initial_backoff);
        }
        // Always re-arm detection for the next transition.
        self.handle_detect();
    }

    fn handle_master_exited(&self, exited: Address) {
        if self.master.as_ref() == Some(&exited) {
            tracing::info!(%exited, "master link exited");
            self.handle_detect();
        }
    }

    fn handle_do_registration(&self, backoff: Duration) {
        if self.connected || self.master.is_none() {
            return;
        }
        match self.framework.id.clone() {
            None => self.send_to_master(Message::RegisterFramework {
                framework: self.framework.clone(),
            }),
            Some(_) => self.send_to_master(Message::ReregisterFramework {
                framework: self.framework.clone(),
                failover: self.failover,
            }),
        }
        if let Some(metrics) = &self.metrics {
            metrics.backoff_retries.inc();
        }
        let next = self.config.next_backoff(backoff);
        let mailbox = self.self_mailbox.clone();
        tokio::spawn(async move {
            tokio::time::sleep(backoff).await;
            mailbox.do_registration(next);
        });
    }

    fn handle_stop(&mut self, failover: bool) {
        if failover {
            // Leave master-side state in place; the next incarnation
            // reregisters as the same framework id.
            return;
        }
        self.connected = false;
        self.failover = true;
        if let Some(framework_id) = self.framework.id.clone() {
            self.send_to_master(Message::UnregisterFramework { framework_id });
        }
    }

    fn handle_abort(&mut self) {
        self.connected = false;
        self.aborted.store(true, Ordering::SeqCst);
    }

    fn handle_kill_task(&self, task_id: TaskId) {
        if !self.connected {
            return;
        }
        if let Some(framework_id) = self.framework.id.clone() {
            self.send_to_master(Message::KillTask {
                framework_id,
                task_id,
            });
        }
    }

    fn handle_request_resources(&self, requests: Vec<ResourceRequest>) {
        if !self.connected {
            return;
        }
        if let Some(framework_id) = self.framework.id.clone() {
            self.send_to_master(Message::ResourceRequest {
                framework_id,
                requests,
            });
        }
    }

    fn handle_revive_offers(&self) {
        if !self.connected {
            return;
        }
        if let Some(framework_id) = self.framework.id.clone() {
            self.send_to_master(Message::ReviveOffers { framework_id });
        }
    }

    fn handle_reconcile_tasks(&self, statuses: Vec<TaskStatus>) {
        if !self.connected {
            return;
        }
        if let Some(framework_id) = self.framework.id.clone() {
            self.send_to_master(Message::ReconcileTasks {
                framework_id,
                statuses,
            });
        }
    }

    fn handle_send_framework_message(&self, executor_id: ExecutorId, slave_id: SlaveId, data: Vec<u8>) {
        if !self.connected {
            return;
        }
        let Some(framework_id) = self.framework.id.clone() else {
            return;
        };
        match self.slave_cache.get(&slave_id).cloned() {
            Some(address) => self.runtime.send(
                self.self_address.clone(),
                &address,
                Message::FrameworkToExecutor {
                    framework_id,
                    executor_id,
                    slave_id,
                    data,
                },
            ),
            None => {
                warn!(%slave_id, "slave not cached; routing framework message through master");
                self.send_to_master(Message::FrameworkToExecutor {
                    framework_id,
                    executor_id,
                    slave_id,
                    data,
                });
            }
        }
    }

    async fn handle_launch_tasks(&mut self, offer_ids: Vec<OfferId>, tasks: Vec<TaskInfo>, filters: Filters) {
        if !self.connected {
            for task in tasks {
                self.deliver_local_status_update(TaskStatus::local_lost(
                    task.task_id,
                    "Master Disconnected",
                ))
                .await;
            }
            return;
        }

        // A launch with zero submitted tasks is the `declineOffer` special
        // case (`spec.md` §3: "the 'decline' special case of launching zero
        // tasks") and must still notify the master so it reclaims the
        // offers. A launch whose tasks were *all* rejected as malformed is
        // different: nothing the caller asked for survived validation, so
        // there is nothing left to tell the master (`spec.md` §8 scenario
        // 3: "no LaunchTasksMessage reaches M").
        let had_submitted_tasks = !tasks.is_empty();
        let mut accepted = Vec::with_capacity(tasks.len());
        for task in tasks {
            match self.validate_task(task) {
                Ok(task) => accepted.push(task),
                Err((task_id, reason)) => {
                    self.deliver_local_status_update(TaskStatus::local_lost(task_id, reason.message()))
                        .await;
                }
            }
        }
        let should_send = !accepted.is_empty() || !had_submitted_tasks;

        for offer_id in &offer_ids {
            match self.offer_table.get(offer_id) {
                Some(slaves) => {
                    for task in &accepted {
                        match slaves.get(&task.slave_id) {
                            Some(address) => {
                                self.slave_cache.insert(task.slave_id.clone(), address.clone());
                            }
                            None => warn!(
                                %offer_id, task_id = %task.task_id, slave_id = %task.slave_id,
                                "launch references a slave not present in this offer"
                            ),
                        }
                    }
                }
                None => warn!(%offer_id, "launch references an unknown offer"),
            }
            self.offer_table.remove(offer_id);
        }
        if let Some(metrics) = &self.metrics {
            metrics.offers_open.set(self.offer_table.len() as i64);
        }

        if !should_send {
            return;
        }
        let Some(framework_id) = self.framework.id.clone() else {
            return;
        };
        self.send_to_master(Message::LaunchTasks {
            framework_id,
            tasks: accepted,
            filters,
            offer_ids,
        });
    }

    /// Validates a task per `spec.md` §4.1 step 3, returning a defensive
    /// copy with `executor.framework_id` filled in rather than mutating the
    /// caller's value in place (`spec.md` §9 "Mutation of input tasks").
    fn validate_task(&self, mut task: TaskInfo) -> Result<TaskInfo, (TaskId, MalformedTaskReason)> {
        if task.executor.is_some() == task.command.is_some() {
            return Err((task.task_id, MalformedTaskReason::MissingExecutorOrCommand));
        }
        if let Some(executor) = task.executor.as_mut() {
            match executor.framework_id.clone() {
                Some(id) if Some(&id) != self.framework.id.as_ref() => {
                    return Err((task.task_id, MalformedTaskReason::ExecutorFrameworkIdMismatch));
                }
                Some(_) => {}
                None => executor.framework_id = self.framework.id.clone(),
            }
        }
        Ok(task)
    }

    /// Re-injects a locally-synthesized status update as a `StatusUpdate`
    /// sent to this process's own address, so it re-enters the normal
    /// handler path (`spec.md` §4.1, §9 "Local TASK_LOST loop-back").
    async fn deliver_local_status_update(&self, status: TaskStatus) {
        let uuid = status.uuid;
        self.runtime.send(
            self.self_address.clone(),
            &self.self_address,
            Message::StatusUpdate {
                status,
                slave_id: None,
                uuid,
            },
        );
    }

    // --- inbound protocol handlers (spec.md §4.1 "Inbound protocol handlers") ---

    #[instrument(skip(self, message))]
    async fn handle_inbound(&mut self, from: Address, message: Message) {
        if self.is_aborted() {
            debug!(?message, "dropping message: aborted");
            return;
        }

        match message {
            Message::FrameworkRegistered {
                framework_id,
                master_info,
            } => {
                if !self.origin_ok(&from) {
                    warn!(%from, "dropping FrameworkRegistered from non-master origin");
                    return;
                }
                self.handle_framework_registered(framework_id, master_info).await;
            }
            Message::FrameworkReregistered {
                framework_id,
                master_info,
            } => {
                if !self.origin_ok(&from) {
                    warn!(%from, "dropping FrameworkReregistered from non-master origin");
                    return;
                }
                self.handle_framework_reregistered(framework_id, master_info).await;
            }
            Message::ResourceOffers { offers, pids } => {
                if !self.connected {
                    debug!("dropping ResourceOffers while disconnected");
                    return;
                }
                if !self.origin_ok(&from) {
                    warn!(%from, "dropping ResourceOffers from non-master origin");
                    return;
                }
                self.handle_resource_offers(offers, pids).await;
            }
            Message::RescindResourceOffer { offer_id } => {
                if !self.connected {
                    debug!("dropping RescindResourceOffer while disconnected");
                    return;
                }
                if !self.origin_ok(&from) {
                    warn!(%from, "dropping RescindResourceOffer from non-master origin");
                    return;
                }
                self.handle_rescind(offer_id).await;
            }
            Message::StatusUpdate { status, slave_id, uuid } => {
                let is_loopback = from == self.self_address;
                if !is_loopback {
                    if !self.connected {
                        debug!("dropping StatusUpdate while disconnected");
                        return;
                    }
                    if !self.origin_ok(&from) {
                        warn!(%from, "dropping StatusUpdate from non-master origin");
                        return;
                    }
                }
                self.handle_status_update(status, slave_id, uuid).await;
            }
            Message::LostSlave { slave_id } => {
                if !self.connected {
                    debug!("dropping LostSlave while disconnected");
                    return;
                }
                if !self.origin_ok(&from) {
                    warn!(%from, "dropping LostSlave from non-master origin");
                    return;
                }
                self.handle_lost_slave(slave_id).await;
            }
            Message::FrameworkError { message } => {
                if !self.origin_ok(&from) {
                    warn!(%from, "dropping FrameworkError from non-master origin");
                    return;
                }
                self.scheduler.error(&self.driver, message).await;
            }
            Message::ExecutorToFramework {
                executor_id,
                slave_id,
                data,
            } => {
                // No origin guard: this originates from an executor, not the master.
                self.scheduler
                    .framework_message(&self.driver, executor_id, slave_id, data)
                    .await;
            }
            other => {
                debug!(?other, "ignoring outbound-shaped message delivered inbound");
            }
        }
    }

    async fn handle_framework_registered(&mut self, framework_id: corral_proto::FrameworkId, master_info: corral_proto::MasterInfo) {
        if self.connected {
            debug!("already connected; dropping duplicate FrameworkRegistered");
            return;
        }
        self.framework.id = Some(framework_id.clone());
        self.connected = true;
        self.failover = false;
        if let Some(metrics) = &self.metrics {
            metrics.registrations.inc();
        }
        self.scheduler.registered(&self.driver, framework_id, master_info).await;
    }

    async fn handle_framework_reregistered(
        &mut self,
        framework_id: corral_proto::FrameworkId,
        master_info: corral_proto::MasterInfo,
    ) {
        if self.connected {
            debug!("already connected; dropping duplicate FrameworkReregistered");
            return;
        }
        if self.framework.id.as_ref() != Some(&framework_id) {
            warn!(
                expected = ?self.framework.id, got = %framework_id,
                "reregistration framework id mismatch; dropping"
            );
            return;
        }
        self.connected = true;
        self.failover = false;
        if let Some(metrics) = &self.metrics {
            metrics.reregistrations.inc();
        }
        self.scheduler.reregistered(&self.driver, master_info).await;
    }

    async fn handle_resource_offers(&mut self, offers: Vec<Offer>, pids: Vec<Address>) {
        for (offer, pid) in offers.iter().zip(pids.iter()) {
            self.offer_table
                .entry(offer.id.clone())
                .or_default()
                .insert(offer.slave_id.clone(), pid.clone());
        }
        if let Some(metrics) = &self.metrics {
            metrics.offers_tracked.inc_by(offers.len() as u64);
            metrics.offers_open.set(self.offer_table.len() as i64);
        }
        self.scheduler.resource_offers(&self.driver, offers).await;
    }

    async fn handle_rescind(&mut self, offer_id: OfferId) {
        if self.offer_table.remove(&offer_id).is_none() {
            warn!(%offer_id, "rescind for unknown offer");
        }
        if let Some(metrics) = &self.metrics {
            metrics.offers_open.set(self.offer_table.len() as i64);
        }
        self.scheduler.offer_rescinded(&self.driver, offer_id).await;
    }

    async fn handle_status_update(&mut self, status: TaskStatus, slave_id: Option<SlaveId>, uuid: Uuid) {
        if !status.source_is_local {
            match self.framework.id.clone() {
                Some(framework_id) => {
                    self.send_to_master(Message::StatusUpdateAcknowledgement {
                        framework_id,
                        slave_id,
                        task_id: status.task_id.clone(),
                        uuid,
                    });
                    if let Some(metrics) = &self.metrics {
                        metrics.acknowledgements_sent.inc();
                    }
                }
                None => {
                    tracing::error!("received a status update while connected but framework id is unset")
                }
            }
        }
        self.scheduler.status_update(&self.driver, status).await;
    }

    async fn handle_lost_slave(&mut self, slave_id: SlaveId) {
        self.slave_cache.remove(&slave_id);
        self.scheduler.slave_lost(&self.driver, slave_id).await;
    }
}
