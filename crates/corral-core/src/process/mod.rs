//! The scheduler process's mailbox: the outbound-command surface the driver
//! facade dispatches into, modeled the same way `ExecutionDriverMailbox`
//! wraps a channel sender with one method per message variant.

mod actor;

pub(crate) use actor::SchedulerProcess;
use corral_proto::{ExecutorId, Filters, OfferId, ResourceRequest, SlaveId, TaskId, TaskInfo, TaskStatus};
use tokio::sync::mpsc;

use crate::detector::DetectorOutcome;

/// Every outbound command the driver facade can inject into the scheduler
/// process's mailbox (`spec.md` §4.1 "Outbound commands"), plus the two
/// purely-internal continuations (`Detected`, `MasterExited`) that the
/// process schedules for itself.
#[derive(Debug)]
pub(crate) enum Command {
    Detect,
    Detected(DetectorOutcome),
    MasterExited(corral_proto::Address),
    DoRegistration(std::time::Duration),
    Stop(bool),
    Abort,
    KillTask(TaskId),
    RequestResources(Vec<ResourceRequest>),
    ReviveOffers,
    ReconcileTasks(Vec<TaskStatus>),
    SendFrameworkMessage {
        executor_id: ExecutorId,
        slave_id: SlaveId,
        data: Vec<u8>,
    },
    LaunchTasks {
        offer_ids: Vec<OfferId>,
        tasks: Vec<TaskInfo>,
        filters: Filters,
    },
}

/// A cheap, cloneable handle to a running scheduler process's mailbox.
/// Every method is fire-and-forget: sending never blocks, matching
/// `spec.md` §4.2 "Dispatch is non-blocking: it enqueues into the actor
/// mailbox."
#[derive(Clone)]
pub(crate) struct SchedulerMailbox {
    tx: mpsc::UnboundedSender<Command>,
}

impl SchedulerMailbox {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { tx }
    }

    fn send(&self, command: Command) {
        // The receiving end only ever drops once the process task itself
        // exits, which this workspace has no code path for; a dropped
        // receiver here means the process panicked, and the message is
        // unobservable either way.
        let _ = self.tx.send(command);
    }

    pub(crate) fn detect(&self) {
        self.send(Command::Detect);
    }

    pub(crate) fn detected(&self, outcome: DetectorOutcome) {
        self.send(Command::Detected(outcome));
    }

    pub(crate) fn master_exited(&self, address: corral_proto::Address) {
        self.send(Command::MasterExited(address));
    }

    pub(crate) fn do_registration(&self, backoff: std::time::Duration) {
        self.send(Command::DoRegistration(backoff));
    }

    pub(crate) fn stop(&self, failover: bool) {
        self.send(Command::Stop(failover));
    }

    pub(crate) fn abort(&self) {
        self.send(Command::Abort);
    }

    pub(crate) fn kill_task(&self, task_id: TaskId) {
        self.send(Command::KillTask(task_id));
    }

    pub(crate) fn request_resources(&self, requests: Vec<ResourceRequest>) {
        self.send(Command::RequestResources(requests));
    }

    pub(crate) fn revive_offers(&self) {
        self.send(Command::ReviveOffers);
    }

    pub(crate) fn reconcile_tasks(&self, statuses: Vec<TaskStatus>) {
        self.send(Command::ReconcileTasks(statuses));
    }

    pub(crate) fn send_framework_message(
        &self,
        executor_id: ExecutorId,
        slave_id: SlaveId,
        data: Vec<u8>,
    ) {
        self.send(Command::SendFrameworkMessage {
            executor_id,
            slave_id,
            data,
        });
    }

    pub(crate) fn launch_tasks(&self, offer_ids: Vec<OfferId>, tasks: Vec<TaskInfo>, filters: Filters) {
        self.send(Command::LaunchTasks {
            offer_ids,
            tasks,
            filters,
        });
    }
}
