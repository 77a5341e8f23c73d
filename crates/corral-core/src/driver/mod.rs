//! The thread-safe synchronous driver facade (`spec.md` §4.2).

use std::sync::{Arc, Condvar, Mutex};

use corral_proto::{
    Address, Credential, ExecutorId, Filters, FrameworkInfo, OfferId, ResourceRequest, SlaveId,
    TaskId, TaskInfo, TaskStatus,
};

use crate::{
    config::DriverConfig,
    detector::MasterDetector,
    error::{DriverStartError, DriverStartErrorKind},
    process::{SchedulerMailbox, SchedulerProcess},
    runtime::ActorRuntime,
    scheduler::Scheduler,
};

/// Lifecycle status (`spec.md` §3 "Driver status"). Transitions are
/// one-directional under the driver's mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    NotStarted,
    Running,
    Aborted,
    Stopped,
}

struct StartParams {
    framework: FrameworkInfo,
    credential: Option<Credential>,
    scheduler: Box<dyn Scheduler>,
}

struct State {
    status: DriverStatus,
    mailbox: Option<SchedulerMailbox>,
    start_params: Option<StartParams>,
}

struct Inner {
    self_address: Address,
    runtime: Arc<dyn ActorRuntime>,
    config: DriverConfig,
    metrics: Option<Arc<corral_metrics::SchedulerMetrics>>,
    aborted: Arc<std::sync::atomic::AtomicBool>,
    state: Mutex<State>,
    condvar: Condvar,
}

/// The public entry point: a thread-safe synchronous facade that external
/// code uses to start, stop, abort, join, and dispatch commands into the
/// scheduler process (`spec.md` §1, §4.2). Cheaply cloneable — every clone
/// shares the same underlying process.
#[derive(Clone)]
pub struct SchedulerDriver {
    inner: Arc<Inner>,
}

impl SchedulerDriver {
    /// Builds a not-yet-started driver. `framework.hostname`/`framework.user`
    /// are defaulted here, once, before the scheduler process ever exists
    /// (`spec.md` §4.2 "Every FrameworkInfo field defaulting ... happens
    /// once, in the constructor").
    pub fn new(
        self_address: Address,
        mut framework: FrameworkInfo,
        credential: Option<Credential>,
        scheduler: impl Scheduler,
        runtime: Arc<dyn ActorRuntime>,
        config: DriverConfig,
        metrics: Option<Arc<corral_metrics::SchedulerMetrics>>,
    ) -> Self {
        if framework.hostname.is_empty() {
            framework.hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_owned());
        }
        if framework.user.is_empty() {
            framework.user = std::env::var("USER").unwrap_or_else(|_| "root".to_owned());
        }

        Self {
            inner: Arc::new(Inner {
                self_address,
                runtime,
                config,
                metrics,
                aborted: Arc::new(std::sync::atomic::AtomicBool::new(false)),
                state: Mutex::new(State {
                    status: DriverStatus::NotStarted,
                    mailbox: None,
                    start_params: Some(StartParams {
                        framework,
                        credential,
                        scheduler: Box::new(scheduler),
                    }),
                }),
                condvar: Condvar::new(),
            }),
        }
    }

    pub fn status(&self) -> DriverStatus {
        self.inner.state.lock().expect("driver state poisoned").status
    }

    /// Constructs the master detector from `master_uri` and spawns the
    /// scheduler process (`spec.md` §4.2 `start`). A bad URI aborts the
    /// driver synchronously without ever spawning anything.
    pub fn start<D: MasterDetector>(&self, master_uri: &str) -> Result<DriverStatus, DriverStartError> {
        let mut state = self.inner.state.lock().expect("driver state poisoned");
        if state.status != DriverStatus::NotStarted {
            return Err(DriverStartErrorKind::AlreadyStarted.into());
        }

        let detector = match D::from_uri(master_uri) {
            Ok(detector) => detector,
            Err(error) => {
                state.status = DriverStatus::Aborted;
                return Err(error.into());
            }
        };

        let start_params = state
            .start_params
            .take()
            .expect("not-started state always carries start params");

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let mailbox = SchedulerMailbox::new(tx);

        let process = SchedulerProcess::new(
            self.inner.self_address.clone(),
            self.inner.runtime.clone(),
            Arc::new(detector),
            start_params.scheduler,
            self.clone(),
            self.inner.config.clone(),
            start_params.framework,
            start_params.credential,
            rx,
            mailbox.clone(),
            self.inner.aborted.clone(),
            self.inner.metrics.clone(),
        );
        tokio::spawn(process.run());

        state.mailbox = Some(mailbox);
        state.status = DriverStatus::Running;
        Ok(DriverStatus::Running)
    }

    /// `start`, then `join` if it actually started running.
    pub fn run<D: MasterDetector>(&self, master_uri: &str) -> Result<DriverStatus, DriverStartError> {
        let status = self.start::<D>(master_uri)?;
        Ok(if status == DriverStatus::Running {
            self.join()
        } else {
            status
        })
    }

    /// Blocks the calling thread while the driver is `Running`.
    pub fn join(&self) -> DriverStatus {
        let mut state = self.inner.state.lock().expect("driver state poisoned");
        while state.status == DriverStatus::Running {
            state = self.inner.condvar.wait(state).expect("driver state poisoned");
        }
        state.status
    }

    fn dispatch_if_running(&self, f: impl FnOnce(&SchedulerMailbox)) -> DriverStatus {
        let state = self.inner.state.lock().expect("driver state poisoned");
        if state.status == DriverStatus::Running {
            if let Some(mailbox) = &state.mailbox {
                f(mailbox);
            }
        }
        state.status
    }

    /// `spec.md` §4.2 `stop`: dispatches unconditionally when `Running` or
    /// `Aborted`; the return value mirrors the prior status when the driver
    /// was already aborted (`spec.md` §9 "Status after stop when previously
    /// aborted").
    pub fn stop(&self, failover: bool) -> DriverStatus {
        let mut state = self.inner.state.lock().expect("driver state poisoned");
        let prior = state.status;
        if prior != DriverStatus::Running && prior != DriverStatus::Aborted {
            return prior;
        }
        if let Some(mailbox) = &state.mailbox {
            mailbox.stop(failover);
        }
        state.status = DriverStatus::Stopped;
        self.inner.condvar.notify_all();
        if prior == DriverStatus::Aborted {
            DriverStatus::Aborted
        } else {
            DriverStatus::Stopped
        }
    }

    /// `spec.md` §4.2 `abort`: the aborted flag is set before the command is
    /// even dispatched, so the very next message the process looks at is
    /// already dropped.
    pub fn abort(&self) -> DriverStatus {
        let mut state = self.inner.state.lock().expect("driver state poisoned");
        if state.status != DriverStatus::Running {
            return state.status;
        }
        self.inner.aborted.store(true, std::sync::atomic::Ordering::SeqCst);
        if let Some(mailbox) = &state.mailbox {
            mailbox.abort();
        }
        state.status = DriverStatus::Aborted;
        self.inner.condvar.notify_all();
        DriverStatus::Aborted
    }

    pub fn kill_task(&self, task_id: TaskId) -> DriverStatus {
        self.dispatch_if_running(|mailbox| mailbox.kill_task(task_id))
    }

    pub fn request_resources(&self, requests: Vec<ResourceRequest>) -> DriverStatus {
        self.dispatch_if_running(|mailbox| mailbox.request_resources(requests))
    }

    pub fn revive_offers(&self) -> DriverStatus {
        self.dispatch_if_running(|mailbox| mailbox.revive_offers())
    }

    pub fn reconcile_tasks(&self, statuses: Vec<TaskStatus>) -> DriverStatus {
        self.dispatch_if_running(|mailbox| mailbox.reconcile_tasks(statuses))
    }

    pub fn send_framework_message(&self, executor_id: ExecutorId, slave_id: SlaveId, data: Vec<u8>) -> DriverStatus {
        self.dispatch_if_running(|mailbox| mailbox.send_framework_message(executor_id, slave_id, data))
    }

    pub fn launch_tasks(&self, offer_ids: Vec<OfferId>, tasks: Vec<TaskInfo>, filters: Filters) -> DriverStatus {
        self.dispatch_if_running(|mailbox| mailbox.launch_tasks(offer_ids, tasks, filters))
    }

    /// `spec.md` §4.2: "`declineOffer(offer_id, filters)` is exactly
    /// `launchTasks([offer_id], [], filters)`."
    pub fn decline_offer(&self, offer_id: OfferId, filters: Filters) -> DriverStatus {
        self.launch_tasks(vec![offer_id], Vec::new(), filters)
    }

    // camelCase aliases (`spec.md` §6: "Method names expose both camelCase
    // and snake_case spellings as aliases for ergonomics").
    #[allow(non_snake_case)]
    pub fn killTask(&self, task_id: TaskId) -> DriverStatus {
        self.kill_task(task_id)
    }

    #[allow(non_snake_case)]
    pub fn requestResources(&self, requests: Vec<ResourceRequest>) -> DriverStatus {
        self.request_resources(requests)
    }

    #[allow(non_snake_case)]
    pub fn reviveOffers(&self) -> DriverStatus {
        self.revive_offers()
    }

    #[allow(non_snake_case)]
    pub fn reconcileTasks(&self, statuses: Vec<TaskStatus>) -> DriverStatus {
        self.reconcile_tasks(statuses)
    }

    #[allow(non_snake_case)]
    pub fn sendFrameworkMessage(&self, executor_id: ExecutorId, slave_id: SlaveId, data: Vec<u8>) -> DriverStatus {
        self.send_framework_message(executor_id, slave_id, data)
    }

    #[allow(non_snake_case)]
    pub fn launchTasks(&self, offer_ids: Vec<OfferId>, tasks: Vec<TaskInfo>, filters: Filters) -> DriverStatus {
        self.launch_tasks(offer_ids, tasks, filters)
    }

    #[allow(non_snake_case)]
    pub fn declineOffer(&self, offer_id: OfferId, filters: Filters) -> DriverStatus {
        self.decline_offer(offer_id, filters)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, sync::Arc};

    use corral_proto::{Address, FrameworkInfo};

    use super::*;
    use crate::{detector::StaticDetector, runtime::LocalActorSystem, test_support::RecordingScheduler};

    fn driver() -> SchedulerDriver {
        let framework = FrameworkInfo {
            id: None,
            user: "root".to_owned(),
            name: "test".to_owned(),
            hostname: "localhost".to_owned(),
            principal: None,
            webui_url: None,
            extra: BTreeMap::new(),
        };
        let runtime: Arc<dyn ActorRuntime> = Arc::new(LocalActorSystem::new());
        SchedulerDriver::new(
            Address::new("127.0.0.1".parse().unwrap(), 0, "scheduler@".to_owned()),
            framework,
            None,
            RecordingScheduler::new(),
            runtime,
            DriverConfig::default(),
            None,
        )
    }

    #[test]
    fn fresh_driver_is_not_started() {
        assert_eq!(driver().status(), DriverStatus::NotStarted);
    }

    #[test]
    fn stop_before_start_is_a_no_op() {
        let driver = driver();
        assert_eq!(driver.stop(false), DriverStatus::NotStarted);
        assert_eq!(driver.status(), DriverStatus::NotStarted);
    }

    #[test]
    fn abort_before_start_is_a_no_op() {
        let driver = driver();
        assert_eq!(driver.abort(), DriverStatus::NotStarted);
        assert_eq!(driver.status(), DriverStatus::NotStarted);
    }

    #[test]
    fn dispatch_before_start_reports_not_started_and_sends_nothing() {
        let driver = driver();
        assert_eq!(driver.revive_offers(), DriverStatus::NotStarted);
    }

    #[tokio::test]
    async fn starting_twice_is_rejected() {
        let driver = driver();
        let first = driver.start::<StaticDetector>("127.0.0.1:5050/master");
        assert!(first.is_ok());
        assert_eq!(driver.status(), DriverStatus::Running);

        let second = driver.start::<StaticDetector>("127.0.0.1:5050/master");
        assert!(matches!(second, Err(e) if matches!(e.kind(), DriverStartErrorKind::AlreadyStarted)));

        driver.abort();
    }

    #[test]
    fn bad_master_uri_aborts_without_spawning() {
        let driver = driver();
        let result = driver.start::<StaticDetector>("not a valid uri");
        assert!(result.is_err());
        assert_eq!(driver.status(), DriverStatus::Aborted);
    }

    #[tokio::test]
    async fn stop_after_abort_returns_the_prior_aborted_status_but_settles_on_stopped() {
        let driver = driver();
        driver.start::<StaticDetector>("127.0.0.1:5050/master").unwrap();
        assert_eq!(driver.abort(), DriverStatus::Aborted);

        assert_eq!(driver.stop(false), DriverStatus::Aborted);
        assert_eq!(driver.status(), DriverStatus::Stopped);
    }

    #[tokio::test]
    async fn abort_after_stop_is_a_no_op() {
        let driver = driver();
        driver.start::<StaticDetector>("127.0.0.1:5050/master").unwrap();
        driver.stop(false);
        assert_eq!(driver.status(), DriverStatus::Stopped);

        assert_eq!(driver.abort(), DriverStatus::Stopped);
        assert_eq!(driver.status(), DriverStatus::Stopped);
    }
}
