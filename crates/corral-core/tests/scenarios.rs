//! End-to-end scenario tests transcribed from `spec.md` §8: a mock master
//! and a recording scheduler driving a real `SchedulerDriver` over a
//! `LocalActorSystem`, with no doubles inside `corral-core` itself.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, OnceLock},
    time::Duration,
};

use async_trait::async_trait;
use corral_core::{
    ActorRuntime, DetectorError, DriverConfig, DriverStatus, LocalActorSystem, MasterDetector,
    SchedulerDriver, StaticDetector,
    test_support::{MockMaster, RecordingScheduler, SchedulerEvent},
};
use corral_proto::{
    Address, CommandInfo, ExecutorId, ExecutorInfo, Filters, FrameworkId, FrameworkInfo,
    MasterInfo, Message, Offer, OfferId, Resource, ResourceRequest, SlaveId, TaskId, TaskInfo,
    TaskState, TaskStatus,
};
use tokio::sync::{Mutex as AsyncMutex, mpsc};

fn addr(name: &str) -> Address {
    Address::new("127.0.0.1".parse().unwrap(), 5050, name)
}

fn framework(id: Option<&str>) -> FrameworkInfo {
    FrameworkInfo {
        id: id.map(FrameworkId::from),
        user: "root".into(),
        name: "test-framework".into(),
        hostname: "localhost".into(),
        principal: None,
        webui_url: None,
        extra: BTreeMap::new(),
    }
}

fn master_info(address: &Address) -> MasterInfo {
    MasterInfo {
        id: "master-1".into(),
        address: address.clone(),
        version: None,
    }
}

fn sample_offer(offer_id: &str, slave_id: &str) -> Offer {
    Offer {
        id: OfferId::from(offer_id),
        framework_id: FrameworkId::from("f-1"),
        slave_id: SlaveId::from(slave_id),
        hostname: "slave-host".into(),
        resources: vec![Resource::Scalar {
            name: "cpus".into(),
            value: 1.0,
        }],
    }
}

/// Polls `recording` until it has observed at least `n` events, or panics.
async fn wait_for_events(recording: &RecordingScheduler, n: usize) {
    for _ in 0..200 {
        if recording.events().len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "timed out waiting for {n} scheduler event(s); got {:?}",
        recording.events()
    );
}

struct Harness {
    driver: SchedulerDriver,
    master: MockMaster,
    master_addr: Address,
    recording: RecordingScheduler,
}

const SCHEDULER_ADDR: &str = "scheduler@";

/// Builds a driver wired to a fresh in-process actor system and drives it
/// through registration: starts the driver, drains the `RegisterFramework`
/// the master receives, and replies with `FrameworkRegistered`.
async fn register(framework_id: Option<&str>) -> Harness {
    let runtime: Arc<dyn ActorRuntime> = Arc::new(LocalActorSystem::new());
    let master_addr = addr("master@");
    let scheduler_addr = addr(SCHEDULER_ADDR);
    let mut master = MockMaster::new(runtime.clone(), master_addr.clone());
    let recording = RecordingScheduler::new();

    let driver = SchedulerDriver::new(
        scheduler_addr.clone(),
        framework(framework_id),
        None,
        recording.clone(),
        runtime,
        DriverConfig::default(),
        None,
    );

    let status = driver.start::<StaticDetector>(&master_addr.to_string()).unwrap();
    assert_eq!(status, DriverStatus::Running);

    let (from, msg) = master.recv().await.expect("master should receive a (re)registration");
    assert_eq!(from, scheduler_addr);
    match (framework_id, msg) {
        (None, Message::RegisterFramework { framework }) => {
            assert_eq!(framework.id, None);
        }
        (Some(id), Message::ReregisterFramework { framework, failover }) => {
            assert!(failover, "a framework constructed with an id starts with failover set");
            assert_eq!(framework.id, Some(FrameworkId::from(id)));
        }
        (expected, actual) => panic!("unexpected first message for framework_id={expected:?}: {actual:?}"),
    }

    let reply = match framework_id {
        None => Message::FrameworkRegistered {
            framework_id: FrameworkId::from("f-1"),
            master_info: master_info(&master_addr),
        },
        Some(id) => Message::FrameworkReregistered {
            framework_id: FrameworkId::from(id),
            master_info: master_info(&master_addr),
        },
    };
    master.send(&scheduler_addr, reply);
    wait_for_events(&recording, 1).await;

    Harness {
        driver,
        master,
        master_addr,
        recording,
    }
}

/// Like `register`, but drains the initial registration message and returns
/// before replying — the driver is `Running` but not yet `connected`, for
/// exercising the "gated on connected" half of the outbound command table.
async fn start_disconnected() -> Harness {
    let runtime: Arc<dyn ActorRuntime> = Arc::new(LocalActorSystem::new());
    let master_addr = addr("master@");
    let scheduler_addr = addr(SCHEDULER_ADDR);
    let mut master = MockMaster::new(runtime.clone(), master_addr.clone());
    let recording = RecordingScheduler::new();

    let driver = SchedulerDriver::new(
        scheduler_addr.clone(),
        framework(None),
        None,
        recording.clone(),
        runtime,
        DriverConfig::default(),
        None,
    );

    let status = driver.start::<StaticDetector>(&master_addr.to_string()).unwrap();
    assert_eq!(status, DriverStatus::Running);
    let (_, msg) = master.recv().await.expect("master should receive the initial registration");
    assert!(matches!(msg, Message::RegisterFramework { .. }));

    Harness {
        driver,
        master,
        master_addr,
        recording,
    }
}

/// Replies to the registration already drained by `start_disconnected`,
/// bringing the harness to `connected`.
async fn complete_registration(harness: &mut Harness) {
    let scheduler_addr = addr(SCHEDULER_ADDR);
    harness.master.send(
        &scheduler_addr,
        Message::FrameworkRegistered {
            framework_id: FrameworkId::from("f-1"),
            master_info: master_info(&harness.master_addr),
        },
    );
    wait_for_events(&harness.recording, 1).await;
}

// Scenario 1: happy register.
#[tokio::test]
async fn happy_register_invokes_registered_exactly_once() {
    let harness = register(None).await;
    assert_eq!(
        harness.recording.events(),
        vec![SchedulerEvent::Registered {
            framework_id: FrameworkId::from("f-1"),
            master_info: master_info(&harness.master_addr),
        }]
    );
    harness.driver.stop(false);
}

// Duplicate FrameworkRegistered while already connected must be a no-op.
#[tokio::test]
async fn duplicate_framework_registered_is_ignored() {
    let harness = register(None).await;
    harness.master.send(
        &addr(SCHEDULER_ADDR),
        Message::FrameworkRegistered {
            framework_id: FrameworkId::from("f-2"),
            master_info: master_info(&harness.master_addr),
        },
    );
    // Give the duplicate a chance to land; it must not produce a second event.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(harness.recording.events().len(), 1);
    harness.driver.stop(false);
}

// Scenario 2: offer then launch.
#[tokio::test]
async fn offer_then_launch_clears_offer_and_populates_slave_cache() {
    let mut harness = register(None).await;
    let scheduler_addr = addr(SCHEDULER_ADDR);

    harness.master.send(
        &scheduler_addr,
        Message::ResourceOffers {
            offers: vec![sample_offer("o-1", "s-1")],
            pids: vec![addr("slave@")],
        },
    );
    wait_for_events(&harness.recording, 2).await;
    assert!(matches!(
        harness.recording.events().last().unwrap(),
        SchedulerEvent::ResourceOffers(offers) if offers.len() == 1
    ));

    let task = TaskInfo {
        task_id: TaskId::from("t-1"),
        name: "task".into(),
        slave_id: SlaveId::from("s-1"),
        resources: vec![],
        executor: None,
        command: Some(CommandInfo {
            value: "true".into(),
            uris: vec![],
            environment: BTreeMap::new(),
        }),
    };
    let status = harness
        .driver
        .launch_tasks(vec![OfferId::from("o-1")], vec![task.clone()], Filters::default());
    assert_eq!(status, DriverStatus::Running);

    let (from, msg) = harness.master.recv().await.unwrap();
    assert_eq!(from, scheduler_addr);
    match msg {
        Message::LaunchTasks { offer_ids, tasks, .. } => {
            assert_eq!(offer_ids, vec![OfferId::from("o-1")]);
            assert_eq!(tasks, vec![task]);
        }
        other => panic!("expected LaunchTasks, got {other:?}"),
    }

    harness.driver.stop(false);
}

// Scenario 3: malformed task never reaches the master; it becomes a local TASK_LOST.
#[tokio::test]
async fn malformed_task_yields_local_task_lost_and_no_launch_message() {
    let mut harness = register(None).await;
    let scheduler_addr = addr(SCHEDULER_ADDR);

    harness.master.send(
        &scheduler_addr,
        Message::ResourceOffers {
            offers: vec![sample_offer("o-1", "s-1")],
            pids: vec![addr("slave@")],
        },
    );
    wait_for_events(&harness.recording, 2).await;

    let malformed = TaskInfo {
        task_id: TaskId::from("t-2"),
        name: "bad-task".into(),
        slave_id: SlaveId::from("s-1"),
        resources: vec![],
        executor: Some(ExecutorInfo {
            executor_id: ExecutorId::from("e-1"),
            framework_id: None,
            command: CommandInfo::default(),
            resources: vec![],
        }),
        command: Some(CommandInfo::default()),
    };
    harness
        .driver
        .launch_tasks(vec![OfferId::from("o-1")], vec![malformed], Filters::default());

    wait_for_events(&harness.recording, 3).await;
    match harness.recording.events().last().unwrap() {
        SchedulerEvent::StatusUpdate(status) => {
            assert_eq!(status.state, TaskState::Lost);
            assert_eq!(status.task_id, TaskId::from("t-2"));
            assert_eq!(status.message, "Malformed: A task must have either an executor or command");
        }
        other => panic!("expected a local TASK_LOST status update, got {other:?}"),
    }

    // No LaunchTasksMessage should have reached the master.
    let drained = tokio::time::timeout(Duration::from_millis(30), harness.master.recv()).await;
    assert!(drained.is_err(), "master should not have received a message");

    harness.driver.stop(false);
}

// Scenario 4: constructing with a pre-existing framework id starts in the
// failover state and reregisters.
#[tokio::test]
async fn failover_reregisters_and_clears_failover_flag() {
    let harness = register(Some("f-1")).await;
    assert_eq!(
        harness.recording.events(),
        vec![SchedulerEvent::Reregistered {
            master_info: master_info(&harness.master_addr),
        }]
    );
    harness.driver.stop(false);
}

#[tokio::test]
async fn lost_slave_clears_the_slave_cache_entry() {
    let mut harness = register(None).await;
    let scheduler_addr = addr(SCHEDULER_ADDR);

    harness.master.send(
        &scheduler_addr,
        Message::ResourceOffers {
            offers: vec![sample_offer("o-1", "s-1")],
            pids: vec![addr("slave@")],
        },
    );
    wait_for_events(&harness.recording, 2).await;

    let task = TaskInfo {
        task_id: TaskId::from("t-1"),
        name: "task".into(),
        slave_id: SlaveId::from("s-1"),
        resources: vec![],
        executor: None,
        command: Some(CommandInfo::default()),
    };
    harness
        .driver
        .launch_tasks(vec![OfferId::from("o-1")], vec![task], Filters::default());
    let _ = harness.master.recv().await.unwrap();

    harness.master.send(
        &scheduler_addr,
        Message::LostSlave {
            slave_id: SlaveId::from("s-1"),
        },
    );
    wait_for_events(&harness.recording, 3).await;
    assert_eq!(
        harness.recording.events().last().unwrap(),
        &SchedulerEvent::SlaveLost(SlaveId::from("s-1"))
    );

    harness.driver.stop(false);
}

// Scenario 6: abort swallows traffic — no callback, no acknowledgement.
#[tokio::test]
async fn abort_swallows_resource_offers() {
    let harness = register(None).await;
    let scheduler_addr = addr(SCHEDULER_ADDR);

    assert_eq!(harness.driver.abort(), DriverStatus::Aborted);

    harness.master.send(
        &scheduler_addr,
        Message::ResourceOffers {
            offers: vec![sample_offer("o-1", "s-1")],
            pids: vec![addr("slave@")],
        },
    );
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(harness.recording.events().len(), 1, "no resource_offers callback after abort");
}

// `declineOffer(O)` must be observationally equivalent to `launchTasks([O], [])`.
#[tokio::test]
async fn decline_offer_sends_empty_launch_tasks() {
    let mut harness = register(None).await;
    let scheduler_addr = addr(SCHEDULER_ADDR);

    harness.driver.decline_offer(OfferId::from("o-1"), Filters::default());
    let (from, msg) = harness.master.recv().await.unwrap();
    assert_eq!(from, scheduler_addr);
    match msg {
        Message::LaunchTasks { offer_ids, tasks, .. } => {
            assert_eq!(offer_ids, vec![OfferId::from("o-1")]);
            assert!(tasks.is_empty());
        }
        other => panic!("expected LaunchTasks, got {other:?}"),
    }

    harness.driver.stop(false);
}

// `spec.md` §4.1 outbound commands: `kill_task` is gated on connected and,
// once connected, sends a `KillTaskMessage` addressed with our framework id.
#[tokio::test]
async fn kill_task_gated_on_connected_then_sends_kill_task_message() {
    let mut harness = start_disconnected().await;
    let scheduler_addr = addr(SCHEDULER_ADDR);

    harness.driver.kill_task(TaskId::from("t-1"));
    let drained = tokio::time::timeout(Duration::from_millis(30), harness.master.recv()).await;
    assert!(drained.is_err(), "kill_task before connected must not send anything");

    complete_registration(&mut harness).await;

    harness.driver.kill_task(TaskId::from("t-1"));
    let (from, msg) = harness.master.recv().await.unwrap();
    assert_eq!(from, scheduler_addr);
    match msg {
        Message::KillTask { framework_id, task_id } => {
            assert_eq!(framework_id, FrameworkId::from("f-1"));
            assert_eq!(task_id, TaskId::from("t-1"));
        }
        other => panic!("expected KillTask, got {other:?}"),
    }

    harness.driver.stop(false);
}

// `request_resources` is gated on connected and sends a
// `ResourceRequestMessage` carrying the requests verbatim.
#[tokio::test]
async fn request_resources_gated_on_connected_then_sends_resource_request_message() {
    let mut harness = start_disconnected().await;
    let scheduler_addr = addr(SCHEDULER_ADDR);
    let requests = vec![ResourceRequest {
        role: "*".into(),
        resources: vec![Resource::Scalar {
            name: "cpus".into(),
            value: 4.0,
        }],
    }];

    harness.driver.request_resources(requests.clone());
    let drained = tokio::time::timeout(Duration::from_millis(30), harness.master.recv()).await;
    assert!(drained.is_err(), "request_resources before connected must not send anything");

    complete_registration(&mut harness).await;

    harness.driver.request_resources(requests.clone());
    let (from, msg) = harness.master.recv().await.unwrap();
    assert_eq!(from, scheduler_addr);
    match msg {
        Message::ResourceRequest { framework_id, requests: sent } => {
            assert_eq!(framework_id, FrameworkId::from("f-1"));
            assert_eq!(sent, requests);
        }
        other => panic!("expected ResourceRequest, got {other:?}"),
    }

    harness.driver.stop(false);
}

// `revive_offers` is gated on connected and sends a `ReviveOffersMessage`.
#[tokio::test]
async fn revive_offers_gated_on_connected_then_sends_revive_offers_message() {
    let mut harness = start_disconnected().await;
    let scheduler_addr = addr(SCHEDULER_ADDR);

    harness.driver.revive_offers();
    let drained = tokio::time::timeout(Duration::from_millis(30), harness.master.recv()).await;
    assert!(drained.is_err(), "revive_offers before connected must not send anything");

    complete_registration(&mut harness).await;

    harness.driver.revive_offers();
    let (from, msg) = harness.master.recv().await.unwrap();
    assert_eq!(from, scheduler_addr);
    match msg {
        Message::ReviveOffers { framework_id } => {
            assert_eq!(framework_id, FrameworkId::from("f-1"));
        }
        other => panic!("expected ReviveOffers, got {other:?}"),
    }

    harness.driver.stop(false);
}

// `reconcile_tasks` is gated on connected and sends a `ReconcileTasksMessage`
// carrying the statuses verbatim.
#[tokio::test]
async fn reconcile_tasks_gated_on_connected_then_sends_reconcile_tasks_message() {
    let mut harness = start_disconnected().await;
    let scheduler_addr = addr(SCHEDULER_ADDR);
    let statuses = vec![TaskStatus::local_lost(TaskId::from("t-1"), "reconcile-probe")];

    harness.driver.reconcile_tasks(statuses.clone());
    let drained = tokio::time::timeout(Duration::from_millis(30), harness.master.recv()).await;
    assert!(drained.is_err(), "reconcile_tasks before connected must not send anything");

    complete_registration(&mut harness).await;

    harness.driver.reconcile_tasks(statuses.clone());
    let (from, msg) = harness.master.recv().await.unwrap();
    assert_eq!(from, scheduler_addr);
    match msg {
        Message::ReconcileTasks { framework_id, statuses: sent } => {
            assert_eq!(framework_id, FrameworkId::from("f-1"));
            assert_eq!(sent, statuses);
        }
        other => panic!("expected ReconcileTasks, got {other:?}"),
    }

    harness.driver.stop(false);
}

// Scenario 5: disconnect on master change, reregister with the new leader.
// Uses a `ChannelDetector` (below) rather than `StaticDetector` because this
// is the one scenario that needs the detector itself to report a change.
#[tokio::test]
async fn leader_change_disconnects_then_reregisters_with_new_master() {
    let runtime: Arc<dyn ActorRuntime> = Arc::new(LocalActorSystem::new());
    let master1_addr = addr("master-1@");
    let master2_addr = addr("master-2@");
    let scheduler_addr = addr(SCHEDULER_ADDR);
    let mut master1 = MockMaster::new(runtime.clone(), master1_addr.clone());
    let mut master2 = MockMaster::new(runtime.clone(), master2_addr.clone());
    let recording = RecordingScheduler::new();

    let key = "leader-change-test";
    let tx = ChannelDetector::register(key);

    let driver = SchedulerDriver::new(
        scheduler_addr.clone(),
        framework(None),
        None,
        recording.clone(),
        runtime,
        DriverConfig::default(),
        None,
    );

    tx.send(Some(master1_addr.clone())).unwrap();
    driver.start::<ChannelDetector>(key).unwrap();

    let (_, msg) = master1.recv().await.unwrap();
    assert!(matches!(msg, Message::RegisterFramework { .. }));
    master1.send(
        &scheduler_addr,
        Message::FrameworkRegistered {
            framework_id: FrameworkId::from("f-1"),
            master_info: master_info(&master1_addr),
        },
    );
    wait_for_events(&recording, 1).await;

    tx.send(Some(master2_addr.clone())).unwrap();
    wait_for_events(&recording, 2).await;
    assert_eq!(recording.events()[1], SchedulerEvent::Disconnected);

    let (from, msg) = master2.recv().await.unwrap();
    assert_eq!(from, scheduler_addr);
    match msg {
        Message::ReregisterFramework { framework, failover } => {
            assert_eq!(framework.id, Some(FrameworkId::from("f-1")));
            assert!(
                !failover,
                "failover stays cleared after a successful registration; a mid-run leader \
                 change is not a graceful stop-with-failover (spec.md §3 event flags)"
            );
        }
        other => panic!("expected ReregisterFramework against the new master, got {other:?}"),
    }

    driver.stop(false);
}

/// A test-only [`MasterDetector`] whose leader sequence is driven by an
/// external channel instead of a fixed address, for scenarios that need the
/// detector itself to report a mid-run leader change.
struct ChannelDetector {
    rx: AsyncMutex<mpsc::UnboundedReceiver<Option<Address>>>,
}

type ChannelRegistry = std::sync::Mutex<HashMap<String, mpsc::UnboundedReceiver<Option<Address>>>>;

fn channel_registry() -> &'static ChannelRegistry {
    static REGISTRY: OnceLock<ChannelRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| std::sync::Mutex::new(HashMap::new()))
}

impl ChannelDetector {
    /// Registers a fresh channel under `key` and returns the sending half;
    /// a later `ChannelDetector::from_uri(key)` consumes the receiving half.
    fn register(key: &str) -> mpsc::UnboundedSender<Option<Address>> {
        let (tx, rx) = mpsc::unbounded_channel();
        channel_registry().lock().unwrap().insert(key.to_owned(), rx);
        tx
    }
}

#[async_trait]
impl MasterDetector for ChannelDetector {
    fn from_uri(uri: &str) -> Result<Self, DetectorError> {
        let rx = channel_registry()
            .lock()
            .unwrap()
            .remove(uri)
            .ok_or_else(|| DetectorError::uri(format!("no channel registered for `{uri}`")))?;
        Ok(Self {
            rx: AsyncMutex::new(rx),
        })
    }

    async fn detect(&self, _previous: Option<&Address>) -> Result<Option<Address>, DetectorError> {
        let mut rx = self.rx.lock().await;
        match rx.recv().await {
            Some(leader) => Ok(leader),
            None => std::future::pending().await,
        }
    }
}
