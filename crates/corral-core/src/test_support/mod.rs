//! In-process test harness: a mock master and a callback-recording
//! scheduler, the Rust equivalent of the scenario mocks in `spec.md` §8.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use corral_proto::{
    Address, ExecutorId, FrameworkId, MasterInfo, Message, Offer, OfferId, SlaveId, TaskStatus,
};

use crate::{driver::SchedulerDriver, runtime::ActorRuntime, scheduler::Scheduler};

/// Stands in for the master side of the wire: registers its own address on
/// the shared [`ActorRuntime`], lets a test drain whatever the scheduler
/// process sent it, and lets a test play the role of the master by sending
/// messages back.
pub struct MockMaster {
    address: Address,
    runtime: Arc<dyn ActorRuntime>,
    inbox: crate::runtime::Mailbox,
}

impl MockMaster {
    pub fn new(runtime: Arc<dyn ActorRuntime>, address: Address) -> Self {
        let inbox = runtime.register(address.clone());
        Self {
            address,
            runtime,
            inbox,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    /// Waits for the next message the scheduler process sent to this
    /// address.
    pub async fn recv(&mut self) -> Option<(Address, Message)> {
        self.inbox.recv().await
    }

    /// Plays the master: sends `message` to `to` as if it originated here.
    pub fn send(&self, to: &Address, message: Message) {
        self.runtime.send(self.address.clone(), to, message);
    }
}

/// Every callback invocation a [`RecordingScheduler`] observed, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum SchedulerEvent {
    Registered {
        framework_id: FrameworkId,
        master_info: MasterInfo,
    },
    Reregistered {
        master_info: MasterInfo,
    },
    Disconnected,
    ResourceOffers(Vec<Offer>),
    OfferRescinded(OfferId),
    StatusUpdate(TaskStatus),
    FrameworkMessage {
        executor_id: ExecutorId,
        slave_id: SlaveId,
        data: Vec<u8>,
    },
    SlaveLost(SlaveId),
    Error(String),
}

/// A [`Scheduler`] that records every callback invocation instead of
/// implementing any policy, for test assertions. Cheaply cloneable: clone
/// it before handing ownership to a [`SchedulerDriver`] so the test retains
/// a handle onto the same event log.
#[derive(Clone, Default)]
pub struct RecordingScheduler {
    events: Arc<Mutex<Vec<SchedulerEvent>>>,
}

impl RecordingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<SchedulerEvent> {
        self.events.lock().expect("recording scheduler poisoned").clone()
    }

    fn push(&self, event: SchedulerEvent) {
        self.events.lock().expect("recording scheduler poisoned").push(event);
    }
}

#[async_trait]
impl Scheduler for RecordingScheduler {
    async fn registered(
        &mut self,
        _driver: &SchedulerDriver,
        framework_id: FrameworkId,
        master_info: MasterInfo,
    ) {
        self.push(SchedulerEvent::Registered {
            framework_id,
            master_info,
        });
    }

    async fn reregistered(&mut self, _driver: &SchedulerDriver, master_info: MasterInfo) {
        self.push(SchedulerEvent::Reregistered { master_info });
    }

    async fn disconnected(&mut self, _driver: &SchedulerDriver) {
        self.push(SchedulerEvent::Disconnected);
    }

    async fn resource_offers(&mut self, _driver: &SchedulerDriver, offers: Vec<Offer>) {
        self.push(SchedulerEvent::ResourceOffers(offers));
    }

    async fn offer_rescinded(&mut self, _driver: &SchedulerDriver, offer_id: OfferId) {
        self.push(SchedulerEvent::OfferRescinded(offer_id));
    }

    async fn status_update(&mut self, _driver: &SchedulerDriver, status: TaskStatus) {
        self.push(SchedulerEvent::StatusUpdate(status));
    }

    async fn framework_message(
        &mut self,
        _driver: &SchedulerDriver,
        executor_id: ExecutorId,
        slave_id: SlaveId,
        data: Vec<u8>,
    ) {
        self.push(SchedulerEvent::FrameworkMessage {
            executor_id,
            slave_id,
            data,
        });
    }

    async fn slave_lost(&mut self, _driver: &SchedulerDriver, slave_id: SlaveId) {
        self.push(SchedulerEvent::SlaveLost(slave_id));
    }

    async fn error(&mut self, _driver: &SchedulerDriver, message: String) {
        self.push(SchedulerEvent::Error(message));
    }
}
