//! The user-supplied scheduler callback object (`spec.md` §6).

use async_trait::async_trait;
use corral_proto::{ExecutorId, FrameworkId, MasterInfo, Offer, OfferId, SlaveId, TaskStatus};

use crate::driver::SchedulerDriver;

/// The policy brain. Every method runs on the scheduler process's single
/// thread (`spec.md` §5 "User callbacks execute on the scheduler process's
/// single thread"); implementations must not block for long, but may freely
/// dispatch further driver commands — re-entry is safe because the driver
/// never holds its mutex across a dispatch call.
///
/// Every method has a default no-op body so an implementation only needs to
/// override the callbacks it cares about, matching the permissive style of
/// the upstream `Scheduler` interface (most real schedulers only implement
/// a handful of these).
#[async_trait]
pub trait Scheduler: Send + Sync + 'static {
    async fn registered(
        &mut self,
        _driver: &SchedulerDriver,
        _framework_id: FrameworkId,
        _master_info: MasterInfo,
    ) {
    }

    async fn reregistered(&mut self, _driver: &SchedulerDriver, _master_info: MasterInfo) {}

    async fn disconnected(&mut self, _driver: &SchedulerDriver) {}

    async fn resource_offers(&mut self, _driver: &SchedulerDriver, _offers: Vec<Offer>) {}

    async fn offer_rescinded(&mut self, _driver: &SchedulerDriver, _offer_id: OfferId) {}

    async fn status_update(&mut self, _driver: &SchedulerDriver, _status: TaskStatus) {}

    async fn framework_message(
        &mut self,
        _driver: &SchedulerDriver,
        _executor_id: ExecutorId,
        _slave_id: SlaveId,
        _data: Vec<u8>,
    ) {
    }

    async fn slave_lost(&mut self, _driver: &SchedulerDriver, _slave_id: SlaveId) {}

    async fn error(&mut self, _driver: &SchedulerDriver, _message: String) {}
}
