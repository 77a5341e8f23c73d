use uuid::Uuid;

use crate::{
    framework::FrameworkInfo,
    ids::{ExecutorId, FrameworkId, OfferId, SlaveId, TaskId},
    offer::{Filters, MasterInfo, Offer},
    resource::ResourceRequest,
    task::{TaskInfo, TaskStatus},
};

/// A message exchanged on the wire-level actor bus between the scheduler
/// process and whatever is addressed — the master, a slave, or (for the
/// local `TASK_LOST` loop-back of `spec.md` §4.1) the scheduler process
/// itself. Every addressable process receives the same enum and matches on
/// the subset it understands, exactly as the upstream `ProtobufProcess`
/// model dispatches a shared pid-addressed bus by message type; the
/// inbound/outbound split in `spec.md` §6 is a description of *direction*,
/// not of two distinct wire types.
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    // --- master -> scheduler ---
    FrameworkRegistered {
        framework_id: FrameworkId,
        master_info: MasterInfo,
    },
    FrameworkReregistered {
        framework_id: FrameworkId,
        master_info: MasterInfo,
    },
    ResourceOffers {
        offers: Vec<Offer>,
        pids: Vec<crate::address::Address>,
    },
    RescindResourceOffer {
        offer_id: OfferId,
    },
    StatusUpdate {
        status: TaskStatus,
        slave_id: Option<SlaveId>,
        uuid: Uuid,
    },
    LostSlave {
        slave_id: SlaveId,
    },
    FrameworkError {
        message: String,
    },

    // --- executor -> scheduler ---
    ExecutorToFramework {
        executor_id: ExecutorId,
        slave_id: SlaveId,
        data: Vec<u8>,
    },

    // --- scheduler -> master ---
    RegisterFramework {
        framework: FrameworkInfo,
    },
    ReregisterFramework {
        framework: FrameworkInfo,
        failover: bool,
    },
    UnregisterFramework {
        framework_id: FrameworkId,
    },
    LaunchTasks {
        framework_id: FrameworkId,
        tasks: Vec<TaskInfo>,
        filters: Filters,
        offer_ids: Vec<OfferId>,
    },
    KillTask {
        framework_id: FrameworkId,
        task_id: TaskId,
    },
    ResourceRequest {
        framework_id: FrameworkId,
        requests: Vec<ResourceRequest>,
    },
    ReviveOffers {
        framework_id: FrameworkId,
    },
    ReconcileTasks {
        framework_id: FrameworkId,
        statuses: Vec<TaskStatus>,
    },
    StatusUpdateAcknowledgement {
        framework_id: FrameworkId,
        slave_id: Option<SlaveId>,
        task_id: TaskId,
        uuid: Uuid,
    },

    // --- scheduler -> executor (direct, or via master if slave unknown) ---
    FrameworkToExecutor {
        framework_id: FrameworkId,
        executor_id: ExecutorId,
        slave_id: SlaveId,
        data: Vec<u8>,
    },
}
