use crate::{
    address::Address,
    ids::{FrameworkId, OfferId, SlaveId},
    resource::Resource,
};

/// A timestamped promise from the master granting a bundle of resources on a
/// specific slave. Consumed by launching tasks against it, or rescinded.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Offer {
    pub id: OfferId,
    pub framework_id: FrameworkId,
    pub slave_id: SlaveId,
    pub hostname: String,
    pub resources: Vec<Resource>,
}

/// Per-launch filtering hints passed back to the master (e.g. "don't offer
/// me anything for the next N seconds"). `None` fields take the master's
/// default.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Filters {
    pub refuse_seconds: Option<f64>,
}

/// The distinguished address of the current leading master, together with
/// whatever identifying metadata it advertises. Carried verbatim into the
/// `registered`/`reregistered` callbacks.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MasterInfo {
    pub id: String,
    pub address: Address,
    pub version: Option<String>,
}
