use std::{collections::BTreeMap, fmt};

use crate::ids::FrameworkId;

/// Identity of the framework, as handed to `register`/`reregister`.
///
/// `id` is assigned by the master on first registration; `None` means "never
/// registered". `user` and `hostname` are defaulted by the driver
/// constructor (see `corral_core::driver`) when left empty, not here — this
/// type carries whatever the caller supplied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrameworkInfo {
    pub id: Option<FrameworkId>,
    pub user: String,
    pub name: String,
    pub hostname: String,
    pub principal: Option<String>,
    pub webui_url: Option<String>,
    /// Fields that are opaque to the core and forwarded verbatim to the
    /// master (roles, capabilities, labels, ...).
    pub extra: BTreeMap<String, String>,
}

/// Opaque authentication material. Stored on the process, never consumed by
/// the core — see `spec.md` §1 ("Credential/authentication ... known
/// extension point; not implemented").
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub principal: String,
    pub secret: Vec<u8>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("principal", &self.principal)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}
