//! The wire-level actor runtime seam.
//!
//! `spec.md` §1 scopes the actor runtime (addressable processes, send,
//! link/death-notification, delayed self-dispatch) as an **external**
//! collaborator: in a production deployment this would be backed by a real
//! TCP transport to the master and its slaves. `ActorRuntime` is the trait
//! boundary that stands in for it, and [`LocalActorSystem`] is the
//! in-process convenience implementation used by the demo binary and by
//! every test in this workspace — per `spec.md` §9 ("Global singletons...
//! allow a process-wide default only as a convenience factory that is never
//! implicit inside the core's logic"), nothing in `crate::process` reaches
//! for a default; a runtime handle is always passed in explicitly.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use corral_proto::{Address, Message};
use tokio::sync::{mpsc, oneshot};

/// A process mailbox: the receiving half returned by
/// [`ActorRuntime::register`], paired with the `(from, message)` it
/// delivers. Bounded, per `DriverConfig::mailbox_capacity`
/// (`spec.md` REDESIGN FLAGS: a real transport applies backpressure on the
/// wire, unlike the driver's own unbounded command dispatch).
pub type Mailbox = mpsc::Receiver<(Address, Message)>;

/// Addressable, send/link capable process registry.
///
/// Implementors must support best-effort delivery (sending to an
/// unregistered or departed address is a silent no-op, matching a real
/// transport's behavior towards a peer that is no longer reachable) and
/// fan-out death notification to however many `link` callers are
/// outstanding for a given address.
pub trait ActorRuntime: Send + Sync + 'static {
    /// Registers a mailbox at `address`. Panics if `address` is already
    /// registered — addresses are expected to be unique per process
    /// lifetime (callers mint a fresh one, e.g. with a random suffix, per
    /// `spec.md`'s `unique_suffix` precedent in the original source).
    fn register(&self, address: Address) -> Mailbox;

    /// Removes the mailbox at `address`, if any, and wakes any outstanding
    /// `link` watchers as if the peer had exited.
    fn unregister(&self, address: &Address);

    /// Delivers `message` to whatever is registered at `to`, tagging it
    /// with `from`. Drops the message silently if nothing is registered.
    fn send(&self, from: Address, to: &Address, message: Message);

    /// Resolves once `address` is observed to have exited (unregistered,
    /// or never registered to begin with — a link to a not-yet-live peer
    /// still completes when that peer later exits).
    fn link(&self, address: Address) -> oneshot::Receiver<()>;
}

#[derive(Default)]
struct Registry {
    mailboxes: HashMap<Address, mpsc::Sender<(Address, Message)>>,
    watchers: HashMap<Address, Vec<oneshot::Sender<()>>>,
}

/// An in-process [`ActorRuntime`]: every registered address lives in the
/// same tokio runtime, addressed by value rather than by socket. Good
/// enough to run the full registration/offer/launch protocol end to end in
/// tests and in the demo binary against a mock master; a deployment that
/// talks to a real Mesos-style master would replace this with a TCP-backed
/// implementation of the same trait.
#[derive(Clone)]
pub struct LocalActorSystem {
    inner: Arc<Mutex<Registry>>,
    capacity: usize,
}

impl LocalActorSystem {
    /// Mailboxes sized to [`crate::config::DEFAULT_MAILBOX_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(crate::config::DEFAULT_MAILBOX_CAPACITY)
    }

    /// Mailboxes sized to `capacity`, e.g. `DriverConfig::mailbox_capacity`.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry::default())),
            capacity,
        }
    }
}

impl Default for LocalActorSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorRuntime for LocalActorSystem {
    fn register(&self, address: Address) -> Mailbox {
        let (tx, rx) = mpsc::channel(self.capacity);
        let mut registry = self.inner.lock().expect("actor registry poisoned");
        assert!(
            registry.mailboxes.insert(address.clone(), tx).is_none(),
            "address {address} registered twice"
        );
        rx
    }

    fn unregister(&self, address: &Address) {
        let mut registry = self.inner.lock().expect("actor registry poisoned");
        registry.mailboxes.remove(address);
        if let Some(watchers) = registry.watchers.remove(address) {
            for watcher in watchers {
                let _ = watcher.send(());
            }
        }
    }

    fn send(&self, from: Address, to: &Address, message: Message) {
        let registry = self.inner.lock().expect("actor registry poisoned");
        if let Some(tx) = registry.mailboxes.get(to) {
            // Best-effort, non-blocking delivery: a closed receiver means the
            // process already exited, and a full mailbox means the peer is
            // overloaded. A real transport would drop in both cases rather
            // than block the sender, so `try_send` is the right primitive
            // here rather than the async `send`.
            match tx.try_send((from, message)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(%to, "dropping message: mailbox full");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(%to, "dropping message: mailbox closed");
                }
            }
        } else {
            tracing::debug!(%to, "dropping message to unregistered address");
        }
    }

    fn link(&self, address: Address) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        let mut registry = self.inner.lock().expect("actor registry poisoned");
        if registry.mailboxes.contains_key(&address) {
            registry.watchers.entry(address).or_default().push(tx);
        } else {
            // Already gone (or never existed): resolve immediately.
            let _ = tx.send(());
        }
        rx
    }
}
