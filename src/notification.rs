//! Notification Bus
//!
//! Observers register once and receive bank, patch, current-selection and
//! param changes through separate callbacks. A change is never delivered back
//! to the observer whose token matches the token of the request that caused
//! it.

use std::sync::Arc;

use log::debug;
use parking_lot::RwLock;

use crate::model::{Bank, BankId, Param, Patch, UpdateType};

/// A bank was created, updated or deleted
#[derive(Debug, Clone)]
pub struct BankChange {
    pub bank: Bank,
    pub update: UpdateType,
    /// Position in the bank sequence; for `Deleted`, the position it was removed from
    pub index: usize,
}

/// A patch was created, updated or deleted
#[derive(Debug, Clone)]
pub struct PatchChange {
    pub patch: Patch,
    pub update: UpdateType,
    /// Position in the owning bank; for `Deleted`, the position it was removed from
    pub index: usize,
    pub bank: BankId,
}

/// Receiver of change notifications
///
/// Every callback has an empty default so implementors only override the
/// categories they care about.
pub trait Observer: Send + Sync {
    /// Token identifying requests made by this observer
    fn token(&self) -> Option<&str> {
        None
    }

    fn on_bank_update(&self, _change: &BankChange, _token: Option<&str>) {}

    fn on_patch_update(&self, _change: &PatchChange, _token: Option<&str>) {}

    fn on_current_change(&self, _patch: &Patch, _token: Option<&str>) {}

    fn on_param_value_change(&self, _param: &Param, _token: Option<&str>) {}
}

/// A queued change, published once the operation that produced it has committed
#[derive(Debug, Clone)]
pub enum Notification {
    Bank(BankChange),
    Patch(PatchChange),
    Current(Patch),
    Param(Param),
}

impl Notification {
    pub(crate) fn bank(bank: Bank, update: UpdateType, index: usize) -> Self {
        Notification::Bank(BankChange {
            bank,
            update,
            index,
        })
    }

    pub(crate) fn patch(patch: Patch, update: UpdateType, index: usize, bank: BankId) -> Self {
        Notification::Patch(PatchChange {
            patch,
            update,
            index,
            bank,
        })
    }

    fn label(&self) -> String {
        match self {
            Notification::Bank(change) => format!("bank {} '{}'", change.update, change.bank.name),
            Notification::Patch(change) => {
                format!("patch {} '{}'", change.update, change.patch.name)
            }
            Notification::Current(patch) => format!("current change to '{}'", patch.name),
            Notification::Param(param) => format!("param change at {}", param.path),
        }
    }

    fn deliver(&self, observer: &dyn Observer, token: Option<&str>) {
        match self {
            Notification::Bank(change) => observer.on_bank_update(change, token),
            Notification::Patch(change) => observer.on_patch_update(change, token),
            Notification::Current(patch) => observer.on_current_change(patch, token),
            Notification::Param(param) => observer.on_param_value_change(param, token),
        }
    }
}

/// Registry of observers
///
/// Shared through an `Arc` by whoever wires the session together.
#[derive(Default)]
pub struct NotificationBus {
    observers: RwLock<Vec<Arc<dyn Observer>>>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, observer: Arc<dyn Observer>) {
        self.observers.write().push(observer);
    }

    /// Remove an observer; unknown observers are ignored
    pub fn unregister(&self, observer: &Arc<dyn Observer>) {
        self.observers
            .write()
            .retain(|registered| !Arc::ptr_eq(registered, observer));
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }

    /// Is `observer` the one that issued the request carrying `token`?
    ///
    /// An empty request token or an observer without a token never matches.
    pub fn is_requester(observer: &dyn Observer, token: Option<&str>) -> bool {
        match (observer.token(), token) {
            (Some(own), Some(request)) => !request.is_empty() && own == request,
            _ => false,
        }
    }

    /// Deliver one notification to every observer except the requester
    ///
    /// Dispatch runs over a snapshot taken before the first callback, with the
    /// registry lock released, so callbacks may register, unregister or start
    /// new operations.
    pub fn publish(&self, notification: &Notification, token: Option<&str>) {
        self.publish_all(std::slice::from_ref(notification), token);
    }

    /// Deliver a batch in order over a single snapshot of the registry
    ///
    /// An observer registered by a callback receives nothing from the rest of
    /// the batch, and one unregistered by a callback still receives all of it.
    pub fn publish_all(&self, notifications: &[Notification], token: Option<&str>) {
        if notifications.is_empty() {
            return;
        }
        let snapshot: Vec<Arc<dyn Observer>> = self.observers.read().clone();
        for notification in notifications {
            debug!(
                "Publishing {} to {} observer(s)",
                notification.label(),
                snapshot.len()
            );
            for observer in &snapshot {
                if !Self::is_requester(observer.as_ref(), token) {
                    notification.deliver(observer.as_ref(), token);
                }
            }
        }
    }
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus")
            .field("observers", &self.len())
            .finish()
    }
}
