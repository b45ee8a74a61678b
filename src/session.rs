//! Session
//!
//! Wires the store, the current selection, the device, the persistence layer
//! and the notification bus together. Every mutation runs against a staged
//! copy of the store and selection which is committed only if the whole
//! operation succeeds; notifications are published after the commit, with the
//! session lock released.

use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::config::Config;
use crate::controller::{
    BanksController, ComponentDataController, ParamsController, PatchesController,
};
use crate::current::{CurrentController, CurrentSelection};
use crate::device::Device;
use crate::error::{EntityKind, PatchbayError, Result};
use crate::model::{Bank, BankId, Patch, PatchId};
use crate::notification::{Notification, NotificationBus};
use crate::persistence::Persistence;
use crate::store::Sequence;

/// Committed state, guarded by the session lock
struct Rig {
    banks: Sequence<Bank>,
    selection: CurrentSelection,
    device: Box<dyn Device>,
    dao: Box<dyn Persistence>,
}

/// Working copy an operation mutates before it is committed
pub(crate) struct Staged<'a> {
    pub(crate) banks: Sequence<Bank>,
    pub(crate) selection: CurrentSelection,
    pub(crate) device: &'a mut Box<dyn Device>,
    pub(crate) dao: &'a mut Box<dyn Persistence>,
    /// Selection as last written to persistence
    persisted: CurrentSelection,
    notifications: Vec<Notification>,
}

impl Staged<'_> {
    /// Queue a notification for publication after commit
    pub(crate) fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }

    /// Write the selection if it moved since it was last persisted
    pub(crate) fn persist_selection(&mut self) -> Result<()> {
        if self.selection != self.persisted {
            self.dao.save_current(&self.selection)?;
            self.persisted = self.selection;
        }
        Ok(())
    }

    /// Persist the bank at `index` at its current position
    pub(crate) fn save_bank_at(&mut self, index: usize) -> Result<()> {
        let bank = self.banks.get(index).ok_or(PatchbayError::IndexRange {
            kind: EntityKind::Bank,
            index,
            len: self.banks.len(),
        })?;
        self.dao.save_bank(bank, index)
    }

    pub(crate) fn bank_at(&self, index: usize) -> Result<&Bank> {
        self.banks.get(index).ok_or(PatchbayError::IndexRange {
            kind: EntityKind::Bank,
            index,
            len: self.banks.len(),
        })
    }

    pub(crate) fn bank_mut(&mut self, index: usize) -> Result<&mut Bank> {
        let len = self.banks.len();
        self.banks.get_mut(index).ok_or(PatchbayError::IndexRange {
            kind: EntityKind::Bank,
            index,
            len,
        })
    }

    /// Bank and patch indices of the patch with `id`
    pub(crate) fn locate_patch(&self, id: PatchId) -> Result<(usize, usize)> {
        self.banks
            .iter()
            .enumerate()
            .find_map(|(bank_index, bank)| {
                bank.patches()
                    .position(id)
                    .map(|patch_index| (bank_index, patch_index))
            })
            .ok_or_else(|| PatchbayError::not_found(EntityKind::Patch, id))
    }

    /// Is a patch with `id` held by any bank other than `except`?
    pub(crate) fn holds_patch(&self, id: PatchId, except: Option<BankId>) -> bool {
        self.banks
            .iter()
            .filter(|bank| Some(bank.id()) != except)
            .any(|bank| bank.patches().contains(id))
    }

    /// Refuse `bank` if one of its patches already lives in another bank
    pub(crate) fn check_patches_unique(&self, bank: &Bank, except: Option<BankId>) -> Result<()> {
        match bank
            .patches()
            .iter()
            .find(|patch| self.holds_patch(patch.id(), except))
        {
            Some(patch) => Err(PatchbayError::duplicate(EntityKind::Patch, patch.id())),
            None => Ok(()),
        }
    }
}

/// A running set of banks with its current selection
///
/// Operations are synchronous. Concurrent callers are serialised by the
/// session lock; observers are called after the lock is released and may
/// call back into the session.
pub struct Session {
    rig: Mutex<Rig>,
    bus: Arc<NotificationBus>,
}

impl Session {
    /// Load the stored banks and selection and bring the device up to date
    ///
    /// An empty store is seeded with one bank holding one patch, named from
    /// `config`. A stored selection that no longer points at a patch falls
    /// back to the first bank that has one.
    pub fn open(
        config: &Config,
        device: Box<dyn Device>,
        mut dao: Box<dyn Persistence>,
        bus: Arc<NotificationBus>,
    ) -> Result<Self> {
        let mut banks = Sequence::new();
        for bank in dao.load_all()? {
            let clash = bank
                .patches()
                .iter()
                .any(|patch| banks.iter().any(|held: &Bank| held.patches().contains(patch.id())));
            let (id, name) = (bank.id(), bank.name.clone());
            if clash || banks.append(bank).is_err() {
                warn!("Skipping stored bank '{}' ({}): repeats an entity already loaded", name, id);
            }
        }

        if banks.is_empty() {
            let seed = Bank::new(config.default_bank_name.clone())
                .with_patch(Patch::new(config.default_patch_name.clone()))?;
            dao.save_bank(&seed, 0)?;
            info!("Created default bank '{}'", seed.name);
            banks.append(seed)?;
        }

        let stored = dao.load_current()?;
        let selection = match stored.filter(|selection| selection.is_valid(&banks)) {
            Some(selection) => selection,
            None => {
                if let Some(invalid) = stored {
                    warn!(
                        "Stored selection (bank {}, patch {}) is out of range, resetting",
                        invalid.bank_index, invalid.patch_index
                    );
                }
                let selection = Self::first_selectable(config, &mut banks, dao.as_mut())?;
                dao.save_current(&selection)?;
                selection
            }
        };

        let mut device = device;
        device.load(selection.patch(&banks)?)?;
        info!(
            "Session opened with {} bank(s), current bank {} patch {}",
            banks.len(),
            selection.bank_index,
            selection.patch_index
        );

        Ok(Self {
            rig: Mutex::new(Rig {
                banks,
                selection,
                device,
                dao,
            }),
            bus,
        })
    }

    /// First bank with a patch; seeds one into the first bank if none has any
    fn first_selectable(
        config: &Config,
        banks: &mut Sequence<Bank>,
        dao: &mut dyn Persistence,
    ) -> Result<CurrentSelection> {
        if let Some(index) = banks.iter().position(|bank| !bank.patches().is_empty()) {
            return Ok(CurrentSelection::new(index, 0));
        }

        let first = banks.get_mut(0).ok_or(PatchbayError::EmptySelection {
            reason: "no banks".to_string(),
        })?;
        first.append(Patch::new(config.default_patch_name.clone()))?;
        dao.save_bank(first, 0)?;
        warn!("No stored bank has patches, seeded '{}'", first.name);
        Ok(CurrentSelection::new(0, 0))
    }

    pub fn bus(&self) -> &Arc<NotificationBus> {
        &self.bus
    }

    /// Create, update, delete and reorder banks
    pub fn banks(&self) -> BanksController<'_> {
        BanksController::new(self)
    }

    /// Create, update, delete and reorder patches inside their banks
    pub fn patches(&self) -> PatchesController<'_> {
        PatchesController::new(self)
    }

    /// Change parameter values inside patch payloads
    pub fn params(&self) -> ParamsController<'_> {
        ParamsController::new(self)
    }

    /// Keyed settings of client components, kept next to the banks
    pub fn component_data(&self) -> ComponentDataController<'_> {
        ComponentDataController::new(self)
    }

    /// Read and change the current selection
    pub fn current(&self) -> CurrentController<'_> {
        CurrentController::new(self)
    }

    /// Copy of every bank, in order
    pub fn snapshot(&self) -> Vec<Bank> {
        self.read(|banks, _| banks.iter().cloned().collect())
    }

    pub fn bank(&self, id: BankId) -> Option<Bank> {
        self.read(|banks, _| banks.find(id).cloned())
    }

    pub fn patch(&self, id: PatchId) -> Option<Patch> {
        self.read(|banks, _| {
            banks
                .iter()
                .find_map(|bank| bank.patches().find(id).cloned())
        })
    }

    pub fn index_of_bank(&self, id: BankId) -> Option<usize> {
        self.read(|banks, _| banks.position(id))
    }

    /// Derived index of `patch` inside the bank it points back to
    pub fn index_of_patch(&self, patch: &Patch) -> Option<usize> {
        let owner = patch.bank()?;
        self.read(|banks, _| banks.find(owner)?.patches().position(patch.id()))
    }

    /// The selection points at an existing bank and patch
    pub fn is_consistent(&self) -> bool {
        self.read(|banks, selection| selection.is_valid(banks))
    }

    pub(crate) fn read<R>(&self, f: impl FnOnce(&Sequence<Bank>, CurrentSelection) -> R) -> R {
        let rig = self.rig.lock();
        f(&rig.banks, rig.selection)
    }

    pub(crate) fn read_dao<R>(&self, f: impl FnOnce(&dyn Persistence) -> R) -> R {
        let rig = self.rig.lock();
        f(&*rig.dao)
    }

    /// Run `op` against a staged copy and commit it only if it succeeds
    ///
    /// Queued notifications are published after the commit, skipping the
    /// observer whose token equals `token`.
    pub(crate) fn transact<R>(
        &self,
        token: Option<&str>,
        op: impl FnOnce(&mut Staged<'_>) -> Result<R>,
    ) -> Result<R> {
        let (result, notifications) = {
            let mut guard = self.rig.lock();
            let rig = &mut *guard;
            let mut staged = Staged {
                banks: rig.banks.clone(),
                selection: rig.selection,
                device: &mut rig.device,
                dao: &mut rig.dao,
                persisted: rig.selection,
                notifications: Vec::new(),
            };

            let result = op(&mut staged)?;
            debug_assert!(
                staged.selection.is_valid(&staged.banks),
                "selection left dangling: {:?}",
                staged.selection
            );

            let Staged {
                banks,
                selection,
                notifications,
                ..
            } = staged;
            rig.banks = banks;
            rig.selection = selection;
            (result, notifications)
        };

        debug!("Committed operation, {} notification(s) queued", notifications.len());
        self.bus.publish_all(&notifications, token);
        Ok(result)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (banks, selection) = self.read(|banks, selection| (banks.len(), selection));
        f.debug_struct("Session")
            .field("banks", &banks)
            .field("selection", &selection)
            .field("bus", &self.bus)
            .finish()
    }
}
