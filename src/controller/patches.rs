//! Patch Orchestrator
//!
//! Same contract as the bank side, one level down: every edit keeps the
//! current patch current by identity, and deleting it moves the selection to
//! the next patch of the same bank.

use log::{debug, info};

use crate::error::{EntityKind, PatchbayError, Result};
use crate::model::{BankId, Patch, PatchId, UpdateType};
use crate::notification::Notification;
use crate::session::{Session, Staged};

pub struct PatchesController<'a> {
    session: &'a Session,
}

impl Staged<'_> {
    /// Queue a patch notification for the patch at `(bank_index, patch_index)`
    fn notify_patch_at(
        &mut self,
        bank_index: usize,
        patch_index: usize,
        update: UpdateType,
    ) -> Result<()> {
        let bank = self.bank_at(bank_index)?;
        let bank_id = bank.id();
        let patch = bank
            .patches()
            .get(patch_index)
            .cloned()
            .ok_or(PatchbayError::IndexRange {
                kind: EntityKind::Patch,
                index: patch_index,
                len: bank.patches().len(),
            })?;
        self.notify(Notification::patch(patch, update, patch_index, bank_id));
        Ok(())
    }
}

impl<'a> PatchesController<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Append `patch` to the bank `bank`, returning its index there
    pub fn create(&self, bank: BankId, patch: Patch, token: Option<&str>) -> Result<usize> {
        self.session.transact(token, move |staged| {
            let bank_index = staged.banks.require(bank)?;
            if staged.holds_patch(patch.id(), None) {
                return Err(PatchbayError::duplicate(EntityKind::Patch, patch.id()));
            }

            let name = patch.name.clone();
            let index = staged.bank_mut(bank_index)?.append(patch)?;
            staged.save_bank_at(bank_index)?;

            debug!("Created patch '{}' at {} in bank {}", name, index, bank_index);
            staged.notify_patch_at(bank_index, index, UpdateType::Created)?;
            Ok(index)
        })
    }

    /// Store new content for the patch with the same id, reloading the device
    /// if it is the current patch
    pub fn update(&self, patch: Patch, token: Option<&str>) -> Result<()> {
        self.session.transact(token, move |staged| {
            let (bank_index, patch_index) = staged.locate_patch(patch.id())?;
            let is_current = staged.is_current_patch(patch.id());

            staged.bank_mut(bank_index)?.replace_patch(patch.id(), patch)?;
            if is_current {
                staged.reload_current()?;
            }
            staged.save_bank_at(bank_index)?;

            staged.notify_patch_at(bank_index, patch_index, UpdateType::Updated)
        })
    }

    /// Remove a patch from its bank
    ///
    /// Deleting the current patch makes the next patch of the same bank (in
    /// circular order) current. The only patch of the current bank cannot be
    /// deleted.
    pub fn delete(&self, id: PatchId, token: Option<&str>) -> Result<()> {
        self.session.transact(token, move |staged| {
            let (bank_index, patch_index) = staged.locate_patch(id)?;
            let in_current_bank = bank_index == staged.selection.bank_index;
            let bank_id = staged.bank_at(bank_index)?.id();

            let was_current = staged.is_current_patch(id);
            let anchor = if in_current_bank {
                let mut anchor = staged.anchor()?;
                if was_current {
                    anchor.patch = staged
                        .current_bank()?
                        .patches()
                        .successor(id)
                        .ok_or_else(|| PatchbayError::EmptySelection {
                            reason: "cannot delete the only patch of the current bank"
                                .to_string(),
                        })?;
                }
                Some(anchor)
            } else {
                None
            };

            let removed = staged.bank_mut(bank_index)?.remove_patch(id)?;
            if let Some(anchor) = anchor {
                staged.relocate(anchor)?;
            }
            if was_current {
                staged.reload_current()?;
            }

            staged.save_bank_at(bank_index)?;
            staged.persist_selection()?;

            debug!("Deleted patch '{}' from {} in bank {}", removed.name, patch_index, bank_index);
            staged.notify(Notification::patch(
                removed,
                UpdateType::Deleted,
                patch_index,
                bank_id,
            ));
            if was_current {
                let current = staged.current_patch()?.clone();
                info!("Current patch deleted, moved to '{}'", current.name);
                staged.notify(Notification::Current(current));
            }
            Ok(())
        })
    }

    /// Exchange the positions of two patches of the same bank
    pub fn swap(&self, a: PatchId, b: PatchId, token: Option<&str>) -> Result<()> {
        self.session.transact(token, move |staged| {
            let (bank_index, index_a) = staged.locate_patch(a)?;
            let index_b = staged.bank_at(bank_index)?.patches().require(b)?;
            if a == b {
                return Ok(());
            }

            let anchor = staged.anchor()?;
            staged.bank_mut(bank_index)?.swap_patches(a, b)?;
            staged.relocate(anchor)?;

            staged.save_bank_at(bank_index)?;
            staged.persist_selection()?;

            staged.notify_patch_at(bank_index, index_b, UpdateType::Updated)?;
            staged.notify_patch_at(bank_index, index_a, UpdateType::Updated)
        })
    }

    /// Put `new` in place of the patch `old`, in the same bank and position
    ///
    /// If `old` was current, `new` becomes current and is loaded.
    pub fn replace(&self, old: PatchId, new: Patch, token: Option<&str>) -> Result<()> {
        self.session.transact(token, move |staged| {
            let (bank_index, patch_index) = staged.locate_patch(old)?;
            if new.id() != old && staged.holds_patch(new.id(), None) {
                return Err(PatchbayError::duplicate(EntityKind::Patch, new.id()));
            }
            let was_current = staged.is_current_patch(old);

            let replaced = staged.bank_mut(bank_index)?.replace_patch(old, new)?;
            if was_current {
                staged.reload_current()?;
            }
            staged.save_bank_at(bank_index)?;

            debug!("Replaced patch '{}' at {} in bank {}", replaced.name, patch_index, bank_index);
            staged.notify_patch_at(bank_index, patch_index, UpdateType::Updated)?;
            if was_current {
                let current = staged.current_patch()?.clone();
                staged.notify(Notification::Current(current));
            }
            Ok(())
        })
    }

    /// Move a patch within its bank to `new_index` (clamped), returning where
    /// it ended up
    pub fn move_to(&self, id: PatchId, new_index: usize, token: Option<&str>) -> Result<usize> {
        self.session.transact(token, move |staged| {
            let (bank_index, old_index) = staged.locate_patch(id)?;
            let len = staged.bank_at(bank_index)?.patches().len();
            let target = new_index.min(len - 1);
            if target == old_index {
                return Ok(old_index);
            }

            let anchor = staged.anchor()?;
            let moved_to = staged.bank_mut(bank_index)?.move_patch(id, target)?;
            staged.relocate(anchor)?;

            staged.save_bank_at(bank_index)?;
            staged.persist_selection()?;

            let bank = staged.bank_at(bank_index)?;
            let bank_id = bank.id();
            let patch = bank
                .patches()
                .get(moved_to)
                .cloned()
                .ok_or(PatchbayError::IndexRange {
                    kind: EntityKind::Patch,
                    index: moved_to,
                    len,
                })?;
            debug!("Moved patch '{}' from {} to {}", patch.name, old_index, moved_to);
            staged.notify(Notification::patch(
                patch.clone(),
                UpdateType::Deleted,
                old_index,
                bank_id,
            ));
            staged.notify(Notification::patch(patch, UpdateType::Created, moved_to, bank_id));
            Ok(moved_to)
        })
    }
}
