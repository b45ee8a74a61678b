//! Bank Orchestrator
//!
//! Creates, updates, deletes and reorders banks while keeping the current
//! selection on the same bank and patch (or on a successor when the current
//! bank goes away).

use log::{debug, info};

use crate::error::{EntityKind, PatchbayError, Result};
use crate::model::{Bank, BankId, UpdateType};
use crate::notification::Notification;
use crate::session::Session;

pub struct BanksController<'a> {
    session: &'a Session,
}

impl<'a> BanksController<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Add `bank` at the end and persist it, returning its index
    pub fn create(&self, bank: Bank, token: Option<&str>) -> Result<usize> {
        self.session.transact(token, move |staged| {
            if staged.banks.contains(bank.id()) {
                return Err(PatchbayError::duplicate(EntityKind::Bank, bank.id()));
            }
            staged.check_patches_unique(&bank, None)?;

            let index = staged.banks.append(bank.clone())?;
            staged.dao.save_bank(&bank, index)?;

            debug!("Created bank '{}' at {}", bank.name, index);
            staged.notify(Notification::bank(bank, UpdateType::Created, index));
            Ok(index)
        })
    }

    /// Store new content for the bank with the same id
    ///
    /// A changed name re-keys the stored record. If this is the current bank
    /// the device reloads the current patch, which must still exist at the
    /// current patch index.
    pub fn update(&self, bank: Bank, token: Option<&str>) -> Result<()> {
        self.session.transact(token, move |staged| {
            let index = staged.banks.require(bank.id())?;
            staged.check_patches_unique(&bank, Some(bank.id()))?;

            let is_current = staged.is_current_bank(bank.id());
            if is_current {
                let patch_index = staged.selection.patch_index;
                if bank.patches().get(patch_index).is_none() {
                    return Err(PatchbayError::IndexRange {
                        kind: EntityKind::Patch,
                        index: patch_index,
                        len: bank.patches().len(),
                    });
                }
            }

            let previous = staged.banks.replace(bank.id(), bank.clone())?;
            if is_current {
                staged.reload_current()?;
            }

            if previous.name != bank.name {
                debug!("Re-keying bank '{}' as '{}'", previous.name, bank.name);
                staged.dao.delete_bank(&previous)?;
            }
            staged.dao.save_bank(&bank, index)?;

            staged.notify(Notification::bank(bank, UpdateType::Updated, index));
            Ok(())
        })
    }

    /// Remove a bank
    ///
    /// Deleting the current bank makes the first patch of the next bank (in
    /// circular order) current. The last remaining bank cannot be deleted.
    pub fn delete(&self, id: BankId, token: Option<&str>) -> Result<()> {
        self.session.transact(token, move |staged| {
            let index = staged.banks.require(id)?;
            if staged.banks.len() == 1 {
                return Err(PatchbayError::EmptySelection {
                    reason: "cannot delete the only bank".to_string(),
                });
            }

            // The successor has to be captured while the bank is still there
            let was_current = staged.is_current_bank(id);
            let anchor = if was_current {
                let successor = staged.banks.successor(id).ok_or_else(|| {
                    PatchbayError::EmptySelection {
                        reason: "no bank left to take over".to_string(),
                    }
                })?;
                staged.anchor_first(successor)?
            } else {
                staged.anchor()?
            };

            let removed = staged.banks.remove(id)?;
            staged.relocate(anchor)?;
            if was_current {
                staged.reload_current()?;
            }

            staged.dao.delete_bank(&removed)?;
            staged.persist_selection()?;

            debug!("Deleted bank '{}' from {}", removed.name, index);
            staged.notify(Notification::bank(removed, UpdateType::Deleted, index));
            if was_current {
                let current = staged.current_patch()?.clone();
                info!("Current bank deleted, moved to '{}'", current.name);
                staged.notify(Notification::Current(current));
            }
            Ok(())
        })
    }

    /// Exchange the positions of two banks
    ///
    /// The current bank stays current; only its stored index follows it.
    pub fn swap(&self, a: BankId, b: BankId, token: Option<&str>) -> Result<()> {
        self.session.transact(token, move |staged| {
            let index_a = staged.banks.require(a)?;
            let index_b = staged.banks.require(b)?;
            if a == b {
                return Ok(());
            }

            let anchor = staged.anchor()?;
            staged.banks.swap(a, b)?;
            staged.relocate(anchor)?;

            staged.save_bank_at(index_b)?;
            staged.save_bank_at(index_a)?;
            staged.persist_selection()?;

            for index in [index_b, index_a] {
                let bank = staged.banks.get(index).cloned().ok_or(PatchbayError::IndexRange {
                    kind: EntityKind::Bank,
                    index,
                    len: staged.banks.len(),
                })?;
                staged.notify(Notification::bank(bank, UpdateType::Updated, index));
            }
            Ok(())
        })
    }

    /// Put `new` in place of the bank `old`
    ///
    /// If `old` was current, `new` becomes current at the same position and the
    /// device loads its patch at the current patch index.
    pub fn replace(&self, old: BankId, new: Bank, token: Option<&str>) -> Result<()> {
        self.session.transact(token, move |staged| {
            let index = staged.banks.require(old)?;
            if new.id() != old && staged.banks.contains(new.id()) {
                return Err(PatchbayError::duplicate(EntityKind::Bank, new.id()));
            }
            staged.check_patches_unique(&new, Some(old))?;

            let was_current = staged.is_current_bank(old);
            if was_current && new.patches().get(staged.selection.patch_index).is_none() {
                return Err(PatchbayError::IndexRange {
                    kind: EntityKind::Patch,
                    index: staged.selection.patch_index,
                    len: new.patches().len(),
                });
            }

            let replaced = staged.banks.replace(old, new.clone())?;
            if was_current {
                staged.reload_current()?;
            }

            staged.dao.delete_bank(&replaced)?;
            staged.dao.save_bank(&new, index)?;

            debug!("Replaced bank '{}' with '{}' at {}", replaced.name, new.name, index);
            staged.notify(Notification::bank(new, UpdateType::Updated, index));
            if was_current {
                let current = staged.current_patch()?.clone();
                staged.notify(Notification::Current(current));
            }
            Ok(())
        })
    }

    /// Move a bank to `new_index` (clamped), returning where it ended up
    ///
    /// Observers see the move as a deletion at the old index followed by a
    /// creation at the new one.
    pub fn move_to(&self, id: BankId, new_index: usize, token: Option<&str>) -> Result<usize> {
        self.session.transact(token, move |staged| {
            let old_index = staged.banks.require(id)?;
            let target = new_index.min(staged.banks.len() - 1);
            if target == old_index {
                return Ok(old_index);
            }

            let anchor = staged.anchor()?;
            let moved_to = staged.banks.move_to(id, target)?;
            staged.relocate(anchor)?;

            staged.save_bank_at(moved_to)?;
            staged.persist_selection()?;

            let bank = staged.banks.get(moved_to).cloned().ok_or(PatchbayError::IndexRange {
                kind: EntityKind::Bank,
                index: moved_to,
                len: staged.banks.len(),
            })?;
            debug!("Moved bank '{}' from {} to {}", bank.name, old_index, moved_to);
            staged.notify(Notification::bank(bank.clone(), UpdateType::Deleted, old_index));
            staged.notify(Notification::bank(bank, UpdateType::Created, moved_to));
            Ok(moved_to)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::current::CurrentSelection;
    use crate::device::LoggingDevice;
    use crate::model::Patch;
    use crate::notification::NotificationBus;
    use crate::persistence::MemoryDao;
    use std::sync::Arc;

    fn bank(name: &str) -> Bank {
        Bank::new(name)
            .with_patch(Patch::new(format!("{name}0")))
            .unwrap()
            .with_patch(Patch::new(format!("{name}1")))
            .unwrap()
    }

    fn session(banks: Vec<Bank>, selection: CurrentSelection) -> Session {
        Session::open(
            &Config::default(),
            Box::new(LoggingDevice::new()),
            Box::new(MemoryDao::with_banks(banks).with_current(selection)),
            Arc::new(NotificationBus::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_delete_before_current_keeps_current_bank() {
        let (a, b, c) = (bank("A"), bank("B"), bank("C"));
        let (a_id, c_id) = (a.id(), c.id());
        let session = session(vec![a, b, c], CurrentSelection::new(2, 1));

        session.banks().delete(a_id, None).unwrap();

        assert_eq!(session.current().bank().unwrap().id(), c_id);
        assert_eq!(session.current().selection(), CurrentSelection::new(1, 1));
    }

    #[test]
    fn test_delete_only_bank_refused() {
        let a = bank("A");
        let a_id = a.id();
        let session = session(vec![a], CurrentSelection::new(0, 0));

        let err = session.banks().delete(a_id, None).unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_SELECTION");
        assert_eq!(session.snapshot().len(), 1);
    }

    #[test]
    fn test_delete_current_refused_when_successor_empty() {
        let a = bank("A");
        let a_id = a.id();
        let session = session(vec![a, Bank::new("Empty")], CurrentSelection::new(0, 0));

        let err = session.banks().delete(a_id, None).unwrap_err();
        assert_eq!(err.error_code(), "EMPTY_SELECTION");
        assert_eq!(session.snapshot().len(), 2);
    }

    #[test]
    fn test_update_current_bank_must_keep_current_patch() {
        let a = bank("A");
        let session = session(vec![a.clone(), bank("B")], CurrentSelection::new(0, 1));

        let mut truncated = a.clone();
        let second = truncated.patches().get(1).unwrap().id();
        truncated.remove_patch(second).unwrap();

        let err = session.banks().update(truncated, None).unwrap_err();
        assert_eq!(err.error_code(), "INDEX_RANGE");
        assert_eq!(session.bank(a.id()).unwrap().patches().len(), 2);
    }

    #[test]
    fn test_swap_with_itself_is_noop() {
        let a = bank("A");
        let a_id = a.id();
        let session = session(vec![a, bank("B")], CurrentSelection::new(0, 0));

        session.banks().swap(a_id, a_id, None).unwrap();
        assert_eq!(session.index_of_bank(a_id), Some(0));
    }

    #[test]
    fn test_create_rejects_patch_held_elsewhere() {
        let a = bank("A");
        let stolen = a.patches().get(0).unwrap().clone();
        let session = session(vec![a], CurrentSelection::new(0, 0));

        let thief = Bank::new("Thief").with_patch(stolen).unwrap();
        let err = session.banks().create(thief, None).unwrap_err();
        assert_eq!(err.error_code(), "DUPLICATE");
    }

    #[test]
    fn test_move_clamps_index() {
        let (a, b, c) = (bank("A"), bank("B"), bank("C"));
        let a_id = a.id();
        let session = session(vec![a, b, c], CurrentSelection::new(0, 0));

        let index = session.banks().move_to(a_id, 99, None).unwrap();
        assert_eq!(index, 2);
        assert_eq!(session.current().selection(), CurrentSelection::new(2, 0));
    }
}
