//! Current Selection Tracker
//!
//! The current bank and patch are stored only as a pair of indices. The bank
//! and patch they point at are looked up again on every access, so a
//! structural edit anywhere in the store can never leave a stale reference
//! behind.

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{EntityKind, PatchbayError, Result};
use crate::model::{Bank, BankId, Patch, PatchId};
use crate::notification::Notification;
use crate::session::{Session, Staged};
use crate::store::Sequence;

/// Indices of the current bank and of the current patch inside it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentSelection {
    #[serde(rename = "bank")]
    pub bank_index: usize,
    #[serde(rename = "patch")]
    pub patch_index: usize,
}

impl CurrentSelection {
    pub fn new(bank_index: usize, patch_index: usize) -> Self {
        Self {
            bank_index,
            patch_index,
        }
    }

    /// Bank the selection points at in `banks`
    pub fn bank<'a>(&self, banks: &'a Sequence<Bank>) -> Result<&'a Bank> {
        banks.get(self.bank_index).ok_or(PatchbayError::IndexRange {
            kind: EntityKind::Bank,
            index: self.bank_index,
            len: banks.len(),
        })
    }

    /// Patch the selection points at in `banks`
    pub fn patch<'a>(&self, banks: &'a Sequence<Bank>) -> Result<&'a Patch> {
        let bank = self.bank(banks)?;
        bank.patches()
            .get(self.patch_index)
            .ok_or(PatchbayError::IndexRange {
                kind: EntityKind::Patch,
                index: self.patch_index,
                len: bank.patches().len(),
            })
    }

    /// Both indices point at existing entities
    pub fn is_valid(&self, banks: &Sequence<Bank>) -> bool {
        self.patch(banks).is_ok()
    }
}

/// Navigation direction for [`CurrentController::advance_bank`] and
/// [`CurrentController::advance_patch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

impl Direction {
    /// Index reached from `index` in a sequence of `len` elements, wrapping at both ends
    pub fn step(self, index: usize, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        match self {
            Direction::Next => (index + 1) % len,
            Direction::Previous => (index + len - 1) % len,
        }
    }
}

/// Identity of the current entities, captured before a structural edit and
/// resolved back to indices after it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Anchor {
    pub bank: BankId,
    pub patch: PatchId,
}

impl Staged<'_> {
    pub(crate) fn current_bank(&self) -> Result<&Bank> {
        self.selection.bank(&self.banks)
    }

    pub(crate) fn current_patch(&self) -> Result<&Patch> {
        self.selection.patch(&self.banks)
    }

    pub(crate) fn is_current_bank(&self, id: BankId) -> bool {
        self.current_bank().map_or(false, |bank| bank.id() == id)
    }

    pub(crate) fn is_current_patch(&self, id: PatchId) -> bool {
        self.current_patch().map_or(false, |patch| patch.id() == id)
    }

    pub(crate) fn anchor(&self) -> Result<Anchor> {
        Ok(Anchor {
            bank: self.current_bank()?.id(),
            patch: self.current_patch()?.id(),
        })
    }

    /// Anchor on the first patch of `bank`
    ///
    /// Fails with `EmptySelection` when the bank has no patches.
    pub(crate) fn anchor_first(&self, bank: BankId) -> Result<Anchor> {
        let holder = self
            .banks
            .find(bank)
            .ok_or_else(|| PatchbayError::not_found(EntityKind::Bank, bank))?;
        let first = holder
            .patches()
            .get(0)
            .ok_or_else(|| PatchbayError::EmptySelection {
                reason: format!("bank '{}' has no patches", holder.name),
            })?;
        Ok(Anchor {
            bank,
            patch: first.id(),
        })
    }

    /// Point the selection at `anchor` again, wherever it now lives
    ///
    /// Only the staged indices change; persisting them is up to the caller.
    pub(crate) fn relocate(&mut self, anchor: Anchor) -> Result<()> {
        let bank_index = self.banks.require(anchor.bank)?;
        let patch_index = self.banks.get(bank_index).map_or(Ok(0), |bank| {
            bank.patches().require(anchor.patch)
        })?;
        self.selection = CurrentSelection::new(bank_index, patch_index);
        Ok(())
    }

    /// Reload the device with whatever the selection points at now
    pub(crate) fn reload_current(&mut self) -> Result<()> {
        let patch = self.selection.patch(&self.banks)?;
        self.device.load(patch)
    }

    /// Make `(bank_index, patch_index)` current
    ///
    /// The device is loaded first; if it refuses, nothing changes.
    pub(crate) fn select(&mut self, bank_index: usize, patch_index: usize) -> Result<()> {
        let next = CurrentSelection::new(bank_index, patch_index);
        let patch = next.patch(&self.banks)?;

        self.device.load(patch)?;
        let patch = patch.clone();
        self.selection = next;
        self.persist_selection()?;

        info!(
            "Current patch is now '{}' (bank {}, patch {})",
            patch.name, bank_index, patch_index
        );
        self.notify(Notification::Current(patch));
        Ok(())
    }

    /// Make `(bank_index, patch_index)` current in one step, in any bank
    pub(crate) fn set_selection(&mut self, bank_index: usize, patch_index: usize) -> Result<()> {
        if CurrentSelection::new(bank_index, patch_index) == self.selection {
            return Ok(());
        }
        let bank = self.banks.get(bank_index).ok_or(PatchbayError::IndexRange {
            kind: EntityKind::Bank,
            index: bank_index,
            len: self.banks.len(),
        })?;
        if bank.patches().is_empty() {
            return Err(PatchbayError::EmptySelection {
                reason: format!("bank '{}' has no patches", bank.name),
            });
        }
        self.select(bank_index, patch_index)
    }

    pub(crate) fn set_bank(&mut self, index: usize) -> Result<()> {
        if index == self.selection.bank_index {
            return Ok(());
        }
        let bank = self.banks.get(index).ok_or(PatchbayError::IndexRange {
            kind: EntityKind::Bank,
            index,
            len: self.banks.len(),
        })?;
        if bank.patches().is_empty() {
            return Err(PatchbayError::EmptySelection {
                reason: format!("bank '{}' has no patches", bank.name),
            });
        }
        self.select(index, 0)
    }

    pub(crate) fn set_patch(&mut self, index: usize) -> Result<()> {
        if index == self.selection.patch_index {
            return Ok(());
        }
        let len = self.current_bank()?.patches().len();
        if index >= len {
            return Err(PatchbayError::IndexRange {
                kind: EntityKind::Patch,
                index,
                len,
            });
        }
        self.select(self.selection.bank_index, index)
    }
}

/// Navigation and explicit selection of the current bank and patch
pub struct CurrentController<'a> {
    session: &'a Session,
}

impl<'a> CurrentController<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    pub fn selection(&self) -> CurrentSelection {
        self.session.read(|_, selection| selection)
    }

    /// The current bank, looked up from the stored index
    pub fn bank(&self) -> Result<Bank> {
        self.session
            .read(|banks, selection| selection.bank(banks).cloned())
    }

    /// The current patch, looked up from the stored indices
    pub fn patch(&self) -> Result<Patch> {
        self.session
            .read(|banks, selection| selection.patch(banks).cloned())
    }

    pub fn is_current_bank(&self, id: BankId) -> bool {
        self.session.read(|banks, selection| {
            selection.bank(banks).map_or(false, |bank| bank.id() == id)
        })
    }

    pub fn is_current_patch(&self, id: PatchId) -> bool {
        self.session.read(|banks, selection| {
            selection.patch(banks).map_or(false, |patch| patch.id() == id)
        })
    }

    /// Make the bank at `index` current, starting at its first patch
    ///
    /// Does nothing if it already is current.
    pub fn set_bank(&self, index: usize, token: Option<&str>) -> Result<()> {
        self.session.transact(token, |staged| staged.set_bank(index))
    }

    /// Make the patch at `index` of the current bank current
    ///
    /// Does nothing if it already is current.
    pub fn set_patch(&self, index: usize, token: Option<&str>) -> Result<()> {
        self.session.transact(token, |staged| staged.set_patch(index))
    }

    /// Make the patch at `patch_index` of the bank at `bank_index` current
    ///
    /// Unlike [`set_bank`](Self::set_bank) followed by
    /// [`set_patch`](Self::set_patch) this is one operation: the device loads
    /// once, one current change is published, and a bad patch index leaves
    /// the selection where it was.
    pub fn set(&self, bank_index: usize, patch_index: usize, token: Option<&str>) -> Result<()> {
        self.session
            .transact(token, |staged| staged.set_selection(bank_index, patch_index))
    }

    /// Make the patch with `id` current, wherever it lives
    pub fn select_patch(&self, id: PatchId, token: Option<&str>) -> Result<()> {
        self.session.transact(token, |staged| {
            let (bank_index, patch_index) = staged.locate_patch(id)?;
            staged.set_selection(bank_index, patch_index)
        })
    }

    /// Move to the neighbouring bank, wrapping around at either end
    pub fn advance_bank(&self, direction: Direction, token: Option<&str>) -> Result<()> {
        self.session.transact(token, |staged| {
            let target = direction.step(staged.selection.bank_index, staged.banks.len());
            staged.set_bank(target)
        })
    }

    /// Move to the neighbouring patch in the current bank, wrapping around
    pub fn advance_patch(&self, direction: Direction, token: Option<&str>) -> Result<()> {
        self.session.transact(token, |staged| {
            let len = staged.current_bank()?.patches().len();
            let target = direction.step(staged.selection.patch_index, len);
            staged.set_patch(target)
        })
    }

    pub fn next_bank(&self, token: Option<&str>) -> Result<()> {
        self.advance_bank(Direction::Next, token)
    }

    pub fn previous_bank(&self, token: Option<&str>) -> Result<()> {
        self.advance_bank(Direction::Previous, token)
    }

    pub fn next_patch(&self, token: Option<&str>) -> Result<()> {
        self.advance_patch(Direction::Next, token)
    }

    pub fn previous_patch(&self, token: Option<&str>) -> Result<()> {
        self.advance_patch(Direction::Previous, token)
    }
}
