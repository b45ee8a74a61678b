//! Data Model
//!
//! Banks own an ordered sequence of patches. A patch only points back at its
//! bank through a [`BankId`], which is used to find the owner and compute the
//! patch's derived index; it never keeps the bank alive.

use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EntityKind, Result};
use crate::store::{Entity, Sequence};

/// Identity of a [`Bank`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BankId(Uuid);

impl BankId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, for display only; not unique
    pub fn short(&self) -> String {
        self.simple()[..8].to_string()
    }

    /// All 32 hex digits without hyphens
    pub fn simple(&self) -> String {
        self.0.simple().to_string()
    }
}

impl Default for BankId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BankId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a [`Patch`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatchId(Uuid);

impl PatchId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PatchId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of change published for a bank or patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateType {
    Created,
    Updated,
    Deleted,
}

impl std::fmt::Display for UpdateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateType::Created => write!(f, "created"),
            UpdateType::Updated => write!(f, "updated"),
            UpdateType::Deleted => write!(f, "deleted"),
        }
    }
}

/// A named unit of configuration
///
/// The payload (effects, connections, parameter values) is opaque here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    id: PatchId,
    pub name: String,
    #[serde(default = "empty_payload")]
    pub payload: serde_json::Value,
    /// Owning bank; set when the patch enters a bank's sequence
    #[serde(skip)]
    bank: Option<BankId>,
}

fn empty_payload() -> serde_json::Value {
    serde_json::json!({ "effects": [], "connections": [] })
}

impl Patch {
    /// Create a patch with an empty effect graph
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_payload(name, empty_payload())
    }

    pub fn with_payload(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: PatchId::new(),
            name: name.into(),
            payload,
            bank: None,
        }
    }

    pub fn id(&self) -> PatchId {
        self.id
    }

    /// Bank currently holding this patch, if any
    pub fn bank(&self) -> Option<BankId> {
        self.bank
    }
}

impl Entity for Patch {
    type Id = PatchId;
    const KIND: EntityKind = EntityKind::Patch;

    fn id(&self) -> PatchId {
        self.id
    }
}

/// An ordered, named collection of patches
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "BankRecord")]
pub struct Bank {
    id: BankId,
    pub name: String,
    patches: Sequence<Patch>,
}

/// Serialized shape of a bank; converting it re-links the patches
#[derive(Deserialize)]
struct BankRecord {
    id: BankId,
    name: String,
    #[serde(default)]
    patches: Vec<Patch>,
}

impl From<BankRecord> for Bank {
    fn from(record: BankRecord) -> Self {
        let mut bank = Bank {
            id: record.id,
            name: record.name,
            patches: Sequence::new(),
        };
        for patch in record.patches {
            let id = patch.id;
            if bank.append(patch).is_err() {
                warn!("Dropping repeated patch {} in bank '{}'", id, bank.name);
            }
        }
        bank
    }
}

impl Bank {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: BankId::new(),
            name: name.into(),
            patches: Sequence::new(),
        }
    }

    pub fn id(&self) -> BankId {
        self.id
    }

    pub fn patches(&self) -> &Sequence<Patch> {
        &self.patches
    }

    /// Add a patch at the end, taking ownership and pointing it at this bank
    pub fn append(&mut self, mut patch: Patch) -> Result<usize> {
        patch.bank = Some(self.id);
        self.patches.append(patch)
    }

    /// Builder form of [`Bank::append`]
    pub fn with_patch(mut self, patch: Patch) -> Result<Self> {
        self.append(patch)?;
        Ok(self)
    }

    pub(crate) fn patch_mut(&mut self, id: PatchId) -> Option<&mut Patch> {
        self.patches.find_mut(id)
    }

    pub(crate) fn remove_patch(&mut self, id: PatchId) -> Result<Patch> {
        let mut patch = self.patches.remove(id)?;
        patch.bank = None;
        Ok(patch)
    }

    pub(crate) fn swap_patches(&mut self, a: PatchId, b: PatchId) -> Result<()> {
        self.patches.swap(a, b)
    }

    pub(crate) fn move_patch(&mut self, id: PatchId, new_index: usize) -> Result<usize> {
        self.patches.move_to(id, new_index)
    }

    pub(crate) fn replace_patch(&mut self, old: PatchId, mut new: Patch) -> Result<Patch> {
        new.bank = Some(self.id);
        let mut replaced = self.patches.replace(old, new)?;
        replaced.bank = None;
        Ok(replaced)
    }
}

impl Entity for Bank {
    type Id = BankId;
    const KIND: EntityKind = EntityKind::Bank;

    fn id(&self) -> BankId {
        self.id
    }
}

/// A single parameter value inside a patch payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub patch: PatchId,
    /// JSON pointer into the patch payload
    pub path: String,
    pub value: serde_json::Value,
}

/// Free-form settings a client component keeps under its own key
pub type ComponentData = serde_json::Map<String, serde_json::Value>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_sets_back_reference() {
        let mut bank = Bank::new("Blues");
        let index = bank.append(Patch::new("Clean")).unwrap();
        let patch = bank.patches().get(index).unwrap();
        assert_eq!(patch.bank(), Some(bank.id()));
    }

    #[test]
    fn test_remove_clears_back_reference() {
        let mut bank = Bank::new("Blues");
        let patch = Patch::new("Clean");
        let id = patch.id();
        bank.append(patch).unwrap();

        let removed = bank.remove_patch(id).unwrap();
        assert_eq!(removed.bank(), None);
        assert!(bank.patches().is_empty());
    }

    #[test]
    fn test_banks_with_same_name_are_distinct() {
        let a = Bank::new("Same");
        let b = Bank::new("Same");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_deserialize_relinks_patches() {
        let bank = Bank::new("Metal")
            .with_patch(Patch::new("Lead"))
            .unwrap()
            .with_patch(Patch::new("Rhythm"))
            .unwrap();

        let json = serde_json::to_string(&bank).unwrap();
        let restored: Bank = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.id(), bank.id());
        assert_eq!(restored.patches().len(), 2);
        for patch in restored.patches() {
            assert_eq!(patch.bank(), Some(bank.id()));
        }
    }

    #[test]
    fn test_replace_patch_moves_back_reference() {
        let mut bank = Bank::new("Jazz");
        let old = Patch::new("Warm");
        let old_id = old.id();
        bank.append(old).unwrap();

        let replaced = bank.replace_patch(old_id, Patch::new("Bright")).unwrap();
        assert_eq!(replaced.bank(), None);
        assert_eq!(bank.patches().get(0).unwrap().bank(), Some(bank.id()));
    }

    #[test]
    fn test_id_forms() {
        let id = BankId::new();
        assert_eq!(id.short().len(), 8);
        assert_eq!(id.simple().len(), 32);
        assert!(id.simple().starts_with(&id.short()));
    }
}
