//! JSON Directory Storage
//!
//! Stores each bank as its own JSON record and keeps the bank order in a
//! manifest next to them.
//!
//! ```text
//! root/
//!   banks.json          # manifest: ordered record keys
//!   current.json        # current selection
//!   component_data.json # component data, one entry per key
//!   banks/
//!     <slug>-<id>.json  # one record per bank, full 32-digit id
//! ```
//!
//! A record key is derived from the bank name, so renaming a bank changes
//! its key: the old record has to be deleted and the new one saved.

use std::collections::{BTreeMap, HashSet};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::current::CurrentSelection;
use crate::error::{PatchbayError, Result};
use crate::model::{Bank, ComponentData};

use super::Persistence;

const MANIFEST_FILE: &str = "banks.json";
const CURRENT_FILE: &str = "current.json";
const COMPONENT_DATA_FILE: &str = "component_data.json";
const BANKS_DIR: &str = "banks";
const RECORD_EXTENSION: &str = "json";

/// Ordered list of bank record keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankManifest {
    /// When the manifest was last written.
    pub modified_at: DateTime<Utc>,
    /// Record keys in bank order.
    pub banks: Vec<String>,
}

impl Default for BankManifest {
    fn default() -> Self {
        Self {
            modified_at: Utc::now(),
            banks: Vec::new(),
        }
    }
}

/// Stores banks as JSON files under a data directory.
#[derive(Debug, Clone)]
pub struct JsonDirectoryDao {
    /// Data directory.
    root: PathBuf,
    /// Directory holding one record per bank.
    banks_dir: PathBuf,
}

impl JsonDirectoryDao {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            banks_dir: root.join(BANKS_DIR),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    fn current_path(&self) -> PathBuf {
        self.root.join(CURRENT_FILE)
    }

    fn component_data_path(&self) -> PathBuf {
        self.root.join(COMPONENT_DATA_FILE)
    }

    fn load_component_map(&self) -> Result<BTreeMap<String, ComponentData>> {
        Ok(read_json(&self.component_data_path())?.unwrap_or_default())
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.banks_dir.join(format!("{}.{}", key, RECORD_EXTENSION))
    }

    /// Key a bank's record is stored under.
    ///
    /// Ends in the full bank id, so a key identifies exactly one bank whatever
    /// its name.
    pub fn record_key(bank: &Bank) -> String {
        format!("{}-{}", slug(&bank.name), bank.id().simple())
    }

    pub fn load_manifest(&self) -> Result<BankManifest> {
        Ok(read_json(&self.manifest_path())?.unwrap_or_default())
    }

    fn save_manifest(&self, manifest: &mut BankManifest) -> Result<()> {
        manifest.modified_at = Utc::now();
        write_json(&self.manifest_path(), manifest)
    }

    /// Delete record files the manifest no longer refers to.
    ///
    /// Returns how many files were removed.
    pub fn prune_orphans(&self) -> Result<usize> {
        if !self.banks_dir.exists() {
            return Ok(0);
        }

        let manifest = self.load_manifest()?;
        let listed: HashSet<&str> = manifest.banks.iter().map(String::as_str).collect();
        let mut removed = 0;

        for entry in WalkDir::new(&self.banks_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            let is_record = path
                .extension()
                .map_or(false, |ext| ext == OsStr::new(RECORD_EXTENSION));
            if !entry.file_type().is_file() || !is_record {
                continue;
            }

            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            if !listed.contains(stem) {
                fs::remove_file(path).map_err(|e| PatchbayError::persistence_at(path, e))?;
                debug!("Pruned orphaned bank record {}", path.display());
                removed += 1;
            }
        }

        Ok(removed)
    }
}

impl Persistence for JsonDirectoryDao {
    fn load_all(&self) -> Result<Vec<Bank>> {
        let manifest = self.load_manifest()?;
        let mut banks = Vec::with_capacity(manifest.banks.len());

        for key in &manifest.banks {
            match read_json::<Bank>(&self.record_path(key))? {
                Some(bank) => banks.push(bank),
                None => warn!("Bank record '{}' listed in manifest is missing", key),
            }
        }

        Ok(banks)
    }

    fn save_bank(&mut self, bank: &Bank, position: usize) -> Result<()> {
        let key = Self::record_key(bank);
        write_json(&self.record_path(&key), bank)?;

        // Drop any entry for this bank, including one under a previous name
        let suffix = format!("-{}", bank.id().simple());
        let mut manifest = self.load_manifest()?;
        manifest.banks.retain(|listed| !listed.ends_with(&suffix));
        let position = position.min(manifest.banks.len());
        manifest.banks.insert(position, key);
        self.save_manifest(&mut manifest)
    }

    fn delete_bank(&mut self, bank: &Bank) -> Result<()> {
        let key = Self::record_key(bank);
        let path = self.record_path(&key);
        if path.exists() {
            fs::remove_file(&path).map_err(|e| PatchbayError::persistence_at(&path, e))?;
        }

        let mut manifest = self.load_manifest()?;
        manifest.banks.retain(|listed| *listed != key);
        self.save_manifest(&mut manifest)
    }

    fn load_current(&self) -> Result<Option<CurrentSelection>> {
        read_json(&self.current_path())
    }

    fn save_current(&mut self, selection: &CurrentSelection) -> Result<()> {
        write_json(&self.current_path(), selection)
    }

    fn load_component_data(&self, key: &str) -> Result<Option<ComponentData>> {
        Ok(self.load_component_map()?.remove(key))
    }

    fn save_component_data(&mut self, key: &str, data: &ComponentData) -> Result<()> {
        let mut map = self.load_component_map()?;
        map.insert(key.to_string(), data.clone());
        write_json(&self.component_data_path(), &map)
    }

    fn delete_component_data(&mut self, key: &str) -> Result<()> {
        let mut map = self.load_component_map()?;
        if map.remove(key).is_some() {
            write_json(&self.component_data_path(), &map)?;
        }
        Ok(())
    }
}

/// File-name friendly form of a bank name
fn slug(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "bank".to_string()
    } else {
        slug.to_string()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| PatchbayError::persistence_at(path, e))?;
    let value = serde_json::from_str(&content).map_err(|e| PatchbayError::persistence_at(path, e))?;
    Ok(Some(value))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| PatchbayError::persistence_at(parent, e))?;
        }
    }
    let content =
        serde_json::to_string_pretty(value).map_err(|e| PatchbayError::persistence_at(path, e))?;
    fs::write(path, content).map_err(|e| PatchbayError::persistence_at(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Patch;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn bank(name: &str) -> Bank {
        Bank::new(name).with_patch(Patch::new("Default")).unwrap()
    }

    fn names(dao: &JsonDirectoryDao) -> Vec<String> {
        dao.load_all()
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect()
    }

    #[test]
    fn test_slug() {
        assert_eq!(slug("Heavy Metal!"), "heavy-metal");
        assert_eq!(slug("  "), "bank");
        assert_eq!(slug("Café 2"), "caf-2");
    }

    #[test]
    fn test_empty_directory_loads_nothing() {
        let temp = TempDir::new().unwrap();
        let dao = JsonDirectoryDao::new(temp.path());

        assert!(dao.load_all().unwrap().is_empty());
        assert_eq!(dao.load_current().unwrap(), None);
    }

    #[test]
    fn test_save_and_load_in_order() {
        let temp = TempDir::new().unwrap();
        let mut dao = JsonDirectoryDao::new(temp.path());
        let a = bank("A");
        let b = bank("B");
        let c = bank("C");

        dao.save_bank(&a, 0).unwrap();
        dao.save_bank(&b, 1).unwrap();
        dao.save_bank(&c, 2).unwrap();
        assert_eq!(names(&dao), vec!["A", "B", "C"]);

        // swap A and C
        dao.save_bank(&a, 2).unwrap();
        dao.save_bank(&c, 0).unwrap();
        assert_eq!(names(&dao), vec!["C", "B", "A"]);

        let loaded = dao.load_all().unwrap();
        assert_eq!(loaded[2].id(), a.id());
        assert_eq!(loaded[2].patches().len(), 1);
    }

    #[test]
    fn test_rename_rekeys_record() {
        let temp = TempDir::new().unwrap();
        let mut dao = JsonDirectoryDao::new(temp.path());
        let original = bank("Old Name");
        dao.save_bank(&original, 0).unwrap();
        let old_path = dao.record_path(&JsonDirectoryDao::record_key(&original));
        assert!(old_path.exists());

        let mut renamed = original.clone();
        renamed.name = "New Name".to_string();
        dao.delete_bank(&original).unwrap();
        dao.save_bank(&renamed, 0).unwrap();

        assert!(!old_path.exists());
        assert_eq!(names(&dao), vec!["New Name"]);
    }

    #[test]
    fn test_same_names_do_not_collide() {
        let temp = TempDir::new().unwrap();
        let mut dao = JsonDirectoryDao::new(temp.path());
        dao.save_bank(&bank("Twin"), 0).unwrap();
        dao.save_bank(&bank("Twin"), 1).unwrap();

        assert_eq!(dao.load_all().unwrap().len(), 2);
    }

    #[test]
    fn test_ids_sharing_a_prefix_keep_both_banks() {
        let temp = TempDir::new().unwrap();
        let mut dao = JsonDirectoryDao::new(temp.path());
        let with_id = |id: &str, name: &str| -> Bank {
            serde_json::from_value(serde_json::json!({ "id": id, "name": name, "patches": [] }))
                .unwrap()
        };
        let a = with_id("12345678-0000-4000-8000-000000000001", "A");
        let b = with_id("12345678-0000-4000-8000-000000000002", "B");
        assert_eq!(a.id().short(), b.id().short());

        dao.save_bank(&a, 0).unwrap();
        dao.save_bank(&b, 1).unwrap();
        assert_eq!(names(&dao), vec!["A", "B"]);

        // moving one must not drop the other
        dao.save_bank(&b, 0).unwrap();
        assert_eq!(names(&dao), vec!["B", "A"]);
    }

    #[test]
    fn test_current_round_trip() {
        let temp = TempDir::new().unwrap();
        let mut dao = JsonDirectoryDao::new(temp.path());
        dao.save_current(&CurrentSelection::new(2, 5)).unwrap();

        assert_eq!(dao.load_current().unwrap(), Some(CurrentSelection::new(2, 5)));
    }

    #[test]
    fn test_component_data_shares_one_file() {
        let dir = TempDir::new().unwrap();
        let mut dao = JsonDirectoryDao::new(dir.path());
        let mut data = ComponentData::new();
        data.insert("theme".to_string(), serde_json::json!("dark"));

        dao.save_component_data("ui", &data).unwrap();
        dao.save_component_data("pedal", &ComponentData::new()).unwrap();
        dao.delete_component_data("pedal").unwrap();

        let reopened = JsonDirectoryDao::new(dir.path());
        assert_eq!(reopened.load_component_data("ui").unwrap(), Some(data));
        assert_eq!(reopened.load_component_data("pedal").unwrap(), None);
        assert!(dir.path().join(COMPONENT_DATA_FILE).exists());
    }

    #[test]
    fn test_prune_orphans() {
        let temp = TempDir::new().unwrap();
        let mut dao = JsonDirectoryDao::new(temp.path());
        let kept = bank("Kept");
        dao.save_bank(&kept, 0).unwrap();
        fs::write(temp.path().join("banks").join("stale-0000aaaa.json"), "{}").unwrap();

        assert_eq!(dao.prune_orphans().unwrap(), 1);
        assert_eq!(dao.prune_orphans().unwrap(), 0);
        assert_eq!(names(&dao), vec!["Kept"]);
    }

    #[test]
    fn test_corrupt_record_is_persistence_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("banks.json"), "not json").unwrap();
        let dao = JsonDirectoryDao::new(temp.path());

        let err = dao.load_all().unwrap_err();
        assert_eq!(err.error_code(), "PERSISTENCE");
    }
}
