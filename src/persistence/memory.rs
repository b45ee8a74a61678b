//! In-process persistence, mostly for tests and embedding.

use std::collections::BTreeMap;

use crate::current::CurrentSelection;
use crate::error::Result;
use crate::model::{Bank, ComponentData};

use super::Persistence;

#[derive(Debug, Clone, Default)]
pub struct MemoryDao {
    banks: Vec<Bank>,
    current: Option<CurrentSelection>,
    component_data: BTreeMap<String, ComponentData>,
}

impl MemoryDao {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `banks` already stored, in order
    pub fn with_banks(banks: Vec<Bank>) -> Self {
        Self {
            banks,
            ..Self::default()
        }
    }

    pub fn with_current(mut self, selection: CurrentSelection) -> Self {
        self.current = Some(selection);
        self
    }

    pub fn banks(&self) -> &[Bank] {
        &self.banks
    }

    pub fn current(&self) -> Option<CurrentSelection> {
        self.current
    }
}

impl Persistence for MemoryDao {
    fn load_all(&self) -> Result<Vec<Bank>> {
        Ok(self.banks.clone())
    }

    fn save_bank(&mut self, bank: &Bank, position: usize) -> Result<()> {
        self.banks.retain(|stored| stored.id() != bank.id());
        let position = position.min(self.banks.len());
        self.banks.insert(position, bank.clone());
        Ok(())
    }

    fn delete_bank(&mut self, bank: &Bank) -> Result<()> {
        self.banks.retain(|stored| stored.id() != bank.id());
        Ok(())
    }

    fn load_current(&self) -> Result<Option<CurrentSelection>> {
        Ok(self.current)
    }

    fn save_current(&mut self, selection: &CurrentSelection) -> Result<()> {
        self.current = Some(*selection);
        Ok(())
    }

    fn load_component_data(&self, key: &str) -> Result<Option<ComponentData>> {
        Ok(self.component_data.get(key).cloned())
    }

    fn save_component_data(&mut self, key: &str, data: &ComponentData) -> Result<()> {
        self.component_data.insert(key.to_string(), data.clone());
        Ok(())
    }

    fn delete_component_data(&mut self, key: &str) -> Result<()> {
        self.component_data.remove(key);
        Ok(())
    }
}
