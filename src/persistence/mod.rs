//! Persistence collaborator
//!
//! Durable storage for banks (patches are stored inside their bank), for
//! the current selection and for keyed component data. The storage format belongs to the implementation.

pub mod json;
pub mod memory;

pub use json::JsonDirectoryDao;
pub use memory::MemoryDao;

use crate::current::CurrentSelection;
use crate::error::Result;
use crate::model::{Bank, ComponentData};

pub trait Persistence: Send {
    /// Every stored bank, in persisted order
    fn load_all(&self) -> Result<Vec<Bank>>;

    /// Store `bank` and place it at `position` in the persisted order
    ///
    /// Saving a bank that is already stored moves it, so swaps and moves are
    /// expressed as saves.
    fn save_bank(&mut self, bank: &Bank, position: usize) -> Result<()>;

    /// Remove the record stored for `bank` under its current name
    fn delete_bank(&mut self, bank: &Bank) -> Result<()>;

    fn load_current(&self) -> Result<Option<CurrentSelection>>;

    fn save_current(&mut self, selection: &CurrentSelection) -> Result<()>;

    fn load_component_data(&self, key: &str) -> Result<Option<ComponentData>>;

    fn save_component_data(&mut self, key: &str, data: &ComponentData) -> Result<()>;

    /// Forget the data under `key`; an absent key is not an error
    fn delete_component_data(&mut self, key: &str) -> Result<()>;
}
