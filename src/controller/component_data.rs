//! Component Data
//!
//! Client components such as an editor UI keep their own settings here under
//! a key of their choosing. Nothing in the session reads the data and
//! changing it publishes no notification.

use log::debug;

use crate::error::Result;
use crate::model::ComponentData;
use crate::session::Session;

pub struct ComponentDataController<'a> {
    session: &'a Session,
}

impl<'a> ComponentDataController<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Data stored under `key`, or an empty map if there is none
    ///
    /// The result is a copy; changing it does not change what is stored.
    pub fn get(&self, key: &str) -> Result<ComponentData> {
        let stored = self.session.read_dao(|dao| dao.load_component_data(key))?;
        Ok(stored.unwrap_or_default())
    }

    /// Replace whatever is stored under `key`
    pub fn set(&self, key: &str, data: ComponentData, token: Option<&str>) -> Result<()> {
        self.session.transact(token, |staged| {
            staged.dao.save_component_data(key, &data)?;
            debug!("Stored component data '{}' ({} entries)", key, data.len());
            Ok(())
        })
    }

    pub fn delete(&self, key: &str, token: Option<&str>) -> Result<()> {
        self.session.transact(token, |staged| {
            staged.dao.delete_component_data(key)?;
            debug!("Deleted component data '{}'", key);
            Ok(())
        })
    }
}
