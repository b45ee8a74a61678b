//! Device collaborator
//!
//! The hardware/audio side that actually runs the current patch. Loads are
//! synchronous and fallible; a failed load aborts the operation that asked
//! for it.

use log::info;

use crate::error::Result;
use crate::model::{Param, Patch, PatchId};

pub trait Device: Send {
    /// Make `patch` the running configuration
    fn load(&mut self, patch: &Patch) -> Result<()>;

    /// Apply a single parameter change to the running patch
    fn set_param(&mut self, _param: &Param) -> Result<()> {
        Ok(())
    }
}

/// Device stand-in that only logs what it is asked to run
#[derive(Debug, Default)]
pub struct LoggingDevice {
    loaded: Option<PatchId>,
}

impl LoggingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the last patch loaded
    pub fn loaded(&self) -> Option<PatchId> {
        self.loaded
    }
}

impl Device for LoggingDevice {
    fn load(&mut self, patch: &Patch) -> Result<()> {
        info!("Device loading patch '{}' ({})", patch.name, patch.id());
        self.loaded = Some(patch.id());
        Ok(())
    }

    fn set_param(&mut self, param: &Param) -> Result<()> {
        info!("Device setting {} = {}", param.path, param.value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_device_tracks_last_load() {
        let mut device = LoggingDevice::new();
        assert_eq!(device.loaded(), None);

        let patch = Patch::new("Clean");
        device.load(&patch).unwrap();
        assert_eq!(device.loaded(), Some(patch.id()));
    }
}
