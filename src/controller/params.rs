//! Parameter values inside patch payloads

use log::debug;
use serde_json::Value;

use crate::error::{EntityKind, PatchbayError, Result};
use crate::model::{Param, PatchId};
use crate::notification::Notification;
use crate::session::Session;

pub struct ParamsController<'a> {
    session: &'a Session,
}

impl<'a> ParamsController<'a> {
    pub(crate) fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Set the payload value at the JSON pointer `path` of a patch
    ///
    /// The value must already exist, and the empty pointer (the whole
    /// payload) is not a parameter. A change to the current patch is also
    /// sent to the device.
    pub fn set_value(
        &self,
        patch: PatchId,
        path: &str,
        value: Value,
        token: Option<&str>,
    ) -> Result<()> {
        if path.is_empty() {
            return Err(PatchbayError::not_found(EntityKind::Param, "<payload root>"));
        }
        self.session.transact(token, |staged| {
            let (bank_index, _) = staged.locate_patch(patch)?;
            let is_current = staged.is_current_patch(patch);

            let target = staged
                .bank_mut(bank_index)?
                .patch_mut(patch)
                .and_then(|held| held.payload.pointer_mut(path))
                .ok_or_else(|| PatchbayError::not_found(EntityKind::Param, path))?;
            *target = value.clone();

            let param = Param {
                patch,
                path: path.to_string(),
                value,
            };
            if is_current {
                staged.device.set_param(&param)?;
            }
            staged.save_bank_at(bank_index)?;

            debug!("Set {} on patch {} to {}", param.path, param.patch, param.value);
            staged.notify(Notification::Param(param));
            Ok(())
        })
    }

    /// Current value at `path` of a patch
    pub fn value(&self, patch: PatchId, path: &str) -> Result<Value> {
        self.session.read(|banks, _| {
            let held = banks
                .iter()
                .find_map(|bank| bank.patches().find(patch))
                .ok_or_else(|| PatchbayError::not_found(EntityKind::Patch, patch))?;
            held.payload
                .pointer(path)
                .cloned()
                .ok_or_else(|| PatchbayError::not_found(EntityKind::Param, path))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::current::CurrentSelection;
    use crate::device::LoggingDevice;
    use crate::model::{Bank, Patch};
    use crate::notification::NotificationBus;
    use crate::persistence::MemoryDao;
    use serde_json::json;
    use std::sync::Arc;

    fn drive() -> Patch {
        Patch::with_payload(
            "Drive",
            json!({ "effects": [{ "name": "fuzz", "params": { "gain": 0.5 } }], "connections": [] }),
        )
    }

    fn session_with(patch: Patch) -> Session {
        let bank = Bank::new("A").with_patch(patch).unwrap();
        Session::open(
            &Config::default(),
            Box::new(LoggingDevice::new()),
            Box::new(MemoryDao::with_banks(vec![bank]).with_current(CurrentSelection::new(0, 0))),
            Arc::new(NotificationBus::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_set_value_updates_payload() {
        let patch = drive();
        let id = patch.id();
        let session = session_with(patch);

        session
            .params()
            .set_value(id, "/effects/0/params/gain", json!(0.9), None)
            .unwrap();
        assert_eq!(session.params().value(id, "/effects/0/params/gain").unwrap(), json!(0.9));
    }

    #[test]
    fn test_missing_pointer_is_not_found() {
        let patch = drive();
        let id = patch.id();
        let session = session_with(patch);

        let err = session
            .params()
            .set_value(id, "/effects/3/params/gain", json!(1.0), None)
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert_eq!(session.params().value(id, "/effects/0/params/gain").unwrap(), json!(0.5));
    }

    #[test]
    fn test_empty_pointer_is_not_a_param() {
        let patch = drive();
        let id = patch.id();
        let session = session_with(patch);

        let err = session
            .params()
            .set_value(id, "", json!(7), None)
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert_eq!(
            session.patch(id).unwrap().payload["effects"][0]["params"]["gain"],
            json!(0.5)
        );
    }

    #[test]
    fn test_unknown_patch_is_not_found() {
        let session = session_with(drive());
        let err = session
            .params()
            .set_value(PatchId::new(), "/effects", json!([]), None)
            .unwrap_err();
        assert_eq!(err.error_code(), "NOT_FOUND");
    }
}
