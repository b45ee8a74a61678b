//! Mutation Orchestrators
//!
//! One controller per entity kind. Each operation validates its inputs,
//! edits the staged store, reloads the device when the current patch is
//! affected, persists, reconciles the current selection and finally queues
//! its notifications.

pub mod banks;
pub mod component_data;
pub mod params;
pub mod patches;

pub use banks::BanksController;
pub use component_data::ComponentDataController;
pub use params::ParamsController;
pub use patches::PatchesController;
