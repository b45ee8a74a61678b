//! Patchbay - Bank and Patch Selection Engine
//!
//! Patchbay keeps an ordered set of banks, each holding an ordered set of
//! patches, together with a "current selection" pointing at one patch. Banks
//! and patches can be created, updated, deleted, swapped, moved and replaced
//! while the selection stays valid and keeps tracking the same patch.
//!
//! # Architecture
//!
//! - [`store::Sequence`]: identity-keyed ordered collection
//! - [`current`]: the selection, stored only as a pair of indices
//! - [`controller`]: mutation entry points per entity kind, plus keyed
//!   component data
//! - [`notification::NotificationBus`]: observers, with echo suppression by token
//! - [`device::Device`] and [`persistence::Persistence`]: collaborators
//!
//! [`session::Session`] ties these together and makes every operation
//! all-or-nothing.

pub mod cli;
pub mod config;
pub mod controller;
pub mod current;
pub mod device;
pub mod error;
pub mod model;
pub mod notification;
pub mod persistence;
pub mod session;
pub mod store;

pub use config::Config;
pub use current::{CurrentSelection, Direction};
pub use error::{EntityKind, PatchbayError, Result};
pub use model::{Bank, BankId, ComponentData, Param, Patch, PatchId, UpdateType};
pub use notification::{BankChange, NotificationBus, Observer, PatchChange};
pub use session::Session;
