//! CLI Command Implementations
//!
//! Each command opens a session over the configured data directory, runs one
//! operation and prints the result.

use log::info;

use crate::config::Config;
use crate::current::Direction;
use crate::device::LoggingDevice;
use crate::error::{EntityKind, PatchbayError, Result};
use crate::model::{Bank, Patch};
use crate::notification::NotificationBus;
use crate::persistence::JsonDirectoryDao;
use crate::session::Session;

use std::sync::Arc;

/// Open a session over the JSON data directory named in `config`
pub fn open_session(config: &Config) -> Result<Session> {
    info!("Opening data directory: {}", config.data_dir.display());
    Session::open(
        config,
        Box::new(LoggingDevice::new()),
        Box::new(JsonDirectoryDao::new(&config.data_dir)),
        Arc::new(NotificationBus::new()),
    )
}

fn bank_at(session: &Session, index: usize) -> Result<Bank> {
    let banks = session.snapshot();
    let len = banks.len();
    banks.into_iter().nth(index).ok_or(PatchbayError::IndexRange {
        kind: EntityKind::Bank,
        index,
        len,
    })
}

/// Print every bank and patch, marking the current patch.
pub fn list(config: &Config) -> Result<()> {
    let session = open_session(config)?;
    let selection = session.current().selection();

    println!("Banks in {}:", config.data_dir.display());
    println!("{:-<60}", "");

    for (bank_index, bank) in session.snapshot().iter().enumerate() {
        println!("{:>3}  {} ({})", bank_index, bank.name, bank.id().short());
        for (patch_index, patch) in bank.patches().iter().enumerate() {
            let marker = if (bank_index, patch_index) == (selection.bank_index, selection.patch_index) {
                ">>> "
            } else {
                "    "
            };
            println!("     {}{:>3}  {}", marker, patch_index, patch.name);
        }
    }

    println!("{:-<60}", "");
    Ok(())
}

/// Create a bank with a single empty patch, named from `config` unless given.
pub fn create_bank(config: &Config, name: &str, patch: Option<&str>) -> Result<()> {
    let session = open_session(config)?;
    let patch = patch.unwrap_or(config.default_patch_name.as_str());
    let bank = Bank::new(name).with_patch(Patch::new(patch))?;
    let index = session.banks().create(bank, None)?;

    println!("Bank created: {} (index {})", name, index);
    Ok(())
}

/// Rename the bank at `index`.
pub fn rename_bank(config: &Config, index: usize, name: &str) -> Result<()> {
    let session = open_session(config)?;
    let mut bank = bank_at(&session, index)?;
    let previous = std::mem::replace(&mut bank.name, name.to_string());
    session.banks().update(bank, None)?;

    println!("Bank renamed: {} -> {}", previous, name);
    Ok(())
}

/// Delete the bank at `index`.
pub fn delete_bank(config: &Config, index: usize) -> Result<()> {
    let session = open_session(config)?;
    let bank = bank_at(&session, index)?;
    session.banks().delete(bank.id(), None)?;

    println!("Bank deleted: {}", bank.name);
    print_current(&session)
}

/// Append an empty patch to the bank at `bank_index`.
pub fn create_patch(config: &Config, bank_index: usize, name: &str) -> Result<()> {
    let session = open_session(config)?;
    let bank = bank_at(&session, bank_index)?;
    let index = session.patches().create(bank.id(), Patch::new(name), None)?;

    println!("Patch created: {} (bank {}, index {})", name, bank_index, index);
    Ok(())
}

/// Delete the patch at `patch_index` of the bank at `bank_index`.
pub fn delete_patch(config: &Config, bank_index: usize, patch_index: usize) -> Result<()> {
    let session = open_session(config)?;
    let bank = bank_at(&session, bank_index)?;
    let patch = bank
        .patches()
        .get(patch_index)
        .ok_or(PatchbayError::IndexRange {
            kind: EntityKind::Patch,
            index: patch_index,
            len: bank.patches().len(),
        })?;
    session.patches().delete(patch.id(), None)?;

    println!("Patch deleted: {}", patch.name);
    print_current(&session)
}

/// Make a bank current, at the given patch or at its first one.
pub fn select(config: &Config, bank_index: usize, patch_index: Option<usize>) -> Result<()> {
    let session = open_session(config)?;
    match patch_index {
        Some(patch_index) => session.current().set(bank_index, patch_index, None)?,
        None => session.current().set_bank(bank_index, None)?,
    }
    print_current(&session)
}

/// Step to the neighbouring patch of the current bank.
pub fn step_patch(config: &Config, direction: Direction) -> Result<()> {
    let session = open_session(config)?;
    session.current().advance_patch(direction, None)?;
    print_current(&session)
}

/// Step to the neighbouring bank.
pub fn step_bank(config: &Config, direction: Direction) -> Result<()> {
    let session = open_session(config)?;
    session.current().advance_bank(direction, None)?;
    print_current(&session)
}

/// Remove record files the manifest no longer lists.
pub fn prune(config: &Config) -> Result<()> {
    let dao = JsonDirectoryDao::new(&config.data_dir);
    let removed = dao.prune_orphans()?;

    println!("Pruned {} orphaned bank record(s)", removed);
    Ok(())
}

fn print_current(session: &Session) -> Result<()> {
    let bank = session.current().bank()?;
    let patch = session.current().patch()?;
    let selection = session.current().selection();
    println!(
        "Current: {} / {} (bank {}, patch {})",
        bank.name, patch.name, selection.bank_index, selection.patch_index
    );
    Ok(())
}
