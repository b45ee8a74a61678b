//! Collection Store
//!
//! Ordered, identity-keyed sequences. The top level of a session is a
//! `Sequence<Bank>` and every bank owns a `Sequence<Patch>`; both use the
//! same primitives. Edits here are purely structural: nothing is persisted,
//! loaded on the device or published.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EntityKind, PatchbayError, Result};

/// An element that can live in a [`Sequence`]
///
/// Equality inside a sequence is by [`Entity::id`], never by value.
pub trait Entity: Clone {
    type Id: Copy + Eq + fmt::Debug + fmt::Display;

    /// Used to label errors raised by the sequence
    const KIND: EntityKind;

    fn id(&self) -> Self::Id;
}

/// Ordered collection holding each entity at most once
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sequence<T> {
    items: Vec<T>,
}

impl<T> Default for Sequence<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Entity> Sequence<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    /// Derived index of the entity, if present
    pub fn position(&self, id: T::Id) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn contains(&self, id: T::Id) -> bool {
        self.position(id).is_some()
    }

    pub fn find(&self, id: T::Id) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub(crate) fn find_mut(&mut self, id: T::Id) -> Option<&mut T> {
        self.items.iter_mut().find(|item| item.id() == id)
    }

    /// Same as [`Sequence::position`] but fails with `NotFound`
    pub fn require(&self, id: T::Id) -> Result<usize> {
        self.position(id)
            .ok_or_else(|| PatchbayError::not_found(T::KIND, id))
    }

    /// Id of the entity following `id` in circular order
    ///
    /// Returns `None` when `id` is absent or is the only element.
    pub fn successor(&self, id: T::Id) -> Option<T::Id> {
        let index = self.position(id)?;
        if self.items.len() < 2 {
            return None;
        }
        let next = (index + 1) % self.items.len();
        Some(self.items[next].id())
    }

    /// Add an entity at the end, returning its index
    pub fn append(&mut self, item: T) -> Result<usize> {
        if self.contains(item.id()) {
            return Err(PatchbayError::duplicate(T::KIND, item.id()));
        }
        self.items.push(item);
        Ok(self.items.len() - 1)
    }

    /// Remove an entity by identity, handing it back
    pub fn remove(&mut self, id: T::Id) -> Result<T> {
        let index = self.require(id)?;
        Ok(self.items.remove(index))
    }

    /// Exchange the positions of two entities
    pub fn swap(&mut self, a: T::Id, b: T::Id) -> Result<()> {
        let index_a = self.require(a)?;
        let index_b = self.require(b)?;
        self.items.swap(index_a, index_b);
        Ok(())
    }

    /// Reinsert an entity at `new_index`, clamped to the valid range
    ///
    /// Returns the index the entity ended up at.
    pub fn move_to(&mut self, id: T::Id, new_index: usize) -> Result<usize> {
        let index = self.require(id)?;
        let item = self.items.remove(index);
        let target = new_index.min(self.items.len());
        self.items.insert(target, item);
        Ok(target)
    }

    /// Put `new` where `old` is, handing `old` back
    ///
    /// `new` may carry the same id as `old` (an in-place update), but must not
    /// be present anywhere else in the sequence.
    pub fn replace(&mut self, old: T::Id, new: T) -> Result<T> {
        let index = self.require(old)?;
        if new.id() != old && self.contains(new.id()) {
            return Err(PatchbayError::duplicate(T::KIND, new.id()));
        }
        Ok(std::mem::replace(&mut self.items[index], new))
    }
}

impl<'a, T> IntoIterator for &'a Sequence<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
