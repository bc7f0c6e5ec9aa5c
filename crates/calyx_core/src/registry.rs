//! Ordered registry of unique values
//!
//! Used wherever a set of names is declared once at startup, such as builder
//! tags. Registering the same value twice is a programming
//! error and is reported, never silently absorbed.

use std::fmt::Debug;

use crate::error::{CoreError, Result};

/// Insertion-ordered collection that rejects duplicates
#[derive(Clone, Debug)]
pub struct UniqueRegistry<T> {
    values: Vec<T>,
}

impl<T> Default for UniqueRegistry<T> {
    fn default() -> Self {
        Self { values: Vec::new() }
    }
}

impl<T: PartialEq + Debug> UniqueRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value, failing if an equal value is already registered
    pub fn register(&mut self, value: T) -> Result<()> {
        if self.values.contains(&value) {
            return Err(CoreError::DuplicateRegistration(format!("{:?}", value)));
        }
        self.values.push(value);
        Ok(())
    }

    pub fn contains(&self, value: &T) -> bool {
        self.values.contains(value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
