//! Model registry
//!
//! Maps model identifiers to factories registered in code, so controllers
//! can ask for a model by name without any runtime type lookup.

use crate::core::{DalError, Result};
use std::collections::HashMap;

/// Constructor for a model value.
pub type ModelFactory<M> = fn() -> M;

/// Identifier-keyed table of model factories.
///
/// `M` is usually an enum of the application's models or a boxed trait object.
pub struct ModelRegistry<M> {
    factories: HashMap<&'static str, ModelFactory<M>>,
}

impl<M> Default for ModelRegistry<M> {
    fn default() -> Self {
        ModelRegistry {
            factories: HashMap::new(),
        }
    }
}

impl<M> ModelRegistry<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `id`, replacing any earlier registration.
    pub fn register(mut self, id: &'static str, factory: ModelFactory<M>) -> Self {
        self.factories.insert(id, factory);
        self
    }

    /// Builds the model registered under `id`.
    ///
    /// # Errors
    ///
    /// Returns `DalError::UnknownModel` when nothing is registered under `id`.
    pub fn create(&self, id: &str) -> Result<M> {
        self.factories
            .get(id)
            .map(|factory| factory())
            .ok_or_else(|| DalError::UnknownModel(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// Registered identifiers in sorted order.
    pub fn identifiers(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.factories.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
