//! Dispute normalizer provider registry.
//!
//! Maps each provider key to its compiled mapping program. The registry is
//! populated once at startup, frozen, and then only read.
//!
//! ## Lifecycle
//!
//! 1. Stage mappings in a [`RegistryBuilder`] (or let [`load_dir`] do it)
//! 2. [`RegistryBuilder::build`] freezes them into a [`ProviderRegistry`]
//! 3. Share the registry freely; clones point at the same entries
//!
//! There is no way to add, replace or remove a provider on a built
//! registry. Requests in flight always see the provider set the pipeline
//! was constructed with.

mod error;
mod key;
mod loader;
mod registry;

pub use crate::error::RegistryError;
pub use crate::key::ProviderKey;
pub use crate::loader::{load_dir, DEFAULT_EXTENSION};
pub use crate::registry::{ProviderRegistry, RegistryBuilder};
