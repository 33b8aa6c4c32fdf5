//! lossreg - loss identifier registry
//!
//! This crate resolves loss identifiers (names, aliases, configuration
//! mappings, or loss objects) into callable losses, and serializes losses
//! back into portable configurations.

#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod error;
pub mod logging;
pub mod losses;
pub mod registry;
pub mod utils;

// Re-exports
pub use config::{Config, LoggingConfig};
pub use error::{Error, Result};
pub use losses::{ConfigMap, FromConfig, Loss, LossFunction, Reduction, Tensor};
pub use registry::{
    deserialize, deserialize_with, get, get_with, registry, serialize, ConfigurationMapping,
    CustomObjects, Identifier, LossCallable, LossClass, LossEntity, RegistryTable, Resolver,
    SerializedLoss,
};
