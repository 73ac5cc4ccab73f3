//! featfs - feature configuration namespace
//!
//! A hierarchical namespace of directories and small text files through
//! which features are selected, parameterised and activated as groups
//! ("configs"). The binary drives it from a command shell.

pub mod activation;
pub mod model;
pub mod namespace;
pub mod registry;
pub mod service;
pub mod settings;
pub mod shell;

#[cfg(test)]
mod testing;

pub use registry::{Feature, FeatureOps, FeatureRegistry};
pub use service::{FeatureFs, WriteMode};
pub use settings::{Settings, SettingsLoader};
