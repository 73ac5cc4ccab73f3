//! Data model behind the namespace
//!
//! A [`Config`] owns one [`ParamEntry`] per parameter it exposes, each entry
//! owns its [`ValueList`], and the [`ConfigList`] owns every config. Nothing
//! outside this tree owns model objects; namespace nodes refer to them by
//! [`ConfigId`] and entry index.

mod config;
mod effective;
mod entry;
mod list;
mod values;

pub use config::{ActivationState, Config, ConfigId};
pub use effective::EffectiveValues;
pub use entry::{ParamEntry, ParamRef};
pub use list::ConfigList;
pub use values::ValueList;
