use std::time::SystemTime;

use featfs_utils::{FeatfsError, Result};
use serde::Serialize;
use uuid::Uuid;

use super::{ParamEntry, ParamRef, ValueList};

/// Identity of a config, stable for its whole life and never reused
pub type ConfigId = Uuid;

/// Activation state machine of a config
///
/// `Activating` and `Deactivating` only exist while the engine runs with the
/// interface lock held.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationState {
    #[default]
    Inactive,
    Activating,
    Active,
    Deactivating,
}

/// A named set of feature selections and parameter values
#[derive(Debug)]
pub struct Config {
    id: ConfigId,
    name: String,
    state: ActivationState,
    entries: Vec<ParamEntry>,
    /// Namespace path of the directory exposing this config
    root: String,
    /// Features this config holds an enable reference on, in enable order
    held: Vec<String>,
    created_at: SystemTime,
}

impl Config {
    pub fn new(name: impl Into<String>, root: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            state: ActivationState::Inactive,
            entries: Vec::new(),
            root: root.into(),
            held: Vec::new(),
            created_at: SystemTime::now(),
        }
    }

    pub fn id(&self) -> ConfigId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn state(&self) -> ActivationState {
        self.state
    }

    pub fn is_activated(&self) -> bool {
        self.state == ActivationState::Active
    }

    pub(crate) fn set_state(&mut self, state: ActivationState) {
        self.state = state;
    }

    /// Add the entry for `param`, returning its index
    ///
    /// There is exactly one entry per parameter; adding one twice returns the
    /// existing index.
    pub fn add_entry(&mut self, param: ParamRef) -> usize {
        if let Some(index) = self.entry_index(param) {
            return index;
        }
        self.entries.push(ParamEntry::new(self.id, param));
        self.entries.len() - 1
    }

    pub fn entries(&self) -> &[ParamEntry] {
        &self.entries
    }

    pub fn entry(&self, index: usize) -> Option<&ParamEntry> {
        self.entries.get(index)
    }

    pub fn entry_index(&self, param: ParamRef) -> Option<usize> {
        self.entries.iter().position(|e| e.param() == param)
    }

    /// Mutable values of an entry, refused while the config is activated
    pub fn values_mut(&mut self, index: usize) -> Result<&mut ValueList> {
        if self.state != ActivationState::Inactive {
            return Err(FeatfsError::Busy(self.name.clone()));
        }
        let name = &self.name;
        self.entries
            .get_mut(index)
            .map(ParamEntry::values_mut)
            .ok_or_else(|| FeatfsError::NotFound(format!("entry {} of config {}", index, name)))
    }

    /// Feature names in `set_features`, in the order they were written
    pub fn selected_features(&self) -> Vec<String> {
        self.entry_index(ParamRef::Selection)
            .map(|i| {
                self.entries[i]
                    .values()
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn held(&self) -> &[String] {
        &self.held
    }

    pub fn holds(&self, feature: &str) -> bool {
        self.held.iter().any(|f| f == feature)
    }

    pub(crate) fn hold(&mut self, feature: impl Into<String>) {
        self.held.push(feature.into());
    }

    pub(crate) fn take_held(&mut self) -> Vec<String> {
        std::mem::take(&mut self.held)
    }
}
