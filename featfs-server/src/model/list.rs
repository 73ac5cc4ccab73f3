use std::collections::HashMap;

use featfs_utils::{FeatfsError, Result};

use super::{ActivationState, Config, ConfigId, EffectiveValues, ParamRef};

/// Every live config of a service instance
///
/// Lives behind the interface lock. Names are unique; ids are never reused,
/// so a namespace node bound to a removed config can never reach a newer
/// config that took the same name.
#[derive(Debug, Default)]
pub struct ConfigList {
    configs: HashMap<ConfigId, Config>,
    /// Map config name to ID for lookup
    name_to_id: HashMap<String, ConfigId>,
    /// Activated configs, oldest activation first
    activation_order: Vec<ConfigId>,
}

impl ConfigList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fully built config
    pub fn insert(&mut self, config: Config) -> Result<ConfigId> {
        if self.name_to_id.contains_key(config.name()) {
            return Err(FeatfsError::AlreadyExists(config.name().to_string()));
        }
        let id = config.id();
        self.name_to_id.insert(config.name().to_string(), id);
        self.configs.insert(id, config);
        Ok(id)
    }

    /// Unregister a config, handing ownership back to the caller
    pub fn remove(&mut self, id: ConfigId) -> Option<Config> {
        let config = self.configs.remove(&id)?;
        self.name_to_id.remove(config.name());
        self.activation_order.retain(|a| *a != id);
        Some(config)
    }

    pub fn get(&self, id: ConfigId) -> Option<&Config> {
        self.configs.get(&id)
    }

    pub fn get_mut(&mut self, id: ConfigId) -> Option<&mut Config> {
        self.configs.get_mut(&id)
    }

    pub fn find_id(&self, name: &str) -> Option<ConfigId> {
        self.name_to_id.get(name).copied()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.name_to_id.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    /// Configs sorted by creation time, oldest first
    pub fn list(&self) -> Vec<&Config> {
        let mut configs: Vec<&Config> = self.configs.values().collect();
        configs.sort_by_key(|c| c.created_at());
        configs
    }

    pub fn ids(&self) -> Vec<ConfigId> {
        self.list().iter().map(|c| c.id()).collect()
    }

    /// Move a config to its final state, tracking activation order
    pub(crate) fn set_state(&mut self, id: ConfigId, state: ActivationState) {
        let Some(config) = self.configs.get_mut(&id) else {
            return;
        };
        config.set_state(state);
        match state {
            ActivationState::Active => {
                if !self.activation_order.contains(&id) {
                    self.activation_order.push(id);
                }
            }
            ActivationState::Inactive => self.activation_order.retain(|a| *a != id),
            ActivationState::Activating | ActivationState::Deactivating => {}
        }
    }

    /// Merge the declared parameter values of every activated config, plus
    /// `including` when it is not activated yet
    pub fn effective_values(&self, including: Option<ConfigId>) -> EffectiveValues {
        let mut merged = EffectiveValues::default();
        let extra = including.filter(|id| !self.activation_order.contains(id));

        for id in self.activation_order.iter().chain(extra.iter()) {
            let Some(config) = self.configs.get(id) else {
                continue;
            };
            for entry in config.entries() {
                if let ParamRef::Declared(key) = entry.param() {
                    merged.merge(key, entry.values());
                }
            }
        }
        merged
    }
}
