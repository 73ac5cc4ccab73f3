use std::collections::HashMap;

use crate::registry::{ParamKey, ParamValue};

/// Parameter values merged across every activated config
///
/// Features read their settings from here when they are enabled. Values
/// keep the order in which configs were activated; a value already present
/// is not repeated.
#[derive(Debug, Clone, Default)]
pub struct EffectiveValues {
    values: HashMap<ParamKey, Vec<ParamValue>>,
}

impl EffectiveValues {
    pub fn get(&self, key: ParamKey) -> &[ParamValue] {
        self.values.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn merge<'a>(&mut self, key: ParamKey, values: impl IntoIterator<Item = &'a ParamValue>) {
        let merged = self.values.entry(key).or_default();
        for value in values {
            if !merged.contains(value) {
                merged.push(value.clone());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.values().all(Vec::is_empty)
    }
}
