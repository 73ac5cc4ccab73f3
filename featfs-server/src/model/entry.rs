use super::{ConfigId, ValueList};
use crate::registry::{FeatureRegistry, ParamKey, Parameter};

/// Which parameter an entry stores values for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamRef {
    /// The `set_features` selection
    Selection,
    /// A parameter declared by a feature
    Declared(ParamKey),
}

impl ParamRef {
    /// Resolve to the registry parameter whose codec parses this entry
    pub fn resolve<'r>(&self, registry: &'r FeatureRegistry) -> Option<&'r Parameter> {
        match self {
            Self::Selection => Some(registry.selection_param()),
            Self::Declared(key) => registry.param(*key),
        }
    }
}

/// Values of one parameter within one config
#[derive(Debug, Clone)]
pub struct ParamEntry {
    config: ConfigId,
    param: ParamRef,
    values: ValueList,
}

impl ParamEntry {
    pub(crate) fn new(config: ConfigId, param: ParamRef) -> Self {
        Self {
            config,
            param,
            values: ValueList::new(),
        }
    }

    pub fn config(&self) -> ConfigId {
        self.config
    }

    pub fn param(&self) -> ParamRef {
        self.param
    }

    pub fn values(&self) -> &ValueList {
        &self.values
    }

    pub(crate) fn values_mut(&mut self) -> &mut ValueList {
        &mut self.values
    }
}
