//! Features and the capability interface they implement

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ParamKey, ParamValue, Parameter};
use crate::model::EffectiveValues;

/// Error reported by a feature's enable/disable callback
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FeatureError(String);

impl FeatureError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Enable/disable capability of a feature
///
/// Both callbacks run with the interface lock held. Blocking work stalls
/// every other namespace operation until it returns.
pub trait FeatureOps: Send + Sync {
    fn enable(&self, ctx: &FeatureContext<'_>) -> Result<(), FeatureError>;

    fn disable(&self, ctx: &FeatureContext<'_>) -> Result<(), FeatureError>;
}

/// What a feature sees while it is being enabled or disabled
pub struct FeatureContext<'a> {
    feature: &'a Feature,
    index: usize,
    values: &'a EffectiveValues,
}

impl<'a> FeatureContext<'a> {
    pub(crate) fn new(feature: &'a Feature, index: usize, values: &'a EffectiveValues) -> Self {
        Self {
            feature,
            index,
            values,
        }
    }

    pub fn feature_name(&self) -> &str {
        self.feature.name()
    }

    /// Merged values of one of this feature's parameters across every
    /// activated config
    pub fn values(&self, param: &str) -> &'a [ParamValue] {
        match self.feature.param_index(param) {
            Some(param) => self.values.get(ParamKey {
                feature: self.index,
                param,
            }),
            None => &[],
        }
    }

    /// First merged value of a parameter, if any
    pub fn value(&self, param: &str) -> Option<&'a ParamValue> {
        self.values(param).first()
    }
}

/// A named unit of functionality that can be enabled and disabled
pub struct Feature {
    name: String,
    internal: bool,
    params: Vec<Parameter>,
    depends_on: Vec<String>,
    ops: Arc<dyn FeatureOps>,
    /// Number of holders; the feature runs while this is non-zero
    refcount: Mutex<usize>,
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feature")
            .field("name", &self.name)
            .field("internal", &self.internal)
            .field("params", &self.params)
            .field("depends_on", &self.depends_on)
            .field("refcount", &*self.refcount.lock())
            .finish()
    }
}

impl Feature {
    pub fn new(name: impl Into<String>, ops: impl FeatureOps + 'static) -> Self {
        Self::with_ops(name, Arc::new(ops))
    }

    pub fn with_ops(name: impl Into<String>, ops: Arc<dyn FeatureOps>) -> Self {
        Self {
            name: name.into(),
            internal: false,
            params: Vec::new(),
            depends_on: Vec::new(),
            ops,
            refcount: Mutex::new(0),
        }
    }

    /// Hide this feature from `available_features`
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    /// Declare a parameter
    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// Require another feature to be enabled before this one
    pub fn depends_on(mut self, feature: impl Into<String>) -> Self {
        self.depends_on.push(feature.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }

    pub fn dependencies(&self) -> &[String] {
        &self.depends_on
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name() == name)
    }

    pub(crate) fn ops(&self) -> &dyn FeatureOps {
        self.ops.as_ref()
    }

    pub(crate) fn refcount(&self) -> &Mutex<usize> {
        &self.refcount
    }
}
