//! Feature registry
//!
//! Static table of the features the service can activate, their declared
//! parameters and dependencies. The table is frozen by [`RegistryBuilder::build`];
//! afterwards the only runtime state is each feature's enable count.

pub mod builtin;
mod feature;
mod param;

use std::collections::HashMap;

use featfs_utils::{FeatfsError, Result};
use tracing::{debug, error, warn};

pub use feature::{Feature, FeatureContext, FeatureError, FeatureOps};
pub use param::{
    parse_bool, FlagCodec, ParamCodec, ParamValue, Parameter, SignedCodec, TextCodec,
    UnsignedCodec,
};

use crate::model::EffectiveValues;

/// File holding a config's feature selection
pub const SELECTION_FILE: &str = "set_features";

/// Names a config directory already uses for its own files
pub(crate) const RESERVED_NAMES: &[&str] =
    &["activate", SELECTION_FILE, "available_features", "configs"];

/// Position of a declared parameter inside the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamKey {
    pub feature: usize,
    pub param: usize,
}

/// Builder collecting features before the registry is frozen
#[derive(Default)]
pub struct RegistryBuilder {
    features: Vec<Feature>,
}

impl RegistryBuilder {
    pub fn feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    /// Validate names and dependencies and freeze the table
    pub fn build(self) -> Result<FeatureRegistry> {
        let mut by_name = HashMap::with_capacity(self.features.len());

        for (index, feature) in self.features.iter().enumerate() {
            validate_node_name(feature.name())?;
            if RESERVED_NAMES.contains(&feature.name()) {
                return Err(FeatfsError::config(format!(
                    "feature name {} clashes with a control file",
                    feature.name()
                )));
            }
            if by_name.insert(feature.name().to_string(), index).is_some() {
                return Err(FeatfsError::config(format!(
                    "duplicate feature {}",
                    feature.name()
                )));
            }

            for (i, param) in feature.params().iter().enumerate() {
                validate_node_name(param.name())?;
                if feature.params()[..i].iter().any(|p| p.name() == param.name()) {
                    return Err(FeatfsError::config(format!(
                        "feature {} declares parameter {} twice",
                        feature.name(),
                        param.name()
                    )));
                }
            }
        }

        let mut deps = Vec::with_capacity(self.features.len());
        for feature in &self.features {
            let mut resolved = Vec::with_capacity(feature.dependencies().len());
            for dep in feature.dependencies() {
                let index = by_name.get(dep).copied().ok_or_else(|| {
                    FeatfsError::config(format!(
                        "feature {} depends on unknown feature {}",
                        feature.name(),
                        dep
                    ))
                })?;
                resolved.push(index);
            }
            deps.push(resolved);
        }

        let registry = FeatureRegistry {
            features: self.features,
            by_name,
            deps,
            selection: Parameter::new(SELECTION_FILE, TextCodec),
        };
        registry.check_acyclic()?;

        Ok(registry)
    }
}

/// Read-only table of every feature known to the service
pub struct FeatureRegistry {
    features: Vec<Feature>,
    by_name: HashMap<String, usize>,
    /// Dependency indices per feature, resolved at build time
    deps: Vec<Vec<usize>>,
    selection: Parameter,
}

impl std::fmt::Debug for FeatureRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureRegistry")
            .field("features", &self.features)
            .finish()
    }
}

impl FeatureRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Features in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }

    /// Features with their registry index, in declaration order
    pub fn indexed(&self) -> impl Iterator<Item = (usize, &Feature)> {
        self.features.iter().enumerate()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, name: &str) -> Option<&Feature> {
        self.index_of(name).map(|i| &self.features[i])
    }

    pub fn feature_at(&self, index: usize) -> Option<&Feature> {
        self.features.get(index)
    }

    pub fn param(&self, key: ParamKey) -> Option<&Parameter> {
        self.features
            .get(key.feature)
            .and_then(|f| f.params().get(key.param))
    }

    /// The pseudo-parameter backing `set_features`
    pub fn selection_param(&self) -> &Parameter {
        &self.selection
    }

    /// Names listed by `available_features`
    pub fn available_names(&self) -> impl Iterator<Item = &str> {
        self.features
            .iter()
            .filter(|f| !f.is_internal())
            .map(|f| f.name())
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.enable_count(name) > 0
    }

    /// Number of holders currently keeping a feature enabled
    pub fn enable_count(&self, name: &str) -> usize {
        self.get(name).map(|f| *f.refcount().lock()).unwrap_or(0)
    }

    /// Take a reference on a feature, enabling it and its dependencies if
    /// this is the first one
    pub fn enable(&self, name: &str, values: &EffectiveValues) -> Result<()> {
        let index = self
            .index_of(name)
            .ok_or_else(|| FeatfsError::UnknownFeature(name.to_string()))?;
        self.enable_index(index, values)
    }

    /// Drop a reference on a feature, disabling it and then its
    /// dependencies when the last one goes away
    ///
    /// The reference is dropped even when the callback fails.
    pub fn disable(&self, name: &str, values: &EffectiveValues) -> Result<()> {
        let index = self
            .index_of(name)
            .ok_or_else(|| FeatfsError::UnknownFeature(name.to_string()))?;
        self.disable_index(index, values)
    }

    fn enable_index(&self, index: usize, values: &EffectiveValues) -> Result<()> {
        let feature = &self.features[index];
        let mut count = feature.refcount().lock();
        if *count > 0 {
            *count += 1;
            return Ok(());
        }

        let mut enabled_deps = Vec::new();
        for &dep in &self.deps[index] {
            if let Err(e) = self.enable_index(dep, values) {
                self.unwind_deps(&enabled_deps, values);
                return Err(e);
            }
            enabled_deps.push(dep);
        }

        let ctx = FeatureContext::new(feature, index, values);
        if let Err(e) = feature.ops().enable(&ctx) {
            error!("Failed to enable feature {}: {}", feature.name(), e);
            self.unwind_deps(&enabled_deps, values);
            return Err(FeatfsError::feature_failed(feature.name(), e.to_string()));
        }

        debug!("Feature {} enabled", feature.name());
        *count = 1;
        Ok(())
    }

    fn disable_index(&self, index: usize, values: &EffectiveValues) -> Result<()> {
        let feature = &self.features[index];
        let mut count = feature.refcount().lock();
        match *count {
            0 => {
                warn!("Feature {} is not enabled", feature.name());
                return Ok(());
            }
            1 => {}
            _ => {
                *count -= 1;
                return Ok(());
            }
        }

        let ctx = FeatureContext::new(feature, index, values);
        let mut first_err = feature.ops().disable(&ctx).err().map(|e| {
            error!("Failed to disable feature {}: {}", feature.name(), e);
            FeatfsError::feature_failed(feature.name(), e.to_string())
        });
        *count = 0;
        drop(count);
        debug!("Feature {} disabled", feature.name());

        for &dep in self.deps[index].iter().rev() {
            if let Err(e) = self.disable_index(dep, values) {
                first_err.get_or_insert(e);
            }
        }

        first_err.map_or(Ok(()), Err)
    }

    fn unwind_deps(&self, deps: &[usize], values: &EffectiveValues) {
        for &dep in deps.iter().rev() {
            if let Err(e) = self.disable_index(dep, values) {
                warn!("Failed to unwind dependency: {}", e);
            }
        }
    }

    fn check_acyclic(&self) -> Result<()> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            New,
            Visiting,
            Done,
        }

        fn visit(registry: &FeatureRegistry, index: usize, marks: &mut [Mark]) -> Result<()> {
            match marks[index] {
                Mark::Done => return Ok(()),
                Mark::Visiting => {
                    return Err(FeatfsError::config(format!(
                        "dependency cycle through feature {}",
                        registry.features[index].name()
                    )))
                }
                Mark::New => {}
            }
            marks[index] = Mark::Visiting;
            for &dep in &registry.deps[index] {
                visit(registry, dep, marks)?;
            }
            marks[index] = Mark::Done;
            Ok(())
        }

        let mut marks = vec![Mark::New; self.features.len()];
        for index in 0..self.features.len() {
            visit(self, index, &mut marks)?;
        }
        Ok(())
    }
}

/// Check that a name can be used as a single namespace node name
pub(crate) fn validate_node_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') {
        return Err(FeatfsError::invalid_input(format!(
            "invalid entry name {:?}",
            name
        )));
    }
    Ok(())
}
