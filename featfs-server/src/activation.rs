//! Activation engine
//!
//! Turns a config's `set_features` selection into running features and back.
//! The engine owns ordering and fault containment only; features read their
//! own parameter values from the [`EffectiveValues`] they are handed.
//!
//! Policy on failure:
//! - activation stops at the first feature that fails to enable and reports
//!   it; features enabled before it stay enabled and stay held by the config
//! - deactivation releases every held feature, reports the first failure and
//!   always ends inactive so the config can be edited again

use featfs_utils::{FeatfsError, Result};
use tracing::{error, info, warn};

use crate::model::{ActivationState, ConfigId, ConfigList, EffectiveValues};
use crate::registry::FeatureRegistry;

/// Move a config towards `want_active`
///
/// Must be called with the interface lock held; `configs` is the guarded list.
pub fn request_transition(
    registry: &FeatureRegistry,
    configs: &mut ConfigList,
    id: ConfigId,
    want_active: bool,
) -> Result<()> {
    let config = configs
        .get(id)
        .ok_or_else(|| FeatfsError::NotFound(format!("config {}", id)))?;

    match (config.state(), want_active) {
        (ActivationState::Active, true) => Ok(()),
        (ActivationState::Inactive, true) => activate(registry, configs, id),
        (ActivationState::Active, false) => deactivate(registry, configs, id),
        (ActivationState::Inactive, false) => release_leftovers(registry, configs, id),
        (state, _) => Err(FeatfsError::internal(format!(
            "config {} is stuck in {:?}",
            config.name(),
            state
        ))),
    }
}

fn activate(registry: &FeatureRegistry, configs: &mut ConfigList, id: ConfigId) -> Result<()> {
    configs.set_state(id, ActivationState::Activating);
    let values = configs.effective_values(Some(id));

    let Some(config) = configs.get_mut(id) else {
        return Err(FeatfsError::NotFound(format!("config {}", id)));
    };
    let name = config.name().to_string();

    for feature in config.selected_features() {
        if config.holds(&feature) {
            continue;
        }
        match registry.enable(&feature, &values) {
            Ok(()) => config.hold(feature),
            Err(e) => {
                error!("Config {}: failed to activate feature {}: {}", name, feature, e);
                configs.set_state(id, ActivationState::Inactive);
                return Err(e);
            }
        }
    }

    configs.set_state(id, ActivationState::Active);
    info!("Config {} activated", name);
    Ok(())
}

fn deactivate(registry: &FeatureRegistry, configs: &mut ConfigList, id: ConfigId) -> Result<()> {
    configs.set_state(id, ActivationState::Deactivating);
    let values = configs.effective_values(Some(id));

    let result = match configs.get_mut(id) {
        Some(config) => {
            let name = config.name().to_string();
            let held = config.take_held();
            let result = release(registry, &name, &held, &values);
            info!("Config {} deactivated", name);
            result
        }
        None => Ok(()),
    };

    configs.set_state(id, ActivationState::Inactive);
    result
}

/// Drop features left enabled by an activation that failed part way
fn release_leftovers(
    registry: &FeatureRegistry,
    configs: &mut ConfigList,
    id: ConfigId,
) -> Result<()> {
    let values = configs.effective_values(None);
    let Some(config) = configs.get_mut(id) else {
        return Ok(());
    };
    if config.held().is_empty() {
        return Ok(());
    }

    let name = config.name().to_string();
    let held = config.take_held();
    warn!(
        "Config {}: releasing {} feature(s) left by a failed activation",
        name,
        held.len()
    );
    release(registry, &name, &held, &values)
}

fn release(
    registry: &FeatureRegistry,
    config: &str,
    held: &[String],
    values: &EffectiveValues,
) -> Result<()> {
    let mut first_err = None;
    for feature in held.iter().rev() {
        if let Err(e) = registry.disable(feature, values) {
            error!("Config {}: failed to deactivate feature {}: {}", config, feature, e);
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), Err)
}
