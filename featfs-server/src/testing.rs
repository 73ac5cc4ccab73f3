//! Test doubles shared by the unit tests

use std::sync::Arc;

use parking_lot::Mutex;

use crate::registry::{
    Feature, FeatureContext, FeatureError, FeatureOps, FeatureRegistry, Parameter, SignedCodec,
    UnsignedCodec,
};

/// Ordered record of enable/disable calls across features
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn calls(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }

    fn push(&self, entry: String) {
        self.0.lock().push(entry);
    }
}

/// Feature that records every callback and fails on demand
pub struct RecordingFeature {
    log: CallLog,
    fail_enable: bool,
    fail_disable: bool,
    watched: Option<&'static str>,
}

impl RecordingFeature {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            fail_enable: false,
            fail_disable: false,
            watched: None,
        }
    }

    pub fn failing_enable(log: &CallLog) -> Self {
        Self {
            fail_enable: true,
            ..Self::new(log)
        }
    }

    pub fn failing_disable(log: &CallLog) -> Self {
        Self {
            fail_disable: true,
            ..Self::new(log)
        }
    }

    /// Also record the merged values of `param` when enabled
    pub fn watching(log: &CallLog, param: &'static str) -> Self {
        Self {
            watched: Some(param),
            ..Self::new(log)
        }
    }
}

impl FeatureOps for RecordingFeature {
    fn enable(&self, ctx: &FeatureContext<'_>) -> Result<(), FeatureError> {
        match self.watched {
            Some(param) => {
                let values: Vec<String> = ctx
                    .values(param)
                    .iter()
                    .map(|v| format!("{:?}", v))
                    .collect();
                self.log.push(format!(
                    "enable {} {}=[{}]",
                    ctx.feature_name(),
                    param,
                    values.join(",")
                ));
            }
            None => self.log.push(format!("enable {}", ctx.feature_name())),
        }
        if self.fail_enable {
            return Err(FeatureError::new(format!("{} refused to start", ctx.feature_name())));
        }
        Ok(())
    }

    fn disable(&self, ctx: &FeatureContext<'_>) -> Result<(), FeatureError> {
        self.log.push(format!("disable {}", ctx.feature_name()));
        if self.fail_disable {
            return Err(FeatureError::new(format!("{} refused to stop", ctx.feature_name())));
        }
        Ok(())
    }
}

/// Registry used by the service-level tests
///
/// - `A`, `B`: plain features
/// - `bad_enable`, `bad_disable`: fail the matching callback
/// - `tuned`: parameters `level` (signed) and `mask` (unsigned), records `level`
/// - `__hidden`: internal, parameter `depth`
pub fn sample_registry(log: &CallLog) -> Arc<FeatureRegistry> {
    let registry = FeatureRegistry::builder()
        .feature(Feature::new("A", RecordingFeature::new(log)))
        .feature(Feature::new("B", RecordingFeature::new(log)))
        .feature(Feature::new("bad_enable", RecordingFeature::failing_enable(log)))
        .feature(Feature::new("bad_disable", RecordingFeature::failing_disable(log)))
        .feature(
            Feature::new("tuned", RecordingFeature::watching(log, "level"))
                .param(Parameter::new("level", SignedCodec))
                .param(Parameter::new("mask", UnsignedCodec)),
        )
        .feature(
            Feature::new("__hidden", RecordingFeature::new(log))
                .internal()
                .param(Parameter::new("depth", UnsignedCodec)),
        )
        .build()
        .expect("sample registry is valid");
    Arc::new(registry)
}
