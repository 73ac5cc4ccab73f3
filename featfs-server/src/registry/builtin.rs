//! Features shipped with the `featfs` binary

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use featfs_utils::Result;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::{
    Feature, FeatureContext, FeatureError, FeatureOps, FeatureRegistry, Parameter, TextCodec,
    UnsignedCodec,
};

pub const HEARTBEAT: &str = "heartbeat";
pub const EVENT_LOG: &str = "event_log";
pub const TIMEBASE: &str = "__timebase";

const DEFAULT_PERIOD_MS: u64 = 1000;
const DEFAULT_RESOLUTION_US: u64 = 1;

/// Registry of the built-in features
pub fn registry() -> Result<FeatureRegistry> {
    let timebase = Arc::new(Timebase::default());
    FeatureRegistry::builder()
        .feature(
            Feature::new(HEARTBEAT, Heartbeat::new(Arc::clone(&timebase)))
                .param(Parameter::new("period_ms", UnsignedCodec))
                .depends_on(TIMEBASE),
        )
        .feature(
            Feature::new(EVENT_LOG, EventLog::default())
                .param(Parameter::new("events", TextCodec)),
        )
        .feature(
            Feature::with_ops(TIMEBASE, timebase)
                .internal()
                .param(Parameter::new("resolution_us", UnsignedCodec)),
        )
        .build()
}

// ==================== Timebase ====================

/// Shared clock resolution, set while enabled
#[derive(Debug, Default)]
pub struct Timebase {
    resolution_us: AtomicU64,
}

impl Timebase {
    /// Current resolution in microseconds, 0 while disabled
    pub fn resolution_us(&self) -> u64 {
        self.resolution_us.load(Ordering::Acquire)
    }
}

impl FeatureOps for Timebase {
    fn enable(&self, ctx: &FeatureContext<'_>) -> std::result::Result<(), FeatureError> {
        let resolution = ctx
            .values("resolution_us")
            .iter()
            .filter_map(|v| v.as_u64())
            .filter(|&r| r > 0)
            .min()
            .unwrap_or(DEFAULT_RESOLUTION_US);
        self.resolution_us.store(resolution, Ordering::Release);
        info!("Timebase running at {}us", resolution);
        Ok(())
    }

    fn disable(&self, _ctx: &FeatureContext<'_>) -> std::result::Result<(), FeatureError> {
        self.resolution_us.store(0, Ordering::Release);
        Ok(())
    }
}

// ==================== Heartbeat ====================

/// Periodic tick on the tokio runtime
pub struct Heartbeat {
    timebase: Arc<Timebase>,
    ticks: Arc<AtomicU64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Heartbeat {
    pub fn new(timebase: Arc<Timebase>) -> Self {
        Self {
            timebase,
            ticks: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().is_some()
    }
}

impl FeatureOps for Heartbeat {
    fn enable(&self, ctx: &FeatureContext<'_>) -> std::result::Result<(), FeatureError> {
        let handle = Handle::try_current()
            .map_err(|_| FeatureError::new("heartbeat needs a tokio runtime"))?;

        // Shortest period requested by any active config wins
        let period_ms = ctx
            .values("period_ms")
            .iter()
            .filter_map(|v| v.as_u64())
            .filter(|&p| p > 0)
            .min()
            .unwrap_or(DEFAULT_PERIOD_MS);
        if self.timebase.resolution_us() == 0 {
            return Err(FeatureError::new("timebase is not running"));
        }

        let ticks = Arc::clone(&self.ticks);
        let task = handle.spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(period_ms));
            loop {
                interval.tick().await;
                let n = ticks.fetch_add(1, Ordering::Relaxed) + 1;
                debug!(tick = n, "heartbeat");
            }
        });

        if let Some(old) = self.task.lock().replace(task) {
            old.abort();
        }
        info!("Heartbeat started every {}ms", period_ms);
        Ok(())
    }

    fn disable(&self, _ctx: &FeatureContext<'_>) -> std::result::Result<(), FeatureError> {
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        info!("Heartbeat stopped after {} ticks", self.ticks());
        Ok(())
    }
}

// ==================== Event log ====================

/// Logs the configured event names while enabled
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<String>>,
}

impl EventLog {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl FeatureOps for EventLog {
    fn enable(&self, ctx: &FeatureContext<'_>) -> std::result::Result<(), FeatureError> {
        let events: Vec<String> = ctx
            .values("events")
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();
        for event in &events {
            info!(event = %event, "Event logging enabled");
        }
        *self.events.lock() = events;
        Ok(())
    }

    fn disable(&self, _ctx: &FeatureContext<'_>) -> std::result::Result<(), FeatureError> {
        let events = std::mem::take(&mut *self.events.lock());
        info!("Event logging disabled for {} event(s)", events.len());
        Ok(())
    }
}
