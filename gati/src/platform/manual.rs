//! Host-driven platform.
//!
//! The embedding application owns the real sensors and forwards each
//! callback through [`ManualPlatform::push`]. Also used to replay recorded
//! readings.

use super::{ReadingSink, SensorPlatform, Subscription};
use crate::core::types::{RawReading, SensorKind};
use crate::error::{Error, Result};
use crate::filter::FilterOutcome;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

type Subscribers = Arc<Mutex<HashMap<SensorKind, (u64, ReadingSink)>>>;

/// Platform whose readings are pushed in by the caller
pub struct ManualPlatform {
    sensors: HashSet<SensorKind>,
    subscribers: Subscribers,
    next_id: AtomicU64,
    subscribe_calls: AtomicUsize,
}

impl ManualPlatform {
    /// Platform exposing exactly `sensors`
    pub fn new(sensors: &[SensorKind]) -> Self {
        Self {
            sensors: sensors.iter().copied().collect(),
            subscribers: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            subscribe_calls: AtomicUsize::new(0),
        }
    }

    /// Deliver a reading to the current subscriber of its sensor kind.
    ///
    /// Returns `None` if nobody is subscribed or the session has stopped.
    pub fn push(&self, reading: RawReading) -> Option<FilterOutcome> {
        // Clone out so the subscriber map is not locked while the tracker is
        let sink = self
            .subscribers
            .lock()
            .get(&reading.kind)
            .map(|(_, sink)| sink.clone())?;
        sink.deliver(&reading)
    }

    /// Number of live subscriptions
    pub fn active_subscriptions(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Total successful `subscribe` calls since creation
    pub fn subscribe_calls(&self) -> usize {
        self.subscribe_calls.load(Ordering::Relaxed)
    }
}

impl SensorPlatform for ManualPlatform {
    fn has_sensor(&self, kind: SensorKind) -> bool {
        self.sensors.contains(&kind)
    }

    fn subscribe(&self, kind: SensorKind, sink: ReadingSink) -> Result<Box<dyn Subscription>> {
        if !self.has_sensor(kind) {
            return Err(Error::SensorUnavailable(format!(
                "manual platform has no {} sensor",
                kind
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if self.subscribers.lock().insert(kind, (id, sink)).is_some() {
            log::warn!("Manual platform: replacing existing {} subscriber", kind);
        }
        self.subscribe_calls.fetch_add(1, Ordering::Relaxed);
        log::debug!("Manual platform: {} subscription #{} registered", kind, id);

        Ok(Box::new(ManualSubscription {
            id,
            kind,
            subscribers: Arc::clone(&self.subscribers),
            cancelled: false,
        }))
    }
}

struct ManualSubscription {
    id: u64,
    kind: SensorKind,
    subscribers: Subscribers,
    cancelled: bool,
}

impl Subscription for ManualSubscription {
    fn cancel(&mut self) {
        if self.cancelled {
            return;
        }
        self.cancelled = true;

        let mut subscribers = self.subscribers.lock();
        // A newer subscription for the same kind may have replaced this one
        if subscribers.get(&self.kind).is_some_and(|(id, _)| *id == self.id) {
            subscribers.remove(&self.kind);
        }
        log::debug!(
            "Manual platform: {} subscription #{} cancelled",
            self.kind,
            self.id
        );
    }
}

impl Drop for ManualSubscription {
    fn drop(&mut self) {
        self.cancel();
    }
}
