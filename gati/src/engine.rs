//! Motion engine: session lifecycle and the periodic tick loop.
//!
//! ```text
//!  platform delivery ──▶ ReadingSink ──▶ MotionTracker (filter + window)
//!                                              │ lock
//!  tick thread (every tick_interval) ──────────┘
//!     └─▶ MotionClassifier ──(on change)──▶ in_motion flag, TransitionSink
//! ```
//!
//! `start` picks thresholds for the chosen variant, subscribes to the
//! sensor and spawns the tick thread. `stop` cancels the subscription and
//! joins the tick thread, so no sink call is in flight once it returns.

use crate::classifier::MotionClassifier;
use crate::config::GatiConfig;
use crate::core::clock::Clock;
use crate::core::types::Average;
use crate::error::{Error, Result};
use crate::filter::{FilterStats, SampleFilter};
use crate::platform::{ReadingSink, SensorPlatform, Subscription};
use crate::source::{self, MotionSourceKind};
use crate::tracker::{MotionTracker, SharedTracker};
use crate::window::SlidingWindow;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Receiver of motion state changes.
///
/// Called from the engine's tick thread, once per transition. Errors and
/// panics are logged and do not stop monitoring.
pub trait TransitionSink: Send + Sync {
    fn on_transition(&self, in_motion: bool) -> Result<()>;
}

impl<F> TransitionSink for F
where
    F: Fn(bool) -> Result<()> + Send + Sync,
{
    fn on_transition(&self, in_motion: bool) -> Result<()> {
        self(in_motion)
    }
}

/// State of one started session
struct Session {
    kind: MotionSourceKind,
    tracker: SharedTracker,
    active: Arc<AtomicBool>,
    subscription: Box<dyn Subscription>,
    shutdown_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Motion detection engine
pub struct MotionEngine {
    config: GatiConfig,
    platform: Arc<dyn SensorPlatform>,
    clock: Arc<dyn Clock>,
    in_motion: Arc<AtomicBool>,
    session: Mutex<Option<Session>>,
}

impl MotionEngine {
    /// Create an idle engine. Fails if `config` does not validate.
    pub fn new(
        config: GatiConfig,
        platform: Arc<dyn SensorPlatform>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            platform,
            clock,
            in_motion: Arc::new(AtomicBool::new(false)),
            session: Mutex::new(None),
        })
    }

    /// Resolve the configured source against this engine's platform
    pub fn select_source(&self) -> Result<MotionSourceKind> {
        source::select_source(self.config.engine.source, self.platform.as_ref())
    }

    /// Start monitoring with the given source variant.
    ///
    /// A second call while running logs a warning and changes nothing.
    pub fn start(&self, kind: MotionSourceKind, sink: Arc<dyn TransitionSink>) -> Result<()> {
        let mut session = self.session.lock();
        if let Some(running) = session.as_ref() {
            log::warn!(
                "Motion engine already running ({} source), ignoring start",
                running.kind
            );
            return Ok(());
        }

        let sensor = kind.sensor();
        if !self.platform.has_sensor(sensor) {
            return Err(Error::SensorUnavailable(format!(
                "{} source needs a {} sensor",
                kind, sensor
            )));
        }

        let thresholds = self.config.thresholds.for_kind(kind);
        let session_start_us = self.clock.now_us();
        let magnitude = kind.magnitude_source(
            self.config.physics.gravity,
            self.config.physics.drift_reset(),
            session_start_us,
        );
        let filter = SampleFilter::new(
            sensor,
            magnitude,
            self.config.min_sample_interval(),
            session_start_us,
        );
        let window = SlidingWindow::new(self.config.engine.window_capacity)?;
        let tracker = MotionTracker::new(filter, window).into_shared();
        let active = Arc::new(AtomicBool::new(true));

        let subscription = self.platform.subscribe(
            sensor,
            ReadingSink::new(Arc::clone(&tracker), Arc::clone(&active)),
        )?;

        self.in_motion.store(false, Ordering::Release);
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let tick = TickLoop {
            tracker: Arc::clone(&tracker),
            classifier: MotionClassifier::new(thresholds),
            sink,
            in_motion: Arc::clone(&self.in_motion),
            active: Arc::clone(&active),
            interval: self.config.tick_interval(),
            shutdown_rx,
        };

        let handle = match thread::Builder::new()
            .name("gati-tick".to_string())
            .spawn(move || tick.run())
        {
            Ok(handle) => handle,
            Err(e) => {
                active.store(false, Ordering::Release);
                let mut subscription = subscription;
                subscription.cancel();
                return Err(Error::Thread(format!("Failed to spawn tick thread: {}", e)));
            }
        };

        log::info!(
            "Motion engine started: source={}, high={}, low={}, window={}, tick={}ms",
            kind,
            thresholds.high(),
            thresholds.low(),
            self.config.engine.window_capacity,
            self.config.engine.tick_interval_ms
        );

        *session = Some(Session {
            kind,
            tracker,
            active,
            subscription,
            shutdown_tx,
            handle,
        });
        Ok(())
    }

    /// Stop monitoring. No-op when not running.
    ///
    /// On return the subscription is cancelled and the tick thread has
    /// exited, unless called from the sink itself (the thread then exits
    /// after the callback returns).
    pub fn stop(&self) {
        let Some(mut session) = self.session.lock().take() else {
            return;
        };

        session.active.store(false, Ordering::Release);
        session.subscription.cancel();
        drop(session.shutdown_tx);

        if session.handle.thread().id() == thread::current().id() {
            log::debug!("Motion engine stopped from its own sink; tick thread exits on return");
        } else if session.handle.join().is_err() {
            log::error!("Tick thread panicked");
        }

        self.in_motion.store(false, Ordering::Release);

        let tracker = session.tracker.lock();
        let stats = tracker.stats();
        log::info!(
            "Motion engine stopped ({} from {}): accepted={}, rate_limited={}, rejected={}",
            tracker.filter().source_name(),
            tracker.filter().kind(),
            stats.accepted,
            stats.rate_limited,
            stats.rejected
        );
    }

    /// Latest classifier decision; `false` when not running
    pub fn is_in_motion(&self) -> bool {
        self.in_motion.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Source of the running session
    pub fn current_source(&self) -> Option<MotionSourceKind> {
        self.session.lock().as_ref().map(|s| s.kind)
    }

    /// Filter counters of the running session
    pub fn filter_stats(&self) -> Option<FilterStats> {
        self.session
            .lock()
            .as_ref()
            .map(|s| s.tracker.lock().stats())
    }

    /// Current window average of the running session
    pub fn average(&self) -> Option<Average> {
        self.session
            .lock()
            .as_ref()
            .map(|s| s.tracker.lock().average())
    }

    pub fn config(&self) -> &GatiConfig {
        &self.config
    }
}

impl Drop for MotionEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Tick thread state
struct TickLoop {
    tracker: SharedTracker,
    classifier: MotionClassifier,
    sink: Arc<dyn TransitionSink>,
    in_motion: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
    interval: Duration,
    shutdown_rx: Receiver<()>,
}

impl TickLoop {
    fn run(mut self) {
        log::debug!("Tick loop started: interval={:?}", self.interval);

        loop {
            match self.shutdown_rx.recv_timeout(self.interval) {
                Err(RecvTimeoutError::Timeout) => {}
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
            if !self.active.load(Ordering::Acquire) {
                break;
            }

            let average = self.tracker.lock().average();
            log::trace!("Tick: average={:?} state={:?}", average, self.classifier.state());

            let Some(transition) = self.classifier.evaluate(average) else {
                continue;
            };

            self.in_motion
                .store(transition.in_motion(), Ordering::Release);
            log::info!(
                "Motion transition: {:?} -> {:?} (average={:.3})",
                transition.from,
                transition.to,
                transition.average
            );

            // Stopped while evaluating: do not notify a torn-down sink
            if !self.active.load(Ordering::Acquire) {
                break;
            }
            self.notify(transition.in_motion());
        }

        log::debug!("Tick loop terminated");
    }

    fn notify(&self, in_motion: bool) {
        let sink = &self.sink;
        match panic::catch_unwind(AssertUnwindSafe(|| sink.on_transition(in_motion))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Transition sink failed (in_motion={}): {}", in_motion, e),
            Err(_) => log::error!("Transition sink panicked (in_motion={})", in_motion),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::types::SensorKind;
    use crate::platform::ManualPlatform;

    fn engine(sensors: &[SensorKind]) -> (MotionEngine, Arc<ManualPlatform>) {
        let platform = Arc::new(ManualPlatform::new(sensors));
        let mut config = GatiConfig::default();
        config.engine.tick_interval_ms = 10;
        let engine = MotionEngine::new(
            config,
            platform.clone(),
            Arc::new(ManualClock::new(1_000_000)),
        )
        .unwrap();
        (engine, platform)
    }

    fn noop_sink() -> Arc<dyn TransitionSink> {
        Arc::new(|_in_motion: bool| -> Result<()> { Ok(()) })
    }

    #[test]
    fn test_start_requires_sensor() {
        let (engine, platform) = engine(&[SensorKind::Accelerometer]);
        let err = engine
            .start(MotionSourceKind::LinearAcceleration, noop_sink())
            .unwrap_err();
        assert!(matches!(err, Error::SensorUnavailable(_)));
        assert!(!engine.is_running());
        assert_eq!(platform.subscribe_calls(), 0);
    }

    #[test]
    fn test_start_stop_lifecycle() {
        let (engine, platform) = engine(&[SensorKind::Accelerometer]);
        engine
            .start(MotionSourceKind::GravityCompensated, noop_sink())
            .unwrap();
        assert!(engine.is_running());
        assert_eq!(
            engine.current_source(),
            Some(MotionSourceKind::GravityCompensated)
        );
        assert_eq!(platform.active_subscriptions(), 1);
        assert!(!engine.is_in_motion());

        engine.stop();
        assert!(!engine.is_running());
        assert_eq!(platform.active_subscriptions(), 0);
        assert!(engine.filter_stats().is_none());

        // Second stop is a no-op
        engine.stop();
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = GatiConfig::default();
        config.engine.window_capacity = 1;
        let result = MotionEngine::new(
            config,
            Arc::new(ManualPlatform::new(&[])),
            Arc::new(ManualClock::new(0)),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_select_source_uses_config() {
        let (engine, _) = engine(&[SensorKind::Accelerometer]);
        assert_eq!(
            engine.select_source().unwrap(),
            MotionSourceKind::GravityCompensated
        );
    }
}
