//! Detector state machine and the single-consumer aggregation task.

use prahari_common::{
    ChannelSink, DetectorOptions, DetectorState, Hit, Notification, PrahariError, PrahariResult,
};
use prahari_listener::ListenerPool;
use prahari_ports::PortSet;
use prahari_tracker::HitTracker;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument};

/// Floor for the sweep cadence so a sub-second window doesn't spin the
/// interval timer.
const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);

/// Resources owned by one activation, guarded by the lifecycle mutex.
struct Inner {
    pool: ListenerPool,
    aggregator: Option<JoinHandle<()>>,
}

/// Orchestrates the listener pool and the hit tracker.
///
/// Lifecycle: `Stopped -> Starting -> Running -> Stopping -> Stopped`.
/// `start` and `stop` are serialized by an async mutex; a caller invoking
/// either while a transition is in flight blocks until it completes (the
/// documented policy for concurrent transitions). The transient
/// `Starting`/`Stopping` states stay observable through `state()` from
/// other tasks.
pub struct ScanDetector {
    ports: PortSet,
    options: DetectorOptions,
    notify: mpsc::UnboundedSender<Notification>,
    // Snapshot of the lifecycle state; only mutated while the lifecycle
    // mutex is held, never locked across an await.
    state: std::sync::Mutex<DetectorState>,
    lifecycle: tokio::sync::Mutex<Inner>,
}

impl ScanDetector {
    /// Build a detector and the notification stream its caller consumes.
    /// Notifications are fire-and-forget: a dropped receiver is ignored.
    #[must_use]
    pub fn new(
        ports: PortSet,
        options: DetectorOptions,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Notification>) {
        let (notify, rx) = mpsc::unbounded_channel();
        let pool =
            ListenerPool::new(options.bind_addr).with_banner(options.banner.clone());
        let detector = Arc::new(Self {
            ports,
            options,
            notify,
            state: std::sync::Mutex::new(DetectorState::Stopped),
            lifecycle: tokio::sync::Mutex::new(Inner {
                pool,
                aggregator: None,
            }),
        });
        (detector, rx)
    }

    /// Bind all configured ports and begin monitoring.
    ///
    /// An empty port set is a degenerate success: the detector reports
    /// `Running` while monitoring nothing. On a bind failure nothing stays
    /// bound, the state remains `Stopped`, exactly one `error` notification
    /// is emitted, and the `Bind` error is returned.
    #[instrument(skip(self))]
    pub async fn start(&self) -> PrahariResult<()> {
        let mut inner = self.lifecycle.lock().await;
        if self.state() != DetectorState::Stopped {
            return Err(PrahariError::AlreadyStarted);
        }
        self.set_state(DetectorState::Starting);

        let (sink, hits) = ChannelSink::new();
        if let Err(err) = inner.pool.start(&self.ports, Arc::new(sink)).await {
            self.set_state(DetectorState::Stopped);
            self.emit(Notification::Error {
                message: err.to_string(),
            });
            return Err(err);
        }

        let tracker = HitTracker::new(self.options.port_hit_threshold, self.options.window);
        inner.aggregator = Some(tokio::spawn(aggregate(
            tracker,
            hits,
            self.notify.clone(),
            self.options.window,
        )));

        self.set_state(DetectorState::Running);
        self.emit(Notification::Started);
        info!(
            ports = self.ports.len(),
            threshold = self.options.port_hit_threshold,
            window_secs = self.options.window.as_secs(),
            "detector running"
        );
        Ok(())
    }

    /// Tear down the listeners and drop all aggregation state.
    ///
    /// Calling `stop` when already stopped is a no-op: `Ok(())`, and no
    /// duplicate `stopped` notification.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> PrahariResult<()> {
        let mut inner = self.lifecycle.lock().await;
        if self.state() == DetectorState::Stopped {
            debug!("stop on a stopped detector is a no-op");
            return Ok(());
        }
        self.set_state(DetectorState::Stopping);

        inner.pool.stop().await;
        if let Some(task) = inner.aggregator.take() {
            // tracker state is owned by the task and dropped with it
            task.abort();
        }

        self.set_state(DetectorState::Stopped);
        self.emit(Notification::Stopped);
        info!("detector stopped");
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> DetectorState {
        *self.state.lock().unwrap()
    }

    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state() == DetectorState::Running
    }

    /// Ports this detector was configured with.
    #[inline]
    #[must_use]
    pub fn ports(&self) -> &PortSet {
        &self.ports
    }

    fn set_state(&self, state: DetectorState) {
        *self.state.lock().unwrap() = state;
    }

    fn emit(&self, notification: Notification) {
        let _ = self.notify.send(notification);
    }
}

/// Single consumer of the hit stream: funnels every hit into the tracker
/// (which needs no locking as a result), forwards fired events, and sweeps
/// idle hosts on a timer. Exits when the listeners are gone or the task is
/// aborted by `stop`.
async fn aggregate(
    mut tracker: HitTracker,
    mut hits: mpsc::UnboundedReceiver<Hit>,
    notify: mpsc::UnboundedSender<Notification>,
    window: Duration,
) {
    let mut sweep = tokio::time::interval(window.max(MIN_SWEEP_PERIOD));
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe_hit = hits.recv() => match maybe_hit {
                Some(hit) => {
                    if let Some(event) = tracker.observe(&hit) {
                        info!(source = %event.source, ports = ?event.ports, "scan detected");
                        let _ = notify.send(Notification::ScanDetected { event });
                    }
                }
                None => break,
            },
            _ = sweep.tick() => tracker.sweep(Instant::now()),
        }
    }
}
