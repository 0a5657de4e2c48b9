//! Live level-meter scheduling.
//!
//! The meter never touches the engine or the view itself. It only posts
//! [`Input::Frame`] ticks stamped with the epoch that started it; the controller
//! samples the level on its own thread and drops frames from any other epoch.

use super::controller::Input;
use super::state::Epoch;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default delay between meter frames, roughly one display refresh.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Cancellable periodic task feeding meter frames to the controller.
pub struct LevelMeter {
    interval: Duration,
    task: Option<(Epoch, JoinHandle<()>)>,
}

impl LevelMeter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            task: None,
        }
    }

    /// Starts ticking for `epoch`, replacing any previous activation.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self, epoch: Epoch, inbox: UnboundedSender<Input>) {
        self.cancel();

        let interval = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if inbox.send(Input::Frame { epoch }).is_err() {
                    break;
                }
            }
        });

        tracing::trace!("Level meter started for epoch {}", epoch);
        self.task = Some((epoch, handle));
    }

    /// Stops the current activation, if any. Frames already queued are left
    /// for the controller's epoch check to discard.
    pub fn cancel(&mut self) {
        if let Some((epoch, handle)) = self.task.take() {
            handle.abort();
            tracing::trace!("Level meter cancelled for epoch {}", epoch);
        }
    }

    pub fn active_epoch(&self) -> Option<Epoch> {
        self.task.as_ref().map(|(epoch, _)| *epoch)
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}

impl Drop for LevelMeter {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test(start_paused = true)]
    async fn test_meter_ticks_with_its_epoch() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut meter = LevelMeter::new(Duration::from_millis(16));
        let epoch = Epoch::default().next();
        meter.start(epoch, tx);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let mut frames = 0;
        while let Ok(input) = rx.try_recv() {
            assert!(matches!(input, Input::Frame { epoch: e } if e == epoch));
            frames += 1;
        }
        assert!((2..=3).contains(&frames), "got {frames} frames");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut meter = LevelMeter::new(Duration::from_millis(16));
        meter.start(Epoch::default(), tx);
        tokio::time::sleep(Duration::from_millis(20)).await;
        meter.cancel();
        assert!(meter.active_epoch().is_none());

        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_replaces_previous_activation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut meter = LevelMeter::new(Duration::from_millis(16));
        let first = Epoch::default();
        let second = first.next();
        meter.start(first, tx.clone());
        meter.start(second, tx);

        tokio::time::sleep(Duration::from_millis(40)).await;
        while let Ok(input) = rx.try_recv() {
            assert!(matches!(input, Input::Frame { epoch } if epoch == second));
        }
        assert_eq!(meter.active_epoch(), Some(second));
    }
}
