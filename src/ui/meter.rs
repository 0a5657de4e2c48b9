//! Scrolling level history shown as a sparkline.

use std::time::{Duration, Instant};

/// Minimum spacing between two history samples.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(50);

/// Fixed-width buffer of recent meter levels (0-100), oldest first.
#[derive(Debug, Clone)]
pub struct LevelHistory {
    levels: Vec<u64>,
    width: usize,
    last_sample: Option<Instant>,
}

impl LevelHistory {
    pub fn new(width: usize) -> Self {
        Self {
            levels: vec![0; width],
            width,
            last_sample: None,
        }
    }

    pub fn levels(&self) -> &[u64] {
        &self.levels
    }

    /// Appends a level, at most once per [`SAMPLE_INTERVAL`].
    ///
    /// Returns whether the sample was taken.
    pub fn record(&mut self, level: f32, now: Instant) -> bool {
        if self
            .last_sample
            .is_some_and(|last| now.duration_since(last) < SAMPLE_INTERVAL)
        {
            return false;
        }
        self.last_sample = Some(now);
        self.levels.push(level.clamp(0.0, 100.0).round() as u64);
        if self.levels.len() > self.width {
            let excess = self.levels.len() - self.width;
            self.levels.drain(..excess);
        }
        true
    }

    /// Matches the buffer to a new terminal width, keeping the newest levels.
    pub fn resize(&mut self, width: usize) {
        if self.levels.len() > width {
            let excess = self.levels.len() - width;
            self.levels.drain(..excess);
        } else if self.levels.len() < width {
            let missing = width - self.levels.len();
            self.levels.splice(0..0, std::iter::repeat(0).take(missing));
        }
        self.width = width;
    }

    pub fn clear(&mut self) {
        self.levels.iter_mut().for_each(|level| *level = 0);
        self.last_sample = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_scrolls_and_throttles() {
        let start = Instant::now();
        let mut history = LevelHistory::new(3);
        assert!(history.record(10.0, start));
        assert!(!history.record(99.0, start + Duration::from_millis(10)));
        assert!(history.record(20.4, start + SAMPLE_INTERVAL));
        assert!(history.record(150.0, start + SAMPLE_INTERVAL * 2));
        assert_eq!(history.levels(), &[10, 20, 100]);
    }

    #[test]
    fn test_resize_pads_and_trims_from_the_left() {
        let start = Instant::now();
        let mut history = LevelHistory::new(2);
        history.record(5.0, start);
        history.record(7.0, start + SAMPLE_INTERVAL);
        history.resize(4);
        assert_eq!(history.levels(), &[0, 0, 5, 7]);
        history.resize(1);
        assert_eq!(history.levels(), &[7]);
    }

    #[test]
    fn test_clear_keeps_width() {
        let mut history = LevelHistory::new(3);
        history.record(50.0, Instant::now());
        history.clear();
        assert_eq!(history.levels(), &[0, 0, 0]);
    }
}
