//! Synthetic progress animation for the analysis bar
//!
//! The original service gives no upload or processing progress, so the bar is
//! a timer-driven animation: 10 points every 200 ms, parked at 90 until the
//! request settles, then 100 for a short linger before clearing.

use std::time::{Duration, Instant};

const STEP_PERCENT: u64 = 10;
const STEP_INTERVAL: Duration = Duration::from_millis(200);
const CEILING_PERCENT: u64 = 90;
const LINGER: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct SyntheticProgress {
    started: Instant,
    finished: Option<Instant>,
}

impl SyntheticProgress {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            finished: None,
        }
    }

    /// Mark the request settled (success or failure). Idempotent.
    pub fn finish(&mut self) {
        if self.finished.is_none() {
            self.finished = Some(Instant::now());
        }
    }

    pub fn percent(&self) -> u8 {
        if self.finished.is_some() {
            100
        } else {
            percent_after(self.started.elapsed())
        }
    }

    /// True once the 100% bar has lingered long enough to disappear.
    pub fn should_clear(&self) -> bool {
        self.finished
            .map(|at| at.elapsed() >= LINGER)
            .unwrap_or(false)
    }
}

fn percent_after(elapsed: Duration) -> u8 {
    let steps = elapsed.as_millis() as u64 / STEP_INTERVAL.as_millis() as u64;
    (steps * STEP_PERCENT).min(CEILING_PERCENT) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_at_zero() {
        assert_eq!(percent_after(Duration::ZERO), 0);
        assert_eq!(percent_after(Duration::from_millis(199)), 0);
    }

    #[test]
    fn advances_in_ten_point_steps() {
        assert_eq!(percent_after(Duration::from_millis(200)), 10);
        assert_eq!(percent_after(Duration::from_millis(450)), 20);
        assert_eq!(percent_after(Duration::from_millis(1000)), 50);
    }

    #[test]
    fn parks_at_ninety_while_in_flight() {
        assert_eq!(percent_after(Duration::from_millis(1800)), 90);
        assert_eq!(percent_after(Duration::from_secs(60)), 90);
    }

    #[test]
    fn finish_jumps_to_hundred() {
        let mut progress = SyntheticProgress::start();
        assert!(progress.percent() <= 90);
        progress.finish();
        assert_eq!(progress.percent(), 100);
        // A second finish must not restart the linger window reference.
        let first = progress.finished;
        progress.finish();
        assert_eq!(progress.finished, first);
    }

    #[test]
    fn clears_only_after_linger() {
        let mut progress = SyntheticProgress::start();
        assert!(!progress.should_clear());
        progress.finish();
        assert!(!progress.should_clear());
        progress.finished = Some(Instant::now() - LINGER);
        assert!(progress.should_clear());
    }
}
