use std::collections::VecDeque;

/// Sliding window of recent average-speed readings.
pub const HISTORY_CAP: usize = 50;
/// Oscillation statistics are meaningless on a handful of points; hold off
/// until this many samples have accumulated.
pub const MIN_SAMPLES: usize = 10;

/// How far the sampled speed has swung from its recent mean, as a percentage
/// of that mean and of the current reference speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Oscillation {
    pub pct_dev_mean: f64,
    pub pct_dev_ref: f64,
}

#[derive(Debug, Clone, Default)]
pub struct SpeedHistory {
    speeds: VecDeque<u16>,
}

impl SpeedHistory {
    pub fn new() -> Self {
        Self {
            speeds: VecDeque::with_capacity(HISTORY_CAP),
        }
    }

    /// Append a reading, evicting the oldest once the window is full.
    pub fn push(&mut self, average_speed: u16) {
        if self.speeds.len() == HISTORY_CAP {
            self.speeds.pop_front();
        }
        self.speeds.push_back(average_speed);
    }

    /// `None` until MIN_SAMPLES readings exist. `reference_speed` comes from
    /// the current telemetry frame, not the window.
    pub fn oscillation(&self, reference_speed: u16) -> Option<Oscillation> {
        if self.speeds.len() < MIN_SAMPLES {
            return None;
        }
        let mean =
            self.speeds.iter().map(|&s| f64::from(s)).sum::<f64>() / self.speeds.len() as f64;
        let max_dev = self
            .speeds
            .iter()
            .map(|&s| (f64::from(s) - mean).abs())
            .fold(0.0, f64::max);
        let pct_dev_mean = if mean > 0.0 { max_dev / mean * 100.0 } else { 0.0 };
        let pct_dev_ref = if reference_speed > 0 {
            max_dev / f64::from(reference_speed) * 100.0
        } else {
            0.0
        };
        Some(Oscillation {
            pct_dev_mean,
            pct_dev_ref,
        })
    }
}
