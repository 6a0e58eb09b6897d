use crate::config::SensorConfig;
use crate::ingest::SensorSample;
use std::collections::VecDeque;

/// A moving-average filter over the most recent raw readings of one sensor.
///
/// The channel keeps a FIFO window of at most `capacity` samples. Every
/// accepted sample is pushed to the back, the oldest sample is evicted once
/// the window overflows, and the smoothed value becomes the rounded mean of
/// the window.
///
/// Rejected samples (non-finite values) leave both the window and the
/// smoothed value untouched.
#[derive(Debug, Clone)]
pub struct SensorChannel {
    /// Raw samples, oldest first.
    window: VecDeque<f32>,
    capacity: usize,
    /// Value reported before any sample arrives, and after [`Self::clear`].
    initial: f32,
    smoothed: f32,
}

impl SensorChannel {
    /// Creates an empty channel.
    ///
    /// ### Parameters
    /// - `capacity` - Window size; a value of `0` is treated as `1`.
    /// - `initial` - Smoothed value reported until the first sample.
    ///
    /// ### Returns
    /// A new [`SensorChannel`] with an empty window.
    pub fn new(capacity: usize, initial: f32) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity + 1),
            capacity,
            initial,
            smoothed: initial,
        }
    }

    /// Feeds one raw sample through the filter.
    ///
    /// ### Parameters
    /// - `raw` - The raw reading. `NaN` and infinities are rejected.
    ///
    /// ### Returns
    /// The smoothed value after this sample, or the previous smoothed value
    /// if the sample was rejected.
    pub fn ingest(&mut self, raw: f32) -> f32 {
        if !raw.is_finite() {
            return self.smoothed;
        }

        self.window.push_back(raw);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }

        let sum: f64 = self.window.iter().map(|&v| f64::from(v)).sum();
        let mean = sum / self.window.len() as f64;
        // Halves round toward +inf.
        self.smoothed = (mean + 0.5).floor() as f32;
        self.smoothed
    }

    /// Returns the current smoothed value.
    #[inline]
    pub fn value(&self) -> f32 {
        self.smoothed
    }

    /// Overrides the smoothed value without touching the window.
    ///
    /// The next accepted sample recomputes the value from the window.
    pub fn set_value(&mut self, value: f32) {
        if value.is_finite() {
            self.smoothed = value;
        }
    }

    /// Number of samples currently in the window.
    #[inline]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Empties the window and restores the initial value.
    pub fn clear(&mut self) {
        self.window.clear();
        self.smoothed = self.initial;
    }
}

/// Names the three physical readings carried on a sensor line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Moisture,
    Oxygen,
    HeartRate,
}

/// The independent smoothing channels fed from one sensor line.
#[derive(Debug, Clone)]
pub struct SensorBank {
    pub moisture: SensorChannel,
    pub oxygen: SensorChannel,
    pub heart_rate: SensorChannel,
}

impl SensorBank {
    pub fn new(cfg: &SensorConfig) -> Self {
        Self {
            moisture: SensorChannel::new(cfg.window, cfg.moisture_initial),
            oxygen: SensorChannel::new(cfg.window, cfg.oxygen_initial),
            heart_rate: SensorChannel::new(cfg.window, cfg.heart_rate_initial),
        }
    }

    pub fn channel(&self, which: Channel) -> &SensorChannel {
        match which {
            Channel::Moisture => &self.moisture,
            Channel::Oxygen => &self.oxygen,
            Channel::HeartRate => &self.heart_rate,
        }
    }

    /// Routes every present field of `sample` into its own channel.
    ///
    /// ### Returns
    /// The number of fields that were ingested.
    pub fn ingest_sample(&mut self, sample: &SensorSample) -> usize {
        let mut accepted = 0;
        for (value, channel) in [
            (sample.moisture, &mut self.moisture),
            (sample.oxygen, &mut self.oxygen),
            (sample.heart_rate, &mut self.heart_rate),
        ] {
            if let Some(v) = value {
                channel.ingest(v);
                accepted += 1;
            }
        }
        accepted
    }

    pub fn clear(&mut self) {
        self.moisture.clear();
        self.oxygen.clear();
        self.heart_rate.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_two_samples_average_to_midpoint() {
        let mut ch = SensorChannel::new(10, 600.0);
        assert_eq!(ch.ingest(100.0), 100.0);
        assert_eq!(ch.ingest(900.0), 500.0);
        assert_eq!(ch.len(), 2);
    }

    #[test]
    fn window_evicts_oldest_sample() {
        let mut ch = SensorChannel::new(3, 0.0);
        for v in [10.0, 20.0, 30.0] {
            ch.ingest(v);
        }
        // Window is now [20, 30, 60].
        assert_eq!(ch.ingest(60.0), 37.0);
        assert_eq!(ch.len(), 3);
    }

    #[test]
    fn output_matches_rounded_mean_of_last_window() {
        let inputs = [3.0, 7.0, 8.0, 1.0, 2.0, 9.0, 4.0, 4.0, 5.0, 6.0, 11.0, 0.5, 13.25];
        let mut ch = SensorChannel::new(4, 0.0);
        for (n, &v) in inputs.iter().enumerate() {
            let got = ch.ingest(v);
            let start = (n + 1).saturating_sub(4);
            let tail = &inputs[start..=n];
            let mean = tail.iter().map(|&x| f64::from(x)).sum::<f64>() / tail.len() as f64;
            assert_eq!(got, (mean + 0.5).floor() as f32);
        }
    }

    #[test]
    fn rejected_sample_keeps_previous_value() {
        let mut ch = SensorChannel::new(10, 600.0);
        assert_eq!(ch.ingest(f32::NAN), 600.0);
        assert!(ch.is_empty());

        ch.ingest(300.0);
        assert_eq!(ch.ingest(f32::INFINITY), 300.0);
        assert_eq!(ch.len(), 1);
    }

    #[test]
    fn halves_round_up() {
        let mut ch = SensorChannel::new(2, 0.0);
        ch.ingest(1.0);
        assert_eq!(ch.ingest(2.0), 2.0);

        let mut neg = SensorChannel::new(2, 0.0);
        neg.ingest(-2.0);
        assert_eq!(neg.ingest(-3.0), -2.0);
    }

    #[test]
    fn clear_restores_initial_value() {
        let mut ch = SensorChannel::new(5, 350.0);
        ch.ingest(10.0);
        ch.clear();
        assert!(ch.is_empty());
        assert_eq!(ch.value(), 350.0);
    }

    #[test]
    fn bank_routes_fields_independently() {
        let mut bank = SensorBank::new(&SensorConfig::default());
        let accepted = bank.ingest_sample(&SensorSample {
            moisture: None,
            oxygen: Some(100.0),
            heart_rate: Some(70.0),
        });
        assert_eq!(accepted, 2);
        assert_eq!(bank.channel(Channel::Moisture).value(), 600.0);
        assert_eq!(bank.channel(Channel::Oxygen).value(), 100.0);
        assert_eq!(bank.channel(Channel::HeartRate).value(), 70.0);
    }
}
