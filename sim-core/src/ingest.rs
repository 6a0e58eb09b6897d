//! Boundary between the sensor transport and the simulation loop.
//!
//! A transport (serial reader, stdin thread, test harness) turns text lines
//! into [`SensorSample`]s and drops them into a [`SensorMailbox`]. The
//! simulation takes whatever sample is resident at the start of each tick.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

/// One parsed sensor line. Each field is independent: a field that failed
/// to parse is `None` and leaves its channel untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorSample {
    pub moisture: Option<f32>,
    pub oxygen: Option<f32>,
    pub heart_rate: Option<f32>,
}

impl SensorSample {
    /// `true` if the primary (moisture) field parsed.
    pub fn has_primary(&self) -> bool {
        self.moisture.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.moisture.is_none() && self.oxygen.is_none() && self.heart_rate.is_none()
    }
}

fn parse_field(field: Option<&str>) -> Option<f32> {
    field
        .and_then(|f| f.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
}

/// Parses a line of 1–3 numeric fields.
///
/// The separator is `,` if the line contains one, otherwise `;`, otherwise
/// runs of whitespace. Fields past the third are ignored.
///
/// ### Returns
/// `None` for an empty or whitespace-only line, otherwise a sample whose
/// fields are `Some` exactly where the text parsed as a finite number.
pub fn parse_sensor_line(line: &str) -> Option<SensorSample> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let fields: Vec<&str> = if line.contains(',') {
        line.split(',').collect()
    } else if line.contains(';') {
        line.split(';').collect()
    } else {
        line.split_whitespace().collect()
    };

    Some(SensorSample {
        moisture: parse_field(fields.first().copied()),
        oxygen: parse_field(fields.get(1).copied()),
        heart_rate: parse_field(fields.get(2).copied()),
    })
}

/// Single-slot, last-write-wins hand-off for the latest sensor sample.
///
/// Cloning the mailbox yields another handle to the same slot, so the
/// transport thread and the simulation loop can each own one.
#[derive(Clone, Debug, Default)]
pub struct SensorMailbox {
    slot: Arc<Mutex<Option<SensorSample>>>,
}

impl SensorMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<SensorSample>> {
        // The slot holds plain data, so a panic elsewhere cannot leave it torn.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrites whatever sample is resident.
    pub fn post(&self, sample: SensorSample) {
        *self.lock() = Some(sample);
    }

    /// Parses `line` and posts it if at least one field parsed.
    ///
    /// A line of pure noise does not displace a pending sample.
    ///
    /// ### Returns
    /// `true` if a sample was posted.
    pub fn post_line(&self, line: &str) -> bool {
        match parse_sensor_line(line) {
            Some(sample) if !sample.is_empty() => {
                self.post(sample);
                true
            }
            _ => false,
        }
    }

    /// Removes and returns the resident sample, if any.
    pub fn take(&self) -> Option<SensorSample> {
        self.lock().take()
    }

    pub fn has_pending(&self) -> bool {
        self.lock().is_some()
    }
}

/// Advisory connection state shown by a host UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkReport {
    AwaitingConnection,
    Connected,
    NoRecentData,
}

impl std::fmt::Display for LinkReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            LinkReport::AwaitingConnection => "awaiting connection",
            LinkReport::Connected => "connected",
            LinkReport::NoRecentData => "no recent data",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LinkStatus {
    connected: bool,
    last_update: Option<SystemTime>,
}

impl LinkStatus {
    /// Records a successful primary-field parse at `now`.
    pub fn record(&mut self, now: SystemTime) {
        self.connected = true;
        self.last_update = Some(now);
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn report(&self, now: SystemTime, stale_after: Duration) -> LinkReport {
        match self.last_update {
            None => LinkReport::AwaitingConnection,
            Some(last) => {
                let age = now.duration_since(last).unwrap_or(Duration::ZERO);
                if age < stale_after {
                    LinkReport::Connected
                } else {
                    LinkReport::NoRecentData
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::UNIX_EPOCH;

    #[test]
    fn parses_comma_semicolon_and_whitespace_lines() {
        let comma = parse_sensor_line("512, 340,72").unwrap();
        assert_eq!(comma.moisture, Some(512.0));
        assert_eq!(comma.oxygen, Some(340.0));
        assert_eq!(comma.heart_rate, Some(72.0));

        let semi = parse_sensor_line("400;310").unwrap();
        assert_eq!(semi.moisture, Some(400.0));
        assert_eq!(semi.oxygen, Some(310.0));
        assert_eq!(semi.heart_rate, None);

        let ws = parse_sensor_line("  300 \t 280   90 ").unwrap();
        assert_eq!(ws.moisture, Some(300.0));
        assert_eq!(ws.oxygen, Some(280.0));
        assert_eq!(ws.heart_rate, Some(90.0));
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert_eq!(parse_sensor_line(""), None);
        assert_eq!(parse_sensor_line("   \t \r\n"), None);
    }

    #[test]
    fn bad_fields_are_dropped_individually() {
        let s = parse_sensor_line("abc,320,NaN").unwrap();
        assert_eq!(s.moisture, None);
        assert_eq!(s.oxygen, Some(320.0));
        assert_eq!(s.heart_rate, None);
        assert!(!s.has_primary());

        let s = parse_sensor_line("450,,").unwrap();
        assert_eq!(s.moisture, Some(450.0));
        assert_eq!(s.oxygen, None);
    }

    #[test]
    fn numeric_prefix_is_not_a_number() {
        // Trailing garbage drops the whole field rather than keeping its prefix.
        let s = parse_sensor_line("512abc,300").unwrap();
        assert_eq!(s.moisture, None);
        assert_eq!(s.oxygen, Some(300.0));
        assert!(parse_sensor_line("12x").unwrap().is_empty());
    }

    #[test]
    fn extra_fields_are_ignored() {
        let s = parse_sensor_line("1 2 3 4 5").unwrap();
        assert_eq!(s.heart_rate, Some(3.0));
    }

    #[test]
    fn mailbox_keeps_only_latest_sample() {
        let mailbox = SensorMailbox::new();
        assert!(mailbox.post_line("100"));
        assert!(mailbox.post_line("200"));
        assert!(!mailbox.post_line("   "));
        assert!(!mailbox.post_line("noise;;"));
        assert!(mailbox.has_pending());
        assert_eq!(mailbox.take().unwrap().moisture, Some(200.0));
        assert_eq!(mailbox.take(), None);
    }

    #[test]
    fn mailbox_handles_share_a_slot_across_threads() {
        let mailbox = SensorMailbox::new();
        let writer = mailbox.clone();
        thread::spawn(move || {
            writer.post_line("640,300");
        })
        .join()
        .unwrap();
        assert_eq!(mailbox.take().unwrap().oxygen, Some(300.0));
    }

    #[test]
    fn link_report_tracks_staleness() {
        let t0 = UNIX_EPOCH + Duration::from_secs(1_000);
        let stale = Duration::from_secs(5);
        let mut link = LinkStatus::default();
        assert_eq!(link.report(t0, stale), LinkReport::AwaitingConnection);

        link.record(t0);
        assert!(link.is_connected());
        assert_eq!(link.report(t0 + Duration::from_secs(4), stale), LinkReport::Connected);
        assert_eq!(link.report(t0 + Duration::from_secs(6), stale), LinkReport::NoRecentData);
    }
}
