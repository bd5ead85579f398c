// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! GPS stream model: one activity's path as index-aligned channels.

use serde_json::Value;

/// Plausible elevation range in meters; anything outside is sensor noise.
const ELEVATION_RANGE_M: std::ops::RangeInclusive<f64> = -1000.0..=10000.0;

/// A validated latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    /// Build a position, rejecting non-finite or out-of-range coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        valid.then_some(Self {
            latitude,
            longitude,
        })
    }
}

/// Position, altitude and elapsed-time channels for one activity.
///
/// `altitude` and `time` are aligned with `positions` by index. Either may be
/// shorter than `positions`; missing entries mean "no value at that point".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stream {
    positions: Vec<Position>,
    altitude: Vec<Option<f64>>,
    time: Vec<Option<f64>>,
}

impl Stream {
    /// A stream with no GPS data (e.g. a manually logged activity).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a stream from already-valid channels.
    ///
    /// Auxiliary channels longer than `positions` are truncated.
    pub fn new(positions: Vec<Position>, altitude: Vec<f64>, time: Vec<f64>) -> Self {
        let n = positions.len();
        Self {
            positions,
            altitude: altitude.into_iter().take(n).map(Some).collect(),
            time: time.into_iter().take(n).map(Some).collect(),
        }
    }

    /// Validate raw `latlng`, `altitude` and `time` channel data.
    ///
    /// Position entries that are not a pair of in-range numbers are dropped
    /// along with the auxiliary values at the same index. Non-numeric or
    /// implausible auxiliary values become gaps instead of errors.
    pub fn from_channels(latlng: &[Value], altitude: &[Value], time: &[Value]) -> Self {
        let mut stream = Self::default();

        for (i, raw) in latlng.iter().enumerate() {
            let Some(position) = parse_position(raw) else {
                tracing::debug!(index = i, value = %raw, "Skipping invalid position");
                continue;
            };
            stream.positions.push(position);

            if i < altitude.len() {
                let elevation = altitude[i]
                    .as_f64()
                    .filter(|e| ELEVATION_RANGE_M.contains(e));
                stream.altitude.push(elevation);
            }
            if i < time.len() {
                let offset = time[i].as_f64().filter(|t| t.is_finite() && *t >= 0.0);
                stream.time.push(offset);
            }
        }

        stream
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Number of track points.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Elevation in meters at point `index`, if recorded.
    pub fn altitude_at(&self, index: usize) -> Option<f64> {
        self.altitude.get(index).copied().flatten()
    }

    /// Seconds since activity start at point `index`, if recorded.
    pub fn time_at(&self, index: usize) -> Option<f64> {
        self.time.get(index).copied().flatten()
    }
}

fn parse_position(raw: &Value) -> Option<Position> {
    let pair = raw.as_array()?;
    if pair.len() < 2 {
        return None;
    }
    Position::new(pair[0].as_f64()?, pair[1].as_f64()?)
}
