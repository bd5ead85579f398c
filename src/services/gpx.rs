// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity + stream → GPX 1.1 document.
//!
//! Pure conversion: no disk or network access. One track, one segment, one
//! trackpoint per stream position. Elevation and time are only written for
//! points whose channel has a value.

use crate::error::{ExportError, Result};
use crate::models::{Activity, Stream};
use crate::time_utils::{offset_by_seconds, to_offset_datetime};
use gpx::{Gpx, GpxVersion, Metadata, Track, TrackSegment, Waypoint};

const CREATOR: &str = concat!("gpxbridge ", env!("CARGO_PKG_VERSION"));

/// Render a GPX document for one activity.
pub fn to_gpx(activity: &Activity, stream: &Stream) -> Result<Vec<u8>> {
    let name = xml_safe(&activity.name);
    let start = to_offset_datetime(activity.start_date);

    let mut segment = TrackSegment::new();
    segment.points = stream
        .positions()
        .iter()
        .enumerate()
        .map(|(i, position)| {
            let mut point = Waypoint::new(geo::Point::new(position.longitude, position.latitude));
            point.elevation = stream.altitude_at(i);
            point.time = start
                .zip(stream.time_at(i))
                .and_then(|(start, offset)| offset_by_seconds(start, offset))
                .map(Into::into);
            point
        })
        .collect();

    let mut track = Track::new();
    track.name = Some(name.clone());
    track.type_ = Some(xml_safe(&activity.activity_type));
    track.segments.push(segment);

    let mut metadata = Metadata::default();
    metadata.name = Some(name);
    metadata.description = Some(activity.url());
    metadata.time = start.map(Into::into);

    let mut document = Gpx::default();
    document.version = GpxVersion::Gpx11;
    document.creator = Some(CREATOR.to_string());
    document.metadata = Some(metadata);
    document.tracks.push(track);

    let mut bytes = Vec::new();
    gpx::write(&document, &mut bytes).map_err(|e| {
        ExportError::Data(format!("Failed to render GPX for activity {}: {}", activity.id, e))
    })?;

    tracing::debug!(
        activity_id = activity.id,
        points = stream.len(),
        bytes = bytes.len(),
        "Rendered GPX"
    );
    Ok(bytes)
}

/// Drop characters XML 1.0 cannot carry. Markup escaping is the writer's job.
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|c| match c {
            '\t' | '\n' | '\r' => true,
            '\u{FFFE}' | '\u{FFFF}' => false,
            c => !c.is_control(),
        })
        .collect()
}
