//! Path downsampling.
//!
//! A recorded flight can contain far more position records than a
//! vehicle accepts as mission items. The sampler reduces the record
//! sequence to a bounded waypoint list by uniform index-stride
//! decimation, which keeps the temporal ordering and overall shape of
//! the path without interpolating new points.

use crate::geo::GlobalPosition;
use crate::sample::PositionSample;

/// Reduce a recorded path to at most `max_count` waypoints.
///
/// With `n` input records and `n > max_count`, records are kept at a
/// uniform stride of `ceil(n / max_count)` starting from index 0, which
/// guarantees at most `max_count` outputs and always keeps the first
/// record. Shorter inputs are converted verbatim. No range validation is
/// applied to the coordinates.
pub fn sample_path(records: &[PositionSample], max_count: usize) -> Vec<GlobalPosition> {
    if max_count == 0 {
        return Vec::new();
    }
    let n = records.len();
    if n <= max_count {
        return records.iter().map(PositionSample::position).collect();
    }
    let stride = n.div_ceil(max_count);
    records
        .iter()
        .step_by(stride)
        .map(PositionSample::position)
        .collect()
}
