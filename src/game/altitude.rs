use crate::game::checkpoint::{
    Checkpoint, NextCheckpoint, PEAK_NAME, SegmentBoundary, Waypoint, dedup_key,
};
use log::{debug, info};
use std::collections::BTreeMap;
use thiserror::Error;

/// Display units covered by the full base..peak climb.
pub const DISPLAY_SPAN: f64 = 1920.0;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("no waypoints could be aggregated ({minor} minor, {major} major offered)")]
    NoWaypoints { minor: usize, major: usize },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AxisBounds {
    pub base_z: f64,
    pub peak_z: f64,
    pub display_units_per_unit: f64,
}

impl AxisBounds {
    pub fn new(base_z: f64, peak_z: f64, display_span: f64) -> Self {
        let total = peak_z - base_z;
        let display_units_per_unit = if total > 0.0 {
            display_span / total
        } else {
            1.0
        };
        Self {
            base_z,
            peak_z,
            display_units_per_unit,
        }
    }

    #[inline(always)]
    pub fn is_degenerate(&self) -> bool {
        self.peak_z <= self.base_z
    }

    /// Maps a world Z onto 0..1 between base and peak. Degenerate bounds map
    /// everything to 0.
    #[inline(always)]
    pub fn normalize(&self, z: f64) -> f32 {
        if self.is_degenerate() {
            return 0.0;
        }
        ((z - self.base_z) / (self.peak_z - self.base_z)).clamp(0.0, 1.0) as f32
    }

    #[inline(always)]
    pub fn to_display_units(&self, z: f64) -> f32 {
        ((z - self.base_z) * self.display_units_per_unit).max(0.0) as f32
    }
}

/// The climb axis: merged checkpoints sorted bottom to top plus the bounds
/// derived from them. Rebuilt from scratch for every new session.
#[derive(Clone, Debug)]
pub struct AltitudeAxis {
    bounds: AxisBounds,
    checkpoints: Vec<Checkpoint>,
}

impl AltitudeAxis {
    pub fn aggregate(
        minor: &[Waypoint],
        major: &[SegmentBoundary],
        local_z: Option<f64>,
    ) -> Result<Self, AggregationError> {
        Self::aggregate_with_span(minor, major, local_z, DISPLAY_SPAN)
    }

    /// Merges minor checkpoints and segment boundaries into one axis.
    ///
    /// Entries are keyed by their one-decimal quantized Z. Minor checkpoints
    /// go in first, so on a collision the minor entry is kept and the later
    /// one is dropped. Entries with a non-finite Z are skipped.
    pub fn aggregate_with_span(
        minor: &[Waypoint],
        major: &[SegmentBoundary],
        local_z: Option<f64>,
        display_span: f64,
    ) -> Result<Self, AggregationError> {
        info!("Aggregating {} minor checkpoints...", minor.len());
        // BTreeMap order by quantized key is also ascending raw Z order.
        let mut merged: BTreeMap<i64, (String, f64, bool)> = BTreeMap::new();
        for wp in minor {
            if !wp.world_z.is_finite() {
                debug!("Skipping minor checkpoint '{}' with invalid Z", wp.name);
                continue;
            }
            merged
                .entry(dedup_key(wp.world_z))
                .or_insert_with(|| (wp.name.clone(), wp.world_z, wp.reached));
        }

        info!("Aggregating {} major segments...", major.len());
        for seg in major {
            if !seg.world_z.is_finite() {
                debug!("Skipping segment '{}' with invalid Z", seg.name);
                continue;
            }
            merged.entry(dedup_key(seg.world_z)).or_insert_with(|| {
                (seg.name.clone(), seg.world_z, seg.is_reached_by(local_z))
            });
        }

        if merged.is_empty() {
            return Err(AggregationError::NoWaypoints {
                minor: minor.len(),
                major: major.len(),
            });
        }

        let (mut base_z, mut peak_z) = (f64::INFINITY, f64::NEG_INFINITY);
        for (_, z, _) in merged.values() {
            base_z = base_z.min(*z);
            peak_z = peak_z.max(*z);
        }
        let bounds = AxisBounds::new(base_z, peak_z, display_span);

        let checkpoints: Vec<Checkpoint> = merged
            .into_values()
            .map(|(name, raw_z, reached)| Checkpoint {
                name,
                raw_z,
                reached,
                normalized_height: bounds.normalize(raw_z),
                display_height: bounds.to_display_units(raw_z),
            })
            .collect();

        info!(
            "Height bounds finalized: Base={:.2}, Peak={:.2}, UnitsPerZ={:.2}",
            bounds.base_z, bounds.peak_z, bounds.display_units_per_unit
        );
        info!(
            "Aggregation complete. Total unique checkpoints: {}",
            checkpoints.len()
        );
        Ok(Self {
            bounds,
            checkpoints,
        })
    }

    #[inline(always)]
    pub const fn bounds(&self) -> &AxisBounds {
        &self.bounds
    }

    #[inline(always)]
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    #[inline(always)]
    pub fn normalize(&self, z: f64) -> f32 {
        self.bounds.normalize(z)
    }

    #[inline(always)]
    pub fn to_display_units(&self, z: f64) -> f32 {
        self.bounds.to_display_units(z)
    }

    /// First unreached checkpoint above `current_z`. Falls back to the peak
    /// while the agent is still below it; `None` once nothing is left.
    pub fn next_unreached_checkpoint(&self, current_z: f64) -> Option<NextCheckpoint> {
        let scale = self.bounds.display_units_per_unit;
        if let Some(cp) = self
            .checkpoints
            .iter()
            .find(|cp| !cp.reached && cp.raw_z > current_z)
        {
            return Some(NextCheckpoint {
                name: cp.name.clone(),
                display_distance: ((cp.raw_z - current_z) * scale) as f32,
                normalized_height: cp.normalized_height,
            });
        }

        if current_z < self.bounds.peak_z {
            return Some(NextCheckpoint {
                name: PEAK_NAME.to_string(),
                display_distance: ((self.bounds.peak_z - current_z) * scale) as f32,
                normalized_height: 1.0,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lake_axis() -> AltitudeAxis {
        AltitudeAxis::aggregate(
            &[Waypoint::new("Lake", 100.0, false)],
            &[SegmentBoundary::new("Segment1", 500.0)],
            None,
        )
        .expect("two distinct waypoints should aggregate")
    }

    #[test]
    fn lake_to_segment_scenario() {
        let axis = lake_axis();
        let b = axis.bounds();
        assert_eq!(b.base_z, 100.0);
        assert_eq!(b.peak_z, 500.0);
        assert!((b.display_units_per_unit - 4.8).abs() < 1e-12);
        assert!((axis.normalize(300.0) - 0.5).abs() < 1e-6);
        assert!((axis.to_display_units(300.0) - 960.0).abs() < 1e-3);

        let cps = axis.checkpoints();
        assert_eq!(cps.len(), 2);
        assert_eq!(cps[0].name, "Lake");
        assert_eq!(cps[0].normalized_height, 0.0);
        assert_eq!(cps[1].name, "Segment1");
        assert_eq!(cps[1].normalized_height, 1.0);
        assert!((cps[1].display_height - 1920.0).abs() < 1e-3);
    }

    #[test]
    fn colliding_keys_keep_first_inserted_minor_entry() {
        let axis = AltitudeAxis::aggregate(
            &[
                Waypoint::new("Camp", 200.02, true),
                Waypoint::new("CampDuplicate", 199.98, false),
                Waypoint::new("Base", 0.0, false),
            ],
            &[SegmentBoundary::new("Shore", 200.0)],
            None,
        )
        .unwrap();
        let names: Vec<&str> = axis.checkpoints().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Base", "Camp"]);
        assert!(axis.checkpoints()[1].reached);
        assert_eq!(axis.checkpoints()[1].raw_z, 200.02);
    }

    #[test]
    fn checkpoints_come_out_sorted_by_raw_z() {
        let axis = AltitudeAxis::aggregate(
            &[
                Waypoint::new("C", 300.0, false),
                Waypoint::new("A", -50.0, false),
            ],
            &[
                SegmentBoundary::new("D", 900.0),
                SegmentBoundary::new("B", 10.0),
            ],
            None,
        )
        .unwrap();
        let zs: Vec<f64> = axis.checkpoints().iter().map(|c| c.raw_z).collect();
        assert_eq!(zs, vec![-50.0, 10.0, 300.0, 900.0]);
    }

    #[test]
    fn empty_and_invalid_inputs_fail_aggregation() {
        let err = AltitudeAxis::aggregate(&[], &[], None).unwrap_err();
        assert_eq!(err, AggregationError::NoWaypoints { minor: 0, major: 0 });

        let err = AltitudeAxis::aggregate(
            &[Waypoint::new("Broken", f64::NAN, false)],
            &[SegmentBoundary::new("Lost", f64::INFINITY)],
            None,
        )
        .unwrap_err();
        assert_eq!(err, AggregationError::NoWaypoints { minor: 1, major: 1 });
    }

    #[test]
    fn segment_reached_flag_follows_local_agent() {
        let axis = AltitudeAxis::aggregate(
            &[Waypoint::new("Start", 0.0, true)],
            &[
                SegmentBoundary::new("Beach", 100.0),
                SegmentBoundary::new("Alpine", 400.0),
            ],
            Some(150.0),
        )
        .unwrap();
        let reached: Vec<bool> = axis.checkpoints().iter().map(|c| c.reached).collect();
        assert_eq!(reached, vec![true, true, false]);
    }

    #[test]
    fn normalize_is_bounded_and_monotonic() {
        let axis = lake_axis();
        let mut prev = -1.0_f32;
        for step in 0..=400 {
            let z = 100.0 + f64::from(step);
            let n = axis.normalize(z);
            assert!((0.0..=1.0).contains(&n), "normalize({z}) = {n} out of range");
            assert!(n >= prev, "normalize decreased at z={z}: {prev} -> {n}");
            prev = n;
        }
        assert_eq!(axis.normalize(-1000.0), 0.0);
        assert_eq!(axis.normalize(1e9), 1.0);
        assert_eq!(axis.to_display_units(0.0), 0.0);
    }

    #[test]
    fn degenerate_bounds_clamp_to_zero() {
        let axis =
            AltitudeAxis::aggregate(&[Waypoint::new("Only", 42.0, false)], &[], None).unwrap();
        assert!(axis.bounds().is_degenerate());
        assert_eq!(axis.bounds().display_units_per_unit, 1.0);
        for z in [-100.0, 0.0, 42.0, 1e6] {
            assert_eq!(axis.normalize(z), 0.0);
            assert!(axis.to_display_units(z) >= 0.0);
        }

        let inverted = AxisBounds::new(10.0, 5.0, DISPLAY_SPAN);
        assert_eq!(inverted.normalize(7.0), 0.0);
        assert!(inverted.to_display_units(-3.0) >= 0.0);
    }

    #[test]
    fn next_checkpoint_skips_reached_and_lower_entries() {
        let axis = AltitudeAxis::aggregate(
            &[
                Waypoint::new("Base", 0.0, true),
                Waypoint::new("Ledge", 100.0, true),
                Waypoint::new("Cave", 200.0, false),
            ],
            &[SegmentBoundary::new("Summit", 400.0)],
            None,
        )
        .unwrap();

        let next = axis.next_unreached_checkpoint(50.0).unwrap();
        assert_eq!(next.name, "Cave");
        assert!((next.display_distance - 150.0 * 4.8).abs() < 1e-3);
        assert!((next.normalized_height - 0.5).abs() < 1e-6);

        let next = axis.next_unreached_checkpoint(250.0).unwrap();
        assert_eq!(next.name, "Summit");
        assert_eq!(next.normalized_height, 1.0);
    }

    #[test]
    fn next_checkpoint_synthesizes_peak_then_runs_out() {
        let axis = AltitudeAxis::aggregate(
            &[
                Waypoint::new("Base", 0.0, true),
                Waypoint::new("Top", 100.0, true),
            ],
            &[],
            None,
        )
        .unwrap();

        let next = axis.next_unreached_checkpoint(75.0).unwrap();
        assert_eq!(next.name, PEAK_NAME);
        assert_eq!(next.normalized_height, 1.0);
        assert!((next.display_distance - 25.0 * 19.2).abs() < 1e-3);

        assert!(axis.next_unreached_checkpoint(100.0).is_none());
        assert!(axis.next_unreached_checkpoint(150.0).is_none());
    }
}
