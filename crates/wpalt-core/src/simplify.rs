//! Douglas-Peucker reduction of leg elevation profiles.
//!
//! Works in the distance/elevation plane, both axes in meters, so the
//! tolerance bounds how far a dropped sample may sit from the simplified
//! polyline. Endpoints are always kept.

use crate::profile::{ProfilePoint, ProfileSimplifier};

#[derive(Debug, Clone, Copy, Default)]
pub struct DouglasPeucker;

impl ProfileSimplifier for DouglasPeucker {
    fn simplify(&self, profile: &[ProfilePoint], tolerance_m: f64) -> Vec<ProfilePoint> {
        simplify_indices(profile, tolerance_m)
            .into_iter()
            .map(|idx| profile[idx])
            .collect()
    }
}

/// Indices of retained points, in order.
pub fn simplify_indices(profile: &[ProfilePoint], tolerance_m: f64) -> Vec<usize> {
    let n = profile.len();
    if n < 3 {
        return (0..n).collect();
    }

    let tolerance = if tolerance_m.is_finite() { tolerance_m.max(0.0) } else { 0.0 };
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    // Explicit stack, no recursion.
    let mut stack = vec![(0usize, n - 1)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }
        let mut max_dist = -1.0;
        let mut max_idx = start;
        for idx in start + 1..end {
            let dist = perpendicular_distance(&profile[idx], &profile[start], &profile[end]);
            if dist > max_dist {
                max_dist = dist;
                max_idx = idx;
            }
        }
        if max_dist > tolerance {
            keep[max_idx] = true;
            stack.push((start, max_idx));
            stack.push((max_idx, end));
        }
    }

    keep.iter()
        .enumerate()
        .filter_map(|(idx, &k)| if k { Some(idx) } else { None })
        .collect()
}

fn perpendicular_distance(point: &ProfilePoint, start: &ProfilePoint, end: &ProfilePoint) -> f64 {
    let dx = end.distance_m - start.distance_m;
    let dy = end.elevation_m - start.elevation_m;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        let px = point.distance_m - start.distance_m;
        let py = point.elevation_m - start.elevation_m;
        return (px * px + py * py).sqrt();
    }
    let cross = dx * (point.elevation_m - start.elevation_m) - dy * (point.distance_m - start.distance_m);
    cross.abs() / len_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_with_peak(peak_at: usize, peak_m: f64) -> Vec<ProfilePoint> {
        (0..=20)
            .map(|i| {
                let elevation = if i == peak_at { peak_m } else { 0.0 };
                ProfilePoint::new(i as f64 * 30.0, elevation)
            })
            .collect()
    }

    #[test]
    fn keeps_endpoints_and_drops_flat_interior() {
        let profile = flat_with_peak(usize::MAX, 0.0);
        let simplified = DouglasPeucker.simplify(&profile, 50.0);
        assert_eq!(simplified.len(), 2);
        assert_eq!(simplified[0], profile[0]);
        assert_eq!(simplified[1], profile[20]);
    }

    #[test]
    fn keeps_peak_above_tolerance() {
        let profile = flat_with_peak(7, 300.0);
        let simplified = DouglasPeucker.simplify(&profile, 50.0);
        assert!(simplified.contains(&profile[7]));
        assert!(simplified.windows(2).all(|w| w[0].distance_m < w[1].distance_m));
    }

    #[test]
    fn drops_bump_within_tolerance() {
        let profile = flat_with_peak(7, 20.0);
        let simplified = DouglasPeucker.simplify(&profile, 50.0);
        assert!(!simplified.contains(&profile[7]));
    }

    #[test]
    fn short_profiles_are_returned_as_is() {
        let profile = vec![ProfilePoint::new(0.0, 5.0), ProfilePoint::new(10.0, 8.0)];
        assert_eq!(DouglasPeucker.simplify(&profile, 50.0), profile);
        assert!(DouglasPeucker.simplify(&[], 50.0).is_empty());
    }
}
