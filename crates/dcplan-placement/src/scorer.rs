//! Layout scoring.
//!
//! A finished layout is rated by a weighted combination of:
//! - **Compactness**: used area over bounding-box area (1.0 = no gaps)
//! - **Connectivity**: coupled pairs score higher the closer their centers are
//!
//! The score is reported only; the placer never backtracks on it.

use dcplan_core::PlacementConfig;
use serde::Serialize;

use crate::connectivity::ConnectivityMatrix;
use crate::convert::PlacedModuleInstance;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PlacementScore {
    pub total: f64,
    pub compactness: f64,
    pub connectivity: f64,
    /// Cells covered by placed instances.
    pub used_area: u64,
    pub bbox_width: u32,
    pub bbox_height: u32,
    pub bbox_area: u64,
}

/// Manhattan distance between the centers of two instances.
pub fn center_distance(a: &PlacedModuleInstance, b: &PlacedModuleInstance) -> f64 {
    let (ax, ay) = a.center();
    let (bx, by) = b.center();
    (ax - bx).abs() + (ay - by).abs()
}

/// Smallest `(x0, y0, x1, y1)` box covering every rectangle, exclusive upper corner.
pub fn bounding_box(
    rects: impl IntoIterator<Item = (u32, u32, u32, u32)>,
) -> Option<(u32, u32, u32, u32)> {
    rects.into_iter().fold(None, |acc, (x, y, w, h)| {
        let (x1, y1) = (x + w, y + h);
        Some(match acc {
            None => (x, y, x1, y1),
            Some((ax0, ay0, ax1, ay1)) => (ax0.min(x), ay0.min(y), ax1.max(x1), ay1.max(y1)),
        })
    })
}

/// Score `placed` on a `grid_width × grid_height` site.
///
/// `connectivity` must be indexed like `placed`.
pub fn score_placement(
    placed: &[PlacedModuleInstance],
    connectivity: &ConnectivityMatrix,
    grid_width: u32,
    grid_height: u32,
    weights: &PlacementConfig,
) -> PlacementScore {
    let Some((x0, y0, x1, y1)) = bounding_box(placed.iter().map(|p| (p.x, p.y, p.width, p.height)))
    else {
        return PlacementScore::default();
    };

    let used_area: u64 = placed.iter().map(PlacedModuleInstance::area).sum();
    let (bbox_width, bbox_height) = (x1 - x0, y1 - y0);
    let bbox_area = u64::from(bbox_width) * u64::from(bbox_height);
    let compactness = if bbox_area == 0 {
        0.0
    } else {
        used_area as f64 / bbox_area as f64
    };

    let max_distance = f64::from(grid_width) + f64::from(grid_height);
    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    for (i, a) in placed.iter().enumerate() {
        for (j, b) in placed.iter().enumerate() {
            let weight = connectivity.get(i, j);
            if i == j || weight <= 0.0 {
                continue;
            }
            weighted += weight * (1.0 - center_distance(a, b) / max_distance);
            total_weight += weight;
        }
    }
    let connectivity_score = if total_weight > 0.0 {
        weighted / total_weight
    } else {
        0.0
    };

    PlacementScore {
        total: weights.compactness_weight * compactness
            + weights.connectivity_weight * connectivity_score,
        compactness,
        connectivity: connectivity_score,
        used_area,
        bbox_width,
        bbox_height,
        bbox_area,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::connectivity_matrix;
    use dcplan_core::ModuleDefinition;

    fn at(x: u32, y: u32, width: u32, height: u32) -> PlacedModuleInstance {
        PlacedModuleInstance {
            module_id: 1,
            name: "M".to_string(),
            instance_index: 0,
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn tight_layout_is_fully_compact() {
        let placed = [at(0, 0, 2, 2), at(2, 0, 2, 2)];
        let m = ModuleDefinition::from_pairs(1, "M", &[], &[]);
        let matrix = connectivity_matrix(&[&m, &m]);
        let score = score_placement(&placed, &matrix, 4, 4, &PlacementConfig::default());
        assert_eq!(score.bbox_area, 8);
        assert_eq!(score.compactness, 1.0);
        assert_eq!(score.connectivity, 0.0);
        assert!((score.total - 0.7).abs() < 1e-12);
    }

    #[test]
    fn gaps_lower_compactness() {
        let placed = [at(0, 0, 1, 1), at(3, 3, 1, 1)];
        let m = ModuleDefinition::from_pairs(1, "M", &[], &[]);
        let score = score_placement(
            &placed,
            &connectivity_matrix(&[&m, &m]),
            4,
            4,
            &PlacementConfig::default(),
        );
        assert_eq!(score.bbox_area, 16);
        assert_eq!(score.compactness, 2.0 / 16.0);
    }

    #[test]
    fn close_coupled_pairs_score_higher() {
        let source = ModuleDefinition::from_pairs(1, "Source", &[], &[("usable_power", 10.0)]);
        let sink = ModuleDefinition::from_pairs(2, "Sink", &[("usable_power", 10.0)], &[]);
        let matrix = connectivity_matrix(&[&source, &sink]);
        let config = PlacementConfig::default();

        let near = score_placement(&[at(0, 0, 1, 1), at(1, 0, 1, 1)], &matrix, 10, 10, &config);
        let far = score_placement(&[at(0, 0, 1, 1), at(9, 9, 1, 1)], &matrix, 10, 10, &config);
        assert!(near.connectivity > far.connectivity);
        assert!((near.connectivity - 0.95).abs() < 1e-12);
    }

    #[test]
    fn empty_layout_scores_zero() {
        let score = score_placement(&[], &connectivity_matrix(&[]), 5, 5, &PlacementConfig::default());
        assert_eq!(score, PlacementScore::default());
    }
}
