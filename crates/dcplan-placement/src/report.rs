//! Human-readable placement report.

use crate::placer::PlacementOutcome;

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

pub fn format_placement_report(outcome: &PlacementOutcome) -> String {
    let mut out = String::new();
    let grid = &outcome.grid;
    let total_cells = grid.area();
    let score = &outcome.score;

    out.push_str("=== Module Placement Report ===\n");
    out.push_str(&format!("Status: {:?} ({})\n", outcome.status, outcome.message));
    out.push_str(&format!("Total modules placed: {}\n", outcome.placed.len()));
    if outcome.fixed > 0 {
        out.push_str(&format!("Fixed modules: {}\n", outcome.fixed));
    }
    out.push_str(&format!("Grid: {} x {}\n\n", grid.width(), grid.height()));

    out.push_str("Area utilization:\n");
    out.push_str(&format!(
        "  Theoretical: {:.2}% ({} of {} cells)\n",
        percent(score.used_area, total_cells),
        score.used_area,
        total_cells
    ));
    out.push_str(&format!(
        "  Actual:      {:.2}% of the bounding box\n",
        percent(score.used_area, score.bbox_area)
    ));
    out.push_str(&format!(
        "  Used dimensions: {} x {}\n",
        score.bbox_width, score.bbox_height
    ));
    out.push_str(&format!(
        "Placement score: {:.4} (compactness {:.4}, connectivity {:.4})\n",
        score.total, score.compactness, score.connectivity
    ));

    let locked = grid.locked_cells() as u64;
    out.push_str(&format!(
        "Locked area: {locked} cells ({:.2}% of total)\n",
        percent(locked, total_cells)
    ));

    let mut positions: Vec<_> = outcome.placed.iter().enumerate().collect();
    positions.sort_by_key(|(_, p)| (p.module_id, p.instance_index));
    out.push_str("\nModule positions:\n");
    for (i, p) in positions {
        let pinned = if i < outcome.fixed { " [fixed]" } else { "" };
        out.push_str(&format!(
            "  {} #{} (id {}): ({}, {}) size {}x{}{pinned}\n",
            p.name, p.instance_index, p.module_id, p.x, p.y, p.width, p.height
        ));
    }

    if !outcome.rejected_fixed.is_empty() {
        out.push_str(&format!(
            "\nRejected fixed positions ({}):\n",
            outcome.rejected_fixed.len()
        ));
        for r in &outcome.rejected_fixed {
            out.push_str(&format!(
                "  module {} at ({}, {}): {}\n",
                r.position.module_id, r.position.x, r.position.y, r.reason
            ));
        }
    }

    if !outcome.unplaced.is_empty() {
        out.push_str(&format!("\nUnplaced instances ({}):\n", outcome.unplaced.len()));
        for u in &outcome.unplaced {
            out.push_str(&format!(
                "  {} #{} (id {}): {}\n",
                u.name, u.instance_index, u.module_id, u.reason
            ));
        }
    }

    out
}
