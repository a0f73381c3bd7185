// Standings order: wins first, points-for as the tiebreaker.

use std::cmp::Ordering;

use huddle_core::league::Team;

/// Compare two records for standings purposes. `Less` means `a` ranks ahead.
pub fn compare_records(a_wins: u32, a_points: f64, b_wins: u32, b_points: f64) -> Ordering {
    b_wins
        .cmp(&a_wins)
        .then_with(|| b_points.partial_cmp(&a_points).unwrap_or(Ordering::Equal))
}

/// Team indices in standings order. Fully tied teams keep their input order.
pub fn standings_order(teams: &[Team]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..teams.len()).collect();
    order.sort_by(|&a, &b| {
        compare_records(
            teams[a].wins,
            teams[a].points_for,
            teams[b].wins,
            teams[b].points_for,
        )
    });
    order
}

/// Re-rank `order` in place from parallel `wins`/`points` slices. The buffer
/// is reset to `0..n` first so ties resolve by index on every call.
pub fn rank_into(order: &mut Vec<usize>, wins: &[u32], points: &[f64]) {
    order.clear();
    order.extend(0..wins.len());
    order.sort_by(|&a, &b| compare_records(wins[a], points[a], wins[b], points[b]));
}
