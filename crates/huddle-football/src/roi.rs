// Draft vs. waiver return on investment.
//
// Starter production is split by how each player was acquired. Drafted
// players feed per-player draft records; everything else (waiver adds and
// trades) counts as waiver production. The "Prescient One" is the team that
// got the most out of the wire while staying near the top of the standings.

use std::collections::HashMap;

use huddle_core::league::{LeagueSnapshot, PlayerId, TeamId};
use serde::Serialize;

use crate::standings::standings_order;

/// Share of the league (by standings) counted as safely in contention.
pub const SAFE_CUTOFF_FRACTION: f64 = 0.75;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRoi {
    pub team_id: TeamId,
    pub team_name: String,
    pub draft_points: f64,
    pub waiver_points: f64,
    /// 1-based standings position.
    pub standing: usize,
    pub in_safe_zone: bool,
}

/// Season production of one drafted player.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftRecord {
    pub player_id: PlayerId,
    pub player_name: String,
    pub team_id: TeamId,
    pub team_name: String,
    pub position: String,
    pub points: f64,
    pub round: Option<u32>,
    pub pick_overall: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoiReport {
    /// Teams in standings order.
    pub teams: Vec<TeamRoi>,
    pub safe_cutoff: usize,
    pub prescient_one: Option<TeamRoi>,
    /// Highest-scoring draft picks first.
    pub draft_records: Vec<DraftRecord>,
}

/// Number of teams inside the safe zone: `floor(0.75 * n)`, at least one
/// when the league has any teams.
pub fn safe_cutoff(team_count: usize) -> usize {
    if team_count == 0 {
        return 0;
    }
    ((team_count as f64 * SAFE_CUTOFF_FRACTION).floor() as usize).max(1)
}

/// Waiver leader among safe teams, first maximum wins. The overall leader is
/// only consulted when the safe zone is empty.
fn pick_prescient(teams: &[TeamRoi]) -> Option<TeamRoi> {
    let leader = |candidates: &mut dyn Iterator<Item = &TeamRoi>| {
        let mut best: Option<&TeamRoi> = None;
        for t in candidates {
            if best.map_or(true, |b| t.waiver_points > b.waiver_points) {
                best = Some(t);
            }
        }
        best.cloned()
    };

    leader(&mut teams.iter().filter(|t| t.in_safe_zone)).or_else(|| leader(&mut teams.iter()))
}

/// Attribute every starter's points to draft or waiver production.
pub fn analyze_roi(snapshot: &LeagueSnapshot) -> RoiReport {
    let n = snapshot.teams.len();
    let mut draft_points = vec![0.0; n];
    let mut waiver_points = vec![0.0; n];

    let mut records: Vec<DraftRecord> = Vec::new();
    let mut record_index: HashMap<PlayerId, usize> = HashMap::new();

    for week in snapshot.scored_weeks() {
        for game in snapshot.games(week) {
            for (team_id, _, lineup) in game.sides() {
                let Some(team_idx) = snapshot.team_index(team_id) else {
                    continue;
                };
                for entry in lineup.iter().filter(|e| e.slot.is_starter()) {
                    if !entry.acquisition.is_draft() {
                        waiver_points[team_idx] += entry.points;
                        continue;
                    }
                    draft_points[team_idx] += entry.points;

                    let idx = *record_index.entry(entry.player_id).or_insert_with(|| {
                        records.push(DraftRecord {
                            player_id: entry.player_id,
                            player_name: entry.player_name.clone(),
                            team_id,
                            team_name: snapshot.team_name(team_id),
                            position: entry.position.clone(),
                            points: 0.0,
                            round: None,
                            pick_overall: None,
                        });
                        records.len() - 1
                    });
                    records[idx].points += entry.points;
                }
            }
        }
    }

    for slot in &snapshot.draft {
        if let Some(&idx) = record_index.get(&slot.player_id) {
            let record = &mut records[idx];
            record.round = slot.round;
            record.pick_overall = slot.pick_overall;
            record.team_id = slot.team_id;
            record.team_name = snapshot.team_name(slot.team_id);
        }
    }

    records.sort_by(|a, b| {
        b.points
            .partial_cmp(&a.points)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let cutoff = safe_cutoff(n);
    let teams: Vec<TeamRoi> = standings_order(&snapshot.teams)
        .into_iter()
        .enumerate()
        .map(|(pos, idx)| {
            let t = &snapshot.teams[idx];
            TeamRoi {
                team_id: t.id,
                team_name: t.name.clone(),
                draft_points: draft_points[idx],
                waiver_points: waiver_points[idx],
                standing: pos + 1,
                in_safe_zone: pos < cutoff,
            }
        })
        .collect();

    RoiReport {
        prescient_one: pick_prescient(&teams),
        safe_cutoff: cutoff,
        teams,
        draft_records: records,
    }
}
