// Season awards: one pass over every game and lineup, then pick the leaders.
//
// Every "leader" is the first maximum (or minimum) found while iterating in
// snapshot team order, so ties always resolve to the team listed first.

use std::collections::HashMap;

use huddle_core::league::{BoxScoreGame, LeagueSnapshot, LineupSlot, PlayerId, TeamId};
use serde::Serialize;
use tracing::debug;

use crate::standings::standings_order;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Top individual scorer of the season.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerAward {
    pub player_id: PlayerId,
    pub player_name: String,
    pub position: String,
    pub team_id: TeamId,
    pub team_name: String,
    pub points: f64,
}

/// A team-level superlative and the value that earned it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamAward {
    pub team_id: TeamId,
    pub team_name: String,
    pub value: f64,
}

/// A single notable game (blowout or heartbreaker).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameAward {
    pub week: u32,
    pub winner_id: TeamId,
    pub winner_name: String,
    pub winner_score: f64,
    pub loser_id: TeamId,
    pub loser_name: String,
    pub loser_score: f64,
    pub margin: f64,
}

/// Highest single-week team score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HighScore {
    pub week: u32,
    pub team_id: TeamId,
    pub team_name: String,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PodiumEntry {
    pub place: usize,
    pub team_id: TeamId,
    pub team_name: String,
    pub wins: u32,
    pub losses: u32,
    pub points_for: f64,
}

/// Per-team lineup totals accumulated during the pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamSeasonTotals {
    pub team_id: TeamId,
    pub team_name: String,
    pub starter_points: f64,
    pub bench_points: f64,
    /// Starter points from players not acquired in the draft.
    pub waiver_points: f64,
    /// Lineup entries flagged out, on IR, or suspended.
    pub unavailable_flags: u32,
}

impl TeamSeasonTotals {
    /// Share of lineup points that came from starters; 0 with no points.
    pub fn efficiency(&self) -> f64 {
        let total = self.starter_points + self.bench_points;
        if total <= 0.0 {
            0.0
        } else {
            self.starter_points / total
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonAwards {
    pub mvp: Option<PlayerAward>,
    /// Best starter-point efficiency.
    pub oracle: Option<TeamAward>,
    /// Most waiver-wire production.
    pub sniper: Option<TeamAward>,
    /// Most unavailable-status flags.
    pub purple: Option<TeamAward>,
    /// Most points left on the bench.
    pub hoarder: Option<TeamAward>,
    /// Lowest points-for.
    pub toilet: Option<TeamAward>,
    pub blowout: Option<GameAward>,
    pub heartbreaker: Option<GameAward>,
    pub high_score: Option<HighScore>,
    pub podium: Vec<PodiumEntry>,
    pub best_manager: Option<PodiumEntry>,
    pub team_totals: Vec<TeamSeasonTotals>,
}

// ---------------------------------------------------------------------------
// Accumulators
// ---------------------------------------------------------------------------

struct PlayerLedger {
    player_id: PlayerId,
    player_name: String,
    position: String,
    team_id: TeamId,
    points: f64,
}

fn game_award(snapshot: &LeagueSnapshot, game: &BoxScoreGame) -> GameAward {
    let (winner, winner_score, loser, loser_score) = if game.home_score >= game.away_score {
        (game.home_team, game.home_score, game.away_team, game.away_score)
    } else {
        (game.away_team, game.away_score, game.home_team, game.home_score)
    };
    GameAward {
        week: game.week,
        winner_id: winner,
        winner_name: snapshot.team_name(winner),
        winner_score,
        loser_id: loser,
        loser_name: snapshot.team_name(loser),
        loser_score,
        margin: game.margin(),
    }
}

/// Index of the first strictly-greatest value that passes `min_exclusive`.
fn first_max_above(values: impl Iterator<Item = f64>, min_exclusive: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, v) in values.enumerate() {
        if v > min_exclusive && best.map_or(true, |(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

fn team_award(totals: &TeamSeasonTotals, value: f64) -> TeamAward {
    TeamAward {
        team_id: totals.team_id,
        team_name: totals.team_name.clone(),
        value,
    }
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Compute every season award from weeks `1..=current_week`.
///
/// Team awards driven by lineup totals (Oracle, Sniper, Purple, Hoarder) are
/// only given when the leader's value is positive.
pub fn compute_season_awards(snapshot: &LeagueSnapshot) -> SeasonAwards {
    let mut totals: Vec<TeamSeasonTotals> = snapshot
        .teams
        .iter()
        .map(|t| TeamSeasonTotals {
            team_id: t.id,
            team_name: t.name.clone(),
            starter_points: 0.0,
            bench_points: 0.0,
            waiver_points: 0.0,
            unavailable_flags: 0,
        })
        .collect();

    let mut players: Vec<PlayerLedger> = Vec::new();
    let mut player_index: HashMap<PlayerId, usize> = HashMap::new();

    let mut blowout: Option<GameAward> = None;
    let mut heartbreaker: Option<GameAward> = None;
    let mut high_score: Option<HighScore> = None;

    for week in snapshot.scored_weeks() {
        for game in snapshot.games(week) {
            let margin = game.margin();
            if blowout.as_ref().map_or(true, |b| margin > b.margin) {
                blowout = Some(game_award(snapshot, game));
            }
            if heartbreaker.as_ref().map_or(true, |h| margin < h.margin) {
                heartbreaker = Some(game_award(snapshot, game));
            }

            for (team_id, score, lineup) in game.sides() {
                if high_score.as_ref().map_or(true, |h| score > h.score) {
                    high_score = Some(HighScore {
                        week,
                        team_id,
                        team_name: snapshot.team_name(team_id),
                        score,
                    });
                }

                let Some(team_idx) = snapshot.team_index(team_id) else {
                    debug!(team_id, week, "lineup for unknown team skipped");
                    continue;
                };
                let ledger = &mut totals[team_idx];

                for entry in lineup {
                    let slot = players.len();
                    let idx = *player_index.entry(entry.player_id).or_insert(slot);
                    if idx == slot {
                        players.push(PlayerLedger {
                            player_id: entry.player_id,
                            player_name: entry.player_name.clone(),
                            position: entry.position.clone(),
                            team_id,
                            points: 0.0,
                        });
                    }
                    let player = &mut players[idx];
                    player.points += entry.points;
                    player.team_id = team_id;

                    match entry.slot {
                        LineupSlot::Starter => {
                            ledger.starter_points += entry.points;
                            if !entry.acquisition.is_draft() {
                                ledger.waiver_points += entry.points;
                            }
                        }
                        LineupSlot::Bench => {
                            ledger.bench_points += entry.points;
                        }
                        LineupSlot::InjuredReserve => {}
                    }

                    if entry.injury_status.is_unavailable() {
                        ledger.unavailable_flags += 1;
                    }
                }
            }
        }
    }

    let mvp = first_max_above(players.iter().map(|p| p.points), f64::NEG_INFINITY).map(|i| {
        let p = &players[i];
        PlayerAward {
            player_id: p.player_id,
            player_name: p.player_name.clone(),
            position: p.position.clone(),
            team_id: p.team_id,
            team_name: snapshot.team_name(p.team_id),
            points: p.points,
        }
    });

    let oracle = first_max_above(totals.iter().map(TeamSeasonTotals::efficiency), 0.0)
        .map(|i| team_award(&totals[i], totals[i].efficiency()));
    let sniper = first_max_above(totals.iter().map(|t| t.waiver_points), 0.0)
        .map(|i| team_award(&totals[i], totals[i].waiver_points));
    let purple = first_max_above(totals.iter().map(|t| t.unavailable_flags as f64), 0.0)
        .map(|i| team_award(&totals[i], totals[i].unavailable_flags as f64));
    let hoarder = first_max_above(totals.iter().map(|t| t.bench_points), 0.0)
        .map(|i| team_award(&totals[i], totals[i].bench_points));

    let toilet = first_max_above(snapshot.teams.iter().map(|t| -t.points_for), f64::NEG_INFINITY)
        .map(|i| {
            let t = &snapshot.teams[i];
            TeamAward {
                team_id: t.id,
                team_name: t.name.clone(),
                value: t.points_for,
            }
        });

    let podium: Vec<PodiumEntry> = standings_order(&snapshot.teams)
        .into_iter()
        .take(3)
        .enumerate()
        .map(|(place, idx)| {
            let t = &snapshot.teams[idx];
            PodiumEntry {
                place: place + 1,
                team_id: t.id,
                team_name: t.name.clone(),
                wins: t.wins,
                losses: t.losses,
                points_for: t.points_for,
            }
        })
        .collect();
    let best_manager = podium.first().cloned();

    SeasonAwards {
        mvp,
        oracle,
        sniper,
        purple,
        hoarder,
        toilet,
        blowout,
        heartbreaker,
        high_score,
        podium,
        best_manager,
        team_totals: totals,
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
