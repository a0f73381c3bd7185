// Monte Carlo playoff-odds simulator.
//
// Each trial plays out the remaining regular season: every team draws a
// weekly score from a normal distribution centred on its power estimate and
// banks a win when the draw clears a fixed threshold. Teams are simulated
// independently; no opponent pairing is modelled. The top slots by (wins,
// points-for) qualify, and qualification counts across trials become odds.
//
// The multiverse variant credits chosen teams with a forced win this week
// and simulates from the following week, so its output can be compared
// against the baseline.

use huddle_core::league::{LeagueSnapshot, TeamId, DEFAULT_PLAYOFF_TEAMS};
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rand_pcg::Pcg64Mcg;
use serde::Serialize;
use tracing::{debug, warn};

use crate::standings::rank_into;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Standard deviation of a simulated weekly score.
pub const SCORE_STDDEV: f64 = 15.0;

/// A simulated weekly score strictly above this counts as a win.
pub const WIN_THRESHOLD: f64 = 115.0;

/// Trials per simulation when the caller does not choose.
pub const DEFAULT_SIMULATIONS: u32 = 1000;

// ---------------------------------------------------------------------------
// Outlook labels
// ---------------------------------------------------------------------------

/// Categorical reading of a playoff probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayoffOutlook {
    /// Above 99%.
    Locked,
    /// Above 80%.
    HighProbability,
    /// Above 40%.
    Bubble,
    /// Above 5%.
    Miracle,
    Dead,
}

impl PlayoffOutlook {
    /// Classify a probability in `0.0..=1.0`. Thresholds are exclusive and
    /// checked from the top down.
    pub fn from_probability(probability: f64) -> Self {
        let pct = probability * 100.0;
        if pct > 99.0 {
            PlayoffOutlook::Locked
        } else if pct > 80.0 {
            PlayoffOutlook::HighProbability
        } else if pct > 40.0 {
            PlayoffOutlook::Bubble
        } else if pct > 5.0 {
            PlayoffOutlook::Miracle
        } else {
            PlayoffOutlook::Dead
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PlayoffOutlook::Locked => "Locked",
            PlayoffOutlook::HighProbability => "High Probability",
            PlayoffOutlook::Bubble => "Bubble",
            PlayoffOutlook::Miracle => "Miracle",
            PlayoffOutlook::Dead => "Dead",
        }
    }
}

// ---------------------------------------------------------------------------
// Parameters and results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub simulations: u32,
    pub playoff_team_count: u32,
    /// Fixed seed for reproducible runs; entropy when `None`.
    pub seed: Option<u64>,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            simulations: DEFAULT_SIMULATIONS,
            playoff_team_count: DEFAULT_PLAYOFF_TEAMS,
            seed: None,
        }
    }
}

impl SimulationParams {
    /// Parameters using the league's playoff slot count.
    pub fn for_league(snapshot: &LeagueSnapshot, simulations: u32, seed: Option<u64>) -> Self {
        Self {
            simulations,
            playoff_team_count: snapshot.settings.playoff_slots(),
            seed,
        }
    }

    /// Compact description used as a cache key component.
    pub fn cache_params(&self) -> String {
        match self.seed {
            Some(seed) => format!("sims={};k={};seed={seed}", self.simulations, self.playoff_team_count),
            None => format!("sims={};k={}", self.simulations, self.playoff_team_count),
        }
    }
}

/// Qualification tally for one team.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamOdds {
    pub team_id: TeamId,
    pub team_name: String,
    /// Power estimate the team's weekly draws were centred on.
    pub power_estimate: f64,
    pub qualifications: u32,
    /// `qualifications / simulations`, in `0.0..=1.0`.
    pub probability: f64,
}

impl TeamOdds {
    pub fn percent(&self) -> f64 {
        self.probability * 100.0
    }

    pub fn outlook(&self) -> PlayoffOutlook {
        PlayoffOutlook::from_probability(self.probability)
    }
}

/// Raw output of one simulation run, teams in snapshot order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub simulations: u32,
    pub playoff_team_count: u32,
    /// First simulated week; `None` when no weeks remained.
    pub start_week: Option<u32>,
    pub simulated_weeks: u32,
    pub teams: Vec<TeamOdds>,
}

/// Labelled playoff odds row for presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayoffOdds {
    pub team_id: TeamId,
    pub team_name: String,
    pub qualifications: u32,
    pub probability: f64,
    pub percent: f64,
    pub outlook: PlayoffOutlook,
}

/// Output of a multiverse run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiverseResult {
    /// Teams that actually received a forced win.
    pub forced_winners: Vec<TeamId>,
    /// Requested names that matched no team.
    pub unknown_teams: Vec<String>,
    pub result: SimulationResult,
}

/// Change in one team's odds between two simulations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OddsShift {
    pub team_id: TeamId,
    pub team_name: String,
    pub before: f64,
    pub after: f64,
    pub delta: f64,
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

/// Average points per week before the most recent week. The divisor is
/// floored at one so week-1 leagues still get a finite estimate.
pub fn power_estimate(points_for: f64, current_week: u32) -> f64 {
    let prior_weeks = current_week.saturating_sub(1).max(1);
    points_for / prior_weeks as f64
}

fn make_rng(seed: Option<u64>) -> Pcg64Mcg {
    match seed {
        Some(seed) => Pcg64Mcg::seed_from_u64(seed),
        None => Pcg64Mcg::from_entropy(),
    }
}

/// Number of weeks to simulate when starting at `start_week`.
fn remaining_weeks(start_week: u32, regular_season_weeks: u32) -> u32 {
    if start_week > regular_season_weeks {
        0
    } else {
        regular_season_weeks - start_week + 1
    }
}

/// Run the trials. `base_wins` is the record each trial starts from; the
/// scratch buffers are allocated once and reset per trial.
fn run_trials(
    base_wins: &[u32],
    points_for: &[f64],
    powers: &[f64],
    weeks: u32,
    params: &SimulationParams,
) -> Vec<u32> {
    let n = base_wins.len();
    let qualifiers = (params.playoff_team_count as usize).min(n);
    let mut counts = vec![0u32; n];
    let mut wins = vec![0u32; n];
    let mut order: Vec<usize> = Vec::with_capacity(n);
    let mut rng = make_rng(params.seed);

    for _ in 0..params.simulations {
        wins.copy_from_slice(base_wins);

        for _ in 0..weeks {
            for (team_wins, &power) in wins.iter_mut().zip(powers) {
                let z: f64 = rng.sample(StandardNormal);
                if power + SCORE_STDDEV * z > WIN_THRESHOLD {
                    *team_wins += 1;
                }
            }
        }

        rank_into(&mut order, &wins, points_for);
        for &idx in order.iter().take(qualifiers) {
            counts[idx] += 1;
        }
    }

    counts
}

fn simulate_from(
    snapshot: &LeagueSnapshot,
    params: &SimulationParams,
    base_wins: &[u32],
    start_week: u32,
) -> SimulationResult {
    let points_for: Vec<f64> = snapshot.teams.iter().map(|t| t.points_for).collect();
    let powers: Vec<f64> = snapshot
        .teams
        .iter()
        .map(|t| power_estimate(t.points_for, snapshot.current_week))
        .collect();

    let weeks = if snapshot.regular_season_over() {
        0
    } else {
        remaining_weeks(start_week, snapshot.settings.regular_season_weeks)
    };

    debug!(
        simulations = params.simulations,
        playoff_team_count = params.playoff_team_count,
        start_week,
        weeks,
        "running playoff simulation"
    );

    let counts = if snapshot.teams.is_empty() {
        Vec::new()
    } else {
        run_trials(base_wins, &points_for, &powers, weeks, params)
    };

    let teams = snapshot
        .teams
        .iter()
        .zip(counts)
        .zip(powers)
        .map(|((team, qualifications), power)| TeamOdds {
            team_id: team.id,
            team_name: team.name.clone(),
            power_estimate: power,
            qualifications,
            probability: if params.simulations == 0 {
                0.0
            } else {
                qualifications as f64 / params.simulations as f64
            },
        })
        .collect();

    SimulationResult {
        simulations: params.simulations,
        playoff_team_count: params.playoff_team_count,
        start_week: (weeks > 0).then_some(start_week),
        simulated_weeks: weeks,
        teams,
    }
}

/// Baseline simulation from the current week to the end of the regular
/// season.
pub fn simulate_playoffs(snapshot: &LeagueSnapshot, params: &SimulationParams) -> SimulationResult {
    let base_wins: Vec<u32> = snapshot.teams.iter().map(|t| t.wins).collect();
    simulate_from(snapshot, params, &base_wins, snapshot.current_week)
}

/// Simulation with forced current-week winners. Names match
/// case-insensitively and each team is credited at most once; unknown names
/// are reported, not fatal. When no team is forced this is identical to
/// [`simulate_playoffs`].
pub fn simulate_multiverse(
    snapshot: &LeagueSnapshot,
    params: &SimulationParams,
    forced_winners: &[String],
) -> MultiverseResult {
    let mut base_wins: Vec<u32> = snapshot.teams.iter().map(|t| t.wins).collect();
    let mut forced = Vec::new();
    let mut unknown = Vec::new();

    for name in forced_winners {
        match snapshot.team_by_name(name) {
            Some(team) => {
                if forced.contains(&team.id) {
                    continue;
                }
                if let Some(idx) = snapshot.team_index(team.id) {
                    base_wins[idx] += 1;
                    forced.push(team.id);
                }
            }
            None => {
                warn!("multiverse: no team named '{}'", name);
                unknown.push(name.clone());
            }
        }
    }

    let start_week = if forced.is_empty() {
        snapshot.current_week
    } else {
        snapshot.current_week + 1
    };

    MultiverseResult {
        forced_winners: forced,
        unknown_teams: unknown,
        result: simulate_from(snapshot, params, &base_wins, start_week),
    }
}

/// Labelled odds, highest probability first. Equal probabilities keep
/// snapshot order.
pub fn playoff_odds(result: &SimulationResult) -> Vec<PlayoffOdds> {
    let mut rows: Vec<PlayoffOdds> = result
        .teams
        .iter()
        .map(|t| PlayoffOdds {
            team_id: t.team_id,
            team_name: t.team_name.clone(),
            qualifications: t.qualifications,
            probability: t.probability,
            percent: t.percent(),
            outlook: t.outlook(),
        })
        .collect();
    rows.sort_by(|a, b| {
        b.probability
            .partial_cmp(&a.probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}

/// Pair each team's baseline probability with its scenario probability.
pub fn compare_scenarios(baseline: &SimulationResult, scenario: &SimulationResult) -> Vec<OddsShift> {
    baseline
        .teams
        .iter()
        .map(|before| {
            let after = scenario
                .teams
                .iter()
                .find(|t| t.team_id == before.team_id)
                .map(|t| t.probability)
                .unwrap_or(0.0);
            OddsShift {
                team_id: before.team_id,
                team_name: before.team_name.clone(),
                before: before.probability,
                after,
                delta: after - before.probability,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
