// Power rankings: scoring average, schedule-independent "true wins", and luck.
//
// True wins ask how a team would have fared had it played every other team
// every week. Luck is the gap between the real record and that hypothetical
// record, scaled so a typical season spreads across roughly -3..+3.

use huddle_core::league::{LeagueSnapshot, Team, TeamId};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Multiplier applied to the win-percentage gap to produce the luck rating.
pub const LUCK_SCALE: f64 = 10.0;

// ---------------------------------------------------------------------------
// Output row
// ---------------------------------------------------------------------------

/// One team's line in the power rankings table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerRankingRow {
    /// 1-based position after sorting by power score.
    pub rank: usize,
    pub team_id: TeamId,
    pub team_name: String,
    pub logo_url: String,
    pub wins: u32,
    pub losses: u32,
    pub points_for: f64,
    /// Points per week, rounded to one decimal.
    pub power_score: f64,
    pub true_wins: u32,
    pub total_matchups: u32,
    pub true_win_pct: f64,
    pub actual_win_pct: f64,
    /// Positive = record better than scoring deserves.
    pub luck: f64,
}

/// Hypothetical all-play record for one team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrueWinRecord {
    pub true_wins: u32,
    pub total_matchups: u32,
}

impl TrueWinRecord {
    /// Fraction of all-play matchups won; 0 before any matchup exists.
    pub fn pct(&self) -> f64 {
        if self.total_matchups == 0 {
            0.0
        } else {
            self.true_wins as f64 / self.total_matchups as f64
        }
    }
}

// ---------------------------------------------------------------------------
// Core computation
// ---------------------------------------------------------------------------

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Average points per week, rounded to one decimal. Zero before week 1.
pub fn power_score(points_for: f64, current_week: u32) -> f64 {
    if current_week == 0 {
        return 0.0;
    }
    round1(points_for / current_week as f64)
}

/// All-play record for `team` across weeks `1..=current_week`.
///
/// For each week the team has a score, every other score posted that week
/// (both sides of every game) is a hypothetical opponent; the team's own
/// entry is skipped by identity and only strictly lower scores count as
/// wins. Each such week adds `team_count - 1` matchups. Weeks where the team
/// has no game add nothing.
pub fn true_win_record(snapshot: &LeagueSnapshot, team: TeamId) -> TrueWinRecord {
    let opponents_per_week = snapshot.teams.len().saturating_sub(1) as u32;
    let mut record = TrueWinRecord::default();

    for week in snapshot.scored_weeks() {
        let games = snapshot.games(week);
        let Some(own) = games.iter().find_map(|g| g.score_of(team)) else {
            continue;
        };

        let beaten = games
            .iter()
            .flat_map(|g| [(g.home_team, g.home_score), (g.away_team, g.away_score)])
            .filter(|&(other, score)| other != team && own > score)
            .count() as u32;

        record.true_wins += beaten.min(opponents_per_week);
        record.total_matchups += opponents_per_week;
    }

    record
}

/// Real win percentage; 0 before any decided game.
pub fn actual_win_pct(team: &Team) -> f64 {
    let decided = team.decided_games();
    if decided == 0 {
        0.0
    } else {
        team.wins as f64 / decided as f64
    }
}

/// Scaled gap between the real and all-play win percentages.
pub fn luck_rating(actual_win_pct: f64, true_win_pct: f64) -> f64 {
    (actual_win_pct - true_win_pct) * LUCK_SCALE
}

/// Compute the full power rankings table, best power score first. Teams with
/// equal power scores keep snapshot order.
pub fn compute_power_rankings(snapshot: &LeagueSnapshot) -> Vec<PowerRankingRow> {
    let mut rows: Vec<PowerRankingRow> = snapshot
        .teams
        .iter()
        .map(|team| {
            let record = true_win_record(snapshot, team.id);
            let true_win_pct = record.pct();
            let actual = actual_win_pct(team);
            PowerRankingRow {
                rank: 0,
                team_id: team.id,
                team_name: team.name.clone(),
                logo_url: team.logo_or_default().to_string(),
                wins: team.wins,
                losses: team.losses,
                points_for: team.points_for,
                power_score: power_score(team.points_for, snapshot.current_week),
                true_wins: record.true_wins,
                total_matchups: record.total_matchups,
                true_win_pct,
                actual_win_pct: actual,
                luck: luck_rating(actual, true_win_pct),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.power_score
            .partial_cmp(&a.power_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }
    rows
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{game, snapshot, team};

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    /// Ten teams, five weeks. Team 1 scores 120/110/130/100/140; everyone
    /// else stays under 100 except week 3, where team 2 posts 135.
    fn ten_team_league() -> huddle_core::league::LeagueSnapshot {
        let teams: Vec<_> = (1..=10)
            .map(|id| team(id, &format!("Team {id}"), 0, 0, 0.0))
            .collect();
        let team_one = [120.0, 110.0, 130.0, 100.0, 140.0];
        let mut games = Vec::new();
        for week in 1..=5u32 {
            for pair in 0..5u32 {
                let home = pair * 2 + 1;
                let away = pair * 2 + 2;
                let home_score = if home == 1 {
                    team_one[(week - 1) as usize]
                } else {
                    80.0 + home as f64
                };
                let away_score = if week == 3 && away == 2 {
                    135.0
                } else {
                    80.0 + away as f64
                };
                games.push(game(week, home, away, home_score, away_score));
            }
        }
        snapshot(teams, games, 5)
    }

    #[test]
    fn power_score_rounds_to_one_decimal() {
        assert_eq!(power_score(600.0, 5), 120.0);
        assert_eq!(power_score(613.37, 5), 122.7);
        assert_eq!(power_score(100.0, 3), 33.3);
        assert_eq!(power_score(500.0, 0), 0.0);
    }

    #[test]
    fn week_three_counts_eight_of_nine() {
        let league = ten_team_league();
        let mut week_three = league.clone();
        week_three.box_scores.retain(|&w, _| w == 3);

        let record = true_win_record(&week_three, 1);
        assert_eq!(record.true_wins, 8);
        assert_eq!(record.total_matchups, 9);
    }

    #[test]
    fn two_higher_scores_in_week_three_leave_seven_of_nine() {
        let mut week_three = ten_team_league();
        week_three.box_scores.retain(|&w, _| w == 3);
        for g in week_three.box_scores.values_mut().flatten() {
            if g.away_team == 4 {
                g.away_score = 135.0;
            }
        }

        let record = true_win_record(&week_three, 1);
        assert_eq!(record.true_wins, 7);
        assert_eq!(record.total_matchups, 9);
    }

    #[test]
    fn true_wins_over_full_season() {
        let record = true_win_record(&ten_team_league(), 1);
        // Beats all nine every week except week 3 (8 of 9).
        assert_eq!(record.true_wins, 44);
        assert_eq!(record.total_matchups, 45);
        assert!(approx_eq(record.pct(), 44.0 / 45.0));
    }

    #[test]
    fn true_win_pct_is_zero_at_week_zero() {
        let mut league = ten_team_league();
        league.current_week = 0;
        let record = true_win_record(&league, 1);
        assert_eq!(record, TrueWinRecord::default());
        assert_eq!(record.pct(), 0.0);
    }

    #[test]
    fn ties_with_other_teams_are_not_wins() {
        let teams = vec![team(1, "A", 0, 1, 100.0), team(2, "B", 1, 0, 100.0)];
        let league = snapshot(teams, vec![game(1, 1, 2, 100.0, 100.0)], 1);
        let record = true_win_record(&league, 1);
        assert_eq!(record.true_wins, 0);
        assert_eq!(record.total_matchups, 1);
    }

    #[test]
    fn missing_week_adds_no_matchups() {
        let teams = vec![
            team(1, "A", 1, 0, 100.0),
            team(2, "B", 0, 1, 90.0),
            team(3, "C", 0, 0, 0.0),
        ];
        let league = snapshot(teams, vec![game(1, 1, 2, 100.0, 90.0)], 1);
        assert_eq!(true_win_record(&league, 3), TrueWinRecord::default());
        assert_eq!(true_win_record(&league, 1).total_matchups, 2);
    }

    #[test]
    fn true_win_pct_stays_in_unit_interval() {
        let league = ten_team_league();
        for row in compute_power_rankings(&league) {
            assert!((0.0..=1.0).contains(&row.true_win_pct), "{row:?}");
        }
    }

    #[test]
    fn luck_zero_when_records_agree() {
        assert_eq!(luck_rating(0.6, 0.6), 0.0);
        assert!(luck_rating(0.8, 0.5) > 0.0);
        assert!(luck_rating(0.2, 0.5) < 0.0);
        assert!(approx_eq(luck_rating(0.75, 0.5), 2.5));
    }

    #[test]
    fn actual_win_pct_guards_zero_games() {
        assert_eq!(actual_win_pct(&team(1, "A", 0, 0, 0.0)), 0.0);
        assert!(approx_eq(actual_win_pct(&team(1, "A", 3, 1, 0.0)), 0.75));
    }

    #[test]
    fn rankings_sorted_by_power_score() {
        let teams = vec![
            team(1, "Low", 2, 0, 200.0),
            team(2, "High", 0, 2, 260.0),
        ];
        let games = vec![game(1, 1, 2, 110.0, 100.0), game(2, 1, 2, 90.0, 160.0)];
        let rows = compute_power_rankings(&snapshot(teams, games, 2));

        assert_eq!(rows[0].team_name, "High");
        assert_eq!(rows[0].rank, 1);
        assert_eq!(rows[0].power_score, 130.0);
        assert_eq!(rows[1].rank, 2);
        // "Low" went 2-0 while winning one of two all-play matchups.
        assert!(approx_eq(rows[1].true_win_pct, 0.5));
        assert!(approx_eq(rows[1].luck, 5.0));
    }
}
