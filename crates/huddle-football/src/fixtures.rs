// Test builders shared by the unit tests in this crate.

use std::collections::BTreeMap;

use huddle_core::league::{
    Acquisition, BoxScoreGame, InjuryStatus, LeagueSettings, LeagueSnapshot, LineupEntry,
    LineupSlot, Team, TeamId,
};

pub fn team(id: TeamId, name: &str, wins: u32, losses: u32, points_for: f64) -> Team {
    Team {
        id,
        name: name.to_string(),
        wins,
        losses,
        ties: 0,
        points_for,
        logo_url: None,
    }
}

pub fn starter(player_id: u64, name: &str, points: f64, acquisition: Acquisition) -> LineupEntry {
    LineupEntry {
        player_id,
        player_name: name.to_string(),
        position: "RB".to_string(),
        points,
        slot: LineupSlot::Starter,
        acquisition,
        injury_status: InjuryStatus::Active,
    }
}

pub fn bench(player_id: u64, name: &str, points: f64) -> LineupEntry {
    LineupEntry {
        slot: LineupSlot::Bench,
        ..starter(player_id, name, points, Acquisition::Draft)
    }
}

pub fn game(week: u32, home: TeamId, away: TeamId, home_score: f64, away_score: f64) -> BoxScoreGame {
    BoxScoreGame {
        week,
        home_team: home,
        away_team: away,
        home_score,
        away_score,
        home_lineup: vec![],
        away_lineup: vec![],
    }
}

pub fn snapshot(teams: Vec<Team>, games: Vec<BoxScoreGame>, current_week: u32) -> LeagueSnapshot {
    let mut box_scores: BTreeMap<u32, Vec<BoxScoreGame>> = BTreeMap::new();
    for g in games {
        box_scores.entry(g.week).or_default().push(g);
    }
    LeagueSnapshot {
        league_id: 1,
        season: 2024,
        current_week,
        settings: LeagueSettings {
            regular_season_weeks: 14,
            playoff_team_count: Some(4),
        },
        teams,
        box_scores,
        draft: vec![],
    }
}
