// League data-transfer types.
//
// Everything the analytics engine reads is decoded into these structs once,
// at the provider boundary. Nothing downstream ever sees a provider's native
// JSON shape.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Image shown for teams whose logo reference is missing or unusable.
pub const DEFAULT_LOGO_URL: &str = "https://g.espncdn.com/lm-static/ffl/images/default_logos/1.svg";

/// Playoff slot count used when the league settings do not report one.
pub const DEFAULT_PLAYOFF_TEAMS: u32 = 4;

/// Team identifier as assigned by the league host.
pub type TeamId = u32;

/// Player identifier as assigned by the league host.
pub type PlayerId = u64;

// ---------------------------------------------------------------------------
// Team
// ---------------------------------------------------------------------------

/// A fantasy team and its cumulative season record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    #[serde(default)]
    pub ties: u32,
    /// Cumulative fantasy points scored across all completed weeks.
    pub points_for: f64,
    /// Raw logo reference as reported by the provider.
    #[serde(default)]
    pub logo_url: Option<String>,
}

impl Team {
    /// Logo reference suitable for rendering. Falls back to
    /// [`DEFAULT_LOGO_URL`] when the reference is missing, blank, or not an
    /// http(s) URL.
    pub fn logo_or_default(&self) -> &str {
        match self.logo_url.as_deref().map(str::trim) {
            Some(url) if url.starts_with("https://") || url.starts_with("http://") => url,
            _ => DEFAULT_LOGO_URL,
        }
    }

    /// Games decided so far (ties excluded).
    pub fn decided_games(&self) -> u32 {
        self.wins + self.losses
    }
}

// ---------------------------------------------------------------------------
// Lineup entries
// ---------------------------------------------------------------------------

/// Where a player sat in a team's lineup for a given week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineupSlot {
    Starter,
    Bench,
    InjuredReserve,
}

impl LineupSlot {
    pub fn is_starter(&self) -> bool {
        matches!(self, LineupSlot::Starter)
    }
}

/// How a player joined the roster that fielded them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Acquisition {
    Draft,
    /// Free-agent add or waiver claim.
    Waiver,
    Trade,
}

impl Acquisition {
    /// Parse a provider acquisition code ("DRAFT", "ADD", "WAIVER", "TRADE").
    /// Unknown codes are treated as free-agent adds.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "DRAFT" => Acquisition::Draft,
            "TRADE" => Acquisition::Trade,
            _ => Acquisition::Waiver,
        }
    }

    pub fn is_draft(&self) -> bool {
        matches!(self, Acquisition::Draft)
    }
}

/// Player availability as reported for a given week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InjuryStatus {
    Active,
    Questionable,
    Doubtful,
    Out,
    InjuryReserve,
    Suspended,
}

impl InjuryStatus {
    /// Parse a provider status string. Unknown or empty values map to
    /// `Active`.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "QUESTIONABLE" | "Q" => InjuryStatus::Questionable,
            "DOUBTFUL" | "D" => InjuryStatus::Doubtful,
            "OUT" | "O" => InjuryStatus::Out,
            "INJURY_RESERVE" | "IR" => InjuryStatus::InjuryReserve,
            "SUSPENDED" | "SSPD" => InjuryStatus::Suspended,
            _ => InjuryStatus::Active,
        }
    }

    /// Whether the status belongs to the "unavailable" set counted by the
    /// injury-prone award.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            InjuryStatus::Out | InjuryStatus::InjuryReserve | InjuryStatus::Suspended
        )
    }
}

/// One player's line in one team's weekly lineup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineupEntry {
    pub player_id: PlayerId,
    pub player_name: String,
    /// Display position (QB, RB, WR, TE, K, D/ST, ...).
    pub position: String,
    pub points: f64,
    pub slot: LineupSlot,
    pub acquisition: Acquisition,
    pub injury_status: InjuryStatus,
}

// ---------------------------------------------------------------------------
// Box scores
// ---------------------------------------------------------------------------

/// Which side of a matchup a team played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Home,
    Away,
}

/// A single head-to-head game for one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxScoreGame {
    pub week: u32,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub home_score: f64,
    pub away_score: f64,
    #[serde(default)]
    pub home_lineup: Vec<LineupEntry>,
    #[serde(default)]
    pub away_lineup: Vec<LineupEntry>,
}

impl BoxScoreGame {
    /// Which side `team` played on, if it played in this game.
    pub fn side_of(&self, team: TeamId) -> Option<Side> {
        if self.home_team == team {
            Some(Side::Home)
        } else if self.away_team == team {
            Some(Side::Away)
        } else {
            None
        }
    }

    /// The score `team` posted in this game, if it played.
    pub fn score_of(&self, team: TeamId) -> Option<f64> {
        self.side_of(team).map(|side| match side {
            Side::Home => self.home_score,
            Side::Away => self.away_score,
        })
    }

    /// Absolute score difference between the two teams.
    pub fn margin(&self) -> f64 {
        (self.home_score - self.away_score).abs()
    }

    /// Both sides as `(team, score, lineup)` tuples, home first.
    pub fn sides(&self) -> [(TeamId, f64, &[LineupEntry]); 2] {
        [
            (self.home_team, self.home_score, &self.home_lineup),
            (self.away_team, self.away_score, &self.away_lineup),
        ]
    }
}

// ---------------------------------------------------------------------------
// Settings and draft order
// ---------------------------------------------------------------------------

/// League-level settings needed by the analytics engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueSettings {
    /// Number of weeks in the regular season.
    pub regular_season_weeks: u32,
    /// Number of playoff slots, when the host reports it.
    #[serde(default)]
    pub playoff_team_count: Option<u32>,
}

impl LeagueSettings {
    /// Playoff slot count, falling back to [`DEFAULT_PLAYOFF_TEAMS`].
    pub fn playoff_slots(&self) -> u32 {
        match self.playoff_team_count {
            Some(n) if n > 0 => n,
            _ => DEFAULT_PLAYOFF_TEAMS,
        }
    }
}

/// A drafted player and where they were taken, when draft order is known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSlot {
    pub player_id: PlayerId,
    pub team_id: TeamId,
    pub round: Option<u32>,
    pub pick_overall: Option<u32>,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A fully fetched, internally consistent view of one league at one week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeagueSnapshot {
    pub league_id: u64,
    pub season: u16,
    pub current_week: u32,
    pub settings: LeagueSettings,
    pub teams: Vec<Team>,
    /// Box scores keyed by week number.
    #[serde(default)]
    pub box_scores: BTreeMap<u32, Vec<BoxScoreGame>>,
    #[serde(default)]
    pub draft: Vec<DraftSlot>,
}

impl LeagueSnapshot {
    pub fn team(&self, id: TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    /// Index of a team within `teams`, which is the canonical iteration
    /// order for every tie-break.
    pub fn team_index(&self, id: TeamId) -> Option<usize> {
        self.teams.iter().position(|t| t.id == id)
    }

    /// Display name of a team, or a placeholder for unknown ids.
    pub fn team_name(&self, id: TeamId) -> String {
        self.team(id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| format!("Team {id}"))
    }

    /// Case-insensitive lookup by display name.
    pub fn team_by_name(&self, name: &str) -> Option<&Team> {
        let needle = name.trim();
        self.teams
            .iter()
            .find(|t| t.name.trim().eq_ignore_ascii_case(needle))
    }

    /// Games played in `week` (empty if the week was never fetched).
    pub fn games(&self, week: u32) -> &[BoxScoreGame] {
        self.box_scores.get(&week).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Completed weeks the analytics engine iterates: `1..=current_week`.
    pub fn scored_weeks(&self) -> std::ops::RangeInclusive<u32> {
        1..=self.current_week
    }

    /// Whether the regular season has been fully played.
    pub fn regular_season_over(&self) -> bool {
        self.current_week > self.settings.regular_season_weeks
    }
}

impl fmt::Display for LeagueSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "league {} season {} week {} ({} teams)",
            self.league_id,
            self.season,
            self.current_week,
            self.teams.len()
        )
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
