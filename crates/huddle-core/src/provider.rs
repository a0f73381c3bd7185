// League snapshot provider seam.
//
// Providers expose the read-only league host API. `fetch_snapshot` pulls every
// piece the analytics need before any computation starts, so analytics never
// observe a half-fetched week.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info};

use crate::league::{BoxScoreGame, DraftSlot, LeagueSettings, LeagueSnapshot, Team};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to league host failed: {0}")]
    Request(String),

    #[error("league host returned status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("failed to decode league host response: {0}")]
    Decode(String),

    #[error("league {league_id} is private; espn_s2 and swid credentials are required")]
    Unauthorized { league_id: u64 },
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Read-only access to one league's data for one season.
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    async fn teams(&self) -> Result<Vec<Team>, ProviderError>;

    async fn box_scores(&self, week: u32) -> Result<Vec<BoxScoreGame>, ProviderError>;

    async fn settings(&self) -> Result<LeagueSettings, ProviderError>;

    async fn current_week(&self) -> Result<u32, ProviderError>;

    /// Draft order, if the host exposes it. Most analytics work without it.
    async fn draft_slots(&self) -> Result<Vec<DraftSlot>, ProviderError> {
        Ok(Vec::new())
    }
}

/// Fetch a complete snapshot: settings, teams, every week's box scores up to
/// and including the current week, and draft order.
pub async fn fetch_snapshot(
    provider: &dyn SnapshotProvider,
    league_id: u64,
    season: u16,
) -> Result<LeagueSnapshot, ProviderError> {
    let current_week = provider.current_week().await?;
    let settings = provider.settings().await?;
    let teams = provider.teams().await?;

    let mut box_scores = BTreeMap::new();
    for week in 1..=current_week {
        let games = provider.box_scores(week).await?;
        debug!(week, games = games.len(), "fetched box scores");
        box_scores.insert(week, games);
    }

    let draft = provider.draft_slots().await?;

    info!(
        "Fetched snapshot for league {} season {}: week {}, {} teams, {} draft slots",
        league_id,
        season,
        current_week,
        teams.len(),
        draft.len()
    );

    Ok(LeagueSnapshot {
        league_id,
        season,
        current_week,
        settings,
        teams,
        box_scores,
        draft,
    })
}

// ---------------------------------------------------------------------------
// StaticProvider
// ---------------------------------------------------------------------------

/// Serves a snapshot that is already in memory (offline JSON files, tests).
#[derive(Debug, Clone)]
pub struct StaticProvider {
    snapshot: LeagueSnapshot,
}

impl StaticProvider {
    pub fn new(snapshot: LeagueSnapshot) -> Self {
        Self { snapshot }
    }

    /// Parse a snapshot from its JSON serialization.
    pub fn from_json(json: &str) -> Result<Self, ProviderError> {
        let snapshot: LeagueSnapshot =
            serde_json::from_str(json).map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(Self::new(snapshot))
    }

    pub fn snapshot(&self) -> &LeagueSnapshot {
        &self.snapshot
    }
}

#[async_trait]
impl SnapshotProvider for StaticProvider {
    async fn teams(&self) -> Result<Vec<Team>, ProviderError> {
        Ok(self.snapshot.teams.clone())
    }

    async fn box_scores(&self, week: u32) -> Result<Vec<BoxScoreGame>, ProviderError> {
        Ok(self.snapshot.games(week).to_vec())
    }

    async fn settings(&self) -> Result<LeagueSettings, ProviderError> {
        Ok(self.snapshot.settings.clone())
    }

    async fn current_week(&self) -> Result<u32, ProviderError> {
        Ok(self.snapshot.current_week)
    }

    async fn draft_slots(&self) -> Result<Vec<DraftSlot>, ProviderError> {
        Ok(self.snapshot.draft.clone())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
