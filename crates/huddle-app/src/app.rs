// Dashboard orchestration.
//
// Loads one league snapshot (from the SQLite store when it is still fresh,
// otherwise from the provider), then serves every analytics view through a
// per-view memo cache. Narratives are requested last and never fail the run.

use std::path::Path;

use anyhow::{bail, Context};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use huddle_core::cache::{CacheKey, MemoCache};
use huddle_core::config::{Config, Platform};
use huddle_core::db::SnapshotStore;
use huddle_core::league::LeagueSnapshot;
use huddle_core::provider::{fetch_snapshot, SnapshotProvider, StaticProvider};
use huddle_football::awards::{compute_season_awards, SeasonAwards};
use huddle_football::power::{compute_power_rankings, PowerRankingRow};
use huddle_football::roi::{analyze_roi, RoiReport};
use huddle_football::simulation::{
    compare_scenarios, playoff_odds, simulate_multiverse, simulate_playoffs, MultiverseResult,
    OddsShift, PlayoffOdds, SimulationParams, SimulationResult,
};
use huddle_llm::client::NarrativeGenerator;
use huddle_llm::narrative::Narrative;
use huddle_llm::prompt;

use crate::espn::EspnProvider;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// `league_state` key recording the last week the dashboard loaded.
pub const LAST_LOADED_WEEK_KEY: &str = "last_loaded_week";

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// Where the current snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSource {
    Store,
    Provider,
}

/// Multiverse output paired with its baseline comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiverseView {
    pub forced_winners: Vec<String>,
    pub unknown_teams: Vec<String>,
    pub shifts: Vec<OddsShift>,
}

/// Every narrative the report renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Narratives {
    pub power_rankings: Narrative,
    pub awards: Narrative,
    pub playoff_outlook: Narrative,
    pub multiverse: Option<Narrative>,
}

/// Build the snapshot provider the config asks for.
pub fn build_provider(config: &Config) -> anyhow::Result<Box<dyn SnapshotProvider>> {
    match config.league.platform {
        Platform::Espn => Ok(Box::new(EspnProvider::new(
            config.league.league_id,
            config.league.season,
            config.credentials.espn_s2.as_deref(),
            config.credentials.swid.as_deref(),
        ))),
        Platform::File => {
            let Some(path) = config.league.snapshot_path.as_deref() else {
                bail!("league.snapshot_path is required for platform = \"file\"");
            };
            let json = std::fs::read_to_string(Path::new(path))
                .with_context(|| format!("failed to read snapshot file {path}"))?;
            let provider = StaticProvider::from_json(&json)
                .with_context(|| format!("failed to parse snapshot file {path}"))?;
            Ok(Box::new(provider))
        }
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

pub struct Dashboard {
    config: Config,
    store: SnapshotStore,
    provider: Box<dyn SnapshotProvider>,
    narrator: Box<dyn NarrativeGenerator>,
    snapshot: Option<LeagueSnapshot>,
    source: Option<SnapshotSource>,
    power_cache: MemoCache<Vec<PowerRankingRow>>,
    awards_cache: MemoCache<SeasonAwards>,
    odds_cache: MemoCache<SimulationResult>,
    multiverse_cache: MemoCache<MultiverseResult>,
    roi_cache: MemoCache<RoiReport>,
}

impl Dashboard {
    pub fn new(
        config: Config,
        store: SnapshotStore,
        provider: Box<dyn SnapshotProvider>,
        narrator: Box<dyn NarrativeGenerator>,
    ) -> Self {
        Self {
            config,
            store,
            provider,
            narrator,
            snapshot: None,
            source: None,
            power_cache: MemoCache::new(),
            awards_cache: MemoCache::new(),
            odds_cache: MemoCache::new(),
            multiverse_cache: MemoCache::new(),
            roi_cache: MemoCache::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn source(&self) -> Option<SnapshotSource> {
        self.source
    }

    fn ttl(&self) -> Duration {
        Duration::seconds(self.config.analysis.cache.ttl_secs as i64)
    }

    /// Load the league snapshot as of `now`.
    ///
    /// A stored snapshot younger than the cache TTL is reused; otherwise the
    /// provider is queried and the result persisted. Cached analytics for
    /// any other season or week are dropped.
    pub async fn load_snapshot(&mut self, now: DateTime<Utc>) -> anyhow::Result<&LeagueSnapshot> {
        let league_id = self.config.league.league_id;
        let season = self.config.league.season;

        let stored = self
            .store
            .latest_snapshot(league_id, season)
            .context("failed to read stored snapshot")?;

        let (mut snapshot, source) = match stored {
            Some(stored) if stored.is_fresh(self.ttl(), now) => {
                info!(
                    "Using stored snapshot for week {} (fetched {})",
                    stored.snapshot.current_week, stored.fetched_at
                );
                (stored.snapshot, SnapshotSource::Store)
            }
            _ => {
                let snapshot = fetch_snapshot(self.provider.as_ref(), league_id, season)
                    .await
                    .context("failed to fetch league snapshot")?;
                self.store
                    .save_snapshot(&snapshot, now)
                    .context("failed to persist snapshot")?;
                (snapshot, SnapshotSource::Provider)
            }
        };

        if let Some(count) = self.config.league.playoff_team_count {
            snapshot.settings.playoff_team_count = Some(count);
        }
        if snapshot.teams.len() != self.config.league.num_teams {
            warn!(
                "League reports {} teams but config expects {}",
                snapshot.teams.len(),
                self.config.league.num_teams
            );
        }

        self.invalidate_other_weeks(league_id, season, snapshot.current_week);
        self.store
            .save_state(
                LAST_LOADED_WEEK_KEY,
                &serde_json::json!({ "season": season, "week": snapshot.current_week }),
            )
            .context("failed to record loaded week")?;

        info!("Loaded {snapshot} from {source:?}");
        self.source = Some(source);
        Ok(self.snapshot.insert(snapshot))
    }

    fn invalidate_other_weeks(&self, league_id: u64, season: u16, week: u32) {
        let dropped = self.power_cache.retain_week(league_id, season, week)
            + self.awards_cache.retain_week(league_id, season, week)
            + self.odds_cache.retain_week(league_id, season, week)
            + self.multiverse_cache.retain_week(league_id, season, week)
            + self.roi_cache.retain_week(league_id, season, week);
        if dropped > 0 {
            debug!(dropped, week, "dropped cached analytics for other weeks");
        }
    }

    /// Drop every cached analytics result.
    pub fn invalidate_all(&self) {
        self.power_cache.invalidate_all();
        self.awards_cache.invalidate_all();
        self.odds_cache.invalidate_all();
        self.multiverse_cache.invalidate_all();
        self.roi_cache.invalidate_all();
    }

    pub fn snapshot(&self) -> anyhow::Result<&LeagueSnapshot> {
        match &self.snapshot {
            Some(s) => Ok(s),
            None => bail!("no league snapshot loaded"),
        }
    }

    fn key(&self, resource: &'static str) -> anyhow::Result<CacheKey> {
        let s = self.snapshot()?;
        Ok(CacheKey::new(resource, s.league_id, s.season, s.current_week))
    }

    fn simulation_params(&self) -> anyhow::Result<SimulationParams> {
        let sim = &self.config.analysis.simulation;
        Ok(SimulationParams::for_league(
            self.snapshot()?,
            sim.simulations,
            sim.seed,
        ))
    }

    // -- Analytics views --

    pub fn power_rankings(&self) -> anyhow::Result<Vec<PowerRankingRow>> {
        let snapshot = self.snapshot()?;
        let key = self.key("power_rankings")?;
        Ok(self
            .power_cache
            .get_or_compute(key, self.ttl(), || compute_power_rankings(snapshot)))
    }

    pub fn season_awards(&self) -> anyhow::Result<SeasonAwards> {
        let snapshot = self.snapshot()?;
        let key = self.key("season_awards")?;
        Ok(self
            .awards_cache
            .get_or_compute(key, self.ttl(), || compute_season_awards(snapshot)))
    }

    pub fn playoff_simulation(&self) -> anyhow::Result<SimulationResult> {
        let snapshot = self.snapshot()?;
        let params = self.simulation_params()?;
        let key = self.key("playoff_odds")?.with_params(params.cache_params());
        Ok(self
            .odds_cache
            .get_or_compute(key, self.ttl(), || simulate_playoffs(snapshot, &params)))
    }

    pub fn playoff_odds(&self) -> anyhow::Result<Vec<PlayoffOdds>> {
        Ok(playoff_odds(&self.playoff_simulation()?))
    }

    /// Multiverse run against the baseline. Forced-winner names are part of
    /// the cache key in the order given.
    pub fn multiverse(&self, forced_winners: &[String]) -> anyhow::Result<MultiverseView> {
        let snapshot = self.snapshot()?;
        let params = self.simulation_params()?;
        let key = self
            .key("multiverse")?
            .with_params(format!("{};forced={}", params.cache_params(), forced_winners.join("|")));

        let scenario = self.multiverse_cache.get_or_compute(key, self.ttl(), || {
            simulate_multiverse(snapshot, &params, forced_winners)
        });
        let baseline = self.playoff_simulation()?;

        Ok(MultiverseView {
            forced_winners: scenario
                .forced_winners
                .iter()
                .map(|&id| snapshot.team_name(id))
                .collect(),
            unknown_teams: scenario.unknown_teams.clone(),
            shifts: compare_scenarios(&baseline, &scenario.result),
        })
    }

    pub fn roi(&self) -> anyhow::Result<RoiReport> {
        let snapshot = self.snapshot()?;
        let key = self.key("roi")?;
        Ok(self
            .roi_cache
            .get_or_compute(key, self.ttl(), || analyze_roi(snapshot)))
    }

    // -- Narratives --

    /// Request every narrative. Failures come back as `Unavailable`.
    pub async fn narratives(&self, multiverse: Option<&MultiverseView>) -> anyhow::Result<Narratives> {
        let snapshot = self.snapshot()?;
        let week = snapshot.current_week;
        let system = prompt::system_prompt(&self.config.league.name);
        let max_tokens = self.config.analysis.llm.max_tokens;

        let power_prompt = prompt::build_power_rankings_prompt(week, &self.power_rankings()?);
        let awards_prompt = prompt::build_awards_prompt(week, &self.season_awards()?);
        let sim = self.playoff_simulation()?;
        let playoff_prompt = prompt::build_playoff_outlook_prompt(
            week,
            sim.playoff_team_count,
            sim.simulations,
            &playoff_odds(&sim),
        );

        let power_rankings = self.narrator.generate(&system, &power_prompt, max_tokens).await;
        let awards = self.narrator.generate(&system, &awards_prompt, max_tokens).await;
        let playoff_outlook = self.narrator.generate(&system, &playoff_prompt, max_tokens).await;

        let multiverse = match multiverse {
            Some(view) if !view.forced_winners.is_empty() => {
                let p = prompt::build_multiverse_prompt(&view.forced_winners, &view.shifts);
                Some(self.narrator.generate(&system, &p, max_tokens).await)
            }
            _ => None,
        };

        Ok(Narratives {
            power_rankings,
            awards,
            playoff_outlook,
            multiverse,
        })
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
