// Report assembly and output.
//
// One JSON document carries every structured output plus narratives; CSV
// tables cover the views people paste into spreadsheets.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use huddle_football::awards::SeasonAwards;
use huddle_football::power::PowerRankingRow;
use huddle_football::roi::RoiReport;
use huddle_football::simulation::PlayoffOdds;

use crate::app::{Dashboard, MultiverseView, Narratives, SnapshotSource};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PlayoffSection {
    pub simulations: u32,
    pub playoff_team_count: u32,
    pub simulated_weeks: u32,
    pub odds: Vec<PlayoffOdds>,
}

/// Everything one run produces.
#[derive(Debug, Clone, Serialize)]
pub struct LeagueReport {
    pub league_name: String,
    pub league_id: u64,
    pub season: u16,
    pub week: u32,
    pub generated_at: DateTime<Utc>,
    pub source: Option<SnapshotSource>,
    pub power_rankings: Vec<PowerRankingRow>,
    pub awards: SeasonAwards,
    pub playoffs: PlayoffSection,
    pub multiverse: Option<MultiverseView>,
    pub roi: RoiReport,
    pub narratives: Narratives,
}

/// Collect every view from a dashboard with a loaded snapshot.
///
/// The multiverse section is only present when `forced_winners` is
/// non-empty.
pub async fn build_report(
    dashboard: &Dashboard,
    forced_winners: &[String],
    generated_at: DateTime<Utc>,
) -> anyhow::Result<LeagueReport> {
    let snapshot = dashboard.snapshot()?;
    let sim = dashboard.playoff_simulation()?;

    let multiverse = if forced_winners.is_empty() {
        None
    } else {
        Some(dashboard.multiverse(forced_winners)?)
    };
    let narratives = dashboard.narratives(multiverse.as_ref()).await?;

    Ok(LeagueReport {
        league_name: dashboard.config().league.name.clone(),
        league_id: snapshot.league_id,
        season: snapshot.season,
        week: snapshot.current_week,
        generated_at,
        source: dashboard.source(),
        power_rankings: dashboard.power_rankings()?,
        awards: dashboard.season_awards()?,
        playoffs: PlayoffSection {
            simulations: sim.simulations,
            playoff_team_count: sim.playoff_team_count,
            simulated_weeks: sim.simulated_weeks,
            odds: dashboard.playoff_odds()?,
        },
        multiverse,
        roi: dashboard.roi()?,
        narratives,
    })
}

// ---------------------------------------------------------------------------
// CSV rows
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct PowerCsvRow<'a> {
    rank: usize,
    team: &'a str,
    wins: u32,
    losses: u32,
    points_for: f64,
    power_score: f64,
    true_wins: u32,
    total_matchups: u32,
    true_win_pct: String,
    luck: String,
}

#[derive(Serialize)]
struct OddsCsvRow<'a> {
    team: &'a str,
    qualifications: u32,
    playoff_pct: String,
    outlook: &'static str,
}

#[derive(Serialize)]
struct DraftCsvRow<'a> {
    player: &'a str,
    position: &'a str,
    team: &'a str,
    points: f64,
    round: Option<u32>,
    pick_overall: Option<u32>,
}

fn write_csv<T: Serialize>(path: &Path, rows: impl IntoIterator<Item = T>) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write row to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// File name prefix shared by every output of one run.
pub fn report_stem(report: &LeagueReport) -> String {
    format!("{}-{}-week{:02}", report.league_id, report.season, report.week)
}

/// Write the JSON report and CSV tables into `dir`, creating it if needed.
/// Returns the paths written.
pub fn write_report(report: &LeagueReport, dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create report directory {}", dir.display()))?;
    let stem = report_stem(report);

    let json_path = dir.join(format!("{stem}.json"));
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    fs::write(&json_path, json)
        .with_context(|| format!("failed to write {}", json_path.display()))?;

    let power_path = dir.join(format!("{stem}-power.csv"));
    write_csv(
        &power_path,
        report.power_rankings.iter().map(|r| PowerCsvRow {
            rank: r.rank,
            team: &r.team_name,
            wins: r.wins,
            losses: r.losses,
            points_for: r.points_for,
            power_score: r.power_score,
            true_wins: r.true_wins,
            total_matchups: r.total_matchups,
            true_win_pct: format!("{:.3}", r.true_win_pct),
            luck: format!("{:+.2}", r.luck),
        }),
    )?;

    let odds_path = dir.join(format!("{stem}-playoffs.csv"));
    write_csv(
        &odds_path,
        report.playoffs.odds.iter().map(|o| OddsCsvRow {
            team: &o.team_name,
            qualifications: o.qualifications,
            playoff_pct: format!("{:.1}", o.percent),
            outlook: o.outlook.label(),
        }),
    )?;

    let draft_path = dir.join(format!("{stem}-draft.csv"));
    write_csv(
        &draft_path,
        report.roi.draft_records.iter().map(|d| DraftCsvRow {
            player: &d.player_name,
            position: &d.position,
            team: &d.team_name,
            points: d.points,
            round: d.round,
            pick_overall: d.pick_overall,
        }),
    )?;

    info!("Wrote report {} to {}", stem, dir.display());
    Ok(vec![json_path, power_path, odds_path, draft_path])
}

/// Short plain-text summary for the terminal.
pub fn summary_text(report: &LeagueReport) -> String {
    let mut s = format!(
        "{}: week {} ({} season)\n",
        report.league_name, report.week, report.season
    );
    s.push_str("\nPower rankings\n");
    for row in &report.power_rankings {
        s.push_str(&format!(
            "  {:>2}. {:<24} {:>6.1}  luck {:+.1}\n",
            row.rank, row.team_name, row.power_score, row.luck
        ));
    }
    s.push_str("\nPlayoff odds\n");
    for odds in &report.playoffs.odds {
        s.push_str(&format!(
            "  {:<28} {:>5.1}%  {}\n",
            odds.team_name,
            odds.percent,
            odds.outlook.label()
        ));
    }
    if let Some(prescient) = &report.roi.prescient_one {
        s.push_str(&format!(
            "\nPrescient One: {} ({:.1} waiver pts)\n",
            prescient.team_name, prescient.waiver_points
        ));
    }
    s.push_str(&format!(
        "\n{}\n",
        report.narratives.power_rankings.text_or_offline_notice()
    ));
    s
}
