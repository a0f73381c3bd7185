// Prompt templates for league commentary.
//
// Each prompt carries the pre-computed analytics so the model writes prose
// around fixed numbers instead of doing arithmetic.

use huddle_football::awards::{GameAward, SeasonAwards, TeamAward};
use huddle_football::power::PowerRankingRow;
use huddle_football::simulation::{OddsShift, PlayoffOdds};

// ---------------------------------------------------------------------------
// System prompt
// ---------------------------------------------------------------------------

/// Shared system prompt for every commentary request.
pub fn system_prompt(league_name: &str) -> String {
    format!(
        "You are the league columnist for \"{league_name}\", a head-to-head fantasy football league.\n\
         \n\
         Write punchy, good-natured trash talk for the group chat. Name teams exactly as given.\n\
         Use the numbers provided and never invent statistics or do your own arithmetic.\n\
         Keep it under 250 words. Plain text, no markdown tables."
    )
}

// ---------------------------------------------------------------------------
// Power rankings column
// ---------------------------------------------------------------------------

/// Weekly power rankings column. Luck is called out explicitly so the model
/// can separate good teams from fortunate ones.
pub fn build_power_rankings_prompt(week: u32, rows: &[PowerRankingRow]) -> String {
    let mut prompt = String::with_capacity(1024);

    prompt.push_str(&format!("## POWER RANKINGS AFTER WEEK {week}\n"));
    prompt.push_str(&format_power_table(rows));
    prompt.push('\n');

    if let Some(luckiest) = rows
        .iter()
        .max_by(|a, b| a.luck.partial_cmp(&b.luck).unwrap_or(std::cmp::Ordering::Equal))
    {
        prompt.push_str(&format!(
            "Luckiest: {} (luck {:+.1})\n",
            luckiest.team_name, luckiest.luck
        ));
    }
    if let Some(unluckiest) = rows
        .iter()
        .min_by(|a, b| a.luck.partial_cmp(&b.luck).unwrap_or(std::cmp::Ordering::Equal))
    {
        prompt.push_str(&format!(
            "Unluckiest: {} (luck {:+.1})\n",
            unluckiest.team_name, unluckiest.luck
        ));
    }

    prompt.push_str(
        "\n## WRITE THE COLUMN\n\
         One or two sentences per team, top to bottom. Roast the lucky, console the unlucky.",
    );
    prompt
}

/// Power rankings as compact fixed-width lines.
pub fn format_power_table(rows: &[PowerRankingRow]) -> String {
    let mut s = String::new();
    for row in rows {
        s.push_str(&format!(
            "  {:>2}. {} ({}-{}) power {:.1} | all-play {}/{} ({:.0}%) | luck {:+.1}\n",
            row.rank,
            row.team_name,
            row.wins,
            row.losses,
            row.power_score,
            row.true_wins,
            row.total_matchups,
            row.true_win_pct * 100.0,
            row.luck,
        ));
    }
    s
}

// ---------------------------------------------------------------------------
// Awards ceremony
// ---------------------------------------------------------------------------

fn push_team_award(prompt: &mut String, title: &str, award: Option<&TeamAward>, unit: &str) {
    if let Some(a) = award {
        prompt.push_str(&format!("  {title}: {} ({:.1} {unit})\n", a.team_name, a.value));
    }
}

fn push_game_award(prompt: &mut String, title: &str, award: Option<&GameAward>) {
    if let Some(g) = award {
        prompt.push_str(&format!(
            "  {title}: week {} {} {:.1} - {} {:.1} (margin {:.1})\n",
            g.week, g.winner_name, g.winner_score, g.loser_name, g.loser_score, g.margin,
        ));
    }
}

/// Season awards ceremony script.
pub fn build_awards_prompt(week: u32, awards: &SeasonAwards) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str(&format!("## SEASON AWARDS THROUGH WEEK {week}\n"));

    if let Some(mvp) = &awards.mvp {
        prompt.push_str(&format!(
            "  MVP: {} ({}, {}) {:.1} pts\n",
            mvp.player_name, mvp.position, mvp.team_name, mvp.points
        ));
    }
    if let Some(oracle) = &awards.oracle {
        prompt.push_str(&format!(
            "  The Oracle (lineup efficiency): {} ({:.0}%)\n",
            oracle.team_name,
            oracle.value * 100.0
        ));
    }
    push_team_award(&mut prompt, "The Sniper (waiver points)", awards.sniper.as_ref(), "pts");
    push_team_award(&mut prompt, "Purple Heart (injury flags)", awards.purple.as_ref(), "flags");
    push_team_award(&mut prompt, "The Hoarder (bench points)", awards.hoarder.as_ref(), "pts");
    push_team_award(&mut prompt, "Toilet Bowl (fewest points)", awards.toilet.as_ref(), "pts");
    push_game_award(&mut prompt, "Biggest Blowout", awards.blowout.as_ref());
    push_game_award(&mut prompt, "Heartbreaker", awards.heartbreaker.as_ref());
    if let Some(high) = &awards.high_score {
        prompt.push_str(&format!(
            "  Single-Game High: {} {:.1} in week {}\n",
            high.team_name, high.score, high.week
        ));
    }

    if !awards.podium.is_empty() {
        prompt.push_str("\n## PODIUM\n");
        for entry in &awards.podium {
            prompt.push_str(&format!(
                "  {}. {} ({}-{}, {:.1} PF)\n",
                entry.place, entry.team_name, entry.wins, entry.losses, entry.points_for
            ));
        }
    }

    prompt.push_str(
        "\n## HOST THE CEREMONY\n\
         Present each award like a red-carpet announcer. Skip awards not listed.",
    );
    prompt
}

// ---------------------------------------------------------------------------
// Playoff outlook
// ---------------------------------------------------------------------------

/// Playoff race preview from simulated odds.
pub fn build_playoff_outlook_prompt(
    week: u32,
    playoff_team_count: u32,
    simulations: u32,
    odds: &[PlayoffOdds],
) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str(&format!(
        "## PLAYOFF ODDS ENTERING WEEK {week}\n\
         {playoff_team_count} playoff spots, {simulations} simulated seasons.\n"
    ));
    for row in odds {
        prompt.push_str(&format!(
            "  {} {:.1}% [{}]\n",
            row.team_name,
            row.percent,
            row.outlook.label()
        ));
    }
    prompt.push_str(
        "\n## PREVIEW THE RACE\n\
         Who is safe, who is sweating, and who needs a miracle?",
    );
    prompt
}

// ---------------------------------------------------------------------------
// Multiverse comparison
// ---------------------------------------------------------------------------

/// What-if comparison between the baseline and a forced-winner scenario.
/// Teams are listed by largest swing first.
pub fn build_multiverse_prompt(forced_winners: &[String], shifts: &[OddsShift]) -> String {
    let mut prompt = String::with_capacity(1024);
    prompt.push_str("## MULTIVERSE SCENARIO\n");
    if forced_winners.is_empty() {
        prompt.push_str("  No forced results; this is the baseline timeline.\n");
    } else {
        prompt.push_str(&format!("  Forced winners this week: {}\n", forced_winners.join(", ")));
    }

    let mut sorted: Vec<&OddsShift> = shifts.iter().collect();
    sorted.sort_by(|a, b| {
        b.delta
            .abs()
            .partial_cmp(&a.delta.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    prompt.push_str("\n## ODDS SHIFT\n");
    for s in sorted {
        prompt.push_str(&format!(
            "  {} {:.1}% -> {:.1}% ({:+.1} pts)\n",
            s.team_name,
            s.before * 100.0,
            s.after * 100.0,
            s.delta * 100.0,
        ));
    }
    prompt.push_str(
        "\n## NARRATE THE TIMELINE\n\
         Explain who gains and who loses if these results happen.",
    );
    prompt
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use huddle_football::awards::{HighScore, PlayerAward, PodiumEntry};
    use huddle_football::simulation::PlayoffOutlook;

    fn row(rank: usize, name: &str, luck: f64) -> PowerRankingRow {
        PowerRankingRow {
            rank,
            team_id: rank as u32,
            team_name: name.to_string(),
            logo_url: String::new(),
            wins: 4,
            losses: 2,
            points_for: 720.0,
            power_score: 120.0,
            true_wins: 30,
            total_matchups: 54,
            true_win_pct: 30.0 / 54.0,
            actual_win_pct: 4.0 / 6.0,
            luck,
        }
    }

    fn empty_awards() -> SeasonAwards {
        SeasonAwards {
            mvp: None,
            oracle: None,
            sniper: None,
            purple: None,
            hoarder: None,
            toilet: None,
            blowout: None,
            heartbreaker: None,
            high_score: None,
            podium: vec![],
            best_manager: None,
            team_totals: vec![],
        }
    }

    #[test]
    fn system_prompt_names_league() {
        let p = system_prompt("Gridiron Guild");
        assert!(p.contains("\"Gridiron Guild\""));
        assert!(p.contains("never invent statistics"));
    }

    #[test]
    fn power_prompt_lists_every_team_and_luck_extremes() {
        let rows = vec![row(1, "Aces", 2.5), row(2, "Bruisers", -1.5), row(3, "Comets", 0.0)];
        let p = build_power_rankings_prompt(6, &rows);
        assert!(p.starts_with("## POWER RANKINGS AFTER WEEK 6"));
        for name in ["Aces", "Bruisers", "Comets"] {
            assert!(p.contains(name));
        }
        assert!(p.contains("Luckiest: Aces (luck +2.5)"));
        assert!(p.contains("Unluckiest: Bruisers (luck -1.5)"));
        assert!(p.contains("all-play 30/54"));
    }

    #[test]
    fn power_prompt_handles_empty_table() {
        let p = build_power_rankings_prompt(0, &[]);
        assert!(!p.contains("Luckiest"));
        assert!(p.contains("## WRITE THE COLUMN"));
    }

    #[test]
    fn awards_prompt_includes_present_awards_only() {
        let mut awards = empty_awards();
        awards.mvp = Some(PlayerAward {
            player_id: 1,
            player_name: "Star Back".to_string(),
            position: "RB".to_string(),
            team_id: 1,
            team_name: "Aces".to_string(),
            points: 75.0,
        });
        awards.hoarder = Some(TeamAward {
            team_id: 2,
            team_name: "Bruisers".to_string(),
            value: 50.0,
        });
        awards.heartbreaker = Some(GameAward {
            week: 3,
            winner_id: 1,
            winner_name: "Aces".to_string(),
            winner_score: 101.0,
            loser_id: 2,
            loser_name: "Bruisers".to_string(),
            loser_score: 100.0,
            margin: 1.0,
        });
        awards.high_score = Some(HighScore {
            week: 2,
            team_id: 2,
            team_name: "Bruisers".to_string(),
            score: 140.0,
        });
        awards.podium = vec![PodiumEntry {
            place: 1,
            team_id: 1,
            team_name: "Aces".to_string(),
            wins: 5,
            losses: 1,
            points_for: 700.0,
        }];

        let p = build_awards_prompt(6, &awards);
        assert!(p.contains("MVP: Star Back (RB, Aces) 75.0 pts"));
        assert!(p.contains("The Hoarder (bench points): Bruisers (50.0 pts)"));
        assert!(p.contains("Heartbreaker: week 3 Aces 101.0 - Bruisers 100.0 (margin 1.0)"));
        assert!(p.contains("Single-Game High: Bruisers 140.0 in week 2"));
        assert!(p.contains("1. Aces (5-1, 700.0 PF)"));
        assert!(!p.contains("Sniper"));
        assert!(!p.contains("Blowout"));
    }

    #[test]
    fn playoff_prompt_shows_labels() {
        let odds = vec![PlayoffOdds {
            team_id: 1,
            team_name: "Aces".to_string(),
            qualifications: 995,
            probability: 0.995,
            percent: 99.5,
            outlook: PlayoffOutlook::Locked,
        }];
        let p = build_playoff_outlook_prompt(9, 4, 1000, &odds);
        assert!(p.contains("4 playoff spots, 1000 simulated seasons."));
        assert!(p.contains("Aces 99.5% [Locked]"));
    }

    #[test]
    fn multiverse_prompt_orders_by_swing() {
        let shifts = vec![
            OddsShift {
                team_id: 1,
                team_name: "Steady".to_string(),
                before: 0.5,
                after: 0.52,
                delta: 0.02,
            },
            OddsShift {
                team_id: 2,
                team_name: "Sinking".to_string(),
                before: 0.6,
                after: 0.2,
                delta: -0.4,
            },
        ];
        let p = build_multiverse_prompt(&["Rising".to_string()], &shifts);
        assert!(p.contains("Forced winners this week: Rising"));
        let sinking = p.find("Sinking").unwrap();
        let steady = p.find("Steady").unwrap();
        assert!(sinking < steady);
        assert!(p.contains("Sinking 60.0% -> 20.0% (-40.0 pts)"));

        let baseline = build_multiverse_prompt(&[], &[]);
        assert!(baseline.contains("baseline timeline"));
    }
}
