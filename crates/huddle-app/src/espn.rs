// ESPN fantasy football (v3 JSON API) snapshot provider.
//
// Each trait call fetches the league document with the views it needs and
// decodes it into core types. Decoding lives in free functions over
// `serde_json::Value` so it can be tested against canned payloads.

use async_trait::async_trait;
use huddle_core::league::{
    Acquisition, BoxScoreGame, DraftSlot, InjuryStatus, LeagueSettings, LineupEntry, LineupSlot,
    Team,
};
use huddle_core::provider::{ProviderError, SnapshotProvider};
use serde_json::Value;
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const ESPN_API_BASE: &str = "https://lm-api-reads.fantasy.espn.com/apis/v3/games/ffl";

/// ESPN lineup slot ids for the bench and injured reserve.
const SLOT_BENCH: u64 = 20;
const SLOT_IR: u64 = 21;

/// Fallback when ESPN omits the regular-season length.
const DEFAULT_REGULAR_SEASON_WEEKS: u32 = 14;

/// ESPN `defaultPositionId` to display position.
fn position_name(id: u64) -> &'static str {
    match id {
        1 => "QB",
        2 => "RB",
        3 => "WR",
        4 => "TE",
        5 => "K",
        16 => "D/ST",
        _ => "FLEX",
    }
}

// ---------------------------------------------------------------------------
// EspnProvider
// ---------------------------------------------------------------------------

/// Reads one ESPN league season. Private leagues need the `espn_s2` and
/// `SWID` cookies from a logged-in browser session.
pub struct EspnProvider {
    http: reqwest::Client,
    league_id: u64,
    season: u16,
    cookie: Option<String>,
    base_url: String,
}

impl EspnProvider {
    pub fn new(league_id: u64, season: u16, espn_s2: Option<&str>, swid: Option<&str>) -> Self {
        let cookie = match (espn_s2, swid) {
            (Some(s2), Some(swid)) if !s2.is_empty() && !swid.is_empty() => {
                Some(format!("espn_s2={s2}; SWID={swid}"))
            }
            _ => None,
        };
        Self {
            http: reqwest::Client::new(),
            league_id,
            season,
            cookie,
            base_url: ESPN_API_BASE.to_string(),
        }
    }

    /// Override the API root (everything before `/seasons/...`).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn league_url(&self) -> String {
        format!(
            "{}/seasons/{}/segments/0/leagues/{}",
            self.base_url, self.season, self.league_id
        )
    }

    async fn fetch(&self, views: &[&str], scoring_period: Option<u32>) -> Result<Value, ProviderError> {
        let url = self.league_url();
        let mut query: Vec<(&str, String)> = views.iter().map(|v| ("view", v.to_string())).collect();
        if let Some(week) = scoring_period {
            query.push(("scoringPeriodId", week.to_string()));
        }

        let mut request = self.http.get(&url).query(&query);
        if let Some(cookie) = &self.cookie {
            request = request.header(reqwest::header::COOKIE, cookie);
        }

        debug!(?views, ?scoring_period, "ESPN request");
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::Unauthorized {
                league_id: self.league_id,
            });
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))
    }
}

#[async_trait]
impl SnapshotProvider for EspnProvider {
    async fn teams(&self) -> Result<Vec<Team>, ProviderError> {
        let doc = self.fetch(&["mTeam"], None).await?;
        decode_teams(&doc)
    }

    async fn box_scores(&self, week: u32) -> Result<Vec<BoxScoreGame>, ProviderError> {
        let doc = self
            .fetch(&["mMatchupScore", "mBoxscore"], Some(week))
            .await?;
        decode_box_scores(&doc, week)
    }

    async fn settings(&self) -> Result<LeagueSettings, ProviderError> {
        let doc = self.fetch(&["mSettings"], None).await?;
        Ok(decode_settings(&doc))
    }

    async fn current_week(&self) -> Result<u32, ProviderError> {
        let doc = self.fetch(&["mStatus"], None).await?;
        decode_current_week(&doc)
    }

    async fn draft_slots(&self) -> Result<Vec<DraftSlot>, ProviderError> {
        let doc = self.fetch(&["mDraftDetail"], None).await?;
        Ok(decode_draft(&doc))
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn missing(field: &str) -> ProviderError {
    ProviderError::Decode(format!("missing or invalid `{field}`"))
}

fn u32_at(v: &Value, key: &str) -> Option<u32> {
    v.get(key)?.as_u64().map(|n| n as u32)
}

fn f64_at(v: &Value, key: &str) -> f64 {
    v.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// Team display name: `name` on current seasons, `location nickname` on
/// older ones.
fn team_name(team: &Value, id: u32) -> String {
    if let Some(name) = team.get("name").and_then(Value::as_str) {
        if !name.trim().is_empty() {
            return name.trim().to_string();
        }
    }
    let location = team.get("location").and_then(Value::as_str).unwrap_or("");
    let nickname = team.get("nickname").and_then(Value::as_str).unwrap_or("");
    let joined = format!("{location} {nickname}").trim().to_string();
    if joined.is_empty() {
        format!("Team {id}")
    } else {
        joined
    }
}

/// Decode `teams[]` with their overall records.
pub fn decode_teams(doc: &Value) -> Result<Vec<Team>, ProviderError> {
    let teams = doc
        .get("teams")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("teams"))?;

    teams
        .iter()
        .map(|t| {
            let id = u32_at(t, "id").ok_or_else(|| missing("teams[].id"))?;
            let overall = t.get("record").and_then(|r| r.get("overall"));
            let (wins, losses, ties, points_for) = match overall {
                Some(o) => (
                    u32_at(o, "wins").unwrap_or(0),
                    u32_at(o, "losses").unwrap_or(0),
                    u32_at(o, "ties").unwrap_or(0),
                    f64_at(o, "pointsFor"),
                ),
                None => (0, 0, 0, 0.0),
            };
            Ok(Team {
                id,
                name: team_name(t, id),
                wins,
                losses,
                ties,
                points_for,
                logo_url: t.get("logo").and_then(Value::as_str).map(str::to_string),
            })
        })
        .collect()
}

/// Decode `settings.scheduleSettings`. Missing values fall back to defaults
/// rather than failing.
pub fn decode_settings(doc: &Value) -> LeagueSettings {
    let schedule = doc
        .get("settings")
        .and_then(|s| s.get("scheduleSettings"));
    let regular_season_weeks = schedule
        .and_then(|s| u32_at(s, "matchupPeriodCount"))
        .unwrap_or_else(|| {
            warn!("matchupPeriodCount missing; assuming {DEFAULT_REGULAR_SEASON_WEEKS} weeks");
            DEFAULT_REGULAR_SEASON_WEEKS
        });
    LeagueSettings {
        regular_season_weeks,
        playoff_team_count: schedule.and_then(|s| u32_at(s, "playoffTeamCount")),
    }
}

/// Decode `status.currentMatchupPeriod`, falling back to `scoringPeriodId`.
pub fn decode_current_week(doc: &Value) -> Result<u32, ProviderError> {
    doc.get("status")
        .and_then(|s| u32_at(s, "currentMatchupPeriod"))
        .or_else(|| u32_at(doc, "scoringPeriodId"))
        .ok_or_else(|| missing("status.currentMatchupPeriod"))
}

fn decode_entry(entry: &Value) -> Option<LineupEntry> {
    let player_id = entry.get("playerId")?.as_u64()?;
    let pool = entry.get("playerPoolEntry");
    let player = pool.and_then(|p| p.get("player"));

    let slot = match entry.get("lineupSlotId").and_then(Value::as_u64) {
        Some(SLOT_BENCH) => LineupSlot::Bench,
        Some(SLOT_IR) => LineupSlot::InjuredReserve,
        _ => LineupSlot::Starter,
    };

    Some(LineupEntry {
        player_id,
        player_name: player
            .and_then(|p| p.get("fullName"))
            .and_then(Value::as_str)
            .unwrap_or("Unknown Player")
            .to_string(),
        position: player
            .and_then(|p| p.get("defaultPositionId"))
            .and_then(Value::as_u64)
            .map(position_name)
            .unwrap_or("FLEX")
            .to_string(),
        points: pool.map(|p| f64_at(p, "appliedStatTotal")).unwrap_or(0.0),
        slot,
        acquisition: Acquisition::from_code(
            entry
                .get("acquisitionType")
                .and_then(Value::as_str)
                .unwrap_or(""),
        ),
        injury_status: InjuryStatus::from_code(
            player
                .and_then(|p| p.get("injuryStatus"))
                .and_then(Value::as_str)
                .unwrap_or(""),
        ),
    })
}

fn decode_lineup(side: &Value) -> Vec<LineupEntry> {
    side.get("rosterForCurrentScoringPeriod")
        .and_then(|r| r.get("entries"))
        .and_then(Value::as_array)
        .map(|entries| entries.iter().filter_map(decode_entry).collect())
        .unwrap_or_default()
}

/// Decode the `schedule[]` matchups for `week`. Byes (no away side) are
/// skipped.
pub fn decode_box_scores(doc: &Value, week: u32) -> Result<Vec<BoxScoreGame>, ProviderError> {
    let schedule = doc
        .get("schedule")
        .and_then(Value::as_array)
        .ok_or_else(|| missing("schedule"))?;

    let mut games = Vec::new();
    for matchup in schedule {
        if u32_at(matchup, "matchupPeriodId") != Some(week) {
            continue;
        }
        let (Some(home), Some(away)) = (matchup.get("home"), matchup.get("away")) else {
            continue;
        };
        let home_team = u32_at(home, "teamId").ok_or_else(|| missing("schedule[].home.teamId"))?;
        let away_team = u32_at(away, "teamId").ok_or_else(|| missing("schedule[].away.teamId"))?;

        games.push(BoxScoreGame {
            week,
            home_team,
            away_team,
            home_score: f64_at(home, "totalPoints"),
            away_score: f64_at(away, "totalPoints"),
            home_lineup: decode_lineup(home),
            away_lineup: decode_lineup(away),
        });
    }
    Ok(games)
}

/// Decode `draftDetail.picks[]`. Leagues without a completed draft yield an
/// empty list.
pub fn decode_draft(doc: &Value) -> Vec<DraftSlot> {
    doc.get("draftDetail")
        .and_then(|d| d.get("picks"))
        .and_then(Value::as_array)
        .map(|picks| {
            picks
                .iter()
                .filter_map(|p| {
                    Some(DraftSlot {
                        player_id: p.get("playerId")?.as_u64()?,
                        team_id: u32_at(p, "teamId")?,
                        round: u32_at(p, "roundId"),
                        pick_overall: u32_at(p, "overallPickNumber"),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn teams_decode_records_and_names() {
        let doc = json!({
            "teams": [
                {
                    "id": 1,
                    "name": "Gronk's Angels",
                    "logo": "https://example.com/1.png",
                    "record": { "overall": { "wins": 4, "losses": 2, "ties": 0, "pointsFor": 701.5 } }
                },
                {
                    "id": 2,
                    "location": "Mile High",
                    "nickname": "Mayhem",
                    "record": { "overall": { "wins": 2, "losses": 4, "pointsFor": 612.25 } }
                },
                { "id": 3 }
            ]
        });
        let teams = decode_teams(&doc).unwrap();
        assert_eq!(teams.len(), 3);
        assert_eq!(teams[0].name, "Gronk's Angels");
        assert_eq!(teams[0].wins, 4);
        assert_eq!(teams[0].points_for, 701.5);
        assert_eq!(teams[0].logo_or_default(), "https://example.com/1.png");
        assert_eq!(teams[1].name, "Mile High Mayhem");
        assert_eq!(teams[1].ties, 0);
        assert_eq!(teams[2].name, "Team 3");
        assert_eq!(teams[2].points_for, 0.0);
    }

    #[test]
    fn teams_require_array_and_ids() {
        assert!(matches!(decode_teams(&json!({})), Err(ProviderError::Decode(_))));
        assert!(decode_teams(&json!({ "teams": [{ "name": "No Id" }] })).is_err());
    }

    #[test]
    fn settings_decode_with_fallbacks() {
        let doc = json!({
            "settings": { "scheduleSettings": { "matchupPeriodCount": 15, "playoffTeamCount": 6 } }
        });
        let settings = decode_settings(&doc);
        assert_eq!(settings.regular_season_weeks, 15);
        assert_eq!(settings.playoff_slots(), 6);

        let bare = decode_settings(&json!({}));
        assert_eq!(bare.regular_season_weeks, DEFAULT_REGULAR_SEASON_WEEKS);
        assert_eq!(bare.playoff_team_count, None);
        assert_eq!(bare.playoff_slots(), 4);
    }

    #[test]
    fn current_week_prefers_matchup_period() {
        let doc = json!({ "scoringPeriodId": 9, "status": { "currentMatchupPeriod": 8 } });
        assert_eq!(decode_current_week(&doc).unwrap(), 8);
        assert_eq!(decode_current_week(&json!({ "scoringPeriodId": 3 })).unwrap(), 3);
        assert!(decode_current_week(&json!({})).is_err());
    }

    #[test]
    fn box_scores_decode_lineups_and_skip_byes() {
        let doc = json!({
            "schedule": [
                {
                    "matchupPeriodId": 3,
                    "home": {
                        "teamId": 1,
                        "totalPoints": 121.4,
                        "rosterForCurrentScoringPeriod": { "entries": [
                            {
                                "playerId": 3916387,
                                "lineupSlotId": 0,
                                "acquisitionType": "DRAFT",
                                "playerPoolEntry": {
                                    "appliedStatTotal": 28.5,
                                    "player": { "fullName": "Lamar Jackson", "defaultPositionId": 1, "injuryStatus": "ACTIVE" }
                                }
                            },
                            {
                                "playerId": 4241478,
                                "lineupSlotId": 20,
                                "acquisitionType": "ADD",
                                "playerPoolEntry": {
                                    "appliedStatTotal": 11.0,
                                    "player": { "fullName": "Bench Guy", "defaultPositionId": 3, "injuryStatus": "QUESTIONABLE" }
                                }
                            },
                            {
                                "playerId": 15847,
                                "lineupSlotId": 21,
                                "acquisitionType": "TRADE",
                                "playerPoolEntry": {
                                    "appliedStatTotal": 0.0,
                                    "player": { "fullName": "Hurt Guy", "defaultPositionId": 2, "injuryStatus": "INJURY_RESERVE" }
                                }
                            }
                        ]}
                    },
                    "away": { "teamId": 2, "totalPoints": 98.1 }
                },
                { "matchupPeriodId": 3, "home": { "teamId": 3, "totalPoints": 110.0 } },
                { "matchupPeriodId": 4, "home": { "teamId": 1 }, "away": { "teamId": 3 } }
            ]
        });

        let games = decode_box_scores(&doc, 3).unwrap();
        assert_eq!(games.len(), 1);
        let g = &games[0];
        assert_eq!((g.home_team, g.away_team), (1, 2));
        assert_eq!(g.home_score, 121.4);
        assert!(g.away_lineup.is_empty());

        let lineup = &g.home_lineup;
        assert_eq!(lineup.len(), 3);
        assert_eq!(lineup[0].player_name, "Lamar Jackson");
        assert_eq!(lineup[0].position, "QB");
        assert_eq!(lineup[0].slot, LineupSlot::Starter);
        assert_eq!(lineup[0].acquisition, Acquisition::Draft);
        assert_eq!(lineup[1].slot, LineupSlot::Bench);
        assert_eq!(lineup[1].acquisition, Acquisition::Waiver);
        assert_eq!(lineup[1].injury_status, InjuryStatus::Questionable);
        assert_eq!(lineup[2].slot, LineupSlot::InjuredReserve);
        assert_eq!(lineup[2].acquisition, Acquisition::Trade);
        assert!(lineup[2].injury_status.is_unavailable());
    }

    #[test]
    fn box_scores_require_schedule() {
        assert!(decode_box_scores(&json!({}), 1).is_err());
        assert!(decode_box_scores(&json!({ "schedule": [] }), 1).unwrap().is_empty());
    }

    #[test]
    fn draft_picks_decode() {
        let doc = json!({
            "draftDetail": { "picks": [
                { "playerId": 3916387, "teamId": 1, "roundId": 1, "overallPickNumber": 4 },
                { "playerId": 4241478, "teamId": 2 },
                { "teamId": 2, "roundId": 2 }
            ]}
        });
        let picks = decode_draft(&doc);
        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].round, Some(1));
        assert_eq!(picks[0].pick_overall, Some(4));
        assert_eq!(picks[1].round, None);
        assert!(decode_draft(&json!({})).is_empty());
    }

    #[test]
    fn cookie_requires_both_credentials() {
        assert!(EspnProvider::new(1, 2024, Some("s2"), Some("{SWID}")).cookie.is_some());
        assert!(EspnProvider::new(1, 2024, Some("s2"), None).cookie.is_none());
        assert!(EspnProvider::new(1, 2024, Some(""), Some("{SWID}")).cookie.is_none());
    }

    #[tokio::test]
    async fn private_league_maps_to_unauthorized() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let body = r#"{"messages":["You are not authorized to view this League."]}"#;
            let response = format!(
                "HTTP/1.1 401 Unauthorized\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
        });

        let provider = EspnProvider::new(777, 2024, None, None).with_base_url(format!("http://{addr}"));
        let err = provider.teams().await.unwrap_err();
        assert!(matches!(err, ProviderError::Unauthorized { league_id: 777 }));
        let _ = server.await;
    }

    #[tokio::test]
    async fn fetches_and_decodes_status() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 4096];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();
            let body = r#"{"status":{"currentMatchupPeriod":7}}"#;
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.flush().await.unwrap();
            request
        });

        let provider = EspnProvider::new(42, 2024, Some("abc"), Some("{XYZ}"))
            .with_base_url(format!("http://{addr}"));
        assert_eq!(provider.current_week().await.unwrap(), 7);

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /seasons/2024/segments/0/leagues/42?view=mStatus"));
        assert!(request.to_lowercase().contains("cookie: espn_s2=abc; swid={xyz}"));
    }
}
