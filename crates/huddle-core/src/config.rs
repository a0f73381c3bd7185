// Configuration loading and parsing (league.toml, analysis.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub analysis: AnalysisConfig,
    pub credentials: CredentialsConfig,
    pub db_path: String,
    pub report_dir: String,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[league]` table in league.toml.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
}

/// Where league data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// ESPN fantasy football v3 API.
    Espn,
    /// A serialized snapshot on disk.
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    pub platform: Platform,
    pub league_id: u64,
    pub season: u16,
    pub num_teams: usize,
    /// Snapshot JSON path, required when `platform = "file"`.
    #[serde(default)]
    pub snapshot_path: Option<String>,
    /// Overrides the playoff slot count reported by the host.
    #[serde(default)]
    pub playoff_team_count: Option<u32>,
}

// ---------------------------------------------------------------------------
// analysis.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire analysis.toml file.
#[derive(Debug, Clone, Deserialize)]
struct AnalysisFile {
    simulation: SimulationConfig,
    #[serde(default)]
    multiverse: MultiverseConfig,
    cache: CacheConfig,
    llm: LlmConfig,
    database: DatabaseSection,
    report: ReportSection,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ReportSection {
    output_dir: String,
}

/// The public analysis config assembled from the analysis.toml sections.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub simulation: SimulationConfig,
    pub multiverse: MultiverseConfig,
    pub cache: CacheConfig,
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    pub simulations: u32,
    /// Fixed RNG seed for reproducible runs. Entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MultiverseConfig {
    /// Team names forced to win their current-week game.
    #[serde(default)]
    pub forced_winners: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub enabled: bool,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub anthropic_api_key: Option<String>,
    /// ESPN `espn_s2` cookie for private leagues.
    pub espn_s2: Option<String>,
    /// ESPN `SWID` cookie for private leagues.
    pub swid: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml`,
/// `config/analysis.toml`, and (optionally) `config/credentials.toml`,
/// all relative to the given `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- league.toml (required) ---
    let league_path = config_dir.join("league.toml");
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;
    let league = league_file.league;

    // --- analysis.toml (required) ---
    let analysis_path = config_dir.join("analysis.toml");
    let analysis_text = read_file(&analysis_path)?;
    let analysis_file: AnalysisFile =
        toml::from_str(&analysis_text).map_err(|e| ConfigError::ParseError {
            path: analysis_path.clone(),
            source: e,
        })?;

    let analysis = AnalysisConfig {
        simulation: analysis_file.simulation,
        multiverse: analysis_file.multiverse,
        cache: analysis_file.cache,
        llm: analysis_file.llm,
    };
    let db_path = analysis_file.database.path;
    let report_dir = analysis_file.report.output_dir;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        league,
        analysis,
        credentials,
        db_path,
        report_dir,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };

        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Never clobber a user's edited config.
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let league = &config.league;
    if league.num_teams < 2 {
        return Err(invalid("league.num_teams", "must be at least 2"));
    }
    if league.league_id == 0 {
        return Err(invalid("league.league_id", "must be greater than 0"));
    }
    if league.platform == Platform::File
        && league.snapshot_path.as_deref().map_or(true, |p| p.trim().is_empty())
    {
        return Err(invalid(
            "league.snapshot_path",
            "required when platform = \"file\"",
        ));
    }
    if let Some(slots) = league.playoff_team_count {
        if slots == 0 || slots as usize > league.num_teams {
            return Err(invalid(
                "league.playoff_team_count",
                format!("must be between 1 and {}, got {slots}", league.num_teams),
            ));
        }
    }

    let analysis = &config.analysis;
    if analysis.simulation.simulations == 0 {
        return Err(invalid("simulation.simulations", "must be > 0"));
    }
    if analysis.cache.ttl_secs == 0 {
        return Err(invalid("cache.ttl_secs", "must be > 0"));
    }
    if analysis.llm.max_tokens == 0 {
        return Err(invalid("llm.max_tokens", "must be > 0"));
    }
    if analysis.llm.timeout_secs == 0 {
        return Err(invalid("llm.timeout_secs", "must be > 0"));
    }
    if analysis
        .multiverse
        .forced_winners
        .iter()
        .any(|name| name.trim().is_empty())
    {
        return Err(invalid("multiverse.forced_winners", "team names must not be blank"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
