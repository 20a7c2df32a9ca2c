// Configuration loading and parsing (predictor.toml, ballparks.toml,
// players.toml, credentials.toml).

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::ballpark::BallparkTable;
use crate::player::{normalize_name, PlayerId};
use crate::scoring::ScoringRules;
use crate::statcast::MAX_WINDOW_DAYS;

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
    pub prediction: PredictionConfig,
    pub weather: WeatherConfig,
    pub providers: ProvidersConfig,
    pub ballparks: BallparkTable,
    pub players: PlayerTables,
    pub credentials: CredentialsConfig,
}

impl Config {
    pub fn scoring_rules(&self) -> ScoringRules {
        ScoringRules {
            min_events: self.prediction.min_events,
            fly_ball_launch_angle: self.prediction.fly_ball_launch_angle,
            pull_hc_x_threshold: self.prediction.pull_hc_x_threshold,
        }
    }
}

// ---------------------------------------------------------------------------
// predictor.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire predictor.toml file.
#[derive(Debug, Clone, Deserialize)]
struct PredictorFile {
    prediction: PredictionConfig,
    weather: WeatherConfig,
    providers: ProvidersConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictionConfig {
    /// Players scored when none are given on the command line.
    pub players: Vec<String>,
    /// Lookback window for batted-ball events, in days.
    pub window_days: u32,
    pub min_events: usize,
    pub fly_ball_launch_angle: f64,
    pub pull_hc_x_threshold: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    pub endpoint: String,
    pub fallback_wind_mph: f64,
    pub fallback_temp_f: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    pub statcast_url: String,
    pub register_base_url: String,
}

// ---------------------------------------------------------------------------
// ballparks.toml / players.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[ballparks]` table in ballparks.toml.
#[derive(Debug, Clone, Deserialize)]
struct BallparksFile {
    ballparks: BallparkTable,
}

/// Static player tables from players.toml.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerTables {
    /// Normalized name -> MLBAM id, consulted before the external directory.
    #[serde(default)]
    pub overrides: HashMap<String, PlayerId>,
    /// Normalized name -> decimal odds multiplier (placeholder odds).
    #[serde(default)]
    pub odds: HashMap<String, f64>,
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub openweather_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/predictor.toml`,
/// `config/ballparks.toml`, `config/players.toml` and (optionally)
/// `config/credentials.toml`, all relative to `base_dir`.
///
/// Does not copy defaults; see [`load_config`].
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- predictor.toml (required) ---
    let predictor: PredictorFile = read_toml(&config_dir.join("predictor.toml"))?;

    // --- ballparks.toml (required) ---
    let ballparks: BallparksFile = read_toml(&config_dir.join("ballparks.toml"))?;

    // --- players.toml (required) ---
    let players: PlayerTables = read_toml(&config_dir.join("players.toml"))?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        read_toml(&credentials_path)?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        prediction: predictor.prediction,
        weather: predictor.weather,
        providers: predictor.providers,
        ballparks: ballparks.ballparks,
        players,
        credentials,
    };

    validate(&config)?;

    Ok(config)
}

/// Copy every file in `defaults/` that is missing from `config/`, skipping
/// `*.example` templates. Returns the paths written, sorted.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.is_dir() {
        if config_dir.is_dir() {
            return Ok(Vec::new());
        }
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no defaults/ or config/ directory in {}; pass --base-dir",
                base_dir.display()
            ),
        });
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| copy_error("create", &config_dir, e))?;
    let entries =
        std::fs::read_dir(&defaults_dir).map_err(|e| copy_error("read", &defaults_dir, e))?;

    let mut copied = Vec::new();
    for entry in entries.flatten() {
        let source = entry.path();
        let Some(name) = source.file_name() else {
            continue;
        };
        let target = config_dir.join(name);
        let template = source.extension().is_some_and(|ext| ext == "example");
        if template || !source.is_file() || target.exists() {
            continue;
        }
        std::fs::copy(&source, &target).map_err(|e| copy_error("copy", &source, e))?;
        copied.push(target);
    }

    copied.sort();
    Ok(copied)
}

/// Copy missing defaults into `base_dir/config`, then load from there.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })?;
    toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn copy_error(action: &str, path: &Path, err: std::io::Error) -> ConfigError {
    ConfigError::DefaultsCopyError {
        message: format!("failed to {action} {}: {err}", path.display()),
    }
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let p = &config.prediction;
    let days = p.window_days;
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(invalid(
            "prediction.window_days",
            format!("must be between 1 and {MAX_WINDOW_DAYS}, got {days}"),
        ));
    }
    if p.min_events == 0 {
        return Err(invalid("prediction.min_events", "must be greater than 0"));
    }
    for (name, val) in [
        ("prediction.fly_ball_launch_angle", p.fly_ball_launch_angle),
        ("prediction.pull_hc_x_threshold", p.pull_hc_x_threshold),
        ("weather.fallback_wind_mph", config.weather.fallback_wind_mph),
        ("weather.fallback_temp_f", config.weather.fallback_temp_f),
    ] {
        if !val.is_finite() {
            return Err(invalid(name, format!("must be finite, got {val}")));
        }
    }

    if config.ballparks.is_empty() {
        return Err(invalid("ballparks", "at least one ballpark is required"));
    }
    for (name, park) in config.ballparks.iter() {
        if !(park.hr_factor.is_finite() && park.hr_factor > 0.0) {
            return Err(invalid(
                format!("ballparks.\"{name}\".hr_factor"),
                format!("must be > 0, got {}", park.hr_factor),
            ));
        }
        if !(-90.0..=90.0).contains(&park.lat) {
            return Err(invalid(
                format!("ballparks.\"{name}\".lat"),
                format!("must be between -90 and 90, got {}", park.lat),
            ));
        }
        if !(-180.0..=180.0).contains(&park.lon) {
            return Err(invalid(
                format!("ballparks.\"{name}\".lon"),
                format!("must be between -180 and 180, got {}", park.lon),
            ));
        }
    }

    let tables = &config.players;
    for name in tables.overrides.keys().chain(tables.odds.keys()) {
        if normalize_name(name) != *name {
            return Err(invalid(
                format!("players.\"{name}\""),
                "names must be lowercase with single spaces",
            ));
        }
    }
    for (name, odds) in &tables.odds {
        if !(odds.is_finite() && *odds > 0.0) {
            return Err(invalid(
                format!("odds.\"{name}\""),
                format!("must be > 0, got {odds}"),
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Workspace root, where `defaults/` lives.
    fn project_root() -> PathBuf {
        let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let root = manifest.join("../..");
        assert!(
            root.join("defaults").exists(),
            "Cannot locate defaults/ directory from {:?}",
            manifest
        );
        root
    }

    /// Fresh temp dir with `config/` populated from the project defaults.
    fn temp_base(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(format!("hrcast_config_{name}"));
        let _ = fs::remove_dir_all(&tmp);
        let config_dir = tmp.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        let defaults = project_root().join("defaults");
        for file in ["predictor.toml", "ballparks.toml", "players.toml"] {
            fs::copy(defaults.join(file), config_dir.join(file)).unwrap();
        }
        tmp
    }

    fn replace_in(path: &Path, from: &str, to: &str) {
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains(from), "{from:?} not in {}", path.display());
        fs::write(path, text.replace(from, to)).unwrap();
    }

    #[test]
    fn load_valid_config_from_defaults() {
        let tmp = temp_base("valid");
        let config = load_config_from(&tmp).expect("should load valid config");

        assert_eq!(config.prediction.players.len(), 5);
        assert_eq!(config.prediction.players[0], "Aaron Judge");
        assert_eq!(config.prediction.window_days, 30);
        assert_eq!(config.prediction.min_events, 5);
        assert_eq!(config.scoring_rules(), ScoringRules::default());

        assert!((config.weather.fallback_wind_mph - 10.0).abs() < f64::EPSILON);
        assert!((config.weather.fallback_temp_f - 75.0).abs() < f64::EPSILON);

        assert_eq!(config.ballparks.len(), 7);
        assert!((config.ballparks.park_factor("Coors Field") - 1.35).abs() < f64::EPSILON);
        assert!((config.ballparks.park_factor("tropicana field") - 0.80).abs() < f64::EPSILON);

        let overrides = &config.players.overrides;
        assert_eq!(overrides.get("aaron judge"), Some(&PlayerId(592450)));
        assert_eq!(overrides.get("shohei ohtani"), Some(&PlayerId(660271)));
        assert_eq!(config.players.odds.get("shohei ohtani"), Some(&6.5));

        assert!(config.credentials.openweather_api_key.is_none());
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn credentials_toml_with_api_key() {
        let tmp = temp_base("creds");
        fs::write(
            tmp.join("config/credentials.toml"),
            "openweather_api_key = \"abc123\"\n",
        )
        .unwrap();
        let config = load_config_from(&tmp).unwrap();
        let key = config.credentials.openweather_api_key.as_deref();
        assert_eq!(key, Some("abc123"));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_window() {
        let tmp = temp_base("zero_window");
        let predictor = tmp.join("config/predictor.toml");
        replace_in(&predictor, "window_days = 30", "window_days = 0");
        match load_config_from(&tmp) {
            Err(ConfigError::ValidationError { field, .. }) => {
                assert_eq!(field, "prediction.window_days");
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_window_beyond_limit() {
        let tmp = temp_base("huge_window");
        let predictor = tmp.join("config/predictor.toml");
        replace_in(&predictor, "window_days = 30", "window_days = 200000000");
        match load_config_from(&tmp) {
            Err(ConfigError::ValidationError { field, message }) => {
                assert_eq!(field, "prediction.window_days");
                assert!(message.contains("3650"), "message was {message}");
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_non_positive_park_factor() {
        let tmp = temp_base("bad_factor");
        let parks = tmp.join("config/ballparks.toml");
        replace_in(&parks, "hr_factor = 0.80", "hr_factor = 0.0");
        match load_config_from(&tmp) {
            Err(ConfigError::ValidationError { field, .. }) => {
                assert!(field.contains("tropicana field"), "field was {field}");
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        let tmp = temp_base("bad_lat");
        let parks = tmp.join("config/ballparks.toml");
        replace_in(&parks, "lat = 39.7562", "lat = 139.7562");
        assert!(matches!(
            load_config_from(&tmp),
            Err(ConfigError::ValidationError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_unnormalized_override_name() {
        let tmp = temp_base("bad_override");
        let players = tmp.join("config/players.toml");
        replace_in(&players, "\"mike trout\"", "\"Mike Trout\"");
        match load_config_from(&tmp) {
            Err(ConfigError::ValidationError { field, .. }) => {
                assert!(field.contains("Mike Trout"));
            }
            other => panic!("expected ValidationError, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_ballparks_toml() {
        let tmp = temp_base("missing_parks");
        fs::remove_file(tmp.join("config/ballparks.toml")).unwrap();
        match load_config_from(&tmp) {
            Err(ConfigError::FileNotFound { path }) => {
                assert!(path.ends_with("ballparks.toml"));
            }
            other => panic!("expected FileNotFound, got {other:?}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = temp_base("invalid_toml");
        fs::write(tmp.join("config/predictor.toml"), "[prediction\nplayers = ").unwrap();
        assert!(matches!(load_config_from(&tmp), Err(ConfigError::ParseError { .. })));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_copies_missing_files() {
        let tmp = std::env::temp_dir().join("hrcast_config_ensure_copy");
        let _ = fs::remove_dir_all(&tmp);
        let defaults = tmp.join("defaults");
        fs::create_dir_all(&defaults).unwrap();
        fs::write(defaults.join("predictor.toml"), "# p\n").unwrap();
        fs::write(defaults.join("credentials.toml.example"), "# c\n").unwrap();

        let copied = ensure_config_files(&tmp).unwrap();
        assert_eq!(copied, vec![tmp.join("config/predictor.toml")]);
        assert!(!tmp.join("config/credentials.toml.example").exists());

        // Second run leaves existing files alone.
        fs::write(tmp.join("config/predictor.toml"), "# edited\n").unwrap();
        assert!(ensure_config_files(&tmp).unwrap().is_empty());
        assert_eq!(
            fs::read_to_string(tmp.join("config/predictor.toml")).unwrap(),
            "# edited\n"
        );
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_files_errors_when_both_dirs_missing() {
        let tmp = std::env::temp_dir().join("hrcast_config_ensure_none");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            ensure_config_files(&tmp),
            Err(ConfigError::DefaultsCopyError { .. })
        ));
        let _ = fs::remove_dir_all(&tmp);
    }
}
