//! Configuration loading for adhan
//!
//! Configuration comes from a JSON file listing one or more cities, or, when
//! no file is present, from `ADHAN_*` environment variables (a `.env` file is
//! loaded into the environment by `main` beforehand). The result is built
//! once at startup and passed by reference.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::cache::{CacheFormat, CacheStore};
use crate::data::{MinuteOffsets, PrayerName};
use crate::present::ClockStyle;

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "ADHAN_CONFIG";

/// Error types for configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither a config file nor `ADHAN_CITY` is available
    #[error("No configuration found: create a config file, or set ADHAN_CONFIG or ADHAN_CITY")]
    Missing,

    /// The config file cannot be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for this schema
    #[error("Malformed config: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The city list is empty
    #[error("No cities configured")]
    NoCities,

    /// An offset names something that is not a prayer
    #[error("Unknown prayer name: '{0}'")]
    UnknownPrayer(String),

    /// An `ADHAN_OFFSETS`/`ADHAN_IQAMAH` entry is not `Prayer=minutes`
    #[error("Invalid offset entry: '{0}'. Expected Prayer=minutes")]
    InvalidOffset(String),

    /// `ADHAN_SOURCE` is not a known source
    #[error("Unknown source: '{0}'. Valid sources: api, markup, pattern")]
    UnknownSource(String),

    /// The pattern source has no default URL
    #[error("The pattern source requires a base_url (or ADHAN_URL)")]
    MissingUrl,
}

/// Which kind of upstream to fetch from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Structured JSON API
    #[default]
    Api,
    /// HTML page scrape
    Markup,
    /// JS widget pattern extraction
    Pattern,
}

impl SourceKind {
    /// Parses a source name case-insensitively
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.trim().to_lowercase().as_str() {
            "api" => Ok(SourceKind::Api),
            "markup" => Ok(SourceKind::Markup),
            "pattern" => Ok(SourceKind::Pattern),
            _ => Err(ConfigError::UnknownSource(s.to_string())),
        }
    }
}

/// One selectable city
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CityConfig {
    /// Display name, also used for the cache file name
    pub name: String,
    /// City sent upstream; defaults to `name`
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    /// Minutes added per prayer after fetching
    #[serde(default)]
    pub offsets: BTreeMap<String, i64>,
}

impl CityConfig {
    /// The city name sent to the upstream
    pub fn query_city(&self) -> &str {
        self.city.as_deref().unwrap_or(&self.name)
    }

    /// Offsets keyed by prayer
    pub fn minute_offsets(&self) -> Result<MinuteOffsets, ConfigError> {
        resolve_offsets(&self.offsets)
    }
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceKind,
    /// Override of the source's default URL
    #[serde(default)]
    pub base_url: Option<String>,
    /// Calculation method id for the API source
    #[serde(default)]
    pub method: Option<u8>,
    #[serde(default)]
    pub cache_format: CacheFormat,
    /// Directory for cache files; defaults to the XDG cache dir
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default)]
    pub clock: ClockStyle,
    /// Minutes from each prayer to its Iqamah
    #[serde(default)]
    pub iqamah: BTreeMap<String, i64>,
    pub cities: Vec<CityConfig>,
}

impl Config {
    /// Loads configuration from the process environment
    ///
    /// Order: the file named by `ADHAN_CONFIG`, then the default config file
    /// if it exists, then `ADHAN_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(|key| std::env::var(key).ok(), Self::default_path())
    }

    /// Same as `load`, with the variable lookup and default path supplied
    pub fn load_from<F>(vars: F, default_path: Option<PathBuf>) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = vars(CONFIG_ENV) {
            return Self::from_file(Path::new(&path));
        }
        if let Some(path) = default_path.filter(|path| path.exists()) {
            return Self::from_file(&path);
        }
        Self::from_vars(vars)
    }

    /// `config.json` in the XDG config directory for this application
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "adhan").map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Reads and validates a JSON config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "loading config file");
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parses and validates a JSON config document
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()
    }

    /// Builds a single-city configuration from `ADHAN_*` variables
    pub fn from_vars<F>(vars: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let name = vars("ADHAN_CITY")
            .filter(|city| !city.trim().is_empty())
            .ok_or(ConfigError::Missing)?;

        let source = match vars("ADHAN_SOURCE") {
            Some(source) => SourceKind::parse(&source)?,
            None => SourceKind::default(),
        };

        let offsets = match vars("ADHAN_OFFSETS") {
            Some(pairs) => parse_offset_pairs(&pairs)?,
            None => BTreeMap::new(),
        };

        let iqamah = match vars("ADHAN_IQAMAH") {
            Some(pairs) => parse_offset_pairs(&pairs)?,
            None => BTreeMap::new(),
        };

        let config = Config {
            source,
            base_url: vars("ADHAN_URL"),
            method: None,
            cache_format: CacheFormat::default(),
            cache_dir: None,
            clock: ClockStyle::default(),
            iqamah,
            cities: vec![CityConfig {
                name: name.trim().to_string(),
                city: None,
                country: vars("ADHAN_COUNTRY"),
                offsets,
            }],
        };

        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.cities.is_empty() {
            return Err(ConfigError::NoCities);
        }
        if self.source == SourceKind::Pattern && self.base_url.is_none() {
            return Err(ConfigError::MissingUrl);
        }
        for city in &self.cities {
            city.minute_offsets()?;
        }
        self.iqamah_delays()?;
        Ok(self)
    }

    /// Minutes from each prayer to its Iqamah
    pub fn iqamah_delays(&self) -> Result<MinuteOffsets, ConfigError> {
        resolve_offsets(&self.iqamah)
    }

    /// Directory holding cache files
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(CacheStore::default_dir)
    }
}

/// Maps label-keyed offsets to prayer-keyed offsets
pub fn resolve_offsets(offsets: &BTreeMap<String, i64>) -> Result<MinuteOffsets, ConfigError> {
    offsets
        .iter()
        .map(|(label, minutes)| {
            PrayerName::from_label(label)
                .map(|prayer| (prayer, *minutes))
                .ok_or_else(|| ConfigError::UnknownPrayer(label.clone()))
        })
        .collect()
}

/// Parses `Fajr=6,Maghrib=3` into label-keyed offsets
pub fn parse_offset_pairs(pairs: &str) -> Result<BTreeMap<String, i64>, ConfigError> {
    pairs
        .split(',')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let invalid = || ConfigError::InvalidOffset(pair.to_string());
            let (label, minutes) = pair.split_once('=').ok_or_else(invalid)?;
            let minutes: i64 = minutes.trim().parse().map_err(|_| invalid())?;
            Ok((label.trim().to_string(), minutes))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const FULL_CONFIG: &str = r#"{
        "source": "api",
        "method": 2,
        "cache_format": "json",
        "cache_dir": "/var/tmp/adhan",
        "clock": "12h",
        "iqamah": {"Fajr": 20, "Isha": 10},
        "cities": [
            {"name": "London", "country": "UK", "offsets": {"Fajr": 6, "Maghrib": 3}},
            {"name": "Cairo", "city": "Al Qahirah", "country": "Egypt"}
        ]
    }"#;

    fn vars_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_json(FULL_CONFIG).expect("Config should parse");

        assert_eq!(config.source, SourceKind::Api);
        assert_eq!(config.method, Some(2));
        assert_eq!(config.cache_format, CacheFormat::Json);
        assert_eq!(config.cache_dir(), PathBuf::from("/var/tmp/adhan"));
        assert_eq!(config.clock, ClockStyle::H12);
        assert_eq!(config.cities.len(), 2);

        let london = &config.cities[0];
        assert_eq!(london.query_city(), "London");
        assert_eq!(
            london.minute_offsets().unwrap(),
            MinuteOffsets::from([(PrayerName::Fajr, 6), (PrayerName::Maghrib, 3)])
        );

        let cairo = &config.cities[1];
        assert_eq!(cairo.query_city(), "Al Qahirah");
        assert!(cairo.minute_offsets().unwrap().is_empty());

        assert_eq!(
            config.iqamah_delays().unwrap(),
            MinuteOffsets::from([(PrayerName::Fajr, 20), (PrayerName::Isha, 10)])
        );
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_json(r#"{"cities": [{"name": "Leeds"}]}"#).unwrap();

        assert_eq!(config.source, SourceKind::Api);
        assert_eq!(config.cache_format, CacheFormat::Csv);
        assert_eq!(config.clock, ClockStyle::H24);
        assert!(config.base_url.is_none());
        assert!(config.iqamah.is_empty());
    }

    #[test]
    fn test_empty_city_list_is_rejected() {
        assert!(matches!(
            Config::from_json(r#"{"cities": []}"#),
            Err(ConfigError::NoCities)
        ));
    }

    #[test]
    fn test_missing_city_list_is_malformed() {
        assert!(matches!(
            Config::from_json(r#"{"source": "api"}"#),
            Err(ConfigError::Malformed(_))
        ));
    }

    #[test]
    fn test_unknown_prayer_in_offsets() {
        let text = r#"{"cities": [{"name": "Leeds", "offsets": {"Tahajjud": 5}}]}"#;
        match Config::from_json(text) {
            Err(ConfigError::UnknownPrayer(name)) => assert_eq!(name, "Tahajjud"),
            other => panic!("Expected UnknownPrayer, got {:?}", other),
        }
    }

    #[test]
    fn test_pattern_source_requires_url() {
        let text = r#"{"source": "pattern", "cities": [{"name": "Leeds"}]}"#;
        assert!(matches!(Config::from_json(text), Err(ConfigError::MissingUrl)));

        let text = r#"{"source": "pattern", "base_url": "http://localhost/w.js", "cities": [{"name": "Leeds"}]}"#;
        assert!(Config::from_json(text).is_ok());
    }

    #[test]
    fn test_from_vars() {
        let vars = vars_from(&[
            ("ADHAN_CITY", "Birmingham"),
            ("ADHAN_COUNTRY", "UK"),
            ("ADHAN_SOURCE", "Markup"),
            ("ADHAN_OFFSETS", "Fajr=6, Maghrib=3"),
            ("ADHAN_IQAMAH", "Dhuhr=15"),
        ]);

        let config = Config::from_vars(vars).expect("Env config should load");

        assert_eq!(config.source, SourceKind::Markup);
        assert_eq!(config.cities.len(), 1);
        assert_eq!(config.cities[0].name, "Birmingham");
        assert_eq!(config.cities[0].country.as_deref(), Some("UK"));
        assert_eq!(config.cities[0].offsets.get("Fajr"), Some(&6));
        assert_eq!(
            config.iqamah_delays().unwrap(),
            MinuteOffsets::from([(PrayerName::Dhuhr, 15)])
        );
    }

    #[test]
    fn test_from_vars_without_city() {
        let vars = vars_from(&[("ADHAN_COUNTRY", "UK")]);
        assert!(matches!(Config::from_vars(vars), Err(ConfigError::Missing)));
    }

    #[test]
    fn test_from_vars_unknown_source() {
        let vars = vars_from(&[("ADHAN_CITY", "Leeds"), ("ADHAN_SOURCE", "rss")]);
        assert!(matches!(
            Config::from_vars(vars),
            Err(ConfigError::UnknownSource(_))
        ));
    }

    #[test]
    fn test_parse_offset_pairs() {
        let pairs = parse_offset_pairs("Fajr=6,Maghrib=-3,").unwrap();
        assert_eq!(pairs.get("Fajr"), Some(&6));
        assert_eq!(pairs.get("Maghrib"), Some(&-3));

        assert!(matches!(
            parse_offset_pairs("Fajr:6"),
            Err(ConfigError::InvalidOffset(_))
        ));
        assert!(matches!(
            parse_offset_pairs("Fajr=six"),
            Err(ConfigError::InvalidOffset(_))
        ));
    }

    #[test]
    fn test_load_prefers_config_env_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("cities.json");
        fs::write(&path, FULL_CONFIG).unwrap();
        let path_str = path.to_string_lossy().to_string();

        let vars = vars_from(&[(CONFIG_ENV, path_str.as_str()), ("ADHAN_CITY", "Ignored")]);
        let config = Config::load_from(vars, None).unwrap();

        assert_eq!(config.cities[0].name, "London");
    }

    #[test]
    fn test_load_missing_config_env_file() {
        let vars = vars_from(&[(CONFIG_ENV, "/nonexistent/adhan/config.json")]);
        assert!(matches!(
            Config::load_from(vars, None),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_load_default_path_then_env() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");

        // Default file absent: fall back to variables
        let vars = vars_from(&[("ADHAN_CITY", "Leeds")]);
        let config = Config::load_from(vars, Some(path.clone())).unwrap();
        assert_eq!(config.cities[0].name, "Leeds");

        fs::write(&path, FULL_CONFIG).unwrap();
        let vars = vars_from(&[("ADHAN_CITY", "Leeds")]);
        let config = Config::load_from(vars, Some(path)).unwrap();
        assert_eq!(config.cities[0].name, "London");
    }

    #[test]
    fn test_load_nothing_configured() {
        assert!(matches!(
            Config::load_from(vars_from(&[]), None),
            Err(ConfigError::Missing)
        ));
    }
}
