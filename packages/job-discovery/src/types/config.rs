//! Configuration types for the discovery pipeline.

use std::collections::HashSet;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Longest accepted target-profile description, in characters.
pub const MAX_PROFILE_CHARS: usize = 256;

/// Language the classifier questions are written in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Fr,
    #[default]
    En,
}

/// Description of the postings the caller is looking for.
///
/// Embedded verbatim in every classifier question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTargetProfile")]
pub struct TargetProfile {
    description: String,
    language: Language,
}

#[derive(Deserialize)]
struct RawTargetProfile {
    description: String,
    #[serde(default)]
    language: Language,
}

impl TryFrom<RawTargetProfile> for TargetProfile {
    type Error = ConfigError;

    fn try_from(raw: RawTargetProfile) -> ConfigResult<Self> {
        Self::new(raw.description, raw.language)
    }
}

impl TargetProfile {
    /// Create a validated profile.
    pub fn new(description: impl Into<String>, language: Language) -> ConfigResult<Self> {
        let description = description.into();
        if description.trim().is_empty() {
            return Err(ConfigError::EmptyProfile);
        }

        let len = description.chars().count();
        if len > MAX_PROFILE_CHARS {
            return Err(ConfigError::ProfileTooLong {
                len,
                max: MAX_PROFILE_CHARS,
            });
        }

        Ok(Self {
            description,
            language,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn language(&self) -> Language {
        self.language
    }
}

/// What to do with stubs that share an id within one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep every occurrence (each one is fetched).
    KeepAll,

    /// Keep one stub per id, at its first position, carrying its last-seen name.
    #[default]
    LastSeenWins,
}

/// Pipeline-wide policy knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Stub names per classifier question.
    ///
    /// The classifier degrades on larger lists. Default: 20.
    pub batch_size: usize,

    /// Delay before reading each results batch, in milliseconds.
    ///
    /// A compatibility knob on top of the collaborator's readiness wait;
    /// 0 disables it. Default: 2000.
    pub settle_delay_ms: u64,

    /// Number of advance strategies the page collaborator understands.
    ///
    /// Default: 2.
    pub strategy_count: usize,

    /// Stop after this many results pages even if more remain.
    ///
    /// `None` means no cap. Default: 100.
    pub max_pages: Option<usize>,

    /// Handling of repeated ids. Default: last seen wins.
    pub duplicates: DuplicatePolicy,

    /// Report stubs rejected by the batch classifier in the result's
    /// rejected list instead of dropping them. Default: true.
    pub report_batch_rejections: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            settle_delay_ms: 2000,
            strategy_count: 2,
            max_pages: Some(100),
            duplicates: DuplicatePolicy::default(),
            report_batch_rejections: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load overrides from `DISCOVERY_*` environment variables.
    ///
    /// Reads a `.env` file first when one is present. Unset variables
    /// keep their defaults.
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Self::default();
        if let Some(batch_size) = env_parse("DISCOVERY_BATCH_SIZE")? {
            config.batch_size = batch_size;
        }
        if let Some(delay) = env_parse("DISCOVERY_SETTLE_DELAY_MS")? {
            config.settle_delay_ms = delay;
        }
        if let Some(count) = env_parse("DISCOVERY_STRATEGY_COUNT")? {
            config.strategy_count = count;
        }
        if let Ok(raw) = env::var("DISCOVERY_MAX_PAGES") {
            config.max_pages = parse_page_cap(&raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set the classifier batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Disable the settle delay (scripted sessions are ready immediately).
    pub fn without_settle_delay(mut self) -> Self {
        self.settle_delay_ms = 0;
        self
    }

    /// Set the number of advance strategies.
    pub fn with_strategy_count(mut self, count: usize) -> Self {
        self.strategy_count = count;
        self
    }

    /// Set or remove the page cap.
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Set the duplicate policy.
    pub fn with_duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    /// Drop batch-rejected stubs instead of reporting them.
    pub fn drop_batch_rejections(mut self) -> Self {
        self.report_batch_rejections = false;
        self
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize);
        }
        if self.strategy_count == 0 {
            return Err(ConfigError::NoStrategies);
        }
        if self.max_pages == Some(0) {
            return Err(ConfigError::InvalidPageCap);
        }
        Ok(())
    }
}

fn env_parse<T>(var: &str) -> ConfigResult<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidEnv {
                var: var.to_string(),
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

fn parse_page_cap(raw: &str) -> ConfigResult<Option<usize>> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("none") {
        return Ok(None);
    }

    match raw.parse::<usize>() {
        Ok(0) => Ok(None),
        Ok(cap) => Ok(Some(cap)),
        Err(e) => Err(ConfigError::InvalidEnv {
            var: "DISCOVERY_MAX_PAGES".to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Per-run input supplied by the site adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineInput {
    /// Ids already handled in earlier runs.
    #[serde(default)]
    pub skip_ids: HashSet<String>,

    /// Substrings that disqualify a listing by name (case-insensitive).
    #[serde(default)]
    pub banned_words: Vec<String>,

    /// Enables semantic filtering when a classifier is configured.
    #[serde(default)]
    pub target_profile: Option<TargetProfile>,

    /// Overrides [`PipelineConfig::batch_size`] for this run.
    #[serde(default)]
    pub batch_size: Option<usize>,
}

impl PipelineInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip these ids.
    pub fn with_skip_ids(mut self, ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.skip_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Ban these name substrings.
    pub fn with_banned_words(mut self, words: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.banned_words.extend(words.into_iter().map(Into::into));
        self
    }

    /// Set the target profile.
    pub fn with_target_profile(mut self, profile: TargetProfile) -> Self {
        self.target_profile = Some(profile);
        self
    }

    /// Override the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Batch size for this run, falling back to the config.
    pub fn effective_batch_size(&self, config: &PipelineConfig) -> ConfigResult<usize> {
        match self.batch_size {
            Some(0) => Err(ConfigError::InvalidBatchSize),
            Some(size) => Ok(size),
            None => Ok(config.batch_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_length_limit() {
        let ok = "a".repeat(MAX_PROFILE_CHARS);
        assert!(TargetProfile::new(ok, Language::Fr).is_ok());

        let too_long = "é".repeat(MAX_PROFILE_CHARS + 1);
        assert_eq!(
            TargetProfile::new(too_long, Language::Fr),
            Err(ConfigError::ProfileTooLong {
                len: MAX_PROFILE_CHARS + 1,
                max: MAX_PROFILE_CHARS
            })
        );
    }

    #[test]
    fn test_profile_rejects_blank() {
        assert_eq!(
            TargetProfile::new("   ", Language::En),
            Err(ConfigError::EmptyProfile)
        );
    }

    #[test]
    fn test_input_deserializes_camel_case() {
        let json = r#"{
            "skipIds": ["1", "2"],
            "bannedWords": ["stage"],
            "targetProfile": { "description": "Juriste droit des familles", "language": "fr" },
            "batchSize": 10
        }"#;

        let input: PipelineInput = serde_json::from_str(json).unwrap();
        assert!(input.skip_ids.contains("2"));
        assert_eq!(input.banned_words, vec!["stage"]);
        assert_eq!(input.target_profile.unwrap().language(), Language::Fr);
        assert_eq!(input.batch_size, Some(10));
    }

    #[test]
    fn test_input_rejects_oversized_profile() {
        let json = format!(
            r#"{{ "targetProfile": {{ "description": "{}", "language": "en" }} }}"#,
            "x".repeat(300)
        );
        assert!(serde_json::from_str::<PipelineInput>(&json).is_err());
    }

    #[test]
    fn test_effective_batch_size() {
        let config = PipelineConfig::default();
        assert_eq!(PipelineInput::new().effective_batch_size(&config), Ok(20));
        assert_eq!(
            PipelineInput::new()
                .with_batch_size(5)
                .effective_batch_size(&config),
            Ok(5)
        );
        assert_eq!(
            PipelineInput::new()
                .with_batch_size(0)
                .effective_batch_size(&config),
            Err(ConfigError::InvalidBatchSize)
        );
    }

    #[test]
    fn test_config_validation() {
        assert!(PipelineConfig::default().validate().is_ok());
        assert_eq!(
            PipelineConfig::default().with_batch_size(0).validate(),
            Err(ConfigError::InvalidBatchSize)
        );
        assert_eq!(
            PipelineConfig::default().with_strategy_count(0).validate(),
            Err(ConfigError::NoStrategies)
        );
        assert_eq!(
            PipelineConfig::default().with_max_pages(Some(0)).validate(),
            Err(ConfigError::InvalidPageCap)
        );
    }

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{ "batch_size": 5, "max_pages": null }"#).unwrap();
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.max_pages, None);
        assert_eq!(config.settle_delay(), Duration::from_millis(2000));
        assert_eq!(config.duplicates, DuplicatePolicy::LastSeenWins);
    }

    #[test]
    fn test_enum_defaults() {
        assert_eq!(Language::default(), Language::En);
        assert_eq!(DuplicatePolicy::default(), DuplicatePolicy::LastSeenWins);

        let profile: TargetProfile =
            serde_json::from_str(r#"{ "description": "Juriste" }"#).unwrap();
        assert_eq!(profile.language(), Language::En);
    }

    #[test]
    fn test_settle_delay_saturates() {
        let config = PipelineConfig::default().with_settle_delay(Duration::from_millis(750));
        assert_eq!(config.settle_delay_ms, 750);

        let config = PipelineConfig::default().with_settle_delay(Duration::MAX);
        assert_eq!(config.settle_delay_ms, u64::MAX);
    }

    #[test]
    fn test_page_cap_parsing() {
        assert_eq!(parse_page_cap("none"), Ok(None));
        assert_eq!(parse_page_cap("0"), Ok(None));
        assert_eq!(parse_page_cap(" 12 "), Ok(Some(12)));
        assert!(parse_page_cap("lots").is_err());
    }
}
