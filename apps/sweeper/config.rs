use chrono::TimeDelta;
use std::{
    collections::HashSet, env, fmt, num::NonZeroUsize, path::PathBuf, str::FromStr, time::Duration,
};
use thiserror::Error;
use tracing::info;

use crate::retention::RetentionPolicy;

pub const DEFAULT_API_BASE_URL: &str = "https://api.twitter.com/1.1";
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_BATCH_PAUSE: Duration = Duration::from_secs(5);
pub const DEFAULT_BATCH_PAUSE_EVERY: NonZeroUsize = match NonZeroUsize::new(200) {
    Some(n) => n,
    None => unreachable!(),
};
pub const DEFAULT_EXPORT_PATH: &str = "tweets.json";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// What to do when a single delete call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteErrorPolicy {
    /// Stop and return the error.
    Halt,
    /// Log, count and move on to the next post.
    Skip,
}

impl FromStr for DeleteErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "halt" => Ok(Self::Halt),
            "skip" => Ok(Self::Skip),
            other => Err(format!("expected `halt` or `skip`, got `{other}`")),
        }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"<redacted>")
            .field("access_token", &self.access_token)
            .field("access_token_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub credentials: Credentials,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub api: ApiConfig,
    pub retention: RetentionPolicy,
    /// Pause after every swept page.
    pub page_delay: Duration,
    pub delete_error_policy: DeleteErrorPolicy,
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub api: ApiConfig,
    pub export_path: PathBuf,
    pub pause: Duration,
    pub pause_every: NonZeroUsize,
    pub delete_error_policy: DeleteErrorPolicy,
}

impl ApiConfig {
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let credentials = Credentials {
            consumer_key: required(lookup, "TWITTER_CONSUMER_KEY")?,
            consumer_secret: required(lookup, "TWITTER_CONSUMER_SECRET")?,
            access_token: required(lookup, "TWITTER_ACCESS_TOKEN")?,
            access_token_secret: required(lookup, "TWITTER_ACCESS_TOKEN_SECRET")?,
        };
        let base_url = optional(lookup, "TWITTER_API_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        Ok(Self {
            credentials,
            base_url,
        })
    }
}

impl SweepConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api = ApiConfig::from_lookup(lookup)?;

        let raw_age = required(lookup, "MAX_TWEET_AGE")?;
        let max_age = parse_duration(&raw_age)
            .and_then(|d| TimeDelta::from_std(d).map_err(|e| e.to_string()))
            .map_err(|reason| invalid("MAX_TWEET_AGE", &raw_age, reason))?;

        let allowlist = optional(lookup, "WHITELIST")
            .map(|v| parse_allowlist(&v))
            .unwrap_or_default();

        let page_delay = parse_secs(lookup, "SWEEP_PAGE_DELAY_SECS")?.unwrap_or(DEFAULT_PAGE_DELAY);
        let delete_error_policy =
            parse_policy(lookup, "SWEEP_DELETE_ERROR_POLICY")?.unwrap_or(DeleteErrorPolicy::Halt);

        let config = Self {
            api,
            retention: RetentionPolicy::new(max_age, allowlist),
            page_delay,
            delete_error_policy,
        };

        info!(
            max_age = %raw_age,
            allowlisted = config.retention.allowlist().len(),
            page_delay = ?config.page_delay,
            policy = ?config.delete_error_policy,
            "Sweep config loaded"
        );

        Ok(config)
    }
}

impl BatchConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api = ApiConfig::from_lookup(lookup)?;

        let export_path = optional(lookup, "EXPORT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_PATH));
        let pause = parse_secs(lookup, "BATCH_PAUSE_SECS")?.unwrap_or(DEFAULT_BATCH_PAUSE);

        let pause_every = match optional(lookup, "BATCH_PAUSE_EVERY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) => NonZeroUsize::new(n).ok_or_else(|| {
                    invalid("BATCH_PAUSE_EVERY", &raw, "must be greater than zero")
                })?,
                Err(e) => return Err(invalid("BATCH_PAUSE_EVERY", &raw, e)),
            },
            None => DEFAULT_BATCH_PAUSE_EVERY,
        };

        let delete_error_policy =
            parse_policy(lookup, "BATCH_DELETE_ERROR_POLICY")?.unwrap_or(DeleteErrorPolicy::Skip);

        let config = Self {
            api,
            export_path,
            pause,
            pause_every,
            delete_error_policy,
        };

        info!(
            export_path = %config.export_path.display(),
            pause = ?config.pause,
            pause_every = config.pause_every,
            policy = ?config.delete_error_policy,
            "Batch config loaded"
        );

        Ok(config)
    }
}

fn env_lookup(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.is_empty())
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional(lookup, name).ok_or(ConfigError::Missing(name))
}

fn invalid(name: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    optional(lookup, name)
        .map(|raw| {
            raw.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| invalid(name, &raw, e))
        })
        .transpose()
}

fn parse_policy(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<DeleteErrorPolicy>, ConfigError> {
    optional(lookup, name)
        .map(|raw| raw.parse().map_err(|e: String| invalid(name, &raw, e)))
        .transpose()
}

/// Splits a colon-separated list of post ids. Entries are kept verbatim
/// (no trimming, no numeric normalisation); empty entries are dropped.
pub fn parse_allowlist(raw: &str) -> HashSet<String> {
    raw.split(':')
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parses a Go-style duration string such as `720h`, `1h30m`, `1.5h` or
/// `300ms`. A bare `0` is accepted; negative durations are rejected.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    const UNITS: [(&str, u128); 8] = [
        ("ns", 1),
        ("us", 1_000),
        ("µs", 1_000),
        ("μs", 1_000),
        ("ms", 1_000_000),
        ("s", 1_000_000_000),
        ("m", 60 * 1_000_000_000),
        ("h", 60 * 60 * 1_000_000_000),
    ];

    let s = input.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }
    if s.starts_with('-') {
        return Err("negative durations are not allowed".to_string());
    }
    let mut rest = s.strip_prefix('+').unwrap_or(s);
    if rest == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_end = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let number = &rest[..number_end];
        rest = &rest[number_end..];

        let unit_end = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let unit = &rest[..unit_end];
        rest = &rest[unit_end..];

        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && frac.is_empty()) || frac.contains('.') {
            return Err(format!("invalid number in duration {input:?}"));
        }
        if unit.is_empty() {
            return Err(format!("missing unit in duration {input:?}"));
        }
        let unit_nanos = UNITS
            .iter()
            .find(|(name, _)| *name == unit)
            .map(|(_, nanos)| *nanos)
            .ok_or_else(|| format!("unknown unit {unit:?} in duration {input:?}"))?;

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| format!("invalid duration {input:?}"))?
        };
        let mut nanos = whole
            .checked_mul(unit_nanos)
            .ok_or_else(|| format!("duration {input:?} overflows"))?;

        // Digits past nanosecond precision of an hour never matter
        let frac = &frac[..frac.len().min(18)];
        if !frac.is_empty() {
            let frac_value: u128 = frac.parse().map_err(|_| format!("invalid duration {input:?}"))?;
            nanos = nanos
                .checked_add(frac_value * unit_nanos / 10u128.pow(frac.len() as u32))
                .ok_or_else(|| format!("duration {input:?} overflows"))?;
        }

        total = total
            .checked_add(nanos)
            .ok_or_else(|| format!("duration {input:?} overflows"))?;
    }

    u64::try_from(total)
        .map(Duration::from_nanos)
        .map_err(|_| format!("duration {input:?} overflows"))
}
