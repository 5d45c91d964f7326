use std::fmt::Display;
use std::net::SocketAddr;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that must never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const TOKEN_DAYS: RangeInclusive<i64> = 1..=3650;
const POST_CACHE_SECS: RangeInclusive<i64> = 1..=30 * 24 * 60 * 60;
const POST_CACHE_ENTRIES: RangeInclusive<usize> = 1..=1_000_000;

pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub wiki_dir: PathBuf,
    pub jwt_secret: String,
    pub token_days: i64,
    pub post_cache_secs: i64,
    pub post_cache_entries: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = std::env::var("COMMONS_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("COMMONS_JWT_SECRET is unset or still a placeholder; set it in your .env file");
        }

        let host = var_or("COMMONS_HOST", "0.0.0.0");
        let port: u16 = var_or("COMMONS_PORT", "3000")
            .parse()
            .context("COMMONS_PORT must be a port number")?;
        let addr = format!("{}:{}", host, port)
            .parse()
            .context("COMMONS_HOST must be an IP address")?;

        let token_days = ranged("COMMONS_TOKEN_DAYS", &var_or("COMMONS_TOKEN_DAYS", "30"), TOKEN_DAYS)?;
        let post_cache_secs = ranged(
            "COMMONS_POST_CACHE_SECS",
            &var_or("COMMONS_POST_CACHE_SECS", "86400"),
            POST_CACHE_SECS,
        )?;
        let post_cache_entries = ranged(
            "COMMONS_POST_CACHE_ENTRIES",
            &var_or("COMMONS_POST_CACHE_ENTRIES", "10000"),
            POST_CACHE_ENTRIES,
        )?;

        Ok(Self {
            addr,
            db_path: var_or("COMMONS_DB_PATH", "commons.db").into(),
            wiki_dir: var_or("COMMONS_WIKI_DIR", "./entries").into(),
            jwt_secret,
            token_days,
            post_cache_secs,
            post_cache_entries,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parses `raw` as a number within `range`.
fn ranged<T>(key: &str, raw: &str, range: RangeInclusive<T>) -> anyhow::Result<T>
where
    T: FromStr + PartialOrd + Display,
{
    let value: T = raw
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("{key} must be a whole number, got {raw:?}"))?;
    if !range.contains(&value) {
        bail!("{key} must be between {} and {}, got {value}", range.start(), range.end());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_values_in_range() {
        assert_eq!(ranged("COMMONS_TOKEN_DAYS", "30", TOKEN_DAYS).unwrap(), 30);
        assert_eq!(ranged("COMMONS_POST_CACHE_SECS", " 86400 ", POST_CACHE_SECS).unwrap(), 86400);
        assert_eq!(ranged("COMMONS_POST_CACHE_ENTRIES", "1", POST_CACHE_ENTRIES).unwrap(), 1);
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(ranged("COMMONS_TOKEN_DAYS", "0", TOKEN_DAYS).is_err());
        assert!(ranged("COMMONS_TOKEN_DAYS", "9223372036854775807", TOKEN_DAYS).is_err());
        assert!(ranged("COMMONS_POST_CACHE_SECS", "-1", POST_CACHE_SECS).is_err());
        assert!(ranged("COMMONS_POST_CACHE_ENTRIES", "0", POST_CACHE_ENTRIES).is_err());
    }

    #[test]
    fn rejects_non_numbers() {
        let err = ranged("COMMONS_TOKEN_DAYS", "soon", TOKEN_DAYS).unwrap_err();
        assert!(err.to_string().contains("COMMONS_TOKEN_DAYS"));
    }
}
