//! Configuration surface.
//!
//! All inputs arrive environment-style (flags are provided for local runs)
//! and are validated here, before any browser work starts. A missing or
//! unparsable product URL is the only hard requirement.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use url::Url;
use webhook_notify::{FieldGranularity, RunMetadata};

const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Parser)]
#[command(name = "stockwatch", version, about = "Single-shot per-store stock monitor")]
pub struct CliArgs {
    /// Product page to watch.
    #[arg(long, env = "PRODUCT_URL")]
    pub product_url: Option<String>,

    /// Webhook endpoint; delivery is disabled when absent.
    #[arg(long, env = "WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Echo in-page console output.
    #[arg(long, env = "DEBUG")]
    pub debug: bool,

    /// Provenance label rendered in the notification footer.
    #[arg(long, env = "RUN_REF")]
    pub run_ref: Option<String>,

    /// Run identifier used to build the footer's traceable URL.
    #[arg(long, env = "RUN_ID")]
    pub run_id: Option<String>,

    /// How long to wait for the stock response before giving up.
    #[arg(long, env = "WAIT_TIMEOUT_SECS", default_value_t = DEFAULT_WAIT_TIMEOUT_SECS)]
    pub wait_timeout_secs: u64,

    /// Notification field granularity: per-location or per-state.
    #[arg(long, env = "FIELD_GRANULARITY", default_value = "per-location")]
    pub field_granularity: FieldGranularity,

    /// Optional mention line prepended to the notification.
    #[arg(long, env = "MENTION")]
    pub mention: Option<String>,

    /// Chromium executable override.
    #[arg(long, env = "STOCKWATCH_CHROME")]
    pub chrome_path: Option<PathBuf>,

    /// Run with a visible browser window.
    #[arg(long, env = "HEADFUL")]
    pub headful: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("PRODUCT_URL not set")]
    MissingProductUrl,
    #[error("invalid {key}: {source}")]
    InvalidUrl {
        key: &'static str,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub product_url: Url,
    pub webhook_url: Option<Url>,
    pub debug: bool,
    pub metadata: RunMetadata,
    pub wait_timeout: Duration,
    pub granularity: FieldGranularity,
    pub mention: Option<String>,
    pub chrome_path: Option<PathBuf>,
    pub headful: bool,
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = ConfigError;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let product_url = args
            .product_url
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .ok_or(ConfigError::MissingProductUrl)
            .and_then(|raw| {
                Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
                    key: "PRODUCT_URL",
                    source,
                })
            })?;

        let webhook_url = args
            .webhook_url
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(|raw| {
                Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
                    key: "WEBHOOK_URL",
                    source,
                })
            })
            .transpose()?;

        Ok(Self {
            product_url,
            webhook_url,
            debug: args.debug,
            metadata: RunMetadata {
                reference: args.run_ref,
                run_id: args.run_id,
            },
            wait_timeout: Duration::from_secs(args.wait_timeout_secs),
            granularity: args.field_granularity,
            mention: args.mention,
            chrome_path: args.chrome_path,
            headful: args.headful,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(argv: &[&str]) -> CliArgs {
        CliArgs::parse_from(std::iter::once("stockwatch").chain(argv.iter().copied()))
    }

    #[test]
    fn missing_product_url_is_rejected() {
        let err = RunConfig::try_from(args(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingProductUrl));
    }

    #[test]
    fn blank_product_url_is_rejected() {
        let err = RunConfig::try_from(args(&["--product-url", "  "])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingProductUrl));
    }

    #[test]
    fn invalid_product_url_is_rejected() {
        let err = RunConfig::try_from(args(&["--product-url", "not a url"])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidUrl {
                key: "PRODUCT_URL",
                ..
            }
        ));
    }

    #[test]
    fn defaults_apply() {
        let config =
            RunConfig::try_from(args(&["--product-url", "https://example.com/p/1"])).unwrap();
        assert!(config.webhook_url.is_none());
        assert!(!config.debug);
        assert_eq!(config.wait_timeout, Duration::from_secs(60));
        assert_eq!(config.granularity, FieldGranularity::PerLocation);
    }

    #[test]
    fn full_configuration_parses() {
        let config = RunConfig::try_from(args(&[
            "--product-url",
            "https://example.com/p/1",
            "--webhook-url",
            "https://discord.test/api/webhooks/1/abc",
            "--debug",
            "--run-ref",
            "main",
            "--run-id",
            "42",
            "--wait-timeout-secs",
            "5",
            "--field-granularity",
            "per-state",
            "--mention",
            "<@123>",
        ]))
        .unwrap();

        assert!(config.webhook_url.is_some());
        assert!(config.debug);
        assert_eq!(config.metadata.reference.as_deref(), Some("main"));
        assert_eq!(config.metadata.run_id.as_deref(), Some("42"));
        assert_eq!(config.wait_timeout, Duration::from_secs(5));
        assert_eq!(config.granularity, FieldGranularity::PerState);
        assert_eq!(config.mention.as_deref(), Some("<@123>"));
    }
}
