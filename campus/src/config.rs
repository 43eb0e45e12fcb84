//! Configuration management for the campus core.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::catalog::DEFAULT_TRENDING_THRESHOLD;
use crate::error::ConfigError;
use crate::registration::{RegistrationEnvironment, Strictness};
use crate::ticket::{
    BLACK, Background, CodecConfig, DedupPolicy, ErrorCorrection, RenderProfile, TicketCodec,
    codec::DEFAULT_MARGIN,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use universe_core::environment::Clock;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Registration behaviour
    pub registration: RegistrationConfig,
    /// Ticket rendering
    pub ticket: TicketConfig,
    /// Scanning
    pub scan: ScanConfig,
    /// Catalog queries
    pub catalog: CatalogConfig,
}

/// Registration configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Prefix of issued ticket ids
    pub ticket_prefix: String,
    /// Transition guarding: strict, lenient
    pub strictness: Strictness,
    /// Enable the simulated host approval shortcut (default: false)
    pub allow_simulated_approval: bool,
}

/// Ticket rendering configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketConfig {
    /// Rendered size in pixels
    pub size: u32,
    /// Quiet zone in modules
    pub margin: u32,
    /// Background fill: white, transparent
    pub background: Background,
    /// Error correction: L, M, Q, H
    pub error_correction: ErrorCorrection,
    /// Where the demo writes the rendered ticket
    pub output: PathBuf,
}

/// Scanning configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Duplicate suppression: last, all
    pub dedup: DedupPolicy,
}

/// Catalog configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Attendee count above which an event is trending
    pub trending_threshold: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable values fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from environment variables, rejecting bad enum values.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] when strictness, background, error
    /// correction or dedup policy hold an unknown value.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        Self::try_from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup, with defaults.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::build(&lookup, OnInvalid::UseDefault).unwrap_or_else(|_| Self::defaults())
    }

    /// Build configuration from an arbitrary key lookup, rejecting bad enum values.
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidValue`] for the first unknown enum value.
    pub fn try_from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::build(&lookup, OnInvalid::Reject)
    }

    fn defaults() -> Self {
        Self {
            registration: RegistrationConfig {
                ticket_prefix: "UV".to_string(),
                strictness: Strictness::default(),
                allow_simulated_approval: false,
            },
            ticket: TicketConfig {
                size: 512,
                margin: DEFAULT_MARGIN,
                background: Background::default(),
                error_correction: ErrorCorrection::default(),
                output: PathBuf::from("ticket.png"),
            },
            scan: ScanConfig {
                dedup: DedupPolicy::default(),
            },
            catalog: CatalogConfig {
                trending_threshold: DEFAULT_TRENDING_THRESHOLD,
            },
        }
    }

    fn build<F>(lookup: &F, on_invalid: OnInvalid) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::defaults();

        Ok(Self {
            registration: RegistrationConfig {
                ticket_prefix: text(lookup, "CAMPUS_TICKET_PREFIX")
                    .unwrap_or(defaults.registration.ticket_prefix),
                strictness: choice(
                    lookup,
                    "CAMPUS_REGISTRATION_STRICTNESS",
                    "strict, lenient",
                    defaults.registration.strictness,
                    on_invalid,
                )?,
                allow_simulated_approval: number(
                    lookup,
                    "CAMPUS_ALLOW_SIMULATED_APPROVAL",
                    defaults.registration.allow_simulated_approval,
                ),
            },
            ticket: TicketConfig {
                size: number(lookup, "CAMPUS_TICKET_SIZE", defaults.ticket.size),
                margin: number(lookup, "CAMPUS_TICKET_MARGIN", defaults.ticket.margin),
                background: choice(
                    lookup,
                    "CAMPUS_TICKET_BACKGROUND",
                    "white, transparent",
                    defaults.ticket.background,
                    on_invalid,
                )?,
                error_correction: choice(
                    lookup,
                    "CAMPUS_TICKET_EC_LEVEL",
                    "L, M, Q, H",
                    defaults.ticket.error_correction,
                    on_invalid,
                )?,
                output: text(lookup, "CAMPUS_TICKET_OUTPUT")
                    .map_or(defaults.ticket.output, PathBuf::from),
            },
            scan: ScanConfig {
                dedup: choice(
                    lookup,
                    "CAMPUS_SCAN_DEDUP",
                    "last, all",
                    defaults.scan.dedup,
                    on_invalid,
                )?,
            },
            catalog: CatalogConfig {
                trending_threshold: number(
                    lookup,
                    "CAMPUS_TRENDING_THRESHOLD",
                    defaults.catalog.trending_threshold,
                ),
            },
        })
    }

    /// Codec configured for tickets
    #[must_use]
    pub const fn codec(&self) -> TicketCodec {
        TicketCodec::new(CodecConfig {
            margin: self.ticket.margin,
            background: self.ticket.background,
            error_correction: self.ticket.error_correction,
        })
    }

    /// Black-on-background renderer at the configured size
    #[must_use]
    pub const fn render_profile(&self) -> RenderProfile {
        RenderProfile::new(self.codec(), self.ticket.size, BLACK)
    }

    /// Registration environment with the configured renderer and guards
    #[must_use]
    pub fn registration_environment(&self, clock: Arc<dyn Clock>) -> RegistrationEnvironment {
        RegistrationEnvironment::new(clock)
            .with_renderer(Arc::new(self.render_profile()))
            .with_ticket_prefix(self.registration.ticket_prefix.clone())
            .with_strictness(self.registration.strictness)
            .with_simulated_approval(self.registration.allow_simulated_approval)
    }
}

/// What to do with an enum setting that does not parse
#[derive(Debug, Clone, Copy)]
enum OnInvalid {
    UseDefault,
    Reject,
}

fn text<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn number<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn choice<F, T>(
    lookup: &F,
    key: &'static str,
    expected: &'static str,
    default: T,
    on_invalid: OnInvalid,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    let Some(value) = text(lookup, key) else {
        return Ok(default);
    };
    match (value.parse(), on_invalid) {
        (Ok(parsed), _) => Ok(parsed),
        (Err(_), OnInvalid::UseDefault) => {
            tracing::warn!(key, value = %value, expected, "Ignoring invalid setting");
            Ok(default)
        },
        (Err(_), OnInvalid::Reject) => Err(ConfigError::InvalidValue {
            key,
            value,
            expected,
        }),
    }
}
