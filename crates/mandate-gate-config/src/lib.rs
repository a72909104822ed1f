// crates/mandate-gate-config/src/lib.rs
// ============================================================================
// Module: Mandate Gate Config
// Description: TOML configuration with strict, fail-closed load validation.
// Purpose: Provision secrets, pricing, monitor, and store settings at start.
// Dependencies: mandate-gate-core, serde, thiserror, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded once at process start and validated fail-closed:
//! an unreadable file, an oversized file, non-UTF-8 content, or missing or
//! weak secret material is a fatal [`ConfigError`], never a per-call failure.
//! The three signing secrets are provisioned here, one per signer role, and
//! must be independently rotatable; configuration rejects reused values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

use mandate_gate_core::Currency;
use mandate_gate_core::PricingPolicy;
use mandate_gate_core::SecretKey;
use mandate_gate_core::SigningKeys;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "mandate-gate.toml";
/// Maximum accepted configuration file size in bytes.
const MAX_CONFIG_BYTES: u64 = 1_048_576;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4_096;
/// Minimum accepted secret length in bytes.
const MIN_SECRET_BYTES: usize = 16;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration load and validation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config path exceeds the maximum length.
    #[error("config path exceeds max length: {0} characters")]
    PathTooLong(usize),
    /// Config path contains an oversized component.
    #[error("config path component too long: {0}")]
    PathComponentTooLong(String),
    /// Config file exceeds the size limit.
    #[error("config file exceeds size limit: {actual} > {limit} bytes")]
    FileTooLarge {
        /// Actual file size in bytes.
        actual: u64,
        /// Maximum accepted size in bytes.
        limit: u64,
    },
    /// Config file is not valid UTF-8.
    #[error("config file must be utf-8")]
    NotUtf8,
    /// Config file could not be read.
    #[error("config io error: {0}")]
    Io(String),
    /// Config file could not be parsed as TOML.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Config content failed validation.
    #[error("config invalid: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Sections
// ============================================================================

/// Signing secret material, one secret per signer role.
///
/// # Invariants
/// - Required at load; missing secret material is a fatal configuration
///   error, not a per-call failure.
/// - Secrets must be independently rotatable; reuse across roles is rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct SecretsConfig {
    /// Secret for user-role signatures.
    pub user_secret: String,
    /// Secret for agent-role signatures.
    pub agent_secret: String,
    /// Secret for payment-authority-role signatures.
    pub payment_authority_secret: String,
}

impl SecretsConfig {
    /// Validates secret presence, strength, and role separation.
    fn validate(&self) -> Result<(), ConfigError> {
        for (label, secret) in [
            ("secrets.user_secret", &self.user_secret),
            ("secrets.agent_secret", &self.agent_secret),
            ("secrets.payment_authority_secret", &self.payment_authority_secret),
        ] {
            if secret.len() < MIN_SECRET_BYTES {
                return Err(ConfigError::Invalid(format!(
                    "{label} must be at least {MIN_SECRET_BYTES} bytes"
                )));
            }
        }
        if self.user_secret == self.agent_secret
            || self.user_secret == self.payment_authority_secret
            || self.agent_secret == self.payment_authority_secret
        {
            return Err(ConfigError::Invalid(
                "signer role secrets must be distinct".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the per-role signing keys.
    #[must_use]
    pub fn signing_keys(&self) -> SigningKeys {
        SigningKeys::new(
            SecretKey::from(self.user_secret.as_str()),
            SecretKey::from(self.agent_secret.as_str()),
            SecretKey::from(self.payment_authority_secret.as_str()),
        )
    }
}

/// Pricing policy settings.
///
/// # Invariants
/// - Values feed the landed-cost formula and must match across deployments
///   that share mandate records.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PricingConfig {
    /// Tax rate in basis points.
    #[serde(default = "default_tax_rate_bps")]
    pub tax_rate_bps: u32,
    /// Flat shipping in cents.
    #[serde(default = "default_flat_shipping_cents")]
    pub flat_shipping_cents: u64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate_bps: default_tax_rate_bps(),
            flat_shipping_cents: default_flat_shipping_cents(),
        }
    }
}

impl PricingConfig {
    /// Validates pricing ranges.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.tax_rate_bps > 10_000 {
            return Err(ConfigError::Invalid(
                "pricing.tax_rate_bps must not exceed 10000".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the runtime pricing policy.
    #[must_use]
    pub const fn policy(&self) -> PricingPolicy {
        PricingPolicy {
            tax_rate_bps: self.tax_rate_bps,
            flat_shipping_cents: self.flat_shipping_cents,
            currency: Currency::Usd,
        }
    }
}

/// Returns the default tax rate in basis points.
const fn default_tax_rate_bps() -> u32 {
    800
}

/// Returns the default flat shipping in cents.
const fn default_flat_shipping_cents() -> u64 {
    1_000
}

/// Monitoring scheduler settings.
///
/// # Invariants
/// - Intervals are interpreted as seconds; timeouts as milliseconds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between scheduler ticks.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u64,
    /// Default seconds between condition checks per job.
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,
    /// Maximum concurrent job evaluations.
    #[serde(default = "default_max_concurrent_checks")]
    pub max_concurrent_checks: usize,
    /// Bounded timeout for catalog calls in milliseconds.
    #[serde(default = "default_catalog_timeout_ms")]
    pub catalog_timeout_ms: u64,
    /// Bounded timeout for payment calls in milliseconds.
    #[serde(default = "default_payment_timeout_ms")]
    pub payment_timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: default_tick_interval_secs(),
            check_interval_secs: default_check_interval_secs(),
            max_concurrent_checks: default_max_concurrent_checks(),
            catalog_timeout_ms: default_catalog_timeout_ms(),
            payment_timeout_ms: default_payment_timeout_ms(),
        }
    }
}

impl MonitorConfig {
    /// Validates monitor ranges.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "monitor.tick_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.check_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "monitor.check_interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent_checks == 0 {
            return Err(ConfigError::Invalid(
                "monitor.max_concurrent_checks must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns the default scheduler tick interval in seconds.
const fn default_tick_interval_secs() -> u64 {
    5
}

/// Returns the default per-job check interval in seconds.
const fn default_check_interval_secs() -> u64 {
    300
}

/// Returns the default evaluation concurrency bound.
const fn default_max_concurrent_checks() -> usize {
    4
}

/// Returns the default catalog timeout in milliseconds.
const fn default_catalog_timeout_ms() -> u64 {
    5_000
}

/// Returns the default payment timeout in milliseconds.
const fn default_payment_timeout_ms() -> u64 {
    10_000
}

/// Durable store settings.
///
/// # Invariants
/// - `path` must resolve to a file path (not a directory).
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the store database file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// Returns the default store database path.
fn default_store_path() -> PathBuf {
    PathBuf::from("mandate_gate.db")
}

/// Returns the default busy timeout in milliseconds.
const fn default_busy_timeout_ms() -> u64 {
    5_000
}

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Root configuration for Mandate Gate processes.
///
/// # Invariants
/// - `secrets` is mandatory; every other section has complete defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct MandateGateConfig {
    /// Signing secret material.
    pub secrets: SecretsConfig,
    /// Pricing policy settings.
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Monitoring scheduler settings.
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Durable store settings.
    #[serde(default)]
    pub store: StoreConfig,
}

impl MandateGateConfig {
    /// Loads and validates configuration from a TOML file.
    ///
    /// Passing `None` reads [`DEFAULT_CONFIG_PATH`] from the working
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the path is unsafe, the file is
    /// unreadable, oversized, not UTF-8, unparsable, or fails validation.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        let path = path.unwrap_or(default_path);
        validate_path(path)?;

        let metadata = std::fs::metadata(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if metadata.len() > MAX_CONFIG_BYTES {
            return Err(ConfigError::FileTooLarge {
                actual: metadata.len(),
                limit: MAX_CONFIG_BYTES,
            });
        }
        let bytes = std::fs::read(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        let content = String::from_utf8(bytes).map_err(|_| ConfigError::NotUtf8)?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates every configuration section.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first unmet requirement.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.secrets.validate()?;
        self.pricing.validate()?;
        self.monitor.validate()?;
        Ok(())
    }
}

/// Validates path length guards before touching the filesystem.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let rendered = path.to_string_lossy();
    if rendered.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::PathTooLong(rendered.len()));
    }
    for component in path.components() {
        let component = component.as_os_str().to_string_lossy();
        if component.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::PathComponentTooLong(component.into_owned()));
        }
    }
    Ok(())
}
