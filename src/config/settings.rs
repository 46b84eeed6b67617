//! Application configuration loading from config.toml
//!
//! The TOML file holds non-secret settings and optional seed data (demo venues,
//! global packages, development sessions). Secrets such as the webhook signing
//! key are read from the environment at start-up and never stored here.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::Path;

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "VENUE_BOOKING_CONFIG";

/// Environment variable holding the payment webhook signing secret.
pub const WEBHOOK_SECRET_ENV: &str = "PAYMENT_WEBHOOK_SECRET";

/// Upper bound for `pending_payment_timeout_minutes` (one week).
pub const MAX_PENDING_TIMEOUT_MINUTES: i64 = 7 * 24 * 60;

/// Upper bound for `sweep_interval_seconds` (one day).
pub const MAX_SWEEP_INTERVAL_SECONDS: u64 = 24 * 60 * 60;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Booking and checkout settings
    #[serde(default)]
    pub booking: BookingSettings,
    /// Venues to create on first start
    #[serde(default)]
    pub venues: Vec<VenueSeed>,
    /// Global packages to create on first start
    #[serde(default)]
    pub packages: Vec<PackageSeed>,
    /// Static bearer-token sessions for the built-in session provider
    #[serde(default)]
    pub sessions: Vec<SessionSeed>,
}

/// HTTP server settings
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// Booking and checkout settings
#[derive(Debug, Deserialize, Clone)]
pub struct BookingSettings {
    /// Lowercase ISO currency code sent to the payment provider
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Public URL of the web front end, used for checkout redirects
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    /// Hosted checkout page of the payment provider
    #[serde(default = "default_checkout_base_url")]
    pub checkout_base_url: String,
    /// Pending bookings older than this are cancelled by the reconciliation sweep
    #[serde(default = "default_pending_timeout_minutes")]
    pub pending_payment_timeout_minutes: i64,
    /// How often the reconciliation sweep runs
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

impl Default for BookingSettings {
    fn default() -> Self {
        Self {
            currency: default_currency(),
            public_base_url: default_public_base_url(),
            checkout_base_url: default_checkout_base_url(),
            pending_payment_timeout_minutes: default_pending_timeout_minutes(),
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

/// A venue to seed, with its pricing rules and own packages
#[derive(Debug, Deserialize, Clone)]
pub struct VenueSeed {
    /// Owning host's user ID
    pub host_id: String,
    /// Display title
    pub title: String,
    /// Unique slug; seeding is skipped when it already exists
    pub slug: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Street line
    pub address_street: String,
    /// Neighborhood
    pub address_neighborhood: String,
    /// City
    pub address_city: String,
    /// Seated capacity
    pub max_capacity_seated: i32,
    /// Standing capacity
    pub max_capacity_standing: i32,
    /// Amenity labels
    #[serde(default)]
    pub amenities: Vec<String>,
    /// Image URLs
    #[serde(default)]
    pub images: Vec<String>,
    /// Pricing rules by day of week
    #[serde(default)]
    pub pricing_rules: Vec<PricingRuleSeed>,
    /// Venue-scoped packages
    #[serde(default)]
    pub packages: Vec<PackageSeed>,
}

/// A pricing rule to seed
#[derive(Debug, Deserialize, Clone)]
pub struct PricingRuleSeed {
    /// 0 = Sunday through 6 = Saturday
    pub day_of_week: u32,
    /// `hourly`, `daily` or `per_person`
    pub pricing_model: String,
    /// Base price in currency units
    pub base_price: f64,
    /// Minimum spend in currency units
    #[serde(default)]
    pub minimum_spend: f64,
    /// Minimum hours
    #[serde(default)]
    pub min_hours: u32,
}

/// A package to seed
#[derive(Debug, Deserialize, Clone)]
pub struct PackageSeed {
    /// Display name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Price in currency units
    pub price: f64,
    /// `fixed` or `per_person`
    pub price_type: String,
    /// Package category
    pub category: String,
}

/// A static session token for the built-in session provider
#[derive(Debug, Deserialize, Clone)]
pub struct SessionSeed {
    /// Bearer token
    pub token: String,
    /// User the token authenticates
    pub user_id: String,
    /// `client`, `host` or `admin`
    pub role: String,
}

impl BookingSettings {
    /// Rejects timings the reconciliation sweep cannot run with.
    ///
    /// A non-positive timeout would cancel bookings whose checkout is still open.
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_PENDING_TIMEOUT_MINUTES).contains(&self.pending_payment_timeout_minutes) {
            return Err(Error::Config {
                message: format!(
                    "pending_payment_timeout_minutes must be between 1 and {MAX_PENDING_TIMEOUT_MINUTES}, got {}",
                    self.pending_payment_timeout_minutes
                ),
            });
        }
        if !(1..=MAX_SWEEP_INTERVAL_SECONDS).contains(&self.sweep_interval_seconds) {
            return Err(Error::Config {
                message: format!(
                    "sweep_interval_seconds must be between 1 and {MAX_SWEEP_INTERVAL_SECONDS}, got {}",
                    self.sweep_interval_seconds
                ),
            });
        }
        Ok(())
    }

    /// Age after which an unpaid booking is cancelled.
    pub fn pending_timeout(&self) -> Result<chrono::Duration> {
        self.validate()?;
        chrono::Duration::try_minutes(self.pending_payment_timeout_minutes).ok_or_else(|| Error::Config {
            message: format!(
                "pending_payment_timeout_minutes {} is out of range",
                self.pending_payment_timeout_minutes
            ),
        })
    }
}

fn default_bind_address() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_currency() -> String {
    "brl".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_checkout_base_url() -> String {
    "https://checkout.sandbox.local/pay".to_string()
}

const fn default_pending_timeout_minutes() -> i64 {
    30
}

const fn default_sweep_interval_seconds() -> u64 {
    300
}

/// Loads application configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;

    parse_config(&contents)
}

/// Parses configuration from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    let config: AppConfig = toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })?;
    config.booking.validate()?;
    Ok(config)
}

/// Loads configuration from `VENUE_BOOKING_CONFIG`, or ./config.toml.
///
/// A missing default file yields the built-in defaults; a missing file that was
/// named explicitly is an error.
pub fn load_default_config() -> Result<AppConfig> {
    match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => load_config(path),
        Err(_) if Path::new("config.toml").exists() => load_config("config.toml"),
        Err(_) => {
            tracing::warn!("No config.toml found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

/// Reads the webhook signing secret from the environment.
pub fn webhook_secret() -> Result<String> {
    let secret = std::env::var(WEBHOOK_SECRET_ENV)?;
    if secret.trim().is_empty() {
        return Err(Error::Config {
            message: format!("{WEBHOOK_SECRET_ENV} is empty"),
        });
    }
    Ok(secret)
}
