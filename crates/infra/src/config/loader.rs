//! Configuration loader
//!
//! Builds the application [`Config`] once at startup.
//!
//! ## Loading Strategy
//! 1. Loads a `.env` file into the process environment when present
//! 2. Reads a config file (`BOOKING_CONFIG` or the first probed location)
//!    as the base, or starts from defaults when none exists
//! 3. Applies environment variables on top
//!
//! ## Environment Variables
//! - `GOOGLE_SERVICE_ACCOUNT_JSON`, `GOOGLE_CALENDAR_ID`,
//!   `GOOGLE_APPOINTMENT_SET_KEY`, `GOOGLE_CALENDAR_WATCH_TTL_SECONDS`,
//!   `GOOGLE_CALENDAR_ADMIN_TOKEN`, `GOOGLE_CALENDAR_API_BASE`
//! - `BOOKING_TOKEN_SECRET` (falls back to `SUPABASE_SERVICE_ROLE_KEY`)
//! - `STRIPE_WEBHOOK_SECRET`
//! - `BOOKING_PUBLIC_URL`, `BOOKING_BIND_ADDR`, `BOOKING_ALLOWED_ORIGINS`
//!   (comma separated), `BOOKING_DEFAULT_ORIGIN`
//! - `BOOKING_DB_PATH`, `BOOKING_DB_POOL_SIZE`
//! - `SUPABASE_URL` + `SUPABASE_SERVICE_ROLE_KEY` select the hosted store
//! - `BOOKING_WATCH_RENEWAL_CRON`, `BOOKING_WATCH_RENEWAL_WINDOW_SECONDS`
//!
//! ## File Locations
//! `./bookingsync.{toml,json}` and `./config.{toml,json}` in the working
//! directory, then the same names next to the executable.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use bookingsync_domain::{BookingError, Config, Result, StorageConfig};

/// Load configuration: optional file base plus environment overrides.
///
/// # Errors
/// Returns `BookingError::Config` if a config file exists but cannot be
/// parsed, or a numeric environment variable is malformed.
pub fn load() -> Result<Config> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "Loaded .env file");
    }

    let explicit = std::env::var("BOOKING_CONFIG").ok().map(PathBuf::from);
    let base = match explicit.or_else(probe_config_paths) {
        Some(path) => load_from_file(Some(path))?,
        None => Config::default(),
    };

    let config = apply_overrides(base, |key| std::env::var(key).ok())?;
    tracing::info!(
        storage = storage_label(&config.storage),
        calendar_configured = config.calendar.calendar_id.is_some(),
        "Configuration loaded"
    );
    Ok(config)
}

/// Load configuration from environment variables over defaults.
///
/// # Errors
/// Returns `BookingError::Config` for malformed numeric values.
pub fn load_from_env() -> Result<Config> {
    apply_overrides(Config::default(), |key| std::env::var(key).ok())
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations. Supports JSON and
/// TOML (detected by file extension); missing sections take defaults.
///
/// # Errors
/// Returns `BookingError::Config` if the file is missing, unreadable or
/// malformed.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(BookingError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            BookingError::Config("No config file found in any of the standard locations".into())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| BookingError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| BookingError::Config(format!("Invalid TOML format: {e}"))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| BookingError::Config(format!("Invalid JSON format: {e}"))),
        _ => Err(BookingError::Config(format!("Unsupported config format: {extension}"))),
    }
}

/// First existing config file in the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["bookingsync.toml", "bookingsync.json", "config.toml", "config.json"];

    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    dirs.iter().flat_map(|dir| NAMES.iter().map(move |name| dir.join(name))).find(|p| p.exists())
}

/// Overlay values from `lookup` (usually the process environment) onto
/// `config`. Blank values are ignored.
///
/// # Errors
/// Returns `BookingError::Config` when a numeric value does not parse.
pub fn apply_overrides<F>(mut config: Config, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    // Server
    if let Some(addr) = get("BOOKING_BIND_ADDR") {
        config.server.bind_addr = addr;
    }
    if let Some(url) = get("BOOKING_PUBLIC_URL") {
        config.server.public_url = Some(url);
    }
    if let Some(origins) = get("BOOKING_ALLOWED_ORIGINS") {
        config.server.allowed_origins = origins
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(origin) = get("BOOKING_DEFAULT_ORIGIN") {
        config.server.default_origin = origin;
    }

    // Calendar
    let calendar = &mut config.calendar;
    if let Some(value) = lookup("GOOGLE_SERVICE_ACCOUNT_JSON").filter(|v| !v.trim().is_empty()) {
        calendar.service_account_json = Some(value);
    }
    if let Some(id) = get("GOOGLE_CALENDAR_ID") {
        calendar.calendar_id = Some(id);
    }
    if let Some(key) = get("GOOGLE_APPOINTMENT_SET_KEY") {
        calendar.appointment_set_key = key;
    }
    if let Some(ttl) = parse_var(&get, "GOOGLE_CALENDAR_WATCH_TTL_SECONDS")? {
        calendar.watch_ttl_seconds = ttl;
    }
    if let Some(token) = get("GOOGLE_CALENDAR_ADMIN_TOKEN") {
        calendar.admin_token = Some(token);
    }
    if let Some(base) = get("GOOGLE_CALENDAR_API_BASE") {
        calendar.api_base = base;
    }
    if let Some(cron) = get("BOOKING_WATCH_RENEWAL_CRON") {
        calendar.renewal_cron = cron;
    }
    if let Some(window) = parse_var(&get, "BOOKING_WATCH_RENEWAL_WINDOW_SECONDS")? {
        calendar.renewal_window_seconds = window;
    }

    // Tokens and payments
    if let Some(secret) = get("BOOKING_TOKEN_SECRET").or_else(|| get("SUPABASE_SERVICE_ROLE_KEY"))
    {
        config.tokens.secret = Some(secret);
    }
    if let Some(secret) = get("STRIPE_WEBHOOK_SECRET") {
        config.payments.stripe_webhook_secret = Some(secret);
    }

    // Storage
    match (get("SUPABASE_URL"), get("SUPABASE_SERVICE_ROLE_KEY")) {
        (Some(url), Some(service_key)) => {
            config.storage = StorageConfig::Postgrest { url, service_key };
        }
        _ => {
            if let StorageConfig::Sqlite { path, pool_size } = &mut config.storage {
                if let Some(db_path) = get("BOOKING_DB_PATH") {
                    *path = db_path;
                }
                if let Some(size) = parse_var(&get, "BOOKING_DB_POOL_SIZE")? {
                    *pool_size = size;
                }
            }
        }
    }

    Ok(config)
}

fn parse_var<T, G>(get: &G, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| BookingError::Config(format!("Invalid {key}: {e}")))
        })
        .transpose()
}

fn storage_label(storage: &StorageConfig) -> &'static str {
    match storage {
        StorageConfig::Sqlite { .. } => "sqlite",
        StorageConfig::Postgrest { .. } => "postgrest",
    }
}
