//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::domain::battery::{DEFAULT_FULL_VOLTAGE, DEFAULT_REPORTED_VOLTAGE};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "inkcast";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 10;
const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_GENERATION_MODEL: &str = "gpt-4o-mini";
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 30;
const DEFAULT_WEATHER_URL: &str = "https://api.open-meteo.com/v1/forecast";
const DEFAULT_WEATHER_TIMEOUT_SECS: u64 = 5;
const DEFAULT_HOLIDAY_TIMEOUT_SECS: u64 = 3;

/// Command-line arguments for the inkcast binary.
#[derive(Debug, Parser)]
#[command(name = "inkcast", version, about = "E-ink content server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "INKCAST_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server devices poll.
    Serve(Box<ServeArgs>),
    /// Produce one artifact and write it to a file.
    Render(RenderArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Allow at most one warm-up batch per device at a time.
    #[arg(
        long = "cache-coalesce-batches",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_coalesce_batches: Option<bool>,

    /// Override the content provider (canned|openai).
    #[arg(long = "generation-provider", value_name = "PROVIDER")]
    pub generation_provider: Option<String>,

    /// Override the device seed file.
    #[arg(long = "devices-seed-file", value_name = "PATH")]
    pub devices_seed_file: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    /// Device key to render for; omit for an unregistered poll.
    #[arg(long, value_name = "MAC")]
    pub mac: Option<String>,

    /// Persona to force.
    #[arg(long, value_name = "PERSONA")]
    pub persona: Option<String>,

    /// Reported battery voltage.
    #[arg(long, value_name = "VOLTS", default_value_t = DEFAULT_REPORTED_VOLTAGE)]
    pub voltage: f64,

    /// Where to write the artifact.
    #[arg(long, short = 'o', value_name = "PATH", default_value = "inkcast.svg")]
    pub output: PathBuf,

    /// Override the content provider (canned|openai).
    #[arg(long = "generation-provider", value_name = "PROVIDER")]
    pub generation_provider: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub generation: GenerationSettings,
    pub context: ContextSettings,
    pub devices: DevicesSettings,
    pub device: DeviceSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, Default)]
pub struct CacheSettings {
    pub coalesce_batches: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationProvider {
    /// Built-in offline content.
    Canned,
    /// OpenAI-compatible chat completions endpoint.
    OpenAi,
}

impl FromStr for GenerationProvider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "canned" => Ok(Self::Canned),
            "openai" => Ok(Self::OpenAi),
            other => Err(format!("unknown provider `{other}` (expected canned|openai)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub provider: GenerationProvider,
    pub api_base: Url,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ContextSettings {
    pub timezone: Tz,
    pub default_city: Option<String>,
    pub weather_url: Url,
    pub weather_timeout: Duration,
    pub holiday_url: Option<Url>,
    pub holiday_timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct DevicesSettings {
    pub seed_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DeviceSettings {
    pub full_voltage: f64,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("INKCAST").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Render(args)) => raw.apply_render_overrides(args),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    generation: RawGenerationSettings,
    context: RawContextSettings,
    devices: RawDevicesSettings,
    device: RawDeviceSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(coalesce) = overrides.cache_coalesce_batches {
            self.cache.coalesce_batches = Some(coalesce);
        }
        if let Some(provider) = overrides.generation_provider.as_ref() {
            self.generation.provider = Some(provider.clone());
        }
        if let Some(path) = overrides.devices_seed_file.as_ref() {
            self.devices.seed_file = Some(path.clone());
        }
    }

    fn apply_render_overrides(&mut self, args: &RenderArgs) {
        if let Some(provider) = args.generation_provider.as_ref() {
            self.generation.provider = Some(provider.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            cache,
            generation,
            context,
            devices,
            device,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            cache: CacheSettings {
                coalesce_batches: cache.coalesce_batches.unwrap_or(false),
            },
            generation: build_generation_settings(generation)?,
            context: build_context_settings(context)?,
            devices: DevicesSettings {
                seed_file: devices
                    .seed_file
                    .filter(|path| !path.as_os_str().is_empty()),
            },
            device: build_device_settings(device)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    let graceful_shutdown = non_zero_secs(graceful_secs, "server.graceful_shutdown_seconds")?;

    Ok(ServerSettings {
        addr,
        graceful_shutdown,
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_generation_settings(
    generation: RawGenerationSettings,
) -> Result<GenerationSettings, LoadError> {
    let provider = match generation.provider {
        Some(value) => GenerationProvider::from_str(&value)
            .map_err(|reason| LoadError::invalid("generation.provider", reason))?,
        None => GenerationProvider::Canned,
    };

    let api_base = parse_url(
        generation.api_base.as_deref().unwrap_or(DEFAULT_OPENAI_API_BASE),
        "generation.api_base",
    )?;
    let api_key = non_blank(generation.api_key);
    if provider == GenerationProvider::OpenAi && api_key.is_none() {
        return Err(LoadError::invalid(
            "generation.api_key",
            "required when provider is `openai`",
        ));
    }

    let model = non_blank(generation.model).unwrap_or_else(|| DEFAULT_GENERATION_MODEL.into());
    let timeout = non_zero_secs(
        generation
            .timeout_seconds
            .unwrap_or(DEFAULT_GENERATION_TIMEOUT_SECS),
        "generation.timeout_seconds",
    )?;

    Ok(GenerationSettings {
        provider,
        api_base,
        api_key,
        model,
        timeout,
    })
}

fn build_context_settings(context: RawContextSettings) -> Result<ContextSettings, LoadError> {
    let timezone = match non_blank(context.timezone) {
        Some(name) => Tz::from_str(&name).map_err(|err| {
            LoadError::invalid("context.timezone", format!("unknown timezone: {err}"))
        })?,
        None => Tz::UTC,
    };

    let weather_url = parse_url(
        context.weather_url.as_deref().unwrap_or(DEFAULT_WEATHER_URL),
        "context.weather_url",
    )?;
    let holiday_url = match non_blank(context.holiday_url) {
        Some(url) => Some(parse_url(&url, "context.holiday_url")?),
        None => None,
    };

    Ok(ContextSettings {
        timezone,
        default_city: non_blank(context.default_city),
        weather_url,
        weather_timeout: non_zero_secs(
            context
                .weather_timeout_seconds
                .unwrap_or(DEFAULT_WEATHER_TIMEOUT_SECS),
            "context.weather_timeout_seconds",
        )?,
        holiday_url,
        holiday_timeout: non_zero_secs(
            context
                .holiday_timeout_seconds
                .unwrap_or(DEFAULT_HOLIDAY_TIMEOUT_SECS),
            "context.holiday_timeout_seconds",
        )?,
    })
}

fn build_device_settings(device: RawDeviceSettings) -> Result<DeviceSettings, LoadError> {
    let full_voltage = device.full_voltage.unwrap_or(DEFAULT_FULL_VOLTAGE);
    if !full_voltage.is_finite() || full_voltage <= 0.0 {
        return Err(LoadError::invalid(
            "device.full_voltage",
            "must be a positive number of volts",
        ));
    }
    Ok(DeviceSettings { full_voltage })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    coalesce_batches: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawGenerationSettings {
    provider: Option<String>,
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContextSettings {
    timezone: Option<String>,
    default_city: Option<String>,
    weather_url: Option<String>,
    weather_timeout_seconds: Option<u64>,
    holiday_url: Option<String>,
    holiday_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDevicesSettings {
    seed_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDeviceSettings {
    full_voltage: Option<f64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    };
    candidate
        .parse()
        .map_err(|err| format!("invalid socket address `{candidate}`: {err}"))
}

fn parse_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    Url::parse(value.trim()).map_err(|err| LoadError::invalid(key, format!("invalid URL: {err}")))
}

fn non_zero_secs(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[cfg(test)]
mod tests;
