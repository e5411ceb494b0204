//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::render::{
    DEFAULT_FENCE_LANGUAGE, DEFAULT_FORMAT, DEFAULT_QUALITY, DEFAULT_SERVER_URL,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "manimark";
const DEFAULT_ASSETS_DIR: &str = "manimark-assets";

/// Command-line arguments for the `manimark` binary.
#[derive(Debug, Parser)]
#[command(
    name = "manimark",
    version,
    about = "Render Manim code fences through a Manim render server"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MANIMARK_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render a Markdown document, replacing Manim fences with their media.
    Document(DocumentArgs),
    /// Render a single Manim source file into an HTML fragment.
    Block(BlockArgs),
}

impl Command {
    fn overrides(&self) -> &RenderOverrides {
        match self {
            Command::Document(args) => &args.overrides,
            Command::Block(args) => &args.overrides,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct DocumentArgs {
    #[command(flatten)]
    pub overrides: RenderOverrides,

    /// Markdown file to render.
    #[arg(value_name = "INPUT", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Write HTML here instead of stdout.
    #[arg(long, short = 'o', value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct BlockArgs {
    #[command(flatten)]
    pub overrides: RenderOverrides,

    /// Manim source file to render.
    #[arg(value_name = "SOURCE", value_hint = ValueHint::FilePath)]
    pub source: PathBuf,

    /// Annotation line, e.g. "scene=Intro format=gif quality=medium".
    #[arg(long, value_name = "LINE", default_value = "")]
    pub info: String,

    /// Write HTML here instead of stdout.
    #[arg(long, short = 'o', value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Override the render server base URL.
    #[arg(long = "server-url", value_name = "URL")]
    pub server_url: Option<String>,

    /// Override the format used when a fence does not name one.
    #[arg(long = "default-format", value_name = "FORMAT")]
    pub default_format: Option<String>,

    /// Override the quality used when a fence does not name one.
    #[arg(long = "default-quality", value_name = "QUALITY")]
    pub default_quality: Option<String>,

    /// Override the fence language tag that triggers rendering.
    #[arg(long = "fence-language", value_name = "TAG")]
    pub fence_language: Option<String>,

    /// Give up on the render server after this many seconds.
    #[arg(long = "request-timeout-seconds", value_name = "SECONDS")]
    pub request_timeout_seconds: Option<u64>,

    /// Override how rendered media is referenced from the HTML.
    #[arg(long = "media", value_name = "MODE")]
    pub media: Option<MediaMode>,

    /// Override the directory rendered media is written to in `directory` mode.
    #[arg(long = "assets-dir", value_name = "PATH")]
    pub assets_dir: Option<PathBuf>,

    /// Override the URL prefix used to link media in `directory` mode.
    #[arg(long = "assets-url-prefix", value_name = "PREFIX")]
    pub assets_url_prefix: Option<String>,

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
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MediaMode {
    /// Embed media as `data:` URLs.
    #[default]
    Inline,
    /// Write media files into the assets directory.
    Directory,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub renderer: RendererSettings,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct RendererSettings {
    pub server_url: String,
    pub default_format: String,
    pub default_quality: String,
    pub fence_language: String,
    pub request_timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub media: MediaMode,
    pub assets_dir: PathBuf,
    pub assets_url_prefix: String,
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

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("MANIMARK").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(cli.command.overrides());

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    renderer: RawRendererSettings,
    output: RawOutputSettings,
    logging: RawLoggingSettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRendererSettings {
    server_url: Option<String>,
    default_format: Option<String>,
    default_quality: Option<String>,
    fence_language: Option<String>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawOutputSettings {
    media: Option<MediaMode>,
    assets_dir: Option<PathBuf>,
    assets_url_prefix: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &RenderOverrides) {
        if let Some(url) = overrides.server_url.as_ref() {
            self.renderer.server_url = Some(url.clone());
        }
        if let Some(format) = overrides.default_format.as_ref() {
            self.renderer.default_format = Some(format.clone());
        }
        if let Some(quality) = overrides.default_quality.as_ref() {
            self.renderer.default_quality = Some(quality.clone());
        }
        if let Some(language) = overrides.fence_language.as_ref() {
            self.renderer.fence_language = Some(language.clone());
        }
        if let Some(seconds) = overrides.request_timeout_seconds {
            self.renderer.request_timeout_seconds = Some(seconds);
        }
        if let Some(media) = overrides.media {
            self.output.media = Some(media);
        }
        if let Some(dir) = overrides.assets_dir.as_ref() {
            self.output.assets_dir = Some(dir.clone());
        }
        if let Some(prefix) = overrides.assets_url_prefix.as_ref() {
            self.output.assets_url_prefix = Some(prefix.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            renderer,
            output,
            logging,
        } = raw;

        Ok(Self {
            renderer: build_renderer_settings(renderer)?,
            output: build_output_settings(output)?,
            logging: build_logging_settings(logging)?,
        })
    }
}

fn build_renderer_settings(renderer: RawRendererSettings) -> Result<RendererSettings, LoadError> {
    let server_url = non_blank(renderer.server_url, DEFAULT_SERVER_URL);
    Url::parse(&server_url)
        .map_err(|err| LoadError::invalid("renderer.server_url", format!("{server_url}: {err}")))?;

    let request_timeout = match renderer.request_timeout_seconds {
        Some(0) => {
            return Err(LoadError::invalid(
                "renderer.request_timeout_seconds",
                "must be greater than zero",
            ));
        }
        Some(seconds) => Some(Duration::from_secs(seconds)),
        None => None,
    };

    Ok(RendererSettings {
        server_url,
        default_format: non_blank(renderer.default_format, DEFAULT_FORMAT),
        default_quality: non_blank(renderer.default_quality, DEFAULT_QUALITY),
        fence_language: non_blank(renderer.fence_language, DEFAULT_FENCE_LANGUAGE),
        request_timeout,
    })
}

fn build_output_settings(output: RawOutputSettings) -> Result<OutputSettings, LoadError> {
    let assets_dir = output
        .assets_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_ASSETS_DIR));
    if assets_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "output.assets_dir",
            "path must not be empty",
        ));
    }

    let assets_url_prefix = output
        .assets_url_prefix
        .unwrap_or_else(|| assets_dir.to_string_lossy().into_owned());

    Ok(OutputSettings {
        media: output.media.unwrap_or_default(),
        assets_dir,
        assets_url_prefix,
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

/// Trimmed value, or `fallback` when missing or blank.
fn non_blank(value: Option<String>, fallback: &str) -> String {
    value
        .and_then(|value| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .unwrap_or_else(|| fallback.to_string())
}

#[cfg(test)]
mod tests;
