//! Configuration system for the blitbridge runtime

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub link: LinkConfig,
    pub overlay: OverlayConfig,
    pub paths: PathConfig,
    pub debug: DebugConfig,
}

/// General runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Address the image is mapped at; entry points and extents are relative to it
    pub image_base: u32,
    /// Reject images whose header is not tagged for this device
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_device: Option<BlitDevice>,
}

/// Device an image was built for, as tagged in its header
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BlitDevice {
    /// 32blit hardware, pre-tag header layout
    Stm32h7Legacy,
    /// 32blit hardware
    Stm32h7,
    /// Any RP2040 based device
    Rp2040,
    Rp2350,
}

impl BlitDevice {
    /// Tag byte stored in the image header
    pub fn id(&self) -> u8 {
        match self {
            Self::Stm32h7Legacy => 0,
            Self::Stm32h7 => 1,
            Self::Rp2040 => 2,
            Self::Rp2350 => 3,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(Self::Stm32h7Legacy),
            1 => Some(Self::Stm32h7),
            2 => Some(Self::Rp2040),
            3 => Some(Self::Rp2350),
            _ => None,
        }
    }
}

/// Multiplayer link settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub connect_on_start: bool,
}

/// Diagnostic overlay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub enabled: bool,
    pub min_redraw_interval_ms: u64,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub games: PathBuf,
}

/// Debug settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub log_level: LogLevel,
    /// Log every init/tick/render call at trace level
    pub trace_ticks: bool,
}

/// Logging level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive string understood by `EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            image_base: 0x9000_0000,
            expected_device: None,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".to_string(),
            port: 0x32B1,
            connect_on_start: false,
        }
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_redraw_interval_ms: 100,
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("blitbridge");

        Self {
            games: base.join("games"),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            trace_ticks: false,
        }
    }
}

impl Config {
    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path, writing defaults if it is missing
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("blitbridge")
            .join("config.toml")
    }
}
