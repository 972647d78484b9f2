// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// This module handles loading and parsing configuration from config.toml.
// Provides sensible defaults if config file is missing or has errors.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::mesh::MeshKind;

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub window: WindowConfig,
    pub graphics: GraphicsConfig,
    pub debug: DebugConfig,
}

/// Window settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Prism".to_string(),
            width: 1700,
            height: 900,
            fullscreen: false,
        }
    }
}

/// Graphics settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    pub present_mode: String,
    pub clear_color: [f32; 4],
    pub frames_in_flight: usize,
    pub mesh: String,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            present_mode: "fifo".to_string(),
            clear_color: [0.0, 0.0, 0.0, 1.0],
            frames_in_flight: 2,
            mesh: "triangle".to_string(),
        }
    }
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation_layers: bool,
    pub show_fps: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: true,
            show_fps: true,
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults if not found
    pub fn load() -> Self {
        Self::load_from_path("config.toml").unwrap_or_else(|e| {
            log::warn!("Failed to load config.toml: {}. Using defaults.", e);
            Config::default()
        })
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Get present mode as Vulkan enum
    pub fn present_mode(&self) -> ash::vk::PresentModeKHR {
        match self.graphics.present_mode.to_lowercase().as_str() {
            "immediate" => ash::vk::PresentModeKHR::IMMEDIATE,
            "mailbox" => ash::vk::PresentModeKHR::MAILBOX,
            "fifo" => ash::vk::PresentModeKHR::FIFO,
            "fifo_relaxed" => ash::vk::PresentModeKHR::FIFO_RELAXED,
            _ => {
                log::warn!(
                    "Unknown present mode '{}', defaulting to FIFO",
                    self.graphics.present_mode
                );
                ash::vk::PresentModeKHR::FIFO
            }
        }
    }

    /// Which built-in mesh to load
    pub fn mesh_kind(&self) -> MeshKind {
        match self.graphics.mesh.to_lowercase().as_str() {
            "triangle" => MeshKind::Triangle,
            "cube" => MeshKind::Cube,
            _ => {
                log::warn!(
                    "Unknown mesh '{}', defaulting to triangle",
                    self.graphics.mesh
                );
                MeshKind::Triangle
            }
        }
    }

    /// Sync-object set count; at least one frame must be in flight
    pub fn frames_in_flight(&self) -> usize {
        self.graphics.frames_in_flight.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_stock_window() {
        let config = Config::default();
        assert_eq!(config.window.width, 1700);
        assert_eq!(config.window.height, 900);
        assert!(!config.window.fullscreen);
        assert_eq!(config.frames_in_flight(), 2);
        assert_eq!(config.present_mode(), ash::vk::PresentModeKHR::FIFO);
        assert_eq!(config.mesh_kind(), MeshKind::Triangle);
    }

    #[test]
    fn unknown_present_mode_falls_back_to_fifo() {
        let mut config = Config::default();
        config.graphics.present_mode = "warp-speed".to_string();
        assert_eq!(config.present_mode(), ash::vk::PresentModeKHR::FIFO);

        config.graphics.present_mode = "MAILBOX".to_string();
        assert_eq!(config.present_mode(), ash::vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn frames_in_flight_never_drops_below_one() {
        let mut config = Config::default();
        config.graphics.frames_in_flight = 0;
        assert_eq!(config.frames_in_flight(), 1);
    }

    #[test]
    fn partial_toml_keeps_defaults_for_the_rest() {
        let config: Config = toml::from_str(
            r#"
            [graphics]
            mesh = "cube"
            frames_in_flight = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.mesh_kind(), MeshKind::Cube);
        assert_eq!(config.frames_in_flight(), 3);
        assert_eq!(config.window.width, 1700);
        assert!(config.debug.validation_layers);
    }
}
