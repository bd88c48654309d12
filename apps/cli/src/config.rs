//! CLI-specific configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wtr_watcher::{LoaderConfig, StreamConfig};

/// How events are printed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
	/// One human readable line per event
	#[default]
	Human,
	/// One JSON object per line
	Json,
}

/// CLI configuration stored in the config directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
	/// Where and which native library to load
	#[serde(default)]
	pub loader: LoaderConfig,
	/// Event buffering between the engine and the printer
	#[serde(default)]
	pub stream: StreamConfig,
	/// Output format used when none is given on the command line
	#[serde(default)]
	pub format: OutputFormat,
}

impl CliConfig {
	/// Get the CLI config file path
	pub fn config_path(config_dir: &Path) -> PathBuf {
		config_dir.join("wtr-watch.json")
	}

	/// Load CLI config from the config directory, writing the defaults if there's none yet
	pub fn load(config_dir: &Path) -> Result<Self> {
		let config_path = Self::config_path(config_dir);

		if config_path.exists() {
			let json = std::fs::read_to_string(&config_path)
				.with_context(|| format!("failed to read {}", config_path.display()))?;
			serde_json::from_str(&json)
				.with_context(|| format!("failed to parse {}", config_path.display()))
		} else {
			let config = Self::default();
			config.save(config_dir)?;
			Ok(config)
		}
	}

	/// Save CLI config to the config directory
	pub fn save(&self, config_dir: &Path) -> Result<()> {
		std::fs::create_dir_all(config_dir)?;

		let config_path = Self::config_path(config_dir);
		let json = serde_json::to_string_pretty(self)?;
		std::fs::write(&config_path, json)?;
		Ok(())
	}
}
