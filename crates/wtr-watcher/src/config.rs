use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Version of `libwatcher-c` these bindings are written against.
pub const LIBRARY_VERSION: &str = "0.12.2";

/// Directory, next to the running executable, where the native library is installed.
pub const LIBRARY_SUBDIR: &str = ".wtr_watcher.libs";

pub const DEFAULT_STREAM_CAPACITY: usize = 1024;

/// How the native library is located.
///
/// Only the first successful load in a process uses this; the library is never reloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
	/// Directory containing the native library. Defaults to
	/// `<executable dir>/.wtr_watcher.libs`.
	#[serde(default)]
	pub library_dir: Option<PathBuf>,
	/// Version embedded in the library file name
	#[serde(default = "default_version")]
	pub version: String,
}

fn default_version() -> String {
	LIBRARY_VERSION.to_string()
}

impl Default for LoaderConfig {
	fn default() -> Self {
		Self {
			library_dir: None,
			version: default_version(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
	/// Events buffered between the native engine and the consumer before the engine
	/// is made to wait
	pub capacity: usize,
}

impl Default for StreamConfig {
	fn default() -> Self {
		Self {
			capacity: DEFAULT_STREAM_CAPACITY,
		}
	}
}
