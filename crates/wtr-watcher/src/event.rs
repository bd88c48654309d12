//! Typed events, as reported by the native engine.

use std::fmt;

use chrono::{DateTime, Utc};
use int_enum::IntEnum;
use serde::{Deserialize, Serialize};
use strum::Display;

/// The effect observed on a path.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntEnum,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[repr(i8)]
pub enum EffectType {
	Rename = 0,
	Modify = 1,
	Create = 2,
	Destroy = 3,
	Owner = 4,
	Other = 5,
}

/// The type of a path as it was observed when the effect happened.
///
/// [`PathType::Watcher`] is special: those events carry status messages from the
/// engine itself (watch started, watch stopped, errors and warnings) and their
/// `path_name` is a message, not a filesystem path.
#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, IntEnum,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
#[repr(i8)]
pub enum PathType {
	Dir = 0,
	File = 1,
	HardLink = 2,
	SymLink = 3,
	Watcher = 4,
	Other = 5,
}

/// Something that happened on the filesystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "event")]
pub struct Event {
	pub path_name: String,
	pub effect_type: EffectType,
	pub path_type: PathType,
	pub effect_time: DateTime<Utc>,
	/// Destination of a rename, empty when not applicable
	pub associated_path_name: String,
}

impl Event {
	pub fn associated(&self) -> Option<&str> {
		(!self.associated_path_name.is_empty()).then_some(self.associated_path_name.as_str())
	}

	pub fn is_watcher_status(&self) -> bool {
		self.path_type == PathType::Watcher
	}
}

impl fmt::Display for Event {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(
			f,
			"{} {} {} {}",
			self.effect_time.to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
			self.effect_type,
			self.path_type,
			self.path_name
		)?;

		if let Some(associated) = self.associated() {
			write!(f, " -> {associated}")?;
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample(associated: &str) -> Event {
		Event {
			path_name: "/tmp/a".to_string(),
			effect_type: EffectType::Rename,
			path_type: PathType::File,
			effect_time: DateTime::from_timestamp_nanos(1_700_000_000_000_000_001),
			associated_path_name: associated.to_string(),
		}
	}

	#[test]
	fn test_enum_discriminants() {
		assert_eq!(EffectType::try_from(0), Ok(EffectType::Rename));
		assert_eq!(EffectType::try_from(5), Ok(EffectType::Other));
		assert_eq!(EffectType::try_from(6), Err(6));
		assert_eq!(PathType::try_from(4), Ok(PathType::Watcher));
		assert_eq!(PathType::try_from(-1), Err(-1));
		assert_eq!(i8::from(PathType::SymLink), 3);
	}

	#[test]
	fn test_enum_names() {
		assert_eq!(EffectType::Destroy.to_string(), "destroy");
		assert_eq!(PathType::HardLink.to_string(), "hard_link");
		assert_eq!(
			serde_json::to_string(&PathType::SymLink).unwrap(),
			"\"sym_link\""
		);
	}

	#[test]
	fn test_associated() {
		assert_eq!(sample("").associated(), None);
		assert_eq!(sample("/tmp/b").associated(), Some("/tmp/b"));
	}

	#[test]
	fn test_display() {
		assert_eq!(
			sample("/tmp/b").to_string(),
			"2023-11-14T22:13:20.000000001Z rename file /tmp/a -> /tmp/b"
		);
		assert_eq!(
			sample("").to_string(),
			"2023-11-14T22:13:20.000000001Z rename file /tmp/a"
		);
	}

	#[test]
	fn test_watcher_status() {
		let mut event = sample("");
		assert!(!event.is_watcher_status());
		event.path_type = PathType::Watcher;
		assert!(event.is_watcher_status());
	}
}
