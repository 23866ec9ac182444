//! Runtime settings
//!
//! Settings are read from TOML and may be overridden by environment
//! variables carrying a prefix (`CRUDKIT_` by default):
//!
//! ```toml
//! channel_capacity = 512
//! max_page_size = 50
//! introspection = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_ENV_PREFIX: &str = "CRUDKIT_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrudSettings {
	/// Buffer size of each per-model broadcast channel.
	pub channel_capacity: usize,
	pub max_query_depth: usize,
	pub max_query_complexity: usize,
	/// `take` applied by storage adapters when the caller gives none.
	pub default_page_size: Option<i64>,
	/// Upper clamp for `take` in storage adapters.
	pub max_page_size: i64,
	pub introspection: bool,
}

impl Default for CrudSettings {
	fn default() -> Self {
		Self {
			channel_capacity: 256,
			max_query_depth: 10,
			max_query_complexity: 1000,
			default_page_size: None,
			max_page_size: 100,
			introspection: true,
		}
	}
}

impl CrudSettings {
	pub fn from_toml_str(contents: &str) -> Result<Self, SettingsError> {
		toml::from_str(contents).map_err(|e| SettingsError::ParseError(format!("TOML parse error: {e}")))
	}

	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
		let path = path.as_ref();
		let contents = std::fs::read_to_string(path).map_err(|e| {
			SettingsError::FileError(format!("Failed to read {}: {}", path.display(), e))
		})?;
		Self::from_toml_str(&contents)
	}

	/// Defaults overridden by `CRUDKIT_*` environment variables.
	pub fn from_env() -> Result<Self, SettingsError> {
		Self::default().with_env(DEFAULT_ENV_PREFIX)
	}

	/// Applies environment overrides named `{prefix}{KEY}` on top of `self`.
	pub fn with_env(self, prefix: &str) -> Result<Self, SettingsError> {
		self.with_overrides(prefix, |key| std::env::var(key).ok())
	}

	/// Applies overrides from an arbitrary lookup, keyed like environment variables.
	pub fn with_overrides<F>(mut self, prefix: &str, lookup: F) -> Result<Self, SettingsError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let read = |key: &str| {
			let full_key = format!("{prefix}{key}");
			let value = lookup(&full_key)?;
			tracing::debug!(key = %full_key, "settings override applied");
			Some((full_key, value))
		};

		if let Some((key, value)) = read("CHANNEL_CAPACITY") {
			self.channel_capacity = parse(&key, &value)?;
		}
		if let Some((key, value)) = read("MAX_QUERY_DEPTH") {
			self.max_query_depth = parse(&key, &value)?;
		}
		if let Some((key, value)) = read("MAX_QUERY_COMPLEXITY") {
			self.max_query_complexity = parse(&key, &value)?;
		}
		if let Some((key, value)) = read("DEFAULT_PAGE_SIZE") {
			self.default_page_size = if value.trim().is_empty() {
				None
			} else {
				Some(parse(&key, &value)?)
			};
		}
		if let Some((key, value)) = read("MAX_PAGE_SIZE") {
			self.max_page_size = parse(&key, &value)?;
		}
		if let Some((key, value)) = read("INTROSPECTION") {
			self.introspection = parse_bool(&key, &value)?;
		}

		self.validate()?;
		Ok(self)
	}

	pub fn validate(&self) -> Result<(), SettingsError> {
		if self.channel_capacity == 0 {
			return Err(SettingsError::ValidationError(
				"channel_capacity must be greater than zero".to_string(),
			));
		}
		if self.max_page_size < 1 {
			return Err(SettingsError::ValidationError(
				"max_page_size must be at least 1".to_string(),
			));
		}
		Ok(())
	}
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SettingsError>
where
	T::Err: std::fmt::Display,
{
	value.trim().parse::<T>().map_err(|e| SettingsError::EnvError {
		key: key.to_string(),
		message: e.to_string(),
	})
}

fn parse_bool(key: &str, value: &str) -> Result<bool, SettingsError> {
	match value.trim().to_lowercase().as_str() {
		"true" | "1" | "yes" | "on" => Ok(true),
		"false" | "0" | "no" | "off" => Ok(false),
		other => Err(SettingsError::EnvError {
			key: key.to_string(),
			message: format!("invalid boolean '{other}'"),
		}),
	}
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
	#[error("File error: {0}")]
	FileError(String),

	#[error("Parse error: {0}")]
	ParseError(String),

	#[error("Invalid value for {key}: {message}")]
	EnvError { key: String, message: String },

	#[error("Validation error: {0}")]
	ValidationError(String),
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::collections::HashMap;
	use std::io::Write;

	fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let vars: HashMap<String, String> = vars
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect();
		move |key| vars.get(key).cloned()
	}

	#[rstest]
	fn test_partial_toml_keeps_defaults() {
		let settings = CrudSettings::from_toml_str("max_page_size = 25\nintrospection = false").unwrap();

		assert_eq!(settings.max_page_size, 25);
		assert!(!settings.introspection);
		assert_eq!(settings.channel_capacity, 256);
		assert_eq!(settings.default_page_size, None);
	}

	#[rstest]
	fn test_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "channel_capacity = 8\ndefault_page_size = 20").unwrap();

		let settings = CrudSettings::from_file(file.path()).unwrap();

		assert_eq!(settings.channel_capacity, 8);
		assert_eq!(settings.default_page_size, Some(20));
	}

	#[rstest]
	fn test_invalid_toml_is_a_parse_error() {
		let err = CrudSettings::from_toml_str("channel_capacity = \"many\"").unwrap_err();

		assert!(matches!(err, SettingsError::ParseError(_)));
	}

	#[rstest]
	fn test_overrides_use_prefix() {
		let settings = CrudSettings::default()
			.with_overrides(
				"APP_",
				lookup(&[
					("APP_MAX_QUERY_DEPTH", "4"),
					("APP_INTROSPECTION", "off"),
					("CRUDKIT_MAX_PAGE_SIZE", "3"),
				]),
			)
			.unwrap();

		assert_eq!(settings.max_query_depth, 4);
		assert!(!settings.introspection);
		assert_eq!(settings.max_page_size, 100);
	}

	#[rstest]
	#[case("CRUDKIT_CHANNEL_CAPACITY", "lots")]
	#[case("CRUDKIT_INTROSPECTION", "maybe")]
	fn test_unparseable_override_is_rejected(#[case] key: &str, #[case] value: &str) {
		let err = CrudSettings::default()
			.with_overrides(DEFAULT_ENV_PREFIX, lookup(&[(key, value)]))
			.unwrap_err();

		match err {
			SettingsError::EnvError { key: reported, .. } => assert_eq!(reported, key),
			other => panic!("Expected EnvError, got {other:?}"),
		}
	}

	#[rstest]
	fn test_zero_channel_capacity_fails_validation() {
		let err = CrudSettings::default()
			.with_overrides(DEFAULT_ENV_PREFIX, lookup(&[("CRUDKIT_CHANNEL_CAPACITY", "0")]))
			.unwrap_err();

		assert!(matches!(err, SettingsError::ValidationError(_)));
	}
}
