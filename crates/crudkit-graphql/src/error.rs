//! Bootstrap errors

use crudkit_core::ConfigError;
use crudkit_di::DiError;

/// Errors raised while assembling modules or building the schema.
///
/// All of these are fatal to startup; none can occur while serving requests.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
	#[error(transparent)]
	Config(#[from] ConfigError),

	#[error("module {module}: {source}")]
	Dependency {
		module: String,
		#[source]
		source: DiError,
	},

	#[error("module {module} exports {export}, which it does not provide")]
	MissingExport { module: String, export: &'static str },

	#[error("field {field} is attached to unknown type {owner}")]
	UnknownOwner { owner: String, field: String },

	#[error("schema error: {0}")]
	Schema(String),
}

impl BootstrapError {
	pub(crate) fn dependency(module: &str, source: DiError) -> Self {
		Self::Dependency {
			module: module.to_string(),
			source,
		}
	}
}
