//! Module assembly
//!
//! A [`DynamicModule`] is an isolated unit of providers with explicit
//! imports and exports. [`CrudModule::for_root`] wraps every entity
//! configuration into its own module and aggregates them under one global
//! root module holding the shared collaborators.

use crate::config::{EntityConfig, RelationConfig};
use crate::pubsub::ChannelRegistry;
use crate::registry::ResolverRegistry;
use crate::rules::SelectionRules;
use crate::synthesis::synthesize;
use crudkit_core::{
	AbilityGuard, CrudSettings, IdListSubscription, ProjectionSelection, SharedGuard,
	SharedSelection, SharedStorage,
};
use crudkit_di::{Export, Provider};
use std::fmt;
use std::sync::Arc;

pub const ROOT_MODULE: &str = "CrudModule";

/// Entity payload carried by a generated per-entity module.
#[derive(Clone)]
pub(crate) struct EntityUnit {
	pub config: Arc<EntityConfig>,
	pub registry: Arc<ResolverRegistry>,
}

#[derive(Clone)]
pub struct DynamicModule {
	pub name: String,
	/// Exports of a global module are visible to every module built after it.
	pub global: bool,
	pub providers: Vec<Provider>,
	pub imports: Vec<DynamicModule>,
	pub exports: Vec<Export>,
	pub controllers: Vec<Provider>,
	pub(crate) entity: Option<EntityUnit>,
}

impl DynamicModule {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			global: false,
			providers: Vec::new(),
			imports: Vec::new(),
			exports: Vec::new(),
			controllers: Vec::new(),
			entity: None,
		}
	}

	pub fn provider(mut self, provider: Provider) -> Self {
		self.providers.push(provider);
		self
	}

	/// Registers a provider and exports the type it provides.
	pub fn exported_provider(mut self, provider: Provider) -> Self {
		self.exports.push(Export::from(&provider));
		self.providers.push(provider);
		self
	}

	pub fn export(mut self, export: Export) -> Self {
		self.exports.push(export);
		self
	}

	pub fn import(mut self, module: DynamicModule) -> Self {
		self.imports.push(module);
		self
	}

	pub fn controller(mut self, controller: Provider) -> Self {
		self.controllers.push(controller);
		self
	}

	pub fn global(mut self) -> Self {
		self.global = true;
		self
	}

	/// Model name, for modules generated from an entity configuration.
	pub fn model(&self) -> Option<&str> {
		self.entity.as_ref().map(|unit| unit.config.model_name.as_str())
	}
}

impl fmt::Debug for DynamicModule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DynamicModule")
			.field("name", &self.name)
			.field("global", &self.global)
			.field("providers", &self.providers)
			.field("imports", &self.imports)
			.field("exports", &self.exports)
			.field("controllers", &self.controllers)
			.field("model", &self.model())
			.finish()
	}
}

/// Shared collaborators bound once by the root module.
pub struct CrudModuleOptions {
	pub storage: SharedStorage,
	pub selection: SharedSelection,
	pub guard: SharedGuard,
	pub settings: CrudSettings,
}

impl CrudModuleOptions {
	pub fn new(storage: SharedStorage) -> Self {
		Self {
			storage,
			selection: Arc::new(ProjectionSelection),
			guard: Arc::new(AbilityGuard),
			settings: CrudSettings::default(),
		}
	}

	pub fn with_selection(mut self, selection: SharedSelection) -> Self {
		self.selection = selection;
		self
	}

	pub fn with_guard(mut self, guard: SharedGuard) -> Self {
		self.guard = guard;
		self
	}

	pub fn with_settings(mut self, settings: CrudSettings) -> Self {
		self.settings = settings;
		self
	}
}

pub struct CrudModule;

impl CrudModule {
	/// Aggregates one module per entity under the global root module.
	///
	/// The root binds and exports the storage, selection, guard, settings,
	/// channel registry and selection rules.
	pub fn for_root<I>(configs: I, options: CrudModuleOptions) -> DynamicModule
	where
		I: IntoIterator<Item = EntityConfig>,
	{
		let configs: Vec<EntityConfig> = configs.into_iter().collect();
		let rules = SelectionRules::from_configs(&configs);
		let channels = ChannelRegistry::new(options.settings.channel_capacity);

		let mut root = DynamicModule::new(ROOT_MODULE)
			.global()
			.exported_provider(Provider::value(options.storage))
			.exported_provider(Provider::value(options.selection))
			.exported_provider(Provider::value(options.guard))
			.exported_provider(Provider::value(options.settings))
			.exported_provider(Provider::value(channels))
			.exported_provider(Provider::value(rules));
		for config in configs {
			root = root.import(Self::for_entity(config));
		}
		root
	}

	/// Wraps one entity's synthesized resolver and service dependencies.
	pub fn for_entity(config: EntityConfig) -> DynamicModule {
		let registry = synthesize(&config);
		let mut module = DynamicModule::new(config.module_name());

		module.providers.extend(config.providers.iter().cloned());
		module.providers.extend(config.authorization.iter().cloned());
		if let Some(custom) = &config.custom_resolver {
			module.providers.push(custom.provider.clone());
		}
		for relation in &config.relations {
			if let RelationConfig::Custom(custom) = relation {
				module.providers.push(custom.provider.clone());
			}
		}
		module.providers.push(match &config.subscription {
			Some(custom) => custom.provider.clone(),
			None => Provider::injectable::<IdListSubscription>(),
		});
		module.controllers.extend(config.controllers.iter().cloned());
		module.imports.extend(config.imports.iter().cloned());
		module.exports.extend(config.exports.iter().copied());
		module.entity = Some(EntityUnit {
			config: Arc::new(config),
			registry: Arc::new(registry),
		});
		module
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::CrudBuilder;
	use crudkit_core::{InputDef, ObjectDef, TypeRef};
	use crudkit_db::MemoryStorage;
	use rstest::rstest;

	fn config(entity: &str, model: &str) -> EntityConfig {
		CrudBuilder::new(ObjectDef::new(entity).field("id", TypeRef::named_nn(TypeRef::ID)))
			.with_config(
				model,
				InputDef::new(format!("{entity}CreateInput")),
				InputDef::new(format!("{entity}UpdateInput")),
				InputDef::new(format!("{entity}UpdateManyInput")),
				InputDef::new(format!("{entity}WhereInput")),
			)
			.with_providers([Provider::value(7u8)])
			.build()
	}

	#[rstest]
	fn test_root_exports_shared_bindings() {
		let root = CrudModule::for_root(
			[config("User", "user"), config("Post", "post")],
			CrudModuleOptions::new(Arc::new(MemoryStorage::new())),
		);

		assert_eq!(root.name, "CrudModule");
		assert!(root.global);
		assert_eq!(root.exports.len(), 6);
		let names: Vec<&str> = root.imports.iter().map(|m| m.name.as_str()).collect();
		assert_eq!(names, ["UserCrudModule", "PostCrudModule"]);
	}

	#[rstest]
	fn test_entity_module_installs_subscription_resolver_last() {
		let module = CrudModule::for_entity(config("User", "user"));

		assert_eq!(module.model(), Some("user"));
		assert_eq!(module.providers.len(), 2);
		assert_eq!(module.providers[0].name(), "u8");
		assert!(module.providers[1].name().ends_with("IdListSubscription"));
	}
}
