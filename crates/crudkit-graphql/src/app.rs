//! Application bootstrap
//!
//! [`Application::bootstrap`] walks a module tree depth-first, giving every
//! module its own singleton scope. A module sees the exports of the global
//! modules, the exports of its imports, and its own providers. Entity
//! modules then get their [`CrudService`], which is bound to the module's
//! synthesized resolver registry.

use crate::config::EntityConfig;
use crate::error::BootstrapError;
use crate::filters::subscription_filter;
use crate::module::DynamicModule;
use crate::pubsub::ChannelRegistry;
use crate::registry::ResolverRegistry;
use crate::schema::build_schema;
use crate::service::CrudService;
use crudkit_core::types::standard_types;
use crudkit_core::{ConfigError, CrudSettings, TypeDef};
use crudkit_di::{Export, InjectionContext, SingletonScope};
use futures_util::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// One entity as served: its configuration, its resolver and its service.
#[derive(Clone)]
pub struct MountedEntity {
	pub config: Arc<EntityConfig>,
	pub registry: Arc<ResolverRegistry>,
	pub service: Arc<CrudService>,
}

pub struct Application {
	root: Arc<InjectionContext>,
	containers: Vec<(String, Arc<InjectionContext>)>,
	entities: Vec<MountedEntity>,
}

struct Assembler {
	globals: Vec<(Arc<InjectionContext>, Vec<Export>)>,
	built: HashMap<String, Arc<InjectionContext>>,
	containers: Vec<(String, Arc<InjectionContext>)>,
	entities: Vec<MountedEntity>,
	models: HashSet<String>,
}

fn new_container(name: &str) -> Arc<InjectionContext> {
	Arc::new(InjectionContext::builder(Arc::new(SingletonScope::new())).name(name).build())
}

/// Copies the values named by `exports` from `source` into `target`.
fn copy_exports(
	source: &InjectionContext,
	exports: &[Export],
	target: &InjectionContext,
) -> Result<(), BootstrapError> {
	for export in exports {
		let value = source
			.singleton_scope()
			.get_erased(export.type_id())
			.ok_or_else(|| BootstrapError::MissingExport {
				module: source.name().to_string(),
				export: export.name(),
			})?;
		target.singleton_scope().set_erased(export.type_id(), value);
	}
	Ok(())
}

async fn install(module: &DynamicModule, ctx: &Arc<InjectionContext>) -> Result<(), BootstrapError> {
	for provider in module.providers.iter().chain(&module.controllers) {
		provider
			.install(ctx)
			.await
			.map_err(|e| BootstrapError::dependency(&module.name, e))?;
	}
	Ok(())
}

impl Assembler {
	fn build<'a>(
		&'a mut self,
		module: &'a DynamicModule,
	) -> BoxFuture<'a, Result<Arc<InjectionContext>, BootstrapError>> {
		Box::pin(async move {
			if module.entity.is_none() {
				if let Some(ctx) = self.built.get(&module.name) {
					return Ok(ctx.clone());
				}
			}

			let ctx = new_container(&module.name);
			for (source, exports) in &self.globals {
				copy_exports(source, exports, &ctx)?;
			}
			for import in &module.imports {
				let imported = self.build(import).await?;
				copy_exports(&imported, &import.exports, &ctx)?;
			}
			install(module, &ctx).await?;
			tracing::info!(
				module = %module.name,
				providers = module.providers.len(),
				imports = module.imports.len(),
				"module assembled"
			);

			if let Some(unit) = &module.entity {
				let model = unit.config.model_name.clone();
				if !self.models.insert(model.clone()) {
					return Err(ConfigError::DuplicateModel(model).into());
				}
				let service = CrudService::from_container(&unit.config, ctx.clone())
					.map_err(|e| BootstrapError::dependency(&module.name, e))?;
				let service = Arc::new(service);
				ctx.singleton_scope().set_arc(service.clone());
				tracing::debug!(
					module = %module.name,
					resolver = %unit.registry.label(),
					%model,
					"resolver bound to service"
				);
				self.entities.push(MountedEntity {
					config: unit.config.clone(),
					registry: unit.registry.clone(),
					service,
				});
			}

			if module.global {
				self.globals.push((ctx.clone(), module.exports.clone()));
			}
			self.built.insert(module.name.clone(), ctx.clone());
			self.containers.push((module.name.clone(), ctx.clone()));
			Ok(ctx)
		})
	}
}

impl Application {
	/// Builds every module container and service of the tree rooted at `root`.
	///
	/// The root module's providers are installed first so that a global root
	/// is visible to every imported module.
	pub async fn bootstrap(root: DynamicModule) -> Result<Self, BootstrapError> {
		let root_ctx = new_container(&root.name);
		install(&root, &root_ctx).await?;
		tracing::info!(module = %root.name, providers = root.providers.len(), "root module assembled");

		let mut assembler = Assembler {
			globals: Vec::new(),
			built: HashMap::new(),
			containers: Vec::new(),
			entities: Vec::new(),
			models: HashSet::new(),
		};
		if let Some(missing) = root
			.exports
			.iter()
			.find(|export| !root_ctx.singleton_scope().contains(export.type_id()))
		{
			return Err(BootstrapError::MissingExport {
				module: root.name.clone(),
				export: missing.name(),
			});
		}
		if root.global {
			assembler.globals.push((root_ctx.clone(), root.exports.clone()));
		}
		for import in &root.imports {
			let imported = assembler.build(import).await?;
			copy_exports(&imported, &import.exports, &root_ctx)?;
		}
		assembler.containers.push((root.name.clone(), root_ctx.clone()));

		Ok(Self {
			root: root_ctx,
			containers: assembler.containers,
			entities: assembler.entities,
		})
	}

	/// Root container, holding the shared bindings and the root's imports' exports.
	pub fn container(&self) -> &Arc<InjectionContext> {
		&self.root
	}

	/// Container of the module named `name`.
	pub fn module(&self, name: &str) -> Option<&Arc<InjectionContext>> {
		self.containers
			.iter()
			.find(|(module, _)| module == name)
			.map(|(_, ctx)| ctx)
	}

	/// Module names in assembly order; the root comes last.
	pub fn modules(&self) -> Vec<&str> {
		self.containers.iter().map(|(name, _)| name.as_str()).collect()
	}

	pub fn entities(&self) -> &[MountedEntity] {
		&self.entities
	}

	pub fn service(&self, model: &str) -> Option<Arc<CrudService>> {
		self.entities
			.iter()
			.find(|entity| entity.config.model_name == model)
			.map(|entity| entity.service.clone())
	}

	pub fn registry(&self, model: &str) -> Option<&ResolverRegistry> {
		self.entities
			.iter()
			.find(|entity| entity.config.model_name == model)
			.map(|entity| entity.registry.as_ref())
	}

	pub fn channels(&self) -> Result<Arc<ChannelRegistry>, BootstrapError> {
		self.root
			.resolve::<ChannelRegistry>()
			.map_err(|e| BootstrapError::dependency(self.root.name(), e))
	}

	/// Settings bound by the root module.
	pub fn settings(&self) -> Result<Arc<CrudSettings>, BootstrapError> {
		self.root
			.resolve::<CrudSettings>()
			.map_err(|e| BootstrapError::dependency(self.root.name(), e))
	}

	/// Every type the schema registers, first declaration of a name winning.
	pub fn types(&self) -> Vec<TypeDef> {
		let mut seen = HashSet::new();
		let mut types = Vec::new();
		let declared = self.entities.iter().flat_map(|entity| {
			let config = &entity.config;
			let subscription = match &config.subscription {
				Some(custom) => custom.filter.clone(),
				None => subscription_filter(&config.model_name),
			};
			let find_many = config
				.find_many_args
				.clone()
				.unwrap_or_else(|| config.default_find_many_args());
			[
				TypeDef::Object(config.entity.clone()),
				TypeDef::Input(config.create_input.clone()),
				TypeDef::Input(config.update_input.clone()),
				TypeDef::Input(config.update_many_input.clone()),
				TypeDef::Input(config.where_input.clone()),
				TypeDef::Input(find_many),
				TypeDef::Input(subscription),
			]
			.into_iter()
			.chain(config.extra_types.iter().cloned())
		});
		for ty in standard_types().into_iter().chain(declared) {
			if seen.insert(ty.name().to_string()) {
				types.push(ty);
			}
		}
		types
	}

	/// Builds the executable GraphQL schema.
	pub fn schema(&self) -> Result<async_graphql::dynamic::Schema, BootstrapError> {
		build_schema(self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::{CrudBuilder, CrudModule, CrudModuleOptions};
	use async_trait::async_trait;
	use crudkit_core::{InputDef, ObjectDef, SharedStorage, TypeRef};
	use crudkit_db::MemoryStorage;
	use crudkit_di::{DiResult, Injectable, Provider};
	use rstest::rstest;

	#[derive(Debug, PartialEq)]
	struct Mailer(&'static str);

	struct Audit {
		mailer: Arc<Mailer>,
	}

	#[async_trait]
	impl Injectable for Audit {
		async fn inject(ctx: &InjectionContext) -> DiResult<Self> {
			Ok(Audit {
				mailer: ctx.resolve::<Mailer>()?,
			})
		}
	}

	fn entity(name: &str, model: &str) -> crate::EntityConfigBuilder {
		CrudBuilder::new(ObjectDef::new(name).field("id", TypeRef::named_nn(TypeRef::ID))).with_config(
			model,
			InputDef::new(format!("{name}CreateInput")),
			InputDef::new(format!("{name}UpdateInput")),
			InputDef::new(format!("{name}UpdateManyInput")),
			InputDef::new(format!("{name}WhereInput")),
		)
	}

	fn options() -> CrudModuleOptions {
		CrudModuleOptions::new(Arc::new(MemoryStorage::new()) as SharedStorage)
	}

	#[rstest]
	#[tokio::test]
	async fn test_bootstrap_mounts_every_entity() {
		let root = CrudModule::for_root([entity("User", "user").build(), entity("Post", "post").build()], options());

		let app = Application::bootstrap(root).await.unwrap();

		assert_eq!(app.modules(), ["UserCrudModule", "PostCrudModule", "CrudModule"]);
		assert!(app.service("post").is_some());
		assert_eq!(app.registry("user").unwrap().len(), 8);
		assert!(app.module("UserCrudModule").unwrap().resolve::<CrudService>().is_ok());
	}

	#[rstest]
	#[tokio::test]
	async fn test_settings_come_from_root_options() {
		let settings = CrudSettings {
			default_page_size: Some(5),
			..CrudSettings::default()
		};
		let root = CrudModule::for_root([entity("User", "user").build()], options().with_settings(settings));

		let app = Application::bootstrap(root).await.unwrap();

		assert_eq!(app.settings().unwrap().default_page_size, Some(5));
	}

	#[rstest]
	#[tokio::test]
	async fn test_duplicate_model_is_rejected() {
		let root = CrudModule::for_root([entity("User", "user").build(), entity("Member", "user").build()], options());

		let err = Application::bootstrap(root).await.err().unwrap();

		assert!(matches!(err, BootstrapError::Config(ConfigError::DuplicateModel(model)) if model == "user"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_imported_exports_are_visible() {
		let mail = DynamicModule::new("MailModule")
			.exported_provider(Provider::value(Mailer("smtp")));
		let config = entity("User", "user")
			.import([mail])
			.with_providers([Provider::injectable::<Audit>()])
			.build();

		let app = Application::bootstrap(CrudModule::for_root([config], options()))
			.await
			.unwrap();

		let user_module = app.module("UserCrudModule").unwrap();
		assert_eq!(user_module.resolve::<Audit>().unwrap().mailer.0, "smtp");
		assert!(app.module("MailModule").is_some());
	}

	#[rstest]
	#[tokio::test]
	async fn test_unexported_provider_stays_private() {
		let mail = DynamicModule::new("MailModule").provider(Provider::value(Mailer("smtp")));
		let config = entity("User", "user")
			.import([mail])
			.with_providers([Provider::injectable::<Audit>()])
			.build();

		let err = Application::bootstrap(CrudModule::for_root([config], options()))
			.await
			.err()
			.unwrap();

		assert!(matches!(err, BootstrapError::Dependency { module, .. } if module == "UserCrudModule"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_exporting_unprovided_type_fails() {
		let broken = DynamicModule::new("Broken").export(Export::of::<Mailer>());
		let config = entity("User", "user").import([broken]).build();

		let err = Application::bootstrap(CrudModule::for_root([config], options()))
			.await
			.err()
			.unwrap();

		assert!(matches!(err, BootstrapError::MissingExport { module, .. } if module == "Broken"));
	}

	#[rstest]
	#[tokio::test]
	async fn test_types_are_deduplicated() {
		let shared = InputDef::new("UserWhereInput").field("name", TypeRef::named("StringFilter"));
		let config = entity("User", "user").with_types([TypeDef::from(shared)]).build();
		let app = Application::bootstrap(CrudModule::for_root([config], options()))
			.await
			.unwrap();

		let types = app.types();

		let names: Vec<&str> = types.iter().map(TypeDef::name).collect();
		assert_eq!(names.iter().filter(|n| **n == "UserWhereInput").count(), 1);
		assert!(names.contains(&"UserFindManyArgs"));
		assert!(names.contains(&"UserSubscriptionFilter"));
	}
}
