//! Shared fixtures: a `user`/`post` model pair over recorded memory storage.

#![allow(dead_code)]

use crudkit::db::RecordingStorage;
use crudkit::prelude::*;
use serde_json::{Value, json};
use std::sync::Arc;

pub fn user_builder() -> crudkit::graphql::EntityConfigBuilder {
	CrudBuilder::new(
		ObjectDef::new("User")
			.field("id", TypeRef::named_nn(TypeRef::ID))
			.field("name", TypeRef::named_nn(TypeRef::STRING)),
	)
	.with_config(
		"user",
		InputDef::new("UserCreateInput").field("name", TypeRef::named_nn(TypeRef::STRING)),
		InputDef::new("UserUpdateInput").field("name", TypeRef::named(TypeRef::STRING)),
		InputDef::new("UserUpdateManyInput").field("name", TypeRef::named(TypeRef::STRING)),
		InputDef::new("UserWhereInput")
			.field("id", TypeRef::named(TypeRef::ID))
			.field("name", TypeRef::named("StringFilter")),
	)
}

pub fn post_builder() -> crudkit::graphql::EntityConfigBuilder {
	CrudBuilder::new(
		ObjectDef::new("Post")
			.field("id", TypeRef::named_nn(TypeRef::ID))
			.field("title", TypeRef::named_nn(TypeRef::STRING))
			.field("authorId", TypeRef::named(TypeRef::ID)),
	)
	.with_config(
		"post",
		InputDef::new("PostCreateInput")
			.field("title", TypeRef::named_nn(TypeRef::STRING))
			.field("authorId", TypeRef::named(TypeRef::ID)),
		InputDef::new("PostUpdateInput").field("title", TypeRef::named(TypeRef::STRING)),
		InputDef::new("PostUpdateManyInput").field("title", TypeRef::named(TypeRef::STRING)),
		InputDef::new("PostWhereInput")
			.field("title", TypeRef::named("StringFilter"))
			.field("authorId", TypeRef::named(TypeRef::ID)),
	)
}

pub fn posts_relation() -> OneToManyRelation {
	OneToManyRelation::new("posts", "post", "Post", "authorId").with_where("PostWhereInput", true)
}

pub fn author_relation() -> OneToOneRelation {
	OneToOneRelation::new("author", "user", "User", "authorId")
}

pub async fn seeded_storage() -> Arc<RecordingStorage> {
	let memory = Arc::new(MemoryStorage::new());
	memory
		.seed(
			"user",
			[
				json!({"id": "u1", "name": "Ann"}),
				json!({"id": "u2", "name": "Jo"}),
			],
		)
		.await;
	memory
		.seed(
			"post",
			[
				json!({"id": "p1", "title": "Rust", "authorId": "u1"}),
				json!({"id": "p2", "title": "Go", "authorId": "u1"}),
				json!({"id": "p3", "title": "Zig", "authorId": "u2"}),
				json!({"id": "p4", "title": "Draft", "authorId": null}),
			],
		)
		.await;
	Arc::new(RecordingStorage::new(memory))
}

pub async fn bootstrap<I>(configs: I, storage: &Arc<RecordingStorage>) -> Application
where
	I: IntoIterator<Item = crudkit::graphql::EntityConfig>,
{
	let options = CrudModuleOptions::new(storage.clone() as SharedStorage);
	Application::bootstrap(CrudModule::for_root(configs, options))
		.await
		.unwrap()
}

pub async fn execute(schema: &async_graphql::dynamic::Schema, query: &str) -> Value {
	let ability: AbilityRef = Arc::new(AllowAll);
	let response = schema
		.execute(async_graphql::Request::new(query).data(ability))
		.await;
	assert!(response.errors.is_empty(), "unexpected errors: {:?}", response.errors);
	response.data.into_json().unwrap()
}
