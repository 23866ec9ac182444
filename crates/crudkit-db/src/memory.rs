//! In-memory Storage Access adapter

use crate::filter;
use async_trait::async_trait;
use crudkit_core::entity::{self, ID_FIELD};
use crudkit_core::{
	AbilityRef, Action, CrudError, CrudResult, CrudSettings, Entity, FindManyQuery, Selection,
	StorageAccess,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::RwLock;

type Tables = HashMap<String, Vec<Entity>>;

/// Rows kept per model name behind an async lock.
///
/// Rows are returned in insertion order unless `orderBy` is given.
pub struct MemoryStorage {
	tables: RwLock<Tables>,
	max_page_size: i64,
}

impl Default for MemoryStorage {
	fn default() -> Self {
		Self::new()
	}
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::with_settings(&CrudSettings::default())
	}

	pub fn with_settings(settings: &CrudSettings) -> Self {
		Self {
			tables: RwLock::new(HashMap::new()),
			max_page_size: settings.max_page_size,
		}
	}

	/// Inserts rows as-is, assigning ids to rows without one.
	pub async fn seed<I>(&self, model: &str, rows: I)
	where
		I: IntoIterator<Item = Entity>,
	{
		let mut tables = self.tables.write().await;
		let table = tables.entry(model.to_string()).or_default();
		for mut row in rows {
			assign_id(&mut row);
			table.push(row);
		}
		tracing::debug!(model, rows = table.len(), "table seeded");
	}

	/// Snapshot of every row of `model`.
	pub async fn rows(&self, model: &str) -> Vec<Entity> {
		self.tables
			.read()
			.await
			.get(model)
			.cloned()
			.unwrap_or_default()
	}

	fn scoped(
		model: &str,
		ability: Option<&AbilityRef>,
		action: Action,
		filter: &Map<String, Value>,
	) -> CrudResult<Scope> {
		let conditions = match ability.and_then(|a| a.conditions(action, model)) {
			None | Some(Value::Null) => None,
			Some(Value::Object(map)) => Some(map),
			Some(other) => {
				return Err(CrudError::storage(format!(
					"ability conditions for {model} must be an object, got {other}"
				)));
			}
		};
		Ok(Scope {
			filter: filter.clone(),
			conditions,
		})
	}

	fn paginate(&self, rows: Vec<Entity>, query: &FindManyQuery) -> CrudResult<Vec<Entity>> {
		let Some(pagination) = &query.pagination else {
			return Ok(rows);
		};
		let skip = match pagination.skip {
			Some(skip) if skip < 0 => {
				return Err(CrudError::invalid_argument("skip", "must not be negative"));
			}
			Some(skip) => skip as usize,
			None => 0,
		};
		let take = match pagination.take {
			Some(take) if take < 0 => {
				return Err(CrudError::invalid_argument(
					"take",
					"negative take is not supported",
				));
			}
			Some(take) => Some(take.min(self.max_page_size) as usize),
			None => None,
		};
		let rows = rows.into_iter().skip(skip);
		Ok(match take {
			Some(take) => rows.take(take).collect(),
			None => rows.collect(),
		})
	}

	async fn select(
		&self,
		model: &str,
		scope: &Scope,
		query: &FindManyQuery,
	) -> CrudResult<Vec<Entity>> {
		let tables = self.tables.read().await;
		let mut rows = Vec::new();
		for row in tables.get(model).into_iter().flatten() {
			if scope.admits(row)? {
				rows.push(row.clone());
			}
		}
		drop(tables);

		if let Some(order_by) = &query.order_by {
			filter::sort(&mut rows, order_by)?;
		}
		if let Some(cursor) = &query.cursor {
			rows = filter::apply_cursor(rows, cursor)?;
		}
		if let Some(distinct) = &query.distinct {
			rows = filter::apply_distinct(rows, distinct)?;
		}
		self.paginate(rows, query)
	}
}

/// A caller filter plus the ability's conditions for one action.
struct Scope {
	filter: Map<String, Value>,
	conditions: Option<Map<String, Value>>,
}

impl Scope {
	fn admits(&self, row: &Entity) -> CrudResult<bool> {
		if !filter::matches(row, &self.filter)? {
			return Ok(false);
		}
		match &self.conditions {
			Some(conditions) => filter::matches(row, conditions),
			None => Ok(true),
		}
	}
}

fn assign_id(row: &mut Entity) {
	if entity::id_of(row).is_none() {
		if let Value::Object(map) = row {
			map.insert(
				ID_FIELD.to_string(),
				Value::String(uuid::Uuid::new_v4().to_string()),
			);
		}
	}
}

fn by_id(id: &str) -> Map<String, Value> {
	let mut filter = Map::new();
	filter.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
	filter
}

fn patch(row: &mut Entity, data: &Map<String, Value>) {
	if let Value::Object(fields) = row {
		for (key, value) in data {
			if key != ID_FIELD {
				fields.insert(key.clone(), value.clone());
			}
		}
	}
}

fn data_object(data: Value) -> CrudResult<Map<String, Value>> {
	match data {
		Value::Object(map) => Ok(map),
		other => Err(CrudError::invalid_argument(
			"data",
			format!("expected an object, got {other}"),
		)),
	}
}

fn project_all(rows: &[Entity], selection: &Selection) -> Vec<Entity> {
	rows.iter().map(|row| selection.project(row)).collect()
}

#[async_trait]
impl StorageAccess for MemoryStorage {
	async fn find_one(
		&self,
		model: &str,
		ability: &AbilityRef,
		filter: Map<String, Value>,
		selection: &Selection,
	) -> CrudResult<Option<Entity>> {
		let scope = Self::scoped(model, Some(ability), Action::Read, &filter)?;
		let tables = self.tables.read().await;
		for row in tables.get(model).into_iter().flatten() {
			if scope.admits(row)? {
				return Ok(Some(selection.project(row)));
			}
		}
		Ok(None)
	}

	async fn find_many(
		&self,
		model: &str,
		ability: &AbilityRef,
		query: FindManyQuery,
		selection: &Selection,
	) -> CrudResult<Vec<Entity>> {
		let scope = Self::scoped(model, Some(ability), Action::Read, &query.filter)?;
		let rows = self.select(model, &scope, &query).await?;
		Ok(project_all(&rows, selection))
	}

	async fn create(&self, model: &str, data: Value, selection: &Selection) -> CrudResult<Entity> {
		let mut row = Value::Object(data_object(data)?);
		assign_id(&mut row);
		let projected = selection.project(&row);
		self.tables
			.write()
			.await
			.entry(model.to_string())
			.or_default()
			.push(row);
		Ok(projected)
	}

	async fn update(
		&self,
		model: &str,
		ability: &AbilityRef,
		data: Value,
		id: &str,
		selection: &Selection,
	) -> CrudResult<Entity> {
		let data = data_object(data)?;
		let scope = Self::scoped(model, Some(ability), Action::Update, &by_id(id))?;
		let mut tables = self.tables.write().await;
		for row in tables.get_mut(model).into_iter().flatten() {
			if scope.admits(row)? {
				patch(row, &data);
				return Ok(selection.project(row));
			}
		}
		Err(CrudError::NotFound(format!("{model} record '{id}' not found")))
	}

	async fn update_many(
		&self,
		model: &str,
		ability: &AbilityRef,
		data: Value,
		filter: Map<String, Value>,
		selection: &Selection,
	) -> CrudResult<Vec<Entity>> {
		let data = data_object(data)?;
		let scope = Self::scoped(model, Some(ability), Action::Update, &filter)?;
		let mut tables = self.tables.write().await;
		let mut updated = Vec::new();
		for row in tables.get_mut(model).into_iter().flatten() {
			if scope.admits(row)? {
				patch(row, &data);
				updated.push(selection.project(row));
			}
		}
		Ok(updated)
	}

	async fn delete(
		&self,
		model: &str,
		ability: &AbilityRef,
		id: &str,
		selection: &Selection,
	) -> CrudResult<Entity> {
		let scope = Self::scoped(model, Some(ability), Action::Delete, &by_id(id))?;
		let mut tables = self.tables.write().await;
		if let Some(table) = tables.get_mut(model) {
			for index in 0..table.len() {
				if scope.admits(&table[index])? {
					let row = table.remove(index);
					return Ok(selection.project(&row));
				}
			}
		}
		Err(CrudError::NotFound(format!("{model} record '{id}' not found")))
	}

	async fn delete_many(
		&self,
		model: &str,
		ability: &AbilityRef,
		filter: Map<String, Value>,
		selection: &Selection,
	) -> CrudResult<Vec<Entity>> {
		let scope = Self::scoped(model, Some(ability), Action::Delete, &filter)?;
		let mut tables = self.tables.write().await;
		let Some(table) = tables.get_mut(model) else {
			return Ok(Vec::new());
		};
		// evaluated up front so a filter error leaves the table untouched
		let hits = table
			.iter()
			.map(|row| scope.admits(row))
			.collect::<CrudResult<Vec<bool>>>()?;
		let mut removed = Vec::new();
		let mut index = 0;
		table.retain(|row| {
			let hit = hits[index];
			index += 1;
			if hit {
				removed.push(selection.project(row));
			}
			!hit
		});
		Ok(removed)
	}

	async fn find_many_without_auth(
		&self,
		model: &str,
		filter: Map<String, Value>,
		selection: &Selection,
	) -> CrudResult<Vec<Entity>> {
		let scope = Self::scoped(model, None, Action::Read, &filter)?;
		let rows = self
			.select(model, &scope, &FindManyQuery::filtered(filter))
			.await?;
		Ok(project_all(&rows, selection))
	}
}
