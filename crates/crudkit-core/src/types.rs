//! Declarative GraphQL type descriptors
//!
//! Entity and input types are described as data and handed to the schema
//! binding at bootstrap. Types reference each other by name, so a field may
//! point at a type declared later (or at the type it belongs to) without any
//! ordering constraints.

use std::borrow::Cow;
use std::fmt;

/// A reference to a GraphQL type, with list and non-null wrappers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
	Named(Cow<'static, str>),
	NonNull(Box<TypeRef>),
	List(Box<TypeRef>),
}

impl TypeRef {
	pub const ID: &'static str = "ID";
	pub const STRING: &'static str = "String";
	pub const INT: &'static str = "Int";
	pub const FLOAT: &'static str = "Float";
	pub const BOOLEAN: &'static str = "Boolean";

	/// `T`
	pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
		Self::Named(name.into())
	}

	/// `T!`
	pub fn named_nn(name: impl Into<Cow<'static, str>>) -> Self {
		Self::named(name).non_null()
	}

	/// `[T!]`
	pub fn named_nn_list(name: impl Into<Cow<'static, str>>) -> Self {
		Self::List(Box::new(Self::named_nn(name)))
	}

	/// `[T!]!`
	pub fn named_nn_list_nn(name: impl Into<Cow<'static, str>>) -> Self {
		Self::named_nn_list(name).non_null()
	}

	/// Wraps the reference in a non-null marker unless it already has one.
	pub fn non_null(self) -> Self {
		match self {
			Self::NonNull(_) => self,
			other => Self::NonNull(Box::new(other)),
		}
	}

	/// Strips an outer non-null marker.
	pub fn nullable(self) -> Self {
		match self {
			Self::NonNull(inner) => *inner,
			other => other,
		}
	}

	pub fn is_nullable(&self) -> bool {
		!matches!(self, Self::NonNull(_))
	}

	pub fn is_list(&self) -> bool {
		match self {
			Self::NonNull(inner) => inner.is_list(),
			Self::List(_) => true,
			Self::Named(_) => false,
		}
	}

	/// Name of the innermost named type.
	pub fn type_name(&self) -> &str {
		match self {
			Self::Named(name) => name.as_ref(),
			Self::NonNull(inner) | Self::List(inner) => inner.type_name(),
		}
	}

	pub fn is_builtin_scalar(&self) -> bool {
		matches!(
			self.type_name(),
			Self::ID | Self::STRING | Self::INT | Self::FLOAT | Self::BOOLEAN
		)
	}
}

impl fmt::Display for TypeRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Named(name) => write!(f, "{name}"),
			Self::NonNull(inner) => write!(f, "{inner}!"),
			Self::List(inner) => write!(f, "[{inner}]"),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
	pub name: String,
	pub ty: TypeRef,
	pub description: Option<String>,
}

impl FieldDef {
	pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
		Self {
			name: name.into(),
			ty,
			description: None,
		}
	}
}

/// An output object type, such as an entity.
///
/// # Examples
///
/// ```
/// use crudkit_core::types::{ObjectDef, TypeRef};
///
/// let user = ObjectDef::new("User")
///     .field("id", TypeRef::named_nn(TypeRef::ID))
///     .field("name", TypeRef::named_nn(TypeRef::STRING));
///
/// assert_eq!(user.fields.len(), 2);
/// assert!(user.has_field("name"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectDef {
	pub name: String,
	pub description: Option<String>,
	pub fields: Vec<FieldDef>,
}

impl ObjectDef {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			description: None,
			fields: Vec::new(),
		}
	}

	pub fn field(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
		self.fields.push(FieldDef::new(name, ty));
		self
	}

	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}

	pub fn has_field(&self, name: &str) -> bool {
		self.fields.iter().any(|f| f.name == name)
	}
}

/// An input object type, such as a create payload or a where filter.
#[derive(Debug, Clone, PartialEq)]
pub struct InputDef {
	pub name: String,
	pub description: Option<String>,
	pub fields: Vec<FieldDef>,
}

impl InputDef {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			description: None,
			fields: Vec::new(),
		}
	}

	pub fn field(mut self, name: impl Into<String>, ty: TypeRef) -> Self {
		self.fields.push(FieldDef::new(name, ty));
		self
	}

	pub fn description(mut self, description: impl Into<String>) -> Self {
		self.description = Some(description.into());
		self
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDef {
	pub name: String,
	pub values: Vec<String>,
}

impl EnumDef {
	pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			name: name.into(),
			values: values.into_iter().map(Into::into).collect(),
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeDef {
	Object(ObjectDef),
	Input(InputDef),
	Enum(EnumDef),
}

impl TypeDef {
	pub fn name(&self) -> &str {
		match self {
			Self::Object(def) => &def.name,
			Self::Input(def) => &def.name,
			Self::Enum(def) => &def.name,
		}
	}
}

impl From<ObjectDef> for TypeDef {
	fn from(def: ObjectDef) -> Self {
		Self::Object(def)
	}
}

impl From<InputDef> for TypeDef {
	fn from(def: InputDef) -> Self {
		Self::Input(def)
	}
}

impl From<EnumDef> for TypeDef {
	fn from(def: EnumDef) -> Self {
		Self::Enum(def)
	}
}

pub const PAGINATION_INPUT: &str = "PaginationInput";
pub const SORT_ORDER: &str = "SortOrder";

fn scalar_filter(name: &str, scalar: &'static str, text_ops: bool) -> InputDef {
	let mut def = InputDef::new(name)
		.field("equals", TypeRef::named(scalar))
		.field("not", TypeRef::named(scalar))
		.field("in", TypeRef::named_nn_list(scalar))
		.field("notIn", TypeRef::named_nn_list(scalar));
	if text_ops {
		def = def
			.field("contains", TypeRef::named(TypeRef::STRING))
			.field("startsWith", TypeRef::named(TypeRef::STRING))
			.field("endsWith", TypeRef::named(TypeRef::STRING));
	} else if scalar != TypeRef::BOOLEAN {
		def = def
			.field("lt", TypeRef::named(scalar))
			.field("lte", TypeRef::named(scalar))
			.field("gt", TypeRef::named(scalar))
			.field("gte", TypeRef::named(scalar));
	}
	def
}

/// Input and enum types every crudkit schema registers.
///
/// Where inputs written by users typically reference these filters, e.g.
/// `UserWhereInput { name: StringFilter }`.
pub fn standard_types() -> Vec<TypeDef> {
	vec![
		scalar_filter("StringFilter", TypeRef::STRING, true).into(),
		scalar_filter("IdFilter", TypeRef::ID, false).into(),
		scalar_filter("IntFilter", TypeRef::INT, false).into(),
		scalar_filter("FloatFilter", TypeRef::FLOAT, false).into(),
		scalar_filter("BooleanFilter", TypeRef::BOOLEAN, false).into(),
		InputDef::new(PAGINATION_INPUT)
			.field("take", TypeRef::named(TypeRef::INT))
			.field("skip", TypeRef::named(TypeRef::INT))
			.into(),
		EnumDef::new(SORT_ORDER, ["asc", "desc"]).into(),
	]
}
