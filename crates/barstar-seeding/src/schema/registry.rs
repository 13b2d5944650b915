//! Schema registry abstraction.

use async_trait::async_trait;

use super::{ColumnDescriptor, EntityDescriptor, resolve_entity_order};
use crate::error::{SeedingError, SeedingResult};

/// Queryable catalog of entity types.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
	/// Lists every entity, parents before children.
	async fn list_entities(&self) -> SeedingResult<Vec<EntityDescriptor>>;

	/// Returns the columns of one table, in declaration order.
	async fn columns(&self, table: &str) -> SeedingResult<Vec<ColumnDescriptor>> {
		self.list_entities()
			.await?
			.into_iter()
			.find(|entity| entity.table == table)
			.map(|entity| entity.columns)
			.ok_or_else(|| SeedingError::Introspection(format!("Unknown table: {}", table)))
	}
}

/// In-memory registry built from descriptors supplied by the caller.
///
/// # Examples
///
/// ```
/// use barstar_seeding::schema::{
/// 	ColumnDescriptor, EntityDescriptor, LogicalType, StaticSchemaRegistry,
/// };
///
/// let registry = StaticSchemaRegistry::new()
/// 	.with_entity(EntityDescriptor::new(
/// 		"Users",
/// 		"users",
/// 		vec![ColumnDescriptor::new("id", LogicalType::Uuid).required().unique()],
/// 	));
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticSchemaRegistry {
	entities: Vec<EntityDescriptor>,
}

impl StaticSchemaRegistry {
	/// Creates an empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds an entity, replacing any previous entity on the same table.
	pub fn with_entity(mut self, entity: EntityDescriptor) -> Self {
		self.entities.retain(|existing| existing.table != entity.table);
		self.entities.push(entity);
		self
	}

	/// Number of registered entities.
	pub fn len(&self) -> usize {
		self.entities.len()
	}

	/// Returns true if no entity is registered.
	pub fn is_empty(&self) -> bool {
		self.entities.is_empty()
	}
}

#[async_trait]
impl SchemaRegistry for StaticSchemaRegistry {
	async fn list_entities(&self) -> SeedingResult<Vec<EntityDescriptor>> {
		Ok(resolve_entity_order(self.entities.clone()))
	}
}
