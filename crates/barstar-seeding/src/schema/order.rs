//! Dependency ordering of entities.

use std::collections::{BTreeMap, BTreeSet};

use super::EntityDescriptor;

/// Sorts entities so that every foreign key target precedes its referrers.
///
/// Kahn's algorithm over the foreign key graph. Self references and
/// references to tables outside `entities` are ignored. Among entities that
/// are ready at the same time the one with the smaller table name goes
/// first, so the result does not depend on input order.
///
/// Entities caught in a cycle cannot be fully ordered; they are appended
/// after everything else in table name order and a warning is logged.
pub fn resolve_entity_order(entities: Vec<EntityDescriptor>) -> Vec<EntityDescriptor> {
	let mut by_table: BTreeMap<String, EntityDescriptor> = entities
		.into_iter()
		.map(|entity| (entity.table.clone(), entity))
		.collect();

	let mut in_degree: BTreeMap<String, usize> = BTreeMap::new();
	let mut dependents: BTreeMap<String, Vec<String>> = BTreeMap::new();

	for table in by_table.keys() {
		in_degree.insert(table.clone(), 0);
		dependents.insert(table.clone(), Vec::new());
	}

	for (table, entity) in &by_table {
		for dep in entity.dependencies() {
			// Only count dependencies inside the retained set
			if let Some(children) = dependents.get_mut(&dep) {
				children.push(table.clone());
				if let Some(degree) = in_degree.get_mut(table) {
					*degree += 1;
				}
			}
		}
	}

	let mut ready: BTreeSet<String> = in_degree
		.iter()
		.filter(|&(_, &degree)| degree == 0)
		.map(|(table, _)| table.clone())
		.collect();

	let mut sorted = Vec::with_capacity(by_table.len());

	while let Some(table) = ready.pop_first() {
		if let Some(children) = dependents.get(&table) {
			for child in children {
				if let Some(degree) = in_degree.get_mut(child) {
					*degree -= 1;
					if *degree == 0 {
						ready.insert(child.clone());
					}
				}
			}
		}
		if let Some(entity) = by_table.remove(&table) {
			sorted.push(entity);
		}
	}

	if !by_table.is_empty() {
		let remaining: Vec<&str> = by_table.keys().map(String::as_str).collect();
		tracing::warn!(
			tables = ?remaining,
			"Circular foreign key dependency, ordering is best effort"
		);
		sorted.extend(by_table.into_values());
	}

	sorted
}
