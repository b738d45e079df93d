//! Pure tree walks over the tag parent links
//!
//! The store loads `id -> parent_id` once per operation and hands it here, so
//! every walk is iterative and bounded by a visited set even if stored data
//! were ever corrupted into a loop.

use std::collections::{HashMap, HashSet, VecDeque};

use sea_orm::{ConnectionTrait, EntityTrait, QuerySelect};

use crate::common::Result;
use crate::infra::db::entities::tag;

pub type ParentMap = HashMap<i32, Option<i32>>;
pub type ChildIndex = HashMap<i32, Vec<i32>>;

pub async fn load_parent_map<C: ConnectionTrait>(conn: &C) -> Result<ParentMap> {
	let rows: Vec<(i32, Option<i32>)> = tag::Entity::find()
		.select_only()
		.column(tag::Column::Id)
		.column(tag::Column::ParentId)
		.into_tuple()
		.all(conn)
		.await?;

	Ok(rows.into_iter().collect())
}

/// Whether making `new_parent` the parent of `tag_id` would close a loop.
///
/// True when `new_parent` is `tag_id` itself or any of its descendants.
pub fn would_create_cycle(parents: &ParentMap, tag_id: i32, new_parent: i32) -> bool {
	let mut visited = HashSet::new();
	let mut current = Some(new_parent);

	while let Some(id) = current {
		if id == tag_id {
			return true;
		}
		if !visited.insert(id) {
			// Existing data already loops; refuse to extend it
			return true;
		}
		current = parents.get(&id).copied().flatten();
	}

	false
}

/// Ancestors of `tag_id`, root first, excluding the tag itself
pub fn ancestor_chain(parents: &ParentMap, tag_id: i32) -> Vec<i32> {
	let mut visited = HashSet::from([tag_id]);
	let mut chain = Vec::new();
	let mut current = parents.get(&tag_id).copied().flatten();

	while let Some(id) = current {
		if !visited.insert(id) {
			break;
		}
		chain.push(id);
		current = parents.get(&id).copied().flatten();
	}

	chain.reverse();
	chain
}

pub fn child_index(parents: &ParentMap) -> ChildIndex {
	let mut index: ChildIndex = HashMap::new();
	for (&id, &parent) in parents {
		if let Some(parent) = parent {
			index.entry(parent).or_default().push(id);
		}
	}
	for children in index.values_mut() {
		children.sort_unstable();
	}
	index
}

/// Every descendant of `root` in breadth-first order, excluding `root`
pub fn collect_descendants(children: &ChildIndex, root: i32) -> Vec<i32> {
	let mut visited = HashSet::from([root]);
	let mut queue = VecDeque::from([root]);
	let mut out = Vec::new();

	while let Some(id) = queue.pop_front() {
		for &child in children.get(&id).map(Vec::as_slice).unwrap_or_default() {
			if visited.insert(child) {
				out.push(child);
				queue.push_back(child);
			}
		}
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use pretty_assertions::assert_eq;

	// 1 ─┬─ 2 ── 4
	//    └─ 3
	// 5
	fn sample() -> ParentMap {
		HashMap::from([
			(1, None),
			(2, Some(1)),
			(3, Some(1)),
			(4, Some(2)),
			(5, None),
		])
	}

	#[test]
	fn cycle_detection() {
		let parents = sample();
		assert!(would_create_cycle(&parents, 1, 1));
		assert!(would_create_cycle(&parents, 1, 4));
		assert!(would_create_cycle(&parents, 2, 4));
		assert!(!would_create_cycle(&parents, 4, 3));
		assert!(!would_create_cycle(&parents, 1, 5));
		assert!(!would_create_cycle(&parents, 5, 4));
	}

	#[test]
	fn corrupted_loop_is_treated_as_cycle() {
		let parents = HashMap::from([(1, Some(2)), (2, Some(1)), (3, None)]);
		assert!(would_create_cycle(&parents, 3, 1));
	}

	#[test]
	fn descendants_breadth_first() {
		let index = child_index(&sample());
		assert_eq!(collect_descendants(&index, 1), vec![2, 3, 4]);
		assert_eq!(collect_descendants(&index, 2), vec![4]);
		assert!(collect_descendants(&index, 5).is_empty());
	}

	#[test]
	fn ancestors_root_first() {
		let parents = sample();
		assert_eq!(ancestor_chain(&parents, 4), vec![1, 2]);
		assert!(ancestor_chain(&parents, 1).is_empty());
	}
}
