//! Actor identity and permission checks
//!
//! Authentication happens outside the core. Callers hand in an [`Actor`]
//! that has already been resolved, and the stores only check what it may do.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::common::{CoreError, Result};

#[derive(
	Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Permission {
	ManageTags,
	ViewInactiveTags,
	ManageScripts,
	ViewInactiveScripts,
}

/// The caller of a store operation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Actor {
	/// Opaque user reference; `None` for an unauthenticated caller
	pub id: Option<i32>,
	pub is_admin: bool,
	pub permissions: HashSet<Permission>,
}

impl Actor {
	pub fn anonymous() -> Self {
		Self::default()
	}

	pub fn user(id: i32) -> Self {
		Self {
			id: Some(id),
			..Self::default()
		}
	}

	/// Admins hold every permission implicitly
	pub fn admin(id: i32) -> Self {
		Self {
			id: Some(id),
			is_admin: true,
			permissions: HashSet::new(),
		}
	}

	pub fn with_permission(mut self, permission: Permission) -> Self {
		self.permissions.insert(permission);
		self
	}

	pub fn is_authenticated(&self) -> bool {
		self.id.is_some()
	}

	pub fn has(&self, permission: Permission) -> bool {
		self.is_admin || self.permissions.contains(&permission)
	}

	pub fn require_authenticated(&self) -> Result<i32> {
		self.id
			.ok_or_else(|| CoreError::Permission("authentication required".to_string()))
	}

	pub fn require(&self, permission: Permission) -> Result<i32> {
		let id = self.require_authenticated()?;
		if self.has(permission) {
			Ok(id)
		} else {
			Err(CoreError::Permission(format!("missing permission {permission}")))
		}
	}

	/// Owner of the row, or anyone holding `permission`
	pub fn require_owner_or(&self, owner: Option<i32>, permission: Permission) -> Result<i32> {
		let id = self.require_authenticated()?;
		if owner == Some(id) || self.has(permission) {
			Ok(id)
		} else {
			Err(CoreError::Permission(
				"only the creator may modify this record".to_string(),
			))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn admin_implies_every_permission() {
		let admin = Actor::admin(1);
		for permission in <Permission as strum::IntoEnumIterator>::iter() {
			assert!(admin.has(permission));
		}
	}

	#[test]
	fn anonymous_is_rejected() {
		let err = Actor::anonymous().require(Permission::ManageTags).unwrap_err();
		assert!(matches!(err, CoreError::Permission(_)));
	}

	#[test]
	fn owner_check() {
		let user = Actor::user(7);
		assert_eq!(user.require_owner_or(Some(7), Permission::ManageScripts).unwrap(), 7);
		assert!(user.require_owner_or(Some(8), Permission::ManageScripts).is_err());
		assert!(user
			.clone()
			.with_permission(Permission::ManageScripts)
			.require_owner_or(Some(8), Permission::ManageScripts)
			.is_ok());
	}
}
