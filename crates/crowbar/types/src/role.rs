//! Role catalog and ordered role lists
//!
//! A barclamp ships a fixed catalog of role types. Templates and snapshots
//! hold a [`RoleList`]: an ordered sequence of entries that point back at
//! catalog role types.

use crate::{RoleId, RoleTypeId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A role type available to a barclamp's template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleType {
    pub id: RoleTypeId,
    pub name: String,
    pub description: Option<String>,
    /// Default position in a role list
    pub order: i32,
    /// Tie-breaker within the same `order`
    pub run_order: i32,
    /// Offered by the catalog but not placed in a new template
    pub optional: bool,
}

/// Catalog errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("unknown role type: {0}")]
    UnknownRoleType(String),

    #[error("duplicate role type: {0}")]
    DuplicateRoleType(String),

    #[error("role type not present in list: {0}")]
    RoleNotInList(RoleTypeId),

    #[error("role already present in list: {0}")]
    RoleAlreadyInList(String),
}

/// Immutable catalog of the role types a barclamp offers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleCatalog {
    types: Vec<RoleType>,
}

impl RoleCatalog {
    /// Build a catalog, rejecting duplicate role type names
    pub fn new(types: Vec<RoleType>) -> Result<Self, CatalogError> {
        let mut seen = std::collections::HashSet::new();
        for t in &types {
            if !seen.insert(t.name.as_str()) {
                return Err(CatalogError::DuplicateRoleType(t.name.clone()));
            }
        }

        let mut types = types;
        types.sort_by_key(|t| (t.order, t.run_order));
        Ok(Self { types })
    }

    /// Look up a role type by name
    pub fn get(&self, name: &str) -> Option<&RoleType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Look up a role type by name, failing if it is not in the catalog
    pub fn lookup(&self, name: &str) -> Result<&RoleType, CatalogError> {
        self.get(name)
            .ok_or_else(|| CatalogError::UnknownRoleType(name.to_string()))
    }

    /// Role types in default order
    pub fn iter(&self) -> impl Iterator<Item = &RoleType> {
        self.types.iter()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// A role placed in a template or snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    pub id: RoleId,
    pub role_type_id: RoleTypeId,
    pub name: String,
    pub order: i32,
    pub run_order: i32,
}

impl RoleEntry {
    fn from_type(role_type: &RoleType, order: i32, run_order: i32) -> Self {
        Self {
            id: RoleId::generate(),
            role_type_id: role_type.id.clone(),
            name: role_type.name.clone(),
            order,
            run_order,
        }
    }
}

/// Role entries kept sorted by `(order, run_order)`.
///
/// Sorting is stable, so entries with equal keys keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleList {
    entries: Vec<RoleEntry>,
}

impl RoleList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a list with the catalog's non-optional role types at their
    /// default ordering
    pub fn from_catalog(catalog: &RoleCatalog) -> Self {
        let mut list = Self::new();
        for t in catalog.iter().filter(|t| !t.optional) {
            list.insert(RoleEntry::from_type(t, t.order, t.run_order));
        }
        list
    }

    /// Append a role after every existing entry.
    ///
    /// A role type appears at most once per list.
    pub fn add(&mut self, role_type: &RoleType) -> Result<RoleEntry, CatalogError> {
        if self.contains(&role_type.id) {
            return Err(CatalogError::RoleAlreadyInList(role_type.name.clone()));
        }

        let order = self
            .entries
            .iter()
            .map(|e| e.order)
            .max()
            .map_or(role_type.order, |max| max.saturating_add(1));
        let entry = RoleEntry::from_type(role_type, order, role_type.run_order);
        self.insert(entry.clone());
        Ok(entry)
    }

    /// Move a role to a new `(order, run_order)` position
    pub fn reorder(
        &mut self,
        role_type_id: &RoleTypeId,
        order: i32,
        run_order: i32,
    ) -> Result<RoleEntry, CatalogError> {
        let index = self
            .entries
            .iter()
            .position(|e| &e.role_type_id == role_type_id)
            .ok_or_else(|| CatalogError::RoleNotInList(role_type_id.clone()))?;

        let mut entry = self.entries.remove(index);
        entry.order = order;
        entry.run_order = run_order;
        self.insert(entry.clone());
        Ok(entry)
    }

    /// Copy every entry into a new list with fresh identities.
    ///
    /// Relative order is preserved; the copy shares nothing with `self`.
    pub fn deep_clone(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .map(|e| RoleEntry {
                    id: RoleId::generate(),
                    ..e.clone()
                })
                .collect(),
        }
    }

    pub fn get(&self, index: usize) -> Option<&RoleEntry> {
        self.entries.get(index)
    }

    pub fn position(&self, role_type_id: &RoleTypeId) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| &e.role_type_id == role_type_id)
    }

    pub fn contains(&self, role_type_id: &RoleTypeId) -> bool {
        self.position(role_type_id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoleEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, entry: RoleEntry) {
        let key = (entry.order, entry.run_order);
        let at = self
            .entries
            .partition_point(|e| (e.order, e.run_order) <= key);
        self.entries.insert(at, entry);
    }
}
