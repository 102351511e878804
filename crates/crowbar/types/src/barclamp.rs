//! Barclamp records and definitions
//!
//! A [`BarclampDefinition`] is what a definition loader reads from disk; a
//! [`Barclamp`] is the registry record created when that definition is
//! imported.

use crate::role::{CatalogError, RoleCatalog, RoleType};
use crate::{BarclampId, RoleTypeId, TemplateId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Registry entry for an imported barclamp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Barclamp {
    pub id: BarclampId,

    /// Globally unique
    pub name: String,

    pub description: Option<String>,

    /// Barclamp this one was imported under
    pub parent_id: Option<BarclampId>,

    /// Whether more than one deployment may coexist
    pub allow_multiple_deployments: bool,

    pub template_id: TemplateId,

    /// Where the definition was loaded from
    pub source_path: Option<PathBuf>,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Barclamp {
    pub fn new(definition: &BarclampDefinition, template_id: TemplateId) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: BarclampId::generate(),
            name: definition.name.clone(),
            description: definition.description.clone(),
            parent_id: None,
            allow_multiple_deployments: definition.allow_multiple_deployments,
            template_id,
            source_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_parent(mut self, parent_id: BarclampId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }
}

/// Barclamp definition as shipped with the barclamp (`crowbar.yml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarclampDefinition {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub allow_multiple_deployments: bool,

    #[serde(default)]
    pub roles: Vec<RoleDefinition>,
}

/// A role declared by a barclamp definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDefinition {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub order: i32,

    #[serde(default)]
    pub run_order: i32,

    /// Listed in the catalog but left out of the initial template
    #[serde(default)]
    pub optional: bool,
}

impl BarclampDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            allow_multiple_deployments: false,
            roles: Vec::new(),
        }
    }

    pub fn with_role(mut self, name: impl Into<String>, order: i32, run_order: i32) -> Self {
        self.roles.push(RoleDefinition {
            name: name.into(),
            description: None,
            order,
            run_order,
            optional: false,
        });
        self
    }

    pub fn with_optional_role(
        mut self,
        name: impl Into<String>,
        order: i32,
        run_order: i32,
    ) -> Self {
        self.roles.push(RoleDefinition {
            name: name.into(),
            description: None,
            order,
            run_order,
            optional: true,
        });
        self
    }

    pub fn allow_multiple(mut self, allow: bool) -> Self {
        self.allow_multiple_deployments = allow;
        self
    }

    /// Build the role catalog this definition declares
    pub fn catalog(&self) -> Result<RoleCatalog, CatalogError> {
        RoleCatalog::new(
            self.roles
                .iter()
                .map(|r| RoleType {
                    id: RoleTypeId::generate(),
                    name: r.name.clone(),
                    description: r.description.clone(),
                    order: r.order,
                    run_order: r.run_order,
                    optional: r.optional,
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_defaults() {
        let def: BarclampDefinition =
            serde_json::from_str(r#"{"name":"test","roles":[{"name":"private"}]}"#).unwrap();
        assert!(!def.allow_multiple_deployments);
        assert_eq!(def.roles[0].order, 0);
        assert!(!def.roles[0].optional);
        assert_eq!(def.catalog().unwrap().len(), 1);
    }

    #[test]
    fn test_catalog_rejects_duplicate_roles() {
        let def = BarclampDefinition::new("dup")
            .with_role("server", 1, 1)
            .with_role("server", 2, 2);
        assert!(def.catalog().is_err());
    }

    #[test]
    fn test_barclamp_inherits_policy() {
        let def = BarclampDefinition::new("multi").allow_multiple(true);
        let bc = Barclamp::new(&def, TemplateId::generate()).with_source_path("barclamps/multi");
        assert!(bc.allow_multiple_deployments);
        assert_eq!(bc.name, "multi");
        assert!(bc.parent_id.is_none());
        assert!(bc.source_path.is_some());
    }
}
