//! Barclamp templates
//!
//! The template is the canonical, undeployed configuration of a barclamp. Its
//! role list is the source every new proposal is cloned from.

use crate::barclamp::Barclamp;
use crate::role::{CatalogError, RoleCatalog, RoleEntry, RoleList};
use crate::snapshot::Snapshot;
use crate::{BarclampId, RoleTypeId, TemplateId};
use serde::{Deserialize, Serialize};

/// A barclamp's template configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: TemplateId,

    /// Owning barclamp
    pub barclamp_id: BarclampId,

    /// Role types this template may use
    pub catalog: RoleCatalog,

    /// Ordered roles cloned into new proposals
    pub roles: RoleList,

    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Template {
    /// Create the barclamp's template, seeded with the catalog's
    /// non-optional roles
    pub fn for_barclamp(barclamp: &Barclamp, catalog: RoleCatalog) -> Self {
        let roles = RoleList::from_catalog(&catalog);
        Self {
            id: barclamp.template_id.clone(),
            barclamp_id: barclamp.id.clone(),
            catalog,
            roles,
            updated_at: chrono::Utc::now(),
        }
    }

    /// Append a catalog role after the existing entries
    pub fn add_role(&mut self, name: &str) -> Result<RoleEntry, CatalogError> {
        let role_type = self.catalog.lookup(name)?;
        let entry = self.roles.add(role_type)?;
        self.updated_at = chrono::Utc::now();
        Ok(entry)
    }

    /// Change where a role sits in the template
    pub fn set_role_order(
        &mut self,
        role_type_id: &RoleTypeId,
        order: i32,
        run_order: i32,
    ) -> Result<RoleEntry, CatalogError> {
        let entry = self.roles.reorder(role_type_id, order, run_order)?;
        self.updated_at = chrono::Utc::now();
        Ok(entry)
    }

    /// Replace the target snapshot's roles with a deep copy of this template's
    pub fn clone_into(&self, target: &mut Snapshot) {
        target.roles = self.roles.deep_clone();
        target.updated_at = chrono::Utc::now();
    }
}
