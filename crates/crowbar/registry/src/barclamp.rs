//! Barclamp registry trait
//!
//! The BarclampRegistry stores imported barclamps and their templates.

use crate::error::Result;
use async_trait::async_trait;
use crowbar_types::{Barclamp, BarclampId, Template, TemplateId};

/// Registry for barclamps and templates
#[async_trait]
pub trait BarclampRegistry: Send + Sync {
    /// Register a barclamp together with its template.
    ///
    /// Fails with `BarclampAlreadyExists` if the name is taken; nothing is
    /// written in that case.
    async fn register(&self, barclamp: Barclamp, template: Template) -> Result<()>;

    /// Get a barclamp by ID
    async fn get(&self, id: &BarclampId) -> Result<Option<Barclamp>>;

    /// Get a barclamp by its globally unique name
    async fn get_by_name(&self, name: &str) -> Result<Option<Barclamp>>;

    /// List all barclamps
    async fn list(&self) -> Result<Vec<Barclamp>>;

    /// Change the single/multiple deployment policy
    async fn set_allow_multiple(&self, id: &BarclampId, allow: bool) -> Result<Barclamp>;

    /// Get a template by ID
    async fn get_template(&self, id: &TemplateId) -> Result<Option<Template>>;

    /// Replace a stored template
    async fn update_template(&self, template: Template) -> Result<()>;
}
