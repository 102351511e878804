//! Barclamp definition loaders
//!
//! A loader turns a barclamp name (and optionally an explicit source
//! directory) into a [`BarclampDefinition`]. The filesystem loader reads
//! `crowbar.yml`, `crowbar.yaml` or `crowbar.json` from the barclamp's
//! directory.

use async_trait::async_trait;
use crowbar_types::BarclampDefinition;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// File names tried in order inside a barclamp directory
pub const DEFINITION_FILES: [&str; 3] = ["crowbar.yml", "crowbar.yaml", "crowbar.json"];

/// Loader errors
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("No definition for {name} under {}", .dir.display())]
    NotFound { name: String, dir: PathBuf },

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Definition declares {found}, expected {expected}")]
    NameMismatch { expected: String, found: String },
}

/// A definition together with where it came from
#[derive(Debug, Clone)]
pub struct LoadedDefinition {
    pub definition: BarclampDefinition,
    pub source_path: Option<PathBuf>,
}

/// Source of barclamp definitions
#[async_trait]
pub trait DefinitionLoader: Send + Sync {
    /// Load the definition for `name`, from `source` when given
    async fn load(&self, name: &str, source: Option<&Path>)
        -> Result<LoadedDefinition, LoaderError>;
}

/// Reads definitions from `<root>/<name>/` or an explicit directory
#[derive(Debug, Clone)]
pub struct FileDefinitionLoader {
    root: PathBuf,
}

impl FileDefinitionLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn parse(path: &Path, contents: &str) -> Result<BarclampDefinition, LoaderError> {
        let is_yaml = path
            .extension()
            .map(|ext| ext == "yml" || ext == "yaml")
            .unwrap_or(false);

        let parsed: Result<BarclampDefinition, String> = if is_yaml {
            serde_yaml::from_str(contents).map_err(|e| e.to_string())
        } else {
            serde_json::from_str(contents).map_err(|e| e.to_string())
        };

        parsed.map_err(|message| LoaderError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }
}

#[async_trait]
impl DefinitionLoader for FileDefinitionLoader {
    async fn load(
        &self,
        name: &str,
        source: Option<&Path>,
    ) -> Result<LoadedDefinition, LoaderError> {
        let dir = match source {
            Some(dir) => dir.to_path_buf(),
            None => self.root.join(name),
        };

        for file in DEFINITION_FILES {
            let path = dir.join(file);
            let contents = match tokio::fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(source) => return Err(LoaderError::Io { path, source }),
            };

            debug!(barclamp = name, path = %path.display(), "loading definition");
            let definition = Self::parse(&path, &contents)?;
            if definition.name != name {
                return Err(LoaderError::NameMismatch {
                    expected: name.to_string(),
                    found: definition.name,
                });
            }

            return Ok(LoadedDefinition {
                definition,
                source_path: Some(dir),
            });
        }

        Err(LoaderError::NotFound {
            name: name.to_string(),
            dir,
        })
    }
}

/// Serves definitions registered in memory
#[derive(Debug, Default)]
pub struct StaticDefinitionLoader {
    definitions: DashMap<String, BarclampDefinition>,
}

impl StaticDefinitionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, definition: BarclampDefinition) -> Self {
        self.insert(definition);
        self
    }

    pub fn insert(&self, definition: BarclampDefinition) {
        self.definitions.insert(definition.name.clone(), definition);
    }
}

#[async_trait]
impl DefinitionLoader for StaticDefinitionLoader {
    async fn load(
        &self,
        name: &str,
        source: Option<&Path>,
    ) -> Result<LoadedDefinition, LoaderError> {
        let definition = self
            .definitions
            .get(name)
            .map(|d| d.clone())
            .ok_or_else(|| LoaderError::NotFound {
                name: name.to_string(),
                dir: source.map(Path::to_path_buf).unwrap_or_default(),
            })?;

        Ok(LoadedDefinition {
            definition,
            source_path: source.map(Path::to_path_buf),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FOO_YAML: &str = r#"
name: foo
description: test barclamp
roles:
  - name: private
    order: 0
    run_order: 0
  - name: server
    order: 10
    run_order: 10
  - name: clone_me
    order: 90
    run_order: 90
    optional: true
"#;

    fn write(dir: &Path, file: &str, contents: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(dir.join(file), contents).unwrap();
    }

    #[tokio::test]
    async fn test_load_from_root() {
        let root = tempfile::tempdir().unwrap();
        write(&root.path().join("foo"), "crowbar.yml", FOO_YAML);

        let loader = FileDefinitionLoader::new(root.path());
        let loaded = loader.load("foo", None).await.unwrap();

        assert_eq!(loaded.definition.name, "foo");
        assert_eq!(loaded.definition.roles.len(), 3);
        assert!(loaded.definition.roles[2].optional);
        assert_eq!(loaded.source_path, Some(root.path().join("foo")));
    }

    #[tokio::test]
    async fn test_load_from_explicit_source() {
        let data = tempfile::tempdir().unwrap();
        write(
            data.path(),
            "crowbar.json",
            r#"{"name":"foo","allow_multiple_deployments":true}"#,
        );

        let loader = FileDefinitionLoader::new("/nonexistent");
        let loaded = loader.load("foo", Some(data.path())).await.unwrap();
        assert!(loaded.definition.allow_multiple_deployments);
        assert!(loaded.definition.roles.is_empty());
    }

    #[tokio::test]
    async fn test_missing_definition() {
        let root = tempfile::tempdir().unwrap();
        let loader = FileDefinitionLoader::new(root.path());
        let err = loader.load("ghost", None).await.unwrap_err();
        assert!(matches!(err, LoaderError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_malformed_definition() {
        let root = tempfile::tempdir().unwrap();
        write(&root.path().join("bad"), "crowbar.yaml", "name: [unclosed");

        let loader = FileDefinitionLoader::new(root.path());
        let err = loader.load("bad", None).await.unwrap_err();
        assert!(matches!(err, LoaderError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_name_mismatch() {
        let root = tempfile::tempdir().unwrap();
        write(&root.path().join("bar"), "crowbar.yml", FOO_YAML);

        let loader = FileDefinitionLoader::new(root.path());
        let err = loader.load("bar", None).await.unwrap_err();
        assert!(matches!(err, LoaderError::NameMismatch { .. }));
    }

    #[tokio::test]
    async fn test_static_loader() {
        let loader = StaticDefinitionLoader::new()
            .with(BarclampDefinition::new("foo").with_role("private", 0, 0));

        let loaded = loader.load("foo", None).await.unwrap();
        assert_eq!(loaded.definition.roles.len(), 1);
        assert!(loaded.source_path.is_none());
        assert!(loader.load("bar", None).await.is_err());
    }
}
