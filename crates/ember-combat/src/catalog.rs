//! Skill catalog loaded from TOML
//!
//! A catalog file is a list of `[[skills]]` tables, one per
//! [`SkillDefinition`]. Definitions are validated on load and shared as
//! `Arc`s so every equipped instance points at the same data.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info};

use crate::error::CatalogError;
use crate::skill::{SkillDefinition, SkillId};

/// Skills shipped with the engine
const STARTER_SKILLS: &str = include_str!("../data/starter_skills.toml");

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    skills: Vec<SkillDefinition>,
}

/// Validated skill definitions keyed by id
#[derive(Debug, Clone, Default)]
pub struct SkillCatalog {
    skills: BTreeMap<SkillId, Arc<SkillDefinition>>,
}

impl SkillCatalog {
    /// Build a catalog, rejecting invalid definitions and duplicate ids
    pub fn from_definitions(definitions: impl IntoIterator<Item = SkillDefinition>) -> Result<Self, CatalogError> {
        let mut skills = BTreeMap::new();
        for definition in definitions {
            definition.validate()?;
            let id = definition.id;
            debug!("Catalog entry {} {} ({})", id, definition.name, definition.variant().name());
            if skills.insert(id, Arc::new(definition)).is_some() {
                return Err(CatalogError::DuplicateId(id));
            }
        }
        Ok(Self { skills })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        Self::from_definitions(file.skills)
    }

    /// Load a catalog file from disk
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|e| CatalogError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let catalog = Self::from_toml_str(&content)?;
        info!("Loaded {} skills from {:?}", catalog.len(), path);
        Ok(catalog)
    }

    /// The built-in starter set
    pub fn starter() -> Result<Self, CatalogError> {
        Self::from_toml_str(STARTER_SKILLS)
    }

    pub fn get(&self, id: SkillId) -> Option<Arc<SkillDefinition>> {
        self.skills.get(&id).cloned()
    }

    /// Look a skill up by display name
    pub fn find(&self, name: &str) -> Option<Arc<SkillDefinition>> {
        self.skills.values().find(|s| s.name == name).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<SkillDefinition>> {
        self.skills.values()
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
