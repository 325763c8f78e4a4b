//! Training catalog: the programs, session templates and exercises an
//! athlete can see, plus the coach messages addressed to them.
//!
//! The catalog is authored elsewhere and handed to the engine already
//! de-duplicated; this module only loads, indexes and validates it.

use crate::types::*;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use uuid::Uuid;

/// The complete set of coach-authored content visible to one athlete
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TrainingCatalog {
    #[serde(default)]
    pub programs: Vec<Program>,
    #[serde(default)]
    pub templates: Vec<SessionTemplate>,
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub coach_messages: Vec<CoachMessage>,
}

impl TrainingCatalog {
    /// Load a catalog from a JSON file
    ///
    /// Returns an empty catalog if the file doesn't exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No catalog file found at {:?}, using empty catalog", path);
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let catalog: TrainingCatalog = serde_json::from_str(&contents)?;
        tracing::debug!(
            "Loaded catalog from {:?}: {} programs, {} templates, {} exercises",
            path,
            catalog.programs.len(),
            catalog.templates.len(),
            catalog.exercises.len()
        );
        Ok(catalog)
    }

    /// Save the catalog as pretty JSON, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::debug!("Saved catalog to {:?}", path);
        Ok(())
    }

    /// Look up a template by id
    pub fn template(&self, id: Uuid) -> Result<&SessionTemplate> {
        self.templates
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::NotFound(format!("session template {}", id)))
    }

    /// Program names keyed by program id
    pub fn program_names(&self) -> HashMap<Uuid, String> {
        self.programs
            .iter()
            .map(|p| (p.id, p.name.clone()))
            .collect()
    }

    /// Exercise names keyed by exercise id
    pub fn exercise_names(&self) -> HashMap<Uuid, String> {
        self.exercises
            .iter()
            .map(|e| (e.id, e.name.clone()))
            .collect()
    }

    /// Validate the catalog and return a list of problems (empty means valid)
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let program_ids: HashSet<Uuid> = self.programs.iter().map(|p| p.id).collect();
        let mut seen_templates = HashSet::new();

        for template in &self.templates {
            if !seen_templates.insert(template.id) {
                errors.push(format!("Duplicate session template id {}", template.id));
            }

            if !program_ids.contains(&template.program_id) {
                errors.push(format!(
                    "Template '{}' references unknown program {}",
                    template.name, template.program_id
                ));
            }

            if template.week_number == 0 {
                errors.push(format!(
                    "Template '{}' has week number 0 (weeks start at 1)",
                    template.name
                ));
            }
        }

        let mut seen_exercises = HashSet::new();
        for exercise in &self.exercises {
            if !seen_exercises.insert(exercise.id) {
                errors.push(format!("Duplicate exercise id {}", exercise.id));
            }
        }

        errors
    }
}
