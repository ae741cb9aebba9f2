//! Plan: the immutable-after-approval description of work for one project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Section;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodebaseContext {
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelConfig {
    pub enabled: bool,
    pub max_workers: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_workers: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub project_id: String,
    pub sections: Vec<Section>,
    #[serde(default)]
    pub codebase_context: CodebaseContext,
    #[serde(default)]
    pub parallel: ParallelConfig,
    #[serde(default)]
    pub approved_at: Option<DateTime<Utc>>,
}

impl Plan {
    pub fn new(project_id: impl Into<String>, sections: Vec<Section>) -> Self {
        Self {
            project_id: project_id.into(),
            sections,
            codebase_context: CodebaseContext::default(),
            parallel: ParallelConfig::default(),
            approved_at: None,
        }
    }

    pub fn is_approved(&self) -> bool {
        self.approved_at.is_some()
    }

    pub fn approve(&mut self) {
        self.approved_at = Some(Utc::now());
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    pub fn section_mut(&mut self, id: &str) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id == id)
    }
}
