//! Complexity Analyzer: a pure function from a section to a model
//! choice and turn budget. Grounded on the rule-evaluation shape used by
//! this codebase's other gate engines (factors -> score -> verdict).

use serde::{Deserialize, Serialize};

use crate::domain::{FileAction, ModelTier, Section};

const FAST_THRESHOLD: u32 = 4;
const DEFAULT_SECTION_MAX_TURNS: u32 = 20;
const DEFAULT_SUBTASK_MAX_TURNS: u32 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplexityFactors {
    pub creates: u32,
    pub modifies: u32,
    pub deletes: u32,
    pub dependency_fan_in: u32,
    pub dependency_fan_out: u32,
    pub has_schema_change: bool,
    pub has_test_change: bool,
    pub success_criterion_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplexityReport {
    pub score: u32,
    pub model: ModelTier,
    pub max_turns: u32,
    pub factors: ComplexityFactors,
    pub risk_flags: Vec<String>,
}

/// Analyze `section` given its fan-out dependents count (fan-in structurally
/// equals `section.dependencies.len()`, fan-out is supplied by the caller
/// since it requires graph context the section alone doesn't carry).
pub fn analyze(section: &Section, dependent_fan_out: u32) -> ComplexityReport {
    let mut factors = ComplexityFactors {
        dependency_fan_in: section.dependencies.len() as u32,
        dependency_fan_out: dependent_fan_out,
        success_criterion_count: section.success_criteria.len() as u32,
        ..Default::default()
    };

    for f in &section.files {
        match f.action {
            FileAction::Create => factors.creates += 1,
            FileAction::Modify => factors.modifies += 1,
            FileAction::Delete => factors.deletes += 1,
        }
        let lower = f.path.to_lowercase();
        if lower.contains("schema") || lower.contains("migration") {
            factors.has_schema_change = true;
        }
        if lower.contains("test") || lower.contains("spec") {
            factors.has_test_change = true;
        }
    }

    let mut score = factors.creates + factors.modifies * 2 + factors.deletes
        + factors.dependency_fan_in
        + factors.dependency_fan_out;
    if factors.has_schema_change {
        score += 2;
    }
    score += factors.success_criterion_count / 3;

    let mut risk_flags = Vec::new();
    if factors.has_schema_change {
        risk_flags.push("schema_change".to_string());
    }
    if factors.deletes > 0 {
        risk_flags.push("destructive_changes".to_string());
    }
    if factors.dependency_fan_out > 2 {
        risk_flags.push("high_fan_out".to_string());
    }

    let model = if score <= FAST_THRESHOLD {
        ModelTier::Fast
    } else {
        ModelTier::Slow
    };

    let max_turns = match model {
        ModelTier::Fast => DEFAULT_SECTION_MAX_TURNS,
        ModelTier::Slow => DEFAULT_SECTION_MAX_TURNS + score,
    };

    ComplexityReport {
        score,
        model,
        max_turns,
        factors,
        risk_flags,
    }
}

/// Model selection for a single subtask: combines the section-level score
/// with the subtask's own file count.
pub fn subtask_model(section_score: u32, subtask_file_count: usize) -> ModelTier {
    if section_score + subtask_file_count as u32 <= FAST_THRESHOLD {
        ModelTier::Fast
    } else {
        ModelTier::Slow
    }
}

pub fn default_subtask_max_turns() -> u32 {
    DEFAULT_SUBTASK_MAX_TURNS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FileStatus, SectionFile};

    fn file(path: &str, action: FileAction) -> SectionFile {
        SectionFile {
            path: path.to_string(),
            action,
            status: FileStatus::Pending,
        }
    }

    #[test]
    fn trivial_section_is_fast() {
        let mut s = Section::new("a", "A", "desc");
        s.files.push(file("src/lib.rs", FileAction::Modify));
        let report = analyze(&s, 0);
        assert_eq!(report.model, ModelTier::Fast);
        assert_eq!(report.max_turns, DEFAULT_SECTION_MAX_TURNS);
    }

    #[test]
    fn schema_change_raises_score_and_risk_flag() {
        let mut s = Section::new("a", "A", "desc");
        s.files.push(file("db/schema.sql", FileAction::Modify));
        let report = analyze(&s, 0);
        assert!(report.factors.has_schema_change);
        assert!(report.risk_flags.contains(&"schema_change".to_string()));
    }

    #[test]
    fn many_modifies_and_high_fan_out_selects_slow() {
        let mut s = Section::new("a", "A", "desc");
        for i in 0..6 {
            s.files.push(file(&format!("src/mod{i}.rs"), FileAction::Modify));
        }
        let report = analyze(&s, 3);
        assert_eq!(report.model, ModelTier::Slow);
        assert!(report.risk_flags.contains(&"high_fan_out".to_string()));
    }

    #[test]
    fn analysis_is_deterministic() {
        let mut s = Section::new("a", "A", "desc");
        s.files.push(file("src/lib.rs", FileAction::Create));
        let r1 = analyze(&s, 1);
        let r2 = analyze(&s, 1);
        assert_eq!(r1.score, r2.score);
        assert_eq!(r1.model, r2.model);
    }

    #[test]
    fn subtask_model_escalates_with_file_count() {
        assert_eq!(subtask_model(2, 1), ModelTier::Fast);
        assert_eq!(subtask_model(2, 5), ModelTier::Slow);
    }
}
