//! Goal Reviewer: an independent requirements-vs-implementation gate,
//! distinct from and blind to the quality gate's build/test/lint results
//! except where those are folded into the final verdict.

use std::path::Path;

use bvs_core::domain::{Section, SectionFile};

#[cfg(test)]
use bvs_core::domain::FileStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Must,
    Should,
    Could,
}

fn infer_priority(description: &str) -> Priority {
    let lower = description.to_lowercase();
    if lower.contains("should") || lower.contains("recommend") {
        Priority::Should
    } else if lower.contains("could") || lower.contains("optional") || lower.contains("nice to have") {
        Priority::Could
    } else {
        Priority::Must
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RequirementKind {
    Criterion { id: String },
    File { path: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    pub kind: RequirementKind,
    pub description: String,
    pub priority: Priority,
    pub implemented: bool,
}

fn build_requirements(section: &Section) -> Vec<Requirement> {
    let mut requirements: Vec<Requirement> = section
        .success_criteria
        .iter()
        .map(|c| Requirement {
            kind: RequirementKind::Criterion { id: c.id.clone() },
            priority: infer_priority(&c.description),
            description: c.description.clone(),
            implemented: false,
        })
        .collect();

    requirements.extend(section.files.iter().map(|f| Requirement {
        kind: RequirementKind::File { path: f.path.clone() },
        description: format!("file {} is present", f.path),
        priority: Priority::Must,
        implemented: false,
    }));

    requirements
}

/// Correlation check for criterion requirements: deliberately weak, per
/// design — any changed file at all is taken as evidence the criterion was
/// worked on. File requirements get a real existence check instead.
fn check_requirements(requirements: &mut [Requirement], project_root: &Path, changed_files: &[String]) {
    for req in requirements.iter_mut() {
        req.implemented = match &req.kind {
            RequirementKind::File { path } => project_root.join(path).exists(),
            RequirementKind::Criterion { .. } => !changed_files.is_empty(),
        };
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeDelta {
    pub scope_creep: Vec<String>,
    pub scope_reduction: Vec<(String, Priority)>,
}

fn is_related_to_plan(path: &str, planned: &[&SectionFile]) -> bool {
    let stem = Path::new(path).file_stem().and_then(|s| s.to_str()).unwrap_or(path);
    planned
        .iter()
        .any(|f| f.path.contains(stem) || stem.contains("test") || stem.contains("spec") || stem.contains("types"))
}

fn compute_scope_delta(section: &Section, requirements: &[Requirement], changed_files: &[String]) -> ScopeDelta {
    let planned: Vec<&SectionFile> = section.files.iter().collect();

    let scope_creep = changed_files
        .iter()
        .filter(|changed| !planned.iter().any(|f| &f.path == *changed))
        .filter(|changed| !is_related_to_plan(changed, &planned))
        .cloned()
        .collect();

    let scope_reduction = requirements
        .iter()
        .filter(|r| !r.implemented)
        .map(|r| (r.description.clone(), r.priority))
        .collect();

    ScopeDelta {
        scope_creep,
        scope_reduction,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Approved,
    Partial,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewResult {
    pub verdict: Verdict,
    pub requirements: Vec<Requirement>,
    pub scope_delta: ScopeDelta,
    pub should_coverage: f64,
}

#[derive(Debug, Clone)]
pub struct ReviewConfig {
    pub should_threshold: f64,
    pub build_or_tests_failing: bool,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            should_threshold: 0.8,
            build_or_tests_failing: false,
        }
    }
}

fn should_coverage(requirements: &[Requirement]) -> f64 {
    let should: Vec<&Requirement> = requirements.iter().filter(|r| r.priority == Priority::Should).collect();
    if should.is_empty() {
        return 1.0;
    }
    let met = should.iter().filter(|r| r.implemented).count();
    met as f64 / should.len() as f64
}

fn has_critical_scope_issue(delta: &ScopeDelta) -> bool {
    delta
        .scope_reduction
        .iter()
        .any(|(_, priority)| *priority == Priority::Must)
}

/// Review `section` against `changed_files`, none of which need to be the
/// files the plan declared.
pub fn review_section(
    section: &Section,
    project_root: &Path,
    changed_files: &[String],
    cfg: &ReviewConfig,
) -> ReviewResult {
    let mut requirements = build_requirements(section);
    check_requirements(&mut requirements, project_root, changed_files);

    let scope_delta = compute_scope_delta(section, &requirements, changed_files);
    let coverage = should_coverage(&requirements);

    let any_unmet_must = requirements
        .iter()
        .any(|r| r.priority == Priority::Must && !r.implemented);

    let verdict = if any_unmet_must || has_critical_scope_issue(&scope_delta) || cfg.build_or_tests_failing {
        Verdict::Rejected
    } else if coverage < cfg.should_threshold {
        Verdict::Partial
    } else {
        Verdict::Approved
    };

    ReviewResult {
        verdict,
        requirements,
        scope_delta,
        should_coverage: coverage,
    }
}

/// Render a markdown report, suitable for storage alongside run artifacts.
pub fn render_report(section: &Section, result: &ReviewResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("# Goal Review: {}\n\n", section.name));
    out.push_str(&format!("**Verdict:** {:?}\n\n", result.verdict));
    out.push_str(&format!("**Should coverage:** {:.0}%\n\n", result.should_coverage * 100.0));

    out.push_str("## Requirements\n\n");
    for req in &result.requirements {
        let mark = if req.implemented { "x" } else { " " };
        out.push_str(&format!("- [{mark}] ({:?}) {}\n", req.priority, req.description));
    }

    if !result.scope_delta.scope_creep.is_empty() {
        out.push_str("\n## Scope creep\n\n");
        for path in &result.scope_delta.scope_creep {
            out.push_str(&format!("- {path}\n"));
        }
    }

    if !result.scope_delta.scope_reduction.is_empty() {
        out.push_str("\n## Scope reduction\n\n");
        for (desc, priority) in &result.scope_delta.scope_reduction {
            out.push_str(&format!("- ({priority:?}) {desc}\n"));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvs_core::domain::{FileAction, SuccessCriterion};

    fn section_with_criteria(criteria: Vec<(&str, &str)>) -> Section {
        let mut section = Section::new("sec-1", "Example section", "desc");
        section.success_criteria = criteria
            .into_iter()
            .map(|(id, desc)| SuccessCriterion {
                id: id.to_string(),
                description: desc.to_string(),
                passed: false,
            })
            .collect();
        section
    }

    #[test]
    fn priority_inferred_from_phrase() {
        assert_eq!(infer_priority("the API should validate input"), Priority::Should);
        assert_eq!(infer_priority("nice to have: dark mode"), Priority::Could);
        assert_eq!(infer_priority("must expose a REST endpoint"), Priority::Must);
    }

    #[test]
    fn unmet_must_file_requirement_rejects() {
        let dir = tempfile::tempdir().unwrap();
        let mut section = section_with_criteria(vec![]);
        section.files.push(SectionFile {
            path: "src/missing.rs".into(),
            action: FileAction::Create,
            status: FileStatus::Pending,
        });
        let result = review_section(&section, dir.path(), &[], &ReviewConfig::default());
        assert_eq!(result.verdict, Verdict::Rejected);
    }

    #[test]
    fn present_file_requirement_approves_with_full_should_coverage() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("present.rs"), "fn main() {}").unwrap();
        let mut section = section_with_criteria(vec![]);
        section.files.push(SectionFile {
            path: "present.rs".into(),
            action: FileAction::Create,
            status: FileStatus::Pending,
        });
        let result = review_section(&section, dir.path(), &["present.rs".to_string()], &ReviewConfig::default());
        assert_eq!(result.verdict, Verdict::Approved);
    }

    #[test]
    fn low_should_coverage_yields_partial() {
        let dir = tempfile::tempdir().unwrap();
        let section = section_with_criteria(vec![
            ("c1", "API should validate input"),
            ("c2", "API should log errors"),
        ]);
        // no changed files => neither `should` criterion correlates to anything
        let result = review_section(&section, dir.path(), &[], &ReviewConfig::default());
        assert_eq!(result.verdict, Verdict::Partial);
        assert!(result.should_coverage < 0.8);
    }

    #[test]
    fn failing_build_forces_rejected_even_with_full_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let section = section_with_criteria(vec![]);
        let cfg = ReviewConfig {
            build_or_tests_failing: true,
            ..ReviewConfig::default()
        };
        let result = review_section(&section, dir.path(), &[], &cfg);
        assert_eq!(result.verdict, Verdict::Rejected);
    }

    #[test]
    fn scope_creep_detected_for_unrelated_changed_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut section = section_with_criteria(vec![]);
        section.files.push(SectionFile {
            path: "src/a.rs".into(),
            action: FileAction::Modify,
            status: FileStatus::Pending,
        });
        std::fs::write(dir.path().join("a.rs"), "").unwrap();
        let changed = vec!["src/a.rs".to_string(), "src/unrelated_module.rs".to_string()];
        let result = review_section(&section, dir.path(), &changed, &ReviewConfig::default());
        assert_eq!(result.scope_delta.scope_creep, vec!["src/unrelated_module.rs".to_string()]);
    }

    #[test]
    fn render_report_includes_verdict_and_requirements() {
        let dir = tempfile::tempdir().unwrap();
        let section = section_with_criteria(vec![("c1", "must expose an endpoint")]);
        let result = review_section(&section, dir.path(), &[], &ReviewConfig::default());
        let report = render_report(&section, &result);
        assert!(report.contains("Goal Review"));
        assert!(report.contains("must expose an endpoint"));
    }
}
