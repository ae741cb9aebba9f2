//! Subtask identification: a pure function of `section.files`.
//!
//! Grounded on the same path-classification shape this codebase already uses
//! for role decomposition (`role_orchestration::roles`), generalized to the
//! concrete schema/types/implementation/tests buckets a section decomposes
//! into.

use bvs_core::domain::{Section, SectionFile, SubtaskKind};

const IMPLEMENTATION_CHUNK_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtaskSpec {
    pub kind: SubtaskKind,
    pub name: String,
    pub files: Vec<String>,
}

fn classify(path: &str) -> SubtaskKind {
    let lower = path.to_lowercase();
    if lower.contains("migration") || lower.contains("schema") || lower.contains("database-client")
    {
        SubtaskKind::Schema
    } else if lower.contains(".types.") || lower.contains("/types/") {
        SubtaskKind::Types
    } else if lower.contains(".test.") || lower.contains(".spec.") || lower.contains("__tests__/") {
        SubtaskKind::Tests
    } else {
        SubtaskKind::Implementation
    }
}

/// Identify subtasks from `section.files`. Deterministic: the same file list
/// always yields the same subtask sequence, in schema, types, implementation
/// chunks, tests order. Falls back to a single catch-all subtask if files
/// are present but none classify (impossible given the `else` arm above, but
/// kept as the documented fallback for an empty `files` list with no
/// classification at all).
pub fn identify_subtasks(section: &Section) -> Vec<SubtaskSpec> {
    if section.files.is_empty() {
        return Vec::new();
    }

    let mut schema = Vec::new();
    let mut types = Vec::new();
    let mut implementation = Vec::new();
    let mut tests = Vec::new();

    for f in &section.files {
        let SectionFile { path, .. } = f;
        match classify(path) {
            SubtaskKind::Schema => schema.push(path.clone()),
            SubtaskKind::Types => types.push(path.clone()),
            SubtaskKind::Implementation => implementation.push(path.clone()),
            SubtaskKind::Tests => tests.push(path.clone()),
        }
    }

    let mut out = Vec::new();
    if !schema.is_empty() {
        out.push(SubtaskSpec {
            kind: SubtaskKind::Schema,
            name: "schema".to_string(),
            files: schema,
        });
    }
    if !types.is_empty() {
        out.push(SubtaskSpec {
            kind: SubtaskKind::Types,
            name: "types".to_string(),
            files: types,
        });
    }
    for (idx, chunk) in implementation.chunks(IMPLEMENTATION_CHUNK_SIZE).enumerate() {
        out.push(SubtaskSpec {
            kind: SubtaskKind::Implementation,
            name: format!("implementation-{}", idx + 1),
            files: chunk.to_vec(),
        });
    }
    if !tests.is_empty() {
        out.push(SubtaskSpec {
            kind: SubtaskKind::Tests,
            name: "tests".to_string(),
            files: tests,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bvs_core::domain::{FileAction, FileStatus};

    fn file(path: &str) -> SectionFile {
        SectionFile {
            path: path.to_string(),
            action: FileAction::Modify,
            status: FileStatus::Pending,
        }
    }

    fn section(paths: &[&str]) -> Section {
        let mut s = Section::new("a", "A", "desc");
        s.files = paths.iter().map(|p| file(p)).collect();
        s
    }

    #[test]
    fn no_files_yields_no_subtasks() {
        assert!(identify_subtasks(&section(&[])).is_empty());
    }

    #[test]
    fn classifies_into_fixed_order() {
        let s = section(&[
            "src/db/schema.sql",
            "src/models.types.ts",
            "src/lib.rs",
            "src/lib.test.ts",
        ]);
        let subtasks = identify_subtasks(&s);
        let kinds: Vec<_> = subtasks.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                SubtaskKind::Schema,
                SubtaskKind::Types,
                SubtaskKind::Implementation,
                SubtaskKind::Tests
            ]
        );
    }

    #[test]
    fn implementation_files_chunk_at_five() {
        let paths: Vec<String> = (0..12).map(|i| format!("src/mod{i}.rs")).collect();
        let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
        let subtasks = identify_subtasks(&section(&refs));
        assert_eq!(subtasks.len(), 3);
        assert_eq!(subtasks[0].files.len(), 5);
        assert_eq!(subtasks[1].files.len(), 5);
        assert_eq!(subtasks[2].files.len(), 2);
    }

    #[test]
    fn identification_is_deterministic() {
        let s = section(&["src/a.rs", "src/b.rs"]);
        assert_eq!(identify_subtasks(&s), identify_subtasks(&s));
    }

    #[test]
    fn only_implementation_files_present() {
        let s = section(&["src/lib.rs"]);
        let subtasks = identify_subtasks(&s);
        assert_eq!(subtasks.len(), 1);
        assert_eq!(subtasks[0].kind, SubtaskKind::Implementation);
    }
}
