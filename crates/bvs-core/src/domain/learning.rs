//! Learning: an immutable, append-only record captured on session-limit
//! violations and other notable failures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learning {
    pub id: String,
    pub problem: String,
    pub solution: String,
    pub prevention_rule: String,
    #[serde(default)]
    pub files: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub applied_count: u32,
}

impl Learning {
    pub fn new(
        id: impl Into<String>,
        problem: impl Into<String>,
        solution: impl Into<String>,
        prevention_rule: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            problem: problem.into(),
            solution: solution.into(),
            prevention_rule: prevention_rule.into(),
            files: Vec::new(),
            created_at: Utc::now(),
            applied_count: 0,
        }
    }

    /// Render as one `learnings.md` entry.
    pub fn to_markdown(&self) -> String {
        format!(
            "## {}\n\n- **Problem:** {}\n- **Solution:** {}\n- **Prevention:** {}\n- **Files:** {}\n- **Captured:** {}\n",
            self.id,
            self.problem,
            self.solution,
            self.prevention_rule,
            if self.files.is_empty() {
                "none".to_string()
            } else {
                self.files.join(", ")
            },
            self.created_at.to_rfc3339(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_rendering_includes_all_fields() {
        let mut l = Learning::new("l1", "cost exceeded", "halted run", "lower per-section budget");
        l.files.push("plan.json".to_string());
        let md = l.to_markdown();
        assert!(md.contains("cost exceeded"));
        assert!(md.contains("plan.json"));
        assert!(md.starts_with("## l1"));
    }
}
