//! Named preconditions gating a task

use crate::report::Reporter;
use std::fmt;
use std::path::PathBuf;

/// Prompt shown before a failed requirement's detail.
pub const UNSATISFIED_PROMPT: &str = "Requirements are not satisfied";

/// A named boolean precondition with an optional failure explanation.
pub struct Requirement {
    purpose: String,
    predicate: Box<dyn Fn() -> bool>,
    failure_detail: Option<String>,
}

impl Requirement {
    pub fn new(purpose: impl Into<String>, predicate: impl Fn() -> bool + 'static) -> Self {
        Self {
            purpose: purpose.into(),
            predicate: Box::new(predicate),
            failure_detail: None,
        }
    }

    /// Explanation shown when the predicate does not hold
    pub fn with_failure_detail(mut self, detail: impl Into<String>) -> Self {
        self.failure_detail = Some(detail.into());
        self
    }

    /// Holds when something exists at `path`
    pub fn path_exists(purpose: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(purpose, move || crate::path::exists(&path))
    }

    /// Holds when nothing exists at `path`
    pub fn path_absent(purpose: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::new(purpose, move || !crate::path::exists(&path))
    }

    pub fn purpose(&self) -> &str {
        &self.purpose
    }

    pub fn failure_detail(&self) -> Option<&str> {
        self.failure_detail.as_deref()
    }

    /// Evaluate the predicate and report the outcome
    pub fn is_satisfied(&self, reporter: &mut dyn Reporter) -> bool {
        let satisfied = (self.predicate)();
        reporter.check(&self.purpose, satisfied);
        if !satisfied {
            log::info!("requirement not satisfied: {}", self.purpose);
            reporter.failure_detail(UNSATISFIED_PROMPT, self.failure_detail.as_deref());
        }
        satisfied
    }
}

impl fmt::Debug for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requirement")
            .field("purpose", &self.purpose)
            .field("failure_detail", &self.failure_detail)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Diagnostic, Transcript};
    use tempfile::TempDir;

    #[test]
    fn test_satisfied_reports_success_only() {
        let mut transcript = Transcript::new();
        let req = Requirement::new("Always", || true).with_failure_detail("never shown");

        assert!(req.is_satisfied(&mut transcript));
        assert_eq!(
            transcript.entries,
            vec![Diagnostic::Check {
                purpose: "Always".into(),
                success: true
            }]
        );
    }

    #[test]
    fn test_unsatisfied_reports_detail() {
        let mut transcript = Transcript::new();
        let req = Requirement::new("Check an existing installation", || false)
            .with_failure_detail("Vixen Environment is already installed");

        assert!(!req.is_satisfied(&mut transcript));
        assert_eq!(transcript.check_result("Check an existing installation"), Some(false));
        assert_eq!(
            transcript.entries[1],
            Diagnostic::FailureDetail {
                prompt: UNSATISFIED_PROMPT.into(),
                detail: Some("Vixen Environment is already installed".into()),
            }
        );
    }

    #[test]
    fn test_unsatisfied_without_detail() {
        let mut transcript = Transcript::new();
        let req = Requirement::new("Nope", || false);
        assert!(!req.is_satisfied(&mut transcript));
        assert!(matches!(
            transcript.entries[1],
            Diagnostic::FailureDetail { detail: None, .. }
        ));
    }

    #[test]
    fn test_path_predicates() {
        let tmp = TempDir::new().unwrap();
        let present = tmp.path().to_path_buf();
        let missing = tmp.path().join("missing");
        let mut transcript = Transcript::new();

        assert!(Requirement::path_exists("present", &present).is_satisfied(&mut transcript));
        assert!(!Requirement::path_exists("missing", &missing).is_satisfied(&mut transcript));
        assert!(Requirement::path_absent("absent", &missing).is_satisfied(&mut transcript));
        assert!(!Requirement::path_absent("not absent", &present).is_satisfied(&mut transcript));
    }
}
