//! Diagnostic sink
//!
//! The runner reports every check it performs through a [`Reporter`], which
//! keeps this crate free of any terminal or color dependency.

/// Receives user-facing diagnostics while a setup runs.
pub trait Reporter {
    /// Setup banner, emitted once before initialization
    fn title(&mut self, message: &str);

    /// Outcome of one check or step
    fn check(&mut self, purpose: &str, success: bool);

    /// Explanation emitted after a failed requirement
    fn failure_detail(&mut self, prompt: &str, detail: Option<&str>);

    /// A step that did not run, with the reason ("skipped", "no snapshot")
    fn note(&mut self, purpose: &str, detail: &str);
}

/// Reporter that discards everything.
pub struct NoReport;

impl Reporter for NoReport {
    fn title(&mut self, _message: &str) {}
    fn check(&mut self, _purpose: &str, _success: bool) {}
    fn failure_detail(&mut self, _prompt: &str, _detail: Option<&str>) {}
    fn note(&mut self, _purpose: &str, _detail: &str) {}
}

/// One recorded diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    Title(String),
    Check { purpose: String, success: bool },
    FailureDetail { prompt: String, detail: Option<String> },
    Note { purpose: String, detail: String },
}

/// Reporter that keeps every diagnostic in order.
#[derive(Debug, Default)]
pub struct Transcript {
    pub entries: Vec<Diagnostic>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Outcome of the last check with this purpose
    pub fn check_result(&self, purpose: &str) -> Option<bool> {
        self.entries.iter().rev().find_map(|entry| match entry {
            Diagnostic::Check {
                purpose: p,
                success,
            } if p == purpose => Some(*success),
            _ => None,
        })
    }

    pub fn has_check(&self, purpose: &str) -> bool {
        self.check_result(purpose).is_some()
    }

    pub fn has_note(&self, purpose: &str, detail: &str) -> bool {
        self.entries.iter().any(|entry| {
            matches!(
                entry,
                Diagnostic::Note { purpose: p, detail: d } if p == purpose && d == detail
            )
        })
    }
}

impl Reporter for Transcript {
    fn title(&mut self, message: &str) {
        self.entries.push(Diagnostic::Title(message.to_string()));
    }

    fn check(&mut self, purpose: &str, success: bool) {
        self.entries.push(Diagnostic::Check {
            purpose: purpose.to_string(),
            success,
        });
    }

    fn failure_detail(&mut self, prompt: &str, detail: Option<&str>) {
        self.entries.push(Diagnostic::FailureDetail {
            prompt: prompt.to_string(),
            detail: detail.map(str::to_string),
        });
    }

    fn note(&mut self, purpose: &str, detail: &str) {
        self.entries.push(Diagnostic::Note {
            purpose: purpose.to_string(),
            detail: detail.to_string(),
        });
    }
}
