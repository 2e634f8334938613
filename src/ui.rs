use colored::Colorize;
use setupkit::Reporter;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a step indicator
pub fn step(num: usize, total: usize, msg: &str) {
    println!("{} {}", format!("[{num}/{total}]").blue().bold(), msg);
}

// ============================================================================
// Console Reporter
// ============================================================================

/// Prints one colored line per check of a setup run.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    quiet: bool,
}

impl ConsoleReporter {
    /// With `quiet`, only failures and warnings are printed
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

fn check_line(purpose: &str, success: bool) -> String {
    if success {
        format!("  {} {}", "✓".green(), purpose)
    } else {
        format!("  {} {}", "✗".red(), purpose.red())
    }
}

fn detail_line(prompt: &str, detail: Option<&str>) -> String {
    match detail {
        Some(detail) => format!("    {} {}", format!("{prompt}:").yellow(), detail),
        None => format!("    {}", prompt.yellow()),
    }
}

fn note_line(purpose: &str, detail: &str) -> String {
    format!("  {} {} {}", "⚠".yellow(), purpose, format!("({detail})").dimmed())
}

impl Reporter for ConsoleReporter {
    fn title(&mut self, title: &str) {
        if !self.quiet {
            header(title);
        }
    }

    fn check(&mut self, purpose: &str, success: bool) {
        if success && self.quiet {
            return;
        }
        println!("{}", check_line(purpose, success));
    }

    fn failure_detail(&mut self, prompt: &str, detail: Option<&str>) {
        println!("{}", detail_line(prompt, detail));
    }

    fn note(&mut self, purpose: &str, detail: &str) {
        println!("{}", note_line(purpose, detail));
    }
}

// ============================================================================
// Tests
// ============================================================================
