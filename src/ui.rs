use colored::{ColoredString, Colorize};
use declarative::{ConnectionDetails, ReconcileOutcome};

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
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

/// Yes/no flag, green when set.
pub fn flag(value: bool) -> ColoredString {
    if value { "yes".green() } else { "no".yellow() }
}

/// Outcome label, colored by what happened.
pub fn outcome(outcome: &ReconcileOutcome) -> ColoredString {
    let label = outcome.to_string();
    match outcome {
        ReconcileOutcome::Created | ReconcileOutcome::Updated => label.green(),
        ReconcileOutcome::Deleted => label.yellow(),
        ReconcileOutcome::UpToDate | ReconcileOutcome::Absent => label.dimmed(),
        ReconcileOutcome::Failed { .. } => label.red(),
    }
}

/// Print connection details; values are shown only when `reveal` is set.
pub fn details(details: &ConnectionDetails, reveal: bool) {
    if details.is_empty() {
        return;
    }
    section("Connection details");
    for (name, value) in details {
        if reveal {
            kv(name, &String::from_utf8_lossy(value));
        } else {
            kv(name, &format!("<{}>", byte_count(value.len())));
        }
    }
}

/// "1 byte", "12 bytes"
pub fn byte_count(n: usize) -> String {
    if n == 1 {
        "1 byte".to_string()
    } else {
        format!("{n} bytes")
    }
}
