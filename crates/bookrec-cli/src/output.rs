//! Output formatting utilities.

use colored::Colorize;

/// Print a section header
pub(crate) fn section(title: &str) {
    println!("\n{}", format!("=== {title} ===").cyan().bold());
}

/// Print a key-value pair
pub(crate) fn kv(key: &str, value: impl std::fmt::Display) {
    println!("  {}: {}", key.white().bold(), value);
}

/// Print a success message
pub(crate) fn success(msg: &str) {
    println!("{} {}", "[OK]".green().bold(), msg);
}

/// Print a warning message
pub(crate) fn warning(msg: &str) {
    println!("{} {}", "[WARN]".yellow().bold(), msg);
}

/// Print an error message
pub(crate) fn error(msg: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), msg);
}

/// A horizontal bar scaled to `width` characters for `value / max`.
pub(crate) fn bar(value: f32, max: f32, width: usize) -> String {
    if max.is_nan() || max <= 0.0 || !value.is_finite() {
        return String::new();
    }
    let filled = ((value / max).clamp(0.0, 1.0) * width as f32).round() as usize;
    "#".repeat(filled)
}
