//! Output formatting utilities for CLI commands

use colored::Colorize;
use thermowatch_shared::utils::format_celsius;
use thermowatch_shared::{Alert, Reading};

/// Print success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print warning message
pub fn warning(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print one reading with its range status
pub fn reading(reading: &Reading, in_range: bool) {
    let line = reading_line(reading);
    if in_range {
        println!("{} {}", "●".green(), line);
    } else {
        println!("{} {} {}", "●".red(), line, "out of range".red().bold());
    }
}

/// Print a fired alert
pub fn alert(alert: &Alert) {
    println!(
        "{} {}: {}",
        "🔔".bold(),
        alert.title.bold(),
        alert.body.yellow()
    );
}

fn reading_line(reading: &Reading) -> String {
    format!(
        "{}  {:>8}",
        reading.observed_at().format("%Y-%m-%d %H:%M:%S"),
        format_celsius(reading.value())
    )
}
