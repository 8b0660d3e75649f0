//! Progress bar and console output utilities
//!
//! Key features:
//! - A batch progress bar that suspends cleanly when logging
//! - Consistent console formatting for summaries
//! - A writer that tees log output to stderr and a log file

use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;

// ============================================================================
// Styles
// ============================================================================

/// Get the spinner style for directory building
fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⣾⣽⣻⢿⡿⣟⣯⣷")
}

/// Get the progress bar style for the notes batch
fn batch_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {spinner:.green} [{bar:40.cyan/dim}] {pos}/{len} ({percent}%) {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("━━╾─")
}

// ============================================================================
// Console output helpers
// ============================================================================

/// Print a header section with a box
pub fn print_header(title: &str) {
    let width = 68;
    let title_padded = format!("{:^width$}", title, width = width - 4);
    println!();
    println!("╔{}╗", "═".repeat(width - 2));
    println!("║{}║", title_padded);
    println!("╚{}╝", "═".repeat(width - 2));
    println!();
}

/// Print a success message with checkmark
pub fn print_success(msg: &str) {
    println!("  ✓ {}", msg);
}

/// Print an info message with bullet
pub fn print_info(msg: &str) {
    println!("  • {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("  ⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    println!("  ✗ {}", msg);
}

/// Print a key/value line aligned for summaries
pub fn print_field(label: &str, value: &str) {
    println!("  {:<18} {}", format!("{}:", label), value);
}

// ============================================================================
// Progress
// ============================================================================

/// Spinner shown while the directory is being built
pub fn directory_spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

/// Progress bar for the notes batch
pub struct BatchProgressBar {
    bar: ProgressBar,
}

impl BatchProgressBar {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(batch_style());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }

    /// A handle that can be moved into a progress callback
    pub fn handle(&self) -> ProgressBar {
        self.bar.clone()
    }

    /// Show the serial being processed and advance to `index` (1-based)
    pub fn update(bar: &ProgressBar, index: usize, serial: &str) {
        bar.set_position(index.saturating_sub(1) as u64);
        bar.set_message(serial.to_string());
    }

    pub fn finish(&self, message: &str) {
        self.bar.set_position(self.bar.length().unwrap_or(0));
        self.bar.finish_with_message(message.to_string());
    }

    pub fn abandon(&self, message: &str) {
        self.bar.abandon_with_message(message.to_string());
    }
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 3600 {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        format!("{}h {}m", hours, mins)
    } else if secs >= 60 {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    } else {
        format!("{:.1}s", duration.as_secs_f64())
    }
}

// ============================================================================
// Dual writer for file + console logging
// ============================================================================

/// A writer that writes to both console and file
///
/// Used for logging to both stderr and a log file simultaneously.
pub struct DualWriter {
    pub console: std::io::Stderr,
    pub file: std::fs::File,
}

impl Write for DualWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let _ = self.console.write(buf);
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        let _ = self.console.flush();
        self.file.flush()
    }
}
