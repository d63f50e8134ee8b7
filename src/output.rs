//! Terminal output for one-shot runs.
//!
//! The daemon reports through `tracing`; `--once` and `--dry-run` additionally
//! print a colored summary here.

use crate::watcher::{PlannedMove, ScanReport};
use colored::*;
use std::collections::BTreeMap;

/// Manages CLI output with consistent styling.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {message}").yellow());
    }

    /// Prints the outcome of a single scan.
    pub fn scan_summary(report: &ScanReport) {
        let counts: BTreeMap<String, usize> = report
            .moved
            .iter()
            .map(|(category, count)| (category.to_string(), *count))
            .collect();
        Self::summary_table(&counts, report.total_moved());

        if report.failed.is_empty() {
            Self::success("Scan complete.");
        } else {
            Self::header("FAILED");
            for (name, reason) in &report.failed {
                Self::error(&format!("{name}: {reason}"));
            }
        }
    }

    /// Prints where each file would go.
    pub fn plan(moves: &[PlannedMove]) {
        if moves.is_empty() {
            Self::dry_run_notice("No files to sort.");
            return;
        }

        Self::dry_run_notice("Files would be sorted as follows:");
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for planned in moves {
            println!(
                " - {} {} {}",
                planned.name,
                "→".cyan(),
                planned.destination.display()
            );
            *counts.entry(planned.category.to_string()).or_insert(0) += 1;
        }
        Self::summary_table(&counts, moves.len());
        Self::success("Dry run complete. No files were modified.");
    }

    /// Prints a table of file counts by category.
    fn summary_table(category_counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let width = category_counts
            .keys()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max(8); // at least "Category"

        println!(
            "{:<width$} | {}",
            "Category".bold(),
            "Files".bold(),
            width = width
        );
        println!("{}", "-".repeat(width + 10));

        for (category, count) in category_counts {
            println!(
                "{:<width$} | {} {}",
                category,
                count.to_string().green(),
                plural(*count),
                width = width
            );
        }

        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {} {}",
            "Total".bold(),
            total_files.to_string().green().bold(),
            plural(total_files),
            width = width
        );
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plural() {
        assert_eq!(plural(0), "files");
        assert_eq!(plural(1), "file");
        assert_eq!(plural(2), "files");
    }
}
