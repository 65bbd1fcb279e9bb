// Output formatting and styling

use colored::Colorize;
use qtscaffold_generation::{EntryOutcome, ScaffoldReport};

/// Output styling configuration
pub struct OutputStyle {
    pub use_colors: bool,
}

impl Default for OutputStyle {
    fn default() -> Self {
        Self {
            use_colors: atty::is(atty::Stream::Stdout),
        }
    }
}

impl OutputStyle {
    /// Format success message
    pub fn success(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "✓".green().bold(), msg)
        } else {
            format!("✓ {}", msg)
        }
    }

    /// Format error message
    pub fn error(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "✗".red().bold(), msg)
        } else {
            format!("✗ {}", msg)
        }
    }

    /// Format warning message
    pub fn warning(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "⚠".yellow(), msg)
        } else {
            format!("⚠ {}", msg)
        }
    }

    /// Format info message
    pub fn info(&self, msg: &str) -> String {
        if self.use_colors {
            format!("{} {}", "ℹ".blue(), msg)
        } else {
            format!("ℹ {}", msg)
        }
    }

    /// Format header
    pub fn header(&self, title: &str) -> String {
        if self.use_colors {
            title.bold().to_string()
        } else {
            title.to_string()
        }
    }

    /// Format a key-value pair
    pub fn key_value(&self, key: &str, value: &str) -> String {
        if self.use_colors {
            format!("  {}: {}", key.bold(), value)
        } else {
            format!("  {}: {}", key, value)
        }
    }

    /// One report line per entry: `ok    <path>` or `error <output>: <detail>`
    pub fn entry_line(&self, outcome: &EntryOutcome) -> String {
        match &outcome.result {
            Ok(file) => {
                let tag = if self.use_colors {
                    "ok   ".green().to_string()
                } else {
                    "ok   ".to_string()
                };
                format!("{} {}", tag, file.path.display())
            }
            Err(err) => {
                let tag = if self.use_colors {
                    "error".red().bold().to_string()
                } else {
                    "error".to_string()
                };
                format!("{} {}: {}", tag, outcome.output_path.display(), err)
            }
        }
    }

    /// Full report, one line per entry plus a summary
    pub fn report(&self, report: &ScaffoldReport) -> String {
        let mut lines: Vec<String> = report
            .outcomes
            .iter()
            .map(|outcome| self.entry_line(outcome))
            .collect();

        let failed = report.failures().len();
        let total = report.outcomes.len();
        let verb = if report.dry_run { "would write" } else { "wrote" };
        let summary = format!(
            "{} {} of {} files under {}",
            verb,
            total - failed,
            total,
            report.target_dir.display()
        );
        lines.push(if failed == 0 {
            self.success(&summary)
        } else {
            self.warning(&summary)
        });

        lines.join("\n")
    }
}

/// Print formatted output
pub fn print_success(msg: &str) {
    let style = OutputStyle::default();
    println!("{}", style.success(msg));
}

pub fn print_error(msg: &str) {
    let style = OutputStyle::default();
    eprintln!("{}", style.error(msg));
}

pub fn print_warning(msg: &str) {
    let style = OutputStyle::default();
    println!("{}", style.warning(msg));
}

pub fn print_report(report: &ScaffoldReport) {
    let style = OutputStyle::default();
    println!("{}", style.report(report));
}

#[cfg(test)]
mod tests {
    use super::*;
    use qtscaffold_generation::{MemoryTemplates, ScaffoldEntry, Scaffolder, TemplateContext};
    use tempfile::TempDir;

    #[test]
    fn test_output_style_without_colors() {
        let style = OutputStyle { use_colors: false };
        assert_eq!(style.success("test"), "✓ test");
        assert_eq!(style.error("test"), "✗ test");
        assert_eq!(style.warning("test"), "⚠ test");
        assert_eq!(style.info("test"), "ℹ test");
        assert_eq!(style.key_value("preset", "cpp/class"), "  preset: cpp/class");
    }

    #[test]
    fn test_report_lines() {
        let temp_dir = TempDir::new().unwrap();
        let source = MemoryTemplates::new().with_template("a.txt", "{{ .who }}");
        let entries = [
            ScaffoldEntry::new("a.txt", "a.txt", TemplateContext::new().with("who", "x")),
            ScaffoldEntry::new("a.txt", "../b.txt", TemplateContext::new()),
        ];
        let report = Scaffolder::new(source).scaffold(temp_dir.path(), &entries);

        let style = OutputStyle { use_colors: false };
        let text = style.report(&report);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            format!("ok    {}", temp_dir.path().join("a.txt").display())
        );
        assert!(lines[1].starts_with("error ../b.txt: output path escapes"));
        assert!(lines[2].starts_with("⚠ wrote 1 of 2 files"));
    }
}
