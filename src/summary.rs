// src/summary.rs
//! End-of-run report, accumulated by the batch loop

use std::fmt::Write;
use std::path::Path;

const BANNER_WIDTH: usize = 86;

#[derive(Debug, Default)]
pub struct RunReport {
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
    pub success: Vec<String>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&mut self, folder: &str, reason: impl std::fmt::Display) {
        self.failed.push(format!("{}: {}", folder, reason));
    }

    pub fn skip(&mut self, folder: &str) {
        self.skipped.push(folder.to_string());
    }

    /// `<input>/ --> <root>/<author>/<title>/`
    pub fn succeed(&mut self, folder: &str, destination: &Path) {
        let tail: Vec<String> = destination
            .components()
            .rev()
            .take(3)
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect();
        let tail: Vec<&str> = tail.iter().rev().map(String::as_str).collect();
        self.success.push(format!("{}/ --> {}/", folder, tail.join("/")));
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    /// Nonzero only when something failed; skips are fine
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() {
            1
        } else {
            0
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();

        section(&mut out, "FAILURES", "Failed", &self.failed);
        section(&mut out, "SKIPPED", "Skipped", &self.skipped);
        section(&mut out, "SUCCESS", "Success", &self.success);

        if self.has_failures() {
            let _ = writeln!(out, "\n{}", banner("WARNING"));
            let _ = writeln!(out, "\nSome books did not get processed successfully...");
        } else {
            let _ = writeln!(out, "\n{}", banner("COMPLETE"));
            let _ = writeln!(out, "\nAll queued books were processed.");
        }
        out
    }
}

fn section(out: &mut String, title: &str, label: &str, lines: &[String]) {
    if lines.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n{}", banner(title));
    for line in lines {
        let _ = writeln!(out, "{}: {}", label, line);
    }
}

fn banner(title: &str) -> String {
    format!("{:=^width$}", format!(" {} ", title), width = BANNER_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_ignores_skips() {
        let mut report = RunReport::new();
        report.skip("Foundation");
        assert_eq!(report.exit_code(), 0);

        report.fail("Dune", "Status code = 404");
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn test_success_line() {
        let mut report = RunReport::new();
        report.succeed("Dune", Path::new("/downloads/_organized_/Frank Herbert/Dune"));
        assert_eq!(report.success, vec!["Dune/ --> _organized_/Frank Herbert/Dune/".to_string()]);
    }

    #[test]
    fn test_render_sections() {
        let mut report = RunReport::new();
        report.fail("Dune", "Status code = 404");
        report.succeed("Emma", Path::new("/lib/Jane Austen/Emma"));

        let text = report.render();

        assert!(text.contains(" FAILURES "));
        assert!(text.contains("Failed: Dune: Status code = 404"));
        assert!(!text.contains(" SKIPPED "));
        assert!(text.contains("Success: Emma/ --> lib/Jane Austen/Emma/"));
        assert!(text.contains(" WARNING "));
        assert!(!text.contains(" COMPLETE "));
    }
}
