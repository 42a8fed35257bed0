//! Output sinks for progress and issue reports
//!
//! The console sink prints colored, human-readable lines. The TeamCity sink
//! prints service messages so a CI build picks up progress and failures.

use std::io::{self, Write};
use std::sync::Mutex;

use cfgsync_content::Issue;
use colored::Colorize;

/// Where a command reports its progress and findings.
pub trait Output {
    fn log_info(&self, text: &str);

    fn log_errors(&self, issues: &[Issue]);

    /// Report a failure that ends the command.
    fn log_failure(&self, text: &str);
}

struct Sink(Mutex<Box<dyn Write + Send>>);

impl Sink {
    fn new(out: impl Write + Send + 'static) -> Self {
        Self(Mutex::new(Box::new(out)))
    }

    fn line(&self, text: &str) {
        let mut out = match self.0.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Write errors (closed stdout) are ignored
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }
}

/// Human-readable console output.
pub struct ConsoleOutput {
    sink: Sink,
}

impl ConsoleOutput {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            sink: Sink::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl Output for ConsoleOutput {
    fn log_info(&self, text: &str) {
        self.sink.line(&format!("{} {text}", "=>".blue().bold()));
    }

    fn log_errors(&self, issues: &[Issue]) {
        let noun = if issues.len() == 1 { "issue" } else { "issues" };
        self.sink.line(&format!(
            "{} {} {noun} detected:",
            "ISSUES".red().bold(),
            issues.len()
        ));
        for issue in issues {
            self.sink.line(&format!("   {} {issue}", "!".red()));
            if let Some(detail) = &issue.detail {
                for line in detail.lines() {
                    self.sink.line(&format!("       {}", line.dimmed()));
                }
            }
        }
    }

    fn log_failure(&self, text: &str) {
        self.sink.line(&format!("{}: {text}", "error".red().bold()));
    }
}

/// TeamCity service-message output.
pub struct TeamCityOutput {
    sink: Sink,
}

impl TeamCityOutput {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            sink: Sink::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl Output for TeamCityOutput {
    fn log_info(&self, text: &str) {
        self.sink
            .line(&format!("##teamcity[progressMessage '{}']", escape_value(text)));
    }

    fn log_errors(&self, issues: &[Issue]) {
        for issue in issues {
            let details = issue.detail.as_deref().unwrap_or_default();
            self.sink.line(&format!(
                "##teamcity[message text='{}' errorDetails='{}' status='ERROR']",
                escape_value(&issue.to_string()),
                escape_value(details)
            ));
        }
        self.sink.line(&format!(
            "##teamcity[buildProblem description='{}' identity='cfgsync-issues']",
            escape_value(&format!("{} repository issues detected", issues.len()))
        ));
    }

    fn log_failure(&self, text: &str) {
        self.sink
            .line(&format!("##teamcity[buildProblem description='{}']", escape_value(text)));
    }
}

/// Escape a value for use inside a TeamCity service message.
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '|' => out.push_str("||"),
            '\'' => out.push_str("|'"),
            '\n' => out.push_str("|n"),
            '\r' => out.push_str("|r"),
            '[' => out.push_str("|["),
            ']' => out.push_str("|]"),
            '\u{0085}' => out.push_str("|x"),
            '\u{2028}' => out.push_str("|l"),
            '\u{2029}' => out.push_str("|p"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use cfgsync_content::IssueKind;

    /// Writer sharing its buffer with the test.
    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Buffer {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn issues() -> Vec<Issue> {
        vec![
            Issue::new("cms.role/@main/admin.toml", IssueKind::Changed)
                .with_detail("-a = 1\n+a = 2"),
            Issue::new("cms.user/bob.toml", IssueKind::Added),
        ]
    }

    #[test]
    fn escape_value_handles_special_characters() {
        assert_eq!(escape_value("it's [x]|y\n"), "it|'s |[x|]||y|n");
        assert_eq!(escape_value("plain"), "plain");
    }

    #[test]
    fn teamcity_reports_each_issue_and_a_build_problem() {
        let buffer = Buffer::default();
        let output = TeamCityOutput::new(buffer.clone());
        output.log_info("Comparing repositories");
        output.log_errors(&issues());

        let text = buffer.text();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "##teamcity[progressMessage 'Comparing repositories']");
        assert_eq!(
            lines[1],
            "##teamcity[message text='cms.role/@main/admin.toml: Changed' errorDetails='-a = 1|n+a = 2' status='ERROR']"
        );
        assert_eq!(
            lines[2],
            "##teamcity[message text='cms.user/bob.toml: Added' errorDetails='' status='ERROR']"
        );
        assert_eq!(
            lines[3],
            "##teamcity[buildProblem description='2 repository issues detected' identity='cfgsync-issues']"
        );
    }

    #[test]
    fn console_lists_issues_with_details() {
        colored::control::set_override(false);
        let buffer = Buffer::default();
        let output = ConsoleOutput::new(buffer.clone());
        output.log_errors(&issues());
        output.log_failure("Store failed");

        let text = buffer.text();
        assert!(text.contains("ISSUES 2 issues detected:"), "{text}");
        assert!(text.contains("   ! cms.role/@main/admin.toml: Changed"), "{text}");
        assert!(text.contains("       +a = 2"), "{text}");
        assert!(text.contains("   ! cms.user/bob.toml: Added"), "{text}");
        assert!(text.ends_with("error: Store failed\n"), "{text}");
    }
}
