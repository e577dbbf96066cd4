//! Markdown bodies for the two report kinds.

use chrono::{DateTime, Local};

use crate::aggregate::{summarize, ResultSummary, Verdict};
use crate::results::{TestExecutionResult, TestResultFile};
use crate::util::fence_for;

/// Internal marker pair around a persisted perspective table. The cleanup
/// sweep only deletes workspace-root files that carry both.
pub const PERSPECTIVE_TABLE_BEGIN: &str = "<!-- testgen:perspective-table:begin -->";
pub const PERSPECTIVE_TABLE_END: &str = "<!-- testgen:perspective-table:end -->";

#[derive(Debug, Clone)]
pub struct PerspectiveReportInput<'a> {
    pub label: &'a str,
    pub targets: &'a [String],
    pub generated_at: DateTime<Local>,
    /// `Ok(case count)` or `Err(error code)`.
    pub status: Result<usize, String>,
    /// Rendered table (or error table with raw log).
    pub table_markdown: &'a str,
}

pub fn render_perspective_report(input: &PerspectiveReportInput<'_>) -> String {
    let mut out = String::new();
    out.push_str("# Test Perspectives\n\n");
    out.push_str(&format!(
        "- Generated: {}\n",
        input.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("- Task: {}\n", input.label));
    if !input.targets.is_empty() {
        out.push_str(&format!("- Targets: {}\n", input.targets.join(", ")));
    }
    match &input.status {
        Ok(n) => out.push_str(&format!("- Cases: {n}\n")),
        Err(code) => out.push_str(&format!("- Status: extraction failed ({code})\n")),
    }
    out.push('\n');
    out.push_str(PERSPECTIVE_TABLE_BEGIN);
    out.push('\n');
    out.push_str(input.table_markdown.trim_end());
    out.push('\n');
    out.push_str(PERSPECTIVE_TABLE_END);
    out.push('\n');
    out
}

#[derive(Debug, Clone)]
pub struct ExecutionReportInput<'a> {
    pub label: &'a str,
    pub runner: &'a str,
    /// Set when an agent-mediated result was rejected and re-run locally.
    pub fallback_reason: Option<&'a str>,
    pub generated_at: DateTime<Local>,
    pub result: &'a TestExecutionResult,
}

fn count_cell(v: Option<u64>) -> String {
    v.map(|n| n.to_string()).unwrap_or_else(|| "-".to_string())
}

fn verdict_cell(v: Verdict) -> &'static str {
    match v {
        Verdict::Success => "✅ success",
        Verdict::Failure => "❌ failure",
        Verdict::Indeterminate => "⏭️ skipped",
    }
}

fn push_fenced(out: &mut String, lang: &str, body: &str) {
    let fence = fence_for(body);
    out.push_str(&fence);
    out.push_str(lang);
    out.push('\n');
    out.push_str(body.trim_end());
    out.push('\n');
    out.push_str(&fence);
    out.push_str("\n\n");
}

fn table_cell(s: &str) -> String {
    s.replace(['\r', '\n'], " ").replace('|', "\\|")
}

fn push_environment(out: &mut String, file: &TestResultFile) {
    let fields = [
        ("Platform", &file.platform),
        ("Arch", &file.arch),
        ("Node", &file.node_version),
        ("Host", &file.host_version),
    ];
    if fields.iter().all(|(_, v)| v.is_none()) {
        return;
    }
    out.push_str("## Environment\n\n");
    for (name, value) in fields {
        if let Some(v) = value {
            out.push_str(&format!("- {name}: {v}\n"));
        }
    }
    out.push('\n');
}

fn push_failed_tests(out: &mut String, file: &TestResultFile) {
    let Some(failed) = file.failed_tests.as_ref().filter(|f| !f.is_empty()) else {
        return;
    };
    out.push_str("## Failed Tests\n\n");
    for (i, f) in failed.iter().enumerate() {
        let title = if f.full_title.is_empty() {
            &f.title
        } else {
            &f.full_title
        };
        out.push_str(&format!("### {}. {}\n\n", i + 1, title));
        if let Some(code) = &f.code {
            out.push_str(&format!("- Code: {code}\n"));
        }
        if !f.error.is_empty() {
            out.push_str(&format!("- Error: {}\n", f.error.replace('\n', " ")));
        }
        out.push('\n');
        if let (Some(expected), Some(actual)) = (&f.expected, &f.actual) {
            out.push_str("Expected:\n\n");
            push_fenced(out, "text", expected);
            out.push_str("Actual:\n\n");
            push_fenced(out, "text", actual);
        }
        if let Some(stack) = &f.stack {
            push_fenced(out, "text", stack);
        }
    }
}

fn push_test_table(out: &mut String, file: &TestResultFile) {
    let Some(tests) = file.tests.as_ref().filter(|t| !t.is_empty()) else {
        return;
    };
    out.push_str("## Tests\n\n");
    out.push_str("| Suite | Title | State | Duration (ms) |\n");
    out.push_str("|-------|-------|-------|---------------|\n");
    for t in tests {
        out.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            table_cell(&t.suite),
            table_cell(&t.title),
            t.state.as_str(),
            t.duration_ms
                .map(|d| format!("{d:.0}"))
                .unwrap_or_else(|| "-".to_string()),
        ));
    }
    out.push('\n');
}

pub fn render_execution_report(input: &ExecutionReportInput<'_>) -> String {
    let r = input.result;
    let ResultSummary { counts, verdict } = summarize(r);

    let mut out = String::new();
    out.push_str("# Test Execution Report\n\n");
    out.push_str(&format!(
        "- Generated: {}\n",
        input.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    out.push_str(&format!("- Task: {}\n", input.label));
    out.push_str(&format!("- Command: `{}`\n", r.command));
    out.push_str(&format!("- Cwd: {}\n", r.cwd));
    match input.fallback_reason {
        Some(reason) => out.push_str(&format!(
            "- Runner: {} (agent result rejected: {})\n",
            input.runner, reason
        )),
        None => out.push_str(&format!("- Runner: {}\n", input.runner)),
    }
    out.push_str(&format!(
        "- Exit code: {}\n",
        r.exit_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "null".to_string())
    ));
    if let Some(sig) = &r.signal {
        out.push_str(&format!("- Signal: {sig}\n"));
    }
    out.push_str(&format!("- Duration: {} ms\n", r.duration_ms));
    if r.skipped {
        out.push_str(&format!(
            "- Skipped: {}\n",
            r.skip_reason.as_deref().unwrap_or("yes")
        ));
    }
    if let Some(err) = &r.error_message {
        out.push_str(&format!("- Error: {}\n", err.replace('\n', " ")));
    }
    out.push('\n');

    out.push_str("## Summary\n\n");
    out.push_str("| Passed | Failed | Pending | Total | Result |\n");
    out.push_str("|--------|--------|---------|-------|--------|\n");
    out.push_str(&format!(
        "| {} | {} | {} | {} | {} |\n\n",
        count_cell(counts.passed),
        count_cell(counts.failed),
        count_cell(counts.pending),
        count_cell(counts.total),
        verdict_cell(verdict),
    ));

    if let Some(file) = &r.test_result {
        push_environment(&mut out, file);
        push_failed_tests(&mut out, file);
        push_test_table(&mut out, file);
    }

    if !r.skipped {
        out.push_str("## Stdout\n\n");
        push_fenced(&mut out, "text", &r.stdout);
        out.push_str("## Stderr\n\n");
        push_fenced(&mut out, "text", &r.stderr);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{FailedTestRecord, TestCaseRecord, TestState};

    fn now() -> DateTime<Local> {
        Local::now()
    }

    #[test]
    fn perspective_report_wraps_table_in_markers() {
        let targets = vec!["src/calc.ts".to_string()];
        let md = render_perspective_report(&PerspectiveReportInput {
            label: "generate calc",
            targets: &targets,
            generated_at: now(),
            status: Ok(0),
            table_markdown: "| h |\n|---|\n",
        });
        let begin = md.find(PERSPECTIVE_TABLE_BEGIN).unwrap();
        let end = md.find(PERSPECTIVE_TABLE_END).unwrap();
        assert!(begin < end);
        assert!(md[begin..end].contains("| h |"));
        assert!(md.contains("- Targets: src/calc.ts"));
        assert!(md.contains("- Cases: 0"));
    }

    #[test]
    fn skipped_report_shows_reason_and_no_output_blocks() {
        let r = TestExecutionResult::skipped("", "/w", "test command is empty");
        let md = render_execution_report(&ExecutionReportInput {
            label: "x",
            runner: "local",
            fallback_reason: None,
            generated_at: now(),
            result: &r,
        });
        assert!(md.contains("- Skipped: test command is empty"));
        assert!(md.contains("| - | - | - | - | ⏭️ skipped |"));
        assert!(!md.contains("## Stdout"));
        assert!(md.contains("- Exit code: null"));
    }

    #[test]
    fn execution_report_lists_failures_and_fallback() {
        let r = TestExecutionResult {
            command: "npm test".into(),
            cwd: "/w".into(),
            exit_code: Some(1),
            duration_ms: 42,
            stdout: "out with ``` fence".into(),
            stderr: String::new(),
            test_result: Some(TestResultFile {
                platform: Some("linux".into()),
                tests: Some(vec![TestCaseRecord {
                    suite: "calc".into(),
                    title: "a|b".into(),
                    full_title: "calc a|b".into(),
                    state: TestState::Failed,
                    duration_ms: Some(4.0),
                }]),
                failed_tests: Some(vec![FailedTestRecord {
                    title: "a|b".into(),
                    full_title: "calc a|b".into(),
                    error: "expected 1 to equal 2".into(),
                    stack: Some("at calc.test.ts:3".into()),
                    code: None,
                    expected: Some("2".into()),
                    actual: Some("1".into()),
                }]),
                ..TestResultFile::default()
            }),
            ..TestExecutionResult::default()
        };
        let md = render_execution_report(&ExecutionReportInput {
            label: "x",
            runner: "local",
            fallback_reason: Some("empty result"),
            generated_at: now(),
            result: &r,
        });
        assert!(md.contains("- Runner: local (agent result rejected: empty result)"));
        assert!(md.contains("| 0 | 1 | 0 | 1 | ❌ failure |"));
        assert!(md.contains("### 1. calc a|b"));
        assert!(md.contains("| calc | a\\|b | failed | 4 |"));
        assert!(md.contains("- Platform: linux"));
        assert!(md.contains("````text\nout with ``` fence\n````"));
    }
}
