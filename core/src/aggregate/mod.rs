//! Resolves pass/fail/pending/total counts and a verdict from whichever data
//! sources a test-execution result carries.
//!
//! Precedence, first match wins:
//! 1. skipped run: counts unknown, verdict indeterminate
//! 2. non-empty structured `tests[]` (summary counters are ignored)
//! 3. structured summary counters, total derived from the others when absent
//! 4. textual stdout parse, only if it recognized at least one test line
//! 5. everything unknown

use serde::Serialize;

use crate::results::{TestExecutionResult, TestResultFile, TestState};
use crate::testoutput::parse_test_output;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CountSource {
    Skipped,
    StructuredTests,
    StructuredSummary,
    TextOutput,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedCounts {
    pub passed: Option<u64>,
    pub failed: Option<u64>,
    pub pending: Option<u64>,
    pub total: Option<u64>,
    pub source: CountSource,
}

impl ResolvedCounts {
    fn unknown(source: CountSource) -> Self {
        Self {
            passed: None,
            failed: None,
            pending: None,
            total: None,
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Success,
    Failure,
    Indeterminate,
}

impl Verdict {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResultSummary {
    pub counts: ResolvedCounts,
    pub verdict: Verdict,
}

fn from_tests(file: &TestResultFile) -> Option<ResolvedCounts> {
    let tests = file.tests.as_ref().filter(|t| !t.is_empty())?;
    let count = |state: TestState| tests.iter().filter(|t| t.state == state).count() as u64;
    Some(ResolvedCounts {
        passed: Some(count(TestState::Passed)),
        failed: Some(count(TestState::Failed)),
        pending: Some(count(TestState::Pending)),
        total: Some(tests.len() as u64),
        source: CountSource::StructuredTests,
    })
}

fn from_summary(file: &TestResultFile) -> Option<ResolvedCounts> {
    if !file.has_counters() {
        return None;
    }
    let derived_total = || {
        let parts = [file.passes, file.failures, file.pending];
        parts
            .iter()
            .any(Option::is_some)
            .then(|| parts.iter().flatten().fold(0u64, |acc, n| acc.saturating_add(*n)))
    };
    Some(ResolvedCounts {
        passed: file.passes,
        failed: file.failures,
        pending: file.pending,
        total: file.total.or_else(derived_total),
        source: CountSource::StructuredSummary,
    })
}

pub fn resolve_counts(result: &TestExecutionResult) -> ResolvedCounts {
    if result.skipped {
        return ResolvedCounts::unknown(CountSource::Skipped);
    }

    if let Some(file) = result.test_result.as_ref() {
        if let Some(counts) = from_tests(file).or_else(|| from_summary(file)) {
            return counts;
        }
    }

    let text = parse_test_output(&result.stdout);
    if text.parsed {
        return ResolvedCounts {
            passed: Some(text.passed),
            failed: Some(text.failed),
            pending: None,
            total: Some(text.total()),
            source: CountSource::TextOutput,
        };
    }

    ResolvedCounts::unknown(CountSource::Unknown)
}

/// Fail-closed verdict.
///
/// A known failure count decides on its own. Without one, only an exit code
/// of exactly 0 counts as success; a nonzero or null exit code is failure.
pub fn resolve_verdict(result: &TestExecutionResult, counts: &ResolvedCounts) -> Verdict {
    if result.skipped {
        return Verdict::Indeterminate;
    }
    match counts.failed {
        Some(0) => Verdict::Success,
        Some(_) => Verdict::Failure,
        None if result.exit_code == Some(0) && result.error_message.is_none() => Verdict::Success,
        None => Verdict::Failure,
    }
}

pub fn summarize(result: &TestExecutionResult) -> ResultSummary {
    let counts = resolve_counts(result);
    let verdict = resolve_verdict(result, &counts);
    ResultSummary { counts, verdict }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::TestCaseRecord;
    use pretty_assertions::assert_eq;

    fn case(state: TestState) -> TestCaseRecord {
        TestCaseRecord {
            suite: "s".into(),
            title: "t".into(),
            full_title: "s t".into(),
            state,
            duration_ms: None,
        }
    }

    fn with_file(exit_code: Option<i32>, file: TestResultFile) -> TestExecutionResult {
        TestExecutionResult {
            command: "npm test".into(),
            exit_code,
            test_result: Some(file),
            ..TestExecutionResult::default()
        }
    }

    #[test]
    fn skipped_is_indeterminate() {
        let r = TestExecutionResult::skipped("", "/w", "blank command");
        let s = summarize(&r);
        assert_eq!(s.verdict, Verdict::Indeterminate);
        assert_eq!(s.counts.source, CountSource::Skipped);
        assert_eq!(s.counts.failed, None);
    }

    #[test]
    fn per_test_list_overrides_summary_counters() {
        let tests = vec![
            case(TestState::Passed),
            case(TestState::Failed),
            case(TestState::Pending),
            case(TestState::Unknown),
        ];
        let base = TestResultFile {
            tests: Some(tests),
            ..TestResultFile::default()
        };
        let expected = summarize(&with_file(Some(1), base.clone())).counts;
        assert_eq!(expected.passed, Some(1));
        assert_eq!(expected.failed, Some(1));
        assert_eq!(expected.pending, Some(1));
        assert_eq!(expected.total, Some(4));

        for (failures, passes, pending, total) in [(0, 0, 0, 0), (9, 9, 9, 27), (3, 100, 7, 1)] {
            let noisy = TestResultFile {
                failures: Some(failures),
                passes: Some(passes),
                pending: Some(pending),
                total: Some(total),
                ..base.clone()
            };
            assert_eq!(summarize(&with_file(Some(1), noisy)).counts, expected);
        }
    }

    #[test]
    fn summary_counters_derive_total() {
        let file = TestResultFile {
            passes: Some(4),
            failures: Some(1),
            ..TestResultFile::default()
        };
        let s = summarize(&with_file(Some(1), file));
        assert_eq!(s.counts.total, Some(5));
        assert_eq!(s.counts.pending, None);
        assert_eq!(s.counts.source, CountSource::StructuredSummary);
        assert_eq!(s.verdict, Verdict::Failure);
    }

    #[test]
    fn huge_counters_saturate_the_derived_total() {
        let file = crate::extract::parse_test_result_file(r#"{"passes": 1e19, "failures": 1e19}"#)
            .expect("result file parses");
        let s = summarize(&with_file(Some(1), file));
        assert_eq!(s.counts.total, Some(u64::MAX));
        assert_eq!(s.verdict, Verdict::Failure);
    }

    #[test]
    fn text_failures_after_an_earlier_run_fail_the_verdict() {
        let r = TestExecutionResult {
            exit_code: Some(1),
            stdout: "  Unit\n    ✔ a\n\n  1 passing (2ms)\n\n  Integration\n    1) b fails\n\n  0 passing (1ms)\n  1 failing\n\n  1) Integration\n       b fails:\n     Error: boom\n".into(),
            ..TestExecutionResult::default()
        };
        let s = summarize(&r);
        assert_eq!(s.counts.failed, Some(1));
        assert_eq!(s.verdict, Verdict::Failure);
    }

    #[test]
    fn null_exit_with_zero_failures_is_success() {
        let file = TestResultFile {
            failures: Some(0),
            total: Some(1),
            ..TestResultFile::default()
        };
        let s = summarize(&with_file(None, file));
        assert_eq!(s.verdict, Verdict::Success);
        assert_eq!(s.counts.total, Some(1));
    }

    #[test]
    fn unknown_failures_fail_closed() {
        for exit_code in [None, Some(1), Some(-1)] {
            let r = TestExecutionResult {
                exit_code,
                stdout: "nothing recognizable".into(),
                ..TestExecutionResult::default()
            };
            let s = summarize(&r);
            assert_eq!(s.counts.source, CountSource::Unknown);
            assert_eq!(s.verdict, Verdict::Failure, "exit {exit_code:?}");
        }
    }

    #[test]
    fn zero_exit_without_counts_is_success() {
        let r = TestExecutionResult {
            exit_code: Some(0),
            ..TestExecutionResult::default()
        };
        assert_eq!(summarize(&r).verdict, Verdict::Success);
    }

    #[test]
    fn text_output_used_when_no_structured_data() {
        let r = TestExecutionResult {
            exit_code: Some(1),
            stdout: "  ✔ a\n  ✖ b".into(),
            test_result: Some(TestResultFile::default()),
            ..TestExecutionResult::default()
        };
        let s = summarize(&r);
        assert_eq!(s.counts.source, CountSource::TextOutput);
        assert_eq!(s.counts.passed, Some(1));
        assert_eq!(s.counts.failed, Some(1));
        assert_eq!(s.counts.total, Some(2));
        assert_eq!(s.verdict, Verdict::Failure);
    }

    #[test]
    fn empty_tests_list_falls_through_to_summary() {
        let file = TestResultFile {
            tests: Some(vec![]),
            passes: Some(2),
            ..TestResultFile::default()
        };
        let s = summarize(&with_file(Some(0), file));
        assert_eq!(s.counts.source, CountSource::StructuredSummary);
        assert_eq!(s.counts.total, Some(2));
    }
}
