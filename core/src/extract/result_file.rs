//! Structured test-result file written by the test run.

use serde_json::{Map, Value};

use crate::error::{ExtractError, ExtractionResult};
use crate::results::{FailedTestRecord, TestCaseRecord, TestResultFile, TestState};

use super::coerce::{opt_count, opt_display, opt_duration, opt_string, string_or_empty};
use super::json::extract_json_value;

fn records<T>(
    obj: &Map<String, Value>,
    key: &str,
    build: impl Fn(&Map<String, Value>) -> T,
) -> Option<Vec<T>> {
    match obj.get(key)? {
        Value::Array(items) => Some(items.iter().filter_map(Value::as_object).map(build).collect()),
        Value::Null => None,
        _ => {
            tracing::debug!(field = key, "result file field is not an array; ignored");
            None
        }
    }
}

fn test_case(c: &Map<String, Value>) -> TestCaseRecord {
    TestCaseRecord {
        suite: string_or_empty(c, "suite"),
        title: string_or_empty(c, "title"),
        full_title: string_or_empty(c, "fullTitle"),
        state: TestState::from_loose(&string_or_empty(c, "state")),
        duration_ms: opt_duration(c, "durationMs"),
    }
}

fn failed_test(c: &Map<String, Value>) -> FailedTestRecord {
    FailedTestRecord {
        title: string_or_empty(c, "title"),
        full_title: string_or_empty(c, "fullTitle"),
        error: string_or_empty(c, "error"),
        stack: opt_string(c, "stack"),
        code: opt_display(c, "code"),
        expected: opt_display(c, "expected"),
        actual: opt_display(c, "actual"),
    }
}

/// Parses a result file with the same tolerance as agent payloads. Only the
/// top-level shape is mandatory.
pub fn parse_test_result_file(text: &str) -> ExtractionResult<TestResultFile> {
    let Value::Object(obj) = extract_json_value(text)? else {
        return Err(ExtractError::JsonNotObject);
    };

    Ok(TestResultFile {
        platform: opt_string(&obj, "platform"),
        arch: opt_string(&obj, "arch"),
        node_version: opt_string(&obj, "nodeVersion"),
        host_version: opt_string(&obj, "hostVersion")
            .or_else(|| opt_string(&obj, "vscodeVersion")),
        failures: opt_count(&obj, "failures"),
        passes: opt_count(&obj, "passes"),
        pending: opt_count(&obj, "pending"),
        total: opt_count(&obj, "total"),
        duration_ms: opt_duration(&obj, "durationMs"),
        tests: records(&obj, "tests", test_case),
        failed_tests: records(&obj, "failedTests", failed_test),
    })
}
