//! Perspective JSON v1 and its markdown table rendering.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ExtractError, ExtractionResult};
use crate::util::fence_for;

use super::coerce::string_or_empty;
use super::json::extract_versioned_object;

pub const PERSPECTIVE_JSON_VERSION: u64 = 1;

pub const TABLE_HEADER: &str =
    "| Case ID | Input / Precondition | Perspective (Equivalence / Boundary) | Expected Result | Notes |";
pub const TABLE_SEPARATOR: &str = "|--------|----------------------|---------------------------------------|-----------------|-------|";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerspectiveCase {
    pub case_id: String,
    pub input_precondition: String,
    pub perspective: String,
    pub expected_result: String,
    pub notes: String,
}

/// Parses `{version:1, cases:[...]}`; non-object case entries are skipped.
pub fn parse_perspective_json(text: &str) -> ExtractionResult<Vec<PerspectiveCase>> {
    let obj = extract_versioned_object(text, PERSPECTIVE_JSON_VERSION)?;
    let Some(Value::Array(items)) = obj.get("cases") else {
        return Err(ExtractError::CasesNotArray);
    };

    let cases = items
        .iter()
        .filter_map(Value::as_object)
        .map(|c| PerspectiveCase {
            case_id: string_or_empty(c, "caseId"),
            input_precondition: string_or_empty(c, "inputPrecondition"),
            perspective: string_or_empty(c, "perspective"),
            expected_result: string_or_empty(c, "expectedResult"),
            notes: string_or_empty(c, "notes"),
        })
        .collect();
    Ok(cases)
}

/// Makes a value safe for one markdown table cell.
fn cell(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_break = false;
    for ch in s.chars() {
        match ch {
            '\r' | '\n' => {
                if !in_break {
                    out.push(' ');
                }
                in_break = true;
                continue;
            }
            '|' => out.push_str("\\|"),
            _ => out.push(ch),
        }
        in_break = false;
    }
    out.trim().to_string()
}

/// Header, separator and one row per case.
pub fn render_perspective_table(cases: &[PerspectiveCase]) -> String {
    let mut out = String::new();
    out.push_str(TABLE_HEADER);
    out.push('\n');
    out.push_str(TABLE_SEPARATOR);
    out.push('\n');
    for c in cases {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            cell(&c.case_id),
            cell(&c.input_precondition),
            cell(&c.perspective),
            cell(&c.expected_result),
            cell(&c.notes),
        ));
    }
    out
}

/// One-row fallback table for a failed extraction, with the raw log attached.
pub fn render_extraction_error_table(err: &ExtractError, raw_log: &str) -> String {
    let row = PerspectiveCase {
        case_id: "-".into(),
        input_precondition: "-".into(),
        perspective: "Perspective extraction failed".into(),
        expected_result: "-".into(),
        notes: format!("error={err}"),
    };
    let mut out = render_perspective_table(std::slice::from_ref(&row));
    let fence = fence_for(raw_log);
    out.push_str("\n<details>\n<summary>Raw agent log</summary>\n\n");
    out.push_str(&fence);
    out.push_str("text\n");
    out.push_str(raw_log.trim_end());
    out.push('\n');
    out.push_str(&fence);
    out.push_str("\n\n</details>\n");
    out
}
