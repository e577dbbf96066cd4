//! Structured payload extraction from agent text that is not reliably
//! well-formed.
//!
//! Every entry point is a pure function of its input and reports failures
//! through the closed [`ExtractError`](crate::error::ExtractError) code set.

pub mod coerce;
mod execution;
mod json;
mod marker;
mod perspective;
mod result_file;

pub use execution::{
    marker_contract, parse_marked_execution, parse_test_execution_json, EXECUTION_JSON_VERSION,
    RESULT_BEGIN, RESULT_END, STDERR_BEGIN, STDERR_END, STDOUT_BEGIN, STDOUT_END,
};
pub use json::{
    extract_json_value, extract_versioned_object, normalize_string_newlines, strip_code_fence,
};
pub use marker::{extract_block, extract_last_block};
pub use perspective::{
    parse_perspective_json, render_extraction_error_table, render_perspective_table,
    PerspectiveCase, PERSPECTIVE_JSON_VERSION, TABLE_HEADER, TABLE_SEPARATOR,
};
pub use result_file::parse_test_result_file;
