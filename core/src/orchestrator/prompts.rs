//! Prompt text sent to the agent for each phase.

use std::path::Path;

use crate::extract::{marker_contract, PERSPECTIVE_JSON_VERSION};

pub const PERSPECTIVES_BEGIN: &str = "===TESTGEN_PERSPECTIVES_JSON_BEGIN===";
pub const PERSPECTIVES_END: &str = "===TESTGEN_PERSPECTIVES_JSON_END===";

fn target_list(targets: &[String]) -> String {
    if targets.is_empty() {
        return "- the whole workspace\n".to_string();
    }
    targets.iter().map(|t| format!("- {t}\n")).collect()
}

pub fn perspective_prompt(targets: &[String], instruction: Option<&str>) -> String {
    let mut p = String::new();
    p.push_str("You are preparing a test perspective table before any test code is written.\n");
    p.push_str("Do not create, edit or delete any file. Read the code only.\n\n");
    p.push_str("Targets:\n");
    p.push_str(&target_list(targets));
    if let Some(extra) = instruction.filter(|s| !s.trim().is_empty()) {
        p.push_str("\nAdditional instruction:\n");
        p.push_str(extra.trim());
        p.push('\n');
    }
    p.push_str(
        "\nEnumerate equivalence classes, boundary values, error paths and \
         preconditions for the targets. Reply with exactly one JSON object \
         between the markers below and nothing else between them:\n\n",
    );
    p.push_str(PERSPECTIVES_BEGIN);
    p.push('\n');
    p.push_str(&format!(
        "{{\"version\": {PERSPECTIVE_JSON_VERSION}, \"cases\": [{{\"caseId\": \"TC-N-01\", \
         \"inputPrecondition\": \"...\", \"perspective\": \"...\", \
         \"expectedResult\": \"...\", \"notes\": \"...\"}}]}}\n"
    ));
    p.push_str(PERSPECTIVES_END);
    p.push('\n');
    p
}

pub fn generation_prompt(targets: &[String], instruction: Option<&str>) -> String {
    let mut p = String::new();
    p.push_str("Write automated tests for the following targets:\n");
    p.push_str(&target_list(targets));
    p.push_str(
        "\nFollow the project's existing test framework, layout and naming. \
         Cover normal cases, boundary values and error paths.\n",
    );
    if let Some(extra) = instruction.filter(|s| !s.trim().is_empty()) {
        p.push_str("\nAdditional instruction:\n");
        p.push_str(extra.trim());
        p.push('\n');
    }
    p
}

/// Appended to the generation prompt once a perspective table exists.
pub fn scope_restriction(table: &str, report_path: Option<&Path>) -> String {
    let mut p = String::new();
    p.push_str("\n## Test perspectives\n\n");
    p.push_str("Implement one test per row of this table:\n\n");
    p.push_str(table.trim_end());
    p.push_str("\n\n## Scope\n\n");
    p.push_str("- Only create or edit test code. Do not modify production sources.\n");
    match report_path {
        Some(path) => p.push_str(&format!(
            "- The table is already saved at {}. Do not write another copy of it.\n",
            path.display()
        )),
        None => p.push_str("- Do not write the table to a file.\n"),
    }
    p
}

/// Strict read-only prompt for running the test command through the agent.
pub fn agent_execution_prompt(command: &str, cwd: &Path) -> String {
    format!(
        "Run the following shell command exactly once in {cwd} and report its result.\n\
         Do not create, edit or delete any file. Do not retry, fix or explain failures.\n\n\
         Command:\n{command}\n\n\
         When the command finishes, reply with the result in exactly this format:\n\n\
         {contract}\n",
        cwd = cwd.display(),
        contract = marker_contract(),
    )
}
