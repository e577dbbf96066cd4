//! Warns when the test command looks like it launches a nested editor host.
//! Advisory only: execution always proceeds.

use std::path::Path;

const HOST_SIGNATURES: &[&str] = &[
    "vscode-test",
    "@vscode/test-electron",
    "@vscode/test-cli",
    "test-electron",
    "extensiondevelopmentpath",
    "extensiontestspath",
    "xvfb-run",
    "electron ",
];

fn matching_signature(text: &str) -> Option<&'static str> {
    let lower = text.to_ascii_lowercase();
    HOST_SIGNATURES.iter().copied().find(|sig| lower.contains(sig))
}

/// `scripts.test` from `package.json` in `dir`, if any.
async fn declared_test_script(dir: &Path) -> Option<String> {
    let raw = tokio::fs::read_to_string(dir.join("package.json")).await.ok()?;
    let json: serde_json::Value = serde_json::from_str(&raw).ok()?;
    json.get("scripts")?
        .get("test")?
        .as_str()
        .map(str::to_string)
}

/// Returns the reason a warning was logged, if one was.
pub async fn check_nested_host(command: &str, cwd: &Path) -> Option<String> {
    let reason = if let Some(sig) = matching_signature(command) {
        Some(format!("test command contains `{sig}`"))
    } else {
        declared_test_script(cwd)
            .await
            .and_then(|script| matching_signature(&script).map(|sig| (script, sig)))
            .map(|(script, sig)| format!("package.json test script `{script}` contains `{sig}`"))
    };
    if let Some(r) = &reason {
        tracing::warn!(
            command,
            reason = %r,
            "test command may launch a nested editor host; running it anyway"
        );
    }
    reason
}
