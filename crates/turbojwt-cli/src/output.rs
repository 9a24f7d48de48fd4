//! Output formatting for CLI results

use serde_json::Value;

use crate::error::CliResult;

/// Render `value`: pretty JSON by default, a single line with `--json`.
pub fn render(json: bool, value: &Value) -> CliResult<String> {
    Ok(if json {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    })
}

/// Print `value` to stdout
pub fn display(json: bool, value: &Value) -> CliResult<()> {
    println!("{}", render(json, value)?);
    Ok(())
}
