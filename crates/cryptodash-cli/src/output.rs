use serde::Serialize;
use serde_json::Value;

use crate::commands::CommandResult;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct Rendered<'a> {
    command: &'a str,
    generated_at: String,
    warnings: &'a [String],
    data: &'a Value,
}

pub fn render(result: &CommandResult, pretty: bool) -> Result<(), CliError> {
    let rendered = Rendered {
        command: result.command,
        generated_at: cryptodash_core::UtcDateTime::now().format_rfc3339(),
        warnings: &result.warnings,
        data: &result.data,
    };

    let payload = if pretty {
        serde_json::to_string_pretty(&rendered)?
    } else {
        serde_json::to_string(&rendered)?
    };
    println!("{payload}");

    Ok(())
}
