use cryptodash_core::{compare_returns, parse_date, ProviderId};

use crate::cli::CompareArgs;
use crate::error::CliError;

use super::{AppContext, CommandResult};

pub async fn run(args: &CompareArgs, context: &AppContext) -> Result<CommandResult, CliError> {
    let start = parse_date(&args.start)?;
    let end = parse_date(&args.end)?;
    let pacer = context.pacer(ProviderId::Yahoo);

    let series = compare_returns(&context.yahoo(), &pacer, &args.tickers, start, end).await?;

    let warnings = series
        .iter()
        .filter(|entry| entry.points.is_empty())
        .map(|entry| format!("no price history for {}", entry.ticker))
        .collect();
    Ok(CommandResult::ok("compare", serde_json::to_value(series)?).with_warnings(warnings))
}
