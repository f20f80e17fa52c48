use cryptodash_core::{market_table, MarketSnapshot};

use crate::error::CliError;

use super::{AppContext, CommandResult};

pub fn run(context: &AppContext) -> Result<CommandResult, CliError> {
    let store = context.config.warehouse().open_markets()?;
    let snapshots = store
        .all_rows()?
        .into_iter()
        .map(MarketSnapshot::from_record)
        .collect::<Vec<_>>();

    let result = CommandResult::ok("markets", serde_json::to_value(market_table(&snapshots))?);
    if snapshots.is_empty() {
        return Ok(result.with_warning("market store is empty; run `refresh markets` first"));
    }
    Ok(result)
}
