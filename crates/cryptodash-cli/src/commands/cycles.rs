use cryptodash_core::load_market_cycles;

use crate::error::CliError;

use super::{AppContext, CommandResult};

pub async fn run(context: &AppContext) -> Result<CommandResult, CliError> {
    let report = load_market_cycles(&context.binance(), &context.coingecko()).await?;
    Ok(CommandResult::ok("cycles", serde_json::to_value(report)?))
}
