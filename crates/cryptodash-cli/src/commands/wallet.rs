use cryptodash_core::{explore_wallet, ProviderId, Termination, WalletAddress};

use crate::cli::WalletArgs;
use crate::error::CliError;

use super::{AppContext, CommandResult};

pub async fn run(args: &WalletArgs, context: &AppContext) -> Result<CommandResult, CliError> {
    let address = WalletAddress::parse(&args.address)?;
    let source = context.etherscan()?;
    let pacer = context.pacer(ProviderId::Etherscan);
    let query = context.config.wallet_query(args.stablecoins_only);

    let report = explore_wallet(&source, &pacer, &address, query).await?;

    let mut warnings = Vec::new();
    if report.balance_eth.is_none() {
        warnings.push(String::from("balance lookup failed"));
    }
    for section in [&report.native, &report.token] {
        if let Termination::UpstreamStatus(status) = section.termination {
            warnings.push(format!(
                "transfer history ended early on HTTP {status}; results may be incomplete"
            ));
        }
    }

    Ok(CommandResult::ok("wallet", serde_json::to_value(&report)?).with_warnings(warnings))
}
