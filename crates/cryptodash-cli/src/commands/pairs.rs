use cryptodash_core::{
    parse_date, Candle, PairSymbol, PriceSummary, UtcDateTime, ValidationError,
};
use serde::Serialize;
use time::Duration;

use crate::cli::{PairShowArgs, PairsArgs, PairsCommand};
use crate::error::CliError;

use super::{AppContext, CommandResult};

#[derive(Debug, Serialize)]
struct PairRange {
    pair: String,
    earliest_close: Option<UtcDateTime>,
    latest_close: Option<UtcDateTime>,
}

#[derive(Debug, Serialize)]
struct PairView {
    pair: PairSymbol,
    summary: Option<PriceSummary>,
    candles: Vec<Candle>,
}

pub fn run(args: &PairsArgs, context: &AppContext) -> Result<CommandResult, CliError> {
    match &args.command {
        PairsCommand::List => list(context),
        PairsCommand::Show(show_args) => show(show_args, context),
    }
}

fn list(context: &AppContext) -> Result<CommandResult, CliError> {
    let store = context.config.warehouse().open_candles()?;

    let mut pairs = Vec::new();
    for pair in store.list_pairs()? {
        let bounds = store.close_time_bounds(&pair)?;
        let (earliest_close, latest_close) = match bounds {
            Some((earliest, latest)) => (
                Some(UtcDateTime::from_unix_millis(earliest)?),
                Some(UtcDateTime::from_unix_millis(latest)?),
            ),
            None => (None, None),
        };
        pairs.push(PairRange {
            pair,
            earliest_close,
            latest_close,
        });
    }

    Ok(CommandResult::ok("pairs list", serde_json::to_value(pairs)?))
}

fn show(args: &PairShowArgs, context: &AppContext) -> Result<CommandResult, CliError> {
    let pair = PairSymbol::parse(&args.pair)?;
    let store = context.config.warehouse().open_candles()?;

    let Some((earliest, latest)) = store.close_time_bounds(pair.as_str())? else {
        let view = PairView {
            pair,
            summary: None,
            candles: Vec::new(),
        };
        return Ok(CommandResult::ok("pairs show", serde_json::to_value(view)?)
            .with_warning("pair has no stored candles"));
    };

    let from_ms = match &args.start {
        Some(raw) => UtcDateTime::start_of_day(parse_date(raw)?).unix_millis(),
        None => earliest,
    };
    let to_ms = match &args.end {
        Some(raw) => {
            let end = parse_date(raw)?;
            UtcDateTime::start_of_day(end)
                .saturating_add(Duration::DAY - Duration::MILLISECOND)
                .unix_millis()
        }
        None => latest,
    };
    if from_ms > to_ms {
        return Err(ValidationError::InvertedRange {
            start: args.start.clone().unwrap_or_default(),
            end: args.end.clone().unwrap_or_default(),
        }
        .into());
    }

    let candles = store
        .query_range(pair.as_str(), from_ms, to_ms)?
        .iter()
        .map(Candle::from_record)
        .collect::<Result<Vec<_>, _>>()?;
    let view = PairView {
        summary: PriceSummary::from_candles(&pair, &candles),
        pair,
        candles,
    };

    Ok(CommandResult::ok("pairs show", serde_json::to_value(view)?))
}
