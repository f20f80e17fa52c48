use std::future::Future;
use std::sync::Arc;

use cryptodash_core::refresh::UnitFailure;
use cryptodash_core::{
    CandleRefreshReport, CandleRefresher, MarketRefreshReport, MarketRefresher, ProviderId,
    Schedule, UtcDateTime,
};
use serde_json::json;
use tracing::info;

use crate::cli::{RefreshArgs, RefreshTarget};
use crate::error::CliError;
use crate::output;

use super::{AppContext, CommandResult};

pub async fn run(args: &RefreshArgs, context: &AppContext) -> Result<CommandResult, CliError> {
    match &args.target {
        RefreshTarget::Candles(daemon) => {
            let refresher = CandleRefresher::new(
                Arc::new(context.binance()),
                context.config.warehouse().open_candles()?,
                context.pacer(ProviderId::Binance),
                context.config.candle_settings(),
            );
            let refresher = &refresher;
            let run_once = move || async move {
                let report = refresher.run(UtcDateTime::now()).await;
                info!(
                    run_id = %report.run_id,
                    pairs = report.pairs_refreshed,
                    rows = report.rows_appended,
                    failures = report.failures.len(),
                    "candle refresh finished"
                );
                candle_result(&report)
            };

            if !daemon.daemon {
                return run_once().await;
            }
            let schedule = context.config.candle_schedule()?;
            let runs = repeat_until_stopped(
                run_once,
                || wait_for_next_wake(&schedule),
                |result| output::render(&result, context.pretty),
            )
            .await?;
            Ok(stopped_result("refresh candles", runs))
        }
        RefreshTarget::Markets(daemon) => {
            let refresher = MarketRefresher::new(
                Arc::new(context.coingecko()),
                context.config.warehouse().open_markets()?,
                context.pacer(ProviderId::Coingecko),
                context.config.market_settings(),
            );
            let refresher = &refresher;
            let run_once = move || async move {
                let report = refresher.run().await;
                info!(
                    run_id = %report.run_id,
                    pages = report.pages_stored,
                    rows = report.rows_upserted,
                    failures = report.failures.len(),
                    "market refresh finished"
                );
                market_result(&report)
            };

            if !daemon.daemon {
                return run_once().await;
            }
            let schedule = context.config.market_schedule()?;
            let runs = repeat_until_stopped(
                run_once,
                || wait_for_next_wake(&schedule),
                |result| output::render(&result, context.pretty),
            )
            .await?;
            Ok(stopped_result("refresh markets", runs))
        }
    }
}

/// Run, emit the result, then wait for the next wake. Returns the number of
/// completed runs once `wake` reports an interruption.
async fn repeat_until_stopped<R, RF, W, WF, E>(
    mut run_once: R,
    mut wake: W,
    mut emit: E,
) -> Result<usize, CliError>
where
    R: FnMut() -> RF,
    RF: Future<Output = Result<CommandResult, CliError>>,
    W: FnMut() -> WF,
    WF: Future<Output = bool>,
    E: FnMut(CommandResult) -> Result<(), CliError>,
{
    let mut runs = 0;
    loop {
        emit(run_once().await?)?;
        runs += 1;
        if !wake().await {
            return Ok(runs);
        }
    }
}

/// Sleep until the next wake; `false` when interrupted with Ctrl-C.
async fn wait_for_next_wake(schedule: &Schedule) -> bool {
    let now = UtcDateTime::now();
    let next = schedule.next_after(now);
    info!(next_wake = %next, "sleeping until next refresh");

    tokio::select! {
        () = tokio::time::sleep(schedule.wait_from(now)) => true,
        _ = tokio::signal::ctrl_c() => {
            info!("interrupted; stopping refresh loop");
            false
        }
    }
}

fn stopped_result(command: &'static str, runs: usize) -> CommandResult {
    CommandResult::ok(command, json!({ "runs": runs, "stopped": "interrupted" }))
}

fn candle_result(report: &CandleRefreshReport) -> Result<CommandResult, CliError> {
    let mut warnings = failure_warnings(&report.failures);
    if report.listing_failed {
        warnings.push(String::from("exchange pair listing failed; no pairs refreshed"));
    }
    Ok(CommandResult::ok("refresh candles", serde_json::to_value(report)?).with_warnings(warnings))
}

fn market_result(report: &MarketRefreshReport) -> Result<CommandResult, CliError> {
    Ok(
        CommandResult::ok("refresh markets", serde_json::to_value(report)?)
            .with_warnings(failure_warnings(&report.failures)),
    )
}

fn failure_warnings(failures: &[UnitFailure]) -> Vec<String> {
    failures
        .iter()
        .map(|failure| format!("{} skipped: {}", failure.unit, failure.error))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    #[tokio::test]
    async fn daemon_emits_every_run_before_waiting() {
        let run_count = Cell::new(0);
        let wakes = Cell::new(0);
        let mut emitted = Vec::new();

        let runs = repeat_until_stopped(
            || {
                run_count.set(run_count.get() + 1);
                let run = run_count.get();
                async move { Ok(CommandResult::ok("refresh markets", json!({ "run": run }))) }
            },
            || {
                wakes.set(wakes.get() + 1);
                let keep_going = wakes.get() < 3;
                async move { keep_going }
            },
            |result| {
                emitted.push(result.data);
                Ok(())
            },
        )
        .await
        .expect("loop stops cleanly");

        assert_eq!(runs, 3);
        assert_eq!(
            emitted,
            vec![json!({ "run": 1 }), json!({ "run": 2 }), json!({ "run": 3 })]
        );
    }

    #[tokio::test]
    async fn daemon_stops_on_the_first_failed_run() {
        let mut emitted = 0;

        let error = repeat_until_stopped(
            || async { Err(CliError::Command(String::from("store unavailable"))) },
            || async { true },
            |_| {
                emitted += 1;
                Ok(())
            },
        )
        .await
        .expect_err("failure propagates");

        assert!(matches!(error, CliError::Command(_)));
        assert_eq!(emitted, 0);
    }

    #[test]
    fn stopped_result_reports_completed_runs() {
        let result = stopped_result("refresh candles", 4);

        assert_eq!(result.command, "refresh candles");
        assert_eq!(result.data["runs"], 4);
        assert!(result.warnings.is_empty());
    }
}
