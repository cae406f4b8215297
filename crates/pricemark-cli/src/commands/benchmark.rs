use pricemark_core::BenchmarkParams;

use crate::cli::BenchmarkArgs;
use crate::error::CliError;

use super::{CommandResult, Context, SingleSlotResponseData};

pub async fn run(args: &BenchmarkArgs, context: &Context<'_>) -> Result<CommandResult, CliError> {
    let request = context.validator().benchmark(&BenchmarkParams {
        date: args.date.clone(),
        portfolio: args.portfolio.clone(),
    })?;
    let reporter = context.reporter()?;
    let point = reporter.benchmark(&request).await?;

    let data = serde_json::to_value(SingleSlotResponseData {
        slot: request.slot(),
        point,
    })?;
    Ok(CommandResult::ok(data))
}
