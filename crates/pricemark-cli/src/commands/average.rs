use pricemark_core::AverageParams;

use crate::cli::AverageArgs;
use crate::error::CliError;

use super::{CommandResult, Context, SingleSlotResponseData};

pub async fn run(args: &AverageArgs, context: &Context<'_>) -> Result<CommandResult, CliError> {
    let request = context.validator().average(&AverageParams {
        date: args.date.clone(),
        portfolio: args.portfolio.clone(),
        owner: args.owner.clone(),
        instrument: args.instrument.clone(),
    })?;
    let reporter = context.reporter()?;
    let point = reporter.average(&request).await?;

    let data = serde_json::to_value(SingleSlotResponseData {
        slot: request.slot(),
        point,
    })?;
    Ok(CommandResult::ok(data))
}
