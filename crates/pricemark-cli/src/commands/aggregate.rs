use pricemark_core::{AggregateParams, StatResult};
use serde::Serialize;

use crate::cli::AggregateArgs;
use crate::error::CliError;

use super::{CommandResult, Context};

#[derive(Debug, Serialize)]
struct AggregateResponseData {
    portfolio: Option<String>,
    first_slot: i64,
    total_slots: i64,
    points: Vec<StatResult>,
}

pub async fn run(args: &AggregateArgs, context: &Context<'_>) -> Result<CommandResult, CliError> {
    let request = context.validator().aggregate(&AggregateParams {
        portfolio: args.portfolio.clone(),
        start_date: args.start.clone(),
        end_date: args.end.clone(),
        result_points: args.points,
    })?;
    let reporter = context.reporter()?;
    let points = reporter.aggregate(&request).await?;

    let data = serde_json::to_value(AggregateResponseData {
        portfolio: request.filter().portfolio.clone(),
        first_slot: request.first_slot(),
        total_slots: request.total_slots(),
        points,
    })?;
    Ok(CommandResult::ok(data))
}
