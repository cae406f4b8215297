use std::fs::File;
use std::io::BufReader;

use pricemark_core::{import_csv, ImportOptions, ImportReport};
use serde::Serialize;

use crate::cli::LoadArgs;
use crate::error::CliError;

use super::{CommandResult, Context};

#[derive(Debug, Serialize)]
struct LoadResponseData {
    source: String,
    db_path: String,
    #[serde(flatten)]
    report: ImportReport,
}

pub fn run(args: &LoadArgs, context: &Context<'_>) -> Result<CommandResult, CliError> {
    let source = args.file.display().to_string();
    let input = BufReader::new(File::open(&args.file)?);
    let warehouse = context.open_warehouse()?;
    let report = import_csv(
        &warehouse,
        &source,
        input,
        ImportOptions {
            append: args.append,
        },
    )?;

    let skipped = report.skipped;
    let data = serde_json::to_value(LoadResponseData {
        source,
        db_path: warehouse.db_path().display().to_string(),
        report,
    })?;

    let result = CommandResult::ok(data);
    if skipped {
        return Ok(result.with_warning(
            "warehouse already holds observations; import skipped (pass --append to add rows)",
        ));
    }
    Ok(result)
}
