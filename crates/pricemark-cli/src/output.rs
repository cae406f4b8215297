use std::io::{self, Write};

use pricemark_core::Envelope;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render(
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_envelope(&mut out, envelope, format, pretty)?;
    out.flush()?;
    Ok(())
}

pub fn write_envelope<W: Write>(
    out: &mut W,
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            writeln!(out, "{payload}")?;
        }
        OutputFormat::Table => write_table(out, envelope)?,
    }

    Ok(())
}

fn write_table<W: Write>(out: &mut W, envelope: &Envelope<Value>) -> Result<(), CliError> {
    writeln!(out, "request_id  : {}", envelope.meta.request_id)?;
    writeln!(out, "trace_id    : {}", envelope.meta.trace_id)?;
    writeln!(out, "schema      : {}", envelope.meta.schema_version)?;
    writeln!(out, "generated_at: {}", envelope.meta.generated_at)?;
    writeln!(out, "latency_ms  : {}", envelope.meta.latency_ms)?;

    if !envelope.meta.warnings.is_empty() {
        writeln!(out, "warnings:")?;
        for warning in &envelope.meta.warnings {
            writeln!(out, "  - {warning}")?;
        }
    }

    if let Some(data) = &envelope.data {
        let points = point_rows(data);
        if points.is_empty() {
            writeln!(out, "data:")?;
            for line in serde_json::to_string_pretty(data)?.lines() {
                writeln!(out, "  {line}")?;
            }
        } else {
            writeln!(out, "{:<25} | price", "start")?;
            writeln!(out, "{:-<25}-+-{:-<12}", "", "")?;
            for (start, price) in points {
                writeln!(out, "{start:<25} | {price}")?;
            }
        }
    }

    if !envelope.errors.is_empty() {
        writeln!(out, "errors:")?;
        for error in &envelope.errors {
            match &error.date {
                Some(date) => writeln!(out, "  - {} ({date}): {}", error.code, error.message)?,
                None => writeln!(out, "  - {}: {}", error.code, error.message)?,
            }
        }
    }

    Ok(())
}

/// `(start, price)` pairs of a single-slot `point` or an aggregate's `points`.
fn point_rows(data: &Value) -> Vec<(String, String)> {
    let points: Vec<&Value> = match (data.get("point"), data.get("points")) {
        (Some(point), _) => vec![point],
        (None, Some(Value::Array(points))) => points.iter().collect(),
        _ => Vec::new(),
    };

    points
        .into_iter()
        .filter_map(|point| {
            let start = point.get("start")?.as_str()?;
            let price = match point.get("price")? {
                Value::String(price) => price.clone(),
                other => other.to_string(),
            };
            Some((start.to_owned(), price))
        })
        .collect()
}
