//! Rendering of command results for stdout.

use std::io::Write;

use bandcamp_core::{Band, BatchReport, DryRunReport};
use serde::Serialize;
use serde_json::{Map, Value};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct BandRow {
    id: u64,
    name: String,
    subdomain: String,
}

pub fn bands_table(bands: &[Band]) -> String {
    let rows: Vec<BandRow> = bands
        .iter()
        .map(|b| BandRow {
            id: b.band_id,
            name: b.name.clone(),
            subdomain: b.subdomain.clone(),
        })
        .collect();
    Table::new(rows).with(Style::modern()).to_string()
}

/// Keep only `fields` of each record. One field yields a flat array of its
/// values; several yield objects with just those keys; none keeps records whole.
pub fn project(records: Vec<Value>, fields: &[String]) -> Value {
    match fields {
        [] => Value::Array(records),
        [field] => records
            .into_iter()
            .map(|r| r.get(field).cloned().unwrap_or(Value::Null))
            .collect(),
        _ => records
            .into_iter()
            .map(|r| {
                let picked: Map<String, Value> = fields
                    .iter()
                    .filter_map(|f| r.get(f).map(|v| (f.clone(), v.clone())))
                    .collect();
                Value::Object(picked)
            })
            .collect(),
    }
}

pub fn to_values<T: Serialize>(records: &[T]) -> serde_json::Result<Vec<Value>> {
    records.iter().map(serde_json::to_value).collect()
}

pub fn write_json(out: &mut dyn Write, value: &Value) -> anyhow::Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Any serialisable report as pretty JSON.
pub fn write_report_json<T: Serialize>(out: &mut dyn Write, report: &T) -> anyhow::Result<()> {
    write_json(out, &serde_json::to_value(report)?)
}

pub fn write_dry_run(out: &mut dyn Write, report: &DryRunReport) -> anyhow::Result<()> {
    writeln!(out, "Dry run")?;
    writeln!(out, "Setting {}", serde_json::to_string(&report.options)?)?;
    writeln!(out, "TO {} ids", report.count)?;
    writeln!(out, "{}", serde_json::to_string(&report.ids)?)?;
    Ok(())
}

pub fn write_batch_report(out: &mut dyn Write, report: &BatchReport) -> anyhow::Result<()> {
    let total = report.succeeded.len() + report.failed.len();
    writeln!(
        out,
        "Shipped {} of {} ids ({} strategy), {} failed",
        report.succeeded.len(),
        total,
        report.strategy,
        report.failed.len()
    )?;
    for failure in &report.failed {
        writeln!(out, "  {}: {}", failure.id, failure.message)?;
    }
    Ok(())
}
