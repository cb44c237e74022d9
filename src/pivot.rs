use std::collections::BTreeMap;

use polars::prelude::*;

use crate::combiner::CombinedTable;
use crate::error::UsageError;
use crate::schema::{aggregate, occurrence};

type Row = BTreeMap<i32, f64>;

/// Reshape a combined table to one row per group key and one column per year.
///
/// Key columns are named by dimension label; year columns by the year as text,
/// covering every year in the table's range whether or not any row reports it.
/// Contributions from all sources are summed; a cell with no contribution, or
/// whose sum is zero, is null. Filler rows (no source) add no key row of
/// their own; a real row with a missing key keeps a null key cell.
pub fn pivot_years(table: &CombinedTable, grand_total: bool) -> Result<DataFrame, UsageError> {
    let df = table.frame();
    let dimensions = table.dimensions();

    let keys = dimensions
        .iter()
        .map(|d| {
            Ok(df
                .column(d.column())?
                .as_materialized_series()
                .cast(&DataType::String)?
                .str()?
                .clone())
        })
        .collect::<Result<Vec<StringChunked>, UsageError>>()?;
    let sources = df
        .column(aggregate::SOURCE)?
        .as_materialized_series()
        .cast(&DataType::String)?
        .str()?
        .clone();
    let years = df.column(occurrence::YEAR)?.i32()?.clone();
    let values = df
        .column(table.measure().column())?
        .as_materialized_series()
        .cast(&DataType::Float64)?
        .f64()?
        .clone();

    let mut rows: BTreeMap<Vec<Option<String>>, Row> = BTreeMap::new();
    for i in 0..df.height() {
        if sources.get(i).is_none() {
            continue;
        }
        let key = keys.iter().map(|k| k.get(i).map(str::to_string)).collect();
        let row = rows.entry(key).or_default();
        if let (Some(year), Some(value)) = (years.get(i), values.get(i)) {
            *row.entry(year).or_insert(0.0) += value;
        }
    }

    let cell = |v: Option<f64>| v.filter(|v| *v != 0.0);

    let mut columns = Vec::new();
    for (i, d) in dimensions.iter().enumerate() {
        let labels: Vec<Option<&str>> = rows.keys().map(|k| k[i].as_deref()).collect();
        columns.push(Column::new(d.label().into(), labels));
    }
    for year in table.years() {
        let cells: Vec<Option<f64>> = rows
            .values()
            .map(|row| cell(row.get(&year).copied()))
            .collect();
        columns.push(Column::new(year.to_string().into(), cells));
    }
    if grand_total {
        let years = table.years();
        let totals: Vec<Option<f64>> = rows
            .values()
            .map(|row| {
                cell(Some(
                    row.iter()
                        .filter(|(y, _)| years.contains(*y))
                        .map(|(_, v)| v)
                        .sum(),
                ))
            })
            .collect();
        columns.push(Column::new(aggregate::TOTAL.into(), totals));
    }

    Ok(DataFrame::new(columns)?)
}
