use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use log::debug;
use polars::prelude::*;

use crate::aggregation::{AggregateTable, Dimension, Measure};
use crate::assemblers::SourceSystem;
use crate::error::UsageError;
use crate::schema::{aggregate, occurrence};

/// Per-source aggregates for one grouping, stacked long-form.
///
/// Columns: `source`, the dimension columns, `year`, and the measure.
/// Years in range that no source reported appear as filler rows whose
/// source, key and measure are all null.
#[derive(Debug, Clone)]
pub struct CombinedTable {
    frame: DataFrame,
    dimensions: Vec<Dimension>,
    measure: Measure,
    years: RangeInclusive<i32>,
}

impl CombinedTable {
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn measure(&self) -> Measure {
        self.measure
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.years.clone()
    }

    /// Years with at least one row, filler rows included.
    pub fn years_present(&self) -> Result<BTreeSet<i32>, UsageError> {
        Ok(self
            .frame
            .column(occurrence::YEAR)?
            .i32()?
            .into_iter()
            .flatten()
            .collect())
    }

    /// One row per `(group_key, year)`, summed across sources.
    ///
    /// Filler rows are kept; a sum with no reported value stays null.
    pub fn collapse_sources(&self) -> Result<DataFrame, UsageError> {
        let m = self.measure.column();
        let mut keys: Vec<Expr> = self.dimensions.iter().map(|d| col(d.column())).collect();
        keys.push(col(occurrence::YEAR));
        let mut order: Vec<String> = self
            .dimensions
            .iter()
            .map(|d| d.column().to_string())
            .collect();
        order.push(occurrence::YEAR.to_string());

        Ok(self
            .frame
            .clone()
            .lazy()
            .group_by_stable(keys)
            .agg([
                col(m).sum().alias(m),
                col(m).count().alias("_reported"),
            ])
            .with_column(
                when(col("_reported").eq(lit(0)).or(col(m).eq(lit(0.0))))
                    .then(lit(NULL).cast(DataType::Float64))
                    .otherwise(col(m))
                    .alias(m),
            )
            .select(
                order
                    .iter()
                    .map(|c| col(c.as_str()))
                    .chain(std::iter::once(col(m)))
                    .collect::<Vec<_>>(),
            )
            .sort(order, SortMultipleOptions::default())
            .collect()?)
    }
}

/// Stack per-source aggregates for one grouping and fill missing years.
///
/// Sources with no aggregate contribute nothing. Returns `None` when no
/// source contributed at all. Every table must share the same dimensions
/// and measure; service days and hunts are never combined together.
pub fn combine(
    parts: &[(SourceSystem, Option<AggregateTable>)],
    years: RangeInclusive<i32>,
) -> Result<Option<CombinedTable>, UsageError> {
    let present: Vec<(SourceSystem, &AggregateTable)> = parts
        .iter()
        .filter_map(|(system, table)| table.as_ref().map(|t| (*system, t)))
        .collect();
    let Some((_, first)) = present.first() else {
        return Ok(None);
    };
    let dimensions = first.dimensions().to_vec();
    let measure = first.measure();

    let m = measure.column();
    let mut columns: Vec<Expr> = vec![col(aggregate::SOURCE)];
    columns.extend(dimensions.iter().map(|d| col(d.column()).cast(DataType::String)));
    columns.push(col(occurrence::YEAR).cast(DataType::Int32));
    columns.push(col(m).cast(DataType::Float64));

    let mut frames = Vec::with_capacity(present.len());
    for (system, table) in &present {
        if table.dimensions() != dimensions.as_slice() || table.measure() != measure {
            return Err(UsageError::General(format!(
                "{} aggregate is grouped by {:?} ({:?}); expected {:?} ({:?})",
                system,
                table.dimensions(),
                table.measure(),
                dimensions,
                measure
            )));
        }
        frames.push(
            table
                .frame()
                .clone()
                .lazy()
                .with_column(lit(system.label()).alias(aggregate::SOURCE))
                .select(columns.clone()),
        );
    }
    let stacked = concat(frames, UnionArgs::default())?.collect()?;

    let seen: BTreeSet<i32> = stacked
        .column(occurrence::YEAR)?
        .i32()?
        .into_iter()
        .flatten()
        .collect();
    let missing: Vec<i32> = years.clone().filter(|y| !seen.contains(y)).collect();

    let frame = if missing.is_empty() {
        stacked
    } else {
        debug!("no source reported years {missing:?}; adding empty rows");
        let n = missing.len();
        let mut filler = vec![Column::new(aggregate::SOURCE.into(), vec![None::<&str>; n])];
        for d in &dimensions {
            filler.push(Column::new(d.column().into(), vec![None::<&str>; n]));
        }
        filler.push(Column::new(occurrence::YEAR.into(), missing));
        filler.push(Column::new(m.into(), vec![None::<f64>; n]));
        stacked.vstack(&DataFrame::new(filler)?)?
    };

    Ok(Some(CombinedTable {
        frame,
        dimensions,
        measure,
        years,
    }))
}
