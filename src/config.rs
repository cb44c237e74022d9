use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assemblers::SourceSystem;
use crate::error::UsageError;
use crate::schema::trip;

// ── Seasons ─────────────────────────────────────────────────────────────────

/// How calendar months are bucketed into reporting seasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonScheme {
    /// Early Spring / Late Spring / Summer / Fall / Winter.
    #[default]
    FiveSeason,
    /// Spring / Summer / Fall.
    ThreeSeason,
}

const FIVE_SEASONS: [(&str, &[i32]); 5] = [
    ("Early Spring", &[3, 4]),
    ("Late Spring", &[5]),
    ("Summer", &[6, 7, 8]),
    ("Fall", &[9, 10]),
    ("Winter", &[11, 12, 1, 2]),
];

const THREE_SEASONS: [(&str, &[i32]); 3] = [
    ("Spring", &[1, 2, 3, 4, 5]),
    ("Summer", &[6, 7, 8]),
    ("Fall", &[9, 10, 11, 12]),
];

impl SeasonScheme {
    pub fn bands(self) -> &'static [(&'static str, &'static [i32])] {
        match self {
            Self::FiveSeason => &FIVE_SEASONS,
            Self::ThreeSeason => &THREE_SEASONS,
        }
    }

    pub fn season_for_month(self, month: i32) -> Option<&'static str> {
        self.bands()
            .iter()
            .find(|(_, months)| months.contains(&month))
            .map(|(name, _)| *name)
    }

    /// Expression mapping an integer month column to its season name.
    /// Months outside 1..=12 (or null) map to null.
    pub fn season_expr(self, month_column: &str) -> Expr {
        self.bands()
            .iter()
            .rev()
            .fold(lit(NULL).cast(DataType::String), |acc, (name, months)| {
                let in_band = months
                    .iter()
                    .map(|m| col(month_column).eq(lit(*m)))
                    .reduce(|a, b| a.or(b))
                    .unwrap_or_else(|| lit(false));
                when(in_band).then(lit(*name)).otherwise(acc)
            })
    }
}

impl std::str::FromStr for SeasonScheme {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "five_season" | "five" | "5" => Ok(Self::FiveSeason),
            "three_season" | "three" | "3" => Ok(Self::ThreeSeason),
            other => Err(UsageError::InvalidConfig(format!(
                "Invalid season scheme: '{other}'. Must be 'five_season' or 'three_season'"
            ))),
        }
    }
}

// ── Report configuration ────────────────────────────────────────────────────

fn default_sources() -> Vec<SourceSystem> {
    SourceSystem::ALL.to_vec()
}

/// Parameters of one report run, handed explicitly to every stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub start_year: i32,
    pub end_year: i32,
    /// Narrows day-granular sources inside the year range.
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub business_name: Option<String>,
    #[serde(default = "default_sources")]
    pub sources: Vec<SourceSystem>,
    #[serde(default)]
    pub season_scheme: SeasonScheme,
    #[serde(default)]
    pub taxonomy_path: Option<PathBuf>,
    #[serde(default)]
    pub grand_total: bool,
}

impl ReportConfig {
    pub fn new(start_year: i32, end_year: i32) -> Self {
        Self {
            start_year,
            end_year,
            start_date: None,
            end_date: None,
            business_name: None,
            sources: default_sources(),
            season_scheme: SeasonScheme::default(),
            taxonomy_path: None,
            grand_total: false,
        }
    }

    pub fn with_business(mut self, name: impl Into<String>) -> Self {
        self.business_name = Some(name.into());
        self
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn with_sources(mut self, sources: &[SourceSystem]) -> Self {
        self.sources = sources.to_vec();
        self
    }

    pub fn with_season_scheme(mut self, scheme: SeasonScheme) -> Self {
        self.season_scheme = scheme;
        self
    }

    pub fn with_grand_total(mut self, grand_total: bool) -> Self {
        self.grand_total = grand_total;
        self
    }

    /// Load a JSON config file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, UsageError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), UsageError> {
        if self.start_year > self.end_year {
            return Err(UsageError::InvalidConfig(format!(
                "start_year {} is after end_year {}",
                self.start_year, self.end_year
            )));
        }
        let (start, end) = self.date_range()?;
        if start > end {
            return Err(UsageError::InvalidConfig(format!(
                "start_date {start} is after end_date {end}"
            )));
        }
        if start.year() < self.start_year || end.year() > self.end_year {
            return Err(UsageError::InvalidConfig(format!(
                "date range {start}..{end} falls outside {}..{}",
                self.start_year, self.end_year
            )));
        }
        if self.sources.is_empty() {
            return Err(UsageError::InvalidConfig(
                "at least one source system must be selected".into(),
            ));
        }
        Ok(())
    }

    pub fn years(&self) -> std::ops::RangeInclusive<i32> {
        self.start_year..=self.end_year
    }

    /// Inclusive date range; defaults to the whole of the year range.
    pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate), UsageError> {
        let start = match self.start_date {
            Some(d) => d,
            None => NaiveDate::from_ymd_opt(self.start_year, 1, 1).ok_or_else(|| {
                UsageError::InvalidConfig(format!("invalid start_year {}", self.start_year))
            })?,
        };
        let end = match self.end_date {
            Some(d) => d,
            None => NaiveDate::from_ymd_opt(self.end_year, 12, 31).ok_or_else(|| {
                UsageError::InvalidConfig(format!("invalid end_year {}", self.end_year))
            })?,
        };
        Ok((start, end))
    }

    /// Predicate pushed down to trip-level table fetches.
    pub fn business_predicate(&self) -> Option<Expr> {
        self.business_name
            .as_ref()
            .map(|name| col(trip::BUSINESS_NAME).eq(lit(name.as_str())))
    }
}
