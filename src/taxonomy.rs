//! Canonical activity vocabulary.
//!
//! Source systems label the same activity in different ways ("Canoeing",
//! "Canoeing (Mendenhall form)", "Rafting", ...). The taxonomy is a single
//! versioned data file mapping every known spelling onto one canonical label.
//! Labels the taxonomy does not know are passed through unchanged and flagged.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use log::{debug, warn};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::UsageError;
use crate::occurrence::{drop_existing, ordered_left_join, OccurrenceSet};
use crate::schema::fallback;
use crate::schema::occurrence::{ACTIVITY, ACTIVITY_MAPPED, RAW_ACTIVITY};

const BUILTIN_TAXONOMY: &str = include_str!("../data/activity_taxonomy.json");
const LABEL_ROWS: &str = "_rows";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub canonical: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TaxonomyFile {
    version: u32,
    activities: Vec<TaxonomyEntry>,
}

/// Result of looking up one raw label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalized<'a> {
    Canonical(&'a str),
    /// Not in the taxonomy; carries the raw label unchanged.
    Unmapped(&'a str),
}

impl<'a> Normalized<'a> {
    pub fn as_str(&self) -> &'a str {
        match self {
            Self::Canonical(s) | Self::Unmapped(s) => s,
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Canonical(_))
    }
}

/// A raw label that fell through the taxonomy during one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmappedActivity {
    pub label: String,
    pub rows: u64,
}

#[derive(Debug, Clone)]
pub struct Taxonomy {
    version: u32,
    exact: HashMap<String, String>,
    folded: HashMap<String, String>,
    canonical: BTreeSet<String>,
}

impl Taxonomy {
    /// The taxonomy shipped with the crate.
    pub fn builtin() -> Result<Self, UsageError> {
        Self::from_json_str(BUILTIN_TAXONOMY)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, UsageError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, UsageError> {
        let file: TaxonomyFile = serde_json::from_str(text)?;
        Self::from_entries(file.version, file.activities)
    }

    pub fn from_entries(version: u32, entries: Vec<TaxonomyEntry>) -> Result<Self, UsageError> {
        let mut exact: HashMap<String, String> = HashMap::new();
        let mut folded: HashMap<String, String> = HashMap::new();
        let mut canonical = BTreeSet::new();

        for entry in entries {
            let target = entry.canonical.trim().to_string();
            if target.is_empty() {
                return Err(UsageError::Taxonomy("empty canonical activity".into()));
            }
            canonical.insert(target.clone());

            let labels = std::iter::once(target.clone()).chain(entry.aliases);
            for label in labels {
                let label = label.trim().to_string();
                if let Some(existing) = exact.get(&label) {
                    if *existing != target {
                        return Err(UsageError::Taxonomy(format!(
                            "'{label}' maps to both '{existing}' and '{target}'"
                        )));
                    }
                    continue;
                }
                let key = label.to_lowercase();
                if let Some(existing) = folded.get(&key) {
                    if *existing != target {
                        return Err(UsageError::Taxonomy(format!(
                            "'{label}' differs only in case from a label of '{existing}', \
                             but maps to '{target}'"
                        )));
                    }
                }
                folded.insert(key, target.clone());
                exact.insert(label, target.clone());
            }
        }

        debug!(
            "taxonomy v{version}: {} labels onto {} activities",
            exact.len(),
            canonical.len()
        );
        Ok(Self {
            version,
            exact,
            folded,
            canonical,
        })
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn canonical_activities(&self) -> impl Iterator<Item = &str> {
        self.canonical.iter().map(String::as_str)
    }

    /// Look up a raw label: exact (trimmed) match first, then case-insensitive.
    pub fn normalize<'a>(&'a self, raw: &'a str) -> Normalized<'a> {
        let trimmed = raw.trim();
        if let Some(hit) = self.exact.get(trimmed) {
            return Normalized::Canonical(hit);
        }
        match self.folded.get(&trimmed.to_lowercase()) {
            Some(hit) => Normalized::Canonical(hit),
            None => Normalized::Unmapped(raw),
        }
    }
}

/// Add `activity` and `activity_mapped` columns to an occurrence set.
///
/// Unmapped labels keep their raw text; null or blank labels become
/// "Activity Unknown". Both are reported back and logged.
pub fn normalize_activities(
    set: &OccurrenceSet,
    taxonomy: &Taxonomy,
) -> Result<(OccurrenceSet, Vec<UnmappedActivity>), UsageError> {
    let base = drop_existing(set.frame().clone(), &[ACTIVITY, ACTIVITY_MAPPED])?;
    let base = base
        .lazy()
        .with_column(col(RAW_ACTIVITY).cast(DataType::String))
        .collect()?;

    let labels = base
        .clone()
        .lazy()
        .group_by_stable([col(RAW_ACTIVITY)])
        .agg([len().alias(LABEL_ROWS)])
        .collect()?;
    let raw = labels.column(RAW_ACTIVITY)?.str()?;
    let rows = labels
        .column(LABEL_ROWS)?
        .as_materialized_series()
        .cast(&DataType::UInt64)?;
    let rows = rows.u64()?;

    let mut lookup_raw = Vec::new();
    let mut lookup_activity = Vec::new();
    let mut lookup_mapped = Vec::new();
    let mut unmapped = Vec::new();

    for (label, count) in raw.into_iter().zip(rows.into_iter()) {
        let count = count.unwrap_or(0);
        match label {
            Some(label) if !label.trim().is_empty() => {
                let hit = taxonomy.normalize(label);
                if !hit.is_mapped() {
                    warn!("unmapped activity '{label}' on {count} rows; keeping raw label");
                    unmapped.push(UnmappedActivity {
                        label: label.to_string(),
                        rows: count,
                    });
                }
                lookup_raw.push(label.to_string());
                lookup_activity.push(hit.as_str().to_string());
                lookup_mapped.push(hit.is_mapped());
            }
            _ => {
                warn!("{count} rows have no activity label");
                unmapped.push(UnmappedActivity {
                    label: fallback::ACTIVITY.to_string(),
                    rows: count,
                });
            }
        }
    }

    let lookup = DataFrame::new(vec![
        Column::new(RAW_ACTIVITY.into(), lookup_raw),
        Column::new(ACTIVITY.into(), lookup_activity),
        Column::new(ACTIVITY_MAPPED.into(), lookup_mapped),
    ])?;

    let joined = ordered_left_join(base, lookup.lazy(), RAW_ACTIVITY)?
        .lazy()
        .with_columns([
            when(col(ACTIVITY).is_null())
                .then(lit(fallback::ACTIVITY))
                .otherwise(col(ACTIVITY))
                .alias(ACTIVITY),
            col(ACTIVITY_MAPPED).fill_null(lit(false)),
        ])
        .collect()?;

    Ok((OccurrenceSet::from_frame(joined)?, unmapped))
}
