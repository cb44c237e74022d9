//! One assembler per source system.
//!
//! Each reconstructs flat activity occurrences from that system's own table
//! hierarchy. A system with no rows in range yields `None`, never an error.

mod common;
mod guided;
mod heliski;
mod hunting;
mod icefield;
mod mendenhall;
mod outfitting;

use log::info;
use serde::{Deserialize, Serialize};

use crate::config::ReportConfig;
use crate::error::UsageError;
use crate::occurrence::{HuntEvents, OccurrenceSet};
use crate::source::TableSource;

pub use guided::GuidedRecreation;
pub use heliski::Heliski;
pub use hunting::Hunting;
pub use icefield::Icefield;
pub use mendenhall::Mendenhall;
pub use outfitting::Outfitting;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSystem {
    GuidedRecreation,
    Hunting,
    Heliski,
    Icefield,
    Mendenhall,
    Outfitting,
}

impl SourceSystem {
    pub const ALL: [SourceSystem; 6] = [
        Self::GuidedRecreation,
        Self::Hunting,
        Self::Heliski,
        Self::Icefield,
        Self::Mendenhall,
        Self::Outfitting,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::GuidedRecreation => "Guided Recreation",
            Self::Hunting => "Hunting",
            Self::Heliski => "Heliski",
            Self::Icefield => "Icefield",
            Self::Mendenhall => "Mendenhall",
            Self::Outfitting => "Outfitting",
        }
    }

    pub fn assembler(self) -> &'static (dyn SourceAssembler + Sync) {
        match self {
            Self::GuidedRecreation => &GuidedRecreation,
            Self::Hunting => &Hunting,
            Self::Heliski => &Heliski,
            Self::Icefield => &Icefield,
            Self::Mendenhall => &Mendenhall,
            Self::Outfitting => &Outfitting,
        }
    }

    /// Run this system's assembler and log what it produced.
    pub fn assemble(
        self,
        source: &dyn TableSource,
        config: &ReportConfig,
    ) -> Result<Assembled, UsageError> {
        let assembled = self.assembler().assemble(source, config)?;
        match (&assembled.occurrences, &assembled.hunt_events) {
            (None, None) => info!("{}: no activity in range", self.label()),
            (occ, hunts) => info!(
                "{}: {} occurrences, {} hunt rows",
                self.label(),
                occ.as_ref().map_or(0, OccurrenceSet::len),
                hunts.as_ref().map_or(0, HuntEvents::len)
            ),
        }
        Ok(assembled)
    }
}

impl std::fmt::Display for SourceSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for SourceSystem {
    type Err = UsageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|system| system.label().to_lowercase().replace(' ', "_") == wanted)
            .ok_or_else(|| UsageError::InvalidConfig(format!("Unknown source system: '{s}'")))
    }
}

/// Output of one assembler. Only hunting produces hunt events.
#[derive(Debug, Clone, Default)]
pub struct Assembled {
    pub occurrences: Option<OccurrenceSet>,
    pub hunt_events: Option<HuntEvents>,
}

impl Assembled {
    pub fn is_empty(&self) -> bool {
        self.occurrences.is_none() && self.hunt_events.is_none()
    }
}

pub trait SourceAssembler {
    fn system(&self) -> SourceSystem;

    fn assemble(
        &self,
        source: &dyn TableSource,
        config: &ReportConfig,
    ) -> Result<Assembled, UsageError>;
}
