use std::collections::BTreeMap;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// IonEvent / Sample – one raw recording
// ---------------------------------------------------------------------------

/// One detected ion event: a row of a per-sample feature table.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct IonEvent {
    pub time: f64,
    pub mass: f64,
    pub intensity: f64,
}

/// A single raw recording, as read from the feature archive.
#[derive(Debug, Clone)]
pub struct Sample {
    pub id: String,
    pub events: Vec<IonEvent>,
}

impl Sample {
    pub fn new(id: impl Into<String>, events: Vec<IonEvent>) -> Self {
        Sample {
            id: id.into(),
            events,
        }
    }

    /// (mass, intensity) pairs ordered by mass, ignoring elution time.
    pub fn sorted_by_mass(&self) -> Vec<(f64, f64)> {
        let mut points: Vec<(f64, f64)> =
            self.events.iter().map(|e| (e.mass, e.intensity)).collect();
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        points
    }
}

// ---------------------------------------------------------------------------
// ReducedSample – masses rounded to a fixed number of digits
// ---------------------------------------------------------------------------

/// Mass rounded to `digits` decimals, stored as `round(mass * 10^digits)`.
pub type MassTick = i64;

/// Largest number of decimal digits a mass may be rounded to.
pub const MAX_DIGITS: u32 = 9;

/// Convert a mass to its tick at the given precision.
///
/// Ties round to even (`0.125` → `0.12` at two digits), as numpy and pandas
/// `round` do. Returns `None` for non-finite masses and for ticks that do
/// not fit an `i64`.
pub fn checked_mass_to_tick(mass: f64, digits: u32) -> Option<MassTick> {
    let scaled = (mass * scale(digits)).round_ties_even();
    // `i64::MAX as f64` is 2^63, one past the largest tick.
    if scaled.is_finite() && scaled >= i64::MIN as f64 && scaled < i64::MAX as f64 {
        Some(scaled as MassTick)
    } else {
        None
    }
}

/// Saturating variant of [`checked_mass_to_tick`] for lookups.
pub fn mass_to_tick(mass: f64, digits: u32) -> MassTick {
    (mass * scale(digits)).round_ties_even() as MassTick
}

/// Convert a tick back to a mass value.
pub fn tick_to_mass(tick: MassTick, digits: u32) -> f64 {
    tick as f64 / scale(digits)
}

fn scale(digits: u32) -> f64 {
    10f64.powi(digits as i32)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReducedEvent {
    pub time: f64,
    pub tick: MassTick,
    pub intensity: f64,
}

/// A sample whose masses have been rounded to the detector tolerance.
#[derive(Debug, Clone)]
pub struct ReducedSample {
    pub id: String,
    pub digits: u32,
    pub events: Vec<ReducedEvent>,
}

impl ReducedSample {
    /// Build a reduced sample from already-aggregated totals (one row per mass).
    pub fn from_totals(id: impl Into<String>, digits: u32, totals: &BTreeMap<MassTick, f64>) -> Self {
        let events = totals
            .iter()
            .map(|(&tick, &intensity)| ReducedEvent {
                time: 0.0,
                tick,
                intensity,
            })
            .collect();
        ReducedSample {
            id: id.into(),
            digits,
            events,
        }
    }
}

// ---------------------------------------------------------------------------
// LabelTable – one-hot compound labels
// ---------------------------------------------------------------------------

/// The labelled training table: `sample_id` followed by one indicator
/// column per compound class.
#[derive(Debug, Clone)]
pub struct LabelTable {
    /// Full header, including the id column.
    pub header: Vec<String>,
    pub rows: Vec<LabelRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelRow {
    pub sample_id: String,
    /// Indicator values, aligned with [`LabelTable::class_names`].
    pub indicators: Vec<f64>,
}

impl LabelRow {
    /// Number of compounds present in the sample.
    pub fn n_comp(&self) -> f64 {
        self.indicators.iter().sum()
    }
}

impl LabelTable {
    /// Class columns (everything after the id column).
    pub fn class_names(&self) -> &[String] {
        self.header.get(1..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Compare this table's header with the submission format's header.
    pub fn column_alignment(&self, submission_header: &[String]) -> ColumnAlignment {
        let missing_in_submission = self
            .header
            .iter()
            .filter(|c| !submission_header.contains(c))
            .cloned()
            .collect();
        let missing_in_labels = submission_header
            .iter()
            .filter(|c| !self.header.contains(c))
            .cloned()
            .collect();
        ColumnAlignment {
            ordered_match: self.header.as_slice() == submission_header,
            missing_in_submission,
            missing_in_labels,
        }
    }
}

/// Result of comparing the label header against the submission header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnAlignment {
    /// Same columns in the same order.
    pub ordered_match: bool,
    pub missing_in_submission: Vec<String>,
    pub missing_in_labels: Vec<String>,
}
