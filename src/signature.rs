//! Signature builder: collapse a time-indexed recording into a normalized,
//! mass-indexed intensity profile on a shared grid.
//!
//! ```text
//!   Sample ──reduce_precision──► ReducedSample ──build_signature──► MassSignature
//!                                      │                 ▲
//!                                      └── aggregate ────┘ + MassGrid
//! ```

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use crate::data::model::{
    checked_mass_to_tick, mass_to_tick, tick_to_mass, MassTick, ReducedEvent, ReducedSample,
    Sample, MAX_DIGITS,
};
use crate::error::SignatureError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Precision and grid bounds handed to the builder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignatureConfig {
    /// Decimal digits kept on mass values (detector tolerance).
    pub digits: u32,
    pub mass_min: f64,
    pub mass_max: f64,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            digits: 2,
            mass_min: 5.0,
            mass_max: 600.0,
        }
    }
}

impl SignatureConfig {
    pub fn grid(&self) -> Result<MassGrid, SignatureError> {
        MassGrid::new(self.mass_min, self.mass_max, self.digits)
    }
}

// ---------------------------------------------------------------------------
// MassGrid – canonical, evenly spaced masses
// ---------------------------------------------------------------------------

/// Upper bound on grid size; 5..600 at four digits is just under 6M.
pub const MAX_GRID_TICKS: usize = 10_000_000;

/// Evenly spaced masses from `min` to `max` inclusive, one step per
/// `10^-digits`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MassGrid {
    digits: u32,
    first: MassTick,
    last: MassTick,
    len: usize,
}

impl MassGrid {
    pub fn new(min: f64, max: f64, digits: u32) -> Result<Self, SignatureError> {
        if !min.is_finite() || !max.is_finite() {
            return Err(SignatureError::InvalidGrid(format!(
                "bounds must be finite, got {min}..={max}"
            )));
        }
        if min > max {
            return Err(SignatureError::InvalidGrid(format!(
                "lower bound {min} exceeds upper bound {max}"
            )));
        }
        if digits > MAX_DIGITS {
            return Err(SignatureError::InvalidGrid(format!(
                "{digits} mass digits requested, at most {MAX_DIGITS} are supported"
            )));
        }
        let out_of_range = |mass: f64| {
            SignatureError::InvalidGrid(format!("bound {mass} does not fit at {digits} digits"))
        };
        let first = checked_mass_to_tick(min, digits).ok_or_else(|| out_of_range(min))?;
        let last = checked_mass_to_tick(max, digits).ok_or_else(|| out_of_range(max))?;

        let len = last
            .checked_sub(first)
            .and_then(|span| span.checked_add(1))
            .and_then(|n| usize::try_from(n).ok())
            .filter(|&n| n <= MAX_GRID_TICKS)
            .ok_or_else(|| {
                SignatureError::InvalidGrid(format!(
                    "{min}..={max} at {digits} digits exceeds {MAX_GRID_TICKS} masses"
                ))
            })?;

        Ok(MassGrid {
            digits,
            first,
            last,
            len,
        })
    }

    pub fn digits(&self) -> u32 {
        self.digits
    }

    pub fn ticks(&self) -> RangeInclusive<MassTick> {
        self.first..=self.last
    }

    pub fn masses(&self) -> impl Iterator<Item = f64> + '_ {
        self.ticks().map(move |t| tick_to_mass(t, self.digits))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// ---------------------------------------------------------------------------
// MassSignature – the builder's output
// ---------------------------------------------------------------------------

/// Normalized intensity per mass, ascending by mass, values in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct MassSignature {
    pub sample_id: String,
    digits: u32,
    values: Vec<(MassTick, f64)>,
}

impl MassSignature {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn ticks(&self) -> impl Iterator<Item = MassTick> + '_ {
        self.values.iter().map(|&(t, _)| t)
    }

    /// (mass, intensity) pairs in ascending mass order.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.values
            .iter()
            .map(move |&(t, v)| (tick_to_mass(t, self.digits), v))
    }

    /// Intensity at a mass, after rounding the query to the signature's precision.
    pub fn intensity_at(&self, mass: f64) -> Option<f64> {
        let tick = mass_to_tick(mass, self.digits);
        self.values
            .binary_search_by(|(t, _)| t.cmp(&tick))
            .ok()
            .map(|i| self.values[i].1)
    }

    pub fn max_intensity(&self) -> f64 {
        self.values.iter().map(|&(_, v)| v).fold(0.0, f64::max)
    }

    pub fn min_intensity(&self) -> f64 {
        self.values.iter().map(|&(_, v)| v).fold(f64::INFINITY, f64::min)
    }
}

// ---------------------------------------------------------------------------
// Transform
// ---------------------------------------------------------------------------

/// Round every mass of `sample` to `digits` decimals.
///
/// Fails with [`SignatureError::MassOutOfRange`] on a NaN, infinite, or
/// unrepresentably large mass.
pub fn reduce_precision(sample: &Sample, digits: u32) -> Result<ReducedSample, SignatureError> {
    let events = sample
        .events
        .iter()
        .map(|e| {
            let tick = checked_mass_to_tick(e.mass, digits).ok_or_else(|| {
                SignatureError::MassOutOfRange {
                    sample_id: sample.id.clone(),
                    mass: e.mass,
                    digits,
                }
            })?;
            Ok(ReducedEvent {
                time: e.time,
                tick,
                intensity: e.intensity,
            })
        })
        .collect::<Result<Vec<_>, SignatureError>>()?;
    Ok(ReducedSample {
        id: sample.id.clone(),
        digits,
        events,
    })
}

/// Sum intensities of events sharing a rounded mass.
///
/// Rows are summed in (mass, intensity) order so the totals do not depend on
/// the order events were recorded in.
pub fn aggregate(reduced: &ReducedSample) -> BTreeMap<MassTick, f64> {
    let mut rows: Vec<(MassTick, f64)> = reduced
        .events
        .iter()
        .map(|e| (e.tick, e.intensity))
        .collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));

    let mut totals = BTreeMap::new();
    for (tick, intensity) in rows {
        *totals.entry(tick).or_insert(0.0) += intensity;
    }
    totals
}

/// Build the time-independent signature of one reduced sample.
///
/// Observed masses outside the grid are kept; grid masses with no data are
/// filled with 0.0. Fails with [`SignatureError::ZeroSignal`] when the
/// maximum aligned intensity is not strictly positive.
pub fn build_signature(
    reduced: &ReducedSample,
    grid: &MassGrid,
) -> Result<MassSignature, SignatureError> {
    if reduced.digits != grid.digits() {
        return Err(SignatureError::PrecisionMismatch {
            sample_id: reduced.id.clone(),
            sample_digits: reduced.digits,
            grid_digits: grid.digits(),
        });
    }

    let totals = aggregate(reduced);
    if let Some((&tick, _)) = totals.iter().find(|(_, v)| !v.is_finite()) {
        return Err(SignatureError::NonFiniteIntensity {
            sample_id: reduced.id.clone(),
            mass: tick_to_mass(tick, reduced.digits),
        });
    }

    let mut aligned: BTreeMap<MassTick, f64> = grid.ticks().map(|t| (t, 0.0)).collect();
    aligned.extend(totals);

    let max = aligned.values().copied().fold(f64::NEG_INFINITY, f64::max);
    if max <= 0.0 || !max.is_finite() {
        return Err(SignatureError::ZeroSignal {
            sample_id: reduced.id.clone(),
            max: if max.is_finite() { max } else { 0.0 },
        });
    }

    let values = aligned
        .into_iter()
        .map(|(tick, v)| (tick, (v / max).clamp(0.0, 1.0)))
        .collect();

    Ok(MassSignature {
        sample_id: reduced.id.clone(),
        digits: reduced.digits,
        values,
    })
}

/// Convenience: reduce and build in one step with an explicit config.
pub fn signature_of(sample: &Sample, config: &SignatureConfig) -> Result<MassSignature, SignatureError> {
    let grid = config.grid()?;
    build_signature(&reduce_precision(sample, config.digits)?, &grid)
}
