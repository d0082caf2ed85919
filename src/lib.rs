//! Exploratory analysis of labelled mass-spectrometry samples: pure-compound
//! selection, time-independent mass signatures, and per-class plots.

pub mod analysis;
pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod plot;
pub mod signature;
