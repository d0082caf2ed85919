/// Data layer: labelled samples, feature archive, and pure-compound selection.
///
/// Architecture:
/// ```text
///  train_labels.csv   submission_format.csv   train_features.zip
///        │                    │                      │
///        ▼                    ▼                      ▼
///   ┌────────────────────────────────────────────────────┐
///   │  loader   LabelTable · header · FeatureArchive     │
///   └────────────────────────────────────────────────────┘
///        │                                           │
///        ▼                                           ▼
///   ┌──────────┐                              ┌───────────┐
///   │  filter   │  pure rows → CompoundGroup   │  Sample   │
///   └──────────┘                              └───────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
