/// Data layer: series types, loading, and window selection.
///
/// Architecture:
/// ```text
///  .CSV / .xy / .TXT
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → LoadedSeries (Series + Metadata)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  range    │  [low, high] → snapped sample indices
///   └──────────┘
/// ```

pub mod loader;
pub mod model;
pub mod range;
