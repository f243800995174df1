/// Peak layer: detection, classification, and tabular export.
///
/// Architecture:
/// ```text
///   Series ──► detect ──► PeakSet ──► classify ──► Vec<ClassifiedPeak>
///                            │                          │
///                            ▼                          ▼
///                      export (raw list)      export (publication table)
/// ```

pub mod classify;
pub mod detect;
pub mod export;
