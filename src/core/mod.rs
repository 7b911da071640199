// src/core/mod.rs

// Root of the scanning engine: data model, target validation, rule tables,
// scoring, module execution and the probing modules themselves.

/// Data structures shared across the application, such as `ScanReport`,
/// `Finding` and `ModuleResult`.
pub mod models;

/// Error taxonomy for target validation, probes and orchestration.
pub mod error;

/// Validation of the user-supplied target.
pub mod target;

/// Static lookup tables used by the probing modules.
pub mod knowledge_base;

/// Category scoring, risk level and executive ranking.
pub mod risk_scorer;

/// Failure-isolating executor for a single probing module.
pub mod runner;

/// The probe contract, the five probing modules and the scan orchestrator.
pub mod scanner;
