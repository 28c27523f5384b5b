//! Doppel Deterministic Scenario Harness
//!
//! Drives test doubles through scripted call sequences and checks the
//! guarantees tests rely on:
//! - **Ledger**: calls are recorded append-only, in order
//! - **Memoization**: attribute children and return values are created once
//! - **Resolution**: side effects drain, raise their errors, then exhaust
//! - **Identity**: overrides replace the native identity
//! - **Iteration**: yields stop at the first error and are single-pass
//!
//! Every script is drawn from a ChaCha8 stream seeded by one `u64`, so any
//! failure is reproduced by its seed.
//!
//! # Usage
//!
//! ```
//! use doppel_sim::{ScenarioId, ScenarioRunner};
//!
//! let runner = ScenarioRunner::new(42).with_calls(8);
//! let result = runner.run(ScenarioId::LedgerOrder);
//! assert!(result.passed);
//! ```

mod config;
mod error;
mod exporter;
mod runner;
pub mod scenarios;
mod script;

pub use config::SimConfig;
pub use error::SimError;
pub use exporter::{LedgerSample, SimExport};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;
pub use script::ScriptGenerator;
