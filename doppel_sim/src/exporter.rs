//! JSON exporter for harness reports.

use crate::runner::ScenarioResult;
use doppel_core::Double;
use serde::Serialize;
use std::fs::File;
use std::io::Write;

/// The recorded ledger of one double.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerSample {
    /// Diagnostic name of the double
    pub double: String,

    /// Arguments of every call, in call order
    pub calls: Vec<Vec<serde_json::Value>>,
}

impl LedgerSample {
    /// Snapshots a double's ledger.
    pub fn from_double(double: &Double) -> Self {
        Self {
            double: double.name(),
            calls: double
                .call_args_list()
                .iter()
                .map(|args| args.iter().map(|v| v.to_json()).collect())
                .collect(),
        }
    }
}

/// Complete harness report.
#[derive(Debug, Clone, Serialize)]
pub struct SimExport {
    /// First seed of the run
    pub base_seed: u64,

    /// Per-scenario results
    pub results: Vec<ScenarioResult>,

    /// Sample ledgers for inspection
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<LedgerSample>,

    /// True if every result passed
    pub passed: bool,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(base_seed: u64) -> Self {
        Self {
            base_seed,
            results: Vec::new(),
            samples: Vec::new(),
            passed: true,
        }
    }

    /// Adds a result.
    pub fn add_result(&mut self, result: ScenarioResult) {
        self.passed &= result.passed;
        self.results.push(result);
    }

    /// Adds a sample ledger.
    pub fn add_sample(&mut self, double: &Double) {
        self.samples.push(LedgerSample::from_double(double));
    }

    /// Number of failed results.
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed).count()
    }

    /// Serializes the report.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> std::io::Result<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ScenarioRunner;
    use crate::scenarios::ScenarioId;
    use doppel_core::args;

    #[test]
    fn test_sample_renders_arguments_as_json() {
        let mock = Double::named("api");
        mock.set_return_value(());
        mock.call(args![1, "x"]).unwrap();
        mock.call(args![]).unwrap();

        let sample = LedgerSample::from_double(&mock);
        assert_eq!(sample.double, "api");
        assert_eq!(
            serde_json::to_value(&sample.calls).unwrap(),
            serde_json::json!([[1.0, "x"], []])
        );
    }

    #[test]
    fn test_export_tracks_failures() {
        let mut export = SimExport::new(42);
        let runner = ScenarioRunner::new(42).with_calls(4);
        export.add_result(runner.run(ScenarioId::LedgerOrder));
        assert!(export.passed);

        let mut failed = runner.run(ScenarioId::YieldDrain);
        failed.passed = false;
        export.add_result(failed);
        assert!(!export.passed);
        assert_eq!(export.failed_count(), 1);

        let json = export.to_json().unwrap();
        assert!(json.contains("\"ledger_order\""));
        assert!(!json.contains("samples"));
    }
}
