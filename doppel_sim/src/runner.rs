//! Scenario runner - drives doubles through seeded scripts and checks their
//! guarantees.

use crate::error::{ensure, SimError};
use crate::scenarios::ScenarioId;
use crate::script::ScriptGenerator;

use doppel_core::{
    format_call, format_calls, Double, DoubleError, ErrorValue, Interceptor, TypeTag, Value,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether every check held
    pub passed: bool,

    /// Calls made on doubles during the run
    pub calls: u64,

    /// Failure message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// Runs scenarios for one seed.
pub struct ScenarioRunner {
    /// Script seed
    seed: u64,

    /// Calls per scripted ledger
    calls_per_run: usize,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            calls_per_run: 32,
        }
    }

    /// Sets the number of calls per scripted ledger.
    pub fn with_calls(mut self, calls: usize) -> Self {
        self.calls_per_run = calls.max(1);
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let mut script = ScriptGenerator::new(self.seed);
        let outcome = match scenario {
            ScenarioId::LedgerOrder => self.run_ledger_order(&mut script),
            ScenarioId::AttributeMemo => self.run_attribute_memo(&mut script),
            ScenarioId::SideEffectDrain => self.run_side_effect_drain(&mut script),
            ScenarioId::HasCallsWindow => self.run_has_calls_window(&mut script),
            ScenarioId::IdentitySpoof => self.run_identity_spoof(&mut script),
            ScenarioId::YieldDrain => self.run_yield_drain(&mut script),
        };

        match outcome {
            Ok(calls) => ScenarioResult {
                scenario,
                seed: self.seed,
                passed: true,
                calls,
                failure_reason: None,
            },
            Err(e) => {
                warn!("{} (seed={}) failed: {}", scenario.name(), self.seed, e);
                ScenarioResult {
                    scenario,
                    seed: self.seed,
                    passed: false,
                    calls: 0,
                    failure_reason: Some(e.to_string()),
                }
            }
        }
    }

    /// Builds a double whose ledger holds this seed's call script.
    pub fn sample_ledger(&self) -> Result<Double, SimError> {
        let mut script = ScriptGenerator::new(self.seed);
        let mock = Double::named("sample");
        mock.set_return_value(());
        for args in script.calls(self.calls_per_run) {
            mock.call(args)?;
        }
        Ok(mock)
    }

    /// Runs every given scenario.
    pub fn run_all(&self, scenarios: &[ScenarioId]) -> Vec<ScenarioResult> {
        scenarios.iter().map(|s| self.run(*s)).collect()
    }

    /// The ledger replays the script exactly, and the assertions agree.
    fn run_ledger_order(&self, script: &mut ScriptGenerator) -> Result<u64, SimError> {
        let mock = Double::named("ledger");
        mock.set_return_value(());
        let target: &dyn Interceptor = &mock;

        let calls = script.calls(self.calls_per_run);
        for (i, args) in calls.iter().enumerate() {
            target.invoke(args.clone())?;
            ensure(mock.call_count() == i + 1, || {
                format!("call_count {} after {} calls", mock.call_count(), i + 1)
            })?;
        }

        let ledger = mock.call_args_list();
        ensure(ledger == calls, || {
            format!("ledger {} != script {}", format_calls(&ledger), format_calls(&calls))
        })?;
        ensure(mock.call_args().as_ref() == calls.last(), || {
            "call_args is not the last call".to_string()
        })?;

        let last = &calls[calls.len() - 1];
        mock.assert_called_with(last)?;
        let past = &calls[script.index(calls.len())];
        mock.assert_any_call(past)?;

        debug!("  ledger of {} calls replayed", ledger.len());
        Ok(calls.len() as u64)
    }

    /// Random attribute walks always land on the same children.
    fn run_attribute_memo(&self, script: &mut ScriptGenerator) -> Result<u64, SimError> {
        let root = Double::named("root");
        let mut seen: HashMap<String, Double> = HashMap::new();
        let mut calls = 0u64;

        for _ in 0..self.calls_per_run {
            let path = script.path();
            let mut node = root.clone();
            for depth in 0..path.len() {
                let key = path[..=depth].join(".");
                let next = node
                    .get_property(path[depth])
                    .into_double()
                    .ok_or_else(|| SimError::invariant(format!("{} is not a double", key)))?;
                if let Some(previous) = seen.get(&key) {
                    ensure(previous.ptr_eq(&next), || format!("{} was created twice", key))?;
                } else {
                    ensure(next.name() == format!("root.{}", key), || {
                        format!("{} is named {}", key, next.name())
                    })?;
                    seen.insert(key, next.clone());
                }
                node = next;
            }

            if script.chance(0.25) {
                let args = script.args();
                node.call(args.clone())?;
                calls += 1;
                let path = path.join(".");
                let recorded = root.method_calls();
                let last = recorded.last().map(|m| (m.path.as_str(), &m.args));
                ensure(last == Some((path.as_str(), &args)), || {
                    format!("root did not record {}{}", path, format_call(&args))
                })?;
            }
        }

        ensure(root.get("inspect").is_undefined(), || {
            "introspection key was auto-created".to_string()
        })?;

        debug!("  {} distinct attribute paths", seen.len());
        Ok(calls)
    }

    /// Side-effect lists yield values, raise their errors, then exhaust.
    fn run_side_effect_drain(&self, script: &mut ScriptGenerator) -> Result<u64, SimError> {
        let mock = Double::named("effect");
        mock.set_return_value("shadowed");

        let planned: Vec<Value> = (0..self.calls_per_run)
            .map(|i| {
                if script.chance(0.2) {
                    ErrorValue::new("ScriptError", format!("planned failure {}", i)).into()
                } else {
                    script.value()
                }
            })
            .collect();
        mock.set_side_effect(planned.clone());

        for (i, expected) in planned.iter().enumerate() {
            let outcome = mock.call(script.args());
            match (expected, outcome) {
                (Value::Error(e), Err(DoubleError::Configured(raised))) => {
                    ensure(*e == raised, || format!("call {} raised {} not {}", i, raised, e))?;
                }
                (expected, Ok(actual)) => {
                    ensure(*expected == actual, || {
                        format!("call {} returned {} not {}", i, actual, expected)
                    })?;
                }
                (expected, Err(err)) => {
                    return Err(SimError::invariant(format!(
                        "call {} failed with {} instead of producing {}",
                        i, err, expected
                    )));
                }
            }
        }

        match mock.call(script.args()) {
            Err(DoubleError::SideEffectExhausted { .. }) => {}
            other => {
                return Err(SimError::invariant(format!(
                    "drained side effect produced {:?}",
                    other
                )))
            }
        }

        Ok(planned.len() as u64 + 1)
    }

    /// Windows starting at the first occurrence of their head pass in order;
    /// calls never made fail in both modes.
    fn run_has_calls_window(&self, script: &mut ScriptGenerator) -> Result<u64, SimError> {
        let mock = Double::named("window");
        mock.set_return_value(());
        let calls = script.calls(self.calls_per_run);
        for args in &calls {
            mock.call(args.clone())?;
        }

        let start = script.index(calls.len());
        let first = calls
            .iter()
            .position(|c| *c == calls[start])
            .unwrap_or(start);
        let len = 1 + script.index(calls.len() - first);
        let window = &calls[first..first + len];
        mock.assert_has_calls(window, false)?;

        let mut sample: Vec<Vec<Value>> = (0..len)
            .map(|_| calls[script.index(calls.len())].clone())
            .collect();
        mock.assert_has_calls(&sample, true)?;

        // Scripts never produce this argument
        sample.push(vec![Value::from("never-called")]);
        ensure(mock.assert_has_calls(&sample, true).is_err(), || {
            "any-order check accepted a call never made".to_string()
        })?;
        ensure(
            mock.assert_has_calls(&[vec![Value::from("never-called")]], false).is_err(),
            || "ordered check accepted a call never made".to_string(),
        )?;

        Ok(calls.len() as u64)
    }

    /// An override replaces the native identity until cleared.
    fn run_identity_spoof(&self, script: &mut ScriptGenerator) -> Result<u64, SimError> {
        let mock = Double::named("spoof");
        let native = TypeTag::double();

        for _ in 0..self.calls_per_run {
            let tag = TypeTag::new(script.type_name());
            let other = TypeTag::new(script.type_name());
            mock.set_spec(tag.clone());

            ensure(mock.check_identity(&tag), || format!("not reported as {}", tag))?;
            ensure(!mock.check_identity(&native), || {
                format!("still reported as {} under {}", native, tag)
            })?;
            ensure(other == tag || !mock.check_identity(&other), || {
                format!("reported as both {} and {}", tag, other)
            })?;

            match Interceptor::set_prototype(&mock, other.clone()) {
                Err(DoubleError::IllegalMutation(_)) => {}
                result => {
                    return Err(SimError::invariant(format!(
                        "prototype reassignment returned {:?}",
                        result
                    )))
                }
            }

            if script.chance(0.5) {
                mock.clear_spec();
                ensure(mock.check_identity(&native), || {
                    "native identity not restored".to_string()
                })?;
            }
        }

        Ok(0)
    }

    /// Yields stop at the first error and cannot be replayed.
    fn run_yield_drain(&self, script: &mut ScriptGenerator) -> Result<u64, SimError> {
        let mock = Double::named("stream");
        let mut planned: Vec<Value> = (0..self.calls_per_run).map(|_| script.value()).collect();
        let fail_at = if script.chance(0.5) {
            let at = script.index(planned.len());
            planned[at] = ErrorValue::new("StreamError", "cut").into();
            Some(at)
        } else {
            None
        };
        mock.set_yields(planned.clone());

        let (values, error) = mock.drain_yields();
        let produced = fail_at.unwrap_or(planned.len());
        ensure(values[..] == planned[..produced], || {
            format!("yielded {} values, expected {}", values.len(), produced)
        })?;
        ensure(error.is_some() == fail_at.is_some(), || {
            format!("error raised: {:?}, planned at {:?}", error, fail_at)
        })?;

        let (again, error) = mock.drain_yields();
        ensure(again.is_empty() && error.is_none(), || {
            "consumed yield source produced values again".to_string()
        })?;

        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_scenarios_pass_for_several_seeds() {
        for seed in [1, 42, 1337, 0xdead_beef] {
            let runner = ScenarioRunner::new(seed).with_calls(16);
            for result in runner.run_all(&ScenarioId::all()) {
                assert!(
                    result.passed,
                    "{} seed={} failed: {:?}",
                    result.scenario, seed, result.failure_reason
                );
            }
        }
    }

    #[test]
    fn test_runs_are_deterministic() {
        let a = ScenarioRunner::new(42).run(ScenarioId::AttributeMemo);
        let b = ScenarioRunner::new(42).run(ScenarioId::AttributeMemo);
        assert_eq!(a.calls, b.calls);
        assert_eq!(a.passed, b.passed);
    }

    #[test]
    fn test_single_call_runs() {
        let runner = ScenarioRunner::new(9).with_calls(0);
        for result in runner.run_all(&ScenarioId::all()) {
            assert!(result.passed, "{:?}", result.failure_reason);
        }
    }
}
