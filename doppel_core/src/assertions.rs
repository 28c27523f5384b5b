//! Assertions over the call ledger.
//!
//! Each assertion returns `Err(DoubleError::AssertionFailure)` describing the
//! expected and actual calls instead of a boolean, so a failing check can be
//! propagated straight into a test report with `?`. Arguments are compared
//! positionally: a missing or extra trailing argument is a mismatch.

use crate::double::Double;
use crate::error::DoubleError;
use crate::value::{format_call, format_calls, Value};

impl Double {
    /// Passes if the most recent call had exactly these arguments.
    pub fn assert_called_with(&self, expected: &[Value]) -> Result<(), DoubleError> {
        match self.call_args() {
            Some(actual) if actual == expected => Ok(()),
            Some(actual) => Err(DoubleError::assertion(
                "assert_called_with",
                format!("{}{}", self.name(), format_call(expected)),
                format!("{}{}", self.name(), format_call(&actual)),
            )),
            None => Err(DoubleError::assertion(
                "assert_called_with",
                format!("{}{}", self.name(), format_call(expected)),
                "not called",
            )),
        }
    }

    /// Passes if the double was called exactly once, with these arguments.
    pub fn assert_called_once_with(&self, expected: &[Value]) -> Result<(), DoubleError> {
        let calls = self.call_args_list();
        if calls.len() != 1 {
            return Err(DoubleError::assertion(
                "assert_called_once_with",
                format!("1 call {}{}", self.name(), format_call(expected)),
                format!("{} calls {}", calls.len(), format_calls(&calls)),
            ));
        }
        if calls[0] != expected {
            return Err(DoubleError::assertion(
                "assert_called_once_with",
                format!("{}{}", self.name(), format_call(expected)),
                format!("{}{}", self.name(), format_call(&calls[0])),
            ));
        }
        Ok(())
    }

    /// Passes if any recorded call had exactly these arguments.
    pub fn assert_any_call(&self, expected: &[Value]) -> Result<(), DoubleError> {
        let calls = self.call_args_list();
        if calls.iter().any(|call| call == expected) {
            return Ok(());
        }
        Err(DoubleError::assertion(
            "assert_any_call",
            format!("{}{}", self.name(), format_call(expected)),
            format_calls(&calls),
        ))
    }

    /// Passes if the double was never called.
    pub fn assert_not_called(&self) -> Result<(), DoubleError> {
        let calls = self.call_args_list();
        if calls.is_empty() {
            return Ok(());
        }
        Err(DoubleError::assertion(
            "assert_not_called",
            format!("{} not called", self.name()),
            format!("{} calls {}", calls.len(), format_calls(&calls)),
        ))
    }

    /// Passes if the ledger contains `expected`.
    ///
    /// In order, the run must be contiguous and start at the *first* call
    /// equal to `expected[0]`; a later start is never tried. An empty
    /// expectation passes only if the double was called.
    ///
    /// With `any_order`, every expected call must match some recorded call;
    /// one recorded call may satisfy several expected calls.
    pub fn assert_has_calls(
        &self,
        expected: &[Vec<Value>],
        any_order: bool,
    ) -> Result<(), DoubleError> {
        let calls = self.call_args_list();
        let failure = || {
            DoubleError::assertion(
                "assert_has_calls",
                format_calls(expected),
                format_calls(&calls),
            )
        };

        if any_order {
            return if expected
                .iter()
                .all(|want| calls.iter().any(|call| call == want))
            {
                Ok(())
            } else {
                Err(failure())
            };
        }

        let Some(first) = expected.first() else {
            return if calls.is_empty() { Err(failure()) } else { Ok(()) };
        };
        let Some(start) = calls.iter().position(|call| call == first) else {
            return Err(failure());
        };
        match calls.get(start..start + expected.len()) {
            Some(window) if window == expected => Ok(()),
            _ => Err(failure()),
        }
    }
}
