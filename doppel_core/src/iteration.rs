//! Iteration protocol: what iterating a double produces.
//!
//! Configured through `yields`:
//! - a callable is a generator factory, invoked once per iteration
//! - a list or iterator is drained once; later iterations are empty
//! - a scalar is a one-element sequence
//!
//! An error element ends iteration by raising it, after every element
//! before it has been produced.

use crate::double::{Double, Sequence};
use crate::error::DoubleError;
use crate::value::Value;
use std::rc::Rc;

type Factory = dyn Fn() -> Result<Sequence, DoubleError>;

pub(crate) enum YieldSource {
    Factory(Rc<Factory>),
    /// `None` once an iteration has taken the sequence.
    Sequence(Option<Sequence>),
}

fn into_sequence(value: Value) -> Sequence {
    match value {
        Value::List(items) => Box::new(items.into_iter()),
        other => Box::new(std::iter::once(other)),
    }
}

impl Double {
    /// Configures iteration from a value.
    ///
    /// `Value::Undefined` clears the configuration.
    pub fn set_yields(&self, value: impl Into<Value>) {
        let value = value.into();
        let source = if value.is_undefined() {
            None
        } else if let Some(f) = value.to_callable() {
            let factory = move || f.call(&[]).map(into_sequence);
            Some(YieldSource::Factory(Rc::new(factory)))
        } else {
            Some(YieldSource::Sequence(Some(into_sequence(value))))
        };
        self.state.borrow_mut().yields = source;
    }

    /// Configures iteration from a lazy, single-pass iterator.
    pub fn set_yields_iter<I>(&self, iter: I)
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: 'static,
    {
        let seq: Sequence = Box::new(iter.into_iter().fuse());
        self.state.borrow_mut().yields = Some(YieldSource::Sequence(Some(seq)));
    }

    /// Configures iteration from a generator factory, invoked per iteration.
    pub fn set_yields_fn<F, I>(&self, factory: F)
    where
        F: Fn() -> I + 'static,
        I: IntoIterator<Item = Value>,
        I::IntoIter: 'static,
    {
        let factory = move || -> Result<Sequence, DoubleError> {
            Ok(Box::new(factory().into_iter().fuse()))
        };
        self.state.borrow_mut().yields = Some(YieldSource::Factory(Rc::new(factory)));
    }

    pub fn clear_yields(&self) {
        self.state.borrow_mut().yields = None;
    }

    /// Starts iterating the double.
    ///
    /// Without a `yields` configuration the iteration is empty.
    pub fn iter(&self) -> DoubleIter {
        let mut state = self.state.borrow_mut();
        let factory = match state.yields.as_mut() {
            Some(YieldSource::Factory(f)) => Ok(Rc::clone(f)),
            Some(YieldSource::Sequence(slot)) => Err(slot.take()),
            None => Err(None),
        };
        // The factory may call back into this double
        drop(state);

        let state = match factory {
            Ok(f) => match f() {
                Ok(seq) => IterState::Draining(seq),
                Err(e) => IterState::Failed(e),
            },
            Err(Some(seq)) => IterState::Draining(seq),
            Err(None) => IterState::Done,
        };
        DoubleIter { state }
    }

    /// Iterates to the end, collecting values up to the first error.
    pub fn drain_yields(&self) -> (Vec<Value>, Option<DoubleError>) {
        let mut values = Vec::new();
        for item in self.iter() {
            match item {
                Ok(value) => values.push(value),
                Err(e) => return (values, Some(e)),
            }
        }
        (values, None)
    }
}

enum IterState {
    Draining(Sequence),
    Failed(DoubleError),
    Done,
}

/// Iterator over a double's yields. Ends after the first error.
pub struct DoubleIter {
    state: IterState,
}

impl Iterator for DoubleIter {
    type Item = Result<Value, DoubleError>;

    fn next(&mut self) -> Option<Self::Item> {
        match std::mem::replace(&mut self.state, IterState::Done) {
            IterState::Draining(mut seq) => match seq.next() {
                Some(Value::Error(e)) => Some(Err(DoubleError::Configured(e))),
                Some(value) => {
                    self.state = IterState::Draining(seq);
                    Some(Ok(value))
                }
                None => None,
            },
            IterState::Failed(e) => Some(Err(e)),
            IterState::Done => None,
        }
    }
}

impl<'a> IntoIterator for &'a Double {
    type Item = Result<Value, DoubleError>;
    type IntoIter = DoubleIter;

    fn into_iter(self) -> DoubleIter {
        self.iter()
    }
}
