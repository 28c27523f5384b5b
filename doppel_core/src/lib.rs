//! Doppel Core - Recording Test Doubles
//!
//! A [`Double`] stands in for any function, method or object graph in a
//! test. One value is at the same time:
//! 1. **Callable**: every call is recorded, then resolved through the side
//!    effect or the return value
//! 2. **Constructible**: construction returns a configured value or a new double
//! 3. **Navigable**: reading an unknown attribute creates (once) a child double
//! 4. **Disguisable**: an identity override makes it report as another type
//! 5. **Iterable**: a `yields` configuration backs a lazy sequence
//!
//! The call ledger is then checked with the `assert_*` family.
//!
//! # Example
//!
//! ```
//! use doppel_core::{args, Double, ErrorValue, Value};
//!
//! let client = Double::named("client");
//! let send = client.child("send").unwrap();
//! send.set_side_effect(vec![Value::from("ok"), ErrorValue::new("Timeout", "slow").into()]);
//!
//! assert_eq!(send.call(args!["ping"]).unwrap(), Value::from("ok"));
//! assert!(send.call(args!["ping"]).is_err());
//!
//! send.assert_has_calls(&[args!["ping"], args!["ping"]], false).unwrap();
//! ```

mod assertions;
mod config;
mod double;
mod error;
mod intercept;
mod iteration;
mod value;

pub use config::DoubleConfig;
pub use double::{Double, MethodCall, WeakDouble};
pub use error::{DoubleError, ErrorValue};
pub use intercept::Interceptor;
pub use iteration::DoubleIter;
pub use value::{format_call, format_calls, Callable, TypeTag, Value};
