//! The interception interface every double implements.

use crate::error::DoubleError;
use crate::value::{TypeTag, Value};

/// The operations a double intercepts.
///
/// Code that needs to treat a double as "some object" goes through this
/// trait instead of relying on the concrete type, which is what lets a
/// double pretend to be another type.
///
/// # Implementations
///
/// - [`Double`](crate::Double): records calls and auto-creates children
pub trait Interceptor {
    /// Invokes the value as a function.
    ///
    /// The call is recorded before the result is resolved.
    fn invoke(&self, args: Vec<Value>) -> Result<Value, DoubleError>;

    /// Invokes the value as a constructor.
    ///
    /// Construction is not a call: it never consults the return value or the
    /// side effect and is not recorded in the call ledger.
    fn construct(&self, args: Vec<Value>) -> Value;

    /// Reads a property, creating a child on first read of an unset key.
    fn get_property(&self, key: &str) -> Value;

    /// Stores a property verbatim.
    fn set_property(&self, key: &str, value: Value);

    /// Returns true if the value reports itself as an instance of `candidate`.
    fn check_identity(&self, candidate: &TypeTag) -> bool;

    /// Reassigns the underlying type identity.
    ///
    /// # Returns
    /// * `Err(DoubleError::IllegalMutation)` - doubles change identity only
    ///   through their identity override
    fn set_prototype(&self, prototype: TypeTag) -> Result<(), DoubleError>;
}
