//! The dynamic value model doubles record and return.
//!
//! Doubles stand in for arbitrary code, so arguments, return values and
//! attributes are all carried as [`Value`]: plain data, other doubles,
//! callables and error values.

use crate::double::Double;
use crate::error::{DoubleError, ErrorValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Builds an argument list from heterogeneous expressions.
///
/// ```
/// use doppel_core::{args, Double};
///
/// let mock = Double::new();
/// mock.call(args![1, "a", true]).unwrap();
/// mock.assert_called_with(&args![1, "a", true]).unwrap();
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        vec![$($crate::Value::from($arg)),+]
    };
}

/// A type identity a value can report itself as.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeTag(String);

impl TypeTag {
    /// Creates a tag for the named type.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The native type every double reports unless overridden.
    pub fn double() -> Self {
        Self::new("Double")
    }

    /// Returns the type name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TypeTag {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TypeTag {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

type CallFn = dyn Fn(&[Value]) -> Result<Value, DoubleError>;

/// A shared callable value. Equality is reference identity.
#[derive(Clone)]
pub struct Callable(Rc<CallFn>);

impl Callable {
    /// Wraps a closure as a callable value.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, DoubleError> + 'static,
    {
        Self(Rc::new(f))
    }

    /// Wraps a double so invoking the callable calls the double.
    pub fn from_double(double: Double) -> Self {
        Self::new(move |args| double.call(args.to_vec()))
    }

    /// Invokes the callable.
    pub fn call(&self, args: &[Value]) -> Result<Value, DoubleError> {
        (self.0)(args)
    }

    /// Returns true if both handles refer to the same closure.
    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callable(..)")
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

/// A dynamically typed value.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
    Double(Double),
    Function(Callable),
    Error(ErrorValue),
}

impl Value {
    /// Wraps a closure as a function value.
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, DoubleError> + 'static,
    {
        Value::Function(Callable::new(f))
    }

    /// Builds an object value from key/value pairs.
    pub fn object<K, V, I>(entries: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        Value::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<&Double> {
        match self {
            Value::Double(d) => Some(d),
            _ => None,
        }
    }

    pub fn into_double(self) -> Option<Double> {
        match self {
            Value::Double(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorValue> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true for values that can be invoked: functions and doubles.
    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Double(_))
    }

    /// Returns the callable behind a function or double value.
    pub fn to_callable(&self) -> Option<Callable> {
        match self {
            Value::Function(f) => Some(f.clone()),
            Value::Double(d) => Some(Callable::from_double(d.clone())),
            _ => None,
        }
    }

    /// Returns the type this value reports itself as.
    ///
    /// Doubles report their identity override when one is set; errors report
    /// their kind.
    pub fn type_tag(&self) -> TypeTag {
        match self {
            Value::Undefined => TypeTag::new("undefined"),
            Value::Null => TypeTag::new("null"),
            Value::Bool(_) => TypeTag::new("Boolean"),
            Value::Number(_) => TypeTag::new("Number"),
            Value::Str(_) => TypeTag::new("String"),
            Value::List(_) => TypeTag::new("Array"),
            Value::Object(_) => TypeTag::new("Object"),
            Value::Double(d) => d.type_tag(),
            Value::Function(_) => TypeTag::new("Function"),
            Value::Error(e) => TypeTag::new(e.kind.clone()),
        }
    }

    /// Identity check that consuming code should use instead of matching on
    /// the variant, so doubles with an identity override are honored.
    pub fn is_instance_of(&self, tag: &TypeTag) -> bool {
        match self {
            Value::Double(d) => d.is_instance_of(tag),
            Value::Error(e) => e.kind == tag.name() || tag.name() == "Error",
            other => other.type_tag() == *tag,
        }
    }

    /// Converts to JSON for reports. Doubles and functions become labels.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Undefined | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::Str(s) => Json::String(s.clone()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Object(map) => Json::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            other => Json::String(other.to_string()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Error(a), Value::Error(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Str(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                f.write_str("[")?;
                write_joined(f, items.iter())?;
                f.write_str("]")
            }
            Value::Object(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
            Value::Double(d) => write!(f, "{}", d),
            Value::Function(_) => f.write_str("[Function]"),
            Value::Error(e) => write!(f, "{}", e),
        }
    }
}

fn write_joined<'a>(
    f: &mut fmt::Formatter<'_>,
    items: impl Iterator<Item = &'a Value>,
) -> fmt::Result {
    for (i, item) in items.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Renders an argument list the way it would appear at a call site.
pub fn format_call(args: &[Value]) -> String {
    let rendered: Vec<String> = args.iter().map(ToString::to_string).collect();
    format!("({})", rendered.join(", "))
}

/// Renders a list of calls for assertion messages.
pub fn format_calls(calls: &[Vec<Value>]) -> String {
    let rendered: Vec<String> = calls.iter().map(|c| format_call(c)).collect();
    format!("[{}]", rendered.join(", "))
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Undefined
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! number_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(n as f64)
                }
            }
        )*
    };
}

number_from!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Undefined)
    }
}

impl From<Double> for Value {
    fn from(d: Double) -> Self {
        Value::Double(d)
    }
}

impl From<&Double> for Value {
    fn from(d: &Double) -> Self {
        Value::Double(d.clone())
    }
}

impl From<Callable> for Value {
    fn from(f: Callable) -> Self {
        Value::Function(f)
    }
}

impl From<ErrorValue> for Value {
    fn from(e: ErrorValue) -> Self {
        Value::Error(e)
    }
}
