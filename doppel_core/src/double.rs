//! The double itself: call ledger, configured results and auto-created
//! children.
//!
//! # Resolution
//!
//! Every call is recorded first, then resolved in this order:
//! 1. a callable side effect is invoked with the call arguments
//! 2. a side-effect sequence yields its next element (errors are raised)
//! 3. a single error side effect is raised
//! 4. otherwise the return value is returned, created on first read
//!
//! No `RefCell` borrow is held while user code (side-effect closures,
//! side-effect iterators) runs, so that code may freely inspect or call the
//! same double.

use crate::config::DoubleConfig;
use crate::error::{DoubleError, ErrorValue};
use crate::intercept::Interceptor;
use crate::iteration::YieldSource;
use crate::value::{format_call, Callable, TypeTag, Value};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::{Rc, Weak};
use tracing::{debug, trace};
use uuid::Uuid;

/// A lazy, single-pass sequence of values.
pub(crate) type Sequence = Box<dyn Iterator<Item = Value>>;

/// A call made on an auto-created descendant, as seen from an ancestor.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// Dotted path from the recording double to the called descendant
    pub path: String,

    /// Arguments of the call
    pub args: Vec<Value>,
}

impl MethodCall {
    pub fn new(path: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            path: path.into(),
            args,
        }
    }
}

impl fmt::Display for MethodCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.path, format_call(&self.args))
    }
}

enum SideEffect {
    Function(Callable),
    /// `None` while an element is being pulled.
    Sequence(Option<Sequence>),
    Raise(ErrorValue),
}

enum Plan {
    Invoke(Callable),
    Pull,
    Raise(ErrorValue),
    Return,
}

struct ParentLink {
    parent: Weak<RefCell<DoubleState>>,
    key: String,
}

pub(crate) struct DoubleState {
    id: Uuid,
    config: DoubleConfig,

    /// Call ledger, append-only
    calls: Vec<Vec<Value>>,

    /// Constructor invocations, kept apart from calls
    constructs: Vec<Vec<Value>>,

    method_calls: Vec<MethodCall>,
    return_value: Option<Value>,
    side_effect: Option<SideEffect>,
    construct_value: Option<Value>,
    identity_override: Option<TypeTag>,
    pub(crate) yields: Option<YieldSource>,
    attributes: HashMap<String, Value>,

    /// Set only for children created by attribute access
    parent: Option<ParentLink>,
}

impl DoubleState {
    fn new(config: DoubleConfig, parent: Option<ParentLink>) -> Self {
        Self {
            id: Uuid::new_v4(),
            config,
            calls: Vec::new(),
            constructs: Vec::new(),
            method_calls: Vec::new(),
            return_value: None,
            side_effect: None,
            construct_value: None,
            identity_override: None,
            yields: None,
            attributes: HashMap::new(),
            parent,
        }
    }
}

/// A recording test double.
///
/// `Double` is a handle: clones share the same ledger and configuration, and
/// [`Double::ptr_eq`] tells whether two handles are the same double.
///
/// # Example
///
/// ```
/// use doppel_core::{args, Double, Value};
///
/// let db = Double::named("db");
/// db.child("users").unwrap().child("find").unwrap().set_return_value("alice");
///
/// let find = db.get("users").into_double().unwrap().get("find");
/// let user = find.as_double().unwrap().call(args![7]).unwrap();
///
/// assert_eq!(user, Value::from("alice"));
/// assert_eq!(db.method_calls()[0].to_string(), "users.find(7)");
/// ```
///
/// # Reference cycles
///
/// A double is freed when its last handle is dropped. A side effect that
/// captures a strong handle to its own double, or an attribute that stores
/// the double itself, forms a cycle and keeps it alive forever. Capture a
/// [`WeakDouble`] instead:
///
/// ```
/// use doppel_core::{args, Double, Value};
///
/// let counter = Double::new();
/// let handle = counter.downgrade();
/// counter.set_side_effect_fn(move |_| {
///     Ok(Value::from(handle.upgrade().map_or(0, |d| d.call_count())))
/// });
///
/// assert_eq!(counter.call(args![]).unwrap(), Value::from(1));
/// ```
#[derive(Clone)]
pub struct Double {
    pub(crate) state: Rc<RefCell<DoubleState>>,
}

/// A non-owning handle to a [`Double`], obtained from [`Double::downgrade`].
#[derive(Clone)]
pub struct WeakDouble {
    state: Weak<RefCell<DoubleState>>,
}

impl WeakDouble {
    /// Returns the double if it is still alive.
    pub fn upgrade(&self) -> Option<Double> {
        self.state.upgrade().map(|state| Double { state })
    }
}

impl fmt::Debug for WeakDouble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(WeakDouble)")
    }
}

impl Double {
    /// Creates a double with the default configuration.
    pub fn new() -> Self {
        Self::with_config(DoubleConfig::default())
    }

    /// Creates a double with a diagnostic name.
    pub fn named(name: impl Into<String>) -> Self {
        Self::with_config(DoubleConfig::named(name))
    }

    /// Creates a double from a configuration.
    pub fn with_config(config: DoubleConfig) -> Self {
        Self::from_state(DoubleState::new(config, None))
    }

    fn from_state(state: DoubleState) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
        }
    }

    /// Creates the child stored at `key`, linked back for method-call tracking.
    fn child_of(&self, key: &str) -> Double {
        let config = self.state.borrow().config.child(key);
        let link = ParentLink {
            parent: Rc::downgrade(&self.state),
            key: key.to_string(),
        };
        Double::from_state(DoubleState::new(config, Some(link)))
    }

    /// Creates an unlinked double that inherits this double's settings.
    fn detached(&self, name: String) -> Double {
        let mut config = self.state.borrow().config.clone();
        config.name = name;
        Double::with_config(config)
    }

    /// Returns the diagnostic name.
    pub fn name(&self) -> String {
        self.state.borrow().config.name.clone()
    }

    /// Returns the unique id of this double.
    pub fn id(&self) -> Uuid {
        self.state.borrow().id
    }

    /// Returns true if both handles refer to the same double.
    pub fn ptr_eq(&self, other: &Double) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }

    /// Creates a handle that does not keep the double alive.
    pub fn downgrade(&self) -> WeakDouble {
        WeakDouble {
            state: Rc::downgrade(&self.state),
        }
    }

    // ------------------------------------------------------------------
    // Calls
    // ------------------------------------------------------------------

    /// Calls the double.
    ///
    /// # Returns
    /// * `Ok(value)` - from the side effect or the return value
    /// * `Err(DoubleError::SideEffectExhausted)` - the side-effect sequence is empty
    /// * `Err(DoubleError::SideEffectRunning)` - called from inside its own
    ///   side-effect sequence
    /// * `Err(DoubleError::Configured)` - a configured error was raised
    pub fn call(&self, args: Vec<Value>) -> Result<Value, DoubleError> {
        self.record_call(&args);
        self.resolve(&args)
    }

    fn record_call(&self, args: &[Value]) {
        let mut link = {
            let mut state = self.state.borrow_mut();
            state.calls.push(args.to_vec());
            trace!(
                double = %state.config.name,
                call = state.calls.len(),
                args = %format_call(args),
                "call recorded"
            );
            state
                .parent
                .as_ref()
                .map(|p| (p.parent.clone(), p.key.clone()))
        };

        // Every ancestor sees the call under its path relative to itself
        while let Some((parent, path)) = link {
            let Some(parent) = parent.upgrade() else {
                break;
            };
            let mut state = parent.borrow_mut();
            state
                .method_calls
                .push(MethodCall::new(path.clone(), args.to_vec()));
            link = state
                .parent
                .as_ref()
                .map(|p| (p.parent.clone(), format!("{}.{}", p.key, path)));
        }
    }

    fn resolve(&self, args: &[Value]) -> Result<Value, DoubleError> {
        let plan = match &self.state.borrow().side_effect {
            Some(SideEffect::Function(f)) => Plan::Invoke(f.clone()),
            Some(SideEffect::Sequence(_)) => Plan::Pull,
            Some(SideEffect::Raise(e)) => Plan::Raise(e.clone()),
            None => Plan::Return,
        };

        match plan {
            Plan::Invoke(f) => f.call(args),
            Plan::Pull => self.pull_side_effect(),
            Plan::Raise(e) => Err(DoubleError::Configured(e)),
            Plan::Return => Ok(self.return_value()),
        }
    }

    fn pull_side_effect(&self) -> Result<Value, DoubleError> {
        let taken = match self.state.borrow_mut().side_effect.as_mut() {
            Some(SideEffect::Sequence(slot)) => Some(slot.take()),
            _ => None,
        };

        let next = match taken {
            Some(Some(mut seq)) => {
                let next = seq.next();
                self.restore_sequence(seq);
                next
            }
            // An outer call on this double is inside `seq.next()`
            Some(None) => {
                let name = self.name();
                debug!(double = %name, "side effect re-entered while running");
                return Err(DoubleError::SideEffectRunning { double: name });
            }
            None => None,
        };

        match next {
            Some(Value::Error(e)) => Err(DoubleError::Configured(e)),
            Some(value) => Ok(value),
            None => {
                let name = self.name();
                debug!(double = %name, "side effect exhausted");
                Err(DoubleError::SideEffectExhausted { double: name })
            }
        }
    }

    /// Puts a pulled-from sequence back unless the side effect was replaced
    /// while the element was produced.
    fn restore_sequence(&self, seq: Sequence) {
        let mut state = self.state.borrow_mut();
        if let Some(SideEffect::Sequence(slot)) = state.side_effect.as_mut() {
            if slot.is_none() {
                *slot = Some(seq);
            }
        }
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// Returns the value calls resolve to when no side effect is set.
    ///
    /// Unless set explicitly, this is a child double created on first read
    /// and returned by every later read.
    pub fn return_value(&self) -> Value {
        if let Some(value) = self.state.borrow().return_value.clone() {
            return value;
        }
        let child = self.detached(format!("{}()", self.name()));
        self.state.borrow_mut().return_value = Some(Value::Double(child.clone()));
        Value::Double(child)
    }

    /// Sets the return value. `Value::Undefined` is stored like any other value.
    pub fn set_return_value(&self, value: impl Into<Value>) {
        self.state.borrow_mut().return_value = Some(value.into());
    }

    /// Sets the side effect from a value.
    ///
    /// - functions and doubles are invoked with the call arguments
    /// - lists become a single-use sequence, one element per call
    /// - an error is raised by every call
    /// - any other value is a one-element sequence
    /// - `Value::Undefined` clears the side effect
    pub fn set_side_effect(&self, value: impl Into<Value>) {
        let effect = match value.into() {
            Value::Undefined => None,
            Value::Function(f) => Some(SideEffect::Function(f)),
            Value::Double(d) => Some(SideEffect::Function(Callable::from_double(d))),
            Value::List(items) => Some(SideEffect::Sequence(Some(Box::new(items.into_iter())))),
            Value::Error(e) => Some(SideEffect::Raise(e)),
            other => Some(SideEffect::Sequence(Some(Box::new(std::iter::once(other))))),
        };
        self.state.borrow_mut().side_effect = effect;
    }

    /// Sets a closure side effect.
    pub fn set_side_effect_fn<F>(&self, f: F)
    where
        F: Fn(&[Value]) -> Result<Value, DoubleError> + 'static,
    {
        self.state.borrow_mut().side_effect = Some(SideEffect::Function(Callable::new(f)));
    }

    /// Sets a lazy side-effect sequence. Each call pulls one element.
    pub fn set_side_effect_iter<I>(&self, iter: I)
    where
        I: IntoIterator<Item = Value>,
        I::IntoIter: 'static,
    {
        let seq: Sequence = Box::new(iter.into_iter().fuse());
        self.state.borrow_mut().side_effect = Some(SideEffect::Sequence(Some(seq)));
    }

    pub fn has_side_effect(&self) -> bool {
        self.state.borrow().side_effect.is_some()
    }

    pub fn clear_side_effect(&self) {
        self.state.borrow_mut().side_effect = None;
    }

    /// Sets what constructing the double returns.
    pub fn set_constructs(&self, value: impl Into<Value>) {
        self.state.borrow_mut().construct_value = Some(value.into());
    }

    /// Makes construction return a fresh double again.
    pub fn clear_constructs(&self) {
        self.state.borrow_mut().construct_value = None;
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Invokes the double as a constructor.
    ///
    /// Returns the configured construct value, or a new double per
    /// invocation. Not recorded in the call ledger.
    pub fn construct(&self, args: Vec<Value>) -> Value {
        let configured = {
            let mut state = self.state.borrow_mut();
            trace!(double = %state.config.name, args = %format_call(&args), "construct");
            state.constructs.push(args);
            state.construct_value.clone()
        };
        configured.unwrap_or_else(|| Value::Double(self.detached(format!("new {}()", self.name()))))
    }

    pub fn construct_count(&self) -> usize {
        self.state.borrow().constructs.len()
    }

    pub fn construct_args_list(&self) -> Vec<Vec<Value>> {
        self.state.borrow().constructs.clone()
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Reads an attribute.
    ///
    /// The first read of a never-set key stores and returns a new child
    /// double; later reads return that same child. The introspection key
    /// reads as `Value::Undefined` unless set.
    pub fn get(&self, key: &str) -> Value {
        {
            let state = self.state.borrow();
            if let Some(value) = state.attributes.get(key) {
                return value.clone();
            }
            if key == state.config.introspection_key {
                return Value::Undefined;
            }
        }

        let child = self.child_of(key);
        trace!(double = %child.name(), "attribute created");
        self.state
            .borrow_mut()
            .attributes
            .insert(key.to_string(), Value::Double(child.clone()));
        Value::Double(child)
    }

    /// Reads an attribute expected to hold a double.
    ///
    /// Returns `None` when the attribute was set to something else.
    pub fn child(&self, key: &str) -> Option<Double> {
        self.get(key).into_double()
    }

    /// Stores an attribute verbatim.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        self.state
            .borrow_mut()
            .attributes
            .insert(key.to_string(), value.into());
    }

    /// Returns true if the attribute has been read or set.
    pub fn has(&self, key: &str) -> bool {
        self.state.borrow().attributes.contains_key(key)
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Makes the double report itself as an instance of `tag`.
    pub fn set_spec(&self, tag: impl Into<TypeTag>) {
        self.state.borrow_mut().identity_override = Some(tag.into());
    }

    pub fn spec(&self) -> Option<TypeTag> {
        self.state.borrow().identity_override.clone()
    }

    pub fn clear_spec(&self) {
        self.state.borrow_mut().identity_override = None;
    }

    /// Returns the type the double reports itself as.
    pub fn type_tag(&self) -> TypeTag {
        self.spec().unwrap_or_else(TypeTag::double)
    }

    /// True only for the identity override if set, otherwise only for
    /// [`TypeTag::double`].
    pub fn is_instance_of(&self, tag: &TypeTag) -> bool {
        self.type_tag() == *tag
    }

    /// Always fails: identity changes go through [`Double::set_spec`].
    pub fn set_prototype(&self, prototype: TypeTag) -> Result<(), DoubleError> {
        let name = self.name();
        debug!(double = %name, prototype = %prototype, "rejected prototype reassignment");
        Err(DoubleError::IllegalMutation(format!(
            "cannot reassign the prototype of {} to {}; use set_spec instead",
            name, prototype
        )))
    }

    // ------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------

    pub fn called(&self) -> bool {
        !self.state.borrow().calls.is_empty()
    }

    pub fn call_count(&self) -> usize {
        self.state.borrow().calls.len()
    }

    /// Arguments of the most recent call, or `None` if never called.
    pub fn call_args(&self) -> Option<Vec<Value>> {
        self.state.borrow().calls.last().cloned()
    }

    /// All call arguments in call order.
    pub fn call_args_list(&self) -> Vec<Vec<Value>> {
        self.state.borrow().calls.clone()
    }

    /// Calls made on auto-created descendants, in call order.
    pub fn method_calls(&self) -> Vec<MethodCall> {
        self.state.borrow().method_calls.clone()
    }

    /// Clears the ledgers of this double and every double reachable through
    /// its attributes and return value. Configuration is kept.
    pub fn reset(&self) {
        let mut visited = HashSet::new();
        self.reset_reachable(&mut visited);
    }

    fn reset_reachable(&self, visited: &mut HashSet<*const RefCell<DoubleState>>) {
        if !visited.insert(Rc::as_ptr(&self.state)) {
            return;
        }
        let mut state = self.state.borrow_mut();
        state.calls.clear();
        state.constructs.clear();
        state.method_calls.clear();
        let reachable: Vec<Double> = state
            .attributes
            .values()
            .chain(state.return_value.iter())
            .filter_map(|v| v.as_double().cloned())
            .collect();
        drop(state);

        for double in reachable {
            double.reset_reachable(visited);
        }
    }
}

impl Default for Double {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Double {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => write!(f, "<Double {}>", state.config.name),
            Err(_) => f.write_str("<Double>"),
        }
    }
}

impl fmt::Debug for Double {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("Double")
                .field("name", &state.config.name)
                .field("id", &state.id)
                .field("call_count", &state.calls.len())
                .finish(),
            Err(_) => f.write_str("Double { <borrowed> }"),
        }
    }
}

impl Interceptor for Double {
    fn invoke(&self, args: Vec<Value>) -> Result<Value, DoubleError> {
        self.call(args)
    }

    fn construct(&self, args: Vec<Value>) -> Value {
        Double::construct(self, args)
    }

    fn get_property(&self, key: &str) -> Value {
        self.get(key)
    }

    fn set_property(&self, key: &str, value: Value) {
        self.set(key, value)
    }

    fn check_identity(&self, candidate: &TypeTag) -> bool {
        self.is_instance_of(candidate)
    }

    fn set_prototype(&self, prototype: TypeTag) -> Result<(), DoubleError> {
        Double::set_prototype(self, prototype)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use proptest::prelude::*;

    #[test]
    fn test_call_returns_a_double_by_default() {
        let mock = Double::new();
        let result = mock.call(args![]).unwrap();
        assert!(result.is_instance_of(&TypeTag::double()));
    }

    #[test]
    fn test_default_return_value_is_memoized() {
        let mock = Double::new();
        let first = mock.return_value();
        let second = mock.return_value();
        assert_eq!(first, second);
        assert_eq!(mock.call(args![]).unwrap(), first);
        assert_eq!(first.as_double().unwrap().name(), "mock()");
    }

    #[test]
    fn test_set_return_value() {
        let mock = Double::new();
        mock.set_return_value(true);
        assert_eq!(mock.call(args![]).unwrap(), Value::Bool(true));

        let mock2 = Double::new();
        mock2.set_return_value(Value::Undefined);
        assert!(mock2.call(args![]).unwrap().is_undefined());
    }

    #[test]
    fn test_counts_calls() {
        let mock = Double::new();
        mock.set_return_value(true);
        assert!(!mock.called());
        assert_eq!(mock.call_count(), 0);

        mock.call(args![]).unwrap();
        mock.call(args![]).unwrap();

        assert!(mock.called());
        assert_eq!(mock.call_count(), 2);
    }

    #[test]
    fn test_records_call_arguments() {
        let mock = Double::new();
        mock.set_return_value(true);
        assert_eq!(mock.call_args(), None);
        assert!(mock.call_args_list().is_empty());

        mock.call(args![1, 2]).unwrap();
        mock.call(args!["a", "b"]).unwrap();

        assert_eq!(mock.call_args(), Some(args!["a", "b"]));
        assert_eq!(mock.call_args_list(), vec![args![1, 2], args!["a", "b"]]);
    }

    #[test]
    fn test_attribute_read_creates_memoized_child() {
        let mock = Double::new();
        let a = mock.get("a");
        assert!(a.is_instance_of(&TypeTag::double()));
        assert_eq!(mock.get("a"), a);
        assert_eq!(a.as_double().unwrap().name(), "mock.a");
    }

    #[test]
    fn test_set_attributes_are_returned_verbatim() {
        let mock = Double::new();
        mock.set("a", true);
        mock.set("b", 2);
        mock.child("c").unwrap().child("d").unwrap().set("e", 3);
        mock.child("f")
            .unwrap()
            .child("g")
            .unwrap()
            .child("h")
            .unwrap()
            .set_return_value(false);
        mock.set("h", vec![1, 2, 3]);

        assert_eq!(mock.get("a"), Value::Bool(true));
        assert_eq!(mock.get("b"), Value::from(2));
        assert_eq!(
            mock.child("c").unwrap().child("d").unwrap().get("e"),
            Value::from(3)
        );
        let h = mock.child("f").unwrap().child("g").unwrap().child("h").unwrap();
        assert_eq!(h.call(args![]).unwrap(), Value::Bool(false));
        assert_eq!(mock.get("h"), Value::from(vec![1, 2, 3]));
    }

    #[test]
    fn test_child_of_non_double_attribute_is_none() {
        let mock = Double::new();
        mock.set("port", 8080);
        assert!(mock.child("port").is_none());
        assert!(mock.has("port"));
        assert!(!mock.has("host"));
    }

    #[test]
    fn test_introspection_key_is_not_auto_created() {
        let mock = Double::new();
        assert!(mock.get("inspect").is_undefined());
        assert!(!mock.has("inspect"));

        mock.set("inspect", "custom");
        assert_eq!(mock.get("inspect"), Value::from("custom"));

        let custom = Double::with_config(DoubleConfig::default().with_introspection_key("toJSON"));
        assert!(custom.get("toJSON").is_undefined());
        assert!(custom.get("inspect").as_double().is_some());
    }

    #[test]
    fn test_side_effect_list_returns_values_in_order() {
        let mock = Double::new();
        mock.set_side_effect(vec![1, 2, 3]);
        assert!(mock.has_side_effect());
        assert_eq!(mock.call(args![]).unwrap(), Value::from(1));
        assert_eq!(mock.call(args![]).unwrap(), Value::from(2));
        assert_eq!(mock.call(args![]).unwrap(), Value::from(3));
    }

    #[test]
    fn test_side_effect_iterator() {
        let mock = Double::new();
        mock.set_side_effect_iter((1..=3).map(Value::from));
        assert_eq!(mock.call(args![]).unwrap(), Value::from(1));
        assert_eq!(mock.call(args![]).unwrap(), Value::from(2));
        assert_eq!(mock.call(args![]).unwrap(), Value::from(3));
    }

    #[test]
    fn test_side_effect_exhaustion() {
        let mock = Double::named("fetch");
        mock.set_side_effect(vec![1]);
        assert_eq!(mock.call(args![]).unwrap(), Value::from(1));
        assert_eq!(
            mock.call(args![]),
            Err(DoubleError::SideEffectExhausted {
                double: "fetch".to_string()
            })
        );
        // The exhausted call is still recorded
        assert_eq!(mock.call_count(), 2);
    }

    #[test]
    fn test_scalar_side_effect_is_one_element_sequence() {
        let mock = Double::new();
        mock.set_side_effect("once");
        assert_eq!(mock.call(args![]).unwrap(), Value::from("once"));
        assert!(matches!(
            mock.call(args![]),
            Err(DoubleError::SideEffectExhausted { .. })
        ));
    }

    #[test]
    fn test_error_side_effect_raises_on_every_call() {
        let mock = Double::new();
        mock.set_side_effect(ErrorValue::new("RangeError", "Mock has gone too far!"));
        for _ in 0..2 {
            let err = mock.call(args![]).unwrap_err();
            assert!(err.configured().unwrap().is_kind("RangeError"));
        }
    }

    #[test]
    fn test_error_element_in_sequence_is_raised() {
        let mock = Double::new();
        mock.set_side_effect(vec![Value::from(1), ErrorValue::error("bad").into(), Value::from(3)]);
        assert_eq!(mock.call(args![]).unwrap(), Value::from(1));
        assert_eq!(
            mock.call(args![]),
            Err(DoubleError::Configured(ErrorValue::error("bad")))
        );
        assert_eq!(mock.call(args![]).unwrap(), Value::from(3));
    }

    #[test]
    fn test_function_side_effect_receives_arguments() {
        let mock = Double::new();
        mock.set_side_effect(Value::function(|args| {
            let x = args[0].as_number().unwrap_or_default();
            let y = args[1].as_number().unwrap_or_default();
            Ok(Value::from(x + y))
        }));
        assert_eq!(mock.call(args![1, 2]).unwrap(), Value::from(3));
    }

    #[test]
    fn test_double_as_side_effect_is_called() {
        let inner = Double::new();
        inner.set_return_value("inner");
        let mock = Double::new();
        mock.set_side_effect(&inner);
        assert_eq!(mock.call(args![5]).unwrap(), Value::from("inner"));
        assert_eq!(inner.call_args(), Some(args![5]));
    }

    #[test]
    fn test_side_effect_takes_precedence_over_return_value() {
        let mock = Double::new();
        mock.set_return_value("plain");
        mock.set_side_effect(vec!["effect"]);
        assert_eq!(mock.call(args![]).unwrap(), Value::from("effect"));

        mock.clear_side_effect();
        assert_eq!(mock.call(args![]).unwrap(), Value::from("plain"));

        mock.set_side_effect(vec!["again"]);
        mock.set_side_effect(());
        assert!(!mock.has_side_effect());
    }

    #[test]
    fn test_side_effect_sees_current_call_counted() {
        let mock = Double::new();
        let handle = mock.downgrade();
        mock.set_side_effect_fn(move |_| {
            Ok(Value::from(handle.upgrade().map_or(0, |d| d.call_count())))
        });
        assert_eq!(mock.call(args![]).unwrap(), Value::from(1));
        assert_eq!(mock.call(args![]).unwrap(), Value::from(2));
    }

    #[test]
    fn test_side_effect_iterator_may_reenter_the_double() {
        let mock = Double::new();
        let handle = mock.downgrade();
        mock.set_side_effect_iter(std::iter::repeat_with(move || {
            Value::from(handle.upgrade().map_or(0, |d| d.call_args_list().len()))
        }));
        assert_eq!(mock.call(args![]).unwrap(), Value::from(1));
        assert_eq!(mock.call(args![]).unwrap(), Value::from(2));
    }

    #[test]
    fn test_call_from_inside_side_effect_sequence_is_not_exhaustion() {
        let mock = Double::new();
        let handle = mock.downgrade();
        mock.set_side_effect_iter(
            std::iter::repeat_with(move || match handle.upgrade().map(|d| d.call(args![])) {
                Some(Err(e)) => Value::from(e.to_string()),
                _ => Value::Null,
            })
            .take(3),
        );

        assert_eq!(
            mock.call(args![]).unwrap(),
            Value::from("side effect already running for mock")
        );
        // The sequence survives the nested call: two elements are left
        assert!(mock.call(args![]).is_ok());
        assert!(mock.call(args![]).is_ok());
        assert!(matches!(
            mock.call(args![]),
            Err(DoubleError::SideEffectExhausted { .. })
        ));
        // Each outer call plus its nested call
        assert_eq!(mock.call_count(), 7);
    }

    #[test]
    fn test_weak_handle_does_not_keep_double_alive() {
        let mock = Double::new();
        let handle = mock.downgrade();
        let captured = mock.downgrade();
        mock.set_side_effect_fn(move |_| {
            Ok(Value::from(captured.upgrade().map_or(0, |d| d.call_count())))
        });
        assert!(handle.upgrade().is_some_and(|d| d.ptr_eq(&mock)));

        drop(mock);
        assert!(handle.upgrade().is_none());
    }

    #[test]
    fn test_identity_override() {
        let foo = TypeTag::new("Foo");
        let mock = Double::new();
        assert!(mock.is_instance_of(&TypeTag::double()));

        mock.set_spec("Foo");
        assert!(mock.is_instance_of(&foo));
        assert!(!mock.is_instance_of(&TypeTag::double()));
        assert!(Value::from(&mock).is_instance_of(&foo));

        mock.clear_spec();
        assert!(!mock.is_instance_of(&foo));
    }

    #[test]
    fn test_prototype_reassignment_is_illegal() {
        let mock = Double::new();
        let err = mock.set_prototype(TypeTag::new("Foo")).unwrap_err();
        assert!(matches!(err, DoubleError::IllegalMutation(_)));
        assert!(err.to_string().contains("set_spec"));
        assert!(mock.is_instance_of(&TypeTag::double()));
    }

    #[test]
    fn test_construct_returns_fresh_doubles() {
        let mock = Double::new();
        let a = mock.construct(args![]);
        let b = mock.construct(args![1]);
        assert!(a.is_instance_of(&TypeTag::double()));
        assert_ne!(a, b);
        assert_eq!(mock.construct_count(), 2);
        assert_eq!(mock.construct_args_list(), vec![args![], args![1]]);
        assert!(!mock.called());
    }

    #[test]
    fn test_construct_returns_configured_value() {
        let mock = Double::new();
        mock.set_return_value("not this");
        mock.set_side_effect(ErrorValue::error("nor this"));
        let instance = Value::object([("x", 4)]);
        mock.set_constructs(instance.clone());
        assert_eq!(mock.construct(args![]), instance);
        assert_eq!(mock.construct(args![]), instance);

        mock.clear_constructs();
        assert!(mock.construct(args![]).as_double().is_some());
    }

    #[test]
    fn test_method_calls_record_paths_on_ancestors() {
        let mock = Double::new();
        let a = mock.child("a").unwrap();
        let b = a.child("b").unwrap();
        b.call(args![1]).unwrap();
        a.call(args![2]).unwrap();

        assert_eq!(
            mock.method_calls(),
            vec![MethodCall::new("a.b", args![1]), MethodCall::new("a", args![2])]
        );
        assert_eq!(a.method_calls(), vec![MethodCall::new("b", args![1])]);
        assert!(b.method_calls().is_empty());
        assert_eq!(mock.method_calls()[0].to_string(), "a.b(1)");
    }

    #[test]
    fn test_explicitly_set_double_is_not_linked() {
        let mock = Double::new();
        let other = Double::new();
        mock.set("dep", &other);
        other.call(args![]).unwrap();
        assert!(mock.method_calls().is_empty());
    }

    #[test]
    fn test_reset_clears_ledgers_but_keeps_configuration() {
        let mock = Double::new();
        mock.set_return_value(7);
        mock.call(args![1]).unwrap();
        mock.construct(args![]);
        let child = mock.child("a").unwrap();
        child.call(args![]).unwrap();
        mock.set("me", &mock);

        mock.reset();

        assert!(!mock.called());
        assert_eq!(mock.construct_count(), 0);
        assert!(mock.method_calls().is_empty());
        assert!(!child.called());
        assert_eq!(mock.call(args![]).unwrap(), Value::from(7));
        assert!(mock.child("a").unwrap().ptr_eq(&child));
    }

    #[test]
    fn test_interceptor_surface() {
        let mock = Double::new();
        let object: &dyn Interceptor = &mock;

        object.set_property("x", Value::from(1));
        assert_eq!(object.get_property("x"), Value::from(1));
        assert!(object.get_property("y").as_double().is_some());
        assert!(object.check_identity(&TypeTag::double()));
        assert!(object.invoke(args![3]).is_ok());
        assert!(object.construct(args![]).as_double().is_some());
        assert!(object.set_prototype(TypeTag::new("Foo")).is_err());
        assert_eq!(mock.call_args_list(), vec![args![3]]);
    }

    #[test]
    fn test_display_and_debug() {
        let mock = Double::named("db");
        assert_eq!(mock.to_string(), "<Double db>");
        assert!(format!("{:?}", mock).contains("call_count: 0"));
    }

    proptest! {
        #[test]
        fn prop_ledger_is_append_only(calls in prop::collection::vec(prop::collection::vec(any::<i32>(), 0..4), 0..20)) {
            let mock = Double::new();
            mock.set_return_value(());
            for call in &calls {
                let args: Vec<Value> = call.iter().copied().map(Value::from).collect();
                mock.call(args).unwrap();
            }

            let ledger = mock.call_args_list();
            prop_assert_eq!(ledger.len(), calls.len());
            prop_assert_eq!(mock.call_count(), calls.len());
            for (recorded, made) in ledger.iter().zip(&calls) {
                let expected: Vec<Value> = made.iter().copied().map(Value::from).collect();
                prop_assert_eq!(recorded, &expected);
            }
            prop_assert_eq!(mock.call_args(), ledger.last().cloned());
        }
    }
}
