//! Type introspection and small functional helpers.
//!
//! Values handed around by page scripts are modelled by [`Value`], a closed
//! tagged variant. [`get_type`] reports the tag of a value, and the
//! container helpers ([`extend`], [`deep_clone`]) operate on the `Object` and
//! `Array` variants.
//!
//! The timing wrappers ([`throttle`], [`debounce`]) each own their private
//! state; two wrappers around the same function never share a window or a
//! pending timer.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Callable stored inside a [`Value::Function`].
pub type NativeFunction = Arc<dyn Fn(&[Value]) -> Value + Send + Sync>;

/// An instance of a user-defined class.
///
/// Instances are never deep-copied; [`deep_clone`] shares them by reference.
pub trait ClassInstance: Send + Sync + fmt::Debug {
    /// Name reported by [`get_type`].
    fn class_name(&self) -> &'static str;

    /// Returns a type-erased reference for downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// A dynamically typed value.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    Date(Arc<OffsetDateTime>),
    Function(NativeFunction),
    Instance(Arc<dyn ClassInstance>),
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("Undefined"),
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Value::Object(map) => f.debug_tuple("Object").field(map).finish(),
            Value::Date(d) => f.debug_tuple("Date").field(d).finish(),
            Value::Function(_) => f.write_str("Function(..)"),
            Value::Instance(i) => f.debug_tuple("Instance").field(i).finish(),
        }
    }
}

impl PartialEq for Value {
    /// Structural equality for containers and primitives; functions and
    /// class instances compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Instance(a), Value::Instance(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Value::String(s.to_string()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Value::String(s) }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self { Value::Number(n) }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Value::Bool(b) }
}

impl From<OffsetDateTime> for Value {
    fn from(d: OffsetDateTime) -> Self { Value::Date(Arc::new(d)) }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self { Value::Array(items) }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self { Value::Object(map) }
}

/// Tag describing the variant of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTag {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Array,
    Object,
    Date,
    Function,
    Class(&'static str),
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeTag::Undefined => "Undefined",
            TypeTag::Null => "Null",
            TypeTag::Boolean => "Boolean",
            TypeTag::Number => "Number",
            TypeTag::String => "String",
            TypeTag::Array => "Array",
            TypeTag::Object => "Object",
            TypeTag::Date => "Date",
            TypeTag::Function => "Function",
            TypeTag::Class(name) => name,
        };
        f.write_str(name)
    }
}

pub fn get_type(value: &Value) -> TypeTag {
    match value {
        Value::Undefined => TypeTag::Undefined,
        Value::Null => TypeTag::Null,
        Value::Bool(_) => TypeTag::Boolean,
        Value::Number(_) => TypeTag::Number,
        Value::String(_) => TypeTag::String,
        Value::Array(_) => TypeTag::Array,
        Value::Object(_) => TypeTag::Object,
        Value::Date(_) => TypeTag::Date,
        Value::Function(_) => TypeTag::Function,
        Value::Instance(i) => TypeTag::Class(i.class_name()),
    }
}

pub fn is_array(value: &Value) -> bool {
    get_type(value) == TypeTag::Array
}

pub fn is_date(value: &Value) -> bool {
    get_type(value) == TypeTag::Date
}

/// Collects any iterable collection into a newly allocated vector.
pub fn to_array<I: IntoIterator>(items: I) -> Vec<I::Item> {
    items.into_iter().collect()
}

/// Copies every entry of `source` onto `target` and returns `target`.
///
/// Only `Object` values take part; any other combination leaves `target`
/// untouched. Entries are shallow copies.
pub fn extend<'a>(target: &'a mut Value, source: &Value) -> &'a mut Value {
    if let (Value::Object(dst), Value::Object(src)) = (&mut *target, source) {
        for (key, value) in src {
            dst.insert(key.clone(), value.clone());
        }
    }
    target
}

/// Recursively copies plain arrays and objects.
///
/// Every other variant is shared with the source: dates, functions and class
/// instances stay pointer-equal to the original.
pub fn deep_clone(source: &Value) -> Value {
    match source {
        Value::Array(items) => Value::Array(items.iter().map(deep_clone).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), deep_clone(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Returns a function with `target` permanently bound as its receiver.
pub fn bind<T, A, R, F>(target: T, f: F) -> impl Fn(A) -> R
where
    F: Fn(&T, A) -> R,
{
    move |args| f(&target, args)
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Leading-edge rate limiter returned by [`throttle`].
pub struct Throttled<A> {
    f: Box<dyn Fn(A) + Send + Sync>,
    delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl<A> Throttled<A> {
    /// Invokes the wrapped function unless the previous accepted call was
    /// `delay` or less ago. Returns `true` when the call went through.
    pub fn call(&self, args: A) -> bool {
        let now = Instant::now();
        {
            let mut last = lock(&self.last);
            if let Some(prev) = *last {
                if now.duration_since(prev) <= self.delay {
                    log::trace!("throttle: dropped call within {:?}", self.delay);
                    return false;
                }
            }
            *last = Some(now);
        }

        (self.f)(args);
        true
    }
}

/// Wraps `f` so that it fires at most once per `delay`.
///
/// The first call fires immediately. Calls arriving inside the window are
/// dropped, never queued.
pub fn throttle<A, F>(f: F, delay: Duration) -> Throttled<A>
where
    F: Fn(A) + Send + Sync + 'static,
{
    Throttled {
        f: Box::new(f),
        delay,
        last: Mutex::new(None),
    }
}

/// Trailing-edge delayer returned by [`debounce`].
pub struct Debounced<A> {
    f: Arc<dyn Fn(A) + Send + Sync>,
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<A: Send + 'static> Debounced<A> {
    /// Schedules the wrapped function with `args`, replacing any call that
    /// is still waiting.
    ///
    /// Returns `false` and drops the call when there is no tokio runtime to
    /// run the timer on. A call already waiting is left alone in that case.
    pub fn call(&self, args: A) -> bool {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::warn!("debounce: no tokio runtime, call dropped");
            return false;
        };

        let mut pending = lock(&self.pending);
        if let Some(handle) = pending.take() {
            handle.abort();
        }

        let f = self.f.clone();
        let delay = self.delay;
        *pending = Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            f(args);
        }));
        true
    }

    /// Is a call waiting for its quiet period to pass?
    pub fn is_pending(&self) -> bool {
        lock(&self.pending)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

/// Wraps `f` so that it only fires after `delay` without further calls.
///
/// Only the arguments of the last call in a burst are delivered.
pub fn debounce<A, F>(f: F, delay: Duration) -> Debounced<A>
where
    F: Fn(A) + Send + Sync + 'static,
{
    Debounced {
        f: Arc::new(f),
        delay,
        pending: Mutex::new(None),
    }
}
