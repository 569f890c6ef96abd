//! Dynamic value model shared by signals, stores, and derived functions.
//!
//! Application state flows through the reactive core as [`Value`]s: plain
//! data (null, booleans, numbers, strings, lists), reactive containers
//! ([`Store`], [`Signal`]), callable [`FuncValue`]s, and opaque live handles
//! that the serializability validator rejects.
//!
//! Equality is *strict*: primitives compare by value, everything else by
//! reference identity. This is what the write-path no-op check uses — a
//! rewrite of the same list contents through a different allocation still
//! counts as a change.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::error::SignalError;
use crate::signal::Signal;
use crate::store::Store;

/// A callable value: the function itself plus an optional string form.
///
/// The string form is what makes a function serializable — it is the
/// captured source representation a resumed container can re-materialize.
/// Derived signals carry their computation as a `FuncValue`.
#[derive(Clone)]
pub struct FuncValue {
    func: Rc<dyn Fn(&[Value]) -> Value>,
    repr: Option<Rc<str>>,
}

impl FuncValue {
    pub fn new(func: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self {
            func: Rc::new(func),
            repr: None,
        }
    }

    pub fn with_repr(
        func: impl Fn(&[Value]) -> Value + 'static,
        repr: impl Into<Rc<str>>,
    ) -> Self {
        Self {
            func: Rc::new(func),
            repr: Some(repr.into()),
        }
    }

    pub fn call(&self, args: &[Value]) -> Value {
        (self.func)(args)
    }

    /// Captured string form, if any. A func without one cannot be
    /// serialized for resumption.
    pub fn repr(&self) -> Option<&str> {
        self.repr.as_deref()
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.func) as *const () as usize
    }
}

impl fmt::Debug for FuncValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            Some(repr) => write!(f, "FuncValue({repr})"),
            None => write!(f, "FuncValue(<closure>)"),
        }
    }
}

/// A dynamically-typed reactive value.
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Value>>>),
    /// A reactive host object.
    Object(Store),
    /// A signal of any kind (plain, derived, or property wrapper).
    Signal(Signal),
    Func(FuncValue),
    /// A live handle the core cannot inspect or serialize.
    Opaque(Rc<dyn Any>),
}

impl Value {
    pub fn str(s: impl Into<Rc<str>>) -> Self {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn opaque(handle: impl Any + 'static) -> Self {
        Value::Opaque(Rc::new(handle))
    }

    /// Short kind name, used in error and log messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Object(_) => "object",
            Value::Signal(_) => "signal",
            Value::Func(_) => "func",
            Value::Opaque(_) => "opaque",
        }
    }

    pub fn is_signal(&self) -> bool {
        matches!(self, Value::Signal(_))
    }

    /// Strict equality: value comparison for primitives, pointer identity
    /// for lists, objects, signals, funcs, and opaque handles. Never deep.
    ///
    /// Mixed int/float numbers compare numerically; `NaN` is never equal
    /// to itself.
    pub fn same(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Float(x), Value::Float(y)) => x == y,
            (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => {
                *x as f64 == *y
            }
            (Value::Str(x), Value::Str(y)) => x == y,
            (Value::List(x), Value::List(y)) => Rc::ptr_eq(x, y),
            (Value::Object(x), Value::Object(y)) => x == y,
            (Value::Signal(x), Value::Signal(y)) => Signal::same(x, y),
            (Value::Func(x), Value::Func(y)) => x.addr() == y.addr(),
            (Value::Opaque(x), Value::Opaque(y)) => Rc::ptr_eq(x, y),
            _ => false,
        }
    }

    pub fn as_bool(&self) -> Result<bool, SignalError> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(other.coercion_error("bool")),
        }
    }

    pub fn as_int(&self) -> Result<i64, SignalError> {
        match self {
            Value::Int(i) => Ok(*i),
            other => Err(other.coercion_error("int")),
        }
    }

    pub fn as_f64(&self) -> Result<f64, SignalError> {
        match self {
            Value::Int(i) => Ok(*i as f64),
            Value::Float(f) => Ok(*f),
            other => Err(other.coercion_error("number")),
        }
    }

    pub fn as_str(&self) -> Result<Rc<str>, SignalError> {
        match self {
            Value::Str(s) => Ok(s.clone()),
            other => Err(other.coercion_error("string")),
        }
    }

    fn coercion_error(&self, to: &'static str) -> SignalError {
        match self {
            // Implicit coercion of a signal almost always means a missing
            // `.value` read at the call site; fail loudly and say so.
            Value::Signal(_) => SignalError::CoerceSignal(to),
            other => SignalError::Coercion {
                from: other.kind(),
                to,
            },
        }
    }

    /// Raw member lookup for non-object values.
    ///
    /// Primitives have a tiny builtin surface: `to_string` yields a func
    /// rendering the value, `length` yields the string/list length.
    /// Anything else is `Null`. The property access resolver uses this for
    /// hosts that cannot be wrapped.
    pub fn member(&self, key: &str) -> Value {
        match key {
            "to_string" => {
                let rendered = self.to_string();
                Value::Func(FuncValue::with_repr(
                    move |_args| Value::str(rendered.clone()),
                    "to_string",
                ))
            }
            "length" => match self {
                Value::Str(s) => Value::Int(s.len() as i64),
                Value::List(items) => Value::Int(items.borrow().len() as i64),
                _ => Value::Null,
            },
            _ => Value::Null,
        }
    }
}

/// Discriminates signals from plain values.
pub fn is_signal(value: &Value) -> bool {
    value.is_signal()
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Object(store) => write!(f, "[object {:?}]", store.id()),
            Value::Signal(sig) => write!(f, "{sig}"),
            Value::Func(func) => match func.repr() {
                Some(repr) => write!(f, "{repr}"),
                None => write!(f, "[func]"),
            },
            Value::Opaque(_) => write!(f, "[opaque]"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::List(items) => write!(f, "List({:?})", items.borrow()),
            Value::Object(store) => write!(f, "Object({:?})", store.id()),
            Value::Signal(sig) => write!(f, "{sig:?}"),
            Value::Func(func) => write!(f, "{func:?}"),
            Value::Opaque(_) => write!(f, "Opaque(..)"),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::str(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::str(s)
    }
}
