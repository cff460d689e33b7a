//! Dynamic values passed through proxies.
//!
//! Proxies are driven through a name-keyed dispatch table, so arguments and
//! results travel as [`Value`]s. `Value::Null` is the absence-of-value
//! sentinel returned by unmapped calls that do not return the proxy itself.

use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

use crate::dispatcher::Proxy;
use crate::error::ProxyResult;

/// Argument list of a single call.
pub type Arguments = SmallVec<[Value; 4]>;

/// Signature shared by stand-in callables and free-function bodies.
pub type CallableFn = dyn Fn(&[Value]) -> ProxyResult<Value> + Send + Sync;

/// Build an [`Arguments`] list from anything convertible into [`Value`].
///
/// ```
/// use standin_core::args;
///
/// let a = args![808, "foo", true];
/// assert_eq!(a.len(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::value::Arguments::new()
    };
    ($($value:expr),+ $(,)?) => {{
        let mut arguments = $crate::value::Arguments::new();
        $(arguments.push($crate::value::Value::from($value));)+
        arguments
    }};
}

/// A shared closure that can be stored in a [`Value`] or configured as a stand-in.
#[derive(Clone)]
pub struct Callable {
    name: Option<Arc<str>>,
    f: Arc<CallableFn>,
}

impl Callable {
    /// Wrap a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> ProxyResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: None,
            f: Arc::new(f),
        }
    }

    /// Wrap a closure under a name used when rendering the value.
    pub fn named<F>(name: &str, f: F) -> Self
    where
        F: Fn(&[Value]) -> ProxyResult<Value> + Send + Sync + 'static,
    {
        Self {
            name: Some(Arc::from(name)),
            f: Arc::new(f),
        }
    }

    /// Invoke the closure.
    pub fn invoke(&self, args: &[Value]) -> ProxyResult<Value> {
        (self.f)(args)
    }

    /// The name given at construction, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether both handles share the same closure.
    pub fn same_as(&self, other: &Callable) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "<callable {}>", name),
            None => f.write_str("<callable>"),
        }
    }
}

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Callable(Callable),
    /// A proxy instance, e.g. the result of a self-returning member
    Proxy(Proxy),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
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

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Value::Callable(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_proxy(&self) -> Option<&Proxy> {
        match self {
            Value::Proxy(p) => Some(p),
            _ => None,
        }
    }

    /// Short name of the value's kind, used in messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Callable(_) => "callable",
            Value::Proxy(_) => "proxy",
        }
    }

    /// Human-readable rendering used in verification messages.
    pub fn render(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => format!("{:?}", n),
            Value::Str(s) => format!("{:?}", s),
            Value::List(items) => {
                let rendered: Vec<String> = items.iter().map(Value::render).collect();
                format!("[{}]", rendered.join(", "))
            }
            Value::Callable(c) => format!("{:?}", c),
            Value::Proxy(p) => format!("<proxy {}>", p.class_name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Callable(a), Value::Callable(b)) => a.same_as(b),
            (Value::Proxy(a), Value::Proxy(b)) => a.same_instance(b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

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

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        Value::Callable(c)
    }
}

impl From<Proxy> for Value {
    fn from(p: Proxy) -> Self {
        Value::Proxy(p)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map(Into::into).unwrap_or(Value::Null)
    }
}
