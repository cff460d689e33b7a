//! Configured results for proxy members.
//!
//! A [`CallMap`] maps member names to [`ResultSpec`]s. The dispatcher asks the
//! spec for the answer covering a call ordinal; sequences are consumed one
//! element per call and stop covering once exhausted.

use std::collections::BTreeMap;

use crate::dispatcher::Proxy;
use crate::error::{ProxyError, ProxyResult, RaisedError};
use crate::value::{Callable, Value};

/// One configured answer for a member.
#[derive(Debug, Clone)]
pub enum ResultSpec {
    /// Returned as-is on every call
    Literal(Value),
    /// Invoked with the call's arguments on every call
    Invocable(Callable),
    /// One answer per successive call, first element answers the first call
    Sequence(Vec<ResultSpec>),
    /// Raised on every call
    Failure(RaisedError),
}

impl ResultSpec {
    pub fn literal(value: impl Into<Value>) -> Self {
        ResultSpec::Literal(value.into())
    }

    /// Use a closure as a stand-in implementation.
    pub fn invocable<F>(f: F) -> Self
    where
        F: Fn(&[Value]) -> ProxyResult<Value> + Send + Sync + 'static,
    {
        ResultSpec::Invocable(Callable::new(f))
    }

    pub fn failure(error: impl Into<RaisedError>) -> Self {
        ResultSpec::Failure(error.into())
    }

    /// Whether this spec answers call number `ordinal` (1-indexed).
    pub fn covers(&self, ordinal: usize) -> bool {
        match self {
            ResultSpec::Sequence(items) => ordinal >= 1 && ordinal <= items.len(),
            _ => true,
        }
    }

    /// The answer for call number `ordinal`, if covered.
    pub(crate) fn answer_for(&self, ordinal: usize) -> Option<Answer> {
        match self {
            ResultSpec::Literal(value) => Some(Answer::Literal(value.clone())),
            ResultSpec::Invocable(callable) => Some(Answer::Invoke(callable.clone())),
            ResultSpec::Failure(error) => Some(Answer::Raise(error.clone())),
            ResultSpec::Sequence(items) => match items.get(ordinal.checked_sub(1)?)? {
                ResultSpec::Sequence(_) => None,
                item => item.answer_for(1),
            },
        }
    }

    /// Reject shapes the dispatcher cannot answer with.
    pub(crate) fn validate(&self) -> Result<(), String> {
        if let ResultSpec::Sequence(items) = self {
            if items
                .iter()
                .any(|item| matches!(item, ResultSpec::Sequence(_)))
            {
                return Err("sequences cannot contain sequences".to_string());
            }
        }
        Ok(())
    }
}

/// A resolved answer, cloned out of the call map so no lock is held while it runs.
#[derive(Debug, Clone)]
pub(crate) enum Answer {
    Literal(Value),
    Invoke(Callable),
    Raise(RaisedError),
}

impl Answer {
    pub(crate) fn apply(self, args: &[Value]) -> ProxyResult<Value> {
        match self {
            Answer::Literal(value) => Ok(value),
            Answer::Invoke(callable) => callable.invoke(args),
            Answer::Raise(error) => Err(ProxyError::Raised(error)),
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Answer::Literal(_) => "literal",
            Answer::Invoke(_) => "invocable",
            Answer::Raise(_) => "failure",
        }
    }
}

impl From<Value> for ResultSpec {
    fn from(value: Value) -> Self {
        match value {
            Value::Callable(callable) => ResultSpec::Invocable(callable),
            other => ResultSpec::Literal(other),
        }
    }
}

impl From<Callable> for ResultSpec {
    fn from(callable: Callable) -> Self {
        ResultSpec::Invocable(callable)
    }
}

impl From<RaisedError> for ResultSpec {
    fn from(error: RaisedError) -> Self {
        ResultSpec::Failure(error)
    }
}

macro_rules! literal_result_spec {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ResultSpec {
                fn from(value: $ty) -> Self {
                    ResultSpec::Literal(Value::from(value))
                }
            }
        )*
    };
}

literal_result_spec!(bool, i64, i32, u32, f64, &str, String, Vec<Value>, Proxy, ());

/// A stand-in that always raises `error`.
pub fn raises(error: impl Into<RaisedError>) -> ResultSpec {
    let error = error.into();
    ResultSpec::Invocable(Callable::new(move |_| {
        Err(ProxyError::Raised(error.clone()))
    }))
}

/// One answer per successive call.
pub fn sequence<I, T>(items: I) -> ResultSpec
where
    I: IntoIterator<Item = T>,
    T: Into<ResultSpec>,
{
    ResultSpec::Sequence(items.into_iter().map(Into::into).collect())
}

/// Return `callable` itself instead of invoking it.
pub fn passthrough_wrap(callable: Callable) -> ResultSpec {
    ResultSpec::Invocable(Callable::new(move |_| {
        Ok(Value::Callable(callable.clone()))
    }))
}

/// Member name to configured result. A member appears at most once.
#[derive(Debug, Clone, Default)]
pub struct CallMap {
    entries: BTreeMap<String, ResultSpec>,
}

impl CallMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the result for `member`.
    pub fn insert(&mut self, member: impl Into<String>, spec: ResultSpec) -> Option<ResultSpec> {
        self.entries.insert(member.into(), spec)
    }

    pub fn get(&self, member: &str) -> Option<&ResultSpec> {
        self.entries.get(member)
    }

    pub fn contains(&self, member: &str) -> bool {
        self.entries.contains_key(member)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
