//! Proxies for free functions.
//!
//! A function proxy has a single implicit member. It records every call,
//! answers from its configured result, and otherwise falls back to the
//! original function body (delegating proxies only) or returns `Null`.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

use crate::call_map::ResultSpec;
use crate::error::{ProxyError, ProxyResult};
use crate::ledger::InvocationLedger;
use crate::synthesizer::FunctionFactory;
use crate::value::{Arguments, Callable, Value};

#[derive(Default)]
struct FunctionState {
    result: Option<ResultSpec>,
    returns_nothing: bool,
    forced_stub: bool,
}

struct FunctionProxyInner {
    id: Uuid,
    factory: Arc<FunctionFactory>,
    fallback_allowed: bool,
    ledger: InvocationLedger,
    state: Mutex<FunctionState>,
}

/// Handle to a function proxy. Clones share the proxy.
#[derive(Clone)]
pub struct FunctionProxy {
    inner: Arc<FunctionProxyInner>,
}

impl FunctionProxy {
    pub(crate) fn new(factory: Arc<FunctionFactory>, fallback_allowed: bool) -> Self {
        let ledger = InvocationLedger::new(factory.name());
        Self {
            inner: Arc::new(FunctionProxyInner {
                id: Uuid::new_v4(),
                factory,
                fallback_allowed,
                ledger,
                state: Mutex::new(FunctionState::default()),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Fully qualified name of the proxied function.
    pub fn name(&self) -> &str {
        self.inner.factory.name()
    }

    pub fn class_name(&self) -> &str {
        self.inner.factory.class_name()
    }

    pub fn fallback_allowed(&self) -> bool {
        self.inner.fallback_allowed
    }

    /// Configure the result of every call.
    pub fn set_result(&self, spec: impl Into<ResultSpec>) -> ProxyResult<&Self> {
        let spec = spec.into();
        let signature = self.inner.factory.signature();
        if !signature.is_mappable() {
            return Err(ProxyError::invalid(
                self.name(),
                format!(
                    "declared as returning `{}` and cannot be given a result",
                    signature.return_contract
                ),
            ));
        }
        spec.validate()
            .map_err(|reason| ProxyError::invalid(self.name(), reason))?;

        let mut state = self.inner.state.lock();
        if state.returns_nothing {
            return Err(ProxyError::invalid(
                self.name(),
                "declared as returning nothing and cannot be given a result",
            ));
        }
        state.result = Some(spec);
        Ok(self)
    }

    /// Declare that the function returns nothing: calls return `Null`
    /// without falling back, and results can no longer be configured.
    pub fn returns_nothing(&self) -> ProxyResult<&Self> {
        let mut state = self.inner.state.lock();
        if state.result.is_some() {
            return Err(ProxyError::invalid(
                self.name(),
                "already has a configured result",
            ));
        }
        state.returns_nothing = true;
        Ok(self)
    }

    /// Never fall back to the original function body.
    pub fn force_stub(&self) -> ProxyResult<&Self> {
        let mut state = self.inner.state.lock();
        if state.result.is_some() {
            return Err(ProxyError::invalid(
                self.name(),
                "already has a configured result",
            ));
        }
        state.forced_stub = true;
        Ok(self)
    }

    /// Call the function. A rejected argument count is not recorded.
    pub fn invoke(&self, args: Arguments) -> ProxyResult<Value> {
        self.inner
            .factory
            .signature()
            .check_arity(self.name(), args.len())?;

        let ordinal = self.inner.ledger.record_call(args.clone());

        let (answer, stubbed) = {
            let state = self.inner.state.lock();
            let answer = state
                .result
                .as_ref()
                .and_then(|spec| spec.answer_for(ordinal));
            (answer, state.forced_stub || state.returns_nothing)
        };

        if let Some(answer) = answer {
            trace!(
                proxy = %self.inner.id,
                function = %self.name(),
                ordinal,
                resolution = answer.label(),
                "dispatch"
            );
            return answer.apply(&args);
        }

        if self.inner.fallback_allowed && !stubbed {
            if let Some(body) = self.inner.factory.body() {
                trace!(
                    proxy = %self.inner.id,
                    function = %self.name(),
                    ordinal,
                    resolution = "original",
                    "dispatch"
                );
                return body(&args);
            }
        }

        trace!(
            proxy = %self.inner.id,
            function = %self.name(),
            ordinal,
            resolution = "null",
            "dispatch"
        );
        Ok(Value::Null)
    }

    pub fn ledger(&self) -> InvocationLedger {
        self.inner.ledger.clone()
    }

    /// A callable that invokes this proxy, for passing where a function value is expected.
    pub fn as_callable(&self) -> Callable {
        let proxy = self.clone();
        Callable::named(self.name(), move |args| {
            proxy.invoke(args.iter().cloned().collect())
        })
    }
}

impl fmt::Debug for FunctionProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionProxy")
            .field("id", &self.inner.id)
            .field("name", &self.name())
            .field("class_name", &self.class_name())
            .finish()
    }
}
