//! # Call Dispatcher
//!
//! Every proxy instance routes its calls through [`Proxy::call`]:
//!
//! ```text
//! call(m, A)
//!   1. append A to m's ledger             → ordinal n
//!   2. call map answers n?                → literal / invoke stand-in / raise
//!   3. fallback allowed, m not forced,
//!      original body exists?              → run original body
//!   4. m self-returning?                  → the proxy itself
//!   5.                                    → Value::Null
//! ```
//!
//! Internal locks are released before any stand-in or original body runs, so
//! bodies may call back into the same proxy.

use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

use crate::call_map::{CallMap, ResultSpec};
use crate::error::{ProxyError, ProxyResult};
use crate::ledger::{InvocationLedger, LedgerSet};
use crate::synthesizer::ProxyFactory;
use crate::value::{Arguments, Value};

/// How a proxy instance was constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructionMode {
    /// Built through the target's constructor; falls back to original bodies
    Delegating,
    /// Allocated only; never falls back
    Stub,
}

#[derive(Default)]
struct ProxyState {
    call_map: Option<CallMap>,
    forced_stubs: BTreeSet<String>,
    properties: HashMap<String, Value>,
}

struct ProxyInner {
    id: Uuid,
    factory: Arc<ProxyFactory>,
    mode: ConstructionMode,
    ledgers: LedgerSet,
    state: Mutex<ProxyState>,
}

/// Handle to a proxy instance. Clones share the instance.
#[derive(Clone)]
pub struct Proxy {
    inner: Arc<ProxyInner>,
}

impl Proxy {
    pub(crate) fn new(factory: Arc<ProxyFactory>, mode: ConstructionMode) -> Self {
        let ledgers = LedgerSet::new(factory.target().short_name());
        Self {
            inner: Arc::new(ProxyInner {
                id: Uuid::new_v4(),
                factory,
                mode,
                ledgers,
                state: Mutex::new(ProxyState::default()),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Generated proxy type name.
    pub fn class_name(&self) -> &str {
        self.inner.factory.class_name()
    }

    /// Fully qualified name of the proxied target.
    pub fn target_name(&self) -> &str {
        &self.inner.factory.target().name
    }

    pub fn mode(&self) -> ConstructionMode {
        self.inner.mode
    }

    pub fn factory(&self) -> &Arc<ProxyFactory> {
        &self.inner.factory
    }

    /// Whether unmapped calls may run original bodies.
    pub fn fallback_allowed(&self) -> bool {
        self.inner.mode == ConstructionMode::Delegating
    }

    /// Whether this proxy can stand in wherever `type_name` is expected.
    pub fn is_instance_of(&self, type_name: &str) -> bool {
        self.inner.factory.is_instance_of(type_name)
    }

    /// Whether both handles refer to the same instance.
    pub fn same_instance(&self, other: &Proxy) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn subject(&self, member: &str) -> String {
        format!("{}::{}", self.target_name(), member)
    }

    /// Configure results for several members at once.
    ///
    /// Every entry is validated before any is applied. Entries merge into
    /// previously configured results, replacing those for the same member.
    pub fn set_results<I, K, V>(&self, results: I) -> ProxyResult<&Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<ResultSpec>,
    {
        let mut staged = Vec::new();
        for (member, spec) in results {
            let member: String = member.into();
            let spec: ResultSpec = spec.into();

            let entry = self.inner.factory.member(&member).ok_or_else(|| {
                ProxyError::invalid(self.subject(&member), "no such member can be mapped")
            })?;
            if !entry.signature().is_mappable() {
                return Err(ProxyError::invalid(
                    self.subject(&member),
                    format!(
                        "declared as returning `{}` and cannot be given a result",
                        entry.signature().return_contract
                    ),
                ));
            }
            spec.validate()
                .map_err(|reason| ProxyError::invalid(self.subject(&member), reason))?;
            staged.push((member, spec));
        }

        let mut state = self.inner.state.lock();
        let call_map = state.call_map.get_or_insert_with(CallMap::new);
        for (member, spec) in staged {
            call_map.insert(member, spec);
        }
        Ok(self)
    }

    /// Configure the result of a single member.
    pub fn set_result(&self, member: &str, spec: impl Into<ResultSpec>) -> ProxyResult<&Self> {
        let spec: ResultSpec = spec.into();
        self.set_results([(member, spec)])
    }

    /// Mark members as never falling back to their original body.
    ///
    /// Fails if a member is not intercepted or already has a configured result.
    pub fn force_stub<I, S>(&self, members: I) -> ProxyResult<&Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let members: Vec<String> = members
            .into_iter()
            .map(|m| m.as_ref().to_string())
            .collect();

        let mut state = self.inner.state.lock();
        for member in &members {
            if self.inner.factory.member(member).is_none() {
                return Err(ProxyError::invalid(
                    self.subject(member),
                    "no such member can be stubbed",
                ));
            }
            if state
                .call_map
                .as_ref()
                .map(|map| map.contains(member))
                .unwrap_or(false)
            {
                return Err(ProxyError::invalid(
                    self.subject(member),
                    "already has a configured result",
                ));
            }
        }
        state.forced_stubs.extend(members);
        Ok(self)
    }

    /// Call `member` with `args`.
    ///
    /// An argument count the member's signature cannot take is rejected with
    /// [`ProxyError::ArityMismatch`] and leaves the ledger untouched.
    pub fn call(&self, member: &str, args: Arguments) -> ProxyResult<Value> {
        let factory = &self.inner.factory;
        let entry = match factory.member(member) {
            Some(entry) => entry,
            None => return self.call_passthrough(member, &args),
        };
        entry
            .signature()
            .check_arity(&self.subject(member), args.len())?;

        let ordinal = self.inner.ledgers.ledger(member).record_call(args.clone());

        let (answer, forced) = {
            let state = self.inner.state.lock();
            let answer = state
                .call_map
                .as_ref()
                .and_then(|map| map.get(member))
                .and_then(|spec| spec.answer_for(ordinal));
            (answer, state.forced_stubs.contains(member))
        };

        if let Some(answer) = answer {
            trace!(
                proxy = %self.inner.id,
                member,
                ordinal,
                resolution = answer.label(),
                "dispatch"
            );
            return answer.apply(&args);
        }

        if self.fallback_allowed() && !forced {
            if let Some(body) = entry.body() {
                trace!(
                    proxy = %self.inner.id,
                    member,
                    ordinal,
                    resolution = "original",
                    "dispatch"
                );
                return body(self, &args);
            }
        }

        if entry.signature().returns_self {
            trace!(proxy = %self.inner.id, member, ordinal, resolution = "self", "dispatch");
            return Ok(Value::Proxy(self.clone()));
        }

        trace!(proxy = %self.inner.id, member, ordinal, resolution = "null", "dispatch");
        Ok(Value::Null)
    }

    /// Final members run their original body without being recorded.
    fn call_passthrough(&self, member: &str, args: &[Value]) -> ProxyResult<Value> {
        let factory = &self.inner.factory;
        match factory.passthrough(member) {
            Some(body) if factory.allows_final_passthrough() => {
                trace!(proxy = %self.inner.id, member, resolution = "final", "dispatch");
                body(self, args)
            }
            _ => Err(ProxyError::UnknownMember {
                target: self.class_name().to_string(),
                member: member.to_string(),
            }),
        }
    }

    /// The ledger of an intercepted member.
    pub fn ledger(&self, member: &str) -> ProxyResult<InvocationLedger> {
        if self.inner.factory.member(member).is_none() {
            return Err(ProxyError::invalid(
                self.subject(member),
                "member is not intercepted, so its calls are not recorded",
            ));
        }
        Ok(self.inner.ledgers.ledger(member))
    }

    /// Read an instance property. Unset properties read as `Null`.
    pub fn property(&self, name: &str) -> Value {
        self.inner
            .state
            .lock()
            .properties
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn set_property(&self, name: &str, value: impl Into<Value>) {
        self.inner
            .state
            .lock()
            .properties
            .insert(name.to_string(), value.into());
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("id", &self.inner.id)
            .field("class_name", &self.class_name())
            .field("mode", &self.inner.mode)
            .finish()
    }
}
