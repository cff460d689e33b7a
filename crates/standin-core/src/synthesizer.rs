//! # Proxy Synthesizer
//!
//! Builds one [`ProxyFactory`] per target and caches it by target name.
//!
//! ## Pipeline
//!
//! ```text
//! TargetDescriptor ──► (mixin? derive anchor) ──► effective members
//!        │                                              │
//!        ▼                                              ▼
//!   type closure ─────────────► SignatureResolver ──► ProxyPlan
//!                                                       │
//!                                   ProxyCompiler::compile
//!                                                       │
//!                                                       ▼
//!                                  DispatchTable ──► ProxyFactory (cached)
//! ```
//!
//! The compile step is a trait so alternative backends, or failing ones in
//! tests, can be injected. The default [`DispatchTableCompiler`] validates the
//! plan and builds a name-keyed table of forwarding entries.
//!
//! ## Cache
//!
//! The cache is read-mostly. A miss builds the factory outside the lock and
//! then inserts it; when two threads race on the same target the last writer
//! wins and readers only ever see complete factories.

use anyhow::{anyhow, bail, Result};
use parking_lot::RwLock;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use crate::config::EngineConfig;
use crate::descriptor::{
    normalize_type_name, short_type_name, FunctionBody, FunctionDescriptor, MemberDescriptor,
    MemberKind, MethodBody, TargetDescriptor, TargetKind, Visibility,
};
use crate::dispatcher::{ConstructionMode, Proxy};
use crate::error::{ProxyError, ProxyResult};
use crate::registry::{TypeClosure, TypeRegistry};
use crate::resolver::{ParamDefault, ResolvedSignature, SignatureResolver};
use crate::value::Arguments;

// =============================================================================
// Plans and compilation
// =============================================================================

/// A member the synthesized type forwards into the dispatcher.
#[derive(Clone)]
pub struct ForwardingMember {
    pub signature: ResolvedSignature,
    /// Original implementation, if concrete
    pub body: Option<MethodBody>,
}

impl fmt::Debug for ForwardingMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardingMember")
            .field("signature", &self.signature.render())
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Everything a compiler needs to build the forwarding layer of one proxy type.
#[derive(Debug, Clone)]
pub struct ProxyPlan {
    pub class_name: String,
    /// The type whose members are forwarded (the anchor for mixins)
    pub origin: String,
    pub members: Vec<ForwardingMember>,
}

/// One forwarding entry of a compiled proxy type.
#[derive(Clone)]
pub struct DispatchEntry {
    signature: ResolvedSignature,
    body: Option<MethodBody>,
}

impl DispatchEntry {
    pub fn name(&self) -> &str {
        &self.signature.member
    }

    pub fn signature(&self) -> &ResolvedSignature {
        &self.signature
    }

    pub fn returns_self(&self) -> bool {
        self.signature.returns_self
    }

    /// Whether an original implementation exists to fall back to.
    pub fn has_original(&self) -> bool {
        self.body.is_some()
    }

    pub(crate) fn body(&self) -> Option<&MethodBody> {
        self.body.as_ref()
    }
}

impl fmt::Debug for DispatchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchEntry")
            .field("signature", &self.signature.render())
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

/// Name-keyed forwarding table, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct DispatchTable {
    entries: Vec<DispatchEntry>,
    index: HashMap<String, usize>,
}

impl DispatchTable {
    pub fn get(&self, member: &str) -> Option<&DispatchEntry> {
        self.index.get(member).map(|&i| &self.entries[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &DispatchEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, entry: DispatchEntry) {
        self.index
            .insert(entry.signature.member.clone(), self.entries.len());
        self.entries.push(entry);
    }
}

/// Turns a [`ProxyPlan`] into a [`DispatchTable`].
pub trait ProxyCompiler: Send + Sync {
    fn compile(&self, plan: &ProxyPlan) -> Result<DispatchTable>;
}

/// Default compiler: validates the plan and builds the dispatch table directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchTableCompiler;

impl ProxyCompiler for DispatchTableCompiler {
    fn compile(&self, plan: &ProxyPlan) -> Result<DispatchTable> {
        if !is_identifier(&plan.class_name) {
            bail!("'{}' is not a valid type name", plan.class_name);
        }

        let mut table = DispatchTable::default();
        for member in &plan.members {
            let signature = &member.signature;
            if !is_identifier(&signature.member) {
                bail!("'{}' is not a valid member name", signature.member);
            }
            if table.get(&signature.member).is_some() {
                bail!("member '{}' is declared twice", signature.member);
            }

            let mut seen = HashSet::new();
            let last = signature.params.len().saturating_sub(1);
            for (i, param) in signature.params.iter().enumerate() {
                if !is_identifier(&param.name) {
                    bail!(
                        "'{}' is not a valid parameter name in {}",
                        param.name,
                        signature.render()
                    );
                }
                if !seen.insert(param.name.as_str()) {
                    bail!(
                        "parameter '{}' is declared twice in {}",
                        param.name,
                        signature.render()
                    );
                }
                if param.variadic && (i != last || param.default != ParamDefault::Required) {
                    bail!(
                        "variadic parameter '{}' must be last and cannot have a default in {}",
                        param.name,
                        signature.render()
                    );
                }
            }

            table.push(DispatchEntry {
                signature: signature.clone(),
                body: member.body.clone(),
            });
        }
        Ok(table)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

// =============================================================================
// Factories
// =============================================================================

/// A synthesized proxy type. Produces independent proxy instances.
pub struct ProxyFactory {
    class_name: String,
    target: Arc<TargetDescriptor>,
    closure: TypeClosure,
    table: DispatchTable,
    passthrough: HashMap<String, MethodBody>,
    constructor: Option<MemberDescriptor>,
    allow_final_passthrough: bool,
}

impl ProxyFactory {
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The requested target (the mixin itself for mixin targets).
    pub fn target(&self) -> &Arc<TargetDescriptor> {
        &self.target
    }

    pub fn closure(&self) -> &TypeClosure {
        &self.closure
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// The forwarding entry of an intercepted member.
    pub fn member(&self, name: &str) -> Option<&DispatchEntry> {
        self.table.get(name)
    }

    pub(crate) fn passthrough(&self, name: &str) -> Option<&MethodBody> {
        self.passthrough.get(name)
    }

    pub(crate) fn allows_final_passthrough(&self) -> bool {
        self.allow_final_passthrough
    }

    /// Whether instances satisfy `type_name`: the generated name, the target,
    /// its ancestors or any capability in its closure.
    pub fn is_instance_of(&self, type_name: &str) -> bool {
        normalize_type_name(type_name) == self.class_name || self.closure.matches(type_name)
    }

    /// Create an instance.
    ///
    /// Delegating instances run the nearest constructor with `constructor_args`;
    /// stub instances are allocated without running anything.
    pub fn instantiate(
        self: &Arc<Self>,
        mode: ConstructionMode,
        constructor_args: Arguments,
    ) -> ProxyResult<Proxy> {
        let proxy = Proxy::new(Arc::clone(self), mode);
        if mode == ConstructionMode::Stub {
            return Ok(proxy);
        }

        if let Some(ctor) = &self.constructor {
            if ctor.visibility == Visibility::Private {
                return Err(ProxyError::creation(
                    &self.target.name,
                    anyhow!("the constructor is private"),
                ));
            }
            let required = ctor.required_params();
            if constructor_args.len() < required {
                return Err(ProxyError::creation(
                    &self.target.name,
                    anyhow!(
                        "the constructor requires {} argument(s), {} given",
                        required,
                        constructor_args.len()
                    ),
                ));
            }
            if let Some(body) = &ctor.body {
                body(&proxy, &constructor_args)
                    .map_err(|e| ProxyError::creation(&self.target.name, e))?;
            }
        }

        debug!(
            class_name = %self.class_name,
            proxy = %proxy.id(),
            "constructed delegating proxy"
        );
        Ok(proxy)
    }
}

impl fmt::Debug for ProxyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyFactory")
            .field("class_name", &self.class_name)
            .field("target", &self.target.name)
            .field("members", &self.table.len())
            .field("passthrough", &self.passthrough.len())
            .finish()
    }
}

/// A synthesized proxy type for a free function.
pub struct FunctionFactory {
    class_name: String,
    descriptor: Arc<FunctionDescriptor>,
    signature: ResolvedSignature,
}

impl FunctionFactory {
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn signature(&self) -> &ResolvedSignature {
        &self.signature
    }

    pub(crate) fn body(&self) -> Option<&FunctionBody> {
        self.descriptor.body.as_ref()
    }
}

impl fmt::Debug for FunctionFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionFactory")
            .field("class_name", &self.class_name)
            .field("signature", &self.signature.render())
            .finish()
    }
}

// =============================================================================
// Synthesizer
// =============================================================================

/// Synthesis cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Cached type and function factories
    pub entries: usize,
}

/// Builds and caches proxy factories.
pub struct Synthesizer {
    registry: Arc<TypeRegistry>,
    config: EngineConfig,
    resolver: SignatureResolver,
    compiler: Arc<dyn ProxyCompiler>,
    cache: RwLock<HashMap<String, Arc<ProxyFactory>>>,
    function_cache: RwLock<HashMap<String, Arc<FunctionFactory>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Synthesizer {
    pub fn new(registry: Arc<TypeRegistry>, config: EngineConfig) -> Self {
        Self::with_compiler(registry, config, Arc::new(DispatchTableCompiler))
    }

    pub fn with_compiler(
        registry: Arc<TypeRegistry>,
        config: EngineConfig,
        compiler: Arc<dyn ProxyCompiler>,
    ) -> Self {
        Self {
            resolver: SignatureResolver::new(&config),
            registry,
            config,
            compiler,
            cache: RwLock::new(HashMap::new()),
            function_cache: RwLock::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &SignatureResolver {
        &self.resolver
    }

    /// Deterministic generated name: `<prefix>_<Short>_<hash>`.
    pub fn class_name_for(&self, target: &str) -> String {
        let target = normalize_type_name(target);
        format!(
            "{}_{}_{}",
            self.config.class_name_prefix,
            short_type_name(target),
            name_hash(target)
        )
    }

    /// Deterministic generated name of a function proxy: `<prefix>Fn_<name>_<hash>`.
    pub fn function_class_name_for(&self, name: &str) -> String {
        let name = normalize_type_name(name);
        format!(
            "{}Fn_{}_{}",
            self.config.class_name_prefix,
            short_type_name(name),
            name_hash(&format!("fn:{}", name))
        )
    }

    /// The cached factory for `target`, synthesizing it on first use.
    pub fn synthesize(&self, target: &str) -> ProxyResult<Arc<ProxyFactory>> {
        let key = normalize_type_name(target);
        if let Some(factory) = self.cache.read().get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(target_type = %key, "synthesis cache hit");
            return Ok(Arc::clone(factory));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let factory = Arc::new(
            self.build_factory(key)
                .map_err(|cause| ProxyError::creation(key, cause))?,
        );
        self.cache
            .write()
            .insert(key.to_string(), Arc::clone(&factory));

        debug!(
            target_type = %key,
            class_name = %factory.class_name,
            members = factory.table.len(),
            "synthesized proxy type"
        );
        Ok(factory)
    }

    fn build_factory(&self, target: &str) -> Result<ProxyFactory> {
        let descriptor = self
            .registry
            .describe(target)
            .ok_or_else(|| anyhow!("no type named '{}' is registered", target))?;
        if descriptor.is_final {
            bail!("final types cannot be proxied");
        }

        let origin = match descriptor.kind {
            TargetKind::Mixin => Arc::new(self.registry.anchor_for(&descriptor)),
            _ => Arc::clone(&descriptor),
        };

        let class_name = self.class_name_for(target);
        if self.registry.contains(&class_name) {
            bail!(
                "generated name '{}' collides with a registered name",
                class_name
            );
        }

        let closure = self.registry.type_closure(&origin);
        let mut members = Vec::new();
        let mut passthrough = HashMap::new();
        for owned in self.registry.effective_members(&origin) {
            let member = &owned.member;
            if member.is_interceptable() {
                members.push(ForwardingMember {
                    signature: self
                        .resolver
                        .resolve_member(&closure, member, &owned.declared_in),
                    body: member.body.clone().filter(|_| member.is_concrete()),
                });
            } else if member.kind == MemberKind::Method
                && member.is_final
                && !member.is_static
                && member.visibility != Visibility::Private
            {
                if let Some(body) = member.body.clone() {
                    passthrough.insert(member.name.clone(), body);
                }
            }
        }

        let plan = ProxyPlan {
            class_name: class_name.clone(),
            origin: origin.name.clone(),
            members,
        };
        let table = self.compiler.compile(&plan)?;

        Ok(ProxyFactory {
            class_name,
            constructor: self.registry.find_constructor(&origin),
            target: descriptor,
            closure,
            table,
            passthrough,
            allow_final_passthrough: self.config.allow_final_members_passthrough,
        })
    }

    /// The cached factory for the function `name`, synthesizing it on first use.
    pub fn synthesize_function(&self, name: &str) -> ProxyResult<Arc<FunctionFactory>> {
        let key = normalize_type_name(name);
        if let Some(factory) = self.function_cache.read().get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(function = %key, "synthesis cache hit");
            return Ok(Arc::clone(factory));
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let factory = Arc::new(
            self.build_function_factory(key)
                .map_err(|cause| ProxyError::creation(key, cause))?,
        );
        self.function_cache
            .write()
            .insert(key.to_string(), Arc::clone(&factory));

        debug!(function = %key, class_name = %factory.class_name, "synthesized function proxy");
        Ok(factory)
    }

    fn build_function_factory(&self, name: &str) -> Result<FunctionFactory> {
        let descriptor = self
            .registry
            .describe_function(name)
            .ok_or_else(|| anyhow!("no function named '{}' is registered", name))?;

        let class_name = self.function_class_name_for(name);
        if self.registry.contains(&class_name) {
            bail!(
                "generated name '{}' collides with a registered name",
                class_name
            );
        }

        let mut signature = self.resolver.resolve_function(&descriptor);
        // Function names may be qualified; the forwarding member uses the short form.
        signature.member = short_type_name(&descriptor.name).to_string();
        let plan = ProxyPlan {
            class_name: class_name.clone(),
            origin: descriptor.name.clone(),
            members: vec![ForwardingMember {
                signature: signature.clone(),
                body: None,
            }],
        };
        self.compiler.compile(&plan)?;

        Ok(FunctionFactory {
            class_name,
            descriptor,
            signature,
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.cache.read().len() + self.function_cache.read().len(),
        }
    }
}

impl fmt::Debug for Synthesizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synthesizer")
            .field("config", &self.config)
            .field("cache_stats", &self.cache_stats())
            .finish()
    }
}

/// First 12 hex digits of the SHA-256 of `input`.
fn name_hash(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(digest)[..12].to_string()
}
