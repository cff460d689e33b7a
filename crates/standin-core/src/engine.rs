//! The engine facade: registration, construction, resolution and verification.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::descriptor::{FunctionDescriptor, TargetDescriptor};
use crate::dispatcher::{ConstructionMode, Proxy};
use crate::error::ProxyResult;
use crate::function_proxy::FunctionProxy;
use crate::registry::TypeRegistry;
use crate::resolver::ResolvedSignature;
use crate::synthesizer::{
    CacheStats, FunctionFactory, ProxyCompiler, ProxyFactory, Synthesizer,
};
use crate::value::Arguments;
use crate::verification::{EqualityEvaluator, PredicateEvaluator, Verifiable, Verification};

/// Entry point for building and inspecting proxies.
///
/// # Example
///
/// ```
/// use standin_core::{args, Engine, MemberDescriptor, TargetDescriptor, Value};
///
/// let engine = Engine::new();
/// engine
///     .register(
///         TargetDescriptor::class("app::Player")
///             .with_member(MemberDescriptor::method("play").returns("static")),
///     )
///     .unwrap();
///
/// let player = engine.new_instance("app::Player", args![]).unwrap();
/// player.set_results([("play", "foo")]).unwrap();
/// assert_eq!(player.call("play", args![]).unwrap(), Value::from("foo"));
/// ```
pub struct Engine {
    registry: Arc<TypeRegistry>,
    config: EngineConfig,
    compiler: Option<Arc<dyn ProxyCompiler>>,
    synthesizer: Synthesizer,
    evaluator: Arc<dyn PredicateEvaluator>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with the default configuration and the host builtins registered.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let registry = Arc::new(TypeRegistry::with_builtins());
        Self {
            synthesizer: Synthesizer::new(Arc::clone(&registry), config.clone()),
            registry,
            config,
            compiler: None,
            evaluator: Arc::new(EqualityEvaluator),
        }
    }

    fn rebuild_synthesizer(mut self) -> Self {
        self.synthesizer = match &self.compiler {
            Some(compiler) => Synthesizer::with_compiler(
                Arc::clone(&self.registry),
                self.config.clone(),
                Arc::clone(compiler),
            ),
            None => Synthesizer::new(Arc::clone(&self.registry), self.config.clone()),
        };
        self
    }

    /// Builder method: use an existing registry.
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self.rebuild_synthesizer()
    }

    /// Builder method: replace the compile step.
    pub fn with_compiler(mut self, compiler: impl ProxyCompiler + 'static) -> Self {
        self.compiler = Some(Arc::new(compiler));
        self.rebuild_synthesizer()
    }

    /// Builder method: replace the argument evaluator used by [`Engine::verify`].
    pub fn with_evaluator(mut self, evaluator: impl PredicateEvaluator + 'static) -> Self {
        self.evaluator = Arc::new(evaluator);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn register(&self, descriptor: TargetDescriptor) -> ProxyResult<()> {
        self.registry.register(descriptor).map(|_| ())
    }

    pub fn register_function(&self, descriptor: FunctionDescriptor) -> ProxyResult<()> {
        self.registry.register_function(descriptor).map(|_| ())
    }

    /// The synthesized factory for `target`.
    pub fn synthesize(&self, target: &str) -> ProxyResult<Arc<ProxyFactory>> {
        self.synthesizer.synthesize(target)
    }

    /// The synthesized factory for the function `name`.
    pub fn synthesize_function(&self, name: &str) -> ProxyResult<Arc<FunctionFactory>> {
        self.synthesizer.synthesize_function(name)
    }

    /// A delegating proxy, constructed through the target's constructor.
    pub fn new_instance(&self, target: &str, constructor_args: Arguments) -> ProxyResult<Proxy> {
        self.synthesizer
            .synthesize(target)?
            .instantiate(ConstructionMode::Delegating, constructor_args)
    }

    /// A stub proxy: nothing is constructed and nothing falls back.
    pub fn new_stub(&self, target: &str) -> ProxyResult<Proxy> {
        self.synthesizer
            .synthesize(target)?
            .instantiate(ConstructionMode::Stub, Arguments::new())
    }

    /// Generated type name of proxies of `target`.
    pub fn class_name_of(&self, target: &str) -> ProxyResult<String> {
        Ok(self.synthesizer.synthesize(target)?.class_name().to_string())
    }

    /// A delegating function proxy.
    pub fn new_callable(&self, name: &str) -> ProxyResult<FunctionProxy> {
        Ok(FunctionProxy::new(self.synthesize_function(name)?, true))
    }

    /// A function proxy that never runs the original body.
    pub fn new_stub_callable(&self, name: &str) -> ProxyResult<FunctionProxy> {
        Ok(FunctionProxy::new(self.synthesize_function(name)?, false))
    }

    pub fn callable_class_name_of(&self, name: &str) -> ProxyResult<String> {
        Ok(self.synthesize_function(name)?.class_name().to_string())
    }

    /// Resolve the signature of `member` on `target`.
    pub fn resolve_signature(&self, target: &str, member: &str) -> ProxyResult<ResolvedSignature> {
        self.synthesizer
            .resolver()
            .resolve(&self.registry, target, member)
    }

    /// Verify calls to `member`. Function proxies accept an empty member name.
    pub fn verify<V: Verifiable + ?Sized>(
        &self,
        target: &V,
        member: &str,
    ) -> ProxyResult<Verification> {
        let ledger = target.ledger_for(member)?;
        Ok(Verification::new(ledger).with_evaluator(Arc::clone(&self.evaluator)))
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.synthesizer.cache_stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::descriptor::MemberDescriptor;
    use crate::error::ProxyError;
    use crate::value::Value;

    fn engine() -> Engine {
        let engine = Engine::new();
        engine
            .register(
                TargetDescriptor::class("app::Player")
                    .with_member(MemberDescriptor::method("play").returns("static")),
            )
            .unwrap();
        engine
    }

    #[test]
    fn test_class_name_is_idempotent() {
        let engine = engine();
        let first = engine.class_name_of("app::Player").unwrap();
        assert_eq!(first, engine.class_name_of("app::Player").unwrap());
        assert_eq!(engine.cache_stats().misses, 1);
    }

    #[test]
    fn test_instances_are_independent() {
        let engine = engine();
        let a = engine.new_instance("app::Player", args![]).unwrap();
        let b = engine.new_instance("app::Player", args![]).unwrap();
        assert!(!a.same_instance(&b));

        a.set_results([("play", "foo")]).unwrap();
        a.call("play", args![]).unwrap();
        assert!(b.call("play", args![]).unwrap().as_proxy().is_some());
        assert_eq!(a.ledger("play").unwrap().count(), 1);
        assert_eq!(b.ledger("play").unwrap().count(), 1);
        assert_eq!(a.call("play", args![]).unwrap(), Value::from("foo"));
    }

    #[test]
    fn test_verify_requires_member_for_objects() {
        let engine = engine();
        let player = engine.new_stub("app::Player").unwrap();
        assert!(matches!(
            engine.verify(&player, ""),
            Err(ProxyError::InvalidConfiguration { .. })
        ));
        assert!(engine.verify(&player, "play").is_ok());
    }

    #[test]
    fn test_resolve_signature() {
        let engine = engine();
        let sig = engine.resolve_signature("app::Player", "play").unwrap();
        assert!(sig.returns_self);
        assert!(matches!(
            engine.resolve_signature("app::Player", "stop"),
            Err(ProxyError::UnresolvedSignature { .. })
        ));
    }

    #[test]
    fn test_custom_prefix() {
        let engine = Engine::with_config(EngineConfig::default().with_class_name_prefix("Fake"));
        engine
            .register(TargetDescriptor::class("app::Clock"))
            .unwrap();
        assert!(engine
            .class_name_of("app::Clock")
            .unwrap()
            .starts_with("Fake_Clock_"));
    }
}
