//! Standin Core
//!
//! Test-double engine: proxies that stand in for registered types and
//! functions, intercept every call, answer from configured results, and
//! record calls for verification.
//!
//! # Features
//!
//! - **Delegating proxies**: unmapped calls fall back to the original implementation
//! - **Stub proxies**: unmapped calls return the proxy itself or `Null`
//! - **Call maps**: literals, stand-in closures, per-call sequences, raised failures
//! - **Verification**: call counts and per-call argument matching
//!
//! # Core Modules
//!
//! - [`registry`]: TypeRegistry, the descriptor store and type-graph walks
//! - [`resolver`]: SignatureResolver, parameter lists and return contracts
//! - [`synthesizer`]: Synthesizer and the cached ProxyFactory per target
//! - [`dispatcher`]: Proxy and the per-call resolution algorithm
//! - [`verification`]: Verification and the injectable PredicateEvaluator
//!
//! # Example
//!
//! ```
//! use standin_core::{args, sequence, Engine, MemberDescriptor, TargetDescriptor, Value};
//!
//! let engine = Engine::new();
//! engine
//!     .register(
//!         TargetDescriptor::class("app::Player")
//!             .with_member(MemberDescriptor::method("play").returns("string")),
//!     )
//!     .unwrap();
//!
//! let player = engine.new_stub("app::Player").unwrap();
//! player.set_result("play", sequence(["foo", "bar"])).unwrap();
//!
//! assert_eq!(player.call("play", args![]).unwrap(), Value::from("foo"));
//! assert_eq!(player.call("play", args![]).unwrap(), Value::from("bar"));
//! assert_eq!(player.call("play", args![]).unwrap(), Value::Null);
//!
//! engine.verify(&player, "play").unwrap().was_called(3).unwrap();
//! ```

#![allow(clippy::result_large_err)]

pub mod call_map;
pub mod config;
pub mod descriptor;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod function_proxy;
pub mod ledger;
pub mod registry;
pub mod resolver;
pub mod synthesizer;
pub mod value;
pub mod verification;

pub use call_map::{passthrough_wrap, raises, sequence, CallMap, ResultSpec};
pub use config::EngineConfig;
pub use descriptor::{
    DefaultValue, FunctionDescriptor, MemberDescriptor, MemberKind, ParameterDescriptor,
    TargetDescriptor, TargetKind, Visibility,
};
pub use dispatcher::{ConstructionMode, Proxy};
pub use engine::Engine;
pub use error::{ProxyError, ProxyResult, RaisedError};
pub use function_proxy::FunctionProxy;
pub use ledger::InvocationLedger;
pub use registry::TypeRegistry;
pub use resolver::{ResolvedSignature, ReturnContract, ReturnSource, SignatureResolver};
pub use synthesizer::{
    CacheStats, DispatchEntry, DispatchTable, DispatchTableCompiler, ForwardingMember,
    FunctionFactory, ProxyCompiler, ProxyFactory, ProxyPlan, Synthesizer,
};
pub use value::{Arguments, Callable, Value};
pub use verification::{
    verify, EqualityEvaluator, Expected, Predicate, PredicateEvaluator, Verifiable, Verification,
};
