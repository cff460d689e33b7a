//! # Type Signature Resolver
//!
//! Turns a member's raw descriptor into a [`ResolvedSignature`]: a parameter
//! list that can be reproduced in a forwarding member, and a classified
//! [`ReturnContract`] that drives both mapping eligibility and self-return
//! inference.
//!
//! ## Return Classification
//!
//! ```text
//! declared type?
//!   ├─ void | never            → NoReturn
//!   ├─ this | self | static    → SelfLike            (self-returning)
//!   ├─ A|B, A&B                → Combined            (never self-returning)
//!   ├─ ?T, mixed, null         → Concrete(nullable)  (never self-returning)
//!   └─ T                       → Concrete            (self-returning if T is in the type closure)
//! no declaration?
//!   ├─ doc `@return <token>`   → same rules, legacy path, warns
//!   └─ nothing                 → Concrete(mixed, nullable)
//! ```
//!
//! One well-known member is special-cased: `get_iterator` on a type whose
//! closure includes `Aggregate` always produces an iterator and never the
//! receiver itself, whatever return type it declares. Without a declaration
//! the return is reported as `Traversable`.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::config::EngineConfig;
use crate::descriptor::{
    normalize_type_name, DefaultValue, FunctionDescriptor, MemberDescriptor, ParameterDescriptor,
    TargetKind,
};
use crate::error::{ProxyError, ProxyResult};
use crate::registry::{
    TypeClosure, TypeRegistry, AGGREGATE, ITERATOR_PRODUCING_MEMBER, TRAVERSABLE,
};

// =============================================================================
// Return contracts
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoReturnKind {
    Void,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfKeyword {
    This,
    #[serde(rename = "self")]
    SelfType,
    Static,
}

/// Classified return contract of a member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "contract", rename_all = "snake_case")]
pub enum ReturnContract {
    /// The member produces no value; it cannot be mapped
    NoReturn { kind: NoReturnKind },
    /// The member returns its receiver
    SelfLike { keyword: SelfKeyword },
    /// A single named type
    Concrete { type_name: String, nullable: bool },
    /// A union or intersection, kept verbatim
    Combined { expression: String },
}

impl ReturnContract {
    /// Classify a declared return type expression.
    pub fn parse(expr: &str) -> Self {
        let expr = expr.trim();
        let lowered = expr.to_ascii_lowercase();
        match lowered.trim_start_matches('$') {
            "void" => {
                return ReturnContract::NoReturn {
                    kind: NoReturnKind::Void,
                }
            }
            "never" => {
                return ReturnContract::NoReturn {
                    kind: NoReturnKind::Never,
                }
            }
            "this" => {
                return ReturnContract::SelfLike {
                    keyword: SelfKeyword::This,
                }
            }
            "self" => {
                return ReturnContract::SelfLike {
                    keyword: SelfKeyword::SelfType,
                }
            }
            "static" => {
                return ReturnContract::SelfLike {
                    keyword: SelfKeyword::Static,
                }
            }
            _ => {}
        }

        if expr.contains('|') || expr.contains('&') {
            return ReturnContract::Combined {
                expression: expr.to_string(),
            };
        }

        if let Some(inner) = expr.strip_prefix('?') {
            return ReturnContract::Concrete {
                type_name: normalize_type_name(inner).to_string(),
                nullable: true,
            };
        }

        let nullable = matches!(lowered.as_str(), "mixed" | "null");
        ReturnContract::Concrete {
            type_name: normalize_type_name(expr).to_string(),
            nullable,
        }
    }

    pub fn is_no_return(&self) -> bool {
        matches!(self, ReturnContract::NoReturn { .. })
    }

    /// Render the contract as it appears after `->` in a signature.
    pub fn render(&self) -> String {
        match self {
            ReturnContract::NoReturn { kind } => match kind {
                NoReturnKind::Void => "void".to_string(),
                NoReturnKind::Never => "never".to_string(),
            },
            ReturnContract::SelfLike { keyword } => match keyword {
                SelfKeyword::This => "this".to_string(),
                SelfKeyword::SelfType => "self".to_string(),
                SelfKeyword::Static => "static".to_string(),
            },
            ReturnContract::Concrete {
                type_name,
                nullable,
            } => {
                if *nullable && !implicitly_nullable(type_name) {
                    format!("?{}", type_name)
                } else {
                    type_name.clone()
                }
            }
            ReturnContract::Combined { expression } => expression.clone(),
        }
    }

    /// Whether calls to a member with this contract may return the receiver.
    fn is_self_returning(&self, closure: &TypeClosure) -> bool {
        match self {
            ReturnContract::SelfLike { .. } => true,
            ReturnContract::Concrete {
                type_name,
                nullable: false,
            } => closure.matches(type_name),
            _ => false,
        }
    }
}

impl fmt::Display for ReturnContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn implicitly_nullable(type_name: &str) -> bool {
    matches!(type_name.to_ascii_lowercase().as_str(), "mixed" | "null")
}

/// Where a return contract came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnSource {
    /// An explicit return type declaration
    Declared,
    /// A `@return` doc annotation (legacy)
    DocAnnotation,
    /// Nothing was declared
    Implicit,
    /// Hard-coded knowledge about a host builtin
    WellKnown,
}

// =============================================================================
// Parameters
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParamDefault {
    Required,
    /// Reproduced verbatim
    Literal(String),
    /// Degraded to a null default
    AllowNull,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedParam {
    pub name: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_expr: Option<String>,
    pub default: ParamDefault,
    pub by_reference: bool,
    pub variadic: bool,
}

impl ResolvedParam {
    fn from_descriptor(param: &ParameterDescriptor, builtin_member: bool) -> Self {
        let nullable_type = param.type_expr.as_deref().map(is_nullable_type).unwrap_or(false);
        let default = match &param.default {
            None => ParamDefault::Required,
            Some(DefaultValue::Literal(literal)) if !builtin_member && !nullable_type => {
                ParamDefault::Literal(literal.clone())
            }
            Some(_) => ParamDefault::AllowNull,
        };

        let type_expr = match (&param.type_expr, &default) {
            (Some(ty), ParamDefault::AllowNull) => Some(widen_to_nullable(ty)),
            (ty, _) => ty.clone(),
        };

        Self {
            name: param.name.clone(),
            type_expr,
            default,
            by_reference: param.by_reference,
            variadic: param.variadic,
        }
    }

    /// Render as `&...name: type = default`.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if self.by_reference {
            out.push('&');
        }
        if self.variadic {
            out.push_str("...");
        }
        out.push_str(&self.name);
        if let Some(ty) = &self.type_expr {
            out.push_str(": ");
            out.push_str(ty);
        }
        match &self.default {
            ParamDefault::Required => {}
            ParamDefault::Literal(literal) => {
                out.push_str(" = ");
                out.push_str(literal);
            }
            ParamDefault::AllowNull => out.push_str(" = null"),
        }
        out
    }
}

fn is_nullable_type(ty: &str) -> bool {
    let ty = ty.trim();
    ty.starts_with('?')
        || implicitly_nullable(ty)
        || ty
            .split('|')
            .any(|part| part.trim().eq_ignore_ascii_case("null"))
}

fn widen_to_nullable(ty: &str) -> String {
    let ty = ty.trim();
    if is_nullable_type(ty) {
        ty.to_string()
    } else if ty.contains('|') {
        format!("{}|null", ty)
    } else if ty.contains('&') {
        format!("({})|null", ty)
    } else {
        format!("?{}", ty)
    }
}

// =============================================================================
// Signatures
// =============================================================================

/// Fully resolved signature of one member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSignature {
    pub member: String,
    /// Type the member is attributed to
    pub declared_in: String,
    pub params: Vec<ResolvedParam>,
    pub return_contract: ReturnContract,
    pub return_source: ReturnSource,
    /// Computed once against the proxied type's closure
    pub returns_self: bool,
}

impl ResolvedSignature {
    /// Neutral signature text, e.g. `play(times: int = 1) -> static`.
    pub fn render(&self) -> String {
        let params: Vec<String> = self.params.iter().map(ResolvedParam::render).collect();
        format!(
            "{}({}) -> {}",
            self.member,
            params.join(", "),
            self.return_contract.render()
        )
    }

    /// Whether a result may be configured for this member.
    pub fn is_mappable(&self) -> bool {
        !self.return_contract.is_no_return()
    }

    /// Number of parameters a call must supply.
    pub fn required_params(&self) -> usize {
        self.params
            .iter()
            .filter(|p| p.default == ParamDefault::Required && !p.variadic)
            .count()
    }

    /// Largest argument count a call may pass, `None` when a parameter is variadic.
    pub fn accepted_params(&self) -> Option<usize> {
        if self.params.iter().any(|p| p.variadic) {
            None
        } else {
            Some(self.params.len())
        }
    }

    /// Reject an argument count this signature cannot take.
    pub fn check_arity(&self, subject: &str, given: usize) -> ProxyResult<()> {
        let required = self.required_params();
        let accepted = self.accepted_params();
        if given < required || accepted.is_some_and(|max| given > max) {
            return Err(ProxyError::ArityMismatch {
                member: subject.to_string(),
                required,
                accepted,
                given,
            });
        }
        Ok(())
    }
}

/// Resolves member descriptors against the type closure of a proxied target.
#[derive(Debug, Clone)]
pub struct SignatureResolver {
    legacy_doc_annotations: bool,
}

impl SignatureResolver {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            legacy_doc_annotations: config.legacy_doc_annotations,
        }
    }

    /// Resolve one member. `closure` is the closure of the type being proxied.
    pub fn resolve_member(
        &self,
        closure: &TypeClosure,
        member: &MemberDescriptor,
        declared_in: &str,
    ) -> ResolvedSignature {
        let params = member
            .params
            .iter()
            .map(|p| ResolvedParam::from_descriptor(p, member.is_builtin))
            .collect();

        let produces_iterator = produces_iterator(closure, member, declared_in);
        let (return_contract, return_source) =
            self.classify_return(member, declared_in, produces_iterator);
        let returns_self = match return_source {
            ReturnSource::WellKnown => false,
            _ if produces_iterator => false,
            _ => return_contract.is_self_returning(closure),
        };

        ResolvedSignature {
            member: member.name.clone(),
            declared_in: declared_in.to_string(),
            params,
            return_contract,
            return_source,
            returns_self,
        }
    }

    /// Resolve `member` on a registered `target`.
    pub fn resolve(
        &self,
        registry: &TypeRegistry,
        target: &str,
        member: &str,
    ) -> ProxyResult<ResolvedSignature> {
        let unresolved = || ProxyError::UnresolvedSignature {
            target: normalize_type_name(target).to_string(),
            member: member.to_string(),
        };

        let descriptor = registry.describe(target).ok_or_else(unresolved)?;
        let descriptor = match descriptor.kind {
            TargetKind::Mixin => Arc::new(registry.anchor_for(&descriptor)),
            _ => descriptor,
        };
        let closure = registry.type_closure(&descriptor);
        let owned = registry
            .effective_members(&descriptor)
            .into_iter()
            .find(|owned| owned.member.name == member)
            .ok_or_else(unresolved)?;

        Ok(self.resolve_member(&closure, &owned.member, &owned.declared_in))
    }

    /// Resolve a free function. Functions have no receiver, so nothing is self-returning.
    pub fn resolve_function(&self, function: &FunctionDescriptor) -> ResolvedSignature {
        let member = function.as_member();
        let closure = TypeClosure::default();
        let mut signature = self.resolve_member(&closure, &member, &function.name);
        signature.returns_self = false;
        signature
    }

    fn classify_return(
        &self,
        member: &MemberDescriptor,
        declared_in: &str,
        produces_iterator: bool,
    ) -> (ReturnContract, ReturnSource) {
        if let Some(declared) = member.returns.as_deref().filter(|r| !r.trim().is_empty()) {
            return (ReturnContract::parse(declared), ReturnSource::Declared);
        }

        if produces_iterator {
            return (
                ReturnContract::Concrete {
                    type_name: TRAVERSABLE.to_string(),
                    nullable: false,
                },
                ReturnSource::WellKnown,
            );
        }

        if self.legacy_doc_annotations {
            if let Some(token) = member.doc.as_deref().and_then(doc_return_token) {
                warn!(
                    member = %member.name,
                    declared_in = %declared_in,
                    annotation = %token,
                    "return type inferred from a @return doc annotation; \
                     declare the return type instead"
                );
                return (ReturnContract::parse(token), ReturnSource::DocAnnotation);
            }
        }

        (
            ReturnContract::Concrete {
                type_name: "mixed".to_string(),
                nullable: true,
            },
            ReturnSource::Implicit,
        )
    }
}

/// `get_iterator` on anything aggregate hands out an iterator, whatever it declares.
fn produces_iterator(closure: &TypeClosure, member: &MemberDescriptor, declared_in: &str) -> bool {
    if member.name != ITERATOR_PRODUCING_MEMBER {
        return false;
    }
    normalize_type_name(declared_in) == AGGREGATE
        || closure.target == AGGREGATE
        || closure.has_capability(AGGREGATE)
}

/// Extract the type token following `@return` in a doc comment.
fn doc_return_token(doc: &str) -> Option<&str> {
    doc.lines().find_map(|line| {
        let (_, rest) = line.split_once("@return")?;
        // `@returns` is a different tag.
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        rest.split_whitespace().next()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::TargetDescriptor;
    use crate::registry::COUNTABLE;

    fn closure_for(registry: &TypeRegistry, name: &str) -> TypeClosure {
        let target = registry.describe(name).unwrap();
        registry.type_closure(&target)
    }

    fn registry() -> TypeRegistry {
        let registry = TypeRegistry::with_builtins();
        registry
            .register(TargetDescriptor::capability("app::Playable"))
            .unwrap();
        registry
            .register(TargetDescriptor::class("app::Base").implements(COUNTABLE))
            .unwrap();
        registry
            .register(
                TargetDescriptor::class("app::Player")
                    .extends("app::Base")
                    .implements("app::Playable")
                    .implements(AGGREGATE),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_parse_return_contracts() {
        assert_eq!(
            ReturnContract::parse("void"),
            ReturnContract::NoReturn {
                kind: NoReturnKind::Void
            }
        );
        assert_eq!(
            ReturnContract::parse("never"),
            ReturnContract::NoReturn {
                kind: NoReturnKind::Never
            }
        );
        assert_eq!(
            ReturnContract::parse("$this"),
            ReturnContract::SelfLike {
                keyword: SelfKeyword::This
            }
        );
        assert_eq!(
            ReturnContract::parse("?::app::Player"),
            ReturnContract::Concrete {
                type_name: "app::Player".into(),
                nullable: true
            }
        );
        assert_eq!(
            ReturnContract::parse("A|B"),
            ReturnContract::Combined {
                expression: "A|B".into()
            }
        );
        assert_eq!(
            ReturnContract::parse("mixed"),
            ReturnContract::Concrete {
                type_name: "mixed".into(),
                nullable: true
            }
        );
    }

    #[test]
    fn test_self_returning_inference() {
        let registry = registry();
        let closure = closure_for(&registry, "app::Player");
        let resolver = SignatureResolver::new(&EngineConfig::default());

        let cases = [
            ("static", true),
            ("self", true),
            ("app::Player", true),
            ("Player", true),
            ("Base", true),
            ("app::Playable", true),
            ("Countable", true),
            ("Traversable", true),
            ("?app::Player", false),
            ("app::Player|null", false),
            ("app::Playable&Countable", false),
            ("string", false),
            ("void", false),
        ];
        for (returns, expected) in cases {
            let member = MemberDescriptor::method("m").returns(returns);
            let sig = resolver.resolve_member(&closure, &member, "app::Player");
            assert_eq!(sig.returns_self, expected, "return type {}", returns);
        }
    }

    #[test]
    fn test_iterator_producing_member_is_never_self_returning() {
        let registry = registry();
        let resolver = SignatureResolver::new(&EngineConfig::default());
        let sig = resolver
            .resolve(&registry, "app::Player", ITERATOR_PRODUCING_MEMBER)
            .unwrap();

        assert_eq!(sig.declared_in, AGGREGATE);
        assert_eq!(sig.return_source, ReturnSource::WellKnown);
        assert!(!sig.returns_self);
        assert_eq!(sig.render(), "get_iterator() -> Traversable");
    }

    #[test]
    fn test_declared_iterator_return_is_not_self_returning() {
        let registry = registry();
        registry
            .register(
                TargetDescriptor::class("app::Playlist")
                    .implements(AGGREGATE)
                    .with_member(
                        MemberDescriptor::method(ITERATOR_PRODUCING_MEMBER).returns("Traversable"),
                    ),
            )
            .unwrap();
        let resolver = SignatureResolver::new(&EngineConfig::default());

        let sig = resolver
            .resolve(&registry, "app::Playlist", ITERATOR_PRODUCING_MEMBER)
            .unwrap();
        assert_eq!(sig.declared_in, "app::Playlist");
        assert_eq!(sig.return_source, ReturnSource::Declared);
        assert!(!sig.returns_self);
        assert_eq!(sig.render(), "get_iterator() -> Traversable");

        // Same member name outside an aggregate keeps the usual inference.
        let closure = closure_for(&registry, "app::Base");
        let member = MemberDescriptor::method(ITERATOR_PRODUCING_MEMBER).returns("Countable");
        assert!(resolver.resolve_member(&closure, &member, "app::Base").returns_self);
    }

    #[test]
    fn test_arity_bounds() {
        let member = MemberDescriptor::method("load")
            .param(ParameterDescriptor::new("a"))
            .param(ParameterDescriptor::new("b").with_default("1"));
        let sig = SignatureResolver::new(&EngineConfig::default()).resolve_member(
            &TypeClosure::default(),
            &member,
            "app::Loader",
        );
        assert_eq!(sig.required_params(), 1);
        assert_eq!(sig.accepted_params(), Some(2));
        assert!(sig.check_arity("app::Loader::load", 1).is_ok());
        assert!(sig.check_arity("app::Loader::load", 2).is_ok());
        assert!(matches!(
            sig.check_arity("app::Loader::load", 0),
            Err(ProxyError::ArityMismatch { given: 0, .. })
        ));
        assert!(matches!(
            sig.check_arity("app::Loader::load", 3),
            Err(ProxyError::ArityMismatch {
                accepted: Some(2),
                given: 3,
                ..
            })
        ));

        let variadic = MemberDescriptor::method("queue")
            .param(ParameterDescriptor::new("first"))
            .param(ParameterDescriptor::new("rest").as_variadic());
        let sig = SignatureResolver::new(&EngineConfig::default()).resolve_member(
            &TypeClosure::default(),
            &variadic,
            "app::Loader",
        );
        assert_eq!(sig.required_params(), 1);
        assert_eq!(sig.accepted_params(), None);
        assert!(sig.check_arity("app::Loader::queue", 7).is_ok());
        assert!(sig.check_arity("app::Loader::queue", 0).is_err());
    }

    /// Collects the `annotation` field of every WARN event.
    #[derive(Default)]
    struct WarningCollector {
        annotations: Arc<parking_lot::Mutex<Vec<String>>>,
    }

    struct AnnotationField<'a>(&'a mut Option<String>);

    impl tracing::field::Visit for AnnotationField<'_> {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn fmt::Debug) {
            if field.name() == "annotation" {
                *self.0 = Some(format!("{:?}", value));
            }
        }
    }

    impl tracing::Subscriber for WarningCollector {
        fn enabled(&self, _: &tracing::Metadata<'_>) -> bool {
            true
        }

        fn new_span(&self, _: &tracing::span::Attributes<'_>) -> tracing::span::Id {
            tracing::span::Id::from_u64(1)
        }

        fn record(&self, _: &tracing::span::Id, _: &tracing::span::Record<'_>) {}

        fn record_follows_from(&self, _: &tracing::span::Id, _: &tracing::span::Id) {}

        fn event(&self, event: &tracing::Event<'_>) {
            if *event.metadata().level() != tracing::Level::WARN {
                return;
            }
            let mut annotation = None;
            event.record(&mut AnnotationField(&mut annotation));
            self.annotations
                .lock()
                .push(annotation.unwrap_or_default());
        }

        fn enter(&self, _: &tracing::span::Id) {}

        fn exit(&self, _: &tracing::span::Id) {}
    }

    #[test]
    fn test_doc_annotation_fallback_warns() {
        let closure = closure_for(&registry(), "app::Player");
        let member = MemberDescriptor::method("chain").with_doc("@return static");

        let collector = WarningCollector::default();
        let annotations = Arc::clone(&collector.annotations);
        tracing::subscriber::with_default(collector, || {
            SignatureResolver::new(&EngineConfig::default())
                .resolve_member(&closure, &member, "app::Player");
        });
        assert_eq!(*annotations.lock(), vec!["static".to_string()]);

        let collector = WarningCollector::default();
        let annotations = Arc::clone(&collector.annotations);
        tracing::subscriber::with_default(collector, || {
            SignatureResolver::new(&EngineConfig::strict())
                .resolve_member(&closure, &member, "app::Player");
            SignatureResolver::new(&EngineConfig::default()).resolve_member(
                &closure,
                &MemberDescriptor::method("chain").returns("static"),
                "app::Player",
            );
        });
        assert!(annotations.lock().is_empty());
    }

    #[test]
    fn test_doc_annotation_fallback() {
        let closure = closure_for(&registry(), "app::Player");
        let member =
            MemberDescriptor::method("chain").with_doc("Chains.\n@return static the player");

        let sig = SignatureResolver::new(&EngineConfig::default())
            .resolve_member(&closure, &member, "app::Player");
        assert_eq!(sig.return_source, ReturnSource::DocAnnotation);
        assert!(sig.returns_self);

        let sig = SignatureResolver::new(&EngineConfig::strict())
            .resolve_member(&closure, &member, "app::Player");
        assert_eq!(sig.return_source, ReturnSource::Implicit);
        assert!(!sig.returns_self);
        assert!(sig.is_mappable());
    }

    #[test]
    fn test_doc_annotation_ignores_other_tags() {
        assert_eq!(doc_return_token("@returns static"), None);
        assert_eq!(doc_return_token(" * @return  void  "), Some("void"));
        assert_eq!(doc_return_token("no tags here"), None);
    }

    #[test]
    fn test_parameter_rendering_and_degradation() {
        let member = MemberDescriptor::method("load")
            .param(ParameterDescriptor::new("a").with_type("int"))
            .param(ParameterDescriptor::new("b").with_type("string").with_null_default())
            .param(ParameterDescriptor::new("c").with_type("int").with_default("3"))
            .param(ParameterDescriptor::new("d").with_type("A|B").with_unavailable_default())
            .param(ParameterDescriptor::new("out").passed_by_reference())
            .param(ParameterDescriptor::new("rest").as_variadic())
            .returns("static");

        let sig = SignatureResolver::new(&EngineConfig::default()).resolve_member(
            &TypeClosure::default(),
            &member,
            "app::Loader",
        );
        assert_eq!(
            sig.render(),
            "load(a: int, b: ?string = null, c: int = 3, d: A|B|null = null, &out, ...rest) \
             -> static"
        );
    }

    #[test]
    fn test_builtin_defaults_degrade_to_null() {
        let member = MemberDescriptor::method("slice")
            .builtin()
            .param(ParameterDescriptor::new("offset").with_type("int").with_default("0"));
        let sig = SignatureResolver::new(&EngineConfig::default()).resolve_member(
            &TypeClosure::default(),
            &member,
            "ArrayObject",
        );
        assert_eq!(sig.params[0].default, ParamDefault::AllowNull);
        assert_eq!(sig.params[0].type_expr.as_deref(), Some("?int"));
    }

    #[test]
    fn test_unresolved_signature() {
        let registry = registry();
        let resolver = SignatureResolver::new(&EngineConfig::default());
        assert!(matches!(
            resolver.resolve(&registry, "app::Missing", "play"),
            Err(ProxyError::UnresolvedSignature { .. })
        ));
        assert!(matches!(
            resolver.resolve(&registry, "app::Player", "missing"),
            Err(ProxyError::UnresolvedSignature { .. })
        ));
    }

    #[test]
    fn test_function_signatures_never_return_self() {
        let function = FunctionDescriptor::new("app::make").returns("static");
        let sig = SignatureResolver::new(&EngineConfig::default()).resolve_function(&function);
        assert!(!sig.returns_self);
        assert_eq!(sig.declared_in, "app::make");
    }
}
