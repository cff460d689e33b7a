//! Target descriptors: the introspected shape of types and functions.
//!
//! A [`TargetDescriptor`] is produced once per target (by hand through the
//! builder methods, or by loading a JSON manifest) and is immutable after it
//! is registered. Member bodies are optional; a member without a body has no
//! original implementation to fall back to.
//!
//! # Example
//!
//! ```
//! use standin_core::descriptor::{MemberDescriptor, ParameterDescriptor, TargetDescriptor};
//! use standin_core::value::Value;
//!
//! let player = TargetDescriptor::class("app::Player")
//!     .implements("app::Playable")
//!     .with_member(
//!         MemberDescriptor::method("play")
//!             .param(ParameterDescriptor::new("times").with_type("int").with_default("1"))
//!             .returns("static"),
//!     )
//!     .with_member(
//!         MemberDescriptor::method("name")
//!             .returns("string")
//!             .with_body(|_this, _args| Ok(Value::from("player one"))),
//!     );
//!
//! assert_eq!(player.short_name(), "Player");
//! assert!(player.find_member("play").is_some());
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::dispatcher::Proxy;
use crate::error::ProxyResult;
use crate::value::Value;

/// Original implementation of a method or constructor.
///
/// The receiver is the proxy itself, so bodies can read and write instance
/// properties and make self-calls that are intercepted like any other call.
pub type MethodBody = Arc<dyn Fn(&Proxy, &[Value]) -> ProxyResult<Value> + Send + Sync>;

/// Original implementation of a free function.
pub type FunctionBody = Arc<dyn Fn(&[Value]) -> ProxyResult<Value> + Send + Sync>;

/// Strip a leading `::` from a type name.
pub fn normalize_type_name(name: &str) -> &str {
    name.trim().trim_start_matches("::")
}

/// Last `::` segment of a type name.
pub fn short_type_name(name: &str) -> &str {
    let name = normalize_type_name(name);
    name.rsplit("::").next().unwrap_or(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    /// A concrete or abstract type with an ancestor chain
    #[default]
    Class,
    /// A pure capability set (interface); has no implementation of its own
    Capability,
    /// A behavioral mixin composed into other types
    Mixin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    #[default]
    Method,
    Constructor,
    Destructor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

/// Default value of an optional parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DefaultValue {
    /// A literal expression that can be reproduced verbatim
    Literal(String),
    /// The default is null
    Null,
    /// The member has a default that introspection cannot expose
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    /// Declared type expression; `None` for untyped parameters
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_expr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    #[serde(default)]
    pub by_reference: bool,
    /// Variadic parameters are always last and never have a default
    #[serde(default)]
    pub variadic: bool,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_expr: None,
            default: None,
            by_reference: false,
            variadic: false,
        }
    }

    pub fn with_type(mut self, type_expr: impl Into<String>) -> Self {
        self.type_expr = Some(type_expr.into());
        self
    }

    pub fn with_default(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(DefaultValue::Literal(literal.into()));
        self
    }

    pub fn with_null_default(mut self) -> Self {
        self.default = Some(DefaultValue::Null);
        self
    }

    pub fn with_unavailable_default(mut self) -> Self {
        self.default = Some(DefaultValue::Unavailable);
        self
    }

    pub fn passed_by_reference(mut self) -> Self {
        self.by_reference = true;
        self
    }

    pub fn as_variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Whether a caller may omit this parameter.
    pub fn is_optional(&self) -> bool {
        self.default.is_some() || self.variadic
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct MemberDescriptor {
    pub name: String,
    #[serde(default)]
    pub kind: MemberKind,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_abstract: bool,
    /// Provided by the host rather than user code
    #[serde(default)]
    pub is_builtin: bool,
    #[serde(default)]
    pub params: Vec<ParameterDescriptor>,
    /// Declared return type expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
    /// Structured doc comment (legacy `@return` annotations)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(skip)]
    pub body: Option<MethodBody>,
}

impl fmt::Debug for MemberDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("visibility", &self.visibility)
            .field("is_final", &self.is_final)
            .field("is_static", &self.is_static)
            .field("is_abstract", &self.is_abstract)
            .field("is_builtin", &self.is_builtin)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("doc", &self.doc)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

impl MemberDescriptor {
    fn with_kind(name: impl Into<String>, kind: MemberKind) -> Self {
        Self {
            name: name.into(),
            kind,
            visibility: Visibility::Public,
            is_final: false,
            is_static: false,
            is_abstract: false,
            is_builtin: false,
            params: Vec::new(),
            returns: None,
            doc: None,
            body: None,
        }
    }

    pub fn method(name: impl Into<String>) -> Self {
        Self::with_kind(name, MemberKind::Method)
    }

    pub fn constructor() -> Self {
        Self::with_kind("construct", MemberKind::Constructor)
    }

    pub fn destructor() -> Self {
        Self::with_kind("destruct", MemberKind::Destructor)
    }

    pub fn param(mut self, param: ParameterDescriptor) -> Self {
        self.params.push(param);
        self
    }

    pub fn returns(mut self, type_expr: impl Into<String>) -> Self {
        self.returns = Some(type_expr.into());
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn protected(mut self) -> Self {
        self.visibility = Visibility::Protected;
        self
    }

    pub fn private(mut self) -> Self {
        self.visibility = Visibility::Private;
        self
    }

    pub fn finalized(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn as_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn as_abstract(mut self) -> Self {
        self.is_abstract = true;
        self.body = None;
        self
    }

    pub fn builtin(mut self) -> Self {
        self.is_builtin = true;
        self
    }

    /// Attach the original implementation.
    pub fn with_body<F>(mut self, body: F) -> Self
    where
        F: Fn(&Proxy, &[Value]) -> ProxyResult<Value> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self.is_abstract = false;
        self
    }

    /// Whether an original implementation exists to fall back to.
    pub fn is_concrete(&self) -> bool {
        !self.is_abstract && self.body.is_some()
    }

    /// Public or protected, non-final, non-static, and not a constructor or destructor.
    pub fn is_interceptable(&self) -> bool {
        self.kind == MemberKind::Method
            && self.visibility != Visibility::Private
            && !self.is_final
            && !self.is_static
    }

    /// Number of parameters a caller must supply.
    pub fn required_params(&self) -> usize {
        self.params.iter().filter(|p| !p.is_optional()).count()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetDescriptor {
    /// Fully qualified name, `::`-separated
    pub name: String,
    #[serde(default)]
    pub kind: TargetKind,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Implemented (or, for capabilities, extended) capability sets
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Mixins composed into this type
    #[serde(default)]
    pub mixins: Vec<String>,
    #[serde(default)]
    pub members: Vec<MemberDescriptor>,
}

impl TargetDescriptor {
    fn with_kind(name: impl Into<String>, kind: TargetKind) -> Self {
        let name: String = name.into();
        Self {
            name: normalize_type_name(&name).to_string(),
            kind,
            is_final: false,
            is_abstract: kind == TargetKind::Capability,
            parent: None,
            capabilities: Vec::new(),
            mixins: Vec::new(),
            members: Vec::new(),
        }
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::with_kind(name, TargetKind::Class)
    }

    pub fn capability(name: impl Into<String>) -> Self {
        Self::with_kind(name, TargetKind::Capability)
    }

    pub fn mixin(name: impl Into<String>) -> Self {
        Self::with_kind(name, TargetKind::Mixin)
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        let parent: String = parent.into();
        self.parent = Some(normalize_type_name(&parent).to_string());
        self
    }

    pub fn implements(mut self, capability: impl Into<String>) -> Self {
        let capability: String = capability.into();
        self.capabilities
            .push(normalize_type_name(&capability).to_string());
        self
    }

    pub fn uses(mut self, mixin: impl Into<String>) -> Self {
        let mixin: String = mixin.into();
        self.mixins.push(normalize_type_name(&mixin).to_string());
        self
    }

    pub fn finalized(mut self) -> Self {
        self.is_final = true;
        self
    }

    pub fn as_abstract(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn with_member(mut self, member: MemberDescriptor) -> Self {
        // Capability members are declarations only.
        let member = if self.kind == TargetKind::Capability {
            member.as_abstract()
        } else {
            member
        };
        self.members.push(member);
        self
    }

    pub fn short_name(&self) -> &str {
        short_type_name(&self.name)
    }

    pub fn find_member(&self, name: &str) -> Option<&MemberDescriptor> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// A free function that can be proxied.
#[derive(Clone, Serialize, Deserialize)]
pub struct FunctionDescriptor {
    pub name: String,
    #[serde(default)]
    pub params: Vec<ParameterDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub returns: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(default)]
    pub is_builtin: bool,
    #[serde(skip)]
    pub body: Option<FunctionBody>,
}

impl fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("doc", &self.doc)
            .field("is_builtin", &self.is_builtin)
            .field("has_body", &self.body.is_some())
            .finish()
    }
}

impl FunctionDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            name: normalize_type_name(&name).to_string(),
            params: Vec::new(),
            returns: None,
            doc: None,
            is_builtin: false,
            body: None,
        }
    }

    pub fn param(mut self, param: ParameterDescriptor) -> Self {
        self.params.push(param);
        self
    }

    pub fn returns(mut self, type_expr: impl Into<String>) -> Self {
        self.returns = Some(type_expr.into());
        self
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }

    pub fn with_body<F>(mut self, body: F) -> Self
    where
        F: Fn(&[Value]) -> ProxyResult<Value> + Send + Sync + 'static,
    {
        self.body = Some(Arc::new(body));
        self
    }

    /// View this function as a member so it can share the resolver path.
    pub(crate) fn as_member(&self) -> MemberDescriptor {
        MemberDescriptor {
            name: self.name.clone(),
            kind: MemberKind::Method,
            visibility: Visibility::Public,
            is_final: false,
            is_static: false,
            is_abstract: self.body.is_none(),
            is_builtin: self.is_builtin,
            params: self.params.clone(),
            returns: self.returns.clone(),
            doc: self.doc.clone(),
            body: None,
        }
    }
}
