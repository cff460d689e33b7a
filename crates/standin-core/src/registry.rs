//! # Type Registry
//!
//! The registry is the "describe" step of the engine: it holds the immutable
//! descriptors of every proxiable type and function, and answers the graph
//! questions synthesis needs.
//!
//! ## Key Operations
//!
//! | Operation | Description |
//! |-----------|-------------|
//! | [`TypeRegistry::register`] | Add a type descriptor (once per name) |
//! | [`TypeRegistry::type_closure`] | Walk ancestors and capability sets of a type |
//! | [`TypeRegistry::effective_members`] | Own, mixed-in, inherited and declared members |
//! | [`TypeRegistry::anchor_for`] | Concrete anchor type carrying a mixin's members |
//! | [`TypeRegistry::load_manifest`] | Register descriptors from a JSON manifest |
//!
//! ## Member Precedence
//!
//! ```text
//! own members  ─►  mixin members  ─►  parent chain  ─►  capability declarations
//!   (first declaration of a name wins)
//! ```

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::descriptor::{
    normalize_type_name, short_type_name, FunctionDescriptor, MemberDescriptor, MemberKind,
    TargetDescriptor, TargetKind,
};
use crate::error::{ProxyError, ProxyResult};

/// Host builtin: base capability of everything that can be iterated.
pub const TRAVERSABLE: &str = "Traversable";
/// Host builtin: capability of types that produce an iterator on request.
pub const AGGREGATE: &str = "Aggregate";
/// The iterator-producing member of [`AGGREGATE`].
pub const ITERATOR_PRODUCING_MEMBER: &str = "get_iterator";
/// Host builtin: countable collections.
pub const COUNTABLE: &str = "Countable";

/// Suffix of the anchor types derived for mixins.
const ANCHOR_SUFFIX: &str = "__Anchor";

/// JSON manifest of descriptors.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub types: Vec<TargetDescriptor>,
    #[serde(default)]
    pub functions: Vec<FunctionDescriptor>,
}

/// Every type name a proxy of some target is substitutable for.
#[derive(Debug, Clone, Default)]
pub struct TypeClosure {
    /// The type the closure was computed for
    pub target: String,
    /// Ancestor chain, nearest first
    pub ancestors: Vec<String>,
    /// Capability sets, including those inherited and extended
    pub capabilities: BTreeSet<String>,
}

impl TypeClosure {
    /// Whether `type_name` names the target, an ancestor or a capability.
    ///
    /// Both fully qualified and short names match.
    pub fn matches(&self, type_name: &str) -> bool {
        let wanted = normalize_type_name(type_name);
        if wanted.is_empty() {
            return false;
        }
        let short_query = !wanted.contains("::");
        self.names().any(|name| {
            name == wanted || (short_query && short_type_name(name) == wanted)
        })
    }

    /// All names in the closure: target, ancestors, capabilities.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.target.as_str())
            .chain(self.ancestors.iter().map(String::as_str))
            .chain(self.capabilities.iter().map(String::as_str))
    }

    pub fn has_capability(&self, name: &str) -> bool {
        self.capabilities.contains(normalize_type_name(name))
    }
}

/// A member together with the type it is attributed to.
#[derive(Debug, Clone)]
pub struct OwnedMember {
    pub member: MemberDescriptor,
    pub declared_in: String,
}

/// Thread-safe store of immutable descriptors.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: RwLock<HashMap<String, Arc<TargetDescriptor>>>,
    functions: RwLock<HashMap<String, Arc<FunctionDescriptor>>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with the host builtin capabilities.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for builtin in builtin_descriptors() {
            // A fresh registry cannot hold duplicates.
            let _ = registry.register(builtin);
        }
        registry
    }

    /// Register a type descriptor. Names are unique; descriptors are immutable once registered.
    pub fn register(&self, descriptor: TargetDescriptor) -> ProxyResult<Arc<TargetDescriptor>> {
        let name = normalize_type_name(&descriptor.name).to_string();
        if name.is_empty() {
            return Err(ProxyError::invalid("<unnamed>", "type descriptors need a name"));
        }
        if self.functions.read().contains_key(&name) {
            return Err(ProxyError::invalid(
                &name,
                "a function with this name is already registered",
            ));
        }

        let mut types = self.types.write();
        if types.contains_key(&name) {
            return Err(ProxyError::invalid(
                &name,
                "a type with this name is already registered",
            ));
        }
        let descriptor = Arc::new(TargetDescriptor { name: name.clone(), ..descriptor });
        types.insert(name.clone(), Arc::clone(&descriptor));
        debug!(target_type = %name, members = descriptor.members.len(), "registered type");
        Ok(descriptor)
    }

    /// Register a free function descriptor.
    pub fn register_function(
        &self,
        descriptor: FunctionDescriptor,
    ) -> ProxyResult<Arc<FunctionDescriptor>> {
        let name = normalize_type_name(&descriptor.name).to_string();
        if name.is_empty() {
            return Err(ProxyError::invalid("<unnamed>", "function descriptors need a name"));
        }
        if self.types.read().contains_key(&name) {
            return Err(ProxyError::invalid(
                &name,
                "a type with this name is already registered",
            ));
        }

        let mut functions = self.functions.write();
        if functions.contains_key(&name) {
            return Err(ProxyError::invalid(
                &name,
                "a function with this name is already registered",
            ));
        }
        let descriptor = Arc::new(FunctionDescriptor { name: name.clone(), ..descriptor });
        functions.insert(name.clone(), Arc::clone(&descriptor));
        debug!(function = %name, "registered function");
        Ok(descriptor)
    }

    pub fn describe(&self, name: &str) -> Option<Arc<TargetDescriptor>> {
        self.types.read().get(normalize_type_name(name)).cloned()
    }

    pub fn describe_function(&self, name: &str) -> Option<Arc<FunctionDescriptor>> {
        self.functions.read().get(normalize_type_name(name)).cloned()
    }

    /// Whether a type or function with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        let name = normalize_type_name(name);
        self.types.read().contains_key(name) || self.functions.read().contains_key(name)
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.types.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Registered function names, sorted.
    pub fn function_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.functions.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Walk the ancestor chain and capability graph of `target`.
    ///
    /// Unregistered names still join the closure; they just are not expanded.
    pub fn type_closure(&self, target: &TargetDescriptor) -> TypeClosure {
        let mut closure = TypeClosure {
            target: target.name.clone(),
            ..TypeClosure::default()
        };
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(target.name.clone());

        let mut pending_capabilities: VecDeque<String> =
            target.capabilities.iter().cloned().collect();

        // Ancestor chain, nearest first.
        let mut next_parent = target.parent.clone();
        while let Some(parent) = next_parent.take() {
            if !visited.insert(parent.clone()) {
                break;
            }
            closure.ancestors.push(parent.clone());
            if let Some(desc) = self.describe(&parent) {
                pending_capabilities.extend(desc.capabilities.iter().cloned());
                next_parent = desc.parent.clone();
            }
        }

        // Capability graph, breadth first.
        while let Some(capability) = pending_capabilities.pop_front() {
            if !closure.capabilities.insert(capability.clone()) {
                continue;
            }
            if let Some(desc) = self.describe(&capability) {
                pending_capabilities.extend(desc.capabilities.iter().cloned());
                if let Some(parent) = &desc.parent {
                    pending_capabilities.push_back(parent.clone());
                }
            }
        }

        closure
    }

    /// Collect every member visible on `target`, attributed to the type that provides it.
    pub fn effective_members(&self, target: &TargetDescriptor) -> Vec<OwnedMember> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut visited: HashSet<String> = HashSet::new();
        let mut members = Vec::new();
        self.collect_members(target, &target.name, &mut seen, &mut visited, &mut members);
        members
    }

    fn collect_members(
        &self,
        target: &TargetDescriptor,
        attributed_to: &str,
        seen: &mut HashSet<String>,
        visited: &mut HashSet<String>,
        out: &mut Vec<OwnedMember>,
    ) {
        if !visited.insert(target.name.clone()) {
            return;
        }

        let declarations_only = target.kind == TargetKind::Capability;
        for member in &target.members {
            if seen.insert(member.name.clone()) {
                let member = if declarations_only {
                    member.clone().as_abstract()
                } else {
                    member.clone()
                };
                out.push(OwnedMember {
                    member,
                    declared_in: attributed_to.to_string(),
                });
            }
        }

        // Mixin members belong to the type that uses the mixin.
        for mixin in &target.mixins {
            if let Some(desc) = self.describe(mixin) {
                self.collect_members(&desc, attributed_to, seen, visited, out);
            }
        }

        if let Some(parent) = &target.parent {
            if let Some(desc) = self.describe(parent) {
                let owner = desc.name.clone();
                self.collect_members(&desc, &owner, seen, visited, out);
            }
        }

        for capability in &target.capabilities {
            if let Some(desc) = self.describe(capability) {
                let owner = desc.name.clone();
                self.collect_members(&desc, &owner, seen, visited, out);
            }
        }
    }

    /// The constructor a delegating proxy of `target` runs, if any.
    pub fn find_constructor(&self, target: &TargetDescriptor) -> Option<MemberDescriptor> {
        let mut current = Some(Arc::new(target.clone()));
        let mut visited: HashSet<String> = HashSet::new();
        while let Some(desc) = current.take() {
            if !visited.insert(desc.name.clone()) {
                break;
            }
            if let Some(ctor) = desc
                .members
                .iter()
                .find(|m| m.kind == MemberKind::Constructor)
            {
                return Some(ctor.clone());
            }
            for mixin in &desc.mixins {
                if let Some(ctor) = self.describe(mixin).and_then(|m| {
                    m.members
                        .iter()
                        .find(|member| member.kind == MemberKind::Constructor)
                        .cloned()
                }) {
                    return Some(ctor);
                }
            }
            current = desc.parent.as_deref().and_then(|p| self.describe(p));
        }
        None
    }

    /// Derive the concrete anchor type for a mixin.
    ///
    /// The anchor is an abstract class that carries the mixin's members as
    /// ordinary members attributed to the anchor, so concrete mixin members
    /// have an original implementation to fall back to.
    pub fn anchor_for(&self, mixin: &TargetDescriptor) -> TargetDescriptor {
        let anchor_name = format!("{}{}", mixin.name, ANCHOR_SUFFIX);
        let members = self
            .effective_members(mixin)
            .into_iter()
            .map(|owned| owned.member)
            .collect();
        TargetDescriptor {
            name: anchor_name,
            kind: TargetKind::Class,
            is_final: false,
            is_abstract: true,
            parent: None,
            capabilities: Vec::new(),
            mixins: Vec::new(),
            members,
        }
    }

    /// Register every descriptor of a JSON manifest. Returns the number registered.
    pub fn load_manifest_str(&self, json: &str) -> Result<usize> {
        let manifest: Manifest =
            serde_json::from_str(json).context("Failed to parse descriptor manifest")?;
        let mut count = 0;
        for descriptor in manifest.types {
            let name = descriptor.name.clone();
            self.register(descriptor)
                .with_context(|| format!("Failed to register type {}", name))?;
            count += 1;
        }
        for descriptor in manifest.functions {
            let name = descriptor.name.clone();
            self.register_function(descriptor)
                .with_context(|| format!("Failed to register function {}", name))?;
            count += 1;
        }
        debug!(count, "loaded descriptor manifest");
        Ok(count)
    }

    /// Load a JSON manifest file.
    pub fn load_manifest(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        self.load_manifest_str(&json)
    }
}

/// Descriptors of the host builtins known to the engine.
fn builtin_descriptors() -> Vec<TargetDescriptor> {
    vec![
        TargetDescriptor::capability(TRAVERSABLE),
        TargetDescriptor::capability(AGGREGATE)
            .implements(TRAVERSABLE)
            .with_member(MemberDescriptor::method(ITERATOR_PRODUCING_MEMBER).builtin()),
        TargetDescriptor::capability(COUNTABLE)
            .with_member(MemberDescriptor::method("count").returns("int").builtin()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn registry() -> TypeRegistry {
        let registry = TypeRegistry::with_builtins();
        registry
            .register(
                TargetDescriptor::capability("app::Playable")
                    .with_member(MemberDescriptor::method("play").returns("static")),
            )
            .unwrap();
        registry
            .register(TargetDescriptor::capability("app::Recorder").implements("app::Playable"))
            .unwrap();
        registry
            .register(
                TargetDescriptor::mixin("app::Greets").with_member(
                    MemberDescriptor::method("greet")
                        .returns("string")
                        .with_body(|_, _| Ok(Value::from("hello"))),
                ),
            )
            .unwrap();
        registry
            .register(
                TargetDescriptor::class("app::Base")
                    .as_abstract()
                    .implements(COUNTABLE)
                    .with_member(MemberDescriptor::method("play").returns("self"))
                    .with_member(MemberDescriptor::constructor().with_body(|_, _| Ok(Value::Null))),
            )
            .unwrap();
        registry
            .register(
                TargetDescriptor::class("app::Player")
                    .extends("app::Base")
                    .implements("app::Recorder")
                    .uses("app::Greets")
                    .with_member(MemberDescriptor::method("name").returns("string")),
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = registry();
        let err = registry
            .register(TargetDescriptor::class("app::Player"))
            .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidConfiguration { .. }));

        let err = registry
            .register_function(FunctionDescriptor::new("app::Player"))
            .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_type_closure_walks_ancestors_and_capabilities() {
        let registry = registry();
        let player = registry.describe("app::Player").unwrap();
        let closure = registry.type_closure(&player);

        assert_eq!(closure.ancestors, vec!["app::Base".to_string()]);
        assert!(closure.has_capability("app::Recorder"));
        assert!(closure.has_capability("app::Playable"));
        assert!(closure.has_capability(COUNTABLE));
        assert!(closure.matches("Player"));
        assert!(closure.matches("::app::Base"));
        assert!(closure.matches("Playable"));
        assert!(!closure.matches("app::Greets"));
        assert!(!closure.matches("other::Player"));
    }

    #[test]
    fn test_type_closure_survives_cycles() {
        let registry = TypeRegistry::new();
        registry
            .register(TargetDescriptor::capability("A").implements("B"))
            .unwrap();
        registry
            .register(TargetDescriptor::capability("B").implements("A"))
            .unwrap();
        let a = registry.describe("A").unwrap();
        let closure = registry.type_closure(&a);
        assert!(closure.has_capability("B"));
    }

    #[test]
    fn test_effective_members_precedence() {
        let registry = registry();
        let player = registry.describe("app::Player").unwrap();
        let members = registry.effective_members(&player);
        let names: Vec<&str> = members.iter().map(|m| m.member.name.as_str()).collect();

        assert_eq!(names, vec!["name", "greet", "play", "construct", "count"]);

        let greet = members.iter().find(|m| m.member.name == "greet").unwrap();
        assert_eq!(greet.declared_in, "app::Player");
        assert!(greet.member.is_concrete());

        // Base::play shadows Playable::play.
        let play = members.iter().find(|m| m.member.name == "play").unwrap();
        assert_eq!(play.declared_in, "app::Base");
        assert_eq!(play.member.returns.as_deref(), Some("self"));

        let count = members.iter().find(|m| m.member.name == "count").unwrap();
        assert!(count.member.is_builtin);
        assert!(!count.member.is_concrete());
    }

    #[test]
    fn test_find_constructor_walks_parents() {
        let registry = registry();
        let player = registry.describe("app::Player").unwrap();
        assert!(registry.find_constructor(&player).is_some());

        let playable = registry.describe("app::Playable").unwrap();
        assert!(registry.find_constructor(&playable).is_none());
    }

    #[test]
    fn test_anchor_for_mixin() {
        let registry = registry();
        let mixin = registry.describe("app::Greets").unwrap();
        let anchor = registry.anchor_for(&mixin);

        assert_eq!(anchor.name, "app::Greets__Anchor");
        assert_eq!(anchor.kind, TargetKind::Class);
        assert!(anchor.is_abstract);
        assert!(anchor.find_member("greet").unwrap().is_concrete());

        let members = registry.effective_members(&anchor);
        assert_eq!(members[0].declared_in, "app::Greets__Anchor");
    }

    #[test]
    fn test_load_manifest() {
        let registry = TypeRegistry::new();
        let count = registry
            .load_manifest_str(
                r#"{
                    "types": [{
                        "name": "app::Clock",
                        "members": [{"name": "now", "returns": "int"}]
                    }],
                    "functions": [{"name": "app::random", "returns": "int"}]
                }"#,
            )
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(registry.type_names(), vec!["app::Clock".to_string()]);
        assert_eq!(registry.function_names(), vec!["app::random".to_string()]);
        assert!(registry.contains("::app::random"));

        // Loading the same manifest twice fails on the duplicate.
        assert!(registry
            .load_manifest_str(r#"{"types": [{"name": "app::Clock"}]}"#)
            .is_err());
    }
}
