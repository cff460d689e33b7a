//! Inspection reports for registered targets.
//!
//! Reports are plain serializable views over what the engine would build for
//! a target: the generated type name, the type closure, and the resolved
//! signature of every forwarded member.

use anyhow::{anyhow, Result};
use serde::Serialize;
use standin_core::{
    CacheStats, Engine, ResolvedSignature, ReturnContract, ReturnSource, TargetKind,
};
use std::fmt;

/// Names registered in an engine.
#[derive(Debug, Clone, Serialize)]
pub struct ListReport {
    pub types: Vec<String>,
    pub functions: Vec<String>,
}

impl ListReport {
    pub fn from_engine(engine: &Engine) -> Self {
        Self {
            types: engine.registry().type_names(),
            functions: engine.registry().function_names(),
        }
    }
}

impl fmt::Display for ListReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Types ({}):", self.types.len())?;
        for name in &self.types {
            writeln!(f, "  {}", name)?;
        }
        writeln!(f, "Functions ({}):", self.functions.len())?;
        for name in &self.functions {
            writeln!(f, "  {}", name)?;
        }
        Ok(())
    }
}

/// One forwarded member of a proxy type.
#[derive(Debug, Clone, Serialize)]
pub struct MemberReport {
    pub name: String,
    pub signature: String,
    pub declared_in: String,
    pub return_contract: ReturnContract,
    pub return_source: ReturnSource,
    pub returns_self: bool,
    pub mappable: bool,
    pub has_original: bool,
}

impl MemberReport {
    fn new(signature: &ResolvedSignature, has_original: bool) -> Self {
        Self {
            name: signature.member.clone(),
            signature: signature.render(),
            declared_in: signature.declared_in.clone(),
            return_contract: signature.return_contract.clone(),
            return_source: signature.return_source,
            returns_self: signature.returns_self,
            mappable: signature.is_mappable(),
            has_original,
        }
    }

    /// Resolve a single member of a registered type.
    pub fn resolve(engine: &Engine, target: &str, member: &str) -> Result<Self> {
        let signature = engine.resolve_signature(target, member)?;
        let has_original = engine
            .synthesize(target)
            .ok()
            .and_then(|factory| factory.member(member).map(|entry| entry.has_original()))
            .unwrap_or(false);
        Ok(Self::new(&signature, has_original))
    }
}

impl fmt::Display for MemberReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut flags = Vec::new();
        if self.returns_self {
            flags.push("self-returning");
        }
        if !self.mappable {
            flags.push("not mappable");
        }
        if self.has_original {
            flags.push("original");
        }
        if self.return_source == ReturnSource::DocAnnotation {
            flags.push("doc annotation");
        }
        if flags.is_empty() {
            write!(f, "{}", self.signature)
        } else {
            write!(f, "{}  [{}]", self.signature, flags.join(", "))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportedKind {
    Class,
    Capability,
    Mixin,
    Function,
}

impl From<TargetKind> for ReportedKind {
    fn from(kind: TargetKind) -> Self {
        match kind {
            TargetKind::Class => ReportedKind::Class,
            TargetKind::Capability => ReportedKind::Capability,
            TargetKind::Mixin => ReportedKind::Mixin,
        }
    }
}

/// What the engine builds for one target.
#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub target: String,
    pub kind: ReportedKind,
    pub class_name: String,
    /// Type names proxies are substitutable for, excluding the target itself
    pub closure: Vec<String>,
    pub members: Vec<MemberReport>,
    pub cache: CacheStats,
}

impl TargetReport {
    /// Describe a registered type or function.
    pub fn describe(engine: &Engine, target: &str) -> Result<Self> {
        let registry = engine.registry();
        if let Some(descriptor) = registry.describe(target) {
            let factory = engine.synthesize(target)?;
            let closure = factory.closure();
            let members = factory
                .table()
                .iter()
                .map(|entry| MemberReport::new(entry.signature(), entry.has_original()))
                .collect();
            return Ok(Self {
                target: descriptor.name.clone(),
                kind: descriptor.kind.into(),
                class_name: factory.class_name().to_string(),
                closure: closure
                    .ancestors
                    .iter()
                    .chain(closure.capabilities.iter())
                    .cloned()
                    .collect(),
                members,
                cache: engine.cache_stats(),
            });
        }

        if let Some(descriptor) = registry.describe_function(target) {
            let factory = engine.synthesize_function(target)?;
            return Ok(Self {
                target: descriptor.name.clone(),
                kind: ReportedKind::Function,
                class_name: factory.class_name().to_string(),
                closure: Vec::new(),
                members: vec![MemberReport::new(
                    factory.signature(),
                    descriptor.body.is_some(),
                )],
                cache: engine.cache_stats(),
            });
        }

        Err(anyhow!("'{}' is not a registered type or function", target))
    }
}

impl fmt::Display for TargetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} ({:?})", self.target, self.kind)?;
        writeln!(f, "  proxy type: {}", self.class_name)?;
        if !self.closure.is_empty() {
            writeln!(f, "  substitutes for: {}", self.closure.join(", "))?;
        }
        writeln!(f, "  members:")?;
        for member in &self.members {
            writeln!(f, "    {}", member)?;
        }
        Ok(())
    }
}
