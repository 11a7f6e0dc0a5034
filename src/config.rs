//! Lint configuration.
//!
//! `LintConfig` is the JSON document a host hands over. It is compiled once
//! into an immutable [`LintContext`] snapshot that every analysis call
//! borrows. [`ContextStore`] swaps snapshots wholesale on reload so an
//! in-flight analysis never observes a half-applied configuration.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;

use crate::allowlist::AllowedClassMatcher;
use crate::eval::EvalLimits;
use crate::oracle::{CatalogOracle, ConflictGroupTable, ConflictGroups, ValidationOracle};
use crate::registry::{FunctionRegistry, FunctionShape, UtilityFunctionSpec};

pub const DEFAULT_ATTRIBUTES: &[&str] = &["class", "className"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid lint configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("allowed class pattern `{pattern}` does not compile: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("utility function entries need a non-empty name")]
    EmptyCalleeName,
    #[error("conflict groups need a non-empty id")]
    EmptyGroupId,
    #[error("conflict group `{0}` is declared more than once")]
    DuplicateGroup(String),
    #[error("limit `{0}` must be greater than zero")]
    ZeroLimit(&'static str),
}

/// `"cn"` or `{ "name": "cn", "from": "@/lib/utils", "shape": "variadicMerge" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CalleeConfig {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        shape: Option<FunctionShape>,
    },
}

impl CalleeConfig {
    fn to_spec(&self) -> Result<UtilityFunctionSpec, ConfigError> {
        let (name, from, shape) = match self {
            CalleeConfig::Name(name) => (name, None, None),
            CalleeConfig::Detailed { name, from, shape } => (name, from.as_deref(), *shape),
        };
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyCalleeName);
        }
        let shape = shape.unwrap_or(FunctionShape::VariadicMerge);
        Ok(match from {
            Some(module) => UtilityFunctionSpec::imported(name, module, shape),
            None => UtilityFunctionSpec::named(&[name.as_str()], shape),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictGroupConfig {
    pub id: String,
    #[serde(default)]
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckToggles {
    pub invalid: bool,
    pub duplicates: bool,
    pub conflicts: bool,
    pub hints: bool,
}

impl Default for CheckToggles {
    fn default() -> Self {
        Self {
            invalid: true,
            duplicates: true,
            conflicts: true,
            hints: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct LintConfig {
    pub attributes: Vec<String>,
    pub callees: Vec<CalleeConfig>,
    pub allowed_classes: Vec<String>,
    pub utilities: Vec<String>,
    pub variants: Vec<String>,
    pub utility_prefixes: Vec<String>,
    pub conflict_groups: Vec<ConflictGroupConfig>,
    pub checks: CheckToggles,
    pub limits: EvalLimits,
}

impl LintConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ═══════════════════════════════════════════════════════════════════════════════
// LINT CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything one analysis call reads. Never mutated after construction.
pub struct LintContext {
    pub oracle: Arc<dyn ValidationOracle>,
    pub groups: Arc<dyn ConflictGroupTable>,
    pub allowed: AllowedClassMatcher,
    pub registry: FunctionRegistry,
    pub attributes: Vec<String>,
    pub limits: EvalLimits,
    pub checks: CheckToggles,
    pub generation: u64,
    pub fingerprint: String,
}

impl fmt::Debug for LintContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LintContext")
            .field("attributes", &self.attributes)
            .field("limits", &self.limits)
            .field("checks", &self.checks)
            .field("generation", &self.generation)
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

impl Default for LintContext {
    fn default() -> Self {
        Self {
            oracle: Arc::new(CatalogOracle::default()),
            groups: Arc::new(ConflictGroups::builtin()),
            allowed: AllowedClassMatcher::default(),
            registry: FunctionRegistry::with_defaults(),
            attributes: DEFAULT_ATTRIBUTES.iter().map(|a| a.to_string()).collect(),
            limits: EvalLimits::default(),
            checks: CheckToggles::default(),
            generation: 0,
            fingerprint: fingerprint(""),
        }
    }
}

impl LintContext {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config = LintConfig::from_json(json)?;
        let mut context = Self::from_config(&config)?;
        context.fingerprint = fingerprint(json);
        Ok(context)
    }

    pub fn from_config(config: &LintConfig) -> Result<Self, ConfigError> {
        if config.limits.max_depth == 0 {
            return Err(ConfigError::ZeroLimit("maxDepth"));
        }
        if config.limits.max_nodes == 0 {
            return Err(ConfigError::ZeroLimit("maxNodes"));
        }

        let mut registry = FunctionRegistry::with_defaults();
        for callee in &config.callees {
            registry.add(callee.to_spec()?);
        }

        let mut allowed = AllowedClassMatcher::default();
        for pattern in &config.allowed_classes {
            allowed.add(pattern).map_err(|source| ConfigError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
        }

        let mut oracle = CatalogOracle::default();
        oracle.extend(&config.utilities, &config.variants, &config.utility_prefixes);

        let mut groups = ConflictGroups::builtin();
        let mut seen: Vec<&str> = Vec::new();
        for group in &config.conflict_groups {
            if group.id.trim().is_empty() {
                return Err(ConfigError::EmptyGroupId);
            }
            if seen.contains(&group.id.as_str()) {
                return Err(ConfigError::DuplicateGroup(group.id.clone()));
            }
            seen.push(&group.id);
            groups.insert(&group.id, group.members.iter().map(String::as_str));
        }

        let mut attributes: Vec<String> = DEFAULT_ATTRIBUTES.iter().map(|a| a.to_string()).collect();
        for attribute in &config.attributes {
            if !attributes.contains(attribute) {
                attributes.push(attribute.clone());
            }
        }

        let serialized = serde_json::to_string(config)?;
        Ok(Self {
            oracle: Arc::new(oracle),
            groups: Arc::new(groups),
            allowed,
            registry,
            attributes,
            limits: config.limits,
            checks: config.checks,
            generation: 0,
            fingerprint: fingerprint(&serialized),
        })
    }

    /// Replaces the validation oracle, for hosts that bring their own catalog.
    pub fn with_oracle(mut self, oracle: Arc<dyn ValidationOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn with_groups(mut self, groups: Arc<dyn ConflictGroupTable>) -> Self {
        self.groups = groups;
        self
    }

    pub fn is_class_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|attribute| attribute == name)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTEXT STORE
// ═══════════════════════════════════════════════════════════════════════════════

/// Process-wide holder of the current snapshot.
#[derive(Debug)]
pub struct ContextStore {
    current: RwLock<Arc<LintContext>>,
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new(LintContext::default())
    }
}

impl ContextStore {
    pub fn new(context: LintContext) -> Self {
        Self {
            current: RwLock::new(Arc::new(context)),
        }
    }

    pub fn snapshot(&self) -> Arc<LintContext> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn generation(&self) -> u64 {
        self.snapshot().generation
    }

    /// Compiles `json` and installs it as the next generation. Identical
    /// configuration text keeps the current snapshot. On error the current
    /// snapshot stays in place.
    pub fn reload_json(&self, json: &str) -> Result<u64, ConfigError> {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let incoming = fingerprint(json);
        if current.fingerprint == incoming {
            return Ok(current.generation);
        }

        let mut context = LintContext::from_json(json)?;
        context.generation = current.generation + 1;
        info!(
            generation = context.generation,
            fingerprint = %context.fingerprint,
            "lint configuration replaced"
        );
        let generation = context.generation;
        *current = Arc::new(context);
        Ok(generation)
    }

    /// Installs a programmatically built context as the next generation.
    pub fn replace(&self, mut context: LintContext) -> u64 {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        context.generation = current.generation + 1;
        info!(
            generation = context.generation,
            fingerprint = %context.fingerprint,
            "lint context replaced"
        );
        let generation = context.generation;
        *current = Arc::new(context);
        generation
    }
}
