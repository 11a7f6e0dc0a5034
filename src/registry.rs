//! Utility function registry.
//!
//! Recognised class-merging (`cn`, `clsx`, ...) and variant-config (`tv`,
//! `cva`) functions. Entries are either matched by bare call-site name or
//! pinned to an export of a specific module, in which case the call-site
//! binding must come from a matching import.

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::expr::CalleeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FunctionShape {
    /// Every argument is a class expression.
    VariadicMerge,
    /// `{ base, variants, compoundVariants, slots }` style configuration.
    VariantConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportConstraint {
    pub exported_name: String,
    pub module_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtilityFunctionSpec {
    pub names: Vec<String>,
    pub import_constraint: Option<ImportConstraint>,
    pub shape: FunctionShape,
}

impl UtilityFunctionSpec {
    pub fn named(names: &[&str], shape: FunctionShape) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
            import_constraint: None,
            shape,
        }
    }

    pub fn imported(exported_name: &str, module_path: &str, shape: FunctionShape) -> Self {
        Self {
            names: vec![exported_name.to_string()],
            import_constraint: Some(ImportConstraint {
                exported_name: exported_name.to_string(),
                module_path: module_path.to_string(),
            }),
            shape,
        }
    }
}

/// What an import declaration binds locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedName {
    Default,
    Named(String),
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub local: String,
    pub imported: ImportedName,
    pub module_path: String,
}

lazy_static! {
    static ref BUILTIN_FUNCTIONS: Vec<UtilityFunctionSpec> = vec![
        UtilityFunctionSpec::named(
            &["cn", "clsx", "classnames", "classNames", "cx", "twMerge", "twJoin"],
            FunctionShape::VariadicMerge,
        ),
        UtilityFunctionSpec::named(&["tv", "cva"], FunctionShape::VariantConfig),
    ];
}

#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    specs: Vec<UtilityFunctionSpec>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl FunctionRegistry {
    pub fn empty() -> Self {
        Self { specs: Vec::new() }
    }

    pub fn with_defaults() -> Self {
        Self {
            specs: BUILTIN_FUNCTIONS.clone(),
        }
    }

    pub fn add(&mut self, spec: UtilityFunctionSpec) {
        self.specs.push(spec);
    }

    pub fn specs(&self) -> &[UtilityFunctionSpec] {
        &self.specs
    }

    /// Cheap pre-filter used by the host before imports are known: could
    /// `name` ever select a variant-config function?
    pub fn may_be_variant_config(&self, callee: &CalleeRef) -> bool {
        let name = match callee {
            CalleeRef::Name(name) => name.as_str(),
            CalleeRef::Member { property, .. } => property.as_str(),
            CalleeRef::Other => return false,
        };
        self.specs.iter().any(|spec| {
            spec.shape == FunctionShape::VariantConfig
                && (spec.names.iter().any(|n| n == name) || spec.import_constraint.is_some())
        })
    }

    /// Resolves a call site against the registry. Later entries win so
    /// configured additions can override a built-in shape.
    pub fn lookup(&self, callee: &CalleeRef, imports: &[ImportBinding]) -> Option<FunctionShape> {
        self.specs
            .iter()
            .rev()
            .find(|spec| spec_matches(spec, callee, imports))
            .map(|spec| spec.shape)
    }
}

fn spec_matches(spec: &UtilityFunctionSpec, callee: &CalleeRef, imports: &[ImportBinding]) -> bool {
    match (&spec.import_constraint, callee) {
        (None, CalleeRef::Name(name)) => spec.names.iter().any(|n| n == name),
        (None, _) => false,
        (Some(constraint), CalleeRef::Name(name)) => imports.iter().any(|binding| {
            binding.local == *name
                && binding.module_path == constraint.module_path
                && match &binding.imported {
                    ImportedName::Named(imported) => *imported == constraint.exported_name,
                    ImportedName::Default => {
                        constraint.exported_name == "default" || binding.local == constraint.exported_name
                    }
                    ImportedName::Namespace => false,
                }
        }),
        (Some(constraint), CalleeRef::Member { object, property }) => {
            *property == constraint.exported_name
                && imports.iter().any(|binding| {
                    binding.local == *object
                        && binding.module_path == constraint.module_path
                        && binding.imported == ImportedName::Namespace
                })
        }
        (Some(_), CalleeRef::Other) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> CalleeRef {
        CalleeRef::Name(n.to_string())
    }

    fn import(local: &str, imported: ImportedName, module: &str) -> ImportBinding {
        ImportBinding {
            local: local.to_string(),
            imported,
            module_path: module.to_string(),
        }
    }

    #[test]
    fn test_builtin_lookup() {
        let registry = FunctionRegistry::with_defaults();
        assert_eq!(registry.lookup(&name("cn"), &[]), Some(FunctionShape::VariadicMerge));
        assert_eq!(registry.lookup(&name("clsx"), &[]), Some(FunctionShape::VariadicMerge));
        assert_eq!(registry.lookup(&name("tv"), &[]), Some(FunctionShape::VariantConfig));
        assert_eq!(registry.lookup(&name("format"), &[]), None);
    }

    #[test]
    fn test_unconstrained_names_do_not_match_members() {
        let registry = FunctionRegistry::with_defaults();
        let callee = CalleeRef::Member {
            object: "utils".to_string(),
            property: "cn".to_string(),
        };
        assert_eq!(registry.lookup(&callee, &[]), None);
    }

    #[test]
    fn test_import_constraint_variants() {
        let mut registry = FunctionRegistry::empty();
        registry.add(UtilityFunctionSpec::imported(
            "merge",
            "@/lib/utils",
            FunctionShape::VariadicMerge,
        ));

        let named = [import("merge", ImportedName::Named("merge".into()), "@/lib/utils")];
        assert!(registry.lookup(&name("merge"), &named).is_some());

        let aliased = [import("m", ImportedName::Named("merge".into()), "@/lib/utils")];
        assert!(registry.lookup(&name("m"), &aliased).is_some());
        assert!(registry.lookup(&name("merge"), &aliased).is_none());

        let default = [import("merge", ImportedName::Default, "@/lib/utils")];
        assert!(registry.lookup(&name("merge"), &default).is_some());

        let namespace = [import("u", ImportedName::Namespace, "@/lib/utils")];
        let member = CalleeRef::Member {
            object: "u".to_string(),
            property: "merge".to_string(),
        };
        assert!(registry.lookup(&member, &namespace).is_some());

        let elsewhere = [import("merge", ImportedName::Named("merge".into()), "other-lib")];
        assert!(registry.lookup(&name("merge"), &elsewhere).is_none());
        assert!(registry.lookup(&name("merge"), &[]).is_none());
    }

    #[test]
    fn test_later_entries_override_shape() {
        let mut registry = FunctionRegistry::with_defaults();
        registry.add(UtilityFunctionSpec::named(&["cn"], FunctionShape::VariantConfig));
        assert_eq!(registry.lookup(&name("cn"), &[]), Some(FunctionShape::VariantConfig));
    }
}
