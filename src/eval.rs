//! Expression Evaluator
//!
//! Flattens a class-bearing expression into branch-tagged occurrences of
//! class tokens. Only values that are statically derivable contribute; any
//! shape without a rule (unknown calls, unresolved identifiers, computed
//! values) contributes nothing.
//!
//! ## Evaluation rules
//!
//! 1. **Literals**: string literals and static template chunks are split on
//!    whitespace, one occurrence per token with its own sub-span.
//! 2. **Template holes**: evaluated only when whitespace-delimited and the
//!    hole is a conditional, logical expression or identifier. Chunk tokens
//!    glued to a hole (`bg-${color}`) are partial and dropped.
//! 3. **Conditionals**: each node evaluation gets a fresh branch site; the
//!    consequent is arm 0, the alternate arm 1.
//! 4. **Logical**: only the right operand is evaluated.
//! 5. **Objects**: keys are class tokens; array/object/conditional/logical
//!    values are evaluated too, on the same branch path.
//! 6. **Identifiers**: resolved through the scope table and evaluated at the
//!    current branch path, reported at the outermost reference site.
//! 7. **Variant configs**: a direct call opens its own analysis unit; values
//!    inside one variant group are mutually exclusive arms.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::branch::{BranchPath, BranchSite};
use crate::expr::{find_property, CalleeRef, ClassExpr, ObjectProperty, TemplateQuasi};
use crate::registry::{FunctionRegistry, FunctionShape};
use crate::scope::{DeclScope, EntryId, ScopeTable};
use crate::span::{split_tokens, SourceSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OriginKind {
    Literal,
    ResolvedVariable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub text: String,
    /// Where diagnostics for this occurrence are reported.
    pub span: SourceSpan,
    /// The token's own location inside a declaration, when it was reached
    /// through a variable reference.
    pub declaration: Option<SourceSpan>,
    pub branch: BranchPath,
    pub origin: OriginKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Attribute,
    VariantConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteInfo {
    pub site: BranchSite,
    pub arms: u32,
}

/// Duplicate and conflict detection never looks across units.
#[derive(Debug, Clone)]
pub struct AnalysisUnit {
    pub kind: UnitKind,
    pub span: SourceSpan,
    pub occurrences: Vec<Occurrence>,
    pub sites: Vec<SiteInfo>,
}

impl AnalysisUnit {
    fn new(kind: UnitKind, span: SourceSpan) -> Self {
        Self {
            kind,
            span,
            occurrences: Vec::new(),
            sites: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EvalLimits {
    pub max_depth: usize,
    pub max_nodes: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            max_depth: 64,
            max_nodes: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub units: Vec<AnalysisUnit>,
    /// Set when a limit cut evaluation short; `units` is then partial.
    pub truncated: bool,
}

#[derive(Debug, Clone)]
struct Frame {
    path: BranchPath,
    scope: DeclScope,
    reference: Option<SourceSpan>,
    depth: usize,
}

impl Frame {
    fn root(scope: DeclScope) -> Self {
        Self {
            path: BranchPath::root(),
            scope,
            reference: None,
            depth: 0,
        }
    }

    fn deeper(&self) -> Self {
        Self {
            depth: self.depth + 1,
            ..self.clone()
        }
    }

    fn branch(&self, site: BranchSite, arm: u32) -> Self {
        Self {
            path: self.path.push(site, arm),
            ..self.clone()
        }
    }
}

type ValueSink<'f, 'c> = &'f mut dyn FnMut(&mut Evaluator<'c>, &ClassExpr, &Frame);

pub struct Evaluator<'c> {
    registry: &'c FunctionRegistry,
    scope: &'c ScopeTable,
    limits: EvalLimits,
    next_site: u32,
    visited: usize,
    truncated: bool,
    units: Vec<AnalysisUnit>,
    current: usize,
    resolving: Vec<EntryId>,
}

impl<'c> Evaluator<'c> {
    pub fn new(registry: &'c FunctionRegistry, scope: &'c ScopeTable, limits: EvalLimits) -> Self {
        Self {
            registry,
            scope,
            limits,
            next_site: 0,
            visited: 0,
            truncated: false,
            units: Vec::new(),
            current: 0,
            resolving: Vec::new(),
        }
    }

    /// Evaluates one class-bearing expression referenced from `from`.
    /// Units that produced no occurrences are dropped.
    pub fn evaluate(mut self, expr: &ClassExpr, from: DeclScope) -> Evaluation {
        self.units.push(AnalysisUnit::new(UnitKind::Attribute, expr.span()));
        self.current = 0;
        self.eval(expr, &Frame::root(from));

        let mut units = self.units;
        units.retain(|unit| !unit.occurrences.is_empty());
        Evaluation {
            units,
            truncated: self.truncated,
        }
    }

    fn enter(&mut self, frame: &Frame) -> bool {
        if self.truncated {
            return false;
        }
        self.visited += 1;
        if frame.depth > self.limits.max_depth || self.visited > self.limits.max_nodes {
            self.truncated = true;
            debug!(
                depth = frame.depth,
                visited = self.visited,
                max_depth = self.limits.max_depth,
                max_nodes = self.limits.max_nodes,
                "class expression evaluation cut off"
            );
            return false;
        }
        true
    }

    fn new_site(&mut self, arms: u32) -> BranchSite {
        let site = BranchSite(self.next_site);
        self.next_site += 1;
        self.units[self.current].sites.push(SiteInfo { site, arms });
        site
    }

    fn eval(&mut self, expr: &ClassExpr, frame: &Frame) {
        if !self.enter(frame) {
            return;
        }
        let next = frame.deeper();

        match expr {
            ClassExpr::StringLiteral { text, start, .. } => {
                for (offset, token) in split_tokens(text) {
                    self.emit(token, start + offset, &next);
                }
            }
            ClassExpr::Template { quasis, holes, .. } => self.eval_template(quasis, holes, &next),
            ClassExpr::Array { elements, .. } => {
                for element in elements {
                    self.eval(element, &next);
                }
            }
            ClassExpr::Object { properties, .. } => self.eval_object(properties, &next),
            ClassExpr::Conditional {
                consequent,
                alternate,
                ..
            } => {
                let site = self.new_site(2);
                self.eval(consequent, &next.branch(site, 0));
                self.eval(alternate, &next.branch(site, 1));
            }
            ClassExpr::Logical { right, .. } => self.eval(right, &next),
            ClassExpr::Call {
                callee,
                arguments,
                span,
            } => self.eval_call(callee, arguments, *span, &next),
            ClassExpr::Identifier { .. } | ClassExpr::Member { .. } => {
                self.with_value(expr, &next, &mut |this, value, inner| this.eval(value, inner));
            }
            ClassExpr::Wrapped { inner, .. } => self.eval(inner, &next),
            ClassExpr::Spread { argument, .. } => self.eval_spread(argument, &next),
            ClassExpr::Opaque { .. } => {}
        }
    }

    fn emit(&mut self, token: &str, start: u32, frame: &Frame) {
        let own = SourceSpan::new(start, start + token.len() as u32);
        let occurrence = match frame.reference {
            Some(reference) => Occurrence {
                text: token.to_string(),
                span: reference,
                declaration: Some(own),
                branch: frame.path.clone(),
                origin: OriginKind::ResolvedVariable,
            },
            None => Occurrence {
                text: token.to_string(),
                span: own,
                declaration: None,
                branch: frame.path.clone(),
                origin: OriginKind::Literal,
            },
        };
        self.units[self.current].occurrences.push(occurrence);
    }

    fn eval_template(&mut self, quasis: &[TemplateQuasi], holes: &[ClassExpr], frame: &Frame) {
        let last = quasis.len().saturating_sub(1);

        for (i, quasi) in quasis.iter().enumerate() {
            let tokens = split_tokens(&quasi.text);
            let count = tokens.len();
            for (t, (offset, token)) in tokens.into_iter().enumerate() {
                let glued_left = i > 0 && t == 0 && offset == 0;
                let glued_right =
                    i < last && t + 1 == count && offset as usize + token.len() == quasi.text.len();
                if glued_left || glued_right {
                    continue;
                }
                self.emit(token, quasi.start + offset, frame);
            }

            let Some(hole) = holes.get(i) else {
                continue;
            };
            let open_left = (i == 0 && quasi.text.is_empty()) || quasi.text.ends_with(char::is_whitespace);
            let open_right = quasis.get(i + 1).map_or(true, |next| {
                (i + 1 == last && next.text.is_empty()) || next.text.starts_with(char::is_whitespace)
            });
            let evaluable = matches!(
                hole.unwrapped(),
                ClassExpr::Conditional { .. } | ClassExpr::Logical { .. } | ClassExpr::Identifier { .. }
            );
            if open_left && open_right && evaluable {
                self.eval(hole, frame);
            }
        }
    }

    fn eval_object(&mut self, properties: &[ObjectProperty], frame: &Frame) {
        for property in properties {
            match property {
                ObjectProperty::Property { key, value, .. } => {
                    if let Some(key) = key {
                        for (offset, token) in split_tokens(&key.text) {
                            self.emit(token, key.start + offset, frame);
                        }
                    }
                    if matches!(
                        value.unwrapped(),
                        ClassExpr::Array { .. }
                            | ClassExpr::Object { .. }
                            | ClassExpr::Conditional { .. }
                            | ClassExpr::Logical { .. }
                    ) {
                        self.eval(value, frame);
                    }
                }
                ObjectProperty::Spread { argument, .. } => {
                    if is_reference(argument) {
                        self.with_value(argument, frame, &mut |this, value, inner| {
                            if let ClassExpr::Object { properties, .. } = value {
                                this.eval_object(properties, inner);
                            }
                        });
                    }
                }
            }
        }
    }

    /// Only spreads of a variable bound to an array literal contribute.
    fn eval_spread(&mut self, argument: &ClassExpr, frame: &Frame) {
        if !is_reference(argument) {
            return;
        }
        self.with_value(argument, frame, &mut |this, value, inner| {
            if let ClassExpr::Array { elements, .. } = value {
                for element in elements {
                    this.eval(element, inner);
                }
            }
        });
    }

    fn eval_call(&mut self, callee: &CalleeRef, arguments: &[ClassExpr], span: SourceSpan, frame: &Frame) {
        match self.registry.lookup(callee, self.scope.imports()) {
            Some(FunctionShape::VariadicMerge) => {
                for argument in arguments {
                    self.eval(argument, frame);
                }
            }
            // Variant configs reached through a variable are analysed at
            // their own call site.
            Some(FunctionShape::VariantConfig) if frame.reference.is_none() => {
                self.eval_variant_config(arguments, span, frame);
            }
            _ => {}
        }
    }

    fn eval_variant_config(&mut self, arguments: &[ClassExpr], span: SourceSpan, frame: &Frame) {
        self.units.push(AnalysisUnit::new(UnitKind::VariantConfig, span));
        let previous = std::mem::replace(&mut self.current, self.units.len() - 1);

        let root = Frame {
            path: BranchPath::root(),
            ..frame.clone()
        };
        for argument in arguments {
            self.with_value(argument, &root, &mut |this, value, inner| match value {
                ClassExpr::Object { properties, .. } => this.eval_variant_options(properties, inner),
                other => this.eval(other, inner),
            });
        }

        self.current = previous;
    }

    fn eval_variant_options(&mut self, properties: &[ObjectProperty], frame: &Frame) {
        for property in properties {
            let ObjectProperty::Property {
                key: Some(key),
                value,
                ..
            } = property
            else {
                continue;
            };

            match key.text.as_str() {
                "base" | "class" | "className" | "slots" => self.eval_slot_value(value, frame),
                "variants" => {
                    self.with_value(value, frame, &mut |this, groups, inner| {
                        if let ClassExpr::Object { properties, .. } = groups {
                            for group in properties {
                                if let ObjectProperty::Property { value, .. } = group {
                                    this.eval_variant_group(value, inner);
                                }
                            }
                        }
                    });
                }
                "compoundVariants" | "compoundSlots" => {
                    self.with_value(value, frame, &mut |this, entries, inner| {
                        if let ClassExpr::Array { elements, .. } = entries {
                            for entry in elements {
                                this.with_value(entry, inner, &mut |this, entry, inner| {
                                    if let ClassExpr::Object { properties, .. } = entry {
                                        for name in ["class", "className"] {
                                            if let Some(classes) = find_property(properties, name) {
                                                this.eval_slot_value(classes, inner);
                                            }
                                        }
                                    }
                                });
                            }
                        }
                    });
                }
                _ => {}
            }
        }
    }

    /// Values of one variant group are exclusive arms of a single site.
    fn eval_variant_group(&mut self, group: &ClassExpr, frame: &Frame) {
        self.with_value(group, frame, &mut |this, values, inner| {
            let ClassExpr::Object { properties, .. } = values else {
                return;
            };
            let arms: Vec<&ClassExpr> = properties
                .iter()
                .filter_map(|prop| match prop {
                    ObjectProperty::Property { value, .. } => Some(value),
                    ObjectProperty::Spread { .. } => None,
                })
                .collect();
            if arms.is_empty() {
                return;
            }
            let site = this.new_site(arms.len() as u32);
            for (arm, value) in arms.into_iter().enumerate() {
                this.eval_slot_value(value, &inner.branch(site, arm as u32));
            }
        });
    }

    /// A class value, or a slot map whose values are class values.
    fn eval_slot_value(&mut self, value: &ClassExpr, frame: &Frame) {
        self.with_value(value, frame, &mut |this, value, inner| match value {
            ClassExpr::Object { properties, .. } => {
                for prop in properties {
                    if let ObjectProperty::Property { value, .. } = prop {
                        this.eval(value, inner);
                    }
                }
            }
            other => this.eval(other, inner),
        });
    }

    /// Follows identifiers and static member selections to the expression
    /// they denote and hands it to `sink`. Unresolvable references and
    /// reference cycles produce no call.
    fn with_value(&mut self, expr: &ClassExpr, frame: &Frame, sink: ValueSink<'_, 'c>) {
        if !self.enter(frame) {
            return;
        }

        match expr.unwrapped() {
            ClassExpr::Identifier { name, span } => {
                let Some(id) = self.scope.resolve(name, frame.scope) else {
                    return;
                };
                if self.resolving.contains(&id) {
                    return;
                }
                let scope: &'c ScopeTable = self.scope;
                let entry = scope.entry(id);
                let inner = Frame {
                    path: frame.path.clone(),
                    scope: entry.declared_at,
                    reference: Some(frame.reference.unwrap_or(*span)),
                    depth: frame.depth + 1,
                };
                self.resolving.push(id);
                self.with_value(&entry.init, &inner, sink);
                self.resolving.pop();
            }
            ClassExpr::Member { object, property, .. } => {
                self.with_value(object, &frame.deeper(), &mut |this, value, inner| {
                    if let ClassExpr::Object { properties, .. } = value {
                        if let Some(selected) = find_property(properties, property) {
                            this.with_value(selected, inner, sink);
                        }
                    }
                });
            }
            other => sink(self, other, frame),
        }
    }
}

fn is_reference(expr: &ClassExpr) -> bool {
    matches!(
        expr.unwrapped(),
        ClassExpr::Identifier { .. } | ClassExpr::Member { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::PropertyKeyText;
    use crate::scope::{FunctionId, ScopeEntry};

    fn lit(text: &str, start: u32) -> ClassExpr {
        ClassExpr::string(text, SourceSpan::new(start, start + text.len() as u32 + 2))
    }

    fn ident(name: &str, start: u32) -> ClassExpr {
        ClassExpr::Identifier {
            name: name.to_string(),
            span: SourceSpan::new(start, start + name.len() as u32),
        }
    }

    fn conditional(consequent: ClassExpr, alternate: ClassExpr) -> ClassExpr {
        ClassExpr::Conditional {
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
            span: SourceSpan::default(),
        }
    }

    fn run(expr: &ClassExpr, scope: &ScopeTable) -> Evaluation {
        let registry = FunctionRegistry::with_defaults();
        Evaluator::new(&registry, scope, EvalLimits::default()).evaluate(expr, DeclScope::Module)
    }

    fn texts(unit: &AnalysisUnit) -> Vec<&str> {
        unit.occurrences.iter().map(|o| o.text.as_str()).collect()
    }

    #[test]
    fn test_literal_tokens_partition_span() {
        let expr = lit(" flex  p-4 ", 10);
        let evaluation = run(&expr, &ScopeTable::new());
        let unit = &evaluation.units[0];
        assert_eq!(texts(unit), vec!["flex", "p-4"]);
        assert_eq!(unit.occurrences[0].span, SourceSpan::new(12, 16));
        assert_eq!(unit.occurrences[1].span, SourceSpan::new(18, 21));
        assert!(unit.occurrences.iter().all(|o| o.origin == OriginKind::Literal));
    }

    #[test]
    fn test_conditional_arms_get_fresh_sites() {
        let expr = ClassExpr::Array {
            elements: vec![
                conditional(lit("a", 0), lit("b", 5)),
                conditional(lit("a", 10), lit("b", 15)),
            ],
            span: SourceSpan::default(),
        };
        let evaluation = run(&expr, &ScopeTable::new());
        let unit = &evaluation.units[0];
        assert_eq!(unit.sites.len(), 2);
        let first = &unit.occurrences[0].branch;
        let second = &unit.occurrences[1].branch;
        let third = &unit.occurrences[2].branch;
        assert!(!first.is_compatible(second));
        assert!(first.is_compatible(third));
    }

    #[test]
    fn test_identifier_reports_reference_site() {
        let mut scope = ScopeTable::new();
        scope.declare(ScopeEntry {
            name: "base".to_string(),
            init: lit("flex grid", 100),
            declared_at: DeclScope::Module,
            span: SourceSpan::new(90, 94),
        });
        let expr = ident("base", 5);
        let evaluation = run(&expr, &scope);
        let unit = &evaluation.units[0];
        assert_eq!(texts(unit), vec!["flex", "grid"]);
        assert!(unit.occurrences.iter().all(|o| o.span == SourceSpan::new(5, 9)));
        assert_eq!(unit.occurrences[1].declaration, Some(SourceSpan::new(106, 110)));
        assert_eq!(unit.occurrences[0].origin, OriginKind::ResolvedVariable);
    }

    #[test]
    fn test_cross_function_local_is_opaque() {
        let mut scope = ScopeTable::new();
        scope.declare(ScopeEntry {
            name: "local".to_string(),
            init: lit("flex", 0),
            declared_at: DeclScope::Function(FunctionId(0)),
            span: SourceSpan::default(),
        });
        let registry = FunctionRegistry::with_defaults();
        let expr = ident("local", 50);
        let from_g = Evaluator::new(&registry, &scope, EvalLimits::default())
            .evaluate(&expr, DeclScope::Function(FunctionId(1)));
        assert!(from_g.units.is_empty());
        let from_f = Evaluator::new(&registry, &scope, EvalLimits::default())
            .evaluate(&expr, DeclScope::Function(FunctionId(0)));
        assert_eq!(from_f.units[0].occurrences.len(), 1);
    }

    #[test]
    fn test_self_reference_terminates() {
        let mut scope = ScopeTable::new();
        scope.declare(ScopeEntry {
            name: "loop".to_string(),
            init: ClassExpr::Array {
                elements: vec![lit("flex", 0), ident("loop", 10)],
                span: SourceSpan::default(),
            },
            declared_at: DeclScope::Module,
            span: SourceSpan::default(),
        });
        let evaluation = run(&ident("loop", 40), &scope);
        assert_eq!(texts(&evaluation.units[0]), vec!["flex"]);
        assert!(!evaluation.truncated);
    }

    #[test]
    fn test_depth_limit_yields_partial_result() {
        let mut expr = lit("deep", 0);
        for _ in 0..200 {
            expr = ClassExpr::Array {
                elements: vec![lit("x", 0), expr],
                span: SourceSpan::default(),
            };
        }
        let evaluation = run(&expr, &ScopeTable::new());
        assert!(evaluation.truncated);
        let unit = &evaluation.units[0];
        assert!(!unit.occurrences.is_empty());
        assert!(!texts(unit).contains(&"deep"));
    }

    #[test]
    fn test_object_keys_and_nested_values() {
        let key = |text: &str, start: u32| Some(PropertyKeyText {
            text: text.to_string(),
            start,
        });
        let expr = ClassExpr::Object {
            properties: vec![
                ObjectProperty::Property {
                    key: key("p-2 m-1", 1),
                    value: ident("active", 20),
                    span: SourceSpan::default(),
                },
                ObjectProperty::Property {
                    key: None,
                    value: lit("ignored", 30),
                    span: SourceSpan::default(),
                },
                ObjectProperty::Property {
                    key: key("grid", 40),
                    value: ClassExpr::Array {
                        elements: vec![lit("gap-2", 50)],
                        span: SourceSpan::default(),
                    },
                    span: SourceSpan::default(),
                },
            ],
            span: SourceSpan::default(),
        };
        let evaluation = run(&expr, &ScopeTable::new());
        assert_eq!(texts(&evaluation.units[0]), vec!["p-2", "m-1", "grid", "gap-2"]);
        assert_eq!(evaluation.units[0].occurrences[1].span, SourceSpan::new(5, 8));
    }

    #[test]
    fn test_unknown_call_is_opaque() {
        let expr = ClassExpr::Call {
            callee: CalleeRef::Name("compute".to_string()),
            arguments: vec![lit("flex", 10)],
            span: SourceSpan::default(),
        };
        assert!(run(&expr, &ScopeTable::new()).units.is_empty());
    }

    #[test]
    fn test_template_skips_glued_tokens() {
        let expr = ClassExpr::Template {
            quasis: vec![
                TemplateQuasi {
                    text: "flex bg-".to_string(),
                    start: 1,
                },
                TemplateQuasi {
                    text: " p-4 ".to_string(),
                    start: 17,
                },
                TemplateQuasi {
                    text: "".to_string(),
                    start: 30,
                },
            ],
            holes: vec![ident("color", 11), ident("extra", 24)],
            span: SourceSpan::default(),
        };
        let mut scope = ScopeTable::new();
        for name in ["color", "extra"] {
            scope.declare(ScopeEntry {
                name: name.to_string(),
                init: lit(&format!("{name}-value"), 200),
                declared_at: DeclScope::Module,
                span: SourceSpan::default(),
            });
        }
        let evaluation = run(&expr, &scope);
        assert_eq!(texts(&evaluation.units[0]), vec!["flex", "p-4", "extra-value"]);
    }
}
