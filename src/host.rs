//! Source-file adapter.
//!
//! Parses a script with oxc, collects in one visitor pass everything the
//! engine needs (const declarations per function, import bindings,
//! class-bearing JSX attributes, standalone variant-config calls) and runs
//! the analysis pipeline over each target.

use oxc_allocator::Allocator;
use oxc_ast::ast::{
    ArrowFunctionExpression, BindingPattern, CallExpression, Function, ImportDeclaration,
    ImportDeclarationSpecifier, JSXAttribute, JSXAttributeName, ModuleExportName,
    VariableDeclarationKind, VariableDeclarator,
};
use oxc_ast_visit::{walk, Visit};
use oxc_parser::Parser;
use oxc_span::SourceType;
use oxc_syntax::scope::ScopeFlags;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::analyze::analyze_mapped;
use crate::config::LintContext;
use crate::diagnostics::{sort_diagnostics, Diagnostic};
use crate::expr::{CalleeRef, ClassExpr};
use crate::lower::{callee_ref, Lowerer};
use crate::position::{MappingSegment, PositionMapper};
use crate::registry::{FunctionShape, ImportBinding, ImportedName};
use crate::scope::{DeclScope, FunctionId, ScopeEntry, ScopeTable};
use crate::span::{LineIndex, SourceLocation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiagnostic {
    #[serde(flatten)]
    pub diagnostic: Diagnostic,
    pub start: SourceLocation,
    pub end: SourceLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintReport {
    pub file: String,
    pub diagnostics: Vec<FileDiagnostic>,
    #[serde(default)]
    pub parse_errors: Vec<String>,
}

impl LintReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TARGET COLLECTION
// ═══════════════════════════════════════════════════════════════════════════════

/// One expression to analyse and the scope its references resolve from.
#[derive(Debug, Clone)]
pub struct Target {
    pub expr: ClassExpr,
    pub from: DeclScope,
}

struct TargetCollector<'s, 'c> {
    lowerer: Lowerer<'s>,
    ctx: &'c LintContext,
    scope: ScopeTable,
    targets: Vec<Target>,
    /// Calls that might be variant configs once all imports are known.
    candidates: Vec<(CalleeRef, Target)>,
    functions: Vec<FunctionId>,
    next_function: u32,
}

impl<'s, 'c> TargetCollector<'s, 'c> {
    fn new(source: &'s str, ctx: &'c LintContext) -> Self {
        Self {
            lowerer: Lowerer::new(source),
            ctx,
            scope: ScopeTable::new(),
            targets: Vec::new(),
            candidates: Vec::new(),
            functions: Vec::new(),
            next_function: 0,
        }
    }

    fn current_scope(&self) -> DeclScope {
        self.functions
            .last()
            .map_or(DeclScope::Module, |id| DeclScope::Function(*id))
    }

    fn enter_function(&mut self) {
        self.functions.push(FunctionId(self.next_function));
        self.next_function += 1;
    }

    fn finish(self) -> (ScopeTable, Vec<Target>) {
        let TargetCollector {
            ctx,
            scope,
            mut targets,
            candidates,
            ..
        } = self;
        for (callee, target) in candidates {
            if ctx.registry.lookup(&callee, scope.imports()) == Some(FunctionShape::VariantConfig) {
                targets.push(target);
            }
        }
        targets.sort_by_key(|target| target.expr.span().start);
        (scope, targets)
    }
}

fn export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::IdentifierName(id) => id.name.to_string(),
        ModuleExportName::StringLiteral(s) => s.value.to_string(),
        ModuleExportName::IdentifierReference(id) => id.name.to_string(),
    }
}

impl<'a, 's, 'c> Visit<'a> for TargetCollector<'s, 'c> {
    fn visit_function(&mut self, func: &Function<'a>, flags: ScopeFlags) {
        self.enter_function();
        walk::walk_function(self, func, flags);
        self.functions.pop();
    }

    fn visit_arrow_function_expression(&mut self, func: &ArrowFunctionExpression<'a>) {
        self.enter_function();
        walk::walk_arrow_function_expression(self, func);
        self.functions.pop();
    }

    fn visit_variable_declarator(&mut self, decl: &VariableDeclarator<'a>) {
        if decl.kind == VariableDeclarationKind::Const {
            if let (BindingPattern::BindingIdentifier(id), Some(init)) = (&decl.id, &decl.init) {
                let entry = ScopeEntry {
                    name: id.name.to_string(),
                    init: self.lowerer.expression(init),
                    declared_at: self.current_scope(),
                    span: id.span.into(),
                };
                self.scope.declare(entry);
            }
        }
        walk::walk_variable_declarator(self, decl);
    }

    fn visit_import_declaration(&mut self, decl: &ImportDeclaration<'a>) {
        let Some(specifiers) = &decl.specifiers else {
            return;
        };
        let module_path = decl.source.value.to_string();
        for specifier in specifiers {
            let (local, imported) = match specifier {
                ImportDeclarationSpecifier::ImportSpecifier(s) => {
                    (s.local.name.to_string(), ImportedName::Named(export_name(&s.imported)))
                }
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => {
                    (s.local.name.to_string(), ImportedName::Default)
                }
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => {
                    (s.local.name.to_string(), ImportedName::Namespace)
                }
            };
            self.scope.add_import(ImportBinding {
                local,
                imported,
                module_path: module_path.clone(),
            });
        }
    }

    fn visit_jsx_attribute(&mut self, attr: &JSXAttribute<'a>) {
        if let JSXAttributeName::Identifier(name) = &attr.name {
            if self.ctx.is_class_attribute(name.name.as_str()) {
                let lowered = attr
                    .value
                    .as_ref()
                    .and_then(|value| self.lowerer.attribute_value(value));
                if let Some(expr) = lowered {
                    self.targets.push(Target {
                        expr,
                        from: self.current_scope(),
                    });
                }
                // Variant-config calls inside the attribute are analysed
                // as part of it.
                return;
            }
        }
        walk::walk_jsx_attribute(self, attr);
    }

    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        let callee = callee_ref(&call.callee);
        if self.ctx.registry.may_be_variant_config(&callee) {
            let target = Target {
                expr: self.lowerer.call(call),
                from: self.current_scope(),
            };
            self.candidates.push((callee, target));
        }
        walk::walk_call_expression(self, call);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

fn source_type_for(file: &str) -> SourceType {
    SourceType::from_path(file).unwrap_or_else(|_| {
        SourceType::default()
            .with_module(true)
            .with_typescript(true)
            .with_jsx(true)
    })
}

/// Collects the scope table and analysis targets of `source` without
/// running the analysis. Returns the parser messages alongside.
pub fn collect_targets(file: &str, source: &str, ctx: &LintContext) -> (ScopeTable, Vec<Target>, Vec<String>) {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, source_type_for(file)).parse();
    let parse_errors: Vec<String> = ret.errors.iter().map(|error| error.to_string()).collect();
    if ret.panicked {
        warn!(file, errors = parse_errors.len(), "source could not be parsed");
        return (ScopeTable::new(), Vec::new(), parse_errors);
    }

    let mut collector = TargetCollector::new(source, ctx);
    collector.visit_program(&ret.program);
    let (scope, targets) = collector.finish();
    trace!(file, targets = targets.len(), declarations = scope.len(), "collected class targets");
    (scope, targets, parse_errors)
}

/// Lints a JS/TS/JSX/TSX source file.
pub fn lint_source(file: &str, source: &str, ctx: &LintContext) -> LintReport {
    lint_text(file, source, source, None, ctx)
}

/// Lints compiler-generated script text and reports positions in
/// `original` through `segments`.
pub fn lint_generated(
    file: &str,
    generated: &str,
    original: &str,
    segments: &[MappingSegment],
    ctx: &LintContext,
) -> LintReport {
    let mapper = PositionMapper::new(segments.to_vec());
    lint_text(file, generated, original, Some(&mapper), ctx)
}

fn lint_text(
    file: &str,
    text: &str,
    original: &str,
    mapper: Option<&PositionMapper>,
    ctx: &LintContext,
) -> LintReport {
    let (scope, targets, parse_errors) = collect_targets(file, text, ctx);

    let mut diagnostics = Vec::new();
    for target in &targets {
        diagnostics.extend(analyze_mapped(&target.expr, &scope, target.from, ctx, mapper));
    }
    sort_diagnostics(&mut diagnostics);

    let index = LineIndex::new(original);
    let diagnostics = diagnostics
        .into_iter()
        .map(|diagnostic| FileDiagnostic {
            start: index.location(diagnostic.span.start),
            end: index.location(diagnostic.span.end),
            diagnostic,
        })
        .collect();

    LintReport {
        file: file.to_string(),
        diagnostics,
        parse_errors,
    }
}
