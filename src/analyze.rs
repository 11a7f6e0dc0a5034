//! Per-expression analysis pipeline.
//!
//! evaluate → validate each occurrence → duplicates/hints → conflicts →
//! optional position mapping → ordered diagnostics. Pure: the only output
//! is the returned list.

use tracing::trace;

use crate::classify::{classify, Classifier};
use crate::config::LintContext;
use crate::conflicts::find_conflicts;
use crate::diagnostics::{sort_diagnostics, Diagnostic};
use crate::duplicates::find_duplicates;
use crate::eval::Evaluator;
use crate::expr::ClassExpr;
use crate::position::PositionMapper;
use crate::scope::{DeclScope, ScopeTable};

/// Analyses one class-bearing expression referenced from `from`.
pub fn analyze(expr: &ClassExpr, scope: &ScopeTable, from: DeclScope, ctx: &LintContext) -> Vec<Diagnostic> {
    analyze_mapped(expr, scope, from, ctx, None)
}

/// Like [`analyze`], translating every span through `mapper` when the
/// analysed text was generated from another source. Diagnostics that cannot
/// be mapped are dropped.
pub fn analyze_mapped(
    expr: &ClassExpr,
    scope: &ScopeTable,
    from: DeclScope,
    ctx: &LintContext,
    mapper: Option<&PositionMapper>,
) -> Vec<Diagnostic> {
    let evaluation = Evaluator::new(&ctx.registry, scope, ctx.limits).evaluate(expr, from);
    let classifier = Classifier::new(ctx.oracle.as_ref(), &ctx.allowed);
    let mut diagnostics = Vec::new();

    for unit in &evaluation.units {
        trace!(
            kind = ?unit.kind,
            start = unit.span.start,
            end = unit.span.end,
            occurrences = unit.occurrences.len(),
            sites = unit.sites.len(),
            "analysing class unit"
        );

        if ctx.checks.invalid {
            for occurrence in &unit.occurrences {
                let token = classify(&occurrence.text);
                if !classifier.validate(&token).is_valid() {
                    diagnostics.push(Diagnostic::invalid(occurrence));
                }
            }
        }

        if ctx.checks.duplicates || ctx.checks.hints {
            let report = find_duplicates(unit);
            if ctx.checks.duplicates {
                diagnostics.extend(report.duplicates);
            }
            if ctx.checks.hints {
                diagnostics.extend(report.hints);
            }
        }

        if ctx.checks.conflicts {
            diagnostics.extend(find_conflicts(unit, ctx.groups.as_ref()));
        }
    }

    if let Some(mapper) = mapper {
        diagnostics = diagnostics
            .into_iter()
            .filter_map(|diagnostic| mapper.map_diagnostic(diagnostic))
            .collect();
    }

    sort_diagnostics(&mut diagnostics);
    diagnostics
}
