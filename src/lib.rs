//! # Class Lint Engine
//!
//! Static analysis of utility-class attributes. For every class-bearing
//! attribute the engine works out which class tokens it can produce at
//! runtime and reports:
//!
//! - **Invalid** classes the utility catalog does not know (error),
//! - **Duplicate** classes that can be applied twice in one render (warning),
//! - **Conflicting** classes that set the same property under the same
//!   variant stack (warning),
//! - **Extractable** classes repeated on every arm of a condition (hint).
//!
//! ## Evaluation invariants
//!
//! 1. **Precision over recall**: anything that is not statically derivable
//!    contributes nothing. Unknown calls, unresolved identifiers and dynamic
//!    template holes are silent.
//! 2. **Branch sensitivity**: every conditional arm and variant value adds a
//!    marker to the occurrence's branch path; two occurrences co-exist
//!    unless their paths take different arms of the same site.
//! 3. **Scope**: `const` initializers resolve from their own function or
//!    from module level. Locals of other functions never resolve.
//! 4. **Isolation**: each variant-config call is its own analysis unit.
//! 5. **Bounded**: depth and node-visit limits cut evaluation short with a
//!    partial result.
//!
//! The engine is pure. Configuration lives in an immutable
//! [`LintContext`] snapshot; [`ContextStore`] swaps snapshots wholesale.

#[cfg(feature = "napi")]
use napi_derive::napi;

pub mod allowlist;
pub mod analyze;
pub mod branch;
pub mod classify;
pub mod config;
pub mod conflicts;
pub mod diagnostics;
pub mod discovery;
pub mod duplicates;
pub mod eval;
pub mod expr;
pub mod host;
pub mod lower;
pub mod oracle;
pub mod position;
pub mod registry;
pub mod scope;
pub mod span;


pub use analyze::{analyze, analyze_mapped};
pub use classify::{classify, ClassToken, Classifier, TokenForm, Validity};
pub use config::{ConfigError, ContextStore, LintConfig, LintContext};
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use discovery::lint_directory;
pub use host::{lint_generated, lint_source, FileDiagnostic, LintReport};
pub use oracle::{CatalogOracle, ConflictGroupTable, ConflictGroups, ValidationOracle};
pub use position::{map_to_original, MappingSegment, PositionMapper};
pub use span::{SourceLocation, SourceSpan};

// ═══════════════════════════════════════════════════════════════════════════════
// NODE BRIDGE
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
fn context_from(config_json: Option<String>) -> napi::Result<LintContext> {
    match config_json {
        Some(json) => LintContext::from_json(&json).map_err(|e| napi::Error::from_reason(e.to_string())),
        None => Ok(LintContext::default()),
    }
}

#[cfg(feature = "napi")]
fn report_json(report: &LintReport) -> napi::Result<String> {
    serde_json::to_string(report).map_err(|e| napi::Error::from_reason(e.to_string()))
}

/// Lint one source file; returns the JSON-serialised [`LintReport`].
#[cfg(feature = "napi")]
#[napi]
pub fn lint_source_native(file_path: String, source: String, config_json: Option<String>) -> napi::Result<String> {
    let ctx = context_from(config_json)?;
    report_json(&lint_source(&file_path, &source, &ctx))
}

/// Lint compiler-generated script text. `segments_json` is a JSON array of
/// [`MappingSegment`] records.
#[cfg(feature = "napi")]
#[napi]
pub fn lint_generated_native(
    file_path: String,
    generated: String,
    original: String,
    segments_json: String,
    config_json: Option<String>,
) -> napi::Result<String> {
    let ctx = context_from(config_json)?;
    let segments: Vec<MappingSegment> =
        serde_json::from_str(&segments_json).map_err(|e| napi::Error::from_reason(e.to_string()))?;
    report_json(&lint_generated(&file_path, &generated, &original, &segments, &ctx))
}
