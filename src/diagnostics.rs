use serde::{Deserialize, Serialize};

use crate::eval::Occurrence;
use crate::span::SourceSpan;

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const CODE_INVALID: &str = "CL-INVALID";
pub const CODE_DUPLICATE: &str = "CL-DUPLICATE";
pub const CODE_CONFLICT: &str = "CL-CONFLICT";
pub const CODE_EXTRACTABLE: &str = "CL-EXTRACTABLE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticKind {
    Invalid,
    Duplicate,
    Conflict,
    ExtractableHint,
}

impl DiagnosticKind {
    pub fn code(self) -> &'static str {
        match self {
            DiagnosticKind::Invalid => CODE_INVALID,
            DiagnosticKind::Duplicate => CODE_DUPLICATE,
            DiagnosticKind::Conflict => CODE_CONFLICT,
            DiagnosticKind::ExtractableHint => CODE_EXTRACTABLE,
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            DiagnosticKind::Invalid => Severity::Error,
            DiagnosticKind::Duplicate | DiagnosticKind::Conflict => Severity::Warning,
            DiagnosticKind::ExtractableHint => Severity::Hint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
    Hint,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub span: SourceSpan,
    /// Location of the token inside the declaration it was resolved from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaration: Option<SourceSpan>,
    #[serde(default)]
    pub related: Vec<SourceSpan>,
    #[serde(default)]
    pub tokens: Vec<String>,
}

impl Diagnostic {
    fn new(kind: DiagnosticKind, message: String, primary: &Occurrence) -> Self {
        Self {
            kind,
            severity: kind.severity(),
            code: kind.code().to_string(),
            message,
            span: primary.span,
            declaration: primary.declaration,
            related: Vec::new(),
            tokens: vec![primary.text.clone()],
        }
    }

    pub fn invalid(occurrence: &Occurrence) -> Self {
        Self::new(
            DiagnosticKind::Invalid,
            format!("`{}` is not a known utility class", occurrence.text),
            occurrence,
        )
    }

    pub fn duplicate<'o>(occurrence: &Occurrence, others: impl IntoIterator<Item = &'o Occurrence>) -> Self {
        let mut diagnostic = Self::new(
            DiagnosticKind::Duplicate,
            format!("`{}` is applied more than once", occurrence.text),
            occurrence,
        );
        diagnostic.related = others.into_iter().map(|other| other.span).collect();
        diagnostic
    }

    /// `members` must be non-empty; the first member is reported.
    pub fn conflict(members: &[&Occurrence], group: &str) -> Option<Self> {
        let (primary, rest) = members.split_first()?;
        let mut tokens: Vec<String> = Vec::new();
        for member in members {
            if !tokens.contains(&member.text) {
                tokens.push(member.text.clone());
            }
        }
        let mut diagnostic = Self::new(
            DiagnosticKind::Conflict,
            format!("{} all set `{}`", tokens.join(", "), group),
            primary,
        );
        diagnostic.related = rest.iter().map(|other| other.span).collect();
        diagnostic.tokens = tokens;
        Some(diagnostic)
    }

    pub fn extractable(occurrence: &Occurrence) -> Self {
        Self::new(
            DiagnosticKind::ExtractableHint,
            format!(
                "`{}` is applied on every branch and can be moved outside the condition",
                occurrence.text
            ),
            occurrence,
        )
    }
}

/// Orders by span start, then span end, then kind.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| {
        a.span
            .start
            .cmp(&b.span.start)
            .then(a.span.end.cmp(&b.span.end))
            .then(a.kind.cmp(&b.kind))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::branch::BranchPath;
    use crate::eval::OriginKind;

    fn occurrence(text: &str, start: u32) -> Occurrence {
        Occurrence {
            text: text.to_string(),
            span: SourceSpan::new(start, start + text.len() as u32),
            declaration: None,
            branch: BranchPath::root(),
            origin: OriginKind::Literal,
        }
    }

    #[test]
    fn test_conflict_tokens_are_distinct() {
        let a = occurrence("text-left", 0);
        let b = occurrence("text-center", 10);
        let c = occurrence("text-left", 22);
        let diagnostic = Diagnostic::conflict(&[&a, &b, &c], "text-align").unwrap();
        assert_eq!(diagnostic.tokens, vec!["text-left", "text-center"]);
        assert_eq!(diagnostic.related.len(), 2);
        assert_eq!(diagnostic.code, CODE_CONFLICT);
        assert_eq!(diagnostic.severity, Severity::Warning);
        assert!(Diagnostic::conflict(&[], "text-align").is_none());
    }

    #[test]
    fn test_sort_order() {
        let a = occurrence("flex", 5);
        let mut diagnostics = vec![
            Diagnostic::duplicate(&a, []),
            Diagnostic::invalid(&occurrence("zz", 0)),
            Diagnostic::invalid(&a),
        ];
        sort_diagnostics(&mut diagnostics);
        assert_eq!(diagnostics[0].span.start, 0);
        assert_eq!(diagnostics[1].kind, DiagnosticKind::Invalid);
        assert_eq!(diagnostics[2].kind, DiagnosticKind::Duplicate);
    }

    #[test]
    fn test_serialized_shape() {
        let diagnostic = Diagnostic::invalid(&occurrence("invalid-error", 3));
        let json = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(json["kind"], "invalid");
        assert_eq!(json["code"], "CL-INVALID");
        assert_eq!(json["span"]["start"], 3);
        assert!(json.get("declaration").is_none());
    }
}
