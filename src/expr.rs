//! Class-bearing expression view.
//!
//! A closed sum type over the expression shapes a class attribute value can
//! take. The host lowers its syntax tree into this view once per file; the
//! evaluator only ever reads it.

use crate::span::SourceSpan;

#[derive(Debug, Clone, PartialEq)]
pub enum ClassExpr {
    /// `text` is the literal content; `start` is the offset of its first byte.
    StringLiteral {
        text: String,
        start: u32,
        span: SourceSpan,
    },
    /// Invariant: `quasis.len() == holes.len() + 1`.
    Template {
        quasis: Vec<TemplateQuasi>,
        holes: Vec<ClassExpr>,
        span: SourceSpan,
    },
    Array {
        elements: Vec<ClassExpr>,
        span: SourceSpan,
    },
    Object {
        properties: Vec<ObjectProperty>,
        span: SourceSpan,
    },
    Conditional {
        consequent: Box<ClassExpr>,
        alternate: Box<ClassExpr>,
        span: SourceSpan,
    },
    Logical {
        op: LogicalOp,
        left: Box<ClassExpr>,
        right: Box<ClassExpr>,
        span: SourceSpan,
    },
    Call {
        callee: CalleeRef,
        arguments: Vec<ClassExpr>,
        span: SourceSpan,
    },
    Identifier {
        name: String,
        span: SourceSpan,
    },
    Member {
        object: Box<ClassExpr>,
        property: String,
        span: SourceSpan,
    },
    /// Parentheses and type-only wrappers (`as`, `satisfies`, `!`, `<T>x`).
    Wrapped {
        inner: Box<ClassExpr>,
        span: SourceSpan,
    },
    Spread {
        argument: Box<ClassExpr>,
        span: SourceSpan,
    },
    /// Anything the evaluator has no rule for.
    Opaque { span: SourceSpan },
}

impl ClassExpr {
    pub fn span(&self) -> SourceSpan {
        match self {
            ClassExpr::StringLiteral { span, .. }
            | ClassExpr::Template { span, .. }
            | ClassExpr::Array { span, .. }
            | ClassExpr::Object { span, .. }
            | ClassExpr::Conditional { span, .. }
            | ClassExpr::Logical { span, .. }
            | ClassExpr::Call { span, .. }
            | ClassExpr::Identifier { span, .. }
            | ClassExpr::Member { span, .. }
            | ClassExpr::Wrapped { span, .. }
            | ClassExpr::Spread { span, .. }
            | ClassExpr::Opaque { span } => *span,
        }
    }

    /// Strips parentheses and type wrappers.
    pub fn unwrapped(&self) -> &ClassExpr {
        let mut current = self;
        while let ClassExpr::Wrapped { inner, .. } = current {
            current = inner;
        }
        current
    }

    /// Convenience constructor; the literal content starts one byte after
    /// the opening quote.
    pub fn string(text: &str, span: SourceSpan) -> Self {
        ClassExpr::StringLiteral {
            text: text.to_string(),
            start: span.start + 1,
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateQuasi {
    pub text: String,
    pub start: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Coalesce,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CalleeRef {
    /// `cn(...)`
    Name(String),
    /// `utils.cn(...)`
    Member { object: String, property: String },
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectProperty {
    Property {
        /// `None` when the key is computed from something other than a
        /// string literal.
        key: Option<PropertyKeyText>,
        value: ClassExpr,
        span: SourceSpan,
    },
    Spread {
        argument: ClassExpr,
        span: SourceSpan,
    },
}

/// Static text of an object key and the offset where that text begins.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyKeyText {
    pub text: String,
    pub start: u32,
}

impl ObjectProperty {
    pub fn key_text(&self) -> Option<&str> {
        match self {
            ObjectProperty::Property { key: Some(key), .. } => Some(&key.text),
            _ => None,
        }
    }
}

/// Looks up a property value by its static key.
pub fn find_property<'e>(properties: &'e [ObjectProperty], name: &str) -> Option<&'e ClassExpr> {
    properties.iter().rev().find_map(|prop| match prop {
        ObjectProperty::Property {
            key: Some(key),
            value,
            ..
        } if key.text == name => Some(value),
        _ => None,
    })
}
