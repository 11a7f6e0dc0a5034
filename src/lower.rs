//! Lowers oxc expressions into the [`ClassExpr`] view.
//!
//! Offsets stay relative to the parsed text. String contents are located in
//! the source slice so token spans point at the characters the user wrote;
//! when the cooked value differs from the raw text (escapes) the cooked
//! value is used with offsets measured from the opening quote.

use oxc_ast::ast::{
    Argument, ArrayExpressionElement, CallExpression, Expression, JSXAttributeValue,
    LogicalOperator, ObjectPropertyKind, PropertyKey, PropertyKind, StringLiteral,
    TemplateLiteral,
};
use oxc_span::{GetSpan, Span};

use crate::expr::{
    CalleeRef, ClassExpr, LogicalOp, ObjectProperty, PropertyKeyText, TemplateQuasi,
};
use crate::span::SourceSpan;

pub struct Lowerer<'s> {
    source: &'s str,
}

impl<'s> Lowerer<'s> {
    pub fn new(source: &'s str) -> Self {
        Self { source }
    }

    pub fn attribute_value(&self, value: &JSXAttributeValue) -> Option<ClassExpr> {
        match value {
            JSXAttributeValue::StringLiteral(lit) => Some(self.string_literal(lit)),
            JSXAttributeValue::ExpressionContainer(container) => {
                container.expression.as_expression().map(|expr| self.expression(expr))
            }
            _ => None,
        }
    }

    pub fn call(&self, call: &CallExpression) -> ClassExpr {
        ClassExpr::Call {
            callee: callee_ref(&call.callee),
            arguments: call.arguments.iter().map(|arg| self.argument(arg)).collect(),
            span: call.span.into(),
        }
    }

    pub fn expression(&self, expr: &Expression) -> ClassExpr {
        match expr {
            Expression::StringLiteral(lit) => self.string_literal(lit),
            Expression::TemplateLiteral(tpl) => self.template(tpl),
            Expression::ArrayExpression(array) => ClassExpr::Array {
                elements: array
                    .elements
                    .iter()
                    .filter_map(|element| self.array_element(element))
                    .collect(),
                span: array.span.into(),
            },
            Expression::ObjectExpression(object) => ClassExpr::Object {
                properties: object
                    .properties
                    .iter()
                    .map(|property| self.object_property(property))
                    .collect(),
                span: object.span.into(),
            },
            Expression::ConditionalExpression(cond) => ClassExpr::Conditional {
                consequent: Box::new(self.expression(&cond.consequent)),
                alternate: Box::new(self.expression(&cond.alternate)),
                span: cond.span.into(),
            },
            Expression::LogicalExpression(logical) => ClassExpr::Logical {
                op: match logical.operator {
                    LogicalOperator::And => LogicalOp::And,
                    LogicalOperator::Or => LogicalOp::Or,
                    LogicalOperator::Coalesce => LogicalOp::Coalesce,
                },
                left: Box::new(self.expression(&logical.left)),
                right: Box::new(self.expression(&logical.right)),
                span: logical.span.into(),
            },
            Expression::CallExpression(call) => self.call(call),
            Expression::Identifier(ident) => ClassExpr::Identifier {
                name: ident.name.to_string(),
                span: ident.span.into(),
            },
            Expression::StaticMemberExpression(member) => ClassExpr::Member {
                object: Box::new(self.expression(&member.object)),
                property: member.property.name.to_string(),
                span: member.span.into(),
            },
            Expression::ComputedMemberExpression(member) => match &member.expression {
                Expression::StringLiteral(key) => ClassExpr::Member {
                    object: Box::new(self.expression(&member.object)),
                    property: key.value.to_string(),
                    span: member.span.into(),
                },
                _ => ClassExpr::Opaque {
                    span: member.span.into(),
                },
            },
            Expression::ParenthesizedExpression(paren) => self.wrapped(&paren.expression, paren.span),
            Expression::TSAsExpression(ts) => self.wrapped(&ts.expression, ts.span),
            Expression::TSSatisfiesExpression(ts) => self.wrapped(&ts.expression, ts.span),
            Expression::TSNonNullExpression(ts) => self.wrapped(&ts.expression, ts.span),
            Expression::TSTypeAssertion(ts) => self.wrapped(&ts.expression, ts.span),
            other => ClassExpr::Opaque {
                span: other.span().into(),
            },
        }
    }

    fn wrapped(&self, inner: &Expression, span: Span) -> ClassExpr {
        ClassExpr::Wrapped {
            inner: Box::new(self.expression(inner)),
            span: span.into(),
        }
    }

    fn argument(&self, argument: &Argument) -> ClassExpr {
        match argument {
            Argument::SpreadElement(spread) => ClassExpr::Spread {
                argument: Box::new(self.expression(&spread.argument)),
                span: spread.span.into(),
            },
            other => match other.as_expression() {
                Some(expr) => self.expression(expr),
                None => ClassExpr::Opaque {
                    span: other.span().into(),
                },
            },
        }
    }

    fn array_element(&self, element: &ArrayExpressionElement) -> Option<ClassExpr> {
        match element {
            ArrayExpressionElement::SpreadElement(spread) => Some(ClassExpr::Spread {
                argument: Box::new(self.expression(&spread.argument)),
                span: spread.span.into(),
            }),
            ArrayExpressionElement::Elision(_) => None,
            other => other.as_expression().map(|expr| self.expression(expr)),
        }
    }

    fn object_property(&self, property: &ObjectPropertyKind) -> ObjectProperty {
        match property {
            ObjectPropertyKind::ObjectProperty(prop) => {
                let key = if prop.kind == PropertyKind::Init && !prop.method {
                    self.property_key(&prop.key)
                } else {
                    None
                };
                ObjectProperty::Property {
                    key,
                    value: self.expression(&prop.value),
                    span: prop.span.into(),
                }
            }
            ObjectPropertyKind::SpreadProperty(spread) => ObjectProperty::Spread {
                argument: self.expression(&spread.argument),
                span: spread.span.into(),
            },
        }
    }

    fn property_key(&self, key: &PropertyKey) -> Option<PropertyKeyText> {
        match key {
            PropertyKey::StaticIdentifier(ident) => Some(PropertyKeyText {
                text: ident.name.to_string(),
                start: ident.span.start,
            }),
            PropertyKey::StringLiteral(lit) => {
                let (text, start) = self.literal_content(lit);
                Some(PropertyKeyText { text, start })
            }
            PropertyKey::TemplateLiteral(tpl) if tpl.expressions.is_empty() => {
                tpl.quasis.first().map(|quasi| {
                    let raw = quasi.value.raw.as_str();
                    PropertyKeyText {
                        text: raw.to_string(),
                        start: self.locate(raw, quasi.span),
                    }
                })
            }
            _ => None,
        }
    }

    fn string_literal(&self, lit: &StringLiteral) -> ClassExpr {
        let (text, start) = self.literal_content(lit);
        ClassExpr::StringLiteral {
            text,
            start,
            span: lit.span.into(),
        }
    }

    fn literal_content(&self, lit: &StringLiteral) -> (String, u32) {
        let value = lit.value.as_str();
        let inner = (lit.span.start + 1, lit.span.end.saturating_sub(1));
        let outer = (lit.span.start, lit.span.end);
        for (start, end) in [inner, outer] {
            if self.source.get(start as usize..end as usize) == Some(value) {
                return (value.to_string(), start);
            }
        }
        (value.to_string(), lit.span.start + 1)
    }

    fn template(&self, tpl: &TemplateLiteral) -> ClassExpr {
        let quasis = tpl
            .quasis
            .iter()
            .map(|quasi| {
                let raw = quasi.value.raw.as_str();
                TemplateQuasi {
                    text: raw.to_string(),
                    start: self.locate(raw, quasi.span),
                }
            })
            .collect();
        ClassExpr::Template {
            quasis,
            holes: tpl.expressions.iter().map(|expr| self.expression(expr)).collect(),
            span: tpl.span.into(),
        }
    }

    /// Offset of `raw` inside the text covered by `span`.
    fn locate(&self, raw: &str, span: Span) -> u32 {
        SourceSpan::from(span)
            .slice(self.source)
            .and_then(|text| text.find(raw))
            .map_or(span.start, |offset| span.start + offset as u32)
    }
}

pub fn callee_ref(callee: &Expression) -> CalleeRef {
    match callee {
        Expression::Identifier(ident) => CalleeRef::Name(ident.name.to_string()),
        Expression::StaticMemberExpression(member) => match &member.object {
            Expression::Identifier(object) => CalleeRef::Member {
                object: object.name.to_string(),
                property: member.property.name.to_string(),
            },
            _ => CalleeRef::Other,
        },
        Expression::ParenthesizedExpression(paren) => callee_ref(&paren.expression),
        _ => CalleeRef::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_allocator::Allocator;
    use oxc_ast::ast::Statement;
    use oxc_parser::Parser;
    use oxc_span::SourceType;

    fn lower_initializer(source: &str) -> ClassExpr {
        let allocator = Allocator::default();
        let source_type = SourceType::default()
            .with_module(true)
            .with_typescript(true)
            .with_jsx(true);
        let ret = Parser::new(&allocator, source, source_type).parse();
        assert!(ret.errors.is_empty());
        let Some(Statement::VariableDeclaration(decl)) = ret.program.body.first() else {
            panic!("expected a declaration");
        };
        let init = decl.declarations[0].init.as_ref().unwrap();
        Lowerer::new(source).expression(init)
    }

    #[test]
    fn test_string_literal_offsets() {
        let source = "const c = 'flex p-4';";
        let ClassExpr::StringLiteral { text, start, .. } = lower_initializer(source) else {
            panic!("expected a string literal");
        };
        assert_eq!(text, "flex p-4");
        assert_eq!(&source[start as usize..start as usize + 4], "flex");
    }

    #[test]
    fn test_template_quasis_point_at_raw_text() {
        let source = "const c = `flex ${a ? 'x' : 'y'} grid`;";
        let ClassExpr::Template { quasis, holes, .. } = lower_initializer(source) else {
            panic!("expected a template");
        };
        assert_eq!(quasis.len(), 2);
        assert_eq!(holes.len(), 1);
        assert!(matches!(holes[0], ClassExpr::Conditional { .. }));
        let second = &quasis[1];
        assert_eq!(second.text, " grid");
        assert_eq!(&source[second.start as usize..second.start as usize + 5], " grid");
    }

    #[test]
    fn test_object_keys_and_wrappers() {
        let source = "const c = ({ 'p-2 m-1': on, grid: true, [`gap-2`]: x, ...rest, [dyn]: y } as const);";
        let ClassExpr::Wrapped { inner, .. } = lower_initializer(source) else {
            panic!("expected parentheses");
        };
        let ClassExpr::Wrapped { inner, .. } = *inner else {
            panic!("expected the `as const` assertion");
        };
        let ClassExpr::Object { properties, .. } = *inner else {
            panic!("expected an object");
        };
        let keys: Vec<Option<&str>> = properties.iter().map(|p| p.key_text()).collect();
        assert_eq!(keys, vec![Some("p-2 m-1"), Some("grid"), Some("gap-2"), None, None]);
        assert!(matches!(properties[3], ObjectProperty::Spread { .. }));
    }

    #[test]
    fn test_callee_shapes() {
        let ClassExpr::Call { callee, arguments, .. } = lower_initializer("const c = utils.cn('a', ...xs);") else {
            panic!("expected a call");
        };
        assert_eq!(
            callee,
            CalleeRef::Member {
                object: "utils".to_string(),
                property: "cn".to_string()
            }
        );
        assert!(matches!(arguments[1], ClassExpr::Spread { .. }));
    }
}
