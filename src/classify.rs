//! Class token classifier.
//!
//! Splits a raw token into its variant stack, base utility and important
//! marker, recognises the arbitrary forms (`w-[3px]`, `[mask:none]`,
//! `[--gap:4px]`) and decides validity against the oracle and allow-list.

use crate::allowlist::AllowedClassMatcher;
use crate::oracle::ValidationOracle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenForm {
    Utility,
    /// `prefix-[value]` or `prefix-(value)`, optionally followed by `/modifier`.
    ArbitraryValue { prefix: String },
    /// `[--name:value]`
    CustomPropertyDefinition,
    /// `[property:value]`
    ArbitraryProperty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassToken {
    pub raw: String,
    pub variants: Vec<String>,
    /// Base utility with the important marker removed.
    pub base: String,
    pub important: bool,
    pub form: TokenForm,
}

impl ClassToken {
    pub fn is_custom_property_definition(&self) -> bool {
        self.form == TokenForm::CustomPropertyDefinition
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validity {
    Valid,
    Invalid,
}

impl Validity {
    pub fn is_valid(self) -> bool {
        self == Validity::Valid
    }
}

/// Splits on `:` outside of brackets and parentheses.
fn parse_variants(class: &str) -> (Vec<&str>, &str) {
    let mut paren_depth = 0usize;
    let mut bracket_depth = 0usize;
    let mut variants = Vec::new();
    let mut start = 0usize;

    for (idx, ch) in class.char_indices() {
        match ch {
            '(' => paren_depth += 1,
            ')' => paren_depth = paren_depth.saturating_sub(1),
            '[' => bracket_depth += 1,
            ']' => bracket_depth = bracket_depth.saturating_sub(1),
            ':' if paren_depth == 0 && bracket_depth == 0 => {
                variants.push(&class[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    (variants, &class[start..])
}

/// Returns the prefix of `prefix-[value]`/`prefix-(value)` when the value is
/// balanced and followed by nothing or a `/modifier`.
fn arbitrary_value_prefix(base: &str) -> Option<&str> {
    let (open_at, open, close) = base
        .char_indices()
        .find_map(|(idx, ch)| match ch {
            '[' => Some((idx, '[', ']')),
            '(' => Some((idx, '(', ')')),
            _ => None,
        })?;
    let prefix = base[..open_at].strip_suffix('-')?;
    if prefix.is_empty() || prefix == "-" {
        return None;
    }

    let mut depth = 0usize;
    for (idx, ch) in base[open_at..].char_indices() {
        if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                let rest = &base[open_at + idx + 1..];
                return (rest.is_empty() || (rest.starts_with('/') && rest.len() > 1)).then_some(prefix);
            }
        }
    }
    None
}

pub fn classify(raw: &str) -> ClassToken {
    let (variants, rest) = parse_variants(raw);

    let (base, important) = if let Some(stripped) = rest.strip_prefix('!') {
        (stripped, true)
    } else if let Some(stripped) = rest.strip_suffix('!') {
        (stripped, true)
    } else {
        (rest, false)
    };

    let form = if base.len() > 2 && base.starts_with('[') && base.ends_with(']') {
        let inner = &base[1..base.len() - 1];
        match inner.split_once(':') {
            Some((name, _)) if name.starts_with("--") && name.len() > 2 => TokenForm::CustomPropertyDefinition,
            Some((name, _)) if !name.is_empty() => TokenForm::ArbitraryProperty,
            _ => TokenForm::Utility,
        }
    } else if let Some(prefix) = arbitrary_value_prefix(base) {
        TokenForm::ArbitraryValue {
            prefix: prefix.to_string(),
        }
    } else {
        TokenForm::Utility
    };

    ClassToken {
        raw: raw.to_string(),
        variants: variants.into_iter().map(str::to_string).collect(),
        base: base.to_string(),
        important,
        form,
    }
}

pub struct Classifier<'c> {
    oracle: &'c dyn ValidationOracle,
    allowed: &'c AllowedClassMatcher,
}

impl<'c> Classifier<'c> {
    pub fn new(oracle: &'c dyn ValidationOracle, allowed: &'c AllowedClassMatcher) -> Self {
        Self { oracle, allowed }
    }

    pub fn validate(&self, token: &ClassToken) -> Validity {
        let variants_known = || token.variants.iter().all(|v| self.oracle.is_valid_variant(v));
        let known = match &token.form {
            TokenForm::ArbitraryProperty | TokenForm::CustomPropertyDefinition => variants_known(),
            TokenForm::ArbitraryValue { prefix } => {
                let unsigned = prefix.strip_prefix('-').unwrap_or(prefix);
                variants_known() && self.oracle.is_utility_prefix(unsigned)
            }
            TokenForm::Utility => self.oracle.is_valid_utility(&token.variants, &token.base),
        };

        // Exact entries name whole tokens; patterns may also match the base.
        if known || self.allowed.matches(&token.raw) || self.allowed.matches_pattern(&token.base) {
            Validity::Valid
        } else {
            Validity::Invalid
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::CatalogOracle;

    #[test]
    fn test_variant_stack_and_base() {
        let token = classify("md:hover:bg-red-500");
        assert_eq!(token.variants, vec!["md", "hover"]);
        assert_eq!(token.base, "bg-red-500");
        assert!(!token.important);
        assert_eq!(token.form, TokenForm::Utility);
    }

    #[test]
    fn test_colons_inside_brackets_do_not_split() {
        let token = classify("[&:hover>svg]:fill-red-500");
        assert_eq!(token.variants, vec!["[&:hover>svg]"]);
        assert_eq!(token.base, "fill-red-500");

        let token = classify("lg:[mask-type:luminance]");
        assert_eq!(token.variants, vec!["lg"]);
        assert_eq!(token.form, TokenForm::ArbitraryProperty);
    }

    #[test]
    fn test_important_marker() {
        assert!(classify("!p-4").important);
        assert!(classify("hover:p-4!").important);
        assert_eq!(classify("hover:!p-4").base, "p-4");
    }

    #[test]
    fn test_arbitrary_forms() {
        assert_eq!(
            classify("w-[37px]").form,
            TokenForm::ArbitraryValue { prefix: "w".to_string() }
        );
        assert_eq!(
            classify("bg-[#0af]/50").form,
            TokenForm::ArbitraryValue { prefix: "bg".to_string() }
        );
        assert_eq!(
            classify("-mt-[3px]").form,
            TokenForm::ArbitraryValue { prefix: "-mt".to_string() }
        );
        assert_eq!(
            classify("p-(--gutter)").form,
            TokenForm::ArbitraryValue { prefix: "p".to_string() }
        );
        assert!(classify("[--gap:4px]").is_custom_property_definition());
        assert_eq!(classify("w-[3px]x").form, TokenForm::Utility);
    }

    #[test]
    fn test_validation() {
        let oracle = CatalogOracle::default();
        let allowed = AllowedClassMatcher::new(&["js-*"]).unwrap();
        let classifier = Classifier::new(&oracle, &allowed);
        let check = |raw: &str| classifier.validate(&classify(raw)).is_valid();

        assert!(check("flex"));
        assert!(check("md:hover:!items-center"));
        assert!(check("w-[37px]"));
        assert!(check("-mt-[3px]"));
        assert!(check("[mask-type:luminance]"));
        assert!(check("[--gap:4px]"));
        assert!(check("js-toggle"));
        assert!(!check("invalid-error"));
        assert!(!check("nope-[3px]"));
        assert!(!check("bogus:flex"));
    }

    #[test]
    fn test_arbitrary_forms_check_their_variants() {
        let oracle = CatalogOracle::default();
        let allowed = AllowedClassMatcher::default();
        let classifier = Classifier::new(&oracle, &allowed);
        let check = |raw: &str| classifier.validate(&classify(raw)).is_valid();

        assert!(check("md:hover:w-[3px]"));
        assert!(check("dark:[mask-type:luminance]"));
        assert!(check("lg:[--gap:4px]"));
        assert!(!check("bogus:w-[3px]"));
        assert!(!check("hovr:[mask-type:luminance]"));
        assert!(!check("mdd:[--gap:4px]"));
    }

    #[test]
    fn test_exact_allow_entries_match_whole_tokens_only() {
        let oracle = CatalogOracle::default();
        let allowed = AllowedClassMatcher::new(&["js-hook", "qa-*"]).unwrap();
        let classifier = Classifier::new(&oracle, &allowed);
        let check = |raw: &str| classifier.validate(&classify(raw)).is_valid();

        assert!(check("js-hook"));
        assert!(!check("hover:js-hook"));
        assert!(check("qa-row"));
        assert!(check("hover:qa-row"));
    }
}
