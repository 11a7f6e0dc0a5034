//! Utility catalog.
//!
//! The analyzer never hard-codes which classes exist. It asks a
//! [`ValidationOracle`] whether a base utility (under a variant stack) is
//! known, and a [`ConflictGroupTable`] which CSS property a utility sets.
//! The defaults below describe a Tailwind-like vocabulary; hosts can extend
//! them from configuration or swap in their own implementation.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;

pub trait ValidationOracle: Send + Sync {
    fn is_valid_utility(&self, variants: &[String], base: &str) -> bool;

    fn is_valid_variant(&self, variant: &str) -> bool;

    /// True when `prefix` accepts an arbitrary bracketed value (`w-[3px]`).
    fn is_utility_prefix(&self, prefix: &str) -> bool;
}

pub trait ConflictGroupTable: Send + Sync {
    fn group_of(&self, base: &str) -> Option<&str>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// VALUE SCALES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scale {
    /// Multiples of 0.25 plus `px`.
    Spacing,
    /// `1/2`, `3/4`, ...
    Fraction,
    Color,
    Integer,
    Keywords(&'static [&'static str]),
}

const PALETTE: &[&str] = &[
    "slate", "gray", "zinc", "neutral", "stone", "red", "orange", "amber", "yellow", "lime",
    "green", "emerald", "teal", "cyan", "sky", "blue", "indigo", "violet", "purple", "fuchsia",
    "pink", "rose",
];
const SHADES: &[&str] = &[
    "50", "100", "200", "300", "400", "500", "600", "700", "800", "900", "950",
];
const BARE_COLORS: &[&str] = &["inherit", "current", "transparent", "black", "white"];

const SIZE_WORDS: &[&str] = &[
    "auto", "full", "screen", "svw", "lvw", "dvw", "svh", "lvh", "dvh", "min", "max", "fit",
];
const CONTAINER_SIZES: &[&str] = &[
    "3xs", "2xs", "xs", "sm", "md", "lg", "xl", "2xl", "3xl", "4xl", "5xl", "6xl", "7xl", "none",
    "prose",
];
const FONT_SIZES: &[&str] = &[
    "xs", "sm", "base", "lg", "xl", "2xl", "3xl", "4xl", "5xl", "6xl", "7xl", "8xl", "9xl",
];
const RADII: &[&str] = &["none", "xs", "sm", "md", "lg", "xl", "2xl", "3xl", "4xl", "full"];
const BORDER_WIDTHS: &[&str] = &["0", "2", "4", "8"];
const SHADOWS: &[&str] = &["2xs", "xs", "sm", "md", "lg", "xl", "2xl", "inner", "none"];
const BLURS: &[&str] = &["none", "xs", "sm", "md", "lg", "xl", "2xl", "3xl"];

fn is_spacing(value: &str) -> bool {
    if value == "px" {
        return true;
    }
    if !value.bytes().all(|b| b.is_ascii_digit() || b == b'.') {
        return false;
    }
    match value.parse::<f64>() {
        Ok(n) => n >= 0.0 && (n * 4.0).fract() == 0.0,
        Err(_) => false,
    }
}

fn is_integer(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

fn is_fraction(value: &str) -> bool {
    match value.split_once('/') {
        Some((num, den)) => is_integer(num) && is_integer(den) && den != "0",
        None => false,
    }
}

fn is_color(value: &str) -> bool {
    let (color, alpha) = match value.split_once('/') {
        Some((color, alpha)) => (color, Some(alpha)),
        None => (value, None),
    };
    if let Some(alpha) = alpha {
        let alpha_ok = (alpha.starts_with('[') && alpha.ends_with(']'))
            || (is_integer(alpha) && alpha.parse::<u32>().map_or(false, |n| n <= 100));
        if !alpha_ok {
            return false;
        }
    }
    if BARE_COLORS.contains(&color) {
        return true;
    }
    match color.rsplit_once('-') {
        Some((hue, shade)) => PALETTE.contains(&hue) && SHADES.contains(&shade),
        None => false,
    }
}

impl Scale {
    fn accepts(&self, value: &str) -> bool {
        match self {
            Scale::Spacing => is_spacing(value),
            Scale::Fraction => is_fraction(value),
            Scale::Color => is_color(value),
            Scale::Integer => is_integer(value),
            Scale::Keywords(words) => words.contains(&value),
        }
    }
}

struct Family {
    prefixes: &'static [&'static str],
    scales: &'static [Scale],
    negative: bool,
}

const SPACING: &[Scale] = &[Scale::Spacing];
const MARGIN: &[Scale] = &[Scale::Spacing, Scale::Keywords(&["auto"])];
const SIZE: &[Scale] = &[Scale::Spacing, Scale::Fraction, Scale::Keywords(SIZE_WORDS)];
const MAX_SIZE: &[Scale] = &[
    Scale::Spacing,
    Scale::Fraction,
    Scale::Keywords(SIZE_WORDS),
    Scale::Keywords(CONTAINER_SIZES),
];
const INSET: &[Scale] = &[Scale::Spacing, Scale::Fraction, Scale::Keywords(&["auto", "full"])];
const COLOR: &[Scale] = &[Scale::Color];
const TEXT: &[Scale] = &[Scale::Keywords(FONT_SIZES), Scale::Color];
const BORDER: &[Scale] = &[Scale::Keywords(BORDER_WIDTHS), Scale::Color];
const INTEGER: &[Scale] = &[Scale::Integer];

lazy_static! {
    static ref FAMILIES: Vec<Family> = vec![
        Family { prefixes: &["p", "px", "py", "pt", "pr", "pb", "pl", "ps", "pe"], scales: SPACING, negative: false },
        Family { prefixes: &["m", "mx", "my", "mt", "mr", "mb", "ml", "ms", "me"], scales: MARGIN, negative: true },
        Family { prefixes: &["gap", "gap-x", "gap-y"], scales: SPACING, negative: false },
        Family { prefixes: &["space-x", "space-y"], scales: SPACING, negative: true },
        Family { prefixes: &["w", "h", "size", "min-w", "min-h", "basis"], scales: SIZE, negative: false },
        Family { prefixes: &["max-w", "max-h"], scales: MAX_SIZE, negative: false },
        Family { prefixes: &["inset", "inset-x", "inset-y", "top", "right", "bottom", "left", "start", "end"], scales: INSET, negative: true },
        Family { prefixes: &["translate-x", "translate-y"], scales: INSET, negative: true },
        Family { prefixes: &["bg", "from", "via", "to", "fill", "accent", "caret", "placeholder", "divide", "decoration"], scales: COLOR, negative: false },
        Family { prefixes: &["text"], scales: TEXT, negative: false },
        Family { prefixes: &["border", "border-x", "border-y", "border-t", "border-r", "border-b", "border-l", "border-s", "border-e", "outline", "ring", "ring-offset"], scales: BORDER, negative: false },
        Family { prefixes: &["stroke"], scales: &[Scale::Keywords(&["0", "1", "2"]), Scale::Color], negative: false },
        Family { prefixes: &["divide-x", "divide-y"], scales: &[Scale::Keywords(BORDER_WIDTHS)], negative: false },
        Family { prefixes: &["rounded", "rounded-t", "rounded-r", "rounded-b", "rounded-l", "rounded-s", "rounded-e", "rounded-tl", "rounded-tr", "rounded-br", "rounded-bl"], scales: &[Scale::Keywords(RADII)], negative: false },
        Family { prefixes: &["shadow"], scales: &[Scale::Keywords(SHADOWS), Scale::Color], negative: false },
        Family { prefixes: &["opacity"], scales: INTEGER, negative: false },
        Family { prefixes: &["z", "order"], scales: &[Scale::Integer, Scale::Keywords(&["auto", "first", "last", "none"])], negative: true },
        Family { prefixes: &["grid-cols", "grid-rows", "columns", "line-clamp"], scales: &[Scale::Integer, Scale::Keywords(&["none", "subgrid", "auto"])], negative: false },
        Family { prefixes: &["col-span", "row-span"], scales: &[Scale::Integer, Scale::Keywords(&["full"])], negative: false },
        Family { prefixes: &["col-start", "col-end", "row-start", "row-end"], scales: &[Scale::Integer, Scale::Keywords(&["auto"])], negative: false },
        Family { prefixes: &["leading"], scales: &[Scale::Spacing, Scale::Keywords(&["none", "tight", "snug", "normal", "relaxed", "loose"])], negative: false },
        Family { prefixes: &["tracking"], scales: &[Scale::Keywords(&["tighter", "tight", "normal", "wide", "wider", "widest"])], negative: true },
        Family { prefixes: &["duration", "delay"], scales: INTEGER, negative: false },
        Family { prefixes: &["ease"], scales: &[Scale::Keywords(&["linear", "in", "out", "in-out"])], negative: false },
        Family { prefixes: &["animate"], scales: &[Scale::Keywords(&["none", "spin", "ping", "pulse", "bounce"])], negative: false },
        Family { prefixes: &["scale", "scale-x", "scale-y", "rotate", "skew-x", "skew-y"], scales: INTEGER, negative: true },
        Family { prefixes: &["blur", "backdrop-blur"], scales: &[Scale::Keywords(BLURS)], negative: false },
        Family { prefixes: &["aspect"], scales: &[Scale::Fraction, Scale::Keywords(&["auto", "square", "video"])], negative: false },
        Family { prefixes: &["grow", "shrink"], scales: INTEGER, negative: false },
        Family { prefixes: &["underline-offset"], scales: &[Scale::Integer, Scale::Keywords(&["auto"])], negative: false },
    ];

    static ref STATIC_UTILITIES: HashSet<&'static str> = [
        // display
        "block", "inline-block", "inline", "flex", "inline-flex", "grid", "inline-grid", "contents",
        "hidden", "table", "table-row", "table-cell", "flow-root", "list-item",
        // position
        "static", "fixed", "absolute", "relative", "sticky",
        "visible", "invisible", "collapse",
        // flexbox
        "flex-row", "flex-row-reverse", "flex-col", "flex-col-reverse", "flex-wrap", "flex-nowrap",
        "flex-wrap-reverse", "flex-1", "flex-auto", "flex-initial", "flex-none", "grow", "shrink",
        "items-start", "items-end", "items-center", "items-baseline", "items-stretch",
        "justify-start", "justify-end", "justify-center", "justify-between", "justify-around",
        "justify-evenly", "justify-stretch", "justify-normal",
        "self-auto", "self-start", "self-end", "self-center", "self-stretch", "self-baseline",
        "content-start", "content-end", "content-center", "content-between", "content-around",
        "content-evenly", "content-stretch", "content-normal",
        "place-items-center", "place-content-center", "place-self-center",
        // typography
        "text-left", "text-center", "text-right", "text-justify", "text-start", "text-end",
        "italic", "not-italic",
        "font-thin", "font-extralight", "font-light", "font-normal", "font-medium",
        "font-semibold", "font-bold", "font-extrabold", "font-black",
        "font-sans", "font-serif", "font-mono",
        "whitespace-normal", "whitespace-nowrap", "whitespace-pre", "whitespace-pre-line",
        "whitespace-pre-wrap", "whitespace-break-spaces",
        "uppercase", "lowercase", "capitalize", "normal-case",
        "underline", "overline", "line-through", "no-underline",
        "truncate", "text-ellipsis", "text-clip", "text-wrap", "text-nowrap", "text-balance",
        "text-pretty",
        "break-normal", "break-words", "break-all", "break-keep",
        "antialiased", "subpixel-antialiased",
        "list-none", "list-disc", "list-decimal", "list-inside", "list-outside",
        // layout
        "box-border", "box-content",
        "float-left", "float-right", "float-start", "float-end", "float-none",
        "clear-left", "clear-right", "clear-both", "clear-none", "clear-start", "clear-end",
        "overflow-auto", "overflow-hidden", "overflow-visible", "overflow-scroll", "overflow-clip",
        "overflow-x-auto", "overflow-y-auto", "overflow-x-hidden", "overflow-y-hidden",
        "overflow-x-scroll", "overflow-y-scroll",
        "object-contain", "object-cover", "object-fill", "object-none", "object-scale-down",
        "object-center", "object-top", "object-bottom",
        "isolate", "isolation-auto", "container", "sr-only", "not-sr-only",
        // borders & effects
        "rounded", "border", "border-x", "border-y", "border-t", "border-r", "border-b", "border-l",
        "border-solid", "border-dashed", "border-dotted", "border-double", "border-none",
        "shadow", "ring", "ring-inset", "outline", "outline-none", "outline-dashed",
        "outline-dotted", "outline-double",
        "blur", "backdrop-blur", "grayscale", "invert", "sepia",
        // transitions & interaction
        "transition", "transition-all", "transition-colors", "transition-opacity",
        "transition-shadow", "transition-transform", "transition-none", "transform",
        "transform-none", "will-change-auto", "will-change-transform",
        "cursor-auto", "cursor-default", "cursor-pointer", "cursor-wait", "cursor-text",
        "cursor-move", "cursor-not-allowed", "cursor-grab", "cursor-grabbing",
        "select-none", "select-text", "select-all", "select-auto",
        "pointer-events-none", "pointer-events-auto",
        "resize", "resize-none", "resize-x", "resize-y",
        "appearance-none", "appearance-auto",
        // markers for group-*/peer-* variants
        "group", "peer",
    ]
    .into_iter()
    .collect();

    /// Prefixes that only make sense with an arbitrary value.
    static ref ARBITRARY_ONLY_PREFIXES: HashSet<&'static str> = [
        "content", "font", "grid-template-columns", "transition", "cursor", "will-change",
        "list", "indent", "object", "origin", "bg-size", "bg-position",
    ]
    .into_iter()
    .collect();

    static ref VARIANTS: HashSet<&'static str> = [
        "sm", "md", "lg", "xl", "2xl",
        "hover", "focus", "focus-within", "focus-visible", "active", "visited", "target",
        "disabled", "enabled", "checked", "indeterminate", "default", "required", "optional",
        "valid", "invalid", "user-valid", "user-invalid", "in-range", "out-of-range",
        "placeholder-shown", "autofill", "read-only",
        "first", "last", "only", "odd", "even", "first-of-type", "last-of-type", "only-of-type",
        "empty", "open", "inert",
        "before", "after", "placeholder", "file", "marker", "selection", "first-line",
        "first-letter", "backdrop",
        "dark", "print", "motion-safe", "motion-reduce", "contrast-more", "contrast-less",
        "portrait", "landscape", "ltr", "rtl", "forced-colors", "starting",
        "*", "**",
    ]
    .into_iter()
    .collect();
}

/// Variants that take a free-form tail (`data-open`, `aria-expanded`).
const OPEN_VARIANT_PREFIXES: &[&str] = &["aria-", "data-", "supports-", "has-", "not-", "in-", "nth-"];

// ═══════════════════════════════════════════════════════════════════════════════
// CATALOG ORACLE
// ═══════════════════════════════════════════════════════════════════════════════

/// Table-driven [`ValidationOracle`].
#[derive(Debug, Clone)]
pub struct CatalogOracle {
    utilities: HashSet<String>,
    variants: HashSet<String>,
    prefixes: HashSet<String>,
    families: HashMap<String, (Vec<Scale>, bool)>,
}

impl Default for CatalogOracle {
    fn default() -> Self {
        let mut families = HashMap::new();
        for family in FAMILIES.iter() {
            for prefix in family.prefixes {
                families
                    .entry(prefix.to_string())
                    .or_insert_with(|| (Vec::new(), false))
                    .0
                    .extend_from_slice(family.scales);
                if family.negative {
                    if let Some(entry) = families.get_mut(*prefix) {
                        entry.1 = true;
                    }
                }
            }
        }
        Self {
            utilities: STATIC_UTILITIES.iter().map(|u| u.to_string()).collect(),
            variants: VARIANTS.iter().map(|v| v.to_string()).collect(),
            prefixes: ARBITRARY_ONLY_PREFIXES.iter().map(|p| p.to_string()).collect(),
            families,
        }
    }
}

impl CatalogOracle {
    /// Adds configured vocabulary on top of the built-in catalog.
    pub fn extend(&mut self, utilities: &[String], variants: &[String], prefixes: &[String]) {
        self.utilities.extend(utilities.iter().cloned());
        self.variants.extend(variants.iter().cloned());
        self.prefixes.extend(prefixes.iter().cloned());
    }

    fn known_variant(&self, variant: &str) -> bool {
        if variant.starts_with('[') && variant.ends_with(']') {
            return true;
        }
        if variant.starts_with('@') && variant.len() > 1 {
            return true;
        }
        if self.variants.contains(variant) {
            return true;
        }
        for marker in ["group-", "peer-"] {
            if let Some(rest) = variant.strip_prefix(marker) {
                let rest = rest.split_once('/').map_or(rest, |(state, _)| state);
                return self.known_variant(rest);
            }
        }
        if let Some(rest) = variant.strip_prefix("max-").or_else(|| variant.strip_prefix("min-")) {
            return ["sm", "md", "lg", "xl", "2xl"].contains(&rest)
                || (rest.starts_with('[') && rest.ends_with(']'));
        }
        OPEN_VARIANT_PREFIXES
            .iter()
            .any(|prefix| variant.strip_prefix(prefix).map_or(false, |rest| !rest.is_empty()))
    }

    fn is_valid_base(&self, base: &str) -> bool {
        if self.utilities.contains(base) {
            return true;
        }
        let (negative, unsigned) = match base.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, base),
        };
        if negative && self.utilities.contains(unsigned) {
            return false;
        }

        // Longest prefix first: `border-t-2` is `border-t` + `2`.
        let mut cut = unsigned.len();
        while let Some(dash) = unsigned[..cut].rfind('-') {
            let (prefix, value) = (&unsigned[..dash], &unsigned[dash + 1..]);
            if let Some((scales, signed)) = self.families.get(prefix) {
                if (!negative || *signed) && scales.iter().any(|scale| scale.accepts(value)) {
                    return true;
                }
            }
            cut = dash;
        }
        false
    }
}

impl ValidationOracle for CatalogOracle {
    fn is_valid_utility(&self, variants: &[String], base: &str) -> bool {
        variants.iter().all(|v| self.known_variant(v)) && self.is_valid_base(base)
    }

    fn is_valid_variant(&self, variant: &str) -> bool {
        self.known_variant(variant)
    }

    fn is_utility_prefix(&self, prefix: &str) -> bool {
        self.families.contains_key(prefix) || self.prefixes.contains(prefix)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFLICT GROUPS
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    static ref BUILTIN_GROUPS: Vec<(&'static str, &'static [&'static str])> = vec![
        ("text-align", &["text-left", "text-center", "text-right", "text-justify", "text-start", "text-end"][..]),
        ("justify-content", &["justify-start", "justify-end", "justify-center", "justify-between", "justify-around", "justify-evenly", "justify-stretch", "justify-normal"][..]),
        ("align-self", &["self-auto", "self-start", "self-end", "self-center", "self-stretch", "self-baseline"][..]),
        ("align-content", &["content-start", "content-end", "content-center", "content-between", "content-around", "content-evenly", "content-stretch", "content-normal"][..]),
        ("font-style", &["italic", "not-italic"][..]),
        ("whitespace", &["whitespace-normal", "whitespace-nowrap", "whitespace-pre", "whitespace-pre-line", "whitespace-pre-wrap", "whitespace-break-spaces"][..]),
        ("display", &["block", "inline-block", "inline", "flex", "inline-flex", "grid", "inline-grid", "contents", "hidden", "table", "table-row", "table-cell", "flow-root", "list-item"][..]),
        ("position", &["static", "fixed", "absolute", "relative", "sticky"][..]),
        ("flex-direction", &["flex-row", "flex-row-reverse", "flex-col", "flex-col-reverse"][..]),
        ("flex-wrap", &["flex-wrap", "flex-nowrap", "flex-wrap-reverse"][..]),
        ("text-transform", &["uppercase", "lowercase", "capitalize", "normal-case"][..]),
        ("text-decoration-line", &["underline", "overline", "line-through", "no-underline"][..]),
        ("font-weight", &["font-thin", "font-extralight", "font-light", "font-normal", "font-medium", "font-semibold", "font-bold", "font-extrabold", "font-black"][..]),
        ("visibility", &["visible", "invisible", "collapse"][..]),
        ("word-break", &["break-normal", "break-words", "break-all", "break-keep"][..]),
        ("box-sizing", &["box-border", "box-content"][..]),
        ("float", &["float-left", "float-right", "float-start", "float-end", "float-none"][..]),
        ("clear", &["clear-left", "clear-right", "clear-both", "clear-none", "clear-start", "clear-end"][..]),
    ];
}

/// Maps utilities to the CSS property group they set. A utility belongs to
/// at most one group; registering it again moves it.
#[derive(Debug, Clone, Default)]
pub struct ConflictGroups {
    members: HashMap<String, String>,
}

impl ConflictGroups {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builtin() -> Self {
        let mut groups = Self::empty();
        for (id, members) in BUILTIN_GROUPS.iter() {
            groups.insert(id, members.iter().copied());
        }
        groups
    }

    pub fn insert<'m>(&mut self, id: &str, members: impl IntoIterator<Item = &'m str>) {
        for member in members {
            self.members.insert(member.to_string(), id.to_string());
        }
    }

    pub fn contains_group(&self, id: &str) -> bool {
        self.members.values().any(|group| group == id)
    }
}

impl ConflictGroupTable for ConflictGroups {
    fn group_of(&self, base: &str) -> Option<&str> {
        self.members.get(base).map(String::as_str)
    }
}
