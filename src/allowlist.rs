use std::collections::HashSet;

use regex::Regex;

/// Classes the validator must accept even though the oracle does not know
/// them. Entries are exact names, `*` wildcard patterns (`icon-*`), or raw
/// regular expressions written as `/.../`.
#[derive(Debug, Clone, Default)]
pub struct AllowedClassMatcher {
    exact: HashSet<String>,
    patterns: Vec<Regex>,
}

impl AllowedClassMatcher {
    pub fn new<S: AsRef<str>>(entries: &[S]) -> Result<Self, regex::Error> {
        let mut matcher = Self::default();
        for entry in entries {
            matcher.add(entry.as_ref())?;
        }
        Ok(matcher)
    }

    pub fn add(&mut self, entry: &str) -> Result<(), regex::Error> {
        if entry.len() >= 2 && entry.starts_with('/') && entry.ends_with('/') {
            self.patterns.push(Regex::new(&entry[1..entry.len() - 1])?);
        } else if entry.contains('*') {
            let body: Vec<String> = entry.split('*').map(regex::escape).collect();
            self.patterns.push(Regex::new(&format!("^{}$", body.join(".*")))?);
        } else {
            self.exact.insert(entry.to_string());
        }
        Ok(())
    }

    pub fn matches(&self, class: &str) -> bool {
        self.exact.contains(class) || self.patterns.iter().any(|re| re.is_match(class))
    }

    /// Wildcard and regex entries only.
    pub fn matches_pattern(&self, class: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(class))
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_forms() {
        let matcher = AllowedClassMatcher::new(&["js-hook", "icon-*", "/^legacy-[a-z]+$/"]).unwrap();
        assert!(matcher.matches("js-hook"));
        assert!(!matcher.matches("js-hooks"));
        assert!(matcher.matches("icon-close"));
        assert!(!matcher.matches("my-icon-close"));
        assert!(matcher.matches("legacy-button"));
        assert!(!matcher.matches("legacy-42"));
        assert!(!matcher.matches_pattern("js-hook"));
        assert!(matcher.matches_pattern("icon-close"));
    }

    #[test]
    fn test_wildcard_escapes_regex_metacharacters() {
        let matcher = AllowedClassMatcher::new(&["w-[*]"]).unwrap();
        assert!(matcher.matches("w-[12px]"));
        assert!(!matcher.matches("w-12px"));
    }

    #[test]
    fn test_bad_pattern_is_an_error() {
        assert!(AllowedClassMatcher::new(&["/([/"]).is_err());
        assert!(AllowedClassMatcher::new::<&str>(&[]).unwrap().is_empty());
    }
}
