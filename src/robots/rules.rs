//! Ordered robots rules and first-match indexability resolution

/// Index/follow disposition of a path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Indexability {
    pub index: bool,
    pub follow: bool,
}

impl Indexability {
    pub const ALLOW: Self = Self {
        index: true,
        follow: true,
    };

    pub const DENY: Self = Self {
        index: false,
        follow: false,
    };
}

/// A single path-prefix rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RobotsRule {
    pub prefix: String,
    pub flags: Indexability,
}

/// Robots rules in source order
///
/// Order matters: resolution returns the first matching prefix, not the
/// longest one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRules {
    rules: Vec<RobotsRule>,
}

impl RobotsRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a rule. A prefix seen before keeps its original position and
    /// takes the new flags.
    pub fn push(&mut self, prefix: impl Into<String>, flags: Indexability) {
        let prefix = prefix.into();
        match self.rules.iter_mut().find(|rule| rule.prefix == prefix) {
            Some(existing) => existing.flags = flags,
            None => self.rules.push(RobotsRule { prefix, flags }),
        }
    }

    pub fn with(mut self, prefix: impl Into<String>, flags: Indexability) -> Self {
        self.push(prefix, flags);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &RobotsRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FromIterator<(String, Indexability)> for RobotsRules {
    fn from_iter<I: IntoIterator<Item = (String, Indexability)>>(iter: I) -> Self {
        let mut rules = Self::new();
        for (prefix, flags) in iter {
            rules.push(prefix, flags);
        }
        rules
    }
}

/// Resolves the index/follow flags for a URL path
///
/// Returns `None` when no rule set is available, so the caller can tell
/// "not evaluated" apart from "evaluated as permissive". Otherwise the first
/// rule whose prefix starts the path wins; no match means index and follow.
///
/// # Examples
///
/// ```
/// use crawl_ledger::robots::{resolve, Indexability, RobotsRules};
///
/// let rules = RobotsRules::new().with("/private/", Indexability::DENY);
/// assert_eq!(resolve("/private/x", Some(&rules)), Some(Indexability::DENY));
/// assert_eq!(resolve("/public/x", Some(&rules)), Some(Indexability::ALLOW));
/// assert_eq!(resolve("/public/x", None), None);
/// ```
pub fn resolve(path: &str, rules: Option<&RobotsRules>) -> Option<Indexability> {
    first_match(rules?, |prefix| path.starts_with(prefix))
}

/// Resolves flags for the path of a canonical store key
///
/// Canonical URLs drop the trailing slash, so `/private` stands for both
/// `/private` and `/private/`. A rule applies when its prefix starts either
/// form; rules are still taken in order and the first match wins.
///
/// ```
/// use crawl_ledger::robots::{resolve_canonical, Indexability, RobotsRules};
///
/// let rules = RobotsRules::new().with("/private/", Indexability::DENY);
/// assert_eq!(resolve_canonical("/private", Some(&rules)), Some(Indexability::DENY));
/// assert_eq!(resolve_canonical("/privateer", Some(&rules)), Some(Indexability::ALLOW));
/// ```
pub fn resolve_canonical(path: &str, rules: Option<&RobotsRules>) -> Option<Indexability> {
    let slashed = format!("{}/", path.trim_end_matches('/'));
    first_match(rules?, |prefix| {
        path.starts_with(prefix) || slashed.starts_with(prefix)
    })
}

fn first_match(rules: &RobotsRules, matches: impl Fn(&str) -> bool) -> Option<Indexability> {
    let flags = rules
        .iter()
        .find(|rule| matches(rule.prefix.as_str()))
        .map(|rule| rule.flags)
        .unwrap_or(Indexability::ALLOW);
    Some(flags)
}
