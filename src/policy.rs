//! Policy filter: decides whether a parsed query is allowed to be forwarded.

use crate::codec::Name;

/// A pre-normalized (lowercased) set of fully-qualified domains to refuse.
/// Membership is exact string equality — no suffix matching, no wildcards.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    entries: std::collections::HashSet<String>,
}

impl Blacklist {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Returns `false` if any question name, rendered as a lowercased dot-joined
/// string, equals an entry of the blacklist; `true` otherwise (including an
/// empty question section).
pub fn is_allowed(names: &[Name], blacklist: &Blacklist) -> bool {
    !names
        .iter()
        .any(|name| blacklist.contains(&name.to_lowercase_string()))
}
