//! Wildcard-on-empty allow-lists.

/// A restriction list read from storage.
///
/// An absent, empty or undecodable stored list is [`AllowList::Any`]:
/// it restricts nothing. It never means "deny all".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AllowList<T> {
    #[default]
    Any,
    Only(Vec<T>),
}

impl<T> AllowList<T> {
    /// Build from a lenient decode. `None` and empty lists are wildcards.
    pub fn from_decoded(entries: Option<Vec<T>>) -> Self {
        match entries {
            Some(entries) if !entries.is_empty() => AllowList::Only(entries),
            _ => AllowList::Any,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, AllowList::Any)
    }

    /// Whether some entry satisfies `matches`, or the list is a wildcard.
    pub fn permits(&self, matches: impl Fn(&T) -> bool) -> bool {
        match self {
            AllowList::Any => true,
            AllowList::Only(entries) => entries.iter().any(matches),
        }
    }

    pub fn entries(&self) -> &[T] {
        match self {
            AllowList::Any => &[],
            AllowList::Only(entries) => entries,
        }
    }
}

impl<T: PartialEq> AllowList<T> {
    /// Exact-match form of [`permits`](Self::permits).
    pub fn contains(&self, item: &T) -> bool {
        self.permits(|entry| entry == item)
    }
}
