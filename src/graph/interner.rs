use dashmap::DashMap;
use std::sync::Arc;

/// Interns vertex tokens to share allocations across the graph store.
/// Each unique token is stored once, with `Arc<str>` references shared.
pub struct TokenInterner {
    interned: DashMap<Arc<str>, ()>, // Acts as a concurrent set
}

impl TokenInterner {
    pub fn new() -> Self {
        Self {
            interned: DashMap::new(),
        }
    }

    /// Intern a token, returning a shared `Arc<str>`.
    /// If the token was already interned, returns the existing Arc.
    /// Thread-safe and lock-free for reads of existing tokens.
    pub fn intern(&self, s: &str) -> Arc<str> {
        // Fast path: check if already interned
        if let Some(entry) = self.interned.get(s) {
            return entry.key().clone();
        }

        // Slow path: intern new token
        let arc: Arc<str> = Arc::from(s);

        // Use entry API to handle race condition
        self.interned.entry(arc.clone()).or_insert(());

        // Return the arc we created (or the one that won the race)
        if let Some(entry) = self.interned.get(s) {
            entry.key().clone()
        } else {
            arc
        }
    }

    /// Number of unique tokens interned
    pub fn len(&self) -> usize {
        self.interned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interned.is_empty()
    }
}

impl Default for TokenInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_same_string() {
        let interner = TokenInterner::new();

        let s1 = interner.intern("hello");
        let s2 = interner.intern("hello");

        // Should be the same Arc (pointer equality)
        assert!(Arc::ptr_eq(&s1, &s2));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn test_intern_different_strings() {
        let interner = TokenInterner::new();

        let s1 = interner.intern("hello");
        let s2 = interner.intern("world");

        assert!(!Arc::ptr_eq(&s1, &s2));
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn test_intern_returns_correct_content() {
        let interner = TokenInterner::new();

        let token = "gene:BRCA1";
        let interned = interner.intern(token);

        assert_eq!(&*interned, token);
    }
}
