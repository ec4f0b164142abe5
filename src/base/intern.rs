//! String interner for token/tag spellings.
//!
//! Interning deduplicates spellings into a single arena slot per unique
//! string; a [`Name`] is then just the index of that slot, so `Name`
//! equality is index equality in O(1) and, by construction, identity implies
//! (and is implied by) string equality for every interned token spelling.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

/// An interned spelling. Cheap to copy, compare, and hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(u32);

impl Name {
    fn new(index: usize) -> Self {
        Self(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Deduplicating string table. One per [`crate::program::Program`].
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<SmolStr>,
    lookup: FxHashMap<SmolStr, Name>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a spelling, returning the same [`Name`] for equal strings.
    pub fn intern(&mut self, s: &str) -> Name {
        if let Some(existing) = self.lookup.get(s) {
            return *existing;
        }
        let name = Name::new(self.strings.len());
        let smol = SmolStr::new(s);
        self.strings.push(smol.clone());
        self.lookup.insert(smol, name);
        name
    }

    /// Resolve a [`Name`] back to its spelling.
    pub fn resolve(&self, name: Name) -> &str {
        self.strings[name.index()].as_str()
    }

    /// Look up a spelling without interning it.
    pub fn get(&self, s: &str) -> Option<Name> {
        self.lookup.get(s).copied()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_returns_same_name() {
        let mut interner = Interner::new();
        let a = interner.intern("BEGIN");
        let b = interner.intern("BEGIN");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_strings_get_distinct_names() {
        let mut interner = Interner::new();
        let a = interner.intern("INT");
        let b = interner.intern("REAL");
        assert_ne!(a, b);
        assert_eq!(interner.resolve(a), "INT");
        assert_eq!(interner.resolve(b), "REAL");
    }

    #[test]
    fn identity_implies_equality_and_reverse() {
        let mut interner = Interner::new();
        let names: Vec<Name> = ["x", "y", "x", "z", "y"]
            .iter()
            .map(|s| interner.intern(s))
            .collect();
        assert_eq!(names[0], names[2]); // same spelling -> same Name
        assert_eq!(names[1], names[4]);
        assert_ne!(names[0], names[1]);
        assert_ne!(names[0], names[3]);
    }

    #[test]
    fn get_without_interning() {
        let mut interner = Interner::new();
        assert_eq!(interner.get("missing"), None);
        let name = interner.intern("present");
        assert_eq!(interner.get("present"), Some(name));
    }
}
