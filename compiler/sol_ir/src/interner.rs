//! String interner backing [`Name`] handles.
//!
//! O(1) interning and lookup. The front-end is single-threaded, so interior
//! mutability is a `RefCell` rather than a lock.

use std::cell::RefCell;

use rustc_hash::FxHashMap;

use crate::Name;

/// Interner storage. Strings are leaked into `'static` slices so lookups can
/// hand out `&'static str` without holding the borrow open.
struct Inner {
    map: FxHashMap<&'static str, u32>,
    strings: Vec<&'static str>,
}

/// String interner for identifiers and literal lexemes.
pub struct StringInterner {
    inner: RefCell<Inner>,
}

impl StringInterner {
    /// Create an interner with the empty string pre-interned at index 0.
    pub fn new() -> Self {
        let mut inner = Inner {
            map: FxHashMap::default(),
            strings: Vec::with_capacity(256),
        };
        inner.map.insert("", 0);
        inner.strings.push("");
        StringInterner {
            inner: RefCell::new(inner),
        }
    }

    /// Intern a string, returning its handle.
    pub fn intern(&self, s: &str) -> Name {
        let mut inner = self.inner.borrow_mut();
        if let Some(&idx) = inner.map.get(s) {
            return Name::from_raw(idx);
        }
        let leaked: &'static str = Box::leak(s.to_owned().into_boxed_str());
        let idx = u32::try_from(inner.strings.len()).expect("interner overflow");
        inner.map.insert(leaked, idx);
        inner.strings.push(leaked);
        Name::from_raw(idx)
    }

    /// Intern an owned string without re-allocating.
    pub fn intern_owned(&self, s: String) -> Name {
        let mut inner = self.inner.borrow_mut();
        if let Some(&idx) = inner.map.get(s.as_str()) {
            return Name::from_raw(idx);
        }
        let leaked: &'static str = Box::leak(s.into_boxed_str());
        let idx = u32::try_from(inner.strings.len()).expect("interner overflow");
        inner.map.insert(leaked, idx);
        inner.strings.push(leaked);
        Name::from_raw(idx)
    }

    /// Resolve a handle back to its text.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.inner.borrow().strings[name.raw() as usize]
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.inner.borrow().strings.len()
    }

    pub fn is_empty(&self) -> bool {
        false // the empty string is always present
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let interner = StringInterner::new();
        let a = interner.intern("balance");
        let b = interner.intern("balance");
        assert_eq!(a, b);
        assert_eq!(interner.lookup(a), "balance");
    }

    #[test]
    fn distinct_strings_get_distinct_names() {
        let interner = StringInterner::new();
        let a = interner.intern("set");
        let b = interner.intern("get");
        assert_ne!(a, b);
    }

    #[test]
    fn empty_string_is_name_empty() {
        let interner = StringInterner::new();
        assert_eq!(interner.intern(""), Name::EMPTY);
        assert_eq!(interner.lookup(Name::EMPTY), "");
    }
}
