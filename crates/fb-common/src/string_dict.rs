//! Process-wide string interning for port, type, and instance names.
//!
//! Names are interned once into a [`StringId`] so that interface lookups
//! compare integers instead of text. The dictionary only grows; a handle
//! stays valid for the lifetime of the process.

use crossbeam_utils::sync::ShardedLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Interned name handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(u32);

impl StringId {
    /// Raw handle value.
    #[must_use]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Intern `text` and return its handle.
    pub fn intern(text: &str) -> Self {
        StringDictionary::global().intern(text)
    }

    /// Resolve the handle back to its text (`"?"` for a foreign handle).
    #[must_use]
    pub fn text(self) -> Arc<str> {
        StringDictionary::global()
            .resolve(self)
            .unwrap_or_else(|| Arc::from("?"))
    }
}

impl fmt::Display for StringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

#[derive(Debug, Default)]
struct Entries {
    ids: HashMap<Arc<str>, StringId>,
    names: Vec<Arc<str>>,
}

/// Read-mostly interning table.
#[derive(Debug, Default)]
pub struct StringDictionary {
    entries: ShardedLock<Entries>,
}

impl StringDictionary {
    /// Create an empty dictionary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The dictionary shared by the whole process.
    pub fn global() -> &'static StringDictionary {
        static GLOBAL: OnceLock<StringDictionary> = OnceLock::new();
        GLOBAL.get_or_init(StringDictionary::new)
    }

    /// Intern `text`, returning the existing handle if it was seen before.
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX` distinct names are interned.
    pub fn intern(&self, text: &str) -> StringId {
        if let Some(id) = self.lookup(text) {
            return id;
        }

        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        // Another writer may have interned the same text between the two locks.
        if let Some(id) = entries.ids.get(text) {
            return *id;
        }
        let raw = u32::try_from(entries.names.len()).expect("string dictionary exhausted");
        let id = StringId(raw);
        let name: Arc<str> = Arc::from(text);
        entries.names.push(Arc::clone(&name));
        entries.ids.insert(name, id);
        id
    }

    /// Find the handle for `text` without interning it.
    #[must_use]
    pub fn lookup(&self, text: &str) -> Option<StringId> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.ids.get(text).copied()
    }

    /// Text for `id`, if it was produced by this dictionary.
    #[must_use]
    pub fn resolve(&self, id: StringId) -> Option<Arc<str>> {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.names.get(id.0 as usize).cloned()
    }

    /// Number of distinct names interned so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .names
            .len()
    }

    /// Returns true if no name has been interned.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
