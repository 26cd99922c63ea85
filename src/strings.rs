//! Interning of frequently repeated strings.
//!
//! Tag keys, relation-member roles and usernames repeat millions of times
//! across a real extract, so entities store a dense `i16` code instead of
//! the string itself. Codes are assigned on first use and never recycled.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Bidirectional string ↔ code table.
///
/// Allocation is synchronized internally: ingestion threads and queries
/// that intern lazily (tag lookup by name) may call [`StringPack::code`]
/// concurrently.
///
/// The code space is capped at `i16::MAX` distinct strings. Exceeding it
/// means the dataset needs a different encoding entirely, so the overflow
/// is treated as a non-recoverable configuration error and panics with a
/// descriptive message.
#[derive(Debug, Default)]
pub struct StringPack {
    inner: Mutex<PackInner>,
}

#[derive(Debug, Default)]
struct PackInner {
    codes: FxHashMap<String, i16>,
    names: Vec<String>,
}

impl StringPack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the code for `name`, allocating the next one on first use.
    ///
    /// Idempotent: repeated calls with the same name return the same code.
    pub fn code(&self, name: &str) -> i16 {
        let mut inner = self.inner.lock();
        if let Some(&code) = inner.codes.get(name) {
            return code;
        }
        let next = inner.names.len();
        assert!(
            next < i16::MAX as usize,
            "too many interned strings: more than {}",
            i16::MAX
        );
        let code = next as i16;
        inner.codes.insert(name.to_owned(), code);
        inner.names.push(name.to_owned());
        code
    }

    /// Reverse lookup. `None` for a code that was never allocated.
    pub fn name(&self, code: i16) -> Option<String> {
        if code < 0 {
            return None;
        }
        self.inner.lock().names.get(code as usize).cloned()
    }

    /// Number of distinct strings interned so far.
    pub fn len(&self) -> usize {
        self.inner.lock().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
