//! Thread-local cache of compiled single-character regex patterns
//!
//! `Re` atoms carry their pattern as a source string rather than a
//! pre-compiled `Regex` so that `Atom`/`Grammar` stay plain, cheaply
//! cloneable data; compilation happens lazily here, the first time a
//! pattern is actually matched, and is cached per thread thereafter.

use std::cell::RefCell;

use hashbrown::HashMap;
use regex::{Regex, RegexBuilder};

thread_local! {
    static CACHE: RefCell<HashMap<String, Option<Regex>>> = RefCell::new(HashMap::new());
}

/// Get (compiling and caching if necessary) the regex for `pattern`.
///
/// `pattern` is anchored to a single character with `^(?:...)` and
/// compiled with `dot_matches_new_line(true)` so that `.` matches `\n`,
/// per the `Re` atom's matching semantics. Returns `None` if the
/// pattern fails to compile as a regex; callers treat this as a
/// programmer error in the grammar, not a parse failure.
pub fn get_or_compile(pattern: &str) -> Option<Regex> {
    CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();
        if let Some(entry) = cache.get(pattern) {
            return entry.clone();
        }
        let anchored = format!("^(?:{})$", pattern);
        let compiled = RegexBuilder::new(&anchored)
            .dot_matches_new_line(true)
            .build()
            .ok();
        cache.insert(pattern.to_string(), compiled.clone());
        compiled
    })
}

/// Test whether `ch` satisfies the single-character pattern, compiling
/// and caching the pattern if needed.
pub fn matches_char(pattern: &str, ch: char) -> bool {
    let mut buf = [0u8; 4];
    let s = ch.encode_utf8(&mut buf);
    match get_or_compile(pattern) {
        Some(re) => re.is_match(s),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_compiled_pattern() {
        assert!(matches_char("[a-z]", 'q'));
        assert!(!matches_char("[a-z]", 'Q'));
    }

    #[test]
    fn dot_matches_newline() {
        assert!(matches_char(".", '\n'));
    }

    #[test]
    fn invalid_pattern_never_matches() {
        assert!(!matches_char("[", 'a'));
    }
}
