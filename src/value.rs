//! Intermediate and flattened parse values
//!
//! [`RawValue`] is what an atom's `apply` actually produces: a small
//! tagged-list algebra that keeps track of *how* a value was built
//! (sequence vs. repetition vs. optional) so that [`flatten`] can later
//! fold it into the much simpler [`Value`] a caller actually wants to
//! see — a string, a mapping, or a list of mappings.
//!
//! Splitting these into two types (rather than flattening eagerly as
//! each atom matches) is what makes the merge-fold and
//! repetition-collapse rules below a single pure function instead of
//! logic smeared across every atom kind.

use std::borrow::Cow;

/// Which list rule produced a [`RawValue::List`], and therefore which
/// collapse rule [`flatten`] applies to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListTag {
    /// Produced by `Sequence`: merge-fold left to right, dropping `Nil`s.
    Sequence,
    /// Produced by `Repetition` with its ordinary tag.
    Repetition,
    /// Produced by `Repetition` wrapping a `.maybe` (0..=1).
    Maybe,
}

/// The raw, unflattened value an atom's `apply` returns.
///
/// Borrows matched text directly out of the input where possible
/// (`Str`/`Re` slices), so a successful parse allocates only for
/// `Named` keys and for the mapping/list nodes flattening builds.
#[derive(Debug, Clone)]
pub enum RawValue<'a> {
    /// Lookahead's result, and an empty `.maybe` miss.
    Nil,
    /// What `Str` and `Re` produce.
    Str(Cow<'a, str>),
    /// What `Named` produces: a single `name -> value` pair.
    Mapping(String, Box<RawValue<'a>>),
    /// What `Sequence` and `Repetition` produce.
    List(ListTag, Vec<RawValue<'a>>),
}

impl<'a> RawValue<'a> {
    /// Build a `Str` from a borrowed slice, the common case for matched
    /// literal and regex text.
    #[inline]
    pub fn borrowed_str(s: &'a str) -> Self {
        RawValue::Str(Cow::Borrowed(s))
    }
}

/// The flattened, user-visible result of a parse.
///
/// Per the flattening rules, this is always one of: a string, a
/// mapping, or a list of mappings (lists never contain bare strings —
/// those are concatenated away by repetition-collapse).
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// No value: an unmatched `.maybe`, or a `Lookahead`'s result.
    Nil,
    /// Matched or concatenated text.
    Str(String),
    /// Named fields, insertion-ordered; later merges win on key clash.
    Mapping(Vec<(String, Value)>),
    /// A homogeneous list, produced only by repetition-collapse.
    List(Vec<Value>),
}

impl Value {
    /// Borrow this value's string contents, if it is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Look up a named field on a `Mapping`. Returns `None` for any
    /// other variant, and for a `Mapping` with no matching key.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Mapping(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Borrow this value's elements, if it is a `List`.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// True for `Value::Nil`.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }
}

/// Flatten a raw intermediate value into its user-visible form.
///
/// Duplicate mapping keys produced by a merge are silently resolved in
/// favor of the right-hand value; use [`flatten_with`] to observe them.
pub fn flatten(raw: &RawValue<'_>) -> Value {
    flatten_with(raw, &mut |_key| {})
}

/// Flatten a raw intermediate value, invoking `on_duplicate_key` for
/// every mapping key clash encountered during merge-fold.
///
/// This is the "diagnostics callback" seam: rather than writing
/// warnings to a global stream, callers that care about duplicate
/// named captures can collect or log them through this closure.
pub fn flatten_with(raw: &RawValue<'_>, on_duplicate_key: &mut dyn FnMut(&str)) -> Value {
    match raw {
        RawValue::Nil => Value::Nil,
        RawValue::Str(s) => Value::Str(s.clone().into_owned()),
        RawValue::Mapping(name, inner) => {
            Value::Mapping(vec![(name.clone(), flatten_with(inner, on_duplicate_key))])
        }
        RawValue::List(tag, children) => {
            let flattened: Vec<Value> = children
                .iter()
                .map(|c| flatten_with(c, on_duplicate_key))
                .collect();
            match tag {
                ListTag::Maybe => flattened.into_iter().next().unwrap_or(Value::Nil),
                ListTag::Sequence => fold_sequence(flattened, on_duplicate_key),
                ListTag::Repetition => collapse_repetition(flattened),
            }
        }
    }
}

fn fold_sequence(children: Vec<Value>, on_duplicate_key: &mut dyn FnMut(&str)) -> Value {
    let mut acc = Value::Str(String::new());
    for child in children.into_iter().filter(|v| !v.is_nil()) {
        acc = merge_fold(acc, child, on_duplicate_key);
    }
    acc
}

/// Merge two already-flattened values the way `Sequence` folds its
/// children, left to right.
fn merge_fold(l: Value, r: Value, on_duplicate_key: &mut dyn FnMut(&str)) -> Value {
    match (l, r) {
        (Value::Str(mut a), Value::Str(b)) => {
            a.push_str(&b);
            Value::Str(a)
        }
        (Value::Mapping(a), Value::Mapping(b)) => Value::Mapping(merge_mappings(a, b, on_duplicate_key)),
        (Value::List(mut a), Value::List(b)) => {
            a.extend(b);
            Value::List(a)
        }
        (Value::Str(_), other) => other,
        (other, Value::Str(_)) => other,
        (Value::Mapping(m), Value::List(mut items)) => {
            items.insert(0, Value::Mapping(m));
            Value::List(items)
        }
        (Value::List(mut items), Value::Mapping(m)) => {
            items.push(Value::Mapping(m));
            Value::List(items)
        }
        (l, r) => unreachable!("flattener bug: cannot merge {:?} with {:?}", l, r),
    }
}

fn merge_mappings(
    mut a: Vec<(String, Value)>,
    b: Vec<(String, Value)>,
    on_duplicate_key: &mut dyn FnMut(&str),
) -> Vec<(String, Value)> {
    for (key, value) in b {
        if let Some(existing) = a.iter_mut().find(|(k, _)| *k == key) {
            on_duplicate_key(&key);
            existing.1 = value;
        } else {
            a.push((key, value));
        }
    }
    a
}

fn collapse_repetition(children: Vec<Value>) -> Value {
    if children.iter().any(|v| matches!(v, Value::Mapping(_))) {
        Value::List(
            children
                .into_iter()
                .filter(|v| matches!(v, Value::Mapping(_)))
                .collect(),
        )
    } else if children.iter().any(|v| matches!(v, Value::List(_))) {
        let mut out = Vec::new();
        for child in children {
            if let Value::List(inner) = child {
                out.extend(inner);
            }
        }
        Value::List(out)
    } else {
        let mut s = String::new();
        for child in children {
            if let Value::Str(text) = child {
                s.push_str(&text);
            }
        }
        Value::Str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named<'a>(name: &str, inner: RawValue<'a>) -> RawValue<'a> {
        RawValue::Mapping(name.to_string(), Box::new(inner))
    }

    fn seq<'a>(children: Vec<RawValue<'a>>) -> RawValue<'a> {
        RawValue::List(ListTag::Sequence, children)
    }

    fn rep<'a>(tag: ListTag, children: Vec<RawValue<'a>>) -> RawValue<'a> {
        RawValue::List(tag, children)
    }

    #[test]
    fn sequence_of_strings_concatenates() {
        let raw = seq(vec![
            RawValue::borrowed_str("a"),
            RawValue::borrowed_str("b"),
        ]);
        assert_eq!(flatten(&raw), Value::Str("ab".to_string()));
    }

    #[test]
    fn sequence_drops_nil_entries() {
        let raw = seq(vec![
            RawValue::borrowed_str("a"),
            RawValue::Nil,
            RawValue::borrowed_str("b"),
        ]);
        assert_eq!(flatten(&raw), Value::Str("ab".to_string()));
    }

    #[test]
    fn named_field_dominates_surrounding_strings() {
        let raw = seq(vec![
            RawValue::borrowed_str("<"),
            named("x", RawValue::borrowed_str("v")),
            RawValue::borrowed_str(">"),
        ]);
        assert_eq!(
            flatten(&raw),
            Value::Mapping(vec![("x".to_string(), Value::Str("v".to_string()))])
        );
    }

    #[test]
    fn two_named_fields_merge_into_one_mapping() {
        let raw = seq(vec![
            named("x", RawValue::borrowed_str("a")),
            named("y", RawValue::borrowed_str("b")),
        ]);
        assert_eq!(
            flatten(&raw),
            Value::Mapping(vec![
                ("x".to_string(), Value::Str("a".to_string())),
                ("y".to_string(), Value::Str("b".to_string())),
            ])
        );
    }

    #[test]
    fn duplicate_key_keeps_right_value_and_warns() {
        let raw = seq(vec![
            named("x", RawValue::borrowed_str("a")),
            named("x", RawValue::borrowed_str("b")),
        ]);
        let mut warned = Vec::new();
        let value = flatten_with(&raw, &mut |key| warned.push(key.to_string()));
        assert_eq!(warned, vec!["x".to_string()]);
        assert_eq!(
            value,
            Value::Mapping(vec![("x".to_string(), Value::Str("b".to_string()))])
        );
    }

    #[test]
    fn maybe_present_returns_inner_value() {
        let raw = rep(ListTag::Maybe, vec![RawValue::borrowed_str("a")]);
        assert_eq!(flatten(&raw), Value::Str("a".to_string()));
    }

    #[test]
    fn maybe_absent_returns_nil() {
        let raw = rep(ListTag::Maybe, vec![]);
        assert_eq!(flatten(&raw), Value::Nil);
    }

    #[test]
    fn repetition_of_strings_concatenates() {
        let raw = rep(
            ListTag::Repetition,
            vec![
                RawValue::borrowed_str("a"),
                RawValue::borrowed_str("b"),
                RawValue::borrowed_str("c"),
            ],
        );
        assert_eq!(flatten(&raw), Value::Str("abc".to_string()));
    }

    #[test]
    fn repetition_of_mappings_yields_list_of_mappings() {
        let raw = rep(
            ListTag::Repetition,
            vec![
                named("x", RawValue::borrowed_str("1")),
                named("x", RawValue::borrowed_str("2")),
            ],
        );
        assert_eq!(
            flatten(&raw),
            Value::List(vec![
                Value::Mapping(vec![("x".to_string(), Value::Str("1".to_string()))]),
                Value::Mapping(vec![("x".to_string(), Value::Str("2".to_string()))]),
            ])
        );
    }

    #[test]
    fn repetition_discards_interleaved_strings_when_mappings_present() {
        let raw = rep(
            ListTag::Repetition,
            vec![
                RawValue::borrowed_str(","),
                named("x", RawValue::borrowed_str("1")),
                RawValue::borrowed_str(","),
            ],
        );
        assert_eq!(
            flatten(&raw),
            Value::List(vec![Value::Mapping(vec![(
                "x".to_string(),
                Value::Str("1".to_string())
            )])])
        );
    }

    #[test]
    fn repetition_of_lists_concatenates_one_level() {
        let raw = rep(
            ListTag::Repetition,
            vec![
                rep(ListTag::Repetition, vec![named("x", RawValue::borrowed_str("1"))]),
                rep(ListTag::Repetition, vec![named("x", RawValue::borrowed_str("2"))]),
            ],
        );
        assert_eq!(
            flatten(&raw),
            Value::List(vec![
                Value::Mapping(vec![("x".to_string(), Value::Str("1".to_string()))]),
                Value::Mapping(vec![("x".to_string(), Value::Str("2".to_string()))]),
            ])
        );
    }

    #[test]
    fn empty_repetition_yields_empty_string() {
        let raw = rep(ListTag::Repetition, vec![]);
        assert_eq!(flatten(&raw), Value::Str(String::new()));
    }

    #[test]
    fn get_and_as_str_navigate_mappings() {
        let value = Value::Mapping(vec![("x".to_string(), Value::Str("a".to_string()))]);
        assert_eq!(value.get("x").and_then(|v| v.as_str()), Some("a"));
        assert_eq!(value.get("missing"), None);
    }
}
