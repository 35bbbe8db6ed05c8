//! Post-parse tree transformation
//!
//! This module is an external collaborator to the parser core: it
//! consumes an already-flattened [`Value`] tree and rewrites it, wired
//! only through that narrow interface rather than through anything
//! internal to the atom algebra or the flattener — a small, named-rule
//! rewrite pass, not a general tree-transformation engine.

use std::fmt;

use hashbrown::HashMap;

use crate::value::Value;

/// A rule's rewrite closure: given the mapping it matched (after its
/// own fields have already been transformed), produce a replacement
/// value.
pub type Rule = Box<dyn Fn(&Value) -> Result<Value, TransformError>>;

/// A named set of rewrite rules applied bottom-up over a [`Value`] tree.
///
/// A rule is keyed by a mapping field name; wherever a `Mapping` node
/// has a field with that name, the rule's closure is invoked on the
/// whole (already-transformed) mapping and its return value replaces
/// the node. Lists and untouched mappings recurse structurally with no
/// rule applied.
#[derive(Default)]
pub struct Transform {
    rules: HashMap<String, Rule>,
}

impl Transform {
    /// A transform with no rules: `apply` is then the identity.
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// Register a rewrite rule for mappings carrying a `key` field.
    pub fn rule<F>(mut self, key: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, TransformError> + 'static,
    {
        self.rules.insert(key.into(), Box::new(f));
        self
    }

    /// Apply every registered rule, bottom-up, over `value`.
    pub fn apply(&self, value: &Value) -> Result<Value, TransformError> {
        self.apply_node(value)
    }

    fn apply_node(&self, value: &Value) -> Result<Value, TransformError> {
        match value {
            Value::Mapping(fields) => {
                let mut rewritten = Vec::with_capacity(fields.len());
                for (key, field) in fields {
                    rewritten.push((key.clone(), self.apply_node(field)?));
                }
                let mapping = Value::Mapping(rewritten);
                match rewritten_rule(&self.rules, &mapping) {
                    Some(rule) => rule(&mapping),
                    None => Ok(mapping),
                }
            }
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.apply_node(item)?);
                }
                Ok(Value::List(out))
            }
            other => Ok(other.clone()),
        }
    }
}

fn rewritten_rule<'a>(rules: &'a HashMap<String, Rule>, mapping: &Value) -> Option<&'a Rule> {
    match mapping {
        Value::Mapping(fields) => fields.iter().find_map(|(k, _)| rules.get(k)),
        _ => None,
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A failure raised by a [`Transform`] rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformError {
    message: String,
}

impl TransformError {
    /// Build a transform error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TransformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for TransformError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_transform_leaves_value_unchanged() {
        let value = Value::Mapping(vec![("x".to_string(), Value::Str("a".to_string()))]);
        let transform = Transform::new();
        assert_eq!(transform.apply(&value).unwrap(), value);
    }

    #[test]
    fn rule_rewrites_matching_mapping() {
        let value = Value::Mapping(vec![("num".to_string(), Value::Str("42".to_string()))]);
        let transform = Transform::new().rule("num", |v| {
            let text = v.get("num").and_then(|v| v.as_str()).unwrap_or_default();
            Ok(Value::Str(text.to_string()))
        });
        assert_eq!(transform.apply(&value).unwrap(), Value::Str("42".to_string()));
    }

    #[test]
    fn rule_applies_bottom_up_inside_lists() {
        let value = Value::List(vec![
            Value::Mapping(vec![("num".to_string(), Value::Str("1".to_string()))]),
            Value::Mapping(vec![("num".to_string(), Value::Str("2".to_string()))]),
        ]);
        let transform = Transform::new().rule("num", |v| {
            Ok(v.get("num").cloned().unwrap_or(Value::Nil))
        });
        assert_eq!(
            transform.apply(&value).unwrap(),
            Value::List(vec![
                Value::Str("1".to_string()),
                Value::Str("2".to_string())
            ])
        );
    }

    #[test]
    fn rule_can_fail() {
        let value = Value::Mapping(vec![("bad".to_string(), Value::Nil)]);
        let transform = Transform::new().rule("bad", |_| Err(TransformError::new("nope")));
        assert!(transform.apply(&value).is_err());
    }
}
