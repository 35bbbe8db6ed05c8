//! The atom algebra and the grammar that holds it
//!
//! A grammar is an arena of [`Atom`] nodes addressed by index rather than
//! a tree of boxed/`Rc` nodes: children are `usize`s into
//! `Grammar::atoms`. This is what lets `Entity` close cycles (a rule
//! that refers to itself, directly or through others) without any
//! `Rc<RefCell<_>>` bookkeeping — the cycle lives entirely in the index
//! graph, resolved once at grammar-build time (see `dsl::GrammarBuilder`).

use crate::debug::ParseTrace;
use crate::error::ParseError;
use crate::interpreter::{Interpreter, ParserConfig};
use crate::value::Value;

/// Which of the two repeated-match tags a [`Atom::Repetition`] carries.
///
/// This mirrors [`crate::value::ListTag`]'s `Repetition`/`Maybe` split,
/// kept as a separate type here so the atom algebra does not need to
/// know about the flattener's value representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepetitionTag {
    /// An ordinary `.repeat(min, max)`.
    Repetition,
    /// `.maybe`, i.e. `.repeat(0, 1)` with maybe-unwrapping on flatten.
    Maybe,
}

/// One node of a parser expression tree.
///
/// Variants hold indices into the owning [`Grammar`]'s atom arena rather
/// than boxed children, so the whole grammar is one flat, cheaply
/// cloneable `Vec`.
#[derive(Debug, Clone)]
pub enum Atom {
    /// Match a literal string exactly.
    Str {
        /// The literal text to match.
        pattern: String,
    },
    /// Match one character against a single-character regex fragment.
    Re {
        /// The regex source, compiled and cached by [`crate::regex_cache`].
        pattern: String,
    },
    /// Match children in order; all must succeed.
    Sequence {
        /// Child atom indices, in match order.
        atoms: Vec<usize>,
    },
    /// Try children in order; the first success wins.
    Alternative {
        /// Child atom indices, in try order.
        atoms: Vec<usize>,
    },
    /// Match the child `min..=max` times, greedily.
    Repetition {
        /// The repeated atom.
        atom: usize,
        /// Minimum number of successful matches required.
        min: usize,
        /// Maximum number of matches attempted; `None` is unbounded.
        max: Option<usize>,
        /// Which flattening rule this repetition collapses under.
        tag: RepetitionTag,
    },
    /// Assert (without consuming) that the child does or doesn't match.
    Lookahead {
        /// The child atom indices.
        atom: usize,
        /// `true` for `&child` (must match), `false` for `!child` (must not).
        positive: bool,
    },
    /// Wrap the child's value under a mapping key.
    Named {
        /// The key the child's value is stored under.
        name: String,
        /// The wrapped atom.
        atom: usize,
    },
    /// A named rule reference, resolved to its body at grammar-build time.
    ///
    /// A rule reference is conceptually a lazy thunk memoized on first
    /// use; here forward references are instead patched in by
    /// `GrammarBuilder` once the whole rule set is known, so by the time
    /// a `Grammar` exists every `Entity` already points at a concrete
    /// atom and `apply` is a plain index lookup.
    Entity {
        /// The rule's name (used for `inspect` and error messages).
        name: String,
        /// The rule body's atom index.
        atom: usize,
    },
}

fn precedence(atom: &Atom) -> u8 {
    match atom {
        Atom::Alternative { .. } => 1,
        Atom::Sequence { .. } => 2,
        Atom::Named { .. } => 3,
        Atom::Repetition { .. } | Atom::Lookahead { .. } => 4,
        Atom::Str { .. } | Atom::Re { .. } | Atom::Entity { .. } => 5,
    }
}

/// A compiled parser expression: a flat arena of atoms plus the index of
/// the root atom to start matching from.
#[derive(Debug, Clone)]
pub struct Grammar {
    atoms: Vec<Atom>,
    root: usize,
}

impl Grammar {
    /// Build a grammar from an atom arena and a root index.
    ///
    /// `root` must be a valid index into `atoms`; this is the
    /// responsibility of the builder that constructs both together.
    pub fn new(atoms: Vec<Atom>, root: usize) -> Self {
        Self { atoms, root }
    }

    /// The atom at `idx`.
    #[inline]
    pub fn get(&self, idx: usize) -> &Atom {
        &self.atoms[idx]
    }

    /// The root atom's index.
    #[inline]
    pub fn root(&self) -> usize {
        self.root
    }

    /// How many atoms this grammar's arena holds.
    #[inline]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Parse `input` against this grammar using default interpreter
    /// settings.
    pub fn parse(&self, input: &str) -> Result<Value, ParseError> {
        self.parse_with_config(input, ParserConfig::default())
    }

    /// Parse `input` against this grammar with an explicit
    /// [`ParserConfig`].
    pub fn parse_with_config(&self, input: &str, config: ParserConfig) -> Result<Value, ParseError> {
        Interpreter::new(self, config).parse(input)
    }

    /// Parse many inputs against this one compiled grammar.
    ///
    /// Building a grammar is the expensive, one-time step; this is a
    /// convenience for the common case of reusing it across a batch of
    /// inputs rather than a performance optimization in itself.
    pub fn parse_batch<'a, I>(&self, inputs: I) -> Vec<Result<Value, ParseError>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        inputs.into_iter().map(|input| self.parse(input)).collect()
    }

    /// Parse `input`, also returning an atom-level trace of every
    /// `apply` call made along the way — useful for understanding why a
    /// grammar matched (or failed to match) the way it did.
    pub fn parse_with_trace(&self, input: &str) -> (Result<Value, ParseError>, ParseTrace) {
        let mut interpreter = Interpreter::new_with_trace(self, ParserConfig::default());
        let result = interpreter.parse(input);
        (result, interpreter.take_trace().unwrap_or_default())
    }

    /// A PEG-like printed form of the atom at `idx`, used in error
    /// messages (`"Expected one of <printed form>"`) and [`crate::debug`].
    pub fn inspect(&self, idx: usize) -> String {
        self.inspect_at(idx, 0)
    }

    fn inspect_at(&self, idx: usize, min_prec: u8) -> String {
        let atom = &self.atoms[idx];
        let rank = precedence(atom);
        let body = match atom {
            Atom::Str { pattern } => format!("'{}'", pattern),
            Atom::Re { pattern } => pattern.clone(),
            Atom::Sequence { atoms } => atoms
                .iter()
                .map(|&c| self.inspect_at(c, 3))
                .collect::<Vec<_>>()
                .join(" "),
            Atom::Alternative { atoms } => atoms
                .iter()
                .map(|&c| self.inspect_at(c, 2))
                .collect::<Vec<_>>()
                .join(" / "),
            Atom::Repetition {
                atom: child,
                min,
                max,
                tag,
            } => {
                let inner = self.inspect_at(*child, 5);
                match tag {
                    RepetitionTag::Maybe => format!("{}?", inner),
                    RepetitionTag::Repetition => match max {
                        Some(max) => format!("{}{{{}, {}}}", inner, min, max),
                        None => format!("{}{{{},}}", inner, min),
                    },
                }
            }
            Atom::Lookahead {
                atom: child,
                positive,
            } => {
                let inner = self.inspect_at(*child, 5);
                if *positive {
                    format!("&{}", inner)
                } else {
                    format!("!{}", inner)
                }
            }
            Atom::Named { name, atom: child } => {
                format!("{}:{}", self.inspect_at(*child, 4), name)
            }
            Atom::Entity { name, .. } => name.to_uppercase(),
        };
        if rank < min_prec {
            format!("({})", body)
        } else {
            body
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn str_atom(s: &str) -> Atom {
        Atom::Str {
            pattern: s.to_string(),
        }
    }

    #[test]
    fn inspect_str_quotes_literal() {
        let g = Grammar::new(vec![str_atom("foo")], 0);
        assert_eq!(g.inspect(0), "'foo'");
    }

    #[test]
    fn inspect_sequence_joins_with_spaces() {
        let atoms = vec![
            str_atom("a"),
            str_atom("b"),
            Atom::Sequence { atoms: vec![0, 1] },
        ];
        let g = Grammar::new(atoms, 2);
        assert_eq!(g.inspect(2), "'a' 'b'");
    }

    #[test]
    fn inspect_alternative_joins_with_slash() {
        let atoms = vec![
            str_atom("a"),
            str_atom("b"),
            Atom::Alternative { atoms: vec![0, 1] },
        ];
        let g = Grammar::new(atoms, 2);
        assert_eq!(g.inspect(2), "'a' / 'b'");
    }

    #[test]
    fn inspect_repetition_wraps_alternative_child() {
        let atoms = vec![
            str_atom("a"),
            str_atom("b"),
            Atom::Alternative { atoms: vec![0, 1] },
            Atom::Repetition {
                atom: 2,
                min: 0,
                max: None,
                tag: RepetitionTag::Repetition,
            },
        ];
        let g = Grammar::new(atoms, 3);
        assert_eq!(g.inspect(3), "('a' / 'b'){0,}");
    }

    #[test]
    fn inspect_maybe_uses_question_mark() {
        let atoms = vec![
            str_atom("a"),
            Atom::Repetition {
                atom: 0,
                min: 0,
                max: Some(1),
                tag: RepetitionTag::Maybe,
            },
        ];
        let g = Grammar::new(atoms, 1);
        assert_eq!(g.inspect(1), "'a'?");
    }

    #[test]
    fn inspect_entity_uppercases_name() {
        let atoms = vec![
            str_atom("a"),
            Atom::Entity {
                name: "digit".to_string(),
                atom: 0,
            },
        ];
        let g = Grammar::new(atoms, 1);
        assert_eq!(g.inspect(1), "DIGIT");
    }
}
