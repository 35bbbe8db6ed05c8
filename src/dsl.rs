//! Grammar construction DSL
//!
//! Builds a [`Grammar`] out of small combinator values rather than by
//! hand-assembling an [`Atom`] arena. Each combinator implements
//! [`Parslet`], which knows how to push itself (and its children) into a
//! [`GrammarBuilder`] and return the index it landed at.
//!
//! ```rust
//! use parsalex::dsl::*;
//!
//! let grammar = GrammarBuilder::new()
//!     .rule("greeting", str("hello").then(str(" ")).then(str("world")))
//!     .build();
//!
//! assert_eq!(grammar.parse("hello world").unwrap().as_str(), Some("hello world"));
//! ```

use hashbrown::HashMap;

use crate::atom::{Atom, Grammar, RepetitionTag};

/// Something that can push itself into a [`GrammarBuilder`]'s atom
/// arena and report back the index it occupies.
///
/// Implemented by every combinator in this module; user code rarely
/// implements it directly, composing instead via the free functions
/// (`str`, `re`, `rule_ref`, ...) and the default methods below.
pub trait Parslet: Sized {
    /// Push this parslet (and any children) into `builder`'s arena.
    fn build(self, builder: &mut GrammarBuilder) -> usize;

    /// Sequence this parslet followed by `other`.
    ///
    /// Chained calls flatten: `a.then(b).then(c)` builds one
    /// `Sequence` atom with three children, not a `Sequence` nested
    /// inside a `Sequence`.
    fn then<P: Parslet>(self, other: P) -> Sequence2<Self, P> {
        Sequence2(self, other)
    }

    /// Try this parslet, falling back to `other` on failure.
    fn or<P: Parslet>(self, other: P) -> Alternative2<Self, P> {
        Alternative2(self, other)
    }

    /// Wrap this parslet's value under a mapping key.
    fn label(self, name: impl Into<String>) -> Named<Self> {
        Named {
            name: name.into(),
            inner: self,
        }
    }

    /// Match this parslet `min..=max` times, greedily. `max = None` is
    /// unbounded.
    fn repeat(self, min: usize, max: Option<usize>) -> Repeat<Self> {
        Repeat {
            inner: self,
            min,
            max,
            tag: RepetitionTag::Repetition,
        }
    }

    /// Zero or more.
    fn many(self) -> Repeat<Self> {
        self.repeat(0, None)
    }

    /// One or more.
    fn many1(self) -> Repeat<Self> {
        self.repeat(1, None)
    }

    /// Zero or one, unwrapped on flatten rather than collapsed to a
    /// string/list.
    fn maybe(self) -> Repeat<Self> {
        Repeat {
            inner: self,
            min: 0,
            max: Some(1),
            tag: RepetitionTag::Maybe,
        }
    }

    /// Positive lookahead: assert a match without consuming input.
    fn present(self) -> Lookahead<Self> {
        Lookahead {
            inner: self,
            positive: true,
        }
    }

    /// Negative lookahead: assert the absence of a match.
    fn absent(self) -> Lookahead<Self> {
        Lookahead {
            inner: self,
            positive: false,
        }
    }
}

/// Builds a [`Grammar`] out of named rules, resolving rule references
/// (including recursive and forward ones) once every rule has been
/// registered.
///
/// `Entity` is conceptually a lazy thunk resolved on first
/// use; here resolution happens once, at `build()` time, by patching
/// every [`rule_ref`] placeholder to the atom its named rule ended up
/// at. By the time a [`Grammar`] exists, every `Entity` already points
/// at a concrete index and the interpreter never needs to care whether
/// a rule was defined before or after the place that referenced it.
pub struct GrammarBuilder {
    atoms: Vec<Atom>,
    rules: HashMap<String, usize>,
    forward_refs: Vec<(usize, String)>,
    first_rule: Option<usize>,
}

impl GrammarBuilder {
    /// An empty builder with no rules yet.
    pub fn new() -> Self {
        Self {
            atoms: Vec::new(),
            rules: HashMap::new(),
            forward_refs: Vec::new(),
            first_rule: None,
        }
    }

    /// Push an atom into the arena, returning its index.
    pub fn push(&mut self, atom: Atom) -> usize {
        self.atoms.push(atom);
        self.atoms.len() - 1
    }

    /// Register a named rule. The first rule registered becomes the
    /// grammar's root.
    pub fn rule<P: Parslet>(mut self, name: impl Into<String>, parslet: P) -> Self {
        let name = name.into();
        let body = parslet.build(&mut self);
        let entity = self.push(Atom::Entity {
            name: name.clone(),
            atom: body,
        });
        if self.first_rule.is_none() {
            self.first_rule = Some(entity);
        }
        self.rules.insert(name, entity);
        self
    }

    fn reference(&mut self, name: String) -> usize {
        let idx = self.push(Atom::Entity {
            name: name.clone(),
            atom: usize::MAX,
        });
        self.forward_refs.push((idx, name));
        idx
    }

    /// Finish building, patching every rule reference to its resolved
    /// body and fixing the root atom.
    ///
    /// Panics if a [`rule_ref`] names a rule that was never registered,
    /// or if no rule was ever registered at all — both are grammar
    /// construction bugs, not parse failures.
    pub fn build(self) -> Grammar {
        let GrammarBuilder {
            mut atoms,
            rules,
            forward_refs,
            first_rule,
        } = self;

        for (idx, name) in forward_refs {
            let target = *rules
                .get(&name)
                .unwrap_or_else(|| panic!("rule_ref to undefined rule \"{}\"", name));
            if let Atom::Entity { atom, .. } = &mut atoms[idx] {
                *atom = target;
            }
        }

        let root = first_rule.expect("a grammar needs at least one rule");
        Grammar::new(atoms, root)
    }
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Match a literal string exactly.
pub struct Str(String);

impl Parslet for Str {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        builder.push(Atom::Str { pattern: self.0 })
    }
}

/// `str(s)`: match the literal text `s`.
pub fn str(s: impl Into<String>) -> Str {
    Str(s.into())
}

/// Match one character against a single-character regex fragment.
pub struct Re(String);

impl Parslet for Re {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        builder.push(Atom::Re { pattern: self.0 })
    }
}

/// `re(pattern)`: match one character satisfying `pattern`, a
/// single-character regex fragment (e.g. `"[a-z]"`, `"\\d"`).
pub fn re(pattern: impl Into<String>) -> Re {
    Re(pattern.into())
}

/// Match any single character.
pub struct Any;

impl Parslet for Any {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        builder.push(Atom::Re {
            pattern: ".".to_string(),
        })
    }
}

/// `any()`: match any single character (including newline).
pub fn any() -> Any {
    Any
}

/// A reference to a named rule, resolved when [`GrammarBuilder::build`]
/// runs.
pub struct Ref(String);

impl Parslet for Ref {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        builder.reference(self.0)
    }
}

/// `rule_ref(name)`: refer to a rule that may be defined before or
/// after this point, including itself (direct or mutual recursion).
pub fn rule_ref(name: impl Into<String>) -> Ref {
    Ref(name.into())
}

/// Two parslets in sequence, flattening if either side is itself a
/// sequence so chains build one `Sequence` atom rather than nested ones.
pub struct Sequence2<A, B>(A, B);

impl<A: Parslet, B: Parslet> Parslet for Sequence2<A, B> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let left = self.0.build(builder);
        let right = self.1.build(builder);
        let mut children = Vec::new();
        flatten_into(builder, left, &mut children, is_sequence);
        flatten_into(builder, right, &mut children, is_sequence);
        builder.push(Atom::Sequence { atoms: children })
    }
}

/// Two parslets as alternatives, flattening nested alternatives the
/// same way [`Sequence2`] flattens nested sequences.
pub struct Alternative2<A, B>(A, B);

impl<A: Parslet, B: Parslet> Parslet for Alternative2<A, B> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let left = self.0.build(builder);
        let right = self.1.build(builder);
        let mut children = Vec::new();
        flatten_into(builder, left, &mut children, is_alternative);
        flatten_into(builder, right, &mut children, is_alternative);
        builder.push(Atom::Alternative { atoms: children })
    }
}

fn is_sequence(atom: &Atom) -> Option<&[usize]> {
    match atom {
        Atom::Sequence { atoms } => Some(atoms),
        _ => None,
    }
}

fn is_alternative(atom: &Atom) -> Option<&[usize]> {
    match atom {
        Atom::Alternative { atoms } => Some(atoms),
        _ => None,
    }
}

fn flatten_into(
    builder: &GrammarBuilder,
    idx: usize,
    out: &mut Vec<usize>,
    same_kind: fn(&Atom) -> Option<&[usize]>,
) {
    match same_kind(&builder.atoms[idx]) {
        Some(children) => out.extend_from_slice(children),
        None => out.push(idx),
    }
}

/// An arbitrary-arity sequence, for grammars where chaining `.then()`
/// by hand is awkward (e.g. a rule with many fixed fields).
pub struct Sequence<P>(Vec<P>);

impl<P: Parslet> Parslet for Sequence<P> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let children = self.0.into_iter().map(|p| p.build(builder)).collect();
        builder.push(Atom::Sequence { atoms: children })
    }
}

/// `seq([a, b, c])`: match every parslet in order.
pub fn seq<P: Parslet>(parslets: Vec<P>) -> Sequence<P> {
    Sequence(parslets)
}

/// An arbitrary-arity ordered choice.
pub struct Choice<P>(Vec<P>);

impl<P: Parslet> Parslet for Choice<P> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let children = self.0.into_iter().map(|p| p.build(builder)).collect();
        builder.push(Atom::Alternative { atoms: children })
    }
}

/// `choice([a, b, c])`: try each parslet in order, first success wins.
pub fn choice<P: Parslet>(parslets: Vec<P>) -> Choice<P> {
    Choice(parslets)
}

/// Wraps a parslet's value under a mapping key.
pub struct Named<P> {
    name: String,
    inner: P,
}

impl<P: Parslet> Parslet for Named<P> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let child = self.inner.build(builder);
        builder.push(Atom::Named {
            name: self.name,
            atom: child,
        })
    }
}

/// Repeats a parslet `min..=max` times.
pub struct Repeat<P> {
    inner: P,
    min: usize,
    max: Option<usize>,
    tag: RepetitionTag,
}

impl<P: Parslet> Parslet for Repeat<P> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let child = self.inner.build(builder);
        builder.push(Atom::Repetition {
            atom: child,
            min: self.min,
            max: self.max,
            tag: self.tag,
        })
    }
}

/// Asserts presence or absence of a parslet's match without consuming.
pub struct Lookahead<P> {
    inner: P,
    positive: bool,
}

impl<P: Parslet> Parslet for Lookahead<P> {
    fn build(self, builder: &mut GrammarBuilder) -> usize {
        let child = self.inner.build(builder);
        builder.push(Atom::Lookahead {
            atom: child,
            positive: self.positive,
        })
    }
}

/// Build a grammar from `(rule_name, parslet)` pairs in one call,
/// rather than chaining `.rule(...)` repeatedly.
///
/// ```rust
/// use parsalex::dsl::*;
///
/// let grammar = grammar! {
///     "word" => re("[a-z]").many1(),
/// };
/// assert_eq!(grammar.parse("abc").unwrap().as_str(), Some("abc"));
/// ```
#[macro_export]
macro_rules! grammar {
    ($($name:expr => $parslet:expr),+ $(,)?) => {{
        let mut builder = $crate::dsl::GrammarBuilder::new();
        $(builder = builder.rule($name, $parslet);)+
        builder.build()
    }};
}

#[doc(inline)]
pub use crate::grammar;
