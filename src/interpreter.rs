//! The recursive-descent interpreter
//!
//! Evaluates a [`Grammar`]'s atoms against a [`Cursor`] with
//! backtracking. Every atom's match is a plain `Result`: failure is
//! signaled by returning `Err(())` after recording a formatted cause in
//! this interpreter's per-parse context, rather than by unwinding
//! through a non-local exception. The cursor-restore discipline is one
//! unconditional `seek` on the `Err` branch of the shared `apply`
//! wrapper, not something each kind-specific matcher has to remember.
//!
//! Per-atom failure state lives here, not on the atoms themselves, so a
//! `Grammar` stays immutable and shareable across concurrent parses;
//! each `parse` call gets its own `Interpreter`.

use crate::atom::{Atom, Grammar, RepetitionTag};
use crate::cursor::Cursor;
use crate::debug::{ParseTrace, TraceEvent};
use crate::error::{ParseError, Span};
use crate::regex_cache;
use crate::value::{flatten, ListTag, RawValue, Value};
use std::borrow::Cow;

#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}
#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

/// Runtime knobs for a single `parse` call.
///
/// Packrat memoization is out of scope for this interpreter, so the
/// only limits left worth exposing are ones that bound plain recursive
/// descent: a cap on input size and a cap on `Entity` recursion depth
/// (a stack-overflow guard, not a left-recursion detector — a grammar
/// that genuinely left-recurses will still hit this cap and fail with
/// a recursion-limit message rather than loop forever).
#[derive(Debug, Clone, Copy)]
pub struct ParserConfig {
    max_input_size: usize,
    max_recursion_depth: usize,
}

impl ParserConfig {
    /// Start from the default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the input size, in bytes, a `parse` call will accept.
    pub fn with_max_input_size(mut self, max_input_size: usize) -> Self {
        self.max_input_size = max_input_size;
        self
    }

    /// Cap how many nested `Entity` resolutions are allowed before a
    /// parse fails with a recursion-limit error.
    pub fn with_max_recursion_depth(mut self, max_recursion_depth: usize) -> Self {
        self.max_recursion_depth = max_recursion_depth;
        self
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_input_size: 16 * 1024 * 1024,
            max_recursion_depth: 512,
        }
    }
}

type MatchResult<'i> = Result<RawValue<'i>, ()>;

/// Evaluates one [`Grammar`] against one input. Holds the per-parse
/// cause/offending-child bookkeeping hoisted out of the atoms
/// themselves, so a `Grammar` stays immutable and shareable.
pub struct Interpreter<'g> {
    grammar: &'g Grammar,
    config: ParserConfig,
    causes: Vec<Option<(String, usize)>>,
    offending: Vec<Option<usize>>,
    depth: usize,
    trace: Option<ParseTrace>,
}

impl<'g> Interpreter<'g> {
    /// Build an interpreter for one grammar and one parse call.
    pub fn new(grammar: &'g Grammar, config: ParserConfig) -> Self {
        let n = grammar.atom_count();
        Self {
            grammar,
            config,
            causes: vec![None; n],
            offending: vec![None; n],
            depth: 0,
            trace: None,
        }
    }

    /// Build an interpreter that records an atom-level [`ParseTrace`]
    /// as it runs, retrievable afterwards via [`Interpreter::take_trace`].
    pub fn new_with_trace(grammar: &'g Grammar, config: ParserConfig) -> Self {
        let mut interpreter = Self::new(grammar, config);
        interpreter.trace = Some(ParseTrace::new());
        interpreter
    }

    /// Take the recorded trace, if this interpreter was built with one.
    pub fn take_trace(&mut self) -> Option<ParseTrace> {
        self.trace.take()
    }

    /// Parse `input` from start to end, returning the flattened result
    /// or a structured [`ParseError`].
    pub fn parse<'i>(&mut self, input: &'i str) -> Result<Value, ParseError> {
        if input.len() > self.config.max_input_size {
            return Err(ParseError::new(format!(
                "Input of {} bytes exceeds the configured maximum of {} bytes",
                input.len(),
                self.config.max_input_size
            )));
        }

        let root = self.grammar.root();
        let mut cursor = Cursor::new(input);
        log_debug!("parsing {} bytes against root atom {}", input.len(), root);

        match self.apply(root, &mut cursor) {
            Ok(raw) => {
                if !cursor.eof() {
                    return Err(self.unconsumed_input_error(root, &mut cursor, input));
                }
                Ok(flatten(&raw))
            }
            Err(()) => Err(self.build_error_tree(root, input)),
        }
    }

    fn unconsumed_input_error(&self, root: usize, cursor: &mut Cursor<'_>, input: &str) -> ParseError {
        if let Some((cause, pos)) = &self.causes[root] {
            ParseError::new(format!("Unconsumed input, maybe because of this: {}", cause))
                .with_span(Span::at_offset(input, *pos))
        } else {
            let pos = cursor.pos();
            let preview: String = cursor.remaining().chars().take(100).collect();
            ParseError::new(format!("Don't know what to do with \"{}\"", preview))
                .with_span(Span::at_offset(input, pos))
                .with_position_suffix()
        }
    }

    fn build_error_tree(&self, idx: usize, input: &str) -> ParseError {
        let (message, pos) = self.causes[idx]
            .clone()
            .unwrap_or_else(|| ("Failed to match".to_string(), 0));
        let mut node = ParseError::new(message).with_span(Span::at_offset(input, pos));

        match self.grammar.get(idx) {
            Atom::Sequence { .. } => {
                if let Some(child) = self.offending[idx] {
                    if self.causes[child].is_some() {
                        node = node.with_child(self.build_error_tree(child, input));
                    }
                }
            }
            Atom::Repetition { atom: child, .. } => {
                if self.causes[idx].is_none() && self.causes[*child].is_some() {
                    return self.build_error_tree(*child, input);
                }
            }
            Atom::Entity { atom: child, .. } => {
                if self.causes[idx].is_none() && self.causes[*child].is_some() {
                    return self.build_error_tree(*child, input);
                }
            }
            _ => {}
        }

        node
    }

    /// The save/restore wrapper every atom goes through: dispatch to the
    /// kind-specific matcher, clear this atom's cause on success,
    /// unconditionally restore the cursor on failure.
    fn apply<'i>(&mut self, idx: usize, cursor: &mut Cursor<'i>) -> MatchResult<'i> {
        let old = cursor.pos();
        if let Some(trace) = &mut self.trace {
            trace.record(TraceEvent::Enter { atom: idx, pos: old });
        }
        let result = match self.dispatch(idx, cursor) {
            Ok(value) => {
                self.causes[idx] = None;
                Ok(value)
            }
            Err(()) => {
                cursor.seek(old);
                Err(())
            }
        };
        if let Some(trace) = &mut self.trace {
            trace.record(TraceEvent::Exit {
                atom: idx,
                pos: cursor.pos(),
                success: result.is_ok(),
            });
        }
        result
    }

    fn dispatch<'i>(&mut self, idx: usize, cursor: &mut Cursor<'i>) -> MatchResult<'i> {
        match self.grammar.get(idx).clone() {
            Atom::Str { pattern } => self.match_str(idx, cursor, &pattern),
            Atom::Re { pattern } => self.match_re(idx, cursor, &pattern),
            Atom::Sequence { atoms } => self.match_sequence(idx, cursor, &atoms),
            Atom::Alternative { atoms } => self.match_alternative(idx, cursor, &atoms),
            Atom::Repetition {
                atom: child,
                min,
                max,
                tag,
            } => self.match_repetition(idx, cursor, child, min, max, tag),
            Atom::Lookahead {
                atom: child,
                positive,
            } => self.match_lookahead(idx, cursor, child, positive),
            Atom::Named { name, atom: child } => self.match_named(idx, cursor, &name, child),
            Atom::Entity { name, atom: child } => self.match_entity(idx, cursor, &name, child),
        }
    }

    fn fail(&mut self, idx: usize, input: &str, pos: usize, message: String) {
        let located = ParseError::new(message)
            .with_span(Span::at_offset(input, pos))
            .with_position_suffix()
            .message;
        self.causes[idx] = Some((located, pos));
    }

    fn match_str<'i>(&mut self, idx: usize, cursor: &mut Cursor<'i>, pattern: &str) -> MatchResult<'i> {
        let input = cursor.input();
        let start = cursor.pos();
        let want = pattern.chars().count();
        let got = cursor.read(want);

        if got.chars().count() < want {
            self.fail(idx, input, start, "Premature end of input".to_string());
            return Err(());
        }
        if got != pattern {
            self.fail(
                idx,
                input,
                start,
                format!("Expected \"{}\", but got \"{}\"", pattern, got),
            );
            return Err(());
        }
        Ok(RawValue::Str(Cow::Borrowed(got)))
    }

    fn match_re<'i>(&mut self, idx: usize, cursor: &mut Cursor<'i>, pattern: &str) -> MatchResult<'i> {
        let input = cursor.input();
        let start = cursor.pos();
        match cursor.peek_char() {
            None => {
                self.fail(idx, input, start, "Premature end of input".to_string());
                Err(())
            }
            Some(ch) => {
                if regex_cache::matches_char(pattern, ch) {
                    let matched = cursor.read(1);
                    Ok(RawValue::Str(Cow::Borrowed(matched)))
                } else {
                    self.fail(idx, input, start, format!("Failed to match {}", pattern));
                    Err(())
                }
            }
        }
    }

    fn match_sequence<'i>(&mut self, idx: usize, cursor: &mut Cursor<'i>, atoms: &[usize]) -> MatchResult<'i> {
        let input = cursor.input();
        let start = cursor.pos();
        let mut values = Vec::with_capacity(atoms.len());

        for &child in atoms {
            self.offending[idx] = Some(child);
            match self.apply(child, cursor) {
                Ok(v) => values.push(v),
                Err(()) => {
                    cursor.seek(start);
                    let printed = self.grammar.inspect(idx);
                    self.fail(idx, input, start, format!("Failed to match sequence ({})", printed));
                    return Err(());
                }
            }
        }
        Ok(RawValue::List(ListTag::Sequence, values))
    }

    fn match_alternative<'i>(&mut self, idx: usize, cursor: &mut Cursor<'i>, atoms: &[usize]) -> MatchResult<'i> {
        let input = cursor.input();
        let start = cursor.pos();

        for &child in atoms {
            match self.apply(child, cursor) {
                Ok(v) => return Ok(v),
                Err(()) => continue,
            }
        }
        let printed = self.grammar.inspect(idx);
        self.fail(idx, input, start, format!("Expected one of {}", printed));
        Err(())
    }

    fn match_repetition<'i>(
        &mut self,
        idx: usize,
        cursor: &mut Cursor<'i>,
        child: usize,
        min: usize,
        max: Option<usize>,
        tag: RepetitionTag,
    ) -> MatchResult<'i> {
        let input = cursor.input();
        let start = cursor.pos();
        let mut values = Vec::new();
        let mut occ = 0usize;

        loop {
            if let Some(max) = max {
                if occ >= max {
                    break;
                }
            }
            match self.apply(child, cursor) {
                Ok(v) => {
                    values.push(v);
                    occ += 1;
                }
                Err(()) => break,
            }
        }

        if occ < min {
            let printed = self.grammar.inspect(child);
            self.fail(idx, input, start, format!("Expected at least {} of {}", min, printed));
            return Err(());
        }

        let list_tag = match tag {
            RepetitionTag::Repetition => ListTag::Repetition,
            RepetitionTag::Maybe => ListTag::Maybe,
        };
        Ok(RawValue::List(list_tag, values))
    }

    fn match_lookahead<'i>(
        &mut self,
        idx: usize,
        cursor: &mut Cursor<'i>,
        child: usize,
        positive: bool,
    ) -> MatchResult<'i> {
        let input = cursor.input();
        let start = cursor.pos();
        let result = self.apply(child, cursor);
        cursor.seek(start);

        match (positive, result) {
            (true, Ok(_)) => Ok(RawValue::Nil),
            (false, Err(())) => Ok(RawValue::Nil),
            (true, Err(())) => {
                let printed = self.grammar.inspect(child);
                self.fail(idx, input, start, format!("Expected {}", printed));
                Err(())
            }
            (false, Ok(_)) => {
                let printed = self.grammar.inspect(child);
                self.fail(idx, input, start, format!("Did not expect {}", printed));
                Err(())
            }
        }
    }

    fn match_named<'i>(&mut self, idx: usize, cursor: &mut Cursor<'i>, name: &str, child: usize) -> MatchResult<'i> {
        match self.apply(child, cursor) {
            Ok(value) => Ok(RawValue::Mapping(name.to_string(), Box::new(value))),
            Err(()) => {
                // Forward the child's cause: `Named` has no failure mode
                // of its own, but `build_error_tree` needs a cause at
                // this index to attach a deeper subtree when `Named` is
                // the offending child of an enclosing `Sequence`.
                self.causes[idx] = self.causes[child].clone();
                Err(())
            }
        }
    }

    fn match_entity<'i>(&mut self, idx: usize, cursor: &mut Cursor<'i>, name: &str, child: usize) -> MatchResult<'i> {
        let input = cursor.input();
        let start = cursor.pos();
        self.depth += 1;
        if self.depth > self.config.max_recursion_depth {
            self.depth -= 1;
            self.fail(idx, input, start, format!("Recursion limit exceeded in rule {}", name));
            return Err(());
        }
        log_debug!("entering rule {} at depth {}", name, self.depth);
        let result = self.apply(child, cursor);
        self.depth -= 1;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::Atom;

    fn str_atom(s: &str) -> Atom {
        Atom::Str {
            pattern: s.to_string(),
        }
    }

    #[test]
    fn str_matches_exact_literal() {
        let g = Grammar::new(vec![str_atom("foo")], 0);
        let value = g.parse("foo").unwrap();
        assert_eq!(value.as_str(), Some("foo"));
    }

    #[test]
    fn str_reports_premature_end_of_input() {
        let g = Grammar::new(vec![str_atom("foo")], 0);
        let err = g.parse("fo").unwrap_err();
        assert!(err.message.starts_with("Premature end of input"));
    }

    #[test]
    fn alternative_left_bias() {
        let atoms = vec![str_atom("a"), str_atom("b"), Atom::Alternative { atoms: vec![0, 1] }];
        let g = Grammar::new(atoms, 2);
        assert_eq!(g.parse("b").unwrap().as_str(), Some("b"));
        let err = g.parse("c").unwrap_err();
        assert!(err.message.starts_with("Expected one of"));
    }

    #[test]
    fn repetition_bounds_enforced() {
        let atoms = vec![
            str_atom("a"),
            Atom::Repetition {
                atom: 0,
                min: 2,
                max: Some(3),
                tag: RepetitionTag::Repetition,
            },
        ];
        let g = Grammar::new(atoms, 1);
        assert_eq!(g.parse("aaa").unwrap().as_str(), Some("aaa"));
        let err = g.parse("a").unwrap_err();
        assert!(err.message.starts_with("Expected at least 2 of 'a'"));
        let err = g.parse("aaaa").unwrap_err();
        assert!(err.message.starts_with("Don't know what to do with"));
    }

    #[test]
    fn named_field_builds_mapping() {
        let atoms = vec![
            str_atom("a"),
            str_atom("b"),
            Atom::Named { name: "x".to_string(), atom: 0 },
            Atom::Named { name: "y".to_string(), atom: 1 },
            Atom::Sequence { atoms: vec![2, 3] },
        ];
        let g = Grammar::new(atoms, 4);
        let value = g.parse("ab").unwrap();
        assert_eq!(value.get("x").and_then(|v| v.as_str()), Some("a"));
        assert_eq!(value.get("y").and_then(|v| v.as_str()), Some("b"));
    }

    #[test]
    fn lookahead_does_not_consume() {
        let atoms = vec![
            str_atom("a"),
            Atom::Lookahead { atom: 0, positive: true },
            str_atom("a"),
            Atom::Sequence { atoms: vec![1, 2] },
        ];
        let g = Grammar::new(atoms, 3);
        assert_eq!(g.parse("a").unwrap().as_str(), Some("a"));
    }

    #[test]
    fn negative_lookahead_blocks_match() {
        let atoms = vec![
            str_atom("\""),
            Atom::Lookahead { atom: 0, positive: false },
        ];
        let g = Grammar::new(atoms, 1);
        assert!(g.parse("\"").is_err());
        assert!(g.parse("").is_ok());
    }

    #[test]
    fn recursion_limit_guards_self_referential_entity() {
        // Entity 1 refers to itself (index 1) with nothing to stop
        // recursion — this should hit the depth guard rather than
        // overflow the stack.
        let atoms = vec![Atom::Entity {
            name: "loop".to_string(),
            atom: 0,
        }];
        let g = Grammar::new(atoms, 0);
        let config = ParserConfig::new().with_max_recursion_depth(8);
        let err = g.parse_with_config("x", config).unwrap_err();
        assert!(err.message.contains("Recursion limit exceeded"));
    }
}
