//! Developer tooling: parse tracing and tree pretty-printing
//!
//! Not part of the atom algebra or the flattener — this module exists
//! purely to make grammars easier to debug while writing them: a trace
//! of which atoms were entered and exited during a parse, and a
//! pretty-printer for the flattened [`Value`] tree a parse produces.

use crate::atom::Grammar;
use crate::value::Value;

/// One step of a recorded parse: an atom being entered or exited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    /// `apply` was called for `atom` at cursor position `pos`.
    Enter {
        /// Index of the atom being applied.
        atom: usize,
        /// Cursor position on entry.
        pos: usize,
    },
    /// `apply` for `atom` returned, having left the cursor at `pos`.
    Exit {
        /// Index of the atom that returned.
        atom: usize,
        /// Cursor position on exit (equal to the matching `Enter`'s
        /// `pos` when `success` is `false`).
        pos: usize,
        /// Whether the atom matched.
        success: bool,
    },
}

/// A flat log of [`TraceEvent`]s collected during one parse.
///
/// Opt-in: an [`crate::interpreter::Interpreter`] only records events
/// when built via `Interpreter::new_with_trace`, so ordinary parses pay
/// nothing for this.
#[derive(Debug, Clone, Default)]
pub struct ParseTrace {
    events: Vec<TraceEvent>,
}

impl ParseTrace {
    /// An empty trace.
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Append an event.
    pub fn record(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    /// The recorded events, in the order they occurred.
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    /// Render the trace as indented `Enter`/`Exit` lines, printing each
    /// atom's PEG-like form from `grammar`.
    pub fn format(&self, grammar: &Grammar) -> String {
        let mut out = String::new();
        let mut depth = 0usize;
        for event in &self.events {
            match event {
                TraceEvent::Enter { atom, pos } => {
                    out.push_str(&"  ".repeat(depth));
                    out.push_str(&format!("-> {} @{}\n", grammar.inspect(*atom), pos));
                    depth += 1;
                }
                TraceEvent::Exit { atom, pos, success } => {
                    depth = depth.saturating_sub(1);
                    out.push_str(&"  ".repeat(depth));
                    let mark = if *success { "ok" } else { "fail" };
                    out.push_str(&format!("<- {} @{} ({})\n", grammar.inspect(*atom), pos, mark));
                }
            }
        }
        out
    }
}

/// Pretty-prints a flattened [`Value`] tree with configurable
/// indentation and depth.
pub struct TreePrinter {
    indent_width: usize,
    max_depth: Option<usize>,
}

impl TreePrinter {
    /// A printer with two-space indentation and no depth limit.
    pub fn new() -> Self {
        Self {
            indent_width: 2,
            max_depth: None,
        }
    }

    /// Set the number of spaces per indentation level.
    pub fn indent_width(mut self, width: usize) -> Self {
        self.indent_width = width;
        self
    }

    /// Stop descending past `depth` levels, printing `...` instead.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Render `value` as an indented tree.
    pub fn print(&self, value: &Value) -> String {
        let mut out = String::new();
        self.print_node(value, 0, &mut out);
        out
    }

    fn print_node(&self, value: &Value, depth: usize, out: &mut String) {
        let pad = " ".repeat(depth * self.indent_width);
        if let Some(max) = self.max_depth {
            if depth > max {
                out.push_str(&pad);
                out.push_str("...\n");
                return;
            }
        }
        match value {
            Value::Nil => {
                out.push_str(&pad);
                out.push_str("nil\n");
            }
            Value::Str(s) => {
                out.push_str(&pad);
                out.push_str(&format!("{:?}\n", s));
            }
            Value::Mapping(fields) => {
                out.push_str(&pad);
                out.push_str("{\n");
                for (key, field) in fields {
                    out.push_str(&" ".repeat((depth + 1) * self.indent_width));
                    out.push_str(&format!("{}:\n", key));
                    self.print_node(field, depth + 2, out);
                }
                out.push_str(&pad);
                out.push_str("}\n");
            }
            Value::List(items) => {
                out.push_str(&pad);
                out.push_str("[\n");
                for item in items {
                    self.print_node(item, depth + 1, out);
                }
                out.push_str(&pad);
                out.push_str("]\n");
            }
        }
    }
}

impl Default for TreePrinter {
    fn default() -> Self {
        Self::new()
    }
}
