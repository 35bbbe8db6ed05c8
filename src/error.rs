//! Error reporting
//!
//! Line/column formatting, and a tree-structured [`ParseError`] that lets
//! callers walk down to the atom that was actually responsible for a
//! failed parse, not just the top-level message.

use std::fmt;

/// A position in the source input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    /// Byte offset from the start of input.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based, character-counted column number.
    pub column: usize,
}

impl SourcePosition {
    /// Position at the very start of input.
    #[inline]
    pub fn start() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    /// Compute the line/column for a byte offset into `input`.
    pub fn from_offset(input: &str, offset: usize) -> Self {
        let offset = offset.min(input.len());
        let mut line = 1;
        let mut column = 1;
        let mut seen = 0;

        for c in input.chars() {
            if seen >= offset {
                break;
            }
            if c == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
            seen += c.len_utf8();
        }

        Self {
            offset,
            line,
            column,
        }
    }
}

impl Default for SourcePosition {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {} char {}", self.line, self.column)
    }
}

/// Convert a byte offset into `(line, column)`, both 1-based.
#[inline]
pub fn offset_to_line_col(input: &str, offset: usize) -> (usize, usize) {
    let pos = SourcePosition::from_offset(input, offset);
    (pos.line, pos.column)
}

/// A start/end range in the source input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Where the span begins.
    pub start: SourcePosition,
    /// Where the span ends (equal to `start` for a zero-length span).
    pub end: SourcePosition,
}

impl Span {
    /// A zero-length span at a single position.
    #[inline]
    pub fn at(offset: usize, line: usize, column: usize) -> Self {
        let pos = SourcePosition {
            offset,
            line,
            column,
        };
        Self {
            start: pos,
            end: pos,
        }
    }

    /// A zero-length span at a byte offset into `input`.
    pub fn at_offset(input: &str, offset: usize) -> Self {
        let pos = SourcePosition::from_offset(input, offset);
        Self {
            start: pos,
            end: pos,
        }
    }
}

/// A parse failure, carrying the deepest meaningful cause plus enough
/// structure (`children`) to walk the atoms that contributed to it.
///
/// This doubles as both a single "error cause" node and the root of an
/// error-tree aggregator (the tree of nodes reachable via `children`).
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Human-readable cause, already formatted with "at line L char C."
    /// when a position is known.
    pub message: String,
    /// Where in the input this failure was observed.
    pub span: Span,
    /// What rule/atom this failure occurred under, if named.
    pub context: Option<String>,
    /// Sub-causes, ordered from most to least specific is not enforced;
    /// callers interested in "the" cause should use [`ParseError::deepest`].
    pub children: Vec<ParseError>,
}

impl ParseError {
    /// Build a bare error with no span information (filled in by the
    /// interpreter before it escapes).
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: Span::default(),
            context: None,
            children: Vec::new(),
        }
    }

    /// Attach a span to this error, replacing any existing one.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Attach a context label (typically a rule name).
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Attach a child cause.
    pub fn with_child(mut self, child: ParseError) -> Self {
        self.children.push(child);
        self
    }

    /// The error furthest into the input among this error and its
    /// descendants — PEG's usual heuristic for "the real cause", since
    /// the alternative that got furthest before failing is normally the
    /// one the author meant to match.
    pub fn deepest(&self) -> &ParseError {
        match self
            .children
            .iter()
            .map(|c| c.deepest())
            .max_by_key(|c| c.span.start.offset)
        {
            Some(child) if child.span.start.offset > self.span.start.offset => child,
            _ => self,
        }
    }

    /// Render as an ASCII tree, deepest-first children last.
    pub fn to_tree(&self) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, "", true);
        out
    }

    fn write_tree(&self, out: &mut String, prefix: &str, last: bool) {
        let connector = if last { "`- " } else { "|- " };
        let child_prefix = if last { "   " } else { "|  " };

        out.push_str(prefix);
        out.push_str(connector);
        out.push_str(&self.message);
        if let Some(ctx) = &self.context {
            out.push_str(&format!(" (in {})", ctx));
        }
        out.push('\n');

        for (i, child) in self.children.iter().enumerate() {
            let is_last = i + 1 == self.children.len();
            child.write_tree(out, &format!("{}{}", prefix, child_prefix), is_last);
        }
    }

    /// Append `" at line L char C."` using this error's own span.
    pub fn with_position_suffix(mut self) -> Self {
        self.message = format!(
            "{} at line {} char {}.",
            self.message, self.span.start.line, self.span.start.column
        );
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Fluent builder for [`ParseError`], mirroring the construction style
/// used throughout the rest of this crate's public API.
pub struct ErrorBuilder {
    message: String,
    span: Span,
    context: Option<String>,
    children: Vec<ParseError>,
}

impl ErrorBuilder {
    /// Start building an error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span: Span::default(),
            context: None,
            children: Vec::new(),
        }
    }

    /// Set the span.
    pub fn span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Set a context label.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Attach a child cause.
    pub fn child(mut self, child: ParseError) -> Self {
        self.children.push(child);
        self
    }

    /// Finish building.
    pub fn build(self) -> ParseError {
        ParseError {
            message: self.message,
            span: self.span,
            context: self.context,
            children: self.children,
        }
    }
}
