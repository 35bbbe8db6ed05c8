//! Parsalex - a small PEG parser combinator library
//!
//! Parsalex builds parsers out of a handful of composable atoms (literal
//! strings, single-character patterns, sequences, alternatives,
//! repetitions, lookahead, named captures, and lazily-resolved rules),
//! interprets them against an input string with backtracking, and folds
//! the raw match tree into a structured result via a small set of
//! flattening rules.
//!
//! ## Quick start
//!
//! ```rust
//! use parsalex::dsl::*;
//!
//! let grammar = GrammarBuilder::new()
//!     .rule("greeting", str("hello").then(str(" ")).then(str("world")))
//!     .build();
//!
//! let value = grammar.parse("hello world").unwrap();
//! assert_eq!(value.as_str(), Some("hello world"));
//! ```
//!
//! ## Named captures and repetition
//!
//! ```rust
//! use parsalex::dsl::*;
//!
//! let grammar = GrammarBuilder::new()
//!     .rule(
//!         "pair",
//!         str("a").label("x").then(str("b").label("y")),
//!     )
//!     .build();
//!
//! let value = grammar.parse("ab").unwrap();
//! assert_eq!(value.get("x").and_then(|v| v.as_str()), Some("a"));
//! assert_eq!(value.get("y").and_then(|v| v.as_str()), Some("b"));
//! ```
//!
//! ## Feature flags
//!
//! - `logging` - emit `log::debug!` trace lines from the interpreter

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::all)]
#![allow(clippy::new_without_default)]
#![allow(clippy::module_inception)]

pub mod atom;
pub mod cursor;
pub mod debug;
pub mod dsl;
pub mod error;
pub mod interpreter;
pub mod regex_cache;
pub mod transform;
pub mod value;

pub use atom::{Atom, Grammar};
pub use cursor::Cursor;
pub use error::{ErrorBuilder, ParseError, SourcePosition, Span};
pub use interpreter::{Interpreter, ParserConfig};
pub use transform::{Transform, TransformError};
pub use value::{flatten, ListTag, RawValue, Value};
