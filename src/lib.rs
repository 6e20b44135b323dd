//! tcposc - a source-to-source compiler for TinyCoPoOS
//!
//! TinyCoPoOS is a small extension of C with cooperative-task keywords
//! (`task`, `queue for`, `poll`, `at most`, `every … start`, `timer`).
//! This crate parses the dialect and compiles task functions into plain C
//! step functions driving a cooperative scheduler.
//!
//! The pipeline:
//!
//! 1. A generic back-tracking recursive-descent parser with packrat
//!    memoization ([`parser`]), driven by an in-memory grammar ([`grammar`]).
//! 2. The concrete grammar for the extended C dialect ([`c_grammar`],
//!    with the token grammars in [`tokens`]).
//! 3. An arena-allocated AST ([`ast`], [`arena`]) with interned
//!    identifiers ([`intern`]).
//! 4. The task transformation ([`compile`]): promoted locals, step
//!    discovery, and body rewriting into scheduler calls.
//! 5. A format-string-driven unparser ([`unparse`]).
//!
//! # Example
//!
//! ```
//! use tcposc::{Arena, Interner, Parser, c_grammar::c_grammar};
//!
//! let mut interner = Interner::new();
//! let grammar = c_grammar(&mut interner);
//! let mut arena = Arena::new();
//! let mut parser = Parser::new(&grammar, b"a*b+c", &mut arena, &mut interner);
//! let expr = parser.parse("expr").unwrap();
//! assert!(arena.tree_is(expr, "add"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod arena;
pub mod ast;
pub mod c_grammar;
pub mod cache;
pub mod char_set;
pub mod compile;
pub mod error;
pub mod grammar;
mod hooks;
pub mod intern;
pub mod parser;
pub mod sink;
pub mod text;
pub mod tokens;
pub mod unparse;

pub use arena::Arena;
pub use ast::{Node, NodeId, Value};
pub use char_set::CharSet;
pub use compile::compile;
pub use error::ParseError;
pub use grammar::{Grammar, GrammarBuilder};
pub use intern::{Interner, Name};
pub use parser::Parser;
pub use sink::{FileSink, FixedSink, Sink};
pub use text::{TextBuffer, TextPos};
pub use unparse::Unparser;
