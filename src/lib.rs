//! An interactive interpreter for a small Scheme dialect.
//!
//! One balanced expression per turn: the lexer races its token parsers
//! over the input, the reader materializes a graph of atoms and pairs
//! in the heap, the evaluator runs it against the persistent global
//! environment, and a mark-and-sweep pass reclaims whatever the turn
//! left unreachable before the next prompt.

pub mod builtins;
pub mod error;
pub mod heap;
pub mod intern;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod scope;
pub mod token;
pub mod value;

pub use error::Error;
pub use interpreter::Interpreter;
