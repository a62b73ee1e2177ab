//! Script source front end for the reference engine
//!
//! A small Lua-flavoured language: global function definitions, locals,
//! assignment, `if`/`elseif`/`else`, `return`, calls and arithmetic,
//! string and comparison operators.

pub mod ast;
mod lexer;
mod parser;

pub use lexer::{LexError, Lexer, Spanned, Token};
pub use parser::{parse, ParseError};
