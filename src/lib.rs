//! LR(1)/LALR(1)/SLR(1) Parser Generator, Code Generator and Bytecode VM
//!
//! A general bottom-up parser-generator engine (`grammar2`, `lr1`) drives a
//! concrete small imperative scripting language: a hand-written lexer
//! (`lexer`), a grammar for the language built on the engine
//! (`script_grammar`), a table-driven parser runtime (`runtime`), CST-to-AST
//! lowering and type derivation (`ast`), an AST-walking bytecode code
//! generator (`codegen`, `symtab`, `bytecode`), and a stack-based bytecode VM
//! (`vm`). `pipeline` wires source text through all of the above.
//!
//! The original LL(1)/SLR(1) single-character-alphabet grammar tools this
//! crate grew from (`grammar`, `first_follow`, `ll1`, `slr1`, `symbol`) are
//! kept as a standalone peripheral, reachable through the `legacy` CLI
//! subcommand.
//!
//! # Author
//! Juan Manuel Young Hoyos
//!
//! # References
//! Aho, Alfred V. et al. "Compilers: Principles, Techniques, and Tools" (2nd Edition).
//! Addison-Wesley, 2006.

pub mod cli;
pub mod error;
pub mod first_follow;
pub mod grammar;
pub mod ll1;
pub mod slr1;
pub mod symbol;

pub mod ast;
pub mod bytecode;
pub mod codegen;
pub mod grammar2;
pub mod lexer;
pub mod lr1;
pub mod pipeline;
pub mod runtime;
pub mod script_grammar;
pub mod symtab;
pub mod vm;

// Re-export commonly used types
pub use error::{Error, GrammarError, PipelineResult};
pub use grammar::{Grammar, Production};
pub use ll1::LL1Parser;
pub use slr1::SLR1Parser;
pub use symbol::Symbol;
