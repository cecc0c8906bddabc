//! Error types for the grammar/codegen/VM pipeline.
//!
//! The legacy single-character grammar tools (`grammar`, `ll1`, `slr1`,
//! `first_follow`) keep using [`GrammarError`] unchanged. Everything built
//! on top of the general LR(1) engine and the script-language pipeline uses
//! [`Error`], one variant family per pipeline stage.

use thiserror::Error;

/// Errors that can occur during legacy grammar parsing and analysis.
#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("Invalid grammar format: {0}")]
    InvalidFormat(String),

    #[error("Invalid production format: {0}")]
    InvalidProduction(String),

    #[error("Empty grammar input")]
    EmptyInput,

    #[error("Not enough production lines: expected {expected}, got {actual}")]
    NotEnoughProductions { expected: usize, actual: usize },

    #[error("LL(1) conflict at M[{nonterminal}, {terminal}]:\n  {prod1}\n  {prod2}")]
    LL1Conflict {
        nonterminal: String,
        terminal: String,
        prod1: String,
        prod2: String,
    },

    #[error("SLR(1) Shift/Reduce conflict at state {state}, symbol {symbol}")]
    SLR1ShiftReduceConflict { state: usize, symbol: String },

    #[error(
        "SLR(1) Reduce/Reduce conflict at state {state}, symbol {symbol}:\n  {prod1}\n  {prod2}"
    )]
    SLR1ReduceReduceConflict {
        state: usize,
        symbol: String,
        prod1: String,
        prod2: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Type alias for Results in the legacy grammar tools.
pub type Result<T> = std::result::Result<T, GrammarError>;

/// Crate-wide error for the LR(1)/codegen/VM pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error("grammar error: {0}")]
    Grammar(String),

    #[error(
        "{kind} conflict in state {state}: lookback {lookback}, lookahead {lookahead}, candidates: {candidates:?}"
    )]
    Conflict {
        kind: &'static str,
        state: usize,
        lookback: String,
        lookahead: String,
        candidates: Vec<String>,
    },

    #[error("parse error at token {index} ({token}): {message}")]
    Parse {
        index: usize,
        token: String,
        message: String,
    },

    #[error("type error at node {node} (line {line}): {message}")]
    Type {
        node: usize,
        line: u32,
        message: String,
    },

    #[error("codegen error at node {node} (line {line}): {message}")]
    Codegen {
        node: usize,
        line: u32,
        message: String,
    },

    #[error("vm error at ip={ip} ({opcode}): {message}")]
    Vm {
        ip: i32,
        opcode: String,
        message: String,
    },

    #[error("lexer error at line {line}: {message}")]
    Lexer { line: u32, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for Results in the LR(1)/codegen/VM pipeline.
pub type PipelineResult<T> = std::result::Result<T, Error>;
