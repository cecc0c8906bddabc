//! Table-driven parsing runtime: everything needed to turn a token stream
//! plus a built [`crate::lr1::tables::Tables`] into a [`crate::ast::CstNode`].

pub mod parser;
