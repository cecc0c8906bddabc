//! End-to-end glue: source text -> tokens -> CST -> AST -> bytecode -> VM.
//!
//! Grounded in `original_source/src/main.cpp`'s driver, which wires the
//! lexer, parser, codegen and VM together behind a single entry point. The
//! script grammar's canonical collection and LALR(1) tables are built once
//! (they don't depend on the program being compiled) and cached behind a
//! [`OnceLock`], the same lazy-static-free idiom the teacher's CLI uses for
//! its one-shot grammar load.

use crate::ast::{self, Node};
use crate::bytecode::Value;
use crate::codegen::{CodeGen, CodegenMode};
use crate::error::Error;
use crate::grammar2::analysis;
use crate::lexer;
use crate::lr1::collection::Collection;
use crate::lr1::tables::{self, Tables};
use crate::runtime::parser::Parser;
use crate::script_grammar::{self, ScriptGrammar};
use crate::vm::Vm;
use std::sync::OnceLock;

struct Pipeline {
    script: ScriptGrammar,
    tables: Tables,
}

static PIPELINE: OnceLock<Pipeline> = OnceLock::new();

fn pipeline() -> &'static Pipeline {
    PIPELINE.get_or_init(|| {
        let script = script_grammar::build();
        let first = analysis::compute_first_sets(&script.grammar);
        let canonical = Collection::build(&script.grammar, &first);
        let lalr = canonical.to_lalr();
        let tables = tables::build_tables(&script.grammar, &lalr, &script.resolvers)
            .expect("script grammar must be LALR(1) with no unresolved conflicts");
        Pipeline { script, tables }
    })
}

/// Parses source text into a lowered, type-derived AST.
pub fn parse(src: &str) -> Result<Node, Error> {
    let tokens = lexer::tokenize(src)?;
    let p = pipeline();
    let parser = Parser::new(&p.script.grammar, &p.tables, &p.script.actions);
    let cst = parser.parse(&tokens)?;
    let mut node = ast::lower(cst);
    ast::derive_types(&mut node);
    Ok(node)
}

/// Compiles source text to bytecode, returning the code and the number of
/// global slots the VM needs to reserve.
pub fn compile(src: &str) -> Result<(Vec<u8>, usize), Error> {
    let node = parse(src)?;
    let mut cg = CodeGen::new(CodegenMode::Binary);
    cg.generate(&node)?;
    let global_slots = cg.global_slot_count();
    let code = cg.finish()?;
    Ok((code, global_slots))
}

/// Compiles and runs source text, returning the value left on top of the
/// VM's stack, if any (an empty program, or one ending in a declaration,
/// leaves nothing).
pub fn run(src: &str) -> Result<Option<Value>, Error> {
    let (code, global_slots) = compile(src)?;
    let mut vm = Vm::new(code, global_slots);
    vm.run()?;
    Ok(vm.top().cloned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_operator_precedence_and_grouping() {
        let v = run("(2*3 + (5+4) * (1+2)) * 5+12;").unwrap();
        assert_eq!(v, Some(Value::Int(177)));
    }

    #[test]
    fn runs_left_associative_addition_chain() {
        let v = run("1+2+3+4+5;").unwrap();
        assert_eq!(v, Some(Value::Int(15)));
    }

    #[test]
    fn runs_right_associative_power_chain() {
        let v = run("2^3^2;").unwrap();
        assert_eq!(v, Some(Value::Int(512)));
    }

    #[test]
    fn runs_function_call() {
        let v = run("func sq(x) { return x*x; } sq(7);").unwrap();
        assert_eq!(v, Some(Value::Int(49)));
    }

    #[test]
    fn runs_loop_to_completion() {
        let v = run("a = 0; loop(a < 5) { a = a + 1; } a;").unwrap();
        assert_eq!(v, Some(Value::Int(5)));
    }

    #[test]
    fn runs_if_else_branch_selection() {
        let v = run("if (3 > 2) { 1; } else { 0; }").unwrap();
        assert_eq!(v, Some(Value::Int(1)));
    }
}
