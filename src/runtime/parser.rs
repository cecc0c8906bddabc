//! Table-driven shift-reduce parser.
//!
//! Drives [`Tables`] over a token stream, pushing shifted tokens and
//! reduced nonterminals onto a value stack of [`CstNode`]s the way a
//! generated yacc/bison parser's `$$`/`$N` value stack works — except the
//! "generated code" here is the semantic-action table itself rather than
//! emitted Rust source (see `crate::lr1::recursive_ascent`'s module doc for
//! why this crate doesn't emit Rust-from-Rust).

use crate::ast::CstNode;
use crate::error::Error;
use crate::grammar2::{Grammar2, Sym};
use crate::lexer::{Token, TokenKind};
use crate::lr1::tables::{Tables, ACCEPT_VAL};
use crate::script_grammar::{terminal_name_for_token, token_to_cst, SemanticAction};

pub struct Parser<'a> {
    grammar: &'a Grammar2,
    tables: &'a Tables,
    actions: &'a [SemanticAction],
}

impl<'a> Parser<'a> {
    pub fn new(grammar: &'a Grammar2, tables: &'a Tables, actions: &'a [SemanticAction]) -> Self {
        Self { grammar, tables, actions }
    }

    /// Parses a complete token stream (including the trailing
    /// [`TokenKind::End`]) into the single CST node the augmented start
    /// rule reduces to.
    pub fn parse(&self, tokens: &[Token]) -> Result<CstNode, Error> {
        let mut states: Vec<usize> = vec![0];
        let mut values: Vec<CstNode> = Vec::new();
        let mut i = 0usize;

        loop {
            let tok = tokens.get(i).ok_or_else(|| Error::Parse {
                index: i,
                token: "<eof>".to_string(),
                message: "token stream ended without a trailing End token".to_string(),
            })?;
            let term = self.token_sym(&tok.kind)?;
            let state = *states.last().expect("parser state stack is never empty");

            if let Some(to) = self.tables.shift_action(state, term) {
                values.push(token_to_cst(&tok.kind));
                states.push(to);
                i += 1;
                continue;
            }

            if let Some(code) = self.tables.reduce_action(state, term) {
                if code == ACCEPT_VAL {
                    return values.pop().ok_or_else(|| Error::Parse {
                        index: i,
                        token: format!("{:?}", tok.kind),
                        message: "parse value stack empty at accept".to_string(),
                    });
                }

                let rule_idx = code as usize;
                let rule = &self.grammar.rules[rule_idx];
                let n = rule.len();
                let drain_at = values.len() - n;
                let children: Vec<CstNode> = values.split_off(drain_at);
                states.truncate(states.len() - n);
                let result = (self.actions[rule.semantic_rule])(children);

                let from_state = *states.last().expect("parser state stack is never empty");
                let to = self.tables.goto(from_state, rule.lhs).ok_or_else(|| Error::Parse {
                    index: i,
                    token: format!("{:?}", tok.kind),
                    message: format!("no goto from state {from_state} on nonterminal {}", rule.lhs),
                })?;
                values.push(result);
                states.push(to);
                continue;
            }

            return Err(Error::Parse {
                index: i,
                token: format!("{:?}", tok.kind),
                message: format!("unexpected token at line {}", tok.line),
            });
        }
    }

    fn token_sym(&self, kind: &TokenKind) -> Result<Sym, Error> {
        if matches!(kind, TokenKind::End) {
            return Ok(Sym::End);
        }
        let name = terminal_name_for_token(kind);
        self.grammar.term_id(name).map(Sym::Terminal).ok_or_else(|| Error::Parse {
            index: 0,
            token: name.to_string(),
            message: "token maps to a terminal absent from the grammar".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast;
    use crate::grammar2::analysis;
    use crate::lr1::collection::Collection;
    use crate::lr1::tables::build_tables;
    use crate::script_grammar;

    #[test]
    fn parses_arithmetic_expression_statement() {
        let sg = script_grammar::build();
        let first = analysis::compute_first_sets(&sg.grammar);
        let canonical = Collection::build(&sg.grammar, &first);
        let lalr = canonical.to_lalr();
        let tables = build_tables(&sg.grammar, &lalr, &sg.resolvers).unwrap();

        let tokens = crate::lexer::tokenize("1+2*3;").unwrap();
        let parser = Parser::new(&sg.grammar, &tables, &sg.actions);
        let cst = parser.parse(&tokens).unwrap();
        let node = ast::lower(cst);
        match node.kind {
            ast::NodeKind::List(items) => assert_eq!(items.len(), 1),
            other => panic!("expected a single-statement program, got {other:?}"),
        }
    }

    #[test]
    fn rejects_malformed_input() {
        let sg = script_grammar::build();
        let first = analysis::compute_first_sets(&sg.grammar);
        let canonical = Collection::build(&sg.grammar, &first);
        let lalr = canonical.to_lalr();
        let tables = build_tables(&sg.grammar, &lalr, &sg.resolvers).unwrap();

        let tokens = crate::lexer::tokenize("1 +;").unwrap();
        let parser = Parser::new(&sg.grammar, &tables, &sg.actions);
        assert!(parser.parse(&tokens).is_err());
    }
}
