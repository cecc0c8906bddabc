//! Parse table emission and shift/reduce conflict resolution.
//!
//! Ported from `Collection::CreateParseTables`: tables are built first with
//! every shift and every reduce action recorded independently, then
//! conflicting cells are resolved by, in order: (1) an explicit resolver
//! rule keyed by lookback-terminal/lhs-nonterminal and lookahead, (2)
//! operator precedence/associativity climbing, (3) a fatal diagnostic.

use crate::error::Error;
use crate::grammar2::{Assoc, Grammar2, Sym};
use crate::lr1::collection::Collection;
use std::collections::HashMap;

pub const ERROR_VAL: i64 = -1;
pub const ACCEPT_VAL: i64 = -2;

/// What to do when a state has both a shift and a reduce action on the same
/// lookahead terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictAction {
    ForceShift,
    ForceReduce,
}

/// Either a nonterminal (the reducing rule's lhs) or a lookback terminal —
/// the two ways the original C++ keys a resolver entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolverKey {
    Lhs(u32),
    LookbackTerminal(Sym),
}

#[derive(Debug, Clone)]
pub struct Resolver {
    pub key: ResolverKey,
    pub lookahead: Sym,
    pub action: ConflictAction,
}

/// Dense 2D table: `rows[state][col]`.
#[derive(Debug, Clone)]
pub struct Table {
    pub rows: Vec<Vec<i64>>,
}

impl Table {
    fn new(num_states: usize, num_cols: usize) -> Self {
        Self {
            rows: vec![vec![ERROR_VAL; num_cols]; num_states],
        }
    }

    pub fn get(&self, state: usize, col: usize) -> i64 {
        self.rows[state][col]
    }
}

#[derive(Debug, Clone)]
pub struct Tables {
    pub shift: Table,
    pub reduce: Table,
    pub jump: Table,
    pub term_index: HashMap<Sym, usize>,
    pub nonterm_index: HashMap<u32, usize>,
    pub rhs_len: Vec<usize>,
    pub rule_lhs: Vec<u32>,
}

impl Tables {
    pub fn shift_action(&self, state: usize, term: Sym) -> Option<usize> {
        let col = *self.term_index.get(&term)?;
        let v = self.shift.get(state, col);
        if v == ERROR_VAL { None } else { Some(v as usize) }
    }

    pub fn reduce_action(&self, state: usize, term: Sym) -> Option<i64> {
        let col = *self.term_index.get(&term)?;
        let v = self.reduce.get(state, col);
        if v == ERROR_VAL { None } else { Some(v) }
    }

    pub fn goto(&self, state: usize, nt: u32) -> Option<usize> {
        let col = *self.nonterm_index.get(&nt)?;
        let v = self.jump.get(state, col);
        if v == ERROR_VAL { None } else { Some(v as usize) }
    }
}

/// Builds parse tables from a (possibly LALR/SLR-collapsed) collection,
/// resolving shift/reduce conflicts with `resolvers` first, operator
/// precedence second, and erroring otherwise. Reduce/reduce conflicts are
/// always fatal — the original never auto-resolves them either.
pub fn build_tables(
    g: &Grammar2,
    coll: &Collection,
    resolvers: &[Resolver],
) -> Result<Tables, Error> {
    let num_states = coll.closures.len();
    let num_terms = g.terminals.len() + 1; // + End
    let num_nonterms = g.nonterminals.len();

    let mut term_index = HashMap::new();
    for t in 0..g.terminals.len() as u32 {
        term_index.insert(Sym::Terminal(t), t as usize);
    }
    term_index.insert(Sym::End, g.terminals.len());

    let mut nonterm_index = HashMap::new();
    for nt in 0..g.nonterminals.len() as u32 {
        nonterm_index.insert(nt, nt as usize);
    }

    let mut shift = Table::new(num_states, num_terms);
    let mut jump = Table::new(num_states, num_nonterms);
    // raw_reduce holds *all* candidate reduce rule indices per cell, for
    // conflict diagnostics; reduce table holds the resolved winner.
    let mut raw_reduce: Vec<Vec<Vec<usize>>> = vec![vec![Vec::new(); num_terms]; num_states];
    let mut reduce = Table::new(num_states, num_terms);

    for &(from, to, sym) in &coll.transitions {
        match sym {
            Sym::Terminal(_) => {
                let col = term_index[&sym];
                shift.rows[from][col] = to as i64;
            }
            Sym::NonTerminal(nt) => {
                let col = nonterm_index[&nt];
                jump.rows[from][col] = to as i64;
            }
            _ => {}
        }
    }

    for closure in &coll.closures {
        for item in closure.items() {
            if !item.is_reduce(g) {
                continue;
            }
            let rule = &g.rules[item.rule];
            if rule.lhs == g.augmented_start() {
                let col = term_index[&Sym::End];
                reduce.rows[closure.id][col] = ACCEPT_VAL;
                continue;
            }
            for la in &item.lookaheads {
                let col = term_index.get(la).copied().unwrap_or(g.terminals.len());
                raw_reduce[closure.id][col].push(item.rule);
            }
        }
    }

    let rhs_len: Vec<usize> = g.rules.iter().map(|r| r.len()).collect();
    let rule_lhs: Vec<u32> = g.rules.iter().map(|r| r.lhs).collect();

    for state in 0..num_states {
        for col in 0..num_terms {
            let la = term_for_col(g, col);
            let candidates = &raw_reduce[state][col];
            if candidates.len() > 1 {
                return Err(reduce_reduce_error(g, state, la, candidates));
            }
            let has_shift = shift.rows[state][col] != ERROR_VAL;
            let has_reduce = !candidates.is_empty();
            if has_shift && has_reduce {
                let rule_idx = candidates[0];
                match resolve(g, &coll.closures[state], resolvers, rule_idx, la) {
                    Some(ConflictAction::ForceShift) => {
                        // keep shift, drop reduce
                    }
                    Some(ConflictAction::ForceReduce) => {
                        shift.rows[state][col] = ERROR_VAL;
                        reduce.rows[state][col] = rule_idx as i64;
                    }
                    None => {
                        return Err(shift_reduce_error(g, state, la, &coll.closures[state], rule_idx));
                    }
                }
            } else if has_reduce {
                reduce.rows[state][col] = candidates[0] as i64;
            }
        }
    }

    Ok(Tables {
        shift,
        reduce,
        jump,
        term_index,
        nonterm_index,
        rhs_len,
        rule_lhs,
    })
}

fn term_for_col(g: &Grammar2, col: usize) -> Sym {
    if col < g.terminals.len() {
        Sym::Terminal(col as u32)
    } else {
        Sym::End
    }
}

/// Tries resolvers keyed by lhs or by any lookback terminal reaching this
/// state, then falls back to precedence/associativity between the reducing
/// rule and the shifted terminal.
fn resolve(
    g: &Grammar2,
    state: &crate::lr1::closure::Closure,
    resolvers: &[Resolver],
    rule_idx: usize,
    lookahead: Sym,
) -> Option<ConflictAction> {
    let lhs = g.rules[rule_idx].lhs;
    for r in resolvers {
        if r.lookahead != lookahead {
            continue;
        }
        match r.key {
            ResolverKey::Lhs(k) if k == lhs => return Some(r.action),
            ResolverKey::LookbackTerminal(t) if state.comefrom_terminals().contains(&t) => {
                return Some(r.action)
            }
            _ => {}
        }
    }

    let rule_prec = g.rules[rule_idx].precedence;
    let la_prec_assoc = match lookahead {
        Sym::Terminal(t) => Some((g.terminals[t as usize].precedence, g.terminals[t as usize].assoc)),
        _ => None,
    };
    if let (Some(rp), Some((Some(lp), assoc))) = (rule_prec, la_prec_assoc) {
        return Some(if rp > lp {
            ConflictAction::ForceReduce
        } else if rp < lp {
            ConflictAction::ForceShift
        } else {
            match assoc {
                Assoc::Left => ConflictAction::ForceReduce,
                Assoc::Right => ConflictAction::ForceShift,
                Assoc::None => return None,
            }
        });
    }
    None
}

fn shift_reduce_error(
    g: &Grammar2,
    state: usize,
    lookahead: Sym,
    closure: &crate::lr1::closure::Closure,
    rule_idx: usize,
) -> Error {
    let lookback = closure
        .comefrom_terminals()
        .first()
        .map(|s| g.sym_name(*s))
        .unwrap_or_else(|| "?".to_string());
    Error::Conflict {
        kind: "shift/reduce",
        state,
        lookback,
        lookahead: g.sym_name(lookahead),
        candidates: vec![format!("reduce by rule {}", rule_idx), "shift".to_string()],
    }
}

fn reduce_reduce_error(g: &Grammar2, state: usize, lookahead: Sym, candidates: &[usize]) -> Error {
    Error::Conflict {
        kind: "reduce/reduce",
        state,
        lookback: "?".to_string(),
        lookahead: g.sym_name(lookahead),
        candidates: candidates
            .iter()
            .map(|r| format!("reduce by rule {}", r))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar2::{analysis, GrammarBuilder};
    use crate::lr1::collection::Collection;

    #[test]
    fn unambiguous_expr_grammar_builds_tables_without_conflict() {
        let mut b = GrammarBuilder::new();
        let id = b.terminal("id");
        let plus = b.terminal_prec("+", Some(1), Assoc::Left);
        let e = b.nonterminal("E");
        b.rule(e, vec![Sym::NonTerminal(e), Sym::Terminal(plus), Sym::NonTerminal(e)], 0, None);
        b.rule(e, vec![Sym::Terminal(id)], 1, None);
        let g = b.build(e, 2);

        let first = analysis::compute_first_sets(&g);
        let follow = analysis::compute_follow_sets(&g, &first);
        let canonical = Collection::build(&g, &first);
        let slr = canonical.to_slr(&g, &follow);
        // Ambiguous grammar (dangling shift/reduce on `+`) resolved purely
        // by precedence/associativity, no explicit resolver list needed.
        let tables = build_tables(&g, &slr, &[]).unwrap();
        assert!(tables.shift.rows.iter().any(|r| r.iter().any(|&v| v != ERROR_VAL)));
    }
}
