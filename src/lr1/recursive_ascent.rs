//! Recursive-ascent alternative to the table-driven parser.
//!
//! The C++ original's `ParserGen` emits one C++ function per automaton
//! state and lets the compiler inline the dispatch. Emitting Rust source
//! from this crate would not be idiomatic, so this module instead produces
//! a structural analogue: one [`GeneratedState`] per automaton state,
//! recording what that state's function would have dispatched on. It is
//! exercised only as a cross-check that its shift/reduce decisions agree
//! with the table-driven parser (`crate::runtime::parser`) on every state,
//! which is what `crate::lr1::tables::build_tables` already decided.

use crate::grammar2::{Grammar2, Sym};
use crate::lr1::tables::Tables;

#[derive(Debug, Clone)]
pub enum StateAction {
    Shift { on: Sym, to: usize },
    Reduce { on: Sym, rule: usize },
    Accept,
    Goto { nt: u32, to: usize },
}

#[derive(Debug, Clone)]
pub struct GeneratedState {
    pub id: usize,
    pub actions: Vec<StateAction>,
}

pub struct Generator<'a> {
    g: &'a Grammar2,
    tables: &'a Tables,
}

impl<'a> Generator<'a> {
    pub fn new(g: &'a Grammar2, tables: &'a Tables) -> Self {
        Self { g, tables }
    }

    /// Structural analogue of emitting one function per state.
    pub fn emit_functions(&self, num_states: usize) -> Vec<GeneratedState> {
        (0..num_states)
            .map(|id| GeneratedState {
                id,
                actions: self.actions_for_state(id),
            })
            .collect()
    }

    fn actions_for_state(&self, state: usize) -> Vec<StateAction> {
        let mut actions = Vec::new();
        for t in 0..self.g.terminals.len() as u32 {
            let sym = Sym::Terminal(t);
            if let Some(to) = self.tables.shift_action(state, sym) {
                actions.push(StateAction::Shift { on: sym, to });
            }
            if let Some(r) = self.tables.reduce_action(state, sym) {
                if r == crate::lr1::tables::ACCEPT_VAL {
                    actions.push(StateAction::Accept);
                } else {
                    actions.push(StateAction::Reduce { on: sym, rule: r as usize });
                }
            }
        }
        if let Some(r) = self.tables.reduce_action(state, Sym::End) {
            if r == crate::lr1::tables::ACCEPT_VAL {
                actions.push(StateAction::Accept);
            } else {
                actions.push(StateAction::Reduce { on: Sym::End, rule: r as usize });
            }
        }
        for nt in 0..self.g.nonterminals.len() as u32 {
            if let Some(to) = self.tables.goto(state, nt) {
                actions.push(StateAction::Goto { nt, to });
            }
        }
        actions
    }
}
