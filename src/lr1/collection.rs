//! The canonical LR(1) collection and its LALR(1)/SLR(1) collapses.
//!
//! Ported from `Collection::DoTransitions`, `Collection::ConvertToLALR` and
//! `Collection::ConvertToSLR` in the C++ original. States are identified by
//! dense `usize` ids in a `Vec<Closure>` rather than shared pointers — the
//! back-edges that were raw-pointer `come_from` links in the source become
//! `(Sym, state_id)` pairs (see Design Notes in `DESIGN.md`).

use crate::grammar2::{analysis::FirstSets, Grammar2, Sym};
use crate::lr1::item::Item;
use crate::lr1::closure::Closure;
use std::collections::{BTreeSet, HashMap, VecDeque};

pub type Transition = (usize, usize, Sym);

#[derive(Debug, Clone)]
pub struct Collection {
    pub closures: Vec<Closure>,
    pub transitions: Vec<Transition>,
    hash_index: HashMap<u64, usize>,
}

impl Collection {
    /// Builds the canonical LR(1) collection by BFS worklist from the
    /// augmented start rule's item `[S' -> . S, {$}]`.
    pub fn build(g: &Grammar2, first: &FirstSets) -> Self {
        let mut closures = Vec::new();
        let mut hash_index = HashMap::new();
        let mut transitions = Vec::new();

        let mut start = Closure::new(0);
        start.add_kernel_item(Item::new(
            g.augmented_rule,
            0,
            BTreeSet::from([Sym::End]),
        ));
        start.expand(g, first);
        hash_index.insert(start.structural_hash(), 0);
        closures.push(start);

        let mut worklist: VecDeque<usize> = VecDeque::from([0]);
        while let Some(state_id) = worklist.pop_front() {
            let symbols: Vec<Sym> = closures[state_id]
                .possible_transitions(g)
                .into_iter()
                .collect();

            for symbol in symbols {
                let kernel = closures[state_id].transition_kernel(g, symbol);
                if kernel.is_empty() {
                    continue;
                }
                let mut candidate = Closure::new(closures.len());
                for item in kernel {
                    candidate.add_kernel_item(item);
                }
                candidate.expand(g, first);
                let h = candidate.structural_hash();

                let target_id = if let Some(&existing) = hash_index.get(&h) {
                    existing
                } else {
                    let id = closures.len();
                    candidate.id = id;
                    hash_index.insert(h, id);
                    closures.push(candidate);
                    worklist.push_back(id);
                    id
                };
                closures[target_id].add_comefrom(symbol, state_id);
                transitions.push((state_id, target_id, symbol));
            }
        }

        Collection {
            closures,
            transitions,
            hash_index,
        }
    }

    pub fn shift_target(&self, state: usize, symbol: Sym) -> Option<usize> {
        self.transitions
            .iter()
            .find(|(from, _, s)| *from == state && *s == symbol)
            .map(|(_, to, _)| *to)
    }

    /// Stable sort by id (already dense here) — kept to mirror
    /// `Collection::Simplify`'s renumbering step for symmetry with the C++
    /// original; a no-op for collections built via [`Collection::build`]
    /// but required after [`Collection::to_lalr`] removes duplicate states.
    pub fn simplify(&mut self) {
        let mut order: Vec<usize> = (0..self.closures.len()).collect();
        order.sort_by_key(|&id| id);
        let mut remap = HashMap::new();
        for (new_id, &old_id) in order.iter().enumerate() {
            remap.insert(old_id, new_id);
        }
        let mut new_closures = vec![Closure::new(0); self.closures.len()];
        for (old_id, closure) in self.closures.drain(..).enumerate() {
            let new_id = remap[&old_id];
            let mut c = closure;
            c.id = new_id;
            new_closures[new_id] = c;
        }
        self.closures = new_closures;
        for t in &mut self.transitions {
            t.0 = remap[&t.0];
            t.1 = remap[&t.1];
        }
        for c in &mut self.closures {
            for cf in &mut c.come_from {
                cf.1 = remap[&cf.1];
            }
        }
    }

    /// Merges canonical-LR(1) states that share the same item cores,
    /// unioning their lookaheads and back-edges. Ported from
    /// `Collection::ConvertToLALR`.
    pub fn to_lalr(&self) -> Collection {
        let mut core_groups: HashMap<u64, Vec<usize>> = HashMap::new();
        for c in &self.closures {
            core_groups.entry(c.core_hash()).or_default().push(c.id);
        }

        let mut old_to_new: HashMap<usize, usize> = HashMap::new();
        let mut merged_closures: Vec<Closure> = Vec::new();
        for group in core_groups.values() {
            let new_id = merged_closures.len();
            let mut merged = Closure::new(new_id);
            for &old_id in group {
                old_to_new.insert(old_id, new_id);
                for item in self.closures[old_id].items() {
                    merged.add_kernel_item(item.clone());
                }
            }
            for &old_id in group {
                for &(sym, from) in &self.closures[old_id].come_from {
                    merged.add_comefrom(sym, *old_to_new.get(&from).unwrap_or(&from));
                }
            }
            merged_closures.push(merged);
        }

        let mut seen_transitions = std::collections::HashSet::new();
        let mut merged_transitions = Vec::new();
        for &(from, to, sym) in &self.transitions {
            let nf = old_to_new[&from];
            let nt = old_to_new[&to];
            if seen_transitions.insert((nf, nt, sym)) {
                merged_transitions.push((nf, nt, sym));
            }
        }

        // fix up come_from targets now that old_to_new is complete
        for (new_id, group) in core_groups.values().enumerate() {
            for &old_id in group {
                for &(sym, from) in &self.closures[old_id].come_from {
                    let nf = *old_to_new.get(&from).unwrap_or(&from);
                    merged_closures[new_id].add_comefrom(sym, nf);
                }
            }
        }

        let mut hash_index = HashMap::new();
        for c in &merged_closures {
            hash_index.insert(c.structural_hash(), c.id);
        }

        let mut result = Collection {
            closures: merged_closures,
            transitions: merged_transitions,
            hash_index,
        };
        result.simplify();
        result
    }

    /// SLR(1): collapse to LALR cores, then replace every item's lookahead
    /// set with FOLLOW(lhs), discarding the context-sensitive lookaheads
    /// entirely. Ported from `Collection::ConvertToSLR`.
    pub fn to_slr(&self, g: &Grammar2, follow: &crate::grammar2::analysis::FollowSets) -> Collection {
        let mut lalr = self.to_lalr();
        for closure in &mut lalr.closures {
            let items: Vec<Item> = closure
                .items()
                .iter()
                .map(|it| {
                    let rule = &g.rules[it.rule];
                    let la = follow.get(&rule.lhs).cloned().unwrap_or_default();
                    Item::new(it.rule, it.cursor, la)
                })
                .collect();
            let id = closure.id;
            let mut fresh = Closure::new(id);
            for it in items {
                fresh.add_kernel_item(it);
            }
            fresh.come_from = closure.come_from.clone();
            *closure = fresh;
        }
        lalr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar2::{analysis, GrammarBuilder};

    fn expr_grammar() -> Grammar2 {
        // E -> E + T | T ; T -> T * F | F ; F -> ( E ) | id
        let mut b = GrammarBuilder::new();
        let plus = b.terminal("+");
        let star = b.terminal("*");
        let lparen = b.terminal("(");
        let rparen = b.terminal(")");
        let id = b.terminal("id");
        let e = b.nonterminal("E");
        let t = b.nonterminal("T");
        let f = b.nonterminal("F");
        b.rule(e, vec![Sym::NonTerminal(e), Sym::Terminal(plus), Sym::NonTerminal(t)], 0, None);
        b.rule(e, vec![Sym::NonTerminal(t)], 1, None);
        b.rule(t, vec![Sym::NonTerminal(t), Sym::Terminal(star), Sym::NonTerminal(f)], 2, None);
        b.rule(t, vec![Sym::NonTerminal(f)], 3, None);
        b.rule(f, vec![Sym::Terminal(lparen), Sym::NonTerminal(e), Sym::Terminal(rparen)], 4, None);
        b.rule(f, vec![Sym::Terminal(id)], 5, None);
        b.build(e, 6)
    }

    #[test]
    fn canonical_collection_has_a_unique_start_state() {
        let g = expr_grammar();
        let first = analysis::compute_first_sets(&g);
        let coll = Collection::build(&g, &first);
        assert_eq!(coll.closures[0].items()[0].rule, g.augmented_rule);
        assert!(coll.closures.len() > 1);
    }

    #[test]
    fn lalr_collapse_never_increases_state_count() {
        let g = expr_grammar();
        let first = analysis::compute_first_sets(&g);
        let canonical = Collection::build(&g, &first);
        let lalr = canonical.to_lalr();
        assert!(lalr.closures.len() <= canonical.closures.len());
    }

    #[test]
    fn slr_collapse_matches_or_merges_lalr_states() {
        let g = expr_grammar();
        let first = analysis::compute_first_sets(&g);
        let follow = analysis::compute_follow_sets(&g, &first);
        let canonical = Collection::build(&g, &first);
        let slr = canonical.to_slr(&g, &follow);
        let lalr = canonical.to_lalr();
        assert_eq!(slr.closures.len(), lalr.closures.len());
    }
}
