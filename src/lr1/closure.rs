//! Closure of an LR(1) item set: one automaton state.
//!
//! Ported from `Closure::AddElement` in the C++ original — lookaheads for
//! newly-discovered items are recomputed via FIRST of `(rest-of-rule ·
//! inherited-lookahead)`, and items are merged by core rather than
//! duplicated when a later expansion reaches the same core with a new
//! lookahead.

use crate::grammar2::{analysis::FirstSets, Grammar2, Sym};
use crate::lr1::item::{Core, Item};
use std::collections::{BTreeSet, HashMap};

/// Back-edge recording that `symbol`, shifted from state `from`, leads into
/// this closure. Used by the conflict resolver to find the "lookback
/// terminal" that could have brought the parser into a conflicting state.
pub type ComeFrom = (Sym, usize);

#[derive(Debug, Clone, Default)]
pub struct Closure {
    pub id: usize,
    items: Vec<Item>,
    core_index: HashMap<Core, usize>,
    pub come_from: Vec<ComeFrom>,
}

impl Closure {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            items: Vec::new(),
            core_index: HashMap::new(),
            come_from: Vec::new(),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn add_comefrom(&mut self, symbol: Sym, from: usize) {
        if !self.come_from.contains(&(symbol, from)) {
            self.come_from.push((symbol, from));
        }
    }

    pub fn comefrom_terminals(&self) -> Vec<Sym> {
        self.come_from.iter().map(|(s, _)| *s).collect()
    }

    /// Adds a seed item directly (no closure expansion), used for the
    /// kernel item a `goto` transition lands on.
    pub fn add_kernel_item(&mut self, item: Item) {
        self.merge(item);
    }

    fn merge(&mut self, item: Item) {
        if let Some(&idx) = self.core_index.get(&item.core()) {
            let existing = &mut self.items[idx];
            existing.lookaheads.extend(item.lookaheads);
        } else {
            let idx = self.items.len();
            self.core_index.insert(item.core(), idx);
            self.items.push(item);
        }
    }

    /// Expands the closure to a fixed point: for every item
    /// `[A -> alpha . B beta, la]` with `B` a nonterminal, add
    /// `[B -> . gamma, FIRST(beta la)]` for every rule `B -> gamma`.
    pub fn expand(&mut self, g: &Grammar2, first: &FirstSets) {
        loop {
            let total_before: usize = self.items.iter().map(|i| i.lookaheads.len()).sum();
            let count_before = self.items.len();

            let snapshot = self.items.clone();
            for item in &snapshot {
                let sym = match item.symbol_at_cursor(g) {
                    Some(s) => s,
                    None => continue,
                };
                let nt = match sym {
                    Sym::NonTerminal(nt) => nt,
                    _ => continue,
                };
                let mut tail: Vec<Sym> = item.rest(g).to_vec();
                for (rule_idx, _) in g.rules_for(nt) {
                    let lookaheads = lookaheads_for(g, first, &mut tail, &item.lookaheads);
                    self.merge(Item::new(rule_idx, 0, lookaheads));
                }
            }

            let total_after: usize = self.items.iter().map(|i| i.lookaheads.len()).sum();
            let count_after = self.items.len();
            if count_after == count_before && total_after == total_before {
                break;
            }
        }
    }

    /// All distinct symbols some item's cursor sits before.
    pub fn possible_transitions(&self, g: &Grammar2) -> BTreeSet<Sym> {
        self.items
            .iter()
            .filter_map(|it| it.symbol_at_cursor(g))
            .collect()
    }

    /// Kernel items produced by shifting over `symbol` (not yet closed).
    pub fn transition_kernel(&self, g: &Grammar2, symbol: Sym) -> Vec<Item> {
        self.items
            .iter()
            .filter(|it| it.symbol_at_cursor(g) == Some(symbol))
            .map(Item::advanced)
            .collect()
    }

    /// Order-independent structural hash: two closures with the same items
    /// (regardless of insertion order) hash identically, required so the
    /// collection builder can dedup states discovered via different paths.
    pub fn structural_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut item_hashes: Vec<u64> = self
            .items
            .iter()
            .map(|it| {
                let mut h = DefaultHasher::new();
                it.rule.hash(&mut h);
                it.cursor.hash(&mut h);
                for la in &it.lookaheads {
                    la.hash(&mut h);
                }
                h.finish()
            })
            .collect();
        item_hashes.sort_unstable();
        let mut h = DefaultHasher::new();
        item_hashes.hash(&mut h);
        h.finish()
    }

    /// Hash over cores only, ignoring lookaheads — the key LALR/SLR collapse
    /// merges states on.
    pub fn core_hash(&self) -> u64 {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut cores: Vec<Core> = self.items.iter().map(|it| it.core()).collect();
        cores.sort_unstable();
        let mut h = DefaultHasher::new();
        cores.hash(&mut h);
        h.finish()
    }
}

fn lookaheads_for(
    g: &Grammar2,
    first: &FirstSets,
    tail_buf: &mut Vec<Sym>,
    inherited: &BTreeSet<Sym>,
) -> BTreeSet<Sym> {
    // FIRST(beta . la) for each la in inherited; de-duplicated into a set.
    let mut result = BTreeSet::new();
    for la in inherited {
        tail_buf.push(*la);
        let f = crate::grammar2::analysis::first_of_string(first, tail_buf);
        tail_buf.pop();
        for s in f {
            if s != Sym::Eps {
                result.insert(s);
            }
        }
    }
    result
}
