//! General-purpose grammar model used by the LR(1)/LALR(1)/SLR(1) engine.
//!
//! Unlike the legacy single-character [`crate::symbol::Symbol`], symbols here
//! are interned by name so the script language's multi-character identifiers,
//! keywords and operators can be represented directly. Terminals optionally
//! carry a precedence level and associativity, used by the conflict resolver
//! (`crate::lr1::tables`) to break shift/reduce ties the way operator
//! precedence climbing does in a hand-written parser.

use std::collections::HashMap;
use std::fmt;

/// Id of a terminal, dense and zero-based.
pub type TermId = u32;
/// Id of a nonterminal, dense and zero-based.
pub type NonTermId = u32;

/// A symbol appearing in a rule's right-hand side, or on an item's cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Sym {
    Terminal(TermId),
    NonTerminal(NonTermId),
    /// The empty string, only ever appears as a whole right-hand side.
    Eps,
    /// End-of-input marker, only ever appears in lookahead sets.
    End,
}

impl Sym {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Sym::Terminal(_) | Sym::End)
    }

    pub fn is_nonterminal(&self) -> bool {
        matches!(self, Sym::NonTerminal(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
    None,
}

#[derive(Debug, Clone)]
pub struct TerminalInfo {
    pub name: String,
    pub precedence: Option<u32>,
    pub assoc: Assoc,
}

#[derive(Debug, Clone)]
pub struct NonTerminalInfo {
    pub name: String,
}

/// A single production `lhs -> rhs`.
///
/// `semantic_rule` indexes into the `Vec<SemanticRule>` the table-driven
/// parser is constructed with (see `crate::runtime::parser`); it is what the
/// C++ original calls a semantic id on `NonTerminal::AddRule`.
#[derive(Debug, Clone)]
pub struct Rule {
    pub lhs: NonTermId,
    pub rhs: Vec<Sym>,
    pub semantic_rule: usize,
    /// Rule precedence for conflict resolution; defaults to the rightmost
    /// terminal's precedence when `None` is supplied at construction time.
    pub precedence: Option<u32>,
}

impl Rule {
    /// Number of symbols actually consumed on reduce (epsilon rules pop 0).
    pub fn len(&self) -> usize {
        if self.rhs == [Sym::Eps] { 0 } else { self.rhs.len() }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The script-language grammar plus bookkeeping needed to build LR(1) tables.
#[derive(Debug, Clone)]
pub struct Grammar2 {
    pub terminals: Vec<TerminalInfo>,
    pub nonterminals: Vec<NonTerminalInfo>,
    pub rules: Vec<Rule>,
    /// Index (into `rules`) of the single augmented rule `S' -> S`.
    pub augmented_rule: usize,
    term_by_name: HashMap<String, TermId>,
    nonterm_by_name: HashMap<String, NonTermId>,
}

pub struct GrammarBuilder {
    terminals: Vec<TerminalInfo>,
    nonterminals: Vec<NonTerminalInfo>,
    rules: Vec<Rule>,
    term_by_name: HashMap<String, TermId>,
    nonterm_by_name: HashMap<String, NonTermId>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self {
            terminals: Vec::new(),
            nonterminals: Vec::new(),
            rules: Vec::new(),
            term_by_name: HashMap::new(),
            nonterm_by_name: HashMap::new(),
        }
    }

    pub fn terminal(&mut self, name: &str) -> TermId {
        self.terminal_prec(name, None, Assoc::None)
    }

    pub fn terminal_prec(&mut self, name: &str, precedence: Option<u32>, assoc: Assoc) -> TermId {
        if let Some(&id) = self.term_by_name.get(name) {
            return id;
        }
        let id = self.terminals.len() as TermId;
        self.terminals.push(TerminalInfo {
            name: name.to_string(),
            precedence,
            assoc,
        });
        self.term_by_name.insert(name.to_string(), id);
        id
    }

    pub fn nonterminal(&mut self, name: &str) -> NonTermId {
        if let Some(&id) = self.nonterm_by_name.get(name) {
            return id;
        }
        let id = self.nonterminals.len() as NonTermId;
        self.nonterminals.push(NonTerminalInfo {
            name: name.to_string(),
        });
        self.nonterm_by_name.insert(name.to_string(), id);
        id
    }

    /// Adds a rule, deriving its precedence from the rightmost terminal in
    /// `rhs` unless `precedence` is given explicitly (mirrors yacc's `%prec`
    /// override, used sparingly by the script grammar for unary minus).
    pub fn rule(
        &mut self,
        lhs: NonTermId,
        rhs: Vec<Sym>,
        semantic_rule: usize,
        precedence: Option<u32>,
    ) -> usize {
        let derived_prec = precedence.or_else(|| {
            rhs.iter().rev().find_map(|s| match s {
                Sym::Terminal(t) => self.terminals[*t as usize].precedence,
                _ => None,
            })
        });
        let idx = self.rules.len();
        self.rules.push(Rule {
            lhs,
            rhs,
            semantic_rule,
            precedence: derived_prec,
        });
        idx
    }

    pub fn build(self, start: NonTermId, augmented_semantic_rule: usize) -> Grammar2 {
        let augmented_lhs = self.nonterminals.len() as NonTermId;
        let mut terminals = self.terminals;
        let mut nonterminals = self.nonterminals;
        let mut rules = self.rules;
        let mut nonterm_by_name = self.nonterm_by_name;
        nonterminals.push(NonTerminalInfo {
            name: "start'".to_string(),
        });
        nonterm_by_name.insert("start'".to_string(), augmented_lhs);
        let augmented_rule = rules.len();
        rules.push(Rule {
            lhs: augmented_lhs,
            rhs: vec![Sym::NonTerminal(start)],
            semantic_rule: augmented_semantic_rule,
            precedence: None,
        });
        let _ = &mut terminals;
        Grammar2 {
            terminals,
            nonterminals,
            rules,
            augmented_rule,
            term_by_name: self.term_by_name,
            nonterm_by_name,
        }
    }
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar2 {
    pub fn augmented_start(&self) -> NonTermId {
        self.rules[self.augmented_rule].lhs
    }

    pub fn term_id(&self, name: &str) -> Option<TermId> {
        self.term_by_name.get(name).copied()
    }

    pub fn nonterm_id(&self, name: &str) -> Option<NonTermId> {
        self.nonterm_by_name.get(name).copied()
    }

    pub fn rules_for(&self, nt: NonTermId) -> impl Iterator<Item = (usize, &Rule)> {
        self.rules
            .iter()
            .enumerate()
            .filter(move |(_, r)| r.lhs == nt)
    }

    pub fn sym_name(&self, sym: Sym) -> String {
        match sym {
            Sym::Terminal(t) => self.terminals[t as usize].name.clone(),
            Sym::NonTerminal(nt) => self.nonterminals[nt as usize].name.clone(),
            Sym::Eps => "ε".to_string(),
            Sym::End => "$".to_string(),
        }
    }
}

impl fmt::Display for Grammar2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            let rhs: Vec<String> = rule.rhs.iter().map(|s| self.sym_name(*s)).collect();
            writeln!(f, "{} -> {}", self.nonterminals[rule.lhs as usize].name, rhs.join(" "))?;
        }
        Ok(())
    }
}

/// FIRST/FOLLOW computation generalized from `crate::first_follow` to
/// [`Grammar2`]'s interned symbols.
pub mod analysis {
    use super::*;
    use std::collections::{HashMap, HashSet};

    pub type FirstSets = HashMap<Sym, HashSet<Sym>>;
    pub type FollowSets = HashMap<NonTermId, HashSet<Sym>>;

    pub fn compute_first_sets(g: &Grammar2) -> FirstSets {
        let mut first: FirstSets = HashMap::new();
        for t in 0..g.terminals.len() as TermId {
            first.insert(Sym::Terminal(t), HashSet::from([Sym::Terminal(t)]));
        }
        first.insert(Sym::Eps, HashSet::from([Sym::Eps]));
        first.insert(Sym::End, HashSet::from([Sym::End]));
        for nt in 0..g.nonterminals.len() as NonTermId {
            first.insert(Sym::NonTerminal(nt), HashSet::new());
        }

        let mut changed = true;
        while changed {
            changed = false;
            for rule in &g.rules {
                let lhs_sym = Sym::NonTerminal(rule.lhs);
                let current = first.get(&lhs_sym).cloned().unwrap_or_default();
                let rhs_first = first_of_string(&first, &rule.rhs);
                let merged: HashSet<Sym> = current.union(&rhs_first).copied().collect();
                if merged.len() != current.len() {
                    first.insert(lhs_sym, merged);
                    changed = true;
                }
            }
        }
        first
    }

    pub fn first_of_string(first: &FirstSets, symbols: &[Sym]) -> HashSet<Sym> {
        let mut result = HashSet::new();
        let mut has_eps = true;
        for sym in symbols {
            if !has_eps {
                break;
            }
            let f = first.get(sym).cloned().unwrap_or_default();
            for s in &f {
                if *s != Sym::Eps {
                    result.insert(*s);
                }
            }
            has_eps = f.contains(&Sym::Eps);
        }
        if has_eps {
            result.insert(Sym::Eps);
        }
        result
    }

    pub fn compute_follow_sets(g: &Grammar2, first: &FirstSets) -> FollowSets {
        let mut follow: FollowSets = HashMap::new();
        for nt in 0..g.nonterminals.len() as NonTermId {
            follow.insert(nt, HashSet::new());
        }
        follow
            .get_mut(&g.augmented_start())
            .unwrap()
            .insert(Sym::End);

        let mut changed = true;
        while changed {
            changed = false;
            for rule in &g.rules {
                for (i, sym) in rule.rhs.iter().enumerate() {
                    let nt = match sym {
                        Sym::NonTerminal(nt) => *nt,
                        _ => continue,
                    };
                    let current = follow.get(&nt).cloned().unwrap_or_default();
                    let mut merged = current.clone();
                    let beta = &rule.rhs[i + 1..];
                    let first_beta = first_of_string(first, beta);
                    for s in &first_beta {
                        if *s != Sym::Eps {
                            merged.insert(*s);
                        }
                    }
                    if beta.is_empty() || first_beta.contains(&Sym::Eps) {
                        let follow_lhs = follow.get(&rule.lhs).cloned().unwrap_or_default();
                        merged = merged.union(&follow_lhs).copied().collect();
                    }
                    if merged.len() != current.len() {
                        follow.insert(nt, merged);
                        changed = true;
                    }
                }
            }
        }
        follow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_grammar() -> Grammar2 {
        // E -> E + T | T ; T -> id
        let mut b = GrammarBuilder::new();
        let plus = b.terminal("+");
        let id = b.terminal("id");
        let e = b.nonterminal("E");
        let t = b.nonterminal("T");
        b.rule(e, vec![Sym::NonTerminal(e), Sym::Terminal(plus), Sym::NonTerminal(t)], 0, None);
        b.rule(e, vec![Sym::NonTerminal(t)], 1, None);
        b.rule(t, vec![Sym::Terminal(id)], 2, None);
        b.build(e, 99)
    }

    #[test]
    fn first_of_left_recursive_nonterminal_is_id() {
        let g = tiny_grammar();
        let first = analysis::compute_first_sets(&g);
        let id = g.term_id("id").unwrap();
        assert!(first[&Sym::NonTerminal(g.nonterm_id("E").unwrap())].contains(&Sym::Terminal(id)));
    }

    #[test]
    fn follow_of_start_contains_end() {
        let g = tiny_grammar();
        let first = analysis::compute_first_sets(&g);
        let follow = analysis::compute_follow_sets(&g, &first);
        assert!(follow[&g.nonterm_id("E").unwrap()].contains(&Sym::End));
    }
}
