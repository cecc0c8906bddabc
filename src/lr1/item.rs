//! LR(1) items: a production with a cursor position and a lookahead set.

use crate::grammar2::{Grammar2, Sym};
use std::collections::BTreeSet;

/// `[A -> alpha . beta, lookaheads]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub rule: usize,
    pub cursor: usize,
    pub lookaheads: BTreeSet<Sym>,
}

/// The part of an item that defines automaton-state identity: two items
/// with the same core but different lookaheads are the *same* LALR/SLR
/// state and get merged; under canonical LR(1) they stay distinct.
pub type Core = (usize, usize);

impl Item {
    pub fn new(rule: usize, cursor: usize, lookaheads: BTreeSet<Sym>) -> Self {
        Self { rule, cursor, lookaheads }
    }

    pub fn core(&self) -> Core {
        (self.rule, self.cursor)
    }

    pub fn symbol_at_cursor(&self, g: &Grammar2) -> Option<Sym> {
        g.rules[self.rule].rhs.get(self.cursor).copied().filter(|s| *s != Sym::Eps)
    }

    pub fn is_reduce(&self, g: &Grammar2) -> bool {
        self.symbol_at_cursor(g).is_none()
    }

    pub fn advanced(&self) -> Item {
        Item {
            rule: self.rule,
            cursor: self.cursor + 1,
            lookaheads: self.lookaheads.clone(),
        }
    }

    /// Rest-of-rule after the cursor, i.e. `beta` in `A -> alpha . X beta`.
    pub fn rest<'g>(&self, g: &'g Grammar2) -> &'g [Sym] {
        let rhs = &g.rules[self.rule].rhs;
        if self.cursor + 1 > rhs.len() {
            &[]
        } else {
            &rhs[self.cursor + 1..]
        }
    }

    pub fn to_string(&self, g: &Grammar2) -> String {
        let rule = &g.rules[self.rule];
        let lhs = g.sym_name(Sym::NonTerminal(rule.lhs));
        let mut rhs: Vec<String> = rule.rhs.iter().map(|s| g.sym_name(*s)).collect();
        rhs.insert(self.cursor.min(rhs.len()), ".".to_string());
        let la: Vec<String> = self.lookaheads.iter().map(|s| g.sym_name(*s)).collect();
        format!("{} -> {} , {{{}}}", lhs, rhs.join(" "), la.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar2::GrammarBuilder;
    use std::collections::BTreeSet;

    #[test]
    fn reduce_item_has_no_symbol_at_cursor() {
        let mut b = GrammarBuilder::new();
        let id = b.terminal("id");
        let e = b.nonterminal("E");
        b.rule(e, vec![Sym::Terminal(id)], 0, None);
        let g = b.build(e, 1);
        let item = Item::new(0, 1, BTreeSet::from([Sym::End]));
        assert!(item.is_reduce(&g));
        assert_eq!(item.symbol_at_cursor(&g), None);
    }
}
