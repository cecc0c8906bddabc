//! Symbol table and two-region address layout.
//!
//! Ported from `original_source/src/codegen/sym.h`'s `SymInfo`/`SymTab`.
//! Global identifiers live GBP-relative at a monotonically increasing
//! negative offset; locals live BP-relative within their enclosing
//! function's frame; function arguments are addressed by 1-based index via
//! `BaseReg::BpArg`, resolved by the VM at call time (see `vm::Vm::arg_addr`).

use crate::bytecode::{BaseReg, ValueType};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymInfo {
    pub addr: i32,
    pub base: BaseReg,
    pub ty: ValueType,
    pub is_func: bool,
    pub num_args: i64,
}

/// Lookup key: `"funcname/name"` inside a function scope, or just `"name"`
/// at global scope — mirrors the original's scope-qualified map key.
#[derive(Debug, Clone, Default)]
pub struct SymTab {
    symbols: HashMap<String, SymInfo>,
}

impl SymTab {
    pub fn new() -> Self {
        Self { symbols: HashMap::new() }
    }

    fn key(scope: Option<&str>, name: &str) -> String {
        match scope {
            Some(s) => format!("{}/{}", s, name),
            None => name.to_string(),
        }
    }

    pub fn add_symbol(&mut self, scope: Option<&str>, name: &str, info: SymInfo) {
        self.symbols.insert(Self::key(scope, name), info);
    }

    pub fn get(&self, scope: Option<&str>, name: &str) -> Option<&SymInfo> {
        // Functions are always registered at global scope in the original,
        // so a lookup falls back to the unscoped key when a scoped lookup
        // misses (an inner block referencing an outer function by name).
        self.symbols
            .get(&Self::key(scope, name))
            .or_else(|| self.symbols.get(&Self::key(None, name)))
    }

    pub fn contains(&self, scope: Option<&str>, name: &str) -> bool {
        self.get(scope, name).is_some()
    }

    pub fn all(&self) -> impl Iterator<Item = (&String, &SymInfo)> {
        self.symbols.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_lookup_falls_back_to_global_function() {
        let mut tab = SymTab::new();
        tab.add_symbol(
            None,
            "sq",
            SymInfo { addr: 10, base: BaseReg::Mem, ty: ValueType::Unknown, is_func: true, num_args: 1 },
        );
        assert!(tab.get(Some("other_func"), "sq").is_some());
    }

    #[test]
    fn local_shadows_global_with_same_name() {
        let mut tab = SymTab::new();
        tab.add_symbol(
            None,
            "x",
            SymInfo { addr: -8, base: BaseReg::Gbp, ty: ValueType::Int, is_func: false, num_args: 0 },
        );
        tab.add_symbol(
            Some("f"),
            "x",
            SymInfo { addr: -16, base: BaseReg::Bp, ty: ValueType::Int, is_func: false, num_args: 0 },
        );
        let local = tab.get(Some("f"), "x").unwrap();
        assert_eq!(local.base, BaseReg::Bp);
    }
}
