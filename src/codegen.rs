//! AST-walking bytecode code generator.
//!
//! Ported from `original_source/src/codegen/ast_asm.cpp` (`ASTAsm`). Three
//! Open Questions from the Design Notes are resolved here, each documented
//! at its resolution site and recorded again in `DESIGN.md`:
//!
//! 1. Argument addressing (`BaseReg::BpArg`) — this port stores the callee's
//!    argument count in the call frame itself (`saved_num_args`, see
//!    `crate::vm`), so `Vm::arg_addr` can convert a 1-based argument index
//!    into an absolute slot in O(1) instead of walking typed cells.
//! 2. Unary `+` (`UADD`) is emitted as [`OpCode::Nop`] — pure identity.
//! 3. Assignment emits: evaluate rhs, push lhs address, `WRMEM` — `WRMEM`
//!    pops the address first (it was pushed last), then the value, writes
//!    it, and pushes the written value back so assignment is usable as an
//!    expression (`a = (b = 1);`).

use crate::ast::{JumpKind, Literal, Node, NodeKind};
use crate::bytecode::{BaseReg, OpCode, Value, ValueType};
use crate::error::Error;
use crate::symtab::{SymInfo, SymTab};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodegenMode {
    Binary,
    Text,
}

struct PatchSite {
    pos: usize,
}

struct FuncCallPatch {
    name: String,
    pos: usize,
    num_args: i64,
}

pub struct CodeGen {
    mode: CodegenMode,
    symtab: SymTab,
    code: Vec<u8>,
    text: Vec<String>,
    global_top: i32,
    local_top: HashMap<String, i32>,
    cur_func: Option<String>,
    cur_loop: Vec<String>,
    ext_funcs: std::collections::HashSet<String>,
    func_comefroms: Vec<FuncCallPatch>,
    endfunc_comefroms: Vec<PatchSite>,
    loop_begin_comefroms: HashMap<String, Vec<PatchSite>>,
    loop_end_comefroms: HashMap<String, Vec<PatchSite>>,
    label_counter: usize,
}

/// Padding before the first local's offset, mirroring `g_vm_longest_size + 1`
/// in the original — kept even though this port no longer needs byte-size
/// padding (memory is `Vec<Value>`, one slot per variable); retained as a
/// visible gap so a stray BP-relative miscalculation in generated code reads
/// as an out-of-range slot rather than silently aliasing a bookkeeping slot.
const LOCAL_PADDING: i32 = 1;

impl CodeGen {
    pub fn new(mode: CodegenMode) -> Self {
        Self {
            mode,
            symtab: SymTab::new(),
            code: Vec::new(),
            text: Vec::new(),
            global_top: 0,
            local_top: HashMap::new(),
            cur_func: None,
            cur_loop: Vec::new(),
            ext_funcs: std::collections::HashSet::new(),
            func_comefroms: Vec::new(),
            endfunc_comefroms: Vec::new(),
            loop_begin_comefroms: HashMap::new(),
            loop_end_comefroms: HashMap::new(),
            label_counter: 0,
        }
    }

    pub fn global_slot_count(&self) -> usize {
        self.global_top as usize
    }

    pub fn finish(mut self) -> Result<Vec<u8>, Error> {
        self.patch_function_addresses()?;
        self.emit_op(OpCode::Halt);
        Ok(self.code)
    }

    fn emit_op(&mut self, op: OpCode) {
        self.code.push(op as u8);
        if self.mode == CodegenMode::Text {
            self.text.push(format!("{}", op));
        }
    }

    fn emit_value(&mut self, v: &Value) {
        v.encode_into(&mut self.code);
    }

    fn emit_push(&mut self, v: Value) {
        self.emit_op(OpCode::Push);
        self.emit_value(&v);
    }

    /// Emits a 4-byte placeholder jump target right after the jump opcode
    /// that precedes this call (`Jmp`/`Jmpcnd`/`Call` all read their target
    /// with `fetch_i32`, not through the `PUSH`/`Value` framing used for
    /// ordinary operands). Returns the offset to patch once the real target
    /// is known.
    fn emit_placeholder_addr(&mut self) -> usize {
        let pos = self.code.len();
        self.emit_i32(0);
        pos
    }

    fn patch_addr_at(&mut self, pos: usize, addr: i32) {
        let bytes = addr.to_le_bytes();
        self.code[pos..pos + 4].copy_from_slice(&bytes);
    }

    /// Generates code for a whole program (a `List` of top-level statements).
    pub fn generate(&mut self, root: &Node) -> Result<(), Error> {
        self.visit(root)
    }

    fn declare_ident(&mut self, name: &str, ty: ValueType) -> SymInfo {
        if let Some(info) = self.symtab.get(self.cur_func.as_deref(), name) {
            return *info;
        }
        let info = match &self.cur_func {
            None => {
                let addr = self.global_top;
                self.global_top += 1;
                SymInfo { addr, base: BaseReg::Gbp, ty, is_func: false, num_args: 0 }
            }
            Some(func) => {
                let top = self.local_top.entry(func.clone()).or_insert(LOCAL_PADDING);
                let addr = *top;
                *top += 1;
                SymInfo { addr, base: BaseReg::Bp, ty, is_func: false, num_args: 0 }
            }
        };
        self.symtab.add_symbol(self.cur_func.as_deref(), name, info);
        info
    }

    /// Emits a `PUSH <address>` for an identifier's storage location,
    /// declaring it on first occurrence. Returns the resolved type.
    fn push_ident_address(&mut self, name: &str, derived_ty: ValueType) -> Result<SymInfo, Error> {
        let info = if let Some(info) = self.symtab.get(self.cur_func.as_deref(), name) {
            *info
        } else {
            self.declare_ident(name, derived_ty)
        };
        self.emit_push(Value::Addr(info.addr, info.base));
        Ok(info)
    }

    fn visit(&mut self, node: &Node) -> Result<(), Error> {
        match &node.kind {
            NodeKind::Empty => {}
            NodeKind::Token(Literal::Int(i)) => self.emit_push(Value::Int(*i)),
            NodeKind::Token(Literal::Real(r)) => self.emit_push(Value::Real(*r)),
            NodeKind::Token(Literal::Str(s)) => self.emit_push(Value::Str(s.clone())),
            NodeKind::Token(Literal::Ident(name)) => {
                let info = self.push_ident_address(name, node.value_type)?;
                if !info.is_func {
                    self.emit_op(OpCode::Deref);
                }
            }
            NodeKind::Unary { op, child } => {
                self.visit(child)?;
                match op {
                    '-' => self.emit_op(OpCode::Usub),
                    '+' => self.emit_op(OpCode::Nop),
                    '!' => self.emit_op(OpCode::Not),
                    '~' => self.emit_op(OpCode::Binnot),
                    other => {
                        return Err(Error::Codegen {
                            node: node.id,
                            line: node.line,
                            message: format!("unknown unary operator {other}"),
                        })
                    }
                }
            }
            NodeKind::Binary { op, lhs, rhs } => self.visit_binary(node, op, lhs, rhs)?,
            NodeKind::List(items) => {
                for item in items {
                    self.visit(item)?;
                }
            }
            NodeKind::Condition { cond, then_, else_ } => self.visit_condition(cond, then_, else_.as_deref())?,
            NodeKind::Loop { label, cond, body } => self.visit_loop(label, cond, body)?,
            NodeKind::Func { name, args, body } => self.visit_func(node, name, args, body)?,
            NodeKind::FuncCall { name, args } => self.visit_call(node, name, args)?,
            NodeKind::Jump { kind, expr, depth } => self.visit_jump(node, *kind, expr.as_deref(), *depth)?,
            NodeKind::Declare { is_external, is_func, idents } => {
                if *is_external && *is_func {
                    for name in idents {
                        self.ext_funcs.insert(name.clone());
                    }
                }
            }
        }
        Ok(())
    }

    fn visit_binary(&mut self, node: &Node, op: &str, lhs: &Node, rhs: &Node) -> Result<(), Error> {
        if op == "=" {
            // no cast on assignment: the rhs keeps its own derived type
            self.visit(rhs)?;
            self.visit_lvalue_address(lhs)?;
            self.emit_op(OpCode::Wrmem);
            return Ok(());
        }

        self.visit(lhs)?;
        if lhs.value_type != node.value_type {
            self.emit_cast(node.value_type);
        }
        self.visit(rhs)?;
        if rhs.value_type != node.value_type {
            self.emit_cast(node.value_type);
        }

        let opcode = match op {
            "+" => OpCode::Add,
            "-" => OpCode::Sub,
            "*" => OpCode::Mul,
            "/" => OpCode::Div,
            "%" => OpCode::Mod,
            "^" => OpCode::Pow,
            ">" => OpCode::Gt,
            "<" => OpCode::Lt,
            ">=" => OpCode::Gequ,
            "<=" => OpCode::Lequ,
            "==" => OpCode::Equ,
            "!=" => OpCode::Nequ,
            "&&" => OpCode::And,
            "||" => OpCode::Or,
            "&" => OpCode::Binand,
            "|" => OpCode::Binor,
            "xor" => OpCode::Binxor,
            "<<" => OpCode::Shl,
            ">>" => OpCode::Shr,
            other => {
                return Err(Error::Codegen {
                    node: node.id,
                    line: node.line,
                    message: format!("unknown binary operator {other}"),
                })
            }
        };
        self.emit_op(opcode);
        Ok(())
    }

    fn emit_cast(&mut self, to: ValueType) {
        match to {
            ValueType::Int => self.emit_op(OpCode::Toi),
            ValueType::Real => self.emit_op(OpCode::Tof),
            ValueType::Str => self.emit_op(OpCode::Tos),
            _ => {}
        }
    }

    /// Pushes the *address* of an lvalue without dereferencing it — used on
    /// assignment's left-hand side. Only identifiers are valid lvalues.
    fn visit_lvalue_address(&mut self, node: &Node) -> Result<(), Error> {
        match &node.kind {
            NodeKind::Token(Literal::Ident(name)) => {
                self.push_ident_address(name, node.value_type)?;
                Ok(())
            }
            _ => Err(Error::Codegen {
                node: node.id,
                line: node.line,
                message: "left-hand side of assignment is not an lvalue".to_string(),
            }),
        }
    }

    fn visit_condition(&mut self, cond: &Node, then_: &Node, else_: Option<&Node>) -> Result<(), Error> {
        self.visit(cond)?;
        self.emit_op(OpCode::Not);
        self.emit_op(OpCode::Jmpcnd);
        let skip_then_patch = self.emit_placeholder_addr();

        self.visit(then_)?;

        if let Some(else_block) = else_ {
            self.emit_op(OpCode::Jmp);
            let skip_else_patch = self.emit_placeholder_addr();
            self.patch_addr_at(skip_then_patch, self.code.len() as i32);

            self.visit(else_block)?;
            self.patch_addr_at(skip_else_patch, self.code.len() as i32);
        } else {
            self.patch_addr_at(skip_then_patch, self.code.len() as i32);
        }
        Ok(())
    }

    fn visit_loop(&mut self, label: &str, cond: &Node, body: &Node) -> Result<(), Error> {
        let loop_begin = self.code.len();
        self.cur_loop.push(label.to_string());

        self.visit(cond)?;
        self.emit_op(OpCode::Not);
        self.emit_op(OpCode::Jmpcnd);
        let skip_patch = self.emit_placeholder_addr();

        self.visit(body)?;

        // patch any `continue` inside this loop to land right here, before
        // the jump back to the condition.
        if let Some(sites) = self.loop_begin_comefroms.remove(label) {
            for site in sites {
                self.patch_addr_at(site.pos, self.code.len() as i32);
            }
        }

        self.emit_op(OpCode::Jmp);
        let jump_back_pos = self.emit_placeholder_addr();
        self.patch_addr_at(jump_back_pos, loop_begin as i32);

        self.patch_addr_at(skip_patch, self.code.len() as i32);
        if let Some(sites) = self.loop_end_comefroms.remove(label) {
            for site in sites {
                self.patch_addr_at(site.pos, self.code.len() as i32);
            }
        }

        self.cur_loop.pop();
        Ok(())
    }

    fn visit_func(&mut self, node: &Node, name: &str, args: &[String], body: &Node) -> Result<(), Error> {
        if self.cur_func.is_some() {
            return Err(Error::Codegen {
                node: node.id,
                line: node.line,
                message: "nested functions are not allowed".to_string(),
            });
        }

        self.emit_op(OpCode::Jmp);
        let skip_body_patch = self.emit_placeholder_addr();

        let func_addr = self.code.len() as i32;
        self.symtab.add_symbol(
            None,
            name,
            SymInfo {
                addr: func_addr,
                base: BaseReg::Mem,
                ty: ValueType::Unknown,
                is_func: true,
                num_args: args.len() as i64,
            },
        );

        self.cur_func = Some(name.to_string());
        self.local_top.insert(name.to_string(), LOCAL_PADDING);
        for (i, arg_name) in args.iter().enumerate() {
            self.symtab.add_symbol(
                Some(name),
                arg_name,
                SymInfo {
                    addr: (i + 1) as i32,
                    base: BaseReg::BpArg,
                    ty: ValueType::Unknown,
                    is_func: false,
                    num_args: 0,
                },
            );
        }

        self.visit(body)?;

        // implicit `return 0;` if control falls off the end of the function
        self.emit_push(Value::Int(0));
        // explicit `return expr;` has already pushed its own value and jumps
        // straight here, skipping the push above so `RET` pops that value
        // instead of the fall-off `0`.
        let bare_ret_pos = self.code.len();
        self.emit_op(OpCode::Ret);

        for site in self.endfunc_comefroms.drain(..) {
            self.patch_addr_at(site.pos, bare_ret_pos as i32);
        }

        self.cur_func = None;
        self.patch_addr_at(skip_body_patch, self.code.len() as i32);
        Ok(())
    }

    fn visit_call(&mut self, node: &Node, name: &str, args: &[Node]) -> Result<(), Error> {
        for arg in args {
            self.visit(arg)?;
        }

        if self.ext_funcs.contains(name) {
            self.emit_push(Value::Str(name.to_string()));
            self.emit_push(Value::Int(args.len() as i64));
            self.emit_op(OpCode::Extcall);
            return Ok(());
        }

        match self.symtab.get(None, name).copied() {
            Some(sym) if sym.is_func => {
                if sym.num_args != args.len() as i64 {
                    return Err(Error::Codegen {
                        node: node.id,
                        line: node.line,
                        message: format!(
                            "function {name} expects {} arguments, got {}",
                            sym.num_args,
                            args.len()
                        ),
                    });
                }
                self.emit_op(OpCode::Call);
                self.emit_i32(sym.addr);
                self.emit_i64(args.len() as i64);
            }
            _ => {
                self.emit_op(OpCode::Call);
                let patch_pos = self.code.len();
                self.emit_i32(0);
                self.emit_i64(args.len() as i64);
                self.func_comefroms.push(FuncCallPatch {
                    name: name.to_string(),
                    pos: patch_pos,
                    num_args: args.len() as i64,
                });
            }
        }
        Ok(())
    }

    fn emit_i32(&mut self, v: i32) {
        self.code.extend_from_slice(&v.to_le_bytes());
    }

    fn emit_i64(&mut self, v: i64) {
        self.code.extend_from_slice(&v.to_le_bytes());
    }

    fn visit_jump(&mut self, node: &Node, kind: JumpKind, expr: Option<&Node>, depth: i64) -> Result<(), Error> {
        match kind {
            JumpKind::Return => {
                if self.cur_func.is_none() {
                    return Err(Error::Codegen {
                        node: node.id,
                        line: node.line,
                        message: "return outside of a function".to_string(),
                    });
                }
                match expr {
                    Some(e) => self.visit(e)?,
                    None => self.emit_push(Value::Int(0)),
                }
                self.emit_op(OpCode::Jmp);
                let pos = self.emit_placeholder_addr();
                self.endfunc_comefroms.push(PatchSite { pos });
            }
            JumpKind::Break | JumpKind::Continue => {
                if self.cur_loop.is_empty() {
                    return Err(Error::Codegen {
                        node: node.id,
                        line: node.line,
                        message: "break/continue outside of a loop".to_string(),
                    });
                }
                let max_depth = self.cur_loop.len() - 1;
                let clamped = (depth.max(0) as usize).min(max_depth);
                let label = self.cur_loop[self.cur_loop.len() - 1 - clamped].clone();
                self.emit_op(OpCode::Jmp);
                let pos = self.emit_placeholder_addr();
                let map = if kind == JumpKind::Break {
                    &mut self.loop_end_comefroms
                } else {
                    &mut self.loop_begin_comefroms
                };
                map.entry(label).or_default().push(PatchSite { pos });
            }
        }
        Ok(())
    }

    fn patch_function_addresses(&mut self) -> Result<(), Error> {
        for patch in self.func_comefroms.drain(..) {
            let sym = self
                .symtab
                .get(None, &patch.name)
                .copied()
                .ok_or_else(|| Error::Codegen {
                    node: 0,
                    line: 0,
                    message: format!("unknown function {}", patch.name),
                })?;
            if !sym.is_func || sym.num_args != patch.num_args {
                return Err(Error::Codegen {
                    node: 0,
                    line: 0,
                    message: format!(
                        "function {} expects {} arguments, got {}",
                        patch.name, sym.num_args, patch.num_args
                    ),
                });
            }
            let bytes = sym.addr.to_le_bytes();
            self.code[patch.pos..patch.pos + 4].copy_from_slice(&bytes);
        }
        Ok(())
    }

    pub fn fresh_label(&mut self) -> String {
        let l = format!("L{}", self.label_counter);
        self.label_counter += 1;
        l
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Literal, NodeKind};
    use crate::bytecode::ValueType;

    fn int_lit(id: usize, v: i64) -> Node {
        Node { id, line: 0, value_type: ValueType::Int, kind: NodeKind::Token(Literal::Int(v)) }
    }

    #[test]
    fn simple_addition_emits_push_push_add_halt() {
        let add = Node {
            id: 2,
            line: 0,
            value_type: ValueType::Int,
            kind: NodeKind::Binary {
                op: "+".to_string(),
                lhs: Box::new(int_lit(0, 1)),
                rhs: Box::new(int_lit(1, 2)),
            },
        };
        let mut cg = CodeGen::new(CodegenMode::Binary);
        cg.generate(&add).unwrap();
        let code = cg.finish().unwrap();
        assert_eq!(code[0], OpCode::Push as u8);
        assert!(code.contains(&(OpCode::Add as u8)));
        assert_eq!(*code.last().unwrap(), OpCode::Halt as u8);
    }

    #[test]
    fn assignment_pushes_rhs_then_lhs_address_then_wrmem() {
        let assign = Node {
            id: 2,
            line: 0,
            value_type: ValueType::Int,
            kind: NodeKind::Binary {
                op: "=".to_string(),
                lhs: Box::new(Node {
                    id: 0,
                    line: 0,
                    value_type: ValueType::Int,
                    kind: NodeKind::Token(Literal::Ident("a".to_string())),
                }),
                rhs: Box::new(int_lit(1, 5)),
            },
        };
        let mut cg = CodeGen::new(CodegenMode::Binary);
        cg.generate(&assign).unwrap();
        let code = cg.finish().unwrap();
        // PUSH 5 (int literal), PUSH <addr a> (address-typed), WRMEM, HALT
        let wrmem_pos = code.iter().position(|&b| b == OpCode::Wrmem as u8).unwrap();
        assert!(wrmem_pos > 0);
        assert_eq!(code[code.len() - 2], OpCode::Wrmem as u8);
    }
}
