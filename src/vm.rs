//! Stack-based bytecode VM.
//!
//! Ported from `original_source/src/vm/vm.cpp`'s fetch/execute loop and
//! call/return frame management. Two redesigns relative to the C++
//! original, recorded in `DESIGN.md`:
//!
//! - Addressable memory is `Vec<Value>` (one slot per value, `bool`/`int`/
//!   `real`/`str`/`addr` alike) rather than a raw byte array threaded
//!   through `t_vm_type_size` arithmetic — idiomatic for a Rust VM with no
//!   `unsafe`, and it sidesteps the original's separate fixed-width/
//!   variable-width (string) addressing paths entirely.
//! - The call frame stores its own argument count (`saved_num_args`), so
//!   [`Vm::arg_addr`] resolves `BaseReg::BpArg` in O(1) without walking
//!   argument cells — see `crate::codegen`'s module doc for the full
//!   rationale (Open Question 1).

use crate::bytecode::{BaseReg, OpCode, Value, ValueType};
use crate::error::Error;
use std::collections::HashMap;

pub type ExternFn = fn(&[Value]) -> Result<Value, Error>;

pub struct Vm {
    code: Vec<u8>,
    mem: Vec<Value>,
    ip: usize,
    sp: usize,
    bp: usize,
    gbp: usize,
    halted: bool,
    extern_funcs: HashMap<String, ExternFn>,
}

const DEFAULT_MEM_SIZE: usize = 4096;

impl Vm {
    pub fn new(code: Vec<u8>, global_slots: usize) -> Self {
        let mut vm = Self {
            code,
            mem: Vec::new(),
            ip: 0,
            sp: 0,
            bp: 0,
            gbp: 0,
            halted: false,
            extern_funcs: HashMap::new(),
        };
        vm.reset(global_slots, DEFAULT_MEM_SIZE);
        vm.register_default_externs();
        vm
    }

    pub fn reset(&mut self, global_slots: usize, mem_size: usize) {
        self.mem = vec![Value::Int(0); mem_size.max(global_slots + 64)];
        self.ip = 0;
        self.gbp = 0;
        self.bp = global_slots;
        self.sp = global_slots;
        self.halted = false;
    }

    pub fn register_extern(&mut self, name: &str, f: ExternFn) {
        self.extern_funcs.insert(name.to_string(), f);
    }

    fn register_default_externs(&mut self) {
        self.register_extern("print", |args| {
            let rendered: Vec<String> = args.iter().map(render_value).collect();
            println!("{}", rendered.join(" "));
            Ok(Value::Int(0))
        });
        self.register_extern("len", |args| match args.first() {
            Some(Value::Str(s)) => Ok(Value::Int(s.chars().count() as i64)),
            _ => Ok(Value::Int(0)),
        });
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn bp(&self) -> usize {
        self.bp
    }

    /// The value at the top of the stack, if any is above the current frame
    /// base — the result of the last expression statement a script ran.
    pub fn top(&self) -> Option<&Value> {
        if self.sp == 0 {
            None
        } else {
            self.mem.get(self.sp - 1)
        }
    }

    /// Runs to completion (`HALT`) or until an error occurs. `IP` wraps
    /// modulo the code length on overrun per the bounds-checking contract.
    pub fn run(&mut self) -> Result<(), Error> {
        while !self.halted {
            self.step()?;
        }
        Ok(())
    }

    pub fn step(&mut self) -> Result<(), Error> {
        if self.ip >= self.code.len() {
            self.ip %= self.code.len().max(1);
        }
        let byte = self.code[self.ip];
        let op = OpCode::from_byte(byte).ok_or_else(|| Error::Vm {
            ip: self.ip as i32,
            opcode: format!("0x{byte:02x}"),
            message: "invalid opcode".to_string(),
        })?;
        self.ip += 1;
        self.exec(op)
    }

    fn fetch_value(&mut self) -> Result<Value, Error> {
        let (v, consumed) = Value::decode_from(&self.code[self.ip..]).ok_or_else(|| Error::Vm {
            ip: self.ip as i32,
            opcode: "PUSH".to_string(),
            message: "malformed operand".to_string(),
        })?;
        self.ip += consumed;
        Ok(v)
    }

    fn fetch_i32(&mut self) -> i32 {
        let bytes: [u8; 4] = self.code[self.ip..self.ip + 4].try_into().unwrap();
        self.ip += 4;
        i32::from_le_bytes(bytes)
    }

    fn fetch_i64(&mut self) -> i64 {
        let bytes: [u8; 8] = self.code[self.ip..self.ip + 8].try_into().unwrap();
        self.ip += 8;
        i64::from_le_bytes(bytes)
    }

    fn push(&mut self, v: Value) -> Result<(), Error> {
        self.check_bounds(self.sp)?;
        self.mem[self.sp] = v;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, Error> {
        if self.sp == 0 {
            return Err(Error::Vm {
                ip: self.ip as i32,
                opcode: "POP".to_string(),
                message: "stack underflow".to_string(),
            });
        }
        self.sp -= 1;
        Ok(self.mem[self.sp].clone())
    }

    fn check_bounds(&self, addr: usize) -> Result<(), Error> {
        if addr >= self.mem.len() {
            return Err(Error::Vm {
                ip: self.ip as i32,
                opcode: "MEM".to_string(),
                message: format!("address {addr} out of bounds (memory size {})", self.mem.len()),
            });
        }
        Ok(())
    }

    /// Resolves `BaseReg::BpArg` (a 1-based argument index) to an absolute
    /// slot, reading the frame's own `saved_num_args` bookkeeping slot.
    fn arg_addr(&self, index: i32) -> Result<usize, Error> {
        let num_args = match self.mem.get(self.bp.wrapping_sub(1)) {
            Some(Value::Int(n)) => *n,
            _ => {
                return Err(Error::Vm {
                    ip: self.ip as i32,
                    opcode: "ARGADDR".to_string(),
                    message: "corrupt call frame: missing saved arg count".to_string(),
                })
            }
        };
        let base = self.bp as i64 - 3 - num_args;
        Ok((base + index as i64 - 1) as usize)
    }

    fn resolve_addr(&self, addr: i32, base: BaseReg) -> Result<usize, Error> {
        let resolved = match base {
            BaseReg::Mem => addr as i64,
            BaseReg::Gbp => self.gbp as i64 + addr as i64,
            BaseReg::Bp => self.bp as i64 + addr as i64,
            BaseReg::Sp => self.sp as i64 + addr as i64,
            BaseReg::Ip => self.ip as i64 + addr as i64,
            BaseReg::BpArg => return self.arg_addr(addr),
        };
        if resolved < 0 {
            return Err(Error::Vm {
                ip: self.ip as i32,
                opcode: "ADDR".to_string(),
                message: format!("negative resolved address {resolved}"),
            });
        }
        Ok(resolved as usize)
    }

    fn read_mem(&self, addr: usize) -> Result<Value, Error> {
        self.check_bounds(addr)?;
        Ok(self.mem[addr].clone())
    }

    fn write_mem(&mut self, addr: usize, v: Value) -> Result<(), Error> {
        self.check_bounds(addr)?;
        self.mem[addr] = v;
        Ok(())
    }

    fn pop_addr(&mut self) -> Result<usize, Error> {
        match self.pop()? {
            Value::Addr(a, base) => self.resolve_addr(a, base),
            other => Err(Error::Vm {
                ip: self.ip as i32,
                opcode: "ADDR".to_string(),
                message: format!("expected an address, found {other:?}"),
            }),
        }
    }

    fn pop_int(&mut self) -> Result<i64, Error> {
        match self.pop()? {
            Value::Int(i) => Ok(i),
            Value::Bool(b) => Ok(b as i64),
            Value::Real(r) => Ok(r as i64),
            other => Err(Error::Vm { ip: self.ip as i32, opcode: "INT".to_string(), message: format!("expected int, found {other:?}") }),
        }
    }

    fn pop_bool(&mut self) -> Result<bool, Error> {
        match self.pop()? {
            Value::Bool(b) => Ok(b),
            Value::Int(i) => Ok(i != 0),
            other => Err(Error::Vm { ip: self.ip as i32, opcode: "BOOL".to_string(), message: format!("expected bool, found {other:?}") }),
        }
    }

    fn exec(&mut self, op: OpCode) -> Result<(), Error> {
        match op {
            OpCode::Halt => self.halted = true,
            OpCode::Nop => {}

            OpCode::Push => {
                let v = self.fetch_value()?;
                self.push(v)?;
            }
            OpCode::Deref | OpCode::Rdmem => {
                let addr = self.pop_addr()?;
                let v = self.read_mem(addr)?;
                self.push(v)?;
            }
            OpCode::Wrmem => {
                let addr = self.pop_addr()?;
                let v = self.pop()?;
                self.write_mem(addr, v.clone())?;
                self.push(v)?;
            }

            OpCode::Usub => {
                let v = self.pop()?;
                let neg = match v {
                    Value::Int(i) => Value::Int(-i),
                    Value::Real(r) => Value::Real(-r),
                    other => return Err(type_err(self.ip, "USUB", &other)),
                };
                self.push(neg)?;
            }

            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Mod | OpCode::Pow => {
                self.exec_arith(op)?;
            }

            OpCode::Toi => {
                let v = self.pop()?;
                self.push(Value::Int(to_int(&v)))?;
            }
            OpCode::Tof => {
                let v = self.pop()?;
                self.push(Value::Real(to_real(&v)))?;
            }
            OpCode::Tos => {
                let v = self.pop()?;
                self.push(Value::Str(render_value(&v)))?;
            }

            OpCode::Jmp => {
                let target = self.fetch_i32();
                self.ip = target.max(0) as usize;
            }
            OpCode::Jmpcnd => {
                let target = self.fetch_i32();
                if self.pop_bool()? {
                    self.ip = target.max(0) as usize;
                }
            }

            OpCode::And => {
                let b = self.pop_bool()?;
                let a = self.pop_bool()?;
                self.push(Value::Bool(a && b))?;
            }
            OpCode::Or => {
                let b = self.pop_bool()?;
                let a = self.pop_bool()?;
                self.push(Value::Bool(a || b))?;
            }
            OpCode::Xor => {
                let b = self.pop_bool()?;
                let a = self.pop_bool()?;
                self.push(Value::Bool(a ^ b))?;
            }
            OpCode::Not => {
                let a = self.pop_bool()?;
                self.push(Value::Bool(!a))?;
            }

            OpCode::Gt | OpCode::Lt | OpCode::Gequ | OpCode::Lequ | OpCode::Equ | OpCode::Nequ => {
                self.exec_compare(op)?;
            }

            OpCode::Call => {
                let target = self.fetch_i32();
                let num_args = self.fetch_i64();
                let return_ip = self.ip as i64;
                self.push(Value::Int(return_ip))?;
                self.push(Value::Int(self.bp as i64))?;
                self.push(Value::Int(num_args))?;
                self.bp = self.sp;
                self.ip = target as usize;
            }
            OpCode::Ret => {
                let ret_val = self.pop()?;
                let num_args = match self.mem[self.bp - 1] {
                    Value::Int(n) => n,
                    _ => 0,
                };
                let saved_bp = match self.mem[self.bp - 2] {
                    Value::Int(n) => n as usize,
                    _ => 0,
                };
                let return_ip = match self.mem[self.bp - 3] {
                    Value::Int(n) => n as usize,
                    _ => 0,
                };
                let frame_start = (self.bp as i64 - 3 - num_args).max(0) as usize;
                self.sp = frame_start;
                self.push(ret_val)?;
                self.bp = saved_bp;
                self.ip = return_ip;
            }
            OpCode::Extcall => {
                let num_args = self.pop_int()?;
                let name = match self.pop()? {
                    Value::Str(s) => s,
                    other => return Err(type_err(self.ip, "EXTCALL", &other)),
                };
                let mut args = Vec::with_capacity(num_args.max(0) as usize);
                for _ in 0..num_args {
                    args.push(self.pop()?);
                }
                args.reverse();
                let f = self.extern_funcs.get(name.as_str()).copied().ok_or_else(|| Error::Vm {
                    ip: self.ip as i32,
                    opcode: "EXTCALL".to_string(),
                    message: format!("unknown external function {name}"),
                })?;
                let result = f(&args)?;
                self.push(result)?;
            }

            OpCode::Binand => self.exec_bitwise(|a, b| a & b)?,
            OpCode::Binor => self.exec_bitwise(|a, b| a | b)?,
            OpCode::Binxor => self.exec_bitwise(|a, b| a ^ b)?,
            OpCode::Shl => self.exec_bitwise(|a, b| a << (b & 63))?,
            OpCode::Shr => self.exec_bitwise(|a, b| a >> (b & 63))?,
            OpCode::Rotl => self.exec_bitwise(|a, b| a.rotate_left((b & 63) as u32))?,
            OpCode::Rotr => self.exec_bitwise(|a, b| a.rotate_right((b & 63) as u32))?,
            OpCode::Binnot => {
                let a = self.pop_int()?;
                self.push(Value::Int(!a))?;
            }
        }
        Ok(())
    }

    fn exec_arith(&mut self, op: OpCode) -> Result<(), Error> {
        let b = self.pop()?;
        let a = self.pop()?;
        let result = match (&a, &b) {
            (Value::Int(x), Value::Int(y)) => match op {
                OpCode::Add => Value::Int(x + y),
                OpCode::Sub => Value::Int(x - y),
                OpCode::Mul => Value::Int(x * y),
                OpCode::Div => Value::Int(x.checked_div(*y).ok_or_else(|| div_zero(self.ip))?),
                OpCode::Mod => Value::Int(x.checked_rem(*y).ok_or_else(|| div_zero(self.ip))?),
                OpCode::Pow => Value::Int(x.pow((*y).max(0) as u32)),
                _ => unreachable!(),
            },
            (Value::Str(x), Value::Str(y)) if op == OpCode::Add => Value::Str(format!("{x}{y}")),
            _ => {
                let x = to_real(&a);
                let y = to_real(&b);
                match op {
                    OpCode::Add => Value::Real(x + y),
                    OpCode::Sub => Value::Real(x - y),
                    OpCode::Mul => Value::Real(x * y),
                    OpCode::Div => Value::Real(x / y),
                    OpCode::Mod => Value::Real(x % y),
                    OpCode::Pow => Value::Real(x.powf(y)),
                    _ => unreachable!(),
                }
            }
        };
        self.push(result)
    }

    fn exec_compare(&mut self, op: OpCode) -> Result<(), Error> {
        let b = self.pop()?;
        let a = self.pop()?;
        let ordering = match (&a, &b) {
            (Value::Int(x), Value::Int(y)) => x.partial_cmp(y),
            (Value::Str(x), Value::Str(y)) => x.partial_cmp(y),
            _ => to_real(&a).partial_cmp(&to_real(&b)),
        }
        .ok_or_else(|| Error::Vm { ip: self.ip as i32, opcode: format!("{op}"), message: "uncomparable values".to_string() })?;
        use std::cmp::Ordering::*;
        let result = match op {
            OpCode::Gt => ordering == Greater,
            OpCode::Lt => ordering == Less,
            OpCode::Gequ => ordering != Less,
            OpCode::Lequ => ordering != Greater,
            OpCode::Equ => ordering == Equal,
            OpCode::Nequ => ordering != Equal,
            _ => unreachable!(),
        };
        self.push(Value::Bool(result))
    }

    fn exec_bitwise(&mut self, f: impl Fn(i64, i64) -> i64) -> Result<(), Error> {
        let b = self.pop_int()?;
        let a = self.pop_int()?;
        self.push(Value::Int(f(a, b)))
    }
}

fn div_zero(ip: usize) -> Error {
    Error::Vm { ip: ip as i32, opcode: "DIV".to_string(), message: "division by zero".to_string() }
}

fn type_err(ip: usize, opcode: &str, v: &Value) -> Error {
    Error::Vm { ip: ip as i32, opcode: opcode.to_string(), message: format!("unexpected operand {v:?}") }
}

fn to_int(v: &Value) -> i64 {
    match v {
        Value::Int(i) => *i,
        Value::Real(r) => *r as i64,
        Value::Bool(b) => *b as i64,
        Value::Str(s) => s.parse().unwrap_or(0),
        Value::Addr(a, _) => *a as i64,
    }
}

fn to_real(v: &Value) -> f64 {
    match v {
        Value::Int(i) => *i as f64,
        Value::Real(r) => *r,
        Value::Bool(b) => *b as i64 as f64,
        Value::Str(s) => s.parse().unwrap_or(0.0),
        Value::Addr(a, _) => *a as f64,
    }
}

fn render_value(v: &Value) -> String {
    match v {
        Value::Int(i) => i.to_string(),
        Value::Real(r) => r.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Str(s) => s.clone(),
        Value::Addr(a, _) => a.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{JumpKind, Literal, Node, NodeKind};
    use crate::codegen::{CodeGen, CodegenMode};

    fn lit_int(id: usize, v: i64) -> Node {
        Node { id, line: 0, value_type: ValueType::Int, kind: NodeKind::Token(Literal::Int(v)) }
    }

    fn run_program(node: &Node) -> Vm {
        let mut cg = CodeGen::new(CodegenMode::Binary);
        cg.generate(node).unwrap();
        let globals = cg.global_slot_count();
        let code = cg.finish().unwrap();
        let mut vm = Vm::new(code, globals);
        vm.run().unwrap();
        vm
    }

    #[test]
    fn addition_leaves_seven_on_stack() {
        let node = Node {
            id: 2,
            line: 0,
            value_type: ValueType::Int,
            kind: NodeKind::Binary {
                op: "+".to_string(),
                lhs: Box::new(lit_int(0, 3)),
                rhs: Box::new(lit_int(1, 4)),
            },
        };
        let vm = run_program(&node);
        assert_eq!(vm.mem[vm.sp - 1], Value::Int(7));
    }

    #[test]
    fn assignment_round_trip_reads_back_same_value() {
        let ident = |id, v: ValueType| Node { id, line: 0, value_type: v, kind: NodeKind::Token(Literal::Ident("a".to_string())) };
        let assign = Node {
            id: 2,
            line: 0,
            value_type: ValueType::Int,
            kind: NodeKind::Binary { op: "=".to_string(), lhs: Box::new(ident(0, ValueType::Int)), rhs: Box::new(lit_int(1, 42)) },
        };
        let read_back = ident(3, ValueType::Int);
        let program = Node { id: 4, line: 0, value_type: ValueType::Int, kind: NodeKind::List(vec![assign, read_back]) };
        let vm = run_program(&program);
        assert_eq!(vm.mem[vm.sp - 1], Value::Int(42));
    }

    #[test]
    fn call_and_return_round_trip_arguments() {
        // func sq(x) { return x*x; } sq(7);
        let x_ident = |id| Node { id, line: 0, value_type: ValueType::Int, kind: NodeKind::Token(Literal::Ident("x".to_string())) };
        let body = Node {
            id: 10,
            line: 0,
            value_type: ValueType::Int,
            kind: NodeKind::Jump {
                kind: JumpKind::Return,
                expr: Some(Box::new(Node {
                    id: 11,
                    line: 0,
                    value_type: ValueType::Int,
                    kind: NodeKind::Binary { op: "*".to_string(), lhs: Box::new(x_ident(12)), rhs: Box::new(x_ident(13)) },
                })),
                depth: 0,
            },
        };
        let func = Node {
            id: 1,
            line: 0,
            value_type: ValueType::Unknown,
            kind: NodeKind::Func { name: "sq".to_string(), args: vec!["x".to_string()], body: Box::new(body) },
        };
        let call = Node {
            id: 2,
            line: 0,
            value_type: ValueType::Int,
            kind: NodeKind::FuncCall { name: "sq".to_string(), args: vec![lit_int(20, 7)] },
        };
        let program = Node { id: 3, line: 0, value_type: ValueType::Int, kind: NodeKind::List(vec![func, call]) };
        let vm = run_program(&program);
        assert_eq!(vm.mem[vm.sp - 1], Value::Int(49));
    }
}
