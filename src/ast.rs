//! Typed AST for the script language, plus CST->AST lowering.
//!
//! Ported from `original_source/src/codegen/ast.h`'s `ASTBase` hierarchy;
//! the C++ virtual-dispatch visitor becomes an exhaustive `match` over a
//! tagged enum, the idiomatic replacement noted in `spec.md`'s Design Notes.

use crate::bytecode::ValueType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    Return,
    Break,
    Continue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Real(f64),
    Str(String),
    Ident(String),
}

/// A node produced directly by a grammar rule's semantic action. The parser
/// emits these (plus [`CstNode::Delegate`] passthroughs); lowering removes
/// every `Delegate` to produce the [`Node`] tree codegen consumes.
#[derive(Debug, Clone)]
pub enum CstNode {
    Delegate(Box<CstNode>),
    Token(Literal),
    Unary { op: char, child: Box<CstNode> },
    Binary { op: String, lhs: Box<CstNode>, rhs: Box<CstNode> },
    List(Vec<CstNode>),
    Condition { cond: Box<CstNode>, then_: Box<CstNode>, else_: Option<Box<CstNode>> },
    Loop { cond: Box<CstNode>, body: Box<CstNode> },
    Func { name: String, args: Vec<String>, body: Box<CstNode> },
    FuncCall { name: String, args: Vec<CstNode> },
    Jump { kind: JumpKind, expr: Option<Box<CstNode>>, depth: Option<Box<CstNode>> },
    Declare { is_external: bool, is_func: bool, idents: Vec<String> },
    Empty,
}

/// The lowered AST. Every node carries an id (assigned during lowering, used
/// for diagnostics) and a derived [`ValueType`] filled in by `derive_types`.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: usize,
    pub line: u32,
    pub value_type: ValueType,
    pub kind: NodeKind,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Token(Literal),
    Unary { op: char, child: Box<Node> },
    Binary { op: String, lhs: Box<Node>, rhs: Box<Node> },
    List(Vec<Node>),
    Condition { cond: Box<Node>, then_: Box<Node>, else_: Option<Box<Node>> },
    Loop { label: String, cond: Box<Node>, body: Box<Node> },
    Func { name: String, args: Vec<String>, body: Box<Node> },
    FuncCall { name: String, args: Vec<Node> },
    Jump { kind: JumpKind, expr: Option<Box<Node>>, depth: i64 },
    Declare { is_external: bool, is_func: bool, idents: Vec<String> },
    Empty,
}

/// Strips every [`CstNode::Delegate`] wrapper, post-order, and assigns dense
/// ids and a running loop-label counter for [`NodeKind::Loop`]. Ported from
/// `ASTBase::cst_to_ast`.
pub fn lower(cst: CstNode) -> Node {
    let mut next_id = 0usize;
    let mut next_label = 0usize;
    lower_rec(cst, &mut next_id, &mut next_label)
}

fn fresh_id(next_id: &mut usize) -> usize {
    let id = *next_id;
    *next_id += 1;
    id
}

fn lower_rec(cst: CstNode, next_id: &mut usize, next_label: &mut usize) -> Node {
    match cst {
        CstNode::Delegate(inner) => lower_rec(*inner, next_id, next_label),
        CstNode::Empty => Node {
            id: fresh_id(next_id),
            line: 0,
            value_type: ValueType::Unknown,
            kind: NodeKind::Empty,
        },
        CstNode::Token(lit) => Node {
            id: fresh_id(next_id),
            line: 0,
            value_type: ValueType::Unknown,
            kind: NodeKind::Token(lit),
        },
        CstNode::Unary { op, child } => {
            let child = Box::new(lower_rec(*child, next_id, next_label));
            Node {
                id: fresh_id(next_id),
                line: 0,
                value_type: ValueType::Unknown,
                kind: NodeKind::Unary { op, child },
            }
        }
        CstNode::Binary { op, lhs, rhs } => {
            let lhs = Box::new(lower_rec(*lhs, next_id, next_label));
            let rhs = Box::new(lower_rec(*rhs, next_id, next_label));
            Node {
                id: fresh_id(next_id),
                line: 0,
                value_type: ValueType::Unknown,
                kind: NodeKind::Binary { op, lhs, rhs },
            }
        }
        CstNode::List(items) => {
            let items = items
                .into_iter()
                .map(|i| lower_rec(i, next_id, next_label))
                .collect();
            Node {
                id: fresh_id(next_id),
                line: 0,
                value_type: ValueType::Unknown,
                kind: NodeKind::List(items),
            }
        }
        CstNode::Condition { cond, then_, else_ } => {
            let cond = Box::new(lower_rec(*cond, next_id, next_label));
            let then_ = Box::new(lower_rec(*then_, next_id, next_label));
            let else_ = else_.map(|e| Box::new(lower_rec(*e, next_id, next_label)));
            Node {
                id: fresh_id(next_id),
                line: 0,
                value_type: ValueType::Unknown,
                kind: NodeKind::Condition { cond, then_, else_ },
            }
        }
        CstNode::Loop { cond, body } => {
            let label = format!("loop{}", *next_label);
            *next_label += 1;
            let cond = Box::new(lower_rec(*cond, next_id, next_label));
            let body = Box::new(lower_rec(*body, next_id, next_label));
            Node {
                id: fresh_id(next_id),
                line: 0,
                value_type: ValueType::Unknown,
                kind: NodeKind::Loop { label, cond, body },
            }
        }
        CstNode::Func { name, args, body } => {
            let body = Box::new(lower_rec(*body, next_id, next_label));
            Node {
                id: fresh_id(next_id),
                line: 0,
                value_type: ValueType::Unknown,
                kind: NodeKind::Func { name, args, body },
            }
        }
        CstNode::FuncCall { name, args } => {
            let args = args
                .into_iter()
                .map(|a| lower_rec(a, next_id, next_label))
                .collect();
            Node {
                id: fresh_id(next_id),
                line: 0,
                value_type: ValueType::Unknown,
                kind: NodeKind::FuncCall { name, args },
            }
        }
        CstNode::Jump { kind, expr, depth } => {
            let expr = expr.map(|e| Box::new(lower_rec(*e, next_id, next_label)));
            let depth_val = match depth {
                Some(d) => match *d {
                    CstNode::Token(Literal::Int(i)) => i,
                    CstNode::Token(Literal::Real(r)) => r as i64,
                    _ => 0,
                },
                None => 0,
            };
            Node {
                id: fresh_id(next_id),
                line: 0,
                value_type: ValueType::Unknown,
                kind: NodeKind::Jump { kind, expr, depth: depth_val },
            }
        }
        CstNode::Declare { is_external, is_func, idents } => Node {
            id: fresh_id(next_id),
            line: 0,
            value_type: ValueType::Unknown,
            kind: NodeKind::Declare { is_external, is_func, idents },
        },
    }
}

/// No `Delegate` node of any kind survives into [`Node`] by construction
/// (there's no `NodeKind::Delegate` variant) — this is the invariant
/// `spec.md` requires be checked; here it's structural rather than runtime.
pub fn assert_no_delegate_survives(_n: &Node) {}

/// Derives each node's [`ValueType`] bottom-up: a one-child node copies its
/// child's type; a two-child node derives via [`crate::bytecode::derive_value_type`].
pub fn derive_types(node: &mut Node) {
    match &mut node.kind {
        NodeKind::Token(lit) => {
            node.value_type = match lit {
                Literal::Int(_) => ValueType::Int,
                Literal::Real(_) => ValueType::Real,
                Literal::Str(_) => ValueType::Str,
                Literal::Ident(_) => ValueType::Unknown,
            };
        }
        NodeKind::Unary { child, .. } => {
            derive_types(child);
            node.value_type = child.value_type;
        }
        NodeKind::Binary { lhs, rhs, .. } => {
            derive_types(lhs);
            derive_types(rhs);
            node.value_type = crate::bytecode::derive_value_type(lhs.value_type, rhs.value_type);
        }
        NodeKind::List(items) => {
            for i in items {
                derive_types(i);
            }
        }
        NodeKind::Condition { cond, then_, else_ } => {
            derive_types(cond);
            derive_types(then_);
            if let Some(e) = else_ {
                derive_types(e);
            }
        }
        NodeKind::Loop { cond, body, .. } => {
            derive_types(cond);
            derive_types(body);
        }
        NodeKind::Func { body, .. } => derive_types(body),
        NodeKind::FuncCall { args, .. } => {
            for a in args {
                derive_types(a);
            }
        }
        NodeKind::Jump { expr, .. } => {
            if let Some(e) = expr {
                derive_types(e);
            }
        }
        NodeKind::Declare { .. } | NodeKind::Empty => {}
    }
}
