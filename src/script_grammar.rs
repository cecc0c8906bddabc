//! The concrete script-language grammar: terminals, rules, precedence, and
//! the semantic actions that build a [`crate::ast::CstNode`] at each reduce.
//!
//! Grounded in `original_source/src/examples/script.cpp`, which builds this
//! same grammar (statements, an operator-precedence expression grammar,
//! `if`/`else`, `loop`, `func`/`return`/`break`/`continue`, `extern func`
//! declarations) against the original's `Terminal`/`NonTerminal` API. Here
//! the ambiguous single-`Expr` operator grammar is resolved entirely through
//! [`crate::grammar2::Assoc`] precedence climbing, the same technique a
//! yacc-style `%left`/`%right` declaration block uses, rather than by
//! stratifying into one nonterminal per precedence level.

use crate::ast::{CstNode, JumpKind, Literal};
use crate::grammar2::{Assoc, Grammar2, GrammarBuilder, Sym};
use crate::lexer::TokenKind;
use crate::lr1::tables::{ConflictAction, Resolver, ResolverKey};

pub type SemanticAction = fn(Vec<CstNode>) -> CstNode;

pub struct ScriptGrammar {
    pub grammar: Grammar2,
    pub actions: Vec<SemanticAction>,
    pub resolvers: Vec<Resolver>,
}

fn ident_name(n: &CstNode) -> String {
    match n {
        CstNode::Token(Literal::Ident(s)) => s.clone(),
        other => panic!("expected identifier token in semantic action, got {other:?}"),
    }
}

fn list_items(n: CstNode) -> Vec<CstNode> {
    match n {
        CstNode::List(items) => items,
        other => vec![other],
    }
}

// --- Program / statement list --------------------------------------------

fn act_empty_list(_c: Vec<CstNode>) -> CstNode {
    CstNode::List(Vec::new())
}

fn act_append_stmt(mut c: Vec<CstNode>) -> CstNode {
    let stmt = c.pop().unwrap();
    let mut items = list_items(c.pop().unwrap());
    items.push(stmt);
    CstNode::List(items)
}

fn act_delegate_block(mut c: Vec<CstNode>) -> CstNode {
    CstNode::Delegate(Box::new(c.remove(0)))
}

// --- Statements ------------------------------------------------------------

fn act_expr_stmt(mut c: Vec<CstNode>) -> CstNode {
    CstNode::Delegate(Box::new(c.remove(0)))
}

fn act_block(mut c: Vec<CstNode>) -> CstNode {
    // '{' StmtList '}'
    CstNode::Delegate(Box::new(c.remove(1)))
}

fn act_if(mut c: Vec<CstNode>) -> CstNode {
    // 'if' '(' Expr ')' Stmt
    let then_ = Box::new(c.remove(4));
    let cond = Box::new(c.remove(2));
    CstNode::Condition { cond, then_, else_: None }
}

fn act_if_else(mut c: Vec<CstNode>) -> CstNode {
    // 'if' '(' Expr ')' Stmt 'else' Stmt
    let else_ = Some(Box::new(c.remove(6)));
    let then_ = Box::new(c.remove(4));
    let cond = Box::new(c.remove(2));
    CstNode::Condition { cond, then_, else_ }
}

fn act_loop(mut c: Vec<CstNode>) -> CstNode {
    // 'loop' '(' Expr ')' Stmt
    let body = Box::new(c.remove(4));
    let cond = Box::new(c.remove(2));
    CstNode::Loop { cond, body }
}

fn act_func_decl(mut c: Vec<CstNode>) -> CstNode {
    // 'func' ident '(' ParamList ')' Block
    let body = Box::new(c.remove(5));
    let params = list_items(c.remove(3));
    let name = ident_name(&c.remove(1));
    let args = params.iter().map(ident_name).collect();
    CstNode::Func { name, args, body }
}

fn act_extern_decl(mut c: Vec<CstNode>) -> CstNode {
    // 'extern' 'func' IdentList ';'
    let idents = list_items(c.remove(2));
    let idents = idents.iter().map(ident_name).collect();
    CstNode::Declare { is_external: true, is_func: true, idents }
}

fn act_return_expr(mut c: Vec<CstNode>) -> CstNode {
    // 'return' Expr ';'
    CstNode::Jump { kind: JumpKind::Return, expr: Some(Box::new(c.remove(1))), depth: None }
}

fn act_return_void(_c: Vec<CstNode>) -> CstNode {
    CstNode::Jump { kind: JumpKind::Return, expr: None, depth: None }
}

fn act_break(_c: Vec<CstNode>) -> CstNode {
    CstNode::Jump { kind: JumpKind::Break, expr: None, depth: None }
}

fn act_break_depth(mut c: Vec<CstNode>) -> CstNode {
    // 'break' int ';'
    CstNode::Jump { kind: JumpKind::Break, expr: None, depth: Some(Box::new(c.remove(1))) }
}

fn act_continue(_c: Vec<CstNode>) -> CstNode {
    CstNode::Jump { kind: JumpKind::Continue, expr: None, depth: None }
}

fn act_continue_depth(mut c: Vec<CstNode>) -> CstNode {
    CstNode::Jump { kind: JumpKind::Continue, expr: None, depth: Some(Box::new(c.remove(1))) }
}

fn act_empty_stmt(_c: Vec<CstNode>) -> CstNode {
    CstNode::Empty
}

// --- Expressions -------------------------------------------------------

// The `Expr op Expr` shape pops 3 children: [lhs, operator-token(unused),
// rhs]. A dedicated action per operator avoids storing the operator string
// at runtime (the grammar rule already fixes it).
macro_rules! binary_action {
    ($fn_name:ident, $op:expr) => {
        fn $fn_name(mut c: Vec<CstNode>) -> CstNode {
            let rhs = Box::new(c.remove(2));
            let lhs = Box::new(c.remove(0));
            CstNode::Binary { op: $op.to_string(), lhs, rhs }
        }
    };
}

binary_action!(act_add, "+");
binary_action!(act_sub, "-");
binary_action!(act_mul, "*");
binary_action!(act_div, "/");
binary_action!(act_mod, "%");
binary_action!(act_pow, "^");
binary_action!(act_lt, "<");
binary_action!(act_gt, ">");
binary_action!(act_leq, "<=");
binary_action!(act_geq, ">=");
binary_action!(act_eq, "==");
binary_action!(act_neq, "!=");
binary_action!(act_and, "&&");
binary_action!(act_or, "||");
binary_action!(act_assign, "=");

macro_rules! unary_action {
    ($fn_name:ident, $op:expr) => {
        fn $fn_name(mut c: Vec<CstNode>) -> CstNode {
            let child = Box::new(c.remove(1));
            CstNode::Unary { op: $op, child }
        }
    };
}

unary_action!(act_neg, '-');
unary_action!(act_pos, '+');
unary_action!(act_not, '!');

fn act_group(mut c: Vec<CstNode>) -> CstNode {
    // '(' Expr ')'
    CstNode::Delegate(Box::new(c.remove(1)))
}

fn act_call(mut c: Vec<CstNode>) -> CstNode {
    // ident '(' ArgList ')'
    let args = list_items(c.remove(2));
    let name = ident_name(&c.remove(0));
    CstNode::FuncCall { name, args }
}

fn act_leaf(mut c: Vec<CstNode>) -> CstNode {
    c.remove(0)
}

/// Builds the full script grammar: terminals with precedence/associativity,
/// every statement and expression rule, its semantic action, and the single
/// dangling-`else` resolver that could not be expressed through precedence
/// alone.
pub fn build() -> ScriptGrammar {
    let mut b = GrammarBuilder::new();
    let mut actions: Vec<SemanticAction> = Vec::new();

    macro_rules! add_rule {
        ($lhs:expr, $rhs:expr, $action:expr) => {{
            let idx = b.rule($lhs, $rhs, actions.len(), None);
            actions.push($action);
            idx
        }};
        ($lhs:expr, $rhs:expr, $action:expr, $prec:expr) => {{
            let idx = b.rule($lhs, $rhs, actions.len(), Some($prec));
            actions.push($action);
            idx
        }};
    }

    let t_int = b.terminal("int");
    let t_real = b.terminal("real");
    let t_str = b.terminal("str");
    let t_ident = b.terminal("ident");

    let t_assign = b.terminal_prec("=", Some(1), Assoc::Right);
    let t_oror = b.terminal_prec("||", Some(2), Assoc::Left);
    let t_andand = b.terminal_prec("&&", Some(3), Assoc::Left);
    let t_eq = b.terminal_prec("==", Some(4), Assoc::Left);
    let t_neq = b.terminal_prec("!=", Some(4), Assoc::Left);
    let t_lt = b.terminal_prec("<", Some(5), Assoc::Left);
    let t_gt = b.terminal_prec(">", Some(5), Assoc::Left);
    let t_leq = b.terminal_prec("<=", Some(5), Assoc::Left);
    let t_geq = b.terminal_prec(">=", Some(5), Assoc::Left);
    let t_plus = b.terminal_prec("+", Some(6), Assoc::Left);
    let t_minus = b.terminal_prec("-", Some(6), Assoc::Left);
    let t_star = b.terminal_prec("*", Some(7), Assoc::Left);
    let t_slash = b.terminal_prec("/", Some(7), Assoc::Left);
    let t_percent = b.terminal_prec("%", Some(7), Assoc::Left);
    let t_caret = b.terminal_prec("^", Some(8), Assoc::Right);
    let t_bang = b.terminal_prec("!", Some(9), Assoc::Right);

    let t_lparen = b.terminal("(");
    let t_rparen = b.terminal(")");
    let t_lbrace = b.terminal("{");
    let t_rbrace = b.terminal("}");
    let t_semi = b.terminal(";");
    let t_comma = b.terminal(",");

    let t_if = b.terminal("if");
    let t_else = b.terminal("else");
    let t_loop = b.terminal("loop");
    let t_func = b.terminal("func");
    let t_extern = b.terminal("extern");
    let t_return = b.terminal("return");
    let t_break = b.terminal("break");
    let t_continue = b.terminal("continue");

    let program = b.nonterminal("Program");
    let stmt_list = b.nonterminal("StmtList");
    let stmt = b.nonterminal("Stmt");
    let block = b.nonterminal("Block");
    let expr = b.nonterminal("Expr");
    let arg_list = b.nonterminal("ArgList");
    let arg_list_ne = b.nonterminal("ArgListNE");
    let param_list = b.nonterminal("ParamList");
    let param_list_ne = b.nonterminal("ParamListNE");
    let ident_list = b.nonterminal("IdentList");

    // Program -> StmtList
    add_rule!(program, vec![Sym::NonTerminal(stmt_list)], act_delegate_block);

    // StmtList -> /* empty */ | StmtList Stmt
    add_rule!(stmt_list, vec![Sym::Eps], act_empty_list);
    add_rule!(stmt_list, vec![Sym::NonTerminal(stmt_list), Sym::NonTerminal(stmt)], act_append_stmt);

    // Stmt forms
    add_rule!(stmt, vec![Sym::NonTerminal(expr), Sym::Terminal(t_semi)], act_expr_stmt);
    add_rule!(stmt, vec![Sym::NonTerminal(block)], act_delegate_block);
    add_rule!(
        stmt,
        vec![
            Sym::Terminal(t_if),
            Sym::Terminal(t_lparen),
            Sym::NonTerminal(expr),
            Sym::Terminal(t_rparen),
            Sym::NonTerminal(stmt),
        ],
        act_if
    );
    add_rule!(
        stmt,
        vec![
            Sym::Terminal(t_if),
            Sym::Terminal(t_lparen),
            Sym::NonTerminal(expr),
            Sym::Terminal(t_rparen),
            Sym::NonTerminal(stmt),
            Sym::Terminal(t_else),
            Sym::NonTerminal(stmt),
        ],
        act_if_else
    );
    add_rule!(
        stmt,
        vec![
            Sym::Terminal(t_loop),
            Sym::Terminal(t_lparen),
            Sym::NonTerminal(expr),
            Sym::Terminal(t_rparen),
            Sym::NonTerminal(stmt),
        ],
        act_loop
    );
    add_rule!(
        stmt,
        vec![
            Sym::Terminal(t_func),
            Sym::Terminal(t_ident),
            Sym::Terminal(t_lparen),
            Sym::NonTerminal(param_list),
            Sym::Terminal(t_rparen),
            Sym::NonTerminal(block),
        ],
        act_func_decl
    );
    add_rule!(
        stmt,
        vec![Sym::Terminal(t_extern), Sym::Terminal(t_func), Sym::NonTerminal(ident_list), Sym::Terminal(t_semi)],
        act_extern_decl
    );
    add_rule!(stmt, vec![Sym::Terminal(t_return), Sym::NonTerminal(expr), Sym::Terminal(t_semi)], act_return_expr);
    add_rule!(stmt, vec![Sym::Terminal(t_return), Sym::Terminal(t_semi)], act_return_void);
    add_rule!(stmt, vec![Sym::Terminal(t_break), Sym::Terminal(t_semi)], act_break);
    add_rule!(stmt, vec![Sym::Terminal(t_break), Sym::Terminal(t_int), Sym::Terminal(t_semi)], act_break_depth);
    add_rule!(stmt, vec![Sym::Terminal(t_continue), Sym::Terminal(t_semi)], act_continue);
    add_rule!(
        stmt,
        vec![Sym::Terminal(t_continue), Sym::Terminal(t_int), Sym::Terminal(t_semi)],
        act_continue_depth
    );
    add_rule!(stmt, vec![Sym::Terminal(t_semi)], act_empty_stmt);

    // Block -> '{' StmtList '}'
    add_rule!(block, vec![Sym::Terminal(t_lbrace), Sym::NonTerminal(stmt_list), Sym::Terminal(t_rbrace)], act_block);

    // Expr, ambiguous operator grammar resolved by precedence/associativity.
    add_rule!(expr, vec![Sym::NonTerminal(expr), Sym::Terminal(t_plus), Sym::NonTerminal(expr)], act_add);
    add_rule!(expr, vec![Sym::NonTerminal(expr), Sym::Terminal(t_minus), Sym::NonTerminal(expr)], act_sub);
    add_rule!(expr, vec![Sym::NonTerminal(expr), Sym::Terminal(t_star), Sym::NonTerminal(expr)], act_mul);
    add_rule!(expr, vec![Sym::NonTerminal(expr), Sym::Terminal(t_slash), Sym::NonTerminal(expr)], act_div);
    add_rule!(expr, vec![Sym::NonTerminal(expr), Sym::Terminal(t_percent), Sym::NonTerminal(expr)], act_mod);
    add_rule!(expr, vec![Sym::NonTerminal(expr), Sym::Terminal(t_caret), Sym::NonTerminal(expr)], act_pow);
    add_rule!(expr, vec![Sym::NonTerminal(expr), Sym::Terminal(t_lt), Sym::NonTerminal(expr)], act_lt);
    add_rule!(expr, vec![Sym::NonTerminal(expr), Sym::Terminal(t_gt), Sym::NonTerminal(expr)], act_gt);
    add_rule!(expr, vec![Sym::NonTerminal(expr), Sym::Terminal(t_leq), Sym::NonTerminal(expr)], act_leq);
    add_rule!(expr, vec![Sym::NonTerminal(expr), Sym::Terminal(t_geq), Sym::NonTerminal(expr)], act_geq);
    add_rule!(expr, vec![Sym::NonTerminal(expr), Sym::Terminal(t_eq), Sym::NonTerminal(expr)], act_eq);
    add_rule!(expr, vec![Sym::NonTerminal(expr), Sym::Terminal(t_neq), Sym::NonTerminal(expr)], act_neq);
    add_rule!(expr, vec![Sym::NonTerminal(expr), Sym::Terminal(t_andand), Sym::NonTerminal(expr)], act_and);
    add_rule!(expr, vec![Sym::NonTerminal(expr), Sym::Terminal(t_oror), Sym::NonTerminal(expr)], act_or);
    add_rule!(expr, vec![Sym::NonTerminal(expr), Sym::Terminal(t_assign), Sym::NonTerminal(expr)], act_assign);

    // Unary operators, explicit precedence override (binds tighter than any
    // binary operator, including exponentiation).
    add_rule!(expr, vec![Sym::Terminal(t_minus), Sym::NonTerminal(expr)], act_neg, 9);
    add_rule!(expr, vec![Sym::Terminal(t_plus), Sym::NonTerminal(expr)], act_pos, 9);
    add_rule!(expr, vec![Sym::Terminal(t_bang), Sym::NonTerminal(expr)], act_not, 9);

    add_rule!(expr, vec![Sym::Terminal(t_lparen), Sym::NonTerminal(expr), Sym::Terminal(t_rparen)], act_group);
    add_rule!(
        expr,
        vec![Sym::Terminal(t_ident), Sym::Terminal(t_lparen), Sym::NonTerminal(arg_list), Sym::Terminal(t_rparen)],
        act_call
    );
    add_rule!(expr, vec![Sym::Terminal(t_ident)], act_leaf);
    add_rule!(expr, vec![Sym::Terminal(t_int)], act_leaf);
    add_rule!(expr, vec![Sym::Terminal(t_real)], act_leaf);
    add_rule!(expr, vec![Sym::Terminal(t_str)], act_leaf);

    // ArgList -> /* empty */ | ArgListNE
    add_rule!(arg_list, vec![Sym::Eps], act_empty_list);
    add_rule!(arg_list, vec![Sym::NonTerminal(arg_list_ne)], act_leaf);
    add_rule!(arg_list_ne, vec![Sym::NonTerminal(expr)], |mut c| CstNode::List(vec![c.remove(0)]));
    add_rule!(
        arg_list_ne,
        vec![Sym::NonTerminal(arg_list_ne), Sym::Terminal(t_comma), Sym::NonTerminal(expr)],
        act_append_stmt
    );

    // ParamList -> /* empty */ | ParamListNE
    add_rule!(param_list, vec![Sym::Eps], act_empty_list);
    add_rule!(param_list, vec![Sym::NonTerminal(param_list_ne)], act_leaf);
    add_rule!(param_list_ne, vec![Sym::Terminal(t_ident)], |mut c| CstNode::List(vec![c.remove(0)]));
    add_rule!(
        param_list_ne,
        vec![Sym::NonTerminal(param_list_ne), Sym::Terminal(t_comma), Sym::Terminal(t_ident)],
        act_append_stmt
    );

    // IdentList -> ident | IdentList ',' ident
    add_rule!(ident_list, vec![Sym::Terminal(t_ident)], |mut c| CstNode::List(vec![c.remove(0)]));
    add_rule!(
        ident_list,
        vec![Sym::NonTerminal(ident_list), Sym::Terminal(t_comma), Sym::Terminal(t_ident)],
        act_append_stmt
    );

    let aug_idx = actions.len();
    actions.push(act_leaf);
    let grammar = b.build(program, aug_idx);

    let resolvers = vec![Resolver {
        key: ResolverKey::Lhs(stmt),
        lookahead: Sym::Terminal(t_else),
        action: ConflictAction::ForceShift,
    }];

    ScriptGrammar { grammar, actions, resolvers }
}

/// Maps a lexed token to the terminal name used in [`build`]. Kept
/// independent of the grammar's interned ids so the lexer has no knowledge
/// of grammar internals.
pub fn terminal_name_for_token(tok: &TokenKind) -> &'static str {
    match tok {
        TokenKind::Int(_) => "int",
        TokenKind::Real(_) => "real",
        TokenKind::Str(_) => "str",
        TokenKind::Ident(_) => "ident",
        TokenKind::Plus => "+",
        TokenKind::Minus => "-",
        TokenKind::Star => "*",
        TokenKind::Slash => "/",
        TokenKind::Percent => "%",
        TokenKind::Caret => "^",
        TokenKind::LParen => "(",
        TokenKind::RParen => ")",
        TokenKind::LBrace => "{",
        TokenKind::RBrace => "}",
        TokenKind::Semi => ";",
        TokenKind::Comma => ",",
        TokenKind::Assign => "=",
        TokenKind::Lt => "<",
        TokenKind::Gt => ">",
        TokenKind::Leq => "<=",
        TokenKind::Geq => ">=",
        TokenKind::Eq => "==",
        TokenKind::Neq => "!=",
        TokenKind::AndAnd => "&&",
        TokenKind::OrOr => "||",
        TokenKind::Bang => "!",
        TokenKind::KwIf => "if",
        TokenKind::KwElse => "else",
        TokenKind::KwLoop => "loop",
        TokenKind::KwFunc => "func",
        TokenKind::KwExtern => "extern",
        TokenKind::KwReturn => "return",
        TokenKind::KwBreak => "break",
        TokenKind::KwContinue => "continue",
        TokenKind::End => "$",
    }
}

/// Converts a shifted token directly into the leaf [`CstNode`] pushed onto
/// the parser's value stack.
pub fn token_to_cst(tok: &TokenKind) -> CstNode {
    match tok {
        TokenKind::Int(i) => CstNode::Token(Literal::Int(*i)),
        TokenKind::Real(r) => CstNode::Token(Literal::Real(*r)),
        TokenKind::Str(s) => CstNode::Token(Literal::Str(s.clone())),
        TokenKind::Ident(s) => CstNode::Token(Literal::Ident(s.clone())),
        other => CstNode::Token(Literal::Ident(terminal_name_for_token(other).to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar2::analysis;
    use crate::lr1::collection::Collection;
    use crate::lr1::tables::build_tables;

    #[test]
    fn script_grammar_builds_lalr_tables_without_conflict() {
        let sg = build();
        let first = analysis::compute_first_sets(&sg.grammar);
        let canonical = Collection::build(&sg.grammar, &first);
        let lalr = canonical.to_lalr();
        let tables = build_tables(&sg.grammar, &lalr, &sg.resolvers).unwrap();
        assert!(tables.shift.rows.len() > 1);
    }
}
