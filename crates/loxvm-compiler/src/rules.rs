//! Pratt parse rules: precedence levels and the token-to-handler table.
//!
//! Every token kind maps to a `(prefix, infix, precedence)` triple. The
//! parser dispatches the prefix handler for the token that starts an
//! expression, then folds infix handlers while the next token's precedence
//! holds. The table is data; the handlers are plain functions over the
//! compiler state.

use loxvm_bytecode::OpCode;
use loxvm_lex::TokenKind;
use loxvm_runtime::Value;

use crate::escape::render_escapes;
use crate::Compiler;

/// Parse precedence, lowest to highest. `Joined` is the reserved level
/// between `None` and assignment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    None,
    Joined,
    /// `=`
    Assignment,
    /// `or`
    Or,
    /// `and`
    And,
    /// `==` `!=`
    Equality,
    /// `<` `>` `<=` `>=`
    Comparison,
    /// `+` `-`
    Term,
    /// `*` `/`
    Factor,
    /// `!` unary `-`
    Unary,
    /// `.` `()`
    Call,
    /// Literals and groupings
    Primary,
}

impl Precedence {
    /// One level tighter; left-associative infix operators parse their
    /// right-hand side at this level. Saturates at `Primary`.
    pub fn next(self) -> Precedence {
        use Precedence::*;
        match self {
            None => Joined,
            Joined => Assignment,
            Assignment => Or,
            Or => And,
            And => Equality,
            Equality => Comparison,
            Comparison => Term,
            Term => Factor,
            Factor => Unary,
            Unary => Call,
            Call => Primary,
            Primary => Primary,
        }
    }
}

/// A parser action from the rule table. Handlers receive the whole compiler
/// plus whether the surrounding context permits assignment.
pub type ParseFn = for<'src, 'ctx> fn(&mut Compiler<'src, 'ctx>, bool);

/// One row of the rule table.
#[derive(Clone, Copy)]
pub struct ParseRule {
    pub prefix: Option<ParseFn>,
    pub infix: Option<ParseFn>,
    pub precedence: Precedence,
}

macro_rules! rule {
    ($prefix:expr, $infix:expr, $precedence:expr) => {
        ParseRule {
            prefix: $prefix,
            infix: $infix,
            precedence: $precedence,
        }
    };
}

/// The static rule table.
#[rustfmt::skip]
pub fn rule_for(kind: TokenKind) -> ParseRule {
    use TokenKind::*;
    match kind {
        //                    Prefix          Infix            Precedence
        LeftParen    => rule!(Some(grouping), None,            Precedence::None),
        Minus        => rule!(Some(unary),    Some(binary),    Precedence::Term),
        Plus         => rule!(None,           Some(binary),    Precedence::Term),
        Slash        => rule!(None,           Some(binary),    Precedence::Factor),
        Star         => rule!(None,           Some(binary),    Precedence::Factor),
        Bang         => rule!(Some(unary),    None,            Precedence::None),
        BangEqual    => rule!(None,           Some(binary),    Precedence::Equality),
        EqualEqual   => rule!(None,           Some(binary),    Precedence::Equality),
        Greater      => rule!(None,           Some(binary),    Precedence::Comparison),
        GreaterEqual => rule!(None,           Some(binary),    Precedence::Comparison),
        Less         => rule!(None,           Some(binary),    Precedence::Comparison),
        LessEqual    => rule!(None,           Some(binary),    Precedence::Comparison),
        Identifier   => rule!(Some(variable), None,            Precedence::None),
        String       => rule!(Some(string),   None,            Precedence::None),
        Number       => rule!(Some(number),   None,            Precedence::None),
        And          => rule!(None,           Some(and_op),    Precedence::And),
        Or           => rule!(None,           Some(or_op),     Precedence::Or),
        False        => rule!(Some(literal),  None,            Precedence::None),
        Nil          => rule!(Some(literal),  None,            Precedence::None),
        True         => rule!(Some(literal),  None,            Precedence::None),
        _            => rule!(None,           None,            Precedence::None),
    }
}

/// `(` as a prefix: a parenthesized expression.
fn grouping(c: &mut Compiler, _can_assign: bool) {
    c.expression();
    c.consume(TokenKind::RightParen, "Expected ')' after expression.");
}

/// A number literal.
fn number(c: &mut Compiler, _can_assign: bool) {
    match c.previous.lexeme.parse::<f64>() {
        Ok(value) => c.emit_constant(Value::Number(value)),
        // The scanner only produces digit shapes, so this is unreachable in
        // practice, but a parse bug should surface as a diagnostic.
        Err(_) => c.error("Invalid number literal."),
    }
}

/// A string literal: strip the quotes, decode escapes, intern, emit.
fn string(c: &mut Compiler, _can_assign: bool) {
    let lexeme = c.previous.lexeme;
    debug_assert!(lexeme.len() >= 2, "string lexeme keeps its quotes");
    let contents = &lexeme[1..lexeme.len() - 1];

    match render_escapes(contents) {
        Ok(text) => {
            let reference = c.heap.intern(&text);
            c.emit_constant(Value::Obj(reference));
        }
        Err(err) => c.error(&err.to_string()),
    }
}

/// `nil`, `true`, `false`.
fn literal(c: &mut Compiler, _can_assign: bool) {
    match c.previous.kind {
        TokenKind::Nil => c.emit_op(OpCode::Nil),
        TokenKind::True => c.emit_op(OpCode::True),
        TokenKind::False => c.emit_op(OpCode::False),
        _ => unreachable!("literal rule dispatched for {:?}", c.previous.kind),
    }
}

/// A variable reference or assignment; the only handler that uses
/// `can_assign`.
fn variable(c: &mut Compiler, can_assign: bool) {
    let token = c.previous;
    c.named_variable(token, can_assign);
}

/// Unary prefix operators.
fn unary(c: &mut Compiler, _can_assign: bool) {
    let operator = c.previous.kind;

    // Operand first, so it lands on the stack.
    c.parse_precedence(Precedence::Unary);

    match operator {
        TokenKind::Bang => c.emit_op(OpCode::Not),
        TokenKind::Minus => c.emit_op(OpCode::Negate),
        _ => unreachable!("unary rule dispatched for {:?}", operator),
    }
}

/// Binary infix operators. The right operand parses one level tighter, so
/// chains associate left.
fn binary(c: &mut Compiler, _can_assign: bool) {
    let operator = c.previous.kind;
    let rule = rule_for(operator);
    c.parse_precedence(rule.precedence.next());

    match operator {
        TokenKind::Plus => c.emit_op(OpCode::Add),
        TokenKind::Minus => c.emit_op(OpCode::Subtract),
        TokenKind::Star => c.emit_op(OpCode::Multiply),
        TokenKind::Slash => c.emit_op(OpCode::Divide),
        TokenKind::EqualEqual => c.emit_op(OpCode::Equal),
        TokenKind::BangEqual => c.emit_ops(OpCode::Equal, OpCode::Not),
        TokenKind::Less => c.emit_op(OpCode::Less),
        TokenKind::LessEqual => c.emit_ops(OpCode::Greater, OpCode::Not),
        TokenKind::Greater => c.emit_op(OpCode::Greater),
        TokenKind::GreaterEqual => c.emit_ops(OpCode::Less, OpCode::Not),
        _ => unreachable!("binary rule dispatched for {:?}", operator),
    }
}

/// `and` short-circuits on a falsey left operand.
fn and_op(c: &mut Compiler, _can_assign: bool) {
    let end_jump = c.emit_jump(OpCode::JumpIfFalse);
    c.emit_op(OpCode::Pop);
    c.parse_precedence(Precedence::And);
    c.patch_jump(end_jump);
}

/// `or` short-circuits on a truthy left operand.
fn or_op(c: &mut Compiler, _can_assign: bool) {
    let end_jump = c.emit_jump(OpCode::JumpIfTrue);
    c.emit_op(OpCode::Pop);
    c.parse_precedence(Precedence::Or);
    c.patch_jump(end_jump);
}
