//! loxvm-compiler - Single-pass bytecode compiler.
//!
//! The compiler drives the scanner and emits instructions straight into a
//! [`Chunk`] as it parses; there is no intermediate tree. Expressions go
//! through a Pratt precedence-climbing parser (see [`rules`]), statements
//! through hand-written compilers that lay out branch and loop jumps with
//! absolute three-byte targets patched after the fact.
//!
//! Error handling follows the panic/synchronize discipline: the first error
//! flips the compiler into panic mode, which suppresses further reports
//! until a statement boundary; a chunk is produced only when no error
//! occurred at all.

pub mod escape;
pub mod locals;
pub mod rules;

use loxvm_bytecode::{Chunk, OpCode};
use loxvm_lex::{Scanner, Token, TokenKind};
use loxvm_runtime::{GlobalVariables, Heap, Value};
use loxvm_util::{ErrorLocation, Handler};

use locals::{DeclareError, Locals, Resolution, Scope};
use rules::{rule_for, Precedence};

/// Compiler health. Any error in `Normal` or `Error` transitions to
/// `Panic`; a synchronization point transitions `Panic` to `Error`; nothing
/// ever transitions back to `Normal`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompileState {
    Normal,
    Error,
    Panic,
}

/// Compiles `source` into a chunk, reporting errors into `handler`.
///
/// Returns `None` when any compile error occurred. String literals are
/// interned into `heap` and global names are assigned slots in `globals`
/// during compilation, so the emitted bytecode can address globals by
/// index.
pub fn compile(
    source: &str,
    heap: &mut Heap,
    globals: &mut GlobalVariables,
    handler: &Handler,
) -> Option<Chunk> {
    Compiler::new(source, heap, globals, handler).run()
}

/// The single-pass compiler state.
pub struct Compiler<'src, 'ctx> {
    scanner: Scanner<'src>,
    pub(crate) current: Token<'src>,
    pub(crate) previous: Token<'src>,
    chunk: Chunk,
    locals: Locals<'src>,
    scope: Scope,
    state: CompileState,
    pub(crate) heap: &'ctx mut Heap,
    pub(crate) globals: &'ctx mut GlobalVariables,
    handler: &'ctx Handler,
}

impl<'src, 'ctx> Compiler<'src, 'ctx> {
    fn new(
        source: &'src str,
        heap: &'ctx mut Heap,
        globals: &'ctx mut GlobalVariables,
        handler: &'ctx Handler,
    ) -> Self {
        Self {
            scanner: Scanner::new(source),
            current: Token::sentinel(),
            previous: Token::sentinel(),
            chunk: Chunk::new(),
            locals: Locals::new(),
            scope: Scope::Global,
            state: CompileState::Normal,
            heap,
            globals,
            handler,
        }
    }

    fn run(mut self) -> Option<Chunk> {
        self.advance();
        while !self.match_token(TokenKind::Eof) {
            self.declaration();
        }
        self.emit_op(OpCode::Return);

        if self.state == CompileState::Normal {
            Some(self.chunk)
        } else {
            None
        }
    }

    // =========================================================================
    // TOKEN STREAM
    // =========================================================================

    /// Moves one token forward, reporting and skipping error tokens until a
    /// real one turns up.
    pub(crate) fn advance(&mut self) {
        self.previous = self.current;
        loop {
            self.current = self.scanner.scan_token();
            if self.current.kind != TokenKind::Error {
                break;
            }
            let message = self.current.lexeme;
            self.error_at_current(message);
        }
    }

    /// Consumes the expected token or reports `message` at the current one.
    pub(crate) fn consume(&mut self, kind: TokenKind, message: &str) {
        if self.current.kind == kind {
            self.advance();
        } else {
            self.error_at_current(message);
        }
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    /// Advances when the current token matches; returns whether it did.
    pub(crate) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    // =========================================================================
    // ERROR REPORTING
    // =========================================================================

    /// Reports at the previous token. In Pratt parsing this is usually the
    /// token whose rule was being applied.
    pub(crate) fn error(&mut self, message: &str) {
        self.error_at(self.previous, message);
    }

    pub(crate) fn error_at_current(&mut self, message: &str) {
        self.error_at(self.current, message);
    }

    pub(crate) fn error_at(&mut self, token: Token<'src>, message: &str) {
        // Panic mode swallows everything until synchronization.
        if self.state == CompileState::Panic {
            return;
        }
        self.state = CompileState::Panic;

        let location = match token.kind {
            TokenKind::Eof => ErrorLocation::AtEnd,
            TokenKind::Error => ErrorLocation::None,
            _ => ErrorLocation::At(token.lexeme.to_string()),
        };
        self.handler.error(token.line, location, message);
    }

    /// Discards tokens until a plausible statement boundary, then drops
    /// from panic mode back to the sticky error state.
    fn synchronize(&mut self) {
        self.state = CompileState::Error;

        while self.current.kind != TokenKind::Eof {
            if self.previous.kind == TokenKind::Semicolon {
                return;
            }
            match self.current.kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {}
            }
            self.advance();
        }
    }

    // =========================================================================
    // EMISSION
    // =========================================================================

    pub(crate) fn emit_op(&mut self, op: OpCode) {
        let line = self.previous.line;
        self.chunk.write_op(op, line);
    }

    pub(crate) fn emit_ops(&mut self, first: OpCode, second: OpCode) {
        self.emit_op(first);
        self.emit_op(second);
    }

    /// Emits an opcode with a short or long operand as the index requires.
    pub(crate) fn emit_indexed(&mut self, op: OpCode, index: usize) {
        let line = self.previous.line;
        if let Err(err) = self.chunk.write_indexed(op, index, line) {
            self.error(&err.to_string());
        }
    }

    pub(crate) fn emit_constant(&mut self, value: Value) {
        let index = self.chunk.add_constant(value);
        self.emit_indexed(OpCode::Constant, index);
    }

    /// Emits a forward jump with a placeholder target; returns the operand
    /// offset to patch once the target is known.
    pub(crate) fn emit_jump(&mut self, op: OpCode) -> usize {
        self.emit_op(op);
        let at = self.chunk.len();
        let line = self.previous.line;
        self.chunk.write_u24(0, line);
        at
    }

    /// Points a previously emitted jump at the current end of code.
    pub(crate) fn patch_jump(&mut self, at: usize) {
        let target = self.chunk.len();
        self.chunk.patch_u24(at, target);
    }

    /// Emits an unconditional jump to a known (backward) target.
    fn emit_jump_to(&mut self, target: usize) {
        self.emit_op(OpCode::JumpLong);
        let line = self.previous.line;
        self.chunk.write_u24(target, line);
    }

    // =========================================================================
    // EXPRESSIONS
    // =========================================================================

    pub(crate) fn expression(&mut self) {
        self.parse_precedence(Precedence::Assignment);
    }

    /// The Pratt core: dispatch the prefix rule for the token just
    /// consumed, then fold infix rules while their precedence holds.
    pub(crate) fn parse_precedence(&mut self, precedence: Precedence) {
        self.advance();
        let can_assign = precedence <= Precedence::Assignment;

        match rule_for(self.previous.kind).prefix {
            Some(prefix) => prefix(self, can_assign),
            None => {
                self.error("Expected expression.");
                return;
            }
        }

        while precedence <= rule_for(self.current.kind).precedence {
            self.advance();
            if let Some(infix) = rule_for(self.previous.kind).infix {
                infix(self, can_assign);
            }
        }

        // A leftover '=' means the prefix handler could not use it as an
        // assignment target.
        if can_assign && self.match_token(TokenKind::Equal) {
            self.error("Invalid assignment target");
        }
    }

    /// Compiles a variable reference or assignment. Local slots win over
    /// globals; unresolved names compile to global accesses because the
    /// declaration may simply not have executed yet.
    pub(crate) fn named_variable(&mut self, token: Token<'src>, can_assign: bool) {
        let (read_op, set_op, index) = match self.locals.resolve(token.lexeme) {
            Resolution::Found(slot) => (OpCode::ReadLocal, OpCode::SetLocal, slot),
            Resolution::Uninitialized => {
                let message = format!(
                    "Cannot access variable '{}' in its own initializer.",
                    token.lexeme
                );
                self.error_at(token, &message);
                return;
            }
            Resolution::NotFound => {
                let name = self.heap.intern(token.lexeme);
                let index = self.globals.index(self.heap.objects(), name);
                (OpCode::ReadGlobal, OpCode::SetGlobal, index)
            }
        };

        if can_assign && self.match_token(TokenKind::Equal) {
            self.expression();
            self.emit_indexed(set_op, index);
        } else {
            self.emit_indexed(read_op, index);
        }
    }

    // =========================================================================
    // DECLARATIONS AND STATEMENTS
    // =========================================================================

    fn declaration(&mut self) {
        if self.match_token(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.statement();
        }

        if self.state == CompileState::Panic {
            self.synchronize();
        }
    }

    fn statement(&mut self) {
        if self.match_token(TokenKind::Print) {
            self.print_statement();
        } else if self.match_token(TokenKind::LeftBrace) {
            self.begin_scope();
            self.block();
            self.end_scope();
        } else if self.match_token(TokenKind::If) {
            self.branch_statement(false);
        } else if self.match_token(TokenKind::Unless) {
            self.branch_statement(true);
        } else if self.match_token(TokenKind::While) {
            self.loop_statement(false);
        } else if self.match_token(TokenKind::Until) {
            self.loop_statement(true);
        } else if self.match_token(TokenKind::For) {
            self.for_statement();
        } else if self.match_token(TokenKind::Match) {
            self.match_statement();
        } else {
            self.expression_statement();
        }
    }

    fn var_declaration(&mut self) {
        self.consume(TokenKind::Identifier, "Expected variable name.");
        let name_token = self.previous;

        // Globals get a store index up front; locals get a stack entry
        // whose depth stays unset until the initializer is compiled.
        let global_index = if self.scope.is_global() {
            let name = self.heap.intern(name_token.lexeme);
            Some(self.globals.index(self.heap.objects(), name))
        } else {
            match self.locals.declare(name_token.lexeme, self.scope.depth()) {
                Ok(()) => {}
                Err(DeclareError::Redefinition) => {
                    let message = format!(
                        "Illegal redefinition of variable '{}'.",
                        name_token.lexeme
                    );
                    self.error_at(name_token, &message);
                }
                Err(DeclareError::TooMany) => {
                    self.error_at(name_token, "Local variable limit exceeded");
                }
            }
            None
        };

        if self.match_token(TokenKind::Equal) {
            self.expression();
        } else {
            self.emit_op(OpCode::Nil);
        }
        self.consume(TokenKind::Semicolon, "Expected ';' to terminate expression");

        match global_index {
            Some(index) => self.emit_indexed(OpCode::DefineGlobal, index),
            // The initializer's value already sits in the local's slot.
            None => self.locals.mark_initialized(self.scope.depth()),
        }
    }

    fn print_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expected ';' to terminate expression");
        self.emit_op(OpCode::Print);
    }

    fn expression_statement(&mut self) {
        self.expression();
        self.consume(TokenKind::Semicolon, "Expected ';' to terminate expression");
        self.emit_op(OpCode::Pop);
    }

    fn begin_scope(&mut self) {
        self.scope.begin();
    }

    /// Closes the scope and pops its locals from the runtime stack, one
    /// `Pop` per slot.
    fn end_scope(&mut self) {
        let depth = self.scope.depth();
        self.scope.end();

        let removed = self.locals.pop_depth(depth);
        for _ in 0..removed {
            self.emit_op(OpCode::Pop);
        }
    }

    fn block(&mut self) {
        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            self.declaration();
        }
        self.consume(TokenKind::RightBrace, "Expected '}' after block.");
    }

    /// `if` and `unless` share one shape; `unless` branches on truth
    /// instead of falsehood and rejects `else`.
    ///
    /// ```text
    /// <cond> ; JiF/JiT L1 ; pop ; <then> ; JUMP L2 ; L1: pop ; <else?> ; L2:
    /// ```
    fn branch_statement(&mut self, inverted: bool) {
        if inverted {
            self.consume(TokenKind::LeftParen, "Expected '(' after 'unless'.");
        } else {
            self.consume(TokenKind::LeftParen, "Expected '(' after 'if'.");
        }
        self.expression();
        self.consume(TokenKind::RightParen, "Expected ')' after expression.");

        let branch_op = if inverted {
            OpCode::JumpIfTrue
        } else {
            OpCode::JumpIfFalse
        };
        let else_jump = self.emit_jump(branch_op);
        self.emit_op(OpCode::Pop);
        self.statement();
        let end_jump = self.emit_jump(OpCode::JumpLong);

        self.patch_jump(else_jump);
        self.emit_op(OpCode::Pop);

        if inverted {
            if self.check(TokenKind::Else) {
                self.error_at_current("'unless' statement cannot have an 'else' clause.");
            }
        } else if self.match_token(TokenKind::Else) {
            self.statement();
        }
        self.patch_jump(end_jump);
    }

    /// `while` and `until`: condition at the top, conditional exit, body,
    /// unconditional jump back.
    ///
    /// ```text
    /// L1: <cond> ; JiF L2 ; pop ; <body> ; JUMP L1 ; L2: pop
    /// ```
    fn loop_statement(&mut self, inverted: bool) {
        let loop_start = self.chunk.len();

        if inverted {
            self.consume(TokenKind::LeftParen, "Expected '(' after 'until'.");
        } else {
            self.consume(TokenKind::LeftParen, "Expected '(' after 'while'.");
        }
        self.expression();
        self.consume(TokenKind::RightParen, "Expected ')' after expression.");

        let exit_op = if inverted {
            OpCode::JumpIfTrue
        } else {
            OpCode::JumpIfFalse
        };
        let exit_jump = self.emit_jump(exit_op);
        self.emit_op(OpCode::Pop);
        self.statement();
        self.emit_jump_to(loop_start);

        self.patch_jump(exit_jump);
        self.emit_op(OpCode::Pop);
    }

    /// `for`, with every clause optional. The step runs after the body and
    /// before the next condition check:
    ///
    /// ```text
    /// <init> ; L1: <cond> ; JiF L2 ; pop ; JUMP L3 ;
    /// L4: <step> ; pop ; JUMP L1 ; L3: <body> ; JUMP L4 ; L2: pop
    /// ```
    fn for_statement(&mut self) {
        self.begin_scope();
        self.consume(TokenKind::LeftParen, "Expected '(' after 'for'.");

        // Initializer clause.
        if self.match_token(TokenKind::Semicolon) {
            // Empty.
        } else if self.match_token(TokenKind::Var) {
            self.var_declaration();
        } else {
            self.expression_statement();
        }

        let mut loop_start = self.chunk.len();

        // Condition clause.
        let mut exit_jump = None;
        if !self.match_token(TokenKind::Semicolon) {
            self.expression();
            self.consume(TokenKind::Semicolon, "Expected ';' to terminate expression");
            exit_jump = Some(self.emit_jump(OpCode::JumpIfFalse));
            self.emit_op(OpCode::Pop);
        }

        // Step clause: emitted before the body but run after it, so the
        // body jumps back here and the step jumps to the condition.
        if !self.match_token(TokenKind::RightParen) {
            let body_jump = self.emit_jump(OpCode::JumpLong);
            let step_start = self.chunk.len();
            self.expression();
            self.emit_op(OpCode::Pop);
            self.consume(TokenKind::RightParen, "Expected ')' after expression.");

            self.emit_jump_to(loop_start);
            loop_start = step_start;
            self.patch_jump(body_jump);
        }

        self.statement();
        self.emit_jump_to(loop_start);

        if let Some(exit) = exit_jump {
            self.patch_jump(exit);
            self.emit_op(OpCode::Pop);
        }
        self.end_scope();
    }

    /// `match`: the scrutinee is evaluated once; each arm compares with the
    /// `Match` opcode, which keeps the scrutinee on the stack when the
    /// pattern misses. An optional `_` arm must come last and consumes the
    /// scrutinee itself; otherwise a final pop discards it so every path
    /// reaches the exit with the same stack depth.
    fn match_statement(&mut self) {
        self.consume(TokenKind::LeftParen, "Expected '(' after 'match'.");
        self.expression();
        self.consume(TokenKind::RightParen, "Expected ')' after expression.");
        self.consume(TokenKind::LeftBrace, "Expected '{' before 'match' arms.");

        let mut exit_jumps = Vec::new();
        let mut arms = 0usize;
        let mut saw_wildcard = false;

        while !self.check(TokenKind::RightBrace) && !self.check(TokenKind::Eof) {
            if saw_wildcard {
                self.error_at_current("'match' catch-all arm must be last.");
            }

            if self.check(TokenKind::Identifier) && self.current.lexeme == "_" {
                self.advance();
                self.consume(TokenKind::Arrow, "Expected '->' after 'match' arm pattern.");
                self.emit_op(OpCode::Pop);
                self.statement();
                saw_wildcard = true;
            } else {
                self.expression();
                self.consume(TokenKind::Arrow, "Expected '->' after 'match' arm pattern.");
                self.emit_op(OpCode::Match);
                let next_arm = self.emit_jump(OpCode::JumpIfFalse);
                self.emit_op(OpCode::Pop);
                self.statement();
                exit_jumps.push(self.emit_jump(OpCode::JumpLong));
                self.patch_jump(next_arm);
                self.emit_op(OpCode::Pop);
            }

            arms += 1;
            if self.state == CompileState::Panic {
                break;
            }
        }

        if arms == 0 {
            self.error("A 'match' statement requires at least one arm.");
        }
        if !saw_wildcard {
            self.emit_op(OpCode::Pop);
        }
        for at in exit_jumps {
            self.patch_jump(at);
        }
        self.consume(TokenKind::RightBrace, "Expected '}' after 'match' arms.");
    }
}
