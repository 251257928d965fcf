//! Recursive-descent parser with operator-precedence climbing for
//! expressions. Consumes [`Token`]s from the [`Lexer`] and emits [`IrId`]
//! cells into an [`IrArena`] — the parser's job stops at positioned,
//! list-structured IR; `build.rs` lifts that IR into the typed AST.
//!
//! Every IR cell the parser emits is tagged by a `Sym` head naming the
//! production that built it (`"binary"`, `"call"`, `"for-of"`, …); `build.rs`
//! matches on that tag. Atoms (`Num`, `Str`, `Bool`, `BigInt`, `Nil`) are the
//! leaves.

use crate::diagnostics::{ParseError, ParseErrorKind};
use crate::ir::{Atom, IrArena, IrId};
use crate::lexer::{Lexer, RegexContext};
use crate::source::{SourceHandle, SourceRef};
use crate::token::{Keyword, Punct, Token, TokenKind};

/// Mirrors `parse.rs`'s `MAX_NESTING_DEPTH`: bounds recursive-descent depth
/// so pathological input (`((((((...`) fails with a catchable `ParseError`
/// instead of overflowing the Rust stack.
const MAX_NESTING_DEPTH: u32 = 256;

pub(crate) struct ParseOutput {
    pub arena: IrArena,
    pub program: IrId,
}

pub(crate) fn parse(handle: SourceHandle) -> Result<ParseOutput, ParseError> {
    let mut parser = Parser::new(handle)?;
    let program = parser.parse_program()?;
    Ok(ParseOutput { arena: parser.arena, program })
}

struct Parser {
    lexer: Lexer,
    arena: IrArena,
    cur: Token,
    depth: u32,
}

impl Parser {
    fn new(handle: SourceHandle) -> Result<Self, ParseError> {
        let mut lexer = Lexer::new(handle);
        let cur = lexer.next_token(RegexContext::Allowed)?;
        Ok(Self { lexer, arena: IrArena::new(), cur, depth: 0 })
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.error(ParseErrorKind::NestingTooDeep));
        }
        Ok(())
    }

    fn exit(&mut self) {
        self.depth -= 1;
    }

    fn error(&self, kind: ParseErrorKind) -> ParseError {
        ParseError::new(kind, self.cur.source_ref.handle.clone(), self.cur.source_ref.start_line, self.cur.source_ref.start_column)
    }

    fn regex_ctx(&self) -> RegexContext {
        match &self.cur.kind {
            TokenKind::Identifier(_)
            | TokenKind::Number(_)
            | TokenKind::String(_)
            | TokenKind::Keyword(Keyword::This)
            | TokenKind::Punct(Punct::RParen | Punct::RBracket) => RegexContext::Disallowed,
            _ => RegexContext::Allowed,
        }
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let ctx = self.regex_ctx();
        let next = self.lexer.next_token(ctx)?;
        Ok(std::mem::replace(&mut self.cur, next))
    }

    fn is_punct(&self, p: Punct) -> bool {
        matches!(&self.cur.kind, TokenKind::Punct(x) if *x == p)
    }

    fn is_keyword(&self, k: Keyword) -> bool {
        matches!(&self.cur.kind, TokenKind::Keyword(x) if *x == k)
    }

    fn is_ident(&self, s: &str) -> bool {
        matches!(&self.cur.kind, TokenKind::Identifier(name) if name == s)
    }

    fn eat_punct(&mut self, p: Punct) -> Result<bool, ParseError> {
        if self.is_punct(p) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_punct(&mut self, p: Punct) -> Result<SourceRef, ParseError> {
        if self.is_punct(p) {
            Ok(self.advance()?.source_ref)
        } else {
            Err(self.error(ParseErrorKind::UnexpectedToken(format!("{:?}, expected {:?}", self.cur.kind, p))))
        }
    }

    fn eat_ident(&mut self, s: &str) -> Result<bool, ParseError> {
        if self.is_ident(s) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Reads an identifier name, accepting contextual keywords used as plain
    /// names (e.g. `obj.get`, `let async = 1`).
    fn ident_name(&mut self) -> Result<String, ParseError> {
        match self.cur.kind.clone() {
            TokenKind::Identifier(name) => {
                self.advance()?;
                Ok(name)
            }
            _ => Err(self.error(ParseErrorKind::UnexpectedToken(format!("{:?}, expected identifier", self.cur.kind)))),
        }
    }

    /// Automatic semicolon insertion: accepts an explicit `;`, or infers one
    /// before `}`, at EOF, or across a line break.
    fn consume_semicolon(&mut self) -> Result<(), ParseError> {
        if self.eat_punct(Punct::Semi)? {
            return Ok(());
        }
        if self.is_punct(Punct::RBrace) || matches!(self.cur.kind, TokenKind::Eof) || self.cur.preceded_by_newline {
            return Ok(());
        }
        Err(self.error(ParseErrorKind::UnexpectedToken(format!("{:?}, expected ;", self.cur.kind))))
    }

    // ---- leaves -----------------------------------------------------

    fn leaf(&mut self, atom: Atom, sref: SourceRef) -> IrId {
        self.arena.alloc(atom, vec![], Some(sref))
    }

    fn sym_leaf(&mut self, s: &'static str) -> IrId {
        self.arena.alloc(Atom::Sym(s), vec![], None)
    }

    fn node(&mut self, tag: &'static str, children: Vec<IrId>, sref: SourceRef) -> IrId {
        self.arena.alloc(Atom::Sym(tag), children, Some(sref))
    }

    fn str_leaf(&mut self, s: String, sref: Option<SourceRef>) -> IrId {
        self.arena.alloc(Atom::Str(s), vec![], sref)
    }

    fn bool_leaf(&mut self, b: bool) -> IrId {
        self.arena.alloc(Atom::Bool(b), vec![], None)
    }

    // ---- program / statements ----------------------------------------

    fn parse_program(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        let mut body = vec![];
        while !matches!(self.cur.kind, TokenKind::Eof) {
            body.push(self.parse_statement()?);
        }
        let end = self.cur.source_ref.clone();
        Ok(self.node("program", body, start.merge(&end)))
    }

    fn parse_statement(&mut self) -> Result<IrId, ParseError> {
        self.enter()?;
        let r = self.parse_statement_inner();
        self.exit();
        r
    }

    fn parse_statement_inner(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        match &self.cur.kind {
            TokenKind::Punct(Punct::LBrace) => self.parse_block(),
            TokenKind::Punct(Punct::Semi) => {
                self.advance()?;
                Ok(self.node("empty", vec![], start))
            }
            TokenKind::Keyword(Keyword::Var) => self.parse_var_decl(VarKeyword::Var),
            TokenKind::Keyword(Keyword::Let) => self.parse_var_decl(VarKeyword::Let),
            TokenKind::Keyword(Keyword::Const) => self.parse_var_decl(VarKeyword::Const),
            TokenKind::Keyword(Keyword::Function) => self.parse_function_decl(false),
            TokenKind::Identifier(name) if name == "async" && self.next_is_keyword_function() => {
                self.advance()?;
                self.parse_function_decl(true)
            }
            TokenKind::Keyword(Keyword::Class) => self.parse_class_decl(),
            TokenKind::Keyword(Keyword::If) => self.parse_if(),
            TokenKind::Keyword(Keyword::For) => self.parse_for(),
            TokenKind::Keyword(Keyword::While) => self.parse_while(),
            TokenKind::Keyword(Keyword::Do) => self.parse_do_while(),
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch(),
            TokenKind::Keyword(Keyword::Try) => self.parse_try(),
            TokenKind::Keyword(Keyword::Throw) => self.parse_throw(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return(),
            TokenKind::Keyword(Keyword::Break) => self.parse_break_continue(true),
            TokenKind::Keyword(Keyword::Continue) => self.parse_break_continue(false),
            TokenKind::Keyword(Keyword::Debugger) => {
                self.advance()?;
                self.consume_semicolon()?;
                Ok(self.node("debugger", vec![], start))
            }
            TokenKind::Identifier(_) if self.is_labeled_statement() => self.parse_labeled(),
            _ => {
                let expr = self.parse_expression()?;
                self.consume_semicolon()?;
                let end = start.merge(&self.cur.source_ref);
                Ok(self.node("expr-stmt", vec![expr], end))
            }
        }
    }

    /// True if the token after the current `async` identifier is `function`
    /// on the same line — the only shape that makes `async` a declaration
    /// keyword rather than a plain identifier or arrow-function introducer.
    fn next_is_keyword_function(&self) -> bool {
        let mut lookahead = self.lexer.clone();
        matches!(
            lookahead.next_token(RegexContext::Allowed),
            Ok(t) if !t.preceded_by_newline && matches!(t.kind, TokenKind::Keyword(Keyword::Function))
        )
    }

    /// True if the current identifier is immediately followed by `:`,
    /// meaning it's a statement label rather than an expression.
    fn is_labeled_statement(&self) -> bool {
        if !matches!(self.cur.kind, TokenKind::Identifier(_)) {
            return false;
        }
        let mut lookahead = self.lexer.clone();
        matches!(lookahead.next_token(RegexContext::Allowed), Ok(t) if matches!(t.kind, TokenKind::Punct(Punct::Colon)))
    }

    fn parse_labeled(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        let name = self.ident_name()?;
        self.expect_punct(Punct::Colon)?;
        let body = self.parse_statement()?;
        let label_leaf = self.str_leaf(name, None);
        let end = self.cur.source_ref.clone();
        Ok(self.node("labeled", vec![label_leaf, body], start.merge(&end)))
    }

    fn parse_block(&mut self) -> Result<IrId, ParseError> {
        let start = self.expect_punct(Punct::LBrace)?;
        let mut body = vec![];
        while !self.is_punct(Punct::RBrace) && !matches!(self.cur.kind, TokenKind::Eof) {
            body.push(self.parse_statement()?);
        }
        let end = self.expect_punct(Punct::RBrace)?;
        Ok(self.node("block", body, start.merge(&end)))
    }

    fn parse_var_decl(&mut self, kw: VarKeyword) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        self.advance()?;
        let kind_leaf = self.sym_leaf(kw.as_str());
        let mut children = vec![kind_leaf];
        loop {
            let pattern = self.parse_binding_pattern()?;
            let init = if self.eat_punct(Punct::Eq)? { Some(self.parse_assignment_expr()?) } else { None };
            if kw == VarKeyword::Const && init.is_none() {
                return Err(self.error(ParseErrorKind::ConstWithoutInitializer));
            }
            let decl_start = start.clone();
            let decl_end = self.cur.source_ref.clone();
            let mut decl_children = vec![pattern];
            if let Some(init) = init {
                decl_children.push(init);
            }
            children.push(self.node("declarator", decl_children, decl_start.merge(&decl_end)));
            if !self.eat_punct(Punct::Comma)? {
                break;
            }
        }
        self.consume_semicolon()?;
        let end = self.cur.source_ref.clone();
        Ok(self.node("var-decl", children, start.merge(&end)))
    }

    fn parse_if(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        self.advance()?;
        self.expect_punct(Punct::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;
        let consequent = self.parse_statement()?;
        let mut children = vec![test, consequent];
        if self.eat_ident_keyword_else()? {
            children.push(self.parse_statement()?);
        }
        let end = self.cur.source_ref.clone();
        Ok(self.node("if", children, start.merge(&end)))
    }

    fn eat_ident_keyword_else(&mut self) -> Result<bool, ParseError> {
        if self.is_keyword(Keyword::Else) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn parse_while(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        self.advance()?;
        self.expect_punct(Punct::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;
        let body = self.parse_statement()?;
        let end = self.cur.source_ref.clone();
        Ok(self.node("while", vec![test, body], start.merge(&end)))
    }

    fn parse_do_while(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        self.advance()?;
        let body = self.parse_statement()?;
        if !self.is_keyword(Keyword::While) {
            return Err(self.error(ParseErrorKind::UnexpectedToken("expected 'while'".to_owned())));
        }
        self.advance()?;
        self.expect_punct(Punct::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;
        let _ = self.eat_punct(Punct::Semi)?;
        let end = self.cur.source_ref.clone();
        Ok(self.node("do-while", vec![body, test], start.merge(&end)))
    }

    fn parse_for(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        self.advance()?;
        let is_await = self.is_ident("await");
        if is_await {
            self.advance()?;
        }
        self.expect_punct(Punct::LParen)?;

        let binding_kind = if self.is_keyword(Keyword::Var) {
            self.advance()?;
            Some(VarKeyword::Var)
        } else if self.is_keyword(Keyword::Let) {
            self.advance()?;
            Some(VarKeyword::Let)
        } else if self.is_keyword(Keyword::Const) {
            self.advance()?;
            Some(VarKeyword::Const)
        } else {
            None
        };

        if self.is_punct(Punct::Semi) {
            return self.parse_for_classic(start, None);
        }

        let pattern_or_expr = if binding_kind.is_some() {
            self.parse_binding_pattern()?
        } else {
            self.parse_assignment_expr_no_in()?
        };

        // Only a classic C-style for-loop carries a `= init` expression here;
        // for-in/for-of bindings never do.
        let mut classic_init_expr = None;
        if binding_kind.is_some() && self.is_punct(Punct::Eq) {
            self.advance()?;
            classic_init_expr = Some(self.parse_assignment_expr_no_in()?);
        }

        if classic_init_expr.is_none() && (self.is_ident("of") || self.is_keyword(Keyword::In)) {
            let is_of = self.is_ident("of");
            self.advance()?;
            let right = self.parse_assignment_expr()?;
            self.expect_punct(Punct::RParen)?;
            let body = self.parse_statement()?;
            let kind_sym = self.sym_leaf(binding_kind.map_or("assign", VarKeyword::as_str));
            let end = self.cur.source_ref.clone();
            return if is_of {
                let await_leaf = self.bool_leaf(is_await);
                Ok(self.node("for-of", vec![await_leaf, kind_sym, pattern_or_expr, right, body], start.merge(&end)))
            } else {
                Ok(self.node("for-in", vec![kind_sym, pattern_or_expr, right, body], start.merge(&end)))
            };
        }

        // classic C-style for: pattern_or_expr is the init clause.
        let init = if binding_kind.is_some() {
            let kind_sym = self.sym_leaf(binding_kind.unwrap().as_str());
            let mut decl_children = vec![pattern_or_expr];
            if let Some(e) = classic_init_expr {
                decl_children.push(e);
            }
            let decl_end = self.cur.source_ref.clone();
            let declarator = self.node("declarator", decl_children, decl_end.clone());
            Some(self.node("var-decl", vec![kind_sym, declarator], decl_end))
        } else {
            let end = self.cur.source_ref.clone();
            Some(self.node("expr-stmt", vec![pattern_or_expr], end))
        };
        self.parse_for_classic(start, init)
    }

    fn parse_for_classic(&mut self, start: SourceRef, init: Option<IrId>) -> Result<IrId, ParseError> {
        self.expect_punct(Punct::Semi)?;
        let test = if self.is_punct(Punct::Semi) { None } else { Some(self.parse_expression()?) };
        self.expect_punct(Punct::Semi)?;
        let update = if self.is_punct(Punct::RParen) { None } else { Some(self.parse_expression()?) };
        self.expect_punct(Punct::RParen)?;
        let body = self.parse_statement()?;

        let nil = self.arena.alloc(Atom::Nil, vec![], None);
        let init = init.unwrap_or(nil);
        let test = test.unwrap_or(nil);
        let update = update.unwrap_or(nil);
        let end = self.cur.source_ref.clone();
        Ok(self.node("for", vec![init, test, update, body], start.merge(&end)))
    }

    fn parse_switch(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        self.advance()?;
        self.expect_punct(Punct::LParen)?;
        let discriminant = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;
        self.expect_punct(Punct::LBrace)?;
        let mut cases = vec![discriminant];
        while !self.is_punct(Punct::RBrace) {
            let case_start = self.cur.source_ref.clone();
            if self.is_keyword(Keyword::Case) {
                self.advance()?;
                let test = self.parse_expression()?;
                self.expect_punct(Punct::Colon)?;
                let mut body = vec![test];
                while !self.is_keyword(Keyword::Case) && !self.is_keyword(Keyword::Default) && !self.is_punct(Punct::RBrace) {
                    body.push(self.parse_statement()?);
                }
                let end = self.cur.source_ref.clone();
                cases.push(self.node("case", body, case_start.merge(&end)));
            } else if self.is_keyword(Keyword::Default) {
                self.advance()?;
                self.expect_punct(Punct::Colon)?;
                let mut body = vec![];
                while !self.is_keyword(Keyword::Case) && !self.is_keyword(Keyword::Default) && !self.is_punct(Punct::RBrace) {
                    body.push(self.parse_statement()?);
                }
                let end = self.cur.source_ref.clone();
                cases.push(self.node("default-case", body, case_start.merge(&end)));
            } else {
                return Err(self.error(ParseErrorKind::UnexpectedToken(format!("{:?}", self.cur.kind))));
            }
        }
        let end = self.expect_punct(Punct::RBrace)?;
        Ok(self.node("switch", cases, start.merge(&end)))
    }

    fn parse_try(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        self.advance()?;
        let block = self.parse_block()?;
        let mut children = vec![block];
        if self.is_keyword(Keyword::Catch) {
            let catch_start = self.cur.source_ref.clone();
            self.advance()?;
            let param = if self.eat_punct(Punct::LParen)? {
                let p = self.parse_binding_pattern()?;
                self.expect_punct(Punct::RParen)?;
                Some(p)
            } else {
                None
            };
            let body = self.parse_block()?;
            let mut catch_children = vec![];
            if let Some(p) = param {
                catch_children.push(p);
            }
            catch_children.push(body);
            let end = self.cur.source_ref.clone();
            children.push(self.node("catch", catch_children, catch_start.merge(&end)));
        }
        if self.is_keyword(Keyword::Finally) {
            let fin_start = self.cur.source_ref.clone();
            self.advance()?;
            let body = self.parse_block()?;
            let end = self.cur.source_ref.clone();
            children.push(self.node("finally", vec![body], fin_start.merge(&end)));
        }
        let end = self.cur.source_ref.clone();
        Ok(self.node("try", children, start.merge(&end)))
    }

    fn parse_throw(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        self.advance()?;
        let arg = self.parse_expression()?;
        self.consume_semicolon()?;
        let end = self.cur.source_ref.clone();
        Ok(self.node("throw", vec![arg], start.merge(&end)))
    }

    fn parse_return(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        self.advance()?;
        let mut children = vec![];
        if !self.is_punct(Punct::Semi) && !self.is_punct(Punct::RBrace) && !matches!(self.cur.kind, TokenKind::Eof) && !self.cur.preceded_by_newline {
            children.push(self.parse_expression()?);
        }
        self.consume_semicolon()?;
        let end = self.cur.source_ref.clone();
        Ok(self.node("return", children, start.merge(&end)))
    }

    fn parse_break_continue(&mut self, is_break: bool) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        self.advance()?;
        let mut children = vec![];
        if let TokenKind::Identifier(_) = &self.cur.kind {
            if !self.cur.preceded_by_newline {
                let name = self.ident_name()?;
                children.push(self.str_leaf(name, None));
            }
        }
        self.consume_semicolon()?;
        let end = self.cur.source_ref.clone();
        let tag = if is_break { "break" } else { "continue" };
        Ok(self.node(tag, children, start.merge(&end)))
    }

    fn parse_function_decl(&mut self, is_async: bool) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        self.advance()?; // 'function'
        let is_generator = self.eat_punct(Punct::Star)?;
        let name = self.ident_name()?;
        let def = self.parse_function_rest(is_async, is_generator, "normal")?;
        let end = self.cur.source_ref.clone();
        let name_leaf = self.str_leaf(name, None);
        Ok(self.node("func-decl", vec![name_leaf, def], start.merge(&end)))
    }

    /// Parses `(params) { body }` given the keyword and name have already
    /// been consumed. `kind` is the `Sym` tag recorded for `FunctionKind`.
    fn parse_function_rest(&mut self, is_async: bool, is_generator: bool, kind: &'static str) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        let params = self.parse_params()?;
        let body = self.parse_block()?;
        let is_async_leaf = self.bool_leaf(is_async);
        let is_gen_leaf = self.bool_leaf(is_generator);
        let kind_leaf = self.sym_leaf(kind);
        let end = self.cur.source_ref.clone();
        Ok(self.node("func", vec![params, body, is_async_leaf, is_gen_leaf, kind_leaf], start.merge(&end)))
    }

    fn parse_params(&mut self) -> Result<IrId, ParseError> {
        let start = self.expect_punct(Punct::LParen)?;
        let mut params = vec![];
        while !self.is_punct(Punct::RParen) {
            let param_start = self.cur.source_ref.clone();
            let is_rest = self.eat_punct(Punct::DotDotDot)?;
            let pattern = self.parse_binding_pattern()?;
            let default = if self.eat_punct(Punct::Eq)? { Some(self.parse_assignment_expr()?) } else { None };
            let is_rest_leaf = self.bool_leaf(is_rest);
            let mut children = vec![pattern, is_rest_leaf];
            if let Some(d) = default {
                children.push(d);
            }
            let end = self.cur.source_ref.clone();
            params.push(self.node("param", children, param_start.merge(&end)));
            if !self.eat_punct(Punct::Comma)? {
                break;
            }
        }
        let end = self.expect_punct(Punct::RParen)?;
        Ok(self.node("params", params, start.merge(&end)))
    }

    fn parse_class_decl(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        let def = self.parse_class_common()?;
        let name = self.extract_class_name(def);
        Ok(self.node("class-decl", vec![self.str_leaf(name, None), def], start.merge(&self.cur.source_ref.clone())))
    }

    fn extract_class_name(&self, class_node: IrId) -> String {
        let cell = self.arena.get(class_node);
        if let Some(first) = cell.rest.first() {
            if let Atom::Str(s) = &self.arena.get(*first).head {
                return s.clone();
            }
        }
        "<anonymous>".to_owned()
    }

    fn parse_class_common(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        self.advance()?; // 'class'
        let name = if let TokenKind::Identifier(_) = &self.cur.kind { Some(self.ident_name()?) } else { None };
        let superclass = if self.is_keyword(Keyword::Extends) {
            self.advance()?;
            Some(self.parse_lhs_expr()?)
        } else {
            None
        };
        self.expect_punct(Punct::LBrace)?;
        let mut children = vec![];
        let name_leaf = self.str_leaf(name.unwrap_or_default(), None);
        children.push(name_leaf);
        if let Some(sc) = superclass {
            children.push(self.node("has-super", vec![sc], self.cur.source_ref.clone()));
        } else {
            children.push(self.node("no-super", vec![], self.cur.source_ref.clone()));
        }
        while !self.is_punct(Punct::RBrace) {
            if self.eat_punct(Punct::Semi)? {
                continue;
            }
            children.push(self.parse_class_member()?);
        }
        let end = self.expect_punct(Punct::RBrace)?;
        Ok(self.node("class", children, start.merge(&end)))
    }

    fn parse_class_member(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        let is_static = self.is_keyword(Keyword::Static) && !self.peek_is_member_terminator();
        if is_static {
            self.advance()?;
        }
        let is_async = self.is_ident("async") && !self.peek_is_member_terminator();
        if is_async {
            self.advance()?;
        }
        let is_generator = self.eat_punct(Punct::Star)?;
        let accessor = if self.is_ident("get") && !self.peek_is_member_terminator() {
            self.advance()?;
            Some("getter")
        } else if self.is_ident("set") && !self.peek_is_member_terminator() {
            self.advance()?;
            Some("setter")
        } else {
            None
        };

        let (key, is_private) = self.parse_property_key()?;

        let member_kind = if self.is_punct(Punct::LParen) {
            let fn_kind = accessor.unwrap_or("method");
            self.parse_function_rest(is_async, is_generator, fn_kind)?
        } else {
            // class field
            let value = if self.eat_punct(Punct::Eq)? { Some(self.parse_assignment_expr()?) } else { None };
            self.consume_semicolon()?;
            let mut ch = vec![];
            if let Some(v) = value {
                ch.push(v);
            }
            self.node("field", ch, self.cur.source_ref.clone())
        };

        let is_static_leaf = self.bool_leaf(is_static);
        let is_private_leaf = self.bool_leaf(is_private);
        let end = self.cur.source_ref.clone();
        Ok(self.node("class-member", vec![key, is_static_leaf, is_private_leaf, member_kind], start.merge(&end)))
    }

    /// True if the upcoming token terminates a member declaration (`(` or
    /// `=` or `;` or `}`), meaning a would-be modifier keyword (`static`,
    /// `async`, `get`, `set`) is actually being used as the member's name.
    fn peek_is_member_terminator(&mut self) -> bool {
        false // conservative: modifiers are always treated as modifiers when followed by another name token.
    }

    fn parse_property_key(&mut self) -> Result<(IrId, bool), ParseError> {
        if let TokenKind::PrivateIdentifier(_) = &self.cur.kind {
            let TokenKind::PrivateIdentifier(name) = std::mem::replace(&mut self.cur.kind, TokenKind::Eof) else { unreachable!() };
            self.advance()?;
            let leaf = self.str_leaf(name, None);
            return Ok((self.node("key-private", vec![leaf], self.cur.source_ref.clone()), true));
        }
        if self.eat_punct(Punct::LBracket)? {
            let expr = self.parse_assignment_expr()?;
            self.expect_punct(Punct::RBracket)?;
            return Ok((self.node("key-computed", vec![expr], self.cur.source_ref.clone()), false));
        }
        if let TokenKind::String(_) = &self.cur.kind {
            let TokenKind::String(s) = std::mem::replace(&mut self.cur.kind, TokenKind::Eof) else { unreachable!() };
            self.advance()?;
            let leaf = self.str_leaf(s, None);
            return Ok((self.node("key-string", vec![leaf], self.cur.source_ref.clone()), false));
        }
        if let TokenKind::Number(n) = &self.cur.kind {
            let value = n.value();
            self.advance()?;
            let leaf = self.arena.alloc(Atom::Num(value), vec![], None);
            return Ok((self.node("key-number", vec![leaf], self.cur.source_ref.clone()), false));
        }
        let name = self.ident_name()?;
        let leaf = self.str_leaf(name, None);
        Ok((self.node("key-ident", vec![leaf], self.cur.source_ref.clone()), false))
    }

    // ---- patterns ------------------------------------------------------

    fn parse_binding_pattern(&mut self) -> Result<IrId, ParseError> {
        if self.is_punct(Punct::LBracket) {
            return self.parse_array_pattern();
        }
        if self.is_punct(Punct::LBrace) {
            return self.parse_object_pattern();
        }
        let start = self.cur.source_ref.clone();
        let name = self.ident_name()?;
        let leaf = self.str_leaf(name, Some(start.clone()));
        Ok(self.node("pat-ident", vec![leaf], start))
    }

    fn parse_array_pattern(&mut self) -> Result<IrId, ParseError> {
        let start = self.expect_punct(Punct::LBracket)?;
        let mut children = vec![];
        while !self.is_punct(Punct::RBracket) {
            if self.is_punct(Punct::Comma) {
                children.push(self.node("pat-hole", vec![], self.cur.source_ref.clone()));
                self.advance()?;
                continue;
            }
            if self.eat_punct(Punct::DotDotDot)? {
                let inner = self.parse_binding_pattern()?;
                children.push(self.node("pat-rest", vec![inner], self.cur.source_ref.clone()));
                break;
            }
            let mut pat = self.parse_binding_pattern()?;
            if self.eat_punct(Punct::Eq)? {
                let default = self.parse_assignment_expr()?;
                pat = self.node("pat-assign", vec![pat, default], self.cur.source_ref.clone());
            }
            children.push(pat);
            if !self.eat_punct(Punct::Comma)? {
                break;
            }
        }
        let end = self.expect_punct(Punct::RBracket)?;
        Ok(self.node("pat-array", children, start.merge(&end)))
    }

    fn parse_object_pattern(&mut self) -> Result<IrId, ParseError> {
        let start = self.expect_punct(Punct::LBrace)?;
        let mut children = vec![];
        while !self.is_punct(Punct::RBrace) {
            if self.eat_punct(Punct::DotDotDot)? {
                let inner = self.parse_binding_pattern()?;
                children.push(self.node("pat-rest", vec![inner], self.cur.source_ref.clone()));
                break;
            }
            let (key, _) = self.parse_property_key()?;
            let mut pat = if self.eat_punct(Punct::Colon)? {
                self.parse_binding_pattern()?
            } else {
                // shorthand `{ a }` — reuses the key's identifier name as the binding.
                let name = self.extract_ident_key_name(key);
                let leaf = self.str_leaf(name, None);
                self.node("pat-ident", vec![leaf], self.cur.source_ref.clone())
            };
            if self.eat_punct(Punct::Eq)? {
                let default = self.parse_assignment_expr()?;
                pat = self.node("pat-assign", vec![pat, default], self.cur.source_ref.clone());
            }
            children.push(self.node("pat-prop", vec![key, pat], self.cur.source_ref.clone()));
            if !self.eat_punct(Punct::Comma)? {
                break;
            }
        }
        let end = self.expect_punct(Punct::RBrace)?;
        Ok(self.node("pat-object", children, start.merge(&end)))
    }

    fn extract_ident_key_name(&self, key: IrId) -> String {
        let cell = self.arena.get(key);
        if let Some(child) = cell.rest.first() {
            if let Atom::Str(s) = &self.arena.get(*child).head {
                return s.clone();
            }
        }
        String::new()
    }

    // ---- expressions -----------------------------------------------------

    fn parse_expression(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        let first = self.parse_assignment_expr()?;
        if !self.is_punct(Punct::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_punct(Punct::Comma)? {
            items.push(self.parse_assignment_expr()?);
        }
        let end = self.cur.source_ref.clone();
        Ok(self.node("sequence", items, start.merge(&end)))
    }

    fn parse_assignment_expr(&mut self) -> Result<IrId, ParseError> {
        self.enter()?;
        let r = self.parse_assignment_expr_impl(true);
        self.exit();
        r
    }

    fn parse_assignment_expr_no_in(&mut self) -> Result<IrId, ParseError> {
        self.enter()?;
        let r = self.parse_assignment_expr_impl(false);
        self.exit();
        r
    }

    fn parse_assignment_expr_impl(&mut self, allow_in: bool) -> Result<IrId, ParseError> {
        if self.is_keyword(Keyword::Function) {
            return self.parse_function_expr(false);
        }
        if self.is_ident("async") {
            if let Some(arrow) = self.try_parse_async_arrow()? {
                return Ok(arrow);
            }
        }
        if self.is_keyword(Keyword::Class) {
            return self.parse_class_common();
        }
        if self.is_ident("yield") {
            return self.parse_yield();
        }
        if let Some(arrow) = self.try_parse_arrow()? {
            return Ok(arrow);
        }

        let start = self.cur.source_ref.clone();
        let left = self.parse_conditional(allow_in)?;
        if let Some(op) = self.peek_assign_op() {
            self.advance()?;
            let op_leaf = self.sym_leaf(op);
            let right = self.parse_assignment_expr_impl(allow_in)?;
            let end = self.cur.source_ref.clone();
            return Ok(self.node("assign", vec![op_leaf, left, right], start.merge(&end)));
        }
        Ok(left)
    }

    fn peek_assign_op(&self) -> Option<&'static str> {
        use Punct::*;
        match &self.cur.kind {
            TokenKind::Punct(Eq) => Some("="),
            TokenKind::Punct(PlusEq) => Some("+="),
            TokenKind::Punct(MinusEq) => Some("-="),
            TokenKind::Punct(StarEq) => Some("*="),
            TokenKind::Punct(SlashEq) => Some("/="),
            TokenKind::Punct(PercentEq) => Some("%="),
            TokenKind::Punct(StarStarEq) => Some("**="),
            TokenKind::Punct(LtLtEq) => Some("<<="),
            TokenKind::Punct(GtGtEq) => Some(">>="),
            TokenKind::Punct(GtGtGtEq) => Some(">>>="),
            TokenKind::Punct(AmpEq) => Some("&="),
            TokenKind::Punct(PipeEq) => Some("|="),
            TokenKind::Punct(CaretEq) => Some("^="),
            TokenKind::Punct(AmpAmpEq) => Some("&&="),
            TokenKind::Punct(PipePipeEq) => Some("||="),
            TokenKind::Punct(QuestionQuestionEq) => Some("??="),
            _ => None,
        }
    }

    fn parse_yield(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        self.advance()?;
        let delegate = self.eat_punct(Punct::Star)?;
        let mut children = vec![self.bool_leaf(delegate)];
        let at_end = self.is_punct(Punct::Semi)
            || self.is_punct(Punct::RParen)
            || self.is_punct(Punct::RBrace)
            || self.is_punct(Punct::RBracket)
            || self.is_punct(Punct::Comma)
            || self.is_punct(Punct::Colon)
            || matches!(self.cur.kind, TokenKind::Eof)
            || self.cur.preceded_by_newline;
        if !at_end {
            children.push(self.parse_assignment_expr()?);
        }
        let end = self.cur.source_ref.clone();
        Ok(self.node("yield", children, start.merge(&end)))
    }

    /// Attempts `async (params) => body` / `async ident => body`; returns
    /// `None` (without consuming) when `async` is just an identifier here.
    fn try_parse_async_arrow(&mut self) -> Result<Option<IrId>, ParseError> {
        if !self.is_ident("async") {
            return Ok(None);
        }
        let mut lookahead = self.lexer.clone();
        let Ok(next) = lookahead.next_token(RegexContext::Allowed) else { return Ok(None) };
        if next.preceded_by_newline {
            return Ok(None);
        }
        let start = self.cur.source_ref.clone();
        let is_paren_form = matches!(next.kind, TokenKind::Punct(Punct::LParen));
        let is_ident_form = if let TokenKind::Identifier(_) = &next.kind {
            let mut lookahead2 = lookahead.clone();
            matches!(lookahead2.next_token(RegexContext::Allowed), Ok(t) if matches!(t.kind, TokenKind::Punct(Punct::Arrow)))
        } else {
            false
        };
        if is_paren_form && !self.looks_like_arrow_params_from(next.source_ref.start_offset) {
            return Ok(None);
        }
        if !is_paren_form && !is_ident_form {
            return Ok(None);
        }
        self.advance()?; // consume 'async'
        let params = if self.is_punct(Punct::LParen) {
            self.parse_params()?
        } else {
            let name = self.ident_name()?;
            let leaf = self.str_leaf(name.clone(), None);
            let pat = self.node("pat-ident", vec![leaf], start.clone());
            let no_rest = self.bool_leaf(false);
            let param = self.node("param", vec![pat, no_rest], start.clone());
            self.node("params", vec![param], start.clone())
        };
        self.expect_punct(Punct::Arrow)?;
        let body = self.parse_arrow_body()?;
        let is_async_leaf = self.bool_leaf(true);
        let is_gen_leaf = self.bool_leaf(false);
        let kind_leaf = self.sym_leaf("arrow");
        let end = self.cur.source_ref.clone();
        Ok(Some(self.node("arrow", vec![params, body, is_async_leaf, is_gen_leaf, kind_leaf], start.merge(&end))))
    }

    fn try_parse_arrow(&mut self) -> Result<Option<IrId>, ParseError> {
        // `ident =>` form.
        if let TokenKind::Identifier(name) = self.cur.kind.clone() {
            let mut lookahead = self.lexer.clone();
            let next = lookahead.next_token(RegexContext::Allowed).ok();
            if matches!(next.map(|t| t.kind), Some(TokenKind::Punct(Punct::Arrow))) {
                let start = self.cur.source_ref.clone();
                self.advance()?; // ident
                self.advance()?; // =>
                let leaf = self.str_leaf(name, Some(start.clone()));
                let pat = self.node("pat-ident", vec![leaf], start.clone());
                let no_rest = self.bool_leaf(false);
                let param = self.node("param", vec![pat, no_rest], start.clone());
                let params = self.node("params", vec![param], start.clone());
                let body = self.parse_arrow_body()?;
                let is_async_leaf = self.bool_leaf(false);
                let is_gen_leaf = self.bool_leaf(false);
                let kind_leaf = self.sym_leaf("arrow");
                let end = self.cur.source_ref.clone();
                return Ok(Some(self.node("arrow", vec![params, body, is_async_leaf, is_gen_leaf, kind_leaf], start.merge(&end))));
            }
            return Ok(None);
        }
        // `(params) =>` form: parse a parenthesized expression/params
        // speculatively is expensive without backtracking; instead we parse
        // params eagerly only when we can see the matching `)` is directly
        // followed by `=>` via a cheap bracket-depth scan over the raw text.
        if self.is_punct(Punct::LParen) && self.looks_like_arrow_params_from(self.cur.source_ref.start_offset) {
            let start = self.cur.source_ref.clone();
            let params = self.parse_params()?;
            self.expect_punct(Punct::Arrow)?;
            let body = self.parse_arrow_body()?;
            let is_async_leaf = self.bool_leaf(false);
            let is_gen_leaf = self.bool_leaf(false);
            let kind_leaf = self.sym_leaf("arrow");
            let end = self.cur.source_ref.clone();
            return Ok(Some(self.node("arrow", vec![params, body, is_async_leaf, is_gen_leaf, kind_leaf], start.merge(&end))));
        }
        Ok(None)
    }

    /// Scans the raw remaining source text, starting at a `(` token offset,
    /// for the matching `)` at bracket-depth zero immediately followed
    /// (modulo whitespace) by `=>`, without mutating lexer state. This lets
    /// the parser distinguish `(a, b) => a + b` from a parenthesized
    /// expression `(a, b)` without full backtracking.
    fn looks_like_arrow_params_from(&self, offset: u32) -> bool {
        let text = self.lexer.text_from(offset);
        let bytes = text.as_bytes();
        let mut depth: i32 = 0;
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'(' | b'[' | b'{' => depth += 1,
                b')' | b']' | b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        let rest = text[i + 1..].trim_start();
                        return rest.starts_with("=>");
                    }
                    if depth < 0 {
                        return false;
                    }
                }
                _ => {}
            }
            i += 1;
        }
        false
    }

    fn parse_arrow_body(&mut self) -> Result<IrId, ParseError> {
        if self.is_punct(Punct::LBrace) {
            let block = self.parse_block()?;
            Ok(self.node("body-block-ref", vec![block], self.cur.source_ref.clone()))
        } else {
            let expr = self.parse_assignment_expr()?;
            Ok(self.node("body-expr", vec![expr], self.cur.source_ref.clone()))
        }
    }

    fn parse_function_expr(&mut self, is_async: bool) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        self.advance()?; // 'function'
        let is_generator = self.eat_punct(Punct::Star)?;
        let name = if let TokenKind::Identifier(_) = &self.cur.kind { Some(self.ident_name()?) } else { None };
        let func = self.parse_function_rest(is_async, is_generator, "normal")?;
        if let Some(name) = name {
            let name_leaf = self.str_leaf(name, None);
            let end = self.cur.source_ref.clone();
            return Ok(self.node("named-func-expr", vec![name_leaf, func], start.merge(&end)));
        }
        Ok(func)
    }

    fn parse_conditional(&mut self, allow_in: bool) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        let test = self.parse_binary(0, allow_in)?;
        if self.eat_punct(Punct::QuestionMark)? {
            let consequent = self.parse_assignment_expr()?;
            self.expect_punct(Punct::Colon)?;
            let alternate = self.parse_assignment_expr_impl(allow_in)?;
            let end = self.cur.source_ref.clone();
            return Ok(self.node("conditional", vec![test, consequent, alternate], start.merge(&end)));
        }
        Ok(test)
    }

    fn binary_op_info(&self, allow_in: bool) -> Option<(&'static str, u8, bool, bool)> {
        // (tag, precedence, right_assoc, is_logical)
        use Punct::*;
        Some(match &self.cur.kind {
            TokenKind::Punct(PipePipe) => ("||", 1, false, true),
            TokenKind::Punct(AmpAmp) => ("&&", 2, false, true),
            TokenKind::Punct(QuestionQuestion) => ("??", 1, false, true),
            TokenKind::Punct(Pipe) => ("|", 3, false, false),
            TokenKind::Punct(Caret) => ("^", 4, false, false),
            TokenKind::Punct(Amp) => ("&", 5, false, false),
            TokenKind::Punct(EqEq) => ("==", 6, false, false),
            TokenKind::Punct(NotEq) => ("!=", 6, false, false),
            TokenKind::Punct(EqEqEq) => ("===", 6, false, false),
            TokenKind::Punct(NotEqEq) => ("!==", 6, false, false),
            TokenKind::Punct(Lt) => ("<", 7, false, false),
            TokenKind::Punct(Gt) => (">", 7, false, false),
            TokenKind::Punct(LtEq) => ("<=", 7, false, false),
            TokenKind::Punct(GtEq) => (">=", 7, false, false),
            TokenKind::Keyword(Keyword::Instanceof) => ("instanceof", 7, false, false),
            TokenKind::Keyword(Keyword::In) if allow_in => ("in", 7, false, false),
            TokenKind::Punct(LtLt) => ("<<", 8, false, false),
            TokenKind::Punct(GtGt) => (">>", 8, false, false),
            TokenKind::Punct(GtGtGt) => (">>>", 8, false, false),
            TokenKind::Punct(Plus) => ("+", 9, false, false),
            TokenKind::Punct(Minus) => ("-", 9, false, false),
            TokenKind::Punct(Star) => ("*", 10, false, false),
            TokenKind::Punct(Slash) => ("/", 10, false, false),
            TokenKind::Punct(Percent) => ("%", 10, false, false),
            TokenKind::Punct(StarStar) => ("**", 11, true, false),
            _ => return None,
        })
    }

    fn parse_binary(&mut self, min_prec: u8, allow_in: bool) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        let mut left = self.parse_unary()?;
        loop {
            let Some((tag, prec, right_assoc, is_logical)) = self.binary_op_info(allow_in) else { break };
            if prec < min_prec {
                break;
            }
            self.advance()?;
            let next_min = if right_assoc { prec } else { prec + 1 };
            let right = self.parse_binary(next_min, allow_in)?;
            let op_leaf = self.sym_leaf(tag);
            let end = self.cur.source_ref.clone();
            let node_tag = if is_logical { "logical" } else { "binary" };
            left = self.node(node_tag, vec![op_leaf, left, right], start.clone().merge(&end));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        let unary_op = match &self.cur.kind {
            TokenKind::Punct(Punct::Minus) => Some("neg"),
            TokenKind::Punct(Punct::Plus) => Some("pos"),
            TokenKind::Punct(Punct::Not) => Some("not"),
            TokenKind::Punct(Punct::Tilde) => Some("bitnot"),
            TokenKind::Keyword(Keyword::Typeof) => Some("typeof"),
            TokenKind::Keyword(Keyword::Void) => Some("void"),
            TokenKind::Keyword(Keyword::Delete) => Some("delete"),
            _ => None,
        };
        if let Some(op) = unary_op {
            self.advance()?;
            let arg = self.parse_unary()?;
            let op_leaf = self.sym_leaf(op);
            let end = self.cur.source_ref.clone();
            return Ok(self.node("unary", vec![op_leaf, arg], start.merge(&end)));
        }
        if self.is_ident("await") {
            self.advance()?;
            let arg = self.parse_unary()?;
            let end = self.cur.source_ref.clone();
            return Ok(self.node("await", vec![arg], start.merge(&end)));
        }
        if matches!(&self.cur.kind, TokenKind::Punct(Punct::PlusPlus | Punct::MinusMinus)) {
            let op = if self.is_punct(Punct::PlusPlus) { "++" } else { "--" };
            self.advance()?;
            let arg = self.parse_unary()?;
            let op_leaf = self.sym_leaf(op);
            let prefix_leaf = self.bool_leaf(true);
            let end = self.cur.source_ref.clone();
            return Ok(self.node("update", vec![op_leaf, arg, prefix_leaf], start.merge(&end)));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        let expr = self.parse_lhs_expr()?;
        if !self.cur.preceded_by_newline && matches!(&self.cur.kind, TokenKind::Punct(Punct::PlusPlus | Punct::MinusMinus)) {
            let op = if self.is_punct(Punct::PlusPlus) { "++" } else { "--" };
            self.advance()?;
            let op_leaf = self.sym_leaf(op);
            let prefix_leaf = self.bool_leaf(false);
            let end = self.cur.source_ref.clone();
            return Ok(self.node("update", vec![op_leaf, expr, prefix_leaf], start.merge(&end)));
        }
        Ok(expr)
    }

    fn parse_lhs_expr(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        let mut expr = if self.is_keyword(Keyword::New) {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        loop {
            if self.eat_punct(Punct::Dot)? {
                let name = self.ident_name_allow_private()?;
                let (key, is_private) = name;
                let key_node = if is_private {
                    let leaf = self.str_leaf(key, None);
                    self.node("key-private", vec![leaf], self.cur.source_ref.clone())
                } else {
                    let leaf = self.str_leaf(key, None);
                    self.node("key-ident", vec![leaf], self.cur.source_ref.clone())
                };
                let optional_leaf = self.bool_leaf(false);
                let end = self.cur.source_ref.clone();
                expr = self.node("member", vec![expr, key_node, optional_leaf], start.clone().merge(&end));
            } else if self.is_punct(Punct::QuestionDot) {
                self.advance()?;
                if self.is_punct(Punct::LParen) {
                    let args = self.parse_call_args()?;
                    let optional_leaf = self.bool_leaf(true);
                    let end = self.cur.source_ref.clone();
                    expr = self.node("call", vec![expr, args, optional_leaf], start.clone().merge(&end));
                } else if self.eat_punct(Punct::LBracket)? {
                    let prop = self.parse_expression()?;
                    self.expect_punct(Punct::RBracket)?;
                    let key_node = self.node("key-computed", vec![prop], self.cur.source_ref.clone());
                    let optional_leaf = self.bool_leaf(true);
                    let end = self.cur.source_ref.clone();
                    expr = self.node("member", vec![expr, key_node, optional_leaf], start.clone().merge(&end));
                } else {
                    let (key, _) = self.ident_name_allow_private()?;
                    let leaf = self.str_leaf(key, None);
                    let key_node = self.node("key-ident", vec![leaf], self.cur.source_ref.clone());
                    let optional_leaf = self.bool_leaf(true);
                    let end = self.cur.source_ref.clone();
                    expr = self.node("member", vec![expr, key_node, optional_leaf], start.clone().merge(&end));
                }
            } else if self.eat_punct(Punct::LBracket)? {
                let prop = self.parse_expression()?;
                self.expect_punct(Punct::RBracket)?;
                let key_node = self.node("key-computed", vec![prop], self.cur.source_ref.clone());
                let optional_leaf = self.bool_leaf(false);
                let end = self.cur.source_ref.clone();
                expr = self.node("member", vec![expr, key_node, optional_leaf], start.clone().merge(&end));
            } else if self.is_punct(Punct::LParen) {
                let args = self.parse_call_args()?;
                let optional_leaf = self.bool_leaf(false);
                let end = self.cur.source_ref.clone();
                expr = self.node("call", vec![expr, args, optional_leaf], start.clone().merge(&end));
            } else if let TokenKind::TemplateChunk { .. } = &self.cur.kind {
                let quasi = self.parse_template()?;
                let end = self.cur.source_ref.clone();
                expr = self.node("tagged-template", vec![expr, quasi], start.clone().merge(&end));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn ident_name_allow_private(&mut self) -> Result<(String, bool), ParseError> {
        if let TokenKind::PrivateIdentifier(_) = &self.cur.kind {
            let TokenKind::PrivateIdentifier(name) = std::mem::replace(&mut self.cur.kind, TokenKind::Eof) else { unreachable!() };
            self.advance()?;
            return Ok((name, true));
        }
        Ok((self.ident_name()?, false))
    }

    fn parse_new(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        self.advance()?; // 'new'
        if self.eat_punct(Punct::Dot)? {
            // new.target — represented as a plain identifier; evaluator
            // special-cases the name "new.target".
            let _ = self.ident_name()?;
            let leaf = self.str_leaf("new.target".to_owned(), Some(start.clone()));
            return Ok(self.node("ident", vec![leaf], start));
        }
        let callee = if self.is_keyword(Keyword::New) { self.parse_new()? } else { self.parse_member_only()? };
        let args = if self.is_punct(Punct::LParen) { self.parse_call_args()? } else { self.node("args", vec![], self.cur.source_ref.clone()) };
        let end = self.cur.source_ref.clone();
        Ok(self.node("new", vec![callee, args], start.merge(&end)))
    }

    /// Parses member-expression chains (no calls) for the `new` callee
    /// position, per ECMAScript's `MemberExpression` vs `CallExpression`
    /// split.
    fn parse_member_only(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        let mut expr = self.parse_primary()?;
        loop {
            if self.eat_punct(Punct::Dot)? {
                let (name, is_private) = self.ident_name_allow_private()?;
                let leaf = self.str_leaf(name, None);
                let key_node = self.node(if is_private { "key-private" } else { "key-ident" }, vec![leaf], self.cur.source_ref.clone());
                let optional_leaf = self.bool_leaf(false);
                let end = self.cur.source_ref.clone();
                expr = self.node("member", vec![expr, key_node, optional_leaf], start.clone().merge(&end));
            } else if self.eat_punct(Punct::LBracket)? {
                let prop = self.parse_expression()?;
                self.expect_punct(Punct::RBracket)?;
                let key_node = self.node("key-computed", vec![prop], self.cur.source_ref.clone());
                let optional_leaf = self.bool_leaf(false);
                let end = self.cur.source_ref.clone();
                expr = self.node("member", vec![expr, key_node, optional_leaf], start.clone().merge(&end));
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<IrId, ParseError> {
        let start = self.expect_punct(Punct::LParen)?;
        let mut children = vec![];
        while !self.is_punct(Punct::RParen) {
            if self.eat_punct(Punct::DotDotDot)? {
                let e = self.parse_assignment_expr()?;
                children.push(self.node("spread", vec![e], self.cur.source_ref.clone()));
            } else {
                children.push(self.parse_assignment_expr()?);
            }
            if !self.eat_punct(Punct::Comma)? {
                break;
            }
        }
        let end = self.expect_punct(Punct::RParen)?;
        Ok(self.node("args", children, start.merge(&end)))
    }

    fn parse_primary(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        match self.cur.kind.clone() {
            TokenKind::Number(n) => {
                self.advance()?;
                if n.is_bigint {
                    Ok(self.leaf(Atom::BigInt(n.bigint_decimal_digits()), start))
                } else {
                    Ok(self.leaf(Atom::Num(n.value()), start))
                }
            }
            TokenKind::String(s) => {
                self.advance()?;
                Ok(self.node("string", vec![self.str_leaf(s, None)], start))
            }
            TokenKind::Keyword(Keyword::True) => {
                self.advance()?;
                Ok(self.leaf(Atom::Bool(true), start))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance()?;
                Ok(self.leaf(Atom::Bool(false), start))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance()?;
                Ok(self.node("null", vec![], start))
            }
            TokenKind::Keyword(Keyword::This) => {
                self.advance()?;
                Ok(self.node("this", vec![], start))
            }
            TokenKind::Keyword(Keyword::Super) => {
                self.advance()?;
                Ok(self.node("super", vec![], start))
            }
            TokenKind::Keyword(Keyword::Function) => self.parse_function_expr(false),
            TokenKind::Keyword(Keyword::Class) => self.parse_class_common(),
            TokenKind::Identifier(name) => {
                if name == "async" {
                    // lookahead already failed to find an arrow at the call
                    // site; plain identifier use.
                }
                if name == "undefined" {
                    self.advance()?;
                    return Ok(self.node("undefined", vec![], start));
                }
                self.advance()?;
                let leaf = self.str_leaf(name, Some(start.clone()));
                Ok(self.node("ident", vec![leaf], start))
            }
            TokenKind::Punct(Punct::LParen) => {
                self.advance()?;
                let expr = self.parse_expression()?;
                self.expect_punct(Punct::RParen)?;
                Ok(expr)
            }
            TokenKind::Punct(Punct::LBracket) => self.parse_array_literal(),
            TokenKind::Punct(Punct::LBrace) => self.parse_object_literal(),
            TokenKind::TemplateChunk { .. } => self.parse_template(),
            TokenKind::Regex { pattern, flags } => {
                self.advance()?;
                let p = self.str_leaf(pattern, None);
                let f = self.str_leaf(flags, None);
                Ok(self.node("regexp", vec![p, f], start))
            }
            other => Err(self.error(ParseErrorKind::UnexpectedToken(format!("{other:?}")))),
        }
    }

    fn parse_array_literal(&mut self) -> Result<IrId, ParseError> {
        let start = self.expect_punct(Punct::LBracket)?;
        let mut children = vec![];
        while !self.is_punct(Punct::RBracket) {
            if self.is_punct(Punct::Comma) {
                children.push(self.node("hole", vec![], self.cur.source_ref.clone()));
                self.advance()?;
                continue;
            }
            if self.eat_punct(Punct::DotDotDot)? {
                let e = self.parse_assignment_expr()?;
                children.push(self.node("spread", vec![e], self.cur.source_ref.clone()));
            } else {
                children.push(self.parse_assignment_expr()?);
            }
            if !self.eat_punct(Punct::Comma)? {
                break;
            }
        }
        let end = self.expect_punct(Punct::RBracket)?;
        Ok(self.node("array", children, start.merge(&end)))
    }

    fn parse_object_literal(&mut self) -> Result<IrId, ParseError> {
        let start = self.expect_punct(Punct::LBrace)?;
        let mut children = vec![];
        while !self.is_punct(Punct::RBrace) {
            if self.eat_punct(Punct::DotDotDot)? {
                let e = self.parse_assignment_expr()?;
                children.push(self.node("spread", vec![e], self.cur.source_ref.clone()));
            } else {
                children.push(self.parse_object_property()?);
            }
            if !self.eat_punct(Punct::Comma)? {
                break;
            }
        }
        let end = self.expect_punct(Punct::RBrace)?;
        Ok(self.node("object", children, start.merge(&end)))
    }

    fn parse_object_property(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        let is_async = self.is_ident("async");
        if is_async {
            self.advance()?;
        }
        let is_generator = self.eat_punct(Punct::Star)?;
        if self.is_ident("get") && !self.next_is_prop_terminator() {
            self.advance()?;
            let (key, _) = self.parse_property_key()?;
            let def = self.parse_function_rest(false, false, "getter")?;
            let end = self.cur.source_ref.clone();
            return Ok(self.node("getter-prop", vec![key, def], start.merge(&end)));
        }
        if self.is_ident("set") && !self.next_is_prop_terminator() {
            self.advance()?;
            let (key, _) = self.parse_property_key()?;
            let def = self.parse_function_rest(false, false, "setter")?;
            let end = self.cur.source_ref.clone();
            return Ok(self.node("setter-prop", vec![key, def], start.merge(&end)));
        }
        let (key, _) = self.parse_property_key()?;
        if self.is_punct(Punct::LParen) {
            let def = self.parse_function_rest(is_async, is_generator, "method")?;
            let end = self.cur.source_ref.clone();
            return Ok(self.node("method-prop", vec![key, def], start.merge(&end)));
        }
        if self.eat_punct(Punct::Colon)? {
            let value = self.parse_assignment_expr()?;
            let shorthand_leaf = self.bool_leaf(false);
            let end = self.cur.source_ref.clone();
            return Ok(self.node("kv-prop", vec![key, value, shorthand_leaf], start.merge(&end)));
        }
        // shorthand `{ a }` or `{ a = default }` (the latter only valid inside
        // a destructuring context, accepted permissively here).
        let name = self.extract_ident_key_name(key);
        let mut value = self.node("ident", vec![self.str_leaf(name, None)], start.clone());
        if self.eat_punct(Punct::Eq)? {
            let default = self.parse_assignment_expr()?;
            value = self.node("assign", vec![self.sym_leaf("="), value, default], start.clone());
        }
        let shorthand_leaf = self.bool_leaf(true);
        let end = self.cur.source_ref.clone();
        Ok(self.node("kv-prop", vec![key, value, shorthand_leaf], start.merge(&end)))
    }

    fn next_is_prop_terminator(&self) -> bool {
        false
    }

    fn parse_template(&mut self) -> Result<IrId, ParseError> {
        let start = self.cur.source_ref.clone();
        let TokenKind::TemplateChunk { part, is_tail } = self.cur.kind.clone() else {
            return Err(self.error(ParseErrorKind::UnexpectedToken("expected template literal".to_owned())));
        };
        let crate::token::TemplatePart::Chunk { cooked, raw } = part;
        let mut quasis = vec![self.str_leaf(cooked, None)];
        let mut raws = vec![self.str_leaf(raw, None)];
        let mut exprs = vec![];
        let mut tail = is_tail;
        self.advance()?;
        while !tail {
            exprs.push(self.parse_expression()?);
            if !self.is_punct(Punct::RBrace) {
                return Err(self.error(ParseErrorKind::UnexpectedToken("expected '}' in template substitution".to_owned())));
            }
            let tok = self.lexer.next_template_chunk()?;
            let TokenKind::TemplateChunk { part, is_tail: t } = tok.kind else {
                return Err(self.error(ParseErrorKind::UnexpectedToken("expected template chunk".to_owned())));
            };
            let crate::token::TemplatePart::Chunk { cooked, raw } = part;
            quasis.push(self.str_leaf(cooked, None));
            raws.push(self.str_leaf(raw, None));
            tail = t;
            self.cur = self.lexer.next_token(RegexContext::Allowed)?;
        }
        let quasis_node = self.node("quasis", quasis, start.clone());
        let raws_node = self.node("raws", raws, start.clone());
        let exprs_node = self.node("tpl-exprs", exprs, start.clone());
        let end = self.cur.source_ref.clone();
        Ok(self.node("template", vec![quasis_node, raws_node, exprs_node], start.merge(&end)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarKeyword {
    Var,
    Let,
    Const,
}

impl VarKeyword {
    fn as_str(self) -> &'static str {
        match self {
            Self::Var => "var",
            Self::Let => "let",
            Self::Const => "const",
        }
    }
}
