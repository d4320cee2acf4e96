// SPDX-License-Identifier: MIT

//! Recursive-descent parser from the token stream to the trait script AST.

use super::ast::*;
use super::error::ScriptError;
use super::token::{tokenize, Token};

pub fn parse(source: &str) -> Result<Module, ScriptError> {
    let tokens = tokenize(source).map_err(|e| ScriptError::Syntax(e.0))?;
    let mut parser = Parser { tokens, pos: 0 };
    parser.parse_module()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

type PResult<T> = Result<T, ScriptError>;

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        t
    }

    fn expect(&mut self, expected: &Token) -> PResult<()> {
        if self.peek() == expected {
            self.advance();
            Ok(())
        } else {
            Err(ScriptError::Syntax(format!(
                "expected {expected}, found {}",
                self.peek()
            )))
        }
    }

    fn expect_name(&mut self) -> PResult<String> {
        match self.advance() {
            Token::Name(n) => Ok(n),
            other => Err(ScriptError::Syntax(format!("expected identifier, found {other}"))),
        }
    }

    fn at_name(&self, text: &str) -> bool {
        matches!(self.peek(), Token::Name(n) if n == text)
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek(), Token::Newline) {
            self.advance();
        }
    }

    fn parse_module(&mut self) -> PResult<Module> {
        let mut imports = Vec::new();
        let mut classes = Vec::new();
        self.skip_newlines();
        while self.at_name("import") || self.at_name("from") {
            imports.extend(self.parse_import()?);
            self.skip_newlines();
        }
        while !matches!(self.peek(), Token::Eof) {
            if self.at_name("class") {
                classes.push(self.parse_class()?);
            } else {
                return Err(ScriptError::Syntax(format!(
                    "expected a class definition, found {}",
                    self.peek()
                )));
            }
            self.skip_newlines();
        }
        Ok(Module { imports, classes })
    }

    fn parse_import(&mut self) -> PResult<Vec<Import>> {
        if self.at_name("import") {
            self.advance();
            let mut modules = vec![self.expect_name()?];
            while matches!(self.peek(), Token::Dot) {
                self.advance();
                self.expect_name()?;
            }
            while matches!(self.peek(), Token::Comma) {
                self.advance();
                modules.push(self.expect_name()?);
            }
            self.expect(&Token::Newline)?;
            Ok(modules.into_iter().map(|module| Import { module }).collect())
        } else {
            self.advance(); // 'from'
            let module = self.expect_name()?;
            if !self.at_name("import") {
                return Err(ScriptError::Syntax("expected 'import' in from-import".to_string()));
            }
            self.advance();
            self.expect_name()?;
            while matches!(self.peek(), Token::Comma) {
                self.advance();
                self.expect_name()?;
            }
            self.expect(&Token::Newline)?;
            Ok(vec![Import { module }])
        }
    }

    fn parse_class(&mut self) -> PResult<ClassDef> {
        self.advance(); // 'class'
        let name = self.expect_name()?;
        let mut bases = Vec::new();
        if matches!(self.peek(), Token::LParen) {
            self.advance();
            if !matches!(self.peek(), Token::RParen) {
                bases.push(self.expect_name()?);
                while matches!(self.peek(), Token::Comma) {
                    self.advance();
                    bases.push(self.expect_name()?);
                }
            }
            self.expect(&Token::RParen)?;
        }
        self.expect(&Token::Colon)?;
        self.expect(&Token::Newline)?;
        self.expect(&Token::Indent)?;
        let mut methods = Vec::new();
        while !matches!(self.peek(), Token::Dedent) {
            methods.push(self.parse_function()?);
        }
        self.expect(&Token::Dedent)?;
        Ok(ClassDef { name, bases, methods })
    }

    fn parse_function(&mut self) -> PResult<FunctionDef> {
        let is_async = if self.at_name("async") {
            self.advance();
            true
        } else {
            false
        };
        if !self.at_name("def") {
            return Err(ScriptError::Syntax(format!(
                "expected method definition, found {}",
                self.peek()
            )));
        }
        self.advance();
        let name = self.expect_name()?;
        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        if !matches!(self.peek(), Token::RParen) {
            params.push(self.expect_name()?);
            while matches!(self.peek(), Token::Comma) {
                self.advance();
                params.push(self.expect_name()?);
                // Default values (`name=expr`) are accepted but not modeled;
                // the validator rejects required params beyond self anyway.
                if matches!(self.peek(), Token::Assign) {
                    self.advance();
                    self.parse_expr()?;
                }
            }
        }
        self.expect(&Token::RParen)?;
        self.expect(&Token::Colon)?;
        self.expect(&Token::Newline)?;
        self.expect(&Token::Indent)?;
        let body = self.parse_block_body()?;
        self.expect(&Token::Dedent)?;
        Ok(FunctionDef { name, is_async, params, body })
    }

    fn parse_block(&mut self) -> PResult<Vec<Stmt>> {
        self.expect(&Token::Colon)?;
        self.expect(&Token::Newline)?;
        self.expect(&Token::Indent)?;
        let body = self.parse_block_body()?;
        self.expect(&Token::Dedent)?;
        Ok(body)
    }

    fn parse_block_body(&mut self) -> PResult<Vec<Stmt>> {
        let mut stmts = Vec::new();
        while !matches!(self.peek(), Token::Dedent | Token::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        if self.at_name("if") {
            return self.parse_if();
        }
        if self.at_name("for") {
            return self.parse_for();
        }
        if self.at_name("try") {
            return self.parse_try();
        }
        if self.at_name("return") {
            self.advance();
            let value = if matches!(self.peek(), Token::Newline) {
                None
            } else {
                Some(self.parse_expr()?)
            };
            self.expect(&Token::Newline)?;
            return Ok(Stmt::Return(value));
        }
        if self.at_name("pass") {
            self.advance();
            self.expect(&Token::Newline)?;
            return Ok(Stmt::Pass);
        }

        // Assignment, augmented assignment, or a bare expression statement.
        if let Token::Name(name) = self.peek().clone() {
            let checkpoint = self.pos;
            self.advance();
            match self.peek().clone() {
                Token::Assign => {
                    self.advance();
                    let value = self.parse_expr()?;
                    self.expect(&Token::Newline)?;
                    return Ok(Stmt::Assign { target: name, value });
                }
                Token::PlusEq | Token::MinusEq => {
                    let op = if matches!(self.peek(), Token::PlusEq) { AugOp::Add } else { AugOp::Sub };
                    self.advance();
                    let value = self.parse_expr()?;
                    self.expect(&Token::Newline)?;
                    return Ok(Stmt::AugAssign { target: name, op, value });
                }
                _ => {
                    self.pos = checkpoint;
                }
            }
        }

        let expr = self.parse_expr()?;
        self.expect(&Token::Newline)?;
        Ok(Stmt::ExprStmt(expr))
    }

    fn parse_if(&mut self) -> PResult<Stmt> {
        self.advance(); // 'if'
        let cond = self.parse_expr()?;
        let then_body = self.parse_block()?;
        let mut elifs = Vec::new();
        while self.at_name("elif") {
            self.advance();
            let c = self.parse_expr()?;
            let b = self.parse_block()?;
            elifs.push((c, b));
        }
        let else_body = if self.at_name("else") {
            self.advance();
            self.parse_block()?
        } else {
            Vec::new()
        };
        Ok(Stmt::If { cond, then_body, elifs, else_body })
    }

    fn parse_for(&mut self) -> PResult<Stmt> {
        self.advance(); // 'for'
        let var = self.expect_name()?;
        if !self.at_name("in") {
            return Err(ScriptError::Syntax("expected 'in' in for-loop".to_string()));
        }
        self.advance();
        if !self.at_name("range") {
            return Err(ScriptError::Syntax(
                "only 'for x in range(n):' loops are supported".to_string(),
            ));
        }
        self.advance();
        self.expect(&Token::LParen)?;
        let count = self.parse_expr()?;
        self.expect(&Token::RParen)?;
        let body = self.parse_block()?;
        Ok(Stmt::ForRange { var, count, body })
    }

    fn parse_try(&mut self) -> PResult<Stmt> {
        self.advance(); // 'try'
        let body = self.parse_block()?;
        if !self.at_name("except") {
            return Err(ScriptError::Syntax("expected 'except' after 'try'".to_string()));
        }
        self.advance();
        if matches!(self.peek(), Token::Name(_)) && !matches!(self.peek(), Token::Colon) {
            // Optional `except SomeError:` — exception name is not modeled.
            self.expect_name()?;
        }
        let except_body = self.parse_block()?;
        Ok(Stmt::Try { body, except_body })
    }

    // ── Expressions (precedence climbing) ───────────────────────────────

    fn parse_expr(&mut self) -> PResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_and()?;
        while self.at_name("or") {
            self.advance();
            let rhs = self.parse_and()?;
            lhs = Expr::BoolOp { op: BoolOp::Or, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_not()?;
        while self.at_name("and") {
            self.advance();
            let rhs = self.parse_not()?;
            lhs = Expr::BoolOp { op: BoolOp::And, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> PResult<Expr> {
        if self.at_name("not") {
            self.advance();
            return Ok(Expr::UnaryNot(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let lhs = self.parse_addsub()?;
        let op = match self.peek() {
            Token::Eq => CmpOp::Eq,
            Token::NotEq => CmpOp::NotEq,
            Token::Lt => CmpOp::Lt,
            Token::Gt => CmpOp::Gt,
            Token::Le => CmpOp::Le,
            Token::Ge => CmpOp::Ge,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_addsub()?;
        Ok(Expr::Compare { op, lhs: Box::new(lhs), rhs: Box::new(rhs) })
    }

    fn parse_addsub(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_muldiv()?;
        loop {
            let op = match self.peek() {
                Token::Plus => BinOp::Add,
                Token::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_muldiv()?;
            lhs = Expr::BinOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_muldiv(&mut self) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Token::Star => BinOp::Mul,
                Token::Slash => BinOp::Div,
                Token::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::BinOp { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        if matches!(self.peek(), Token::Minus) {
            self.advance();
            return Ok(Expr::UnaryNeg(Box::new(self.parse_unary()?)));
        }
        if self.at_name("await") {
            self.advance();
            return Ok(Expr::Await(Box::new(self.parse_unary()?)));
        }
        self.parse_power()
    }

    fn parse_power(&mut self) -> PResult<Expr> {
        let base = self.parse_postfix()?;
        if matches!(self.peek(), Token::DoubleStar) {
            self.advance();
            let exp = self.parse_unary()?;
            return Ok(Expr::BinOp { op: BinOp::Pow, lhs: Box::new(base), rhs: Box::new(exp) });
        }
        Ok(base)
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_atom()?;
        loop {
            match self.peek() {
                Token::Dot => {
                    self.advance();
                    let attr = self.expect_name()?;
                    expr = Expr::Attribute { base: Box::new(expr), attr };
                }
                Token::LParen => {
                    self.advance();
                    let mut args = Vec::new();
                    if !matches!(self.peek(), Token::RParen) {
                        args.push(self.parse_expr()?);
                        while matches!(self.peek(), Token::Comma) {
                            self.advance();
                            args.push(self.parse_expr()?);
                        }
                    }
                    self.expect(&Token::RParen)?;
                    expr = Expr::Call { func: Box::new(expr), args };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_atom(&mut self) -> PResult<Expr> {
        match self.advance() {
            Token::Int(v) => Ok(Expr::IntLit(v)),
            Token::Float(v) => Ok(Expr::FloatLit(v)),
            Token::Str(s) => Ok(Expr::StrLit(s)),
            Token::Name(n) => match n.as_str() {
                "True" => Ok(Expr::BoolLit(true)),
                "False" => Ok(Expr::BoolLit(false)),
                "None" => Ok(Expr::NoneLit),
                _ => Ok(Expr::Name(n)),
            },
            Token::LParen => {
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            other => Err(ScriptError::Syntax(format!("unexpected token {other} in expression"))),
        }
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
