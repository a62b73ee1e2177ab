//! Recursive-descent parser for script source
//!
//! Precedence, lowest first: comparison, `..` (right-associative),
//! `+ -`, `* / %`, unary `- not #`, call.
//!
//! Nesting (blocks, parentheses, operator chains) is limited to
//! `MAX_LEVELS` so evaluation of the resulting tree stays within the
//! native stack.

use super::ast::{BinaryOp, Block, Expr, Stmt, StmtKind, UnaryOp};
use super::lexer::{Lexer, Spanned, Token};

/// Deepest syntax nesting accepted in one chunk
pub const MAX_LEVELS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

/// Parse a whole chunk
pub fn parse(source: &str) -> Result<Block, ParseError> {
    let tokens = Lexer::new(source).tokenize().map_err(|e| ParseError {
        line: e.line,
        message: e.message,
    })?;

    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let block = parser.block()?;
    parser.expect(Token::Eof)?;
    Ok(block)
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // Eof is always the last token
        &self.tokens[self.pos.min(self.tokens.len() - 1)].token
    }

    fn line(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].line
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T, ParseError> {
        Err(ParseError {
            line: self.line(),
            message: message.into(),
        })
    }

    fn expect(&mut self, token: Token) -> Result<(), ParseError> {
        if self.eat(&token) {
            Ok(())
        } else {
            let message = format!("{} expected near {}", token, self.peek());
            self.error(message)
        }
    }

    fn name(&mut self) -> Result<String, ParseError> {
        match self.peek().clone() {
            Token::Name(name) => {
                self.advance();
                Ok(name)
            }
            other => self.error(format!("<name> expected near {}", other)),
        }
    }

    /// Open one nesting level. Levels are not released on error since the
    /// whole parse fails.
    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_LEVELS {
            return self.error("chunk has too many syntax levels");
        }
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn at_block_end(&self) -> bool {
        matches!(self.peek(), Token::End | Token::Else | Token::Elseif | Token::Eof)
    }

    fn block(&mut self) -> Result<Block, ParseError> {
        self.enter()?;
        let mut stmts = Vec::new();
        while !self.at_block_end() {
            stmts.push(self.statement()?);
        }
        self.leave(1);
        Ok(stmts.into())
    }

    fn statement(&mut self) -> Result<Stmt, ParseError> {
        let line = self.line();
        let kind = match self.peek() {
            Token::Function => {
                self.advance();
                let name = self.name()?;
                self.expect(Token::LParen)?;
                let mut params = Vec::new();
                if !self.check(&Token::RParen) {
                    loop {
                        params.push(self.name()?);
                        if !self.eat(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.expect(Token::RParen)?;
                let body = self.block()?;
                self.expect(Token::End)?;
                StmtKind::Function { name, params, body }
            }
            Token::Local => {
                self.advance();
                let name = self.name()?;
                let value = if self.eat(&Token::Assign) {
                    Some(self.expression()?)
                } else {
                    None
                };
                StmtKind::Local { name, value }
            }
            Token::Return => {
                self.advance();
                let value = if self.at_block_end() {
                    None
                } else {
                    Some(self.expression()?)
                };
                StmtKind::Return(value)
            }
            Token::If => {
                self.advance();
                self.if_rest()?
            }
            _ => {
                let expr = self.expression()?;
                if self.eat(&Token::Assign) {
                    match expr {
                        Expr::Name(name) => StmtKind::Assign {
                            name,
                            value: self.expression()?,
                        },
                        _ => return self.error("syntax error near '='"),
                    }
                } else if matches!(expr, Expr::Call { .. }) {
                    StmtKind::Call(expr)
                } else {
                    let message = format!("syntax error near {}", self.peek());
                    return self.error(message);
                }
            }
        };
        Ok(Stmt { kind, line })
    }

    /// Everything after `if` / `elseif`
    fn if_rest(&mut self) -> Result<StmtKind, ParseError> {
        let cond = self.expression()?;
        self.expect(Token::Then)?;
        let then_block = self.block()?;

        let else_block = if self.check(&Token::Elseif) {
            let line = self.line();
            self.advance();
            self.enter()?;
            let nested = self.if_rest()?;
            self.leave(1);
            // the nested `if` consumed the shared `end`
            return Ok(StmtKind::If {
                cond,
                then_block,
                else_block: Some(vec![Stmt { kind: nested, line }].into()),
            });
        } else if self.eat(&Token::Else) {
            Some(self.block()?)
        } else {
            None
        };

        self.expect(Token::End)?;
        Ok(StmtKind::If { cond, then_block, else_block })
    }

    fn expression(&mut self) -> Result<Expr, ParseError> {
        self.enter()?;
        let expr = self.comparison()?;
        self.leave(1);
        Ok(expr)
    }

    fn comparison(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.concat()?;
        let mut levels = 0;
        loop {
            let op = match self.peek() {
                Token::Eq => BinaryOp::Eq,
                Token::Ne => BinaryOp::Ne,
                Token::Lt => BinaryOp::Lt,
                Token::Le => BinaryOp::Le,
                Token::Gt => BinaryOp::Gt,
                Token::Ge => BinaryOp::Ge,
                _ => {
                    self.leave(levels);
                    return Ok(lhs);
                }
            };
            self.advance();
            self.enter()?;
            levels += 1;
            let rhs = self.concat()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn concat(&mut self) -> Result<Expr, ParseError> {
        let lhs = self.additive()?;
        if self.eat(&Token::Concat) {
            self.enter()?;
            let rhs = self.concat()?;
            self.leave(1);
            Ok(binary(BinaryOp::Concat, lhs, rhs))
        } else {
            Ok(lhs)
        }
    }

    fn additive(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.multiplicative()?;
        let mut levels = 0;
        loop {
            let op = match self.peek() {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => {
                    self.leave(levels);
                    return Ok(lhs);
                }
            };
            self.advance();
            self.enter()?;
            levels += 1;
            let rhs = self.multiplicative()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.unary()?;
        let mut levels = 0;
        loop {
            let op = match self.peek() {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                Token::Percent => BinaryOp::Mod,
                _ => {
                    self.leave(levels);
                    return Ok(lhs);
                }
            };
            self.advance();
            self.enter()?;
            levels += 1;
            let rhs = self.unary()?;
            lhs = binary(op, lhs, rhs);
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        let op = match self.peek() {
            Token::Minus => UnaryOp::Neg,
            Token::Not => UnaryOp::Not,
            Token::Hash => UnaryOp::Len,
            _ => return self.postfix(),
        };
        self.advance();
        self.enter()?;
        let operand = self.unary()?;
        self.leave(1);
        Ok(Expr::Unary { op, operand: Box::new(operand) })
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.primary()?;
        let mut levels = 0;
        while self.eat(&Token::LParen) {
            self.enter()?;
            levels += 1;
            let mut args = Vec::new();
            if !self.check(&Token::RParen) {
                loop {
                    args.push(self.expression()?);
                    if !self.eat(&Token::Comma) {
                        break;
                    }
                }
            }
            self.expect(Token::RParen)?;
            expr = Expr::Call { callee: Box::new(expr), args };
        }
        self.leave(levels);
        Ok(expr)
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let expr = match self.peek().clone() {
            Token::Nil => Expr::Nil,
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::Integer(value) => Expr::Integer(value),
            Token::Float(value) => Expr::Float(value),
            Token::Str(text) => Expr::Str(text.into()),
            Token::Name(name) => Expr::Name(name),
            Token::LParen => {
                self.advance();
                let inner = self.expression()?;
                self.expect(Token::RParen)?;
                return Ok(inner);
            }
            other => return self.error(format!("unexpected symbol near {}", other)),
        };
        self.advance();
        Ok(expr)
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(source: &str) -> StmtKind {
        let block = parse(source).unwrap();
        assert_eq!(block.len(), 1);
        block[0].kind.clone()
    }

    #[test]
    fn test_function_definition() {
        match single("function wrapper(x, y)\n  return simple(x, y)\nend") {
            StmtKind::Function { name, params, body } => {
                assert_eq!(name, "wrapper");
                assert_eq!(params, vec!["x".to_string(), "y".to_string()]);
                assert_eq!(body.len(), 1);
                assert_eq!(body[0].line, 2);
                assert!(matches!(body[0].kind, StmtKind::Return(Some(Expr::Call { .. }))));
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let expected = binary(
            BinaryOp::Add,
            Expr::Integer(1),
            binary(BinaryOp::Mul, Expr::Integer(2), Expr::Integer(3)),
        );
        assert_eq!(
            single("x = 1 + 2 * 3"),
            StmtKind::Assign { name: "x".into(), value: expected }
        );
    }

    #[test]
    fn test_concat_is_right_associative() {
        let expected = binary(
            BinaryOp::Concat,
            Expr::Str("a".into()),
            binary(BinaryOp::Concat, Expr::Str("b".into()), Expr::Str("c".into())),
        );
        assert_eq!(
            single("x = 'a' .. 'b' .. 'c'"),
            StmtKind::Assign { name: "x".into(), value: expected }
        );
    }

    #[test]
    fn test_elseif_chain() {
        let source = "if x == 1 then y = 1 elseif x == 2 then y = 2 else y = 3 end";
        match single(source) {
            StmtKind::If { else_block: Some(else_block), .. } => {
                assert_eq!(else_block.len(), 1);
                assert!(matches!(
                    else_block[0].kind,
                    StmtKind::If { else_block: Some(_), .. }
                ));
            }
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_bare_expression_rejected() {
        let err = parse("x + 1").unwrap_err();
        assert_eq!(err.line, 1);
        assert!(err.message.starts_with("syntax error"));
    }

    #[test]
    fn test_missing_end() {
        let err = parse("function f()\n  return 1\n").unwrap_err();
        assert_eq!(err.message, "'end' expected near <eof>");
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("x = {}1{}", "(".repeat(1000), ")".repeat(1000));
        let err = parse(&deep).unwrap_err();
        assert_eq!(err.message, "chunk has too many syntax levels");
        assert_eq!(err.line, 1);

        let negations = format!("x = {}1", "-".repeat(1000));
        assert!(parse(&negations).is_err());
        let sum = format!("x = 1{}", " + 1".repeat(1000));
        assert!(parse(&sum).is_err());

        let shallow = format!("x = {}1{}", "(".repeat(50), ")".repeat(50));
        assert!(parse(&shallow).is_ok());
    }

    #[test]
    fn test_deep_blocks_rejected() {
        let source = format!("{}{}", "if true then\n".repeat(300), "end\n".repeat(300));
        let err = parse(&source).unwrap_err();
        assert_eq!(err.message, "chunk has too many syntax levels");
    }

    #[test]
    fn test_no_arg_call_statement() {
        assert_eq!(
            single("no_return()"),
            StmtKind::Call(Expr::Call {
                callee: Box::new(Expr::Name("no_return".into())),
                args: vec![],
            })
        );
    }
}
