//! Recursive-descent parser with Python operator precedence.
//!
//! Lowest to highest: conditional expression, `or`, `and`, `not`,
//! comparisons (chained, including `in`/`is`), `+ -`, `* / // %`,
//! unary sign, `**`, then calls, attributes and subscripts.

use spoon_core::Value;

use crate::ast::{BinOp, CmpOp, Expr, Stmt, UnaryOp};
use crate::error::{ExprError, Result};
use crate::lexer::{tokenize, Tok, Token};

const KEYWORDS: [&str; 13] = [
    "and", "or", "not", "in", "is", "if", "else", "True", "False", "None", "import", "as", "def",
];

/// Parse a single expression; trailing input is an error.
pub fn parse_expr(src: &str) -> Result<Expr> {
    let mut p = Parser::new(src)?;
    p.skip_seps();
    let expr = p.expr()?;
    p.skip_seps();
    p.expect_eof()?;
    Ok(expr)
}

/// Parse a preamble made of `;`/newline separated statements.
pub fn parse_program(src: &str) -> Result<Vec<Stmt>> {
    let mut p = Parser::new(src)?;
    let mut out = Vec::new();
    loop {
        p.skip_seps();
        if p.peek() == &Tok::Eof {
            return Ok(out);
        }
        out.push(p.statement()?);
        match p.peek() {
            Tok::Sep | Tok::Eof => {}
            _ => return Err(p.error("expected end of statement")),
        }
    }
}

struct Parser<'a> {
    src: &'a str,
    toks: Vec<Token>,
    at: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Result<Self> {
        Ok(Self {
            src,
            toks: tokenize(src)?,
            at: 0,
        })
    }

    fn peek(&self) -> &Tok {
        &self.toks[self.at].tok
    }

    fn peek_at(&self, n: usize) -> &Tok {
        let i = (self.at + n).min(self.toks.len() - 1);
        &self.toks[i].tok
    }

    fn bump(&mut self) -> Tok {
        let t = self.toks[self.at].tok.clone();
        if self.at + 1 < self.toks.len() {
            self.at += 1;
        }
        t
    }

    fn error(&self, message: impl Into<String>) -> ExprError {
        ExprError::Syntax {
            source_text: self.src.to_string(),
            pos: self.toks[self.at].pos,
            message: message.into(),
        }
    }

    fn is_kw(&self, kw: &str) -> bool {
        matches!(self.peek(), Tok::Name(n) if n == kw)
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        if self.is_kw(kw) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat(&mut self, tok: &Tok) -> bool {
        if self.peek() == tok {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, tok: &Tok, what: &str) -> Result<()> {
        if self.eat(tok) {
            Ok(())
        } else {
            Err(self.error(format!("expected {what}")))
        }
    }

    fn expect_eof(&self) -> Result<()> {
        if self.peek() == &Tok::Eof {
            Ok(())
        } else {
            Err(self.error("unexpected trailing input"))
        }
    }

    fn skip_seps(&mut self) {
        while self.peek() == &Tok::Sep {
            self.bump();
        }
    }

    fn ident(&mut self) -> Result<String> {
        match self.peek().clone() {
            Tok::Name(n) if !KEYWORDS.contains(&n.as_str()) => {
                self.bump();
                Ok(n)
            }
            _ => Err(self.error("expected identifier")),
        }
    }

    fn dotted_name(&mut self) -> Result<String> {
        let mut name = self.ident()?;
        while self.eat(&Tok::Dot) {
            name.push('.');
            name.push_str(&self.ident()?);
        }
        Ok(name)
    }

    fn statement(&mut self) -> Result<Stmt> {
        if self.eat_kw("import") {
            let module = self.dotted_name()?;
            let alias = if self.eat_kw("as") {
                Some(self.ident()?)
            } else {
                None
            };
            return Ok(Stmt::Import { module, alias });
        }
        if self.eat_kw("def") {
            let name = self.ident()?;
            self.expect(&Tok::LParen, "'('")?;
            let mut params = Vec::new();
            if !self.eat(&Tok::RParen) {
                loop {
                    params.push(self.ident()?);
                    if self.eat(&Tok::RParen) {
                        break;
                    }
                    self.expect(&Tok::Comma, "',' or ')'")?;
                }
            }
            self.expect(&Tok::Colon, "':'")?;
            // Allow `return` as a courtesy for one-line bodies.
            self.eat_kw("return");
            let body = self.expr()?;
            return Ok(Stmt::Def { name, params, body });
        }
        if matches!(self.peek_at(1), Tok::Op("=")) {
            let name = self.ident()?;
            self.bump();
            let value = self.expr()?;
            return Ok(Stmt::Assign { name, value });
        }
        Err(self.error("expected import, def or assignment"))
    }

    fn expr(&mut self) -> Result<Expr> {
        let body = self.or_expr()?;
        if !self.eat_kw("if") {
            return Ok(body);
        }
        let cond = self.or_expr()?;
        if !self.eat_kw("else") {
            return Err(self.error("expected 'else' in conditional expression"));
        }
        let otherwise = self.expr()?;
        Ok(Expr::IfElse {
            cond: Box::new(cond),
            then: Box::new(body),
            otherwise: Box::new(otherwise),
        })
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.and_expr()?;
        while self.eat_kw("or") {
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut lhs = self.not_expr()?;
        while self.eat_kw("and") {
            let rhs = self.not_expr()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn not_expr(&mut self) -> Result<Expr> {
        if self.eat_kw("not") {
            let inner = self.not_expr()?;
            return Ok(Expr::Unary(UnaryOp::Not, Box::new(inner)));
        }
        self.comparison()
    }

    fn cmp_op(&mut self) -> Option<CmpOp> {
        let next_is = |kw: &str| matches!(self.peek_at(1), Tok::Name(m) if m == kw);
        let (op, width) = match self.peek() {
            Tok::Op("==") => (CmpOp::Eq, 1),
            Tok::Op("!=") => (CmpOp::Ne, 1),
            Tok::Op("<") => (CmpOp::Lt, 1),
            Tok::Op("<=") => (CmpOp::Le, 1),
            Tok::Op(">") => (CmpOp::Gt, 1),
            Tok::Op(">=") => (CmpOp::Ge, 1),
            Tok::Name(n) if n == "in" => (CmpOp::In, 1),
            Tok::Name(n) if n == "not" && next_is("in") => (CmpOp::NotIn, 2),
            Tok::Name(n) if n == "is" && next_is("not") => (CmpOp::IsNot, 2),
            Tok::Name(n) if n == "is" => (CmpOp::Is, 1),
            _ => return None,
        };
        for _ in 0..width {
            self.bump();
        }
        Some(op)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let first = self.arith()?;
        let mut rest = Vec::new();
        while let Some(op) = self.cmp_op() {
            rest.push((op, self.arith()?));
        }
        if rest.is_empty() {
            Ok(first)
        } else {
            Ok(Expr::Compare(Box::new(first), rest))
        }
    }

    fn arith(&mut self) -> Result<Expr> {
        let mut lhs = self.term()?;
        loop {
            let op = match self.peek() {
                Tok::Op("+") => BinOp::Add,
                Tok::Op("-") => BinOp::Sub,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.term()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn term(&mut self) -> Result<Expr> {
        let mut lhs = self.factor()?;
        loop {
            let op = match self.peek() {
                Tok::Op("*") => BinOp::Mul,
                Tok::Op("/") => BinOp::Div,
                Tok::Op("//") => BinOp::FloorDiv,
                Tok::Op("%") => BinOp::Mod,
                _ => return Ok(lhs),
            };
            self.bump();
            let rhs = self.factor()?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn factor(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Tok::Op("-") => UnaryOp::Neg,
            Tok::Op("+") => UnaryOp::Pos,
            _ => return self.power(),
        };
        self.bump();
        let inner = self.factor()?;
        Ok(Expr::Unary(op, Box::new(inner)))
    }

    fn power(&mut self) -> Result<Expr> {
        let base = self.postfix()?;
        if self.eat(&Tok::Op("**")) {
            // Right-associative, and binds tighter than a unary minus on its left.
            let exp = self.factor()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exp)));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr> {
        let mut e = self.atom()?;
        loop {
            if self.eat(&Tok::LParen) {
                let args = self.sequence(&Tok::RParen)?;
                e = Expr::Call {
                    func: Box::new(e),
                    args,
                };
            } else if self.eat(&Tok::Dot) {
                let name = self.ident()?;
                e = Expr::Attr(Box::new(e), name);
            } else if self.eat(&Tok::LBracket) {
                e = self.subscript(e)?;
            } else {
                return Ok(e);
            }
        }
    }

    fn subscript(&mut self, value: Expr) -> Result<Expr> {
        let lower = if matches!(self.peek(), Tok::Colon) {
            None
        } else {
            Some(Box::new(self.expr()?))
        };
        if !self.eat(&Tok::Colon) {
            self.expect(&Tok::RBracket, "']'")?;
            let index = lower.ok_or_else(|| self.error("empty subscript"))?;
            return Ok(Expr::Index(Box::new(value), index));
        }
        let upper = if matches!(self.peek(), Tok::RBracket) {
            None
        } else {
            Some(Box::new(self.expr()?))
        };
        self.expect(&Tok::RBracket, "']'")?;
        Ok(Expr::Slice {
            value: Box::new(value),
            lower,
            upper,
        })
    }

    /// Comma separated expressions up to `close`; a trailing comma is allowed.
    fn sequence(&mut self, close: &Tok) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.eat(close) {
            return Ok(items);
        }
        loop {
            items.push(self.expr()?);
            if self.eat(close) {
                return Ok(items);
            }
            self.expect(&Tok::Comma, "','")?;
            if self.eat(close) {
                return Ok(items);
            }
        }
    }

    fn atom(&mut self) -> Result<Expr> {
        match self.bump() {
            Tok::Int(n) => Ok(Expr::Lit(Value::Int(n))),
            Tok::Float(f) => Ok(Expr::Lit(Value::Float(f))),
            Tok::Str(s) => {
                // Adjacent literals concatenate.
                let mut s = s;
                while let Tok::Str(next) = self.peek().clone() {
                    self.bump();
                    s.push_str(&next);
                }
                Ok(Expr::Lit(Value::Str(s)))
            }
            Tok::Name(n) => match n.as_str() {
                "True" => Ok(Expr::Lit(Value::Bool(true))),
                "False" => Ok(Expr::Lit(Value::Bool(false))),
                "None" => Ok(Expr::Lit(Value::None)),
                kw if KEYWORDS.contains(&kw) => {
                    self.at = self.at.saturating_sub(1);
                    Err(self.error(format!("unexpected keyword '{kw}'")))
                }
                _ => Ok(Expr::Name(n)),
            },
            Tok::LParen => {
                if self.eat(&Tok::RParen) {
                    return Ok(Expr::List(Vec::new()));
                }
                let first = self.expr()?;
                if self.eat(&Tok::RParen) {
                    return Ok(first);
                }
                // Tuples behave as lists.
                self.expect(&Tok::Comma, "',' or ')'")?;
                let mut items = vec![first];
                items.extend(self.sequence(&Tok::RParen)?);
                Ok(Expr::List(items))
            }
            Tok::LBracket => Ok(Expr::List(self.sequence(&Tok::RBracket)?)),
            _ => {
                self.at = self.at.saturating_sub(1);
                Err(self.error("expected an expression"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(n: &str) -> Box<Expr> {
        Box::new(Expr::Name(n.to_string()))
    }

    fn int(n: i64) -> Box<Expr> {
        Box::new(Expr::Lit(Value::Int(n)))
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let e = parse_expr("a + b * 2").unwrap();
        assert_eq!(
            e,
            Expr::Binary(
                BinOp::Add,
                name("a"),
                Box::new(Expr::Binary(BinOp::Mul, name("b"), int(2)))
            )
        );
    }

    #[test]
    fn unary_minus_applies_after_power() {
        let e = parse_expr("-2 ** 2").unwrap();
        assert_eq!(
            e,
            Expr::Unary(
                UnaryOp::Neg,
                Box::new(Expr::Binary(BinOp::Pow, int(2), int(2)))
            )
        );
    }

    #[test]
    fn chained_comparison_and_not_in() {
        let e = parse_expr("1 < x <= 3 and y not in ['a', 'b']").unwrap();
        match e {
            Expr::And(lhs, rhs) => {
                assert!(matches!(*lhs, Expr::Compare(_, ref ops) if ops.len() == 2));
                assert!(matches!(*rhs, Expr::Compare(_, ref ops) if ops[0].0 == CmpOp::NotIn));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn conditional_expression() {
        let e = parse_expr("'big' if x > 10 else 'small'").unwrap();
        assert!(matches!(e, Expr::IfElse { .. }));
    }

    #[test]
    fn calls_attributes_and_slices() {
        let e = parse_expr("np.mean(x[1:])").unwrap();
        let Expr::Call { func, args } = e else {
            panic!("not a call")
        };
        assert_eq!(*func, Expr::Attr(name("np"), "mean".into()));
        assert!(matches!(args[0], Expr::Slice { upper: None, .. }));
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert!(parse_expr("a b").is_err());
        assert!(parse_expr("").is_err());
    }

    #[test]
    fn preamble_statements() {
        let prog = parse_program("import math; k = 2\ndef twice(x): x * k").unwrap();
        assert_eq!(prog.len(), 3);
        assert_eq!(
            prog[0],
            Stmt::Import {
                module: "math".into(),
                alias: None
            }
        );
        assert!(matches!(&prog[1], Stmt::Assign { name, .. } if name == "k"));
        assert!(matches!(&prog[2], Stmt::Def { params, .. } if params == &["x".to_string()]));
    }

    #[test]
    fn import_alias() {
        let prog = parse_program("import numpy as np").unwrap();
        assert_eq!(
            prog[0],
            Stmt::Import {
                module: "numpy".into(),
                alias: Some("np".into())
            }
        );
    }
}
