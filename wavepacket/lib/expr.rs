//! A small, sandboxed evaluator for scalar arithmetic expressions of a single
//! variable `x`, used to describe custom potentials.
//!
//! The grammar is fixed:
//! ```text
//! expr  := term (("+" | "-") term)*
//! term  := unary (("*" | "/") unary)*
//! unary := ("+" | "-") unary | power
//! power := atom (("^" | "**") unary)?
//! atom  := number | "x" | "pi" | "e" | func "(" expr ")" | "(" expr ")"
//! func  := sin | cos | tan | asin | acos | atan | sinh | cosh | tanh
//!        | exp | ln | log | log10 | sqrt | abs
//! ```
//! Exponentiation is right-associative and binds tighter than negation, so
//! `-x^2` is `-(x^2)` and `2^3^2` is `2^9`. `log` is the natural logarithm.
//! Nesting is limited to [`MAX_DEPTH`] levels. Nothing outside this grammar
//! is accepted; in particular there are no other
//! variables, no assignment, and no way to call into anything but the listed
//! functions.
//!
//! ```
//! use wavepacket::expr::Expr;
//!
//! let expr = Expr::parse("0.5 * x**2 + sin(pi * x)").unwrap();
//! assert!((expr.eval(2.0).unwrap() - 2.0).abs() < 1e-12);
//! ```

use std::f64::consts::{ E, PI };
use crate::error::{ EvalError, ExprError };

/// Deepest nesting accepted by [`Expr::parse`], counting both parentheses
/// and the height of the parsed tree.
pub const MAX_DEPTH: usize = 256;

pub type ExprResult<T> = Result<T, ExprError>;
pub type EvalResult<T> = Result<T, EvalError>;

/// Binary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinOp {
    fn apply(self, a: f64, b: f64) -> EvalResult<f64> {
        match self {
            Self::Add => Ok(a + b),
            Self::Sub => Ok(a - b),
            Self::Mul => Ok(a * b),
            Self::Div if b == 0.0 => Err(EvalError::DivisionByZero),
            Self::Div => Ok(a / b),
            Self::Pow if a == 0.0 && b < 0.0 => Err(EvalError::DivisionByZero),
            Self::Pow if a < 0.0 && b.fract() != 0.0
                => Err(EvalError::Domain { func: "^", arg: a }),
            Self::Pow => Ok(a.powf(b)),
        }
    }
}

/// The fixed set of functions callable from an expression.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Func {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Ln,
    Log10,
    Sqrt,
    Abs,
}

impl Func {
    /// Look up a function by the name used in expression text.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Self::Sin),
            "cos" => Some(Self::Cos),
            "tan" => Some(Self::Tan),
            "asin" => Some(Self::Asin),
            "acos" => Some(Self::Acos),
            "atan" => Some(Self::Atan),
            "sinh" => Some(Self::Sinh),
            "cosh" => Some(Self::Cosh),
            "tanh" => Some(Self::Tanh),
            "exp" => Some(Self::Exp),
            "ln" | "log" => Some(Self::Ln),
            "log10" => Some(Self::Log10),
            "sqrt" => Some(Self::Sqrt),
            "abs" => Some(Self::Abs),
            _ => None,
        }
    }

    /// Canonical name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Exp => "exp",
            Self::Ln => "ln",
            Self::Log10 => "log10",
            Self::Sqrt => "sqrt",
            Self::Abs => "abs",
        }
    }

    fn apply(self, a: f64) -> EvalResult<f64> {
        let domain = || EvalError::Domain { func: self.name(), arg: a };
        match self {
            Self::Sin => Ok(a.sin()),
            Self::Cos => Ok(a.cos()),
            Self::Tan => Ok(a.tan()),
            Self::Asin | Self::Acos if !(-1.0..=1.0).contains(&a)
                => Err(domain()),
            Self::Asin => Ok(a.asin()),
            Self::Acos => Ok(a.acos()),
            Self::Atan => Ok(a.atan()),
            Self::Sinh => Ok(a.sinh()),
            Self::Cosh => Ok(a.cosh()),
            Self::Tanh => Ok(a.tanh()),
            Self::Exp => Ok(a.exp()),
            Self::Ln | Self::Log10 if a <= 0.0 => Err(domain()),
            Self::Ln => Ok(a.ln()),
            Self::Log10 => Ok(a.log10()),
            Self::Sqrt if a < 0.0 => Err(domain()),
            Self::Sqrt => Ok(a.sqrt()),
            Self::Abs => Ok(a.abs()),
        }
    }
}

/// A parsed expression tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Num(f64),
    X,
    Neg(Box<Expr>),
    Bin(BinOp, Box<Expr>, Box<Expr>),
    Call(Func, Box<Expr>),
}

impl Expr {
    /// Parse expression text.
    pub fn parse(text: &str) -> ExprResult<Self> {
        let tokens = tokenize(text)?;
        if tokens.is_empty() { return Err(ExprError::Empty); }
        let mut parser = Parser { tokens: &tokens, pos: 0, depth: 0 };
        let (expr, _) = parser.expr()?;
        match parser.peek() {
            None => Ok(expr),
            Some(tok) => Err(ExprError::Unexpected {
                offset: tok.offset,
                expected: "an operator or the end of the expression",
            }),
        }
    }

    /// Evaluate at `x`.
    ///
    /// Every intermediate value is required to be finite.
    pub fn eval(&self, x: f64) -> EvalResult<f64> {
        let val
            = match self {
                Self::Num(v) => *v,
                Self::X => x,
                Self::Neg(a) => -a.eval(x)?,
                Self::Bin(op, a, b) => op.apply(a.eval(x)?, b.eval(x)?)?,
                Self::Call(f, a) => f.apply(a.eval(x)?)?,
            };
        val.is_finite().then_some(val).ok_or(EvalError::NonFinite)
    }

    /// Return `true` if the expression does not reference `x`.
    pub fn is_constant(&self) -> bool {
        match self {
            Self::Num(_) => true,
            Self::X => false,
            Self::Neg(a) | Self::Call(_, a) => a.is_constant(),
            Self::Bin(_, a, b) => a.is_constant() && b.is_constant(),
        }
    }
}

impl std::str::FromStr for Expr {
    type Err = ExprError;

    fn from_str(s: &str) -> ExprResult<Self> { Self::parse(s) }
}

#[derive(Clone, Debug, PartialEq)]
enum Tok {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
}

#[derive(Clone, Debug, PartialEq)]
struct Token {
    tok: Tok,
    offset: usize,
}

fn tokenize(text: &str) -> ExprResult<Vec<Token>> {
    let bytes = text.as_bytes();
    let mut tokens: Vec<Token> = Vec::new();
    let mut pos: usize = 0;
    while pos < bytes.len() {
        let offset = pos;
        let b = bytes[pos];
        let tok
            = match b {
                b' ' | b'\t' | b'\n' | b'\r' => { pos += 1; continue; },
                b'+' => { pos += 1; Tok::Plus },
                b'-' => { pos += 1; Tok::Minus },
                b'*' if bytes.get(pos + 1) == Some(&b'*') => {
                    pos += 2;
                    Tok::Caret
                },
                b'*' => { pos += 1; Tok::Star },
                b'/' => { pos += 1; Tok::Slash },
                b'^' => { pos += 1; Tok::Caret },
                b'(' => { pos += 1; Tok::LParen },
                b')' => { pos += 1; Tok::RParen },
                b'0'..=b'9' | b'.' => {
                    pos = scan_number(bytes, pos);
                    let lit = &text[offset..pos];
                    let val: f64
                        = lit.parse()
                        .map_err(|_| ExprError::BadNumber {
                            offset,
                            text: lit.to_string(),
                        })?;
                    Tok::Num(val)
                },
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                    while pos < bytes.len()
                        && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                    {
                        pos += 1;
                    }
                    Tok::Ident(text[offset..pos].to_string())
                },
                _ => {
                    // report the full (possibly multi-byte) character
                    let ch = text[offset..].chars().next().unwrap_or('\u{fffd}');
                    return Err(ExprError::BadChar { offset, ch });
                },
            };
        tokens.push(Token { tok, offset });
    }
    Ok(tokens)
}

// scan the extent of a numeric literal starting at `pos`: digits with an
// optional fractional part and an optional exponent, the latter only if it is
// followed by at least one digit (so that `2*e` and `2e` remain distinguishable
// from `2e3`)
fn scan_number(bytes: &[u8], mut pos: usize) -> usize {
    let digits = |p: &mut usize| {
        while *p < bytes.len() && bytes[*p].is_ascii_digit() { *p += 1; }
    };
    digits(&mut pos);
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        digits(&mut pos);
    }
    if matches!(bytes.get(pos), Some(b'e') | Some(b'E')) {
        let mut p = pos + 1;
        if matches!(bytes.get(p), Some(b'+') | Some(b'-')) { p += 1; }
        if bytes.get(p).is_some_and(|b| b.is_ascii_digit()) {
            digits(&mut p);
            pos = p;
        }
    }
    pos
}

// a subtree and its height
type Node = (Expr, usize);

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    // current recursion depth
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> { self.tokens.get(self.pos) }

    fn next(&mut self, expected: &'static str) -> ExprResult<&'a Token> {
        let tok
            = self.tokens.get(self.pos)
            .ok_or(ExprError::UnexpectedEnd { expected })?;
        self.pos += 1;
        Ok(tok)
    }

    // consume `tok` if it is next, returning its offset
    fn eat(&mut self, tok: &Tok) -> Option<usize> {
        let offset
            = self.peek()
            .filter(|t| &t.tok == tok)
            .map(|t| t.offset)?;
        self.pos += 1;
        Some(offset)
    }

    fn enter(&mut self, offset: usize) -> ExprResult<()> {
        self.depth += 1;
        (self.depth <= MAX_DEPTH).then_some(())
            .ok_or(ExprError::TooDeep { offset })
    }

    fn leave(&mut self) { self.depth -= 1; }

    fn height(h: usize, offset: usize) -> ExprResult<usize> {
        (h <= MAX_DEPTH).then_some(h).ok_or(ExprError::TooDeep { offset })
    }

    fn bin(op: BinOp, lhs: Node, rhs: Node, offset: usize) -> ExprResult<Node> {
        let h = Self::height(lhs.1.max(rhs.1) + 1, offset)?;
        Ok((Expr::Bin(op, Box::new(lhs.0), Box::new(rhs.0)), h))
    }

    fn expr(&mut self) -> ExprResult<Node> {
        let mut lhs = self.term()?;
        loop {
            let (op, offset)
                = if let Some(offset) = self.eat(&Tok::Plus) {
                    (BinOp::Add, offset)
                } else if let Some(offset) = self.eat(&Tok::Minus) {
                    (BinOp::Sub, offset)
                } else {
                    return Ok(lhs);
                };
            let rhs = self.term()?;
            lhs = Self::bin(op, lhs, rhs, offset)?;
        }
    }

    fn term(&mut self) -> ExprResult<Node> {
        let mut lhs = self.unary()?;
        loop {
            let (op, offset)
                = if let Some(offset) = self.eat(&Tok::Star) {
                    (BinOp::Mul, offset)
                } else if let Some(offset) = self.eat(&Tok::Slash) {
                    (BinOp::Div, offset)
                } else {
                    return Ok(lhs);
                };
            let rhs = self.unary()?;
            lhs = Self::bin(op, lhs, rhs, offset)?;
        }
    }

    fn unary(&mut self) -> ExprResult<Node> {
        let (neg, offset)
            = if let Some(offset) = self.eat(&Tok::Minus) {
                (true, offset)
            } else if let Some(offset) = self.eat(&Tok::Plus) {
                (false, offset)
            } else {
                return self.power();
            };
        self.enter(offset)?;
        let (inner, h) = self.unary()?;
        self.leave();
        if neg {
            Ok((Expr::Neg(Box::new(inner)), Self::height(h + 1, offset)?))
        } else {
            Ok((inner, h))
        }
    }

    fn power(&mut self) -> ExprResult<Node> {
        let base = self.atom()?;
        if let Some(offset) = self.eat(&Tok::Caret) {
            self.enter(offset)?;
            let exp = self.unary()?;
            self.leave();
            Self::bin(BinOp::Pow, base, exp, offset)
        } else {
            Ok(base)
        }
    }

    fn atom(&mut self) -> ExprResult<Node> {
        const EXPECTED: &str = "a number, `x`, a function call, or `(`";
        let tok = self.next(EXPECTED)?;
        match &tok.tok {
            Tok::Num(v) => Ok((Expr::Num(*v), 1)),
            Tok::LParen => {
                self.enter(tok.offset)?;
                let inner = self.expr()?;
                self.close()?;
                self.leave();
                Ok(inner)
            },
            Tok::Ident(name) => match name.as_str() {
                "x" => Ok((Expr::X, 1)),
                "pi" => Ok((Expr::Num(PI), 1)),
                "e" => Ok((Expr::Num(E), 1)),
                _ => {
                    let func
                        = Func::from_name(name)
                        .ok_or_else(|| ExprError::UnknownIdent {
                            offset: tok.offset,
                            name: name.clone(),
                        })?;
                    let open = self.next("`(`")?;
                    if open.tok != Tok::LParen {
                        return Err(ExprError::Unexpected {
                            offset: open.offset,
                            expected: "`(`",
                        });
                    }
                    self.enter(tok.offset)?;
                    let (arg, h) = self.expr()?;
                    self.close()?;
                    self.leave();
                    Ok((Expr::Call(func, Box::new(arg)), Self::height(h + 1, tok.offset)?))
                },
            },
            _ => Err(ExprError::Unexpected { offset: tok.offset, expected: EXPECTED }),
        }
    }

    fn close(&mut self) -> ExprResult<()> {
        let tok = self.next("`)`")?;
        (tok.tok == Tok::RParen).then_some(())
            .ok_or(ExprError::Unexpected { offset: tok.offset, expected: "`)`" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(text: &str, x: f64) -> f64 {
        Expr::parse(text).unwrap().eval(x).unwrap()
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval("1 + 2 * 3", 0.0), 7.0);
        assert_eq!(eval("(1 + 2) * 3", 0.0), 9.0);
        assert_eq!(eval("8 / 4 / 2", 0.0), 1.0);
        assert_eq!(eval("2 ^ 3 ^ 2", 0.0), 512.0);
        assert_eq!(eval("2 ** 3", 0.0), 8.0);
        assert_eq!(eval("-x^2", 3.0), -9.0);
        assert_eq!(eval("2^-1", 0.0), 0.5);
        assert_eq!(eval("--x", 4.0), 4.0);
        assert_eq!(eval("+x - 1", 4.0), 3.0);
    }

    #[test]
    fn literals_and_constants() {
        assert_eq!(eval("1e-3", 0.0), 1e-3);
        assert_eq!(eval("2.5E2", 0.0), 250.0);
        assert_eq!(eval(".5", 0.0), 0.5);
        assert_eq!(eval("2*e", 0.0), 2.0 * E);
        assert_eq!(eval("pi", 0.0), PI);
        assert_eq!(eval("0.5 * x**2", 2.0), 2.0);
    }

    #[test]
    fn functions() {
        assert!((eval("sin(pi / 2)", 0.0) - 1.0).abs() < 1e-15);
        assert_eq!(eval("sqrt(abs(x))", -16.0), 4.0);
        assert!((eval("log(exp(x))", 2.0) - 2.0).abs() < 1e-15);
        assert!((eval("log10(1000)", 0.0) - 3.0).abs() < 1e-15);
        assert_eq!(eval("tanh(0)", 0.0), 0.0);
    }

    #[test]
    fn evaluation_errors() {
        let recip = Expr::parse("1/x").unwrap();
        assert_eq!(recip.eval(0.0), Err(EvalError::DivisionByZero));
        assert_eq!(recip.eval(2.0), Ok(0.5));
        assert_eq!(
            Expr::parse("sqrt(x)").unwrap().eval(-1.0),
            Err(EvalError::Domain { func: "sqrt", arg: -1.0 }),
        );
        assert!(matches!(
            Expr::parse("ln(x)").unwrap().eval(0.0),
            Err(EvalError::Domain { func: "ln", .. }),
        ));
        assert!(matches!(
            Expr::parse("asin(2)").unwrap().eval(0.0),
            Err(EvalError::Domain { func: "asin", .. }),
        ));
        assert!(matches!(
            Expr::parse("x^0.5").unwrap().eval(-4.0),
            Err(EvalError::Domain { func: "^", .. }),
        ));
        assert_eq!(
            Expr::parse("exp(1000)").unwrap().eval(0.0),
            Err(EvalError::NonFinite),
        );
        assert_eq!(
            Expr::parse("0^-1").unwrap().eval(0.0),
            Err(EvalError::DivisionByZero),
        );
    }

    #[test]
    fn parse_errors() {
        assert_eq!(Expr::parse(""), Err(ExprError::Empty));
        assert_eq!(Expr::parse("   "), Err(ExprError::Empty));
        assert_eq!(
            Expr::parse("y + 1"),
            Err(ExprError::UnknownIdent { offset: 0, name: "y".to_string() }),
        );
        assert!(matches!(
            Expr::parse("__import__(x)"),
            Err(ExprError::UnknownIdent { offset: 0, .. }),
        ));
        assert_eq!(
            Expr::parse("x; 1"),
            Err(ExprError::BadChar { offset: 1, ch: ';' }),
        );
        assert!(matches!(Expr::parse("1 2"), Err(ExprError::Unexpected { offset: 2, .. })));
        assert!(matches!(Expr::parse("(x + 1"), Err(ExprError::UnexpectedEnd { .. })));
        assert!(matches!(Expr::parse("sin x"), Err(ExprError::Unexpected { offset: 4, .. })));
        assert!(matches!(Expr::parse("x +"), Err(ExprError::UnexpectedEnd { .. })));
        assert_eq!(
            Expr::parse("x * ."),
            Err(ExprError::BadNumber { offset: 4, text: ".".to_string() }),
        );
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = |n: usize| format!("{}x{}", "(".repeat(n), ")".repeat(n));
        assert_eq!(eval(&nested(MAX_DEPTH), 2.0), 2.0);
        assert_eq!(
            Expr::parse(&nested(200_000)),
            Err(ExprError::TooDeep { offset: MAX_DEPTH }),
        );
        assert_eq!(
            Expr::parse(&format!("{}x", "-".repeat(200_000))),
            Err(ExprError::TooDeep { offset: MAX_DEPTH }),
        );
        assert!(matches!(
            Expr::parse(&format!("{}x{}", "sin(".repeat(100_000), ")".repeat(100_000))),
            Err(ExprError::TooDeep { .. }),
        ));
        assert!(matches!(
            Expr::parse(&format!("2{}", "^2".repeat(100_000))),
            Err(ExprError::TooDeep { .. }),
        ));

        // long flat chains build deep trees without recursing
        let chain = |n: usize| format!("x{}", "+x".repeat(n));
        assert_eq!(eval(&chain(100), 1.0), 101.0);
        assert!(matches!(Expr::parse(&chain(200_000)), Err(ExprError::TooDeep { .. })));
    }

    #[test]
    fn constant_detection() {
        assert!(Expr::parse("2 * pi").unwrap().is_constant());
        assert!(!Expr::parse("2 * sin(x)").unwrap().is_constant());
    }
}
