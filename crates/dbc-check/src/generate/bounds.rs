//! Literal-bound discovery in precondition texts.
//!
//! Scans a condition's textual rendering for comparisons between a parameter
//! and an integer literal (`b != 0`, `0 <= x`, `n < 100`). Each hit yields a
//! [`LiteralBound`] normalized to `param op literal`. The driver turns bounds
//! into off-by-one boundary candidates, and narrows domains it inferred from
//! types alone.

use dbc_core::Domain;

/// Comparison operator in a literal bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CmpOp {
    /// The operator with its operands swapped: `3 < x` is `x > 3`.
    fn flip(self) -> CmpOp {
        match self {
            CmpOp::Lt => CmpOp::Gt,
            CmpOp::Le => CmpOp::Ge,
            CmpOp::Gt => CmpOp::Lt,
            CmpOp::Ge => CmpOp::Le,
            CmpOp::Eq => CmpOp::Eq,
            CmpOp::Ne => CmpOp::Ne,
        }
    }
}

/// `param op literal`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralBound {
    pub param: String,
    pub op: CmpOp,
    pub literal: i64,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Int(i64),
    Op(CmpOp),
    Other,
}

fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_alphabetic() || c == '_' {
            let mut ident = String::new();
            while let Some(&c) = chars.peek() {
                if c.is_alphanumeric() || c == '_' {
                    ident.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Token::Ident(ident));
        } else if c.is_ascii_digit() || (c == '-' && negation_allowed(&tokens)) {
            let mut digits = String::new();
            digits.push(c);
            chars.next();
            while let Some(&c) = chars.peek() {
                if c.is_ascii_digit() {
                    digits.push(c);
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(digits.parse().map(Token::Int).unwrap_or(Token::Other));
        } else {
            chars.next();
            let op = match (c, chars.peek().copied()) {
                ('<', Some('=')) => Some(CmpOp::Le),
                ('>', Some('=')) => Some(CmpOp::Ge),
                ('=', Some('=')) => Some(CmpOp::Eq),
                ('!', Some('=')) => Some(CmpOp::Ne),
                _ => None,
            };
            match op {
                Some(op) => {
                    chars.next();
                    tokens.push(Token::Op(op));
                }
                None => tokens.push(match c {
                    '<' => Token::Op(CmpOp::Lt),
                    '>' => Token::Op(CmpOp::Gt),
                    _ => Token::Other,
                }),
            }
        }
    }
    tokens
}

// A '-' starts a negative literal unless it follows an operand.
fn negation_allowed(tokens: &[Token]) -> bool {
    !matches!(tokens.last(), Some(Token::Ident(_)) | Some(Token::Int(_)))
}

/// Finds every `param op literal` (or `literal op param`) comparison in
/// `text` whose identifier is one of `params`.
pub fn scan(text: &str, params: &[&str]) -> Vec<LiteralBound> {
    let tokens = tokenize(text);
    let mut bounds = Vec::new();
    for window in tokens.windows(3) {
        let bound = match window {
            [Token::Ident(p), Token::Op(op), Token::Int(n)] => Some((p, *op, *n)),
            [Token::Int(n), Token::Op(op), Token::Ident(p)] => Some((p, op.flip(), *n)),
            _ => None,
        };
        if let Some((param, op, literal)) = bound {
            if params.contains(&param.as_str()) {
                bounds.push(LiteralBound {
                    param: param.clone(),
                    op,
                    literal,
                });
            }
        }
    }
    bounds
}

/// Tightens a numeric domain with the one-sided bounds in `bounds`.
///
/// Only `<`, `<=`, `>`, `>=` narrow; equality tests only contribute boundary
/// candidates. A narrowing that would empty the domain is ignored.
pub fn narrow(domain: &Domain, bounds: &[&LiteralBound]) -> Domain {
    match domain {
        Domain::Int { min, max } => {
            let (mut lo, mut hi) = (*min, *max);
            for b in bounds {
                match b.op {
                    CmpOp::Ge => lo = lo.max(b.literal),
                    CmpOp::Gt => {
                        if let Some(v) = b.literal.checked_add(1) {
                            lo = lo.max(v);
                        }
                    }
                    CmpOp::Le => hi = hi.min(b.literal),
                    CmpOp::Lt => {
                        if let Some(v) = b.literal.checked_sub(1) {
                            hi = hi.min(v);
                        }
                    }
                    CmpOp::Eq | CmpOp::Ne => {}
                }
            }
            if lo <= hi {
                Domain::Int { min: lo, max: hi }
            } else {
                domain.clone()
            }
        }
        Domain::Float { min, max } => {
            let (mut lo, mut hi) = (*min, *max);
            for b in bounds {
                let literal = b.literal as f64;
                match b.op {
                    CmpOp::Ge | CmpOp::Gt => lo = lo.max(literal),
                    CmpOp::Le | CmpOp::Lt => hi = hi.min(literal),
                    CmpOp::Eq | CmpOp::Ne => {}
                }
            }
            if lo <= hi {
                Domain::Float { min: lo, max: hi }
            } else {
                domain.clone()
            }
        }
        other => other.clone(),
    }
}
