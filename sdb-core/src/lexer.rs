//! Expression tokenizer
//!
//! Converts a raw expression into a typed token sequence using an ordered
//! pattern table. The first rule (in declared order) that matches at the start
//! of the remaining input wins, so `&&` must precede `&` and the hexadecimal
//! literal must precede the decimal one.

use crate::config::{SdbConfig, TokenOverflow};
use crate::types::{Result, SdbError};
use regex::Regex;
use std::fmt;

/// Token kinds produced by the tokenizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
    Eq,
    Neq,
    And,
    Or,
    BitAnd,
    BitOr,
    BitXor,
    /// Decimal or hexadecimal literal
    Num,
    /// `$` followed by a register name
    Reg,
    /// Unary `*` (memory read)
    Deref,
    /// Unary `-`
    Negative,
}

impl TokenKind {
    /// True for tokens that end an operand (a following `*`/`-` is binary)
    pub fn ends_operand(self) -> bool {
        matches!(self, TokenKind::Num | TokenKind::Reg | TokenKind::RParen)
    }

    /// True for prefix operators
    pub fn is_unary(self) -> bool {
        matches!(self, TokenKind::Deref | TokenKind::Negative)
    }

    /// Precedence rank of an operator; lower binds looser and is evaluated last
    ///
    /// Returns `None` for operands and parentheses.
    pub fn precedence(self) -> Option<u8> {
        match self {
            TokenKind::Or => Some(1),
            TokenKind::And => Some(2),
            TokenKind::BitOr => Some(3),
            TokenKind::BitXor => Some(4),
            TokenKind::BitAnd => Some(5),
            TokenKind::Eq | TokenKind::Neq => Some(6),
            TokenKind::Plus | TokenKind::Minus => Some(7),
            TokenKind::Star | TokenKind::Slash => Some(8),
            TokenKind::Deref | TokenKind::Negative => Some(9),
            TokenKind::LParen | TokenKind::RParen | TokenKind::Num | TokenKind::Reg => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::Eq => "==",
            TokenKind::Neq => "!=",
            TokenKind::And => "&&",
            TokenKind::Or => "||",
            TokenKind::BitAnd => "&",
            TokenKind::BitOr => "|",
            TokenKind::BitXor => "^",
            TokenKind::Num => "NUM",
            TokenKind::Reg => "REG",
            TokenKind::Deref => "DEREF",
            TokenKind::Negative => "NEGATIVE",
        };
        write!(f, "{}", s)
    }
}

/// A single token with its (possibly truncated) source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Pattern table in priority order. `None` marks discarded input.
const RULES: &[(&str, Option<TokenKind>)] = &[
    (r"\s+", None),
    (r"\+", Some(TokenKind::Plus)),
    (r"-", Some(TokenKind::Minus)),
    (r"\*", Some(TokenKind::Star)),
    (r"/", Some(TokenKind::Slash)),
    (r"\(", Some(TokenKind::LParen)),
    (r"\)", Some(TokenKind::RParen)),
    (r"==", Some(TokenKind::Eq)),
    (r"!=", Some(TokenKind::Neq)),
    (r"&&", Some(TokenKind::And)),
    (r"\|\|", Some(TokenKind::Or)),
    (r"&", Some(TokenKind::BitAnd)),
    (r"\|", Some(TokenKind::BitOr)),
    (r"\^", Some(TokenKind::BitXor)),
    (r"0[xX][0-9a-fA-F]+", Some(TokenKind::Num)),
    (r"[0-9]+", Some(TokenKind::Num)),
    (r"\$[a-zA-Z0-9]+", Some(TokenKind::Reg)),
];

struct Rule {
    pattern: &'static str,
    regex: Regex,
    kind: Option<TokenKind>,
}

/// Tokenizer with its pattern table compiled once
pub struct Lexer {
    rules: Vec<Rule>,
    max_token_len: usize,
    max_tokens: usize,
    overflow: TokenOverflow,
}

impl Lexer {
    /// Compile the pattern table
    pub fn new(config: &SdbConfig) -> Result<Self> {
        let mut rules = Vec::with_capacity(RULES.len());
        for &(pattern, kind) in RULES {
            let regex = Regex::new(&format!("^(?:{})", pattern))?;
            rules.push(Rule {
                pattern,
                regex,
                kind,
            });
        }

        Ok(Self {
            rules,
            max_token_len: config.max_token_len,
            max_tokens: config.max_tokens,
            overflow: config.token_overflow,
        })
    }

    /// Split `text` into tokens and classify unary `*` and `-`
    pub fn tokenize(&self, text: &str) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut position = 0;

        while position < text.len() {
            let rest = &text[position..];
            let (index, rule, len) = self
                .rules
                .iter()
                .enumerate()
                .find_map(|(i, rule)| rule.regex.find(rest).map(|m| (i, rule, m.end())))
                .ok_or_else(|| SdbError::Lex {
                    position,
                    input: text.to_string(),
                })?;

            let matched = &rest[..len];
            log::trace!(
                "match rules[{}] = \"{}\" at position {} with len {}: {}",
                index,
                rule.pattern,
                position,
                len,
                matched
            );
            position += len;

            let Some(kind) = rule.kind else {
                continue;
            };

            if tokens.len() >= self.max_tokens {
                return Err(SdbError::InputTooLong {
                    what: "token count",
                    len: tokens.len() + 1,
                    max: self.max_tokens,
                });
            }
            tokens.push(Token::new(kind, self.bounded_text(matched)?));
        }

        classify_unary(&mut tokens);
        Ok(tokens)
    }

    fn bounded_text(&self, matched: &str) -> Result<String> {
        if matched.len() <= self.max_token_len {
            return Ok(matched.to_string());
        }

        match self.overflow {
            TokenOverflow::Truncate => {
                log::warn!(
                    "token \"{}\" truncated to {} characters",
                    matched,
                    self.max_token_len
                );
                // All token patterns are ASCII, so any byte offset is a char boundary
                Ok(matched[..self.max_token_len].to_string())
            }
            TokenOverflow::Reject => Err(SdbError::InputTooLong {
                what: "token",
                len: matched.len(),
                max: self.max_token_len,
            }),
        }
    }
}

/// Reclassify `*` and `-` that cannot be binary (first token, or not preceded
/// by an operand or `)`).
fn classify_unary(tokens: &mut [Token]) {
    for i in 0..tokens.len() {
        let prefix = i == 0 || !tokens[i - 1].kind.ends_operand();
        if !prefix {
            continue;
        }
        match tokens[i].kind {
            TokenKind::Star => tokens[i].kind = TokenKind::Deref,
            TokenKind::Minus => tokens[i].kind = TokenKind::Negative,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        let lexer = Lexer::new(&SdbConfig::default()).unwrap();
        lexer.tokenize(text).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_operators_prefer_longest_declared_first() {
        use TokenKind::*;
        assert_eq!(
            kinds("1 == 2 != 3 && 4 || 5 & 6 | 7 ^ 8"),
            vec![Num, Eq, Num, Neq, Num, And, Num, Or, Num, BitAnd, Num, BitOr, Num, BitXor, Num]
        );
    }

    #[test]
    fn test_hex_before_decimal() {
        let lexer = Lexer::new(&SdbConfig::default()).unwrap();
        let tokens = lexer.tokenize("0x1F+10").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], Token::new(TokenKind::Num, "0x1F"));
        assert_eq!(tokens[2], Token::new(TokenKind::Num, "10"));
    }

    #[test]
    fn test_register_tokens() {
        let lexer = Lexer::new(&SdbConfig::default()).unwrap();
        let tokens = lexer.tokenize("$a0 + $pc").unwrap();
        assert_eq!(tokens[0], Token::new(TokenKind::Reg, "$a0"));
        assert_eq!(tokens[2], Token::new(TokenKind::Reg, "$pc"));
    }

    #[test]
    fn test_whitespace_is_dropped() {
        assert_eq!(kinds("  1 \t+  2 "), vec![TokenKind::Num, TokenKind::Plus, TokenKind::Num]);
        assert!(kinds("   ").is_empty());
        assert!(kinds("").is_empty());
    }

    #[test]
    fn test_unary_classification() {
        use TokenKind::*;
        assert_eq!(kinds("-3+5"), vec![Negative, Num, Plus, Num]);
        assert_eq!(kinds("*0"), vec![Deref, Num]);
        assert_eq!(kinds("2*-3"), vec![Num, Star, Negative, Num]);
        assert_eq!(kinds("(1)-2"), vec![LParen, Num, RParen, Minus, Num]);
        assert_eq!(kinds("$sp*2"), vec![Reg, Star, Num]);
        assert_eq!(kinds("(*$sp)"), vec![LParen, Deref, Reg, RParen]);
        assert_eq!(kinds("--1"), vec![Negative, Negative, Num]);
    }

    #[test]
    fn test_no_rule_matches() {
        let lexer = Lexer::new(&SdbConfig::default()).unwrap();
        let err = lexer.tokenize("1 + @").unwrap_err();
        assert_eq!(
            err,
            SdbError::Lex {
                position: 4,
                input: "1 + @".to_string()
            }
        );

        // A lone `$` is not a register
        assert!(matches!(lexer.tokenize("$"), Err(SdbError::Lex { position: 0, .. })));
    }

    #[test]
    fn test_long_token_truncated_by_default() {
        let lexer = Lexer::new(&SdbConfig::default()).unwrap();
        let long = "1".repeat(40);
        let tokens = lexer.tokenize(&long).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text.len(), 31);
    }

    #[test]
    fn test_long_token_rejected_by_policy() {
        let config = SdbConfig::new().with_token_overflow(TokenOverflow::Reject);
        let lexer = Lexer::new(&config).unwrap();
        let err = lexer.tokenize(&format!("${}", "a".repeat(40))).unwrap_err();
        assert_eq!(
            err,
            SdbError::InputTooLong {
                what: "token",
                len: 41,
                max: 31
            }
        );
    }

    #[test]
    fn test_token_count_bound() {
        let config = SdbConfig::new().with_max_tokens(3);
        let lexer = Lexer::new(&config).unwrap();
        assert!(lexer.tokenize("1+2").is_ok());
        let err = lexer.tokenize("1+2+3").unwrap_err();
        assert!(matches!(err, SdbError::InputTooLong { what: "token count", .. }));
    }
}
