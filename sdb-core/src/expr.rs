//! Expression evaluation engine
//!
//! Evaluates a token range recursively by splitting it at its main operator:
//! the loosest-binding operator outside any parentheses. Operands are decimal
//! or hexadecimal literals and `$`-prefixed registers; `*` and `-` in prefix
//! position read memory and negate.

use crate::config::SdbConfig;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::machine::{Machine, Memory, RegisterFile};
use crate::types::{Result, SdbError, Word, WORD_BYTES};

/// Expression evaluator
pub struct Evaluator {
    lexer: Lexer,
}

impl Evaluator {
    /// Create an evaluator with the given bounds
    pub fn new(config: &SdbConfig) -> Result<Self> {
        Ok(Self {
            lexer: Lexer::new(config)?,
        })
    }

    /// Tokenize and evaluate `text` against `machine`
    pub fn evaluate<M: Machine + ?Sized>(&self, text: &str, machine: &M) -> Result<Word> {
        let tokens = self.lexer.tokenize(text)?;
        if tokens.is_empty() {
            return Err(SdbError::Parse("empty expression".to_string()));
        }

        let value = eval(&tokens, 0, tokens.len() - 1, machine);
        if let Err(ref e) = value {
            log::debug!("failed to evaluate \"{}\": {}", text, e);
        }
        value
    }

    /// Access the tokenizer (for diagnostics)
    pub fn lexer(&self) -> &Lexer {
        &self.lexer
    }
}

/// Evaluate the inclusive token range `[p, q]`
fn eval<M: Machine + ?Sized>(tokens: &[Token], p: usize, q: usize, machine: &M) -> Result<Word> {
    if p > q {
        return Err(SdbError::Parse(format!("empty operand at token {}", p)));
    }

    if p == q {
        return eval_operand(&tokens[p], machine);
    }

    if check_parentheses(tokens, p, q) {
        return eval(tokens, p + 1, q - 1, machine);
    }

    let op = find_main_op(tokens, p, q).ok_or_else(|| {
        SdbError::Parse(format!("no main operator between tokens {} and {}", p, q))
    })?;
    let kind = tokens[op].kind;

    if kind.is_unary() {
        if op != p {
            return Err(SdbError::Parse(format!(
                "operand before prefix operator {} at token {}",
                kind, op
            )));
        }
        let operand = eval(tokens, op + 1, q, machine)?;
        return Ok(match kind {
            TokenKind::Deref => machine.read(operand, WORD_BYTES),
            _ => operand.wrapping_neg(),
        });
    }

    if op == p {
        return Err(SdbError::Parse(format!("missing left operand for {}", kind)));
    }
    // Both sides are always evaluated, `&&` and `||` included
    let lhs = eval(tokens, p, op - 1, machine)?;
    let rhs = eval(tokens, op + 1, q, machine)?;
    apply_binary(kind, lhs, rhs)
}

fn eval_operand<M: Machine + ?Sized>(token: &Token, machine: &M) -> Result<Word> {
    match token.kind {
        TokenKind::Num => parse_number(&token.text),
        TokenKind::Reg => {
            let name = token.text.strip_prefix('$').unwrap_or(&token.text);
            machine
                .register(name)
                .ok_or_else(|| SdbError::UnknownRegister(name.to_string()))
        }
        other => Err(SdbError::Parse(format!("invalid single token: {}", other))),
    }
}

/// Parse a literal: hexadecimal with a `0x`/`0X` prefix, decimal otherwise
fn parse_number(text: &str) -> Result<Word> {
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => Word::from_str_radix(hex, 16),
        None => text.parse::<Word>(),
    };
    parsed.map_err(|e| SdbError::Parse(format!("invalid number {}: {}", text, e)))
}

fn apply_binary(kind: TokenKind, lhs: Word, rhs: Word) -> Result<Word> {
    let value = match kind {
        TokenKind::Plus => lhs.wrapping_add(rhs),
        TokenKind::Minus => lhs.wrapping_sub(rhs),
        TokenKind::Star => lhs.wrapping_mul(rhs),
        TokenKind::Slash => lhs.checked_div(rhs).ok_or(SdbError::DivisionByZero)?,
        TokenKind::Eq => (lhs == rhs) as Word,
        TokenKind::Neq => (lhs != rhs) as Word,
        TokenKind::And => (lhs != 0 && rhs != 0) as Word,
        TokenKind::Or => (lhs != 0 || rhs != 0) as Word,
        TokenKind::BitAnd => lhs & rhs,
        TokenKind::BitOr => lhs | rhs,
        TokenKind::BitXor => lhs ^ rhs,
        other => return Err(SdbError::Parse(format!("unknown operator: {}", other))),
    };
    Ok(value)
}

/// True when `[p, q]` is wrapped by a single matching pair of parentheses
fn check_parentheses(tokens: &[Token], p: usize, q: usize) -> bool {
    if tokens[p].kind != TokenKind::LParen || tokens[q].kind != TokenKind::RParen {
        return false;
    }

    let mut depth: i32 = 0;
    for (i, token) in tokens.iter().enumerate().take(q + 1).skip(p) {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth -= 1,
            _ => {}
        }
        // Closed before the end: `(a) + (b)` is not wrapped
        if depth == 0 && i < q {
            return false;
        }
    }
    depth == 0
}

/// Locate the operator that splits `[p, q]`
///
/// Tokens inside parentheses are skipped. The lowest precedence rank wins.
/// Among equal binary ranks the rightmost wins so chains associate to the
/// left; among prefix operators the leftmost wins so the outermost one is
/// applied last.
fn find_main_op(tokens: &[Token], p: usize, q: usize) -> Option<usize> {
    let mut best: Option<(usize, u8)> = None;
    let mut depth: i32 = 0;

    for (i, token) in tokens.iter().enumerate().take(q + 1).skip(p) {
        match token.kind {
            TokenKind::LParen => {
                depth += 1;
                continue;
            }
            TokenKind::RParen => {
                depth -= 1;
                continue;
            }
            _ if depth > 0 => continue,
            _ => {}
        }

        let Some(rank) = token.kind.precedence() else {
            continue;
        };
        let replace = match best {
            None => true,
            Some((_, best_rank)) if token.kind.is_unary() => rank < best_rank,
            Some((_, best_rank)) => rank <= best_rank,
        };
        if replace {
            best = Some((i, rank));
        }
    }

    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::{GuestMemory, Riscv32Registers};
    use std::cell::RefCell;

    struct TestMachine {
        regs: Riscv32Registers,
        mem: GuestMemory,
        reads: RefCell<Vec<(Word, usize)>>,
    }

    impl TestMachine {
        fn new() -> Self {
            let mut regs = Riscv32Registers::new();
            regs.set("a0", 10).unwrap();
            regs.set("sp", 0x10).unwrap();
            regs.set_pc(0x8000_0000);
            let mut mem = GuestMemory::new(0, 64);
            mem.write_word(0x0, 0xcafe_babe).unwrap();
            mem.write_word(0x10, 0x20).unwrap();
            mem.write_word(0x20, 7).unwrap();
            Self {
                regs,
                mem,
                reads: RefCell::new(Vec::new()),
            }
        }
    }

    impl RegisterFile for TestMachine {
        fn register(&self, name: &str) -> Option<Word> {
            self.regs.register(name)
        }
    }

    impl Memory for TestMachine {
        fn read(&self, addr: Word, width: usize) -> Word {
            self.reads.borrow_mut().push((addr, width));
            self.mem.read(addr, width)
        }
    }

    fn eval_str(text: &str) -> Result<Word> {
        let evaluator = Evaluator::new(&SdbConfig::default()).unwrap();
        evaluator.evaluate(text, &TestMachine::new())
    }

    #[test]
    fn test_precedence() {
        assert_eq!(eval_str("2+3*4"), Ok(14));
        assert_eq!(eval_str("(2+3)*4"), Ok(20));
        assert_eq!(eval_str("1||0&&0"), Ok(1));
        assert_eq!(eval_str("1 | 6 ^ 3 & 5"), Ok(1 | (6 ^ (3 & 5))));
        assert_eq!(eval_str("1 + 1 == 2"), Ok(1));
        assert_eq!(eval_str("4 & 2 == 2"), Ok(4 & 1));
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(eval_str("8-3-2"), Ok(3));
        assert_eq!(eval_str("16/4/2"), Ok(2));
        assert_eq!(eval_str("10-2+3"), Ok(11));
        assert_eq!(eval_str("2*3/4"), Ok(1));
        assert_eq!(eval_str("100 / 10 * 2"), Ok(20));
    }

    #[test]
    fn test_literals() {
        assert_eq!(eval_str("0x10"), Ok(16));
        assert_eq!(eval_str("0XfF"), Ok(255));
        assert_eq!(eval_str("007"), Ok(7));
        assert_eq!(eval_str("4294967295"), Ok(Word::MAX));
        assert!(matches!(eval_str("4294967296"), Err(SdbError::Parse(_))));
        assert!(matches!(eval_str("0x100000000"), Err(SdbError::Parse(_))));
    }

    #[test]
    fn test_wrapping_arithmetic() {
        assert_eq!(eval_str("0 - 1"), Ok(Word::MAX));
        assert_eq!(eval_str("0xffffffff + 2"), Ok(1));
        assert_eq!(eval_str("0x80000000 * 2"), Ok(0));
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(eval_str("-3+5"), Ok(2));
        assert_eq!(eval_str("-1"), Ok(Word::MAX));
        assert_eq!(eval_str("2*-3"), Ok((-6i32) as Word));
        assert_eq!(eval_str("--3"), Ok(3));
        assert_eq!(eval_str("-(1+2)"), Ok((-3i32) as Word));
        assert_eq!(eval_str("5 - -1"), Ok(6));
    }

    #[test]
    fn test_dereference() {
        let evaluator = Evaluator::new(&SdbConfig::default()).unwrap();
        let machine = TestMachine::new();

        assert_eq!(evaluator.evaluate("*0", &machine), Ok(0xcafe_babe));
        assert_eq!(machine.reads.borrow().as_slice(), &[(0, WORD_BYTES)]);

        assert_eq!(evaluator.evaluate("**$sp", &machine), Ok(7));
        assert_eq!(evaluator.evaluate("*$sp + 1", &machine), Ok(0x21));
        assert_eq!(evaluator.evaluate("*($sp + 0x10)", &machine), Ok(7));
        assert_eq!(evaluator.evaluate("-*0x20", &machine), Ok((-7i32) as Word));
        assert_eq!(evaluator.evaluate("2 * *0x20", &machine), Ok(14));
    }

    #[test]
    fn test_registers() {
        assert_eq!(eval_str("$a0"), Ok(10));
        assert_eq!(eval_str("$pc"), Ok(0x8000_0000));
        assert_eq!(eval_str("$0"), Ok(0));
        assert_eq!(eval_str("$a0 * 2 + $sp"), Ok(0x24));
        assert_eq!(
            eval_str("$bogus + 1"),
            Err(SdbError::UnknownRegister("bogus".to_string()))
        );
    }

    #[test]
    fn test_logical_and_relational() {
        assert_eq!(eval_str("3 && 4"), Ok(1));
        assert_eq!(eval_str("3 && 0"), Ok(0));
        assert_eq!(eval_str("0 || 0"), Ok(0));
        assert_eq!(eval_str("5 != 5"), Ok(0));
        assert_eq!(eval_str("$a0 == 10"), Ok(1));
    }

    #[test]
    fn test_logical_operators_evaluate_both_sides() {
        // The right-hand side is still evaluated, so its failure is reported
        assert_eq!(eval_str("1 || 1/0"), Err(SdbError::DivisionByZero));
        assert_eq!(
            eval_str("0 && $nope"),
            Err(SdbError::UnknownRegister("nope".to_string()))
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(eval_str("5/0"), Err(SdbError::DivisionByZero));
        assert_eq!(eval_str("5/(2-2)"), Err(SdbError::DivisionByZero));
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(eval_str(""), Err(SdbError::Parse(_))));
        assert!(matches!(eval_str("   "), Err(SdbError::Parse(_))));
        assert!(matches!(eval_str("("), Err(SdbError::Parse(_))));
        assert!(matches!(eval_str("()"), Err(SdbError::Parse(_))));
        assert!(matches!(eval_str("1 +"), Err(SdbError::Parse(_))));
        assert!(matches!(eval_str("+ 1"), Err(SdbError::Parse(_))));
        assert!(matches!(eval_str("1 2"), Err(SdbError::Parse(_))));
        assert!(matches!(eval_str("(1 + 2"), Err(SdbError::Parse(_))));
        assert!(matches!(eval_str("1 + #"), Err(SdbError::Lex { position: 4, .. })));
    }

    #[test]
    fn test_nested_parentheses() {
        assert_eq!(eval_str("((1))"), Ok(1));
        assert_eq!(eval_str("(1 + 2) * (3 + 4)"), Ok(21));
        assert_eq!(eval_str("((2 + 3) * (4 - 1)) / 5"), Ok(3));
    }

    #[test]
    fn test_check_parentheses() {
        let lexer = Lexer::new(&SdbConfig::default()).unwrap();
        let wrapped = lexer.tokenize("(1 + (2))").unwrap();
        assert!(check_parentheses(&wrapped, 0, wrapped.len() - 1));

        let split = lexer.tokenize("(1) + (2)").unwrap();
        assert!(!check_parentheses(&split, 0, split.len() - 1));
    }

    #[test]
    fn test_find_main_op() {
        let lexer = Lexer::new(&SdbConfig::default()).unwrap();

        let tokens = lexer.tokenize("1 - 2 - 3").unwrap();
        assert_eq!(find_main_op(&tokens, 0, tokens.len() - 1), Some(3));

        let tokens = lexer.tokenize("(1 || 2) * 3").unwrap();
        assert_eq!(find_main_op(&tokens, 0, tokens.len() - 1), Some(5));

        let tokens = lexer.tokenize("- - 1").unwrap();
        assert_eq!(find_main_op(&tokens, 0, tokens.len() - 1), Some(0));

        let tokens = lexer.tokenize("(1)").unwrap();
        assert_eq!(find_main_op(&tokens, 0, tokens.len() - 1), None);
    }
}
