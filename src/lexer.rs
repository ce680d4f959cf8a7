//! Tokenizer for the reader.
//!
//! Every candidate token parser races over the characters of a single
//! token: characters are consumed while at least one parser can still
//! extend its match, then the longest-matching parser that validates
//! wins. Ties go to the earliest parser in priority order, which is why
//! `#t` lexes as a boolean and not as a symbol.

use log::trace;

use crate::error::{Error, Result};
use crate::token::{Span, Token};

const SYMBOL_HEAD: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ<=>*/#";
const SYMBOL_TAIL: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ<=>*/#0123456789?!-+";

/// One competitor in the token race.
///
/// `next` answers whether `prefix` extended by `next_char` could still
/// be this parser's token; `validate` re-checks the final text before
/// the parser is allowed to win.
trait TokenParser {
    fn name(&self) -> &'static str;

    fn next(&self, prefix: &str, next_char: char) -> bool;

    fn validate(&self, text: &str) -> bool {
        !text.is_empty()
    }

    fn build(&self, text: &str) -> Token;
}

struct SymbolParser;

impl TokenParser for SymbolParser {
    fn name(&self) -> &'static str {
        "symbol"
    }

    fn next(&self, prefix: &str, next_char: char) -> bool {
        if prefix.is_empty() {
            return SYMBOL_HEAD.contains(next_char) || next_char == '+' || next_char == '-';
        }
        // A sign only begins a symbol when it stands alone.
        !prefix.starts_with(['+', '-']) && SYMBOL_TAIL.contains(next_char)
    }

    fn build(&self, text: &str) -> Token {
        Token::Symbol(text.to_string())
    }
}

struct BooleanParser;

impl TokenParser for BooleanParser {
    fn name(&self) -> &'static str {
        "boolean"
    }

    fn next(&self, prefix: &str, next_char: char) -> bool {
        match prefix.len() {
            0 => next_char == '#',
            1 => next_char == 't' || next_char == 'f',
            _ => false,
        }
    }

    fn validate(&self, text: &str) -> bool {
        text == "#t" || text == "#f"
    }

    fn build(&self, text: &str) -> Token {
        Token::Boolean(text == "#t")
    }
}

struct ConstantParser;

impl TokenParser for ConstantParser {
    fn name(&self) -> &'static str {
        "number"
    }

    fn next(&self, prefix: &str, next_char: char) -> bool {
        if prefix.is_empty() {
            return next_char == '+' || next_char == '-' || next_char.is_ascii_digit();
        }
        next_char.is_ascii_digit()
    }

    fn validate(&self, text: &str) -> bool {
        // A bare sign is not a number, and the value must fit in i64.
        text.parse::<i64>().is_ok()
    }

    fn build(&self, text: &str) -> Token {
        Token::Constant(text.parse().expect("validated integer literal"))
    }
}

/// Matches exactly one fixed character.
struct CharParser {
    name: &'static str,
    ch: char,
    token: Token,
}

impl TokenParser for CharParser {
    fn name(&self) -> &'static str {
        self.name
    }

    fn next(&self, prefix: &str, next_char: char) -> bool {
        prefix.is_empty() && next_char == self.ch
    }

    fn build(&self, _text: &str) -> Token {
        self.token.clone()
    }
}

/// Forward cursor over the tokens of one input string.
///
/// The constructor advances once so `peek` is valid immediately;
/// `is_end` reports exhaustion of the underlying characters.
pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
    current: Option<Token>,
    current_span: Span,
    parsers: Vec<Box<dyn TokenParser>>,
}

impl Tokenizer {
    pub fn new(input: &str) -> Result<Self> {
        // Priority order of the race, highest first.
        let parsers: Vec<Box<dyn TokenParser>> = vec![
            Box::new(BooleanParser),
            Box::new(SymbolParser),
            Box::new(CharParser { name: "quote", ch: '\'', token: Token::Quote }),
            Box::new(CharParser { name: "dot", ch: '.', token: Token::Dot }),
            Box::new(CharParser { name: "open bracket", ch: '(', token: Token::Open }),
            Box::new(CharParser { name: "close bracket", ch: ')', token: Token::Close }),
            Box::new(ConstantParser),
        ];
        let mut tokenizer = Tokenizer {
            chars: input.chars().collect(),
            pos: 0,
            current: None,
            current_span: Span::default(),
            parsers,
        };
        tokenizer.advance()?;
        Ok(tokenizer)
    }

    pub fn is_end(&self) -> bool {
        self.current.is_none()
    }

    pub fn peek(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// Span of the token under the cursor; unchanged once the cursor
    /// has moved past the end of input.
    pub fn span(&self) -> Span {
        self.current_span
    }

    /// Moves the cursor to the next token, or past the end of input.
    pub fn advance(&mut self) -> Result<()> {
        self.current = self.next_token()?;
        Ok(())
    }

    fn peek_char(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        while matches!(self.peek_char(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
        if self.peek_char().is_none() {
            return Ok(None);
        }
        let start = self.pos;

        let mut text = String::new();
        // Character index at which each parser dropped out of the race.
        let mut died: Vec<Option<usize>> = vec![None; self.parsers.len()];
        let mut alive = self.parsers.len();
        let mut len = 0;
        while let Some(c) = self.peek_char() {
            for (i, parser) in self.parsers.iter().enumerate() {
                if died[i].is_none() && !parser.next(&text, c) {
                    died[i] = Some(len);
                    alive -= 1;
                    trace!("lexer: {} out after {len} chars at {start}", parser.name());
                }
            }
            if alive == 0 {
                break;
            }
            text.push(c);
            self.pos += 1;
            len += 1;
        }

        let at_end = self.peek_char().is_none();
        for (i, parser) in self.parsers.iter().enumerate() {
            let longest = match died[i] {
                Some(at) => at == len,
                None => at_end,
            };
            if longest && parser.validate(&text) {
                trace!("lexer: {} wins `{text}` at {start}..{}", parser.name(), self.pos);
                self.current_span = Span::new(start, self.pos);
                return Ok(Some(parser.build(&text)));
            }
        }
        let end = if text.is_empty() { start + 1 } else { self.pos };
        if text.is_empty() {
            if let Some(c) = self.peek_char() {
                text.push(c);
            }
        }
        Err(Error::syntax(format!(
            "unrecognized token `{text}` at {start}..{end}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Result<Vec<Token>> {
        let mut tokenizer = Tokenizer::new(input)?;
        let mut tokens = Vec::new();
        while let Some(token) = tokenizer.peek() {
            tokens.push(token.clone());
            tokenizer.advance()?;
        }
        Ok(tokens)
    }

    #[test]
    fn empty_input_is_immediately_at_end() {
        let tokenizer = Tokenizer::new("   \n\t ").unwrap();
        assert!(tokenizer.is_end());
    }

    #[test]
    fn lexes_brackets_quote_and_dot() {
        assert_eq!(
            lex("(') .").unwrap(),
            vec![Token::Open, Token::Quote, Token::Close, Token::Dot]
        );
    }

    #[test]
    fn lexes_integers_with_signs() {
        assert_eq!(
            lex("1 +2 -3 007").unwrap(),
            vec![
                Token::Constant(1),
                Token::Constant(2),
                Token::Constant(-3),
                Token::Constant(7),
            ]
        );
    }

    #[test]
    fn lone_sign_is_a_symbol() {
        assert_eq!(
            lex("+ -").unwrap(),
            vec![Token::Symbol("+".into()), Token::Symbol("-".into())]
        );
    }

    #[test]
    fn sign_followed_by_digits_is_a_number_not_a_symbol() {
        assert_eq!(lex("+41").unwrap(), vec![Token::Constant(41)]);
    }

    #[test]
    fn booleans_win_over_symbols() {
        assert_eq!(
            lex("#t #f").unwrap(),
            vec![Token::Boolean(true), Token::Boolean(false)]
        );
    }

    #[test]
    fn longer_hash_words_fall_back_to_symbols() {
        assert_eq!(lex("#tf").unwrap(), vec![Token::Symbol("#tf".into())]);
        assert_eq!(lex("#").unwrap(), vec![Token::Symbol("#".into())]);
    }

    #[test]
    fn symbols_allow_punctuation_tails() {
        assert_eq!(
            lex("null? set-car! <=>").unwrap(),
            vec![
                Token::Symbol("null?".into()),
                Token::Symbol("set-car!".into()),
                Token::Symbol("<=>".into()),
            ]
        );
    }

    #[test]
    fn adjacent_tokens_split_without_whitespace() {
        assert_eq!(
            lex("(+1)").unwrap(),
            vec![Token::Open, Token::Constant(1), Token::Close]
        );
        assert_eq!(
            lex("'x").unwrap(),
            vec![Token::Quote, Token::Symbol("x".into())]
        );
    }

    #[test]
    fn digits_extend_symbols_but_letters_never_extend_numbers() {
        assert_eq!(lex("x1").unwrap(), vec![Token::Symbol("x1".into())]);
        assert_eq!(
            lex("1x").unwrap(),
            vec![Token::Constant(1), Token::Symbol("x".into())]
        );
    }

    #[test]
    fn rejects_unknown_characters() {
        assert!(lex("@").is_err());
        assert!(lex("[1]").is_err());
    }

    #[test]
    fn tokens_carry_their_spans() {
        let mut tokenizer = Tokenizer::new("(+ 12)").unwrap();
        let mut spans = Vec::new();
        while !tokenizer.is_end() {
            spans.push(tokenizer.span());
            tokenizer.advance().unwrap();
        }
        assert_eq!(
            spans,
            vec![
                Span::new(0, 1),
                Span::new(1, 2),
                Span::new(3, 5),
                Span::new(5, 6),
            ]
        );
    }

    #[test]
    fn syntax_errors_carry_the_offending_position() {
        let err = lex("abc @").unwrap_err();
        assert_eq!(err.to_string(), "unrecognized token `@` at 4..5");
        let err = lex("12345678901234567890123").unwrap_err();
        assert!(err.to_string().contains("at 0..23"), "got: {err}");
    }

    #[test]
    fn rejects_integer_overflow() {
        assert!(lex("123456789012345678901234567890").is_err());
        assert_eq!(
            lex("9223372036854775807").unwrap(),
            vec![Token::Constant(i64::MAX)]
        );
    }
}
