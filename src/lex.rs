// SPDX: CC0-1.0

use crate::eval::OperatorTyp;
use core::{fmt, iter::Peekable, str::CharIndices};
use std::sync::Arc;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubStr {
    // yes, silly, but atomic operations are cheap for this use case
    src: Arc<String>,
    start: usize,
    len: usize,
}

impl SubStr {
    #[inline]
    pub const fn new(src: Arc<String>, start: usize, len: usize) -> Self {
        Self { src, start, len }
    }

    #[inline]
    pub fn all(src: Arc<String>) -> Self {
        let len = src.len();
        Self::new(src, 0, len)
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(&self.src)
    }

    pub const fn start(&self) -> usize {
        self.start
    }

    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self) -> &str {
        &self.src[self.start..self.start + self.len]
    }

    pub fn column(&self) -> usize {
        self.src[..self.start].chars().count()
    }

    pub fn width(&self) -> usize {
        self.get().chars().count()
    }

    pub fn shift_right(&mut self, by: usize) {
        self.len += by;
    }
}

impl fmt::Display for SubStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.get())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokTyp {
    Ident,
    Number,
    Op(OperatorTyp),
    OpenParen,
    CloseParen,

    // unsupported tokens
    XComma,
    XGreater,
    XLess,
    XEqual,
    XPipe,
    XOpenSquareBracket,
    XCloseSquareBracket,
    XOpenCurly,
    XCloseCurly,
}

impl TokTyp {
    pub const fn is_unsupported(&self) -> bool {
        match self {
            Self::Ident | Self::Number | Self::Op(_) | Self::OpenParen | Self::CloseParen => false,

            // unsupported tokens
            Self::XComma
            | Self::XGreater
            | Self::XLess
            | Self::XEqual
            | Self::XPipe
            | Self::XOpenSquareBracket
            | Self::XCloseSquareBracket
            | Self::XOpenCurly
            | Self::XCloseCurly => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Tok {
    pub typ: TokTyp,
    pub loc: SubStr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LexErrTyp {
    InvalidChar,
    Unsupported(TokTyp),
}

impl fmt::Display for LexErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChar => write!(f, "invalid character"),
            Self::Unsupported(_) => write!(f, "unsupported character"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LexErr {
    pub typ: LexErrTyp,
    pub loc: SubStr,
}

const PI_CHAR: char = 'π';

const fn starts_ident(chr: char) -> bool {
    chr.is_ascii_alphabetic() || chr == PI_CHAR
}

const fn continues_ident(chr: char) -> bool {
    starts_ident(chr) || chr.is_ascii_digit() || chr == '_'
}

const fn continues_number(chr: char) -> bool {
    chr.is_ascii_digit() || chr == '.'
}

#[derive(Debug)]
pub struct Lexer<'src> {
    src: &'src Arc<String>,
    cur: Peekable<CharIndices<'src>>,
    has_errored: bool, // tells iter to yield None after error
}

impl<'src> Lexer<'src> {
    pub fn new(src: &'src Arc<String>) -> Self {
        Self {
            src,
            cur: src.char_indices().peekable(),
            has_errored: false,
        }
    }

    pub fn src(&self) -> Arc<String> {
        Arc::clone(self.src)
    }

    pub fn trim_whitespace(&mut self) {
        while self.cur.next_if(|(_, chr)| chr.is_whitespace()).is_some() {}
    }

    pub fn consume_unambiguous(&mut self) -> Option<Tok> {
        let (idx, chr) = self.cur.peek().copied()?;
        let typ = match chr {
            '+' => TokTyp::Op(OperatorTyp::Add),
            // negation is decided by the parser, which knows what came before
            '-' => TokTyp::Op(OperatorTyp::Sub),
            '*' => TokTyp::Op(OperatorTyp::Mul),
            '/' => TokTyp::Op(OperatorTyp::Div),
            '^' => TokTyp::Op(OperatorTyp::Pow),
            '(' => TokTyp::OpenParen,
            ')' => TokTyp::CloseParen,

            ',' => TokTyp::XComma,
            '>' => TokTyp::XGreater,
            '<' => TokTyp::XLess,
            '=' => TokTyp::XEqual,
            '|' => TokTyp::XPipe,
            '[' => TokTyp::XOpenSquareBracket,
            ']' => TokTyp::XCloseSquareBracket,
            '{' => TokTyp::XOpenCurly,
            '}' => TokTyp::XCloseCurly,
            _ => return None,
        };
        self.cur.next();
        Some(Tok {
            typ,
            loc: SubStr::new(Arc::clone(self.src), idx, chr.len_utf8()),
        })
    }

    pub fn consume_by<P>(&mut self, next_idx: usize, typ: TokTyp, predicate: P) -> Option<Tok>
    where
        P: Fn(char) -> bool,
    {
        let mut tok = Tok {
            typ,
            loc: SubStr::new(Arc::clone(self.src), next_idx, 0),
        };
        while let Some((_, chr)) = self.cur.next_if(|(_, chr)| predicate(*chr)) {
            tok.loc.shift_right(chr.len_utf8());
        }
        if tok.loc.is_empty() {
            None
        } else {
            Some(tok)
        }
    }

    /// Extends a number token over an exponent such as `e-4` or `E3`. An `e`
    /// without digits after it is left alone, so `2e` still reads as 2 * e.
    pub fn consume_exponent(&mut self, tok: &mut Tok) {
        let mut ahead = self.cur.clone();
        if ahead.next_if(|(_, chr)| matches!(chr, 'e' | 'E')).is_none() {
            return;
        }
        let mut len = 1;
        if ahead.next_if(|(_, chr)| matches!(chr, '+' | '-')).is_some() {
            len += 1;
        }
        let mut digits = 0;
        while ahead.next_if(|(_, chr)| chr.is_ascii_digit()).is_some() {
            digits += 1;
        }
        if digits > 0 {
            tok.loc.shift_right(len + digits);
            self.cur = ahead;
        }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Tok, LexErr>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.has_errored {
            return None;
        }

        self.trim_whitespace();

        let (next_idx, next_chr) = self.cur.peek().copied()?;
        let tok = if let Some(tok) = self.consume_unambiguous() {
            Some(tok)
        } else if starts_ident(next_chr) {
            self.consume_by(next_idx, TokTyp::Ident, continues_ident)
        } else {
            self.consume_by(next_idx, TokTyp::Number, continues_number)
                .map(|mut tok| {
                    self.consume_exponent(&mut tok);
                    tok
                })
        };

        let ret = match tok {
            Some(tok) if tok.typ.is_unsupported() => Err(LexErr {
                typ: LexErrTyp::Unsupported(tok.typ),
                loc: tok.loc,
            }),
            Some(tok) => Ok(tok),
            None => Err(LexErr {
                typ: LexErrTyp::InvalidChar,
                loc: SubStr::new(Arc::clone(self.src), next_idx, next_chr.len_utf8()),
            }),
        };
        if ret.is_err() {
            self.has_errored = true;
        }
        Some(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Result<(TokTyp, String), LexErrTyp>> {
        let src = Arc::new(src.to_string());
        Lexer::new(&src)
            .map(|tok| {
                tok.map(|tok| (tok.typ, tok.loc.get().to_string()))
                    .map_err(|err| err.typ)
            })
            .collect()
    }

    #[test]
    fn splits_numbers_idents_and_operators() {
        let toks = lex("2.5x - sin(y0)");
        let typs: Vec<_> = toks.iter().map(|t| t.clone().unwrap().0).collect();
        assert_eq!(
            typs,
            [
                TokTyp::Number,
                TokTyp::Ident,
                TokTyp::Op(OperatorTyp::Sub),
                TokTyp::Ident,
                TokTyp::OpenParen,
                TokTyp::Ident,
                TokTyp::CloseParen,
            ]
        );
        assert_eq!(toks[0].clone().unwrap().1, "2.5");
        assert_eq!(toks[5].clone().unwrap().1, "y0");
    }

    #[test]
    fn numbers_take_an_exponent() {
        for (src, text) in [("1e-4", "1e-4"), ("2.5E3", "2.5E3"), ("6e+2y", "6e+2")] {
            let (typ, got) = lex(src)[0].clone().unwrap();
            assert_eq!(typ, TokTyp::Number);
            assert_eq!(got, text);
        }
    }

    #[test]
    fn bare_e_after_number_is_the_constant() {
        let toks = lex("2e^x");
        assert_eq!(toks.len(), 4);
        assert_eq!(toks[0].clone().unwrap().1, "2");
        assert_eq!(toks[1].clone().unwrap(), (TokTyp::Ident, String::from("e")));

        let toks = lex("3e-y");
        assert_eq!(toks[1].clone().unwrap(), (TokTyp::Ident, String::from("e")));
        assert_eq!(toks[2].clone().unwrap().0, TokTyp::Op(OperatorTyp::Sub));
    }

    #[test]
    fn pi_is_an_identifier() {
        let toks = lex("2π");
        assert_eq!(toks.len(), 2);
        let (typ, text) = toks[1].clone().unwrap();
        assert_eq!(typ, TokTyp::Ident);
        assert_eq!(text, "π");
    }

    #[test]
    fn stops_after_invalid_character() {
        let toks = lex("x $ y");
        assert_eq!(toks.len(), 2);
        assert_eq!(toks[1], Err(LexErrTyp::InvalidChar));
    }

    #[test]
    fn rejects_unsupported_symbols() {
        let toks = lex("y = x");
        assert_eq!(toks[1], Err(LexErrTyp::Unsupported(TokTyp::XEqual)));
        assert_eq!(toks.len(), 2);
    }

    #[test]
    fn underline_columns_count_characters() {
        let src = Arc::new(String::from("π + $"));
        let err = Lexer::new(&src).find_map(Result::err).unwrap();
        assert_eq!(err.loc.column(), 4);
        assert_eq!(err.loc.width(), 1);
    }
}
