// SPDX: CC0-1.0

// implementation of shunting yard algorithm by dijkstra (see https://en.wikipedia.org/wiki/Shunting_yard_algorithm)

use crate::{
    eval::{Associativity, Fun, Ident, Idents, Operation, OperationTyp, OperatorTyp, Program},
    lex::{LexErr, LexErrTyp, Lexer, SubStr, TokTyp},
    Number,
};
use core::{fmt, num::ParseFloatError};

#[derive(Clone, Debug, PartialEq)]
pub enum ParseErrTyp {
    Empty,
    LexErr(LexErrTyp),
    ParseNum(ParseFloatError),
    ParenMismatch,
    UnknownIdent {
        similar: Option<(&'static str, &'static str)>,
    },
    ExpectedParen,
    MissingOperand {
        arity: usize,
        found: usize,
    },
    ExtraOperand {
        found: usize,
    },
}

impl fmt::Display for ParseErrTyp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty expression"),
            Self::LexErr(err) => write!(f, "{err}"),
            Self::ParseNum(err) => write!(f, "invalid number: {err}"),
            Self::ParenMismatch => write!(f, "mismatched parentheses"),
            Self::UnknownIdent { similar: None } => write!(f, "unknown identifier"),
            Self::UnknownIdent {
                similar: Some((name, kind)),
            } => write!(f, "unknown identifier (did you mean the {kind} '{name}'?)"),
            Self::ExpectedParen => write!(f, "expected '(' after function name"),
            Self::MissingOperand { arity, found } => write!(
                f,
                "operation requires {arity} operand{s}, but found {found}",
                s = if *arity == 1 { "" } else { "s" }
            ),
            Self::ExtraOperand { found } => {
                write!(f, "expression leaves {found} values instead of one")
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ParseErr {
    pub typ: ParseErrTyp,
    pub loc: SubStr,
}

impl fmt::Display for ParseErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at '{}' in '{}'", self.typ, self.loc, self.loc.src())
    }
}

impl std::error::Error for ParseErr {}

impl From<LexErr> for ParseErr {
    fn from(err: LexErr) -> Self {
        Self {
            typ: ParseErrTyp::LexErr(err.typ),
            loc: err.loc,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum ShuntOpTyp {
    Operator(OperatorTyp),
    Fun(Fun),
    OpenParen,
}

#[derive(Clone, Debug)]
struct ShuntOp {
    typ: ShuntOpTyp,
    loc: SubStr,
}

impl ShuntOp {
    fn precedence(&self) -> i8 {
        match self.typ {
            ShuntOpTyp::Operator(op) => op.precedence(),
            // a function is always applied to its parenthesized argument first
            ShuntOpTyp::Fun(_) => i8::MAX,
            ShuntOpTyp::OpenParen => i8::MIN,
        }
    }

    fn into_output(self) -> Operation {
        let typ = match self.typ {
            ShuntOpTyp::Operator(typ) => OperationTyp::Operator(typ),
            ShuntOpTyp::Fun(fun) => OperationTyp::Fun(fun),
            ShuntOpTyp::OpenParen => unreachable!("no parentheses in the output stack"),
        };
        Operation { typ, loc: self.loc }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Last {
    Nothing,
    Operand,
    Operator,
    OpenParen,
    Fun,
}

fn push_operator(out: &mut Vec<Operation>, ops: &mut Vec<ShuntOp>, o1: OperatorTyp, loc: SubStr) {
    // a prefix operator has no left operand, so there is nothing to reduce
    if o1 != OperatorTyp::Neg {
        while let Some(o2) = ops.last() {
            let reduce = !matches!(o2.typ, ShuntOpTyp::OpenParen)
                && ((o2.precedence() > o1.precedence())
                    || ((o2.precedence() == o1.precedence())
                        && (o1.associativity() == Associativity::Left)));
            if !reduce {
                break;
            }
            if let Some(o2) = ops.pop() {
                out.push(o2.into_output());
            }
        }
    }
    ops.push(ShuntOp {
        typ: ShuntOpTyp::Operator(o1),
        loc,
    });
}

fn similar_ident(text: &str, idents: &Idents) -> Option<(&'static str, &'static str)> {
    let text = text.to_lowercase();
    idents
        .iter()
        .map(|(name, ident)| {
            (
                strsim::normalized_damerau_levenshtein(&text, &name.to_lowercase()),
                *name,
                ident,
            )
        })
        .filter(|(sim, _, _)| *sim > 0.3)
        .max_by(|(l_sim, l_name, _), (r_sim, r_name, _)| {
            // ties go to the alphabetically first name so suggestions are stable
            l_sim.total_cmp(r_sim).then_with(|| r_name.cmp(l_name))
        })
        .map(|(_, name, ident)| (name, ident.kind()))
}

/// Walks the program as the evaluator would, counting stack slots instead of
/// values. Returns the deepest the stack gets.
fn check_arity(out: &[Operation], src: &SubStr) -> Result<usize, ParseErr> {
    if out.is_empty() {
        return Err(ParseErr {
            typ: ParseErrTyp::Empty,
            loc: src.clone(),
        });
    }

    let mut depth: usize = 0;
    let mut max_depth = 0;
    for op in out {
        let arity = op.arity();
        if depth < arity {
            return Err(ParseErr {
                typ: ParseErrTyp::MissingOperand {
                    arity,
                    found: depth,
                },
                loc: op.loc.clone(),
            });
        }
        depth = depth - arity + 1;
        max_depth = max_depth.max(depth);
    }

    if depth == 1 {
        Ok(max_depth)
    } else {
        Err(ParseErr {
            typ: ParseErrTyp::ExtraOperand { found: depth },
            loc: src.clone(),
        })
    }
}

pub fn parse(lex: Lexer<'_>, idents: &Idents) -> Result<Program, ParseErr> {
    let src = SubStr::all(lex.src());
    let mut out: Vec<Operation> = Vec::new(); // output
    let mut ops: Vec<ShuntOp> = Vec::new(); // operator stack
    let mut last = Last::Nothing;

    for tok in lex {
        let tok = tok?;

        if last == Last::Fun && tok.typ != TokTyp::OpenParen {
            return Err(ParseErr {
                typ: ParseErrTyp::ExpectedParen,
                loc: tok.loc,
            });
        }

        // implicit multiplication, as in '2x' or '(x + 1)(y - 1)'
        if last == Last::Operand
            && matches!(
                tok.typ,
                TokTyp::Number | TokTyp::Ident | TokTyp::OpenParen
            )
        {
            push_operator(&mut out, &mut ops, OperatorTyp::Mul, tok.loc.clone());
        }

        last = match tok.typ {
            TokTyp::Number => {
                let num: Number = match tok.loc.get().parse() {
                    Ok(val) => val,
                    Err(err) => {
                        return Err(ParseErr {
                            typ: ParseErrTyp::ParseNum(err),
                            loc: tok.loc,
                        })
                    }
                };
                out.push(Operation {
                    typ: OperationTyp::Val(num),
                    loc: tok.loc,
                });
                Last::Operand
            }

            TokTyp::Ident => match idents.get(tok.loc.get()) {
                Some(Ident::Var(idx)) => {
                    out.push(Operation {
                        typ: OperationTyp::Var(*idx),
                        loc: tok.loc,
                    });
                    Last::Operand
                }
                Some(Ident::Const(val)) => {
                    out.push(Operation {
                        typ: OperationTyp::Val(*val),
                        loc: tok.loc,
                    });
                    Last::Operand
                }
                Some(Ident::Fun(fun)) => {
                    ops.push(ShuntOp {
                        typ: ShuntOpTyp::Fun(*fun),
                        loc: tok.loc,
                    });
                    Last::Fun
                }
                None => {
                    return Err(ParseErr {
                        typ: ParseErrTyp::UnknownIdent {
                            similar: similar_ident(tok.loc.get(), idents),
                        },
                        loc: tok.loc,
                    })
                }
            },

            TokTyp::Op(o1) => {
                let prefix = last != Last::Operand;
                match o1 {
                    // unary plus changes nothing
                    OperatorTyp::Add if prefix => {}
                    OperatorTyp::Sub if prefix => {
                        push_operator(&mut out, &mut ops, OperatorTyp::Neg, tok.loc)
                    }
                    _ => push_operator(&mut out, &mut ops, o1, tok.loc),
                }
                Last::Operator
            }

            TokTyp::OpenParen => {
                ops.push(ShuntOp {
                    typ: ShuntOpTyp::OpenParen,
                    loc: tok.loc,
                });
                Last::OpenParen
            }

            TokTyp::CloseParen => {
                while let Some(op) = ops.pop() {
                    if let ShuntOpTyp::OpenParen = op.typ {
                        ops.push(op);
                        break;
                    }
                    out.push(op.into_output());
                }

                if ops.pop().is_none() {
                    return Err(ParseErr {
                        typ: ParseErrTyp::ParenMismatch,
                        loc: tok.loc,
                    });
                }

                // handle functions
                if let Some(ShuntOp {
                    typ: ShuntOpTyp::Fun(_),
                    ..
                }) = ops.last()
                {
                    if let Some(op) = ops.pop() {
                        out.push(op.into_output());
                    }
                }
                Last::Operand
            }

            TokTyp::XComma
            | TokTyp::XGreater
            | TokTyp::XLess
            | TokTyp::XEqual
            | TokTyp::XPipe
            | TokTyp::XOpenSquareBracket
            | TokTyp::XCloseSquareBracket
            | TokTyp::XOpenCurly
            | TokTyp::XCloseCurly => unreachable!("unsupported token survived until parsing"),
        };
    }

    while let Some(op) = ops.pop() {
        match op.typ {
            ShuntOpTyp::OpenParen => {
                return Err(ParseErr {
                    typ: ParseErrTyp::ParenMismatch,
                    loc: op.loc,
                })
            }
            ShuntOpTyp::Fun(_) => {
                return Err(ParseErr {
                    typ: ParseErrTyp::ExpectedParen,
                    loc: op.loc,
                })
            }
            ShuntOpTyp::Operator(_) => out.push(op.into_output()),
        }
    }

    let depth = check_arity(&out, &src)?;
    Ok(Program::new(out, depth))
}
