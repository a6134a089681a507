// SPDX: CC0-1.0

use crate::{lex::SubStr, stdlib, Number};
use core::fmt;
use std::{collections::HashMap, sync::Arc};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorTyp {
    Neg,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Associativity {
    Left,
    Right,
}

impl OperatorTyp {
    pub const fn precedence(&self) -> i8 {
        match self {
            Self::Add => 2,
            Self::Sub => 2,
            Self::Mul => 3,
            Self::Div => 3,
            Self::Neg => 4,
            Self::Pow => 5,
        }
    }

    pub const fn associativity(&self) -> Associativity {
        use Associativity::{Left, Right};
        match self {
            Self::Neg => Right,
            Self::Add => Left,
            Self::Sub => Left,
            Self::Mul => Left,
            Self::Div => Left,
            Self::Pow => Right,
        }
    }

    pub const fn fun(&self) -> (&'static str, Fun) {
        match self {
            Self::Neg => ("neg", Fun::new(1, stdlib::neg)),
            Self::Add => ("add", Fun::new(2, stdlib::add)),
            Self::Sub => ("sub", Fun::new(2, stdlib::sub)),
            Self::Mul => ("mul", Fun::new(2, stdlib::mul)),
            Self::Div => ("div", Fun::new(2, stdlib::div)),
            Self::Pow => ("pow", Fun::new(2, stdlib::pow)),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum OperationTyp {
    Operator(OperatorTyp),
    Val(Number),
    Var(usize),
    Fun(Fun),
}

#[derive(Clone, Debug)]
pub struct Operation {
    pub typ: OperationTyp,
    pub loc: SubStr,
}

impl Operation {
    pub const fn arity(&self) -> usize {
        match self.typ {
            OperationTyp::Operator(typ) => typ.fun().1.arity,
            OperationTyp::Fun(fun) => fun.arity,
            OperationTyp::Val(_) | OperationTyp::Var(_) => 0,
        }
    }

    pub fn name(&self) -> &str {
        match self.typ {
            OperationTyp::Operator(typ) => typ.fun().0,
            _ => self.loc.get(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.typ {
            OperationTyp::Val(val) => write!(f, "push {val}"),
            OperationTyp::Var(idx) => write!(f, "load '{}' (${idx})", self.loc.get()),
            OperationTyp::Operator(_) | OperationTyp::Fun(_) => write!(f, "call '{}'", self.name()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DomainErr {
    DivByZero,
    NonPositiveLog { arg: Number },
    NegativeSqrt { arg: Number },
    NonFinite,
}

impl fmt::Display for DomainErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DivByZero => write!(f, "division by zero"),
            Self::NonPositiveLog { arg } => {
                write!(f, "logarithm of non-positive number {arg}")
            }
            Self::NegativeSqrt { arg } => write!(f, "square root of negative number {arg}"),
            Self::NonFinite => write!(f, "result is not a finite number"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EvalErrTyp {
    Domain(DomainErr),
    StackMismatch { expected: usize, found: usize },
    Unbound { index: usize, bound: usize },
}

#[derive(Clone, Debug)]
pub struct EvalErr {
    pub typ: EvalErrTyp,
    pub formula: Arc<String>,
    pub op: Option<Operation>, // if none, associated with end-of-program checking
}

impl EvalErr {
    pub const fn domain(&self) -> Option<DomainErr> {
        match self.typ {
            EvalErrTyp::Domain(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for EvalErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.typ {
            EvalErrTyp::Domain(err) => match &self.op {
                Some(op) => write!(f, "{err} in '{}'", op.name())?,
                None => write!(f, "{err}")?,
            },

            EvalErrTyp::StackMismatch { expected, found } => write!(
                f,
                "expected {expected} value{s} on the stack but found {found}",
                s = if *expected == 1 { "" } else { "s" }
            )?,

            EvalErrTyp::Unbound { index, bound } => write!(
                f,
                "variable ${index} is not bound ({bound} value{s} given)",
                s = if *bound == 1 { "" } else { "s" }
            )?,
        }
        write!(f, " (evaluating '{}')", self.formula)
    }
}

impl std::error::Error for EvalErr {}

#[derive(Clone, Copy, Debug)]
pub struct Fun {
    pub arity: usize,
    pub fun: fn(&[Number]) -> Result<Number, DomainErr>,
}

impl Fun {
    pub const fn new(arity: usize, fun: fn(&[Number]) -> Result<Number, DomainErr>) -> Self {
        Self { arity, fun }
    }
}

#[derive(Clone, Copy, Debug)]
pub enum Ident {
    Var(usize),
    Const(Number),
    Fun(Fun),
}

impl Ident {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Var(_) => "variable",
            Self::Const(_) => "constant",
            Self::Fun(_) => "function",
        }
    }
}

pub type Idents = HashMap<&'static str, Ident>;

#[derive(Clone, Debug)]
pub struct Program {
    pub(crate) ops: Vec<Operation>,
    pub(crate) depth: usize,
}

impl Program {
    #[inline]
    pub const fn new(ops: Vec<Operation>, depth: usize) -> Self {
        Self { ops, depth }
    }

    #[inline]
    pub fn ops(&self) -> core::slice::Iter<'_, Operation> {
        self.ops.iter()
    }

    #[inline]
    pub const fn depth(&self) -> usize {
        self.depth
    }
}

/// Runs `prog` with `bindings[i]` as the value of variable `i`.
///
/// `stack` is scratch space and is cleared first, so one buffer can be reused
/// across calls.
pub fn eval(
    prog: &Program,
    formula: &Arc<String>,
    bindings: &[Number],
    stack: &mut Vec<Number>,
) -> Result<Number, EvalErr> {
    fn eval_fun(stack: &mut Vec<Number>, fun: Fun) -> Result<Number, EvalErrTyp> {
        let len = stack.len();
        if len < fun.arity {
            return Err(EvalErrTyp::StackMismatch {
                expected: fun.arity,
                found: len,
            });
        }
        // stack: ...a, b, c, d
        //                 ^^^^ args if arity is 2
        let start = len - fun.arity;
        let val = (fun.fun)(&stack[start..]).map_err(EvalErrTyp::Domain);
        stack.truncate(start);
        val
    }

    let fail = |typ: EvalErrTyp, op: Option<&Operation>| EvalErr {
        typ,
        formula: Arc::clone(formula),
        op: op.cloned(),
    };

    stack.clear();

    for op in prog.ops() {
        let val = match op.typ {
            OperationTyp::Val(num) => num,

            OperationTyp::Var(index) => match bindings.get(index) {
                Some(val) => *val,
                None => {
                    return Err(fail(
                        EvalErrTyp::Unbound {
                            index,
                            bound: bindings.len(),
                        },
                        Some(op),
                    ))
                }
            },

            OperationTyp::Operator(typ) => {
                eval_fun(stack, typ.fun().1).map_err(|typ| fail(typ, Some(op)))?
            }

            OperationTyp::Fun(fun) => eval_fun(stack, fun).map_err(|typ| fail(typ, Some(op)))?,
        };

        if !val.is_finite() {
            return Err(fail(EvalErrTyp::Domain(DomainErr::NonFinite), Some(op)));
        }
        stack.push(val);
    }

    match stack.as_slice() {
        [val] => Ok(*val),
        _ => Err(fail(
            EvalErrTyp::StackMismatch {
                expected: 1,
                found: stack.len(),
            },
            None,
        )),
    }
}
