// SPDX: CC0-1.0

use crate::{
    eval::{self, DomainErr, EvalErr, EvalErrTyp, Program},
    lex::Lexer,
    parse::{self, ParseErr},
    stdlib::{self, DERIVATIVE_VARS, EXACT_VARS},
    Number,
};
use core::fmt;
use std::sync::Arc;

/// A formula compiled against a fixed list of variables.
///
/// Holds no mutable state, so one `Equation` can be evaluated any number of
/// times, from any number of threads.
#[derive(Clone, Debug)]
pub struct Equation {
    formula: Arc<String>,
    prog: Program,
    vars: &'static [&'static str],
}

impl Equation {
    pub fn derivative(formula: &str) -> Result<Self, ParseErr> {
        Self::compile_with(formula, DERIVATIVE_VARS)
    }

    pub fn exact(formula: &str) -> Result<Self, ParseErr> {
        Self::compile_with(formula, EXACT_VARS)
    }

    pub fn compile_with(formula: &str, vars: &'static [&'static str]) -> Result<Self, ParseErr> {
        let formula = Arc::new(formula.trim().to_string());
        let idents = stdlib::standard_idents(vars);
        let prog = parse::parse(Lexer::new(&formula), &idents)?;
        log::debug!(
            "compiled '{formula}' to {} operations (stack depth {})",
            prog.ops.len(),
            prog.depth()
        );
        Ok(Self {
            formula,
            prog,
            vars,
        })
    }

    pub fn formula(&self) -> &str {
        &self.formula
    }

    pub fn program(&self) -> &Program {
        &self.prog
    }

    pub const fn vars(&self) -> &'static [&'static str] {
        self.vars
    }

    /// An error for a value derived from this formula that overflowed outside
    /// of evaluation, such as an integration step.
    pub fn non_finite(&self) -> EvalErr {
        EvalErr {
            typ: EvalErrTyp::Domain(DomainErr::NonFinite),
            formula: Arc::clone(&self.formula),
            op: None,
        }
    }

    pub fn eval_with(&self, values: &[Number]) -> Result<Number, EvalErr> {
        let mut stack = Vec::with_capacity(self.prog.depth());
        eval::eval(&self.prog, &self.formula, values, &mut stack)
    }

    /// Evaluates with the two variables bound in order: (x, y) for a
    /// derivative, (x, y0) for an exact solution.
    #[inline]
    pub fn eval(&self, x: Number, y: Number) -> Result<Number, EvalErr> {
        self.eval_with(&[x, y])
    }
}

impl fmt::Display for Equation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.formula)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{DomainErr, EvalErrTyp};
    use approx::assert_relative_eq;

    #[test]
    fn evaluates_arithmetic_with_bindings() {
        let eq = Equation::derivative("x + y").unwrap();
        assert_eq!(eq.eval(0.0, 1.0).unwrap(), 1.0);
        assert_eq!(eq.eval(2.5, -1.0).unwrap(), 1.5);

        let eq = Equation::derivative("2x^2 - 3y / (1 + x)").unwrap();
        assert_relative_eq!(eq.eval(1.0, 4.0).unwrap(), 2.0 - 6.0, epsilon = 1e-12);
    }

    #[test]
    fn evaluates_named_functions() {
        let eq = Equation::derivative("sin(pi / 2) + cos(0) + sqrt(4) + exp(0) + log(100) + ln(e)")
            .unwrap();
        assert_relative_eq!(eq.eval(0.0, 0.0).unwrap(), 1.0 + 1.0 + 2.0 + 1.0 + 2.0 + 1.0, epsilon = 1e-12);
    }

    #[test]
    fn compiling_twice_gives_identical_results() {
        let a = Equation::derivative("x*y - sin(x) + 2^y").unwrap();
        let b = Equation::derivative("x*y - sin(x) + 2^y").unwrap();
        for i in -10..=10 {
            let x = Number::from(i) * 0.37;
            let y = Number::from(i) * -0.21 + 1.0;
            assert_eq!(a.eval(x, y).unwrap(), b.eval(x, y).unwrap());
        }
    }

    #[test]
    fn log_of_negative_is_a_domain_error() {
        let eq = Equation::derivative("log(-1)").unwrap();
        for (x, y) in [(0.0, 0.0), (1.0, 2.0), (-3.0, 7.5)] {
            let err = eq.eval(x, y).unwrap_err();
            assert_eq!(err.domain(), Some(DomainErr::NonPositiveLog { arg: -1.0 }));
            assert_eq!(err.formula.as_str(), "log(-1)");
            assert_eq!(err.op.as_ref().map(|op| op.loc.get()), Some("log"));
        }
    }

    #[test]
    fn division_by_zero_is_a_domain_error() {
        let eq = Equation::derivative("1 / (x - 1)").unwrap();
        assert!(eq.eval(2.0, 0.0).is_ok());
        let err = eq.eval(1.0, 0.0).unwrap_err();
        assert_eq!(err.typ, EvalErrTyp::Domain(DomainErr::DivByZero));
    }

    #[test]
    fn overflow_is_a_domain_error() {
        let eq = Equation::derivative("exp(y)").unwrap();
        let err = eq.eval(0.0, 1000.0).unwrap_err();
        assert_eq!(err.domain(), Some(DomainErr::NonFinite));
    }

    #[test]
    fn reads_exponent_notation() {
        let eq = Equation::derivative("1e-4").unwrap();
        assert_eq!(eq.eval(0.0, 0.0).unwrap(), 1e-4);
        let eq = Equation::derivative("2.5e3*y").unwrap();
        assert_eq!(eq.eval(0.0, 2.0).unwrap(), 5000.0);
        let eq = Equation::derivative("2e^x").unwrap();
        assert_relative_eq!(eq.eval(1.0, 0.0).unwrap(), 2.0 * core::f64::consts::E, epsilon = 1e-12);
    }

    #[test]
    fn exact_solutions_bind_initial_value() {
        let eq = Equation::exact("(y0 + 1)e^x - x - 1").unwrap();
        assert_relative_eq!(eq.eval(0.0, 1.0).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(
            eq.eval(1.0, 1.0).unwrap(),
            2.0 * core::f64::consts::E - 2.0,
            epsilon = 1e-12
        );
        assert!(Equation::exact("y + x").is_err());
    }

    #[test]
    fn equations_can_be_shared_between_threads() {
        let eq = Arc::new(Equation::derivative("x * y").unwrap());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let eq = Arc::clone(&eq);
                std::thread::spawn(move || eq.eval(Number::from(i), 2.0).unwrap())
            })
            .collect();
        let results: Vec<Number> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(results, [0.0, 2.0, 4.0, 6.0]);
    }
}
