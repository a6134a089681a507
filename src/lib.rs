// SPDX: CC0-1.0

pub mod compare;
pub mod drive;
pub mod dual;
pub mod equation;
pub mod eval;
pub mod lex;
pub mod method;
pub mod parse;
pub mod shell;
pub mod stdlib;

pub use compare::{compare_to_exact, ErrorPct, Problem, TableRow};
pub use drive::{Run, Status, StepErr};
pub use dual::DualRow;
pub use equation::Equation;
pub use method::Method;

use core::fmt;
use eval::EvalErr;
use parse::ParseErr;

pub type Number = f64;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Stop {
    Steps(usize),
    Converge {
        tolerance: Number,
        max_iterations: usize,
    },
}

impl Stop {
    pub const fn converge() -> Self {
        Self::Converge {
            tolerance: drive::DEFAULT_TOLERANCE,
            max_iterations: drive::DEFAULT_MAX_ITERATIONS,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepConfig {
    pub x0: Number,
    pub y0: Number,
    pub h: Number,
    pub stop: Stop,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            x0: 0.0,
            y0: 1.0,
            h: 0.1,
            stop: Stop::Steps(10),
        }
    }
}

impl fmt::Display for StepConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("StepConfig");
        s.field("x0", &self.x0)
            .field("y0", &self.y0)
            .field("h", &self.h);
        match self.stop {
            Stop::Steps(n) => s.field("steps", &n),
            Stop::Converge {
                tolerance,
                max_iterations,
            } => s
                .field("tolerance", &tolerance)
                .field("max iterations", &max_iterations),
        };
        s.finish()
    }
}

impl StepConfig {
    pub fn validate(&self) -> Result<(), ConfigErr> {
        for (name, value) in [("x0", self.x0), ("y0", self.y0)] {
            if !value.is_finite() {
                return Err(ConfigErr::NotFinite { name, value });
            }
        }
        if !self.h.is_finite() || self.h == 0.0 {
            return Err(ConfigErr::StepSize(self.h));
        }
        if let Stop::Converge {
            tolerance,
            max_iterations,
        } = self.stop
        {
            if !tolerance.is_finite() || tolerance <= 0.0 {
                return Err(ConfigErr::Tolerance(tolerance));
            }
            if max_iterations == 0 {
                return Err(ConfigErr::NoIterations);
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConfigErr {
    NotFinite { name: &'static str, value: Number },
    StepSize(Number),
    Tolerance(Number),
    NoIterations,
}

impl fmt::Display for ConfigErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFinite { name, value } => write!(f, "{name} must be finite (got {value})"),
            Self::StepSize(h) => write!(f, "step size h must be finite and nonzero (got {h})"),
            Self::Tolerance(tol) => write!(f, "tolerance must be positive (got {tol})"),
            Self::NoIterations => write!(f, "iteration limit must be at least 1"),
        }
    }
}

impl std::error::Error for ConfigErr {}

#[derive(Clone, Debug)]
pub enum Error {
    FormulaSyntax(ParseErr),
    EvaluationDomain(EvalErr),
    InvalidConfig(ConfigErr),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FormulaSyntax(err) => write!(f, "parse error: {err}"),
            Self::EvaluationDomain(err) => write!(f, "evaluation error: {err}"),
            Self::InvalidConfig(err) => write!(f, "invalid configuration: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::FormulaSyntax(err) => Some(err),
            Self::EvaluationDomain(err) => Some(err),
            Self::InvalidConfig(err) => Some(err),
        }
    }
}

impl From<ParseErr> for Error {
    fn from(err: ParseErr) -> Self {
        Self::FormulaSyntax(err)
    }
}

impl From<EvalErr> for Error {
    fn from(err: EvalErr) -> Self {
        Self::EvaluationDomain(err)
    }
}

impl From<ConfigErr> for Error {
    fn from(err: ConfigErr) -> Self {
        Self::InvalidConfig(err)
    }
}

/// Compiles the right hand side of dy/dx = f(x, y).
pub fn compile(formula: &str) -> Result<Equation, Error> {
    Ok(Equation::derivative(formula)?)
}

/// Compiles a closed-form solution y(x), which may refer to the initial
/// value as `y0`.
pub fn compile_exact(formula: &str) -> Result<Equation, Error> {
    Ok(Equation::exact(formula)?)
}

pub fn solve(equation: &Equation, method: Method, config: &StepConfig) -> Result<Run, Error> {
    config.validate()?;
    let f = |x: Number, y: Number| equation.eval(x, y);
    let res = match config.stop {
        Stop::Steps(n) => {
            drive::fixed(method, f, config.x0, config.y0, config.h, n).map(|points| Run {
                points,
                status: Status::Completed,
            })
        }
        Stop::Converge {
            tolerance,
            max_iterations,
        } => drive::until_converged(
            method,
            f,
            config.x0,
            config.y0,
            config.h,
            tolerance,
            max_iterations,
        ),
    };
    res.map_err(|err| {
        log::warn!("{method}: run aborted: {err}");
        match err {
            StepErr::Eval(err) => Error::EvaluationDomain(err),
            StepErr::NonFinite { .. } => Error::EvaluationDomain(equation.non_finite()),
        }
    })
}

pub fn integrate_fixed(
    equation: &Equation,
    method: Method,
    x0: Number,
    y0: Number,
    h: Number,
    n: usize,
) -> Result<Vec<Point<Number>>, Error> {
    let config = StepConfig {
        x0,
        y0,
        h,
        stop: Stop::Steps(n),
    };
    Ok(solve(equation, method, &config)?.points)
}

/// `limits` is (tolerance, max iterations), defaulting to
/// ([`drive::DEFAULT_TOLERANCE`], [`drive::DEFAULT_MAX_ITERATIONS`]).
pub fn integrate_until_convergence(
    equation: &Equation,
    method: Method,
    x0: Number,
    y0: Number,
    h: Number,
    limits: Option<(Number, usize)>,
) -> Result<Run, Error> {
    let stop = match limits {
        Some((tolerance, max_iterations)) => Stop::Converge {
            tolerance,
            max_iterations,
        },
        None => Stop::converge(),
    };
    solve(equation, method, &StepConfig { x0, y0, h, stop })
}

/// Runs both equations for `n` fixed steps and merges them by index.
pub fn combine_dual(
    a: &Equation,
    b: &Equation,
    method: Method,
    x0: Number,
    y0: Number,
    h: Number,
    n: usize,
) -> Result<Vec<DualRow>, Error> {
    let config = StepConfig {
        x0,
        y0,
        h,
        stop: Stop::Steps(n),
    };
    dual::combine(a, b, method, &config)
}
