// SPDX: CC0-1.0

use crate::{equation::Equation, eval::EvalErr, Number, Point};
use core::fmt;

/// |approx - exact| / |exact| as a percentage, if exact isn't 0.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ErrorPct {
    Percent(Number),
    Undefined,
}

impl ErrorPct {
    pub fn new(approx: Number, exact: Number) -> Self {
        if exact == 0.0 {
            return Self::Undefined;
        }
        let pct = (approx - exact).abs() / exact.abs() * 100.0;
        if pct.is_finite() {
            Self::Percent(pct)
        } else {
            Self::Undefined
        }
    }

    pub const fn percent(&self) -> Option<Number> {
        match self {
            Self::Percent(pct) => Some(*pct),
            Self::Undefined => None,
        }
    }
}

impl fmt::Display for ErrorPct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(pct) => {
                if let Some(precision) = f.precision() {
                    write!(f, "{pct:.precision$}%")
                } else {
                    write!(f, "{pct}%")
                }
            }
            Self::Undefined => f.write_str("n/a"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TableRow {
    pub iteration: usize,
    pub x: Number,
    pub exact: Number,
    pub approx: Number,
    pub error: ErrorPct,
}

pub fn compare_to_exact<G, E>(points: &[Point<Number>], mut exact: G) -> Result<Vec<TableRow>, E>
where
    G: FnMut(Number) -> Result<Number, E>,
{
    points
        .iter()
        .enumerate()
        .map(|(idx, p)| {
            let value = exact(p.x)?;
            Ok(TableRow {
                iteration: idx + 1,
                x: p.x,
                exact: value,
                approx: p.y,
                error: ErrorPct::new(p.y, value),
            })
        })
        .collect()
}

/// A derivative together with the closed-form solution it is checked against.
///
/// Nothing verifies that `exact` actually solves dy/dx = `derivative`; a
/// mismatched pair gives well-formed but meaningless error percentages.
#[derive(Clone, Debug)]
pub struct Problem {
    pub derivative: Equation,
    pub exact: Equation,
}

impl Problem {
    pub const fn new(derivative: Equation, exact: Equation) -> Self {
        Self { derivative, exact }
    }

    pub fn compile(derivative: &str, exact: &str) -> Result<Self, crate::Error> {
        Ok(Self::new(Equation::derivative(derivative)?, Equation::exact(exact)?))
    }

    pub fn table(&self, points: &[Point<Number>], y0: Number) -> Result<Vec<TableRow>, EvalErr> {
        compare_to_exact(points, |x| self.exact.eval(x, y0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use core::convert::Infallible;

    #[test]
    fn computes_percentage_error() {
        let points = [Point { x: 0.0, y: 1.0 }, Point { x: 1.0, y: 2.5 }];
        let rows = compare_to_exact(&points, |x| Ok::<_, Infallible>(2.0 * x + 1.0)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].iteration, 1);
        assert_eq!(rows[0].error, ErrorPct::Percent(0.0));
        assert_eq!(rows[1].iteration, 2);
        assert_eq!(rows[1].exact, 3.0);
        assert_eq!(rows[1].approx, 2.5);
        assert_relative_eq!(rows[1].error.percent().unwrap(), 100.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_exact_value_is_undefined_error() {
        let points = [Point { x: 0.0, y: 0.1 }];
        let rows = compare_to_exact(&points, |x| Ok::<_, Infallible>(x)).unwrap();
        assert_eq!(rows[0].error, ErrorPct::Undefined);
        assert_eq!(rows[0].error.to_string(), "n/a");
    }

    #[test]
    fn formats_with_requested_precision() {
        assert_eq!(format!("{:.2}", ErrorPct::Percent(1.23456)), "1.23%");
        assert_eq!(format!("{:.2}", ErrorPct::Undefined), "n/a");
    }

    #[test]
    fn problem_binds_initial_value() {
        let problem = Problem::compile("x + y", "(y0 + 1)e^x - x - 1").unwrap();
        let points = [Point { x: 0.0, y: 1.0 }, Point { x: 0.1, y: 1.1 }];
        let rows = problem.table(&points, 1.0).unwrap();
        assert_relative_eq!(rows[0].exact, 1.0, epsilon = 1e-12);
        assert_relative_eq!(rows[1].exact, 2.0 * (0.1 as Number).exp() - 1.1, epsilon = 1e-12);
        assert!(rows[1].error.percent().unwrap() > 0.0);
    }

    #[test]
    fn exact_solution_errors_propagate() {
        let problem = Problem::compile("y", "ln(x)").unwrap();
        let points = [Point { x: 0.0, y: 1.0 }];
        assert!(problem.table(&points, 1.0).is_err());
    }
}
