// SPDX: CC0-1.0

use crate::{method::Method, Number, Point};
use core::fmt;

pub const DEFAULT_TOLERANCE: Number = 1e-4;
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

pub const X_DIGITS: i32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Status {
    Completed,
    Converged,
    IterationCap,
    ZeroValue,
}

impl Status {
    pub const fn converged(&self) -> bool {
        matches!(self, Self::Converged)
    }

    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Completed | Self::Converged)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Converged => write!(f, "converged"),
            Self::IterationCap => write!(f, "did not converge within the iteration limit"),
            Self::ZeroValue => write!(f, "did not converge (y reached 0)"),
        }
    }
}

/// Why a run failed: the derivative couldn't be evaluated, or a step produced
/// a y that isn't finite (the method's own arithmetic overflowed).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StepErr<E> {
    Eval(E),
    NonFinite { x: Number },
}

impl<E: fmt::Display> fmt::Display for StepErr<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eval(err) => write!(f, "{err}"),
            Self::NonFinite { x } => write!(f, "step from x = {x} overflowed"),
        }
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for StepErr<E> {}

fn step<F, E>(method: Method, f: F, x: Number, y: Number, h: Number) -> Result<Number, StepErr<E>>
where
    F: FnMut(Number, Number) -> Result<Number, E>,
{
    let next = method.step(f, x, y, h).map_err(StepErr::Eval)?;
    if next.is_finite() {
        Ok(next)
    } else {
        Err(StepErr::NonFinite { x })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Run {
    pub points: Vec<Point<Number>>,
    pub status: Status,
}

impl Run {
    pub const fn converged(&self) -> bool {
        self.status.converged()
    }

    pub fn last(&self) -> Option<Point<Number>> {
        self.points.last().copied()
    }
}

pub fn round_to(value: Number, digits: i32) -> Number {
    let scale = Number::powi(10.0, digits);
    (value * scale).round() / scale
}

/// Applies `method` exactly `n` times from (x0, y0), returning all n + 1
/// points. x advances by exactly h per step.
pub fn fixed<F, E>(
    method: Method,
    mut f: F,
    x0: Number,
    y0: Number,
    h: Number,
    n: usize,
) -> Result<Vec<Point<Number>>, StepErr<E>>
where
    F: FnMut(Number, Number) -> Result<Number, E>,
{
    let mut p = Point { x: x0, y: y0 };
    let mut points = vec![p];
    for i in 1..=n {
        p.y = step(method, &mut f, p.x, p.y, h)?;
        // x0 + i h rather than repeated addition, so x doesn't drift
        p.x = x0 + h * i as Number;
        points.push(p);
    }
    log::debug!("{method}: {n} steps from ({x0}, {y0}) with h = {h}");
    Ok(points)
}

/// Applies `method` until |y_next - y| / |y_next| <= `tolerance`, or until
/// `max_iterations` steps have been taken. Returns at most
/// `max_iterations + 1` points, starting with (x0, y0).
pub fn until_converged<F, E>(
    method: Method,
    mut f: F,
    x0: Number,
    y0: Number,
    h: Number,
    tolerance: Number,
    max_iterations: usize,
) -> Result<Run, StepErr<E>>
where
    F: FnMut(Number, Number) -> Result<Number, E>,
{
    let mut p = Point { x: x0, y: y0 };
    let mut points = vec![p];
    let mut status = Status::IterationCap;

    for _ in 0..max_iterations {
        let next = Point {
            x: round_to(p.x + h, X_DIGITS),
            y: step(method, &mut f, p.x, p.y, h)?,
        };
        points.push(next);

        if next.y == 0.0 {
            status = Status::ZeroValue;
            break;
        }
        let change = (next.y - p.y).abs() / next.y.abs();
        p = next;
        if change <= tolerance {
            status = Status::Converged;
            break;
        }
    }

    let iterations = points.len() - 1;
    if status.converged() {
        log::debug!("{method}: converged after {iterations} iterations at x = {}", p.x);
    } else {
        log::warn!("{method}: {status} after {iterations} iterations from ({x0}, {y0}) with h = {h}");
    }
    Ok(Run { points, status })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use core::convert::Infallible;

    fn slope(f: fn(Number, Number) -> Number) -> impl FnMut(Number, Number) -> Result<Number, Infallible> {
        move |x, y| Ok(f(x, y))
    }

    #[test]
    fn fixed_returns_n_plus_one_points() {
        for n in [0, 1, 7, 100] {
            let points = fixed(Method::Heun, slope(|x, _| x), 0.0, 0.0, 0.1, n).unwrap();
            assert_eq!(points.len(), n + 1);
            assert_eq!(points[0].x, 0.0);
            assert_eq!(points[0].y, 0.0);
        }
    }

    #[test]
    fn fixed_advances_x_by_h() {
        let points = fixed(Method::Euler, slope(|x, y| x + y), 1.0, 1.0, 0.25, 8).unwrap();
        for (i, p) in points.iter().enumerate() {
            assert_abs_diff_eq!(p.x, 1.0 + 0.25 * i as Number, epsilon = 1e-12);
        }
        assert_abs_diff_eq!(points.last().unwrap().x, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn fixed_propagates_evaluation_errors() {
        let res = fixed(
            Method::RungeKutta4,
            |x, _| if x >= 0.5 { Err(x) } else { Ok(1.0) },
            0.0,
            0.0,
            0.1,
            10,
        );
        assert!(matches!(res, Err(StepErr::Eval(x)) if x >= 0.5));
    }

    #[test]
    fn overflowing_step_is_an_error() {
        let res = fixed(Method::Euler, slope(|_, y| y), 0.0, 1e308, 1.0, 1);
        assert_eq!(res, Err(StepErr::NonFinite { x: 0.0 }));

        let res = until_converged(Method::Heun, slope(|_, y| y), 0.0, 1e308, 1.0, 1e-4, 10);
        assert_eq!(res, Err(StepErr::NonFinite { x: 0.0 }));
    }

    #[test]
    fn converges_on_flat_solution() {
        // relaxes toward y = 2
        let run = until_converged(
            Method::Euler,
            slope(|_, y| 2.0 - y),
            0.0,
            1.0,
            0.1,
            DEFAULT_TOLERANCE,
            DEFAULT_MAX_ITERATIONS,
        )
        .unwrap();
        assert!(run.converged());
        assert!(run.points.len() <= DEFAULT_MAX_ITERATIONS + 1);
        let n = run.points.len();
        let [prev, last] = [run.points[n - 2], run.points[n - 1]];
        assert!((last.y - prev.y).abs() / last.y.abs() <= DEFAULT_TOLERANCE);
    }

    #[test]
    fn flags_iteration_cap() {
        // y' = y grows by a constant factor, so relative change never shrinks
        let run = until_converged(Method::RungeKutta4, slope(|_, y| y), 0.0, 1.0, 0.1, 1e-4, 25)
            .unwrap();
        assert_eq!(run.status, Status::IterationCap);
        assert!(!run.converged());
        assert_eq!(run.points.len(), 26);
    }

    #[test]
    fn zero_value_is_not_convergence() {
        // one Euler step of y' = -10y with h = 0.1 lands exactly on zero
        let run = until_converged(Method::Euler, slope(|_, y| -10.0 * y), 0.0, 1.0, 0.1, 1e-4, 100)
            .unwrap();
        assert_eq!(run.status, Status::ZeroValue);
        assert!(!run.converged());
        assert_eq!(run.points.len(), 2);
        assert_eq!(run.points[1].y, 0.0);
    }

    #[test]
    fn rounds_x_to_ten_digits() {
        let run = until_converged(Method::Euler, slope(|_, y| y), 0.0, 1.0, 0.1, 1e-4, 30).unwrap();
        for (i, p) in run.points.iter().enumerate() {
            assert_eq!(p.x, round_to(0.1 * i as Number, X_DIGITS));
        }
        assert_eq!(run.points[3].x, 0.3);
    }

    #[test]
    fn round_to_drops_drift() {
        assert_eq!(round_to(0.1 + 0.2, 10), 0.3);
        assert_eq!(round_to(-1.23456789012345, 3), -1.235);
    }
}
