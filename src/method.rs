// SPDX: CC0-1.0

//! Single-step formulas for dy/dx = f(x, y).
//!
//! Every formula takes the derivative as a fallible closure, so an evaluation
//! error at any stage aborts the step instead of being folded into the result.

use crate::Number;
use core::{fmt, str::FromStr};

/// y + h f(x, y)
pub fn euler<F, E>(mut f: F, x: Number, y: Number, h: Number) -> Result<Number, E>
where
    F: FnMut(Number, Number) -> Result<Number, E>,
{
    Ok(y + h * f(x, y)?)
}

/// Predict with an Euler step, then average the slopes at both ends.
pub fn heun<F, E>(mut f: F, x: Number, y: Number, h: Number) -> Result<Number, E>
where
    F: FnMut(Number, Number) -> Result<Number, E>,
{
    let slope = f(x, y)?;
    let predicted = y + h * slope;
    Ok(y + (h / 2.0) * (slope + f(x + h, predicted)?))
}

pub fn runge_kutta4<F, E>(mut f: F, x: Number, y: Number, h: Number) -> Result<Number, E>
where
    F: FnMut(Number, Number) -> Result<Number, E>,
{
    let half = h / 2.0;
    let k1 = h * f(x, y)?;
    let k2 = h * f(x + half, y + k1 / 2.0)?;
    let k3 = h * f(x + half, y + k2 / 2.0)?;
    let k4 = h * f(x + h, y + k3)?;
    Ok(y + (k1 + 2.0 * k2 + 2.0 * k3 + k4) / 6.0)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Method {
    #[default]
    Euler,
    Heun,
    RungeKutta4,
}

impl Method {
    pub const fn exhaustive() -> &'static [Method] {
        &[Self::Euler, Self::Heun, Self::RungeKutta4]
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Euler => "euler",
            Self::Heun => "heun",
            Self::RungeKutta4 => "rk4",
        }
    }

    pub const fn help(&self) -> &'static str {
        match self {
            Self::Euler => "Euler's method, first order",
            Self::Heun => "improved Euler (Heun's predictor-corrector), second order",
            Self::RungeKutta4 => "classical Runge-Kutta, fourth order",
        }
    }

    pub const fn order(&self) -> u8 {
        match self {
            Self::Euler => 1,
            Self::Heun => 2,
            Self::RungeKutta4 => 4,
        }
    }

    #[inline]
    pub fn step<F, E>(&self, f: F, x: Number, y: Number, h: Number) -> Result<Number, E>
    where
        F: FnMut(Number, Number) -> Result<Number, E>,
    {
        match self {
            Self::Euler => euler(f, x, y, h),
            Self::Heun => heun(f, x, y, h),
            Self::RungeKutta4 => runge_kutta4(f, x, y, h),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl fmt::Display for UnknownMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown method '{}', expected one of", self.0)?;
        for (idx, method) in Method::exhaustive().iter().enumerate() {
            let sep = if idx == 0 { " " } else { ", " };
            write!(f, "{sep}{method}")?;
        }
        Ok(())
    }
}

impl std::error::Error for UnknownMethod {}

impl FromStr for Method {
    type Err = UnknownMethod;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        match lower.as_str() {
            "improved-euler" | "improved euler" => return Ok(Self::Heun),
            "runge-kutta" | "runge kutta" | "rk" => return Ok(Self::RungeKutta4),
            _ => {}
        }
        for m in Self::exhaustive() {
            if lower == m.name() {
                return Ok(*m);
            }
        }
        Err(UnknownMethod(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use core::convert::Infallible;

    fn x_plus_y(x: Number, y: Number) -> Result<Number, Infallible> {
        Ok(x + y)
    }

    #[test]
    fn euler_first_step_of_x_plus_y() {
        let y1 = Method::Euler.step(x_plus_y, 0.0, 1.0, 0.1).unwrap();
        assert_abs_diff_eq!(y1, 1.1, epsilon = 1e-15);
    }

    #[test]
    fn higher_order_methods_are_closer_to_exact() {
        let exact = 2.0 * (0.1 as Number).exp() - 0.1 - 1.0;
        let errors: Vec<Number> = Method::exhaustive()
            .iter()
            .map(|m| (m.step(x_plus_y, 0.0, 1.0, 0.1).unwrap() - exact).abs())
            .collect();
        assert!(errors[0] > errors[1], "{errors:?}");
        assert!(errors[1] > errors[2], "{errors:?}");
        assert!(errors[2] < 1e-6, "{errors:?}");
    }

    #[test]
    fn heun_matches_hand_computation() {
        // slope 1 at (0, 1), predicted 1.1, slope 1.2 at (0.1, 1.1)
        let y1 = heun(x_plus_y, 0.0, 1.0, 0.1).unwrap();
        assert_abs_diff_eq!(y1, 1.0 + 0.05 * (1.0 + 1.2), epsilon = 1e-15);
    }

    #[test]
    fn stops_at_first_failing_evaluation() {
        let mut calls = 0;
        let res = runge_kutta4(
            |_, y| {
                calls += 1;
                if y > 1.0 {
                    Err("too big")
                } else {
                    Ok(1.0)
                }
            },
            0.0,
            1.0,
            1.0,
        );
        assert_eq!(res, Err("too big"));
        assert_eq!(calls, 2);
    }

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("euler".parse(), Ok(Method::Euler));
        assert_eq!("Improved-Euler".parse(), Ok(Method::Heun));
        assert_eq!("RK4".parse(), Ok(Method::RungeKutta4));
        assert!("midpoint".parse::<Method>().is_err());
    }
}
