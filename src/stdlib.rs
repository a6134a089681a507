// SPDX: CC0-1.0

use crate::{
    eval::{DomainErr, Fun, Ident, Idents},
    Number,
};
use core::f64::consts;
use std::collections::HashMap; // assumes Number = f64

pub const X: &str = "x";
pub const Y: &str = "y";
pub const Y0: &str = "y0";

pub const DERIVATIVE_VARS: &[&str] = &[X, Y];

pub const EXACT_VARS: &[&str] = &[X, Y0];

pub fn standard_idents(vars: &[&'static str]) -> Idents {
    let mut ret = HashMap::new();

    ret.insert("abs", Ident::Fun(Fun::new(1, abs)));
    ret.insert("sqrt", Ident::Fun(Fun::new(1, sqrt)));
    ret.insert("exp", Ident::Fun(Fun::new(1, exp)));
    ret.insert("ln", Ident::Fun(Fun::new(1, ln)));
    ret.insert("log", Ident::Fun(Fun::new(1, log)));

    // trig
    ret.insert("sin", Ident::Fun(Fun::new(1, sin)));
    ret.insert("cos", Ident::Fun(Fun::new(1, cos)));
    ret.insert("tan", Ident::Fun(Fun::new(1, tan)));
    ret.insert("asin", Ident::Fun(Fun::new(1, arcsin)));
    ret.insert("acos", Ident::Fun(Fun::new(1, arccos)));
    ret.insert("atan", Ident::Fun(Fun::new(1, arctan)));

    ret.insert("pi", Ident::Const(consts::PI));
    ret.insert("π", Ident::Const(consts::PI));
    ret.insert("e", Ident::Const(consts::E));

    for (idx, var) in vars.iter().enumerate() {
        ret.insert(*var, Ident::Var(idx));
    }
    ret
}

fn expect_n<const N: usize>(args: &[Number]) -> [Number; N] {
    let mut ret = [0.0; N];
    ret.copy_from_slice(&args[..N]);
    ret
}

pub fn neg(args: &[Number]) -> Result<Number, DomainErr> {
    let [x] = expect_n::<1>(args);
    Ok(-x)
}

pub fn add(args: &[Number]) -> Result<Number, DomainErr> {
    let [x, y] = expect_n::<2>(args);
    Ok(x + y)
}

pub fn sub(args: &[Number]) -> Result<Number, DomainErr> {
    let [x, y] = expect_n::<2>(args);
    Ok(x - y)
}

pub fn mul(args: &[Number]) -> Result<Number, DomainErr> {
    let [x, y] = expect_n::<2>(args);
    Ok(x * y)
}

pub fn div(args: &[Number]) -> Result<Number, DomainErr> {
    let [x, y] = expect_n::<2>(args);
    if y == 0.0 {
        Err(DomainErr::DivByZero)
    } else {
        Ok(x / y)
    }
}

pub fn pow(args: &[Number]) -> Result<Number, DomainErr> {
    let [x, exp] = expect_n::<2>(args);
    if x == 0.0 && exp < 0.0 {
        Err(DomainErr::DivByZero)
    } else {
        Ok(x.powf(exp))
    }
}

pub fn abs(args: &[Number]) -> Result<Number, DomainErr> {
    let [x] = expect_n::<1>(args);
    Ok(x.abs())
}

pub fn sqrt(args: &[Number]) -> Result<Number, DomainErr> {
    let [x] = expect_n::<1>(args);
    if x < 0.0 {
        Err(DomainErr::NegativeSqrt { arg: x })
    } else {
        Ok(x.sqrt())
    }
}

pub fn exp(args: &[Number]) -> Result<Number, DomainErr> {
    let [x] = expect_n::<1>(args);
    Ok(x.exp())
}

pub fn ln(args: &[Number]) -> Result<Number, DomainErr> {
    let [x] = expect_n::<1>(args);
    if x <= 0.0 {
        Err(DomainErr::NonPositiveLog { arg: x })
    } else {
        Ok(x.ln())
    }
}

pub fn log(args: &[Number]) -> Result<Number, DomainErr> {
    let [x] = expect_n::<1>(args);
    if x <= 0.0 {
        Err(DomainErr::NonPositiveLog { arg: x })
    } else {
        Ok(x.log10())
    }
}

pub fn sin(args: &[Number]) -> Result<Number, DomainErr> {
    let [x] = expect_n::<1>(args);
    Ok(x.sin())
}

pub fn cos(args: &[Number]) -> Result<Number, DomainErr> {
    let [x] = expect_n::<1>(args);
    Ok(x.cos())
}

pub fn tan(args: &[Number]) -> Result<Number, DomainErr> {
    let [x] = expect_n::<1>(args);
    Ok(x.tan())
}

pub fn arcsin(args: &[Number]) -> Result<Number, DomainErr> {
    let [x] = expect_n::<1>(args);
    Ok(x.asin())
}

pub fn arccos(args: &[Number]) -> Result<Number, DomainErr> {
    let [x] = expect_n::<1>(args);
    Ok(x.acos())
}

pub fn arctan(args: &[Number]) -> Result<Number, DomainErr> {
    let [x] = expect_n::<1>(args);
    Ok(x.atan())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn log_is_base_ten_and_ln_is_natural() {
        assert_relative_eq!(log(&[1000.0]).unwrap(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(ln(&[consts::E]).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn logarithms_reject_non_positive_arguments() {
        assert_eq!(log(&[-1.0]), Err(DomainErr::NonPositiveLog { arg: -1.0 }));
        assert_eq!(ln(&[0.0]), Err(DomainErr::NonPositiveLog { arg: 0.0 }));
    }

    #[test]
    fn division_and_negative_powers_of_zero_fail() {
        assert_eq!(div(&[1.0, 0.0]), Err(DomainErr::DivByZero));
        assert_eq!(pow(&[0.0, -1.0]), Err(DomainErr::DivByZero));
        assert_eq!(pow(&[0.0, 2.0]), Ok(0.0));
    }

    #[test]
    fn pi_has_both_spellings() {
        let idents = standard_idents(DERIVATIVE_VARS);
        for name in ["pi", "π"] {
            match idents.get(name) {
                Some(Ident::Const(val)) => assert_eq!(*val, consts::PI),
                other => panic!("{name} resolved to {other:?}"),
            }
        }
    }

    #[test]
    fn variables_bind_in_order() {
        let idents = standard_idents(EXACT_VARS);
        assert!(matches!(idents.get("x"), Some(Ident::Var(0))));
        assert!(matches!(idents.get("y0"), Some(Ident::Var(1))));
        assert!(idents.get("y").is_none());
    }
}
