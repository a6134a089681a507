// SPDX: CC0-1.0

use crate::{
    dual::{DualRow, DualTableRow},
    equation::Equation,
    eval::{EvalErr, EvalErrTyp},
    lex::{LexErrTyp, SubStr, TokTyp},
    parse::{ParseErr, ParseErrTyp},
    Number, Point, TableRow,
};
use anyhow::Context;
use core::fmt;
use std::{
    io::{self, stdin, BufRead, Write},
    sync::Arc,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    SetExpr,
    SetSecond,
    SetExact,
    SetMethod,
    SetConfig,
    Run,
    Plot,
    PrintProg,
}

impl Command {
    pub const fn exhaustive() -> &'static [Command] {
        &[
            Self::Help,
            Self::Quit,
            Self::SetExpr,
            Self::SetSecond,
            Self::SetExact,
            Self::SetMethod,
            Self::SetConfig,
            Self::Run,
            Self::Plot,
            Self::PrintProg,
        ]
    }

    pub const fn help(&self) -> &'static str {
        match self {
            Self::Help => "display help for each command",
            Self::Quit => "quit the shell",
            Self::SetExpr => "set dy/dx",
            Self::SetSecond => "set a second dy/dx to solve alongside the first (blank to clear)",
            Self::SetExact => "set the exact solution y(x), which may use y0 (blank to clear)",
            Self::SetMethod => "choose the integration method",
            Self::SetConfig => "set initial condition, step size and stopping rule",
            Self::Run => "solve and print the results table",
            Self::Plot => "solve and plot the trajectories with gnuplot",
            Self::PrintProg => "print programs compiled from the expressions (for debugging)",
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Help => "help",
            Self::Quit => "quit",
            Self::SetExpr => "set",
            Self::SetSecond => "second",
            Self::SetExact => "exact",
            Self::SetMethod => "method",
            Self::SetConfig => "config",
            Self::Run => "run",
            Self::Plot => "plot",
            Self::PrintProg => "prog",
        }
    }
}

impl core::str::FromStr for Command {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::exhaustive()
            .iter()
            .find(|c| s == c.name())
            .copied()
            .ok_or(())
    }
}

pub fn input<W: Write>(out: W, prompt: impl fmt::Display) -> anyhow::Result<String> {
    fn inner<W: Write>(mut out: W, prompt: impl fmt::Display) -> io::Result<String> {
        write!(out, "{prompt}")?;
        out.flush()?;
        let mut stdin = stdin().lock();
        let mut s = String::new();
        stdin.read_line(&mut s)?;
        Ok(s.trim().to_string())
    }

    let s = inner(out, prompt).context("read from standard input failed")?;
    Ok(s)
}

pub fn read_fromstr<W: Write, T: core::str::FromStr>(
    mut out: W,
    prompt: impl fmt::Display,
    ignore_empty: bool,
) -> anyhow::Result<Result<Option<T>, <T as core::str::FromStr>::Err>>
where
    <T as core::str::FromStr>::Err: fmt::Display,
{
    let input = Arc::new(input(&mut out, prompt)?);
    if ignore_empty && input.is_empty() {
        return Ok(Ok(None));
    }
    match input.parse::<T>() {
        Ok(new) => Ok(Ok(Some(new))),
        Err(err) => {
            writeln!(out)?;
            underline(&mut out, &SubStr::all(input))?;
            writeln!(out, "parse error: {err}")?;
            Ok(Err(err))
        }
    }
}

pub fn underline<W: Write>(mut out: W, span: &SubStr) -> io::Result<()> {
    writeln!(out, "{}", span.src())?;
    writeln!(
        out,
        "{}{}",
        " ".repeat(span.column()),
        "^".repeat(span.width().max(1))
    )?;
    Ok(())
}

pub fn dump_program<W: Write>(
    mut out: W,
    eq: &Equation,
    title: core::fmt::Arguments,
) -> io::Result<()> {
    writeln!(out, "{title} ({}): ", eq.formula())?;
    let prog = eq.program();
    if prog.ops().len() == 0 {
        writeln!(out, "  (empty)")?;
    }
    for op in prog.ops() {
        writeln!(out, "  {op}")?;
    }
    Ok(())
}

pub fn expr_undefined<W: Write>(mut out: W) -> io::Result<()> {
    writeln!(out, "error: no expression is defined")
}

pub fn report_parse_err<W: Write>(mut out: W, err: &ParseErr) -> io::Result<()> {
    writeln!(out)?;
    underline(&mut out, &err.loc)?;
    writeln!(out, "parse error: {}", err.typ)?;
    match &err.typ {
        ParseErrTyp::LexErr(LexErrTyp::InvalidChar) => writeln!(
            out,
            "note: available tokens are numbers, alphabetic identifiers, and symbols +-*/^()"
        )?,
        ParseErrTyp::LexErr(LexErrTyp::Unsupported(typ)) => match typ {
            TokTyp::XGreater | TokTyp::XLess => {
                writeln!(out, "note: expected an expression but found an inequality")?
            }
            TokTyp::XEqual => writeln!(
                out,
                "note: expected an expression but found an equation, enter only the right hand side"
            )?,
            TokTyp::XPipe => writeln!(
                out,
                "note: use the 'abs' function to compute absolute value"
            )?,
            TokTyp::XComma => writeln!(out, "note: every function takes a single argument")?,
            _ => {}
        },
        ParseErrTyp::ParseNum(_) => writeln!(out, "note: parsing as floating point number")?,
        ParseErrTyp::MissingOperand { .. } | ParseErrTyp::ExtraOperand { .. } => writeln!(
            out,
            "note: every operator needs a value on each side, as in 'x * y'"
        )?,
        ParseErrTyp::Empty
        | ParseErrTyp::ParenMismatch
        | ParseErrTyp::UnknownIdent { .. }
        | ParseErrTyp::ExpectedParen => {}
    }
    Ok(())
}

pub fn report_eval_err<W: Write>(mut out: W, err: &EvalErr) -> io::Result<()> {
    let loc = err
        .op
        .as_ref()
        .map(|op| op.loc.clone())
        .unwrap_or_else(|| SubStr::all(Arc::clone(&err.formula)));
    underline(&mut out, &loc)?;
    writeln!(out, "evaluation error: {err}")?;
    if let EvalErrTyp::Domain(_) = err.typ {
        writeln!(
            out,
            "note: the run stopped at the first value that could not be computed"
        )?;
    }
    Ok(())
}

pub fn print_points<W: Write>(mut out: W, points: &[Point<Number>]) -> io::Result<()> {
    writeln!(out, "{:>9}  {:>14}  {:>14}", "iteration", "x", "y")?;
    for (idx, p) in points.iter().enumerate() {
        writeln!(out, "{:>9}  {:>14.6}  {:>14.6}", idx + 1, p.x, p.y)?;
    }
    Ok(())
}

pub fn print_table<W: Write>(mut out: W, rows: &[TableRow]) -> io::Result<()> {
    writeln!(
        out,
        "{:>9}  {:>14}  {:>14}  {:>14}  {:>10}",
        "iteration", "x", "exact", "approximate", "error"
    )?;
    for row in rows {
        writeln!(
            out,
            "{:>9}  {:>14.6}  {:>14.4}  {:>14.4}  {:>10}",
            row.iteration,
            row.x,
            row.exact,
            row.approx,
            format!("{:.2}", row.error)
        )?;
    }
    Ok(())
}

fn opt(val: Option<Number>) -> String {
    val.map_or_else(|| String::from("-"), |v| format!("{v:.4}"))
}

pub fn print_dual<W: Write>(mut out: W, rows: &[DualRow]) -> io::Result<()> {
    writeln!(out, "{:>9}  {:>14}  {:>14}  {:>14}", "iteration", "x", "y1", "y2")?;
    for (idx, row) in rows.iter().enumerate() {
        writeln!(
            out,
            "{:>9}  {:>14.6}  {:>14}  {:>14}",
            idx + 1,
            row.x,
            opt(row.y1),
            opt(row.y2)
        )?;
    }
    Ok(())
}

pub fn print_dual_table<W: Write>(mut out: W, rows: &[DualTableRow]) -> io::Result<()> {
    writeln!(
        out,
        "{:>9}  {:>14}  {:>14}  {:>10}  {:>14}  {:>14}  {:>10}",
        "iteration", "exact 1", "approx 1", "error 1", "exact 2", "approx 2", "error 2"
    )?;
    for row in rows {
        write!(out, "{:>9}", row.iteration)?;
        for side in [&row.first, &row.second] {
            match side {
                Some(r) => write!(
                    out,
                    "  {:>14.4}  {:>14.4}  {:>10}",
                    r.exact,
                    r.approx,
                    format!("{:.2}", r.error)
                )?,
                None => write!(out, "  {:>14}  {:>14}  {:>10}", "-", "-", "-")?,
            }
        }
        writeln!(out)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compare::ErrorPct, equation::Equation};

    fn render(f: impl FnOnce(&mut Vec<u8>) -> io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn commands_round_trip_through_names() {
        for c in Command::exhaustive() {
            assert_eq!(c.name().parse::<Command>(), Ok(*c));
        }
        assert!("frobnicate".parse::<Command>().is_err());
    }

    #[test]
    fn underlines_parse_errors() {
        let err = Equation::derivative("x + sine(y)").unwrap_err();
        let text = render(|out| report_parse_err(out, &err));
        assert!(text.contains("x + sine(y)\n    ^^^^\n"), "{text}");
        assert!(text.contains("did you mean the function 'sin'"), "{text}");
    }

    #[test]
    fn underlines_failing_operation() {
        let eq = Equation::derivative("1 + ln(y)").unwrap();
        let err = eq.eval(0.0, -2.0).unwrap_err();
        let text = render(|out| report_eval_err(out, &err));
        assert!(text.contains("1 + ln(y)\n    ^^\n"), "{text}");
        assert!(text.contains("logarithm of non-positive number -2"), "{text}");
    }

    #[test]
    fn table_shows_undefined_error() {
        let rows = [TableRow {
            iteration: 1,
            x: 0.0,
            exact: 0.0,
            approx: 0.5,
            error: ErrorPct::Undefined,
        }];
        let text = render(|out| print_table(out, &rows));
        assert!(text.lines().nth(1).unwrap().ends_with("n/a"), "{text}");
    }

    #[test]
    fn dual_marks_missing_values() {
        let rows = [DualRow {
            x: 0.1,
            y1: None,
            y2: Some(2.0),
        }];
        let text = render(|out| print_dual(out, &rows));
        let line = text.lines().nth(1).unwrap();
        assert!(line.contains(" - "), "{line}");
        assert!(line.ends_with("2.0000"), "{line}");
    }
}
