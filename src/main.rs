// SPDX: CC0-1.0

use anyhow::Context;
use chrono::{DateTime, Local};
use ode_steps::{
    drive::Run,
    dual,
    shell::{self, Command},
    stdlib::{X, Y},
    compile, compile_exact, Equation, Error, Method, Number, Problem, StepConfig, Stop,
};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};
#[cfg(not(debug_assertions))]
use std::process::Stdio;
use std::{
    fs::OpenOptions,
    io::{stdout, BufWriter, Write},
    process::{self, Child, ExitCode},
};

const OUTPUT_RES: [u32; 2] = [1920, 1080];

const LOG_ENV: &str = "ODE_STEPS_LOG";

fn output_filename(now: DateTime<Local>, ext: &str) -> String {
    format!(
        "{}_output-{}.{}",
        env!("CARGO_PKG_NAME"),
        now.format("%Y-%m-%d_%H-%M-%S"),
        ext
    )
}

fn init_logging() {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|s| s.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Warn);
    if TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto).is_err()
    {
        eprintln!("warning: a logger is already installed");
    }
}

fn main() -> ExitCode {
    init_logging();
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("unexpected error: {err}");
            let chain = err.chain();
            if chain.len() > 1 {
                eprintln!();
                eprintln!("context:");
                for it in chain.skip(1) {
                    eprintln!("  {it}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug)]
struct State {
    expr: Option<Equation>,
    second: Option<Equation>,
    exact: Option<Equation>,
    method: Method,
    config: StepConfig,
    gnuplot: Option<Child>,
}

struct Solution {
    first: Run,
    second: Option<Run>,
}

fn try_main() -> anyhow::Result<()> {
    let mut state = State {
        expr: Some(compile("x + y").context("default expression failed to compile")?),
        second: None,
        exact: Some(
            compile_exact("(y0 + 1)e^x - x - 1")
                .context("default exact solution failed to compile")?,
        ),
        method: Method::default(),
        config: StepConfig::default(),
        gnuplot: None,
    };

    let mut stdout = BufWriter::new(stdout());
    loop {
        match (&state.expr, &state.second) {
            (Some(expr), Some(second)) => writeln!(stdout, "dy/dx = {expr}  |  dy/dx = {second}")?,
            (Some(expr), None) => writeln!(stdout, "dy/dx = {expr}")?,
            (None, _) => writeln!(stdout, "dy/dx is not set")?,
        }
        if let Some(ref exact) = state.exact {
            writeln!(stdout, "y(x) = {exact}")?;
        }
        writeln!(stdout, "method = {}, {}", state.method, state.config)?;

        let mut try_cmd = shell::input(&mut stdout, "> ")?;
        try_cmd.make_ascii_lowercase();
        writeln!(stdout)?;

        if let Ok(cmd) = try_cmd.parse::<Command>() {
            match cmd {
                Command::Help => {
                    for c in Command::exhaustive() {
                        writeln!(stdout, "{name}: {help}", name = c.name(), help = c.help())?;
                    }
                }

                Command::Quit => break,

                Command::SetExpr => {
                    if let Some(Some(eq)) =
                        read_equation(&mut stdout, "dy/dx = ", compile)?
                    {
                        state.expr = Some(eq);
                    }
                }

                Command::SetSecond => {
                    if let Some(eq) =
                        read_equation(&mut stdout, "second dy/dx = ", compile)?
                    {
                        state.second = eq;
                    }
                }

                Command::SetExact => {
                    writeln!(stdout, "note: the initial value is available as y0")?;
                    if let Some(eq) = read_equation(&mut stdout, "y(x) = ", compile_exact)? {
                        state.exact = eq;
                    }
                }

                Command::SetMethod => set_method(&mut stdout, &mut state)?,

                Command::SetConfig => set_config(&mut stdout, &mut state)?,

                Command::Run => run(&mut stdout, &state)?,

                Command::Plot => plot(&mut stdout, &mut state)?,

                Command::PrintProg => {
                    let mut any = false;
                    for (title, eq) in [
                        ("dy/dx", &state.expr),
                        ("second dy/dx", &state.second),
                        ("y(x)", &state.exact),
                    ] {
                        if let Some(eq) = eq {
                            shell::dump_program(&mut stdout, eq, format_args!("{title}"))?;
                            any = true;
                        }
                    }
                    if !any {
                        shell::expr_undefined(&mut stdout)?;
                    }
                }
            }
        } else {
            writeln!(stdout, r#"Unknown command, try "help" for help"#)?;
        }

        writeln!(stdout)?;
    }
    stdout.flush()?;
    Ok(())
}

/// Reads and compiles a formula. Returns `None` if it didn't compile,
/// `Some(None)` if the input was blank.
fn read_equation<W: Write>(
    mut out: W,
    prompt: &str,
    compile_with: fn(&str) -> Result<Equation, Error>,
) -> anyhow::Result<Option<Option<Equation>>> {
    let input = shell::input(&mut out, prompt)?;
    if input.is_empty() {
        return Ok(Some(None));
    }
    match compile_with(&input) {
        Ok(eq) => Ok(Some(Some(eq))),
        Err(Error::FormulaSyntax(err)) => {
            shell::report_parse_err(&mut out, &err)?;
            Ok(None)
        }
        Err(err) => {
            writeln!(out, "error: {err}")?;
            Ok(None)
        }
    }
}

fn set_method<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    for m in Method::exhaustive() {
        writeln!(out, "{name}: {help}", name = m.name(), help = m.help())?;
    }
    writeln!(out, "note: leave blank to skip")?;
    if let Ok(Some(new)) = shell::read_fromstr::<_, Method>(
        &mut out,
        format_args!("?method (is {cur}) = ", cur = state.method),
        true,
    )? {
        state.method = new;
    }
    Ok(())
}

fn set_config<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    writeln!(out, "config = {:#}", state.config)?;
    writeln!(out)?;
    writeln!(out, "note: leave blank to skip")?;

    let mut new = state.config.clone();
    for (name, dst) in [
        ("x0", &mut new.x0),
        ("y0", &mut new.y0),
        ("h", &mut new.h),
    ] {
        let cur = *dst;
        match shell::read_fromstr::<_, Number>(&mut out, format_args!("?{name} (is {cur}) = "), true)? {
            Ok(Some(val)) => *dst = val,
            Ok(None) => {}
            Err(_) => return Ok(()),
        }
    }

    writeln!(out, "note: 'steps' runs a fixed number of steps, 'converge' runs until y settles")?;
    let cur_mode = match new.stop {
        Stop::Steps(_) => "steps",
        Stop::Converge { .. } => "converge",
    };
    let mode = shell::input(&mut out, format_args!("?mode (is {cur_mode}) = "))?;
    let mode = if mode.is_empty() { cur_mode } else { mode.as_str() };

    new.stop = match (mode, new.stop) {
        ("steps", stop) => {
            let cur = if let Stop::Steps(n) = stop { n } else { 10 };
            match shell::read_fromstr::<_, usize>(
                &mut out,
                format_args!("?steps (is {cur}) = "),
                true,
            )? {
                Ok(n) => Stop::Steps(n.unwrap_or(cur)),
                Err(_) => return Ok(()),
            }
        }
        ("converge", stop) => {
            let (mut tolerance, mut max_iterations) = match stop {
                Stop::Converge {
                    tolerance,
                    max_iterations,
                } => (tolerance, max_iterations),
                Stop::Steps(_) => (
                    ode_steps::drive::DEFAULT_TOLERANCE,
                    ode_steps::drive::DEFAULT_MAX_ITERATIONS,
                ),
            };
            match shell::read_fromstr::<_, Number>(
                &mut out,
                format_args!("?tolerance (is {tolerance}) = "),
                true,
            )? {
                Ok(val) => tolerance = val.unwrap_or(tolerance),
                Err(_) => return Ok(()),
            }
            match shell::read_fromstr::<_, usize>(
                &mut out,
                format_args!("?max iterations (is {max_iterations}) = "),
                true,
            )? {
                Ok(val) => max_iterations = val.unwrap_or(max_iterations),
                Err(_) => return Ok(()),
            }
            Stop::Converge {
                tolerance,
                max_iterations,
            }
        }
        (other, _) => {
            writeln!(out, "error: unknown mode '{other}', expected 'steps' or 'converge'")?;
            return Ok(());
        }
    };

    match new.validate() {
        Ok(()) => state.config = new,
        Err(err) => writeln!(out, "error: {err}, keeping previous config")?,
    }
    Ok(())
}

fn solve<W: Write>(mut out: W, state: &State) -> anyhow::Result<Option<Solution>> {
    let first = if let Some(ref expr) = state.expr {
        expr
    } else {
        shell::expr_undefined(&mut out)?;
        return Ok(None);
    };

    let res = if let Some(ref second) = state.second {
        dual::run_both(first, second, state.method, &state.config).map(|(first, second)| {
            Solution {
                first,
                second: Some(second),
            }
        })
    } else {
        ode_steps::solve(first, state.method, &state.config).map(|first| Solution {
            first,
            second: None,
        })
    };

    match res {
        Ok(sol) => {
            for (name, run) in [("dy/dx", Some(&sol.first)), ("second dy/dx", sol.second.as_ref())]
            {
                if let Some(run) = run {
                    if !run.status.is_ok() {
                        writeln!(out, "warning: {name} {}", run.status)?;
                    }
                }
            }
            Ok(Some(sol))
        }
        Err(Error::EvaluationDomain(err)) => {
            shell::report_eval_err(&mut out, &err)?;
            Ok(None)
        }
        Err(err) => {
            writeln!(out, "error: {err}")?;
            Ok(None)
        }
    }
}

fn run<W: Write>(mut out: W, state: &State) -> anyhow::Result<()> {
    let sol = if let Some(sol) = solve(&mut out, state)? {
        sol
    } else {
        return Ok(());
    };
    let y0 = state.config.y0;

    let res = match (&sol.second, &state.exact, &state.expr) {
        (None, Some(exact), Some(expr)) => {
            let problem = Problem::new(expr.clone(), exact.clone());
            problem
                .table(&sol.first.points, y0)
                .map(|rows| shell::print_table(&mut out, &rows))
        }
        (None, _, _) => Ok(shell::print_points(&mut out, &sol.first.points)),
        (Some(second), Some(exact), _) => {
            dual::dual_table(&sol.first.points, &second.points, |x| exact.eval(x, y0))
                .map(|rows| shell::print_dual_table(&mut out, &rows))
        }
        (Some(second), None, _) => Ok(shell::print_dual(
            &mut out,
            &dual::merge(&sol.first.points, &second.points),
        )),
    };

    match res {
        Ok(written) => written?,
        Err(err) => shell::report_eval_err(&mut out, &err)?,
    }
    Ok(())
}

fn plot<W: Write>(mut out: W, state: &mut State) -> anyhow::Result<()> {
    let sol = if let Some(sol) = solve(&mut out, state)? {
        sol
    } else {
        return Ok(());
    };
    let second_points = sol.second.as_ref().map(|run| run.points.as_slice());
    let rows = dual::merge(&sol.first.points, second_points.unwrap_or(&[]));

    // set up gnuplot
    if let Some(mut old_child) = state.gnuplot.take() {
        old_child
            .kill()
            .context("failed to kill previous gnuplot child")?;
    }
    let now = Local::now();
    let data_path = output_filename(now, "data");
    let gnuplot_path = output_filename(now, "gnuplot");
    let svg_path = output_filename(now, "svg");
    let mut data = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&data_path)
            .context("failed to open output data file")?,
    );
    let mut gnuplot = BufWriter::new(
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&gnuplot_path)
            .context("failed to open output gnuplot file")?,
    );

    // columns: x, y1, y2, exact; '-' where a value is missing
    let missing = String::from("-");
    for row in &rows {
        let exact = match state.exact {
            Some(ref exact) => exact
                .eval(row.x, state.config.y0)
                .map_or_else(|_| missing.clone(), |v| v.to_string()),
            None => missing.clone(),
        };
        let y1 = row.y1.map_or_else(|| missing.clone(), |v| v.to_string());
        let y2 = row.y2.map_or_else(|| missing.clone(), |v| v.to_string());
        writeln!(data, "{} {y1} {y2} {exact}", row.x)
            .context("failed to write to output data file")?;
    }
    data.flush()?;
    data.get_mut().sync_data()?;
    drop(data);
    writeln!(out, "wrote {} points to {data_path}", rows.len())?;

    writeln!(gnuplot, "reset")?;
    writeln!(gnuplot, "set term push")?;
    // set output info
    let [width, height] = OUTPUT_RES;
    writeln!(gnuplot, "set terminal svg size {width},{height} enhanced")?;
    writeln!(gnuplot, "set output '{svg_path}'")?;
    writeln!(gnuplot, r#"set datafile missing "-""#)?;

    // configure appearence
    writeln!(gnuplot, r#"set title "{data_path} ({method})""#, method = state.method)?;
    writeln!(gnuplot, "set title noenhanced")?;
    writeln!(gnuplot, r#"set xlabel "{X}""#)?;
    writeln!(gnuplot, r#"set ylabel "{Y}""#)?;
    writeln!(gnuplot, "set tics out nomirror")?;
    writeln!(gnuplot, "set key out vertical top right")?;
    writeln!(gnuplot, r#"set key title "Key""#)?;

    let mut series = Vec::new();
    if let Some(ref expr) = state.expr {
        series.push(format!(
            r#"'{data_path}' using 1:2 with linespoints lc '#27422e' title "dy/dx = {expr}" noenhanced"#
        ));
    }
    if let Some(ref second) = state.second {
        series.push(format!(
            r#"'{data_path}' using 1:3 with linespoints lc '#8a3b12' title "dy/dx = {second}" noenhanced"#
        ));
    }
    if let Some(ref exact) = state.exact {
        series.push(format!(
            r#"'{data_path}' using 1:4 with lines dt 2 lc '#555555' title "y = {exact}" noenhanced"#
        ));
    }
    writeln!(gnuplot, "plot {}", series.join(", \\\n  "))?;

    // display window
    writeln!(gnuplot, "set term pop")?;
    writeln!(gnuplot, "replot")?;

    // done with the file
    gnuplot.flush()?;
    gnuplot.get_mut().sync_data()?;
    drop(gnuplot);

    // spawn gnuplot and provide the path to the file
    let mut cmd = process::Command::new("gnuplot");
    cmd.arg("--persist").arg(&gnuplot_path);
    #[cfg(not(debug_assertions))]
    {
        cmd.stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null());
    }
    let child = cmd
        .spawn()
        .context("failed to spawn gnuplot (is it installed and in ${{PATH}}?)")?;

    state.gnuplot = Some(child);
    Ok(())
}
