// SPDX: CC0-1.0

use crate::{
    compare::{compare_to_exact, TableRow},
    drive::Run,
    equation::Equation,
    method::Method,
    solve, Error, Number, Point, StepConfig,
};

/// Both trajectories at one iteration index. `None` means that trajectory
/// stopped before reaching this index.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DualRow {
    pub x: Number,
    pub y1: Option<Number>,
    pub y2: Option<Number>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DualTableRow {
    pub iteration: usize,
    pub first: Option<TableRow>,
    pub second: Option<TableRow>,
}

/// Merges two point sequences by index. The result is as long as the longer
/// sequence; x comes from `a` where it has the index, otherwise from `b`.
pub fn merge(a: &[Point<Number>], b: &[Point<Number>]) -> Vec<DualRow> {
    let len = a.len().max(b.len());
    (0..len)
        .filter_map(|idx| {
            let (pa, pb) = (a.get(idx), b.get(idx));
            let x = pa.or(pb)?.x;
            Some(DualRow {
                x,
                y1: pa.map(|p| p.y),
                y2: pb.map(|p| p.y),
            })
        })
        .collect()
}

pub fn run_both(
    a: &Equation,
    b: &Equation,
    method: Method,
    config: &StepConfig,
) -> Result<(Run, Run), Error> {
    let first = solve(a, method, config)?;
    let second = solve(b, method, config)?;
    if first.points.len() != second.points.len() {
        log::debug!(
            "trajectories differ in length ({} and {} points)",
            first.points.len(),
            second.points.len()
        );
    }
    Ok((first, second))
}

pub fn combine(
    a: &Equation,
    b: &Equation,
    method: Method,
    config: &StepConfig,
) -> Result<Vec<DualRow>, Error> {
    let (first, second) = run_both(a, b, method, config)?;
    Ok(merge(&first.points, &second.points))
}

/// Compares both trajectories against the same exact solution, pairing rows
/// by iteration index.
pub fn dual_table<G, E>(
    a: &[Point<Number>],
    b: &[Point<Number>],
    mut exact: G,
) -> Result<Vec<DualTableRow>, E>
where
    G: FnMut(Number) -> Result<Number, E>,
{
    let first = compare_to_exact(a, &mut exact)?;
    let second = compare_to_exact(b, &mut exact)?;
    let len = first.len().max(second.len());
    Ok((0..len)
        .map(|idx| DualTableRow {
            iteration: idx + 1,
            first: first.get(idx).copied(),
            second: second.get(idx).copied(),
        })
        .collect())
}
