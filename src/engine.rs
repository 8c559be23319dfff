//! [`SolveEngine`] backed by the `microlp` simplex / branch-and-bound solver.
//!
//! `microlp` has no notion of a time budget, so the solve runs on a worker thread and the
//! caller waits on a channel until the deadline. A worker that outlives its deadline is
//! abandoned; it finishes in the background and its late answer is dropped.
//! [`running_workers`] counts workers that have not finished yet, abandoned ones included.

use crate::constraint::Comp;
use crate::model::{Model, OptDir};
use crate::solver::{Solution, SolveEngine, SolveOutcome, SolveStatus};
use crate::var::Variable;

use log::{debug, warn};
use microlp::{ComparisonOp, OptimizationDirection, Problem};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

const INTEGRALITY_TOL: f64 = 1e-6;

static RUNNING_WORKERS: AtomicUsize = AtomicUsize::new(0);

/// Solver workers started by any [`MicroLpEngine`] that are still running.
pub fn running_workers() -> usize {
    RUNNING_WORKERS.load(Ordering::SeqCst)
}

/// Counts one live worker for as long as it is held.
struct WorkerSlot(&'static AtomicUsize);

impl WorkerSlot {
    fn claim(counter: &'static AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WorkerSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Debug)]
struct Column {
    obj: f64,
    lb: f64,
    ub: f64,
    binary: bool,
}

#[derive(Clone, Debug)]
struct Row {
    terms: Vec<(usize, f64)>,
    comp: Comp,
    rhs: f64,
}

/// Index-based copy of a [`Model`] that can cross a thread boundary.
#[derive(Clone, Debug)]
struct LinearProgram {
    maximize: bool,
    columns: Vec<Column>,
    rows: Vec<Row>,
    obj_offset: f64,
}

#[derive(Clone, Debug, PartialEq)]
struct Assignment {
    values: Vec<f64>,
    objective: f64,
}

enum Message {
    Incumbent(Assignment),
    Finished(Result<Assignment, microlp::Error>),
}

enum Awaited {
    Finished(Result<Assignment, microlp::Error>),
    TimedOut(Option<Assignment>),
    Crashed,
}

impl LinearProgram {
    fn from_model(mdl: &Model) -> Result<(Self, Vec<Variable>), SolveStatus> {
        let vars = mdl.variables();
        let index: FxHashMap<Variable, usize> = vars
            .iter()
            .enumerate()
            .map(|(i, v)| (v.clone(), i))
            .collect();

        let columns = vars
            .iter()
            .map(|v| Column {
                obj: mdl.obj_fn().coeff(v),
                lb: v.lb().unwrap_or(f64::NEG_INFINITY),
                ub: v.ub().unwrap_or(f64::INFINITY),
                binary: v.is_binary(),
            })
            .collect();

        let mut rows = Vec::with_capacity(mdl.constraints().len());
        for cons in mdl.constraints() {
            let norm = cons.normalized();
            if norm.terms.is_empty() {
                //nothing for the engine to decide, check the constant directly
                let holds = match norm.comp {
                    Comp::Le => 0.0 <= norm.rhs + INTEGRALITY_TOL,
                    Comp::Ge => 0.0 >= norm.rhs - INTEGRALITY_TOL,
                    Comp::Eq => norm.rhs.abs() <= INTEGRALITY_TOL,
                };
                if !holds {
                    debug!("constant constraint {} can never hold", cons);
                    return Err(SolveStatus::Infeasible);
                }
                continue;
            }
            let mut terms = Vec::with_capacity(norm.terms.len());
            for (var, coeff) in norm.terms {
                match index.get(&var) {
                    Some(&j) => terms.push((j, coeff)),
                    None => {
                        warn!(
                            "constraint {} uses variable {} from another environment",
                            cons.name(),
                            var
                        );
                        return Err(SolveStatus::Undetermined);
                    }
                }
            }
            rows.push(Row {
                terms,
                comp: norm.comp,
                rhs: norm.rhs,
            });
        }

        let program = Self {
            maximize: mdl.opt_dir() == OptDir::Max,
            columns,
            rows,
            obj_offset: mdl.obj_fn().constant(),
        };
        Ok((program, vars))
    }

    fn has_binaries(&self) -> bool {
        self.columns.iter().any(|c| c.binary)
    }

    /// Builds the engine problem. `relax` turns binaries into `[0, 1]` reals; `fixed` pins
    /// every binary column to the given value.
    fn to_problem(&self, relax: bool, fixed: Option<&[f64]>) -> (Problem, Vec<microlp::Variable>) {
        let direction = if self.maximize {
            OptimizationDirection::Maximize
        } else {
            OptimizationDirection::Minimize
        };
        let mut problem = Problem::new(direction);

        let mut vars = Vec::with_capacity(self.columns.len());
        for (j, col) in self.columns.iter().enumerate() {
            let var = match (col.binary, fixed) {
                (true, Some(values)) => problem.add_var(col.obj, (values[j], values[j])),
                (true, None) if relax => problem.add_var(col.obj, (0.0, 1.0)),
                (true, None) => problem.add_binary_var(col.obj),
                (false, _) => problem.add_var(col.obj, (col.lb, col.ub)),
            };
            vars.push(var);
        }

        for row in &self.rows {
            let op = match row.comp {
                Comp::Le => ComparisonOp::Le,
                Comp::Ge => ComparisonOp::Ge,
                Comp::Eq => ComparisonOp::Eq,
            };
            problem.add_constraint(row.terms.iter().map(|&(j, c)| (vars[j], c)), op, row.rhs);
        }
        (problem, vars)
    }

    fn solve_with(&self, relax: bool, fixed: Option<&[f64]>) -> Result<Assignment, microlp::Error> {
        let (problem, vars) = self.to_problem(relax, fixed);
        let solution = problem.solve()?;
        Ok(Assignment {
            values: vars.iter().map(|v| solution[*v]).collect(),
            objective: solution.objective() + self.obj_offset,
        })
    }

    /// Relaxation rounding: open every indicator the LP relaxation uses, then re-solve the LP.
    fn rounded_incumbent(&self, relaxed: &Assignment) -> Option<Assignment> {
        let rounded: Vec<f64> = relaxed
            .values
            .iter()
            .zip(&self.columns)
            .map(|(v, col)| match col.binary {
                true if *v > INTEGRALITY_TOL => 1.0,
                true => 0.0,
                false => *v,
            })
            .collect();
        self.solve_with(false, Some(&rounded)).ok()
    }
}

fn run_worker(program: LinearProgram, incumbent_heuristic: bool, tx: Sender<Message>) {
    //sends only fail once the caller gave up waiting
    if program.has_binaries() {
        match program.solve_with(true, None) {
            Err(microlp::Error::Infeasible) => {
                let _ = tx.send(Message::Finished(Err(microlp::Error::Infeasible)));
                return;
            }
            Ok(relaxed) if incumbent_heuristic => {
                if let Some(incumbent) = program.rounded_incumbent(&relaxed) {
                    let _ = tx.send(Message::Incumbent(incumbent));
                }
            }
            _ => {}
        }
    }
    let _ = tx.send(Message::Finished(program.solve_with(false, None)));
}

fn await_outcome(rx: &Receiver<Message>, deadline: Option<Instant>) -> Awaited {
    let mut incumbent = None;
    loop {
        let received = match deadline {
            Some(deadline) => rx.recv_timeout(deadline.saturating_duration_since(Instant::now())),
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };
        match received {
            Ok(Message::Incumbent(found)) => {
                debug!("incumbent with objective {:.4}", found.objective);
                incumbent = Some(found);
            }
            Ok(Message::Finished(result)) => return Awaited::Finished(result),
            Err(RecvTimeoutError::Timeout) => return Awaited::TimedOut(incumbent),
            Err(RecvTimeoutError::Disconnected) => return Awaited::Crashed,
        }
    }
}

fn to_solution(vars: &[Variable], assignment: Assignment) -> Solution {
    let values = vars.iter().cloned().zip(assignment.values).collect();
    Solution::new(assignment.objective, values)
}

/// `microlp` cannot be interrupted. A solve that hits its time limit returns on time, but
/// its worker thread keeps a core busy until `microlp` gives up on its own. Repeated timed
/// out solves, such as a sensitivity sweep over a hard MIP, stack such workers up.
#[derive(Clone, Debug)]
pub struct MicroLpEngine {
    incumbent_heuristic: bool,
}

impl Default for MicroLpEngine {
    fn default() -> Self {
        Self {
            incumbent_heuristic: true,
        }
    }
}

impl MicroLpEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the relaxation-rounding pass; a timed-out MIP then never has an incumbent.
    pub fn without_incumbent_heuristic(mut self) -> Self {
        self.incumbent_heuristic = false;
        self
    }
}

impl SolveEngine for MicroLpEngine {
    fn solve(&self, mdl: &Model, time_limit: Duration) -> SolveOutcome {
        let deadline = Instant::now().checked_add(time_limit);
        let (program, vars) = match LinearProgram::from_model(mdl) {
            Ok(translated) => translated,
            Err(status) => return SolveOutcome::failed(status),
        };

        let (tx, rx) = mpsc::channel();
        let heuristic = self.incumbent_heuristic;
        let slot = WorkerSlot::claim(&RUNNING_WORKERS);
        let spawned = thread::Builder::new()
            .name("microlp-worker".to_string())
            .spawn(move || {
                let _slot = slot;
                run_worker(program, heuristic, tx)
            });
        if let Err(err) = spawned {
            warn!("could not start solver worker: {}", err);
            return SolveOutcome::failed(SolveStatus::Undetermined);
        }

        match await_outcome(&rx, deadline) {
            Awaited::Finished(Ok(assignment)) => SolveOutcome::optimal(to_solution(&vars, assignment)),
            Awaited::Finished(Err(microlp::Error::Infeasible)) => {
                SolveOutcome::failed(SolveStatus::Infeasible)
            }
            Awaited::Finished(Err(microlp::Error::Unbounded)) => {
                SolveOutcome::failed(SolveStatus::Unbounded)
            }
            Awaited::Finished(Err(err)) => {
                warn!("engine error: {}", err);
                SolveOutcome::failed(SolveStatus::Undetermined)
            }
            Awaited::TimedOut(incumbent) => {
                warn!(
                    "abandoning solver worker after {:?}; {} still running",
                    time_limit,
                    running_workers()
                );
                SolveOutcome::time_limit(incumbent.map(|found| to_solution(&vars, found)))
            }
            Awaited::Crashed => {
                warn!("solver worker stopped without an answer");
                SolveOutcome::failed(SolveStatus::Undetermined)
            }
        }
    }
}
