// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Closed-form readout training for a reservoir node.
//!
//! Ridge regression without bias:
//!
//! `W = Yᵀ·X · (XᵀX + λI)⁻¹`
//!
//! where the rows of `X` are reservoir states after the washout and the rows
//! of `Y` the matching targets. States are never stored: the Gram matrix
//! `XᵀX + λI` and the cross term `XᵀY` are accumulated in f64 while the
//! sequence is replayed, so memory is `O(n² + n·k)` regardless of length.
//!
//! Pipeline: reset → replay + accumulate → solve → clamp → reset → replay +
//! score.

use eon_math::{DenseMatrix, GaussJordanSolver, NormalEquationSolver};
use tracing::debug;

use crate::config::ReservoirConfig;
use crate::error::{EsnError, Result};
use crate::readout::ReadoutWeights;
use crate::state::ReservoirState;
use crate::topology::Topology;

// ─── Normal Equations ───────────────────────────────

/// Streaming accumulator for `XᵀX + λI` and `XᵀY`.
#[derive(Debug, Clone)]
pub struct NormalEquations {
    gram: DenseMatrix,
    cross: DenseMatrix,
    samples: usize,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl NormalEquations {
    /// Empty accumulator for `state_dim` features and `output_dim` targets,
    /// with `regularization` pre-loaded on the Gram diagonal.
    pub fn new(state_dim: usize, output_dim: usize, regularization: f64) -> Self {
        let mut gram = DenseMatrix::zeros(state_dim, state_dim);
        gram.add_diagonal(regularization);
        Self {
            gram,
            cross: DenseMatrix::zeros(state_dim, output_dim),
            samples: 0,
            x: vec![0.0; state_dim],
            y: vec![0.0; output_dim],
        }
    }

    pub fn add(&mut self, state: &[f32], target: &[f32]) {
        for (dst, &v) in self.x.iter_mut().zip(state) {
            *dst = v as f64;
        }
        for (dst, &v) in self.y.iter_mut().zip(target) {
            *dst = v as f64;
        }
        self.gram.accumulate_gram_upper(&self.x);
        self.cross.accumulate_outer(&self.x, &self.y);
        self.samples += 1;
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Symmetric Gram matrix and cross term.
    pub fn finish(mut self) -> (DenseMatrix, DenseMatrix) {
        self.gram.symmetrize_from_upper();
        (self.gram, self.cross)
    }
}

// ─── Report ─────────────────────────────────────────

/// Outcome of one training run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainReport {
    /// Mean squared error over every post-washout step and output
    pub mse: f32,
    /// MSE of the all-zero predictor on the same steps
    pub baseline_mse: f32,
    /// Steps that contributed to the regression (`T - washout`)
    pub samples: usize,
    pub washout: usize,
}

impl TrainReport {
    pub fn beats_baseline(&self) -> bool {
        self.mse < self.baseline_mse
    }

    /// `mse / baseline_mse`; 0 when the targets are all zero.
    pub fn relative_mse(&self) -> f32 {
        if self.baseline_mse <= 0.0 {
            0.0
        } else {
            self.mse / self.baseline_mse
        }
    }
}

// ─── Trainer ────────────────────────────────────────

/// Trains readouts for one reservoir shape.
#[derive(Debug)]
pub struct ReadoutTrainer {
    output_dim: usize,
    regularization: f64,
    weight_clamp: f32,
    solver: Box<dyn NormalEquationSolver>,
}

impl ReadoutTrainer {
    /// Trainer with the Gauss-Jordan solver.
    pub fn new(output_dim: usize, regularization: f32, weight_clamp: f32) -> Self {
        Self {
            output_dim,
            regularization: regularization as f64,
            weight_clamp,
            solver: Box::new(GaussJordanSolver),
        }
    }

    pub fn from_config(config: &ReservoirConfig) -> Self {
        Self::new(config.output_dim, config.regularization, config.weight_clamp)
    }

    pub fn with_solver(mut self, solver: impl NormalEquationSolver + 'static) -> Self {
        self.solver = Box::new(solver);
        self
    }

    pub fn solver_name(&self) -> &'static str {
        self.solver.name()
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    /// Fit a readout to `(inputs[t], targets[t])`, ignoring the first
    /// `washout` steps.
    ///
    /// `state` is reset before each replay; on success it holds the state
    /// after the last input. Nothing is touched when validation fails.
    pub fn train<I, Y>(
        &self,
        topology: &Topology,
        state: &mut ReservoirState,
        inputs: &[I],
        targets: &[Y],
        washout: usize,
    ) -> Result<(ReadoutWeights, TrainReport)>
    where
        I: AsRef<[f32]>,
        Y: AsRef<[f32]>,
    {
        validate_sequences(inputs, targets, washout, topology.input_dim(), self.output_dim)?;
        let n = topology.size();

        let mut equations = NormalEquations::new(n, self.output_dim, self.regularization);
        state.reset();
        for (t, (u, y)) in inputs.iter().zip(targets).enumerate() {
            state.update(topology, u.as_ref());
            if t >= washout {
                equations.add(state.values(), y.as_ref());
            }
        }
        let samples = equations.samples();
        let (gram, cross) = equations.finish();

        let solved = self.solver.solve(&gram, &cross);
        let clamp = self.weight_clamp;
        let weights: Vec<f32> = solved
            .into_vec()
            .into_iter()
            .map(|w| {
                let w = w as f32;
                if w.is_finite() {
                    w.clamp(-clamp, clamp)
                } else {
                    0.0
                }
            })
            .collect();
        let readout = ReadoutWeights::from_vec(self.output_dim, n, weights)?;

        let (mse, baseline_mse) = evaluate(topology, state, &readout, inputs, targets, washout);
        let report = TrainReport {
            mse,
            baseline_mse,
            samples,
            washout,
        };
        debug!(
            solver = self.solver.name(),
            samples,
            washout,
            mse,
            baseline_mse,
            "readout trained"
        );
        Ok((readout, report))
    }
}

/// Check lengths and widths of a training sequence.
pub fn validate_sequences<I, Y>(
    inputs: &[I],
    targets: &[Y],
    washout: usize,
    input_dim: usize,
    output_dim: usize,
) -> Result<()>
where
    I: AsRef<[f32]>,
    Y: AsRef<[f32]>,
{
    if targets.len() != inputs.len() {
        return Err(EsnError::DimensionMismatch {
            what: "target sequence",
            expected: inputs.len(),
            got: targets.len(),
        });
    }
    if inputs.len() <= washout {
        return Err(EsnError::InsufficientData {
            samples: inputs.len(),
            washout,
        });
    }
    if let Some(bad) = inputs.iter().find(|u| u.as_ref().len() != input_dim) {
        return Err(EsnError::DimensionMismatch {
            what: "input",
            expected: input_dim,
            got: bad.as_ref().len(),
        });
    }
    if let Some(bad) = targets.iter().find(|y| y.as_ref().len() != output_dim) {
        return Err(EsnError::DimensionMismatch {
            what: "target",
            expected: output_dim,
            got: bad.as_ref().len(),
        });
    }
    Ok(())
}

/// Replay the sequence from a zero state and score `readout`.
///
/// Returns `(mse, baseline_mse)`, both averaged over every post-washout step
/// and output. Inputs must already be validated.
pub fn evaluate<I, Y>(
    topology: &Topology,
    state: &mut ReservoirState,
    readout: &ReadoutWeights,
    inputs: &[I],
    targets: &[Y],
    washout: usize,
) -> (f32, f32)
where
    I: AsRef<[f32]>,
    Y: AsRef<[f32]>,
{
    let mut err = 0.0f64;
    let mut base = 0.0f64;
    let mut count = 0usize;

    state.reset();
    for (t, (u, y)) in inputs.iter().zip(targets).enumerate() {
        state.update(topology, u.as_ref());
        if t < washout {
            continue;
        }
        let pred = readout.predict(state.values());
        for (&p, &a) in pred.iter().zip(y.as_ref()) {
            let d = (p - a) as f64;
            err += d * d;
            base += (a as f64) * (a as f64);
            count += 1;
        }
    }

    if count == 0 {
        return (0.0, 0.0);
    }
    ((err / count as f64) as f32, (base / count as f64) as f32)
}
