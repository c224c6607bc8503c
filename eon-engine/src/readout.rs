// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Linear readout: `y[o] = Σ_i W[o][i] · x[i]` (no bias).
//!
//! Two layers:
//! 1. **ReadoutWeights**: an immutable `outputs × reservoir` matrix
//! 2. **SharedReadout**: a handle that lets one writer replace the weights
//!    while any number of readers predict concurrently
//!
//! Readers take a snapshot (`Arc<ReadoutWeights>`) and compute on it, so a
//! prediction always sees either the complete old matrix or the complete new
//! one, never a mix.

use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{EsnError, Result};

// ─── Readout Trait ──────────────────────────────────

/// Maps a reservoir state to an output vector.
pub trait Readout: Send + Sync {
    fn read(&self, state: &[f32]) -> Vec<f32>;

    fn output_dim(&self) -> usize;
}

// ─── Readout Weights ────────────────────────────────

/// Row-major `output_dim × state_dim` readout matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadoutWeights {
    output_dim: usize,
    state_dim: usize,
    weights: Vec<f32>,
}

impl ReadoutWeights {
    /// All-zero readout: predicts zeros until trained or imported.
    pub fn zeros(output_dim: usize, state_dim: usize) -> Self {
        Self {
            output_dim,
            state_dim,
            weights: vec![0.0; output_dim * state_dim],
        }
    }

    pub fn from_vec(output_dim: usize, state_dim: usize, weights: Vec<f32>) -> Result<Self> {
        let expected = output_dim * state_dim;
        if weights.len() != expected {
            return Err(EsnError::DimensionMismatch {
                what: "readout weights",
                expected,
                got: weights.len(),
            });
        }
        Ok(Self {
            output_dim,
            state_dim,
            weights,
        })
    }

    pub fn output_dim(&self) -> usize {
        self.output_dim
    }

    pub fn state_dim(&self) -> usize {
        self.state_dim
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.weights
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.weights.clone()
    }

    pub fn row(&self, output: usize) -> &[f32] {
        let start = output * self.state_dim;
        &self.weights[start..start + self.state_dim]
    }

    pub fn is_zero(&self) -> bool {
        self.weights.iter().all(|&w| w == 0.0)
    }

    /// `y = W · state`. `state.len()` must equal `state_dim`.
    pub fn predict(&self, state: &[f32]) -> Vec<f32> {
        debug_assert_eq!(state.len(), self.state_dim);
        (0..self.output_dim)
            .map(|o| {
                self.row(o)
                    .iter()
                    .zip(state)
                    .map(|(&w, &x)| w * x)
                    .sum()
            })
            .collect()
    }
}

impl Readout for ReadoutWeights {
    fn read(&self, state: &[f32]) -> Vec<f32> {
        self.predict(state)
    }

    fn output_dim(&self) -> usize {
        self.output_dim
    }
}

// ─── Shared Readout ─────────────────────────────────

/// Cloneable handle to the current readout of a node.
///
/// Clones share the same slot. A panicked writer cannot leave a torn matrix
/// behind (the slot only ever holds complete `Arc`s), so lock poisoning is
/// ignored.
#[derive(Debug, Clone)]
pub struct SharedReadout {
    slot: Arc<RwLock<Arc<ReadoutWeights>>>,
}

impl SharedReadout {
    pub fn new(weights: ReadoutWeights) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Arc::new(weights))),
        }
    }

    /// Current weights; unaffected by later stores.
    pub fn load(&self) -> Arc<ReadoutWeights> {
        let guard = self.slot.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&*guard)
    }

    /// Atomically replace the weights.
    pub fn store(&self, weights: ReadoutWeights) {
        let next = Arc::new(weights);
        let mut guard = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = next;
    }

    pub fn predict(&self, state: &[f32]) -> Vec<f32> {
        self.load().predict(state)
    }
}

impl Readout for SharedReadout {
    fn read(&self, state: &[f32]) -> Vec<f32> {
        self.predict(state)
    }

    fn output_dim(&self) -> usize {
        self.load().output_dim()
    }
}
