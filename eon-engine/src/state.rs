// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Reservoir state and the recurrent update
//!
//! `x'[i] = f( Σ_j Win[i][j]·u[j] + Σ_{c: c.to = i} c.weight·x[c.from] )`
//!
//! Every unit reads the previous state only: the new values are gathered
//! into a scratch buffer and swapped in afterwards.

use eon_math::Activation;

use crate::topology::Topology;

/// Current activations of every reservoir unit plus an update counter.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservoirState {
    values: Vec<f32>,
    scratch: Vec<f32>,
    activation: Activation,
    samples_processed: u64,
}

impl ReservoirState {
    /// All-zero state of `size` units.
    pub fn new(size: usize, activation: Activation) -> Self {
        Self {
            values: vec![0.0; size],
            scratch: vec![0.0; size],
            activation,
            samples_processed: 0,
        }
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Total updates since construction. Survives [`reset`](Self::reset).
    pub fn samples_processed(&self) -> u64 {
        self.samples_processed
    }

    /// Advance one time step with `input`.
    ///
    /// The caller guarantees `input.len() == topology.input_dim()` and a
    /// matching reservoir size.
    pub fn update(&mut self, topology: &Topology, input: &[f32]) {
        debug_assert_eq!(input.len(), topology.input_dim());
        debug_assert_eq!(self.values.len(), topology.size());

        for (i, out) in self.scratch.iter_mut().enumerate() {
            let mut pre: f32 = topology
                .input_row(i)
                .iter()
                .zip(input)
                .map(|(&w, &u)| w * u)
                .sum();
            for (src, w) in topology.incoming(i) {
                pre += w * self.values[src];
            }
            *out = self.activation.apply(pre);
        }
        std::mem::swap(&mut self.values, &mut self.scratch);
        self.samples_processed += 1;
    }

    /// Zero every unit. The update counter is kept.
    pub fn reset(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Sum of squared activations.
    pub fn energy(&self) -> f32 {
        self.values.iter().map(|v| v * v).sum()
    }
}
