// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Seeded Reservoir Topology with CSR Incoming Connections
//!
//! The topology (input weights plus sparse recurrent connections) is a pure
//! function of the config. Draw order from [`Lcg64`]:
//!
//! 1. Input weights, row-major over (unit `i`, input `j`): one `next_unit` each.
//! 2. Connections: per attempt `from = next_index(n)`, `to = next_index(n)`,
//!    `w = next_unit`. An already-used `(from, to)` pair discards all three
//!    draws and retries, until `target_connections` distinct pairs exist.
//! 3. Every recurrent weight is scaled by `spectral_radius / sqrt(k / n)`.
//!
//! The scaling is a heuristic estimate of the spectral radius of a random
//! sparse matrix, not an eigenvalue computation.
//!
//! Connections are kept in generation order and additionally indexed by
//! target unit in CSR form:
//! - `incoming_offsets[i]..incoming_offsets[i+1]` is the edge range of unit `i`
//! - `incoming_sources[e]` is the source unit of edge `e`
//! - `incoming_weights[e]` is its scaled weight

use eon_math::Lcg64;
use tracing::debug;

use crate::config::ReservoirConfig;
use crate::error::Result;

/// One directed recurrent connection `from → to`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Connection {
    pub from: u32,
    pub to: u32,
    pub weight: f32,
}

/// Fixed reservoir wiring shared by every node built from the same config.
#[derive(Debug, Clone, PartialEq)]
pub struct Topology {
    input_dim: usize,
    size: usize,
    /// `size × input_dim`, row-major
    input_weights: Vec<f32>,
    /// Scaled connections in generation order
    connections: Vec<Connection>,
    incoming_offsets: Vec<u32>,
    incoming_sources: Vec<u32>,
    incoming_weights: Vec<f32>,
    spectral_scale: f32,
}

impl Topology {
    /// Build the topology for `config`, validating it first.
    pub fn generate(config: &ReservoirConfig) -> Result<Self> {
        config.validate()?;
        let n = config.reservoir_size;
        let d = config.input_dim;
        let k = config.target_connections();
        let mut rng = Lcg64::new(config.seed);

        let input_weights: Vec<f32> = (0..n * d).map(|_| rng.next_unit()).collect();

        let mut used = vec![false; n * n];
        let mut connections = Vec::with_capacity(k);
        let mut rejected = 0usize;
        while connections.len() < k {
            let from = rng.next_index(n);
            let to = rng.next_index(n);
            let weight = rng.next_unit();
            let slot = &mut used[from * n + to];
            if *slot {
                rejected += 1;
                continue;
            }
            *slot = true;
            connections.push(Connection {
                from: from as u32,
                to: to as u32,
                weight,
            });
        }

        let spectral_scale = config.spectral_radius / (k as f32 / n as f32).sqrt();
        for c in &mut connections {
            c.weight *= spectral_scale;
        }

        let (incoming_offsets, incoming_sources, incoming_weights) = build_incoming(n, &connections);

        let topology = Self {
            input_dim: d,
            size: n,
            input_weights,
            connections,
            incoming_offsets,
            incoming_sources,
            incoming_weights,
            spectral_scale,
        };
        debug!(
            seed = config.seed,
            units = n,
            connections = k,
            rejected,
            spectral_scale,
            fingerprint = %format!("{:016x}", topology.fingerprint()),
            "reservoir topology generated"
        );
        Ok(topology)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn input_dim(&self) -> usize {
        self.input_dim
    }

    /// Input weights, `size × input_dim` row-major.
    pub fn input_weights(&self) -> &[f32] {
        &self.input_weights
    }

    /// Input weight row of `unit`.
    pub fn input_row(&self, unit: usize) -> &[f32] {
        let start = unit * self.input_dim;
        &self.input_weights[start..start + self.input_dim]
    }

    /// Connections in generation order, already scaled.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }

    /// Factor applied to every drawn recurrent weight.
    pub fn spectral_scale(&self) -> f32 {
        self.spectral_scale
    }

    /// Number of connections ending at `unit`.
    pub fn num_incoming(&self, unit: usize) -> usize {
        (self.incoming_offsets[unit + 1] - self.incoming_offsets[unit]) as usize
    }

    /// `(source, weight)` pairs of every connection ending at `unit`.
    pub fn incoming(&self, unit: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        let start = self.incoming_offsets[unit] as usize;
        let end = self.incoming_offsets[unit + 1] as usize;
        self.incoming_sources[start..end]
            .iter()
            .zip(&self.incoming_weights[start..end])
            .map(|(&s, &w)| (s as usize, w))
    }

    /// FNV-1a hash over dimensions, input weights and connections.
    ///
    /// Equal fingerprints across nodes mean bit-identical reservoirs.
    pub fn fingerprint(&self) -> u64 {
        const FNV_OFFSET: u64 = 0xcbf29ce484222325;
        const FNV_PRIME: u64 = 0x100000001b3;

        let mut hash = FNV_OFFSET;
        let mut feed = |bytes: &[u8]| {
            for &b in bytes {
                hash ^= b as u64;
                hash = hash.wrapping_mul(FNV_PRIME);
            }
        };
        feed(&(self.size as u64).to_le_bytes());
        feed(&(self.input_dim as u64).to_le_bytes());
        for w in &self.input_weights {
            feed(&w.to_bits().to_le_bytes());
        }
        for c in &self.connections {
            feed(&c.from.to_le_bytes());
            feed(&c.to.to_le_bytes());
            feed(&c.weight.to_bits().to_le_bytes());
        }
        hash
    }
}

/// Counting sort of connections by target; generation order is preserved
/// within each target.
fn build_incoming(n: usize, connections: &[Connection]) -> (Vec<u32>, Vec<u32>, Vec<f32>) {
    let mut offsets = vec![0u32; n + 1];
    for c in connections {
        offsets[c.to as usize + 1] += 1;
    }
    for i in 0..n {
        offsets[i + 1] += offsets[i];
    }

    let mut cursor: Vec<u32> = offsets[..n].to_vec();
    let mut sources = vec![0u32; connections.len()];
    let mut weights = vec![0.0f32; connections.len()];
    for c in connections {
        let slot = &mut cursor[c.to as usize];
        sources[*slot as usize] = c.from;
        weights[*slot as usize] = c.weight;
        *slot += 1;
    }
    (offsets, sources, weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_deterministic_from_seed() {
        let config = ReservoirConfig::sine_demo();
        let a = Topology::generate(&config).unwrap();
        let b = Topology::generate(&config).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_seed_changes_topology() {
        let a = Topology::generate(&ReservoirConfig::sine_demo()).unwrap();
        let b = Topology::generate(&ReservoirConfig::sine_demo().with_seed(43)).unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_connection_count_and_uniqueness() {
        let config = ReservoirConfig::new(2, 30, 1).with_density(0.15);
        let topo = Topology::generate(&config).unwrap();
        assert_eq!(topo.num_connections(), config.target_connections());

        let pairs: HashSet<(u32, u32)> = topo.connections().iter().map(|c| (c.from, c.to)).collect();
        assert_eq!(pairs.len(), topo.num_connections());
        assert!(topo.connections().iter().all(|c| (c.from as usize) < 30 && (c.to as usize) < 30));
    }

    #[test]
    fn test_full_density_fills_every_pair() {
        let config = ReservoirConfig::new(1, 6, 1).with_density(1.0);
        let topo = Topology::generate(&config).unwrap();
        assert_eq!(topo.num_connections(), 36);
        for unit in 0..6 {
            assert_eq!(topo.num_incoming(unit), 6);
        }
    }

    #[test]
    fn test_input_weights_are_q15_units() {
        let config = ReservoirConfig::new(3, 25, 1);
        let topo = Topology::generate(&config).unwrap();
        assert_eq!(topo.input_weights().len(), 75);
        for &w in topo.input_weights() {
            assert!((-1.0..1.0).contains(&w), "input weight {} out of range", w);
            let q = w * 32768.0;
            assert_eq!(q, q.trunc(), "{} is not a Q15 multiple", w);
        }
    }

    #[test]
    fn test_input_weights_drawn_first() {
        let config = ReservoirConfig::new(2, 10, 1).with_seed(9);
        let topo = Topology::generate(&config).unwrap();
        let mut rng = Lcg64::new(9);
        let expected: Vec<f32> = (0..20).map(|_| rng.next_unit()).collect();
        assert_eq!(topo.input_weights(), &expected[..]);
        assert_eq!(topo.input_row(3), &expected[6..8]);
    }

    #[test]
    fn test_recurrent_weights_scaled() {
        let config = ReservoirConfig::sine_demo();
        let topo = Topology::generate(&config).unwrap();
        // k = 80, n = 20: scale = 0.9 / sqrt(4) = 0.45
        assert!((topo.spectral_scale() - 0.45).abs() < 1e-6);
        for c in topo.connections() {
            assert!(c.weight.abs() <= 0.45 + 1e-6);
        }
    }

    #[test]
    fn test_csr_matches_connection_list() {
        let topo = Topology::generate(&ReservoirConfig::new(1, 15, 1)).unwrap();
        let mut total = 0;
        for unit in 0..15 {
            let from_csr: Vec<(usize, f32)> = topo.incoming(unit).collect();
            let from_list: Vec<(usize, f32)> = topo
                .connections()
                .iter()
                .filter(|c| c.to as usize == unit)
                .map(|c| (c.from as usize, c.weight))
                .collect();
            assert_eq!(from_csr, from_list, "unit {}", unit);
            total += from_csr.len();
        }
        assert_eq!(total, topo.num_connections());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ReservoirConfig::new(1, 0, 1);
        assert!(Topology::generate(&config).is_err());
    }

    #[test]
    fn test_single_unit_reservoir() {
        let topo = Topology::generate(&ReservoirConfig::new(1, 1, 1)).unwrap();
        assert_eq!(topo.num_connections(), 1);
        assert_eq!(topo.connections()[0].from, 0);
        assert_eq!(topo.connections()[0].to, 0);
    }
}
