// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Readout fusion across seed-compatible nodes.
//!
//! Two nodes built from the same seed have identical reservoirs, so their
//! readout weights live in the same coordinate system and can be merged.
//! Fusion only ever sees trained (and usually quantized) weight vectors,
//! never raw samples.
//!
//! Strategies:
//! - **Experience-weighted average**: `merged = local·(1 − r) + remote·r`
//!   with `r = n_remote / (n_local + n_remote)`
//! - **Majority vote**: per-index sign election, ties resolve positive,
//!   rebuilt at a fixed scale

use tracing::debug;

use crate::error::{ExchangeError, Result};
use crate::packet::Packet;

/// Weights received from a peer, tagged with the peer's seed and experience.
#[derive(Debug, Clone, PartialEq)]
pub struct PeerWeights {
    pub seed: u32,
    pub weights: Vec<f32>,
    /// Number of training samples behind these weights.
    pub samples: u64,
}

impl PeerWeights {
    pub fn new(seed: u32, weights: Vec<f32>, samples: u64) -> Self {
        Self {
            seed,
            weights,
            samples,
        }
    }

    /// Parse a packet and rebuild its weights (`scale` applies to minimal
    /// sign packets only).
    pub fn from_packet(bytes: &[u8], scale: f32, samples: u64) -> Result<Self> {
        let packet = Packet::from_bytes(bytes)?;
        let weights = packet.weights(scale)?;
        Ok(Self::new(packet.seed(), weights, samples))
    }
}

/// Fusion is only defined between identical topologies.
pub fn check_seed(local: u32, remote: u32) -> Result<()> {
    if local != remote {
        return Err(ExchangeError::SeedMismatch { local, remote });
    }
    Ok(())
}

fn check_len(expected: usize, got: usize) -> Result<()> {
    if expected != got {
        return Err(ExchangeError::LengthMismatch { expected, got });
    }
    Ok(())
}

/// Reject the first infinity or NaN in `weights`.
pub fn check_finite(weights: &[f32]) -> Result<()> {
    match weights.iter().position(|w| !w.is_finite()) {
        Some(index) => Err(ExchangeError::NonFiniteWeight { index }),
        None => Ok(()),
    }
}

/// Mixing ratio `n_remote / (n_local + n_remote)`; 0 when both are zero.
pub fn remote_ratio(n_local: u64, n_remote: u64) -> f32 {
    let total = n_local as f64 + n_remote as f64;
    if total == 0.0 {
        0.0
    } else {
        (n_remote as f64 / total) as f32
    }
}

/// Experience-weighted average of two equal-length weight vectors.
///
/// `n_remote = 0` returns `local` unchanged; `n_local = 0` (with
/// `n_remote > 0`) returns `remote`. A non-finite remote weight is an error
/// whatever the ratio.
pub fn weighted_average(
    local: &[f32],
    n_local: u64,
    remote: &[f32],
    n_remote: u64,
) -> Result<Vec<f32>> {
    check_len(local.len(), remote.len())?;
    check_finite(remote)?;
    let r = remote_ratio(n_local, n_remote);
    debug!(n_local, n_remote, ratio = r, "experience-weighted fusion");

    // Exact endpoints: no rounding drift when one side has no experience
    if r == 0.0 {
        return Ok(local.to_vec());
    }
    if r == 1.0 {
        return Ok(remote.to_vec());
    }
    Ok(local
        .iter()
        .zip(remote.iter())
        .map(|(&l, &rm)| l * (1.0 - r) + rm * r)
        .collect())
}

/// Per-index majority vote over the signs of `voters`.
///
/// Each voter adds +1 for a non-negative weight and −1 for a negative one.
/// The result is `+scale` when the tally is `>= 0` (ties go positive) and
/// `-scale` otherwise.
pub fn majority_vote<V: AsRef<[f32]>>(voters: &[V], scale: f32) -> Result<Vec<f32>> {
    let first = voters.first().ok_or(ExchangeError::NoPeers)?.as_ref();
    let n = first.len();
    for v in &voters[1..] {
        check_len(n, v.as_ref().len())?;
    }

    let mut tally = vec![0i32; n];
    for v in voters {
        for (t, &w) in tally.iter_mut().zip(v.as_ref()) {
            *t += if w >= 0.0 { 1 } else { -1 };
        }
    }
    debug!(voters = voters.len(), weights = n, "majority-vote fusion");

    Ok(tally
        .into_iter()
        .map(|t| if t >= 0 { scale } else { -scale })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_check_seed() {
        assert!(check_seed(42, 42).is_ok());
        assert_eq!(
            check_seed(42, 43).unwrap_err(),
            ExchangeError::SeedMismatch {
                local: 42,
                remote: 43
            }
        );
    }

    #[test]
    fn test_average_boundaries() {
        let local = vec![1.0f32, -2.0, 0.5];
        let remote = vec![-1.0f32, 1.0, 0.25];

        assert_eq!(weighted_average(&local, 100, &remote, 0).unwrap(), local);
        assert_eq!(weighted_average(&local, 0, &remote, 100).unwrap(), remote);
        // Neither side has experience: keep local
        assert_eq!(weighted_average(&local, 0, &remote, 0).unwrap(), local);
    }

    #[test]
    fn test_average_ratio() {
        let merged = weighted_average(&[1.0, 0.0], 300, &[0.0, 1.0], 100).unwrap();
        assert!((merged[0] - 0.75).abs() < 1e-6);
        assert!((merged[1] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_average_length_mismatch() {
        assert_eq!(
            weighted_average(&[1.0], 1, &[1.0, 2.0], 1).unwrap_err(),
            ExchangeError::LengthMismatch {
                expected: 1,
                got: 2
            }
        );
    }

    #[test]
    fn test_average_rejects_non_finite_remote() {
        assert_eq!(
            weighted_average(&[1.0, 2.0], 10, &[0.5, f32::NAN], 0).unwrap_err(),
            ExchangeError::NonFiniteWeight { index: 1 }
        );
        assert_eq!(
            check_finite(&[f32::NEG_INFINITY]).unwrap_err(),
            ExchangeError::NonFiniteWeight { index: 0 }
        );
        assert!(check_finite(&[f32::MAX, -0.0]).is_ok());
    }

    #[test]
    fn test_average_stays_between_inputs() {
        let mut rng = SmallRng::seed_from_u64(9);
        let local: Vec<f32> = (0..64).map(|_| rng.gen_range(-2.0f32..2.0)).collect();
        let remote: Vec<f32> = (0..64).map(|_| rng.gen_range(-2.0f32..2.0)).collect();
        let merged = weighted_average(&local, 17, &remote, 41).unwrap();
        for i in 0..64 {
            let lo = local[i].min(remote[i]) - 1e-6;
            let hi = local[i].max(remote[i]) + 1e-6;
            assert!(merged[i] >= lo && merged[i] <= hi, "index {} escaped [{}, {}]", i, lo, hi);
        }
    }

    #[test]
    fn test_majority_three_peers() {
        let peers = vec![vec![1.0f32, -1.0], vec![0.3, -0.2], vec![-0.9, 0.4]];
        let fused = majority_vote(&peers, 0.5).unwrap();
        // index 0: [+, +, -] -> +; index 1: [-, -, +] -> -
        assert_eq!(fused, vec![0.5, -0.5]);
    }

    #[test]
    fn test_majority_tie_resolves_positive() {
        let peers = vec![vec![1.0f32], vec![-1.0f32]];
        assert_eq!(majority_vote(&peers, 0.8).unwrap(), vec![0.8]);
    }

    #[test]
    fn test_majority_zero_counts_positive() {
        let peers = vec![vec![0.0f32], vec![-0.0f32], vec![-1.0f32]];
        assert_eq!(majority_vote(&peers, 1.0).unwrap(), vec![1.0]);
    }

    #[test]
    fn test_majority_errors() {
        let empty: Vec<Vec<f32>> = Vec::new();
        assert_eq!(majority_vote(&empty, 1.0).unwrap_err(), ExchangeError::NoPeers);
        let ragged = vec![vec![1.0f32, 2.0], vec![1.0f32]];
        assert!(matches!(
            majority_vote(&ragged, 1.0),
            Err(ExchangeError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_majority_accepts_slices() {
        let a = [1.0f32, -1.0];
        let b = [1.0f32, -1.0];
        let voters: Vec<&[f32]> = vec![&a[..], &b[..]];
        assert_eq!(majority_vote(&voters, 2.0).unwrap(), vec![2.0, -2.0]);
    }

    #[test]
    fn test_peer_from_packet() {
        let bytes = Packet::weight_update(77, &[0.3, -0.3, 0.1]).unwrap().to_bytes();
        let peer = PeerWeights::from_packet(&bytes, 0.2, 50).unwrap();
        assert_eq!(peer.seed, 77);
        assert_eq!(peer.samples, 50);
        assert_eq!(peer.weights, vec![0.2, -0.2, 0.2]);

        assert!(PeerWeights::from_packet(&bytes[..5], 0.2, 50).is_err());
    }
}
