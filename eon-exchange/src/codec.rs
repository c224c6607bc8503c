// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Readout weight codecs.
//!
//! ## Codecs
//!
//! | Codec          | Bits/Weight | Keeps                | Used by                         |
//! |----------------|-------------|----------------------|---------------------------------|
//! | Sign (1-bit)   | 1           | sign only            | `WeightUpdate`, `Extended`      |
//! | Half precision | 16          | ~3 significant digits | `HalfPrecision`                |
//!
//! The sign code throws away every magnitude: decoding rebuilds `±scale`.
//! On small ESN readouts this typically costs 15–25% extra prediction error
//! versus full-precision weights. That figure is empirical, not a bound.
//!
//! Bit layout: weight `i` lives in byte `i / 8`, bit `i % 8` (LSB first).
//! A set bit means `weight >= 0`.

use half::f16;

use crate::error::{ExchangeError, Result};

// ---------------------------------------------------------------------------
// Section 1: Sign quantization
// ---------------------------------------------------------------------------

/// Number of bytes needed to hold `count` sign bits.
#[inline]
pub fn packed_len(count: usize) -> usize {
    (count + 7) / 8
}

/// Pack one sign bit per weight, LSB-first, ascending index.
///
/// `-0.0` counts as non-negative. NaN counts as negative.
pub fn encode_signs(weights: &[f32]) -> Vec<u8> {
    let mut packed = vec![0u8; packed_len(weights.len())];
    for (i, &w) in weights.iter().enumerate() {
        if w >= 0.0 {
            packed[i / 8] |= 1 << (i % 8);
        }
    }
    packed
}

/// Rebuild `count` weights as `+scale` (bit set) or `-scale` (bit clear).
///
/// Bits past `count` in the last byte are ignored.
pub fn decode_signs(packed: &[u8], count: usize, scale: f32) -> Result<Vec<f32>> {
    let needed = packed_len(count);
    if packed.len() < needed {
        return Err(ExchangeError::MalformedPacket(format!(
            "{} sign bytes cannot hold {} weights (need {})",
            packed.len(),
            count,
            needed
        )));
    }
    Ok((0..count)
        .map(|i| {
            if packed[i / 8] & (1 << (i % 8)) != 0 {
                scale
            } else {
                -scale
            }
        })
        .collect())
}

/// Scale that minimizes `Σ (w - s·sign(w))²` for a sign-only code: mean |w|.
///
/// Returns 0.0 for an empty slice.
pub fn optimal_scale(weights: &[f32]) -> f32 {
    if weights.is_empty() {
        return 0.0;
    }
    // f64 accumulation for precision
    let sum: f64 = weights.iter().map(|&w| w.abs() as f64).sum();
    (sum / weights.len() as f64) as f32
}

/// Fraction of indices where two vectors agree in sign (`>= 0` vs `< 0`).
///
/// Returns 1.0 for empty input.
pub fn sign_agreement(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len().min(b.len());
    if n == 0 {
        return 1.0;
    }
    let agree = a
        .iter()
        .zip(b.iter())
        .filter(|&(&x, &y)| (x >= 0.0) == (y >= 0.0))
        .count();
    agree as f32 / n as f32
}

// ---------------------------------------------------------------------------
// Section 2: Half precision
// ---------------------------------------------------------------------------

/// Encode weights as little-endian IEEE 754 binary16 (2 bytes each).
///
/// Round-to-nearest. For readout weights clamped to [-2, 2] the round-trip
/// error is below 1e-3.
pub fn encode_f16(weights: &[f32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(weights.len() * 2);
    for &w in weights {
        out.extend_from_slice(&f16::from_f32(w).to_le_bytes());
    }
    out
}

/// Decode little-endian binary16 weights.
///
/// Infinities and NaNs are rejected: a readout weight is always finite.
pub fn decode_f16(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 2 != 0 {
        return Err(ExchangeError::MalformedPacket(format!(
            "half-precision payload has odd length {}",
            bytes.len()
        )));
    }
    bytes
        .chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| {
            let value = f16::from_le_bytes([pair[0], pair[1]]);
            if value.is_finite() {
                Ok(value.to_f32())
            } else {
                Err(ExchangeError::MalformedPacket(format!(
                    "non-finite half-precision weight at index {}",
                    i
                )))
            }
        })
        .collect()
}

// ===========================================================================
// Tests
// ===========================================================================
