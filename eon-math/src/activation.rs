// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Saturating reservoir nonlinearities.

use serde::{Deserialize, Serialize};

/// Bound beyond which [`fast_tanh`] saturates to exactly ±1.
pub const FAST_TANH_LIMIT: f32 = 3.0;

/// Reservoir activation function. Both variants are odd and bounded to `[-1, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// `f32::tanh`
    Tanh,
    /// Rational Padé approximation, see [`fast_tanh`].
    FastTanh,
}

impl Default for Activation {
    fn default() -> Self {
        Self::Tanh
    }
}

impl Activation {
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Self::Tanh => x.tanh(),
            Self::FastTanh => fast_tanh(x),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Tanh => "tanh",
            Self::FastTanh => "fast_tanh",
        }
    }
}

/// Padé(3,2) tanh: `x·(27 + x²) / (27 + 9x²)`, clamped to ±1 for `|x| ≥ 3`.
///
/// The rational form reaches exactly 1 with zero slope at `x = 3`, so the
/// clamp is continuous. Max absolute error against `tanh` is about 0.025.
/// Sign is preserved everywhere, and NaN propagates.
#[inline]
pub fn fast_tanh(x: f32) -> f32 {
    if x >= FAST_TANH_LIMIT {
        1.0
    } else if x <= -FAST_TANH_LIMIT {
        -1.0
    } else {
        let x2 = x * x;
        x * (27.0 + x2) / (27.0 + 9.0 * x2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fast_tanh_close_to_tanh() {
        let mut max_err = 0.0f32;
        for i in -600..=600 {
            let x = i as f32 * 0.01;
            max_err = max_err.max((fast_tanh(x) - x.tanh()).abs());
        }
        assert!(max_err < 0.03, "fast_tanh max error {} too large", max_err);
    }

    #[test]
    fn test_fast_tanh_saturates() {
        assert_eq!(fast_tanh(3.0), 1.0);
        assert_eq!(fast_tanh(50.0), 1.0);
        assert_eq!(fast_tanh(-3.0), -1.0);
        assert_eq!(fast_tanh(f32::NEG_INFINITY), -1.0);
    }

    #[test]
    fn test_fast_tanh_sign_near_zero() {
        assert_eq!(fast_tanh(0.0), 0.0);
        assert!(fast_tanh(1e-6) > 0.0);
        assert!(fast_tanh(-1e-6) < 0.0);
    }

    #[test]
    fn test_fast_tanh_bounded_and_monotone() {
        let mut prev = -1.0f32;
        for i in -400..=400 {
            let y = fast_tanh(i as f32 * 0.01);
            assert!((-1.0..=1.0).contains(&y));
            assert!(y >= prev - 1e-6, "fast_tanh not monotone near {}", i as f32 * 0.01);
            prev = y;
        }
    }

    #[test]
    fn test_activation_dispatch() {
        assert_eq!(Activation::Tanh.apply(0.5), 0.5f32.tanh());
        assert_eq!(Activation::FastTanh.apply(0.5), fast_tanh(0.5));
        assert_eq!(Activation::default(), Activation::Tanh);
    }
}
