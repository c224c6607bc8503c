// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Error types for the ESN engine

use eon_exchange::ExchangeError;
use thiserror::Error;

/// Engine errors.
///
/// Numeric degeneracy during training is deliberately absent: the solver
/// absorbs it and it only shows up as a worse reported MSE.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EsnError {
    /// Invalid dimensions or rates at construction
    #[error("Configuration error: {0}")]
    Config(String),

    /// Training sequence not longer than the washout
    #[error("Insufficient data: {samples} samples cannot cover a washout of {washout}")]
    InsufficientData { samples: usize, washout: usize },

    /// Input, target or weight vector of the wrong size
    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// Packet, codec or fusion failure at the exchange boundary
    #[error(transparent)]
    Exchange(#[from] ExchangeError),
}

impl EsnError {
    /// True for failures caused by a peer built from another seed.
    pub fn is_seed_mismatch(&self) -> bool {
        matches!(self, Self::Exchange(ExchangeError::SeedMismatch { .. }))
    }

    /// True for framing failures (bad magic, truncation, unknown kind).
    pub fn is_malformed_packet(&self) -> bool {
        matches!(self, Self::Exchange(ExchangeError::MalformedPacket(_)))
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EsnError>;
