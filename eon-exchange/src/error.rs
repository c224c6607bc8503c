// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Error types for weight exchange

use thiserror::Error;

/// Exchange errors. Every variant is raised before any caller state changes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExchangeError {
    /// Peer reservoir was built from a different seed
    #[error("Seed mismatch: local {local:#010x}, remote {remote:#010x}")]
    SeedMismatch { local: u32, remote: u32 },

    /// Bad magic, unknown kind, wrong length or invalid field
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    /// Weight vectors of different lengths
    #[error("Length mismatch: expected {expected} weights, got {got}")]
    LengthMismatch { expected: usize, got: usize },

    /// Infinity or NaN where a readout weight is expected
    #[error("Non-finite weight at index {index}")]
    NonFiniteWeight { index: usize },

    /// The 16-bit count field cannot describe this many weights
    #[error("Too many weights for one packet: {0} (max {max})", max = u16::MAX)]
    TooManyWeights(usize),

    /// Majority vote without any voters
    #[error("No peer weights supplied")]
    NoPeers,

    /// The packet kind carries no weight payload
    #[error("Packet carries no weights")]
    NoPayload,
}

/// Result type for exchange operations
pub type Result<T> = std::result::Result<T, ExchangeError>;
