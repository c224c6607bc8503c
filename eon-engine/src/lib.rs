// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

pub mod error;
pub mod config;
pub mod topology;
pub mod state;
pub mod readout;
pub mod training;
pub mod node;

pub use config::ReservoirConfig;
pub use error::{EsnError, Result};
pub use node::{EsnNode, NodePhase, NodeStats};
pub use readout::{Readout, ReadoutWeights, SharedReadout};
pub use state::ReservoirState;
pub use topology::{Connection, Topology};
pub use training::{evaluate, validate_sequences, NormalEquations, ReadoutTrainer, TrainReport};

pub use eon_exchange::{ExchangeError, Metadata, PeerWeights};
pub use eon_math::Activation;
