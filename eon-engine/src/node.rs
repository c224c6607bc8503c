// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! EsnNode: one self-contained reservoir node
//!
//! A node owns its topology, state and readout and talks to peers only
//! through packet bytes. Lifecycle:
//!
//! ```text
//! Untrained ──train / import / fuse──▶ Trained ──encode / sync / fuse──▶ Trained
//! ```
//!
//! Anything rejected at the exchange boundary (seed mismatch, malformed
//! framing, wrong length) leaves the node exactly as it was.

use eon_exchange::{
    check_finite, check_seed, majority_vote, optimal_scale, sign_agreement, weighted_average,
    ExchangeError, Metadata, Packet, PacketKind, PeerWeights,
};
use eon_math::NormalEquationSolver;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ReservoirConfig;
use crate::error::{EsnError, Result};
use crate::readout::{ReadoutWeights, SharedReadout};
use crate::state::ReservoirState;
use crate::topology::Topology;
use crate::training::{ReadoutTrainer, TrainReport};

/// Whether the readout holds learned weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodePhase {
    Untrained,
    Trained,
}

/// Observable counters of a node at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeStats {
    pub seed: u32,
    pub phase: NodePhase,
    pub reservoir_size: usize,
    pub connections: usize,
    pub fingerprint: u64,
    pub training_samples: u64,
    pub samples_processed: u64,
}

/// An Echo State Network node.
#[derive(Debug)]
pub struct EsnNode {
    config: ReservoirConfig,
    topology: Topology,
    state: ReservoirState,
    trainer: ReadoutTrainer,
    readout: SharedReadout,
    phase: NodePhase,
    /// Post-washout samples behind the current readout
    training_samples: u64,
}

impl EsnNode {
    /// Validate `config` and build the reservoir it describes.
    pub fn new(config: ReservoirConfig) -> Result<Self> {
        let topology = Topology::generate(&config)?;
        let state = ReservoirState::new(config.reservoir_size, config.activation);
        let trainer = ReadoutTrainer::from_config(&config);
        let readout = SharedReadout::new(ReadoutWeights::zeros(
            config.output_dim,
            config.reservoir_size,
        ));
        debug!(
            seed = config.seed,
            units = config.reservoir_size,
            inputs = config.input_dim,
            outputs = config.output_dim,
            activation = config.activation.name(),
            "node created"
        );
        Ok(Self {
            config,
            topology,
            state,
            trainer,
            readout,
            phase: NodePhase::Untrained,
            training_samples: 0,
        })
    }

    /// Replace the normal-equation solver used by [`train`](Self::train).
    /// Output width, ridge and clamp still come from the node's config.
    pub fn with_solver(mut self, solver: impl NormalEquationSolver + 'static) -> Self {
        self.trainer = ReadoutTrainer::from_config(&self.config).with_solver(solver);
        self
    }

    /// Fusion compatibility key.
    pub fn seed(&self) -> u32 {
        self.config.seed
    }

    pub fn phase(&self) -> NodePhase {
        self.phase
    }

    pub fn is_trained(&self) -> bool {
        self.phase == NodePhase::Trained
    }

    pub fn config(&self) -> &ReservoirConfig {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn state(&self) -> &[f32] {
        self.state.values()
    }

    /// Samples behind the current readout (the fusion experience weight).
    pub fn training_samples(&self) -> u64 {
        self.training_samples
    }

    /// Reservoir updates over the node lifetime, training replays included.
    pub fn samples_processed(&self) -> u64 {
        self.state.samples_processed()
    }

    /// Handle for predicting from other threads while this node keeps
    /// training or fusing.
    pub fn readout_handle(&self) -> SharedReadout {
        self.readout.clone()
    }

    pub fn stats(&self) -> NodeStats {
        NodeStats {
            seed: self.seed(),
            phase: self.phase,
            reservoir_size: self.topology.size(),
            connections: self.topology.num_connections(),
            fingerprint: self.topology.fingerprint(),
            training_samples: self.training_samples,
            samples_processed: self.samples_processed(),
        }
    }

    // ─── Training & inference ───

    /// Fit the readout to `(inputs, targets)` after a washout of `washout`
    /// steps and report the in-sample error.
    pub fn train<I, Y>(&mut self, inputs: &[I], targets: &[Y], washout: usize) -> Result<TrainReport>
    where
        I: AsRef<[f32]>,
        Y: AsRef<[f32]>,
    {
        let (weights, report) =
            self.trainer
                .train(&self.topology, &mut self.state, inputs, targets, washout)?;
        self.readout.store(weights);
        self.phase = NodePhase::Trained;
        self.training_samples = report.samples as u64;
        info!(
            seed = self.seed(),
            mse = report.mse,
            baseline_mse = report.baseline_mse,
            samples = report.samples,
            washout,
            "node trained"
        );
        Ok(report)
    }

    /// One-step-ahead training on a scalar series: input `series[t]`,
    /// target `series[t + 1]`. Needs a 1-input, 1-output node.
    pub fn train_series(&mut self, series: &[f32], washout: usize) -> Result<TrainReport> {
        self.check_scalar()?;
        if series.len() < 2 {
            return Err(EsnError::InsufficientData {
                samples: series.len().saturating_sub(1),
                washout,
            });
        }
        let inputs: Vec<&[f32]> = series[..series.len() - 1]
            .iter()
            .map(std::slice::from_ref)
            .collect();
        let targets: Vec<&[f32]> = series[1..].iter().map(std::slice::from_ref).collect();
        self.train(&inputs, &targets, washout)
    }

    fn check_scalar(&self) -> Result<()> {
        if self.config.input_dim != 1 {
            return Err(EsnError::DimensionMismatch {
                what: "scalar series input",
                expected: 1,
                got: self.config.input_dim,
            });
        }
        if self.config.output_dim != 1 {
            return Err(EsnError::DimensionMismatch {
                what: "scalar series output",
                expected: 1,
                got: self.config.output_dim,
            });
        }
        Ok(())
    }

    /// Advance the reservoir one step.
    pub fn update(&mut self, input: &[f32]) -> Result<()> {
        if input.len() != self.config.input_dim {
            return Err(EsnError::DimensionMismatch {
                what: "input",
                expected: self.config.input_dim,
                got: input.len(),
            });
        }
        self.state.update(&self.topology, input);
        Ok(())
    }

    /// Readout applied to the current state. All zeros before training.
    pub fn predict(&self) -> Vec<f32> {
        self.readout.predict(self.state.values())
    }

    /// `update` followed by `predict`.
    pub fn step(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        self.update(input)?;
        Ok(self.predict())
    }

    /// Zero the reservoir state. Weights and counters are kept.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    // ─── Weights ───

    pub fn export_weights(&self) -> Vec<f32> {
        self.readout.load().to_vec()
    }

    /// Install externally supplied weights. The experience counter is kept.
    /// Infinities and NaNs are refused.
    pub fn import_weights(&mut self, weights: &[f32]) -> Result<()> {
        check_finite(weights).map_err(|e| self.rejected("import", e))?;
        let readout = ReadoutWeights::from_vec(
            self.config.output_dim,
            self.config.reservoir_size,
            weights.to_vec(),
        )?;
        self.readout.store(readout);
        self.phase = NodePhase::Trained;
        debug!(seed = self.seed(), weights = weights.len(), "weights imported");
        Ok(())
    }

    /// Minimal sign packet. `scale` is the reconstruction magnitude agreed
    /// with peers out of band; it is not transmitted.
    pub fn encode_weights(&self, scale: f32) -> Result<Vec<u8>> {
        let weights = self.export_weights();
        let packet = Packet::weight_update(self.seed(), &weights)?;
        debug!(
            seed = self.seed(),
            weights = weights.len(),
            scale,
            suggested_scale = optimal_scale(&weights),
            bytes = packet.encoded_len(),
            "encoded weight update"
        );
        Ok(packet.to_bytes())
    }

    /// Sign packet carrying `scale` and an opaque metadata block.
    pub fn encode_weights_extended(&self, scale: f32, metadata: Metadata) -> Result<Vec<u8>> {
        let packet = Packet::extended(self.seed(), &self.export_weights(), scale, metadata)?;
        Ok(packet.to_bytes())
    }

    /// Half-precision packet: magnitudes survive up to f16 rounding.
    pub fn encode_weights_f16(&self) -> Result<Vec<u8>> {
        let packet = Packet::half_precision(self.seed(), &self.export_weights())?;
        Ok(packet.to_bytes())
    }

    /// Parse a peer packet into a weight vector shaped like this node's
    /// readout. The node itself is not modified.
    pub fn decode_weights(&self, bytes: &[u8], scale: f32) -> Result<Vec<f32>> {
        let packet = Packet::from_bytes(bytes).map_err(|e| self.rejected("decode", e))?;
        check_seed(self.seed(), packet.seed()).map_err(|e| self.rejected("decode", e))?;
        let weights = packet.weights(scale).map_err(|e| self.rejected("decode", e))?;
        self.check_weight_len(&weights)
            .map_err(|e| self.rejected("decode", e))?;
        Ok(weights)
    }

    fn check_weight_len(&self, weights: &[f32]) -> std::result::Result<(), ExchangeError> {
        let expected = self.config.readout_len();
        if weights.len() != expected {
            return Err(ExchangeError::LengthMismatch {
                expected,
                got: weights.len(),
            });
        }
        Ok(())
    }

    fn rejected(&self, operation: &'static str, err: ExchangeError) -> EsnError {
        warn!(seed = self.seed(), operation, error = %err, "peer data rejected");
        err.into()
    }

    // ─── Fusion ───

    /// Experience-weighted merge with a peer readout.
    ///
    /// Afterwards the experience counter is `n_local + n_remote`.
    pub fn fuse_average(&mut self, peer: &PeerWeights) -> Result<()> {
        check_seed(self.seed(), peer.seed).map_err(|e| self.rejected("fuse_average", e))?;
        self.check_weight_len(&peer.weights)
            .map_err(|e| self.rejected("fuse_average", e))?;

        let local = self.export_weights();
        let merged = weighted_average(&local, self.training_samples, &peer.weights, peer.samples)
            .map_err(|e| self.rejected("fuse_average", e))?;
        let readout =
            ReadoutWeights::from_vec(self.config.output_dim, self.config.reservoir_size, merged)?;

        let total = self.training_samples.saturating_add(peer.samples);
        info!(
            seed = self.seed(),
            local_samples = self.training_samples,
            remote_samples = peer.samples,
            "fused peer readout (weighted average)"
        );
        self.readout.store(readout);
        self.training_samples = total;
        if peer.samples > 0 {
            self.phase = NodePhase::Trained;
        }
        Ok(())
    }

    /// Parse a peer packet and fuse it with [`fuse_average`](Self::fuse_average).
    pub fn fuse_average_packet(&mut self, bytes: &[u8], scale: f32, remote_samples: u64) -> Result<()> {
        let peer = PeerWeights::from_packet(bytes, scale, remote_samples)
            .map_err(|e| self.rejected("fuse_average", e))?;
        self.fuse_average(&peer)
    }

    /// Sign-majority merge of `peers`, rebuilt at `±scale`.
    ///
    /// Only the peers vote: the result equals [`majority_vote`] over their
    /// weights. To count this node, pass its own readout as a peer. Every
    /// peer must share the seed; otherwise nothing changes. The experience
    /// counter is kept.
    pub fn fuse_majority(&mut self, peers: &[PeerWeights], scale: f32) -> Result<()> {
        if peers.is_empty() {
            return Err(ExchangeError::NoPeers.into());
        }
        for peer in peers {
            check_seed(self.seed(), peer.seed).map_err(|e| self.rejected("fuse_majority", e))?;
            self.check_weight_len(&peer.weights)
                .map_err(|e| self.rejected("fuse_majority", e))?;
        }

        if !scale.is_finite() {
            let err = ExchangeError::MalformedPacket(format!("non-finite scale {}", scale));
            return Err(self.rejected("fuse_majority", err));
        }

        let voters: Vec<&[f32]> = peers.iter().map(|p| p.weights.as_slice()).collect();
        let fused = majority_vote(&voters, scale)?;
        let kept = sign_agreement(&self.export_weights(), &fused);
        let readout =
            ReadoutWeights::from_vec(self.config.output_dim, self.config.reservoir_size, fused)?;

        info!(
            seed = self.seed(),
            voters = voters.len(),
            scale,
            sign_agreement = kept,
            "fused peer readouts (majority)"
        );
        self.readout.store(readout);
        self.phase = NodePhase::Trained;
        Ok(())
    }

    // ─── Sync ───

    /// Header-only packet asking peers for their weights.
    pub fn sync_request(&self) -> Vec<u8> {
        Packet::sync_request(self.seed()).to_bytes()
    }

    /// Answer a peer's sync request with a minimal weight packet.
    pub fn answer_sync(&self, bytes: &[u8], scale: f32) -> Result<Vec<u8>> {
        let packet = Packet::from_bytes(bytes).map_err(|e| self.rejected("answer_sync", e))?;
        if packet.kind() != PacketKind::SyncRequest {
            let err = ExchangeError::MalformedPacket(format!(
                "expected a sync request, got {}",
                packet.kind()
            ));
            return Err(self.rejected("answer_sync", err));
        }
        check_seed(self.seed(), packet.seed()).map_err(|e| self.rejected("answer_sync", e))?;
        self.encode_weights(scale)
    }
}
