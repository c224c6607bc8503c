// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Runtime configuration for an EON reservoir node
//!
//! A config fully determines the reservoir topology: two nodes with equal
//! configs (in particular equal seeds) build bit-identical reservoirs and can
//! fuse their readouts.

use std::path::Path;

use anyhow::Context;
use eon_math::Activation;
use serde::{Deserialize, Serialize};

use crate::error::{EsnError, Result};

fn default_weight_clamp() -> f32 {
    2.0
}

/// Configuration of one Echo State Network node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservoirConfig {
    /// Input vector width
    pub input_dim: usize,
    /// Number of reservoir units
    pub reservoir_size: usize,
    /// Output vector width
    pub output_dim: usize,
    /// Target spectral radius of the recurrent matrix (heuristic scaling)
    pub spectral_radius: f32,
    /// Fraction of the reservoir² possible connections that exist, in (0, 1]
    pub density: f32,
    /// Ridge regularization added to the Gram diagonal (λ)
    pub regularization: f32,
    /// Topology seed; the fusion compatibility key
    pub seed: u32,
    /// Reservoir nonlinearity
    #[serde(default)]
    pub activation: Activation,
    /// Trained weights are clamped to `[-weight_clamp, weight_clamp]`
    #[serde(default = "default_weight_clamp")]
    pub weight_clamp: f32,
}

impl ReservoirConfig {
    /// Config with the given dimensions and default hyperparameters:
    /// spectral radius 0.9, density 0.2, λ = 1e-4, seed 42, tanh, clamp 2.0.
    pub fn new(input_dim: usize, reservoir_size: usize, output_dim: usize) -> Self {
        Self {
            input_dim,
            reservoir_size,
            output_dim,
            spectral_radius: 0.9,
            density: 0.2,
            regularization: 1e-4,
            seed: 42,
            activation: Activation::Tanh,
            weight_clamp: default_weight_clamp(),
        }
    }

    /// Small single-channel predictor: 20 units, 1 input, 1 output.
    ///
    /// Suitable for one-step-ahead prediction of a slow scalar signal on a
    /// microcontroller-class node.
    pub fn sine_demo() -> Self {
        Self::new(1, 20, 1)
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_spectral_radius(mut self, spectral_radius: f32) -> Self {
        self.spectral_radius = spectral_radius;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn with_regularization(mut self, regularization: f32) -> Self {
        self.regularization = regularization;
        self
    }

    pub fn with_activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_weight_clamp(mut self, weight_clamp: f32) -> Self {
        self.weight_clamp = weight_clamp;
        self
    }

    /// Number of readout weights (`output_dim × reservoir_size`).
    pub fn readout_len(&self) -> usize {
        self.output_dim * self.reservoir_size
    }

    /// Number of recurrent connections: `round(reservoir² × density)`,
    /// clamped to `[1, reservoir²]`.
    pub fn target_connections(&self) -> usize {
        let full = self.reservoir_size * self.reservoir_size;
        let k = (full as f64 * self.density as f64).round() as usize;
        k.clamp(1, full.max(1))
    }

    /// Check every construction invariant.
    pub fn validate(&self) -> Result<()> {
        if self.input_dim == 0 {
            return Err(EsnError::Config("input_dim must be > 0".into()));
        }
        if self.reservoir_size == 0 {
            return Err(EsnError::Config("reservoir_size must be > 0".into()));
        }
        if self.output_dim == 0 {
            return Err(EsnError::Config("output_dim must be > 0".into()));
        }
        if !(self.density > 0.0 && self.density <= 1.0) {
            return Err(EsnError::Config(format!(
                "density must be in (0, 1], got {}",
                self.density
            )));
        }
        if !(self.spectral_radius > 0.0 && self.spectral_radius.is_finite()) {
            return Err(EsnError::Config(format!(
                "spectral_radius must be finite and > 0, got {}",
                self.spectral_radius
            )));
        }
        if !(self.regularization >= 0.0 && self.regularization.is_finite()) {
            return Err(EsnError::Config(format!(
                "regularization must be finite and >= 0, got {}",
                self.regularization
            )));
        }
        if !(self.weight_clamp > 0.0) {
            return Err(EsnError::Config(format!(
                "weight_clamp must be > 0, got {}",
                self.weight_clamp
            )));
        }
        if self.readout_len() > u16::MAX as usize {
            return Err(EsnError::Config(format!(
                "{} readout weights exceed the {}-weight packet limit",
                self.readout_len(),
                u16::MAX
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EsnError::Config(format!("invalid config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| EsnError::Config(format!("config serialization failed: {}", e)))
    }

    /// Load and validate a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading reservoir config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing reservoir config {}", path.display()))
    }
}

impl Default for ReservoirConfig {
    fn default() -> Self {
        Self::sine_demo()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sine_demo_config() {
        let config = ReservoirConfig::sine_demo();
        assert_eq!(config.reservoir_size, 20);
        assert_eq!(config.input_dim, 1);
        assert_eq!(config.output_dim, 1);
        assert_eq!(config.seed, 42);
        assert!((config.spectral_radius - 0.9).abs() < 1e-6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_target_connections() {
        let config = ReservoirConfig::new(1, 20, 1);
        assert_eq!(config.target_connections(), 80);
        assert_eq!(config.clone().with_density(1.0).target_connections(), 400);
        // Never zero, even for a vanishing density
        assert_eq!(config.with_density(1e-9).target_connections(), 1);
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        for config in [
            ReservoirConfig::new(0, 10, 1),
            ReservoirConfig::new(1, 0, 1),
            ReservoirConfig::new(1, 10, 0),
        ] {
            assert!(matches!(config.validate(), Err(EsnError::Config(_))));
        }
    }

    #[test]
    fn test_rejects_bad_rates() {
        let base = ReservoirConfig::sine_demo();
        assert!(base.clone().with_density(0.0).validate().is_err());
        assert!(base.clone().with_density(1.5).validate().is_err());
        assert!(base.clone().with_density(f32::NAN).validate().is_err());
        assert!(base.clone().with_spectral_radius(0.0).validate().is_err());
        assert!(base.clone().with_spectral_radius(f32::INFINITY).validate().is_err());
        assert!(base.clone().with_regularization(-1.0).validate().is_err());
        assert!(base.clone().with_weight_clamp(0.0).validate().is_err());
        assert!(base.with_density(1.0).validate().is_ok());
    }

    #[test]
    fn test_rejects_oversized_readout() {
        let config = ReservoirConfig::new(1, 300, 300);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("packet limit"), "unexpected: {}", err);
    }

    #[test]
    fn test_config_serialization() {
        let config = ReservoirConfig::sine_demo()
            .with_seed(7)
            .with_activation(Activation::FastTanh);
        let json = config.to_json().unwrap();
        let restored = ReservoirConfig::from_json(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_optional_fields_default() {
        let json = r#"{
            "input_dim": 2, "reservoir_size": 30, "output_dim": 1,
            "spectral_radius": 0.8, "density": 0.1, "regularization": 0.001, "seed": 5
        }"#;
        let config = ReservoirConfig::from_json(json).unwrap();
        assert_eq!(config.activation, Activation::Tanh);
        assert_eq!(config.weight_clamp, 2.0);
    }

    #[test]
    fn test_from_json_validates() {
        let json = r#"{
            "input_dim": 1, "reservoir_size": 0, "output_dim": 1,
            "spectral_radius": 0.9, "density": 0.2, "regularization": 0.0001, "seed": 42
        }"#;
        assert!(matches!(ReservoirConfig::from_json(json), Err(EsnError::Config(_))));
        assert!(ReservoirConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_load_missing_file_has_context() {
        let err = ReservoirConfig::load("/nonexistent/eon/reservoir.json").unwrap_err();
        assert!(format!("{:#}", err).contains("reading reservoir config"));
    }
}
