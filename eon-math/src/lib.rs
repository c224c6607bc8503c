// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

pub mod rng;
pub mod activation;
pub mod linalg;

pub use activation::{fast_tanh, Activation};
pub use linalg::{
    invert_gauss_jordan, CholeskySolver, DenseMatrix, GaussJordanSolver, NormalEquationSolver,
    PIVOT_FLOOR,
};
pub use rng::Lcg64;
