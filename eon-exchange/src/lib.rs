// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Readout weight exchange for EON nodes: 1-bit codec, packet framing and
//! fusion. Knows nothing about reservoirs beyond the seed.

pub mod error;
pub mod codec;
pub mod packet;
pub mod fusion;

pub use codec::{
    decode_f16, decode_signs, encode_f16, encode_signs, optimal_scale, packed_len, sign_agreement,
};
pub use error::{ExchangeError, Result};
pub use fusion::{check_finite, check_seed, majority_vote, weighted_average, PeerWeights};
pub use packet::{Metadata, Packet, PacketKind, HEADER_LEN, MAGIC, METADATA_LEN};
