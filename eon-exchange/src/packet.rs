// Copyright (c) 2025-2026 brdigetrlol. All rights reserved.
// SPDX-License-Identifier: LicenseRef-Icarus-Proprietary
// See LICENSE in the repository root for full license terms.

//! Binary framing for readout weight exchange.
//!
//! Transport (MQTT, LoRa, BLE, ...) hands this module the stripped packet
//! bytes. All multi-byte fields are little-endian.
//!
//! ```text
//! offset  size  field
//! 0       3     magic "EON"
//! 3       1     kind
//! 4       4     seed (u32)
//! 8       2     weight count N (u16)
//! 10      ..    body (depends on kind)
//! ```
//!
//! | Kind | Name            | Body                                              |
//! |------|-----------------|---------------------------------------------------|
//! | 0x01 | `WeightUpdate`  | ⌈N/8⌉ sign bytes                                  |
//! | 0x02 | `Extended`      | f32 scale, 16-byte opaque metadata, ⌈N/8⌉ signs   |
//! | 0x03 | `SyncRequest`   | empty, N = 0                                      |
//! | 0x04 | `HalfPrecision` | N × f16                                           |
//!
//! Parsing is strict: the body length must match the kind and N exactly.

use byteorder::{LittleEndian, ReadBytesExt};
use std::fmt;
use std::io::Read;

use crate::codec::{decode_f16, decode_signs, encode_f16, encode_signs, packed_len};
use crate::error::{ExchangeError, Result};

/// Packet magic tag.
pub const MAGIC: [u8; 3] = *b"EON";
/// Fixed header size in bytes.
pub const HEADER_LEN: usize = 10;
/// Size of the opaque metadata block in `Extended` packets.
pub const METADATA_LEN: usize = 16;

/// Opaque application metadata (capability vectors, mood broadcasts, ...).
/// Carried through untouched.
pub type Metadata = [u8; METADATA_LEN];

/// Packet type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketKind {
    WeightUpdate = 0x01,
    Extended = 0x02,
    SyncRequest = 0x03,
    HalfPrecision = 0x04,
}

impl TryFrom<u8> for PacketKind {
    type Error = ExchangeError;

    fn try_from(byte: u8) -> Result<Self> {
        match byte {
            0x01 => Ok(Self::WeightUpdate),
            0x02 => Ok(Self::Extended),
            0x03 => Ok(Self::SyncRequest),
            0x04 => Ok(Self::HalfPrecision),
            other => Err(ExchangeError::MalformedPacket(format!(
                "unknown packet kind {:#04x}",
                other
            ))),
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WeightUpdate => write!(f, "WeightUpdate"),
            Self::Extended => write!(f, "Extended"),
            Self::SyncRequest => write!(f, "SyncRequest"),
            Self::HalfPrecision => write!(f, "HalfPrecision"),
        }
    }
}

/// A parsed or to-be-serialized exchange packet.
///
/// Built only through the constructors or [`Packet::from_bytes`], so the
/// count always matches the body and every packet serializes to bytes that
/// parse back to an equal packet.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    seed: u32,
    count: u16,
    body: Body,
}

#[derive(Debug, Clone, PartialEq)]
enum Body {
    /// Minimal sign-only update. Scale is agreed out of band.
    Signs(Vec<u8>),
    /// Sign update with an explicit scale and a pass-through metadata block.
    Extended {
        scale: f32,
        metadata: Metadata,
        signs: Vec<u8>,
    },
    /// Ask a compatible peer to send its weights.
    Sync,
    /// Higher-fidelity update, 16 bits per weight.
    Half(Vec<u8>),
}

fn checked_count(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| ExchangeError::TooManyWeights(len))
}

fn check_scale(scale: f32) -> Result<()> {
    if !scale.is_finite() {
        return Err(ExchangeError::MalformedPacket(format!(
            "non-finite scale {}",
            scale
        )));
    }
    Ok(())
}

impl Packet {
    /// Sign-quantize `weights` into a minimal packet.
    pub fn weight_update(seed: u32, weights: &[f32]) -> Result<Self> {
        let count = checked_count(weights.len())?;
        Ok(Self {
            seed,
            count,
            body: Body::Signs(encode_signs(weights)),
        })
    }

    /// Sign-quantize `weights` into an extended packet carrying `scale`.
    pub fn extended(seed: u32, weights: &[f32], scale: f32, metadata: Metadata) -> Result<Self> {
        let count = checked_count(weights.len())?;
        check_scale(scale)?;
        Ok(Self {
            seed,
            count,
            body: Body::Extended {
                scale,
                metadata,
                signs: encode_signs(weights),
            },
        })
    }

    /// Encode `weights` at half precision.
    ///
    /// Fails if a weight is non-finite or overflows binary16.
    pub fn half_precision(seed: u32, weights: &[f32]) -> Result<Self> {
        let count = checked_count(weights.len())?;
        let values = encode_f16(weights);
        decode_f16(&values)?;
        Ok(Self {
            seed,
            count,
            body: Body::Half(values),
        })
    }

    pub fn sync_request(seed: u32) -> Self {
        Self {
            seed,
            count: 0,
            body: Body::Sync,
        }
    }

    pub fn kind(&self) -> PacketKind {
        match self.body {
            Body::Signs(_) => PacketKind::WeightUpdate,
            Body::Extended { .. } => PacketKind::Extended,
            Body::Sync => PacketKind::SyncRequest,
            Body::Half(_) => PacketKind::HalfPrecision,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Number of weights carried (0 for sync requests).
    pub fn count(&self) -> usize {
        self.count as usize
    }

    /// Scale embedded in the packet, if any.
    pub fn embedded_scale(&self) -> Option<f32> {
        match self.body {
            Body::Extended { scale, .. } => Some(scale),
            _ => None,
        }
    }

    /// Metadata block, if any.
    pub fn metadata(&self) -> Option<&Metadata> {
        match &self.body {
            Body::Extended { metadata, .. } => Some(metadata),
            _ => None,
        }
    }

    /// Serialized length in bytes.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + body_len(self.kind(), self.count())
    }

    /// Rebuild the weight vector.
    ///
    /// `scale` is used for `WeightUpdate`; `Extended` uses its embedded scale
    /// and `HalfPrecision` needs none.
    pub fn weights(&self, scale: f32) -> Result<Vec<f32>> {
        let count = self.count();
        match &self.body {
            Body::Signs(signs) => decode_signs(signs, count, scale),
            Body::Extended { scale, signs, .. } => decode_signs(signs, count, *scale),
            Body::Half(values) => decode_f16(values),
            Body::Sync => Err(ExchangeError::NoPayload),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        out.extend_from_slice(&MAGIC);
        out.push(self.kind() as u8);
        out.extend_from_slice(&self.seed.to_le_bytes());
        out.extend_from_slice(&self.count.to_le_bytes());
        match &self.body {
            Body::Signs(signs) => out.extend_from_slice(signs),
            Body::Extended {
                scale,
                metadata,
                signs,
            } => {
                out.extend_from_slice(&scale.to_le_bytes());
                out.extend_from_slice(metadata);
                out.extend_from_slice(signs);
            }
            Body::Sync => {}
            Body::Half(values) => out.extend_from_slice(values),
        }
        out
    }

    /// Parse a packet. Never partially succeeds.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(ExchangeError::MalformedPacket(format!(
                "{} bytes is shorter than the {}-byte header",
                bytes.len(),
                HEADER_LEN
            )));
        }

        let mut reader = bytes;
        let mut magic = [0u8; 3];
        reader.read_exact(&mut magic).map_err(truncated)?;
        if magic != MAGIC {
            return Err(ExchangeError::MalformedPacket(format!(
                "bad magic {:02x?}",
                magic
            )));
        }
        let kind = PacketKind::try_from(reader.read_u8().map_err(truncated)?)?;
        let seed = reader.read_u32::<LittleEndian>().map_err(truncated)?;
        let count = reader.read_u16::<LittleEndian>().map_err(truncated)?;

        let expected = body_len(kind, count as usize);
        if reader.len() != expected {
            return Err(ExchangeError::MalformedPacket(format!(
                "{} packet with {} weights needs a {}-byte body, got {}",
                kind,
                count,
                expected,
                reader.len()
            )));
        }

        let body = match kind {
            PacketKind::WeightUpdate => Body::Signs(reader.to_vec()),
            PacketKind::Extended => {
                let scale = reader.read_f32::<LittleEndian>().map_err(truncated)?;
                check_scale(scale)?;
                let mut metadata = [0u8; METADATA_LEN];
                reader.read_exact(&mut metadata).map_err(truncated)?;
                Body::Extended {
                    scale,
                    metadata,
                    signs: reader.to_vec(),
                }
            }
            PacketKind::SyncRequest => {
                if count != 0 {
                    return Err(ExchangeError::MalformedPacket(format!(
                        "sync request with nonzero count {}",
                        count
                    )));
                }
                Body::Sync
            }
            PacketKind::HalfPrecision => {
                decode_f16(reader)?;
                Body::Half(reader.to_vec())
            }
        };
        Ok(Self { seed, count, body })
    }
}

/// Expected body length for a kind and weight count.
pub fn body_len(kind: PacketKind, count: usize) -> usize {
    match kind {
        PacketKind::WeightUpdate => packed_len(count),
        PacketKind::Extended => 4 + METADATA_LEN + packed_len(count),
        PacketKind::SyncRequest => 0,
        PacketKind::HalfPrecision => 2 * count,
    }
}

fn truncated(e: std::io::Error) -> ExchangeError {
    ExchangeError::MalformedPacket(format!("truncated packet: {}", e))
}
