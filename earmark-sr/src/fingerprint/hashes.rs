//! Combinatorial landmark hashing
//!
//! Pairs each anchor peak with up to `fan_out` later peaks inside the
//! target zone and hashes the `(f_anchor, f_partner, dt)` triple. The hash
//! is the first 10 bytes (80 bits) of the SHA-1 of the ASCII-decimal
//! canonical form `"f1|f2|dt"`; it is rendered as 20 hex characters only at
//! the storage boundary. The canonical form and digest are part of the
//! catalog's on-disk contract.

use earmark_common::params::AnalysisParams;
use sha1::{Digest, Sha1};
use std::fmt;

use super::Peak;

/// 80-bit landmark hash, stored as raw bytes in memory.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FingerprintHash(pub [u8; 10]);

impl FingerprintHash {
    /// Hash the canonical triple of an anchor/partner pair.
    pub fn from_triple(f_anchor: u32, f_partner: u32, dt: u32) -> Self {
        let canonical = format!("{}|{}|{}", f_anchor, f_partner, dt);
        let digest = Sha1::digest(canonical.as_bytes());
        let mut bytes = [0u8; 10];
        bytes.copy_from_slice(&digest[..10]);
        Self(bytes)
    }

    /// Render as the 20-character lowercase hex form used in the catalog.
    pub fn to_hex(self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse the 20-character hex form back into raw bytes.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 20 {
            return None;
        }
        let mut bytes = [0u8; 10];
        for (i, chunk) in s.as_bytes().chunks_exact(2).enumerate() {
            let hi = (chunk[0] as char).to_digit(16)?;
            let lo = (chunk[1] as char).to_digit(16)?;
            bytes[i] = (hi * 16 + lo) as u8;
        }
        Some(Self(bytes))
    }
}

impl fmt::Display for FingerprintHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for FingerprintHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FingerprintHash({})", self.to_hex())
    }
}

/// One landmark: a pair hash and the anchor's time bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub hash: FingerprintHash,
    pub anchor_time: u32,
}

/// Pair peaks into landmarks.
///
/// `peaks` must be sorted by time then frequency (the peak picker's output
/// order); partners are then visited in ascending `t_p`, then `f_p`, which
/// makes the fan-out cut deterministic.
pub fn create_hashes(peaks: &[Peak], params: &AnalysisParams) -> Vec<Fingerprint> {
    let mut fingerprints = Vec::new();

    for (i, anchor) in peaks.iter().enumerate() {
        let mut paired = 0usize;
        for partner in &peaks[i + 1..] {
            if paired >= params.fan_out {
                break;
            }
            let dt = partner.time - anchor.time;
            if dt < params.min_dt {
                continue;
            }
            if dt > params.max_dt {
                // peaks are time-sorted, nothing closer follows
                break;
            }
            let df = partner.freq.abs_diff(anchor.freq);
            if df > params.max_df {
                continue;
            }

            fingerprints.push(Fingerprint {
                hash: FingerprintHash::from_triple(anchor.freq, partner.freq, dt),
                anchor_time: anchor.time,
            });
            paired += 1;
        }
    }

    fingerprints
}
