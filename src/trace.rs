//! Debug snapshots of the grid part-way through a step, used to check each phase in isolation.
//!
//! Layout, little-endian: an `i32` block count, then per block an `i64` particle count followed by
//! that many records. A record is an `i64` particle id and 13 `f64`s: position, half-step velocity,
//! velocity, density, acceleration.

use std::{fs, path::Path};

use bincode::{Decode, Encode};

use lin_alg::f64::Vec3;

use crate::{error::FileError, file_io::wire_config, particle::Particle};

#[derive(Clone, Debug, PartialEq, Encode, Decode)]
pub struct TraceRecord {
    pub id: i64,
    pub posit: Vec3,
    pub hv: Vec3,
    pub vel: Vec3,
    pub density: f64,
    pub accel: Vec3,
}

impl TraceRecord {
    pub fn new(id: usize, p: &Particle) -> Self {
        Self {
            id: id as i64,
            posit: p.posit,
            hv: p.hv,
            vel: p.vel,
            density: p.density,
            accel: p.accel,
        }
    }

    pub fn to_particle(&self) -> Particle {
        Particle {
            posit: self.posit,
            hv: self.hv,
            vel: self.vel,
            density: self.density,
            accel: self.accel,
        }
    }
}

/// Encoded size of a block's particle count.
const COUNT_SIZE: usize = 8;
/// Encoded size of a `TraceRecord`.
pub const RECORD_SIZE: usize = 8 + 13 * 8;

/// With fixed-width ints, the `Vec` length prefix is the `i64` particle count.
#[derive(Clone, Debug, Default, PartialEq, Encode)]
pub struct TraceBlock {
    pub particles: Vec<TraceRecord>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trace {
    pub blocks: Vec<TraceBlock>,
}

impl Trace {
    pub fn num_particles(&self) -> usize {
        self.blocks.iter().map(|b| b.particles.len()).sum()
    }

    /// All records, ordered by particle id.
    pub fn records_by_id(&self) -> Vec<&TraceRecord> {
        let mut result: Vec<_> = self.blocks.iter().flat_map(|b| &b.particles).collect();
        result.sort_by_key(|r| r.id);
        result
    }

    pub fn encode(&self) -> Result<Vec<u8>, FileError> {
        let mut result = Vec::new();
        bincode::encode_into_std_write(self.blocks.len() as i32, &mut result, wire_config())?;
        for block in &self.blocks {
            bincode::encode_into_std_write(block, &mut result, wire_config())?;
        }
        Ok(result)
    }

    /// Counts are checked against the bytes remaining before anything is allocated.
    pub fn decode(bytes: &[u8]) -> Result<Self, FileError> {
        let (num_blocks, mut offset): (i32, usize) =
            bincode::decode_from_slice(bytes, wire_config())?;
        if num_blocks < 0 || num_blocks as usize > (bytes.len() - offset) / COUNT_SIZE {
            return Err(FileError::InvalidBlockCount(num_blocks));
        }

        let mut blocks = Vec::with_capacity(num_blocks as usize);
        for _ in 0..num_blocks {
            let (count, len): (i64, usize) =
                bincode::decode_from_slice(&bytes[offset..], wire_config())?;
            offset += len;

            let available = (bytes.len() - offset) / RECORD_SIZE;
            if count < 0 || count as u64 > available as u64 {
                return Err(FileError::InvalidTraceCount(count));
            }

            let mut particles = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let (rec, len): (TraceRecord, usize) =
                    bincode::decode_from_slice(&bytes[offset..], wire_config())?;
                offset += len;
                particles.push(rec);
            }
            blocks.push(TraceBlock { particles });
        }

        Ok(Self { blocks })
    }

    pub fn load(path: &Path) -> Result<Self, FileError> {
        let bytes = fs::read(path).map_err(|source| FileError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::decode(&bytes)
    }

    pub fn save(&self, path: &Path) -> Result<(), FileError> {
        fs::write(path, self.encode()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64) -> TraceRecord {
        TraceRecord {
            id,
            posit: Vec3::new(0.01, -0.02, 0.03),
            hv: Vec3::new(0.1, 0.2, 0.3),
            vel: Vec3::new(-1., -2., -3.),
            density: 998.5,
            accel: Vec3::new(0., -9.8, 0.),
        }
    }

    #[test]
    fn byte_layout() {
        let trace = Trace {
            blocks: vec![
                TraceBlock {
                    particles: vec![record(7)],
                },
                TraceBlock::default(),
            ],
        };
        let bytes = trace.encode().unwrap();

        // Block count, then (count, id, 13 f64s), then an empty block.
        assert_eq!(bytes.len(), 4 + (8 + 8 + 13 * 8) + 8);
        assert_eq!(&bytes[0..4], &2i32.to_le_bytes());
        assert_eq!(&bytes[4..12], &1i64.to_le_bytes());
        assert_eq!(&bytes[12..20], &7i64.to_le_bytes());
        assert_eq!(&bytes[20..28], &0.01f64.to_le_bytes());
        assert_eq!(&bytes[92..100], &998.5f64.to_le_bytes());
        assert_eq!(&bytes[bytes.len() - 8..], &0i64.to_le_bytes());

        assert_eq!(Trace::decode(&bytes).unwrap(), trace);
    }

    #[test]
    fn records_sorted_across_blocks() {
        let trace = Trace {
            blocks: vec![
                TraceBlock {
                    particles: vec![record(4), record(1)],
                },
                TraceBlock {
                    particles: vec![record(3), record(0)],
                },
            ],
        };
        let ids: Vec<i64> = trace.records_by_id().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 1, 3, 4]);
    }

    #[test]
    fn negative_block_count() {
        let bytes = (-1i32).to_le_bytes();
        assert!(matches!(
            Trace::decode(&bytes).unwrap_err(),
            FileError::InvalidBlockCount(-1)
        ));
    }

    #[test]
    fn truncated_block() {
        let mut bytes = 1i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&3i64.to_le_bytes());
        assert!(matches!(
            Trace::decode(&bytes).unwrap_err(),
            FileError::InvalidTraceCount(3)
        ));
    }

    #[test]
    fn oversized_counts_are_errors() {
        let mut bytes = 1i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&i64::MAX.to_le_bytes());
        let err = Trace::decode(&bytes).unwrap_err();
        assert!(matches!(err, FileError::InvalidTraceCount(i64::MAX)));
        assert_eq!(err.exit_code(), -5);

        let mut bytes = i32::MAX.to_le_bytes().to_vec();
        bytes.extend_from_slice(&0i64.to_le_bytes());
        assert!(matches!(
            Trace::decode(&bytes).unwrap_err(),
            FileError::InvalidBlockCount(i32::MAX)
        ));

        let mut bytes = 1i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&(-2i64).to_le_bytes());
        assert!(matches!(
            Trace::decode(&bytes).unwrap_err(),
            FileError::InvalidTraceCount(-2)
        ));
    }

    #[test]
    fn record_size_matches_encoding() {
        let bytes = bincode::encode_to_vec(record(0), wire_config()).unwrap();
        assert_eq!(bytes.len(), RECORD_SIZE);
    }
}
