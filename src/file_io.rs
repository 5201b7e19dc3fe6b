//! Reading and writing particle files.
//!
//! Layout, little-endian with no padding: an `f32` particles-per-meter, an `i32` particle count,
//! then one record of nine `f32`s per particle (position, half-step velocity, velocity).
//! Density and acceleration aren't stored; they're recomputed every step.

use std::{fs, path::Path};

use bincode::{
    config::{Configuration, Fixint, LittleEndian},
    Decode, Encode,
};

use lin_alg::f64::Vec3;

use crate::{error::FileError, particle::Particle};

pub const HEADER_SIZE: usize = 8;
pub const RECORD_SIZE: usize = 36;

/// Fixed-width little-endian integers; floats are always raw little-endian.
pub(crate) fn wire_config() -> Configuration<LittleEndian, Fixint> {
    bincode::config::standard().with_fixed_int_encoding()
}

#[derive(Encode, Decode)]
struct Header {
    particles_per_meter: f32,
    count: i32,
}

#[derive(Encode, Decode)]
struct ParticleRecord {
    posit: [f32; 3],
    hv: [f32; 3],
    vel: [f32; 3],
}

fn to_vec3(v: [f32; 3]) -> Vec3 {
    Vec3::new(v[0] as f64, v[1] as f64, v[2] as f64)
}

fn to_f32(v: Vec3) -> [f32; 3] {
    [v.x as f32, v.y as f32, v.z as f32]
}

impl From<ParticleRecord> for Particle {
    fn from(rec: ParticleRecord) -> Self {
        Particle::new(
            to_vec3(rec.posit),
            to_vec3(rec.hv),
            to_vec3(rec.vel),
            Vec3::new_zero(),
        )
    }
}

impl From<&Particle> for ParticleRecord {
    fn from(p: &Particle) -> Self {
        Self {
            posit: to_f32(p.posit),
            hv: to_f32(p.hv),
            vel: to_f32(p.vel),
        }
    }
}

/// The contents of a particle file, widened to `f64`.
#[derive(Clone, Debug, Default)]
pub struct ParticleFile {
    pub particles_per_meter: f64,
    pub particles: Vec<Particle>,
}

impl ParticleFile {
    pub fn load(path: &Path) -> Result<Self, FileError> {
        let bytes = fs::read(path).map_err(|source| FileError::Read {
            path: path.to_owned(),
            source,
        })?;
        Self::decode(&bytes)
    }

    pub fn save(&self, path: &Path) -> Result<(), FileError> {
        write(path, self.particles_per_meter, &self.particles)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, FileError> {
        let (header, header_len): (Header, usize) =
            bincode::decode_from_slice(bytes, wire_config())?;

        if header.count <= 0 {
            return Err(FileError::InvalidParticleCount(header.count as i64));
        }

        // A trailing partial record still counts as found.
        let body = &bytes[header_len..];
        let found = body.len().div_ceil(RECORD_SIZE);
        if found != header.count as usize {
            return Err(FileError::CountMismatch {
                declared: header.count as i64,
                found,
            });
        }
        if body.len() % RECORD_SIZE != 0 {
            return Err(FileError::TruncatedRecord { index: found - 1 });
        }

        let mut particles = Vec::with_capacity(found);
        for chunk in body.chunks_exact(RECORD_SIZE) {
            let (rec, _len): (ParticleRecord, usize) =
                bincode::decode_from_slice(chunk, wire_config())?;
            particles.push(rec.into());
        }

        Ok(Self {
            particles_per_meter: header.particles_per_meter as f64,
            particles,
        })
    }
}

/// Serialize to the particle file layout, narrowing to `f32`.
pub fn encode(particles_per_meter: f64, particles: &[Particle]) -> Result<Vec<u8>, FileError> {
    let mut result = Vec::with_capacity(HEADER_SIZE + particles.len() * RECORD_SIZE);

    let header = Header {
        particles_per_meter: particles_per_meter as f32,
        count: particles.len() as i32,
    };
    bincode::encode_into_std_write(header, &mut result, wire_config())?;

    for p in particles {
        bincode::encode_into_std_write(ParticleRecord::from(p), &mut result, wire_config())?;
    }

    Ok(result)
}

pub fn write(path: &Path, particles_per_meter: f64, particles: &[Particle]) -> Result<(), FileError> {
    let bytes = encode(particles_per_meter, particles)?;
    fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(ppm: f32, count: i32) -> Vec<u8> {
        let mut result = ppm.to_le_bytes().to_vec();
        result.extend_from_slice(&count.to_le_bytes());
        result
    }

    #[test]
    fn layout_is_packed_little_endian() {
        let p = Particle::new(
            Vec3::new(1., 2., 3.),
            Vec3::new(4., 5., 6.),
            Vec3::new(7., 8., 9.),
            Vec3::new_zero(),
        );
        let bytes = encode(1., &[p]).unwrap();

        assert_eq!(bytes.len(), HEADER_SIZE + RECORD_SIZE);
        assert_eq!(&bytes[..HEADER_SIZE], &header_bytes(1., 1)[..]);
        for (i, val) in (1..=9).enumerate() {
            let start = HEADER_SIZE + i * 4;
            assert_eq!(&bytes[start..start + 4], &(val as f32).to_le_bytes());
        }
    }

    #[test]
    fn decode_widens_to_f64() {
        let mut bytes = header_bytes(204.0, 1);
        for val in [0.1f32, -0.2, 0.3, 0., 0., 0., 1.5, 2.5, 3.5] {
            bytes.extend_from_slice(&val.to_le_bytes());
        }
        let file = ParticleFile::decode(&bytes).unwrap();

        assert_eq!(file.particles_per_meter, 204.0);
        assert_eq!(file.particles.len(), 1);
        assert_eq!(file.particles[0].posit.x, 0.1f32 as f64);
        assert_eq!(file.particles[0].vel, Vec3::new(1.5, 2.5, 3.5));
    }

    #[test]
    fn unreadable_input_is_a_read_error() {
        let dir = std::env::temp_dir();
        let err = ParticleFile::load(&dir).unwrap_err();
        assert!(matches!(err, FileError::Read { .. }));
        assert_eq!(err.exit_code(), -3);

        let missing = dir.join(format!("sph_missing_{}.fld", std::process::id()));
        let err = ParticleFile::load(&missing).unwrap_err();
        assert!(matches!(err, FileError::Read { .. }));
        assert_eq!(err.to_string(), format!("Cannot open {} for reading.", missing.display()));
    }

    #[test]
    fn zero_count_is_rejected() {
        let err = ParticleFile::decode(&header_bytes(1., 0)).unwrap_err();
        assert!(matches!(err, FileError::InvalidParticleCount(0)));
        assert_eq!(err.to_string(), "Invalid number of particles: 0");
    }

    #[test]
    fn negative_count_is_rejected() {
        let err = ParticleFile::decode(&header_bytes(1., -3)).unwrap_err();
        assert!(matches!(err, FileError::InvalidParticleCount(-3)));
    }

    #[test]
    fn missing_records_are_a_mismatch() {
        let err = ParticleFile::decode(&header_bytes(1., 2)).unwrap_err();
        assert!(matches!(
            err,
            FileError::CountMismatch {
                declared: 2,
                found: 0
            }
        ));
        assert_eq!(
            err.to_string(),
            "Number of particles mismatch. Header: 2, Found: 0"
        );
    }

    #[test]
    fn extra_records_are_a_mismatch() {
        let mut bytes = header_bytes(1., 1);
        bytes.extend(std::iter::repeat(0u8).take(RECORD_SIZE * 2));
        let err = ParticleFile::decode(&bytes).unwrap_err();
        assert!(matches!(err, FileError::CountMismatch { declared: 1, found: 2 }));
    }

    #[test]
    fn partial_record_counts_but_fails() {
        let mut bytes = header_bytes(1., 2);
        bytes.extend(std::iter::repeat(0u8).take(RECORD_SIZE + 4));
        let err = ParticleFile::decode(&bytes).unwrap_err();
        assert!(matches!(err, FileError::TruncatedRecord { index: 1 }));
    }

    #[test]
    fn short_header_fails() {
        assert!(matches!(
            ParticleFile::decode(&[0, 0, 128]).unwrap_err(),
            FileError::Decode(_)
        ));
    }
}
