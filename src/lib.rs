//! Smoothed-particle hydrodynamics on a fixed block lattice, inside a rectangular box.

pub mod args;
pub mod block;
pub mod config;
pub mod error;
pub mod file_io;
pub mod grid;
pub mod particle;
pub mod particle_creation;
pub mod trace;

pub use block::Block;
pub use config::{KernelConsts, SimConfig};
pub use error::{ArgError, ConfigError, FileError};
pub use file_io::ParticleFile;
pub use grid::{Grid, Phase};
pub use lin_alg::f64::Vec3;
pub use particle::Particle;
pub use trace::Trace;
