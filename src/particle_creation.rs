//! Creates initial particle distributions, e.g. a resting block of fluid for a dam-break.

use rand::Rng;

use lin_alg::f64::Vec3;

use crate::{file_io::ParticleFile, particle::Particle};

/// Fill the box `[min, max)` with particles on a cubic lattice of spacing `1 / particles_per_meter`,
/// starting half a spacing in from `min`. `jitter` displaces each coordinate by up to that
/// fraction of the spacing, so pair distances aren't all identical. Particles start at rest.
pub fn make_block<R: Rng>(
    min: Vec3,
    max: Vec3,
    particles_per_meter: f64,
    jitter: f64,
    rng: &mut R,
) -> Vec<Particle> {
    let spacing = 1. / particles_per_meter;
    let counts = [
        ((max.x - min.x) / spacing).floor().max(0.) as usize,
        ((max.y - min.y) / spacing).floor().max(0.) as usize,
        ((max.z - min.z) / spacing).floor().max(0.) as usize,
    ];

    let mut result = Vec::with_capacity(counts.iter().product());

    for k in 0..counts[2] {
        for j in 0..counts[1] {
            for i in 0..counts[0] {
                let mut posit = min
                    + Vec3::new(i as f64 + 0.5, j as f64 + 0.5, k as f64 + 0.5) * spacing;

                if jitter > 0. {
                    posit.x += rng.random_range(-jitter..jitter) * spacing;
                    posit.y += rng.random_range(-jitter..jitter) * spacing;
                    posit.z += rng.random_range(-jitter..jitter) * spacing;
                }

                result.push(Particle::new(
                    posit,
                    Vec3::new_zero(),
                    Vec3::new_zero(),
                    Vec3::new_zero(),
                ));
            }
        }
    }

    result
}

/// A block of fluid, packaged as if loaded from a particle file.
pub fn make_file<R: Rng>(
    min: Vec3,
    max: Vec3,
    particles_per_meter: f64,
    jitter: f64,
    rng: &mut R,
) -> ParticleFile {
    ParticleFile {
        particles_per_meter,
        particles: make_block(min, max, particles_per_meter, jitter, rng),
    }
}
