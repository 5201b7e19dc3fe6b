use lin_alg::f64::Vec3;

/// A single SPH particle. Density and acceleration are recomputed every step; only position and
/// the two velocities persist between steps and in particle files.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub posit: Vec3,
    /// Half-step velocity, staggered by dt/2 for leapfrog integration.
    pub hv: Vec3,
    pub vel: Vec3,
    pub density: f64,
    pub accel: Vec3,
}

impl Particle {
    /// Density starts at zero.
    pub fn new(posit: Vec3, hv: Vec3, vel: Vec3, accel: Vec3) -> Self {
        Self {
            posit,
            hv,
            vel,
            density: 0.,
            accel,
        }
    }
}
