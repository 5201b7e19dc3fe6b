//! Physical and domain constants for a run, and the grid-level constants derived from them.

use std::{f64::consts::PI, fs, path::Path};

use bincode::{Decode, Encode};

use lin_alg::f64::Vec3;

use crate::error::ConfigError;

/// Loaded from the working directory by the driver, if present.
pub const SAVE_FILE: &str = "sim_config.sph";

#[derive(Clone, Debug, PartialEq, Encode, Decode)]
pub struct SimConfig {
    /// Smoothing length, in particle spacings.
    pub radius_multiplier: f64,
    /// Rest density. kg/m^3
    pub fluid_density: f64,
    pub pressure_stiffness: f64,
    /// Wall penalty stiffness.
    pub collision_stiffness: f64,
    /// Wall penalty damping.
    pub damping: f64,
    pub viscosity: f64,
    /// Particle radius, used for wall penetration. m
    pub particle_size: f64,
    /// Unit: s. Fixed.
    pub dt: f64,
    /// Pair separations are floored to this before dividing.
    pub min_separation: f64,
    /// Wall penetration below this is ignored.
    pub collision_tolerance: f64,
    /// Typically gravity.
    pub external_accel: Vec3,
    /// Lower corner of the domain box.
    pub bmin: Vec3,
    /// Upper corner of the domain box.
    pub bmax: Vec3,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            radius_multiplier: 1.695,
            fluid_density: 1e3,
            pressure_stiffness: 3.0,
            collision_stiffness: 3e4,
            damping: 128.0,
            viscosity: 0.4,
            particle_size: 2e-4,
            dt: 1e-3,
            min_separation: 1e-6,
            collision_tolerance: 1e-10,
            external_accel: Vec3::new(0.0, -9.8, 0.0),
            bmin: Vec3::new(-0.065, -0.08, -0.065),
            bmax: Vec3::new(0.065, 0.1, 0.065),
        }
    }
}

impl SimConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = fs::read(path)?;
        let (cfg, _len) = bincode::decode_from_slice(&bytes, bincode::config::standard())?;
        Ok(cfg)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let bytes = bincode::encode_to_vec(self, bincode::config::standard())?;
        fs::write(path, bytes)?;
        Ok(())
    }
}

/// Constants derived once from the particle spacing and `SimConfig`. Reordering any of these
/// expressions changes results in the last bits.
#[derive(Clone, Debug, PartialEq)]
pub struct KernelConsts {
    pub mass: f64,
    /// Smoothing length.
    pub h: f64,
    pub h_sq: f64,
    pub h_6: f64,
    pub h_9: f64,
    /// 15 / (h^6 π)
    pub h6_pi_15: f64,
    /// h^6 π
    pub h6_pi: f64,
    pub pressure_3: f64,
    pub viscosity_45: f64,
    pub fluid_density_2: f64,
    pub dt_half: f64,
    pub dt_sq: f64,
    /// 315 m / (64 π h^9)
    pub density_transform: f64,
    /// 45 μ m / (h^6 π)
    pub viscosity_factor: f64,
    /// 3 k m / 2
    pub mass_pressure: f64,
}

impl KernelConsts {
    pub fn new(particles_per_meter: f64, cfg: &SimConfig) -> Self {
        // `powf` to match C `pow`; `powi` can differ in the last bit.
        let mass = cfg.fluid_density / particles_per_meter.powf(3.);
        let h = cfg.radius_multiplier / particles_per_meter;
        let h_6 = h.powf(6.);
        let h_9 = h.powf(9.);
        let h6_pi = h_6 * PI;
        let pressure_3 = 3. * cfg.pressure_stiffness;
        let viscosity_45 = 45. * cfg.viscosity;

        Self {
            mass,
            h,
            h_sq: h.powf(2.),
            h_6,
            h_9,
            h6_pi_15: 15. / (h_6 * PI),
            h6_pi,
            pressure_3,
            viscosity_45,
            fluid_density_2: 2. * cfg.fluid_density,
            dt_half: cfg.dt / 2.,
            dt_sq: cfg.dt.powf(2.),
            density_transform: (315. * mass) / (64. * PI * h_9),
            viscosity_factor: (viscosity_45 * mass) / h6_pi,
            mass_pressure: (mass * pressure_3) / 2.,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn derived_from_spacing() {
        let cfg = SimConfig::default();
        let k = KernelConsts::new(100., &cfg);

        assert_eq!(k.mass, 1e3 / 100f64.powf(3.));
        assert_eq!(k.h, 1.695 / 100.);
        assert!((k.h_sq - k.h * k.h).abs() <= f64::EPSILON * k.h_sq);
        assert_eq!(k.dt_half, 5e-4);
        assert_eq!(k.fluid_density_2, 2e3);
        assert_eq!(k.mass_pressure, k.mass * 9. / 2.);
    }

    #[test]
    fn kernel_constants_at_100_per_meter() {
        let k = KernelConsts::new(100., &SimConfig::default());
        let h = 0.01695_f64;

        assert_relative_eq!(k.mass, 0.001, max_relative = 1e-14);
        assert_relative_eq!(k.h6_pi_15, 15. / (PI * h.powi(6)), max_relative = 1e-12);
        assert_relative_eq!(k.h6_pi_15, 201_336_804_344.637, max_relative = 1e-12);
        assert_relative_eq!(
            k.viscosity_factor,
            45. * 0.4 * 0.001 / (PI * h.powi(6)),
            max_relative = 1e-12
        );
        assert_relative_eq!(k.viscosity_factor, 241_604_165.213_564, max_relative = 1e-12);
        assert_relative_eq!(
            k.density_transform,
            315. * 0.001 / (64. * PI * h.powi(9)),
            max_relative = 1e-12
        );
        assert_relative_eq!(k.density_transform, 13_566_049_089_786.99, max_relative = 1e-12);
        assert_relative_eq!(k.mass_pressure, 0.0045, max_relative = 1e-12);
        assert_relative_eq!(k.dt_sq, 1e-6, max_relative = 1e-14);
    }

    #[test]
    fn save_then_load() {
        let path = std::env::temp_dir().join(format!("sph_cfg_{}.sph", std::process::id()));

        let cfg = SimConfig {
            dt: 5e-4,
            viscosity: 0.1,
            ..Default::default()
        };
        cfg.save(&path).unwrap();
        let loaded = SimConfig::load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded, cfg);
    }
}
