//! The SPH engine. Particles are binned into a fixed lattice of blocks, so pair interactions only
//! need to consider the 27 blocks around each block. One call to `step` advances the simulation by
//! one `dt`.
//!
//! Each unordered pair is evaluated once: within a block only when the first particle's index is
//! lower, and across blocks only from the block with the lower flat index. Both particles are
//! updated from that single evaluation.

use std::path::Path;

use lin_alg::f64::Vec3;

use crate::{
    block::Block,
    config::{KernelConsts, SimConfig},
    error::FileError,
    file_io::{self, ParticleFile},
    particle::Particle,
    trace::{Trace, TraceBlock, TraceRecord},
};

/// The stages of a step, in execution order. `clear_blocks` isn't included; it runs after the
/// last of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Assign,
    DensityIncrement,
    DensityTransform,
    Acceleration,
    Collision,
    Motion,
    Boundary,
}

impl Phase {
    pub const ALL: [Self; 7] = [
        Self::Assign,
        Self::DensityIncrement,
        Self::DensityTransform,
        Self::Acceleration,
        Self::Collision,
        Self::Motion,
        Self::Boundary,
    ];

    /// Used to name trace files.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::Assign => "repos",
            Self::DensityIncrement => "densinc",
            Self::DensityTransform => "denstransf",
            Self::Acceleration => "acctransf",
            Self::Collision => "partcol",
            Self::Motion => "motion",
            Self::Boundary => "boundint",
        }
    }
}

#[derive(Clone, Debug)]
pub struct Grid {
    pub particles_per_meter: f64,
    pub particles: Vec<Particle>,
    pub cfg: SimConfig,
    pub consts: KernelConsts,
    /// Blocks per axis.
    pub n_blocks: [usize; 3],
    /// Per axis; at least the smoothing length.
    pub block_size: Vec3,
    /// Indexed by `x + y * nx + z * nx * ny`.
    pub blocks: Vec<Block>,
}

impl Grid {
    pub fn new(file: ParticleFile, cfg: SimConfig) -> Self {
        let consts = KernelConsts::new(file.particles_per_meter, &cfg);
        let bdist = cfg.bmax - cfg.bmin;

        // Floor, so block size is never below the smoothing length; otherwise the 27-block
        // neighbourhood would miss interactions.
        let n_blocks = [
            ((bdist.x / consts.h).floor() as usize).max(1),
            ((bdist.y / consts.h).floor() as usize).max(1),
            ((bdist.z / consts.h).floor() as usize).max(1),
        ];
        let block_size = Vec3::new(
            bdist.x / n_blocks[0] as f64,
            bdist.y / n_blocks[1] as f64,
            bdist.z / n_blocks[2] as f64,
        );

        let result = Self {
            particles_per_meter: file.particles_per_meter,
            particles: file.particles,
            cfg,
            consts,
            n_blocks,
            block_size,
            blocks: generate_blocks(n_blocks),
        };

        log::info!("Number of particles: {}", result.particles.len());
        log::info!("Particles per meter: {}", result.particles_per_meter);
        log::info!("Smoothing length: {}", result.consts.h);
        log::info!("Particle mass: {}", result.consts.mass);
        log::info!(
            "Grid size: {} x {} x {}",
            n_blocks[0],
            n_blocks[1],
            n_blocks[2]
        );
        log::info!("Number of blocks: {}", result.blocks.len());
        log::info!(
            "Block size: {} x {} x {}",
            block_size.x,
            block_size.y,
            block_size.z
        );

        result
    }

    /// Rebuild a grid mid-step from a snapshot: particles are placed by id, and block membership
    /// is taken from the snapshot as-is.
    pub fn from_snapshot(
        particles_per_meter: f64,
        cfg: SimConfig,
        trace: &Trace,
    ) -> Result<Self, FileError> {
        let num_particles = trace.num_particles();
        let mut grid = Self::new(
            ParticleFile {
                particles_per_meter,
                particles: vec![
                    Particle::new(
                        Vec3::new_zero(),
                        Vec3::new_zero(),
                        Vec3::new_zero(),
                        Vec3::new_zero()
                    );
                    num_particles
                ],
            },
            cfg,
        );

        if trace.blocks.len() != grid.blocks.len() {
            return Err(FileError::TraceLayout(format!(
                "{} blocks in trace, {} in grid",
                trace.blocks.len(),
                grid.blocks.len()
            )));
        }

        let mut seen = vec![false; num_particles];
        for (block, trace_block) in grid.blocks.iter_mut().zip(&trace.blocks) {
            for rec in &trace_block.particles {
                let id = usize::try_from(rec.id)
                    .ok()
                    .filter(|&id| id < num_particles && !seen[id])
                    .ok_or_else(|| {
                        FileError::TraceLayout(format!("bad or repeated particle id {}", rec.id))
                    })?;
                seen[id] = true;
                grid.particles[id] = rec.to_particle();
                block.particles.push(id);
            }
        }

        Ok(grid)
    }

    /// The current block membership and particle state.
    pub fn snapshot(&self) -> Trace {
        Trace {
            blocks: self
                .blocks
                .iter()
                .map(|block| TraceBlock {
                    particles: block
                        .particles
                        .iter()
                        .map(|&i| TraceRecord::new(i, &self.particles[i]))
                        .collect(),
                })
                .collect(),
        }
    }

    pub fn flat_index(&self, coord: [usize; 3]) -> usize {
        coord[0] + coord[1] * self.n_blocks[0] + coord[2] * self.n_blocks[0] * self.n_blocks[1]
    }

    /// The block containing a position. Positions outside the domain are clamped into the
    /// boundary blocks.
    pub fn block_index(&self, posit: Vec3) -> [usize; 3] {
        let mut result = [0; 3];
        for axis in 0..3 {
            let i = ((component(posit, axis) - component(self.cfg.bmin, axis))
                / component(self.block_size, axis))
                .floor();
            result[axis] = i.clamp(0., (self.n_blocks[axis] - 1) as f64) as usize;
        }
        result
    }

    /// Flat indices of the block at `coord` and its up-to-26 neighbours; x offset outermost,
    /// z innermost. This order fixes the summation order of pair contributions.
    pub fn neighbours(&self, coord: [usize; 3]) -> Vec<usize> {
        let mut result = Vec::with_capacity(27);
        for dx in -1..=1_i64 {
            for dy in -1..=1_i64 {
                for dz in -1..=1_i64 {
                    let offset = [dx, dy, dz];
                    let mut neighbour = [0; 3];
                    let mut in_bounds = true;
                    for axis in 0..3 {
                        let c = coord[axis] as i64 + offset[axis];
                        if c < 0 || c > self.n_blocks[axis] as i64 - 1 {
                            in_bounds = false;
                            break;
                        }
                        neighbour[axis] = c as usize;
                    }
                    if in_bounds {
                        result.push(self.flat_index(neighbour));
                    }
                }
            }
        }
        result
    }

    /// Advance the simulation by one time step.
    pub fn step(&mut self) {
        for phase in Phase::ALL {
            self.run_phase(phase);
        }
        self.clear_blocks();
    }

    /// As `step`, handing a snapshot to `sink` after each phase.
    pub fn step_traced<F: FnMut(Phase, Trace)>(&mut self, mut sink: F) {
        for phase in Phase::ALL {
            self.run_phase(phase);
            sink(phase, self.snapshot());
        }
        self.clear_blocks();
    }

    pub fn run_phase(&mut self, phase: Phase) {
        match phase {
            Phase::Assign => self.assign_particles(),
            Phase::DensityIncrement => self.eval_densities(),
            Phase::DensityTransform => self.transform_densities(),
            Phase::Acceleration => self.eval_accelerations(),
            Phase::Collision => self.collisions(),
            Phase::Motion => self.integrate(),
            Phase::Boundary => self.reflect_boundaries(),
        }
    }

    /// Reset per-step accumulators, and bin each particle. Blocks must be empty on entry.
    pub fn assign_particles(&mut self) {
        for i in 0..self.particles.len() {
            self.particles[i].density = 0.;
            self.particles[i].accel = self.cfg.external_accel;

            let coord = self.block_index(self.particles[i].posit);
            let block_i = self.flat_index(coord);
            self.blocks[block_i].particles.push(i);
        }
    }

    pub fn eval_densities(&mut self) {
        for block_i in 0..self.blocks.len() {
            let neighbours = self.neighbours(self.blocks[block_i].coord());
            let Self {
                blocks,
                particles,
                consts,
                ..
            } = self;

            for_each_pair(blocks, block_i, &neighbours, |i, j| {
                density_pair(particles, consts, i, j)
            });
        }
    }

    /// Add each particle's own kernel contribution, and scale to a physical density.
    pub fn transform_densities(&mut self) {
        let Self {
            blocks,
            particles,
            consts,
            ..
        } = self;

        for block in blocks.iter() {
            for &i in &block.particles {
                particles[i].density = (particles[i].density + consts.h_6) * consts.density_transform;
            }
        }
    }

    /// Pressure and viscosity forces. Densities must already be transformed.
    pub fn eval_accelerations(&mut self) {
        for block_i in 0..self.blocks.len() {
            let neighbours = self.neighbours(self.blocks[block_i].coord());
            let Self {
                blocks,
                particles,
                consts,
                cfg,
                ..
            } = self;

            for_each_pair(blocks, block_i, &neighbours, |i, j| {
                accel_pair(particles, consts, cfg.min_separation, i, j)
            });
        }
    }

    /// Penalty forces for particles in boundary blocks that would cross a wall within one `dt`.
    pub fn collisions(&mut self) {
        let Self {
            blocks,
            particles,
            cfg,
            n_blocks,
            ..
        } = self;

        for block in blocks.iter() {
            for (axis, (c, n)) in block.coord().into_iter().zip(*n_blocks).enumerate() {
                if c != 0 && c != n - 1 {
                    continue;
                }
                for &i in &block.particles {
                    collide_axis(&mut particles[i], cfg, axis, c == 0);
                }
            }
        }
    }

    /// Leapfrog integration.
    pub fn integrate(&mut self) {
        let Self {
            blocks,
            particles,
            cfg,
            consts,
            ..
        } = self;

        for block in blocks.iter() {
            for &i in &block.particles {
                let p = &mut particles[i];
                p.posit += p.hv * cfg.dt + p.accel * consts.dt_sq;
                p.vel = p.hv + p.accel * consts.dt_half;
                p.hv += p.accel * cfg.dt;
            }
        }
    }

    /// Mirror particles in boundary blocks that ended up outside the domain back inside.
    pub fn reflect_boundaries(&mut self) {
        let Self {
            blocks,
            particles,
            cfg,
            n_blocks,
            ..
        } = self;

        for block in blocks.iter() {
            for (axis, (c, n)) in block.coord().into_iter().zip(*n_blocks).enumerate() {
                if c != 0 && c != n - 1 {
                    continue;
                }
                for &i in &block.particles {
                    reflect_axis(&mut particles[i], cfg, axis, c == 0);
                }
            }
        }
    }

    pub fn clear_blocks(&mut self) {
        for block in &mut self.blocks {
            block.particles.clear();
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), FileError> {
        file_io::write(path, self.particles_per_meter, &self.particles)
    }
}

/// All blocks, in flat-index order.
fn generate_blocks(n_blocks: [usize; 3]) -> Vec<Block> {
    let [nx, ny, nz] = n_blocks;
    let mut result = Vec::with_capacity(nx * ny * nz);
    for z in 0..nz {
        for y in 0..ny {
            for x in 0..nx {
                result.push(Block::new(x, y, z));
            }
        }
    }
    result
}

/// Visit each pair owned by `block_i` exactly once, per the ordering rules above.
fn for_each_pair<F: FnMut(usize, usize)>(
    blocks: &[Block],
    block_i: usize,
    neighbours: &[usize],
    mut f: F,
) {
    for &i in &blocks[block_i].particles {
        for &block_j in neighbours {
            if block_i == block_j {
                for &j in &blocks[block_j].particles {
                    if i < j {
                        f(i, j);
                    }
                }
            } else if block_i < block_j {
                for &j in &blocks[block_j].particles {
                    f(i, j);
                }
            }
        }
    }
}

fn density_pair(particles: &mut [Particle], k: &KernelConsts, i: usize, j: usize) {
    let dist = (particles[i].posit - particles[j].posit).magnitude();
    let dist_sq = dist * dist;

    if dist_sq < k.h_sq {
        let h_dist = k.h_sq - dist_sq;
        let inc = h_dist * h_dist * h_dist;
        particles[i].density += inc;
        particles[j].density += inc;
    }
}

fn accel_pair(particles: &mut [Particle], k: &KernelConsts, min_sep: f64, i: usize, j: usize) {
    let (p_i, p_j) = (particles[i], particles[j]);
    let diff = p_i.posit - p_j.posit;
    let dist = diff.magnitude();

    if dist * dist < k.h_sq {
        let dist = dist.max(min_sep);

        let mut inc = diff;
        inc *= k.h6_pi_15;
        inc *= k.mass_pressure;
        let h_dist = k.h - dist;
        inc *= h_dist * h_dist / dist;
        inc *= p_i.density + p_j.density - k.fluid_density_2;
        inc += (p_j.vel - p_i.vel) * k.viscosity_factor;
        inc /= p_i.density * p_j.density;

        particles[i].accel += inc;
        particles[j].accel -= inc;
    }
}

fn collide_axis(p: &mut Particle, cfg: &SimConfig, axis: usize, lower: bool) {
    let predicted = component(p.posit, axis) + component(p.hv, axis) * cfg.dt;
    let vel = component(p.vel, axis);
    let accel = component_mut(&mut p.accel, axis);

    if lower {
        let penetration = cfg.particle_size + component(cfg.bmin, axis) - predicted;
        if penetration > cfg.collision_tolerance {
            *accel += cfg.collision_stiffness * penetration;
            *accel -= cfg.damping * vel;
        }
    } else {
        let penetration = predicted - component(cfg.bmax, axis) + cfg.particle_size;
        if penetration > cfg.collision_tolerance {
            *accel -= cfg.collision_stiffness * penetration;
            *accel -= cfg.damping * vel;
        }
    }
}

fn reflect_axis(p: &mut Particle, cfg: &SimConfig, axis: usize, lower: bool) {
    let (bmin, bmax) = (component(cfg.bmin, axis), component(cfg.bmax, axis));
    let posit = component(p.posit, axis);
    let d = if lower { posit - bmin } else { bmax - posit };

    if d < 0. {
        *component_mut(&mut p.posit, axis) = if lower { bmin - d } else { bmax + d };
        *component_mut(&mut p.vel, axis) *= -1.;
        *component_mut(&mut p.hv, axis) *= -1.;
    }
}

/// 0 is x, 1 is y, 2 is z.
fn component(v: Vec3, axis: usize) -> f64 {
    match axis {
        0 => v.x,
        1 => v.y,
        _ => v.z,
    }
}

fn component_mut(v: &mut Vec3, axis: usize) -> &mut f64 {
    match axis {
        0 => &mut v.x,
        1 => &mut v.y,
        _ => &mut v.z,
    }
}
