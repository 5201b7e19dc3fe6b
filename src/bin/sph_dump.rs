//! Prints the contents of a particle file, or of a `.trz` trace snapshot, as text.

use std::{env, path::Path, process};

use sph_fluid::{FileError, ParticleFile, Trace, Vec3};

fn fmt_vec(v: Vec3) -> String {
    format!("({}, {}, {})", v.x, v.y, v.z)
}

fn dump_particles(path: &Path) -> Result<(), FileError> {
    let file = ParticleFile::load(path)?;

    println!("particles_per_meter: {}", file.particles_per_meter);
    println!("particles: {}", file.particles.len());
    for (i, p) in file.particles.iter().enumerate() {
        println!("\nparticle {i}");
        println!("posit: {}", fmt_vec(p.posit));
        println!("hv: {}", fmt_vec(p.hv));
        println!("vel: {}", fmt_vec(p.vel));
    }
    Ok(())
}

fn dump_trace(path: &Path) -> Result<(), FileError> {
    let trace = Trace::load(path)?;

    for (i, block) in trace.blocks.iter().enumerate() {
        let mut ids: Vec<i64> = block.particles.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        println!("block {i}: {} particles {ids:?}", ids.len());
    }

    for rec in trace.records_by_id() {
        println!("\nid: {}", rec.id);
        println!("posit: {}", fmt_vec(rec.posit));
        println!("hv: {}", fmt_vec(rec.hv));
        println!("vel: {}", fmt_vec(rec.vel));
        println!("density: {}", rec.density);
        println!("accel: {}", fmt_vec(rec.accel));
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 2 {
        let name = args.first().map_or("sph_dump", String::as_str);
        eprintln!("Usage: {name} <particle file | trace.trz>");
        process::exit(1);
    }

    let path = Path::new(&args[1]);
    let result = match path.extension().and_then(|e| e.to_str()) {
        Some("trz") => dump_trace(path),
        _ => dump_particles(path),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(e.exit_code());
    }
}
