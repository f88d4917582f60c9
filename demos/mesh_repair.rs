//! Mesh simplification and repair demo
//!
//! Builds a height-field grid, punches a hole into it, then decimates, finds
//! the boundaries and repairs it.

use anyhow::Result;
use capture3d_core::{Point3f, TriangleMesh};
use capture3d_simplification::{
    find_boundaries, EdgeCollapseSimplifier, LaplacianSmoother, MeshSimplifier,
};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(about = "Decimate and repair a synthetic grid mesh")]
struct Args {
    /// Grid cells per side
    #[arg(long, default_value_t = 16)]
    cells: u32,

    /// Triangle count to decimate toward
    #[arg(long, default_value_t = 128)]
    target: usize,

    #[arg(long, default_value_t = 3)]
    smoothing_iterations: u32,
}

fn wavy_grid(cells: u32) -> TriangleMesh {
    let row = cells + 1;
    let vertices = (0..row * row)
        .map(|i| {
            let (x, y) = ((i % row) as f32, (i / row) as f32);
            Point3f::new(x, y, (x * 0.5).sin() * (y * 0.5).cos())
        })
        .collect();

    let mut triangles = Vec::new();
    for y in 0..cells {
        for x in 0..cells {
            // leave a hole in the middle
            if x == cells / 2 && y == cells / 2 {
                continue;
            }
            let i = y * row + x;
            triangles.push([i, i + 1, i + row + 1]);
            triangles.push([i, i + row + 1, i + row]);
        }
    }

    let mut mesh = TriangleMesh::from_vertices_and_triangles(vertices, triangles);
    mesh.recompute_normals();
    mesh
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mesh = wavy_grid(args.cells);
    println!(
        "grid: {} vertices, {} triangles, {} boundary loops",
        mesh.vertex_count(),
        mesh.triangle_count(),
        find_boundaries(&mesh)?.len()
    );

    let simplifier = EdgeCollapseSimplifier::new();
    let mut decimation = simplifier.start(&mesh, args.target)?;
    let mut steps = 0;
    while decimation.step(64) {
        steps += 1;
    }
    println!(
        "decimated in {} steps: {} triangles after {} collapses",
        steps + 1,
        decimation.triangle_count(),
        decimation.collapse_count()
    );
    let decimated = decimation.finish();

    let direct = simplifier.simplify(&mesh, args.target)?;
    log::debug!("one-shot decimation gives {} triangles", direct.triangle_count());

    let filled = capture3d_simplification::fill_holes(&decimated)?;
    let smoothed = LaplacianSmoother::new(args.smoothing_iterations, 0.5).smooth(&filled)?;
    println!(
        "repaired: {} triangles, {} boundary loops left",
        smoothed.triangle_count(),
        find_boundaries(&smoothed)?.len()
    );

    Ok(())
}
