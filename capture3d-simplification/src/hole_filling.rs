//! Hole filling by ear clipping

use crate::boundary::find_boundaries;
use capture3d_core::{Point3f, Result, TriangleMesh};
use nalgebra::{Vector2, Vector3};

type Vec2 = Vector2<f64>;

/// Newell normal of a closed polygon; the polygon runs counter-clockwise around it
fn newell_normal(points: &[Point3f]) -> Vector3<f64> {
    let mut n = Vector3::zeros();
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        let (p, q) = (p.cast::<f64>(), q.cast::<f64>());
        n.x += (p.y - q.y) * (p.z + q.z);
        n.y += (p.z - q.z) * (p.x + q.x);
        n.z += (p.x - q.x) * (p.y + q.y);
    }
    n
}

/// Project onto the plane of `normal` keeping counter-clockwise order positive
fn project(points: &[Point3f], normal: &Vector3<f64>) -> Option<Vec<Vec2>> {
    let n = normal.try_normalize(1e-12)?;
    let axis = if n.x.abs() <= n.y.abs() && n.x.abs() <= n.z.abs() {
        Vector3::x()
    } else if n.y.abs() <= n.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let u = n.cross(&axis).normalize();
    let v = n.cross(&u);
    Some(
        points
            .iter()
            .map(|p| {
                let p = p.coords.cast::<f64>();
                Vec2::new(p.dot(&u), p.dot(&v))
            })
            .collect(),
    )
}

fn cross(a: &Vec2, b: &Vec2) -> f64 {
    a.x * b.y - a.y * b.x
}

fn is_convex(a: &Vec2, b: &Vec2, c: &Vec2) -> bool {
    cross(&(b - a), &(c - b)) > 0.0
}

fn in_triangle(p: &Vec2, a: &Vec2, b: &Vec2, c: &Vec2) -> bool {
    cross(&(b - a), &(p - a)) >= 0.0
        && cross(&(c - b), &(p - b)) >= 0.0
        && cross(&(a - c), &(p - c)) >= 0.0
}

/// Triangulate a polygon given as vertex indices into `positions`
///
/// Triangles come out as `(previous, ear, next)` in polygon order. An ear is a
/// convex corner whose triangle holds no other polygon vertex. When no ear
/// exists (collinear or self-overlapping outlines) the first remaining corner
/// is clipped anyway so the loop always terminates with `n - 2` triangles.
/// Polygons with fewer than 3 vertices yield nothing.
pub fn ear_clip(positions: &[Point3f], polygon: &[u32]) -> Vec<[u32; 3]> {
    if polygon.len() < 3 {
        return Vec::new();
    }
    if polygon.len() == 3 {
        return vec![[polygon[0], polygon[1], polygon[2]]];
    }

    let points: Vec<Point3f> = polygon.iter().map(|&v| positions[v as usize]).collect();
    let projected = project(&points, &newell_normal(&points));

    let mut remaining: Vec<usize> = (0..polygon.len()).collect();
    let mut triangles = Vec::with_capacity(polygon.len() - 2);

    while remaining.len() > 3 {
        let n = remaining.len();
        let ear = projected.as_ref().and_then(|uv| {
            (0..n).find(|&i| {
                let (ia, ib, ic) =
                    (remaining[(i + n - 1) % n], remaining[i], remaining[(i + 1) % n]);
                let (a, b, c) = (&uv[ia], &uv[ib], &uv[ic]);
                if !is_convex(a, b, c) {
                    return false;
                }
                !remaining.iter().any(|&j| {
                    j != ia
                        && j != ib
                        && j != ic
                        && uv[j] != *a
                        && uv[j] != *b
                        && uv[j] != *c
                        && in_triangle(&uv[j], a, b, c)
                })
            })
        });

        let i = ear.unwrap_or_else(|| {
            log::warn!("no ear in {}-vertex hole outline, clipping first corner", n);
            0
        });
        triangles.push([
            polygon[remaining[(i + n - 1) % n]],
            polygon[remaining[i]],
            polygon[remaining[(i + 1) % n]],
        ]);
        remaining.remove(i);
    }

    triangles.push([
        polygon[remaining[0]],
        polygon[remaining[1]],
        polygon[remaining[2]],
    ]);
    triangles
}

/// Close every boundary loop of `mesh` with ear-clipped triangles
///
/// New triangles are appended after the existing ones and wound opposite to
/// the boundary edges they close, matching the neighboring faces. Loops with
/// fewer than 3 vertices and chains that do not close are skipped. Normals
/// are recomputed when the input had them.
pub fn fill_holes(mesh: &TriangleMesh) -> Result<TriangleMesh> {
    mesh.require_indexed()?;
    let loops = find_boundaries(mesh)?;

    let mut filled = mesh.clone();
    let mut added = 0usize;
    for boundary in loops.iter().filter(|l| l.closed && l.len() >= 3) {
        for [prev, ear, next] in ear_clip(&mesh.vertices, &boundary.vertices) {
            filled.triangles.push([next, ear, prev]);
            added += 1;
        }
    }

    log::debug!("filled {} holes with {} triangles", loops.len(), added);
    if mesh.normals.is_some() {
        filled.recompute_normals();
    }
    Ok(filled)
}
