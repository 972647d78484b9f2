// Built-in meshes
//
// Vertex data is uploaded once at startup and never touched again.

use glam::Vec3;

use crate::backend::vertex::Vertex;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MeshKind {
    Triangle,
    Cube,
}

pub fn vertices(kind: MeshKind) -> Vec<Vertex> {
    match kind {
        MeshKind::Triangle => triangle(),
        MeshKind::Cube => cube(),
    }
}

/// One clip-space triangle with a color per corner.
fn triangle() -> Vec<Vertex> {
    let normal = Vec3::Z;
    vec![
        Vertex::new(Vec3::new(1.0, 1.0, 0.0), normal, Vec3::new(1.0, 0.0, 0.0)),
        Vertex::new(Vec3::new(-1.0, 1.0, 0.0), normal, Vec3::new(0.0, 1.0, 0.0)),
        Vertex::new(Vec3::new(0.0, -1.0, 0.0), normal, Vec3::new(0.0, 0.0, 1.0)),
    ]
}

/// A unit cube as a plain triangle list, one color per face.
fn cube() -> Vec<Vertex> {
    const FACES: [(Vec3, Vec3); 6] = [
        (Vec3::Z, Vec3::new(1.0, 0.0, 0.0)),      // front
        (Vec3::NEG_Z, Vec3::new(0.0, 1.0, 0.0)),  // back
        (Vec3::X, Vec3::new(0.0, 0.0, 1.0)),      // right
        (Vec3::NEG_X, Vec3::new(1.0, 1.0, 0.0)),  // left
        (Vec3::Y, Vec3::new(0.0, 1.0, 1.0)),      // top
        (Vec3::NEG_Y, Vec3::new(1.0, 0.0, 1.0)),  // bottom
    ];

    let mut out = Vec::with_capacity(36);
    for (normal, color) in FACES {
        // Build a basis for the face plane
        let up = if normal.x.abs() > 0.5 { Vec3::Y } else { Vec3::X };
        let tangent = up.cross(normal).normalize();
        let bitangent = normal.cross(tangent);

        let center = normal * 0.5;
        let corner = |s: f32, t: f32| center + tangent * (s * 0.5) + bitangent * (t * 0.5);

        let quad = [
            corner(-1.0, -1.0),
            corner(1.0, -1.0),
            corner(1.0, 1.0),
            corner(-1.0, -1.0),
            corner(1.0, 1.0),
            corner(-1.0, 1.0),
        ];

        for position in quad {
            out.push(Vertex::new(position, normal, color));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triangle_has_exactly_three_vertices() {
        assert_eq!(vertices(MeshKind::Triangle).len(), 3);
    }

    #[test]
    fn cube_has_six_faces_of_two_triangles() {
        let cube = vertices(MeshKind::Cube);
        assert_eq!(cube.len(), 36);
    }

    #[test]
    fn cube_corners_sit_on_the_unit_cube() {
        for v in vertices(MeshKind::Cube) {
            assert!((v.position.x.abs() - 0.5).abs() < 1e-6);
            assert!((v.position.y.abs() - 0.5).abs() < 1e-6);
            assert!((v.position.z.abs() - 0.5).abs() < 1e-6);
        }
    }

    #[test]
    fn cube_normals_point_out_of_their_face() {
        for v in vertices(MeshKind::Cube) {
            // The corner lies on the half of the cube its normal points at
            assert!(v.position.dot(v.normal) > 0.0);
        }
    }
}
