/// Raw geometry pools as produced by the OBJ parser
use nalgebra::{Point3, Vector2, Vector3};
use std::fmt;

/// Which attribute pool an index refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Position,
    Normal,
    TexCoord,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Attribute::Position => "position",
            Attribute::Normal => "normal",
            Attribute::TexCoord => "texcoord",
        };
        f.write_str(name)
    }
}

/// Indices of one face corner into the three attribute pools (0-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexTriple {
    pub position: u32,
    pub texcoord: Option<u32>,
    pub normal: Option<u32>,
}

impl IndexTriple {
    pub fn new(position: u32, texcoord: u32, normal: u32) -> Self {
        Self {
            position,
            texcoord: Some(texcoord),
            normal: Some(normal),
        }
    }
}

/// A polygon face; triangles after the parser's triangulation pass
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    pub vertices: Vec<IndexTriple>,
}

impl Face {
    pub fn triangle(a: IndexTriple, b: IndexTriple, c: IndexTriple) -> Self {
        Self {
            vertices: vec![a, b, c],
        }
    }

    pub fn is_triangle(&self) -> bool {
        self.vertices.len() == 3
    }
}

/// A named group of faces (`o` / `g` statements in OBJ)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Shape {
    pub name: String,
    pub faces: Vec<Face>,
}

/// Parallel attribute arrays plus the shapes that index into them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VertexPool {
    pub positions: Vec<Point3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub texcoords: Vec<Vector2<f32>>,
    pub shapes: Vec<Shape>,
}

impl VertexPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of face-vertex occurrences across every shape
    pub fn occurrence_count(&self) -> usize {
        self.shapes
            .iter()
            .flat_map(|shape| shape.faces.iter())
            .map(|face| face.vertices.len())
            .sum()
    }

    pub fn face_count(&self) -> usize {
        self.shapes.iter().map(|shape| shape.faces.len()).sum()
    }

    /// Axis-aligned cube centred on the origin, textured per face.
    pub fn cube(size: f32) -> Self {
        let half = size / 2.0;
        let mut pool = Self::new();
        pool.texcoords = vec![
            Vector2::new(0.0, 0.0),
            Vector2::new(1.0, 0.0),
            Vector2::new(1.0, 1.0),
            Vector2::new(0.0, 1.0),
        ];

        // (normal, u, v) with u x v == normal so the winding stays counter-clockwise
        let sides = [
            (Vector3::z(), Vector3::x(), Vector3::y()),
            (-Vector3::z(), -Vector3::x(), Vector3::y()),
            (Vector3::x(), -Vector3::z(), Vector3::y()),
            (-Vector3::x(), Vector3::z(), Vector3::y()),
            (Vector3::y(), Vector3::x(), -Vector3::z()),
            (-Vector3::y(), Vector3::x(), Vector3::z()),
        ];

        let mut shape = Shape {
            name: "cube".to_string(),
            faces: Vec::with_capacity(12),
        };

        for (side, (normal, u, v)) in sides.iter().enumerate() {
            let center = normal * half;
            let base = pool.positions.len() as u32;
            for (du, dv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                pool.positions
                    .push(Point3::from(center + u * (du * half) + v * (dv * half)));
            }
            pool.normals.push(*normal);

            let n = side as u32;
            let corner = |i: u32| IndexTriple::new(base + i, i, n);
            shape.faces.push(Face::triangle(corner(0), corner(1), corner(2)));
            shape.faces.push(Face::triangle(corner(0), corner(2), corner(3)));
        }

        pool.shapes.push(shape);
        pool
    }
}
