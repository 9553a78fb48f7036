/// Interleaved vertex buffers built from a [`VertexPool`]
///
/// Every face-vertex occurrence becomes one record; shared corners are not
/// deduplicated. Two record layouts exist:
///
/// | layout         | position | normal | texcoord | tangent | bitangent | stride |
/// |----------------|----------|--------|----------|---------|-----------|--------|
/// | `Regular`      | 0..3     | 3..6   | 6..8     |         |           | 8      |
/// | `TangentSpace` | 0..3     | 3..6   | 6..8     | 8..11   | 11..14    | 14     |
use log::warn;
use nalgebra::{Point3, Vector2, Vector3};
use thiserror::Error;

use crate::geometry::{Attribute, IndexTriple, VertexPool};

/// Below this UV determinant the tangent solve is treated as degenerate
const UV_DETERMINANT_EPSILON: f32 = 1e-8;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MeshError {
    #[error("shape {shape}, face {face}: corner has no {attribute} index")]
    MissingAttribute {
        shape: usize,
        face: usize,
        attribute: Attribute,
    },
    #[error("{attribute} index {index} out of range (pool holds {len})")]
    IndexOutOfRange {
        attribute: Attribute,
        index: u32,
        len: usize,
    },
    #[error("shape {shape}, face {face}: expected a triangle, found {vertices} corners")]
    NonTriangularFace {
        shape: usize,
        face: usize,
        vertices: usize,
    },
    #[error("shape {shape}, face {face}: degenerate texture coordinates, no tangent space")]
    DegenerateUv { shape: usize, face: usize },
}

/// Per-vertex record layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexLayout {
    #[default]
    Regular,
    TangentSpace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexSemantic {
    Position,
    Normal,
    TexCoord,
    Tangent,
    Bitangent,
}

/// One attribute inside a record; `offset` and `components` count floats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub semantic: VertexSemantic,
    pub location: u32,
    pub components: usize,
    pub offset: usize,
}

impl VertexAttribute {
    const fn new(
        semantic: VertexSemantic,
        location: u32,
        components: usize,
        offset: usize,
    ) -> Self {
        Self {
            semantic,
            location,
            components,
            offset,
        }
    }

    pub fn byte_offset(&self) -> usize {
        self.offset * std::mem::size_of::<f32>()
    }
}

const REGULAR_ATTRIBUTES: [VertexAttribute; 3] = [
    VertexAttribute::new(VertexSemantic::Position, 0, 3, 0),
    VertexAttribute::new(VertexSemantic::Normal, 1, 3, 3),
    VertexAttribute::new(VertexSemantic::TexCoord, 2, 2, 6),
];

const TANGENT_ATTRIBUTES: [VertexAttribute; 5] = [
    VertexAttribute::new(VertexSemantic::Position, 0, 3, 0),
    VertexAttribute::new(VertexSemantic::Normal, 1, 3, 3),
    VertexAttribute::new(VertexSemantic::TexCoord, 2, 2, 6),
    VertexAttribute::new(VertexSemantic::Tangent, 3, 3, 8),
    VertexAttribute::new(VertexSemantic::Bitangent, 4, 3, 11),
];

impl VertexLayout {
    /// Floats per record
    pub fn stride(self) -> usize {
        match self {
            VertexLayout::Regular => 8,
            VertexLayout::TangentSpace => 14,
        }
    }

    pub fn byte_stride(self) -> usize {
        self.stride() * std::mem::size_of::<f32>()
    }

    pub fn attributes(self) -> &'static [VertexAttribute] {
        match self {
            VertexLayout::Regular => &REGULAR_ATTRIBUTES,
            VertexLayout::TangentSpace => &TANGENT_ATTRIBUTES,
        }
    }

    pub fn attribute(self, semantic: VertexSemantic) -> Option<&'static VertexAttribute> {
        self.attributes().iter().find(|a| a.semantic == semantic)
    }
}

/// What to do when a triangle's UV mapping has zero area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DegenerateUvPolicy {
    /// Write a zero tangent and bitangent and log a warning
    #[default]
    Zero,
    /// Fail the build with [`MeshError::DegenerateUv`]
    Reject,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions {
    pub layout: VertexLayout,
    pub degenerate_uv: DegenerateUvPolicy,
}

impl From<VertexLayout> for BuildOptions {
    fn from(layout: VertexLayout) -> Self {
        Self {
            layout,
            ..Self::default()
        }
    }
}

/// Flat interleaved vertex data plus the raw position index of each record
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBuffers {
    pub layout: VertexLayout,
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    pub fn empty(layout: VertexLayout) -> Self {
        Self {
            layout,
            vertices: Vec::new(),
            indices: Vec::new(),
        }
    }

    /// Number of records (face-vertex occurrences)
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / self.layout.stride()
    }

    pub fn record(&self, index: usize) -> &[f32] {
        let stride = self.layout.stride();
        &self.vertices[index * stride..(index + 1) * stride]
    }

    pub fn records(&self) -> impl Iterator<Item = &[f32]> {
        self.vertices.chunks_exact(self.layout.stride())
    }

    /// Slice of one attribute within record `index`
    pub fn attribute(&self, index: usize, semantic: VertexSemantic) -> Option<&[f32]> {
        let attribute = self.layout.attribute(semantic)?;
        let record = self.record(index);
        Some(&record[attribute.offset..attribute.offset + attribute.components])
    }
}

/// Corner attributes gathered from the pools
struct Corner {
    position: Point3<f32>,
    normal: Vector3<f32>,
    uv: Vector2<f32>,
    index: u32,
}

/// Build with the default degenerate-UV handling
pub fn build(pool: &VertexPool, layout: VertexLayout) -> Result<MeshBuffers, MeshError> {
    build_with(pool, BuildOptions::from(layout))
}

pub fn build_with(pool: &VertexPool, options: BuildOptions) -> Result<MeshBuffers, MeshError> {
    let layout = options.layout;
    let occurrences = pool.occurrence_count();
    let mut buffers = MeshBuffers {
        layout,
        vertices: Vec::with_capacity(occurrences * layout.stride()),
        indices: Vec::with_capacity(occurrences),
    };

    for (s, shape) in pool.shapes.iter().enumerate() {
        for (f, face) in shape.faces.iter().enumerate() {
            if !face.is_triangle() {
                return Err(MeshError::NonTriangularFace {
                    shape: s,
                    face: f,
                    vertices: face.vertices.len(),
                });
            }

            let corners = [
                gather(pool, &face.vertices[0], s, f)?,
                gather(pool, &face.vertices[1], s, f)?,
                gather(pool, &face.vertices[2], s, f)?,
            ];

            let frame = match layout {
                VertexLayout::Regular => None,
                VertexLayout::TangentSpace => Some(match triangle_tangents(&corners) {
                    Some(frame) => frame,
                    None if options.degenerate_uv == DegenerateUvPolicy::Reject => {
                        return Err(MeshError::DegenerateUv { shape: s, face: f })
                    }
                    None => {
                        warn!("shape {s}, face {f}: degenerate UVs, tangent space set to zero");
                        (Vector3::zeros(), Vector3::zeros())
                    }
                }),
            };

            for corner in &corners {
                push_record(&mut buffers.vertices, corner, frame.as_ref());
                buffers.indices.push(corner.index);
            }
        }
    }

    Ok(buffers)
}

fn gather(
    pool: &VertexPool,
    triple: &IndexTriple,
    shape: usize,
    face: usize,
) -> Result<Corner, MeshError> {
    let missing = |attribute| MeshError::MissingAttribute {
        shape,
        face,
        attribute,
    };
    let normal_index = triple.normal.ok_or_else(|| missing(Attribute::Normal))?;
    let texcoord_index = triple.texcoord.ok_or_else(|| missing(Attribute::TexCoord))?;

    Ok(Corner {
        position: *lookup(&pool.positions, triple.position, Attribute::Position)?,
        normal: *lookup(&pool.normals, normal_index, Attribute::Normal)?,
        uv: *lookup(&pool.texcoords, texcoord_index, Attribute::TexCoord)?,
        index: triple.position,
    })
}

fn lookup<T>(items: &[T], index: u32, attribute: Attribute) -> Result<&T, MeshError> {
    items
        .get(index as usize)
        .ok_or(MeshError::IndexOutOfRange {
            attribute,
            index,
            len: items.len(),
        })
}

/// Flat tangent and bitangent of one triangle, `None` when the UV mapping is degenerate.
///
/// The vectors are left unnormalised; the shading stage normalises them.
fn triangle_tangents(corners: &[Corner; 3]) -> Option<(Vector3<f32>, Vector3<f32>)> {
    let edge1 = corners[1].position - corners[0].position;
    let edge2 = corners[2].position - corners[0].position;
    let delta_uv1 = corners[1].uv - corners[0].uv;
    let delta_uv2 = corners[2].uv - corners[0].uv;

    let determinant = delta_uv1.x * delta_uv2.y - delta_uv1.y * delta_uv2.x;
    if determinant.abs() < UV_DETERMINANT_EPSILON {
        return None;
    }
    let r = 1.0 / determinant;

    let tangent = (edge1 * delta_uv2.y - edge2 * delta_uv1.y) * r;
    let bitangent = (edge2 * delta_uv1.x - edge1 * delta_uv2.x) * r;

    if tangent.iter().chain(bitangent.iter()).all(|c| c.is_finite()) {
        Some((tangent, bitangent))
    } else {
        None
    }
}

fn push_record(
    out: &mut Vec<f32>,
    corner: &Corner,
    frame: Option<&(Vector3<f32>, Vector3<f32>)>,
) {
    out.extend_from_slice(&[corner.position.x, corner.position.y, corner.position.z]);
    out.extend_from_slice(corner.normal.as_slice());
    out.extend_from_slice(corner.uv.as_slice());
    if let Some((tangent, bitangent)) = frame {
        out.extend_from_slice(tangent.as_slice());
        out.extend_from_slice(bitangent.as_slice());
    }
}
