/// Wavefront OBJ parser producing an owned [`VertexPool`]
///
/// Only geometry statements are interpreted (`v`, `vn`, `vt`, `f`, `o`, `g`).
/// Material and smoothing statements are skipped. Polygons are fan-triangulated
/// unless [`ObjOptions::triangulate`] is turned off.
use log::{debug, trace};
use nalgebra::{Point3, Vector2, Vector3};
use nom::{
    character::complete::{char, i64 as integer, space0, space1},
    combinator::{all_consuming, opt},
    multi::many1,
    number::complete::float,
    sequence::{pair, preceded, terminated},
    IResult,
};
use std::path::Path;
use thiserror::Error;

use crate::geometry::{Attribute, Face, IndexTriple, Shape, VertexPool};

#[derive(Error, Debug)]
pub enum ObjError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: malformed `{keyword}` statement")]
    Syntax { line: usize, keyword: String },
    #[error("line {line}: {attribute} index 0 is not valid in OBJ")]
    ZeroIndex { line: usize, attribute: Attribute },
    #[error("line {line}: relative {attribute} index {index} reaches before the first element")]
    RelativeIndex {
        line: usize,
        attribute: Attribute,
        index: i64,
    },
    #[error("line {line}: {attribute} index {index} does not fit a 32-bit index")]
    IndexTooLarge {
        line: usize,
        attribute: Attribute,
        index: i64,
    },
    #[error("line {line}: face has {corners} corners, at least 3 are required")]
    ShortFace { line: usize, corners: usize },
}

/// Parser switches
#[derive(Debug, Clone, Copy)]
pub struct ObjOptions {
    /// Split polygons into triangle fans around their first corner
    pub triangulate: bool,
}

impl Default for ObjOptions {
    fn default() -> Self {
        Self { triangulate: true }
    }
}

/// Face corner before index resolution (1-based or negative-relative)
#[derive(Debug, Clone, Copy)]
struct RawCorner {
    position: i64,
    texcoord: Option<i64>,
    normal: Option<i64>,
}

enum Statement<'a> {
    Position(Point3<f32>),
    Normal(Vector3<f32>),
    TexCoord(Vector2<f32>),
    Face(Vec<RawCorner>),
    Group(&'a str),
    Ignored,
}

/// Read and parse an OBJ file
pub fn load_obj<P: AsRef<Path>>(path: P) -> Result<VertexPool, ObjError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    let pool = parse_obj(&text)?;
    debug!(
        "parsed {}: {} positions, {} normals, {} texcoords, {} shapes, {} faces",
        path.as_ref().display(),
        pool.positions.len(),
        pool.normals.len(),
        pool.texcoords.len(),
        pool.shapes.len(),
        pool.face_count()
    );
    Ok(pool)
}

/// Parse OBJ source text with default options
pub fn parse_obj(input: &str) -> Result<VertexPool, ObjError> {
    parse_obj_with(input, ObjOptions::default())
}

pub fn parse_obj_with(input: &str, options: ObjOptions) -> Result<VertexPool, ObjError> {
    let mut pool = VertexPool::new();
    let mut current: Option<Shape> = None;

    for (number, raw_line) in input.lines().enumerate() {
        let line = number + 1;
        let content = match raw_line.find('#') {
            Some(comment) => &raw_line[..comment],
            None => raw_line,
        }
        .trim();
        if content.is_empty() {
            continue;
        }

        match parse_statement(content, line)? {
            Statement::Position(p) => pool.positions.push(p),
            Statement::Normal(n) => pool.normals.push(n),
            Statement::TexCoord(t) => pool.texcoords.push(t),
            Statement::Group(name) => match current.as_mut() {
                Some(shape) if shape.faces.is_empty() => shape.name = name.to_string(),
                _ => {
                    if let Some(done) = current.take() {
                        pool.shapes.push(done);
                    }
                    current = Some(Shape {
                        name: name.to_string(),
                        faces: Vec::new(),
                    });
                }
            },
            Statement::Face(corners) => {
                if corners.len() < 3 {
                    return Err(ObjError::ShortFace {
                        line,
                        corners: corners.len(),
                    });
                }
                let resolved = corners
                    .iter()
                    .map(|corner| resolve_corner(corner, &pool, line))
                    .collect::<Result<Vec<_>, _>>()?;

                let shape = current.get_or_insert_with(Shape::default);
                if options.triangulate {
                    for i in 1..resolved.len() - 1 {
                        shape
                            .faces
                            .push(Face::triangle(resolved[0], resolved[i], resolved[i + 1]));
                    }
                } else {
                    shape.faces.push(Face { vertices: resolved });
                }
            }
            Statement::Ignored => {}
        }
    }

    if let Some(shape) = current {
        if !shape.faces.is_empty() {
            pool.shapes.push(shape);
        }
    }

    Ok(pool)
}

fn parse_statement(content: &str, line: usize) -> Result<Statement<'_>, ObjError> {
    let keyword_end = content
        .find(char::is_whitespace)
        .unwrap_or(content.len());
    let (keyword, body) = content.split_at(keyword_end);

    let parsed = match keyword {
        "v" => all_consuming(parse_floats)(body).and_then(|(_, values)| {
            expect_at_least(body, &values, 3)
                .map(|v| Statement::Position(Point3::new(v[0], v[1], v[2])))
        }),
        "vn" => all_consuming(parse_floats)(body).and_then(|(_, values)| {
            expect_at_least(body, &values, 3)
                .map(|v| Statement::Normal(Vector3::new(v[0], v[1], v[2])))
        }),
        "vt" => all_consuming(parse_floats)(body).and_then(|(_, values)| {
            expect_at_least(body, &values, 1).map(|v| {
                Statement::TexCoord(Vector2::new(v[0], v.get(1).copied().unwrap_or(0.0)))
            })
        }),
        "f" => all_consuming(parse_corners)(body).map(|(_, corners)| Statement::Face(corners)),
        "o" | "g" => Ok(Statement::Group(body.trim())),
        other => {
            trace!("line {line}: skipping `{other}` statement");
            Ok(Statement::Ignored)
        }
    };

    parsed.map_err(|_| ObjError::Syntax {
        line,
        keyword: keyword.to_string(),
    })
}

fn expect_at_least<'a>(
    input: &'a str,
    values: &[f32],
    count: usize,
) -> Result<Vec<f32>, nom::Err<nom::error::Error<&'a str>>> {
    if values.len() >= count {
        Ok(values.to_vec())
    } else {
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Count,
        )))
    }
}

fn parse_floats(input: &str) -> IResult<&str, Vec<f32>> {
    terminated(many1(preceded(space1, float)), space0)(input)
}

fn parse_corners(input: &str) -> IResult<&str, Vec<RawCorner>> {
    terminated(many1(preceded(space1, parse_corner)), space0)(input)
}

/// `p`, `p/t`, `p//n` or `p/t/n`
fn parse_corner(input: &str) -> IResult<&str, RawCorner> {
    let (input, position) = integer(input)?;
    let (input, tail) = opt(preceded(
        char('/'),
        pair(opt(integer), opt(preceded(char('/'), integer))),
    ))(input)?;
    let (texcoord, normal) = tail.unwrap_or((None, None));
    Ok((
        input,
        RawCorner {
            position,
            texcoord,
            normal,
        },
    ))
}

fn resolve_corner(
    corner: &RawCorner,
    pool: &VertexPool,
    line: usize,
) -> Result<IndexTriple, ObjError> {
    Ok(IndexTriple {
        position: resolve_index(corner.position, pool.positions.len(), Attribute::Position, line)?,
        texcoord: corner
            .texcoord
            .map(|i| resolve_index(i, pool.texcoords.len(), Attribute::TexCoord, line))
            .transpose()?,
        normal: corner
            .normal
            .map(|i| resolve_index(i, pool.normals.len(), Attribute::Normal, line))
            .transpose()?,
    })
}

/// Positive indices are 1-based; negative ones count back from the most
/// recently declared element. Upper bounds are checked by the mesh builder.
fn resolve_index(
    index: i64,
    len: usize,
    attribute: Attribute,
    line: usize,
) -> Result<u32, ObjError> {
    let too_large = || ObjError::IndexTooLarge {
        line,
        attribute,
        index,
    };
    match index {
        0 => Err(ObjError::ZeroIndex { line, attribute }),
        i if i > 0 => u32::try_from(i - 1).map_err(|_| too_large()),
        i => {
            let absolute = len as i64 + i;
            if absolute < 0 {
                Err(ObjError::RelativeIndex {
                    line,
                    attribute,
                    index: i,
                })
            } else {
                u32::try_from(absolute).map_err(|_| too_large())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "\
# a unit quad
o quad
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1 4/4/1
";

    #[test]
    fn test_parse_attributes() {
        let pool = parse_obj(QUAD).unwrap();
        assert_eq!(pool.positions.len(), 4);
        assert_eq!(pool.texcoords.len(), 4);
        assert_eq!(pool.normals.len(), 1);
        assert_eq!(pool.shapes.len(), 1);
        assert_eq!(pool.shapes[0].name, "quad");
    }

    #[test]
    fn test_quad_is_fan_triangulated() {
        let pool = parse_obj(QUAD).unwrap();
        let faces = &pool.shapes[0].faces;
        assert_eq!(faces.len(), 2);
        assert!(faces.iter().all(Face::is_triangle));
        let second: Vec<u32> = faces[1].vertices.iter().map(|t| t.position).collect();
        assert_eq!(second, vec![0, 2, 3]);
    }

    #[test]
    fn test_triangulation_can_be_disabled() {
        let pool = parse_obj_with(QUAD, ObjOptions { triangulate: false }).unwrap();
        assert_eq!(pool.shapes[0].faces.len(), 1);
        assert_eq!(pool.shapes[0].faces[0].vertices.len(), 4);
    }

    #[test]
    fn test_corner_forms() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nvt 0 0\nf 1 2//1 3/1\n";
        let pool = parse_obj(src).unwrap();
        let corners = &pool.shapes[0].faces[0].vertices;
        assert_eq!(corners[0], IndexTriple { position: 0, texcoord: None, normal: None });
        assert_eq!(corners[1], IndexTriple { position: 1, texcoord: None, normal: Some(0) });
        assert_eq!(corners[2], IndexTriple { position: 2, texcoord: Some(0), normal: None });
    }

    #[test]
    fn test_negative_indices_are_relative() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvn 0 0 1\nf -3/-1/-1 -2/-1/-1 -1/-1/-1\n";
        let pool = parse_obj(src).unwrap();
        let positions: Vec<u32> = pool.shapes[0].faces[0]
            .vertices
            .iter()
            .map(|t| t.position)
            .collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_groups_split_shapes() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\ng hull\nf 1 2 3\ng fin\nf 3 2 1\n";
        let pool = parse_obj(src).unwrap();
        let names: Vec<&str> = pool.shapes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["hull", "fin"]);
    }

    #[test]
    fn test_vt_without_v_defaults_to_zero() {
        let pool = parse_obj("vt 0.25\n").unwrap();
        assert_eq!(pool.texcoords[0], Vector2::new(0.25, 0.0));
    }

    #[test]
    fn test_ignores_material_statements() {
        let src = "mtllib sub.mtl\nusemtl hull\ns off\nv 1 2 3 # trailing\n";
        let pool = parse_obj(src).unwrap();
        assert_eq!(pool.positions, vec![Point3::new(1.0, 2.0, 3.0)]);
    }

    #[test]
    fn test_zero_index_rejected() {
        let err = parse_obj("v 0 0 0\nf 0 1 1\n").unwrap_err();
        assert!(matches!(err, ObjError::ZeroIndex { line: 2, .. }));
    }

    #[test]
    fn test_malformed_vertex_reports_line() {
        let err = parse_obj("v 0 0 0\nv 1 nope 0\n").unwrap_err();
        match err {
            ObjError::Syntax { line, keyword } => {
                assert_eq!(line, 2);
                assert_eq!(keyword, "v");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_short_face_rejected() {
        let err = parse_obj("v 0 0 0\nv 1 0 0\nf 1 2\n").unwrap_err();
        assert!(matches!(err, ObjError::ShortFace { corners: 2, .. }));
    }

    #[test]
    fn test_oversized_index_rejected() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvn 0 0 1\nf 4294967297/1/1 2/1/1 3/1/1\n";
        let err = parse_obj(src).unwrap_err();
        match err {
            ObjError::IndexTooLarge {
                line,
                attribute,
                index,
            } => {
                assert_eq!(line, 6);
                assert_eq!(attribute, Attribute::Position);
                assert_eq!(index, 4_294_967_297);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_largest_index_still_resolves() {
        assert_eq!(
            resolve_index(i64::from(u32::MAX) + 1, 0, Attribute::Normal, 1).unwrap(),
            u32::MAX
        );
        assert!(matches!(
            resolve_index(i64::from(u32::MAX) + 2, 0, Attribute::Normal, 1),
            Err(ObjError::IndexTooLarge { line: 1, .. })
        ));
    }
}
