/// ASCII rasterizer acting as the graphics device for terminal rendering
use crossterm::{
    style::{Color, Print, ResetColor, SetForegroundColor},
    QueueableCommand,
};
use log::warn;
use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use std::io::Write;
use uw3d_core::mesh::VertexSemantic;
use uw3d_core::{
    BufferHandle, Camera, FrameUniforms, GraphicsDevice, LightDescriptor, MeshBuffers, Transform,
};

/// Character luminosity ramp for depth/shading (darkest to lightest)
const LUMINOSITY_RAMP: &[char] = &[' ', '.', ':', '-', '=', '+', '*', '#', '%', '@'];

/// Intensity used when a scene has no lights: a lamp at the eye
const HEADLIGHT_AMBIENT: f32 = 0.1;

/// One vertex after the model transform
struct Transformed {
    local: Point3<f32>,
    world: Point3<f32>,
    normal: Vector3<f32>,
}

/// ASCII renderer that rasterizes uploaded vertex buffers into terminal cells
pub struct AsciiRenderer {
    width: usize,
    height: usize,
    depth_buffer: Vec<f32>,
    char_buffer: Vec<char>,
    buffers: Vec<MeshBuffers>,
    uniforms: FrameUniforms,
    transform: Matrix4<f32>,
}

impl AsciiRenderer {
    pub fn new(width: usize, height: usize) -> Self {
        let size = width * height;
        Self {
            width,
            height,
            depth_buffer: vec![f32::INFINITY; size],
            char_buffer: vec![' '; size],
            buffers: Vec::new(),
            uniforms: FrameUniforms::default(),
            transform: Matrix4::identity(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Resize the target; uploaded buffers are kept
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.depth_buffer = vec![f32::INFINITY; width * height];
        self.char_buffer = vec![' '; width * height];
    }

    pub fn clear(&mut self) {
        self.depth_buffer.fill(f32::INFINITY);
        self.char_buffer.fill(' ');
    }

    /// Character at a cell, for inspection
    pub fn cell(&self, x: usize, y: usize) -> char {
        self.char_buffer[y * self.width + x]
    }

    /// Number of cells covered by geometry
    pub fn covered_cells(&self) -> usize {
        self.char_buffer.iter().filter(|c| **c != ' ').count()
    }

    /// Light intensity in `0..=1` at a surface point
    pub fn shade(&self, position: &Point3<f32>, normal: &Vector3<f32>) -> f32 {
        let eye = self.uniforms.camera_position;
        let to_eye = (eye - position)
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(Vector3::zeros);

        if self.uniforms.lights.is_empty() {
            return (HEADLIGHT_AMBIENT + normal.dot(&to_eye).max(0.0)).min(1.0);
        }

        let intensity: f32 = self
            .uniforms
            .lights
            .iter()
            .map(|light| light_contribution(light, position, normal, &to_eye))
            .sum();
        intensity.clamp(0.0, 1.0)
    }

    fn transform_vertex(
        &self,
        record: &[f32],
        normal_matrix: &Matrix3<f32>,
        position_offset: usize,
        normal_offset: usize,
    ) -> Transformed {
        let p = &record[position_offset..position_offset + 3];
        let n = &record[normal_offset..normal_offset + 3];
        let local = Point3::new(p[0], p[1], p[2]);
        Transformed {
            local,
            world: self.transform.transform_point(&local),
            normal: normal_matrix * Vector3::new(n[0], n[1], n[2]),
        }
    }

    fn rasterize_triangle(&mut self, coords: &[(f32, f32, f32); 3], character: char) {
        let (v0, v1, v2) = (coords[0], coords[1], coords[2]);

        // Bounding box
        let min_x = v0.0.min(v1.0).min(v2.0).floor() as i64;
        let max_x = v0.0.max(v1.0).max(v2.0).ceil() as i64;
        let min_y = v0.1.min(v1.1).min(v2.1).floor() as i64;
        let max_y = v0.1.max(v1.1).max(v2.1).ceil() as i64;

        // Clip to screen bounds
        let min_x = min_x.max(0);
        let max_x = max_x.min(self.width as i64 - 1);
        let min_y = min_y.max(0);
        let max_y = max_y.min(self.height as i64 - 1);

        // Scanline rasterization
        for y in min_y..=max_y {
            for x in min_x..=max_x {
                let px = x as f32 + 0.5;
                let py = y as f32 + 0.5;

                // Barycentric coordinates
                if let Some((w0, w1, w2)) =
                    barycentric((v0.0, v0.1), (v1.0, v1.1), (v2.0, v2.1), (px, py))
                {
                    if w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0 {
                        // Interpolate depth
                        let depth = w0 * v0.2 + w1 * v1.2 + w2 * v2.2;

                        let idx = y as usize * self.width + x as usize;
                        if depth < self.depth_buffer[idx] {
                            self.depth_buffer[idx] = depth;
                            self.char_buffer[idx] = character;
                        }
                    }
                }
            }
        }
    }

    pub fn draw<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for y in 0..self.height {
            for x in 0..self.width {
                let idx = y * self.width + x;
                let c = self.char_buffer[idx];

                // Deep water blues for dim cells, sand tones for lit ones
                let color = match c {
                    ' ' | '.' | ':' => Color::DarkBlue,
                    '-' | '=' => Color::Blue,
                    '+' | '*' => Color::Cyan,
                    '#' | '%' | '@' => Color::Yellow,
                    _ => Color::White,
                };

                writer.queue(SetForegroundColor(color))?;
                writer.queue(Print(c))?;
            }
            if y + 1 < self.height {
                writer.queue(Print("\r\n"))?;
            }
        }
        writer.queue(ResetColor)?;
        Ok(())
    }
}

impl GraphicsDevice for AsciiRenderer {
    fn upload(&mut self, buffers: &MeshBuffers) -> BufferHandle {
        self.buffers.push(buffers.clone());
        BufferHandle((self.buffers.len() - 1) as u32)
    }

    fn set_uniforms(&mut self, uniforms: &FrameUniforms) {
        self.uniforms = uniforms.clone();
    }

    fn set_transform(&mut self, transform: &Matrix4<f32>) {
        self.transform = *transform;
    }

    fn draw_triangles(&mut self, buffer: BufferHandle, first: usize, count: usize) {
        let Some(mesh) = self.buffers.get(buffer.0 as usize) else {
            panic!("draw with unknown buffer handle {buffer:?}");
        };
        let layout = mesh.layout;
        let (Some(position), Some(normal)) = (
            layout.attribute(VertexSemantic::Position),
            layout.attribute(VertexSemantic::Normal),
        ) else {
            return;
        };
        let (position_offset, normal_offset) = (position.offset, normal.offset);

        let linear = self.transform.fixed_view::<3, 3>(0, 0).into_owned();
        let normal_matrix = match linear.try_inverse() {
            Some(inverse) => inverse.transpose(),
            None => {
                warn!("singular model matrix, skipping draw");
                return;
            }
        };
        let mvp = Transform::mvp_matrix(
            &self.transform,
            &self.uniforms.view,
            &self.uniforms.projection,
        );

        let end = (first + count).min(mesh.vertex_count());
        // Records are copied out so rasterizing can borrow `self` mutably
        let records: Vec<f32> =
            mesh.vertices[first.min(end) * layout.stride()..end * layout.stride()].to_vec();

        let (width, height) = (self.width() as u32, self.height() as u32);
        for triangle in records.chunks_exact(layout.stride() * 3) {
            let corners: [Transformed; 3] = std::array::from_fn(|i| {
                let record = &triangle[i * layout.stride()..(i + 1) * layout.stride()];
                self.transform_vertex(record, &normal_matrix, position_offset, normal_offset)
            });

            let mut screen = [(0.0, 0.0, 0.0); 3];
            let mut visible = true;
            for (slot, corner) in screen.iter_mut().zip(corners.iter()) {
                match Camera::project_to_screen(&corner.local, &mvp, width, height) {
                    Some(coords) => *slot = coords,
                    None => {
                        visible = false;
                        break;
                    }
                }
            }
            if !visible {
                continue; // Triangle is clipped
            }

            // Flat shading from the averaged corner normals
            let normal = (corners[0].normal + corners[1].normal + corners[2].normal)
                .try_normalize(f32::EPSILON)
                .unwrap_or_else(Vector3::zeros);
            let centroid = Point3::from(
                (corners[0].world.coords + corners[1].world.coords + corners[2].world.coords) / 3.0,
            );
            let brightness = self.shade(&centroid, &normal);

            // Map brightness to character, skipping the blank first entry
            let steps = (LUMINOSITY_RAMP.len() - 2) as f32;
            let char_index = 1 + (brightness * steps).round() as usize;
            let character = LUMINOSITY_RAMP[char_index.min(LUMINOSITY_RAMP.len() - 1)];

            self.rasterize_triangle(&screen, character);
        }
    }
}

/// Ambient, diffuse and specular contribution of one light
fn light_contribution(
    light: &LightDescriptor,
    position: &Point3<f32>,
    normal: &Vector3<f32>,
    to_eye: &Vector3<f32>,
) -> f32 {
    let params = light.params();
    let luminance = |c: &Vector3<f32>| (c.x + c.y + c.z) / 3.0;

    let to_light = light.direction_to_light(position);
    let attenuation = light.attenuation(position);

    let ambient = params.ambient_strength * luminance(&params.ambient_color);
    let diffuse = normal.dot(&to_light).max(0.0);
    let reflected = -to_light - normal * 2.0 * normal.dot(&-to_light);
    let specular = if diffuse > 0.0 {
        params.specular_strength * reflected.dot(to_eye).max(0.0).powf(params.specular_phong)
    } else {
        0.0
    };

    ambient + (diffuse + specular) * attenuation * luminance(&params.color)
}

/// Calculate barycentric coordinates for a point in a triangle
fn barycentric(
    v0: (f32, f32),
    v1: (f32, f32),
    v2: (f32, f32),
    p: (f32, f32),
) -> Option<(f32, f32, f32)> {
    let denom = (v1.1 - v2.1) * (v0.0 - v2.0) + (v2.0 - v1.0) * (v0.1 - v2.1);

    if denom.abs() < 1e-6 {
        return None;
    }

    let w0 = ((v1.1 - v2.1) * (p.0 - v2.0) + (v2.0 - v1.0) * (p.1 - v2.1)) / denom;
    let w1 = ((v2.1 - v0.1) * (p.0 - v2.0) + (v0.0 - v2.0) * (p.1 - v2.1)) / denom;
    let w2 = 1.0 - w0 - w1;

    Some((w0, w1, w2))
}
