// src/sprite_batch.rs

use std::rc::Rc;

use cgmath::Matrix4;
use wgpu::util::DeviceExt;

use crate::logger::RENDERING_TARGET;
use crate::renderer::{Frame, Renderer, SpriteVertex, TextureHandle};

/// 同じテクスチャかどうかを判定する。連続する同一テクスチャの描画はまとめられる。
pub trait TextureKey: Clone {
    fn same_texture(&self, other: &Self) -> bool;
}

impl TextureKey for Rc<TextureHandle> {
    fn same_texture(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

/// 同じテクスチャで連続して描かれるクアッドのまとまり
#[derive(Debug, Clone)]
pub struct DrawRun<T> {
    pub texture: T,
    pub first_quad: u32,
    pub quad_count: u32,
}

/// CPU 側に溜めておくクアッドの列。
#[derive(Debug, Clone)]
pub struct SpriteQueue<T> {
    vertices: Vec<SpriteVertex>,
    runs: Vec<DrawRun<T>>,
}

impl<T> Default for SpriteQueue<T> {
    fn default() -> Self {
        Self {
            vertices: Vec::new(),
            runs: Vec::new(),
        }
    }
}

impl<T: TextureKey> SpriteQueue<T> {
    pub fn push(&mut self, texture: &T, quad: [SpriteVertex; 4]) {
        let quad_index = (self.vertices.len() / 4) as u32;
        self.vertices.extend_from_slice(&quad);
        match self.runs.last_mut() {
            Some(run) if run.texture.same_texture(texture) => run.quad_count += 1,
            _ => self.runs.push(DrawRun {
                texture: texture.clone(),
                first_quad: quad_index,
                quad_count: 1,
            }),
        }
    }

    pub fn vertices(&self) -> &[SpriteVertex] {
        &self.vertices
    }

    pub fn runs(&self) -> &[DrawRun<T>] {
        &self.runs
    }

    pub fn quad_count(&self) -> u32 {
        (self.vertices.len() / 4) as u32
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn clear(&mut self) {
        self.vertices.clear();
        self.runs.clear();
    }
}

/// 左下 (x, y) から w×h の矩形を作る。(u, v) が左下、(u2, v2) が右上に対応する。
/// UV が 1 を超えるとテクスチャのラップ設定に従って繰り返される。
#[allow(clippy::too_many_arguments)]
pub fn quad_vertices(x: f32, y: f32, w: f32, h: f32, u: f32, v: f32, u2: f32, v2: f32) -> [SpriteVertex; 4] {
    let (x2, y2) = (x + w, y + h);
    [
        SpriteVertex { position: [x, y], uv: [u, v] },    // 左下
        SpriteVertex { position: [x, y2], uv: [u, v2] },  // 左上
        SpriteVertex { position: [x2, y2], uv: [u2, v2] }, // 右上
        SpriteVertex { position: [x2, y], uv: [u2, v] },  // 右下
    ]
}

/// クアッド数ぶんのインデックス（0,1,2, 2,3,0 の繰り返し）
pub fn quad_indices(quad_count: u32) -> Vec<u32> {
    (0..quad_count)
        .flat_map(|i| {
            let base = i * 4;
            [base, base + 1, base + 2, base + 2, base + 3, base]
        })
        .collect()
}

/// begin / draw / end で 2D テクスチャを描くバッチ。
///
/// draw はクアッドを溜めるだけで、end でまとめて 1 つのレンダーパスに記録する。
pub struct SpriteBatch {
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    projection: [[f32; 4]; 4],
    queue: SpriteQueue<Rc<TextureHandle>>,
    drawing: bool,
}

impl SpriteBatch {
    pub fn new(renderer: &Renderer) -> Self {
        use cgmath::SquareMatrix;
        let projection: [[f32; 4]; 4] = Matrix4::<f32>::identity().into();
        let uniform_buffer = renderer.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("SpriteBatch Uniform Buffer"),
            contents: bytemuck::cast_slice(&projection),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = renderer.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("SpriteBatch Uniform BindGroup"),
            layout: renderer.uniform_bind_group_layout(),
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });
        Self {
            uniform_buffer,
            uniform_bind_group,
            projection,
            queue: SpriteQueue::default(),
            drawing: false,
        }
    }

    pub fn set_projection_matrix(&mut self, projection: Matrix4<f32>) {
        self.projection = projection.into();
    }

    pub fn begin(&mut self) {
        if self.drawing {
            log::warn!(target: RENDERING_TARGET, "SpriteBatch::begin called twice without end");
        }
        self.queue.clear();
        self.drawing = true;
    }

    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        texture: &Rc<TextureHandle>,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        u: f32,
        v: f32,
        u2: f32,
        v2: f32,
    ) {
        if !self.drawing {
            log::warn!(target: RENDERING_TARGET, "SpriteBatch::draw called outside begin/end");
            return;
        }
        self.queue.push(texture, quad_vertices(x, y, width, height, u, v, u2, v2));
    }

    /// 溜めたクアッドを frame に記録する。描画先は renderer のビューポート矩形。
    pub fn end(&mut self, renderer: &Renderer, frame: &mut Frame) {
        if !self.drawing {
            log::warn!(target: RENDERING_TARGET, "SpriteBatch::end called without begin");
            return;
        }
        self.drawing = false;

        let [vx, vy, vw, vh] = renderer.viewport_rect();
        if self.queue.is_empty() || vw <= 0.0 || vh <= 0.0 {
            self.queue.clear();
            return;
        }

        renderer
            .queue
            .write_buffer(&self.uniform_buffer, 0, bytemuck::cast_slice(&self.projection));

        let device = &renderer.device;
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("SpriteBatch Vertex Buffer"),
            contents: bytemuck::cast_slice(self.queue.vertices()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("SpriteBatch Index Buffer"),
            contents: bytemuck::cast_slice(&quad_indices(self.queue.quad_count())),
            usage: wgpu::BufferUsages::INDEX,
        });

        // レンダーパスより先に bind group を作っておく
        let bind_groups: Vec<wgpu::BindGroup> = self
            .queue
            .runs()
            .iter()
            .map(|run| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("SpriteBatch Texture BindGroup"),
                    layout: renderer.texture_bind_group_layout(),
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: wgpu::BindingResource::TextureView(&run.texture.view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::Sampler(&run.texture.sampler),
                        },
                    ],
                })
            })
            .collect();

        {
            let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("SpriteBatch Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &frame.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });

            pass.set_pipeline(renderer.sprite_pipeline());
            pass.set_viewport(vx, vy, vw, vh, 0.0, 1.0);
            pass.set_bind_group(0, &self.uniform_bind_group, &[]);
            pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);

            for (run, bind_group) in self.queue.runs().iter().zip(&bind_groups) {
                let start = run.first_quad * 6;
                let end = start + run.quad_count * 6;
                pass.set_bind_group(1, bind_group, &[]);
                pass.draw_indexed(start..end, 0, 0..1);
            }
        }

        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    impl TextureKey for u32 {
        fn same_texture(&self, other: &Self) -> bool {
            self == other
        }
    }

    #[test]
    fn quad_spans_rect_with_uv_corners() {
        let quad = quad_vertices(0.0, 0.0, 480.0, 800.0, 0.0, 0.0, 15.0, 25.0);
        assert_eq!(quad[0], SpriteVertex { position: [0.0, 0.0], uv: [0.0, 0.0] });
        assert_eq!(quad[1], SpriteVertex { position: [0.0, 800.0], uv: [0.0, 25.0] });
        assert_eq!(quad[2], SpriteVertex { position: [480.0, 800.0], uv: [15.0, 25.0] });
        assert_eq!(quad[3], SpriteVertex { position: [480.0, 0.0], uv: [15.0, 0.0] });
    }

    #[test]
    fn indices_cover_two_triangles_per_quad() {
        assert_eq!(quad_indices(2), vec![0, 1, 2, 2, 3, 0, 4, 5, 6, 6, 7, 4]);
        assert!(quad_indices(0).is_empty());
    }

    #[test]
    fn consecutive_draws_with_same_texture_share_a_run() {
        let mut queue = SpriteQueue::<u32>::default();
        let quad = quad_vertices(0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0);
        queue.push(&7, quad);
        queue.push(&7, quad);
        queue.push(&9, quad);
        queue.push(&7, quad);

        assert_eq!(queue.quad_count(), 4);
        assert_eq!(queue.vertices().len(), 16);
        let runs: Vec<(u32, u32, u32)> = queue
            .runs()
            .iter()
            .map(|r| (r.texture, r.first_quad, r.quad_count))
            .collect();
        assert_eq!(runs, vec![(7, 0, 2), (9, 2, 1), (7, 3, 1)]);

        queue.clear();
        assert!(queue.is_empty());
        assert!(queue.runs().is_empty());
    }
}
