// src/camera.rs

use cgmath::{Matrix4, Point3, Vector3};

/// cgmath の ortho は OpenGL の深度範囲 [-1, 1] を前提にしているので、
/// wgpu の [0, 1] に変換する。
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// 2D 用の正射影カメラ。
///
/// `position` はカメラの中心（ワールド座標）。`update()` を呼ぶまで
/// `combined` は更新されない。
#[derive(Debug, Clone)]
pub struct OrthographicCamera {
    pub position: Point3<f32>,
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub zoom: f32,
    pub near: f32,
    pub far: f32,
    pub projection: Matrix4<f32>,
    pub view: Matrix4<f32>,
    /// projection * view
    pub combined: Matrix4<f32>,
}

impl Default for OrthographicCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl OrthographicCamera {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            position: Point3::new(0.0, 0.0, 0.0),
            viewport_width: 0.0,
            viewport_height: 0.0,
            zoom: 1.0,
            near: 0.0,
            far: 100.0,
            projection: Matrix4::identity(),
            view: Matrix4::identity(),
            combined: Matrix4::identity(),
        }
    }

    /// 射影行列とビュー行列を計算し直し、combined を更新する。
    pub fn update(&mut self) {
        let half_w = self.zoom * self.viewport_width / 2.0;
        let half_h = self.zoom * self.viewport_height / 2.0;
        self.projection = OPENGL_TO_WGPU_MATRIX
            * cgmath::ortho(-half_w, half_w, -half_h, half_h, self.near, self.far);
        // -Z 方向を向く
        self.view = Matrix4::look_at_rh(
            self.position,
            self.position + Vector3::new(0.0, 0.0, -1.0),
            Vector3::unit_y(),
        );
        self.combined = self.projection * self.view;
    }

    /// シェーダーの uniform に渡せる形
    pub fn combined_array(&self) -> [[f32; 4]; 4] {
        self.combined.into()
    }
}
