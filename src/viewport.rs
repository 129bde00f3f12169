// src/viewport.rs

use crate::camera::OrthographicCamera;

/// リサイズ要求に対する判定結果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectFix {
    /// 幅または高さが 0 以下。何もしない
    Ignore,
    /// 縦横比が崩れているので、このサイズにウィンドウを戻す
    Correct { width: u32, height: u32 },
    /// 縦横比が正しいので、このサイズでビューポートを更新してよい
    Accept { width: u32, height: u32 },
}

/// 要求されたウィンドウサイズを target_aspect（幅 / 高さ）に合わせる。
///
/// 横に広すぎる場合は高さから幅を、縦に長すぎる場合は幅から高さを求める。
pub fn enforce_aspect(width: i32, height: i32, target_aspect: f32) -> AspectFix {
    if width <= 0 || height <= 0 {
        return AspectFix::Ignore;
    }

    let current_aspect = width as f32 / height as f32;
    let mut new_width = width;
    let mut new_height = height;

    if current_aspect > target_aspect {
        new_width = (height as f32 * target_aspect).round() as i32;
    } else if current_aspect < target_aspect {
        new_height = (width as f32 / target_aspect).round() as i32;
    }

    // 極端に細いウィンドウでも 1px は残す
    let new_width = new_width.max(1) as u32;
    let new_height = new_height.max(1) as u32;

    if new_width != width as u32 || new_height != height as u32 {
        AspectFix::Correct {
            width: new_width,
            height: new_height,
        }
    } else {
        AspectFix::Accept {
            width: new_width,
            height: new_height,
        }
    }
}

/// ワールドの縦横比を保ったまま画面に収めるビューポート（余白はレターボックス）。
///
/// screen_* は左下原点のピクセル座標。
#[derive(Debug, Clone)]
pub struct FitViewport {
    world_width: f32,
    world_height: f32,
    screen_x: i32,
    screen_y: i32,
    screen_width: i32,
    screen_height: i32,
    pub camera: OrthographicCamera,
}

impl FitViewport {
    pub fn new(world_width: f32, world_height: f32, camera: OrthographicCamera) -> Self {
        Self {
            world_width,
            world_height,
            screen_x: 0,
            screen_y: 0,
            screen_width: 0,
            screen_height: 0,
            camera,
        }
    }

    pub fn world_width(&self) -> f32 {
        self.world_width
    }

    pub fn world_height(&self) -> f32 {
        self.world_height
    }

    /// (x, y, width, height)
    pub fn screen_bounds(&self) -> (i32, i32, i32, i32) {
        (self.screen_x, self.screen_y, self.screen_width, self.screen_height)
    }

    /// 画面サイズに合わせてスクリーン上の領域を計算し直し、apply する。
    pub fn update(&mut self, screen_width: u32, screen_height: u32, center_camera: bool) {
        let (sw, sh) = (screen_width as f32, screen_height as f32);
        let target_ratio = sh / sw;
        let source_ratio = self.world_height / self.world_width;
        let scale = if target_ratio > source_ratio {
            sw / self.world_width
        } else {
            sh / self.world_height
        };

        let viewport_width = (self.world_width * scale).round() as i32;
        let viewport_height = (self.world_height * scale).round() as i32;

        self.screen_x = (screen_width as i32 - viewport_width) / 2;
        self.screen_y = (screen_height as i32 - viewport_height) / 2;
        self.screen_width = viewport_width;
        self.screen_height = viewport_height;

        self.apply(center_camera);
    }

    /// カメラをワールドサイズに合わせる。center_camera ならワールドの中心に置く。
    pub fn apply(&mut self, center_camera: bool) {
        self.camera.viewport_width = self.world_width;
        self.camera.viewport_height = self.world_height;
        if center_camera {
            self.camera.position.x = self.world_width / 2.0;
            self.camera.position.y = self.world_height / 2.0;
        }
        self.camera.update();
    }

    /// wgpu の set_viewport 用の矩形（左上原点）。
    pub fn pixel_rect(&self, surface_height: u32) -> [f32; 4] {
        let top = surface_height as i32 - self.screen_y - self.screen_height;
        [
            self.screen_x as f32,
            top as f32,
            self.screen_width as f32,
            self.screen_height as f32,
        ]
    }
}
