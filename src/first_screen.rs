// src/first_screen.rs

use std::rc::Rc;

use crate::asset_manager::TextureWrap;
use crate::camera::OrthographicCamera;
use crate::config::{VIRTUAL_HEIGHT, VIRTUAL_WIDTH};
use crate::error::EngineError;
use crate::game::{Graphics, Screen, WindowState};
use crate::logger::RENDERING_TARGET;
use crate::renderer::{Frame, TextureHandle};
use crate::sprite_batch::SpriteBatch;
use crate::viewport::{enforce_aspect, AspectFix, FitViewport};

/// 背景タイル（asset_root からの相対パス）
pub const BG_TILE_PATH: &str = "gfx/tile/bgtile_indigo.png";

/// テクスチャを繰り返して world_size を埋めるときの UV の繰り返し回数。
pub fn tile_repeat(world_width: f32, world_height: f32, texture_width: u32, texture_height: u32) -> (f32, f32) {
    (
        world_width / texture_width as f32,
        world_height / texture_height as f32,
    )
}

/// 起動直後の画面。グリッドの背景をタイル状に敷き詰め、
/// ウィンドウを論理解像度の縦横比（縦長）に保つ。
#[derive(Default)]
pub struct FirstScreen {
    viewport: Option<FitViewport>,
    sprite_batch: Option<SpriteBatch>,
    bg_tile_texture: Option<Rc<TextureHandle>>,
}

impl FirstScreen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn viewport(&self) -> Option<&FitViewport> {
        self.viewport.as_ref()
    }

    fn apply_resize(&mut self, width: i32, height: i32, gfx: &mut Graphics) {
        let Some(viewport) = self.viewport.as_mut() else {
            return;
        };
        if let Some(rect) = fit_window(width, height, &mut gfx.window, viewport) {
            gfx.renderer.set_viewport(Some(rect));
        }
    }
}

/// ウィンドウサイズの判定。補正が必要ならウィンドウを戻す要求を出してビューポートは触らない。
/// 縦横比が正しいときだけビューポートを更新し、描画先の矩形（左上原点）を返す。
pub fn fit_window(
    width: i32,
    height: i32,
    window: &mut WindowState,
    viewport: &mut FitViewport,
) -> Option<[f32; 4]> {
    match enforce_aspect(width, height, VIRTUAL_WIDTH / VIRTUAL_HEIGHT) {
        AspectFix::Ignore => None,
        AspectFix::Correct { width: w, height: h } => {
            log::debug!(target: RENDERING_TARGET, "constraining window {width}x{height} -> {w}x{h}");
            window.request_windowed_mode(w, h);
            None
        }
        AspectFix::Accept { width: w, height: h } => {
            viewport.update(w, h, true);
            Some(viewport.pixel_rect(h))
        }
    }
}

impl Screen for FirstScreen {
    fn show(&mut self, gfx: &mut Graphics) -> Result<(), EngineError> {
        let mut viewport = FitViewport::new(VIRTUAL_WIDTH, VIRTUAL_HEIGHT, OrthographicCamera::new());
        viewport.apply(true);
        self.viewport = Some(viewport);

        self.sprite_batch = Some(SpriteBatch::new(&gfx.renderer));

        let texture = gfx.assets.load_texture(
            &gfx.renderer.device,
            &gfx.renderer.queue,
            BG_TILE_PATH,
            TextureWrap::Repeat,
        )?;
        self.bg_tile_texture = Some(texture);
        log::info!("first screen shown");
        Ok(())
    }

    fn resize(&mut self, width: i32, height: i32, gfx: &mut Graphics) {
        self.apply_resize(width, height, gfx);
    }

    fn render(&mut self, _delta: f32, gfx: &mut Graphics, frame: &mut Frame) {
        gfx.renderer.clear(frame, wgpu::Color::BLACK);

        let (Some(viewport), Some(batch), Some(texture)) = (
            self.viewport.as_mut(),
            self.sprite_batch.as_mut(),
            self.bg_tile_texture.as_ref(),
        ) else {
            return;
        };

        viewport.camera.update();
        batch.set_projection_matrix(viewport.camera.combined);

        let world_width = viewport.world_width();
        let world_height = viewport.world_height();
        let (u_repeat, v_repeat) = tile_repeat(world_width, world_height, texture.width, texture.height);

        batch.begin();
        batch.draw(texture, 0.0, 0.0, world_width, world_height, 0.0, 0.0, u_repeat, v_repeat);
        batch.end(&gfx.renderer, frame);
    }

    fn dispose(&mut self, gfx: &mut Graphics) {
        self.sprite_batch = None;
        if self.bg_tile_texture.take().is_some() {
            gfx.assets.unload_texture(BG_TILE_PATH);
        }
        log::info!("first screen disposed");
    }
}
