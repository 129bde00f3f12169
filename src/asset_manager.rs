// src/asset_manager.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::rc::Rc;

use wgpu::{Device, ShaderModule};

use crate::error::AssetError;
use crate::renderer::TextureHandle;

/// テクスチャ座標が [0, 1] をはみ出したときの扱い。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureWrap {
    ClampToEdge,
    Repeat,
    MirroredRepeat,
}

impl From<TextureWrap> for wgpu::AddressMode {
    fn from(wrap: TextureWrap) -> Self {
        match wrap {
            TextureWrap::ClampToEdge => wgpu::AddressMode::ClampToEdge,
            TextureWrap::Repeat => wgpu::AddressMode::Repeat,
            TextureWrap::MirroredRepeat => wgpu::AddressMode::MirrorRepeat,
        }
    }
}

/// アセット管理用の構造体。
/// テクスチャとシェーダーをキャッシュして、重複読み込みを防ぎます。
/// パスはすべて root からの相対パスで指定する。
pub struct AssetManager {
    root: PathBuf,
    textures: HashMap<(String, TextureWrap), Rc<TextureHandle>>,
    shaders: HashMap<String, Rc<ShaderModule>>,
}

impl AssetManager {
    /// 新しい AssetManager を生成する
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            textures: HashMap::new(),
            shaders: HashMap::new(),
        }
    }

    /// 相対パスを root 基準のパスに解決する。ファイルが無ければ NotFound。
    pub fn resolve(&self, path: &str) -> Result<PathBuf, AssetError> {
        let full = self.root.join(path);
        if full.is_file() {
            Ok(full)
        } else {
            Err(AssetError::NotFound(full))
        }
    }

    /// 画像を RGBA8 で読み込む（GPU には送らない）。ウィンドウアイコンなどに使う。
    pub fn load_image(&self, path: &str) -> Result<image::RgbaImage, AssetError> {
        let full = self.resolve(path)?;
        let img = image::open(&full).map_err(|source| AssetError::Image { path: full, source })?;
        Ok(img.to_rgba8())
    }

    /// 指定されたパスのテクスチャをキャッシュから取得、もしくは新たに読み込みます。
    pub fn load_texture(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        path: &str,
        wrap: TextureWrap,
    ) -> Result<Rc<TextureHandle>, AssetError> {
        let key = (path.to_string(), wrap);
        if let Some(texture) = self.textures.get(&key) {
            return Ok(Rc::clone(texture));
        }

        let img = self.load_image(path)?;
        let handle = Rc::new(TextureHandle::from_rgba(device, queue, &img, wrap, Some(path)));
        log::info!("loaded texture {} ({}x{})", path, handle.width, handle.height);
        self.textures.insert(key, Rc::clone(&handle));
        Ok(handle)
    }

    /// 指定されたパスのシェーダーをキャッシュから取得、もしくは新たに読み込みます。
    pub fn load_shader(&mut self, device: &Device, path: &str) -> Result<Rc<ShaderModule>, AssetError> {
        if let Some(shader) = self.shaders.get(path) {
            return Ok(Rc::clone(shader));
        }
        let full = self.resolve(path)?;
        let shader_src = std::fs::read_to_string(&full)
            .map_err(|source| AssetError::Io { path: full, source })?;
        let shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(path),
            source: wgpu::ShaderSource::Wgsl(shader_src.into()),
        });
        let rc_shader = Rc::new(shader_module);
        self.shaders.insert(path.to_string(), Rc::clone(&rc_shader));
        Ok(rc_shader)
    }

    /// キャッシュからテクスチャを外す。他に参照が無ければ GPU リソースも解放される。
    pub fn unload_texture(&mut self, path: &str) -> bool {
        let before = self.textures.len();
        self.textures.retain(|(p, _), _| p != path);
        before != self.textures.len()
    }

    pub fn clear(&mut self) {
        self.textures.clear();
        self.shaders.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_asset_is_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let assets = AssetManager::new(tmp.path());
        match assets.resolve("gfx/tile/nope.png") {
            Err(AssetError::NotFound(path)) => assert!(path.ends_with("gfx/tile/nope.png")),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn load_image_decodes_png() {
        let tmp = tempfile::tempdir().unwrap();
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        img.save(tmp.path().join("tile.png")).unwrap();

        let assets = AssetManager::new(tmp.path());
        let loaded = assets.load_image("tile.png").unwrap();
        assert_eq!(loaded.dimensions(), (3, 2));
        assert_eq!(loaded.get_pixel(2, 1), &image::Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn garbage_file_is_an_image_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("broken.png"), b"not a png").unwrap();
        let assets = AssetManager::new(tmp.path());
        assert!(matches!(assets.load_image("broken.png"), Err(AssetError::Image { .. })));
    }

    #[test]
    fn fixture_directory_is_removed_after_use() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        std::fs::write(root.join("tile.png"), b"x").unwrap();
        assert!(AssetManager::new(&root).resolve("tile.png").is_ok());
        drop(tmp);
        assert!(!root.exists());
    }

    #[test]
    fn wrap_maps_to_address_mode() {
        assert_eq!(wgpu::AddressMode::from(TextureWrap::Repeat), wgpu::AddressMode::Repeat);
        assert_eq!(
            wgpu::AddressMode::from(TextureWrap::ClampToEdge),
            wgpu::AddressMode::ClampToEdge
        );
    }

    #[test]
    fn unloading_unknown_texture_is_a_no_op() {
        let tmp = tempfile::tempdir().unwrap();
        let mut assets = AssetManager::new(tmp.path());
        assert!(!assets.unload_texture("gfx/tile/bgtile_indigo.png"));
    }
}
