// src/error.rs

use std::path::PathBuf;

/// アセット読み込みのエラー。
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("asset not found: {}", .0.display())]
    NotFound(PathBuf),
}

/// 起動・描画まわりのエラー。
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),
    #[error("invalid window icon: {0}")]
    Icon(#[from] winit::window::BadIcon),
    #[error("surface creation failed: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("no compatible graphics adapter found")]
    NoAdapter,
    #[error("device request failed: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("surface does not support any texture format")]
    NoSurfaceFormat,
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error("logger setup failed: {0}")]
    Logger(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_errors_name_the_path() {
        let err = AssetError::NotFound(PathBuf::from("assets/gfx/tile/missing.png"));
        assert_eq!(err.to_string(), "asset not found: assets/gfx/tile/missing.png");

        let err = AssetError::Io {
            path: PathBuf::from("assets/shader_sprite.wgsl"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().starts_with("failed to read assets/shader_sprite.wgsl"));
    }

    #[test]
    fn asset_error_is_transparent_inside_engine_error() {
        let err: EngineError = AssetError::NotFound(PathBuf::from("icon.png")).into();
        assert_eq!(err.to_string(), "asset not found: icon.png");
    }
}
