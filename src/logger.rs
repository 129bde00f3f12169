// src/logger.rs
use env_logger::Builder;
use log::LevelFilter;

use crate::error::EngineError;

/// 描画まわりのログに使うターゲット名
pub const RENDERING_TARGET: &str = "rendering";

pub struct LoggerConfig {
    /// "rendering" ターゲットのログレベル
    pub rendering_level: LevelFilter,
    /// デフォルトのログレベル
    pub default_level: LevelFilter,
    /// ログをファイルに出力する場合のファイルパス（None なら標準エラー出力のみ）
    pub file_output: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            rendering_level: LevelFilter::Info,
            default_level: LevelFilter::Info,
            file_output: None,
        }
    }
}

impl LoggerConfig {
    /// 設定からロガーのビルダーを組み立てる。RUST_LOG があればそちらが優先される。
    fn builder(&self, env_filter: Option<&str>) -> Result<Builder, EngineError> {
        let mut builder = Builder::new();
        builder
            .filter(Some(RENDERING_TARGET), self.rendering_level)
            .filter(Some("wgpu_core"), LevelFilter::Warn)
            .filter(Some("wgpu_hal"), LevelFilter::Warn)
            .filter(None, self.default_level);
        if let Some(filters) = env_filter {
            builder.parse_filters(filters);
        }
        if let Some(file_path) = &self.file_output {
            let file = std::fs::File::create(file_path)
                .map_err(|e| EngineError::Logger(format!("{file_path}: {e}")))?;
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }
        Ok(builder)
    }
}

/// LoggerConfig を用いたロガーの初期化
pub fn init_logger_with_config(config: LoggerConfig) -> Result<(), EngineError> {
    let env_filter = std::env::var("RUST_LOG").ok();
    config
        .builder(env_filter.as_deref())?
        .try_init()
        .map_err(|e| EngineError::Logger(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritable_log_file_is_reported() {
        let config = LoggerConfig {
            file_output: Some("/nonexistent-dir/lightcycle.log".to_string()),
            ..Default::default()
        };
        let err = config.builder(None).err().expect("file creation should fail");
        assert!(matches!(err, EngineError::Logger(msg) if msg.contains("lightcycle.log")));
    }

    #[test]
    fn env_filters_are_accepted() {
        let config = LoggerConfig::default();
        assert!(config.builder(Some("lightcycle=debug,rendering=trace")).is_ok());
    }
}
