// src/config.rs

use std::path::PathBuf;

/// 論理解像度の幅（縦長のポートレート画面）
pub const VIRTUAL_WIDTH: f32 = 480.0;
/// 論理解像度の高さ
pub const VIRTUAL_HEIGHT: f32 = 800.0;

/// 起動時のウィンドウサイズを論理解像度から何倍にするか
pub const WINDOW_SCALE: f32 = 1.25;

/// アセットのルートディレクトリを上書きする環境変数
pub const ASSET_ROOT_ENV: &str = "LIGHTCYCLE_ASSETS";

/// モニタの表示モード（論理ピクセル単位）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMode {
    pub width: u32,
    pub height: u32,
    /// リフレッシュレート（Hz）
    pub refresh_rate: u32,
}

impl DisplayMode {
    /// winit のモニタ情報から表示モードを作る。
    /// リフレッシュレートが取れない場合は 60Hz とみなす。
    pub fn from_monitor(monitor: &winit::monitor::MonitorHandle) -> Self {
        let size = monitor.size().to_logical::<u32>(monitor.scale_factor());
        let refresh_rate = monitor
            .refresh_rate_millihertz()
            .map(|mhz| (mhz + 500) / 1000)
            .unwrap_or(60);
        Self {
            width: size.width,
            height: size.height,
            refresh_rate,
        }
    }
}

impl Default for DisplayMode {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            refresh_rate: 60,
        }
    }
}

/// デスクトップ起動時の設定情報をまとめた構造体。
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// ウィンドウのタイトル
    pub title: String,
    /// ウィンドウの幅（論理サイズ）
    pub window_width: u32,
    /// ウィンドウの高さ（論理サイズ）
    pub window_height: u32,
    /// 垂直同期を使うかどうか
    pub vsync: bool,
    /// フォアグラウンド時の FPS 上限。0 なら制限しない
    pub foreground_fps: u32,
    /// ウィンドウのリサイズを許可するか
    pub resizable: bool,
    /// ウィンドウアイコン（asset_root からの相対パス）
    pub icon: Option<String>,
    /// アセットのルートディレクトリ
    pub asset_root: PathBuf,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::desktop(&DisplayMode::default())
    }
}

impl GameConfig {
    /// 指定された表示モードに合わせたデスクトップ用の設定を作る。
    ///
    /// ウィンドウサイズは論理解像度 × WINDOW_SCALE を、画面外にはみ出さないよう
    /// 表示モードのサイズでクランプしたもの。
    pub fn desktop(display: &DisplayMode) -> Self {
        let (window_width, window_height) = initial_window_size(display);
        Self {
            title: "Lightcycle".to_string(),
            window_width,
            window_height,
            vsync: true,
            // 小数のリフレッシュレート（59.94Hz など）に合わせるため +1
            foreground_fps: display.refresh_rate + 1,
            resizable: true,
            icon: Some("lightcycle_blue.png".to_string()),
            asset_root: asset_root_from_env(),
        }
    }
}

/// 論理解像度から起動時のウィンドウサイズを計算する。
pub fn initial_window_size(display: &DisplayMode) -> (u32, u32) {
    let width = (VIRTUAL_WIDTH * WINDOW_SCALE) as u32;
    let height = (VIRTUAL_HEIGHT * WINDOW_SCALE) as u32;
    (width.min(display.width), height.min(display.height))
}

fn asset_root_from_env() -> PathBuf {
    std::env::var_os(ASSET_ROOT_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("assets"))
}
