// デスクトップ版の起動処理。ウィンドウのサイズ・タイトル・アイコン・垂直同期を決める。
// 縦横比の維持は FirstScreen::resize 側で行う。

use lightcycle::{init_logger_with_config, run_game, GameConfig, LightcycleGame, LoggerConfig};

fn main() {
    if let Err(e) = init_logger_with_config(LoggerConfig::default()) {
        eprintln!("{e}");
    }

    if let Err(e) = run_game(LightcycleGame, GameConfig::desktop) {
        log::error!("failed to start: {e}");
        std::process::exit(1);
    }
}
