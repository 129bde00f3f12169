// src/lightcycle_game.rs

use crate::error::EngineError;
use crate::first_screen::FirstScreen;
use crate::game::{Game, Graphics, ScreenManager};

/// 全プラットフォーム共通のゲーム本体。起動すると最初の画面を表示する。
#[derive(Debug, Default)]
pub struct LightcycleGame;

impl Game for LightcycleGame {
    fn create(&mut self, screens: &mut ScreenManager, gfx: &mut Graphics) -> Result<(), EngineError> {
        log::info!("creating game");
        screens.set_screen(Box::new(FirstScreen::new()), gfx)
    }
}
