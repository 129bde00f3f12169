// src/lib.rs
pub mod asset_manager;
pub mod camera;
pub mod config;
pub mod error;
pub mod first_screen;
pub mod game;
pub mod lightcycle_game;
pub mod logger;
pub mod renderer;
pub mod sprite_batch;
pub mod viewport;


pub use asset_manager::{AssetManager, TextureWrap};
pub use camera::OrthographicCamera;
pub use config::{DisplayMode, GameConfig, VIRTUAL_HEIGHT, VIRTUAL_WIDTH};
pub use error::{AssetError, EngineError};
pub use first_screen::FirstScreen;
pub use game::{run_game, Game, Graphics, Screen, ScreenContext, ScreenManager, WindowState};
pub use lightcycle_game::LightcycleGame;
pub use logger::{init_logger_with_config, LoggerConfig};
pub use renderer::{Frame, Renderer, TextureHandle};
pub use sprite_batch::SpriteBatch;
pub use viewport::{enforce_aspect, AspectFix, FitViewport};
