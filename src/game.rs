use std::time::{Duration, Instant};

use winit::{
    dpi::{LogicalSize, PhysicalSize},
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::{Icon, Window, WindowBuilder},
};

use crate::asset_manager::AssetManager;
use crate::config::{DisplayMode, GameConfig};
use crate::error::EngineError;
use crate::logger::RENDERING_TARGET;
use crate::renderer::{Frame, Renderer};

/// ウィンドウの現在サイズと、画面側から出されたサイズ変更要求。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowState {
    width: u32,
    height: u32,
    requested: Option<(u32, u32)>,
}

impl WindowState {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            requested: None,
        }
    }

    /// バックバッファのサイズ（物理ピクセル）
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// ウィンドウをこのサイズに変更するよう要求する。
    /// 実際の変更はコールバックを抜けた後に行われ、再び resize が呼ばれる。
    pub fn request_windowed_mode(&mut self, width: u32, height: u32) {
        self.requested = Some((width, height));
    }

    pub fn take_request(&mut self) -> Option<(u32, u32)> {
        self.requested.take()
    }
}

/// 画面に渡される描画コンテキスト。
pub struct Graphics {
    pub renderer: Renderer,
    pub assets: AssetManager,
    pub window: WindowState,
}

impl Graphics {
    pub fn new(renderer: Renderer, assets: AssetManager, size: PhysicalSize<u32>) -> Self {
        Self {
            renderer,
            assets,
            window: WindowState::new(size.width, size.height),
        }
    }

    pub fn set_windowed_mode(&mut self, width: u32, height: u32) {
        self.window.request_windowed_mode(width, height);
    }
}

/// 画面が受け取るコンテキスト。ScreenManager はこれを通してウィンドウサイズを知る。
pub trait ScreenContext {
    /// render に渡される描画先
    type Frame;

    fn window(&self) -> &WindowState;
}

impl ScreenContext for Graphics {
    type Frame = Frame;

    fn window(&self) -> &WindowState {
        &self.window
    }
}

/// 1 つの画面（タイトル、ゲーム本編など）。
pub trait Screen<C: ScreenContext = Graphics> {
    /// 画面が表示されるときに呼ばれる。リソースはここで作る。
    fn show(&mut self, gfx: &mut C) -> Result<(), EngineError>;
    /// ウィンドウサイズが変わったときに呼ばれる。
    fn resize(&mut self, width: i32, height: i32, gfx: &mut C);
    /// 毎フレームの描画処理。
    fn render(&mut self, delta: f32, gfx: &mut C, frame: &mut C::Frame);
    fn pause(&mut self) {}
    fn resume(&mut self) {}
    /// 別の画面に切り替わるときに呼ばれる。
    fn hide(&mut self) {}
    /// リソースを解放する。
    fn dispose(&mut self, _gfx: &mut C) {}
}

/// 現在の画面を保持し、切り替え時のライフサイクルを管理する。
pub struct ScreenManager<C: ScreenContext = Graphics> {
    screen: Option<Box<dyn Screen<C>>>,
}

impl<C: ScreenContext> Default for ScreenManager<C> {
    fn default() -> Self {
        Self { screen: None }
    }
}

impl<C: ScreenContext> ScreenManager<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 画面を切り替える。古い画面は hide され（dispose はされない）、
    /// 新しい画面は show の後に現在のウィンドウサイズで resize される。
    pub fn set_screen(&mut self, mut screen: Box<dyn Screen<C>>, gfx: &mut C) -> Result<(), EngineError> {
        if let Some(old) = self.screen.as_mut() {
            old.hide();
        }
        screen.show(gfx)?;
        let (width, height) = gfx.window().size();
        screen.resize(width as i32, height as i32, gfx);
        self.screen = Some(screen);
        Ok(())
    }

    pub fn resize(&mut self, width: i32, height: i32, gfx: &mut C) {
        if let Some(screen) = self.screen.as_mut() {
            screen.resize(width, height, gfx);
        }
    }

    pub fn render(&mut self, delta: f32, gfx: &mut C, frame: &mut C::Frame) {
        if let Some(screen) = self.screen.as_mut() {
            screen.render(delta, gfx, frame);
        }
    }

    pub fn pause(&mut self) {
        if let Some(screen) = self.screen.as_mut() {
            screen.pause();
        }
    }

    pub fn resume(&mut self) {
        if let Some(screen) = self.screen.as_mut() {
            screen.resume();
        }
    }

    /// 現在の画面を hide してから dispose する。
    pub fn dispose(&mut self, gfx: &mut C) {
        if let Some(mut screen) = self.screen.take() {
            screen.hide();
            screen.dispose(gfx);
        }
    }
}

/// ゲーム全体のライフサイクル。起動時に最初の画面を設定する。
pub trait Game {
    fn create(&mut self, screens: &mut ScreenManager, gfx: &mut Graphics) -> Result<(), EngineError>;
}

/// FPS 上限から 1 フレームの目標時間を求める。0 なら制限なし。
pub fn frame_duration(foreground_fps: u32) -> Option<Duration> {
    (foreground_fps > 0).then(|| Duration::from_secs_f64(1.0 / foreground_fps as f64))
}

/// 今フレームを描くかどうかと、次に待つべき制御フローを決める。
/// 上限がある場合は次の締め切りまで眠る。
pub fn pace_frame(now: Instant, last_frame_time: Instant, target: Option<Duration>) -> (bool, ControlFlow) {
    match target {
        None => (true, ControlFlow::Poll),
        Some(target) if now.duration_since(last_frame_time) < target => {
            (false, ControlFlow::WaitUntil(last_frame_time + target))
        }
        Some(target) => (true, ControlFlow::WaitUntil(now + target)),
    }
}

/// モニタ情報を元に設定を作り、ウィンドウを開いてゲームを実行する。
///
/// 起動時のエラーだけが返る。イベントループに入った後は戻らない。
pub fn run_game<G, F>(mut game: G, configure: F) -> Result<(), EngineError>
where
    G: 'static + Game,
    F: FnOnce(&DisplayMode) -> GameConfig,
{
    let event_loop = EventLoop::new();
    let display = event_loop
        .primary_monitor()
        .map(|monitor| DisplayMode::from_monitor(&monitor))
        .unwrap_or_default();
    let config = configure(&display);
    log::info!(
        "display {}x{}@{}Hz, window {}x{}",
        display.width,
        display.height,
        display.refresh_rate,
        config.window_width,
        config.window_height
    );

    let mut assets = AssetManager::new(&config.asset_root);
    let icon = config.icon.as_deref().and_then(|path| match load_icon(&assets, path) {
        Ok(icon) => Some(icon),
        Err(e) => {
            log::warn!("window icon not set: {e}");
            None
        }
    });

    let window = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(LogicalSize::new(config.window_width, config.window_height))
        .with_resizable(config.resizable)
        .with_window_icon(icon)
        .build(&event_loop)?;

    let renderer = pollster::block_on(Renderer::new(&window, config.vsync, &mut assets))?;
    let mut gfx = Graphics::new(renderer, assets, window.inner_size());
    let mut screens = ScreenManager::new();
    game.create(&mut screens, &mut gfx)?;
    apply_window_request(&window, &mut gfx);

    let target_frame_duration = frame_duration(config.foreground_fps);
    let mut last_frame_time = Instant::now();
    let mut last_render_time = Instant::now();
    let mut paused = false;

    event_loop.run(move |event, _, control_flow| {
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::Resized(new_size) => {
                    if let Some(corrected) = on_resize(new_size, &mut gfx, &mut screens) {
                        log::debug!(target: RENDERING_TARGET, "setting window size to {corrected:?}");
                        window.set_inner_size(corrected);
                    }
                }
                WindowEvent::ScaleFactorChanged { new_inner_size, .. } => {
                    // この中ではウィンドウを直接リサイズせず、new_inner_size を書き換える
                    if let Some(corrected) = on_resize(*new_inner_size, &mut gfx, &mut screens) {
                        *new_inner_size = corrected;
                    }
                }
                WindowEvent::CloseRequested => {
                    *control_flow = ControlFlow::Exit;
                }
                _ => {}
            },
            Event::Suspended => {
                if !paused {
                    paused = true;
                    screens.pause();
                }
            }
            Event::Resumed => {
                if paused {
                    paused = false;
                    screens.resume();
                }
            }
            Event::MainEventsCleared => {
                if matches!(*control_flow, ControlFlow::ExitWithCode(_)) {
                    return;
                }
                let now = Instant::now();
                let (redraw, next) = pace_frame(now, last_frame_time, target_frame_duration);
                if redraw {
                    last_frame_time = now;
                    window.request_redraw();
                }
                *control_flow = next;
            }
            Event::RedrawRequested(_) => {
                let now = Instant::now();
                let delta = (now - last_render_time).as_secs_f32();
                last_render_time = now;

                match gfx.renderer.begin_frame() {
                    Ok(Some(mut frame)) => {
                        screens.render(delta, &mut gfx, &mut frame);
                        gfx.renderer.present(frame);
                        apply_window_request(&window, &mut gfx);
                    }
                    Ok(None) => {}
                    Err(e) => {
                        log::error!(target: RENDERING_TARGET, "unrecoverable surface error: {e}");
                        *control_flow = ControlFlow::Exit;
                    }
                }
            }
            Event::LoopDestroyed => {
                log::info!("shutting down");
                screens.dispose(&mut gfx);
                gfx.assets.clear();
            }
            _ => {}
        }
    })
}

/// サーフェスと画面をリサイズし、画面が補正を求めたらそのサイズを返す。
fn on_resize(size: PhysicalSize<u32>, gfx: &mut Graphics, screens: &mut ScreenManager) -> Option<PhysicalSize<u32>> {
    gfx.renderer.resize(size);
    gfx.window.set_size(size.width, size.height);
    screens.resize(size.width as i32, size.height as i32, gfx);
    gfx.window
        .take_request()
        .map(|(width, height)| PhysicalSize::new(width, height))
}

fn apply_window_request(window: &Window, gfx: &mut Graphics) {
    if let Some((width, height)) = gfx.window.take_request() {
        log::debug!(target: RENDERING_TARGET, "setting window size to {width}x{height}");
        window.set_inner_size(PhysicalSize::new(width, height));
    }
}

fn load_icon(assets: &AssetManager, path: &str) -> Result<Icon, EngineError> {
    let img = assets.load_image(path)?;
    let (width, height) = img.dimensions();
    Ok(Icon::from_rgba(img.into_raw(), width, height)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_request_is_taken_once() {
        let mut state = WindowState::new(1000, 800);
        assert_eq!(state.take_request(), None);

        state.request_windowed_mode(480, 800);
        state.request_windowed_mode(600, 1000);
        assert_eq!(state.take_request(), Some((600, 1000)));
        assert_eq!(state.take_request(), None);
        // 要求しただけではサイズは変わらない
        assert_eq!(state.size(), (1000, 800));
    }

    #[test]
    fn set_size_tracks_backbuffer() {
        let mut state = WindowState::default();
        state.set_size(600, 1000);
        assert_eq!(state.size(), (600, 1000));
    }

    #[test]
    fn frame_duration_follows_fps_cap() {
        assert_eq!(frame_duration(0), None);
        let d = frame_duration(61).unwrap();
        assert!((d.as_secs_f64() - 1.0 / 61.0).abs() < 1e-9);
    }

    #[test]
    fn uncapped_loop_polls_and_draws() {
        let now = Instant::now();
        assert_eq!(pace_frame(now, now, None), (true, ControlFlow::Poll));
    }

    #[test]
    fn capped_loop_sleeps_until_next_deadline() {
        let target = Duration::from_millis(16);
        let last = Instant::now();
        let now = last + Duration::from_millis(5);
        assert_eq!(
            pace_frame(now, last, Some(target)),
            (false, ControlFlow::WaitUntil(last + target))
        );
    }

    #[test]
    fn capped_loop_draws_once_deadline_passes() {
        let target = Duration::from_millis(16);
        let last = Instant::now();
        let now = last + Duration::from_millis(20);
        // 描いた後も Poll には戻らず、次の締め切りまで待つ
        assert_eq!(
            pace_frame(now, last, Some(target)),
            (true, ControlFlow::WaitUntil(now + target))
        );
    }

    use std::cell::RefCell;
    use std::rc::Rc;

    struct TestContext {
        window: WindowState,
    }

    impl ScreenContext for TestContext {
        type Frame = ();

        fn window(&self) -> &WindowState {
            &self.window
        }
    }

    struct RecordingScreen {
        name: &'static str,
        log: Rc<RefCell<Vec<String>>>,
        fail_show: bool,
    }

    impl RecordingScreen {
        fn boxed(name: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Box<Self> {
            Box::new(Self {
                name,
                log: Rc::clone(log),
                fail_show: false,
            })
        }

        fn record(&self, event: String) {
            self.log.borrow_mut().push(format!("{}:{}", self.name, event));
        }
    }

    impl Screen<TestContext> for RecordingScreen {
        fn show(&mut self, _gfx: &mut TestContext) -> Result<(), EngineError> {
            self.record("show".into());
            if self.fail_show {
                return Err(EngineError::NoAdapter);
            }
            Ok(())
        }

        fn resize(&mut self, width: i32, height: i32, _gfx: &mut TestContext) {
            self.record(format!("resize {width}x{height}"));
        }

        fn render(&mut self, _delta: f32, _gfx: &mut TestContext, _frame: &mut ()) {
            self.record("render".into());
        }

        fn pause(&mut self) {
            self.record("pause".into());
        }

        fn resume(&mut self) {
            self.record("resume".into());
        }

        fn hide(&mut self) {
            self.record("hide".into());
        }

        fn dispose(&mut self, _gfx: &mut TestContext) {
            self.record("dispose".into());
        }
    }

    #[test]
    fn set_screen_hides_old_then_shows_and_resizes_new() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut ctx = TestContext {
            window: WindowState::new(600, 1000),
        };
        let mut screens = ScreenManager::<TestContext>::new();

        screens.set_screen(RecordingScreen::boxed("first", &log), &mut ctx).unwrap();
        screens.set_screen(RecordingScreen::boxed("second", &log), &mut ctx).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "first:show",
                "first:resize 600x1000",
                "first:hide",
                "second:show",
                "second:resize 600x1000",
            ]
        );
    }

    #[test]
    fn callbacks_reach_current_screen_and_dispose_hides_first() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut ctx = TestContext {
            window: WindowState::new(480, 800),
        };
        let mut screens = ScreenManager::<TestContext>::new();
        screens.set_screen(RecordingScreen::boxed("s", &log), &mut ctx).unwrap();
        log.borrow_mut().clear();

        screens.render(0.016, &mut ctx, &mut ());
        screens.pause();
        screens.resume();
        screens.resize(1000, 800, &mut ctx);
        screens.dispose(&mut ctx);
        // 破棄後は何も届かない
        screens.render(0.016, &mut ctx, &mut ());

        assert_eq!(
            *log.borrow(),
            vec!["s:render", "s:pause", "s:resume", "s:resize 1000x800", "s:hide", "s:dispose"]
        );
    }

    #[test]
    fn failed_show_is_reported_and_not_resized() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut ctx = TestContext {
            window: WindowState::new(480, 800),
        };
        let mut screens = ScreenManager::<TestContext>::new();
        let mut broken = RecordingScreen::boxed("broken", &log);
        broken.fail_show = true;

        assert!(matches!(screens.set_screen(broken, &mut ctx), Err(EngineError::NoAdapter)));
        assert_eq!(*log.borrow(), vec!["broken:show"]);
    }
}
