//! Application shell and event loop.
//!
//! [`App`] owns the window, the GPU [`Context`] and the [`Stage`] and feeds
//! winit events into them:
//!
//! 1. On `resumed` the window and context are created and the stage is bootstrapped
//! 2. All model loads are spawned at once; each result comes back as a [`StageEvent::Loaded`]
//! 3. Every `RedrawRequested` ticks the stage and requests the next redraw
//! 4. Resizes re-read the window geometry, double clicks toggle fullscreen

use std::{fmt::Debug, sync::Arc};

use instant::Instant;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, Touch, TouchPhase, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    camera::OrbitControls,
    config::StageConfig,
    context::Context,
    fullscreen::{DoubleClick, toggle_fullscreen},
    resources::{GltfLoader, LoadedModel},
    stage::Stage,
    viewport::WindowMetrics,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

pub enum StageEvent {
    /// The context finished initialising on the web, where it cannot be awaited in place.
    #[cfg(target_arch = "wasm32")]
    Initialized(Box<AppState>),
    Loaded {
        index: usize,
        result: anyhow::Result<LoadedModel>,
    },
}

impl Debug for StageEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(target_arch = "wasm32")]
            Self::Initialized(_) => f.write_str("Initialized"),
            Self::Loaded { index, result } => f
                .debug_struct("Loaded")
                .field("index", index)
                .field("ok", &result.is_ok())
                .finish(),
        }
    }
}

/// Everything that exists once the window has a GPU context.
#[derive(Debug)]
pub struct AppState {
    ctx: Context,
    stage: Stage,
    controls: OrbitControls,
    double_click: DoubleClick,
}

impl AppState {
    fn new(ctx: Context, config: StageConfig) -> Self {
        let double_click = DoubleClick::new(config.double_click_interval);
        let controls = OrbitControls::new(ctx.window().inner_size().height);
        let stage = Stage::new(config, ctx.window().logical_size());
        Self {
            ctx,
            stage,
            controls,
            double_click,
        }
    }

    fn resize(&mut self) {
        let window = self.ctx.window().clone();
        self.stage.resize(window.as_ref(), &mut self.ctx);
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<StageEvent>,
    // taken once the window is created
    config: Option<StageConfig>,
    state: Option<AppState>,
    last_time: Instant,
}

impl App {
    fn new(event_loop: &EventLoop<StageEvent>, config: StageConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config: Some(config),
            state: None,
            last_time: Instant::now(),
        })
    }

    /// Bootstrap the stage and spawn every model load.
    fn start(&mut self, mut state: AppState) {
        state.resize();

        let loader = GltfLoader::new(state.stage.config().asset_root.clone());
        for (index, load) in state.stage.issue_loads(&loader) {
            let proxy = self.proxy.clone();
            let task = async move {
                let result = load.await;
                if proxy.send_event(StageEvent::Loaded { index, result }).is_err() {
                    log::warn!("event loop closed before model {} finished loading", index);
                }
            };
            #[cfg(not(target_arch = "wasm32"))]
            self.async_runtime.spawn(task);
            #[cfg(target_arch = "wasm32")]
            wasm_bindgen_futures::spawn_local(task);
        }

        state.ctx.window().request_redraw();
        self.last_time = Instant::now();
        self.state = Some(state);
    }
}

impl ApplicationHandler<StageEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(config) = self.config.take() else {
            return;
        };

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title("gltf-stage");
        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;
            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(&config.canvas_id));
            match canvas {
                Some(canvas) => {
                    window_attributes = window_attributes.with_canvas(Some(canvas.unchecked_into()));
                }
                None => log::warn!("no element #{} found, winit creates its own canvas", config.canvas_id),
            }
        }
        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("could not create a window: {}", e);
                event_loop.exit();
                return;
            }
        };

        let init_future = async move {
            let ctx = Context::new(window, config.clear_colour).await?;
            Ok::<_, anyhow::Error>(AppState::new(ctx, config))
        };
        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(state) => self.start(state),
                Err(e) => {
                    log::error!("App initialization failed. Cannot create the main context: {:#}", e);
                    event_loop.exit();
                }
            }
        }
        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match init_future.await {
                    Ok(state) => {
                        if proxy.send_event(StageEvent::Initialized(Box::new(state))).is_err() {
                            log::error!("event loop closed during initialization");
                        }
                    }
                    Err(e) => {
                        log::error!("App initialization failed. Cannot create the main context: {:#}", e)
                    }
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: StageEvent) {
        match event {
            #[cfg(target_arch = "wasm32")]
            StageEvent::Initialized(state) => self.start(*state),
            StageEvent::Loaded { index, result } => match &mut self.state {
                Some(state) => state.stage.on_model_loaded(index, result),
                None => log::warn!("model {} loaded before the stage exists", index),
            },
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };
        state.controls.handle_window_events(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => state.resize(),
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();
                state.stage.tick(&mut state.controls, &mut state.ctx, dt);
                state.ctx.window().request_redraw();
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            }
            | WindowEvent::Touch(Touch {
                phase: TouchPhase::Started,
                ..
            }) => {
                if state.double_click.register(Instant::now()) {
                    toggle_fullscreen(state.ctx.window().as_ref());
                }
            }
            _ => {}
        }
    }
}

pub fn run(config: StageConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).try_init() {
            println!("Warning: Could not initialize logger: {}", e);
        };
    }
    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {}", e).into());
        }
    }

    let event_loop: EventLoop<StageEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;
    event_loop.run_app(&mut app)?;
    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    run(StageConfig::from_env()).map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
