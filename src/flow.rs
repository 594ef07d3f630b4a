//! Application event loop.
//!
//! [`run`] opens a window, sets up the GPU [`Context`] and then kicks off the
//! asset pipeline exactly once. Everything the user sees or does is routed
//! through the [`ViewerSession`]; this module only translates winit events and
//! draws what the session holds.
//!
//! # Lifecycle
//!
//! 1. `resumed` creates the window and the context (blocking natively, via
//!    `spawn_local` + [`ViewerEvent::Initialized`] on the web)
//! 2. the asset pipeline runs in the background and reports back with
//!    [`ViewerEvent::AssetsLoaded`]
//! 3. every `RedrawRequested` ticks the session, uploads transforms and
//!    camera, draws and schedules the next redraw

use std::{fmt::Debug, iter, sync::Arc};

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::Window,
};

use crate::{
    config::ViewerConfig,
    context::Context,
    data_structures::model::{DrawModel, Model},
    input::{InputEvent, logical_viewport},
    resources::{AssetLocation, LoadedAssets, load_viewer_assets},
    session::{FixedStep, ViewerSession, ViewerState},
};

#[derive(Debug)]
pub struct AppState {
    pub(crate) ctx: Context,
    session: ViewerSession,
    model: Option<Model>,
    clock: FixedStep,
    is_surface_configured: bool,
}

impl AppState {
    async fn new(window: Arc<Window>, config: ViewerConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, &config).await?;
        let clock = FixedStep(config.animation_step);
        let (width, height) =
            logical_viewport(ctx.config.width, ctx.config.height, ctx.window.scale_factor());
        let session = ViewerSession::new(config, width, height);
        Ok(Self {
            ctx,
            session,
            model: None,
            clock,
            is_surface_configured: false,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if self.ctx.resize(width, height) {
            let (width, height) = logical_viewport(width, height, self.ctx.window.scale_factor());
            self.session.resize(width, height);
            self.is_surface_configured = true;
        }
    }

    /// Uploads the model, then lets the session settle the load. An upload
    /// failure counts as a failed load, so the pivot stays empty.
    fn finish_loading(&mut self, result: anyhow::Result<LoadedAssets>) {
        let result = result.and_then(|assets| {
            let model = Model::from_scene(
                &self.ctx.device,
                &self.ctx.queue,
                &assets.scene,
                &assets.material,
                &self.ctx.material_layout,
            )?;
            self.model = Some(model);
            Ok(assets)
        });
        if self.session.finish_loading(result) == ViewerState::Interactive {
            log::info!("Viewer is interactive");
        }
    }

    fn update(&mut self) {
        let _report = self.session.tick(&mut self.clock);
        self.ctx
            .write_camera(self.session.camera(), self.session.projection());
        if let (Some(model), Some(root)) = (&self.model, self.session.pivot().model()) {
            model.write_to_buffers(&self.ctx.queue, root);
        }
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        // Rendering requires the surface to be configured
        if !self.is_surface_configured {
            return Ok(());
        }

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.ctx.pipeline);
            if let Some(model) = &self.model {
                // Empty buffers cannot be sliced.
                for mesh in model.meshes.iter().filter(|mesh| mesh.is_drawable()) {
                    render_pass.set_vertex_buffer(1, mesh.instance_buffer.slice(..));
                    render_pass.draw_mesh_instanced(
                        mesh,
                        &model.material,
                        0..1,
                        &self.ctx.camera.bind_group,
                        &self.ctx.light.bind_group,
                    );
                }
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

pub enum ViewerEvent {
    /// The context finished setting up on the web.
    #[allow(dead_code)]
    Initialized(anyhow::Result<Box<AppState>>),
    AssetsLoaded(anyhow::Result<LoadedAssets>),
}

impl Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialized(state) => f
                .debug_tuple("Initialized")
                .field(&state.as_ref().map(|_| "AppState"))
                .finish(),
            Self::AssetsLoaded(assets) => f
                .debug_tuple("AssetsLoaded")
                .field(&assets.as_ref().map(|a| &a.scene.name))
                .finish(),
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: winit::event_loop::EventLoopProxy<ViewerEvent>,
    config: ViewerConfig,
    state: Option<AppState>,
    window_requested: bool,
    assets_requested: bool,
}

impl App {
    fn new(event_loop: &EventLoop<ViewerEvent>, config: ViewerConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            state: None,
            window_requested: false,
            assets_requested: false,
        })
    }

    fn on_initialized(&mut self, mut state: AppState) {
        let size = state.ctx.window.inner_size();
        state.resize(size.width, size.height);
        state.ctx.window.request_redraw();
        self.state = Some(state);
        self.request_assets();
    }

    /// Starts the model -> texture -> override pipeline. Runs at most once.
    fn request_assets(&mut self) {
        if self.assets_requested {
            return;
        }
        self.assets_requested = true;

        let location = match AssetLocation::from_config(&self.config) {
            Ok(location) => location,
            Err(e) => {
                log::error!("No asset location: {e:#}");
                return;
            }
        };
        let model_path = self.config.model_path.clone();
        let texture_path = self.config.texture_path.clone();
        let proxy = self.proxy.clone();
        log::info!("Loading {} from {}", model_path, location.root());
        let load = async move {
            let result = load_viewer_assets(&location, &model_path, &texture_path).await;
            if proxy.send_event(ViewerEvent::AssetsLoaded(result)).is_err() {
                log::warn!("Event loop closed before the assets arrived");
            }
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            self.async_runtime.spawn(load);
        }
        #[cfg(target_arch = "wasm32")]
        {
            wasm_bindgen_futures::spawn_local(load);
        }
    }
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window_requested {
            return;
        }
        self.window_requested = true;

        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes()
            .with_title("pivot-viewer")
            .with_transparent(true);

        #[cfg(target_arch = "wasm32")]
        {
            use winit::platform::web::WindowAttributesExtWebSys;

            window_attributes = window_attributes.with_append(true);
            if let Some(size) = browser_viewport() {
                window_attributes = window_attributes.with_inner_size(size);
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Could not create a window: {e}");
                event_loop.exit();
                return;
            }
        };

        let init_future = AppState::new(window, self.config.clone());

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(init_future) {
                Ok(state) => self.on_initialized(state),
                Err(e) => {
                    log::error!("App initialization failed: {e:#}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let state = init_future.await.map(Box::new);
                if proxy.send_event(ViewerEvent::Initialized(state)).is_err() {
                    log::warn!("Event loop closed during initialization");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            ViewerEvent::Initialized(Ok(state)) => self.on_initialized(*state),
            ViewerEvent::Initialized(Err(e)) => {
                log::error!("App initialization failed: {e:#}");
                event_loop.exit();
            }
            ViewerEvent::AssetsLoaded(result) => match &mut self.state {
                Some(state) => state.finish_loading(result),
                None => log::warn!("Assets arrived without a context, dropping them"),
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

        let scale_factor = state.ctx.window.scale_factor();
        if let Some(input) =
            InputEvent::from_window_event(&event, scale_factor, self.config.wheel_line_height)
        {
            state.session.handle_input(input);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::RedrawRequested => {
                state.update();
                match state.render() {
                    Ok(_) => (),
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn browser_viewport() -> Option<winit::dpi::LogicalSize<f64>> {
    let window = web_sys::window()?;
    let width = window.inner_width().ok()?.as_f64()?;
    let height = window.inner_height().ok()?.as_f64()?;
    Some(winit::dpi::LogicalSize::new(width, height))
}

pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        if let Err(e) = env_logger::try_init() {
            eprintln!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        console_log::init_with_level(log::Level::Info)
            .map_err(|e| anyhow::anyhow!("could not initialize logger: {e}"))?;
    }

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;

    let mut app = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}
