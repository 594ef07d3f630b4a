//! The viewer session: every piece of mutable viewer state in one place.
//!
//! A [`ViewerSession`] is driven from outside. Input arrives as
//! [`InputEvent`]s, time arrives through a [`FrameClock`], and assets arrive
//! once through [`ViewerSession::attach`]. Nothing in here touches the GPU, so
//! the whole interaction model can run headless.

use crate::{
    camera::{Camera, Projection, ZoomController},
    config::{PickPointer, ViewerConfig},
    data_structures::{animation::AnimationMixer, scene_graph::PivotGroup},
    input::{DragRotateController, InputEvent},
    pick::{Intersection, intersect_scene},
    resources::LoadedAssets,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewerState {
    /// Assets are loading, or failed to load. The pivot group is empty.
    Uninitialized,
    /// A textured model is attached.
    Interactive,
}

/// Source of the simulated time step applied to animation each frame.
pub trait FrameClock {
    fn next_delta(&mut self) -> f32;
}

/// Advances by the same amount every frame regardless of wall-clock time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FixedStep(pub f32);

impl FrameClock for FixedStep {
    fn next_delta(&mut self) -> f32 {
        self.0
    }
}

/// What one tick computed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub delta: f32,
    pub hits: Vec<Intersection>,
}

impl FrameReport {
    pub fn nearest(&self) -> Option<&Intersection> {
        self.hits.first()
    }
}

#[derive(Debug)]
pub struct ViewerSession {
    config: ViewerConfig,
    state: ViewerState,
    camera: Camera,
    projection: Projection,
    zoom: ZoomController,
    pivot: PivotGroup,
    mixer: Option<AnimationMixer>,
    drag: DragRotateController,
    viewport: (u32, u32),
}

impl ViewerSession {
    pub fn new(config: ViewerConfig, width: u32, height: u32) -> Self {
        let camera = Camera::new(config.camera_position);
        let projection = Projection::new(
            width,
            height,
            cgmath::Deg(config.fovy_degrees),
            config.znear,
            config.zfar,
        );
        let zoom = ZoomController::from_config(&config);
        Self {
            config,
            state: ViewerState::Uninitialized,
            camera,
            projection,
            zoom,
            pivot: PivotGroup::new(),
            mixer: None,
            drag: DragRotateController::new(),
            viewport: (width, height),
        }
    }

    pub fn state(&self) -> ViewerState {
        self.state
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn pivot(&self) -> &PivotGroup {
        &self.pivot
    }

    pub fn mixer(&self) -> Option<&AnimationMixer> {
        self.mixer.as_ref()
    }

    pub fn drag(&self) -> &DragRotateController {
        &self.drag
    }

    /// `width` and `height` are logical pixels, the unit cursor positions
    /// arrive in.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.viewport = (width, height);
        self.projection.resize(width, height);
    }

    /// Hands the loaded model to the pivot group and starts every clip.
    pub fn attach(&mut self, assets: LoadedAssets) {
        let LoadedAssets { scene, clips, material } = assets;
        self.mixer = if clips.is_empty() {
            None
        } else {
            Some(AnimationMixer::new(clips))
        };
        log::info!(
            "Attaching {} ({} meshes) with material {}",
            scene.name,
            scene.mesh_count(),
            material.name
        );
        self.pivot.attach(scene);
        self.state = ViewerState::Interactive;
    }

    /// Ends the loading phase. A failed load is logged and leaves the session
    /// `Uninitialized` with an empty pivot; ticking carries on regardless.
    /// Once a model is attached, later results are ignored.
    pub fn finish_loading(&mut self, result: anyhow::Result<LoadedAssets>) -> ViewerState {
        if self.state == ViewerState::Interactive {
            log::warn!("A model is already attached, ignoring the late load result");
            return self.state;
        }
        match result {
            Ok(assets) => self.attach(assets),
            Err(e) => log::error!("Asset loading failed, the viewer stays empty: {e:#}"),
        }
        self.state
    }

    /// Input is accepted in every state; before a model is attached the
    /// rotation still accumulates on the empty pivot.
    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::Pressed => self.drag.press(),
            InputEvent::Released => self.drag.release(),
            InputEvent::CursorMoved { x, y } => {
                if let Some((dx, dy)) = self.drag.cursor_moved(x, y) {
                    let k = self.config.rotate_speed;
                    self.pivot.rotate(dy * k, dx * k);
                }
            }
            InputEvent::Wheel { delta_y } => self.zoom.handle_wheel(&mut self.camera, delta_y),
        }
    }

    /// Screen point the pick ray goes through, in normalized device coordinates.
    pub fn pointer_ndc(&self) -> cgmath::Vector2<f32> {
        match (self.config.pick_pointer, self.drag.cursor()) {
            (PickPointer::Cursor, Some((x, y))) => {
                let (width, height) = self.viewport;
                cgmath::Vector2::new(
                    x / width.max(1) as f32 * 2.0 - 1.0,
                    -(y / height.max(1) as f32 * 2.0 - 1.0),
                )
            }
            _ => cgmath::Vector2::new(0.0, 0.0),
        }
    }

    /// One frame of simulation: advance animation, refresh world transforms,
    /// cast the pick ray.
    pub fn tick(&mut self, clock: &mut dyn FrameClock) -> FrameReport {
        let delta = clock.next_delta();
        if let Some(mixer) = self.mixer.as_mut() {
            mixer.update(delta);
            if let Some(model) = self.pivot.model_mut() {
                mixer.apply(model);
            }
        }
        self.pivot.update_world_transforms();

        let ray = self.camera.cast_ray(self.pointer_ndc(), &self.projection);
        let hits = match self.pivot.model() {
            Some(model) => intersect_scene(&ray, model),
            None => Vec::new(),
        };
        if let Some(nearest) = hits.first() {
            log::trace!(
                "Pick ray hits {} triangles, nearest {} at {:.3}",
                hits.len(),
                nearest.mesh,
                nearest.distance
            );
        }

        FrameReport { delta, hits }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ViewerSession {
        ViewerSession::new(ViewerConfig::default(), 800, 600)
    }

    #[test]
    fn starts_uninitialized_and_empty() {
        let mut session = session();
        assert_eq!(session.state(), ViewerState::Uninitialized);
        let report = session.tick(&mut FixedStep(0.01));
        assert!(report.hits.is_empty());
        assert!(session.pivot().is_empty());
        assert!(session.mixer().is_none());
    }

    #[test]
    fn drag_rotates_x_by_vertical_and_y_by_horizontal_motion() {
        let mut session = session();
        session.handle_input(InputEvent::CursorMoved { x: 10.0, y: 10.0 });
        session.handle_input(InputEvent::Pressed);
        session.handle_input(InputEvent::CursorMoved { x: 30.0, y: 0.0 });
        assert!((session.pivot().rotation_y - 0.1).abs() < 1e-6);
        assert!((session.pivot().rotation_x + 0.05).abs() < 1e-6);
    }

    #[test]
    fn origin_pointer_ignores_the_cursor() {
        let mut session = session();
        session.handle_input(InputEvent::CursorMoved { x: 0.0, y: 0.0 });
        assert_eq!(session.pointer_ndc(), cgmath::Vector2::new(0.0, 0.0));
    }

    #[test]
    fn cursor_pointer_maps_into_ndc() {
        let config = ViewerConfig {
            pick_pointer: PickPointer::Cursor,
            ..Default::default()
        };
        let mut session = ViewerSession::new(config, 800, 600);
        session.handle_input(InputEvent::CursorMoved { x: 0.0, y: 0.0 });
        assert_eq!(session.pointer_ndc(), cgmath::Vector2::new(-1.0, 1.0));
        session.handle_input(InputEvent::CursorMoved { x: 600.0, y: 450.0 });
        assert_eq!(session.pointer_ndc(), cgmath::Vector2::new(0.5, -0.5));
    }

    #[test]
    fn failed_load_leaves_the_session_empty() {
        let mut session = session();
        let state = session.finish_loading(Err(anyhow::anyhow!("texture missing")));
        assert_eq!(state, ViewerState::Uninitialized);
        for _ in 0..5 {
            assert!(session.tick(&mut FixedStep(0.01)).hits.is_empty());
        }
        assert!(session.pivot().is_empty());
        assert!(session.mixer().is_none());
    }

    #[test]
    fn fixed_step_ignores_wall_clock() {
        let mut clock = FixedStep(0.01);
        assert_eq!(clock.next_delta(), 0.01);
        assert_eq!(clock.next_delta(), 0.01);
    }
}
