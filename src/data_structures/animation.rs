//! Keyframe animation: clips and the mixer that plays them.
//!
//! The mixer owns one [`ClipAction`] per clip. All actions start playing as
//! soon as the mixer is built and loop forever. Each call to
//! [`AnimationMixer::update`] advances every action by the same simulated
//! delta; [`AnimationMixer::apply`] then writes the sampled poses into the
//! local transforms of the targeted scene nodes.

use std::collections::HashMap;

use cgmath::{InnerSpace, VectorSpace};

use crate::{
    data_structures::scene_graph::SceneNode,
    resources::animation::{Interpolation, Keyframes},
};

/// One animated property of one node.
#[derive(Clone, Debug)]
pub struct Channel {
    pub node: usize,
    pub interpolation: Interpolation,
    pub timestamps: Vec<f32>,
    pub keyframes: Keyframes,
}

/// An animation clip: a named set of channels sharing one timeline.
#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub channels: Vec<Channel>,
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: String, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|c| c.timestamps.last().copied())
            .fold(0.0, f32::max);
        Self {
            name,
            channels,
            duration,
        }
    }
}

/// Where a segment lookup landed: the keyframe before `time`, the one after it
/// and the normalized position between them.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Segment {
    prev: usize,
    next: usize,
    t: f32,
    span: f32,
}

fn find_segment(timestamps: &[f32], time: f32) -> Segment {
    let last = timestamps.len() - 1;
    if time <= timestamps[0] {
        return Segment { prev: 0, next: 0, t: 0.0, span: 0.0 };
    }
    if time >= timestamps[last] {
        return Segment { prev: last, next: last, t: 0.0, span: 0.0 };
    }
    // First keyframe strictly after `time`; guaranteed in 1..=last here.
    let next = timestamps.partition_point(|&ts| ts <= time);
    let prev = next - 1;
    let span = timestamps[next] - timestamps[prev];
    let t = if span > 0.0 { (time - timestamps[prev]) / span } else { 0.0 };
    Segment { prev, next, t, span }
}

fn hermite<V>(p0: V, m0: V, p1: V, m1: V, t: f32) -> V
where
    V: VectorSpace<Scalar = f32>,
{
    let t2 = t * t;
    let t3 = t2 * t;
    p0 * (2.0 * t3 - 3.0 * t2 + 1.0)
        + m0 * (t3 - 2.0 * t2 + t)
        + p1 * (-2.0 * t3 + 3.0 * t2)
        + m1 * (t3 - t2)
}

fn sample_vector(
    values: &[cgmath::Vector3<f32>],
    interpolation: Interpolation,
    seg: Segment,
) -> Option<cgmath::Vector3<f32>> {
    match interpolation {
        Interpolation::Step => values.get(seg.prev).copied(),
        Interpolation::Linear => {
            let a = *values.get(seg.prev)?;
            let b = *values.get(seg.next)?;
            Some(a.lerp(b, seg.t))
        }
        Interpolation::CubicSpline => {
            let p0 = *values.get(seg.prev * 3 + 1)?;
            if seg.prev == seg.next {
                return Some(p0);
            }
            let m0 = *values.get(seg.prev * 3 + 2)? * seg.span;
            let p1 = *values.get(seg.next * 3 + 1)?;
            let m1 = *values.get(seg.next * 3)? * seg.span;
            Some(hermite(p0, m0, p1, m1, seg.t))
        }
    }
}

fn sample_rotation(
    values: &[cgmath::Quaternion<f32>],
    interpolation: Interpolation,
    seg: Segment,
) -> Option<cgmath::Quaternion<f32>> {
    match interpolation {
        Interpolation::Step => values.get(seg.prev).copied(),
        Interpolation::Linear => {
            let a = *values.get(seg.prev)?;
            let b = *values.get(seg.next)?;
            Some(a.slerp(b, seg.t))
        }
        Interpolation::CubicSpline => {
            let p0 = *values.get(seg.prev * 3 + 1)?;
            if seg.prev == seg.next {
                return Some(p0.normalize());
            }
            let m0 = *values.get(seg.prev * 3 + 2)? * seg.span;
            let p1 = *values.get(seg.next * 3 + 1)?;
            let m1 = *values.get(seg.next * 3)? * seg.span;
            Some(hermite(p0, m0, p1, m1, seg.t).normalize())
        }
    }
}

/// Sampled value of a single channel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sample {
    Translation(cgmath::Vector3<f32>),
    Rotation(cgmath::Quaternion<f32>),
    Scale(cgmath::Vector3<f32>),
}

impl Channel {
    pub fn sample(&self, time: f32) -> Option<Sample> {
        if self.timestamps.is_empty() {
            return None;
        }
        let seg = find_segment(&self.timestamps, time);
        match &self.keyframes {
            Keyframes::Translation(values) => {
                sample_vector(values, self.interpolation, seg).map(Sample::Translation)
            }
            Keyframes::Rotation(values) => {
                sample_rotation(values, self.interpolation, seg).map(Sample::Rotation)
            }
            Keyframes::Scale(values) => sample_vector(values, self.interpolation, seg).map(Sample::Scale),
            Keyframes::Other => None,
        }
    }
}

/// Playback state of one clip.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipAction {
    pub clip: usize,
    /// Total simulated seconds this action has been advanced by.
    pub elapsed: f32,
    pub playing: bool,
}

impl ClipAction {
    /// Clip-local time, wrapped into `[0, duration)`.
    pub fn local_time(&self, duration: f32) -> f32 {
        if duration > 0.0 {
            self.elapsed.rem_euclid(duration)
        } else {
            0.0
        }
    }
}

/// Per-node accumulator so that several clips driving the same property blend
/// with equal weight.
#[derive(Default)]
struct PoseAccumulator {
    translation: Option<(cgmath::Vector3<f32>, u32)>,
    rotation: Option<(cgmath::Quaternion<f32>, u32)>,
    scale: Option<(cgmath::Vector3<f32>, u32)>,
}

impl PoseAccumulator {
    fn add(&mut self, sample: Sample) {
        match sample {
            Sample::Translation(v) => {
                self.translation = Some(match self.translation {
                    None => (v, 1),
                    Some((acc, n)) => (acc.lerp(v, 1.0 / (n + 1) as f32), n + 1),
                })
            }
            Sample::Rotation(q) => {
                self.rotation = Some(match self.rotation {
                    None => (q, 1),
                    Some((acc, n)) => (acc.slerp(q, 1.0 / (n + 1) as f32), n + 1),
                })
            }
            Sample::Scale(v) => {
                self.scale = Some(match self.scale {
                    None => (v, 1),
                    Some((acc, n)) => (acc.lerp(v, 1.0 / (n + 1) as f32), n + 1),
                })
            }
        }
    }
}

#[derive(Debug)]
pub struct AnimationMixer {
    clips: Vec<AnimationClip>,
    actions: Vec<ClipAction>,
}

impl AnimationMixer {
    /// Builds a mixer with every clip already playing.
    pub fn new(clips: Vec<AnimationClip>) -> Self {
        let actions = (0..clips.len())
            .map(|clip| ClipAction {
                clip,
                elapsed: 0.0,
                playing: true,
            })
            .collect();
        for clip in &clips {
            log::info!("Playing clip {} ({:.2}s)", clip.name, clip.duration);
        }
        Self { clips, actions }
    }

    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    pub fn actions(&self) -> &[ClipAction] {
        &self.actions
    }

    pub fn update(&mut self, delta: f32) {
        self.actions
            .iter_mut()
            .filter(|action| action.playing)
            .for_each(|action| action.elapsed += delta);
    }

    /// Writes the current pose of every playing clip into `root`'s subtree.
    pub fn apply(&self, root: &mut SceneNode) {
        let mut poses: HashMap<usize, PoseAccumulator> = HashMap::new();
        for action in self.actions.iter().filter(|a| a.playing) {
            let Some(clip) = self.clips.get(action.clip) else {
                continue;
            };
            let time = action.local_time(clip.duration);
            for channel in &clip.channels {
                if let Some(sample) = channel.sample(time) {
                    poses.entry(channel.node).or_default().add(sample);
                }
            }
        }
        if poses.is_empty() {
            return;
        }
        root.traverse_mut(&mut |node| {
            let Some(pose) = node.index.and_then(|i| poses.get(&i)) else {
                return;
            };
            if let Some((translation, _)) = pose.translation {
                node.local.position = translation;
            }
            if let Some((rotation, _)) = pose.rotation {
                node.local.rotation = rotation;
            }
            if let Some((scale, _)) = pose.scale {
                node.local.scale = scale;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_structures::instance::Instance;
    use cgmath::{Quaternion, Rotation3, Vector3};

    fn translation_clip(name: &str, node: usize, to: Vector3<f32>, interpolation: Interpolation) -> AnimationClip {
        AnimationClip::new(
            name.to_string(),
            vec![Channel {
                node,
                interpolation,
                timestamps: vec![0.0, 1.0],
                keyframes: Keyframes::Translation(vec![Vector3::new(0.0, 0.0, 0.0), to]),
            }],
        )
    }

    fn node(index: usize) -> SceneNode {
        SceneNode {
            index: Some(index),
            ..Default::default()
        }
    }

    #[test]
    fn duration_is_latest_keyframe() {
        let clip = AnimationClip::new(
            "two".into(),
            vec![
                Channel {
                    node: 0,
                    interpolation: Interpolation::Linear,
                    timestamps: vec![0.0, 0.5],
                    keyframes: Keyframes::Scale(vec![Vector3::new(1.0, 1.0, 1.0); 2]),
                },
                Channel {
                    node: 1,
                    interpolation: Interpolation::Step,
                    timestamps: vec![0.25, 2.0],
                    keyframes: Keyframes::Scale(vec![Vector3::new(1.0, 1.0, 1.0); 2]),
                },
            ],
        );
        assert_eq!(clip.duration, 2.0);
    }

    #[test]
    fn linear_translation_is_interpolated() {
        let clip = translation_clip("move", 0, Vector3::new(2.0, 0.0, 0.0), Interpolation::Linear);
        assert_eq!(
            clip.channels[0].sample(0.25),
            Some(Sample::Translation(Vector3::new(0.5, 0.0, 0.0)))
        );
    }

    #[test]
    fn step_holds_previous_keyframe() {
        let clip = translation_clip("move", 0, Vector3::new(2.0, 0.0, 0.0), Interpolation::Step);
        assert_eq!(
            clip.channels[0].sample(0.99),
            Some(Sample::Translation(Vector3::new(0.0, 0.0, 0.0)))
        );
    }

    #[test]
    fn samples_clamp_outside_the_keyframe_range() {
        let clip = translation_clip("move", 0, Vector3::new(2.0, 0.0, 0.0), Interpolation::Linear);
        assert_eq!(
            clip.channels[0].sample(-1.0),
            Some(Sample::Translation(Vector3::new(0.0, 0.0, 0.0)))
        );
        assert_eq!(
            clip.channels[0].sample(5.0),
            Some(Sample::Translation(Vector3::new(2.0, 0.0, 0.0)))
        );
    }

    #[test]
    fn cubic_spline_passes_through_keyframes() {
        let channel = Channel {
            node: 0,
            interpolation: Interpolation::CubicSpline,
            timestamps: vec![0.0, 1.0],
            keyframes: Keyframes::Translation(vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(3.0, 0.0, 0.0),
                Vector3::new(0.0, 0.0, 0.0),
            ]),
        };
        assert_eq!(channel.sample(0.0), Some(Sample::Translation(Vector3::new(1.0, 0.0, 0.0))));
        assert_eq!(channel.sample(1.0), Some(Sample::Translation(Vector3::new(3.0, 0.0, 0.0))));
        // Zero tangents make the midpoint the plain average.
        assert_eq!(channel.sample(0.5), Some(Sample::Translation(Vector3::new(2.0, 0.0, 0.0))));
    }

    #[test]
    fn rotation_is_slerped() {
        let channel = Channel {
            node: 0,
            interpolation: Interpolation::Linear,
            timestamps: vec![0.0, 1.0],
            keyframes: Keyframes::Rotation(vec![
                Quaternion::from_angle_y(cgmath::Deg(0.0)),
                Quaternion::from_angle_y(cgmath::Deg(90.0)),
            ]),
        };
        let Some(Sample::Rotation(q)) = channel.sample(0.5) else {
            panic!("expected a rotation");
        };
        let expected = Quaternion::from_angle_y(cgmath::Deg(45.0));
        assert!((q - expected).magnitude() < 1e-5);
    }

    #[test]
    fn every_clip_starts_playing() {
        let mixer = AnimationMixer::new(vec![
            translation_clip("a", 0, Vector3::new(1.0, 0.0, 0.0), Interpolation::Linear),
            translation_clip("b", 1, Vector3::new(1.0, 0.0, 0.0), Interpolation::Linear),
        ]);
        assert_eq!(mixer.actions().len(), 2);
        assert!(mixer.actions().iter().all(|a| a.playing && a.elapsed == 0.0));
    }

    #[test]
    fn update_advances_by_fixed_delta_and_loops() {
        let mut mixer = AnimationMixer::new(vec![translation_clip(
            "a",
            0,
            Vector3::new(1.0, 0.0, 0.0),
            Interpolation::Linear,
        )]);
        for _ in 0..150 {
            mixer.update(0.01);
        }
        let action = &mixer.actions()[0];
        assert!((action.elapsed - 1.5).abs() < 1e-4);
        assert!((action.local_time(mixer.clips()[0].duration) - 0.5).abs() < 1e-4);
    }

    #[test]
    fn apply_writes_local_transform_of_targeted_node() {
        let mut root = SceneNode::container("Scene", vec![node(0), node(1)]);
        let mut mixer = AnimationMixer::new(vec![translation_clip(
            "a",
            1,
            Vector3::new(4.0, 0.0, 0.0),
            Interpolation::Linear,
        )]);
        mixer.update(0.5);
        mixer.apply(&mut root);
        assert_eq!(root.children[0].local, Instance::default());
        assert_eq!(root.children[1].local.position, Vector3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn clips_on_the_same_node_blend_equally() {
        let mut root = SceneNode::container("Scene", vec![node(0)]);
        let mut mixer = AnimationMixer::new(vec![
            translation_clip("a", 0, Vector3::new(2.0, 0.0, 0.0), Interpolation::Linear),
            translation_clip("b", 0, Vector3::new(0.0, 2.0, 0.0), Interpolation::Linear),
        ]);
        mixer.update(1.0 - f32::EPSILON);
        mixer.apply(&mut root);
        let position = root.children[0].local.position;
        assert!((position - Vector3::new(1.0, 1.0, 0.0)).magnitude() < 1e-3);
    }
}
