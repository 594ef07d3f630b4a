use std::collections::HashMap;

use anyhow::Context as _;

use crate::data_structures::animation::{AnimationClip, Channel};

#[derive(Clone, Debug, PartialEq)]
pub enum Keyframes {
    Translation(Vec<cgmath::Vector3<f32>>),
    Rotation(Vec<cgmath::Quaternion<f32>>),
    Scale(Vec<cgmath::Vector3<f32>>),
    Other,
}

impl Keyframes {
    pub fn len(&self) -> usize {
        match self {
            Keyframes::Translation(values) => values.len(),
            Keyframes::Rotation(values) => values.len(),
            Keyframes::Scale(values) => values.len(),
            Keyframes::Other => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    #[default]
    Linear,
    /// Values are stored as (in-tangent, value, out-tangent) triples.
    CubicSpline,
}

impl From<gltf::animation::Interpolation> for Interpolation {
    fn from(value: gltf::animation::Interpolation) -> Self {
        match value {
            gltf::animation::Interpolation::Step => Interpolation::Step,
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
        }
    }
}

/// Reads every animation of the document into one clip each.
///
/// Channels the viewer cannot play (morph target weights, sparse inputs, empty
/// tracks) are dropped with a warning; the rest of the clip still plays.
pub fn load_clips(gltf: &gltf::Document, buffers: &[Vec<u8>]) -> anyhow::Result<Vec<AnimationClip>> {
    let mut clips = Vec::new();
    for animation in gltf.animations() {
        let name = animation
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("Animation{}", animation.index()));
        let mut channels = Vec::new();
        for channel in animation.channels() {
            let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));
            let timestamps: Vec<f32> = reader
                .read_inputs()
                .with_context(|| format!("channel {} of {name} has no keyframe times", channel.index()))?
                .collect();
            let keyframes = match reader.read_outputs() {
                Some(gltf::animation::util::ReadOutputs::Translations(translations)) => {
                    Keyframes::Translation(translations.map(Into::into).collect())
                }
                Some(gltf::animation::util::ReadOutputs::Rotations(rotations)) => {
                    Keyframes::Rotation(
                        rotations
                            .into_f32()
                            // glTF stores quaternions as [x, y, z, w]
                            .map(|[x, y, z, w]| cgmath::Quaternion::new(w, x, y, z))
                            .collect(),
                    )
                }
                Some(gltf::animation::util::ReadOutputs::Scales(scales)) => {
                    Keyframes::Scale(scales.map(Into::into).collect())
                }
                Some(gltf::animation::util::ReadOutputs::MorphTargetWeights(_)) => {
                    log::warn!("Skipping morph target channel {} of {}", channel.index(), name);
                    Keyframes::Other
                }
                None => {
                    log::warn!("No keyframes found in channel {} of {}", channel.index(), name);
                    Keyframes::Other
                }
            };
            if keyframes.is_empty() || timestamps.is_empty() {
                continue;
            }
            channels.push(Channel {
                node: channel.target().node().index(),
                interpolation: channel.sampler().interpolation().into(),
                timestamps,
                keyframes,
            });
        }
        clips.push(AnimationClip::new(name, channels));
    }
    let per_node: HashMap<usize, usize> = clips
        .iter()
        .flat_map(|clip| clip.channels.iter().map(|c| c.node))
        .fold(HashMap::new(), |mut acc, node| {
            *acc.entry(node).or_default() += 1;
            acc
        });
    log::info!(
        "Loaded {} animation clips driving {} nodes",
        clips.len(),
        per_node.len()
    );
    Ok(clips)
}
