//! Keyframe animation clips and the mixer that plays them on a scene node.
//!
//! A clip's channels address nodes by child-index paths relative to the node
//! the mixer is bound to, so a clip keeps working after its model has been
//! moved into the scene root.

use std::ops::{Add, Mul};

use cgmath::{InnerSpace, VectorSpace};

use crate::data_structures::scene_graph::{NodeId, Scene};

#[derive(Clone, Debug)]
pub enum Keyframes {
    Translation(Vec<cgmath::Vector3<f32>>),
    Rotation(Vec<cgmath::Quaternion<f32>>),
    Scale(Vec<cgmath::Vector3<f32>>),
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
    /// Values are stored as `(in-tangent, value, out-tangent)` triples.
    CubicSpline,
}

/// Keyframes for one property of one node.
#[derive(Clone, Debug)]
pub struct Channel {
    pub target: Vec<usize>,
    pub timestamps: Vec<f32>,
    pub keyframes: Keyframes,
    pub interpolation: Interpolation,
}

/// An animation clip: a named animation with keyframes and timing.
#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub channels: Vec<Channel>,
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: &str, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|channel| channel.timestamps.last())
            .fold(0.0_f32, |max, &t| max.max(t));
        Self {
            name: name.to_string(),
            channels,
            duration,
        }
    }

    /// Re-address the clip to the subtree at `prefix`, dropping channels outside it.
    pub fn rebase(self, prefix: &[usize]) -> Self {
        let channels = self
            .channels
            .into_iter()
            .filter(|channel| channel.target.starts_with(prefix))
            .map(|mut channel| {
                channel.target.drain(..prefix.len());
                channel
            })
            .collect();
        Self::new(&self.name, channels)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopMode {
    Once,
    Repeat,
}

/// Playback state of one clip inside a mixer.
#[derive(Clone, Debug)]
pub struct AnimationAction {
    clip: AnimationClip,
    time: f32,
    pub time_scale: f32,
    pub loop_mode: LoopMode,
    playing: bool,
}

impl AnimationAction {
    fn new(clip: AnimationClip) -> Self {
        Self {
            clip,
            time: 0.0,
            time_scale: 1.0,
            loop_mode: LoopMode::Repeat,
            playing: false,
        }
    }

    pub fn play(&mut self) -> &mut Self {
        self.playing = true;
        self
    }

    pub fn stop(&mut self) -> &mut Self {
        self.playing = false;
        self.time = 0.0;
        self
    }

    pub fn is_running(&self) -> bool {
        self.playing
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    fn advance(&mut self, dt: f32) {
        if !self.playing {
            return;
        }
        let duration = self.clip.duration;
        self.time += dt * self.time_scale;
        match self.loop_mode {
            LoopMode::Repeat if duration > 0.0 => self.time = self.time.rem_euclid(duration),
            LoopMode::Repeat => self.time = 0.0,
            LoopMode::Once => {
                if self.time >= duration {
                    self.time = duration;
                    self.playing = false;
                } else if self.time < 0.0 {
                    self.time = 0.0;
                    self.playing = false;
                }
            }
        }
    }
}

/// Advances and applies animation actions for a single bound node.
#[derive(Debug)]
pub struct AnimationMixer {
    root: NodeId,
    actions: Vec<AnimationAction>,
    time: f32,
}

impl AnimationMixer {
    pub fn new(root: NodeId) -> Self {
        Self {
            root,
            actions: Vec::new(),
            time: 0.0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Total time this mixer has been advanced by.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn actions(&self) -> &[AnimationAction] {
        &self.actions
    }

    /// The action for `clip`, created on first request. Clips are matched by name.
    pub fn clip_action(&mut self, clip: AnimationClip) -> &mut AnimationAction {
        let idx = match self.actions.iter().position(|a| a.clip.name == clip.name) {
            Some(idx) => idx,
            None => {
                self.actions.push(AnimationAction::new(clip));
                self.actions.len() - 1
            }
        };
        &mut self.actions[idx]
    }

    pub fn update(&mut self, dt: f32) {
        self.time += dt;
        for action in self.actions.iter_mut() {
            action.advance(dt);
        }
    }

    /// Write the pose of every running action into the bound node's subtree.
    pub fn apply(&self, scene: &mut Scene) {
        let Some(root) = scene.get_mut(self.root) else {
            log::warn!("animation mixer bound to missing node {:?}", self.root);
            return;
        };
        for action in self.actions.iter().filter(|a| a.playing) {
            for channel in &action.clip.channels {
                let Some(node) = root.descendant_mut(&channel.target) else {
                    continue;
                };
                let t = action.time;
                let local = node.local_transform_mut();
                match &channel.keyframes {
                    Keyframes::Translation(values) => {
                        if let Some(v) = sample(channel.interpolation, &channel.timestamps, values, t) {
                            local.position = v;
                        }
                    }
                    Keyframes::Rotation(values) => {
                        if let Some(q) = sample(channel.interpolation, &channel.timestamps, values, t) {
                            local.rotation = q;
                        }
                    }
                    Keyframes::Scale(values) => {
                        if let Some(v) = sample(channel.interpolation, &channel.timestamps, values, t) {
                            local.scale = v;
                        }
                    }
                    Keyframes::Other => (),
                }
            }
        }
    }
}

pub trait Animatable: Copy + Add<Output = Self> + Mul<f32, Output = Self> {
    fn interpolate(self, other: Self, amount: f32) -> Self;

    fn finish(self) -> Self {
        self
    }
}

impl Animatable for cgmath::Vector3<f32> {
    fn interpolate(self, other: Self, amount: f32) -> Self {
        self.lerp(other, amount)
    }
}

impl Animatable for cgmath::Quaternion<f32> {
    fn interpolate(self, other: Self, amount: f32) -> Self {
        // take the short way around
        let other = if self.dot(other) < 0.0 { -other } else { other };
        self.slerp(other, amount)
    }

    fn finish(self) -> Self {
        self.normalize()
    }
}

/// Sample a track at time `t`, clamping outside the keyed range.
pub fn sample<T: Animatable>(
    interpolation: Interpolation,
    timestamps: &[f32],
    values: &[T],
    t: f32,
) -> Option<T> {
    let (first, last) = (*timestamps.first()?, *timestamps.last()?);
    let keys = timestamps.len();
    let stride = match interpolation {
        Interpolation::CubicSpline => 3,
        Interpolation::Linear | Interpolation::Step => 1,
    };
    if values.len() < keys * stride {
        log::warn!(
            "animation track has {} values for {} keyframes, skipping",
            values.len(),
            keys
        );
        return None;
    }
    let value = |k: usize| match interpolation {
        Interpolation::CubicSpline => values[k * 3 + 1],
        Interpolation::Linear | Interpolation::Step => values[k],
    };
    if t <= first || keys == 1 {
        return Some(value(0).finish());
    }
    if t >= last {
        return Some(value(keys - 1).finish());
    }
    let next = timestamps.partition_point(|&ts| ts <= t);
    let prev = next - 1;
    let span = timestamps[next] - timestamps[prev];
    let s = if span > 0.0 {
        (t - timestamps[prev]) / span
    } else {
        0.0
    };
    let sampled = match interpolation {
        Interpolation::Step => value(prev),
        Interpolation::Linear => value(prev).interpolate(value(next), s),
        Interpolation::CubicSpline => {
            let out_tangent = values[prev * 3 + 2];
            let in_tangent = values[next * 3];
            let (s2, s3) = (s * s, s * s * s);
            value(prev) * (2.0 * s3 - 3.0 * s2 + 1.0)
                + out_tangent * (span * (s3 - 2.0 * s2 + s))
                + value(next) * (-2.0 * s3 + 3.0 * s2)
                + in_tangent * (span * (s3 - s2))
        }
    };
    Some(sampled.finish())
}
