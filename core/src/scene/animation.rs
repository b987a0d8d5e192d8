//! Keyframe animation tracks.

use std::collections::HashMap;

use super::graph::NodeId;

/// A keyframe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Key<T> {
    /// Time in seconds.
    pub time: f32,
    /// Value at `time`.
    pub value: T,
}

impl<T> Key<T> {
    /// Create a key.
    pub fn new(time: f32, value: T) -> Self {
        Self { time, value }
    }
}

/// What a channel does before its first key or after its last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationBehavior {
    /// Use the node's untouched transform.
    #[default]
    Default,
    /// Hold the nearest key.
    Constant,
    /// Extrapolate linearly.
    Linear,
    /// Loop.
    Repeat,
}

/// Position / rotation / scale tracks for one bone or node.
///
/// Rotations are `[x, y, z, w]` quaternions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationChannel {
    /// Name of the animated node or bone.
    pub target: String,
    /// Position keys.
    pub positions: Vec<Key<[f32; 3]>>,
    /// Rotation keys.
    pub rotations: Vec<Key<[f32; 4]>>,
    /// Scale keys.
    pub scales: Vec<Key<[f32; 3]>>,
    /// Behavior before the first key.
    pub pre_behavior: AnimationBehavior,
    /// Behavior after the last key.
    pub post_behavior: AnimationBehavior,
}

impl AnimationChannel {
    /// Empty channel for `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    /// Total number of keys across all tracks.
    pub fn key_count(&self) -> usize {
        self.positions.len() + self.rotations.len() + self.scales.len()
    }

    /// Time of the last key on any track.
    pub fn duration(&self) -> f32 {
        let positions = self.positions.iter().map(|k| k.time);
        let rotations = self.rotations.iter().map(|k| k.time);
        let scales = self.scales.iter().map(|k| k.time);
        positions.chain(rotations).chain(scales).fold(0.0, f32::max)
    }
}

/// Drop every key whose value equals the previously retained key within
/// `epsilon` (per component). The first key is always kept.
pub fn simplify_keys<const N: usize>(keys: &[Key<[f32; N]>], epsilon: f32) -> Vec<Key<[f32; N]>> {
    let mut retained: Vec<Key<[f32; N]>> = Vec::with_capacity(keys.len().min(2));
    for key in keys {
        let redundant = retained.last().is_some_and(|prev| {
            prev.value
                .iter()
                .zip(&key.value)
                .all(|(a, b)| (a - b).abs() <= epsilon)
        });
        if !redundant {
            retained.push(*key);
        }
    }
    retained
}

/// Channels driving the bones of one skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonAnimation {
    /// Animation name.
    pub name: String,
    /// Length in seconds.
    pub duration: f32,
    /// Node carrying the skeleton.
    pub skeleton: NodeId,
    /// (bone index, channel) pairs.
    pub channels: Vec<(usize, AnimationChannel)>,
}

/// A channel driving one ordinary node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeAnimation {
    /// Animation name.
    pub name: String,
    /// Length in seconds.
    pub duration: f32,
    /// Animated node.
    pub target: NodeId,
    /// Tracks.
    pub channel: AnimationChannel,
}

/// All animations imported with a model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnimationSet {
    /// Skeleton-relative animations.
    pub skeleton_animations: Vec<SkeletonAnimation>,
    /// Node-relative animations.
    pub node_animations: Vec<NodeAnimation>,
    /// Whether playback should start as soon as the model is attached.
    pub autostart: bool,
}

impl AnimationSet {
    /// Whether there is nothing to play.
    pub fn is_empty(&self) -> bool {
        self.skeleton_animations.is_empty() && self.node_animations.is_empty()
    }

    pub(crate) fn remap(&mut self, mapping: &HashMap<NodeId, NodeId>) {
        for anim in &mut self.skeleton_animations {
            if let Some(&new) = mapping.get(&anim.skeleton) {
                anim.skeleton = new;
            }
        }
        for anim in &mut self.node_animations {
            if let Some(&new) = mapping.get(&anim.target) {
                anim.target = new;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_track_collapses_to_first_key() {
        let keys: Vec<_> = (0..50)
            .map(|i| Key::new(i as f32 * 0.1, [1.0, 2.0, 3.0]))
            .collect();
        let simplified = simplify_keys(&keys, 1e-5);
        assert_eq!(simplified, vec![Key::new(0.0, [1.0, 2.0, 3.0])]);
    }

    #[test]
    fn changes_are_retained() {
        let keys = [
            Key::new(0.0, [0.0]),
            Key::new(1.0, [0.0]),
            Key::new(2.0, [1.0]),
            Key::new(3.0, [1.000_001]),
            Key::new(4.0, [0.0]),
        ];
        let times: Vec<_> = simplify_keys(&keys, 1e-5).iter().map(|k| k.time).collect();
        assert_eq!(times, [0.0, 2.0, 4.0]);
    }

    #[test]
    fn empty_track_stays_empty() {
        let keys: [Key<[f32; 4]>; 0] = [];
        assert!(simplify_keys(&keys, 1e-5).is_empty());
    }

    #[test]
    fn duration_is_latest_key() {
        let mut channel = AnimationChannel::new("hip");
        channel.positions.push(Key::new(1.5, [0.0; 3]));
        channel.rotations.push(Key::new(2.5, [0.0, 0.0, 0.0, 1.0]));
        assert_eq!(channel.duration(), 2.5);
        assert_eq!(channel.key_count(), 2);
    }
}
