//! Animation import: key simplification and routing to bones or nodes.

use crate::math::{EPSILON, decompose};
use crate::scene::{
    AnimationChannel, AnimationSet, Key, NodeAnimation, SceneGraph, Skeleton, SkeletonAnimation,
    simplify_keys,
};

use super::context::ImportContext;
use super::settings::ImportSettings;
use super::source::{SourceAnimation, SourceChannel};

/// Convert one source channel: ticks to seconds, then drop redundant keys.
pub fn convert_channel(source: &SourceChannel, ticks_per_second: f32) -> AnimationChannel {
    fn seconds<T: Copy>(keys: &[Key<T>], rate: f32) -> Vec<Key<T>> {
        keys.iter().map(|k| Key::new(k.time / rate, k.value)).collect()
    }
    AnimationChannel {
        target: source.node.clone(),
        positions: simplify_keys(&seconds(&source.positions, ticks_per_second), EPSILON),
        rotations: simplify_keys(&seconds(&source.rotations, ticks_per_second), EPSILON),
        scales: simplify_keys(&seconds(&source.scales, ticks_per_second), EPSILON),
        pre_behavior: source.pre_behavior,
        post_behavior: source.post_behavior,
    }
}

/// Rescale the root bone's position and scale keys by the root bind-pose
/// scale when that scale is not 1.
///
/// Some FBX exports carry a unit conversion in the root bone's bind pose
/// that the animation keys do not. Only bone `0` is touched.
pub fn correct_root_bone_scale(skeleton: &Skeleton, channels: &mut [(usize, AnimationChannel)]) {
    let Some(bind) = skeleton.bind_pose(0) else {
        return;
    };
    let (_, _, scale) = decompose(bind);
    if scale.iter().all(|s| (s - 1.0).abs() <= EPSILON) {
        return;
    }
    log::debug!("rescaling root bone keys by bind pose scale {scale:?}");
    for (_, channel) in channels.iter_mut().filter(|(bone, _)| *bone == 0) {
        for key in channel.positions.iter_mut().chain(channel.scales.iter_mut()) {
            for (v, s) in key.value.iter_mut().zip(scale.iter()) {
                *v *= s;
            }
        }
    }
}

fn animation_name(source: &SourceAnimation, index: usize) -> String {
    source
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("animation{index}"))
}

/// Import every animation and attach the set to the import root.
pub(crate) fn import_animations(graph: &mut SceneGraph, ctx: &mut ImportContext<'_>) {
    let scene = ctx.scene;
    if scene.animations.is_empty() {
        return;
    }
    let skeleton = ctx
        .skeleton
        .and_then(|node| Some((node, graph.components(node)?.skeleton.clone()?)));
    let mut set = AnimationSet {
        autostart: ctx.settings.contains(ImportSettings::START_ANIMATIONS),
        ..AnimationSet::default()
    };

    for (index, source) in scene.animations.iter().enumerate() {
        let name = animation_name(source, index);
        let rate = source.tick_rate();
        let mut bone_channels = Vec::new();
        for channel in &source.channels {
            let converted = convert_channel(channel, rate);
            if let Some((_, skeleton)) = &skeleton
                && let Some(bone) = skeleton.bone_index(&channel.node)
            {
                bone_channels.push((bone, converted));
                continue;
            }
            match graph.find_by_name(ctx.root, &channel.node) {
                Some(target) => set.node_animations.push(NodeAnimation {
                    name: name.clone(),
                    duration: converted.duration(),
                    target,
                    channel: converted,
                }),
                None => log::warn!(
                    "animation '{name}': no node named '{}'",
                    channel.node
                ),
            }
        }
        if let Some((node, skeleton)) = &skeleton
            && !bone_channels.is_empty()
        {
            correct_root_bone_scale(skeleton, &mut bone_channels);
            let duration = bone_channels
                .iter()
                .map(|(_, c)| c.duration())
                .fold(0.0, f32::max);
            set.skeleton_animations.push(SkeletonAnimation {
                name,
                duration,
                skeleton: *node,
                channels: bone_channels,
            });
        }
    }

    if set.is_empty() {
        return;
    }
    log::debug!(
        "imported {} skeleton and {} node animations",
        set.skeleton_animations.len(),
        set.node_animations.len()
    );
    if let Some(components) = graph.components_mut(ctx.root) {
        components.animations = Some(set);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Mat4, Vec3};

    #[test]
    fn keys_converted_to_seconds() {
        let source = SourceChannel {
            node: "hip".into(),
            positions: vec![Key::new(0.0, [0.0; 3]), Key::new(50.0, [1.0, 0.0, 0.0])],
            ..SourceChannel::default()
        };
        let channel = convert_channel(&source, 25.0);
        assert_eq!(channel.positions[1].time, 2.0);
        assert_eq!(channel.target, "hip");
    }

    #[test]
    fn root_bone_keys_rescaled_when_bind_pose_scaled() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node(Some("root"));
        let child = graph.create_child(root, Some("child"));
        let mut skeleton = Skeleton::new(&graph, vec![("root".into(), root), ("child".into(), child)]);
        skeleton.set_bind_pose(0, Mat4::new_nonuniform_scaling(&Vec3::new(0.01, 0.01, 0.01)));

        let mut channel = AnimationChannel::new("root");
        channel.positions.push(Key::new(0.0, [100.0, 0.0, 0.0]));
        channel.scales.push(Key::new(0.0, [1.0, 1.0, 1.0]));
        let mut other = AnimationChannel::new("child");
        other.positions.push(Key::new(0.0, [100.0, 0.0, 0.0]));
        let mut channels = vec![(0, channel), (1, other)];

        correct_root_bone_scale(&skeleton, &mut channels);
        assert!((channels[0].1.positions[0].value[0] - 1.0).abs() < 1e-4);
        assert!((channels[0].1.scales[0].value[1] - 0.01).abs() < 1e-6);
        assert_eq!(channels[1].1.positions[0].value[0], 100.0);
    }

    #[test]
    fn unit_bind_pose_leaves_keys_alone() {
        let mut graph = SceneGraph::new();
        let root = graph.create_node(Some("root"));
        let skeleton = Skeleton::new(&graph, vec![("root".into(), root)]);
        let mut channel = AnimationChannel::new("root");
        channel.positions.push(Key::new(0.0, [5.0, 0.0, 0.0]));
        let mut channels = vec![(0, channel)];
        correct_root_bone_scale(&skeleton, &mut channels);
        assert_eq!(channels[0].1.positions[0].value[0], 5.0);
    }
}
