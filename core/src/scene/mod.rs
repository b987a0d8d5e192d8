//! Engine scene graph.
//!
//! - [`SceneGraph`] / [`NodeId`]: generational node arena with exclusive
//!   parent links
//! - [`NodeComponents`]: per-node components ([`RenderData`], [`CameraRig`],
//!   [`Light`](crate::light::Light), [`Skin`], [`MorphTargets`], [`Skeleton`],
//!   [`AnimationSet`])
//! - [`Skeleton`]: bones bound to nodes, with a bind pose
//! - [`AnimationChannel`] and friends: keyframe tracks

mod animation;
mod components;
mod graph;
mod skeleton;

pub use animation::{
    AnimationBehavior, AnimationChannel, AnimationSet, Key, NodeAnimation, SkeletonAnimation,
    simplify_keys,
};
pub use components::{
    CameraRig, MorphTarget, MorphTargets, NodeComponents, RenderData, ShaderHandle, Skin,
};
pub use graph::{DepthFirst, Node, NodeId, SceneGraph};
pub use skeleton::Skeleton;
