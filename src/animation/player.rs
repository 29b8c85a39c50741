//! Clip playback bound to scene nodes.

use std::sync::Arc;

use super::clip::{AnimationClip, SampledValue};
use crate::scene::{InsertedFragment, NodeId, SceneGraph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

/// Drives one clip on the nodes of one inserted fragment
#[derive(Debug, Clone)]
pub struct ClipPlayer {
    clip: Arc<AnimationClip>,
    /// Fragment-local index to scene node
    bindings: Vec<Option<NodeId>>,
    time: f32,
    state: PlaybackState,
    looping: bool,
    advances: u64,
}

impl ClipPlayer {
    /// Bind `clip` to the nodes of `fragment`; starts stopped and looping
    pub fn new(clip: Arc<AnimationClip>, fragment: &InsertedFragment) -> Self {
        Self {
            clip,
            bindings: fragment.nodes.clone(),
            time: 0.0,
            state: PlaybackState::Stopped,
            looping: true,
            advances: 0,
        }
    }

    pub fn play(&mut self) {
        self.state = PlaybackState::Playing;
    }

    /// Stop and rewind
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.time = 0.0;
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    /// Playback cursor (seconds into the clip)
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Number of `advance` calls received, playing or not
    pub fn advances(&self) -> u64 {
        self.advances
    }

    /// Move the cursor by `dt` seconds and write the pose into `scene`
    pub fn advance(&mut self, dt: f32, scene: &mut SceneGraph) {
        self.advances += 1;
        if self.state != PlaybackState::Playing {
            return;
        }

        let duration = self.clip.duration;
        self.time += dt.max(0.0);
        if duration > 0.0 {
            self.time = if self.looping {
                self.time.rem_euclid(duration)
            } else {
                self.time.min(duration)
            };
        } else {
            self.time = 0.0;
        }

        self.apply(scene);
    }

    fn apply(&self, scene: &mut SceneGraph) {
        for channel in &self.clip.channels {
            let Some(node_id) = self.bindings.get(channel.target).copied().flatten() else {
                continue;
            };
            let Some(node) = scene.node_mut(node_id) else {
                continue;
            };
            match channel.sample(self.time) {
                SampledValue::Translation(t) => node.transform.translation = t,
                SampledValue::Rotation(r) => node.transform.rotation = r,
                SampledValue::Scale(s) => node.transform.scale = s,
                SampledValue::MorphWeights(w) => node.morph_weights = w,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Channel, ChannelValues, Interpolation};
    use crate::scene::{FragmentNode, SceneFragment, Transform};
    use glam::Vec3;

    fn setup() -> (SceneGraph, InsertedFragment, Arc<AnimationClip>) {
        let fragment = SceneFragment {
            nodes: vec![FragmentNode::new(Transform::IDENTITY)],
            root: 0,
            meshes: Vec::new(),
        };
        let mut scene = SceneGraph::new([0.0; 3]);
        let inserted = scene.insert_fragment(scene.root(), fragment).unwrap();
        let channel = Channel::new(
            0,
            Interpolation::Linear,
            vec![0.0, 1.0],
            ChannelValues::Translation(vec![Vec3::ZERO, Vec3::new(0.0, 4.0, 0.0)]),
        )
        .unwrap();
        let clip = Arc::new(AnimationClip::new("bob", vec![channel]));
        (scene, inserted, clip)
    }

    #[test]
    fn test_stopped_player_does_not_move_cursor() {
        let (mut scene, inserted, clip) = setup();
        let mut player = ClipPlayer::new(clip, &inserted);
        player.advance(0.5, &mut scene);
        assert_eq!(player.time(), 0.0);
        assert_eq!(player.advances(), 1);
        assert_eq!(
            scene.node(inserted.root).unwrap().transform.translation,
            Vec3::ZERO
        );
    }

    #[test]
    fn test_playing_player_writes_pose() {
        let (mut scene, inserted, clip) = setup();
        let mut player = ClipPlayer::new(clip, &inserted);
        player.play();
        player.advance(0.25, &mut scene);
        assert_eq!(
            scene.node(inserted.root).unwrap().transform.translation,
            Vec3::new(0.0, 1.0, 0.0)
        );
    }

    #[test]
    fn test_looping_wraps_cursor() {
        let (mut scene, inserted, clip) = setup();
        let mut player = ClipPlayer::new(clip, &inserted);
        player.play();
        player.advance(0.75, &mut scene);
        player.advance(0.5, &mut scene);
        assert!((player.time() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_non_looping_holds_last_frame() {
        let (mut scene, inserted, clip) = setup();
        let mut player = ClipPlayer::new(clip, &inserted);
        player.set_looping(false);
        player.play();
        player.advance(3.0, &mut scene);
        assert_eq!(player.time(), 1.0);
        assert_eq!(
            scene.node(inserted.root).unwrap().transform.translation,
            Vec3::new(0.0, 4.0, 0.0)
        );

        player.stop();
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(player.time(), 0.0);
    }

    #[test]
    fn test_unbound_channels_are_skipped() {
        let (mut scene, inserted, _) = setup();
        let channel = Channel::new(
            9,
            Interpolation::Linear,
            vec![0.0, 1.0],
            ChannelValues::Scale(vec![Vec3::ONE, Vec3::splat(2.0)]),
        )
        .unwrap();
        let mut player = ClipPlayer::new(Arc::new(AnimationClip::new("x", vec![channel])), &inserted);
        player.play();
        player.advance(0.5, &mut scene);
        assert_eq!(scene.node(inserted.root).unwrap().transform.scale, Vec3::ONE);
    }
}
