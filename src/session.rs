//! The session: one owner for everything a running stage needs.
//!
//! Starting a session builds the scene furniture, starts the soundtrack and
//! issues the asset loads. After that it is driven by the
//! [`FrameScheduler`](crate::scheduler::FrameScheduler) and by
//! [`Session::pump_loads`], both on the same thread.

use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;

use crate::animation::ClipRegistry;
use crate::audio::{AudioPlayer, AudioTransport, PlaybackOptions};
use crate::camera::Camera;
use crate::diagnostics::{Diagnostic, DiagnosticSink, LogSink};
use crate::loader::{GltfLoader, ModelLoader};
use crate::loading::{AssetLoadCoordinator, AssetStatus, LoadRequest, LoadTargets, LoadTicket, OnReady};
use crate::meter::{DecibelSampler, LevelMeter, MeterSampler};
use crate::params::{hex_to_rgb, AssetRole, ReactiveMapping, SessionConfig};
use crate::scene::{GridHelper, Light, NodeContent, NodeId, SceneGraph, SceneNode, Transform};

/// Readiness of the meter-driven object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReactiveState {
    /// Its asset has not finished loading (or failed)
    #[default]
    Pending,
    Ready(NodeId),
}

/// Swappable parts a session is started with
pub struct Collaborators {
    pub loader: Arc<dyn ModelLoader>,
    pub meter: Box<dyn MeterSampler>,
    /// `None` runs silently (`--mute`)
    pub audio: Option<Box<dyn AudioTransport>>,
    pub diagnostics: Box<dyn DiagnosticSink>,
}

impl Collaborators {
    /// glTF loader, cpal audio feeding a decibel meter, log diagnostics
    pub fn standard(config: &SessionConfig) -> Self {
        let level = LevelMeter::new(config.meter.smoothing);
        let meter = DecibelSampler::new(level.clone(), &config.meter);
        let audio: Option<Box<dyn AudioTransport>> = if config.audio.muted {
            None
        } else {
            Some(Box::new(AudioPlayer::new(level)))
        };
        Self {
            loader: Arc::new(GltfLoader),
            meter: Box::new(meter),
            audio,
            diagnostics: Box::new(LogSink),
        }
    }
}

pub struct Session {
    pub scene: SceneGraph,
    pub camera: Camera,
    clips: ClipRegistry,
    reactive: ReactiveState,
    mapping: ReactiveMapping,
    meter: Box<dyn MeterSampler>,
    audio: Option<Box<dyn AudioTransport>>,
    loads: AssetLoadCoordinator,
    tickets: Vec<LoadTicket>,
    diagnostics: Box<dyn DiagnosticSink>,
}

impl Session {
    /// Build the scene, start audio and issue every manifest load
    ///
    /// Never blocks on I/O and never fails: the soundtrack and the models
    /// finish loading later, through [`Session::pump_loads`]. Audio problems
    /// are reported to the diagnostic sink and the session continues silently.
    pub fn start(config: &SessionConfig, collaborators: Collaborators) -> Self {
        let Collaborators {
            loader,
            meter,
            mut audio,
            diagnostics,
        } = collaborators;

        let scene = build_stage(config);
        let camera = Camera::from_config(&config.camera, config.render.aspect_ratio());

        if let Some(transport) = audio.as_mut() {
            let path = config.resolve(&config.audio.track_path);
            let options = PlaybackOptions {
                looped: config.audio.looped,
                autostart: config.audio.autostart,
            };
            if let Err(e) = transport.play(&path, options) {
                diagnostics.report(Diagnostic::AudioUnavailable {
                    message: e.to_string(),
                });
            }
        }

        let mut loads = AssetLoadCoordinator::new(loader);
        let tickets = config
            .assets
            .models
            .iter()
            .map(|spec| {
                loads.load_async(LoadRequest {
                    path: config.resolve(&spec.path),
                    placement: Vec3::from_array(spec.placement),
                    scale: spec.scale,
                    animate: spec.role == AssetRole::Animated,
                    on_ready: match spec.role {
                        AssetRole::Animated => OnReady::Nothing,
                        AssetRole::Reactive => OnReady::BindReactive,
                    },
                })
            })
            .collect();

        log::info!("session started, {} assets loading", config.assets.models.len());

        Self {
            scene,
            camera,
            clips: ClipRegistry::new(),
            reactive: ReactiveState::Pending,
            mapping: config.mapping.clone(),
            meter,
            audio,
            loads,
            tickets,
            diagnostics,
        }
    }

    /// Apply finished loads and start the soundtrack once it is decoded;
    /// returns the number of load events applied
    pub fn pump_loads(&mut self) -> usize {
        self.poll_audio();
        let mut targets = LoadTargets {
            scene: &mut self.scene,
            clips: &mut self.clips,
            reactive: &mut self.reactive,
            diagnostics: self.diagnostics.as_ref(),
        };
        self.loads.pump(&mut targets)
    }

    /// Block until every model load has resolved or `timeout` passes
    pub fn wait_for_loads(&mut self, timeout: Duration) -> bool {
        self.poll_audio();
        let mut targets = LoadTargets {
            scene: &mut self.scene,
            clips: &mut self.clips,
            reactive: &mut self.reactive,
            diagnostics: self.diagnostics.as_ref(),
        };
        self.loads.pump_until_idle(&mut targets, timeout)
    }

    /// One logic update: advance every clip player by `dt` seconds, then
    /// move the reactive object if it is ready
    ///
    /// Returns the position written to the reactive object, if any.
    pub fn logic_update(&mut self, dt: f32) -> Option<f32> {
        self.clips.advance_all(dt, &mut self.scene);

        let ReactiveState::Ready(id) = self.reactive else {
            return None;
        };
        let node = self.scene.node_mut(id)?;
        let level_db = self.meter.read();
        let position = self.mapping.apply(level_db);
        node.transform.translation[self.mapping.axis.index()] = position;
        Some(position)
    }

    pub fn clips(&self) -> &ClipRegistry {
        &self.clips
    }

    pub fn reactive(&self) -> ReactiveState {
        self.reactive
    }

    /// Status of every manifest load, in manifest order
    pub fn load_status(&self) -> Vec<AssetStatus> {
        self.tickets
            .iter()
            .filter_map(|ticket| self.loads.status(*ticket))
            .collect()
    }

    pub fn pending_loads(&self) -> usize {
        self.loads.pending()
    }

    fn poll_audio(&mut self) {
        let Some(audio) = self.audio.as_mut() else {
            return;
        };
        match audio.poll() {
            Some(Ok(())) => log::info!("soundtrack playing"),
            Some(Err(e)) => self.diagnostics.report(Diagnostic::AudioUnavailable {
                message: e.to_string(),
            }),
            None => {}
        }
    }

    pub fn stop_audio(&mut self) {
        if let Some(audio) = self.audio.as_mut() {
            audio.stop();
        }
    }
}

/// Root, lights and grid; models are added as their loads complete
fn build_stage(config: &SessionConfig) -> SceneGraph {
    let render = &config.render;
    let mut scene = SceneGraph::new(hex_to_rgb(render.background));
    let root = scene.root();

    let furniture = [
        SceneNode::new(NodeContent::DirectionalLight(Light {
            color: hex_to_rgb(render.light_color),
            intensity: render.light_intensity,
        }))
        .named("directional light")
        .with_transform(Transform::from_translation(Vec3::from_array(
            render.light_position,
        ))),
        SceneNode::new(NodeContent::AmbientLight(Light {
            color: hex_to_rgb(render.ambient_color),
            intensity: render.ambient_intensity,
        }))
        .named("ambient light"),
        SceneNode::new(NodeContent::Grid(GridHelper {
            size: render.grid_size,
            divisions: render.grid_divisions,
        }))
        .named("grid"),
    ];
    for node in furniture {
        // The root always exists
        let _ = scene.add_node(root, node);
    }
    scene
}
