//! Asynchronous asset loading and one-time setup on completion.
//!
//! Each request runs its [`ModelLoader`] on a worker thread. Workers only send
//! events over a channel; [`AssetLoadCoordinator::pump`] applies them on the
//! session thread, so the scene and clip registry are never touched from
//! anywhere else. Completion order between requests is unconstrained.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glam::Vec3;

use crate::animation::{ClipPlayer, ClipRegistry};
use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::loader::{LoadProgress, LoadedModel, ModelLoader};
use crate::scene::{NodeId, SceneGraph};
use crate::session::ReactiveState;

/// Identifies one issued load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

/// Action run once the fragment is in the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnReady {
    Nothing,
    /// Make the fragment root the meter-driven object
    BindReactive,
}

#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub path: PathBuf,
    /// World position written to the fragment root
    pub placement: Vec3,
    /// Multiplied into the fragment root's scale
    pub scale: f32,
    /// Register and start a player for the first clip, if any
    pub animate: bool,
    pub on_ready: OnReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    Pending,
    Ready(NodeId),
    Failed,
}

enum LoadEvent {
    Progress(LoadProgress),
    Loaded(LoadedModel),
    Failed(String),
}

/// Session state a completed load may mutate
pub struct LoadTargets<'a> {
    pub scene: &'a mut SceneGraph,
    pub clips: &'a mut ClipRegistry,
    pub reactive: &'a mut ReactiveState,
    pub diagnostics: &'a dyn DiagnosticSink,
}

pub struct AssetLoadCoordinator {
    loader: Arc<dyn ModelLoader>,
    tx: Sender<(LoadTicket, LoadEvent)>,
    rx: Receiver<(LoadTicket, LoadEvent)>,
    requests: HashMap<LoadTicket, LoadRequest>,
    status: HashMap<LoadTicket, AssetStatus>,
    next_ticket: u64,
}

impl AssetLoadCoordinator {
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            loader,
            tx,
            rx,
            requests: HashMap::new(),
            status: HashMap::new(),
            next_ticket: 0,
        }
    }

    /// Start loading in the background; never blocks
    pub fn load_async(&mut self, request: LoadRequest) -> LoadTicket {
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;

        let loader = Arc::clone(&self.loader);
        let tx = self.tx.clone();
        let path = request.path.clone();
        log::debug!("issuing load {:?} for {}", ticket, path.display());

        let spawned = thread::Builder::new()
            .name(format!("asset-load-{}", ticket.0))
            .spawn(move || {
                let progress_tx = tx.clone();
                let mut on_progress = |progress: LoadProgress| {
                    let _ = progress_tx.send((ticket, LoadEvent::Progress(progress)));
                };
                let event = match loader.load(&path, &mut on_progress) {
                    Ok(model) => LoadEvent::Loaded(model),
                    Err(e) => LoadEvent::Failed(e.to_string()),
                };
                // The session may already be gone
                let _ = tx.send((ticket, event));
            });
        if let Err(e) = spawned {
            let _ = self.tx.send((
                ticket,
                LoadEvent::Failed(format!("could not start loader thread: {}", e)),
            ));
        }

        self.requests.insert(ticket, request);
        self.status.insert(ticket, AssetStatus::Pending);
        ticket
    }

    pub fn status(&self, ticket: LoadTicket) -> Option<AssetStatus> {
        self.status.get(&ticket).copied()
    }

    /// Loads that have neither completed nor failed
    pub fn pending(&self) -> usize {
        self.status
            .values()
            .filter(|s| **s == AssetStatus::Pending)
            .count()
    }

    /// Apply every event received so far; returns how many were applied
    pub fn pump(&mut self, targets: &mut LoadTargets<'_>) -> usize {
        let mut applied = 0;
        while let Ok((ticket, event)) = self.rx.try_recv() {
            self.apply(ticket, event, targets);
            applied += 1;
        }
        applied
    }

    /// Apply events until nothing is pending or `timeout` elapses
    ///
    /// Returns `true` when every issued load has completed or failed.
    pub fn pump_until_idle(&mut self, targets: &mut LoadTargets<'_>, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        self.pump(targets);
        while self.pending() > 0 {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.rx.recv_timeout(remaining) {
                Ok((ticket, event)) => self.apply(ticket, event, targets),
                Err(RecvTimeoutError::Timeout) => return false,
                // Unreachable while we hold a sender
                Err(RecvTimeoutError::Disconnected) => return false,
            }
        }
        true
    }

    fn apply(&mut self, ticket: LoadTicket, event: LoadEvent, targets: &mut LoadTargets<'_>) {
        let Some(request) = self.requests.get(&ticket) else {
            return;
        };
        if self.status.get(&ticket) != Some(&AssetStatus::Pending) {
            return;
        }

        match event {
            LoadEvent::Progress(progress) => {
                targets.diagnostics.report(Diagnostic::LoadProgress {
                    path: request.path.clone(),
                    progress,
                });
            }
            LoadEvent::Failed(message) => {
                targets.diagnostics.report(Diagnostic::LoadFailed {
                    path: request.path.clone(),
                    message,
                });
                self.status.insert(ticket, AssetStatus::Failed);
            }
            LoadEvent::Loaded(model) => {
                let status = match setup(request, model, targets) {
                    Ok(root) => {
                        log::info!("{} ready", request.path.display());
                        AssetStatus::Ready(root)
                    }
                    Err(message) => {
                        targets.diagnostics.report(Diagnostic::LoadFailed {
                            path: request.path.clone(),
                            message,
                        });
                        AssetStatus::Failed
                    }
                };
                self.status.insert(ticket, status);
            }
        }
    }
}

/// Scale, place, animate and insert a freshly loaded model
fn setup(
    request: &LoadRequest,
    model: LoadedModel,
    targets: &mut LoadTargets<'_>,
) -> Result<NodeId, String> {
    let LoadedModel {
        mut fragment,
        clips,
    } = model;

    let root = fragment
        .root_node_mut()
        .ok_or_else(|| "model has an empty scene fragment".to_string())?;
    root.transform.scale *= request.scale;
    root.transform.translation = request.placement;

    let scene_root = targets.scene.root();
    let inserted = targets
        .scene
        .insert_fragment(scene_root, fragment)
        .map_err(|e| e.to_string())?;

    if request.animate {
        if let Some(clip) = clips.into_iter().next() {
            let mut player = ClipPlayer::new(Arc::new(clip), &inserted);
            player.play();
            targets.clips.register(player);
        }
    }

    match request.on_ready {
        OnReady::Nothing => {}
        OnReady::BindReactive => *targets.reactive = ReactiveState::Ready(inserted.root),
    }

    Ok(inserted.root)
}
