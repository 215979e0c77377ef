//! Running matches and the host that owns their worker tasks

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::game::field::PlayerSlot;
use crate::net::protocol::ClientMsg;
use crate::replay::ReplayRecorder;

use super::game::{HostError, InboundQueue, MatchConfig, NetworkGame, SeatReceivers};

/// Handle for sending messages into a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    inbound: InboundQueue,
    stop: Arc<AtomicBool>,
}

impl MatchHandle {
    /// Queue a message; it is processed at the start of the next tick
    pub fn send(&self, slot: PlayerSlot, msg: ClientMsg) {
        self.inbound.push(slot, msg);
    }

    /// Ask the worker to end after its current tick
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    pub fn is_stopping(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// Owner of a match worker task. Dropping it requests a stop.
pub struct HostedMatch {
    handle: MatchHandle,
    task: Option<JoinHandle<ReplayRecorder>>,
}

impl HostedMatch {
    pub fn handle(&self) -> &MatchHandle {
        &self.handle
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Stop the worker and wait for its recording
    pub async fn shutdown(mut self) -> Option<ReplayRecorder> {
        self.handle.stop();
        let task = self.task.take()?;
        match task.await {
            Ok(recorder) => Some(recorder),
            Err(err) => {
                warn!(match_id = %self.handle.id, error = %err, "Match task failed");
                None
            }
        }
    }
}

impl Drop for HostedMatch {
    fn drop(&mut self) {
        self.handle.stop();
    }
}

/// Registry of all running matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, MatchHandle>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.get(id).map(|m| m.value().clone())
    }

    pub fn insert(&self, handle: MatchHandle) {
        self.matches.insert(handle.id, handle);
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, h)| h)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn ids(&self) -> Vec<Uuid> {
        self.matches.iter().map(|m| *m.key()).collect()
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns match workers and collects their recordings on shutdown
pub struct MatchHost {
    registry: Arc<MatchRegistry>,
    hosted: Mutex<Vec<HostedMatch>>,
    ended: Arc<Notify>,
}

impl MatchHost {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(MatchRegistry::new()),
            hosted: Mutex::new(Vec::new()),
            ended: Arc::new(Notify::new()),
        }
    }

    pub fn registry(&self) -> &Arc<MatchRegistry> {
        &self.registry
    }

    /// Start a match worker. Must be called inside a tokio runtime.
    pub fn spawn(&self, config: MatchConfig) -> Result<(MatchHandle, SeatReceivers), HostError> {
        let id = Uuid::new_v4();
        let inbound = InboundQueue::new();
        let stop = Arc::new(AtomicBool::new(false));
        let (game, receivers) = NetworkGame::new(id, config, inbound.clone(), stop.clone())?;

        let handle = MatchHandle { id, inbound, stop };
        self.registry.insert(handle.clone());

        let registry = self.registry.clone();
        let ended = self.ended.clone();
        let task = tokio::spawn(async move {
            let recorder = game.run().await;
            registry.remove(&id);
            ended.notify_one();
            recorder
        });

        info!(match_id = %id, active = self.registry.active_matches(), "Match spawned");
        self.hosted.lock().push(HostedMatch {
            handle: handle.clone(),
            task: Some(task),
        });
        Ok((handle, receivers))
    }

    /// Resolves once no match is running
    pub async fn wait_idle(&self) {
        while self.registry.active_matches() > 0 {
            self.ended.notified().await;
        }
    }

    /// Stop every match and collect the recordings
    pub async fn shutdown(&self) -> Vec<(Uuid, ReplayRecorder)> {
        let hosted: Vec<HostedMatch> = std::mem::take(&mut *self.hosted.lock());
        info!(matches = hosted.len(), "Shutting down matches");

        let ids: Vec<Uuid> = hosted.iter().map(|m| m.handle.id).collect();
        let recordings = join_all(hosted.into_iter().map(HostedMatch::shutdown)).await;

        ids.into_iter()
            .zip(recordings)
            .filter_map(|(id, recorder)| recorder.map(|r| (id, r)))
            .collect()
    }
}

impl Default for MatchHost {
    fn default() -> Self {
        Self::new()
    }
}
