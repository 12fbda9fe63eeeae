// Surface service - owns one fetch coordinator task per open surface
use crate::application::fetch_coordinator::{FetchCoordinator, SurfaceCommand};
use crate::application::surface_sink::{ChannelSink, SurfaceEvent};
use crate::application::telemetry_repository::TelemetryRepository;
use crate::domain::selection::SelectionDescriptor;
use crate::domain::surface::{SurfaceConfig, SurfaceKind};
use crate::domain::window::WindowMode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("surface {0} not found")]
    NotFound(u64),

    #[error("surface {0} already has an event subscriber")]
    EventsTaken(u64),

    #[error("surface {0} has stopped")]
    Stopped(u64),
}

struct SurfaceSession {
    kind: SurfaceKind,
    commands: mpsc::Sender<SurfaceCommand>,
    events: Option<broadcast::Receiver<SurfaceEvent>>,
    task: JoinHandle<()>,
}

#[derive(Clone)]
pub struct SurfaceService {
    repository: Arc<dyn TelemetryRepository>,
    configs: Arc<HashMap<SurfaceKind, SurfaceConfig>>,
    sessions: Arc<Mutex<HashMap<u64, SurfaceSession>>>,
    next_id: Arc<AtomicU64>,
}

impl SurfaceService {
    pub fn new(
        repository: Arc<dyn TelemetryRepository>,
        configs: HashMap<SurfaceKind, SurfaceConfig>,
    ) -> Self {
        Self {
            repository,
            configs: Arc::new(configs),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    fn config_for(&self, kind: SurfaceKind) -> SurfaceConfig {
        self.configs
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| SurfaceConfig::for_kind(kind))
    }

    /// Open a surface and issue its first fetch. Returns the session id.
    pub fn open(&self, kind: SurfaceKind, nodes: &[String], window: WindowMode) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sink, events) = ChannelSink::new();
        let (commands, command_rx) = mpsc::channel(COMMAND_BUFFER);

        let coordinator = FetchCoordinator::new(
            id,
            self.config_for(kind),
            self.repository.clone(),
            Arc::new(sink),
            SelectionDescriptor::from_nodes(nodes),
            window,
        );
        let task = tokio::spawn(coordinator.run(command_rx));

        let session = SurfaceSession {
            kind,
            commands,
            events: Some(events),
            task,
        };
        self.lock_sessions().insert(id, session);

        tracing::info!(surface = id, kind = %kind, "surface opened");
        id
    }

    /// Hand out the event stream of a surface. Only one subscriber is allowed.
    pub fn take_events(
        &self,
        id: u64,
    ) -> Result<broadcast::Receiver<SurfaceEvent>, SurfaceError> {
        let mut sessions = self.lock_sessions();
        let session = sessions.get_mut(&id).ok_or(SurfaceError::NotFound(id))?;
        session.events.take().ok_or(SurfaceError::EventsTaken(id))
    }

    pub async fn select(&self, id: u64, nodes: Vec<String>) -> Result<(), SurfaceError> {
        self.send(id, SurfaceCommand::SelectionChanged(nodes)).await
    }

    pub async fn set_window(&self, id: u64, window: WindowMode) -> Result<(), SurfaceError> {
        self.send(id, SurfaceCommand::WindowChanged(window)).await
    }

    async fn send(&self, id: u64, command: SurfaceCommand) -> Result<(), SurfaceError> {
        let commands = {
            let sessions = self.lock_sessions();
            let session = sessions.get(&id).ok_or(SurfaceError::NotFound(id))?;
            session.commands.clone()
        };
        commands
            .send(command)
            .await
            .map_err(|_| SurfaceError::Stopped(id))
    }

    /// Tear a surface down and wait for its coordinator to go idle.
    pub async fn close(&self, id: u64) -> Result<(), SurfaceError> {
        let session = self
            .lock_sessions()
            .remove(&id)
            .ok_or(SurfaceError::NotFound(id))?;

        let SurfaceSession {
            kind,
            commands,
            task,
            ..
        } = session;
        drop(commands);
        if let Err(e) = task.await {
            tracing::warn!(surface = id, error = %e, "surface task ended abnormally");
        }

        tracing::info!(surface = id, kind = %kind, "surface closed");
        Ok(())
    }

    pub async fn close_all(&self) {
        tracing::info!(open = self.open_count(), "closing all surfaces");
        let ids: Vec<u64> = self.lock_sessions().keys().copied().collect();
        for id in ids {
            // already gone if a request closed it concurrently
            let _ = self.close(id).await;
        }
    }

    pub fn open_count(&self) -> usize {
        self.lock_sessions().len()
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<u64, SurfaceSession>> {
        // a panicking holder cannot leave the map half-updated
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
