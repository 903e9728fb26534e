//! The session controller actor
//!
//! A single task owns the context and processes one event to completion
//! before accepting the next, so context mutation never interleaves.
//! Acquisition work runs in background tasks tagged with the generation of
//! the state that spawned them; every transition aborts the outgoing task
//! and bumps the generation, so a slow completion can never mutate a newer
//! context.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::capture::{CaptureFailure, CaptureHandle, CaptureProvider};
use crate::config::SessionConfig;
use crate::devices::DeviceCatalog;
use crate::permission::PermissionPoller;
use crate::platform::{MediaPlatform, MediaStream, PlatformError, RecorderBinder};
use crate::relay::ChunkSink;
use crate::session::context::{Preview, RecordingContext, SessionContext, SessionSnapshot};
use crate::session::events::{Envelope, Msg, SessionCommand, TaskOutcome};
use crate::session::observer::SessionObserver;
use crate::utils::error::{ErrorInfo, ErrorKind, SessionError, SessionResult};

/// Handle to a running session controller.
///
/// The controller starts in Setup the moment it is spawned. Dropping the
/// handle without calling `shutdown` leaves the actor running detached.
pub struct SessionController {
    msg_tx: mpsc::Sender<Msg>,
    snapshot_cell: Arc<RwLock<SessionSnapshot>>,
    changes: watch::Receiver<SessionSnapshot>,
    actor: JoinHandle<()>,
}

impl SessionController {
    pub fn spawn(
        platform: Arc<dyn MediaPlatform>,
        binder: Arc<dyn RecorderBinder>,
        sink: Arc<dyn ChunkSink>,
        observer: Arc<dyn SessionObserver>,
        config: SessionConfig,
    ) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(config.command_queue_depth.max(1));
        let snapshot = SessionSnapshot::Setup;
        let snapshot_cell = Arc::new(RwLock::new(snapshot.clone()));
        let (snapshot_tx, changes) = watch::channel(snapshot);

        let actor = SessionActor {
            platform,
            binder,
            sink,
            observer,
            config,
            ctx: SessionContext::Setup,
            generation: 0,
            task: None,
            msg_tx: msg_tx.clone(),
            snapshot_cell: Arc::clone(&snapshot_cell),
            snapshot_tx,
        };
        let actor = tokio::spawn(actor.run(msg_rx));

        Self {
            msg_tx,
            snapshot_cell,
            changes,
            actor,
        }
    }

    /// Submit a user command. Commands illegal in the current state are
    /// logged and dropped by the actor.
    pub async fn dispatch(&self, command: SessionCommand) -> SessionResult<()> {
        self.msg_tx
            .send(Msg::Command(command))
            .await
            .map_err(|_| SessionError::ControllerClosed)
    }

    /// Snapshot after the most recently processed event.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_cell.read().clone()
    }

    /// Watch snapshot changes as they are published.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.changes.clone()
    }

    /// Stop the actor and release any held streams and recorders.
    pub async fn shutdown(self) {
        if self.msg_tx.send(Msg::Shutdown).await.is_ok() {
            let _ = self.actor.await;
        } else {
            self.actor.abort();
        }
    }
}

struct SessionActor {
    platform: Arc<dyn MediaPlatform>,
    binder: Arc<dyn RecorderBinder>,
    sink: Arc<dyn ChunkSink>,
    observer: Arc<dyn SessionObserver>,
    config: SessionConfig,

    ctx: SessionContext,
    /// Bumped on every transition; task completions carrying an older value
    /// are discarded.
    generation: u64,
    /// The outstanding acquisition task of the current state, if any
    task: Option<JoinHandle<()>>,

    msg_tx: mpsc::Sender<Msg>,
    snapshot_cell: Arc<RwLock<SessionSnapshot>>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionActor {
    async fn run(mut self, mut msg_rx: mpsc::Receiver<Msg>) {
        self.enter_setup();
        while let Some(msg) = msg_rx.recv().await {
            match msg {
                Msg::Command(command) => self.handle_command(command).await,
                Msg::Task(Envelope {
                    generation,
                    outcome,
                }) => {
                    if generation != self.generation {
                        tracing::debug!(
                            task_generation = generation,
                            current = self.generation,
                            "discarding stale task completion"
                        );
                        outcome.release();
                        continue;
                    }
                    self.handle_outcome(outcome).await;
                }
                Msg::Shutdown => break,
            }
        }
        self.release_all().await;
    }

    // ----- event handling ---------------------------------------------------

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::ShowScreenPreview => self.show_screen_preview(),
            SessionCommand::ChangeSelectedAudioInputId { id } => {
                if let SessionContext::Initial { catalog, .. } = &mut self.ctx {
                    catalog.select_audio(&id);
                    let snapshot = self.ctx.snapshot();
                    self.publish(snapshot);
                } else {
                    tracing::debug!("audio selection ignored outside Initial");
                }
            }
            SessionCommand::ChangeSelectedVideoInputId { id } => {
                if let SessionContext::Initial { catalog, .. } = &mut self.ctx {
                    catalog.select_video(&id);
                    let snapshot = self.ctx.snapshot();
                    self.publish(snapshot);
                } else {
                    tracing::debug!("video selection ignored outside Initial");
                }
            }
            SessionCommand::StartRecording => self.start_recording().await,
            SessionCommand::StopRecording => self.finish_recording().await,
        }
    }

    async fn handle_outcome(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::SetupFinished(Ok(devices)) => {
                self.to_initial(DeviceCatalog::from_devices(devices));
            }
            TaskOutcome::SetupFinished(Err(failure)) => {
                let error = ErrorInfo::new(ErrorKind::MissingPermissions, &failure.cause);
                self.observer.on_error(&error);
                let prev = self.ctx.snapshot();
                // No catalog existed yet; recovery starts with selections unset
                self.ctx = SessionContext::Error {
                    error,
                    catalog: DeviceCatalog::default(),
                };
                self.finish_transition(&prev);
                self.enter_error();
            }
            TaskOutcome::PermissionRestored(Ok(devices)) => {
                // Selections made before the permission loss survive the
                // re-enumeration when their devices are still present
                let catalog = match &self.ctx {
                    SessionContext::Error { catalog, .. } => catalog.rebuilt(devices),
                    _ => DeviceCatalog::from_devices(devices),
                };
                self.to_initial(catalog);
            }
            TaskOutcome::PermissionRestored(Err(failure)) => {
                // Unbounded polls only return Err when the platform itself is
                // failing; stay in Error and keep trying.
                tracing::warn!(%failure, "permission poller stopped; restarting");
                self.enter_error();
            }
            TaskOutcome::CaptureReady(Ok(handle)) => {
                let prev = self.ctx.snapshot();
                match &mut self.ctx {
                    SessionContext::Initial {
                        preview: preview @ Preview::Requesting,
                        ..
                    } => {
                        *preview = Preview::Previewing { handle };
                    }
                    _ => {
                        handle.release();
                        return;
                    }
                }
                self.finish_transition(&prev);
                self.spawn_preview_listener();
            }
            TaskOutcome::CaptureReady(Err(failure)) => {
                let info = match &failure {
                    CaptureFailure::Denied(cause) => {
                        ErrorInfo::new(ErrorKind::CaptureDenied, cause)
                    }
                    CaptureFailure::NoVideoTrack => ErrorInfo::new(ErrorKind::Unknown, &failure),
                };
                let prev = self.ctx.snapshot();
                match &mut self.ctx {
                    SessionContext::Initial {
                        preview: preview @ Preview::Requesting,
                        ..
                    } => {
                        *preview = Preview::Idle {
                            denied: Some(info.clone()),
                        };
                    }
                    // Observer is only notified once the failure is accepted
                    _ => return,
                }
                self.observer.on_error(&info);
                self.finish_transition(&prev);
            }
            TaskOutcome::WebcamReady(Ok(webcam)) => {
                let prev = self.ctx.snapshot();
                let handle = match &mut self.ctx {
                    SessionContext::Initial { preview, .. }
                        if matches!(preview, Preview::Starting { .. }) =>
                    {
                        let Preview::Starting { handle } =
                            std::mem::replace(preview, Preview::Idle { denied: None })
                        else {
                            unreachable!()
                        };
                        handle
                    }
                    _ => {
                        webcam.stop_all();
                        return;
                    }
                };
                self.begin_recording(prev, handle, Some(webcam)).await;
            }
            TaskOutcome::WebcamReady(Err(cause)) => self.webcam_failed(cause),
            TaskOutcome::ScreenShareEnded => self.screen_share_ended().await,
        }
    }

    // ----- commands ---------------------------------------------------------

    fn show_screen_preview(&mut self) {
        let prev = self.ctx.snapshot();
        match &mut self.ctx {
            SessionContext::Initial {
                preview: preview @ Preview::Idle { .. },
                ..
            } => {
                *preview = Preview::Requesting;
            }
            _ => {
                tracing::debug!("ShowScreenPreview ignored outside Initial.Idle");
                return;
            }
        }
        self.finish_transition(&prev);
        self.enter_requesting_preview();
    }

    async fn start_recording(&mut self) {
        let prev = self.ctx.snapshot();
        let handle = match &mut self.ctx {
            SessionContext::Initial { preview, .. }
                if matches!(preview, Preview::Previewing { .. }) =>
            {
                let Preview::Previewing { handle } =
                    std::mem::replace(preview, Preview::Idle { denied: None })
                else {
                    unreachable!()
                };
                handle
            }
            _ => {
                tracing::debug!("StartRecording ignored outside Initial.Previewing");
                return;
            }
        };

        if self.config.capture_webcam {
            self.set_preview(Preview::Starting { handle });
            self.finish_transition(&prev);
            self.enter_starting();
        } else {
            self.begin_recording(prev, handle, None).await;
        }
    }

    /// Bind recorders to the acquired streams and enter Recording.
    ///
    /// The context is already Initial.Idle here; on any failure the streams
    /// are either released or restored into the preview slot.
    async fn begin_recording(
        &mut self,
        prev: SessionSnapshot,
        screen: CaptureHandle,
        webcam: Option<MediaStream>,
    ) {
        if screen.ended().is_ended() {
            // The share died while we were acquiring; do not record from a
            // dead handle.
            tracing::warn!("screen share ended before recording could start");
            screen.release();
            if let Some(webcam) = &webcam {
                webcam.stop_all();
            }
            self.finish_transition(&prev);
            return;
        }

        let session_id = Uuid::new_v4();
        if let Err(err) = self.sink.open(session_id).await {
            let info = ErrorInfo::new(ErrorKind::Unknown, &err);
            self.observer.on_error(&info);
            if let Some(webcam) = &webcam {
                webcam.stop_all();
            }
            // Keep the preview alive so the user can retry
            self.set_preview(Preview::Previewing { handle: screen });
            self.finish_transition(&prev);
            self.spawn_preview_listener();
            return;
        }

        let mut recorders = vec![self
            .binder
            .bind(screen.stream(), session_id, Arc::clone(&self.sink))];
        if let Some(webcam) = &webcam {
            recorders.push(self.binder.bind(webcam, session_id, Arc::clone(&self.sink)));
        }
        for recorder in &mut recorders {
            recorder.start();
        }

        let ended = screen.ended();
        self.ctx = SessionContext::Recording(RecordingContext {
            screen,
            webcam,
            recorders,
            session_id,
            started_at: Utc::now(),
        });
        tracing::info!(%session_id, "recording started");
        self.finish_transition(&prev);
        self.spawn_task(async move {
            ended.wait().await;
            TaskOutcome::ScreenShareEnded
        });
    }

    /// Stop every recorder, release every stream, close the relay session,
    /// and land in Finished.
    async fn finish_recording(&mut self) {
        let prev = self.ctx.snapshot();
        let mut rec = match std::mem::replace(&mut self.ctx, SessionContext::Setup) {
            SessionContext::Recording(rec) => rec,
            other => {
                self.ctx = other;
                tracing::debug!("StopRecording ignored outside Recording");
                return;
            }
        };

        for recorder in &mut rec.recorders {
            if let Err(cause) = recorder.stop().await {
                self.observer
                    .on_error(&ErrorInfo::new(ErrorKind::Unknown, &cause));
            }
        }
        rec.screen.release();
        if let Some(webcam) = &rec.webcam {
            webcam.stop_all();
        }
        if let Err(err) = self.sink.close(rec.session_id).await {
            self.observer
                .on_error(&ErrorInfo::new(ErrorKind::Unknown, &err));
        }

        tracing::info!(session_id = %rec.session_id, "recording finished");
        self.ctx = SessionContext::Finished {
            session_id: rec.session_id,
            started_at: rec.started_at,
            ended_at: Utc::now(),
        };
        self.finish_transition(&prev);
    }

    // ----- signals ----------------------------------------------------------

    async fn screen_share_ended(&mut self) {
        if matches!(self.ctx, SessionContext::Recording(_)) {
            // A native stop while recording finishes the session cleanly
            self.finish_recording().await;
            return;
        }

        let prev = self.ctx.snapshot();
        let released = match &mut self.ctx {
            SessionContext::Initial { preview, .. }
                if matches!(preview, Preview::Previewing { .. } | Preview::Starting { .. }) =>
            {
                if let Preview::Previewing { handle } | Preview::Starting { handle } =
                    std::mem::replace(preview, Preview::Idle { denied: None })
                {
                    handle.release();
                }
                true
            }
            _ => false,
        };
        if released {
            self.finish_transition(&prev);
        } else {
            tracing::debug!("ended signal ignored; no live preview");
        }
    }

    fn webcam_failed(&mut self, cause: PlatformError) {
        let prev = self.ctx.snapshot();
        match cause {
            // User-media denial is a permissions problem; the screen handle
            // is released and the Error-state poller takes over.
            PlatformError::PermissionDenied(_) => {
                let error = ErrorInfo::new(ErrorKind::MissingPermissions, &cause);
                match std::mem::replace(&mut self.ctx, SessionContext::Setup) {
                    SessionContext::Initial {
                        catalog,
                        preview: Preview::Starting { handle },
                    } => {
                        handle.release();
                        self.observer.on_error(&error);
                        // The catalog rides along so selections survive the
                        // recovery re-enumeration
                        self.ctx = SessionContext::Error { error, catalog };
                    }
                    other => {
                        self.ctx = other;
                        return;
                    }
                }
                self.finish_transition(&prev);
                self.enter_error();
            }
            // Anything else keeps the preview; the user can retry recording
            other => {
                let info = ErrorInfo::new(ErrorKind::Unknown, &other);
                match &mut self.ctx {
                    SessionContext::Initial { preview, .. }
                        if matches!(preview, Preview::Starting { .. }) =>
                    {
                        let Preview::Starting { handle } =
                            std::mem::replace(preview, Preview::Idle { denied: None })
                        else {
                            unreachable!()
                        };
                        *preview = Preview::Previewing { handle };
                    }
                    _ => return,
                }
                self.observer.on_error(&info);
                self.finish_transition(&prev);
                self.spawn_preview_listener();
            }
        }
    }

    // ----- transitions and entry actions ------------------------------------

    fn to_initial(&mut self, catalog: DeviceCatalog) {
        let prev = self.ctx.snapshot();
        self.ctx = SessionContext::Initial {
            catalog,
            preview: Preview::Idle { denied: None },
        };
        self.finish_transition(&prev);
    }

    /// Close out a transition: cancel the outgoing state's task, bump the
    /// generation, notify the observer, publish the new snapshot.
    fn finish_transition(&mut self, prev: &SessionSnapshot) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation = self.generation.wrapping_add(1);
        let next = self.ctx.snapshot();
        self.observer.on_transition(prev, &next);
        self.publish(next);
    }

    fn set_preview(&mut self, preview: Preview) {
        if let SessionContext::Initial { preview: slot, .. } = &mut self.ctx {
            *slot = preview;
        }
    }

    fn publish(&self, snapshot: SessionSnapshot) {
        *self.snapshot_cell.write() = snapshot.clone();
        self.snapshot_tx.send_replace(snapshot);
    }

    fn enter_setup(&mut self) {
        let poller = PermissionPoller::new(Arc::clone(&self.platform), self.config.retry_interval());
        let attempts = self.config.setup_attempts.max(1);
        self.spawn_task(async move { TaskOutcome::SetupFinished(poller.poll(Some(attempts)).await) });
    }

    fn enter_error(&mut self) {
        let poller = PermissionPoller::new(Arc::clone(&self.platform), self.config.retry_interval());
        self.spawn_task(async move { TaskOutcome::PermissionRestored(poller.poll(None).await) });
    }

    fn enter_requesting_preview(&mut self) {
        let provider = CaptureProvider::new(Arc::clone(&self.platform));
        self.spawn_task(async move { TaskOutcome::CaptureReady(provider.request().await) });
    }

    fn enter_starting(&mut self) {
        let platform = Arc::clone(&self.platform);
        self.spawn_task(async move {
            TaskOutcome::WebcamReady(platform.request_user_media(true, true).await)
        });
    }

    fn spawn_preview_listener(&mut self) {
        let ended = match &self.ctx {
            SessionContext::Initial {
                preview: Preview::Previewing { handle },
                ..
            } => handle.ended(),
            _ => return,
        };
        self.spawn_task(async move {
            ended.wait().await;
            TaskOutcome::ScreenShareEnded
        });
    }

    fn spawn_task<F>(&mut self, fut: F)
    where
        F: std::future::Future<Output = TaskOutcome> + Send + 'static,
    {
        let tx = self.msg_tx.clone();
        let generation = self.generation;
        self.task = Some(tokio::spawn(async move {
            let outcome = fut.await;
            if let Err(rejected) = tx.send(Msg::Task(Envelope { generation, outcome })).await {
                // The actor has already exited; stop whatever was acquired
                if let Msg::Task(envelope) = rejected.0 {
                    envelope.outcome.release();
                }
            }
        }));
    }

    // ----- teardown ---------------------------------------------------------

    async fn release_all(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        match std::mem::replace(&mut self.ctx, SessionContext::Setup) {
            SessionContext::Initial {
                preview: Preview::Previewing { handle } | Preview::Starting { handle },
                ..
            } => handle.release(),
            SessionContext::Recording(mut rec) => {
                for recorder in &mut rec.recorders {
                    let _ = recorder.stop().await;
                }
                rec.screen.release();
                if let Some(webcam) = &rec.webcam {
                    webcam.stop_all();
                }
                let _ = self.sink.close(rec.session_id).await;
            }
            _ => {}
        }
    }
}
