//! Upload session: sign-in, file preparation and upload with cancellation

use crate::core::credentials::{CredentialStore, Credentials};
use crate::core::progress::MonotonicFraction;
use crate::core::state::UploaderState;
use crate::core::video_info::{UploadedVideo, VideoMetadata};
use crate::error::RupError;
use crate::platform::client::HttpClientConfig;
use crate::platform::gdata::{Endpoints, HttpTransport};
use crate::platform::transport::{AuthToken, ProgressFn, Transport, TransportError};
use crate::utils::{is_video_mime, mime_from_path};
use std::collections::VecDeque;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Receives the fraction of the file sent, in [0, 1]
pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Receives every state the session enters
pub type StateCallback = Arc<dyn Fn(UploaderState) + Send + Sync>;

/// Outcome of one upload
pub type UploadResult = Result<UploadedVideo, RupError>;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    developer_key: String,
    save_credentials: bool,
}

impl SessionConfig {
    /// Create a configuration for `developer_key`; credential saving is on
    pub fn new(developer_key: impl Into<String>) -> Self {
        Self {
            developer_key: developer_key.into(),
            save_credentials: true,
        }
    }

    /// Enable or disable saving credentials after a successful login
    pub fn with_save_credentials(mut self, enabled: bool) -> Self {
        self.save_credentials = enabled;
        self
    }

    pub fn developer_key(&self) -> &str {
        &self.developer_key
    }

    pub fn save_credentials(&self) -> bool {
        self.save_credentials
    }
}

/// Result of an operation started on an [`UploadSession`].
///
/// Resolves exactly once. Dropping it does not stop the operation; use
/// [`UploadSession::cancel`] for that.
#[must_use = "the operation result is only reported through this value"]
pub struct Completion<T> {
    receiver: oneshot::Receiver<Result<T, RupError>>,
}

impl<T> Completion<T> {
    fn channel() -> (oneshot::Sender<Result<T, RupError>>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { receiver })
    }

    fn ready(result: Result<T, RupError>) -> Self {
        let (sender, completion) = Self::channel();
        let _ = sender.send(result);
        completion
    }

    /// Take the result if it is already available.
    ///
    /// Once this returns `Some`, the completion must not be awaited.
    pub fn try_take(&mut self) -> Option<Result<T, RupError>> {
        self.receiver.try_recv().ok()
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T, RupError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(RupError::Cancelled)))
    }
}

/// The single pending-completion slot
enum Pending {
    Login(oneshot::Sender<Result<(), RupError>>),
    Upload(oneshot::Sender<UploadResult>),
}

impl Pending {
    fn cancel(self) {
        match self {
            Pending::Login(sender) => {
                let _ = sender.send(Err(RupError::Cancelled));
            }
            Pending::Upload(sender) => {
                let _ = sender.send(Err(RupError::Cancelled));
            }
        }
    }
}

struct Operation {
    id: u64,
    cancel: CancellationToken,
    pending: Pending,
}

#[derive(Default)]
struct Shared {
    state: UploaderState,
    token: Option<AuthToken>,
    operation: Option<Operation>,
    next_id: u64,
    /// Transitions not yet handed to the state callback
    queued_states: VecDeque<UploaderState>,
    delivering: bool,
}

impl Shared {
    fn is_current(&self, id: u64) -> bool {
        matches!(&self.operation, Some(operation) if operation.id == id)
    }
}

/// How an upload will be authorized
enum UploadAuth {
    Token(AuthToken),
    Restore(Credentials),
}

struct Inner {
    config: SessionConfig,
    transport: Arc<dyn Transport>,
    store: Arc<dyn CredentialStore>,
    shared: Mutex<Shared>,
    progress_callback: Arc<Mutex<Option<ProgressCallback>>>,
    state_callback: Mutex<Option<StateCallback>>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Change state with the shared lock held.
    ///
    /// The callback is not run here; call [`Inner::deliver_states`] once the
    /// lock is released.
    fn set_state(&self, shared: &mut Shared, state: UploaderState) {
        if shared.state == state {
            return;
        }
        debug!("State {} -> {}", shared.state, state);
        shared.state = state;
        shared.queued_states.push_back(state);
    }

    /// Hand queued transitions to the state callback in order, without the
    /// shared lock held. Whoever is already delivering drains the queue, so
    /// a callback may call back into the session.
    fn deliver_states(&self) {
        {
            let mut shared = self.lock();
            if shared.delivering || shared.queued_states.is_empty() {
                return;
            }
            shared.delivering = true;
        }

        loop {
            let state = {
                let mut shared = self.lock();
                match shared.queued_states.pop_front() {
                    Some(state) => state,
                    None => {
                        shared.delivering = false;
                        return;
                    }
                }
            };
            let callback = self
                .state_callback
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            if let Some(callback) = callback {
                callback(state);
            }
        }
    }

    /// Register a new operation; the caller has checked the session is idle
    fn begin(
        &self,
        shared: &mut Shared,
        state: UploaderState,
        pending: Pending,
    ) -> (u64, CancellationToken) {
        shared.next_id += 1;
        let id = shared.next_id;
        let cancel = CancellationToken::new();
        shared.operation = Some(Operation {
            id,
            cancel: cancel.clone(),
            pending,
        });
        self.set_state(shared, state);
        (id, cancel)
    }

    /// Move operation `id` to `state` if it is still the current one
    fn advance(&self, id: u64, state: UploaderState) -> bool {
        {
            let mut shared = self.lock();
            if !shared.is_current(id) {
                return false;
            }
            self.set_state(&mut shared, state);
        }
        self.deliver_states();
        true
    }

    fn remember_token(&self, id: u64, token: AuthToken) {
        let mut shared = self.lock();
        if shared.is_current(id) {
            shared.token = Some(token);
        }
    }

    /// Detach operation `id`, go back to Idle and hand out its completion slot
    fn finish(&self, id: u64, token: Option<AuthToken>) -> Option<Pending> {
        let pending = {
            let mut shared = self.lock();
            if !shared.is_current(id) {
                return None;
            }
            let operation = shared.operation.take()?;
            if let Some(token) = token {
                shared.token = Some(token);
            }
            self.set_state(&mut shared, UploaderState::Idle);
            operation.pending
        };
        self.deliver_states();
        Some(pending)
    }

    /// Save `credentials` on the blocking pool
    async fn persist(&self, credentials: Credentials) {
        let store = Arc::clone(&self.store);
        let identity = credentials.identity.clone();
        match tokio::task::spawn_blocking(move || store.set(&credentials)).await {
            Ok(Ok(())) => debug!("Saved credentials for {}", identity),
            Ok(Err(e)) => warn!("Could not save credentials: {}", e),
            Err(e) => warn!("Credential save task failed: {}", e),
        }
    }

    fn saved_credentials(&self) -> Option<Credentials> {
        if !self.config.save_credentials {
            return None;
        }
        match self.store.get() {
            Ok(credentials) => credentials,
            Err(e) => {
                warn!("Could not read saved credentials: {}", e);
                None
            }
        }
    }

    async fn run_login(
        self: Arc<Self>,
        id: u64,
        credentials: Credentials,
        cancel: CancellationToken,
    ) {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            outcome = self.transport.authenticate(&credentials) => outcome,
        };

        let (token, result) = match outcome {
            Ok(token) => (Some(token), Ok(())),
            Err(e) => (None, Err(login_error(e))),
        };
        let succeeded = result.is_ok();

        // Taking the slot settles any race with cancel()
        let Some(Pending::Login(sender)) = self.finish(id, token) else {
            debug!("Login {} was cancelled", id);
            return;
        };

        match &result {
            Ok(()) => info!("Logged in as {}", credentials.identity),
            Err(e) => error!("Login failed: {}", e),
        }
        if succeeded && self.config.save_credentials {
            self.persist(credentials).await;
        }
        let _ = sender.send(result);
    }

    async fn run_upload(
        self: Arc<Self>,
        id: u64,
        auth: UploadAuth,
        path: PathBuf,
        metadata: VideoMetadata,
        cancel: CancellationToken,
    ) {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = self.upload_stages(id, auth, &path, &metadata, &cancel) => result,
        };

        match &result {
            Ok(video) => info!("Uploaded {} as {}", path.display(), video.url),
            Err(e) => error!("Upload of {} failed: {}", path.display(), e),
        }

        if let Some(Pending::Upload(sender)) = self.finish(id, None) {
            let _ = sender.send(result);
        }
    }

    async fn upload_stages(
        &self,
        id: u64,
        auth: UploadAuth,
        path: &Path,
        metadata: &VideoMetadata,
        cancel: &CancellationToken,
    ) -> UploadResult {
        let size = check_file(path).await?;
        debug!("Preparing {} ({} bytes)", path.display(), size);
        if !is_video_mime(mime_from_path(path)) {
            warn!("{} does not look like a video file", path.display());
        }

        let token = match auth {
            UploadAuth::Token(token) => token,
            UploadAuth::Restore(credentials) => {
                info!("Logging in with saved credentials for {}", credentials.identity);
                let token = self
                    .transport
                    .authenticate(&credentials)
                    .await
                    .map_err(login_error)?;
                self.remember_token(id, token.clone());
                token
            }
        };

        let target = self
            .transport
            .request_upload_authorization(&token)
            .await
            .map_err(token_error)?;

        if !self.advance(id, UploaderState::Uploading) {
            return Err(RupError::Cancelled);
        }

        let relay = ProgressRelay::new(Arc::clone(&self.progress_callback), cancel.clone());
        let video = self
            .transport
            .upload(&target, path, metadata, relay.as_progress_fn())
            .await
            .map_err(upload_error)?;
        relay.complete();

        Ok(video)
    }
}

/// Relays transport progress to the caller's callback, never going backwards
#[derive(Clone)]
struct ProgressRelay {
    slot: Arc<Mutex<Option<ProgressCallback>>>,
    fraction: Arc<Mutex<MonotonicFraction>>,
    cancel: CancellationToken,
}

impl ProgressRelay {
    fn new(slot: Arc<Mutex<Option<ProgressCallback>>>, cancel: CancellationToken) -> Self {
        Self {
            slot,
            fraction: Arc::new(Mutex::new(MonotonicFraction::new())),
            cancel,
        }
    }

    fn emit(&self, value: f64) {
        if self.cancel.is_cancelled() {
            return;
        }
        // Held while the callback runs so concurrent emits stay ordered
        let mut fraction = self.fraction.lock().unwrap_or_else(PoisonError::into_inner);
        let value = fraction.next(value);
        let callback = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(callback) = callback {
            callback(value);
        }
    }

    /// Report 1.0 unless it was already reported
    fn complete(&self) {
        let last = self
            .fraction
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last();
        if last < 1.0 {
            self.emit(1.0);
        }
    }

    fn as_progress_fn(&self) -> ProgressFn {
        let relay = self.clone();
        Arc::new(move |value| relay.emit(value))
    }
}

async fn check_file(path: &Path) -> Result<u64, RupError> {
    let rejected = |reason: String| RupError::UploadRejected(format!("{}: {}", path.display(), reason));

    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| rejected(e.to_string()))?;
    if !metadata.is_file() {
        return Err(rejected("not a regular file".to_string()));
    }
    if metadata.len() == 0 {
        return Err(rejected("file is empty".to_string()));
    }
    tokio::fs::File::open(path)
        .await
        .map_err(|e| rejected(e.to_string()))?;
    Ok(metadata.len())
}

fn login_error(error: TransportError) -> RupError {
    match error {
        TransportError::BadCredentials(_) => RupError::InvalidCredentials,
        other => RupError::ConnectionFailure(other.to_string()),
    }
}

fn token_error(error: TransportError) -> RupError {
    if error.is_connection() {
        RupError::ConnectionFailure(error.to_string())
    } else {
        RupError::TokenError(error.to_string())
    }
}

fn upload_error(error: TransportError) -> RupError {
    if error.is_connection() {
        return RupError::ConnectionFailure(error.to_string());
    }
    match error {
        TransportError::Rejected(reason) => RupError::UploadRejected(reason),
        TransportError::Status { status, message } if (400..500).contains(&status) => {
            RupError::UploadRejected(format!("status {}: {}", status, message))
        }
        other => RupError::ConnectionFailure(other.to_string()),
    }
}

/// Uploader session holding at most one in-flight operation.
///
/// Operations are spawned onto the current Tokio runtime when started, so
/// `login` and `upload` must be called from within a runtime. Cloning the
/// session yields another handle to the same state.
#[derive(Clone)]
pub struct UploadSession {
    inner: Arc<Inner>,
}

impl UploadSession {
    /// Create a session over `transport`, persisting credentials in `store`
    pub fn new(
        config: SessionConfig,
        transport: Arc<dyn Transport>,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, RupError> {
        if config.developer_key.trim().is_empty() {
            return Err(RupError::MissingDeveloperKey);
        }

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                transport,
                store,
                shared: Mutex::new(Shared::default()),
                progress_callback: Arc::new(Mutex::new(None)),
                state_callback: Mutex::new(None),
            }),
        })
    }

    /// Create a session talking to the platform over HTTP
    pub fn with_http_transport(
        config: SessionConfig,
        http_config: HttpClientConfig,
        endpoints: Endpoints,
        store: Arc<dyn CredentialStore>,
    ) -> Result<Self, RupError> {
        if config.developer_key.trim().is_empty() {
            return Err(RupError::MissingDeveloperKey);
        }
        let transport = HttpTransport::with_config(config.developer_key(), http_config, endpoints)
            .map_err(|e| RupError::ConnectionFailure(e.to_string()))?;
        Self::new(config, Arc::new(transport), store)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Current state
    pub fn state(&self) -> UploaderState {
        self.inner.lock().state
    }

    /// Check if a login succeeded in this session
    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().token.is_some()
    }

    /// Set the progress callback, replacing any previous one
    pub fn set_progress_callback<F>(&self, callback: F)
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        *self
            .inner
            .progress_callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    pub fn clear_progress_callback(&self) {
        self.inner
            .progress_callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    /// Set the state callback, replacing any previous one.
    ///
    /// Transitions are delivered in order, outside the session lock, so the
    /// callback may query or cancel the session.
    pub fn set_state_callback<F>(&self, callback: F)
    where
        F: Fn(UploaderState) + Send + Sync + 'static,
    {
        *self
            .inner
            .state_callback
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    /// Sign in with `identity` and `secret`
    pub fn login(&self, identity: impl Into<String>, secret: impl Into<String>) -> Completion<()> {
        let credentials = Credentials::new(identity, secret);
        let (sender, completion) = Completion::channel();

        let (id, cancel) = {
            let mut shared = self.inner.lock();
            if !shared.state.is_idle() {
                warn!("Login refused: session is {}", shared.state);
                return Completion::ready(Err(RupError::Busy));
            }
            self.inner
                .begin(&mut shared, UploaderState::LoggingIn, Pending::Login(sender))
        };
        self.inner.deliver_states();

        info!("Logging in as {}", credentials.identity);
        tokio::spawn(Arc::clone(&self.inner).run_login(id, credentials, cancel));
        completion
    }

    /// Upload the video at `path` with `metadata`
    pub fn upload(
        &self,
        path: impl AsRef<Path>,
        metadata: VideoMetadata,
    ) -> Completion<UploadedVideo> {
        let path = path.as_ref().to_path_buf();
        let (sender, completion) = Completion::channel();

        // The store may touch the disk, so read it before locking the session
        let saved = if self.is_authenticated() {
            None
        } else {
            self.inner.saved_credentials()
        };

        let (id, cancel, auth) = {
            let mut shared = self.inner.lock();
            if !shared.state.is_idle() {
                warn!("Upload refused: session is {}", shared.state);
                return Completion::ready(Err(RupError::Busy));
            }

            let auth = match (&shared.token, saved) {
                (Some(token), _) => UploadAuth::Token(token.clone()),
                (None, Some(credentials)) => UploadAuth::Restore(credentials),
                (None, None) => {
                    warn!("Upload refused: not logged in");
                    return Completion::ready(Err(RupError::NotAuthenticated));
                }
            };

            let (id, cancel) = self.inner.begin(
                &mut shared,
                UploaderState::PreparingFile,
                Pending::Upload(sender),
            );
            (id, cancel, auth)
        };
        self.inner.deliver_states();

        info!("Uploading {}", path.display());
        tokio::spawn(Arc::clone(&self.inner).run_upload(id, auth, path, metadata, cancel));
        completion
    }

    /// Cancel the operation in flight, if any.
    ///
    /// The pending completion resolves with [`RupError::Cancelled`] before
    /// this returns. Does nothing when the session is idle.
    pub fn cancel(&self) {
        let operation = {
            let mut shared = self.inner.lock();
            let operation = shared.operation.take();
            if operation.is_some() {
                self.inner.set_state(&mut shared, UploaderState::Idle);
            }
            operation
        };
        self.inner.deliver_states();

        if let Some(operation) = operation {
            info!("Cancelling operation {}", operation.id);
            operation.cancel.cancel();
            self.inner.transport.abort();
            operation.pending.cancel();
        }
    }

    /// Remove saved credentials; the current login, if any, stays valid
    pub fn delete_saved_credentials(&self) -> Result<(), RupError> {
        info!("Deleting saved credentials");
        self.inner.store.delete()
    }
}
