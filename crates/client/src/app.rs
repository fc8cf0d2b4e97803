//! The client application state machine.
//!
//! `App` owns all client state and is only mutated through `&mut self`.
//! Collaborators (auth provider, history store, proxy) are called from spawned
//! tasks whose results come back as [`AppEvent`]s on a single queue, so every
//! state change happens in the order events are handled.

use std::{future::Future, sync::Arc, time::Duration};

use db::models::{
    collection_path::CollectionPath,
    generated_code::{CreateHistoryRecord, HistoryRecord},
};
use services::services::{
    auth::{AuthError, AuthErrorCode, AuthProvider, AuthUser},
    catalog::Component,
    code_generation::GenerateCodeRequest,
    history_store::{HistoryStore, HistoryStoreError, Snapshot},
    subscription::Subscription,
};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::{
    generation::{GenerationForm, GenerationPanel},
    history::HistoryPanel,
    messages,
    proxy_client::{CodeProxy, ProxyClientError},
    session::{SessionSnapshot, SessionState},
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Namespace under `artifacts/` that history is stored in.
    pub app_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    SignIn,
    SignUp,
    SignOut,
}

#[derive(Debug)]
pub enum AppEvent {
    AuthStateChanged(Option<AuthUser>),
    AnonymousSignInFinished(Result<AuthUser, AuthError>),
    AuthActionFinished {
        action: AuthAction,
        result: Result<(), AuthError>,
    },
    HistorySnapshot {
        epoch: u64,
        snapshot: Snapshot,
    },
    GenerationFinished {
        session: SessionSnapshot,
        request: GenerateCodeRequest,
        result: Result<String, ProxyClientError>,
    },
    HistoryWriteFinished(Result<HistoryRecord, HistoryStoreError>),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("a generation is already in progress")]
    Busy,
    #[error("the session is still loading")]
    NotReady,
    #[error("{}", messages::DESCRIPTION_REQUIRED)]
    EmptyDescription,
}

pub struct App {
    config: AppConfig,
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn HistoryStore>,
    proxy: Arc<dyn CodeProxy>,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
    auth_subscription: Option<Subscription>,
    session: SessionState,
    anonymous_sign_in_pending: bool,
    auth_busy: bool,
    auth_error: Option<String>,
    history: HistoryPanel,
    form: GenerationForm,
    generation: GenerationPanel,
}

impl App {
    pub fn new(
        config: AppConfig,
        auth: Arc<dyn AuthProvider>,
        store: Arc<dyn HistoryStore>,
        proxy: Arc<dyn CodeProxy>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            config,
            auth,
            store,
            proxy,
            events_tx,
            events_rx,
            auth_subscription: None,
            session: SessionState::AuthLoading,
            anonymous_sign_in_pending: false,
            auth_busy: false,
            auth_error: None,
            history: HistoryPanel::default(),
            form: GenerationForm::default(),
            generation: GenerationPanel::default(),
        }
    }

    /// Start listening for auth-state changes. Idempotent.
    pub fn start(&mut self) {
        if self.auth_subscription.as_ref().is_some_and(Subscription::is_open) {
            return;
        }
        let tx = self.events_tx.clone();
        self.auth_subscription = Some(self.auth.on_auth_state_changed(Arc::new(move |user| {
            let _ = tx.send(AppEvent::AuthStateChanged(user));
        })));
    }

    /// Close every subscription and drop the cached session.
    pub fn shutdown(&mut self) {
        if let Some(mut subscription) = self.auth_subscription.take() {
            subscription.close();
        }
        self.history.close();
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn history(&self) -> &HistoryPanel {
        &self.history
    }

    pub fn generation(&self) -> &GenerationPanel {
        &self.generation
    }

    pub fn form(&self) -> &GenerationForm {
        &self.form
    }

    pub fn auth_error(&self) -> Option<&str> {
        self.auth_error.as_deref()
    }

    pub fn is_auth_busy(&self) -> bool {
        self.auth_busy || self.anonymous_sign_in_pending
    }

    /// No outbound call is outstanding.
    pub fn is_idle(&self) -> bool {
        !self.generation.busy && !self.generation.pending_write && !self.is_auth_busy()
    }

    pub fn set_component(&mut self, component: Component) {
        self.form.component = component;
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.form.description = description.into();
    }

    pub fn set_model(&mut self, model: Option<String>) {
        self.form.model = model;
    }

    /// Wait for the next event and apply it.
    pub async fn step(&mut self) {
        if let Some(event) = self.events_rx.recv().await {
            self.handle(event);
        }
    }

    /// Handle events until `done` holds or `limit` elapses. Returns whether
    /// `done` was reached.
    pub async fn run_until<F>(&mut self, limit: Duration, mut done: F) -> bool
    where
        F: FnMut(&App) -> bool,
    {
        let deadline = tokio::time::Instant::now() + limit;
        while !done(self) {
            match tokio::time::timeout_at(deadline, self.events_rx.recv()).await {
                Ok(Some(event)) => self.handle(event),
                Ok(None) | Err(_) => return false,
            }
        }
        true
    }

    pub fn handle(&mut self, event: AppEvent) {
        match event {
            AppEvent::AuthStateChanged(Some(user)) => self.on_user_present(user),
            AppEvent::AuthStateChanged(None) => self.on_no_user(),
            AppEvent::AnonymousSignInFinished(result) => self.on_anonymous_sign_in(result),
            AppEvent::AuthActionFinished { action, result } => {
                self.auth_busy = false;
                match result {
                    Ok(()) => {
                        debug!(?action, "Auth action completed");
                        self.auth_error = None;
                    }
                    Err(e) => {
                        error!(?action, error = %e, "Auth action failed");
                        self.auth_error = Some(e.user_message().to_string());
                    }
                }
            }
            AppEvent::HistorySnapshot { epoch, snapshot } => {
                self.history.apply(epoch, snapshot);
            }
            AppEvent::GenerationFinished {
                session,
                request,
                result,
            } => self.on_generation_finished(session, request, result),
            AppEvent::HistoryWriteFinished(result) => {
                self.generation.pending_write = false;
                match result {
                    Ok(record) => info!(record_id = %record.id, "Saved generated code to history"),
                    Err(e) => {
                        error!(error = %e, "Failed to save generated code");
                        self.generation
                            .advise(format!("{}: {}", messages::SAVE_FAILED_PREFIX, e));
                    }
                }
            }
        }
    }

    pub fn sign_in(&mut self, email: &str, password: &str) {
        self.run_password_action(AuthAction::SignIn, email, password);
    }

    pub fn sign_up(&mut self, email: &str, password: &str) {
        self.run_password_action(AuthAction::SignUp, email, password);
    }

    /// Sign out. History is cleared before this returns; the session goes back
    /// to loading until the provider reports the next state.
    pub fn sign_out(&mut self) {
        info!("Signing out");
        self.history.close();
        self.session = SessionState::AuthLoading;
        self.auth_busy = true;
        self.auth_error = None;

        let auth = self.auth.clone();
        self.spawn_event(async move {
            AppEvent::AuthActionFinished {
                action: AuthAction::SignOut,
                result: auth.sign_out().await,
            }
        });
    }

    /// Start a generation with the current form values.
    pub fn submit(&mut self) -> Result<(), SubmitError> {
        if self.generation.busy {
            return Err(SubmitError::Busy);
        }
        if self.session.is_loading() {
            return Err(SubmitError::NotReady);
        }
        if self.form.description.trim().is_empty() {
            self.generation.error = Some(messages::DESCRIPTION_REQUIRED.to_string());
            return Err(SubmitError::EmptyDescription);
        }

        self.generation.begin();
        let session = self.session.snapshot();
        let request = self.form.to_request();
        info!(
            component = %self.form.component,
            authenticated = session.authenticated,
            "Submitting generation request"
        );

        let proxy = self.proxy.clone();
        self.spawn_event(async move {
            let result = proxy.generate(&request).await;
            AppEvent::GenerationFinished {
                session,
                request,
                result,
            }
        });
        Ok(())
    }

    fn on_user_present(&mut self, user: AuthUser) {
        info!(uid = %user.uid, anonymous = user.is_anonymous, "Auth state: user present");
        let next = SessionState::for_user(&user);

        match next.authenticated_user().map(|s| s.user_id.clone()) {
            Some(user_id) if !self.history.is_subscribed_to(&user_id) => {
                self.open_history(&user_id)
            }
            Some(_) => {}
            None => self.history.close(),
        }
        self.session = next;
    }

    fn on_no_user(&mut self) {
        info!("Auth state: no user, requesting guest session");
        self.history.close();
        self.session = SessionState::AuthLoading;

        if self.anonymous_sign_in_pending {
            return;
        }
        self.anonymous_sign_in_pending = true;
        let auth = self.auth.clone();
        self.spawn_event(async move {
            AppEvent::AnonymousSignInFinished(auth.sign_in_anonymously().await)
        });
    }

    fn on_anonymous_sign_in(&mut self, result: Result<AuthUser, AuthError>) {
        self.anonymous_sign_in_pending = false;
        match result {
            Ok(user) => debug!(uid = %user.uid, "Guest session established"),
            Err(e) => {
                error!(error = %e, "Guest sign-in failed");
                self.auth_error = Some(format!(
                    "{}: {}",
                    messages::ANONYMOUS_SIGN_IN_FAILED,
                    e.user_message()
                ));
                if self.session.is_loading() {
                    self.session = SessionState::degraded();
                    warn!(
                        local_id = self.session.user_id().unwrap_or_default(),
                        "Running without a provider session"
                    );
                }
            }
        }
    }

    fn on_generation_finished(
        &mut self,
        session: SessionSnapshot,
        request: GenerateCodeRequest,
        result: Result<String, ProxyClientError>,
    ) {
        match result {
            Ok(code) if !code.is_empty() => {
                info!(code_length = code.len(), "Generation succeeded");
                self.generation.succeed(code.clone());
                let current = self.session.authenticated_user().map(|s| s.user_id.as_str());
                match session.writer() {
                    Some(user_id) if current == Some(user_id) => {
                        self.save_history(user_id, request, code)
                    }
                    Some(user_id) => {
                        warn!(
                            submitted_by = user_id,
                            current = current.unwrap_or_default(),
                            "Session changed during generation, not saving"
                        );
                        self.generation.advise(messages::SESSION_CHANGED_NOT_SAVED);
                    }
                    None => self.generation.advise(messages::LOGIN_TO_SAVE),
                }
            }
            Ok(_) => {
                warn!("Generation returned an empty payload");
                self.generation.fail(messages::EMPTY_GENERATION.to_string());
            }
            Err(e) => {
                error!(error = %e, "Generation failed");
                self.generation.fail(format!("Error generating code: {e}"));
            }
        }
    }

    fn save_history(&mut self, user_id: &str, request: GenerateCodeRequest, code: String) {
        let path = match CollectionPath::generated_code(&self.config.app_id, user_id) {
            Ok(path) => path,
            Err(e) => {
                error!(error = %e, "Cannot address history collection");
                self.generation
                    .advise(format!("{}: {}", messages::SAVE_FAILED_PREFIX, e));
                return;
            }
        };
        let record = CreateHistoryRecord {
            component: request.selected_component.unwrap_or_default(),
            description: request.description.unwrap_or_default(),
            code,
            user_id: user_id.to_string(),
        };

        self.generation.pending_write = true;
        let store = self.store.clone();
        self.spawn_event(async move {
            AppEvent::HistoryWriteFinished(store.add(&path, record).await)
        });
    }

    fn open_history(&mut self, user_id: &str) {
        let path = match CollectionPath::generated_code(&self.config.app_id, user_id) {
            Ok(path) => path,
            Err(e) => {
                error!(error = %e, "Cannot address history collection");
                self.history.close();
                return;
            }
        };
        info!(path = %path, "Opening history subscription");

        let store = self.store.clone();
        let tx = self.events_tx.clone();
        self.history.attach(user_id, move |epoch| {
            store.subscribe(
                path,
                Arc::new(move |snapshot| {
                    let _ = tx.send(AppEvent::HistorySnapshot { epoch, snapshot });
                }),
            )
        });
    }

    fn run_password_action(&mut self, action: AuthAction, email: &str, password: &str) {
        let email = email.trim().to_string();
        if email.is_empty() || password.is_empty() {
            self.auth_error = Some(AuthErrorCode::MissingCredentials.user_message().to_string());
            return;
        }
        if self.auth_busy {
            debug!(?action, "Ignoring auth action while another is running");
            return;
        }

        self.auth_busy = true;
        self.auth_error = None;
        let auth = self.auth.clone();
        let password = password.to_string();
        self.spawn_event(async move {
            let result = match action {
                AuthAction::SignUp => auth.create_account_with_password(&email, &password).await,
                _ => auth.sign_in_with_password(&email, &password).await,
            };
            AppEvent::AuthActionFinished {
                action,
                result: result.map(|_| ()),
            }
        });
    }

    fn spawn_event<F>(&self, fut: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(fut.await);
        });
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.shutdown();
    }
}
