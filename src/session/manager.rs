use std::sync::Arc;

use async_trait::async_trait;
use tokio::{
    sync::{broadcast, broadcast::error::RecvError, watch},
    task::JoinHandle,
};
use tracing::{debug, warn};

use super::{Session, SessionState};
use crate::error::AuthError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(Session),
    TokenRefreshed(Session),
    SignedOut,
}

/// Source of the current session and of session-change notifications.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Tracks the signed-in identity for one client. Created with [`start`] at
/// application start and stopped with [`shutdown`].
///
/// [`start`]: SessionManager::start
/// [`shutdown`]: SessionManager::shutdown
pub struct SessionManager {
    state: watch::Receiver<SessionState>,
    listener: JoinHandle<()>,
}

impl SessionManager {
    /// Subscribes to auth events, then fetches the current session in the
    /// background. The state stays `is_loading` until that fetch completes.
    pub fn start(provider: Arc<dyn AuthProvider>) -> Self {
        let (tx, rx) = watch::channel(SessionState::loading());
        // subscribe before the initial fetch so no event falls in between
        let mut events = provider.subscribe();

        let listener = tokio::spawn(async move {
            let initial = match provider.current_session().await {
                Ok(session) => session,
                Err(e) => {
                    warn!(error = %e, "initial session fetch failed");
                    None
                }
            };
            tx.send_modify(|state| {
                if let Some(session) = initial {
                    install(state, session);
                }
                state.is_loading = false;
            });

            loop {
                match events.recv().await {
                    Ok(event) => {
                        debug!(?event, "auth event");
                        tx.send_if_modified(|state| apply(state, event));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "auth events lagged; refetching session");
                        match provider.current_session().await {
                            Ok(fresh) => {
                                tx.send_if_modified(|state| {
                                    if state.session == fresh {
                                        return false;
                                    }
                                    state.session = fresh;
                                    true
                                });
                            }
                            Err(e) => warn!(error = %e, "session refetch failed"),
                        }
                    }
                    Err(RecvError::Closed) => {
                        debug!("auth event stream closed");
                        break;
                    }
                }
            }
        });

        Self {
            state: rx,
            listener,
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Resolves once the initial session fetch has finished.
    pub async fn ready(&self) -> SessionState {
        let mut rx = self.state.clone();
        let settled = rx
            .wait_for(|state| !state.is_loading)
            .await
            .map(|state| state.clone());
        settled.unwrap_or_else(|_| self.snapshot())
    }

    pub async fn shutdown(self) {
        self.listener.abort();
        let _ = self.listener.await;
    }
}

fn apply(state: &mut SessionState, event: AuthEvent) -> bool {
    match event {
        AuthEvent::SignedIn(session) | AuthEvent::TokenRefreshed(session) => {
            install(state, session)
        }
        AuthEvent::SignedOut => state.session.take().is_some(),
    }
}

/// Latest session wins; older or identical sessions leave the state alone.
fn install(state: &mut SessionState, incoming: Session) -> bool {
    if let Some(current) = &state.session {
        if current.issued_at > incoming.issued_at || *current == incoming {
            return false;
        }
    }
    state.session = Some(incoming);
    true
}
