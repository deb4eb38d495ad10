//! Scoped ownership of an installer session

use std::sync::Arc;

use droidpm_events::{AppEvent, EventEmitter, EventSender, PackageEvent};
use droidpm_system::InstallSession;

/// Owns an open session and abandons it exactly once.
///
/// The normal path calls [`SessionGuard::release`]. Any other exit (early
/// return, a cancelled future, a panic) drops the guard, which abandons the
/// session on the runtime in the background.
pub(crate) struct SessionGuard {
    session: Arc<dyn InstallSession>,
    events: Option<EventSender>,
    armed: bool,
}

impl SessionGuard {
    pub(crate) fn new(session: Arc<dyn InstallSession>, events: Option<EventSender>) -> Self {
        Self {
            session,
            events,
            armed: true,
        }
    }

    pub(crate) fn session(&self) -> &dyn InstallSession {
        self.session.as_ref()
    }

    /// Abandon and close the session. `failure` is the reason the session is
    /// being given up, or `None` after a successful commit.
    pub(crate) async fn release(mut self, failure: Option<&str>) {
        let id = self.session.id();
        let abandoned = self.session.abandon().await;
        // Stay armed until abandon returns so a dropped release still cleans up.
        self.armed = false;
        if let Err(err) = abandoned {
            // Expected after a successful commit: the session no longer exists.
            if failure.is_some() {
                self.events.emit_warning_with_context(
                    format!("failed to abandon installer session {id}"),
                    err.to_string(),
                );
            }
        }
        if let Err(err) = self.session.close().await {
            self.events
                .emit_debug(format!("closing session {id} failed: {err}"));
        }
        if let Some(reason) = failure {
            self.events.emit(AppEvent::Package(PackageEvent::SessionAbandoned {
                session_id: id,
                reason: reason.to_string(),
            }));
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let session = Arc::clone(&self.session);
        let events = self.events.take();
        handle.spawn(async move {
            let id = session.id();
            let _ = session.abandon().await;
            let _ = session.close().await;
            events.emit(AppEvent::Package(PackageEvent::SessionAbandoned {
                session_id: id,
                reason: "operation dropped before completion".to_string(),
            }));
        });
    }
}
