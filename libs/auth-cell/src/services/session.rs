use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use shared_database::IdentityProvider;
use shared_models::auth::Principal;
use shared_models::error::AppError;
use shared_models::{Profile, Role};

/// Everything a dashboard needs to know about the signed-in user.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub principal: Principal,
    pub profile: Profile,
    pub access_token: String,
}

impl SessionContext {
    pub fn role(&self) -> Role {
        self.profile.role()
    }

    /// Signs the session out at the identity provider.
    pub async fn end(&self, identity: &dyn IdentityProvider) -> Result<(), AppError> {
        identity.sign_out(&self.access_token).await?;
        debug!("Session for {} ended", self.principal.id);
        Ok(())
    }
}

/// Single-assignment holder for the session. Waiters that arrive after the
/// context was published get it immediately.
#[derive(Clone)]
pub struct SessionGate {
    slot: Arc<watch::Sender<Option<SessionContext>>>,
}

impl Default for SessionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionGate {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self { slot: Arc::new(slot) }
    }

    /// Stores the context. Only the first publish counts.
    pub fn publish(&self, context: SessionContext) -> bool {
        self.slot.send_if_modified(|current| {
            if let Some(existing) = current {
                warn!(
                    "Session for {} already published; ignoring context for {}",
                    existing.principal.id, context.principal.id
                );
                return false;
            }
            *current = Some(context);
            true
        })
    }

    pub fn current(&self) -> Option<SessionContext> {
        self.slot.borrow().clone()
    }

    pub async fn wait(&self, timeout: Duration) -> Result<SessionContext, AppError> {
        let mut receiver = self.slot.subscribe();
        let outcome = match tokio::time::timeout(timeout, receiver.wait_for(Option::is_some)).await {
            Ok(Ok(published)) => (*published)
                .clone()
                .ok_or_else(|| AppError::Internal("Session gate woke without a session".to_string())),
            Ok(Err(_)) => Err(AppError::SessionTerminated("Session gate closed".to_string())),
            Err(_) => Err(AppError::Timeout(format!(
                "Session was not ready within {} seconds",
                timeout.as_secs()
            ))),
        };
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn context(id: &str) -> SessionContext {
        SessionContext {
            principal: Principal::new(id, Some("x@example.com"), None),
            profile: Profile::new(id, "X", "x@example.com", Role::Doctor),
            access_token: format!("token-{}", id),
        }
    }

    #[tokio::test]
    async fn test_late_waiter_gets_cached_context() {
        let gate = SessionGate::new();
        assert!(gate.publish(context("a")));

        let ctx = gate.wait(Duration::from_millis(10)).await.unwrap();
        assert_eq!(ctx.principal.id, "a");
    }

    #[tokio::test]
    async fn test_second_publish_is_ignored() {
        let gate = SessionGate::new();
        assert!(gate.publish(context("a")));
        assert!(!gate.publish(context("b")));
        assert_eq!(gate.current().unwrap().principal.id, "a");
    }

    #[tokio::test]
    async fn test_waiter_is_woken_by_publish() {
        let gate = SessionGate::new();
        let publisher = gate.clone();

        let waiter = tokio::spawn(async move { gate.wait(Duration::from_secs(5)).await });
        tokio::task::yield_now().await;
        publisher.publish(context("late"));

        let ctx = waiter.await.unwrap().unwrap();
        assert_eq!(ctx.role(), Role::Doctor);
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let gate = SessionGate::new();
        assert_matches!(gate.wait(Duration::from_millis(20)).await, Err(AppError::Timeout(_)));
    }
}
