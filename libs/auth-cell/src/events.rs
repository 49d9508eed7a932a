use tokio::sync::broadcast;
use tracing::debug;

use shared_models::auth::UserRole;

pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Session transitions published by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { user_id: String, role: UserRole },
    SignedOut { user_id: String },
    TokenRefreshed { user_id: String },
    UserUpdated { user_id: String },
}

impl AuthEvent {
    pub fn user_id(&self) -> &str {
        match self {
            AuthEvent::SignedIn { user_id, .. }
            | AuthEvent::SignedOut { user_id }
            | AuthEvent::TokenRefreshed { user_id }
            | AuthEvent::UserUpdated { user_id } => user_id,
        }
    }
}

/// Broadcast hub for [`AuthEvent`]s. Cloning shares the channel.
///
/// Subscribers that fall more than the channel capacity behind lose the
/// oldest events and see `RecvError::Lagged`.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<AuthEvent>,
}

impl SessionEvents {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }

    /// Returns how many subscribers received the event.
    pub fn publish(&self, event: AuthEvent) -> usize {
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                debug!("No session subscribers for {:?}", event);
                0
            }
        }
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_sees_events_in_order() {
        let events = SessionEvents::default();
        let mut first = events.subscribe();
        let mut second = events.subscribe();

        assert_eq!(events.publish(AuthEvent::SignedIn { user_id: "u1".into(), role: UserRole::Patient }), 2);
        events.publish(AuthEvent::SignedOut { user_id: "u1".into() });

        for rx in [&mut first, &mut second] {
            assert_eq!(
                rx.recv().await.unwrap(),
                AuthEvent::SignedIn { user_id: "u1".into(), role: UserRole::Patient }
            );
            assert_eq!(rx.recv().await.unwrap().user_id(), "u1");
        }
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let events = SessionEvents::new(4);
        assert_eq!(events.publish(AuthEvent::TokenRefreshed { user_id: "u1".into() }), 0);
    }

    #[tokio::test]
    async fn lagging_subscriber_drops_oldest() {
        let events = SessionEvents::new(2);
        let mut rx = events.subscribe();

        for n in 0..3 {
            events.publish(AuthEvent::UserUpdated { user_id: format!("u{}", n) });
        }

        assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Lagged(1))));
        assert_eq!(rx.recv().await.unwrap().user_id(), "u1");
    }
}
