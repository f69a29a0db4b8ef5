use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tracing::{info, warn};

use crate::models::rewards::LedgerEvent;
use crate::state::AppState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = state.ledger_events_tx.subscribe();

    info!("ledger feed client connected");

    let send_task = tokio::spawn(async move {
        while let Some(event) = next_event(&mut rx).await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize ledger event for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("ledger feed client disconnected");
}

/// Next event for a feed client. A client that falls behind skips the
/// dropped events and keeps streaming; `None` once the channel closes.
async fn next_event(rx: &mut Receiver<LedgerEvent>) -> Option<LedgerEvent> {
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "ledger feed client lagged, skipping events");
            }
            Err(RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::sync::broadcast;
    use uuid::Uuid;

    use super::next_event;
    use crate::models::rewards::{LedgerEvent, RewardTransaction, TransactionKind};

    fn event(points: i64) -> LedgerEvent {
        LedgerEvent::TransactionRecorded(RewardTransaction {
            id: Uuid::new_v4(),
            user_id: "rider".to_string(),
            kind: TransactionKind::Earn,
            points,
            cashback: None,
            description: "Ride completed".to_string(),
            created_at: Utc::now(),
            ride_id: None,
        })
    }

    fn points(event: LedgerEvent) -> i64 {
        match event {
            LedgerEvent::TransactionRecorded(tx) => tx.points,
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn lagging_client_keeps_receiving() {
        let (tx, mut rx) = broadcast::channel(2);
        for value in 1..=5 {
            tx.send(event(value)).unwrap();
        }

        assert_eq!(points(next_event(&mut rx).await.unwrap()), 4);
        assert_eq!(points(next_event(&mut rx).await.unwrap()), 5);

        tx.send(event(6)).unwrap();
        assert_eq!(points(next_event(&mut rx).await.unwrap()), 6);
    }

    #[tokio::test]
    async fn closed_channel_ends_the_feed() {
        let (tx, mut rx) = broadcast::channel::<LedgerEvent>(2);
        drop(tx);

        assert!(next_event(&mut rx).await.is_none());
    }
}
