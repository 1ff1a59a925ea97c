//! Server-sent payment events
//!
//! One stream per signed-in user, carrying only that user's payments.

use axum::Extension;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures_util::stream::{self, Stream};
use platform::identity::Identity;
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;

use crate::presentation::dto::PaymentEventResponse;
use crate::presentation::handlers::BillingAppState;
use crate::presentation::router::BillingBackend;

/// GET /api/payments/events
pub async fn payment_events<B>(
    State(state): State<BillingAppState<B>>,
    Extension(caller): Extension<Identity>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    B: BillingBackend,
{
    let user_id = caller.user_id;
    let receiver = state.events.subscribe();
    tracing::debug!(user_id = %user_id, "Payment event stream opened");

    let events = stream::unfold(receiver, move |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(event) if event.user_id == user_id => {
                    let frame = Event::default()
                        .event(event.kind.code())
                        .json_data(PaymentEventResponse::from(&event))
                        .unwrap_or_else(|_| Event::default().comment("unencodable event"));
                    return Some((Ok(frame), receiver));
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(user_id = %user_id, skipped, "Payment event stream lagged");
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
