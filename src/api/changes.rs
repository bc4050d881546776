use crate::{
    auth::auth::AuthUser,
    utils::change_feed::{ChangeFeed, TableChange},
};
use actix_web::{HttpResponse, web, web::Bytes};
use futures::stream;
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;

/// One server-sent event.
fn sse_frame(event: &str, data: &str) -> Bytes {
    Bytes::from(format!("event: {event}\ndata: {data}\n\n"))
}

fn change_frame(change: &TableChange) -> Bytes {
    match serde_json::to_string(change) {
        Ok(json) => sse_frame("change", &json),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode change");
            sse_frame("resync", "{}")
        }
    }
}

/// Table change notifications
///
/// Each event names a table; clients reload whatever they show from it.
/// A `resync` event means notifications were dropped and everything
/// should be reloaded.
#[utoipa::path(
    get,
    path = "/api/changes",
    responses(
        (status = 200, description = "text/event-stream of TableChange events", body = TableChange, content_type = "text/event-stream"),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Changes"
)]
pub async fn changes(auth: AuthUser, feed: web::Data<ChangeFeed>) -> HttpResponse {
    let rx = feed.subscribe();
    tracing::debug!(username = %auth.username, "Change stream opened");

    let events = stream::unfold(rx, |mut rx| async move {
        let frame = match rx.recv().await {
            Ok(change) => change_frame(&change),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Change stream lagged");
                sse_frame("resync", &format!("{{\"skipped\":{skipped}}}"))
            }
            Err(RecvError::Closed) => return None,
        };
        Some((Ok::<_, Infallible>(frame), rx))
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::change_feed::Table;

    #[test]
    fn frames_follow_event_stream_format() {
        let frame = change_frame(&TableChange {
            table: Table::Attendance,
            seq: 3,
        });
        assert_eq!(
            frame,
            Bytes::from("event: change\ndata: {\"table\":\"attendance\",\"seq\":3}\n\n")
        );
    }
}
