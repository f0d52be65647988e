use axum::extract::State;
use axum::Json;

use crate::api::AppState;
use crate::relay::{RelayMessage, RelayReply};

/// `POST /relay`: one `{type, data}` message in, its reply out.
pub async fn http(State(state): State<AppState>, Json(message): Json<RelayMessage>) -> Json<RelayReply> {
    tracing::debug!(tab_id = message.tab_id(), "relay message received");
    Json(state.relay.dispatch(message).await)
}
