//! Request handling for one decoded text frame

use tracing::warn;

use crate::metrics::metrics;
use crate::protocol::{LookupRequest, ServerMessage};
use crate::ranker::SuggestionRanker;

/// Answer one client payload.
///
/// Malformed payloads and store failures both produce the generic failure
/// response; the details only go to the log. Successful responses echo the
/// query exactly as the client sent it.
pub async fn handle_payload(ranker: &SuggestionRanker, payload: &str) -> ServerMessage {
    let request = match LookupRequest::parse(payload) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejecting malformed payload: {}", e);
            metrics().record_malformed_payload();
            return ServerMessage::failure();
        }
    };

    match ranker.rank(&request.query).await {
        Ok(suggestions) => ServerMessage::suggestions(suggestions, request.query),
        // Already logged by the ranker
        Err(_) => ServerMessage::failure(),
    }
}
