//! Server-sent event framing.

use bytes::Bytes;

use super::types::Event;

/// Frame an event as one SSE message: `data: {json}\n\n`.
pub fn sse_frame(event: &Event) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_string(event)?;
    Ok(Bytes::from(format!("data: {json}\n\n")))
}
