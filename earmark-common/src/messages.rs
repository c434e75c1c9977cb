//! Streaming recognition protocol messages
//!
//! Wire types for the bidirectional recognition protocol. Client frames are
//! either a JSON text message (`config`, `stop`) or a binary chunk of raw
//! little-endian f32 mono PCM; server frames are JSON text messages tagged
//! by `status`.
//!
//! A terminal message (`match_found`, `no_match`, `error`) is always the
//! last message of its session.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Messages sent by the client as text frames
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Opening message; must arrive before any PCM chunk
    Config {
        /// Sample rate of the PCM chunks that will follow
        #[serde(rename = "sampleRate")]
        sample_rate: u32,
    },

    /// Cancel the session; any in-flight analysis is discarded
    Stop,
}

/// Messages sent by the server as text frames
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Progress: how much audio is currently buffered
    Listening {
        /// Buffered duration in seconds
        duration: f64,
    },

    /// An analysis attempt is in flight
    Analyzing,

    /// Terminal: a catalog song matched the stream
    MatchFound {
        song: SongInfo,
        /// Aligned-hash share of the query, 0–100
        confidence: f64,
        /// Best histogram peak over the runner-up's
        score_ratio: f64,
        /// Where in the song the query aligned, in seconds
        offset_seconds: f64,
        /// Opaque enrichment blob attached to the song at ingest
        #[serde(skip_serializing_if = "Option::is_none")]
        analysis: Option<Value>,
    },

    /// Terminal: listening gave up without a confident match
    NoMatch { message: String },

    /// Terminal: the session failed
    Error { message: String },
}

impl ServerMessage {
    /// Whether this message ends the session
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ServerMessage::MatchFound { .. } | ServerMessage::NoMatch { .. } | ServerMessage::Error { .. }
        )
    }
}

/// Song identity carried in a `match_found` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongInfo {
    pub id: i64,
    pub title: String,
    pub artist: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    /// Duration in seconds
    pub duration: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_message_shape() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"config","sampleRate":48000}"#).unwrap();
        assert_eq!(msg, ClientMessage::Config { sample_rate: 48000 });
    }

    #[test]
    fn stop_message_shape() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"stop"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Stop);
    }

    #[test]
    fn listening_serializes_with_status_tag() {
        let json = serde_json::to_value(ServerMessage::Listening { duration: 2.5 }).unwrap();
        assert_eq!(json["status"], "listening");
        assert_eq!(json["duration"], 2.5);
    }

    #[test]
    fn match_found_omits_empty_analysis() {
        let msg = ServerMessage::MatchFound {
            song: SongInfo {
                id: 7,
                title: "Test".into(),
                artist: "Nobody".into(),
                album: None,
                duration: 61.0,
            },
            confidence: 42.0,
            score_ratio: 3.5,
            offset_seconds: 20.0,
            analysis: None,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["status"], "match_found");
        assert_eq!(json["song"]["id"], 7);
        assert!(json.get("analysis").is_none());
        assert!(msg.is_terminal());
    }

    #[test]
    fn progress_is_not_terminal() {
        assert!(!ServerMessage::Listening { duration: 0.0 }.is_terminal());
        assert!(!ServerMessage::Analyzing.is_terminal());
        assert!(ServerMessage::Error { message: "x".into() }.is_terminal());
    }
}
