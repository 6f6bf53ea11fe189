//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::events::DashboardEvent;
use crate::state::{CaptureSignal, DashboardState, DeviceAttribute, Input};

/// Largest frame body accepted from a client
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from a dashboard client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request the current dashboard snapshot
    GetStatus,

    /// Subscribe to dashboard events
    Subscribe,

    /// Flip one attribute
    Toggle { attribute: DeviceAttribute },

    /// Client opened a microphone session
    CaptureStarted,

    /// Client recognized speech, best alternative first
    CaptureResult { alternatives: Vec<String> },

    /// Client capture failed
    CaptureError { reason: String },

    /// Client microphone session closed
    CaptureEnded,

    /// Send the live transcript to the classifier
    SendTranscript,
}

impl Request {
    /// Dashboard input carried by this request, if any
    pub fn into_input(self) -> Option<Input> {
        match self {
            Request::Ping | Request::GetStatus | Request::Subscribe => None,
            Request::Toggle { attribute } => Some(Input::Toggle(attribute)),
            Request::CaptureStarted => Some(Input::Capture(CaptureSignal::Started)),
            Request::CaptureResult { alternatives } => {
                Some(Input::Capture(CaptureSignal::Result { alternatives }))
            }
            Request::CaptureError { reason } => Some(Input::Capture(CaptureSignal::Error { reason })),
            Request::CaptureEnded => Some(Input::Capture(CaptureSignal::Ended)),
            Request::SendTranscript => Some(Input::SendTranscript),
        }
    }
}

/// Messages from daemon to client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Pong response to ping
    Pong,

    /// Current dashboard snapshot
    Status(DashboardStatus),

    /// Subscription confirmed
    Subscribed,

    /// Request queued on the dashboard loop
    Accepted,

    /// Error response
    Error { code: String, message: String },

    /// Pushed to subscribed clients
    Notification { event: DashboardEvent },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Full dashboard status snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStatus {
    /// Daemon version
    pub version: String,

    #[serde(flatten)]
    pub state: DashboardState,

    /// Whether a microphone session is open
    pub listening: bool,

    /// Uptime in seconds
    pub uptime_secs: u64,
}

impl DashboardStatus {
    pub fn new(state: DashboardState, uptime_secs: u64) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            listening: state.listening(),
            state,
            uptime_secs,
        }
    }
}

/// Read one frame body; `Ok(None)` on clean end of stream
pub async fn read_frame<R>(reader: &mut R) -> std::io::Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("frame of {len} bytes exceeds limit"),
        ));
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Write one length-prefixed JSON frame
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = serde_json::to_vec(msg)?;
    let len = (body.len() as u32).to_le_bytes();

    writer.write_all(&len).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoticeLevel;

    #[test]
    fn test_request_serialization() {
        let req = Request::Toggle {
            attribute: DeviceAttribute::MovieNight,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"type":"toggle","attribute":"movie_night"}"#);
    }

    #[test]
    fn test_unknown_attribute_is_rejected() {
        let json = r#"{"type":"toggle","attribute":"garage_door"}"#;
        assert!(serde_json::from_str::<Request>(json).is_err());
    }

    #[test]
    fn test_capture_requests_map_to_signals() {
        let req: Request =
            serde_json::from_str(r#"{"type":"capture_result","alternatives":["alarm on"]}"#).unwrap();
        assert!(matches!(
            req.into_input(),
            Some(Input::Capture(CaptureSignal::Result { alternatives })) if alternatives == ["alarm on"]
        ));
        assert!(Request::Ping.into_input().is_none());
    }

    #[test]
    fn test_status_serialization() {
        let resp = Response::Status(DashboardStatus::new(DashboardState::default(), 5));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["alarm"], "off");
        assert_eq!(json["override"], "off");
        assert_eq!(json["listening"], false);
        assert_eq!(json["capture"], "idle");
    }

    #[test]
    fn test_notification_nests_event() {
        let resp = Response::Notification {
            event: DashboardEvent::notice(NoticeLevel::Success, "Alarm updated via voice!"),
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["type"], "notification");
        assert_eq!(json["event"]["type"], "notice");
        assert_eq!(json["event"]["level"], "success");
    }

    #[tokio::test]
    async fn test_frame_round_trip() {
        let (mut client, mut server) = tokio::io::duplex(64);
        write_frame(&mut client, &Request::SendTranscript).await.unwrap();
        drop(client);

        let body = read_frame(&mut server).await.unwrap().unwrap();
        let req: Request = serde_json::from_slice(&body).unwrap();
        assert_eq!(req, Request::SendTranscript);
        assert!(read_frame(&mut server).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let len = (MAX_FRAME_LEN as u32 + 1).to_le_bytes();
        client.write_all(&len).await.unwrap();

        let err = read_frame(&mut server).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
