//! Discord local IPC transport.
//!
//! Frames are an 8-byte header (little-endian opcode, little-endian payload
//! length) followed by a JSON payload. The daemon listens on a Unix socket or
//! a Windows named pipe called `discord-ipc-N`, N in 0..10.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{Activity, PresenceError, PresenceTransport};
use crate::constants::presence::HANDSHAKE_TIMEOUT;

const IPC_VERSION: u32 = 1;
const MAX_FRAME_LEN: u32 = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
enum Opcode {
    Handshake = 0,
    Frame = 1,
    Close = 2,
    Ping = 3,
    Pong = 4,
}

impl TryFrom<u32> for Opcode {
    type Error = PresenceError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Opcode::Handshake),
            1 => Ok(Opcode::Frame),
            2 => Ok(Opcode::Close),
            3 => Ok(Opcode::Ping),
            4 => Ok(Opcode::Pong),
            other => Err(PresenceError::Protocol(format!("unknown opcode {}", other))),
        }
    }
}

trait IpcStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> IpcStream for T {}

async fn write_frame<W>(
    writer: &mut W,
    opcode: Opcode,
    payload: &Value,
) -> Result<(), PresenceError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let body = serde_json::to_vec(payload)?;
    let len = u32::try_from(body.len())
        .map_err(|_| PresenceError::Protocol("frame too large".to_string()))?;
    let mut frame = Vec::with_capacity(8 + body.len());
    frame.extend_from_slice(&(opcode as u32).to_le_bytes());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&body);
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

async fn read_frame<R>(reader: &mut R) -> Result<(Opcode, Value), PresenceError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut header = [0u8; 8];
    reader.read_exact(&mut header).await?;
    let opcode =
        Opcode::try_from(u32::from_le_bytes([header[0], header[1], header[2], header[3]]))?;
    let len = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
    if len > MAX_FRAME_LEN {
        return Err(PresenceError::Protocol(format!("frame of {} bytes", len)));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    let payload = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)?
    };
    Ok((opcode, payload))
}

fn closed(payload: &Value) -> PresenceError {
    PresenceError::Closed {
        code: payload["code"].as_i64().unwrap_or_default(),
        message: payload["message"].as_str().unwrap_or_default().to_string(),
    }
}

/// Send the handshake and wait for the READY dispatch
async fn handshake<S>(
    stream: &mut S,
    client_id: &str,
    timeout: Duration,
) -> Result<(), PresenceError>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let hello = json!({ "v": IPC_VERSION, "client_id": client_id });
    write_frame(&mut *stream, Opcode::Handshake, &hello).await?;

    let (opcode, payload) = tokio::time::timeout(timeout, read_frame(&mut *stream))
        .await
        .map_err(|_| PresenceError::ConnectionTimeout)??;

    match opcode {
        Opcode::Frame if payload["evt"] == "READY" => Ok(()),
        Opcode::Close => Err(closed(&payload)),
        _ => Err(PresenceError::Protocol(format!("expected READY, got {}", payload))),
    }
}

/// Send a command frame and wait for the reply carrying the same nonce.
/// Pings received in between are answered.
async fn command<S>(stream: &mut S, cmd: &str, args: Value) -> Result<Value, PresenceError>
where
    S: AsyncRead + AsyncWrite + Unpin + ?Sized,
{
    let nonce = uuid::Uuid::new_v4().to_string();
    let frame = json!({ "cmd": cmd, "args": args, "nonce": nonce });
    write_frame(&mut *stream, Opcode::Frame, &frame).await?;

    loop {
        let (opcode, payload) = read_frame(&mut *stream).await?;
        match opcode {
            Opcode::Ping => write_frame(&mut *stream, Opcode::Pong, &payload).await?,
            Opcode::Close => return Err(closed(&payload)),
            Opcode::Frame if payload["nonce"] == nonce.as_str() => {
                if payload["evt"] == "ERROR" {
                    return Err(PresenceError::Rpc {
                        code: payload["data"]["code"].as_i64().unwrap_or_default(),
                        message: payload["data"]["message"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string(),
                    });
                }
                return Ok(payload);
            }
            _ => tracing::trace!("Ignoring IPC message: {}", payload),
        }
    }
}

#[cfg(unix)]
fn socket_candidates() -> Vec<std::path::PathBuf> {
    let base = ["XDG_RUNTIME_DIR", "TMPDIR", "TMP", "TEMP"]
        .iter()
        .find_map(|var| std::env::var_os(var).filter(|v| !v.is_empty()))
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|| std::path::PathBuf::from("/tmp"));
    (0..10).map(|i| base.join(format!("discord-ipc-{}", i))).collect()
}

#[cfg(unix)]
async fn open_socket() -> Option<Box<dyn IpcStream>> {
    for path in socket_candidates() {
        match tokio::net::UnixStream::connect(&path).await {
            Ok(stream) => {
                tracing::debug!("Connected to {}", path.display());
                return Some(Box::new(stream));
            }
            Err(e) => tracing::trace!("{}: {}", path.display(), e),
        }
    }
    None
}

#[cfg(windows)]
async fn open_socket() -> Option<Box<dyn IpcStream>> {
    use tokio::net::windows::named_pipe::ClientOptions;

    for i in 0..10 {
        let path = format!(r"\\?\pipe\discord-ipc-{}", i);
        match ClientOptions::new().open(&path) {
            Ok(pipe) => {
                tracing::debug!("Connected to {}", path);
                return Some(Box::new(pipe));
            }
            Err(e) => tracing::trace!("{}: {}", path, e),
        }
    }
    None
}

#[derive(Default)]
pub struct DiscordIpc {
    stream: Option<Box<dyn IpcStream>>,
}

impl DiscordIpc {
    pub fn new() -> Self {
        Self::default()
    }

    fn stream(&mut self) -> Result<&mut (dyn IpcStream + 'static), PresenceError> {
        self.stream.as_deref_mut().ok_or(PresenceError::NotConnected)
    }

    async fn set(&mut self, activity: Option<&Activity>) -> Result<(), PresenceError> {
        let args = json!({ "pid": std::process::id(), "activity": activity });
        command(self.stream()?, "SET_ACTIVITY", args).await.map(|_| ())
    }
}

#[async_trait]
impl PresenceTransport for DiscordIpc {
    async fn login(&mut self, client_id: &str) -> Result<(), PresenceError> {
        self.stream = None;
        let mut stream = open_socket().await.ok_or(PresenceError::ConnectionTimeout)?;
        handshake(stream.as_mut(), client_id, HANDSHAKE_TIMEOUT).await?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn set_activity(&mut self, activity: &Activity) -> Result<(), PresenceError> {
        self.set(Some(activity)).await
    }

    async fn clear_activity(&mut self) -> Result<(), PresenceError> {
        self.set(None).await
    }

    async fn destroy(&mut self) -> Result<(), PresenceError> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        write_frame(stream.as_mut(), Opcode::Close, &json!({})).await?;
        stream.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::DuplexStream;

    async fn expect_frame(server: &mut DuplexStream) -> (Opcode, Value) {
        read_frame(server).await.unwrap()
    }

    #[tokio::test]
    async fn test_frame_header_is_little_endian() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_frame(&mut client, Opcode::Frame, &json!({"a": 1})).await.unwrap();

        let mut raw = [0u8; 15];
        server.read_exact(&mut raw).await.unwrap();
        assert_eq!(&raw[..4], &[1, 0, 0, 0]);
        assert_eq!(&raw[4..8], &[7, 0, 0, 0]);
        assert_eq!(&raw[8..], br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn test_handshake_waits_for_ready() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        let daemon = tokio::spawn(async move {
            let (opcode, payload) = expect_frame(&mut server).await;
            assert_eq!(opcode, Opcode::Handshake);
            assert_eq!(payload, json!({"v": 1, "client_id": "123"}));
            let ready = json!({"cmd": "DISPATCH", "evt": "READY", "data": {}});
            write_frame(&mut server, Opcode::Frame, &ready).await.unwrap();
            server
        });

        handshake(&mut client, "123", Duration::from_secs(1)).await.unwrap();
        daemon.await.unwrap();
    }

    #[tokio::test]
    async fn test_handshake_close_is_not_a_timeout() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        tokio::spawn(async move {
            expect_frame(&mut server).await;
            let close = json!({"code": 4000, "message": "Invalid Client ID"});
            write_frame(&mut server, Opcode::Close, &close).await.unwrap();
            server
        });

        let err = handshake(&mut client, "bad", Duration::from_secs(1)).await.unwrap_err();
        assert!(!err.is_connection_timeout());
        assert!(matches!(err, PresenceError::Closed { code: 4000, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_daemon_times_out() {
        let (mut client, server) = tokio::io::duplex(4096);

        let err = handshake(&mut client, "123", Duration::from_secs(10)).await.unwrap_err();
        assert!(err.is_connection_timeout());
        drop(server);
    }

    #[tokio::test]
    async fn test_command_answers_ping_and_matches_nonce() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        let daemon = tokio::spawn(async move {
            let (opcode, request) = expect_frame(&mut server).await;
            assert_eq!(opcode, Opcode::Frame);
            assert_eq!(request["cmd"], "SET_ACTIVITY");
            assert_eq!(request["args"]["activity"]["details"], "Working on: Lamp");

            write_frame(&mut server, Opcode::Ping, &json!({"t": 1})).await.unwrap();
            let (opcode, pong) = expect_frame(&mut server).await;
            assert_eq!(opcode, Opcode::Pong);
            assert_eq!(pong, json!({"t": 1}));

            write_frame(&mut server, Opcode::Frame, &json!({"evt": null, "nonce": "other"}))
                .await
                .unwrap();
            write_frame(
                &mut server,
                Opcode::Frame,
                &json!({"cmd": "SET_ACTIVITY", "evt": null, "nonce": request["nonce"], "data": {}}),
            )
            .await
            .unwrap();
            server
        });

        let activity = Activity::for_project("Lamp", 1, 0);
        let args = json!({ "pid": 7, "activity": activity });
        let reply = command(&mut client, "SET_ACTIVITY", args).await.unwrap();
        assert_eq!(reply["cmd"], "SET_ACTIVITY");
        daemon.await.unwrap();
    }

    #[tokio::test]
    async fn test_command_error_reply() {
        let (mut client, mut server) = tokio::io::duplex(4096);

        tokio::spawn(async move {
            let (_, request) = expect_frame(&mut server).await;
            write_frame(
                &mut server,
                Opcode::Frame,
                &json!({
                    "evt": "ERROR",
                    "nonce": request["nonce"],
                    "data": {"code": 4002, "message": "child \"activity\" fails"}
                }),
            )
            .await
            .unwrap();
            server
        });

        let err = command(&mut client, "SET_ACTIVITY", json!({"pid": 1, "activity": null}))
            .await
            .unwrap_err();
        assert!(matches!(err, PresenceError::Rpc { code: 4002, .. }));
    }

    #[tokio::test]
    async fn test_set_activity_requires_login() {
        let mut ipc = DiscordIpc::new();
        let err = ipc.clear_activity().await.unwrap_err();
        assert!(matches!(err, PresenceError::NotConnected));
        ipc.destroy().await.unwrap();
    }
}
