//! Engine.IO v4 and Socket.IO v5 packet codec
//!
//! Engine.IO frames the transport: a single type digit followed by an
//! optional text payload. Socket.IO packets ride inside Engine.IO `message`
//! packets and carry a namespace, an optional ack id and a JSON body.
//!
//! ```text
//! 0{"sid":"...","pingInterval":25000,...}   engine open
//! 2 / 3                                     engine ping / pong
//! 40                                        socket connect "/"
//! 42["leaderboard_update",{...}]            socket event
//! ```
//!
//! Over HTTP long-polling several engine packets share one body, separated by
//! the ASCII record separator.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use super::error::ChannelError;

/// Separator between engine packets in a polling payload
pub const RECORD_SEPARATOR: char = '\u{1e}';

/// Namespace used when a packet names none
pub const DEFAULT_NAMESPACE: &str = "/";

/// Engine.IO open packet body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

impl Handshake {
    /// Silence longer than this means the transport is gone
    pub fn heartbeat_deadline(&self) -> Duration {
        Duration::from_millis(self.ping_interval.saturating_add(self.ping_timeout))
    }
}

/// Engine.IO packet
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    Open(Handshake),
    Close,
    Ping(String),
    Pong(String),
    Message(String),
    Upgrade,
    Noop,
}

impl EnginePacket {
    /// Decode one text-framed engine packet
    pub fn decode(text: &str) -> Result<Self, ChannelError> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| ChannelError::Protocol("empty engine packet".to_string()))?;
        let body = chars.as_str();

        match kind {
            '0' => Ok(EnginePacket::Open(serde_json::from_str(body)?)),
            '1' => Ok(EnginePacket::Close),
            '2' => Ok(EnginePacket::Ping(body.to_string())),
            '3' => Ok(EnginePacket::Pong(body.to_string())),
            '4' => Ok(EnginePacket::Message(body.to_string())),
            '5' => Ok(EnginePacket::Upgrade),
            '6' => Ok(EnginePacket::Noop),
            // Binary payloads over polling are base64 with a 'b' prefix
            'b' => Err(ChannelError::Protocol(
                "binary engine packets are not supported".to_string(),
            )),
            other => Err(ChannelError::Protocol(format!(
                "unknown engine packet type {:?}",
                other
            ))),
        }
    }

    pub fn encode(&self) -> String {
        match self {
            // Handshake only holds strings and integers
            EnginePacket::Open(handshake) => format!(
                "0{}",
                serde_json::to_string(handshake).unwrap_or_else(|_| "{}".to_string())
            ),
            EnginePacket::Close => "1".to_string(),
            EnginePacket::Ping(data) => format!("2{}", data),
            EnginePacket::Pong(data) => format!("3{}", data),
            EnginePacket::Message(data) => format!("4{}", data),
            EnginePacket::Upgrade => "5".to_string(),
            EnginePacket::Noop => "6".to_string(),
        }
    }
}

/// Split a long-polling body into engine packets
pub fn decode_payload(body: &str) -> Result<Vec<EnginePacket>, ChannelError> {
    body.split(RECORD_SEPARATOR)
        .filter(|chunk| !chunk.is_empty())
        .map(EnginePacket::decode)
        .collect()
}

/// Join engine packets into a long-polling body
pub fn encode_payload(packets: &[EnginePacket]) -> String {
    packets
        .iter()
        .map(EnginePacket::encode)
        .collect::<Vec<_>>()
        .join(&RECORD_SEPARATOR.to_string())
}

/// Socket.IO packet carried inside an engine `message`
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    Disconnect {
        namespace: String,
    },
    Event {
        namespace: String,
        ack: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    Ack {
        namespace: String,
        ack: u64,
        args: Vec<Value>,
    },
    ConnectError {
        namespace: String,
        data: Value,
    },
}

impl SocketPacket {
    /// `CONNECT` for the default namespace
    pub fn connect() -> Self {
        SocketPacket::Connect {
            namespace: DEFAULT_NAMESPACE.to_string(),
            data: None,
        }
    }

    /// `DISCONNECT` for the default namespace
    pub fn disconnect() -> Self {
        SocketPacket::Disconnect {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }

    /// `EVENT` on the default namespace with a single argument
    pub fn event(name: impl Into<String>, arg: Value) -> Self {
        SocketPacket::Event {
            namespace: DEFAULT_NAMESPACE.to_string(),
            ack: None,
            name: name.into(),
            args: vec![arg],
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            SocketPacket::Connect { namespace, .. }
            | SocketPacket::Disconnect { namespace }
            | SocketPacket::Event { namespace, .. }
            | SocketPacket::Ack { namespace, .. }
            | SocketPacket::ConnectError { namespace, .. } => namespace,
        }
    }

    /// Decode the payload of an engine `message`
    pub fn decode(text: &str) -> Result<Self, ChannelError> {
        let mut chars = text.chars();
        let kind = chars
            .next()
            .ok_or_else(|| ChannelError::Protocol("empty socket packet".to_string()))?;
        let rest = chars.as_str();

        let (namespace, rest) = split_namespace(rest);
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let (ack_digits, body) = rest.split_at(digits);
        let ack = if ack_digits.is_empty() {
            None
        } else {
            Some(
                ack_digits
                    .parse::<u64>()
                    .map_err(|e| ChannelError::Protocol(format!("bad ack id: {}", e)))?,
            )
        };

        let data: Option<Value> = if body.is_empty() {
            None
        } else {
            Some(serde_json::from_str(body)?)
        };

        match kind {
            '0' => Ok(SocketPacket::Connect { namespace, data }),
            '1' => Ok(SocketPacket::Disconnect { namespace }),
            '2' => {
                let mut args = match data {
                    Some(Value::Array(items)) => items,
                    _ => {
                        return Err(ChannelError::Protocol(
                            "event body must be a JSON array".to_string(),
                        ))
                    }
                };
                if args.is_empty() {
                    return Err(ChannelError::Protocol("event without a name".to_string()));
                }
                let name = match args.remove(0) {
                    Value::String(name) => name,
                    other => {
                        return Err(ChannelError::Protocol(format!(
                            "event name must be a string, got {}",
                            other
                        )))
                    }
                };
                Ok(SocketPacket::Event {
                    namespace,
                    ack,
                    name,
                    args,
                })
            }
            '3' => {
                let ack = ack.ok_or_else(|| ChannelError::Protocol("ack without id".to_string()))?;
                let args = match data {
                    Some(Value::Array(items)) => items,
                    None => Vec::new(),
                    Some(other) => vec![other],
                };
                Ok(SocketPacket::Ack {
                    namespace,
                    ack,
                    args,
                })
            }
            '4' => Ok(SocketPacket::ConnectError {
                namespace,
                data: data.unwrap_or(Value::Null),
            }),
            '5' | '6' => Err(ChannelError::Protocol(
                "binary socket packets are not supported".to_string(),
            )),
            other => Err(ChannelError::Protocol(format!(
                "unknown socket packet type {:?}",
                other
            ))),
        }
    }

    pub fn encode(&self) -> String {
        let (kind, ack, body) = match self {
            SocketPacket::Connect { data, .. } => ('0', None, data.as_ref().map(Value::to_string)),
            SocketPacket::Disconnect { .. } => ('1', None, None),
            SocketPacket::Event {
                ack, name, args, ..
            } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                ('2', *ack, Some(Value::Array(items).to_string()))
            }
            SocketPacket::Ack { ack, args, .. } => {
                ('3', Some(*ack), Some(Value::Array(args.clone()).to_string()))
            }
            SocketPacket::ConnectError { data, .. } => ('4', None, Some(data.to_string())),
        };

        let mut out = String::new();
        out.push(kind);
        let namespace = self.namespace();
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }
        if let Some(ack) = ack {
            out.push_str(&ack.to_string());
        }
        if let Some(body) = body {
            out.push_str(&body);
        }
        out
    }

    /// Wrap in an engine `message`
    pub fn into_engine(self) -> EnginePacket {
        EnginePacket::Message(self.encode())
    }
}

fn split_namespace(rest: &str) -> (String, &str) {
    if !rest.starts_with('/') {
        return (DEFAULT_NAMESPACE.to_string(), rest);
    }
    match rest.find(',') {
        Some(comma) => (rest[..comma].to_string(), &rest[comma + 1..]),
        None => (rest.to_string(), ""),
    }
}
