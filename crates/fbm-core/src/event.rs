//! Inbound webhook model.
//!
//! A webhook body carries entries, each entry carries raw messaging events. Every
//! raw event is classified by which variant key it holds (`message`, `postback`,
//! `delivery`, `read`, `account_linking`); a `message` with `is_echo: true` is an
//! echo. Anything else is unknown and yields `None`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::Result;

/// Value of the top-level `object` field for page webhooks.
pub const PAGE_OBJECT: &str = "page";

/// Top-level webhook body.
///
/// Only the JSON syntax is checked up front. `object` and the entries stay raw
/// until the page check passes, and each entry is decoded on its own so one
/// malformed entry or event does not reject the whole delivery.
#[derive(Clone, Debug, Default)]
pub struct WebhookBody {
    pub object: Option<Value>,
    pub entry: Vec<Value>,
}

impl WebhookBody {
    pub fn parse(body: &str) -> Result<Self> {
        let mut value: Value = serde_json::from_str(body)?;
        let object = value.get_mut("object").map(Value::take);
        let entry = match value.get_mut("entry").map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        Ok(Self { object, entry })
    }

    pub fn is_page(&self) -> bool {
        self.object.as_ref().and_then(Value::as_str) == Some(PAGE_OBJECT)
    }

    /// Decode each entry independently, in order.
    pub fn entries(&self) -> impl Iterator<Item = Result<Entry>> + '_ {
        self.entry.iter().map(Entry::parse)
    }
}

/// One page-scoped batch of events.
#[derive(Clone, Debug, Deserialize)]
pub struct Entry {
    #[serde(default, deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub messaging: Vec<Value>,
}

impl Entry {
    pub fn parse(raw: &Value) -> Result<Self> {
        Ok(Entry::deserialize(raw)?)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Message,
    Echo,
    Postback,
    Delivery,
    Read,
    AccountLinking,
}

impl EventCategory {
    pub const ALL: [EventCategory; 6] = [
        EventCategory::Message,
        EventCategory::Echo,
        EventCategory::Postback,
        EventCategory::Delivery,
        EventCategory::Read,
        EventCategory::AccountLinking,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventCategory::Message => "message",
            EventCategory::Echo => "echo",
            EventCategory::Postback => "postback",
            EventCategory::Delivery => "delivery",
            EventCategory::Read => "read",
            EventCategory::AccountLinking => "account_linking",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

/// One classified messaging event.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub sender_id: String,
    pub recipient_id: String,
    /// Milliseconds since the epoch, as sent by the platform.
    pub timestamp: i64,
    pub kind: EventKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    Message(MessageEvent),
    Echo(EchoEvent),
    Postback(PostbackEvent),
    Delivery(DeliveryEvent),
    Read(ReadEvent),
    AccountLinking(AccountLinkingEvent),
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct MessageEvent {
    #[serde(default)]
    pub mid: Option<String>,
    #[serde(default)]
    pub seq: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub quick_reply: Option<QuickReplyPayload>,
    #[serde(default)]
    pub attachments: Vec<InboundAttachment>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct QuickReplyPayload {
    pub payload: String,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct InboundAttachment {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

/// A message the page itself sent, echoed back by the platform.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EchoEvent {
    pub app_id: Option<u64>,
    pub metadata: Option<String>,
    pub message: MessageEvent,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PostbackEvent {
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DeliveryEvent {
    #[serde(default)]
    pub mids: Vec<String>,
    pub watermark: i64,
    #[serde(default)]
    pub seq: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ReadEvent {
    pub watermark: i64,
    #[serde(default)]
    pub seq: Option<i64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Linked,
    Unlinked,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AccountLinkingEvent {
    #[serde(default)]
    pub authorization_code: Option<String>,
    pub status: LinkStatus,
}

#[derive(Deserialize)]
struct Party {
    #[serde(deserialize_with = "id_string")]
    id: String,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(default)]
    is_echo: bool,
    #[serde(default)]
    app_id: Option<u64>,
    #[serde(default)]
    metadata: Option<String>,
    #[serde(flatten)]
    body: MessageEvent,
}

#[derive(Deserialize)]
struct RawEvent {
    sender: Party,
    recipient: Party,
    #[serde(default)]
    timestamp: i64,
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    postback: Option<PostbackEvent>,
    #[serde(default)]
    delivery: Option<DeliveryEvent>,
    #[serde(default)]
    read: Option<ReadEvent>,
    #[serde(default)]
    account_linking: Option<AccountLinkingEvent>,
}

impl Event {
    /// Classify one raw messaging event.
    ///
    /// `Ok(None)` means no recognized variant key; `Err` means a recognized shape
    /// that failed to decode.
    pub fn parse(raw: &Value) -> Result<Option<Event>> {
        let raw = RawEvent::deserialize(raw)?;

        let kind = if let Some(msg) = raw.message {
            if msg.is_echo {
                EventKind::Echo(EchoEvent {
                    app_id: msg.app_id,
                    metadata: msg.metadata,
                    message: msg.body,
                })
            } else {
                EventKind::Message(msg.body)
            }
        } else if let Some(p) = raw.postback {
            EventKind::Postback(p)
        } else if let Some(d) = raw.delivery {
            EventKind::Delivery(d)
        } else if let Some(r) = raw.read {
            EventKind::Read(r)
        } else if let Some(a) = raw.account_linking {
            EventKind::AccountLinking(a)
        } else {
            return Ok(None);
        };

        Ok(Some(Event {
            sender_id: raw.sender.id,
            recipient_id: raw.recipient.id,
            timestamp: raw.timestamp,
            kind,
        }))
    }

    pub fn category(&self) -> EventCategory {
        match &self.kind {
            EventKind::Message(_) => EventCategory::Message,
            EventKind::Echo(_) => EventCategory::Echo,
            EventKind::Postback(_) => EventCategory::Postback,
            EventKind::Delivery(_) => EventCategory::Delivery,
            EventKind::Read(_) => EventCategory::Read,
            EventKind::AccountLinking(_) => EventCategory::AccountLinking,
        }
    }

    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    pub fn recipient_id(&self) -> &str {
        &self.recipient_id
    }

    /// Platform timestamp as UTC; `None` if out of range.
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp)
    }

    /// Message body for both plain messages and echoes.
    pub fn message(&self) -> Option<&MessageEvent> {
        match &self.kind {
            EventKind::Message(m) => Some(m),
            EventKind::Echo(e) => Some(&e.message),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.message().and_then(|m| m.text.as_deref())
    }

    /// Quick-reply payload of a plain (non-echo) message.
    pub fn quick_reply_payload(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Message(m) => m.quick_reply.as_ref().map(|q| q.payload.as_str()),
            _ => None,
        }
    }

    pub fn postback_payload(&self) -> Option<&str> {
        match &self.kind {
            EventKind::Postback(p) => Some(p.payload.as_str()),
            _ => None,
        }
    }
}

/// Ids arrive as strings, but accept bare numbers too.
fn id_string<'de, D>(de: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(i64),
    }

    Ok(match Id::deserialize(de)? {
        Id::Str(s) => s,
        Id::Num(n) => n.to_string(),
    })
}
