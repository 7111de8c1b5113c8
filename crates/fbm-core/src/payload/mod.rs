//! Outbound Send API payloads.

pub mod attachment;
pub mod types;
pub mod wire;

pub use attachment::{Attachment, Button, Element, MediaPayload, Template};
pub use types::{
    Envelope, Limits, Message, NotificationType, QuickReply, QuickReplyKind, Recipient,
    SendOptions, SenderAction,
};
