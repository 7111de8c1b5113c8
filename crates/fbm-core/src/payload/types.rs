use serde::Serialize;

use crate::{
    config::{Config, DEFAULT_QUICK_REPLY_LIMIT, DEFAULT_TEXT_LIMIT},
    domain::UserId,
    errors::Error,
    payload::{attachment::Attachment, wire::to_wire_string},
    Result,
};

/// Ephemeral UI signal sent instead of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderAction {
    TypingOn,
    TypingOff,
    MarkSeen,
}

/// Push notification behaviour for a delivered message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Regular,
    SilentPush,
    NoPush,
}

/// Message recipient: a page-scoped id or a phone number, never both.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Recipient {
    id: Option<UserId>,
    phone_number: Option<String>,
}

impl Recipient {
    pub fn id(id: impl Into<UserId>) -> Self {
        Self {
            id: Some(id.into()),
            phone_number: None,
        }
    }

    pub fn phone_number(phone: impl Into<String>) -> Self {
        Self {
            id: None,
            phone_number: Some(phone.into()),
        }
    }

    /// Checked constructor for callers holding both optional fields.
    pub fn new(id: Option<UserId>, phone_number: Option<String>) -> Result<Self> {
        match (id, phone_number) {
            (Some(id), None) => Ok(Self::id(id)),
            (None, Some(phone)) => Ok(Self::phone_number(phone)),
            (Some(_), Some(_)) => Err(Error::Validation(
                "recipient must have an id or a phone number, not both".to_string(),
            )),
            (None, None) => Err(Error::Validation(
                "recipient needs an id or a phone number".to_string(),
            )),
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.id.as_ref()
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }
}

impl From<UserId> for Recipient {
    fn from(id: UserId) -> Self {
        Recipient::id(id)
    }
}

impl From<i64> for Recipient {
    fn from(id: i64) -> Self {
        Recipient::id(id)
    }
}

impl From<&str> for Recipient {
    fn from(id: &str) -> Self {
        Recipient::id(id)
    }
}

impl From<String> for Recipient {
    fn from(id: String) -> Self {
        Recipient::id(id)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickReplyKind {
    #[default]
    Text,
    Location,
}

/// Suggested reply chip. Serialized as `{content_type, payload, title}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuickReply {
    content_type: QuickReplyKind,
    payload: Option<String>,
    title: Option<String>,
}

impl QuickReply {
    pub fn text(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            content_type: QuickReplyKind::Text,
            payload: Some(payload.into()),
            title: Some(title.into()),
        }
    }

    /// Location picker chip; carries neither title nor payload.
    pub fn location() -> Self {
        Self {
            content_type: QuickReplyKind::Location,
            payload: None,
            title: None,
        }
    }

    pub fn kind(&self) -> QuickReplyKind {
        self.content_type
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    fn validate(&self) -> Result<()> {
        if self.content_type != QuickReplyKind::Text {
            return Ok(());
        }
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        if blank(&self.title) || blank(&self.payload) {
            return Err(Error::Validation(
                "text quick reply needs a title and a payload".to_string(),
            ));
        }
        Ok(())
    }
}

/// `message` body of an envelope. Unset fields serialize as `null`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Message {
    pub attachment: Option<Attachment>,
    pub metadata: Option<String>,
    pub quick_replies: Option<Vec<QuickReply>>,
    pub text: Option<String>,
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn attachment(attachment: Attachment) -> Self {
        Self {
            attachment: Some(attachment),
            ..Default::default()
        }
    }

    pub fn with_quick_replies(mut self, quick_replies: Vec<QuickReply>) -> Self {
        self.quick_replies = if quick_replies.is_empty() {
            None
        } else {
            Some(quick_replies)
        };
        self
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn validate(&self, limits: &Limits) -> Result<()> {
        let text = self.text.as_deref().filter(|t| !t.is_empty());
        if text.is_none() && self.attachment.is_none() {
            return Err(Error::Validation(
                "message needs text or an attachment".to_string(),
            ));
        }
        if let Some(text) = text {
            let len = text.chars().count();
            if len > limits.text {
                return Err(Error::Validation(format!(
                    "text is {len} characters (max {})",
                    limits.text
                )));
            }
        }
        if let Some(attachment) = &self.attachment {
            attachment.validate()?;
        }
        if let Some(replies) = &self.quick_replies {
            if replies.len() > limits.quick_replies {
                return Err(Error::Validation(format!(
                    "{} quick replies (max {})",
                    replies.len(),
                    limits.quick_replies
                )));
            }
            replies.iter().try_for_each(QuickReply::validate)?;
        }
        Ok(())
    }
}

/// Platform limits enforced when an envelope is built.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub text: usize,
    pub quick_replies: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            text: DEFAULT_TEXT_LIMIT,
            quick_replies: DEFAULT_QUICK_REPLY_LIMIT,
        }
    }
}

impl From<&Config> for Limits {
    fn from(cfg: &Config) -> Self {
        Self {
            text: cfg.text_limit,
            quick_replies: cfg.quick_reply_limit,
        }
    }
}

/// Optional parts of a message send.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SendOptions {
    pub quick_replies: Vec<QuickReply>,
    pub metadata: Option<String>,
    pub notification_type: Option<NotificationType>,
}

impl SendOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quick_replies(mut self, quick_replies: Vec<QuickReply>) -> Self {
        self.quick_replies = quick_replies;
        self
    }

    pub fn metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }

    pub fn notification_type(mut self, notification_type: NotificationType) -> Self {
        self.notification_type = Some(notification_type);
        self
    }
}

/// Top-level Send API body.
///
/// Holds either a `message` or a `sender_action`; every top-level key is always
/// serialized, with the absent ones as `null`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Envelope {
    message: Option<Message>,
    notification_type: Option<NotificationType>,
    recipient: Recipient,
    sender_action: Option<SenderAction>,
}

impl Envelope {
    /// Validated message envelope.
    pub fn message(
        recipient: impl Into<Recipient>,
        message: Message,
        notification_type: Option<NotificationType>,
        limits: &Limits,
    ) -> Result<Self> {
        message.validate(limits)?;
        Ok(Self {
            message: Some(message),
            notification_type,
            recipient: recipient.into(),
            sender_action: None,
        })
    }

    pub fn text(
        recipient: impl Into<Recipient>,
        text: impl Into<String>,
        opts: SendOptions,
        limits: &Limits,
    ) -> Result<Self> {
        Self::with_options(recipient, Message::text(text), opts, limits)
    }

    pub fn attachment(
        recipient: impl Into<Recipient>,
        attachment: Attachment,
        opts: SendOptions,
        limits: &Limits,
    ) -> Result<Self> {
        Self::with_options(recipient, Message::attachment(attachment), opts, limits)
    }

    fn with_options(
        recipient: impl Into<Recipient>,
        mut message: Message,
        opts: SendOptions,
        limits: &Limits,
    ) -> Result<Self> {
        message = message.with_quick_replies(opts.quick_replies);
        message.metadata = opts.metadata;
        Self::message(recipient, message, opts.notification_type, limits)
    }

    pub fn sender_action(recipient: impl Into<Recipient>, action: SenderAction) -> Self {
        Self {
            message: None,
            notification_type: None,
            recipient: recipient.into(),
            sender_action: Some(action),
        }
    }

    pub fn typing_on(recipient: impl Into<Recipient>) -> Self {
        Self::sender_action(recipient, SenderAction::TypingOn)
    }

    pub fn typing_off(recipient: impl Into<Recipient>) -> Self {
        Self::sender_action(recipient, SenderAction::TypingOff)
    }

    pub fn mark_seen(recipient: impl Into<Recipient>) -> Self {
        Self::sender_action(recipient, SenderAction::MarkSeen)
    }

    pub fn recipient(&self) -> &Recipient {
        &self.recipient
    }

    pub fn body(&self) -> Option<&Message> {
        self.message.as_ref()
    }

    pub fn action(&self) -> Option<SenderAction> {
        self.sender_action
    }

    pub fn to_wire(&self) -> Result<String> {
        to_wire_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> Limits {
        Limits::default()
    }

    #[test]
    fn text_with_quick_reply_matches_wire_contract() {
        let env = Envelope::text(
            12345i64,
            "hello world",
            SendOptions::new().quick_replies(vec![QuickReply::text("Yes", "YES")]),
            &limits(),
        )
        .unwrap();
        assert_eq!(
            env.to_wire().unwrap(),
            concat!(
                r#"{"message": {"attachment": null, "metadata": null, "quick_replies": "#,
                r#"[{"content_type": "text", "payload": "YES", "title": "Yes"}], "#,
                r#""text": "hello world"}, "notification_type": null, "#,
                r#""recipient": {"id": 12345, "phone_number": null}, "sender_action": null}"#
            )
        );
    }

    #[test]
    fn plain_text_leaves_everything_else_null() {
        let env = Envelope::text("1134343043305865", "hi", SendOptions::new(), &limits()).unwrap();
        assert_eq!(
            env.to_wire().unwrap(),
            concat!(
                r#"{"message": {"attachment": null, "metadata": null, "quick_replies": null, "#,
                r#""text": "hi"}, "notification_type": null, "#,
                r#""recipient": {"id": "1134343043305865", "phone_number": null}, "#,
                r#""sender_action": null}"#
            )
        );
    }

    #[test]
    fn sender_actions_have_null_message() {
        let cases = [
            (Envelope::typing_on(1004i64), "typing_on"),
            (Envelope::typing_off(1004i64), "typing_off"),
            (Envelope::mark_seen(1004i64), "mark_seen"),
        ];
        for (env, action) in cases {
            assert_eq!(
                env.to_wire().unwrap(),
                format!(
                    r#"{{"message": null, "notification_type": null, "recipient": {{"id": 1004, "phone_number": null}}, "sender_action": "{action}"}}"#
                )
            );
        }
    }

    #[test]
    fn metadata_notification_and_phone_recipient() {
        let env = Envelope::text(
            Recipient::phone_number("+1(212)555-2368"),
            "hey",
            SendOptions::new()
                .metadata("DEV_META")
                .notification_type(NotificationType::SilentPush),
            &limits(),
        )
        .unwrap();
        assert_eq!(
            env.to_wire().unwrap(),
            concat!(
                r#"{"message": {"attachment": null, "metadata": "DEV_META", "quick_replies": null, "#,
                r#""text": "hey"}, "notification_type": "SILENT_PUSH", "#,
                r#""recipient": {"id": null, "phone_number": "+1(212)555-2368"}, "#,
                r#""sender_action": null}"#
            )
        );
    }

    #[test]
    fn location_quick_reply_has_null_title_and_payload() {
        let env = Envelope::text(
            7i64,
            "where?",
            SendOptions::new().quick_replies(vec![QuickReply::location()]),
            &limits(),
        )
        .unwrap();
        assert!(env.to_wire().unwrap().contains(
            r#""quick_replies": [{"content_type": "location", "payload": null, "title": null}]"#
        ));
    }

    #[test]
    fn attachment_message() {
        let env = Envelope::attachment(
            7i64,
            Attachment::image("https://example.com/a.png"),
            SendOptions::new(),
            &limits(),
        )
        .unwrap();
        assert_eq!(
            env.to_wire().unwrap(),
            concat!(
                r#"{"message": {"attachment": {"payload": {"url": "https://example.com/a.png"}, "#,
                r#""type": "image"}, "metadata": null, "quick_replies": null, "text": null}, "#,
                r#""notification_type": null, "recipient": {"id": 7, "phone_number": null}, "#,
                r#""sender_action": null}"#
            )
        );
    }

    #[test]
    fn rejects_text_over_limit() {
        let tight = Limits {
            text: 5,
            quick_replies: 13,
        };
        assert!(Envelope::text(1i64, "12345", SendOptions::new(), &tight).is_ok());
        // Limit counts characters, not bytes.
        assert!(Envelope::text(1i64, "ééééé", SendOptions::new(), &tight).is_ok());
        assert!(matches!(
            Envelope::text(1i64, "123456", SendOptions::new(), &tight),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn rejects_empty_message() {
        assert!(matches!(
            Envelope::message(1i64, Message::default(), None, &limits()),
            Err(Error::Validation(_))
        ));
        assert!(Envelope::text(1i64, "", SendOptions::new(), &limits()).is_err());
    }

    #[test]
    fn rejects_too_many_or_blank_quick_replies() {
        let replies = (0..14)
            .map(|i| QuickReply::text(format!("t{i}"), format!("P{i}")))
            .collect::<Vec<_>>();
        assert!(Envelope::text(1i64, "x", SendOptions::new().quick_replies(replies), &limits()).is_err());

        let blank = vec![QuickReply::text("", "P")];
        assert!(Envelope::text(1i64, "x", SendOptions::new().quick_replies(blank), &limits()).is_err());
    }

    #[test]
    fn recipient_requires_exactly_one_address() {
        assert!(Recipient::new(Some(UserId::from(1i64)), None).is_ok());
        assert!(Recipient::new(None, Some("+100".to_string())).is_ok());
        assert!(matches!(
            Recipient::new(Some(UserId::from(1i64)), Some("+100".to_string())),
            Err(Error::Validation(_))
        ));
        assert!(Recipient::new(None, None).is_err());
    }

    #[test]
    fn limits_follow_config() {
        let cfg = Config {
            text_limit: 320,
            quick_reply_limit: 3,
            ..Config::default()
        };
        assert_eq!(
            Limits::from(&cfg),
            Limits {
                text: 320,
                quick_replies: 3
            }
        );
    }
}
