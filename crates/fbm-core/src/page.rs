use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, trace};

use crate::{
    callbacks::PayloadKind,
    config::Config,
    dispatch::{Dispatcher, Overrides},
    domain::PageInfo,
    errors::Error,
    event::{Event, EventCategory},
    payload::{Attachment, Envelope, Limits, Message, NotificationType, Recipient, SendOptions},
    ports::{PageInfoFetcher, Transport},
    security, Result,
};

/// One Messenger page: handler registration, webhook dispatch and the Send API.
///
/// Register handlers during start-up (`&mut self`), then share the page behind an
/// `Arc`; dispatch and sending only need `&self`.
pub struct Page {
    config: Config,
    limits: Limits,
    dispatcher: Dispatcher,
    transport: Arc<dyn Transport>,
    fetcher: Arc<dyn PageInfoFetcher>,
    info: OnceCell<PageInfo>,
}

impl Page {
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        fetcher: Arc<dyn PageInfoFetcher>,
    ) -> Self {
        let limits = Limits::from(&config);
        Self {
            config,
            limits,
            dispatcher: Dispatcher::new(),
            transport,
            fetcher,
            info: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    // ---- handler registration ----

    pub fn on<F>(&mut self, category: EventCategory, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.dispatcher.register(category, handler);
    }

    pub fn on_message<F>(&mut self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.on(EventCategory::Message, handler);
    }

    pub fn on_echo<F>(&mut self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.on(EventCategory::Echo, handler);
    }

    pub fn on_postback<F>(&mut self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.on(EventCategory::Postback, handler);
    }

    pub fn on_delivery<F>(&mut self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.on(EventCategory::Delivery, handler);
    }

    pub fn on_read<F>(&mut self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.on(EventCategory::Read, handler);
    }

    pub fn on_account_linking<F>(&mut self, handler: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.on(EventCategory::AccountLinking, handler);
    }

    /// Route postbacks whose payload equals one of `payloads` to `callback`.
    pub fn on_postback_payloads<I, S, F>(&mut self, payloads: I, callback: F)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &Event) + Send + Sync + 'static,
    {
        self.dispatcher
            .register_callback(PayloadKind::Postback, payloads, callback);
    }

    /// Route quick-reply messages whose payload equals one of `payloads` to `callback`.
    pub fn on_quick_reply_payloads<I, S, F>(&mut self, payloads: I, callback: F)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: Fn(&str, &Event) + Send + Sync + 'static,
    {
        self.dispatcher
            .register_callback(PayloadKind::QuickReply, payloads, callback);
    }

    // ---- inbound ----

    pub fn handle_webhook(&self, body: &str, overrides: &Overrides<'_>) -> Result<bool> {
        self.dispatcher.handle_webhook(body, overrides)
    }

    /// Like `handle_webhook`, but first checks the `X-Hub-Signature(-256)` header
    /// when an app secret is configured.
    pub fn handle_signed_webhook(
        &self,
        body: &str,
        signature: Option<&str>,
        overrides: &Overrides<'_>,
    ) -> Result<bool> {
        if let Some(secret) = self.config.app_secret.as_deref() {
            let header = signature
                .ok_or_else(|| Error::Security("missing signature header".to_string()))?;
            security::verify_signature(secret, body.as_bytes(), header)?;
        }
        self.handle_webhook(body, overrides)
    }

    /// Subscription handshake against the configured verify token.
    pub fn verify_subscription<'a>(
        &self,
        mode: &str,
        token: &str,
        challenge: &'a str,
    ) -> Option<&'a str> {
        let expected = self.config.verify_token.as_deref()?;
        security::verify_subscription(mode, token, challenge, expected)
    }

    // ---- outbound ----

    pub async fn send(
        &self,
        recipient: impl Into<Recipient>,
        text: impl Into<String>,
        opts: SendOptions,
    ) -> Result<String> {
        let envelope = Envelope::text(recipient, text, opts, &self.limits)?;
        self.send_envelope(&envelope).await
    }

    pub async fn send_attachment(
        &self,
        recipient: impl Into<Recipient>,
        attachment: Attachment,
        opts: SendOptions,
    ) -> Result<String> {
        let envelope = Envelope::attachment(recipient, attachment, opts, &self.limits)?;
        self.send_envelope(&envelope).await
    }

    pub async fn send_message(
        &self,
        recipient: impl Into<Recipient>,
        message: Message,
        notification_type: Option<NotificationType>,
    ) -> Result<String> {
        let envelope = Envelope::message(recipient, message, notification_type, &self.limits)?;
        self.send_envelope(&envelope).await
    }

    pub async fn typing_on(&self, recipient: impl Into<Recipient>) -> Result<String> {
        self.send_envelope(&Envelope::typing_on(recipient)).await
    }

    pub async fn typing_off(&self, recipient: impl Into<Recipient>) -> Result<String> {
        self.send_envelope(&Envelope::typing_off(recipient)).await
    }

    pub async fn mark_seen(&self, recipient: impl Into<Recipient>) -> Result<String> {
        self.send_envelope(&Envelope::mark_seen(recipient)).await
    }

    /// Serialize and hand one envelope to the transport.
    pub async fn send_envelope(&self, envelope: &Envelope) -> Result<String> {
        let body = envelope.to_wire()?;
        trace!(bytes = body.len(), "sending envelope");
        self.transport.send(body).await
    }

    // ---- page identity ----

    /// Page identity, fetched on first use and cached after a successful fetch.
    pub fn page_info(&self) -> Result<&PageInfo> {
        self.info.get_or_try_init(|| {
            debug!("fetching page info");
            self.fetcher.fetch_page_info()
        })
    }

    pub fn page_id(&self) -> Result<&str> {
        Ok(self.page_info()?.id.as_str())
    }

    pub fn page_name(&self) -> Result<&str> {
        Ok(self.page_info()?.name.as_str())
    }
}
