//! `fbm`: replay a Messenger webhook body through the adapter.
//!
//! Events are logged to stderr. Text messages are answered with a dry-run reply
//! whose Send API body is printed to stdout instead of being posted.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;

use fbm_core::{
    config::Config,
    dispatch::Overrides,
    domain::PageInfo,
    event::{Event, EventKind, WebhookBody},
    page::Page,
    payload::SendOptions,
    ports::{PageInfoFetcher, Transport},
    security,
};

/// Prints each body on its own line rather than posting it.
struct StdoutTransport;

#[async_trait]
impl Transport for StdoutTransport {
    async fn send(&self, body: String) -> fbm_core::Result<String> {
        let mut out = tokio::io::stdout();
        out.write_all(body.as_bytes()).await?;
        out.write_all(b"\n").await?;
        out.flush().await?;
        Ok(r#"{"dry_run": true}"#.to_string())
    }
}

/// Page identity taken from the replayed body instead of the Graph API.
struct ReplayPageInfo {
    id: String,
}

impl PageInfoFetcher for ReplayPageInfo {
    fn fetch_page_info(&self) -> fbm_core::Result<PageInfo> {
        if self.id.is_empty() {
            return Err(fbm_core::Error::External(
                "webhook body has no entry to take the page id from".to_string(),
            ));
        }
        Ok(PageInfo {
            id: self.id.clone(),
            name: "replay".to_string(),
        })
    }
}

#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about = "Replay a Messenger webhook body through the adapter")]
struct Args {
    /// Webhook body to replay; `-` or no path reads stdin
    path: Option<PathBuf>,
    /// Signature header value (`sha256=<hex>` or `sha1=<hex>`), checked when
    /// FB_APP_SECRET is set
    #[arg(long, value_name = "HEADER")]
    signature: Option<String>,
}

impl Args {
    fn body_path(&self) -> Option<&Path> {
        self.path.as_deref().filter(|p| *p != Path::new("-"))
    }
}

struct Reply {
    recipient: String,
    text: String,
}

fn queue_reply(queue: &Mutex<Vec<Reply>>, reply: Reply) {
    queue
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(reply);
}

fn take_replies(queue: &Mutex<Vec<Reply>>) -> Vec<Reply> {
    std::mem::take(&mut *queue.lock().unwrap_or_else(PoisonError::into_inner))
}

fn reply_text(text: &str, limit: usize) -> String {
    format!("You said: {text}").chars().take(limit).collect()
}

async fn read_body(path: Option<&Path>) -> anyhow::Result<String> {
    match path {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading {}", path.display())),
        None => {
            let mut body = String::new();
            tokio::io::stdin()
                .read_to_string(&mut body)
                .await
                .context("reading stdin")?;
            Ok(body)
        }
    }
}

fn log_event(event: &Event) {
    match &event.kind {
        EventKind::Message(m) => info!(
            sender = event.sender_id(),
            text = m.text.as_deref().unwrap_or(""),
            attachments = m.attachments.len(),
            "message"
        ),
        EventKind::Echo(e) => info!(
            recipient = event.recipient_id(),
            app_id = e.app_id.unwrap_or_default(),
            "echo"
        ),
        EventKind::Postback(p) => info!(sender = event.sender_id(), payload = %p.payload, "postback"),
        EventKind::Delivery(d) => info!(
            sender = event.sender_id(),
            mids = d.mids.len(),
            watermark = d.watermark,
            "delivery"
        ),
        EventKind::Read(r) => info!(sender = event.sender_id(), watermark = r.watermark, "read"),
        EventKind::AccountLinking(a) => {
            info!(sender = event.sender_id(), status = ?a.status, "account linking")
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    fbm_core::logging::init("fbm")?;

    let cfg = Config::load()?;
    let body = read_body(args.body_path()).await?;

    let page_id = WebhookBody::parse(&body)
        .ok()
        .and_then(|b| b.entries().find_map(|e| e.ok()))
        .map(|e| e.id)
        .unwrap_or_default();

    let text_limit = cfg.text_limit;
    let mut page = Page::new(
        cfg,
        Arc::new(StdoutTransport),
        Arc::new(ReplayPageInfo { id: page_id }),
    );

    let replies: Arc<Mutex<Vec<Reply>>> = Arc::new(Mutex::new(Vec::new()));
    let queue = Arc::clone(&replies);
    page.on_message(move |event: &Event| {
        log_event(event);
        if let Some(text) = event.text() {
            queue_reply(
                &queue,
                Reply {
                    recipient: event.sender_id().to_string(),
                    text: reply_text(text, text_limit),
                },
            );
        }
    });
    page.on_echo(log_event);
    page.on_postback(log_event);
    page.on_delivery(log_event);
    page.on_read(log_event);
    page.on_account_linking(log_event);

    if let Some(sig) = args.signature.as_deref() {
        info!(header = security::signature_header_name(sig), "signature supplied");
    }
    let handled = page.handle_signed_webhook(&body, args.signature.as_deref(), &Overrides::new())?;
    if !handled {
        println!("not handled");
        return Ok(());
    }

    if let Ok(info) = page.page_info() {
        info!(page = %info.id, "replayed webhook");
    }

    for reply in take_replies(&replies) {
        page.send(reply.recipient, reply.text, SendOptions::new())
            .await
            .context("building dry-run reply")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn args(v: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("fbm").chain(v.iter().copied()))
    }

    #[test]
    fn parses_path_and_signature() {
        let none = args(&[]).unwrap();
        assert_eq!(none.path, None);
        assert_eq!(none.body_path(), None);

        let dash = args(&["-"]).unwrap();
        assert_eq!(dash.body_path(), None);

        let full = args(&["body.json", "--signature", "sha256=ab"]).unwrap();
        assert_eq!(full.body_path(), Some(Path::new("body.json")));
        assert_eq!(full.signature.as_deref(), Some("sha256=ab"));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(args(&["--signature"]).is_err());
        assert!(args(&["--verbose"]).is_err());
        assert!(args(&["a.json", "b.json"]).is_err());
    }

    #[test]
    fn reply_respects_text_limit() {
        assert_eq!(reply_text("hi", 2000), "You said: hi");
        assert_eq!(reply_text("hello", 12).chars().count(), 12);
    }

    #[test]
    fn poisoned_reply_queue_keeps_replies() {
        let queue = Arc::new(Mutex::new(Vec::<Reply>::new()));
        queue_reply(
            &queue,
            Reply {
                recipient: "1".to_string(),
                text: "first".to_string(),
            },
        );

        let q = Arc::clone(&queue);
        let _ = thread::spawn(move || {
            let _guard = q.lock().unwrap();
            panic!("poison the queue");
        })
        .join();
        assert!(queue.is_poisoned());

        queue_reply(
            &queue,
            Reply {
                recipient: "2".to_string(),
                text: "second".to_string(),
            },
        );
        let texts: Vec<_> = take_replies(&queue).into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(take_replies(&queue).is_empty());
    }

    #[test]
    fn replay_page_info_needs_an_entry() {
        assert!(ReplayPageInfo { id: String::new() }.fetch_page_info().is_err());
        let info = ReplayPageInfo { id: "42".to_string() }.fetch_page_info().unwrap();
        assert_eq!(info.id, "42");
    }
}
