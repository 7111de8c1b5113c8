use std::{collections::HashMap, fmt, sync::Arc};

use crate::event::Event;

/// Callback bound to one payload literal; receives `(payload, event)`.
pub type PayloadCallback = Arc<dyn Fn(&str, &Event) + Send + Sync>;

/// Which payload namespace a callback lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Postback,
    QuickReply,
}

/// Exact-match routing tables for postback and quick-reply payloads.
///
/// Keys are compared byte-for-byte: no prefixes, wildcards or case folding.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    postback: HashMap<String, PayloadCallback>,
    quick_reply: HashMap<String, PayloadCallback>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `callback` to every literal in `payloads`; a later registration for
    /// the same literal replaces the earlier one.
    pub fn register<I, S>(&mut self, kind: PayloadKind, payloads: I, callback: PayloadCallback)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = self.table_mut(kind);
        for payload in payloads {
            table.insert(payload.into(), Arc::clone(&callback));
        }
    }

    pub fn resolve(&self, kind: PayloadKind, payload: &str) -> Option<&PayloadCallback> {
        self.table(kind).get(payload)
    }

    pub fn len(&self, kind: PayloadKind) -> usize {
        self.table(kind).len()
    }

    pub fn is_empty(&self) -> bool {
        self.postback.is_empty() && self.quick_reply.is_empty()
    }

    fn table(&self, kind: PayloadKind) -> &HashMap<String, PayloadCallback> {
        match kind {
            PayloadKind::Postback => &self.postback,
            PayloadKind::QuickReply => &self.quick_reply,
        }
    }

    fn table_mut(&mut self, kind: PayloadKind) -> &mut HashMap<String, PayloadCallback> {
        match kind {
            PayloadKind::Postback => &mut self.postback,
            PayloadKind::QuickReply => &mut self.quick_reply,
        }
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut postback: Vec<_> = self.postback.keys().collect();
        let mut quick_reply: Vec<_> = self.quick_reply.keys().collect();
        postback.sort();
        quick_reply.sort();
        f.debug_struct("CallbackRegistry")
            .field("postback", &postback)
            .field("quick_reply", &quick_reply)
            .finish()
    }
}
