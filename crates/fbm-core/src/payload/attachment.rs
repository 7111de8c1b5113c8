use serde::Serialize;

use crate::{errors::Error, Result};

/// Max buttons on a button template or a generic element.
pub const MAX_BUTTONS: usize = 3;
/// Max elements in one generic template.
pub const MAX_ELEMENTS: usize = 10;

/// `message.attachment` body.
///
/// Serialized as `{"payload": {...}, "type": "<kind>"}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Attachment {
    Image(MediaPayload),
    Audio(MediaPayload),
    Video(MediaPayload),
    File(MediaPayload),
    Template(Template),
}

impl Attachment {
    pub fn image(url: impl Into<String>) -> Self {
        Attachment::Image(MediaPayload::new(url))
    }

    pub fn audio(url: impl Into<String>) -> Self {
        Attachment::Audio(MediaPayload::new(url))
    }

    pub fn video(url: impl Into<String>) -> Self {
        Attachment::Video(MediaPayload::new(url))
    }

    pub fn file(url: impl Into<String>) -> Self {
        Attachment::File(MediaPayload::new(url))
    }

    pub fn button_template(text: impl Into<String>, buttons: Vec<Button>) -> Self {
        Attachment::Template(Template::Button {
            text: text.into(),
            buttons,
        })
    }

    pub fn generic_template(elements: Vec<Element>) -> Self {
        Attachment::Template(Template::Generic { elements })
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Attachment::Image(m) | Attachment::Audio(m) | Attachment::Video(m) | Attachment::File(m) => {
                if m.url.trim().is_empty() {
                    return Err(Error::Validation("attachment url is empty".to_string()));
                }
                Ok(())
            }
            Attachment::Template(t) => t.validate(),
        }
    }
}

/// Media referenced by URL. `is_reusable` is only emitted when set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MediaPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_reusable: Option<bool>,
    pub url: String,
}

impl MediaPayload {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            is_reusable: None,
            url: url.into(),
        }
    }

    pub fn reusable(mut self) -> Self {
        self.is_reusable = Some(true);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "template_type", rename_all = "snake_case")]
pub enum Template {
    Button { text: String, buttons: Vec<Button> },
    Generic { elements: Vec<Element> },
}

impl Template {
    fn validate(&self) -> Result<()> {
        match self {
            Template::Button { text, buttons } => {
                if text.trim().is_empty() {
                    return Err(Error::Validation(
                        "button template text is empty".to_string(),
                    ));
                }
                if buttons.is_empty() || buttons.len() > MAX_BUTTONS {
                    return Err(Error::Validation(format!(
                        "button template needs 1-{MAX_BUTTONS} buttons, got {}",
                        buttons.len()
                    )));
                }
                buttons.iter().try_for_each(Button::validate)
            }
            Template::Generic { elements } => {
                if elements.is_empty() || elements.len() > MAX_ELEMENTS {
                    return Err(Error::Validation(format!(
                        "generic template needs 1-{MAX_ELEMENTS} elements, got {}",
                        elements.len()
                    )));
                }
                elements.iter().try_for_each(Element::validate)
            }
        }
    }
}

/// One card of a generic template. Unset optional fields serialize as `null`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Element {
    pub buttons: Option<Vec<Button>>,
    pub image_url: Option<String>,
    pub item_url: Option<String>,
    pub subtitle: Option<String>,
    pub title: String,
}

impl Element {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            buttons: None,
            image_url: None,
            item_url: None,
            subtitle: None,
            title: title.into(),
        }
    }

    pub fn subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = Some(subtitle.into());
        self
    }

    pub fn image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn item_url(mut self, url: impl Into<String>) -> Self {
        self.item_url = Some(url.into());
        self
    }

    pub fn buttons(mut self, buttons: Vec<Button>) -> Self {
        self.buttons = Some(buttons);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("element title is empty".to_string()));
        }
        let Some(buttons) = &self.buttons else {
            return Ok(());
        };
        if buttons.len() > MAX_BUTTONS {
            return Err(Error::Validation(format!(
                "element `{}` has {} buttons (max {MAX_BUTTONS})",
                self.title,
                buttons.len()
            )));
        }
        buttons.iter().try_for_each(Button::validate)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Button {
    WebUrl { title: String, url: String },
    Postback { title: String, payload: String },
    /// `payload` carries the phone number to dial.
    PhoneNumber { title: String, payload: String },
}

impl Button {
    pub fn web_url(title: impl Into<String>, url: impl Into<String>) -> Self {
        Button::WebUrl {
            title: title.into(),
            url: url.into(),
        }
    }

    pub fn postback(title: impl Into<String>, payload: impl Into<String>) -> Self {
        Button::Postback {
            title: title.into(),
            payload: payload.into(),
        }
    }

    pub fn phone_number(title: impl Into<String>, phone: impl Into<String>) -> Self {
        Button::PhoneNumber {
            title: title.into(),
            payload: phone.into(),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Button::WebUrl { title, .. }
            | Button::Postback { title, .. }
            | Button::PhoneNumber { title, .. } => title,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.title().trim().is_empty() {
            return Err(Error::Validation("button title is empty".to_string()));
        }
        let (field, value) = match self {
            Button::WebUrl { url, .. } => ("url", url),
            Button::Postback { payload, .. } | Button::PhoneNumber { payload, .. } => {
                ("payload", payload)
            }
        };
        if value.trim().is_empty() {
            return Err(Error::Validation(format!(
                "button `{}` has an empty {field}",
                self.title()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::wire::to_wire_string;

    #[test]
    fn media_attachment_shape() {
        let a = Attachment::image("https://example.com/cat.png");
        assert_eq!(
            to_wire_string(&a).unwrap(),
            r#"{"payload": {"url": "https://example.com/cat.png"}, "type": "image"}"#
        );

        let a = Attachment::File(MediaPayload::new("https://example.com/a.pdf").reusable());
        assert_eq!(
            to_wire_string(&a).unwrap(),
            r#"{"payload": {"is_reusable": true, "url": "https://example.com/a.pdf"}, "type": "file"}"#
        );
    }

    #[test]
    fn button_template_shape() {
        let a = Attachment::button_template(
            "Pick one",
            vec![
                Button::web_url("Site", "https://example.com"),
                Button::postback("Start", "START"),
                Button::phone_number("Call", "+15550100"),
            ],
        );
        assert_eq!(
            to_wire_string(&a).unwrap(),
            concat!(
                r#"{"payload": {"buttons": ["#,
                r#"{"title": "Site", "type": "web_url", "url": "https://example.com"}, "#,
                r#"{"payload": "START", "title": "Start", "type": "postback"}, "#,
                r#"{"payload": "+15550100", "title": "Call", "type": "phone_number"}], "#,
                r#""template_type": "button", "text": "Pick one"}, "type": "template"}"#
            )
        );
        assert!(a.validate().is_ok());
    }

    #[test]
    fn generic_element_emits_nulls() {
        let a = Attachment::generic_template(vec![Element::new("Shoe").subtitle("Red")]);
        assert_eq!(
            to_wire_string(&a).unwrap(),
            concat!(
                r#"{"payload": {"elements": [{"buttons": null, "image_url": null, "#,
                r#""item_url": null, "subtitle": "Red", "title": "Shoe"}], "#,
                r#""template_type": "generic"}, "type": "template"}"#
            )
        );
    }

    #[test]
    fn template_limits_are_enforced() {
        let too_many = vec![Button::postback("a", "A"); 4];
        assert!(matches!(
            Attachment::button_template("x", too_many).validate(),
            Err(Error::Validation(_))
        ));
        assert!(Attachment::button_template("x", vec![]).validate().is_err());
        assert!(Attachment::generic_template(vec![]).validate().is_err());
        assert!(Attachment::button_template("x", vec![Button::postback("a", " ")])
            .validate()
            .is_err());
        assert!(Attachment::image("").validate().is_err());
    }
}
