pub const TWIML_CONTENT_TYPE: &str = "application/xml";

/// A messaging TwiML response: Twilio sends each `<Message>` back to the sender.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TwimlReply {
    messages: Vec<String>,
}

impl TwimlReply {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(text: impl Into<String>) -> Self {
        Self::new().with_message(text)
    }

    pub fn with_message(mut self, text: impl Into<String>) -> Self {
        self.messages.push(text.into());
        self
    }

    pub fn render(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?><Response>"#);
        for message in &self.messages {
            xml.push_str("<Message>");
            xml.push_str(&escape_xml(message));
            xml.push_str("</Message>");
        }
        xml.push_str("</Response>");
        xml
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::TwimlReply;

    #[test]
    fn renders_single_message_response() {
        let xml = TwimlReply::message("Done: Tomato 50 kg IN").render();
        assert_eq!(
            xml,
            r#"<?xml version="1.0" encoding="UTF-8"?><Response><Message>Done: Tomato 50 kg IN</Message></Response>"#
        );
    }

    #[test]
    fn escapes_markup_in_reply_text() {
        let xml = TwimlReply::message("Aloo & Pyaz <5 kg> \"ok\"").render();
        assert!(xml.contains("<Message>Aloo &amp; Pyaz &lt;5 kg&gt; &quot;ok&quot;</Message>"));
    }

    #[test]
    fn empty_reply_is_a_bare_response() {
        assert!(TwimlReply::new().render().ends_with("<Response></Response>"));
    }

    #[test]
    fn non_ascii_text_passes_through() {
        let xml = TwimlReply::message("ٹماٹر 15 kg").render();
        assert!(xml.contains("ٹماٹر 15 kg"));
    }
}
