//! Message parser - Normalises inbound text before command matching

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// Leading user mention, e.g. `<@U024BE7LH>` or `<@U024BE7LH|bot>`
static MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*<@[A-Z0-9]+(\|[^>]*)?>[\s:,]*").expect("valid mention regex")
});

/// Turns raw platform text into command input
#[derive(Debug, Clone, Default)]
pub struct MessageParser;

impl MessageParser {
    pub fn new() -> Self {
        Self
    }

    /// Strip a leading bot mention; the rest of the text is left untouched
    pub fn parse<'a>(&self, text: &'a str) -> &'a str {
        match MENTION.find(text) {
            Some(m) => &text[m.end()..],
            None => text,
        }
    }
}
