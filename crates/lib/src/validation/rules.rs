//! Ready-made validators for common text rules.

use std::sync::OnceLock;

use regex::Regex;

use super::{Validation, Validator, validator};

// ASCII word characters only, like `\w` in browser regexes
fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?-u:\w)+@(?-u:\w)+\.(?-u:\w)+").expect("email pattern is a valid regex")
    })
}

/// Something shaped like `name@host.tld` somewhere in the text.
pub fn looks_like_email(text: &str) -> bool {
    email_regex().is_match(text)
}

/// Rejects text that does not contain an email address with `message`.
pub fn email(message: impl Into<String>) -> Validator {
    let message = message.into();
    validator(move |value, _, _, _| {
        Ok(if looks_like_email(value.as_text_or_empty()) {
            Validation::Valid
        } else {
            Validation::invalid(message.clone())
        })
    })
}
