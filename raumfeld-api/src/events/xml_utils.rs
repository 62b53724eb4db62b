//! XML helpers for UPnP event payloads.
//!
//! GENA bodies mix namespace prefixes (`e:propertyset`) and default
//! namespaces freely. The serde structs in this crate are written against
//! local names only, so payloads go through [`strip_namespaces`] first.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::{ApiError, Result};

/// Strip namespaces and deserialize `xml` into `T`.
pub fn parse<T: DeserializeOwned>(xml: &str) -> Result<T> {
    let stripped = strip_namespaces(xml);
    quick_xml::de::from_str(&stripped)
        .map_err(|e| ApiError::ParseError(format!("XML deserialization failed: {}", e)))
}

/// Remove namespace prefixes from element and attribute names and drop
/// `xmlns` declarations.
///
/// Text content is copied untouched, so escaped documents nested in text
/// (such as `LastChange`) survive for a second pass.
///
/// `<e:propertyset xmlns:e="urn:x"><e:property/></e:propertyset>` becomes
/// `<propertyset><property/></propertyset>`.
pub fn strip_namespaces(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        match tag_end(&rest[open..]) {
            Some(len) => {
                out.push_str(&strip_tag(&rest[open..open + len]));
                rest = &rest[open + len..];
            }
            None => {
                // Unterminated tag; leave it for the parser to reject
                out.push_str(&rest[open..]);
                return out;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Length of the tag starting at `s[0] == '<'`, honouring quoted values.
fn tag_end(s: &str) -> Option<usize> {
    let mut quote = None;
    for (i, c) in s.char_indices() {
        match (quote, c) {
            (None, '"') | (None, '\'') => quote = Some(c),
            (Some(q), c) if c == q => quote = None,
            (None, '>') => return Some(i + 1),
            _ => {}
        }
    }
    None
}

fn strip_tag(tag: &str) -> String {
    if tag.starts_with("<?") || tag.starts_with("<!") {
        return tag.to_string();
    }

    let (open, body) = match tag.strip_prefix("</") {
        Some(body) => ("</", body),
        None => ("<", &tag[1..]),
    };
    let body = body.strip_suffix('>').unwrap_or(body);
    let (body, self_closing) = match body.trim_end().strip_suffix('/') {
        Some(body) => (body, true),
        None => (body, false),
    };

    let mut tokens = split_outside_quotes(body).into_iter();
    let mut out = String::from(open);
    if let Some(name) = tokens.next() {
        out.push_str(local_name(name));
    }

    for token in tokens {
        match token.split_once('=') {
            Some((name, _)) if name.starts_with("xmlns") => {}
            Some((name, value)) => {
                out.push(' ');
                out.push_str(local_name(name));
                out.push('=');
                out.push_str(value);
            }
            None => {
                out.push(' ');
                out.push_str(token);
            }
        }
    }

    if self_closing {
        out.push('/');
    }
    out.push('>');
    out
}

fn split_outside_quotes(s: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    let mut quote = None;

    for (i, c) in s.char_indices() {
        match (quote, c) {
            (None, c) if c.is_whitespace() => {
                if let Some(from) = start.take() {
                    tokens.push(&s[from..i]);
                }
            }
            (None, '"') | (None, '\'') => {
                quote = Some(c);
                start.get_or_insert(i);
            }
            (Some(q), c) if c == q => quote = None,
            _ => {
                start.get_or_insert(i);
            }
        }
    }
    if let Some(from) = start {
        tokens.push(&s[from..]);
    }
    tokens
}

fn local_name(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

/// An element whose only payload is a `val` attribute, such as
/// `<PowerState val="ACTIVE"/>`.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct ValueAttribute {
    #[serde(rename = "@val", default)]
    pub val: String,
}
