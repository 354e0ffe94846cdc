//! # Placeholder Resolver
//!
//! Substitutes placeholder tokens in SVG markup with the values of a slide.
//!
//! Two token shapes are understood:
//!
//! 1.  **Delimited text tokens** (`{dyno.propertyaddress}`) inside text nodes and
//!     attribute values. A substitution key `k` replaces the literal token `{k}`;
//!     a key without the `dyno.` namespace also replaces `{dyno.k}`.
//! 2.  **Image references**: an `<image>`/`<img>` element whose `id`, `href`,
//!     `xlink:href` or `src` names a placeholder (`dyno.photo`, `photo`,
//!     `{dyno.photo}` or any value containing `dyno.photo`) gets its source
//!     attribute replaced by the image value.
//!
//! The markup is streamed through `quick_xml`; events that contain nothing to
//! substitute are written back untouched, so unrelated bytes never change.
//! Resolution is fail-open: values that cannot be coerced are skipped with a
//! warning, and markup that cannot be parsed is returned as it came in.

use crate::error::{ServiceError, ServiceResult};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use common::model::carousel::Substitutions;
use log::{debug, warn};
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashMap;

/// Namespace prefix of canonical placeholders.
pub const NAMESPACE: &str = "dyno";

/// Resolves every recognized placeholder of `markup` against `substitutions`.
///
/// Never fails: on any problem the original markup is returned.
pub fn resolve(markup: &str, substitutions: &Substitutions) -> String {
    let values = SubstitutionSet::from_map(substitutions);
    if values.is_empty() {
        return markup.to_string();
    }
    match values.apply(markup) {
        Ok(resolved) => resolved,
        Err(e) => {
            warn!("Placeholder substitution skipped, using template as-is: {}", e);
            markup.to_string()
        }
    }
}

/// A substitution value after coercion.
#[derive(Debug, Clone, PartialEq, Default)]
struct Coerced {
    text: Option<String>,
    image: Option<String>,
}

#[derive(Debug)]
struct ImageValue {
    /// `dyno.<field>`
    canonical: String,
    field: String,
    uri: String,
}

impl ImageValue {
    fn is_named_by(&self, attr_value: &str) -> bool {
        let v = attr_value.trim();
        v == self.field
            || v == self.canonical
            || contains_key(v, &self.canonical)
            || v.strip_prefix('{')
                .and_then(|s| s.strip_suffix('}'))
                .is_some_and(|inner| inner == self.field)
    }
}

/// The coerced form of a slide's substitution map.
#[derive(Debug, Default)]
struct SubstitutionSet {
    /// Token body (text between the braces) to unescaped replacement text.
    tokens: HashMap<String, String>,
    images: Vec<ImageValue>,
}

impl SubstitutionSet {
    fn from_map(substitutions: &Substitutions) -> Self {
        let mut set = SubstitutionSet::default();
        let prefix = format!("{}.", NAMESPACE);

        for (key, value) in substitutions {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            let coerced = match coerce(value) {
                Ok(c) => c,
                Err(e) => {
                    warn!("Skipping placeholder '{}': {}", key, e);
                    continue;
                }
            };
            let field = key.strip_prefix(&prefix).unwrap_or(key);

            if let Some(text) = coerced.text {
                if !key.starts_with(&prefix) {
                    // An explicit namespaced key always wins over this alias.
                    set.tokens
                        .entry(format!("{}{}", prefix, key))
                        .or_insert_with(|| text.clone());
                }
                set.tokens.insert(key.to_string(), text);
            }
            if let Some(uri) = coerced.image {
                set.images.push(ImageValue {
                    canonical: format!("{}{}", prefix, field),
                    field: field.to_string(),
                    uri,
                });
            }
        }
        set
    }

    fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.images.is_empty()
    }

    fn apply(&self, markup: &str) -> ServiceResult<String> {
        let mut reader = Reader::from_str(markup);
        let mut writer = Writer::new(Vec::with_capacity(markup.len()));

        loop {
            let event = reader.read_event().map_err(|e| {
                ServiceError::Substitution(format!(
                    "markup is not well-formed near byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            })?;
            let written = match event {
                Event::Eof => break,
                Event::Text(text) => {
                    let raw = std::str::from_utf8(&text)
                        .map_err(|e| ServiceError::Substitution(e.to_string()))?;
                    match replace_tokens(raw, &self.tokens, Escaping::Text) {
                        Some(replaced) => {
                            writer.write_event(Event::Text(BytesText::from_escaped(replaced)))
                        }
                        None => writer.write_event(Event::Text(text)),
                    }
                }
                Event::Start(start) => match self.rewrite_element(&start)? {
                    Some(rewritten) => writer.write_event(Event::Start(rewritten)),
                    None => writer.write_event(Event::Start(start)),
                },
                Event::Empty(start) => match self.rewrite_element(&start)? {
                    Some(rewritten) => writer.write_event(Event::Empty(rewritten)),
                    None => writer.write_event(Event::Empty(start)),
                },
                other => writer.write_event(other),
            };
            written.map_err(|e| ServiceError::Substitution(e.to_string()))?;
        }

        String::from_utf8(writer.into_inner())
            .map_err(|e| ServiceError::Substitution(e.to_string()))
    }

    /// Returns a replacement element when any attribute changes.
    fn rewrite_element(&self, start: &BytesStart) -> ServiceResult<Option<BytesStart<'static>>> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| ServiceError::Substitution(e.to_string()))?
            .to_string();

        let mut attrs: Vec<(String, String)> = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ServiceError::Substitution(e.to_string()))?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| ServiceError::Substitution(e.to_string()))?;
            let value = std::str::from_utf8(&attr.value)
                .map_err(|e| ServiceError::Substitution(e.to_string()))?;
            attrs.push((key.to_string(), value.to_string()));
        }

        let image_uri = if is_image_element(start) {
            self.images
                .iter()
                .find(|img| {
                    attrs
                        .iter()
                        .any(|(k, v)| is_reference_attr(k) && img.is_named_by(v))
                })
                .map(|img| img.uri.as_str())
        } else {
            None
        };

        let mut changed = false;
        let mut source_written = false;
        let mut rewritten = BytesStart::new(name);

        for (key, raw) in &attrs {
            if let Some(uri) = image_uri {
                if is_source_attr(key) {
                    rewritten.push_attribute((key.as_str(), uri));
                    source_written = true;
                    changed = true;
                    continue;
                }
            }
            let value = match replace_tokens(raw, &self.tokens, Escaping::Attribute) {
                Some(replaced) => {
                    changed = true;
                    replaced
                }
                // Single-quoted values may carry a bare `"`.
                None => raw.replace('"', "&quot;"),
            };
            rewritten.push_attribute(Attribute {
                key: QName(key.as_bytes()),
                value: Cow::Borrowed(value.as_bytes()),
            });
        }

        if let Some(uri) = image_uri {
            if !source_written {
                rewritten.push_attribute(("href", uri));
                changed = true;
            }
            debug!(
                "Substituted image source of <{}>",
                String::from_utf8_lossy(start.name().as_ref())
            );
        }

        Ok(changed.then_some(rewritten))
    }
}

#[derive(Clone, Copy)]
enum Escaping {
    Text,
    Attribute,
}

/// Single left-to-right pass over `raw` replacing `{token}` occurrences.
///
/// Returns `None` when nothing was replaced. Inserted values are never scanned
/// again, so a value that looks like a token stays literal.
fn replace_tokens(raw: &str, tokens: &HashMap<String, String>, escaping: Escaping) -> Option<String> {
    if tokens.is_empty() || !raw.contains('{') {
        return None;
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    let mut changed = false;

    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let Some(close) = after.find(|c| c == '{' || c == '}') else {
            break;
        };
        if after.as_bytes()[close] == b'{' {
            // `{{token}`: the first brace is plain text.
            out.push_str(&rest[..open + 1 + close]);
            rest = &after[close..];
            continue;
        }

        let body = &after[..close];
        out.push_str(&rest[..open]);
        match tokens.get(body) {
            Some(value) => {
                let escaped = match escaping {
                    Escaping::Text => partial_escape(value.as_str()),
                    Escaping::Attribute => escape(value.as_str()),
                };
                out.push_str(&escaped);
                changed = true;
            }
            None => {
                out.push('{');
                out.push_str(body);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }

    if !changed {
        return None;
    }
    out.push_str(rest);
    Some(out)
}

fn coerce(value: &Value) -> ServiceResult<Coerced> {
    match value {
        Value::String(s) => Ok(Coerced {
            text: Some(s.clone()),
            image: looks_like_image_ref(s).then(|| s.clone()),
        }),
        Value::Number(n) => Ok(Coerced {
            text: Some(n.to_string()),
            image: None,
        }),
        Value::Bool(b) => Ok(Coerced {
            text: Some(b.to_string()),
            image: None,
        }),
        Value::Object(map) => {
            if let Some(Value::String(uri)) = map.get("image") {
                return Ok(Coerced {
                    text: None,
                    image: Some(uri.clone()),
                });
            }
            if let Some(Value::String(payload)) = map.get("base64") {
                let payload = payload.trim();
                BASE64.decode(payload).map_err(|e| {
                    ServiceError::Substitution(format!("image payload is not valid base64: {}", e))
                })?;
                let mime = map
                    .get("mime")
                    .and_then(Value::as_str)
                    .unwrap_or("image/png");
                return Ok(Coerced {
                    text: None,
                    image: Some(format!("data:{};base64,{}", mime, payload)),
                });
            }
            Err(ServiceError::Substitution(
                "object values need an 'image' or 'base64' member".to_string(),
            ))
        }
        Value::Null => Err(ServiceError::Substitution("value is null".to_string())),
        Value::Array(_) => Err(ServiceError::Substitution(
            "arrays cannot be substituted".to_string(),
        )),
    }
}

fn looks_like_image_ref(s: &str) -> bool {
    let s = s.trim_start();
    s.starts_with("data:image/") || s.starts_with("http://") || s.starts_with("https://")
}

/// `value` contains `key` not immediately followed by another identifier char.
fn contains_key(value: &str, key: &str) -> bool {
    value.match_indices(key).any(|(i, _)| {
        value[i + key.len()..]
            .chars()
            .next()
            .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_'))
    })
}

pub(crate) fn is_image_element(start: &BytesStart) -> bool {
    matches!(start.local_name().as_ref(), b"image" | b"img")
}

fn local_part(attr_key: &str) -> &str {
    attr_key.rsplit(':').next().unwrap_or(attr_key)
}

/// Attributes that may name the placeholder of an image element.
pub(crate) fn is_reference_attr(attr_key: &str) -> bool {
    matches!(local_part(attr_key), "id" | "href" | "src")
}

fn is_source_attr(attr_key: &str) -> bool {
    matches!(local_part(attr_key), "href" | "src")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn subs(value: Value) -> Substitutions {
        serde_json::from_value(value).unwrap()
    }

    const FLYER: &str = r##"<svg width="400" height="600" xmlns="http://www.w3.org/2000/svg">
    <rect width="400" height="600" fill="#f0f8ff"/>
    <text x="200" y="200">{dyno.propertyaddress}</text>
    <text x="200" y="250">Agent: {dyno.name}</text>
    <text x="200" y="300">Phone: {dyno.phone}</text>
</svg>"##;

    #[test]
    fn substitutes_known_tokens_in_text() {
        let out = resolve(
            FLYER,
            &subs(json!({"propertyaddress": "12 Elm St", "name": "Jane Doe"})),
        );
        assert_eq!(
            out,
            FLYER
                .replace("{dyno.propertyaddress}", "12 Elm St")
                .replace("{dyno.name}", "Jane Doe")
        );
    }

    #[test]
    fn unknown_tokens_pass_through() {
        let out = resolve(FLYER, &subs(json!({"name": "Jane Doe"})));
        assert!(out.contains("Phone: {dyno.phone}"));
        assert!(out.contains("{dyno.propertyaddress}"));
    }

    #[test]
    fn namespaced_keys_match_literally() {
        let out = resolve(FLYER, &subs(json!({"dyno.phone": "555-1234"})));
        assert!(out.contains("Phone: 555-1234"));
    }

    #[test]
    fn explicit_namespaced_key_wins_over_alias() {
        let out = resolve(
            FLYER,
            &subs(json!({"name": "alias", "dyno.name": "explicit"})),
        );
        assert!(out.contains("Agent: explicit"));
    }

    #[test]
    fn resolving_resolved_markup_is_identity() {
        let once = resolve(
            FLYER,
            &subs(json!({"propertyaddress": "1 Main", "name": "A", "phone": "1"})),
        );
        let twice = resolve(
            &once,
            &subs(json!({"propertyaddress": "2 Main", "name": "B", "phone": "2"})),
        );
        assert_eq!(once, twice);
    }

    #[test]
    fn values_are_escaped_and_not_rescanned() {
        let out = resolve(
            FLYER,
            &subs(json!({"name": "Smith & <Sons>", "phone": "{dyno.name}"})),
        );
        assert!(out.contains("Agent: Smith &amp; &lt;Sons&gt;"));
        assert!(out.contains("Phone: {dyno.name}"));
    }

    #[test]
    fn numbers_and_booleans_become_text() {
        let out = resolve(FLYER, &subs(json!({"phone": 5551234, "name": true})));
        assert!(out.contains("Phone: 5551234"));
        assert!(out.contains("Agent: true"));
    }

    #[test]
    fn uncoercible_values_are_skipped() {
        let out = resolve(
            FLYER,
            &subs(json!({"name": null, "phone": [1, 2], "propertyaddress": "9 Oak"})),
        );
        assert!(out.contains("Agent: {dyno.name}"));
        assert!(out.contains("Phone: {dyno.phone}"));
        assert!(out.contains("9 Oak"));
    }

    #[test]
    fn malformed_markup_is_returned_unchanged() {
        let broken = "<svg><text>{dyno.name}</svg>";
        assert_eq!(resolve(broken, &subs(json!({"name": "Jane"}))), broken);
    }

    #[test]
    fn tokens_in_attributes_are_substituted() {
        let markup = r#"<svg><a title="{dyno.name}" class="x"><text>hi</text></a></svg>"#;
        let out = resolve(markup, &subs(json!({"name": "Jane \"JD\" Doe"})));
        assert_eq!(
            out,
            r#"<svg><a title="Jane &quot;JD&quot; Doe" class="x"><text>hi</text></a></svg>"#
        );
    }

    #[test]
    fn image_source_is_replaced_by_id() {
        let markup = r#"<svg><image id="dyno.photo" x="0" href="placeholder.png"/></svg>"#;
        let out = resolve(
            markup,
            &subs(json!({"photo": {"image": "https://cdn.example.com/house.jpg"}})),
        );
        assert_eq!(
            out,
            r#"<svg><image id="dyno.photo" x="0" href="https://cdn.example.com/house.jpg"/></svg>"#
        );
    }

    #[test]
    fn image_source_is_replaced_by_containment() {
        let markup = r#"<svg><image xlink:href="{dyno.photo}" width="10"/></svg>"#;
        let out = resolve(
            markup,
            &subs(json!({"dyno.photo": "data:image/png;base64,AAAA"})),
        );
        assert_eq!(
            out,
            r#"<svg><image xlink:href="data:image/png;base64,AAAA" width="10"/></svg>"#
        );
    }

    #[test]
    fn image_href_is_added_when_missing() {
        let markup = r#"<svg><image id="dyno.logo"/></svg>"#;
        let out = resolve(markup, &subs(json!({"logo": {"image": "https://x.test/l.png"}})));
        assert_eq!(
            out,
            r#"<svg><image id="dyno.logo" href="https://x.test/l.png"/></svg>"#
        );
    }

    #[test]
    fn similar_image_names_do_not_match() {
        let markup = r#"<svg><image id="dyno.photo2" href="a.png"/></svg>"#;
        let out = resolve(markup, &subs(json!({"photo": {"image": "https://x.test/p.png"}})));
        assert_eq!(out, markup);
    }

    #[test]
    fn base64_payloads_become_data_uris() {
        let markup = r#"<svg><image id="dyno.photo" href="x"/></svg>"#;
        let out = resolve(
            markup,
            &subs(json!({"photo": {"base64": "iVBORw0KGgo=", "mime": "image/png"}})),
        );
        assert!(out.contains(r#"href="data:image/png;base64,iVBORw0KGgo=""#));

        let bad = resolve(markup, &subs(json!({"photo": {"base64": "%%%"}})));
        assert_eq!(bad, markup);
    }

    #[test]
    fn plain_text_values_do_not_touch_images() {
        let markup = r#"<svg><image id="dyno.photo" href="keep.png"/></svg>"#;
        let out = resolve(markup, &subs(json!({"photo": "just words"})));
        assert_eq!(out, markup);
    }

    #[test]
    fn nested_braces_keep_outer_brace() {
        let out = resolve(
            "<svg><text>{{dyno.name}}</text></svg>",
            &subs(json!({"name": "Jane"})),
        );
        assert_eq!(out, "<svg><text>{Jane}</text></svg>");
    }

    #[test]
    fn untouched_bytes_survive() {
        let markup = "<?xml version=\"1.0\"?>\n<!-- {dyno.name} -->\n<svg><style><![CDATA[.a{fill:red}]]></style><text>it's {dyno.name}</text></svg>";
        let out = resolve(markup, &subs(json!({"name": "Jane"})));
        assert_eq!(out, markup.replacen("it's {dyno.name}", "it's Jane", 1));
    }
}
