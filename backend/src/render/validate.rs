//! Upload-time checks for template markup.
//!
//! Templates must be well-formed XML with an `svg` root and may only use the
//! canonical placeholder grammar: `{dyno.<field>}` in text and attribute
//! values, bare `dyno.<field>` on the reference attributes of image elements.
//! Anything else that looks like a `dyno` placeholder is rejected so it cannot
//! silently stay unresolved at render time.

use crate::error::{ServiceError, ServiceResult};
use crate::render::placeholder::{is_image_element, is_reference_attr, NAMESPACE};
use crate::render::raster::{check_canvas, MAX_DIMENSION};
use common::model::place_holder::{PlaceHolder, PlaceholderKind};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use regex::Regex;

/// Raster size of the `flyer` template family.
pub const FLYER_SIZE: (u32, u32) = (400, 600);
/// Raster size of every other template family.
pub const WIDE_SIZE: (u32, u32) = (800, 600);

/// What an accepted template declares.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateCheck {
    pub placeholders: Vec<PlaceHolder>,
    /// `width`/`height` (or `viewBox`) of the root element, if usable.
    pub declared_size: Option<(u32, u32)>,
}

pub fn family_default_size(template_type: &str) -> (u32, u32) {
    if template_type.trim().eq_ignore_ascii_case("flyer") {
        FLYER_SIZE
    } else {
        WIDE_SIZE
    }
}

/// Picks the raster size: explicit request values, then the markup, then the family.
pub fn target_size(
    requested: (Option<u32>, Option<u32>),
    declared: Option<(u32, u32)>,
    template_type: &str,
) -> ServiceResult<(u32, u32)> {
    let (width, height) = match requested {
        (Some(0), _) | (_, Some(0)) => {
            return Err(ServiceError::Validation(
                "width and height must be greater than zero".to_string(),
            ))
        }
        (Some(w), Some(h)) => (w, h),
        (None, None) => declared.unwrap_or_else(|| family_default_size(template_type)),
        _ => {
            return Err(ServiceError::Validation(
                "width and height must be given together".to_string(),
            ))
        }
    };
    check_canvas(width, height).map_err(|_| {
        ServiceError::Validation(format!(
            "template size {}x{} exceeds the {}px limit per side",
            width, height, MAX_DIMENSION
        ))
    })?;
    Ok((width, height))
}

pub fn check_template(markup: &str) -> ServiceResult<TemplateCheck> {
    let scanner = TokenScanner::new()?;
    let mut reader = Reader::from_str(markup);
    let mut placeholders: Vec<PlaceHolder> = Vec::new();
    let mut declared_size = None;
    let mut seen_root = false;
    let mut depth = 0usize;

    loop {
        let event = reader.read_event().map_err(|e| {
            ServiceError::Validation(format!(
                "template markup is not well-formed XML near byte {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;
        match event {
            Event::Eof => break,
            Event::Start(ref start) | Event::Empty(ref start) => {
                if seen_root && depth == 0 {
                    return Err(ServiceError::Validation(
                        "template markup has more than one root element".to_string(),
                    ));
                }
                if !seen_root {
                    if start.local_name().as_ref() != b"svg" {
                        return Err(ServiceError::Validation(
                            "template root element must be <svg>".to_string(),
                        ));
                    }
                    declared_size = root_size(start);
                    seen_root = true;
                }
                scanner.scan_element(start, &mut placeholders)?;
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Text(ref text) => {
                let raw = String::from_utf8_lossy(text);
                scanner.scan_delimited(&raw, &mut placeholders)?;
            }
            _ => {}
        }
    }

    if !seen_root {
        return Err(ServiceError::Validation(
            "template markup has no <svg> element".to_string(),
        ));
    }
    if depth > 0 {
        return Err(ServiceError::Validation(format!(
            "template markup ends with {} unclosed element(s)",
            depth
        )));
    }

    Ok(TemplateCheck {
        placeholders,
        declared_size,
    })
}

struct TokenScanner {
    delimited: Regex,
    bare: Regex,
    field: Regex,
}

impl TokenScanner {
    fn new() -> ServiceResult<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| ServiceError::Validation(format!("Regex error: {}", e)))
        };
        Ok(TokenScanner {
            delimited: compile(r"\{([^{}]*)\}")?,
            bare: compile(&format!(r"\b{}\.([^\s{{}}]*)", NAMESPACE))?,
            field: compile(r"^[A-Za-z][A-Za-z0-9_]*$")?,
        })
    }

    fn scan_element(&self, start: &BytesStart, found: &mut Vec<PlaceHolder>) -> ServiceResult<()> {
        let image = is_image_element(start);
        for attr in start.attributes() {
            let attr = attr.map_err(|e| {
                ServiceError::Validation(format!("invalid attribute in template: {}", e))
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref());
            let value = String::from_utf8_lossy(&attr.value);
            self.scan_delimited(&value, found)?;
            if image && is_reference_attr(&key) {
                self.scan_bare(&value, found)?;
            }
        }
        Ok(())
    }

    /// Checks every `{...}` whose body starts with the namespace.
    fn scan_delimited(&self, raw: &str, found: &mut Vec<PlaceHolder>) -> ServiceResult<()> {
        for caps in self.delimited.captures_iter(raw) {
            let body = &caps[1];
            if !body.trim_start().starts_with(NAMESPACE) {
                continue;
            }
            let field = body
                .strip_prefix(NAMESPACE)
                .and_then(|rest| rest.strip_prefix('.'))
                .filter(|field| self.field.is_match(field))
                .ok_or_else(|| {
                    ServiceError::Validation(format!(
                        "unrecognized placeholder syntax '{{{}}}', expected {{{}.field}}",
                        body, NAMESPACE
                    ))
                })?;
            record(found, field, PlaceholderKind::Text);
        }
        Ok(())
    }

    /// Checks bare `dyno.field` names outside of braces.
    fn scan_bare(&self, raw: &str, found: &mut Vec<PlaceHolder>) -> ServiceResult<()> {
        for caps in self.bare.captures_iter(raw) {
            let whole = caps.get(0).map(|m| m.start()).unwrap_or(0);
            if whole > 0 && raw.as_bytes()[whole - 1] == b'{' {
                continue;
            }
            // `dyno.photo.png` names the `photo` field.
            let name = caps[1].split('.').next().unwrap_or("");
            if !self.field.is_match(name) {
                return Err(ServiceError::Validation(format!(
                    "image placeholder '{}' must be {}.<field>",
                    &caps[0], NAMESPACE
                )));
            }
            record(found, name, PlaceholderKind::Image);
        }
        Ok(())
    }
}

fn record(found: &mut Vec<PlaceHolder>, field: &str, kind: PlaceholderKind) {
    if !found.iter().any(|p| p.field == field && p.kind == kind) {
        found.push(PlaceHolder {
            field: field.to_string(),
            kind,
        });
    }
}

fn root_size(start: &BytesStart) -> Option<(u32, u32)> {
    let mut width = None;
    let mut height = None;
    let mut view_box = None;
    for attr in start.attributes().flatten() {
        let value = String::from_utf8_lossy(&attr.value).to_string();
        match attr.key.local_name().as_ref() {
            b"width" => width = parse_length(&value),
            b"height" => height = parse_length(&value),
            b"viewBox" => view_box = parse_view_box(&value),
            _ => {}
        }
    }
    match (width, height) {
        (Some(w), Some(h)) => Some((w, h)),
        _ => view_box,
    }
}

fn parse_length(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    let number = raw.strip_suffix("px").unwrap_or(raw).trim();
    let value: f64 = number.parse().ok()?;
    (value >= 1.0 && value.is_finite()).then(|| value.round() as u32)
}

fn parse_view_box(raw: &str) -> Option<(u32, u32)> {
    let parts: Vec<f64> = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .map(|p| p.parse().ok())
        .collect::<Option<_>>()?;
    match parts.as_slice() {
        [_, _, w, h] if *w >= 1.0 && *h >= 1.0 => Some((w.round() as u32, h.round() as u32)),
        _ => None,
    }
}
