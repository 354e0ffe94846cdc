use serde::{Deserialize, Serialize};

/// A substitution point declared by a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceHolder {
    /// Field name without the `dyno.` namespace, e.g. `propertyaddress`.
    pub field: String,
    pub kind: PlaceholderKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceholderKind {
    /// `{dyno.field}` inside text or attribute values.
    Text,
    /// Bare `dyno.field` naming an image element.
    Image,
}
