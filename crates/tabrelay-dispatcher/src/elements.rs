//! Interactive element summaries returned by `get_elements`.

use serde::{Deserialize, Serialize};

use crate::runtime::RawElement;

/// CSS selector for the elements worth reporting.
pub const INTERACTIVE_SELECTOR: &str = r#"button, a, input[type="button"], input[type="submit"]"#;

/// Maximum number of characters of visible text kept per element.
pub const TEXT_LIMIT: usize = 50;

/// An element as reported to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub tag: String,
    pub text: String,
    pub id: String,
    pub selector: String,
    #[serde(rename = "ariaLabel")]
    pub aria_label: Option<String>,
}

impl ElementInfo {
    pub fn from_raw(raw: RawElement) -> Self {
        let tag = raw.tag.to_lowercase();
        let selector = derive_selector(&raw.id, &raw.class_name, &tag);
        let text = raw.inner_text.trim().chars().take(TEXT_LIMIT).collect();
        Self {
            tag,
            text,
            id: raw.id,
            selector,
            aria_label: raw.aria_label,
        }
    }

    /// Whether the element carries anything a caller could target it by.
    pub fn is_meaningful(&self) -> bool {
        !self.text.is_empty()
            || self.aria_label.as_deref().is_some_and(|l| !l.is_empty())
            || !self.id.is_empty()
    }
}

/// `#id`, else `.class1.class2`, else the tag name.
fn derive_selector(id: &str, class_name: &str, tag: &str) -> String {
    if !id.is_empty() {
        return format!("#{id}");
    }
    let classes: Vec<&str> = class_name.split_whitespace().collect();
    if !classes.is_empty() {
        return format!(".{}", classes.join("."));
    }
    tag.to_string()
}

/// Summarise raw elements, dropping those with no text, label or id.
pub fn summarize(raw: Vec<RawElement>) -> Vec<ElementInfo> {
    raw.into_iter()
        .map(ElementInfo::from_raw)
        .filter(ElementInfo::is_meaningful)
        .collect()
}
