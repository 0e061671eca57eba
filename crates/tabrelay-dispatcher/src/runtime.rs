//! Capability seam between the dispatcher and a browser.
//!
//! A [`BrowserRuntime`] enumerates tabs and hands out a [`PageContext`] per
//! tab. Pages expose the two fixed operations the dispatcher needs (click and
//! element enumeration) plus a small [`ObjectModel`] used by the expression
//! interpreter to walk page objects without running arbitrary code.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tabrelay_protocols::TabId;

use crate::error::RuntimeError;

/// Opaque handle to an object living in the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef(pub String);

impl ObjectRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A value produced while walking page objects.
#[derive(Debug, Clone, PartialEq)]
pub enum JsValue {
    Undefined,
    /// Primitive value, including `null`.
    Scalar(Value),
    Object(ObjectRef),
    /// A DOM node; its text content is the evaluation result.
    Node(ObjectRef),
}

impl JsValue {
    pub fn is_undefined(&self) -> bool {
        matches!(self, JsValue::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, JsValue::Scalar(Value::Null))
    }
}

/// Summary of an open tab.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    pub title: String,
}

/// Interactive element as read from the page, before selector derivation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawElement {
    pub tag: String,
    pub id: String,
    pub class_name: String,
    pub inner_text: String,
    pub aria_label: Option<String>,
}

/// Minimal object access used to evaluate dotted paths.
#[async_trait]
pub trait ObjectModel: Send + Sync {
    /// The global object paths are resolved from.
    async fn root(&self) -> Result<JsValue, RuntimeError>;

    /// Read `target[name]`.
    async fn property(&self, target: &JsValue, name: &str) -> Result<JsValue, RuntimeError>;

    /// Call `receiver[name](...args)` with `receiver` bound as `this`.
    async fn invoke(
        &self,
        receiver: &JsValue,
        name: &str,
        args: &[String],
    ) -> Result<JsValue, RuntimeError>;

    /// `textContent` of a node.
    async fn text_content(&self, node: &ObjectRef) -> Result<Value, RuntimeError>;

    /// JSON text of an object.
    async fn to_json(&self, object: &ObjectRef) -> Result<Value, RuntimeError>;
}

/// Operations available inside one tab.
#[async_trait]
pub trait PageContext: ObjectModel {
    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<(), RuntimeError>;

    /// Buttons, links and button-like inputs in document order.
    async fn interactive_elements(&self) -> Result<Vec<RawElement>, RuntimeError>;
}

/// A browser the dispatcher can drive.
#[async_trait]
pub trait BrowserRuntime: Send + Sync {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>, RuntimeError>;

    /// Context for the tab with `tab_id`.
    async fn page(&self, tab_id: TabId) -> Result<Arc<dyn PageContext>, RuntimeError>;
}
