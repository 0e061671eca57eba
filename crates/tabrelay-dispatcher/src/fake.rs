//! In-memory browser used by unit tests.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};

use tabrelay_protocols::TabId;

use crate::error::RuntimeError;
use crate::runtime::{
    BrowserRuntime, JsValue, ObjectModel, ObjectRef, PageContext, RawElement, TabInfo,
};

/// One tab with a title, body text, a set of clickable selectors and a
/// fixed list of interactive elements.
#[derive(Default)]
pub struct FakeTab {
    pub title: String,
    pub body_text: String,
    pub clickable: Vec<String>,
    pub elements: Vec<RawElement>,
    pub click_delay: Option<Duration>,
    pub clicks: Mutex<Vec<String>>,
}

impl FakeTab {
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl ObjectModel for FakeTab {
    async fn root(&self) -> Result<JsValue, RuntimeError> {
        Ok(JsValue::Object(ObjectRef::new("window")))
    }

    async fn property(&self, target: &JsValue, name: &str) -> Result<JsValue, RuntimeError> {
        let id = match target {
            JsValue::Object(r) | JsValue::Node(r) => r.as_str(),
            _ => return Ok(JsValue::Undefined),
        };
        Ok(match (id, name) {
            ("window", "document") => JsValue::Object(ObjectRef::new("document")),
            ("document", "title") => JsValue::Scalar(json!(self.title)),
            ("document", "body") => JsValue::Node(ObjectRef::new("body")),
            ("body", "innerText") => JsValue::Scalar(json!(self.body_text)),
            ("window", "navigator") => JsValue::Object(ObjectRef::new("navigator")),
            _ => JsValue::Undefined,
        })
    }

    async fn invoke(
        &self,
        _receiver: &JsValue,
        name: &str,
        _args: &[String],
    ) -> Result<JsValue, RuntimeError> {
        Err(RuntimeError::Script(format!("{name} is not a function")))
    }

    async fn text_content(&self, _node: &ObjectRef) -> Result<Value, RuntimeError> {
        Ok(json!(self.body_text))
    }

    async fn to_json(&self, _object: &ObjectRef) -> Result<Value, RuntimeError> {
        Ok(json!("{}"))
    }
}

#[async_trait]
impl PageContext for FakeTab {
    async fn click(&self, selector: &str) -> Result<(), RuntimeError> {
        if let Some(delay) = self.click_delay {
            tokio::time::sleep(delay).await;
        }
        if !self.clickable.iter().any(|s| s == selector) {
            return Err(RuntimeError::ElementNotFound(selector.to_string()));
        }
        self.clicks.lock().push(selector.to_string());
        Ok(())
    }

    async fn interactive_elements(&self) -> Result<Vec<RawElement>, RuntimeError> {
        Ok(self.elements.clone())
    }
}

/// Browser holding a fixed set of [`FakeTab`]s.
#[derive(Default)]
pub struct FakeBrowser {
    tabs: Vec<(TabInfo, Arc<FakeTab>)>,
}

impl FakeBrowser {
    pub fn with_tab(mut self, id: TabId, url: &str, tab: FakeTab) -> Self {
        let info = TabInfo {
            id,
            url: url.to_string(),
            title: tab.title.clone(),
        };
        self.tabs.push((info, Arc::new(tab)));
        self
    }

    pub fn tab(&self, id: TabId) -> Option<Arc<FakeTab>> {
        self.tabs
            .iter()
            .find(|(info, _)| info.id == id)
            .map(|(_, tab)| tab.clone())
    }
}

#[async_trait]
impl BrowserRuntime for FakeBrowser {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>, RuntimeError> {
        Ok(self.tabs.iter().map(|(info, _)| info.clone()).collect())
    }

    async fn page(&self, tab_id: TabId) -> Result<Arc<dyn PageContext>, RuntimeError> {
        self.tab(tab_id)
            .map(|tab| tab as Arc<dyn PageContext>)
            .ok_or(RuntimeError::TabNotFound(tab_id))
    }
}

/// Shorthand for a runtime trait object.
pub fn shared(browser: FakeBrowser) -> (Arc<FakeBrowser>, Arc<dyn BrowserRuntime>) {
    let browser = Arc::new(browser);
    (browser.clone(), browser)
}

pub fn element(tag: &str, id: &str, class_name: &str, inner_text: &str) -> RawElement {
    RawElement {
        tag: tag.to_string(),
        id: id.to_string(),
        class_name: class_name.to_string(),
        inner_text: inner_text.to_string(),
        aria_label: None,
    }
}
