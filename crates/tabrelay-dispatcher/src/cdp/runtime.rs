//! [`BrowserRuntime`] backed by a Chrome remote debugging endpoint.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::MappedMutexGuard;
use tracing::{debug, info};

use tabrelay_protocols::TabId;

use super::client::{CdpClient, CdpSession};
use super::error::CdpError;
use super::protocol::RemoteObject;
use crate::elements::INTERACTIVE_SELECTOR;
use crate::error::RuntimeError;
use crate::runtime::{
    BrowserRuntime, JsValue, ObjectModel, ObjectRef, PageContext, RawElement, TabInfo,
};

const GET_PROPERTY: &str = "function(key) { return this[key]; }";
const INVOKE: &str = "function(name, ...args) { return this[name].apply(this, args); }";
const TEXT_CONTENT: &str = "function() { return this.textContent; }";
const TO_JSON: &str = "function() { return JSON.stringify(this); }";

/// Numeric ids for DevTools target ids, stable for the runtime's lifetime.
#[derive(Debug, Default)]
struct TabRegistry {
    last: TabId,
    by_target: HashMap<String, TabId>,
    by_tab: HashMap<TabId, String>,
}

impl TabRegistry {
    fn id_for(&mut self, target_id: &str) -> TabId {
        if let Some(id) = self.by_target.get(target_id) {
            return *id;
        }
        self.last += 1;
        self.by_target.insert(target_id.to_string(), self.last);
        self.by_tab.insert(self.last, target_id.to_string());
        self.last
    }

    fn target(&self, tab_id: TabId) -> Option<String> {
        self.by_tab.get(&tab_id).cloned()
    }
}

struct Connection {
    client: CdpClient,
    pages: HashMap<String, Arc<CdpPage>>,
}

/// Drives Chrome through the DevTools protocol.
///
/// The browser connection is opened lazily and re-opened if Chrome goes
/// away. Page sessions are attached on first use and cached per target.
pub struct CdpRuntime {
    endpoint: String,
    connection: tokio::sync::Mutex<Option<Connection>>,
    tabs: Mutex<TabRegistry>,
}

impl CdpRuntime {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            connection: tokio::sync::Mutex::new(None),
            tabs: Mutex::new(TabRegistry::default()),
        }
    }

    /// Create a runtime and open the browser connection up front.
    pub async fn connect(endpoint: impl Into<String>) -> Result<Self, CdpError> {
        let runtime = Self::new(endpoint);
        runtime.connection().await?;
        Ok(runtime)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn connection(&self) -> Result<MappedMutexGuard<'_, Connection>, CdpError> {
        let mut guard = self.connection.lock().await;
        if guard.as_ref().is_none_or(|c| c.client.is_closed()) {
            info!("Connecting to Chrome at {}", self.endpoint);
            let client = CdpClient::connect(&self.endpoint).await?;
            *guard = Some(Connection {
                client,
                pages: HashMap::new(),
            });
        }
        tokio::sync::MutexGuard::try_map(guard, Option::as_mut).map_err(|_| CdpError::SessionClosed)
    }

    async fn refresh_tabs(&self) -> Result<Vec<TabInfo>, CdpError> {
        let mut conn = self.connection().await?;
        let targets = conn.client.get_targets().await?;
        let pages: Vec<_> = targets.into_iter().filter(|t| t.is_page()).collect();

        let live: HashSet<&str> = pages.iter().map(|t| t.target_id.as_str()).collect();
        conn.pages.retain(|target, _| live.contains(target.as_str()));

        let mut tabs = self.tabs.lock();
        Ok(pages
            .iter()
            .map(|t| TabInfo {
                id: tabs.id_for(&t.target_id),
                url: t.url.clone(),
                title: t.title.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl BrowserRuntime for CdpRuntime {
    async fn list_tabs(&self) -> Result<Vec<TabInfo>, RuntimeError> {
        Ok(self.refresh_tabs().await?)
    }

    async fn page(&self, tab_id: TabId) -> Result<Arc<dyn PageContext>, RuntimeError> {
        let known = self.tabs.lock().target(tab_id);
        let target_id = match known {
            Some(target_id) => target_id,
            None => {
                self.refresh_tabs().await?;
                self.tabs
                    .lock()
                    .target(tab_id)
                    .ok_or(RuntimeError::TabNotFound(tab_id))?
            }
        };

        let mut conn = self.connection().await?;
        if let Some(page) = conn.pages.get(&target_id) {
            if !page.session.is_closed() {
                return Ok(page.clone());
            }
        }

        let session = conn.client.attach(&target_id).await.map_err(|e| match e {
            CdpError::Protocol { .. } => RuntimeError::TabNotFound(tab_id),
            other => other.into(),
        })?;
        let page = Arc::new(CdpPage { session });
        conn.pages.insert(target_id, page.clone());
        Ok(page)
    }
}

/// One attached tab.
pub struct CdpPage {
    session: CdpSession,
}

impl CdpPage {
    async fn call_on(
        &self,
        object: &ObjectRef,
        function: &str,
        args: Vec<Value>,
        by_value: bool,
    ) -> Result<RemoteObject, CdpError> {
        let arguments = args.into_iter().map(|v| json!({ "value": v })).collect();
        self.session
            .call_function_on(object.as_str(), function, arguments, by_value)
            .await
    }
}

#[async_trait]
impl ObjectModel for CdpPage {
    async fn root(&self) -> Result<JsValue, RuntimeError> {
        Ok(self.session.evaluate("globalThis").await?.into_js_value())
    }

    async fn property(&self, target: &JsValue, name: &str) -> Result<JsValue, RuntimeError> {
        let remote = match target {
            JsValue::Undefined => return Ok(JsValue::Undefined),
            JsValue::Object(object) | JsValue::Node(object) => {
                self.call_on(object, GET_PROPERTY, vec![json!(name)], false).await?
            }
            JsValue::Scalar(value) => {
                self.session
                    .evaluate(&scalar_property_expression(value, name))
                    .await?
            }
        };
        Ok(remote.into_js_value())
    }

    async fn invoke(
        &self,
        receiver: &JsValue,
        name: &str,
        args: &[String],
    ) -> Result<JsValue, RuntimeError> {
        let remote = match receiver {
            JsValue::Undefined => {
                return Err(RuntimeError::Script(format!(
                    "Cannot read properties of undefined (reading '{name}')"
                )));
            }
            JsValue::Object(object) | JsValue::Node(object) => {
                let mut call_args = vec![json!(name)];
                call_args.extend(args.iter().map(|a| json!(a)));
                self.call_on(object, INVOKE, call_args, false).await?
            }
            JsValue::Scalar(value) => {
                self.session
                    .evaluate(&scalar_invoke_expression(value, name, args))
                    .await?
            }
        };
        Ok(remote.into_js_value())
    }

    async fn text_content(&self, node: &ObjectRef) -> Result<Value, RuntimeError> {
        let remote = self.call_on(node, TEXT_CONTENT, Vec::new(), true).await?;
        Ok(remote.value.unwrap_or(Value::Null))
    }

    async fn to_json(&self, object: &ObjectRef) -> Result<Value, RuntimeError> {
        let remote = self.call_on(object, TO_JSON, Vec::new(), true).await?;
        Ok(remote.value.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl PageContext for CdpPage {
    async fn click(&self, selector: &str) -> Result<(), RuntimeError> {
        let clicked = self.session.evaluate_value(&click_expression(selector)).await?;
        debug!(target_id = self.session.target_id(), selector, clicked = %clicked, "Click");
        if clicked == Value::Bool(true) {
            Ok(())
        } else {
            Err(RuntimeError::ElementNotFound(selector.to_string()))
        }
    }

    async fn interactive_elements(&self) -> Result<Vec<RawElement>, RuntimeError> {
        let value = self.session.evaluate_value(&elements_expression()).await?;
        let elements = serde_json::from_value(value).map_err(CdpError::from)?;
        Ok(elements)
    }
}

/// JSON text is a valid JavaScript literal for every scalar.
fn scalar_property_expression(value: &Value, name: &str) -> String {
    format!("({})[{}]", value, json!(name))
}

fn scalar_invoke_expression(value: &Value, name: &str, args: &[String]) -> String {
    format!(
        "(function(v, n, a) {{ return v[n].apply(v, a); }})({}, {}, {})",
        value,
        json!(name),
        json!(args)
    )
}

fn click_expression(selector: &str) -> String {
    format!(
        "(function(sel) {{ const el = document.querySelector(sel); if (!el) return false; el.click(); return true; }})({})",
        json!(selector)
    )
}

fn elements_expression() -> String {
    format!(
        "Array.from(document.querySelectorAll({})).map(el => ({{ \
            tag: el.tagName, \
            id: el.id || '', \
            className: typeof el.className === 'string' ? el.className : '', \
            innerText: el.innerText || '', \
            ariaLabel: el.getAttribute('aria-label') \
        }}))",
        json!(INTERACTIVE_SELECTOR)
    )
}
