//! Static tool catalog advertised by `tools/list`.

use serde_json::{Value, json};

use tabrelay_protocols::ToolDescriptor;

pub const WAIT_READY: &str = "browser_wait_ready";
pub const LIST_TABS: &str = "browser_list_tabs";
pub const CLICK: &str = "browser_click";
pub const EVAL: &str = "browser_eval";
pub const GET_ELEMENTS: &str = "browser_get_elements";
pub const GET_TEXT: &str = "browser_get_text";

/// Every tool the server exposes, in advertised order.
pub fn tool_catalog() -> Vec<ToolDescriptor> {
    vec![
        ToolDescriptor::new(
            WAIT_READY,
            "Wait until the browser extension is connected and ready to receive commands",
            no_arguments(),
        ),
        ToolDescriptor::new(LIST_TABS, "List all open browser tabs", no_arguments()),
        ToolDescriptor::new(
            CLICK,
            "Click a DOM element in a tab",
            object_schema(&[("tabId", "number"), ("selector", "string")]),
        ),
        ToolDescriptor::new(
            EVAL,
            "Evaluate a safe expression in a tab",
            object_schema(&[("tabId", "number"), ("code", "string")]),
        ),
        ToolDescriptor::new(
            GET_ELEMENTS,
            "Get a list of interactive elements (buttons, links) in a tab",
            object_schema(&[("tabId", "number")]),
        ),
        ToolDescriptor::new(
            GET_TEXT,
            "Get the inner text of the tab",
            object_schema(&[("tabId", "number")]),
        ),
    ]
}

fn no_arguments() -> Value {
    json!({"type": "object", "properties": {}})
}

/// Object schema where every listed property is required.
fn object_schema(properties: &[(&str, &str)]) -> Value {
    let props: serde_json::Map<String, Value> = properties
        .iter()
        .map(|(name, ty)| (name.to_string(), json!({"type": ty})))
        .collect();
    let required: Vec<&str> = properties.iter().map(|(name, _)| *name).collect();
    json!({"type": "object", "properties": props, "required": required})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_lists_six_tools() {
        let names: Vec<_> = tool_catalog().into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![WAIT_READY, LIST_TABS, CLICK, EVAL, GET_ELEMENTS, GET_TEXT]
        );
    }

    #[test]
    fn test_click_schema() {
        let click = tool_catalog().into_iter().find(|t| t.name == CLICK).unwrap();
        assert_eq!(
            click.input_schema,
            json!({
                "type": "object",
                "properties": {
                    "tabId": {"type": "number"},
                    "selector": {"type": "string"}
                },
                "required": ["tabId", "selector"]
            })
        );
    }

    #[test]
    fn test_argument_free_tools_have_empty_properties() {
        for tool in tool_catalog().into_iter().filter(|t| t.name == WAIT_READY || t.name == LIST_TABS) {
            assert_eq!(tool.input_schema, json!({"type": "object", "properties": {}}));
        }
    }
}
