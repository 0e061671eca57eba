use super::*;
use serde_json::json;

fn remote(value: Value) -> JsValue {
    serde_json::from_value::<RemoteObject>(value).unwrap().into_js_value()
}

#[test]
fn test_request_serialization_skips_empty_fields() {
    let req = CdpRequest {
        id: 1,
        method: "Target.getTargets".to_string(),
        params: None,
        session_id: None,
    };
    assert_eq!(
        serde_json::to_value(&req).unwrap(),
        json!({"id": 1, "method": "Target.getTargets"})
    );

    let req = CdpRequest {
        id: 2,
        method: "Runtime.evaluate".to_string(),
        params: Some(json!({"expression": "1"})),
        session_id: Some("S1".to_string()),
    };
    assert_eq!(serde_json::to_value(&req).unwrap()["sessionId"], "S1");
}

#[test]
fn test_response_and_event_decode() {
    let resp: CdpResponse = serde_json::from_str(r#"{"id": 3, "result": {"a": 1}}"#).unwrap();
    assert_eq!(resp.id, Some(3));
    assert!(resp.error.is_none());

    let event: CdpResponse =
        serde_json::from_str(r#"{"method": "Page.loadEventFired", "params": {}, "sessionId": "S"}"#)
            .unwrap();
    assert!(event.id.is_none());
    assert_eq!(event.method.as_deref(), Some("Page.loadEventFired"));
}

#[test]
fn test_target_info_decode() {
    let info: TargetInfo = serde_json::from_value(json!({
        "targetId": "ABC",
        "type": "page",
        "title": "Example",
        "url": "https://example.com/",
        "attached": false
    }))
    .unwrap();
    assert!(info.is_page());
    assert_eq!(info.target_id, "ABC");
}

#[test]
fn test_remote_object_conversion() {
    assert_eq!(remote(json!({"type": "undefined"})), JsValue::Undefined);
    assert_eq!(
        remote(json!({"type": "object", "subtype": "null", "value": null})),
        JsValue::Scalar(Value::Null)
    );
    assert_eq!(
        remote(json!({"type": "string", "value": "hi"})),
        JsValue::Scalar(json!("hi"))
    );
    assert_eq!(
        remote(json!({"type": "number", "unserializableValue": "NaN", "description": "NaN"})),
        JsValue::Scalar(json!("NaN"))
    );
    assert_eq!(
        remote(json!({"type": "object", "subtype": "node", "objectId": "n1", "className": "HTMLDivElement"})),
        JsValue::Node(ObjectRef::new("n1"))
    );
    assert_eq!(
        remote(json!({"type": "function", "objectId": "f1"})),
        JsValue::Object(ObjectRef::new("f1"))
    );
}

#[test]
fn test_exception_message() {
    let details: ExceptionDetails = serde_json::from_value(json!({
        "text": "Uncaught",
        "exception": {
            "type": "object",
            "subtype": "error",
            "description": "TypeError: Cannot read properties of null (reading 'x')\n    at <anonymous>:1:6"
        }
    }))
    .unwrap();
    assert_eq!(details.message(), "Cannot read properties of null (reading 'x')");

    let thrown: ExceptionDetails = serde_json::from_value(json!({
        "text": "Uncaught",
        "exception": {"type": "string", "value": "boom"}
    }))
    .unwrap();
    assert_eq!(thrown.message(), "boom");

    let bare: ExceptionDetails = serde_json::from_value(json!({"text": "Uncaught SyntaxError"})).unwrap();
    assert_eq!(bare.message(), "Uncaught SyntaxError");
}
