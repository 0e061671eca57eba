use super::*;
use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::error::RuntimeError;
use crate::runtime::ObjectRef;

type Method = fn(&[String]) -> Result<JsValue, RuntimeError>;

/// In-memory page: objects are keyed by id, properties and methods by
/// `(object id, name)`.
#[derive(Default)]
struct FakePage {
    props: HashMap<(String, String), JsValue>,
    methods: HashMap<(String, String), Method>,
    texts: HashMap<String, String>,
    json: HashMap<String, String>,
    calls: Mutex<Vec<(String, Vec<String>)>>,
}

impl FakePage {
    fn with_prop(mut self, object: &str, name: &str, value: JsValue) -> Self {
        self.props.insert((object.to_string(), name.to_string()), value);
        self
    }

    fn with_method(mut self, object: &str, name: &str, method: Method) -> Self {
        self.methods.insert((object.to_string(), name.to_string()), method);
        self
    }

    fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().clone()
    }
}

fn object_id(value: &JsValue) -> Option<&str> {
    match value {
        JsValue::Object(r) | JsValue::Node(r) => Some(r.as_str()),
        _ => None,
    }
}

#[async_trait]
impl ObjectModel for FakePage {
    async fn root(&self) -> Result<JsValue, RuntimeError> {
        Ok(JsValue::Object(ObjectRef::new("window")))
    }

    async fn property(&self, target: &JsValue, name: &str) -> Result<JsValue, RuntimeError> {
        if let JsValue::Scalar(Value::String(s)) = target {
            if name == "length" {
                return Ok(JsValue::Scalar(json!(s.chars().count())));
            }
        }
        let Some(id) = object_id(target) else {
            return Ok(JsValue::Undefined);
        };
        Ok(self
            .props
            .get(&(id.to_string(), name.to_string()))
            .cloned()
            .unwrap_or(JsValue::Undefined))
    }

    async fn invoke(
        &self,
        receiver: &JsValue,
        name: &str,
        args: &[String],
    ) -> Result<JsValue, RuntimeError> {
        let id = object_id(receiver).unwrap_or_default().to_string();
        self.calls.lock().push((name.to_string(), args.to_vec()));
        match self.methods.get(&(id, name.to_string())) {
            Some(method) => method(args),
            None => Err(RuntimeError::Script(format!("{name} is not a function"))),
        }
    }

    async fn text_content(&self, node: &ObjectRef) -> Result<Value, RuntimeError> {
        Ok(self
            .texts
            .get(node.as_str())
            .map(|t| json!(t))
            .unwrap_or(Value::Null))
    }

    async fn to_json(&self, object: &ObjectRef) -> Result<Value, RuntimeError> {
        Ok(self
            .json
            .get(object.as_str())
            .map(|t| json!(t))
            .unwrap_or(Value::Null))
    }
}

fn page() -> FakePage {
    let mut page = FakePage::default()
        .with_prop("window", "document", JsValue::Object(ObjectRef::new("document")))
        .with_prop("window", "location", JsValue::Object(ObjectRef::new("location")))
        .with_prop("document", "title", JsValue::Scalar(json!("Inbox (3)")))
        .with_prop("document", "activeElement", JsValue::Scalar(Value::Null))
        .with_method("document", "querySelector", |args| {
            if args.first().map(String::as_str) == Some("#main") {
                Ok(JsValue::Node(ObjectRef::new("main")))
            } else {
                Ok(JsValue::Scalar(Value::Null))
            }
        })
        .with_method("window", "getSelection", |_| Ok(JsValue::Scalar(json!(""))))
        .with_method("window", "echo", |args| Ok(JsValue::Scalar(json!(args))))
        .with_method("window", "explode", |_| {
            Err(RuntimeError::Script("boom".to_string()))
        });
    page.texts.insert("main".to_string(), "Hello world".to_string());
    page.json
        .insert("location".to_string(), r#"{"href":"https://example.com/"}"#.to_string());
    page
}

#[test]
fn test_parse_properties_and_calls() {
    let expr = Expression::parse("document.querySelector('#main').innerText");
    assert_eq!(
        expr.segments(),
        &[
            Segment::property("document"),
            Segment::call("querySelector", vec!["#main".to_string()]),
            Segment::property("innerText"),
        ]
    );
}

#[test]
fn test_parse_arguments_are_trimmed_and_unquoted() {
    let expr = Expression::parse(r#"echo(  'a' , "b" ,c)"#);
    assert_eq!(
        expr.segments()[0].args,
        Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
    );

    let expr = Expression::parse("getSelection()");
    assert_eq!(expr.segments()[0].args, Some(vec![]));
}

#[test]
fn test_parse_non_call_shapes_are_properties() {
    for input in ["a(b", "(x)", "my-fn(1)", "fn)"] {
        let expr = Expression::parse(input);
        assert_eq!(expr.segments().len(), 1);
        assert!(!expr.segments()[0].is_call(), "{input} parsed as a call");
    }
}

#[test]
fn test_parse_surrounding_whitespace() {
    let expr = Expression::parse("  document.title \n");
    assert_eq!(
        expr.segments(),
        &[Segment::property("document"), Segment::property("title")]
    );
}

#[tokio::test]
async fn test_evaluate_scalar_property() {
    let value = evaluate(&page(), "document.title").await.unwrap();
    assert_eq!(value, json!("Inbox (3)"));
}

#[tokio::test]
async fn test_evaluate_node_yields_text_content() {
    let page = page();
    let value = evaluate(&page, "document.querySelector('#main')").await.unwrap();
    assert_eq!(value, json!("Hello world"));
    assert_eq!(
        page.calls(),
        vec![("querySelector".to_string(), vec!["#main".to_string()])]
    );
}

#[tokio::test]
async fn test_evaluate_object_yields_json_text() {
    let value = evaluate(&page(), "location").await.unwrap();
    assert_eq!(value, json!(r#"{"href":"https://example.com/"}"#));
}

#[tokio::test]
async fn test_evaluate_call_arguments_reach_method() {
    let value = evaluate(&page(), "echo('x', 2)").await.unwrap();
    assert_eq!(value, json!(["x", "2"]));
}

#[tokio::test]
async fn test_evaluate_property_of_scalar() {
    let value = evaluate(&page(), "document.title.length").await.unwrap();
    assert_eq!(value, json!(9));
}

#[tokio::test]
async fn test_undefined_segment_is_reported() {
    let err = evaluate(&page(), "document.nothing.here").await.unwrap_err();
    assert!(matches!(err, EvalError::UndefinedPath(ref s) if s == "nothing"));
    assert_eq!(err.to_string(), "nothing is undefined");
}

#[tokio::test]
async fn test_empty_expression_is_undefined() {
    let err = evaluate(&page(), "").await.unwrap_err();
    assert!(matches!(err, EvalError::UndefinedPath(ref s) if s.is_empty()));
}

#[tokio::test]
async fn test_null_dereference() {
    let err = evaluate(&page(), "document.activeElement.id").await.unwrap_err();
    assert!(matches!(err, EvalError::NullDereference(ref s) if s == "id"));

    let err = evaluate(&page(), "document.querySelector('#nope').innerText")
        .await
        .unwrap_err();
    assert!(err.is_in_page());
}

#[tokio::test]
async fn test_null_result_is_returned() {
    let value = evaluate(&page(), "document.activeElement").await.unwrap();
    assert_eq!(value, Value::Null);
}

#[tokio::test]
async fn test_method_failures_propagate() {
    let err = evaluate(&page(), "explode()").await.unwrap_err();
    assert!(err.is_in_page());
    assert_eq!(err.to_string(), "boom");

    let err = evaluate(&page(), "document.title.toUpperCase()").await.unwrap_err();
    assert_eq!(err.to_string(), "toUpperCase is not a function");
}
