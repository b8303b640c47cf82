#![allow(dead_code)]

use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wp_harvest::{Origin, StatusSink};

pub fn origin(server: &MockServer) -> Origin {
    Origin::parse(&server.uri()).unwrap()
}

/// `count` collection items with ids starting at `first_id`
pub fn items(server: &MockServer, first_id: u64, count: usize) -> Value {
    let items: Vec<Value> = (first_id..first_id + count as u64)
        .map(|id| {
            json!({
                "id": id,
                "link": format!("{}/?p={}", server.uri(), id),
                "title": { "rendered": format!("Item {}", id) }
            })
        })
        .collect();
    Value::Array(items)
}

/// WordPress REST root served at `/wp-json/`
pub async fn mount_wp_json_root(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/wp-json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Test Site",
            "namespaces": ["oembed/1.0", "wp/v2"]
        })))
        .mount(server)
        .await;
}

pub async fn mount_types(server: &MockServer, types: Value) {
    Mock::given(method("GET"))
        .and(path("/wp-json/wp/v2/types"))
        .respond_with(ResponseTemplate::new(200).set_body_json(types))
        .mount(server)
        .await;
}

/// One page of `/wp-json/wp/v2/{rest_base}`, expected to be hit `times` times
pub async fn mount_page(
    server: &MockServer,
    rest_base: &str,
    per_page: usize,
    page: usize,
    body: Value,
    times: u64,
) {
    Mock::given(method("GET"))
        .and(path(format!("/wp-json/wp/v2/{}", rest_base)))
        .and(query_param("per_page", per_page.to_string()))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .expect(times)
        .mount(server)
        .await;
}

/// Status sink that records every message
#[derive(Clone, Default)]
pub struct RecordingStatus {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingStatus {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl StatusSink for RecordingStatus {
    fn set_status(&self, text: &str) {
        self.messages.lock().unwrap().push(text.to_string());
    }
}
