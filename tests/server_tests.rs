//! End-to-end tests for the stub server over real HTTP
//!
//! # Test Coverage
//!
//! - Full pipeline: transport request → adapter → dispatcher → response
//!   builder → transport response
//! - Sugar and structured declarations over the wire
//! - Miss/ambiguity surfaced to the client as server errors
//! - Arbitrary status codes, duplicate headers, value-less query params
//! - Recording accessors and the base-URL-aware declaration form
//! - Lifecycle: stop releases the socket
//!
//! # Test Fixtures
//!
//! Every test starts its own server on an OS-assigned port so tests can run
//! in parallel without conflicts, and drives it with `reqwest`'s blocking
//! client.

use http::Method;
use httpstub::{RequestCriteria, RequestSpec, ResponseSpec, StubResponse, StubServer};
use serde_json::json;
use std::collections::HashMap;

use tracing_util::TestTracing;

fn client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::new()
}

#[test]
fn test_string_sugar_round_trip() {
    let _tracing = TestTracing::init();
    let server = StubServer::start(vec![("/hello".into(), "hello".into())]).expect("start");

    let res = client()
        .get(format!("{}/hello", server.base_url()))
        .send()
        .expect("send");
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(
        res.headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("text/plain")
    );
    assert_eq!(res.text().expect("body"), "hello");

    let recorded = server.recorded_requests();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].method, Method::GET);
    assert_eq!(recorded[0].path, "/hello");
}

#[test]
fn test_structured_criteria_over_the_wire() {
    let server = StubServer::start(vec![(
        RequestSpec::Criteria(RequestCriteria {
            path: Some("/pets".to_string()),
            method: Some("POST".to_string()),
            query_params: Some(HashMap::from([(
                "kind".to_string(),
                Some("pug".to_string()),
            )])),
        }),
        ResponseSpec::Full(StubResponse::text(201, "created")),
    )])
    .expect("start");

    // Extra, unmentioned query params do not break the match.
    let res = client()
        .post(format!("{}/pets?kind=pug&debug=1", server.base_url()))
        .send()
        .expect("send");
    assert_eq!(res.status().as_u16(), 201);
    assert_eq!(res.text().expect("body"), "created");

    // Wrong value for a mentioned key is a miss, surfaced as a server error.
    let res = client()
        .post(format!("{}/pets?kind=cat", server.base_url()))
        .send()
        .expect("send");
    assert_eq!(res.status().as_u16(), 500);
}

#[test]
fn test_echo_producer_round_trip() {
    let server = StubServer::start(vec![(
        RequestSpec::path("/echo"),
        ResponseSpec::producer(|req| StubResponse::text(200, req.path.clone())),
    )])
    .expect("start");

    let res = client()
        .get(format!("{}/echo", server.base_url()))
        .send()
        .expect("send");
    assert_eq!(res.text().expect("body"), "/echo");
}

#[test]
fn test_miss_and_ambiguity_are_visible_errors() {
    let _tracing = TestTracing::init();
    let server = StubServer::start(vec![
        ("/dup".into(), "first".into()),
        ("/dup".into(), "second".into()),
        ("/only".into(), "ok".into()),
    ])
    .expect("start");

    let res = client()
        .get(format!("{}/missing", server.base_url()))
        .send()
        .expect("send");
    assert_eq!(res.status().as_u16(), 500);
    assert!(res.text().expect("body").contains("no route matched"));

    let res = client()
        .get(format!("{}/dup", server.base_url()))
        .send()
        .expect("send");
    assert_eq!(res.status().as_u16(), 500);
    assert!(res
        .text()
        .expect("body")
        .contains("matched more than one route"));

    // Neither the miss nor the ambiguous request was recorded anywhere.
    assert!(server.recorded_requests().is_empty());
}

#[test]
fn test_arbitrary_status_code_without_known_reason() {
    let mut response = StubResponse::new(599);
    response.body = Some("odd".to_string());
    let server = StubServer::start(vec![(
        RequestSpec::path("/odd"),
        ResponseSpec::Full(response),
    )])
    .expect("start");

    let res = client()
        .get(format!("{}/odd", server.base_url()))
        .send()
        .expect("send");
    assert_eq!(res.status().as_u16(), 599);
    assert_eq!(res.text().expect("body"), "odd");
}

#[test]
fn test_duplicate_headers_written_separately() {
    let mut declared = StubResponse::text(200, "ok");
    declared
        .headers
        .push(("X-Trace".to_string(), "one".to_string()));
    declared
        .headers
        .push(("X-Trace".to_string(), "two".to_string()));
    let server = StubServer::start(vec![(
        RequestSpec::path("/traced"),
        ResponseSpec::Full(declared),
    )])
    .expect("start");

    let res = client()
        .get(format!("{}/traced", server.base_url()))
        .send()
        .expect("send");
    let values: Vec<&str> = res
        .headers()
        .get_all("x-trace")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    assert_eq!(values, vec!["one", "two"]);
}

#[test]
fn test_value_less_query_param_recorded_as_absent() {
    let server = StubServer::start(vec![("/q".into(), "ok".into())]).expect("start");

    client()
        .get(format!("{}/q?flag&x=1", server.base_url()))
        .send()
        .expect("send");

    let recorded = server.recorded_requests();
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].query_params.get("flag"), Some(&None));
    assert_eq!(
        recorded[0].query_params.get("x"),
        Some(&Some("1".to_string()))
    );
}

#[test]
fn test_form_body_materialized_as_mapping() {
    let server = StubServer::start(vec![("/form".into(), "ok".into())]).expect("start");

    client()
        .post(format!("{}/form", server.base_url()))
        .header(
            reqwest::header::CONTENT_TYPE,
            "application/x-www-form-urlencoded",
        )
        .body("name=doggo&kind=pug")
        .send()
        .expect("send");

    let recorded = server.recorded_requests();
    assert_eq!(recorded.len(), 1);
    let body = recorded[0].body.as_ref().expect("form body");
    assert_eq!(body["name"], "doggo");
    assert_eq!(body["kind"], "pug");
    assert_eq!(
        recorded[0].content_type.as_deref(),
        Some("application/x-www-form-urlencoded")
    );
}

#[test]
fn test_recorded_interactions_in_dispatch_order() {
    let server = StubServer::start(vec![(
        RequestSpec::path("/n"),
        ResponseSpec::producer(|req| {
            StubResponse::text(
                200,
                req.get_query_param("i")
                    .flatten()
                    .unwrap_or("?")
                    .to_string(),
            )
        }),
    )])
    .expect("start");

    for i in 0..3 {
        client()
            .get(format!("{}/n?i={i}", server.base_url()))
            .send()
            .expect("send");
    }

    let responses = server.recorded_responses();
    let bodies: Vec<Option<String>> = responses.into_iter().map(|r| r.body).collect();
    assert_eq!(
        bodies,
        vec![
            Some("0".to_string()),
            Some("1".to_string()),
            Some("2".to_string())
        ]
    );
    assert_eq!(server.recorded_requests().len(), 3);
}

#[test]
fn test_routes_declared_against_base_url() {
    let server = StubServer::start_with(0, |base_url| {
        vec![(
            RequestSpec::path("/link"),
            ResponseSpec::Full(StubResponse::text(200, base_url.to_string())),
        )]
    })
    .expect("start");

    let res = client()
        .get(format!("{}/link", server.base_url()))
        .send()
        .expect("send");
    assert_eq!(res.text().expect("body"), server.base_url());
}

#[test]
fn test_json_declared_routes() {
    let server = StubServer::start_json(&[(
        json!("/j"),
        json!({"status": 201, "body": "made", "content_type": "text/plain"}),
    )])
    .expect("start");

    let res = client()
        .get(format!("{}/j", server.base_url()))
        .send()
        .expect("send");
    assert_eq!(res.status().as_u16(), 201);
    assert_eq!(res.text().expect("body"), "made");
}

#[test]
fn test_unsupported_declaration_fails_startup() {
    let err = StubServer::start_json(&[(json!(42), json!("ok"))])
        .err()
        .expect("startup should fail");
    assert!(err.to_string().contains("unsupported request spec type"));
}

#[test]
fn test_stop_releases_the_socket() {
    let server = StubServer::start(vec![("/up".into(), "ok".into())]).expect("start");
    let url = format!("{}/up", server.base_url());
    assert_eq!(
        client().get(&url).send().expect("send").status().as_u16(),
        200
    );

    server.stop();
    assert!(client().get(&url).send().is_err());
}
