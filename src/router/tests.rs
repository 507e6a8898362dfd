use super::*;
use crate::error::RegistrationError;
use crate::handler::{handler_fn, Reply};
use crate::route::{Route, ViewKind};
use http::Method;
use std::sync::Arc;

fn route(method: Method, template: &str, name: &str) -> Route {
    Route {
        method,
        pattern: PathPattern::parse(template).unwrap(),
        handler_name: Arc::from(name),
        descriptors: Arc::from(Vec::new()),
        view: ViewKind::Text,
        template: None,
        handler: handler_fn(|_| Ok(Reply::Empty)),
    }
}

#[test]
fn test_exact_lookup_ignores_query_and_trailing_slash() {
    let registry = RouteRegistry::new();
    registry
        .register(route(Method::GET, "/controller/requestParam", "request_param"))
        .unwrap();

    for path in [
        "/controller/requestParam",
        "/controller/requestParam/",
        "/controller/requestParam?name=Yi",
    ] {
        let m = registry.lookup(&Method::GET, path).unwrap();
        assert_eq!(m.route.handler_name.as_ref(), "request_param");
        assert!(m.path_params.is_empty());
    }
    assert!(registry.lookup(&Method::POST, "/controller/requestParam").is_none());
}

#[test]
fn test_root_path() {
    let registry = RouteRegistry::new();
    registry.register(route(Method::GET, "/", "root")).unwrap();
    assert!(registry.lookup(&Method::GET, "/").is_some());
    assert!(registry.lookup(&Method::GET, "").is_some());
    assert!(registry.lookup(&Method::GET, "/x").is_none());
}

#[test]
fn test_templated_lookup_binds_in_order() {
    let registry = RouteRegistry::new();
    registry
        .register(route(Method::GET, "/a/{x}/b/{y}", "ab"))
        .unwrap();
    let m = registry.lookup(&Method::GET, "/a/1/b/2").unwrap();
    let names: Vec<&str> = m.path_params.iter().map(|(k, _)| k.as_ref()).collect();
    let values: Vec<&str> = m.path_params.iter().map(|(_, v)| v.as_str()).collect();
    assert_eq!(names, vec!["x", "y"]);
    assert_eq!(values, vec!["1", "2"]);
    assert_eq!(m.get_path_param("y"), Some("2"));
    assert_eq!(m.path_params_map().get("x").map(String::as_str), Some("1"));
}

#[test]
fn test_literal_sibling_wins_over_template() {
    let registry = RouteRegistry::new();
    registry
        .register(route(
            Method::GET,
            "/controller/pathVariable/{name}/{code}",
            "templated",
        ))
        .unwrap();
    registry
        .register(route(Method::GET, "/controller/pathVariable/fixed", "fixed"))
        .unwrap();

    let m = registry
        .lookup(&Method::GET, "/controller/pathVariable/fixed")
        .unwrap();
    assert_eq!(m.route.handler_name.as_ref(), "fixed");

    let m = registry
        .lookup(&Method::GET, "/controller/pathVariable/Yi/42")
        .unwrap();
    assert_eq!(m.route.handler_name.as_ref(), "templated");
    assert_eq!(m.get_path_param("name"), Some("Yi"));
    assert_eq!(m.get_path_param("code"), Some("42"));
}

#[test]
fn test_first_registered_template_wins() {
    let registry = RouteRegistry::new();
    registry
        .register(route(Method::GET, "/items/{id}", "first"))
        .unwrap();
    registry
        .register(route(Method::GET, "/items/{slug}", "second"))
        .unwrap();
    let m = registry.lookup(&Method::GET, "/items/7").unwrap();
    assert_eq!(m.route.handler_name.as_ref(), "first");
}

#[test]
fn test_duplicate_registration_fails() {
    let registry = RouteRegistry::new();
    registry.register(route(Method::GET, "/users/{id}", "a")).unwrap();

    let err = registry
        .register(route(Method::GET, "/users/{id}/", "b"))
        .unwrap_err();
    assert!(matches!(
        err,
        RegistrationError::DuplicateRoute { ref template, .. } if template == "/users/{id}"
    ));

    registry
        .register(route(Method::POST, "/users/{id}", "c"))
        .unwrap();
    assert_eq!(registry.len(), 2);

    let routes = registry.routes();
    assert_eq!(routes[0].handler_name.as_ref(), "a");
    assert_eq!(routes[1].handler_name.as_ref(), "c");
}

#[test]
fn test_segment_count_mismatch_is_a_miss() {
    let registry = RouteRegistry::new();
    registry
        .register(route(Method::GET, "/users/{id}", "user"))
        .unwrap();
    assert!(registry.lookup(&Method::GET, "/users/1/posts").is_none());
    assert!(registry.lookup(&Method::GET, "/accounts/1").is_none());
    assert!(!registry.is_empty());
}
