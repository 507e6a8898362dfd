use super::*;
use crate::context::{InboundRequest, RequestContext};
use crate::error::{BindingError, DispatchError, HandlerError, RegistrationError};
use crate::handler::{handler_fn, Reply};
use crate::multipart::MultipartConfig;
use crate::route::{Route, ViewKind};
use crate::router::PathPattern;
use crate::session::{InMemorySessionStore, SessionStore};
use serde_json::json;
use std::sync::Arc;

fn describe(specs: &[ParamSpec]) -> Vec<ParameterDescriptor> {
    ResolverChain::new().describe_all("test", specs).unwrap()
}

fn resolve(specs: &[ParamSpec], req: InboundRequest) -> Result<Vec<Arg>, DispatchError> {
    let descriptors = describe(specs);
    let mut ctx = RequestContext::new(req);
    ParameterPipeline::default().resolve(&descriptors, &mut ctx)
}

fn templated_route(template: &str) -> Arc<Route> {
    Arc::new(Route {
        method: http::Method::GET,
        pattern: PathPattern::parse(template).unwrap(),
        handler_name: Arc::from("templated"),
        descriptors: Arc::from(Vec::new()),
        view: ViewKind::Text,
        template: None,
        handler: handler_fn(|_| Ok(Reply::Empty)),
    })
}

#[test]
fn test_default_resolver_order() {
    let descriptors = describe(&[
        ParamSpec::path("id", DeclaredType::Int),
        ParamSpec::header("X-Token", DeclaredType::Str),
        ParamSpec::cookie("theme", DeclaredType::Str),
        ParamSpec::body("payload", DeclaredType::Json),
        ParamSpec::file("avatar"),
        ParamSpec::files("attachments"),
        ParamSpec::session("session"),
        ParamSpec::context("ctx"),
        ParamSpec::failure("err"),
        ParamSpec::query("name", DeclaredType::Str),
        ParamSpec::plain("page", DeclaredType::Int),
    ]);
    let kinds: Vec<SourceKind> = descriptors.iter().map(|d| d.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SourceKind::PathVariable,
            SourceKind::Header,
            SourceKind::Cookie,
            SourceKind::Body,
            SourceKind::MultipartFile,
            SourceKind::MultipartFileList,
            SourceKind::Session,
            SourceKind::RequestContext,
            SourceKind::Throwable,
            SourceKind::QueryParam,
            SourceKind::QueryParam,
        ]
    );
    assert!(descriptors[9].required);
    assert!(!descriptors[10].required);
    assert!(!descriptors[6].required);
}

#[test]
fn test_unsupported_parameter_reports_position() {
    let err = ResolverChain::new()
        .describe_all(
            "upload",
            &[
                ParamSpec::query("ok", DeclaredType::Str),
                ParamSpec::plain("bad", DeclaredType::list(DeclaredType::File)),
            ],
        )
        .unwrap_err();
    match err {
        RegistrationError::UnsupportedParameter {
            handler,
            index,
            name,
            ..
        } => {
            assert_eq!(handler, "upload");
            assert_eq!(index, 1);
            assert_eq!(name, "bad");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_default_that_does_not_convert_fails_registration() {
    let err = ResolverChain::new()
        .describe_all(
            "paged",
            &[ParamSpec::query("page", DeclaredType::Int).default_value("abc")],
        )
        .unwrap_err();
    match err {
        RegistrationError::InvalidDefault {
            handler,
            name,
            source,
        } => {
            assert_eq!(handler, "paged");
            assert_eq!(name, "page");
            assert!(matches!(source, BindingError::Coercion { ref value, .. } if value == "abc"));
        }
        other => panic!("unexpected error: {other}"),
    }

    let ok = ResolverChain::new().describe_all(
        "paged",
        &[
            ParamSpec::query("ids", DeclaredType::list(DeclaredType::Int)).default_value("1,2"),
            ParamSpec::query("on", DeclaredType::Bool).default_value("yes"),
            ParamSpec::query("page", DeclaredType::Int).default_value(""),
        ],
    );
    assert!(ok.is_ok());
}

struct TenantResolver;

impl ParameterResolver for TenantResolver {
    fn name(&self) -> &'static str {
        "tenant"
    }

    fn supports(&self, spec: &ParamSpec) -> bool {
        spec.name == "tenant"
    }

    fn describe(&self, spec: &ParamSpec) -> ParameterDescriptor {
        ParameterDescriptor {
            name: Arc::from("x-tenant"),
            ..ParameterDescriptor::from_spec(spec, SourceKind::Header)
        }
    }
}

#[test]
fn test_custom_resolver_runs_before_defaults() {
    let mut chain = ResolverChain::new();
    chain.push(Arc::new(TenantResolver));
    let descriptors = chain
        .describe_all("h", &[ParamSpec::query("tenant", DeclaredType::Str)])
        .unwrap();
    assert_eq!(descriptors[0].kind, SourceKind::Header);
    assert_eq!(descriptors[0].name.as_ref(), "x-tenant");
}

#[test]
fn test_query_coercion() {
    let specs = [
        ParamSpec::query("n", DeclaredType::Int),
        ParamSpec::query("f", DeclaredType::Float),
        ParamSpec::query("b", DeclaredType::Bool),
        ParamSpec::query("tags", DeclaredType::list(DeclaredType::Str)),
        ParamSpec::query("ids", DeclaredType::list(DeclaredType::Int)),
        ParamSpec::query("filter", DeclaredType::Json),
    ];
    let args = resolve(
        &specs,
        InboundRequest::get(
            "/q?n=1&n=42&f=2.5&b=yes&tags=a,b&tags=c&ids=1,2&filter=%7B%22k%22%3A1%7D",
        ),
    )
    .unwrap();
    assert_eq!(args[0], Arg::Value(json!(42)));
    assert_eq!(args[1], Arg::Value(json!(2.5)));
    assert_eq!(args[2], Arg::Value(json!(true)));
    assert_eq!(args[3], Arg::Value(json!(["a", "b", "c"])));
    assert_eq!(args[4], Arg::Value(json!([1, 2])));
    assert_eq!(args[5], Arg::Value(json!({"k": 1})));
}

#[test]
fn test_coercion_failure_is_binding_error() {
    let err = resolve(
        &[ParamSpec::query("n", DeclaredType::Int)],
        InboundRequest::get("/q?n=abc"),
    )
    .unwrap_err();
    assert_eq!(err.status(), 400);
    match err {
        DispatchError::ParameterBinding(BindingError::Coercion {
            name, kind, value, ..
        }) => {
            assert_eq!(name, "n");
            assert_eq!(kind, SourceKind::QueryParam);
            assert_eq!(value, "abc");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_missing_required_and_defaults() {
    let err = resolve(
        &[ParamSpec::query("name", DeclaredType::Str)],
        InboundRequest::get("/q"),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::MissingRequiredParameter { ref name, kind: SourceKind::QueryParam } if name == "name"
    ));

    let args = resolve(
        &[
            ParamSpec::query("name", DeclaredType::Str).optional(),
            ParamSpec::query("page", DeclaredType::Int).default_value("1"),
            ParamSpec::query("size", DeclaredType::Int).default_value("10"),
        ],
        InboundRequest::get("/q?size="),
    )
    .unwrap();
    assert_eq!(args[0], Arg::Absent);
    assert_eq!(args[1], Arg::Value(json!(1)));
    assert_eq!(args[2], Arg::Value(json!(10)));
}

#[test]
fn test_empty_string_binds_for_str() {
    let args = resolve(
        &[ParamSpec::query("q", DeclaredType::Str)],
        InboundRequest::get("/q?q="),
    )
    .unwrap();
    assert_eq!(args[0], Arg::Value(json!("")));
}

#[test]
fn test_bind_as_uses_alternate_name() {
    let args = resolve(
        &[ParamSpec::query("user_name", DeclaredType::Str).bind_as("userName")],
        InboundRequest::get("/q?userName=Yi"),
    )
    .unwrap();
    assert_eq!(args[0], Arg::Value(json!("Yi")));
}

#[test]
fn test_header_and_cookie() {
    let args = resolve(
        &[
            ParamSpec::header("X-Retries", DeclaredType::Int),
            ParamSpec::cookie("theme", DeclaredType::Str),
        ],
        InboundRequest::get("/")
            .header("x-retries", "3")
            .header("cookie", "theme=dark"),
    )
    .unwrap();
    assert_eq!(args[0], Arg::Value(json!(3)));
    assert_eq!(args[1], Arg::Value(json!("dark")));
}

#[test]
fn test_path_variable_from_match_and_rederived() {
    let route = templated_route("/controller/pathVariable/{name}/{code}");
    let descriptors = describe(&[
        ParamSpec::path("name", DeclaredType::Str),
        ParamSpec::path("code", DeclaredType::Int),
    ]);
    let pipeline = ParameterPipeline::default();

    let mut ctx = RequestContext::new(InboundRequest::get("/controller/pathVariable/Yi/42"));
    let bindings = route.pattern.matches(ctx.path());
    ctx.set_route(Arc::clone(&route), bindings);
    let matched = pipeline.resolve(&descriptors, &mut ctx).unwrap();

    let mut ctx = RequestContext::new(InboundRequest::get("/controller/pathVariable/Yi/42"));
    ctx.set_route(route, None);
    let rederived = pipeline.resolve(&descriptors, &mut ctx).unwrap();

    assert_eq!(matched, vec![Arg::Value(json!("Yi")), Arg::Value(json!(42))]);
    assert_eq!(matched, rederived);
}

#[test]
fn test_body_binding() {
    let args = resolve(
        &[ParamSpec::body("user", DeclaredType::Json)],
        InboundRequest::post("/u").json(&json!({"name": "Yi", "age": 3})),
    )
    .unwrap();
    assert_eq!(args[0], Arg::Value(json!({"name": "Yi", "age": 3})));

    let args = resolve(
        &[ParamSpec::body("raw", DeclaredType::Str)],
        InboundRequest::post("/u").body("not json"),
    )
    .unwrap();
    assert_eq!(args[0], Arg::Value(json!("not json")));

    let err = resolve(
        &[ParamSpec::body("user", DeclaredType::Json)],
        InboundRequest::post("/u").body("{broken"),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::ParameterBinding(BindingError::Body { .. })
    ));

    let err = resolve(
        &[ParamSpec::body("count", DeclaredType::Int)],
        InboundRequest::post("/u").body("[1]"),
    )
    .unwrap_err();
    assert_eq!(err.status(), 400);

    let err = resolve(
        &[ParamSpec::body("user", DeclaredType::Json)],
        InboundRequest::post("/u"),
    )
    .unwrap_err();
    assert!(matches!(err, DispatchError::MissingRequiredParameter { .. }));
}

fn multipart_request(body: &str) -> InboundRequest {
    InboundRequest::post("/upload")
        .header("content-type", "multipart/form-data; boundary=XyZ")
        .body(body.replace('\n', "\r\n"))
}

const UPLOAD: &str = "--XyZ
Content-Disposition: form-data; name=\"title\"

holiday
--XyZ
Content-Disposition: form-data; name=\"photo\"; filename=\"a.png\"
Content-Type: image/png

AAAA
--XyZ
Content-Disposition: form-data; name=\"photo\"; filename=\"b.png\"
Content-Type: image/png

BBBB
--XyZ--
";

#[test]
fn test_multipart_files_and_fields() {
    let args = resolve(
        &[
            ParamSpec::query("title", DeclaredType::Str),
            ParamSpec::file("photo"),
            ParamSpec::files("photo"),
            ParamSpec::file("missing"),
        ],
        multipart_request(UPLOAD),
    )
    .unwrap();
    assert_eq!(args[0], Arg::Value(json!("holiday")));
    match &args[1] {
        Arg::File(f) => {
            assert_eq!(f.filename(), "a.png");
            assert_eq!(f.content_type(), "image/png");
            assert_eq!(f.bytes(), b"AAAA");
        }
        other => panic!("expected a file, got {other:?}"),
    }
    match &args[2] {
        Arg::Files(files) => assert_eq!(files.len(), 2),
        other => panic!("expected files, got {other:?}"),
    }
    assert_eq!(args[3], Arg::Absent);
}

#[test]
fn test_malformed_multipart_is_binding_error() {
    let err = resolve(
        &[ParamSpec::file("photo")],
        multipart_request("--XyZ\nContent-Disposition: form-data; name=\"photo\"\n\nunterminated"),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::ParameterBinding(BindingError::Multipart(_))
    ));
}

#[test]
fn test_resolution_is_idempotent() {
    let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::default());
    let descriptors = describe(&[
        ParamSpec::query("name", DeclaredType::Str),
        ParamSpec::session("session"),
        ParamSpec::context("ctx"),
        ParamSpec::failure("err"),
    ]);
    let mut ctx = RequestContext::from_inbound(
        InboundRequest::get("/controller/requestParam?name=Yi"),
        Some(store),
        &MultipartConfig::default(),
    );
    ctx.set_failure(Arc::new(HandlerError::msg("boom")));

    let pipeline = ParameterPipeline::default();
    let first = pipeline.resolve(&descriptors, &mut ctx).unwrap();
    let second = pipeline.resolve(&descriptors, &mut ctx).unwrap();
    assert_eq!(first, second);
    assert!(matches!(first[1], Arg::Session(_)));
    assert!(matches!(first[3], Arg::Failure(_)));
    assert_eq!(ctx.response().cookies().len(), 1);
}

#[test]
fn test_replaced_extractor() {
    let mut table = ExtractorTable::new();
    table.set(
        SourceKind::Header,
        extractor(|d, _| Ok(Arg::Value(json!(format!("stub:{}", d.name))))),
    );
    let descriptors = describe(&[ParamSpec::header("x-any", DeclaredType::Str)]);
    let mut ctx = RequestContext::new(InboundRequest::get("/"));
    let args = ParameterPipeline::new(table)
        .resolve(&descriptors, &mut ctx)
        .unwrap();
    assert_eq!(args[0], Arg::Value(json!("stub:x-any")));
}

#[test]
fn test_args_accessors() {
    let mut ctx = RequestContext::new(InboundRequest::get("/"));
    let args = Args::new(
        vec![Arg::Value(json!("Yi")), Arg::Value(json!(42)), Arg::Absent],
        &mut ctx,
    );
    assert_eq!(args.str(0), Some("Yi"));
    assert_eq!(args.get::<i64>(1).unwrap(), 42);
    assert_eq!(args.get::<Option<i64>>(2).unwrap(), None);
    assert!(args.get::<String>(2).is_err());
    assert!(matches!(args.get::<i64>(0), Err(ArgError::Convert { index: 0, .. })));
    assert!(matches!(args.raw(9), Err(ArgError::OutOfRange { index: 9, len: 3 })));
    assert!(args.files(2).is_empty());
}
