//! End-to-end tests for the compiled dispatch pipeline.
//!
//! These run the full path - contract compilation, template resolution,
//! interceptors, retry, error handling, decode - against a scripted
//! in-process transport, so every behavior here is observable without a
//! network.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretext::codec::stream::StreamDecoder;
use pretext::codec::JsonDecoder;
use pretext::contract::{
    ClassMarker, InterfaceDefinition, MethodDefinition, MethodMarker, ParamDefinition, ParamMarker,
};
use pretext::types::TypeRef;
use pretext::{
    ArgValue, BearerAuthInterceptor, Capability, Client, DecodedValue, DispatchError, Error,
    ExceptionPropagationPolicy, HttpStatusError, Options, Pretext, Request, Response,
    TransportError, TransportErrorKind,
};

// ============================================================================
// Scripted transport
// ============================================================================

#[derive(Clone)]
enum Script {
    Respond {
        status: u16,
        headers: Vec<(&'static str, &'static str)>,
        body: &'static str,
    },
    Fail {
        retryable: bool,
    },
}

#[derive(Debug, Clone)]
struct SeenRequest {
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    read_timeout: Duration,
}

/// Transport double: pops one script entry per call and records what it saw.
struct ScriptedClient {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl ScriptedClient {
    fn new(scripts: Vec<Script>) -> (Self, Arc<Mutex<Vec<SeenRequest>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                scripts: Arc::new(Mutex::new(scripts.into())),
                seen: seen.clone(),
            },
            seen,
        )
    }
}

impl Client for ScriptedClient {
    fn execute(&self, request: &Request, options: &Options) -> Result<Response, TransportError> {
        self.seen.lock().unwrap().push(SeenRequest {
            method: request.method().to_string(),
            url: request.url().to_string(),
            headers: request.headers().to_vec(),
            body: request.body().map(<[u8]>::to_vec),
            read_timeout: options.read_timeout(),
        });
        match self.scripts.lock().unwrap().pop_front() {
            Some(Script::Respond {
                status,
                headers,
                body,
            }) => {
                let mut builder = Response::builder().status(status);
                for (name, value) in headers {
                    builder = builder.header(name, value);
                }
                Ok(builder
                    .body_reader(std::io::Cursor::new(body.as_bytes().to_vec()))
                    .build())
            }
            Some(Script::Fail { retryable }) => Err(TransportError::new(
                TransportErrorKind::Connect,
                "scripted failure",
                retryable,
            )),
            None => panic!("transport called more times than scripted"),
        }
    }
}

/// Transport double that echoes the request URL as a text body.
struct EchoClient;

impl Client for EchoClient {
    fn execute(&self, request: &Request, _options: &Options) -> Result<Response, TransportError> {
        Ok(Response::builder()
            .status(200)
            .body(request.url().to_string())
            .build())
    }
}

fn ok(body: &'static str) -> Script {
    Script::Respond {
        status: 200,
        headers: vec![],
        body,
    }
}

// ============================================================================
// Definitions under test
// ============================================================================

fn string_ty() -> TypeRef {
    TypeRef::new("String")
}

fn github() -> InterfaceDefinition {
    InterfaceDefinition::new("GitHub")
        .marker(ClassMarker::Headers(vec!["Accept: application/json".into()]))
        .method(
            MethodDefinition::new(
                "contributors",
                TypeRef::generic("Vec", vec![TypeRef::new("Contributor")]),
            )
            .marker(MethodMarker::request_line(
                "GET /repos/{owner}/{repo}/contributors",
            ))
            .param(ParamDefinition::new("owner", string_ty()).marker(ParamMarker::param()))
            .param(ParamDefinition::new("repo", string_ty()).marker(ParamMarker::param())),
        )
        .method(
            MethodDefinition::new("createIssue", TypeRef::unit())
                .marker(MethodMarker::request_line("POST /repos/{owner}/{repo}/issues"))
                .param(ParamDefinition::new("owner", string_ty()).marker(ParamMarker::param()))
                .param(ParamDefinition::new("repo", string_ty()).marker(ParamMarker::param()))
                .param(ParamDefinition::new("issue", TypeRef::new("Issue"))),
        )
}

// ============================================================================
// Request shaping
// ============================================================================

#[test]
fn test_get_resolves_path_params_and_class_headers() {
    let (client, seen) = ScriptedClient::new(vec![ok("[]")]);
    let api = Pretext::builder()
        .client(client)
        .decoder(JsonDecoder)
        .target(github(), "https://api.github.com")
        .unwrap();

    let value = api
        .call(
            "contributors",
            &[ArgValue::from("octocat"), ArgValue::from("Hello-World")],
        )
        .unwrap();
    assert_eq!(value.as_json().unwrap(), &serde_json::json!([]));

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "GET");
    assert_eq!(
        seen[0].url,
        "https://api.github.com/repos/octocat/Hello-World/contributors"
    );
    assert!(seen[0]
        .headers
        .iter()
        .any(|(name, value)| name == "Accept" && value == "application/json"));
}

#[test]
fn test_body_param_is_encoded() {
    let (client, seen) = ScriptedClient::new(vec![ok("")]);
    let api = Pretext::builder()
        .client(client)
        .encoder(pretext::codec::JsonEncoder)
        .decoder(JsonDecoder)
        .target(github(), "https://api.github.com")
        .unwrap();

    api.call(
        "createIssue",
        &[
            ArgValue::from("octocat"),
            ArgValue::from("Hello-World"),
            ArgValue::Json(serde_json::json!({"title": "it breaks"})),
        ],
    )
    .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].body.as_deref(), Some(&br#"{"title":"it breaks"}"#[..]));
}

#[test]
fn test_interceptors_run_in_order() {
    let (client, seen) = ScriptedClient::new(vec![ok("[]")]);
    let api = Pretext::builder()
        .client(client)
        .decoder(JsonDecoder)
        .request_interceptor(BearerAuthInterceptor::new("t0ken"))
        .request_interceptor(|template: &mut pretext::RequestTemplate| {
            template.header("X-Request-Id", &["42"]).unwrap();
        })
        .target(github(), "https://api.github.com")
        .unwrap();

    api.call(
        "contributors",
        &[ArgValue::from("octocat"), ArgValue::from("Hello-World")],
    )
    .unwrap();

    let seen = seen.lock().unwrap();
    let header = |name: &str| {
        seen[0]
            .headers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone())
    };
    assert_eq!(header("Authorization").as_deref(), Some("Bearer t0ken"));
    assert_eq!(header("X-Request-Id").as_deref(), Some("42"));
}

#[test]
fn test_query_and_header_maps() {
    let definition = InterfaceDefinition::new("Search").method(
        MethodDefinition::new("find", string_ty())
            .marker(MethodMarker::request_line("GET /find"))
            .param(
                ParamDefinition::new(
                    "filters",
                    TypeRef::generic("HashMap", vec![string_ty(), string_ty()]),
                )
                .marker(ParamMarker::QueryMap { encoded: false }),
            )
            .param(
                ParamDefinition::new(
                    "extra",
                    TypeRef::generic("HashMap", vec![string_ty(), string_ty()]),
                )
                .marker(ParamMarker::HeaderMap),
            ),
    );

    let (client, seen) = ScriptedClient::new(vec![ok("done")]);
    let api = Pretext::builder()
        .client(client)
        .target(definition, "http://localhost")
        .unwrap();

    let mut filters = std::collections::BTreeMap::new();
    filters.insert("q".to_string(), vec!["rust http".to_string()]);
    filters.insert("page".to_string(), vec!["2".to_string()]);
    let mut extra = std::collections::BTreeMap::new();
    extra.insert("X-Tenant".to_string(), vec!["acme".to_string()]);

    api.call("find", &[ArgValue::Map(filters), ArgValue::Map(extra)])
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].url, "http://localhost/find?page=2&q=rust%20http");
    assert!(seen[0]
        .headers
        .iter()
        .any(|(name, value)| name == "X-Tenant" && value == "acme"));
}

#[test]
fn test_form_params_become_urlencoded_body() {
    let definition = InterfaceDefinition::new("Auth").method(
        MethodDefinition::new("login", TypeRef::unit())
            .marker(MethodMarker::request_line("POST /login"))
            .param(ParamDefinition::new("user", string_ty()).marker(ParamMarker::param()))
            .param(ParamDefinition::new("pass", string_ty()).marker(ParamMarker::param())),
    );

    let (client, seen) = ScriptedClient::new(vec![ok("")]);
    let api = Pretext::builder()
        .client(client)
        .target(definition, "http://localhost")
        .unwrap();

    api.call("login", &[ArgValue::from("octo cat"), ArgValue::from("s3cr3t")])
        .unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(
        seen[0].body.as_deref(),
        Some(&b"pass=s3cr3t&user=octo%20cat"[..])
    );
}

#[test]
fn test_url_override_param_replaces_target() {
    let definition = InterfaceDefinition::new("Mirror").method(
        MethodDefinition::new("fetch", string_ty())
            .marker(MethodMarker::request_line("GET /data"))
            .param(ParamDefinition::new("base", TypeRef::new("Url"))),
    );

    let (client, seen) = ScriptedClient::new(vec![ok("x")]);
    let api = Pretext::builder()
        .client(client)
        .target(definition, "http://primary.example.com")
        .unwrap();

    api.call(
        "fetch",
        &[ArgValue::Url(url::Url::parse("http://mirror.example.com").unwrap())],
    )
    .unwrap();

    assert_eq!(seen.lock().unwrap()[0].url, "http://mirror.example.com/data");
}

#[test]
fn test_per_call_options_override() {
    let definition = InterfaceDefinition::new("Slow").method(
        MethodDefinition::new("poll", string_ty())
            .marker(MethodMarker::request_line("GET /poll"))
            .param(ParamDefinition::new("options", TypeRef::new("Options"))),
    );

    let (client, seen) = ScriptedClient::new(vec![ok("x")]);
    let api = Pretext::builder()
        .client(client)
        .target(definition, "http://localhost")
        .unwrap();

    let options = Options::new(Duration::from_secs(1), Duration::from_secs(120), true);
    api.call("poll", &[ArgValue::Options(options)]).unwrap();

    assert_eq!(
        seen.lock().unwrap()[0].read_timeout,
        Duration::from_secs(120)
    );
}

#[test]
fn test_custom_expander_formats_value() {
    struct Csv;
    impl pretext::ParamExpander for Csv {
        fn expand(&self, value: &ArgValue) -> Result<String, pretext::EncodeError> {
            match value {
                ArgValue::Str(s) => Ok(s.replace(' ', "-")),
                _ => Err(pretext::EncodeError::Unsupported {
                    value_kind: "non-string",
                }),
            }
        }
    }

    let definition = InterfaceDefinition::new("Tags").method(
        MethodDefinition::new("tagged", string_ty())
            .marker(MethodMarker::request_line("GET /tagged/{tag}"))
            .param(
                ParamDefinition::new("tag", string_ty())
                    .marker(ParamMarker::expanded("tag", Arc::new(Csv))),
            ),
    );

    let (client, seen) = ScriptedClient::new(vec![ok("x")]);
    let api = Pretext::builder()
        .client(client)
        .target(definition, "http://localhost")
        .unwrap();

    api.call("tagged", &[ArgValue::from("good first issue")]).unwrap();
    assert_eq!(
        seen.lock().unwrap()[0].url,
        "http://localhost/tagged/good-first-issue"
    );
}

// ============================================================================
// Status handling
// ============================================================================

#[test]
fn test_404_raises_status_error_by_default() {
    let (client, _) = ScriptedClient::new(vec![Script::Respond {
        status: 404,
        headers: vec![],
        body: "missing",
    }]);
    let api = Pretext::builder()
        .client(client)
        .decoder(JsonDecoder)
        .target(github(), "https://api.github.com")
        .unwrap();

    let err = api
        .call(
            "contributors",
            &[ArgValue::from("octocat"), ArgValue::from("gone")],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Status(HttpStatusError { status: 404, .. })
    ));
}

#[test]
fn test_404_decodes_to_empty_when_enabled() {
    let (client, _) = ScriptedClient::new(vec![Script::Respond {
        status: 404,
        headers: vec![],
        body: "missing",
    }]);
    let api = Pretext::builder()
        .client(client)
        .decoder(JsonDecoder)
        .decode404()
        .target(github(), "https://api.github.com")
        .unwrap();

    let value = api
        .call(
            "contributors",
            &[ArgValue::from("octocat"), ArgValue::from("gone")],
        )
        .unwrap();
    // the declared shape is Vec<Contributor>, so its empty value is []
    assert_eq!(value.as_json().unwrap(), &serde_json::json!([]));
}

#[test]
fn test_server_error_carries_status_and_body() {
    let (client, _) = ScriptedClient::new(vec![Script::Respond {
        status: 500,
        headers: vec![("X-Err", "oops")],
        body: "boom",
    }]);
    let api = Pretext::builder()
        .client(client)
        .decoder(JsonDecoder)
        .target(github(), "https://api.github.com")
        .unwrap();

    let err = api
        .call(
            "contributors",
            &[ArgValue::from("octocat"), ArgValue::from("Hello-World")],
        )
        .unwrap_err();
    let Error::Status(status) = err else { panic!("expected status error") };
    assert_eq!(status.status, 500);
    assert_eq!(status.config_key, "GitHub#contributors(String,String)");
    assert_eq!(status.body.as_deref(), Some(&b"boom"[..]));
    assert!(status.headers.iter().any(|(n, v)| n == "X-Err" && v == "oops"));
}

#[test]
fn test_void_return_skips_decoding() {
    struct ExplodingDecoder;
    impl pretext::codec::Decoder for ExplodingDecoder {
        fn decode(
            &self,
            _response: Response,
            ty: &TypeRef,
        ) -> Result<DecodedValue, pretext::DecodeError> {
            Err(pretext::DecodeError::Unsupported { ty: ty.to_string() })
        }
    }

    let (client, _) = ScriptedClient::new(vec![ok("ignored")]);
    let api = Pretext::builder()
        .client(client)
        .decoder(ExplodingDecoder)
        .target(github(), "https://api.github.com")
        .unwrap();

    let value = api
        .call(
            "createIssue",
            &[
                ArgValue::from("octocat"),
                ArgValue::from("Hello-World"),
                ArgValue::from("{}"),
            ],
        )
        .unwrap();
    assert!(value.is_empty());
}

// ============================================================================
// Retry composition
// ============================================================================

#[test]
fn test_retryable_failures_are_retried_until_success() {
    let (client, seen) = ScriptedClient::new(vec![
        Script::Fail { retryable: true },
        Script::Fail { retryable: true },
        ok("[]"),
    ]);
    let api = Pretext::builder()
        .client(client)
        .decoder(JsonDecoder)
        .retryer(pretext::retry::DefaultRetryer::new(
            Duration::from_millis(1),
            Duration::from_millis(2),
            5,
        ))
        .target(github(), "https://api.github.com")
        .unwrap();

    let value = api
        .call(
            "contributors",
            &[ArgValue::from("octocat"), ArgValue::from("Hello-World")],
        )
        .unwrap();
    assert!(value.as_json().is_some());
    assert_eq!(seen.lock().unwrap().len(), 3);
}

#[test]
fn test_terminal_failure_is_not_retried() {
    let (client, seen) = ScriptedClient::new(vec![Script::Fail { retryable: false }]);
    let api = Pretext::builder()
        .client(client)
        .decoder(JsonDecoder)
        .target(github(), "https://api.github.com")
        .unwrap();

    let err = api
        .call(
            "contributors",
            &[ArgValue::from("octocat"), ArgValue::from("Hello-World")],
        )
        .unwrap_err();
    assert!(matches!(err, Error::Transport(t) if !t.retryable));
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn test_exhausted_retries_propagate_terminal_error() {
    let (client, seen) = ScriptedClient::new(vec![
        Script::Fail { retryable: true },
        Script::Fail { retryable: true },
    ]);
    let api = Pretext::builder()
        .client(client)
        .decoder(JsonDecoder)
        .retryer(pretext::retry::DefaultRetryer::new(
            Duration::from_millis(1),
            Duration::from_millis(1),
            2,
        ))
        .target(github(), "https://api.github.com")
        .unwrap();

    let err = api
        .call(
            "contributors",
            &[ArgValue::from("octocat"), ArgValue::from("Hello-World")],
        )
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(seen.lock().unwrap().len(), 2);
}

#[test]
fn test_retry_after_hint_feeds_retry_loop_and_unwraps() {
    // 503 + Retry-After becomes a retryable transport error wrapping the
    // status error; with unwrap propagation the caller sees the status
    let (client, _) = ScriptedClient::new(vec![Script::Respond {
        status: 503,
        headers: vec![("Retry-After", "1")],
        body: "busy",
    }]);
    let api = Pretext::builder()
        .client(client)
        .decoder(JsonDecoder)
        .retryer(pretext::retry::NeverRetry)
        .exception_propagation_policy(ExceptionPropagationPolicy::UnwrapAndThrowCause)
        .target(github(), "https://api.github.com")
        .unwrap();

    let err = api
        .call(
            "contributors",
            &[ArgValue::from("octocat"), ArgValue::from("Hello-World")],
        )
        .unwrap_err();
    assert!(matches!(
        err,
        Error::Status(HttpStatusError { status: 503, .. })
    ));
}

// ============================================================================
// Dispatch contract
// ============================================================================

#[test]
fn test_unknown_method_is_a_dispatch_error() {
    let (client, _) = ScriptedClient::new(vec![]);
    let api = Pretext::builder()
        .client(client)
        .target(github(), "https://api.github.com")
        .unwrap();

    let err = api.call("starGazers", &[]).unwrap_err();
    assert!(matches!(err, Error::Dispatch(DispatchError::Unknown { .. })));
}

#[test]
fn test_wrong_arity_is_a_dispatch_error() {
    let (client, _) = ScriptedClient::new(vec![]);
    let api = Pretext::builder()
        .client(client)
        .target(github(), "https://api.github.com")
        .unwrap();

    let err = api.call("contributors", &[ArgValue::from("octocat")]).unwrap_err();
    assert!(matches!(
        err,
        Error::Dispatch(DispatchError::Arity {
            expected: 2,
            got: 1,
            ..
        })
    ));
}

#[test]
fn test_capability_wraps_the_transport() {
    struct Counting {
        calls: Arc<AtomicUsize>,
    }
    struct CountingClient {
        inner: Box<dyn Client>,
        calls: Arc<AtomicUsize>,
    }
    impl Client for CountingClient {
        fn execute(&self, request: &Request, options: &Options) -> Result<Response, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.execute(request, options)
        }
    }
    impl Capability for Counting {
        fn enrich_client(&self, client: Box<dyn Client>) -> Box<dyn Client> {
            Box::new(CountingClient {
                inner: client,
                calls: self.calls.clone(),
            })
        }
    }

    let calls = Arc::new(AtomicUsize::new(0));
    let (client, _) = ScriptedClient::new(vec![ok("[]")]);
    let api = Pretext::builder()
        .client(client)
        .decoder(JsonDecoder)
        .add_capability(Counting { calls: calls.clone() })
        .target(github(), "https://api.github.com")
        .unwrap();

    api.call(
        "contributors",
        &[ArgValue::from("octocat"), ArgValue::from("Hello-World")],
    )
    .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Lazy sequences through the full pipeline
// ============================================================================

#[test]
fn test_stream_return_shape_decodes_lazily() {
    let definition = InterfaceDefinition::new("Events").method(
        MethodDefinition::new(
            "tail",
            TypeRef::generic("Stream", vec![TypeRef::new("Event")]),
        )
        .marker(MethodMarker::request_line("GET /events")),
    );

    let (client, _) = ScriptedClient::new(vec![ok("{\"id\":1}\n{\"id\":2}\n{\"id\":3}\n")]);
    let api = Pretext::builder()
        .client(client)
        .decoder(StreamDecoder::new(Arc::new(JsonDecoder)))
        .do_not_close_after_decode()
        .target(definition, "http://localhost")
        .unwrap();

    let DecodedValue::Stream(sequence) = api.call("tail", &[]).unwrap() else {
        panic!("expected a lazy sequence")
    };
    let ids: Vec<i64> = sequence
        .map(|record| record.unwrap().as_json().unwrap()["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn test_stream_prefix_then_close() {
    let definition = InterfaceDefinition::new("Events").method(
        MethodDefinition::new(
            "tail",
            TypeRef::generic("Stream", vec![TypeRef::new("Event")]),
        )
        .marker(MethodMarker::request_line("GET /events")),
    );

    let (client, _) = ScriptedClient::new(vec![ok("{\"id\":1}\n{\"id\":2}\n{\"id\":3}\n")]);
    let api = Pretext::builder()
        .client(client)
        .decoder(StreamDecoder::new(Arc::new(JsonDecoder)))
        .do_not_close_after_decode()
        .target(definition, "http://localhost")
        .unwrap();

    let DecodedValue::Stream(mut sequence) = api.call("tail", &[]).unwrap() else {
        panic!("expected a lazy sequence")
    };
    assert!(sequence.next().unwrap().is_ok());
    // abandoning after a prefix must not raise
    sequence.close();
}

// ============================================================================
// Concurrency
// ============================================================================

#[test]
fn test_concurrent_calls_share_one_compiled_client() {
    let definition = InterfaceDefinition::new("Echo").method(
        MethodDefinition::new("echo", string_ty())
            .marker(MethodMarker::request_line("GET /echo/{value}"))
            .param(ParamDefinition::new("value", string_ty()).marker(ParamMarker::param())),
    );

    let api = Arc::new(
        Pretext::builder()
            .client(EchoClient)
            .target(definition, "http://localhost")
            .unwrap(),
    );

    let handles: Vec<_> = (0..8)
        .map(|thread| {
            let api = api.clone();
            std::thread::spawn(move || {
                for i in 0..50 {
                    let value = format!("t{thread}-{i}");
                    let result = api.call("echo", &[ArgValue::from(value.as_str())]).unwrap();
                    let DecodedValue::Text(url) = result else { panic!("expected text") };
                    // every call sees exactly its own resolved template
                    assert_eq!(url, format!("http://localhost/echo/{value}"));
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
