//! End-to-end master bring-up (§4.6) against a mocked registry HTTP
//! server, rather than the `RegistryClient` unit tests which only
//! exercise one call at a time (`src/registry/client.rs`).

use std::time::Duration;

use roslaunch::assembler::Assembled;
use roslaunch::bootstrap;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Inspects the XML-RPC `methodName` in the request body to answer
/// each call differently, since every call in this protocol is a POST
/// to the same URL (see `src/registry/client.rs`'s own mock tests).
struct FakeMaster;

impl Respond for FakeMaster {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body = String::from_utf8_lossy(&request.body);
        let value_xml = if body.contains("getSystemState") {
            "<array><data/></array>".to_string()
        } else if body.contains("hasParam") {
            "<boolean>0</boolean>".to_string()
        } else {
            "<int>1</int>".to_string()
        };
        ResponseTemplate::new(200).set_body_string(triple_response(&value_xml))
    }
}

fn triple_response(value_xml: &str) -> String {
    format!(
        r#"<?xml version="1.0"?><methodResponse><params><param><value><array><data>
<value><int>1</int></value><value><string>ok</string></value>
<value>{value_xml}</value>
</data></array></value></param></params></methodResponse>"#
    )
}

/// `reqwest::blocking` panics if driven from inside a tokio runtime
/// already entered, so the mock server runs on its own thread and only
/// its URI crosses over to the blocking test body.
fn spawn_fake_master() -> String {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let server = MockServer::start().await;
            Mock::given(method("POST")).and(path("/")).respond_with(FakeMaster).mount(&server).await;
            tx.send(server.uri()).unwrap();
            std::thread::sleep(Duration::from_secs(5));
        });
    });
    rx.recv().unwrap()
}

#[test]
fn bootstrap_finds_a_reachable_master_and_sets_a_fresh_run_id() {
    let uri = spawn_fake_master();

    let outcome = bootstrap::bootstrap(Some(&uri), None, 1, false, "run-abc-123").unwrap();
    assert!(outcome.forked_master.is_none(), "a reachable master should not be forked");
    assert_eq!(outcome.run_id, "run-abc-123");
    assert_eq!(outcome.client.uri(), uri);

    let empty = Assembled {
        nodes: Vec::new(),
        tests: Vec::new(),
        params: Vec::new(),
        rosparams: Vec::new(),
        machines: Vec::new(),
        clear_params: Vec::new(),
    };
    bootstrap::apply_param_ops(&outcome.client, &empty).unwrap();
}
