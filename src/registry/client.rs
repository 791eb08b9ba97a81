//! Registry (master) XML-RPC client (§4.5, component E).
//!
//! A thin synchronous wrapper over `reqwest::blocking`, modeled on the
//! traced-request-builder shape of the teacher's own HTTP client
//! (`orb-http-client::Client`): one `call` entry point that builds the
//! envelope, posts it, and decodes the response, with every call
//! logged at `tracing::debug!`.

use std::time::Duration;

use reqwest::blocking::Client as HttpClient;

use crate::error::{LaunchError, Result};

use super::value::XmlRpcValue;
use super::wire::{encode_request, parse_response};

const CALLER_ID: &str = "/roslaunch";

/// Blocking XML-RPC client bound to one registry (master) URI.
pub struct RegistryClient {
    http: HttpClient,
    uri: String,
}

impl RegistryClient {
    pub fn new(uri: impl Into<String>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| LaunchError::Registry(format!("building HTTP client: {e}")))?;
        Ok(RegistryClient { http, uri: uri.into() })
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Posts a `methodCall` envelope for `method` with `params` and
    /// decodes the response, surfacing both transport failures and
    /// XML-RPC faults as [`LaunchError::Registry`].
    pub fn call(&self, method: &str, params: &[XmlRpcValue]) -> Result<XmlRpcValue> {
        let body = encode_request(method, params)?;
        tracing::debug!(method, uri = %self.uri, "registry call");

        let response = self
            .http
            .post(&self.uri)
            .header("Content-Type", "text/xml")
            .body(body)
            .send()
            .map_err(|e| LaunchError::Registry(format!("{method}: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| LaunchError::Registry(format!("{method}: reading response body: {e}")))?;
        if !status.is_success() {
            return Err(LaunchError::Registry(format!("{method}: HTTP {status}")));
        }

        parse_response(&text)
    }

    /// Does the master answer at all (used by the bootstrap probe, §4.6
    /// step 2, which probes with `getSystemState`)?
    #[must_use]
    pub fn is_reachable(&self) -> bool {
        self.get_system_state().is_ok()
    }

    pub fn get_param(&self, key: &str) -> Result<XmlRpcValue> {
        let triple = self.call("getParam", &[XmlRpcValue::from(CALLER_ID), XmlRpcValue::from(key)])?;
        third(triple)
    }

    pub fn has_param(&self, key: &str) -> Result<bool> {
        let triple = self.call("hasParam", &[XmlRpcValue::from(CALLER_ID), XmlRpcValue::from(key)])?;
        Ok(matches!(third(triple)?, XmlRpcValue::Bool(true)))
    }

    pub fn set_param(&self, key: &str, value: &XmlRpcValue) -> Result<()> {
        self.call("setParam", &[XmlRpcValue::from(CALLER_ID), XmlRpcValue::from(key), value.clone()])?;
        Ok(())
    }

    /// `setParam` variant for YAML-sourced values (§4.5): if `value` is
    /// a struct (the YAML root was a mapping), each leaf is set
    /// individually at its joined namespace; anything else goes
    /// through plain `setParam` directly.
    pub fn set_yaml_param(&self, key: &str, value: XmlRpcValue) -> Result<()> {
        match value {
            XmlRpcValue::Struct(members) if !members.is_empty() => {
                for (name, member_value) in members {
                    self.set_yaml_param(&crate::scope::resolve_name(key, &name), member_value)?;
                }
                Ok(())
            }
            other => self.set_param(key, &other),
        }
    }

    pub fn delete_param(&self, key: &str) -> Result<()> {
        self.call("deleteParam", &[XmlRpcValue::from(CALLER_ID), XmlRpcValue::from(key)])?;
        Ok(())
    }

    /// `clearParam` (§4.5): implemented as `setParam` of an empty
    /// struct at `key`, emptying its subtree rather than deleting the
    /// key itself.
    pub fn clear_param(&self, key: &str) -> Result<()> {
        self.set_param(key, &XmlRpcValue::Struct(std::collections::BTreeMap::new()))
    }

    pub fn get_system_state(&self) -> Result<XmlRpcValue> {
        let triple = self.call("getSystemState", &[XmlRpcValue::from(CALLER_ID)])?;
        third(triple)
    }
}

/// Unwraps the registry API's `[statusCode, statusMessage, value]`
/// convention, returning `value`. A non-1 status code is a protocol
/// level failure, not a transport one, and is reported the same way.
fn third(triple: XmlRpcValue) -> Result<XmlRpcValue> {
    let items = triple
        .as_array()
        .ok_or_else(|| LaunchError::Registry("expected a 3-element response array".to_string()))?;
    if items.len() != 3 {
        return Err(LaunchError::Registry(format!(
            "expected a 3-element response array, got {}",
            items.len()
        )));
    }
    let status = items[0].as_int().unwrap_or(0);
    if status != 1 {
        let message = items[1].as_str().unwrap_or("unknown error").to_string();
        return Err(LaunchError::Registry(message));
    }
    Ok(items[2].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn triple_response(value_xml: &str) -> String {
        format!(
            r#"<?xml version="1.0"?><methodResponse><params><param><value><array><data>
<value><int>1</int></value><value><string>ok</string></value>
<value>{value_xml}</value>
</data></array></value></param></params></methodResponse>"#
        )
    }

    /// `reqwest::blocking` runs its own runtime internally and panics
    /// if called from inside one already entered, so the mock server
    /// is driven on its own thread and only its address crosses over;
    /// the blocking client call itself runs on a plain test thread.
    fn with_mock_server(body: String) -> String {
        let (tx, rx) = std::sync::mpsc::channel();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Runtime::new().unwrap();
            rt.block_on(async move {
                let server = MockServer::start().await;
                Mock::given(method("POST"))
                    .and(path("/"))
                    .respond_with(ResponseTemplate::new(200).set_body_string(body))
                    .mount(&server)
                    .await;
                tx.send(server.uri()).unwrap();
                // Keep the server alive for the duration of the test.
                std::thread::sleep(Duration::from_secs(5));
            });
        });
        rx.recv().unwrap()
    }

    #[test]
    fn get_param_unwraps_the_status_triple() {
        let uri = with_mock_server(triple_response("<int>7</int>"));
        let client = RegistryClient::new(uri).unwrap();
        let value = client.get_param("/foo").unwrap();
        assert_eq!(value.as_int(), Some(7));
    }

    #[test]
    fn non_one_status_is_an_error() {
        let body = r#"<?xml version="1.0"?><methodResponse><params><param><value><array><data>
<value><int>-1</int></value><value><string>no such param</string></value>
<value><int>0</int></value>
</data></array></value></param></params></methodResponse>"#
            .to_string();
        let uri = with_mock_server(body);
        let client = RegistryClient::new(uri).unwrap();
        assert!(client.get_param("/foo").is_err());
    }
}
