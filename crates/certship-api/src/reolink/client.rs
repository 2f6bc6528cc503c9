// Reolink HTTPS client
//
// Wraps `reqwest::Client` with the camera's command envelope: every call is
// `POST /api.cgi?cmd=<name>` with a single-element JSON array body, and the
// response is a single-element array of `{cmd, code, value?, error?}`.
// The envelope is unwrapped here -- callers never see it.

use std::sync::RwLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, trace, warn};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// First 200 characters of a response body, for error messages.
fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}

/// Camera identity returned by `GetDevInfo`.
///
/// Retrieved right after login; `name` and `model` make the log lines and
/// outcome reports readable.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub model: String,
    #[serde(rename = "firmVer", default)]
    pub firmware_version: String,
}

#[derive(Deserialize)]
struct CommandResponse {
    cmd: String,
    code: i64,
    value: Option<Value>,
    error: Option<CommandError>,
}

#[derive(Deserialize)]
struct CommandError {
    #[serde(rename = "rspCode")]
    rsp_code: i64,
    detail: Option<String>,
}

impl CommandResponse {
    fn rsp_code(&self) -> i64 {
        self.error.as_ref().map_or(self.code, |e| e.rsp_code)
    }

    fn detail(&self) -> String {
        self.error
            .as_ref()
            .and_then(|e| e.detail.clone())
            .unwrap_or_else(|| "no error detail provided".to_owned())
    }
}

/// HTTP client for one Reolink camera (or NVR).
///
/// Holds the auth token from `Login`; the token rides in the query string
/// of every subsequent request. One client per device per upload attempt.
pub struct ReolinkClient {
    http: reqwest::Client,
    base_url: Url,
    /// Lease token from `Login`. Cleared on logout; replaced wholesale on
    /// re-login (the camera invalidates the old token when its certificate
    /// store is cleared).
    token: RwLock<Option<String>>,
}

impl ReolinkClient {
    /// Create a client for `https://{host}:{port}` with the given transport
    /// settings. Does not touch the network; call [`login`](Self::login)
    /// to open a session.
    pub fn new(host: &str, port: u16, transport: &TransportConfig) -> Result<Self, Error> {
        let base_url = Url::parse(&format!("https://{host}:{port}"))?;
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            token: RwLock::new(None),
        })
    }

    /// Create a client with a pre-built `reqwest::Client` and explicit base
    /// URL. Used by tests to point at a mock server over plain HTTP.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            token: RwLock::new(None),
        }
    }

    /// Whether a session token is currently held.
    pub fn is_logged_in(&self) -> bool {
        self.token.read().expect("token lock poisoned").is_some()
    }

    // ── Request plumbing ─────────────────────────────────────────────

    fn command_url(&self, cmd: &str, with_token: bool) -> Result<Url, Error> {
        let mut url = self.base_url.join("/api.cgi")?;
        url.query_pairs_mut().append_pair("cmd", cmd);
        if with_token {
            let guard = self.token.read().expect("token lock poisoned");
            let token = guard.as_deref().ok_or(Error::NotLoggedIn)?;
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }

    /// Send one command and return its raw response record, without
    /// checking `code`. Most callers want [`post`](Self::post).
    async fn post_raw(
        &self,
        cmd: &str,
        param: Value,
        with_token: bool,
    ) -> Result<CommandResponse, Error> {
        let url = self.command_url(cmd, with_token)?;
        debug!("POST {} ({cmd})", url.path());

        let body = json!([{ "cmd": cmd, "action": 0, "param": param }]);
        let resp = self.http.post(url).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::CameraApi {
                command: cmd.to_owned(),
                rsp_code: i64::from(status.as_u16()),
                detail: format!("HTTP {status}: {}", preview(&body)),
            });
        }

        let body = resp.text().await?;
        let mut responses: Vec<CommandResponse> =
            serde_json::from_str(&body).map_err(|e| Error::Deserialization {
                message: format!("{e} (body preview: {:?})", preview(&body)),
                body: body.clone(),
            })?;

        if responses.is_empty() {
            return Err(Error::Deserialization {
                message: "empty response array".into(),
                body,
            });
        }
        let response = responses.swap_remove(0);
        if response.cmd != cmd {
            trace!(
                expected = cmd,
                got = response.cmd,
                "response cmd mismatch (tolerated)"
            );
        }
        Ok(response)
    }

    /// Send one command, mapping `code != 0` to [`Error::CameraApi`].
    async fn post(&self, cmd: &str, param: Value, with_token: bool) -> Result<Option<Value>, Error> {
        let response = self.post_raw(cmd, param, with_token).await?;
        if response.code != 0 {
            return Err(Error::CameraApi {
                command: cmd.to_owned(),
                rsp_code: response.rsp_code(),
                detail: response.detail(),
            });
        }
        Ok(response.value)
    }

    // ── Session lifecycle ────────────────────────────────────────────

    /// Authenticate and store the lease token.
    ///
    /// Safe to call on an already-authenticated client: the camera hands
    /// out a fresh token and the old one is discarded (the re-login after
    /// a certificate clear relies on this).
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<(), Error> {
        debug!("logging in to {} as {username}", self.base_url);

        let param = json!({
            "User": {
                "userName": username,
                "password": password.expose_secret(),
            }
        });

        let response = self.post_raw("Login", param, false).await?;
        if response.code != 0 {
            return Err(Error::Authentication {
                message: format!("rspCode {}: {}", response.rsp_code(), response.detail()),
            });
        }

        let token = response
            .value
            .as_ref()
            .and_then(|v| v.pointer("/Token/name"))
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Authentication {
                message: "login response missing token".into(),
            })?
            .to_owned();

        *self.token.write().expect("token lock poisoned") = Some(token);
        debug!("login successful");
        Ok(())
    }

    /// End the session. The token is cleared even if the device call
    /// fails -- it is useless to us afterwards either way.
    pub async fn logout(&self) -> Result<(), Error> {
        debug!("logging out of {}", self.base_url);
        let result = self.post("Logout", json!({}), true).await;
        *self.token.write().expect("token lock poisoned") = None;
        result.map(|_| ())
    }

    // ── Device operations ────────────────────────────────────────────

    /// Fetch the camera's identity (name, model, firmware).
    pub async fn device_info(&self) -> Result<DeviceInfo, Error> {
        let value = self
            .post("GetDevInfo", json!({}), true)
            .await?
            .unwrap_or(Value::Null);

        let info = value
            .get("DevInfo")
            .cloned()
            .ok_or_else(|| Error::Deserialization {
                message: "GetDevInfo response missing DevInfo".into(),
                body: value.to_string(),
            })?;

        serde_json::from_value(info).map_err(|e| Error::Deserialization {
            message: format!("invalid DevInfo: {e}"),
            body: value.to_string(),
        })
    }

    /// Wipe the camera's certificate store.
    ///
    /// The firmware invalidates the active session as a side effect;
    /// callers must re-login before the next authenticated command.
    pub async fn clear_certificates(&self) -> Result<(), Error> {
        debug!("clearing certificate store");
        self.post("CertificateClear", json!({}), true).await?;
        Ok(())
    }

    /// Upload a certificate/key pair.
    ///
    /// The device's own verdict is authoritative: `Ok(true)` on `code == 0`,
    /// `Ok(false)` when the firmware rejects the import. `Err` is reserved
    /// for transport-level failures.
    pub async fn import_certificate(
        &self,
        cert_pem: &str,
        key_pem: &SecretString,
        cert_name: &str,
    ) -> Result<bool, Error> {
        debug!("importing certificate as {cert_name}");

        let crt_b64 = BASE64.encode(cert_pem.as_bytes());
        let key_b64 = BASE64.encode(key_pem.expose_secret().as_bytes());
        let param = json!({
            "importCertificate": {
                "crt": {
                    "name": format!("{cert_name}.crt"),
                    "size": cert_pem.len(),
                    "content": crt_b64,
                },
                "key": {
                    "name": format!("{cert_name}.key"),
                    "size": key_pem.expose_secret().len(),
                    "content": key_b64,
                },
            }
        });

        let response = self.post_raw("ImportCertificate", param, true).await?;
        if response.code == 0 {
            Ok(true)
        } else {
            warn!(
                "camera rejected certificate import (rspCode {}): {}",
                response.rsp_code(),
                response.detail()
            );
            Ok(false)
        }
    }
}
