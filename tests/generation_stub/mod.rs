use std::io::Read as _;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use serde_json::Value;

#[derive(Debug, Clone)]
pub struct StubConfig {
    /// Value the `X-API-Key` header must carry; anything else gets a 401.
    pub api_key: Option<String>,
    pub behavior: Behavior,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Behavior {
    Canned(&'static str),
    Fail { status: u16, message: &'static str },
    MalformedBody,
    Delayed { text: &'static str, delay: Duration },
}

pub struct GenerationStub {
    pub base_url: String,
    requests: Arc<Mutex<Vec<Value>>>,
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl GenerationStub {
    pub fn spawn(config: StubConfig) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start generation stub");
        let addr = server.server_addr();
        let base_url = format!("http://{addr}");

        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let handle = thread::spawn(move || {
            loop {
                if shutdown_rx.try_recv().is_ok() {
                    break;
                }

                let mut request = match server.recv_timeout(Duration::from_millis(50)) {
                    Ok(Some(req)) => req,
                    Ok(None) => continue,
                    Err(_) => break,
                };

                let path = request.url().to_string();
                if request.method() != &tiny_http::Method::Post || path != "/generate" {
                    let _ = request.respond(
                        tiny_http::Response::from_string("not found").with_status_code(404),
                    );
                    continue;
                }

                if let Some(expected) = config.api_key.as_deref() {
                    let actual = request
                        .headers()
                        .iter()
                        .find(|h| h.field.equiv("X-API-Key"))
                        .map(|h| h.value.as_str().to_owned())
                        .unwrap_or_default();
                    if actual != expected {
                        let _ = request.respond(
                            tiny_http::Response::from_string("invalid api key")
                                .with_status_code(401),
                        );
                        continue;
                    }
                }

                let mut body = String::new();
                if request.as_reader().read_to_string(&mut body).is_err() {
                    let _ = request.respond(
                        tiny_http::Response::from_string("invalid request body")
                            .with_status_code(400),
                    );
                    continue;
                }

                let parsed: Value = match serde_json::from_str(&body) {
                    Ok(value) => value,
                    Err(_) => {
                        let _ = request.respond(
                            tiny_http::Response::from_string("invalid json").with_status_code(400),
                        );
                        continue;
                    }
                };

                let has_required = ["session_id", "task", "model"].iter().all(|field| {
                    parsed
                        .get(field)
                        .and_then(|v| v.as_str())
                        .is_some_and(|v| !v.is_empty())
                });
                if !has_required {
                    let _ = request.respond(
                        tiny_http::Response::from_string("missing required field")
                            .with_status_code(400),
                    );
                    continue;
                }

                seen.lock().expect("requests lock").push(parsed);

                match &config.behavior {
                    Behavior::Canned(text) => {
                        respond_json(request, &serde_json::json!({ "text": text }).to_string());
                    }
                    Behavior::Fail { status, message } => {
                        let _ = request.respond(
                            tiny_http::Response::from_string(*message).with_status_code(*status),
                        );
                    }
                    Behavior::MalformedBody => {
                        respond_json(request, "{\"unexpected\": true}");
                    }
                    Behavior::Delayed { text, delay } => {
                        thread::sleep(*delay);
                        respond_json(request, &serde_json::json!({ "text": text }).to_string());
                    }
                }
            }
        });

        Self {
            base_url,
            requests,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    #[allow(dead_code)]
    pub fn requests(&self) -> Vec<Value> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl Drop for GenerationStub {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn respond_json(request: tiny_http::Request, body: &str) {
    let mut response = tiny_http::Response::from_string(body).with_status_code(200);
    let header = tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("build header");
    response = response.with_header(header);
    let _ = request.respond(response);
}
