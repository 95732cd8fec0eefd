//! # Integration Tests
//!
//! Integration and end-to-end tests.
//!
//! Covers:
//! - Contract snapshot tests
//! - Settings file -> Dispatcher -> HttpSender -> local mock endpoint

#[cfg(test)]
mod contract_tests {
    use contracts::{DetectionResult, FormatterKind, RelayBlueprint, SETTINGS_NAMESPACE};

    #[test]
    fn test_contracts_compile() {
        let _ = contracts::ConfigVersion::V1;
        assert_eq!(SETTINGS_NAMESPACE, "scoresight.json");
    }

    #[test]
    fn test_detection_batch_wire_format() {
        let batch = vec![DetectionResult::success("home", 3)];
        assert_eq!(
            serde_json::to_string(&batch).unwrap(),
            r#"[{"name":"home","value":3,"state":"success"}]"#
        );
    }

    #[test]
    fn test_blueprint_formatters_classified_on_load() {
        let json = r#"{
            "endpoint": "http://localhost/api",
            "field_mapping": {"clock": "SetClock"},
            "field_formatters": {"clock": " SECONDS "}
        }"#;
        let blueprint: RelayBlueprint = serde_json::from_str(json).unwrap();
        assert_eq!(
            blueprint.field_formatters.get("clock"),
            Some(&FormatterKind::Seconds)
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use config_loader::{ConfigFormat, ConfigLoader, JsonFileStore};
    use contracts::{DetectionResult, ResultState, SETTINGS_NAMESPACE};
    use dispatcher::{Dispatcher, HttpSender, KEY_ESSENTIALS, KEY_ESSENTIALS_ID, KEY_SEND_SAME};
    use serde_json::{json, Value};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    /// Local HTTP endpoint recording every JSON body it receives
    ///
    /// Answers with the scripted statuses in order, then 200. Every response carries
    /// rate-limit headers.
    struct MockEndpoint {
        url: String,
        bodies: Arc<Mutex<Vec<Value>>>,
        handle: JoinHandle<()>,
    }

    impl MockEndpoint {
        async fn start(statuses: impl IntoIterator<Item = u16>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let url = format!("http://{}/apiv2/controlapps/test/api", listener.local_addr().unwrap());
            let bodies = Arc::new(Mutex::new(Vec::new()));
            let script: Arc<Mutex<VecDeque<u16>>> = Arc::new(Mutex::new(statuses.into_iter().collect()));

            let recorded = Arc::clone(&bodies);
            let handle = tokio::spawn(async move {
                let mut calls = 0u64;
                while let Ok((mut stream, _)) = listener.accept().await {
                    let Some(body) = read_body(&mut stream).await else {
                        continue;
                    };
                    recorded.lock().unwrap().push(body);
                    calls += 1;

                    let status = script.lock().unwrap().pop_front().unwrap_or(200);
                    let response = format!(
                        "HTTP/1.1 {status} Mock\r\n\
                         X-Singular-Ratelimit-Burst-Calls: {}\r\n\
                         X-Singular-Ratelimit-Daily-Calls: {}\r\n\
                         content-length: 0\r\nconnection: close\r\n\r\n",
                        100 - calls,
                        10_000 - calls
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                }
            });

            Self { url, bodies, handle }
        }

        fn bodies(&self) -> Vec<Value> {
            self.bodies.lock().unwrap().clone()
        }
    }

    impl Drop for MockEndpoint {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }

    async fn read_body(stream: &mut TcpStream) -> Option<Value> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.ok()?;
            if n == 0 {
                return None;
            }
            buf.extend_from_slice(&chunk[..n]);

            let text = String::from_utf8_lossy(&buf).into_owned();
            let Some(header_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let content_length = text[..header_end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);

            let body_start = header_end + 4;
            if buf.len() >= body_start + content_length {
                return serde_json::from_slice(&buf[body_start..body_start + content_length]).ok();
            }
        }
    }

    fn relay_config(endpoint: &str) -> String {
        format!(
            r#"
endpoint = "{endpoint}"
timeout_secs = 5

[field_mapping]
home = "SetHomeScore"
away = "SetAwayScore"
clock = "SetClock"
period = "SetPeriod"

[field_formatters]
clock = "seconds"
period = "json:{{\"command\": \"{{command}}\", \"value\": \"P{{value}}\"}}"
"#
        )
    }

    /// End-to-end: settings file -> Dispatcher -> HttpSender -> mock endpoint
    #[tokio::test]
    async fn test_e2e_settings_drive_payload_shape() {
        let endpoint = MockEndpoint::start([]).await;
        let settings = tempfile::tempdir().unwrap();
        std::fs::write(
            settings.path().join(SETTINGS_NAMESPACE),
            r#"{"uno_send_same": false, "uno_essentials_id": "overlay-1"}"#,
        )
        .unwrap();

        let blueprint =
            ConfigLoader::load_from_str(&relay_config(&endpoint.url), ConfigFormat::Toml).unwrap();
        let store = JsonFileStore::open(settings.path()).unwrap();
        let sender = HttpSender::with_timeout("e2e", Some(std::time::Duration::from_secs(5))).unwrap();
        let dispatcher = Dispatcher::from_blueprint(sender, &blueprint);
        dispatcher.bind(&store);
        dispatcher.start();

        let batch = vec![
            DetectionResult::success("home", 2),
            DetectionResult::new("away", 1, ResultState::SameNoChange),
            DetectionResult::success("clock", "12:34"),
            DetectionResult::success("period", 3),
            DetectionResult::new("home", 5, ResultState::Error),
            DetectionResult::success("unmapped", "x"),
        ];

        // 1. Default shape, SameNoChange filtered
        dispatcher.update(&batch).await;

        // 2. Essentials mode switched on through the store
        store.set(SETTINGS_NAMESPACE, KEY_ESSENTIALS, true).unwrap();
        dispatcher.update(&batch[..3]).await;

        // 3. External edit picked up by reload
        std::fs::write(
            settings.path().join(SETTINGS_NAMESPACE),
            r#"{"uno_send_same": true, "uno_essentials": true, "uno_essentials_id": "overlay-2"}"#,
        )
        .unwrap();
        assert_eq!(store.reload().unwrap(), 2);
        dispatcher.update(&batch[1..2]).await;

        assert_eq!(
            endpoint.bodies(),
            vec![
                json!({"command": "SetHomeScore", "value": 2}),
                json!({"command": "SetClock", "value": 754}),
                json!({"command": "SetPeriod", "value": "P3"}),
                json!({"command": "SetOverlayContentField", "value": 2, "fieldId": "SetHomeScore", "id": "overlay-1"}),
                json!({"command": "SetOverlayContentField", "value": 754, "fieldId": "SetClock", "id": "overlay-1"}),
                json!({"command": "SetOverlayContentField", "value": 1, "fieldId": "SetAwayScore", "id": "overlay-2"}),
            ]
        );

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.delivered, 6);
        assert_eq!(metrics.failed + metrics.rejected, 0);

        let summary = dispatcher.delivery_summary();
        assert_eq!(summary.delivered, 6);
        assert_eq!(summary.last_rate_limits.burst_calls.as_deref(), Some("94"));
    }

    /// Rejections and transport failures never stop the relay
    #[tokio::test]
    async fn test_e2e_failures_are_isolated() {
        let endpoint = MockEndpoint::start([500, 429]).await;
        let blueprint =
            ConfigLoader::load_from_str(&relay_config(&endpoint.url), ConfigFormat::Toml).unwrap();
        let dispatcher = Dispatcher::from_blueprint(HttpSender::new("e2e").unwrap(), &blueprint);
        dispatcher.start();

        let batch = vec![
            DetectionResult::success("home", 1),
            DetectionResult::success("away", 2),
            DetectionResult::success("clock", "01:00"),
        ];
        dispatcher.update(&batch).await;

        // Nothing listens on a freshly released port
        let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let closed_url = format!("http://{}/api", closed.local_addr().unwrap());
        drop(closed);
        dispatcher.set_endpoint(closed_url);
        dispatcher.update(&batch[..1]).await;

        dispatcher.set_endpoint(endpoint.url.clone());
        dispatcher.update(&batch[..1]).await;

        let metrics = dispatcher.metrics();
        assert_eq!(metrics.rejected, 2);
        assert_eq!(metrics.failed, 1);
        assert_eq!(metrics.delivered, 2);
        assert_eq!(endpoint.bodies().len(), 4);

        let summary = dispatcher.delivery_summary();
        assert_eq!(summary.status_counts.get(&500), Some(&1));
        assert_eq!(summary.status_counts.get(&429), Some(&1));
    }

    /// Stopping gates all traffic, restarting resumes it
    #[tokio::test]
    async fn test_e2e_stop_and_restart() {
        let endpoint = MockEndpoint::start([]).await;
        let settings = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(settings.path()).unwrap();
        let blueprint =
            ConfigLoader::load_from_str(&relay_config(&endpoint.url), ConfigFormat::Toml).unwrap();
        let dispatcher = Dispatcher::from_blueprint(HttpSender::new("e2e").unwrap(), &blueprint);
        dispatcher.bind(&store);

        let batch = vec![DetectionResult::new("home", 4, ResultState::SameNoChange)];

        dispatcher.update(&batch).await;
        store.set(SETTINGS_NAMESPACE, KEY_SEND_SAME, true).unwrap();
        store.set(SETTINGS_NAMESPACE, KEY_ESSENTIALS_ID, "ignored-while-off").unwrap();
        dispatcher.update(&batch).await;
        assert!(endpoint.bodies().is_empty());

        dispatcher.start();
        dispatcher.update(&batch).await;
        dispatcher.stop();
        dispatcher.update(&batch).await;

        assert_eq!(
            endpoint.bodies(),
            vec![json!({"command": "SetHomeScore", "value": 4})]
        );
    }
}
