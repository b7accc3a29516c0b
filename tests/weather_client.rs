//! Weather client against a local one-shot HTTP server.

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tempwatch::{DashboardError, TemperatureUnit, WeatherClient, WeatherConfig};

struct Reply {
    status: &'static str,
    body: &'static str,
    delay: Duration,
}

impl Reply {
    fn new(status: &'static str, body: &'static str) -> Self {
        Self {
            status,
            body,
            delay: Duration::ZERO,
        }
    }
}

/// Serves one reply per connection, in order, and reports each request line.
fn serve(replies: Vec<Reply>) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for reply in replies {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            let _ = reader.read_line(&mut request_line);
            loop {
                let mut line = String::new();
                match reader.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) if line == "\r\n" => break,
                    Ok(_) => {}
                }
            }
            let _ = tx.send(request_line.trim_end().to_string());

            thread::sleep(reply.delay);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                reply.status,
                reply.body.len(),
                reply.body
            );
            let mut stream = reader.into_inner();
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        }
    });

    (base_url, rx)
}

fn client(base_url: String, timeout_secs: f64, retries: u32) -> WeatherClient {
    WeatherClient::new(WeatherConfig {
        base_url,
        timeout_secs,
        retries,
        backoff_ms: 10,
    })
    .unwrap()
}

#[test]
fn reads_current_temperature_and_sends_query() {
    let (base_url, requests) = serve(vec![Reply::new(
        "200 OK",
        r#"{"main":{"temp":-3.5,"feels_like":-8.1},"name":"Moscow"}"#,
    )]);

    let reading = client(base_url, 5.0, 0)
        .fetch_current("Rio de Janeiro", "secret", TemperatureUnit::Celsius)
        .unwrap();
    assert_eq!(reading.temperature, -3.5);
    assert_eq!(reading.city, "Rio de Janeiro");

    let request = requests.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(request.starts_with("GET /data/2.5/weather?"), "{request}");
    assert!(request.contains("q=Rio+de+Janeiro"), "{request}");
    assert!(request.contains("appid=secret"), "{request}");
    assert!(request.contains("units=metric"), "{request}");
}

#[test]
fn units_follow_the_requested_scale() {
    let (base_url, requests) = serve(vec![Reply::new("200 OK", r#"{"main":{"temp":75.2}}"#)]);
    client(base_url, 5.0, 0)
        .fetch_current("Dubai", "k", TemperatureUnit::Fahrenheit)
        .unwrap();
    let request = requests.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(request.contains("units=imperial"), "{request}");
}

#[test]
fn error_status_carries_the_body_verbatim() {
    let (base_url, _requests) = serve(vec![Reply::new(
        "401 Unauthorized",
        r#"{"cod":401,"message":"Invalid API key"}"#,
    )]);

    match client(base_url, 5.0, 3).fetch_current("Paris", "bad", TemperatureUnit::Celsius) {
        Err(DashboardError::WeatherApi { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body["message"], "Invalid API key");
        }
        other => panic!("expected WeatherApi error, got {:?}", other),
    }
}

#[test]
fn malformed_body_is_reported() {
    let (base_url, _requests) = serve(vec![Reply::new("200 OK", r#"{"weather":[]}"#)]);
    let err = client(base_url, 5.0, 0)
        .fetch_current("Cairo", "k", TemperatureUnit::Celsius)
        .unwrap_err();
    assert!(matches!(err, DashboardError::MalformedResponse(_)), "{err:?}");
}

#[test]
fn non_json_success_body_is_malformed() {
    let (base_url, _requests) = serve(vec![Reply::new("200 OK", "<html>maintenance</html>")]);
    let err = client(base_url, 5.0, 2)
        .fetch_current("Mumbai", "k", TemperatureUnit::Celsius)
        .unwrap_err();
    assert!(matches!(err, DashboardError::MalformedResponse(_)), "{err:?}");
}

#[test]
fn slow_server_times_out() {
    let (base_url, _requests) = serve(vec![Reply {
        status: "200 OK",
        body: r#"{"main":{"temp":1.0}}"#,
        delay: Duration::from_secs(3),
    }]);
    let err = client(base_url, 0.3, 0)
        .fetch_current("Tokyo", "k", TemperatureUnit::Celsius)
        .unwrap_err();
    assert!(matches!(err, DashboardError::Timeout(_)), "{err:?}");
}

#[test]
fn server_errors_are_retried() {
    let (base_url, requests) = serve(vec![
        Reply::new("503 Service Unavailable", r#"{"message":"busy"}"#),
        Reply::new("200 OK", r#"{"main":{"temp":21.0}}"#),
    ]);
    let reading = client(base_url, 5.0, 1)
        .fetch_current("Sydney", "k", TemperatureUnit::Celsius)
        .unwrap();
    assert_eq!(reading.temperature, 21.0);
    assert_eq!(requests.try_iter().count(), 2);
}
