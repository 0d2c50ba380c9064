//! Bill updates against a scripted local backend.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use bizdesk_lib::BizdeskClient;
use bizdesk_lib::retry::RetryConfig;
use bizdesk_lib::services::bills::BillLine;
use bizdesk_lib::services::bills::BillPatch;
use serde_json::Value;
use serde_json::json;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::net::TcpStream;

const BILL_ID: &str = "00000000-0000-0000-0000-0000000000b1";

#[derive(Debug, Clone)]
struct Seen {
    method: String,
    path: String,
    body: String,
}

type Log = Arc<Mutex<Vec<Seen>>>;

/// Answers each connection with the next scripted response, in order.
async fn spawn_backend(script: Vec<(u16, Value)>) -> (String, Log) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let log: Log = Arc::default();
    let seen = log.clone();

    tokio::spawn(async move {
        let mut script: VecDeque<_> = script.into();
        while let Some((status, body)) = script.pop_front() {
            let Ok((mut socket, _peer)) = listener.accept().await else {
                return;
            };
            if let Some(request) = read_request(&mut socket).await {
                seen.lock().unwrap().push(request);
            }

            let body = if status == 204 { String::new() } else { body.to_string() };
            let response = format!(
                "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nConnection: close\r\nContent-Length: {}\r\n\r\n{body}",
                reason(status),
                body.len(),
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{addr}"), log)
}

async fn read_request(socket: &mut TcpStream) -> Option<Seen> {
    let mut buf = [0u8; 4096];
    let mut raw = Vec::new();
    let header_end = loop {
        let n = socket.read(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while raw.len() < header_end + content_length {
        let n = socket.read(&mut buf).await.ok()?;
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);
    }

    let mut request_line = head.lines().next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?;
    let path = target.split('?').next().unwrap_or(target).to_string();
    let body = String::from_utf8_lossy(&raw[header_end..]).to_string();
    Some(Seen { method, path, body })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        _ => "Status",
    }
}

fn client(url: &str) -> BizdeskClient {
    BizdeskClient::builder()
        .url(url)
        .api_key("anon")
        .retry(RetryConfig::no_retry())
        .build()
        .unwrap()
}

fn bill() -> Value {
    json!({
        "id": BILL_ID,
        "bill_number": "B-1",
        "vendor_name": "Paper Co",
        "issue_date": "2024-04-01",
        "status": "pending",
        "subtotal": "9.99",
        "tax_rate": "0",
        "tax_amount": "0",
        "discount_amount": "0",
        "total_amount": "9.99",
        "amount_paid": "0",
        "balance_due": "9.99"
    })
}

fn item(id: &str, description: &str, amount: &str) -> Value {
    json!({
        "id": id,
        "bill_id": BILL_ID,
        "description": description,
        "quantity": "1",
        "unit_price": amount,
        "amount": amount
    })
}

fn calls(log: &Log) -> Vec<(String, String)> {
    log.lock()
        .unwrap()
        .iter()
        .map(|seen| (seen.method.clone(), seen.path.clone()))
        .collect()
}

fn call(method: &str, table: &str) -> (String, String) {
    (method.to_string(), format!("/rest/v1/{table}"))
}

#[tokio::test]
async fn test_failed_totals_write_restores_items() {
    let old = item("00000000-0000-0000-0000-0000000000c1", "Toner", "9.99");
    let new = item("00000000-0000-0000-0000-0000000000c2", "Paper", "25.00");
    let (url, log) = spawn_backend(vec![
        (200, json!([bill()])),
        (200, json!([old.clone()])),
        (204, Value::Null),
        (201, json!([new])),
        (400, json!({ "message": "permission denied for table bills", "code": "42501" })),
        (204, Value::Null),
        (201, json!([old])),
    ])
    .await;

    let patch = BillPatch {
        lines: Some(vec![BillLine::new("Paper", "1".parse().unwrap(), "25".parse().unwrap())]),
        ..BillPatch::default()
    };
    let result = client(&url).bills().update(BILL_ID.parse().unwrap(), &patch).await;

    assert!(result.is_err());
    assert_eq!(
        calls(&log),
        [
            call("GET", "bills"),
            call("GET", "bill_items"),
            call("DELETE", "bill_items"),
            call("POST", "bill_items"),
            call("PATCH", "bills"),
            call("DELETE", "bill_items"),
            call("POST", "bill_items"),
        ]
    );

    let restored: Value = serde_json::from_str(&log.lock().unwrap()[6].body).unwrap();
    assert_eq!(restored[0]["description"], "Toner");
    assert_eq!(restored[0]["bill_id"], BILL_ID);
}

#[tokio::test]
async fn test_update_without_lines_leaves_items_alone() {
    let old = item("00000000-0000-0000-0000-0000000000c1", "Toner", "9.99");
    let (url, log) = spawn_backend(vec![
        (200, json!([bill()])),
        (200, json!([old])),
        (400, json!({ "message": "permission denied for table bills", "code": "42501" })),
    ])
    .await;

    let patch = BillPatch {
        vendor_name: Some("Ink Ltd".into()),
        ..BillPatch::default()
    };
    let result = client(&url).bills().update(BILL_ID.parse().unwrap(), &patch).await;

    assert!(result.is_err());
    assert_eq!(
        calls(&log),
        [call("GET", "bills"), call("GET", "bill_items"), call("PATCH", "bills")]
    );
}

#[tokio::test]
async fn test_overflowing_lines_are_rejected_before_any_write() {
    let old = item("00000000-0000-0000-0000-0000000000c1", "Toner", "9.99");
    let (url, log) = spawn_backend(vec![(200, json!([bill()])), (200, json!([old]))]).await;

    let huge = "100000000000000000".parse().unwrap();
    let patch = BillPatch {
        lines: Some(vec![BillLine::new("Bulk", huge, huge)]),
        ..BillPatch::default()
    };
    let err = client(&url)
        .bills()
        .update(BILL_ID.parse().unwrap(), &patch)
        .await
        .unwrap_err();

    assert!(matches!(err, bizdesk_lib::Error::Validation(_)));
    assert_eq!(calls(&log), [call("GET", "bills"), call("GET", "bill_items")]);
}
