use std::io;
use std::sync::{Arc, Mutex};

use ev_sql_gateway::prelude::*;
use ev_sql_gateway::test_utils::ScriptedManager;

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Captured {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_logs() -> (Captured, tracing::subscriber::DefaultGuard) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (captured, guard)
}

#[tokio::test]
async fn latency_is_logged_with_query_text() -> Result<(), Box<dyn std::error::Error>> {
    let (captured, _guard) = capture_logs();
    let script = ScriptedManager::new();
    let gateway = script.gateway(10, true)?;

    let q = sql!("SELECT * FROM Plugs WHERE StationId = {}", 3)?;
    gateway.execute(&q, None).await?;

    let logs = captured.text();
    assert!(logs.contains("Query took"), "logs: {logs}");
    assert!(logs.contains("ms: SELECT * FROM Plugs WHERE StationId = ?"), "logs: {logs}");
    assert!(logs.contains("duration_ms="), "logs: {logs}");
    Ok(())
}

#[tokio::test]
async fn failed_queries_are_logged_too() -> Result<(), Box<dyn std::error::Error>> {
    let (captured, _guard) = capture_logs();
    let script = ScriptedManager::new();
    let gateway = script.gateway(10, true)?;

    script.push_error("syntax error");
    assert!(gateway.execute(&"SELEC 1".into(), None).await.is_err());

    let logs = captured.text();
    assert!(logs.contains("ms: SELEC 1"), "logs: {logs}");
    assert!(logs.contains("ok=false"), "logs: {logs}");
    Ok(())
}

#[tokio::test]
async fn nothing_is_logged_when_disabled() -> Result<(), Box<dyn std::error::Error>> {
    let (captured, _guard) = capture_logs();
    let script = ScriptedManager::new();
    let gateway = script.gateway(10, false)?;

    gateway.execute(&"SELECT 1".into(), None).await?;

    assert!(!captured.text().contains("Query took"));
    Ok(())
}
