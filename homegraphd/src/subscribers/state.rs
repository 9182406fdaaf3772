use crate::state::AppState;
use anyhow::Result;
use chrono::Utc;
use metrics::{counter, histogram};
use tokio_stream::StreamExt;

/// Records every bus message matching `pattern` into the state cache used by QUERY.
pub async fn spawn(app: AppState, pattern: &str) -> Result<()> {
    let mut stream = app.bus.subscribe(pattern).await?;
    tracing::info!(pattern, "state subscriber listening");
    tokio::spawn(async move {
        while let Some(msg) = stream.next().await {
            let latency_ms = (Utc::now() - msg.received_at).num_milliseconds();
            histogram!("bus.message.latency_ms").record(latency_ms as f64);
            if std::str::from_utf8(&msg.payload).is_err() {
                counter!("bus.message.decode_error").increment(1);
                tracing::warn!(topic = %msg.topic, "state payload is not utf-8");
            }
            app.states.record(&msg).await;
            counter!("bus.message.recorded").increment(1);
        }
        tracing::warn!("state subscriber stream ended");
    });
    Ok(())
}
