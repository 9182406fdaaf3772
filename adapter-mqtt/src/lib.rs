use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use homegraph_core::bus::{Bus, Message, MessageStream, filtered_stream};
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct MqttBus {
    client: AsyncClient,
    tx: Arc<broadcast::Sender<Message>>,
}

impl MqttBus {
    /// Connects to the broker and forwards every publish matching `topic_filter`.
    pub async fn connect(
        host: &str,
        port: u16,
        client_id: &str,
        topic_filter: &str,
    ) -> Result<Self> {
        let mut opts = MqttOptions::new(client_id, host, port);
        opts.set_keep_alive(Duration::from_secs(5));
        opts.set_clean_session(true);

        let (client, mut eventloop) = AsyncClient::new(opts, 10);
        client
            .subscribe(topic_filter, QoS::AtLeastOnce)
            .await
            .with_context(|| format!("subscribe mqtt filter {topic_filter}"))?;

        let (tx, _rx) = broadcast::channel(1024);
        let tx = Arc::new(tx);
        let forwarder_tx = Arc::clone(&tx);

        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::Publish(p))) => {
                        let _ = forwarder_tx.send(Message {
                            topic: p.topic,
                            payload: p.payload,
                            received_at: Utc::now(),
                        });
                    }
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        tracing::info!("mqtt connected");
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("mqtt event loop error: {e}");
                        tokio::time::sleep(Duration::from_millis(200)).await;
                    }
                }
            }
        });

        Ok(Self { client, tx })
    }
}

#[async_trait]
impl Bus for MqttBus {
    async fn publish(&self, topic: &str, payload: Bytes) -> Result<()> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .context("publish mqtt message")?;
        Ok(())
    }

    async fn subscribe(&self, pattern: &str) -> Result<MessageStream> {
        Ok(filtered_stream(self.tx.subscribe(), pattern))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{io::ErrorKind, net::TcpListener, process::{Child, Command, Stdio}};
    use tokio::time::{sleep, timeout, Duration};
    use tokio_stream::StreamExt;

    struct MosquittoGuard(Child);

    impl Drop for MosquittoGuard {
        fn drop(&mut self) {
            let _ = self.0.kill();
        }
    }

    async fn start_broker() -> Result<(MosquittoGuard, u16)> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        drop(listener);

        let child = Command::new("mosquitto")
            .args(["-p", &port.to_string()])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .context("spawn mosquitto")?;

        let guard = MosquittoGuard(child);
        let mut attempts = 0;
        loop {
            match tokio::net::TcpStream::connect(("127.0.0.1", port)).await {
                Ok(_) => break,
                Err(_) if attempts < 20 => {
                    attempts += 1;
                    sleep(Duration::from_millis(50)).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok((guard, port))
    }

    fn broker_missing(e: &anyhow::Error) -> bool {
        e.downcast_ref::<std::io::Error>().map(|io| io.kind()) == Some(ErrorKind::NotFound)
    }

    #[tokio::test]
    async fn state_payloads_reach_subscribers() -> Result<()> {
        let (_guard, port) = match start_broker().await {
            Ok(ok) => ok,
            Err(e) if broker_missing(&e) => {
                eprintln!("skipping state_payloads_reach_subscribers: mosquitto not installed");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let bus = MqttBus::connect("127.0.0.1", port, "homegraph-test", "#").await?;
        sleep(Duration::from_millis(100)).await;

        let mut stream = bus.subscribe("kitchen/light/state").await?;
        bus.publish("kitchen/light/state", Bytes::from_static(b"true")).await?;

        let msg = timeout(Duration::from_secs(5), stream.next()).await?.expect("message expected");
        assert_eq!(msg.topic, "kitchen/light/state");
        assert_eq!(msg.payload, Bytes::from_static(b"true"));
        Ok(())
    }

    #[tokio::test]
    async fn wildcard_subscription_filters_topics() -> Result<()> {
        let (_guard, port) = match start_broker().await {
            Ok(ok) => ok,
            Err(e) if broker_missing(&e) => {
                eprintln!("skipping wildcard_subscription_filters_topics: mosquitto not installed");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let bus = MqttBus::connect("127.0.0.1", port, "homegraph-filter", "#").await?;
        sleep(Duration::from_millis(100)).await;

        let mut stream = bus.subscribe("sensors/+/temperature").await?;
        bus.publish("switches/porch/state", Bytes::from_static(b"on")).await?;
        bus.publish("sensors/hall/temperature", Bytes::from_static(b"20.5")).await?;

        let msg = timeout(Duration::from_secs(5), stream.next()).await?.expect("filtered message");
        assert_eq!(msg.topic, "sensors/hall/temperature");
        assert_eq!(msg.payload, Bytes::from_static(b"20.5"));
        Ok(())
    }
}
