// # MQTT Publisher
//
// This crate delivers pubip message batches to an MQTT broker.
//
// ## Session model
//
// Every batch gets its own session:
//
// 1. Connect with the configured client id and username/password
// 2. Publish each message with QoS 0 and its retain flag, in order
// 3. Disconnect
//
// There is no retry, no reconnect and no session reuse. A failure
// anywhere in the session fails the whole batch; the caller decides
// whether that matters.

use pubip_core::config::MqttConfig;
use pubip_core::message::{PublishBatch, QoS};
use pubip_core::traits::Publisher;
use pubip_core::{Error, Result};

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet};
use tracing::debug;

/// Keep-alive announced to the broker
const DEFAULT_KEEP_ALIVE: Duration = Duration::from_secs(60);

/// Bound on one complete connect → publish → disconnect session
const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// MQTT publisher (one connection per batch)
pub struct MqttPublisher {
    /// Broker host
    host: String,

    /// Broker port
    port: u16,

    /// Client identifier
    client_id: String,

    /// Username
    user: String,

    /// Password (never logged)
    password: String,

    /// Keep-alive interval
    keep_alive: Duration,

    /// Bound on a whole session
    session_timeout: Duration,
}

impl MqttPublisher {
    /// Create a new publisher from the broker settings
    pub fn new(config: &MqttConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            client_id: config.client_id.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            keep_alive: DEFAULT_KEEP_ALIVE,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
        }
    }

    /// Override the bound on one session
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Build the client options for a fresh session
    pub fn mqtt_options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(&self.client_id, &self.host, self.port);
        options.set_credentials(&self.user, &self.password);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        options
    }

    fn broker(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Queue the batch and a disconnect, then run the session to completion
    async fn session(&self, batch: &PublishBatch) -> Result<usize> {
        // Room for every publish plus the disconnect, so queueing never
        // waits on the event loop
        let (client, mut eventloop) = AsyncClient::new(self.mqtt_options(), batch.len() + 1);

        for message in &batch.messages {
            client
                .publish(
                    message.topic.as_str(),
                    to_rumqttc(message.qos),
                    message.retain,
                    message.payload.as_bytes().to_vec(),
                )
                .await
                .map_err(|e| {
                    Error::publish(format!("failed to queue publish to '{}': {}", message.topic, e))
                })?;
        }

        client
            .disconnect()
            .await
            .map_err(|e| Error::publish(format!("failed to queue disconnect: {}", e)))?;

        drive(&mut eventloop, &self.broker()).await
    }
}

#[async_trait::async_trait]
impl Publisher for MqttPublisher {
    async fn publish_batch(&self, batch: &PublishBatch) -> Result<()> {
        debug!(
            broker = %self.broker(),
            client_id = %self.client_id,
            kind = %batch.kind,
            "Opening MQTT session"
        );

        let published = tokio::time::timeout(self.session_timeout, self.session(batch))
            .await
            .map_err(|_| {
                Error::publish(format!(
                    "session with {} did not complete within {:?}",
                    self.broker(),
                    self.session_timeout
                ))
            })??;

        debug!(kind = %batch.kind, published, "MQTT session closed");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mqtt"
    }
}

/// Poll the event loop until our disconnect has been written
///
/// Returns the number of publishes written to the socket.
async fn drive(eventloop: &mut EventLoop, broker: &str) -> Result<usize> {
    let mut published = 0;

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                debug!(code = ?ack.code, "Connected to {}", broker);
            }
            Ok(Event::Outgoing(Outgoing::Publish(_))) => {
                published += 1;
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                return Ok(published);
            }
            Ok(_) => {}
            Err(e) => {
                return Err(Error::publish(format!(
                    "connection to {} failed: {} ({:?})",
                    broker, e, e
                )));
            }
        }
    }
}

fn to_rumqttc(qos: QoS) -> rumqttc::QoS {
    match qos {
        QoS::AtMostOnce => rumqttc::QoS::AtMostOnce,
    }
}
