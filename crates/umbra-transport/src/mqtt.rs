//! rumqttc-backed transport.
//!
//! `connect` drives the event loop to CONNACK under a bounded timeout,
//! then hands the loop to a pump task that classifies inbound publishes
//! into `TransportEvent`s. A poll error is reported as `ConnectionLost`
//! exactly once; the supervisor's reconnect loop — not this module — is
//! the retry mechanism.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::sync::{Notify, mpsc};

use umbra_protocol::topics;

use crate::config::MqttConfig;
use crate::connection::{ConnectOptions, Connection, RetryPolicy, SessionLink, Transport};
use crate::error::{TransportError, TransportResult};
use crate::events::{TransportEvent, classify};
use crate::tls;

/// Capacity of the rumqttc request queue and the inbound event channel.
const CHANNEL_CAPACITY: usize = 64;

/// MQTT transport connected to the shadow service.
pub struct MqttTransport {
    config: MqttConfig,
}

impl MqttTransport {
    pub fn new(config: MqttConfig) -> Self {
        Self { config }
    }

    fn build_options(&self, opts: &ConnectOptions) -> TransportResult<MqttOptions> {
        let mut options = MqttOptions::new(
            &opts.client_id,
            &self.config.broker_host,
            self.config.broker_port,
        );
        options.set_keep_alive(opts.keep_alive);
        options.set_clean_session(opts.clean_session);

        if let Some(will) = &opts.will {
            options.set_last_will(rumqttc::LastWill::new(
                &will.topic,
                will.payload.clone(),
                QoS::AtLeastOnce,
                false,
            ));
        }

        if self.config.use_tls {
            options.set_transport(tls::load_tls_transport(&self.config)?);
        }

        Ok(options)
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn connect(&self, opts: &ConnectOptions) -> TransportResult<SessionLink> {
        let options = self.build_options(opts)?;
        let (client, mut eventloop) = AsyncClient::new(options, CHANNEL_CAPACITY);

        // Drive the loop until the broker acknowledges the session;
        // rumqttc connects lazily on first poll.
        let connect_timeout = Duration::from_secs(self.config.connect_timeout_secs);
        tokio::time::timeout(connect_timeout, await_connack(&mut eventloop))
            .await
            .map_err(|_| {
                TransportError::Connect(format!("no CONNACK within {connect_timeout:?}"))
            })??;

        tracing::info!(client_id = %opts.client_id, "MQTT session established");

        let (event_tx, event_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let stop = Arc::new(Notify::new());
        let pump_stop = stop.clone();
        tokio::spawn(async move {
            pump(eventloop, event_tx, pump_stop).await;
        });

        Ok(SessionLink {
            connection: Arc::new(MqttConnection { client, stop }),
            events: event_rx,
        })
    }
}

async fn await_connack(eventloop: &mut EventLoop) -> TransportResult<()> {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
            Ok(_) => {}
            Err(e) => return Err(TransportError::Connect(e.to_string())),
        }
    }
}

/// Forward inbound publishes as events until the connection dies or the
/// session is closed.
async fn pump(
    mut eventloop: EventLoop,
    events: mpsc::Sender<TransportEvent>,
    stop: Arc<Notify>,
) {
    loop {
        tokio::select! {
            _ = stop.notified() => break,
            polled = eventloop.poll() => match polled {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    match classify(&publish.topic, &publish.payload) {
                        Some(event) => {
                            if events.send(event).await.is_err() {
                                break;
                            }
                        }
                        None => {
                            tracing::debug!(topic = %publish.topic, "ignoring unrecognized message");
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(error = %e, "MQTT event loop error");
                    let _ = events
                        .send(TransportEvent::ConnectionLost(e.to_string()))
                        .await;
                    break;
                }
            }
        }
    }
}

/// One live rumqttc session.
pub struct MqttConnection {
    client: AsyncClient,
    stop: Arc<Notify>,
}

#[async_trait]
impl Connection for MqttConnection {
    async fn update_shadow(
        &self,
        thing_name: &str,
        document: &[u8],
        keep_subscriptions: bool,
        timeout: Duration,
    ) -> TransportResult<()> {
        // Delta/documents subscriptions are session-scoped; the flag is
        // accepted for callers that toggle it per update.
        let _ = keep_subscriptions;
        let topic = topics::shadow_update(thing_name);
        tokio::time::timeout(
            timeout,
            self.client
                .publish(topic, QoS::AtLeastOnce, false, document.to_vec()),
        )
        .await
        .map_err(|_| TransportError::Timeout(timeout))?
        .map_err(|e| TransportError::Connection(e.to_string()))
    }

    async fn delete_shadow(&self, thing_name: &str, timeout: Duration) -> TransportResult<()> {
        let topic = topics::shadow_delete(thing_name);
        tokio::time::timeout(
            timeout,
            self.client
                .publish(topic, QoS::AtLeastOnce, false, Vec::<u8>::new()),
        )
        .await
        .map_err(|_| TransportError::Timeout(timeout))?
        .map_err(|e| TransportError::Connection(e.to_string()))
    }

    async fn subscribe_delta(&self, thing_name: &str) -> TransportResult<()> {
        self.client
            .subscribe(topics::shadow_delta(thing_name), QoS::AtLeastOnce)
            .await
            .map_err(|e| TransportError::Subscribe(e.to_string()))
    }

    async fn subscribe_updated(&self, thing_name: &str) -> TransportResult<()> {
        self.client
            .subscribe(topics::shadow_documents(thing_name), QoS::AtLeastOnce)
            .await
            .map_err(|e| TransportError::Subscribe(e.to_string()))
    }

    async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retry: RetryPolicy,
    ) -> TransportResult<()> {
        let mut attempts = 0;
        loop {
            match self
                .client
                .publish(topic, qos, false, payload.to_vec())
                .await
            {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempts += 1;
                    if attempts > retry.limit {
                        return Err(TransportError::Publish(format!(
                            "{e} (gave up after {attempts} attempts)"
                        )));
                    }
                    tracing::warn!(error = %e, attempts, topic, "publish failed, retrying");
                    tokio::time::sleep(retry.interval).await;
                }
            }
        }
    }

    async fn disconnect(&self) -> TransportResult<()> {
        self.stop.notify_one();
        self.client
            .disconnect()
            .await
            .map_err(|e| TransportError::Connection(e.to_string()))
    }
}
