//! ESP-IDF MQTT client behind [`BrokerTransport`].
//!
//! The client runs on its own ESP-IDF task.  Its event callback only flips
//! the `connected` flag and posts received messages into the
//! [`InboundMailbox`]; everything else happens on the control loop.
//! Once created, the client reconnects by itself, so `connect` on an
//! existing client is a no-op.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use esp_idf_svc::mqtt::client::{
    EspMqttClient, EspMqttEvent, EventPayload, MqttClientConfiguration, QoS,
};
use log::{info, warn};

use super::transport::{BrokerTransport, InboundMailbox, InboundMessage};
use crate::error::CommsError;

pub struct EspMqttTransport {
    client: Option<EspMqttClient<'static>>,
    connected: Arc<AtomicBool>,
    mailbox: InboundMailbox,
}

impl Default for EspMqttTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl EspMqttTransport {
    pub fn new() -> Self {
        Self {
            client: None,
            connected: Arc::new(AtomicBool::new(false)),
            mailbox: InboundMailbox::new(),
        }
    }
}

impl BrokerTransport for EspMqttTransport {
    fn connect(&mut self, client_id: &str, host: &str, port: u16) -> Result<(), CommsError> {
        if self.client.is_some() {
            return Ok(());
        }
        let url = format!("mqtt://{}:{}", host, port);
        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            ..Default::default()
        };
        let connected = Arc::clone(&self.connected);
        let mailbox = self.mailbox.clone();
        let client = EspMqttClient::new_cb(&url, &conf, move |event: EspMqttEvent<'_>| {
            match event.payload() {
                EventPayload::Connected(_) => connected.store(true, Ordering::Release),
                EventPayload::Disconnected => connected.store(false, Ordering::Release),
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    ..
                } => match InboundMessage::new(topic, data) {
                    Some(message) => {
                        mailbox.post(message);
                    }
                    None => warn!("MQTT: oversized message on {}", topic),
                },
                EventPayload::Error(e) => warn!("MQTT: {:?}", e),
                _ => {}
            }
        })
        .map_err(|e| {
            warn!("MQTT: client start failed: {}", e);
            CommsError::BrokerConnectFailed
        })?;
        info!("MQTT: client started for {}", url);
        self.client = Some(client);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.client.is_some() && self.connected.load(Ordering::Acquire)
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), CommsError> {
        let client = self.client.as_mut().ok_or(CommsError::NotConnected)?;
        client
            .subscribe(topic, QoS::AtMostOnce)
            .map(|_| ())
            .map_err(|_| CommsError::SubscribeFailed)
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), CommsError> {
        let client = self.client.as_mut().ok_or(CommsError::NotConnected)?;
        client
            .enqueue(topic, QoS::AtMostOnce, false, payload)
            .map(|_| ())
            .map_err(|_| CommsError::PublishFailed)
    }

    fn disconnect(&mut self) {
        // Dropping the client stops its task.
        self.client = None;
        self.connected.store(false, Ordering::Release);
        while self.mailbox.take().is_some() {}
    }

    fn poll_inbound(&mut self) -> Option<InboundMessage> {
        self.mailbox.take()
    }
}
