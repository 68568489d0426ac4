//! MQTT telemetry publisher
//!
//! The match loop only ever calls [`rumqttc::Client::try_publish`], which queues
//! and returns. The network side runs in a blocking task that drives
//! [`rumqttc::Connection`] and reports what it sees through a watch channel.

use std::sync::Arc;
use std::time::Duration;

use rumqttc::{Client, Connection, Event, MqttOptions, Outgoing, Packet, QoS};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{TelemetryBatch, TelemetryError, TelemetrySink, TelemetryValue};
use crate::config::NetworkMode;
use crate::settings::TelemetrySettings;

const CLIENT_ID: &str = "ColorSensorScoreboard";
const REQUEST_CAPACITY: usize = 100;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const MAX_ERROR_MESSAGES: usize = 10;

#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

#[derive(Clone, Debug, Default)]
pub struct TelemetryStatus {
    pub connection_state: ConnectionState,
    pub error_messages: Vec<String>,
    pub messages_sent: usize,
    pub publish_failures: usize,
    pub last_activity: Option<chrono::DateTime<chrono::Local>>,
}

impl TelemetryStatus {
    fn record_error(&mut self, message: String) {
        if self.error_messages.len() >= MAX_ERROR_MESSAGES {
            self.error_messages.remove(0);
        }
        self.error_messages.push(message);
    }
}

/// Broker the telemetry goes to: the robot address for the team in client mode,
/// this machine in server mode
pub fn broker_host(team: u32, mode: NetworkMode) -> String {
    match mode {
        NetworkMode::Client => format!("10.{}.{}.2", team / 100, team % 100),
        NetworkMode::Server => "localhost".to_string(),
    }
}

/// Topic and JSON payload for every entry of a batch
pub fn encode_batch(
    prefix: &str,
    entries: &[(String, TelemetryValue)],
) -> Result<Vec<(String, Vec<u8>)>, TelemetryError> {
    entries
        .iter()
        .map(|(name, value)| Ok((format!("{}/{}", prefix, name), serde_json::to_vec(value)?)))
        .collect()
}

pub struct MqttTelemetry {
    client: Client,
    topic_prefix: String,
    pending: TelemetryBatch,
    status: Arc<watch::Sender<TelemetryStatus>>,
    cancel: CancellationToken,
    _pump: JoinHandle<()>,
}

impl MqttTelemetry {
    /// Creates the client and starts the network pump. Must be called from within
    /// a tokio runtime.
    pub fn connect(host: &str, settings: &TelemetrySettings) -> Self {
        info!(
            "Publishing telemetry to {}:{} under '{}'",
            host, settings.port, settings.topic_prefix
        );
        let mut mqtt_options = MqttOptions::new(CLIENT_ID, host, settings.port);
        mqtt_options.set_keep_alive(Duration::from_secs(5));

        let (client, connection) = Client::new(mqtt_options, REQUEST_CAPACITY);

        let (status_tx, _) = watch::channel(TelemetryStatus {
            connection_state: ConnectionState::Connecting,
            ..Default::default()
        });
        let status = Arc::new(status_tx);
        let cancel = CancellationToken::new();

        let pump = {
            let status = status.clone();
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || run_pump(connection, status, cancel))
        };

        Self {
            client,
            topic_prefix: settings.topic_prefix.clone(),
            pending: TelemetryBatch::default(),
            status,
            cancel,
            _pump: pump,
        }
    }

    pub fn subscribe_status(&self) -> watch::Receiver<TelemetryStatus> {
        self.status.subscribe()
    }
}

fn run_pump(
    mut connection: Connection,
    status: Arc<watch::Sender<TelemetryStatus>>,
    cancel: CancellationToken,
) {
    for notification in connection.iter() {
        if cancel.is_cancelled() {
            break;
        }
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                info!("Telemetry broker connected");
                status.send_modify(|s| {
                    s.connection_state = ConnectionState::Connected;
                    s.last_activity = Some(chrono::Local::now());
                });
            }
            Ok(Event::Outgoing(Outgoing::Publish(_))) => {
                status.send_modify(|s| s.last_activity = Some(chrono::Local::now()));
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => {
                debug!("Telemetry connection closing");
                break;
            }
            Ok(event) => debug!("Telemetry event: {:?}", event),
            Err(e) => {
                warn!("Telemetry connection error: {}", e);
                status.send_modify(|s| {
                    s.connection_state = ConnectionState::Reconnecting;
                    s.record_error(e.to_string());
                });
                std::thread::sleep(RECONNECT_DELAY);
            }
        }
    }
    status.send_modify(|s| s.connection_state = ConnectionState::Disconnected);
    debug!("Telemetry pump stopped");
}

impl TelemetrySink for MqttTelemetry {
    fn put_number_array(&mut self, name: &str, values: &[i64]) {
        self.pending
            .put(name, TelemetryValue::NumberArray(values.to_vec()));
    }

    fn put_number(&mut self, name: &str, value: f64) {
        self.pending.put(name, TelemetryValue::Number(value));
    }

    fn flush(&mut self) -> Result<(), TelemetryError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let entries = self.pending.take();
        let messages = encode_batch(&self.topic_prefix, &entries)?;

        let mut sent = 0;
        let mut result = Ok(());
        for (topic, payload) in messages {
            match self.client.try_publish(topic, QoS::AtMostOnce, false, payload) {
                Ok(()) => sent += 1,
                Err(e) => {
                    // Keep going, the rest of the batch may still fit
                    if result.is_ok() {
                        result = Err(TelemetryError::from(e));
                    }
                }
            }
        }

        let failed = entries.len() - sent;
        self.status.send_modify(|s| {
            s.messages_sent += sent;
            s.publish_failures += failed;
        });
        result
    }
}

impl Drop for MqttTelemetry {
    fn drop(&mut self) {
        self.cancel.cancel();
        // The pump notices the cancellation on its next event
        if let Err(e) = self.client.disconnect() {
            debug!("Telemetry disconnect not queued: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_mode_targets_the_robot() {
        assert_eq!(broker_host(1234, NetworkMode::Client), "10.12.34.2");
        assert_eq!(broker_host(254, NetworkMode::Client), "10.2.54.2");
        assert_eq!(broker_host(7, NetworkMode::Client), "10.0.7.2");
        assert_eq!(broker_host(1234, NetworkMode::Server), "localhost");
    }

    #[test]
    fn batch_entries_become_prefixed_topics() {
        let entries = vec![
            (
                "rawcolor1".to_string(),
                TelemetryValue::NumberArray(vec![10, 20, 30, 5]),
            ),
            ("proximity1".to_string(), TelemetryValue::Number(512.0)),
        ];

        let messages = encode_batch("colorsensor", &entries).unwrap();
        assert_eq!(messages[0].0, "colorsensor/rawcolor1");
        assert_eq!(messages[0].1, b"[10,20,30,5]".to_vec());
        assert_eq!(messages[1].0, "colorsensor/proximity1");
    }

    #[test]
    fn error_log_is_bounded() {
        let mut status = TelemetryStatus::default();
        for i in 0..(MAX_ERROR_MESSAGES + 3) {
            status.record_error(format!("error {}", i));
        }
        assert_eq!(status.error_messages.len(), MAX_ERROR_MESSAGES);
        assert_eq!(status.error_messages[0], "error 3");
    }
}
