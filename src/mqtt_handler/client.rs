//! `rumqttc`-backed [`BrokerClient`].

use std::{sync::Arc, thread};

use crossbeam_channel::{Sender, bounded, unbounded};
use log::debug;
use rumqttc::{Client, MqttOptions, QoS};

use super::{
    broker::{BrokerClient, BrokerConnector, BrokerError, EventListener},
    config::BrokerParams,
    transport::broker_transport,
    worker::{BrokerCommand, WorkerShared, run_event_loop},
};

/// A single MQTT connection shared by the publisher, the watchdog and
/// shutdown.
pub struct MqttBroker {
    client: Client,
    control: Sender<BrokerCommand>,
    shared: Arc<WorkerShared>,
    qos: QoS,
}

fn qos_from(level: u8) -> Result<QoS, BrokerError> {
    match level {
        0 => Ok(QoS::AtMostOnce),
        1 => Ok(QoS::AtLeastOnce),
        2 => Ok(QoS::ExactlyOnce),
        other => Err(BrokerError::Client(format!("invalid qos {other}"))),
    }
}

fn mqtt_options(params: &BrokerParams) -> Result<MqttOptions, BrokerError> {
    let mut options = MqttOptions::new(&params.client_id, &params.host, params.port);
    options.set_keep_alive(params.keep_alive);
    options.set_clean_session(params.clean_session);
    if let Some(credentials) = &params.credentials {
        options.set_credentials(&credentials.username, &credentials.password);
    }
    options.set_transport(broker_transport(params.tls.as_ref())?);
    Ok(options)
}

impl MqttBroker {
    /// Start the client and its worker thread. Connection happens in the
    /// background; `listener` hears about the outcome.
    pub fn connect(params: BrokerParams, listener: EventListener) -> Result<Self, BrokerError> {
        let qos = qos_from(params.qos)?;
        let options = mqtt_options(&params)?;
        let (client, connection) = Client::new(options, params.capacity);
        let (control, control_rx) = unbounded();
        let shared = Arc::new(WorkerShared::default());
        let worker_shared = Arc::clone(&shared);
        let backoff = params.backoff;
        thread::Builder::new()
            .name("femto-mqtt-broker".into())
            .spawn(move || run_event_loop(connection, control_rx, listener, worker_shared, backoff))
            .map_err(|err| BrokerError::Client(format!("failed to spawn worker: {err}")))?;
        Ok(Self {
            client,
            control,
            shared,
            qos,
        })
    }
}

impl BrokerClient for MqttBroker {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BrokerError> {
        if self.shared.is_closing() || self.shared.has_exited() {
            return Err(BrokerError::Closed);
        }
        self.client
            .try_publish(topic, self.qos, false, payload)
            .map_err(|_| {
                if self.shared.has_exited() {
                    BrokerError::Closed
                } else {
                    BrokerError::QueueFull
                }
            })
    }

    fn reconnect(&self) {
        let _ = self.control.send(BrokerCommand::Reconnect);
    }

    fn end(&self, done: Sender<()>) {
        if !self.shared.begin_close(done) {
            return;
        }
        if let Err(err) = self.client.try_disconnect() {
            debug!("FemtoMqttHandler could not queue disconnect: {err}");
        }
        let _ = self.control.send(BrokerCommand::Shutdown);
    }
}

impl BrokerConnector for BrokerParams {
    type Client = MqttBroker;

    fn connect(self, listener: EventListener) -> Result<MqttBroker, BrokerError> {
        MqttBroker::connect(self, listener)
    }
}

impl Drop for MqttBroker {
    fn drop(&mut self) {
        // Release the worker if nobody shut us down explicitly. The worker
        // exits on its own once the client handle is gone.
        let (done, _) = bounded(1);
        self.end(done);
    }
}

impl std::fmt::Debug for MqttBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MqttBroker")
            .field("qos", &self.qos)
            .field("closing", &self.shared.is_closing())
            .finish()
    }
}
