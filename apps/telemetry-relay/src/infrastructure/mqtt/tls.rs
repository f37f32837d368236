//! Broker session options.

use rumqttc::{MqttOptions, Transport};

use crate::infrastructure::config::{BrokerSettings, TlsMaterial};

/// Mutual-TLS transport from PEM material.
#[must_use]
pub fn transport(tls: &TlsMaterial) -> Transport {
    Transport::tls(
        tls.ca().to_vec(),
        Some((tls.client_cert().to_vec(), tls.client_key().to_vec())),
        None,
    )
}

/// MQTT options for the configured broker.
#[must_use]
pub fn mqtt_options(settings: &BrokerSettings) -> MqttOptions {
    let mut options = MqttOptions::new(&settings.client_id, &settings.host, settings.port);
    options.set_keep_alive(settings.keep_alive);
    options.set_clean_session(true);
    options.set_transport(transport(&settings.tls));
    options
}
