//! Transport selection for the broker connection.

use native_tls::TlsConnector;
use rumqttc::{TlsConfiguration, Transport};

use super::broker::BrokerError;

/// TLS connection options.
///
/// The broker host doubles as the domain presented during the handshake.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TlsOptions {
    /// Skip certificate validation when true (intended for tests).
    pub insecure_skip_verify: bool,
}

impl TlsOptions {
    fn connector(&self) -> Result<TlsConnector, BrokerError> {
        let mut builder = TlsConnector::builder();
        if self.insecure_skip_verify {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        builder
            .build()
            .map_err(|err| BrokerError::Tls(err.to_string()))
    }
}

/// Build the `rumqttc` transport for the optional TLS configuration.
pub fn broker_transport(tls: Option<&TlsOptions>) -> Result<Transport, BrokerError> {
    match tls {
        None => Ok(Transport::tcp()),
        Some(options) => {
            let connector = options.connector()?;
            Ok(Transport::tls_with_config(TlsConfiguration::NativeConnector(
                connector,
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_transport_without_tls() {
        let transport = broker_transport(None).expect("tcp transport");
        assert!(matches!(transport, Transport::Tcp));
    }

    #[test]
    fn tls_transport_when_configured() {
        let options = TlsOptions {
            insecure_skip_verify: true,
        };
        let transport = broker_transport(Some(&options)).expect("tls transport");
        assert!(matches!(transport, Transport::Tls(_)));
    }
}
