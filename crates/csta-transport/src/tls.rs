//! TLS settings for the secure CSTA port.
//!
//! Certificate checking is governed by a caller-supplied
//! [`CertificatePolicy`]. Lab switches commonly present certificates issued
//! for a different host name, so [`CertificatePolicy::AllowNameMismatch`]
//! accepts a chain that only fails the name check.

use std::io::{self, BufReader};
use std::sync::Arc;

use tokio_rustls::rustls::client::WebPkiServerVerifier;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::crypto::{self, CryptoProvider};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{
    self, CertificateError, DigitallySignedStruct, RootCertStore,
    SignatureScheme,
};
use tokio_rustls::{TlsAcceptor, TlsConnector};

/// How a client judges the server's certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CertificatePolicy {
    /// Full chain and host name verification.
    #[default]
    Verify,
    /// Full chain verification, but a host name mismatch is tolerated.
    AllowNameMismatch,
    /// Any certificate is accepted. Only for test rigs.
    AcceptAny,
}

/// Client-side TLS settings.
#[derive(Debug, Clone, Default)]
pub struct TlsClientConfig {
    /// Trusted CA certificates, PEM encoded.
    pub ca_certs: Option<Vec<u8>>,
    /// Certificate acceptance policy.
    pub policy: CertificatePolicy,
}

/// Server-side TLS settings.
#[derive(Debug, Clone)]
pub struct TlsServerConfig {
    /// Certificate chain, PEM encoded.
    pub cert: Vec<u8>,
    /// Private key, PEM encoded (PKCS#8, PKCS#1 or SEC1).
    pub key: Vec<u8>,
}

/// Errors building a TLS connector or acceptor.
#[derive(Debug, thiserror::Error)]
pub enum TlsSetupError {
    /// The PEM input could not be parsed.
    #[error("invalid PEM data: {0}")]
    Pem(#[source] io::Error),

    /// The key PEM held no private key.
    #[error("no private key found in PEM data")]
    MissingKey,

    /// Verification was requested without any trusted certificate.
    #[error("certificate verification needs at least one trusted CA certificate")]
    NoTrustAnchors,

    /// The host cannot be used as a TLS server name.
    #[error("invalid TLS server name {0:?}")]
    InvalidServerName(String),

    /// The verifier could not be constructed.
    #[error("certificate verifier setup failed: {0}")]
    Verifier(String),

    /// rustls rejected the configuration.
    #[error(transparent)]
    Rustls(#[from] rustls::Error),
}

impl TlsClientConfig {
    /// Builds a connector that applies this configuration's policy.
    pub fn connector(&self) -> Result<TlsConnector, TlsSetupError> {
        let provider = provider();
        let verifier = PolicyVerifier::new(self, Arc::clone(&provider))?;
        let config = rustls::ClientConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier))
            .with_no_client_auth();
        Ok(TlsConnector::from(Arc::new(config)))
    }
}

impl TlsServerConfig {
    /// Builds an acceptor from the PEM certificate chain and key.
    pub fn acceptor(&self) -> Result<TlsAcceptor, TlsSetupError> {
        let certs = parse_certs(&self.cert)?;
        let mut reader = BufReader::new(self.key.as_slice());
        let key = rustls_pemfile::private_key(&mut reader)
            .map_err(TlsSetupError::Pem)?
            .ok_or(TlsSetupError::MissingKey)?;

        let config = rustls::ServerConfig::builder_with_provider(provider())
            .with_safe_default_protocol_versions()?
            .with_no_client_auth()
            .with_single_cert(certs, key)?;
        Ok(TlsAcceptor::from(Arc::new(config)))
    }
}

/// Converts a host string into the name presented during the handshake.
pub(crate) fn server_name(host: &str) -> Result<ServerName<'static>, TlsSetupError> {
    ServerName::try_from(host.to_string())
        .map_err(|_| TlsSetupError::InvalidServerName(host.to_string()))
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(crypto::ring::default_provider())
}

fn parse_certs(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, TlsSetupError> {
    rustls_pemfile::certs(&mut BufReader::new(pem))
        .collect::<Result<Vec<_>, _>>()
        .map_err(TlsSetupError::Pem)
}

fn is_name_mismatch(err: &CertificateError) -> bool {
    matches!(
        err,
        CertificateError::NotValidForName | CertificateError::NotValidForNameContext { .. }
    )
}

#[derive(Debug)]
struct PolicyVerifier {
    policy: CertificatePolicy,
    webpki: Option<Arc<WebPkiServerVerifier>>,
    provider: Arc<CryptoProvider>,
}

impl PolicyVerifier {
    fn new(
        config: &TlsClientConfig,
        provider: Arc<CryptoProvider>,
    ) -> Result<Self, TlsSetupError> {
        let webpki = match config.policy {
            CertificatePolicy::AcceptAny => None,
            CertificatePolicy::Verify | CertificatePolicy::AllowNameMismatch => {
                let mut roots = RootCertStore::empty();
                if let Some(pem) = &config.ca_certs {
                    for cert in parse_certs(pem)? {
                        roots.add(cert)?;
                    }
                }
                if roots.is_empty() {
                    return Err(TlsSetupError::NoTrustAnchors);
                }
                let verifier = WebPkiServerVerifier::builder_with_provider(
                    Arc::new(roots),
                    Arc::clone(&provider),
                )
                .build()
                .map_err(|e| TlsSetupError::Verifier(e.to_string()))?;
                Some(verifier)
            }
        };

        Ok(Self {
            policy: config.policy,
            webpki,
            provider,
        })
    }
}

impl ServerCertVerifier for PolicyVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        let Some(webpki) = &self.webpki else {
            return Ok(ServerCertVerified::assertion());
        };

        match webpki.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            ocsp_response,
            now,
        ) {
            Err(rustls::Error::InvalidCertificate(err))
                if self.policy == CertificatePolicy::AllowNameMismatch
                    && is_name_mismatch(&err) =>
            {
                tracing::debug!(
                    ?server_name,
                    "accepting certificate despite host name mismatch"
                );
                Ok(ServerCertVerified::assertion())
            }
            other => other,
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_name_mismatch_only_for_name_errors() {
        assert!(is_name_mismatch(&CertificateError::NotValidForName));
        assert!(is_name_mismatch(&CertificateError::NotValidForNameContext {
            expected: ServerName::try_from("switch.example.com").unwrap(),
            presented: vec!["localhost".to_string()],
        }));
        assert!(!is_name_mismatch(&CertificateError::Expired));
        assert!(!is_name_mismatch(&CertificateError::UnknownIssuer));
    }

    #[test]
    fn test_connector_accept_any_needs_no_roots() {
        let config = TlsClientConfig {
            ca_certs: None,
            policy: CertificatePolicy::AcceptAny,
        };
        assert!(config.connector().is_ok());
    }

    #[test]
    fn test_connector_verify_without_roots_is_rejected() {
        for policy in [CertificatePolicy::Verify, CertificatePolicy::AllowNameMismatch] {
            let config = TlsClientConfig { ca_certs: None, policy };
            assert!(matches!(
                config.connector(),
                Err(TlsSetupError::NoTrustAnchors)
            ));
        }
    }

    #[test]
    fn test_acceptor_without_key_is_rejected() {
        let config = TlsServerConfig {
            cert: Vec::new(),
            key: b"not a pem key".to_vec(),
        };
        assert!(matches!(config.acceptor(), Err(TlsSetupError::MissingKey)));
    }

    #[test]
    fn test_server_name_accepts_hosts_and_ips() {
        assert!(server_name("switch.example.com").is_ok());
        assert!(server_name("10.0.0.1").is_ok());
        assert!(server_name("not a host!").is_err());
    }
}
