//! Client-side TLS configuration for the Cassandra-compatible collaborator
//! session (spec §6: "transport is optionally TLS (v1.0 or v1.2
//! selectable) with optional mTLS... and optional CA pinning").
//!
//! Adapted from the teacher's server-side `TlsConfig` (certificate/key/CA
//! loading via `rustls-pemfile`), turned around to build a client config.

use std::sync::Arc;

use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{ClientConfig, DigitallySignedStruct, SignatureScheme};

use crate::config::TlsSettings;
use crate::error::{Result, TriremeError};

/// Builds a `rustls::ClientConfig` from [`TlsSettings`]. mTLS is enabled
/// automatically when both a client certificate and key are present; CA
/// pinning is enabled when a CA certificate is present, otherwise the
/// platform's native roots are not consulted - per spec, CA pinning is
/// opt-in, so an absent CA falls back to trusting any server certificate
/// (mirroring the original's unauthenticated `SSLContext` default).
pub fn build_client_config(settings: &TlsSettings) -> Result<ClientConfig> {
    if settings.use_tls_v1 {
        // rustls dropped TLS 1.0/1.1 support entirely (no cipher suites
        // exist for them in the `ring` provider); the flag is accepted for
        // CLI compatibility with the original tool but we negotiate the
        // oldest version rustls still speaks, TLS 1.2, and say so.
        tracing::warn!(
            "--ssl-use-tls-v1 requested but unsupported by the TLS backend; using TLS 1.2"
        );
    }
    let protocol_versions: &[&'static rustls::SupportedProtocolVersion] = &[&rustls::version::TLS12];

    let builder = ClientConfig::builder_with_protocol_versions(protocol_versions);

    let builder = if let Some(ca_path) = &settings.ca_cert {
        let ca_certs = load_certs(ca_path)?;
        let mut roots = rustls::RootCertStore::empty();
        for cert in ca_certs {
            roots
                .add(cert)
                .map_err(|e| TriremeError::Tls(format!("invalid CA certificate: {}", e)))?;
        }
        builder.with_root_certificates(roots)
    } else {
        builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert))
    };

    let config = match (&settings.certificate, &settings.key) {
        (Some(cert_path), Some(key_path)) => {
            let certs = load_certs(cert_path)?;
            let key = load_private_key(key_path)?;
            builder
                .with_client_auth_cert(certs, key)
                .map_err(|e| TriremeError::Tls(format!("invalid client certificate/key: {}", e)))?
        }
        _ => builder.with_no_client_auth(),
    };

    Ok(config)
}

fn load_certs(path: &std::path::Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = std::fs::File::open(path)
        .map_err(|e| TriremeError::Tls(format!("failed to open {}: {}", path.display(), e)))?;
    let mut reader = std::io::BufReader::new(file);
    rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| TriremeError::Tls(format!("failed to parse {}: {}", path.display(), e)))
}

fn load_private_key(path: &std::path::Path) -> Result<PrivateKeyDer<'static>> {
    let file = std::fs::File::open(path)
        .map_err(|e| TriremeError::Tls(format!("failed to open {}: {}", path.display(), e)))?;
    let mut reader = std::io::BufReader::new(file);
    let mut keys = rustls_pemfile::pkcs8_private_keys(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| TriremeError::Tls(format!("failed to parse key {}: {}", path.display(), e)))?;
    if let Some(key) = keys.pop() {
        return Ok(PrivateKeyDer::Pkcs8(key));
    }

    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let mut keys = rustls_pemfile::rsa_private_keys(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| TriremeError::Tls(format!("failed to parse key {}: {}", path.display(), e)))?;
    if let Some(key) = keys.pop() {
        return Ok(PrivateKeyDer::Pkcs1(key));
    }

    Err(TriremeError::Tls(format!(
        "no private key found in {}",
        path.display()
    )))
}

/// Verifier used when no CA is pinned (spec leaves CA pinning optional).
/// Accepts any server certificate without validating the chain - this is
/// the client-side equivalent of the original's bare `SSLContext` with no
/// CA configured, not a recommendation for production use without one.
#[derive(Debug)]
struct AcceptAnyServerCert;

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::ED25519,
        ]
    }
}
