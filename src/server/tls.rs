//! TLS bootstrap: the embedded test credential, the server-side context
//! built from it, and the permissive client policy the shutdown request uses.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, verify_tls12_signature, verify_tls13_signature};
use rustls::pki_types::pem::PemObject;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::{DigitallySignedStruct, SignatureScheme};
use tokio_rustls::{TlsAcceptor, TlsConnector};

use crate::server::error::Error;

/// Self-signed `CN=Test Server` certificate for `localhost` and `127.0.0.1`
/// followed by its PKCS#8 key, PEM encoded, then base64 encoded.
///
/// Test-only key material. It is public in this repository and must never
/// protect anything.
const EMBEDDED_CREDENTIAL: &str = include_str!("test_server.b64");

/// A certificate chain and private key, carried as base64-encoded PEM.
#[derive(Clone)]
pub struct TlsCredential {
    encoded: Cow<'static, str>,
}

impl TlsCredential {
    /// The credential compiled into the crate.
    pub fn embedded() -> Self {
        Self {
            encoded: Cow::Borrowed(EMBEDDED_CREDENTIAL),
        }
    }

    /// A credential from base64-encoded PEM: one or more certificates, then
    /// the private key.
    pub fn from_base64(encoded: impl Into<String>) -> Self {
        Self {
            encoded: Cow::Owned(encoded.into()),
        }
    }

    fn load(&self) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>), Error> {
        let compact: String = self.encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        let pem = STANDARD
            .decode(compact)
            .map_err(|e| Error::CredentialError(format!("credential is not valid base64: {e}")))?;

        let certs = CertificateDer::pem_slice_iter(&pem)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| Error::CredentialError(format!("bad certificate: {e}")))?;
        if certs.is_empty() {
            return Err(Error::CredentialError("no certificate found".to_string()));
        }

        let key = PrivateKeyDer::from_pem_slice(&pem)
            .map_err(|e| Error::CredentialError(format!("bad private key: {e}")))?;

        Ok((certs, key))
    }
}

impl fmt::Debug for TlsCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TlsCredential")
            .field("encoded_len", &self.encoded.len())
            .finish_non_exhaustive()
    }
}

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Build the server-side TLS context presenting `credential`.
pub fn server_acceptor(credential: &TlsCredential) -> Result<TlsAcceptor, Error> {
    let (certs, key) = credential.load()?;

    let config = rustls::ServerConfig::builder_with_provider(provider())
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(certs, key)?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Accepts any server certificate for any name. Handshake signatures are
/// still checked so the session keys belong to whoever presented the cert.
#[derive(Debug)]
struct AcceptAnyServerCert {
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for AcceptAnyServerCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.provider.signature_verification_algorithms)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider.signature_verification_algorithms.supported_schemes()
    }
}

/// Client connector that trusts any server. Crate-private: only the
/// in-process shutdown request and the crate's own tests may use it.
pub(crate) fn permissive_connector() -> Result<TlsConnector, Error> {
    let provider = provider();
    let config = rustls::ClientConfig::builder_with_provider(provider.clone())
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(AcceptAnyServerCert { provider }))
        .with_no_client_auth();

    Ok(TlsConnector::from(Arc::new(config)))
}
