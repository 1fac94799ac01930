/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::CryptoProvider;
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, ServerConfig, SignatureScheme};
use rustls_pki_types::pem::PemObject;
use rustls_pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use tokio::net::TcpStream;
use tokio::time::error::Elapsed;
use tokio_rustls::{TlsAcceptor, TlsConnector, client, server};

#[cfg(feature = "yaml")]
mod yaml;

const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// The TLS settings used for the control connection and every data connection.
pub struct FtpTlsPolicy {
    client: Arc<ClientConfig>,
    server: Option<Arc<ServerConfig>>,
    server_name: Option<ServerName<'static>>,
    handshake_timeout: Duration,
}

impl FtpTlsPolicy {
    pub fn new(client: Arc<ClientConfig>) -> Self {
        FtpTlsPolicy {
            client,
            server: None,
            server_name: None,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Set the server side config used to accept active mode data connections.
    pub fn set_server_config(&mut self, server: Arc<ServerConfig>) {
        self.server = Some(server);
    }

    pub fn set_server_name(&mut self, name: ServerName<'static>) {
        self.server_name = Some(name);
    }

    pub fn set_handshake_timeout(&mut self, timeout: Duration) {
        self.handshake_timeout = timeout;
    }

    #[inline]
    pub fn server_name(&self) -> Option<&ServerName<'static>> {
        self.server_name.as_ref()
    }

    #[inline]
    pub fn handshake_timeout(&self) -> Duration {
        self.handshake_timeout
    }

    #[inline]
    pub fn has_server_identity(&self) -> bool {
        self.server.is_some()
    }

    /// Run a client side handshake, bounded by the handshake timeout.
    pub(crate) async fn connect(
        &self,
        server_name: ServerName<'static>,
        stream: TcpStream,
    ) -> Result<io::Result<client::TlsStream<TcpStream>>, Elapsed> {
        let connector = TlsConnector::from(self.client.clone());
        tokio::time::timeout(self.handshake_timeout, connector.connect(server_name, stream)).await
    }

    /// Run a server side handshake on an accepted active mode data connection.
    ///
    /// Returns `None` if no server identity is configured.
    pub(crate) async fn accept(
        &self,
        stream: TcpStream,
    ) -> Option<Result<io::Result<server::TlsStream<TcpStream>>, Elapsed>> {
        let acceptor = TlsAcceptor::from(self.server.as_ref()?.clone());
        Some(tokio::time::timeout(self.handshake_timeout, acceptor.accept(stream)).await)
    }
}

pub(crate) fn crypto_provider() -> Arc<CryptoProvider> {
    if let Some(provider) = CryptoProvider::get_default() {
        return provider.clone();
    }

    #[cfg(feature = "rustls-aws-lc")]
    return Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    #[cfg(all(feature = "rustls-ring", not(feature = "rustls-aws-lc")))]
    return Arc::new(rustls::crypto::ring::default_provider());
    #[cfg(not(any(feature = "rustls-aws-lc", feature = "rustls-ring")))]
    compile_error!("either rustls-aws-lc or rustls-ring should be enabled");
}

/// Accept any server certificate, only the handshake signatures are checked.
#[derive(Debug)]
struct NoServerCertVerifier(Arc<CryptoProvider>);

impl ServerCertVerifier for NoServerCertVerifier {
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
        rustls::crypto::verify_tls12_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        rustls::crypto::verify_tls13_signature(
            message,
            cert,
            dss,
            &self.0.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.0.signature_verification_algorithms.supported_schemes()
    }
}

#[derive(Default)]
pub struct FtpTlsPolicyBuilder {
    ca_certs: Vec<CertificateDer<'static>>,
    cert_pair: Option<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)>,
    no_verify: bool,
    server_name: Option<ServerName<'static>>,
    handshake_timeout: Option<Duration>,
}

impl FtpTlsPolicyBuilder {
    pub fn add_ca_certs(&mut self, certs: Vec<CertificateDer<'static>>) {
        self.ca_certs.extend(certs);
    }

    pub fn add_ca_cert_file<P: AsRef<Path>>(&mut self, path: P) -> anyhow::Result<()> {
        let certs = load_certs(path.as_ref())?;
        self.ca_certs.extend(certs);
        Ok(())
    }

    /// Set the certificate pair presented when acting as the TLS server side of an active
    /// mode data connection, and as client certificate on all client side connections.
    pub fn set_cert_pair(
        &mut self,
        certs: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
    ) -> anyhow::Result<()> {
        if certs.is_empty() {
            return Err(anyhow!("no certificate set"));
        }
        self.cert_pair = Some((certs, key));
        Ok(())
    }

    pub fn set_cert_pair_files<P: AsRef<Path>>(
        &mut self,
        cert_file: P,
        key_file: P,
    ) -> anyhow::Result<()> {
        let certs = load_certs(cert_file.as_ref())?;
        let key_file = key_file.as_ref();
        let key = PrivateKeyDer::from_pem_file(key_file).map_err(|e| {
            anyhow!(
                "failed to load private key from file {}: {e:?}",
                key_file.display()
            )
        })?;
        self.set_cert_pair(certs, key)
    }

    pub fn set_no_verify(&mut self, no_verify: bool) {
        self.no_verify = no_verify;
    }

    pub fn set_server_name(&mut self, name: &str) -> anyhow::Result<()> {
        let name = ServerName::try_from(name.to_string())
            .map_err(|e| anyhow!("invalid tls server name {name}: {e}"))?;
        self.server_name = Some(name);
        Ok(())
    }

    pub fn set_handshake_timeout(&mut self, timeout: Duration) {
        self.handshake_timeout = Some(timeout);
    }

    fn build_root_store(&self) -> anyhow::Result<RootCertStore> {
        let mut root_store = RootCertStore::empty();
        if self.ca_certs.is_empty() {
            let result = rustls_native_certs::load_native_certs();
            for e in &result.errors {
                log::warn!("error when loading native ca certs: {e}");
            }
            let (added, ignored) = root_store.add_parsable_certificates(result.certs);
            log::debug!("{added} native ca certs added, {ignored} ignored");
        } else {
            for (i, cert) in self.ca_certs.iter().enumerate() {
                root_store
                    .add(cert.clone())
                    .map_err(|e| anyhow!("failed to add ca cert #{i}: {e}"))?;
            }
        }
        Ok(root_store)
    }

    pub fn build(&self) -> anyhow::Result<FtpTlsPolicy> {
        let provider = crypto_provider();

        let builder = ClientConfig::builder_with_provider(provider.clone())
            .with_safe_default_protocol_versions()
            .map_err(|e| anyhow!("unsupported tls protocol versions: {e}"))?;
        let builder = if self.no_verify {
            builder
                .dangerous()
                .with_custom_certificate_verifier(Arc::new(NoServerCertVerifier(
                    provider.clone(),
                )))
        } else {
            let root_store = self.build_root_store()?;
            builder.with_root_certificates(root_store)
        };
        let client = match &self.cert_pair {
            Some((certs, key)) => builder
                .with_client_auth_cert(certs.clone(), key.clone_key())
                .map_err(|e| anyhow!("failed to set client cert pair: {e}"))?,
            None => builder.with_no_client_auth(),
        };

        let mut policy = FtpTlsPolicy::new(Arc::new(client));
        if let Some((certs, key)) = &self.cert_pair {
            let server = ServerConfig::builder_with_provider(provider)
                .with_safe_default_protocol_versions()
                .map_err(|e| anyhow!("unsupported tls protocol versions: {e}"))?
                .with_no_client_auth()
                .with_single_cert(certs.clone(), key.clone_key())
                .map_err(|e| anyhow!("failed to set server cert pair: {e}"))?;
            policy.set_server_config(Arc::new(server));
        }
        if let Some(name) = &self.server_name {
            policy.set_server_name(name.clone());
        }
        if let Some(timeout) = self.handshake_timeout {
            policy.set_handshake_timeout(timeout);
        }
        Ok(policy)
    }
}

fn load_certs(path: &Path) -> anyhow::Result<Vec<CertificateDer<'static>>> {
    let certs = CertificateDer::pem_file_iter(path)
        .map_err(|e| anyhow!("failed to open cert file {}: {e:?}", path.display()))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow!("invalid cert in file {}: {e:?}", path.display()))?;
    if certs.is_empty() {
        return Err(anyhow!("no certificate found in file {}", path.display()));
    }
    Ok(certs)
}

/// Build a policy from PEM files, the way most callers do.
pub fn load_tls_policy(
    ca_cert_file: Option<&Path>,
    cert_pair_files: Option<(&Path, &Path)>,
    no_verify: bool,
) -> anyhow::Result<FtpTlsPolicy> {
    let mut builder = FtpTlsPolicyBuilder::default();
    if let Some(path) = ca_cert_file {
        builder
            .add_ca_cert_file(path)
            .context("failed to load ca certs")?;
    }
    if let Some((cert, key)) = cert_pair_files {
        builder
            .set_cert_pair_files(cert, key)
            .context("failed to load cert pair")?;
    }
    builder.set_no_verify(no_verify);
    builder.build()
}
