/*!

The thumbprint of an OIDC provider is the SHA-1 of the root certificate that the issuer presents.
AWS needs it to trust the issuer of the cluster's service account tokens.

!*/

use futures::FutureExt;
use log::{debug, error};
use rustls::pki_types::{CertificateDer, ServerName};
use rustls::{ClientConfig, RootCertStore};
use sha1::{Digest, Sha1};
use snafu::{OptionExt, ResultExt, Snafu};
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use url::Url;

const DEFAULT_HTTPS_PORT: u16 = 443;

/// The error type for thumbprint computation.
#[derive(Debug, Snafu)]
pub struct Error(InnerError);

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub(crate) enum InnerError {
    #[snafu(display("Unable to parse URL '{}': {}", url, source))]
    UrlParse { url: String, source: url::ParseError },

    #[snafu(display("URL '{}' has no host", url))]
    MissingHost { url: String },

    #[snafu(display("'{}' is not a valid server name: {}", host, source))]
    ServerName {
        host: String,
        source: rustls::pki_types::InvalidDnsNameError,
    },

    #[snafu(display("Unable to build the TLS configuration: {}", source))]
    TlsConfig { source: rustls::Error },

    #[snafu(display("Unable to connect to '{}:{}': {}", host, port, source))]
    Connect {
        host: String,
        port: u16,
        source: std::io::Error,
    },

    #[snafu(display("TLS handshake with '{}' failed: {}", host, source))]
    Handshake {
        host: String,
        source: std::io::Error,
    },

    #[snafu(display("'{}' did not present any certificate", host))]
    NoCertificates { host: String },

    #[snafu(display("Unable to parse certificate {} of the chain: {}", index, message))]
    CertificateParse { index: usize, message: String },

    #[snafu(display("recovering from: {:?}", message))]
    Panic { message: String },
}

/// Computes the thumbprint of the server behind an OIDC endpoint URL.
#[async_trait::async_trait]
pub trait ThumbprintFetcher: Send + Sync {
    async fn thumbprint(&self, oidc_endpoint_url: &str) -> Result<String>;
}

/// Connects to the endpoint with TLS and reads the certificate chain from the handshake.
#[derive(Clone)]
pub struct TlsThumbprintFetcher {
    config: Arc<ClientConfig>,
}

impl std::fmt::Debug for TlsThumbprintFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsThumbprintFetcher").finish()
    }
}

impl TlsThumbprintFetcher {
    /// A fetcher that trusts the Mozilla root certificates.
    pub fn new() -> Result<Self> {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        Self::with_root_certificates(roots)
    }

    pub fn with_root_certificates(roots: RootCertStore) -> Result<Self> {
        let config = ClientConfig::builder_with_provider(Arc::new(
            rustls::crypto::ring::default_provider(),
        ))
        .with_safe_default_protocol_versions()
        .context(TlsConfigSnafu)?
        .with_root_certificates(roots)
        .with_no_client_auth();
        Ok(Self {
            config: Arc::new(config),
        })
    }

    async fn peer_chain(&self, host: &str, port: u16) -> Result<Vec<CertificateDer<'static>>> {
        let server_name = ServerName::try_from(host.to_string()).context(ServerNameSnafu { host })?;
        let stream = TcpStream::connect((host, port))
            .await
            .context(ConnectSnafu { host, port })?;
        let tls = TlsConnector::from(Arc::clone(&self.config))
            .connect(server_name, stream)
            .await
            .context(HandshakeSnafu { host })?;
        let (_, connection) = tls.get_ref();
        let chain = connection
            .peer_certificates()
            .map(|chain| chain.to_vec())
            .unwrap_or_default();
        debug!("'{}' presented {} certificates", host, chain.len());
        Ok(chain)
    }
}

#[async_trait::async_trait]
impl ThumbprintFetcher for TlsThumbprintFetcher {
    async fn thumbprint(&self, oidc_endpoint_url: &str) -> Result<String> {
        recover_panics(async {
            let url = Url::parse(oidc_endpoint_url).context(UrlParseSnafu {
                url: oidc_endpoint_url,
            })?;
            let host = url.host_str().context(MissingHostSnafu {
                url: oidc_endpoint_url,
            })?;
            let port = url.port().unwrap_or(DEFAULT_HTTPS_PORT);
            let chain = self.peer_chain(host, port).await?;
            snafu::ensure!(!chain.is_empty(), NoCertificatesSnafu { host });
            select_thumbprint(&chain)
        })
        .await
    }
}

/// The hex SHA-1 of the first self-signed CA certificate in `chain`, or of the last certificate
/// when the chain has no such certificate.
pub fn select_thumbprint<D>(chain: &[D]) -> Result<String>
where
    D: AsRef<[u8]>,
{
    for (index, der) in chain.iter().enumerate() {
        let (_, certificate) = x509_parser::parse_x509_certificate(der.as_ref()).map_err(|e| {
            InnerError::CertificateParse {
                index,
                message: e.to_string(),
            }
        })?;
        if certificate.is_ca() && certificate.issuer().as_raw() == certificate.subject().as_raw()
        {
            return Ok(sha1_hex(der.as_ref()));
        }
    }
    let last = chain.last().context(NoCertificatesSnafu { host: "" })?;
    Ok(sha1_hex(last.as_ref()))
}

pub fn sha1_hex(data: &[u8]) -> String {
    hex::encode(Sha1::digest(data))
}

/// Run `future`, turning a panic into an error.
pub async fn recover_panics<T, F>(future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("recovering from: {:?}", message);
            Err(PanicSnafu { message }.build().into())
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rcgen::{BasicConstraints, CertificateParams, CertifiedKey, DnType, IsCa, KeyPair};
    use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
    use rustls::ServerConfig;
    use tokio::net::TcpListener;
    use tokio_rustls::TlsAcceptor;

    fn ca() -> CertifiedKey {
        let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.distinguished_name.push(DnType::CommonName, "Test Root CA");
        let key_pair = KeyPair::generate().unwrap();
        let cert = params.self_signed(&key_pair).unwrap();
        CertifiedKey { cert, key_pair }
    }

    fn leaf(issuer: &CertifiedKey) -> CertifiedKey {
        let mut params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        params.distinguished_name.push(DnType::CommonName, "localhost");
        let key_pair = KeyPair::generate().unwrap();
        let cert = params
            .signed_by(&key_pair, &issuer.cert, &issuer.key_pair)
            .unwrap();
        CertifiedKey { cert, key_pair }
    }

    #[test]
    fn root_ca_is_selected() {
        let ca = ca();
        let leaf = leaf(&ca);
        let chain = vec![leaf.cert.der().to_vec(), ca.cert.der().to_vec()];
        let thumbprint = select_thumbprint(&chain).unwrap();
        assert_eq!(thumbprint, sha1_hex(ca.cert.der()));
        assert_eq!(thumbprint.len(), 40);
        assert!(thumbprint.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn last_certificate_without_root() {
        let ca = ca();
        let first = leaf(&ca);
        let second = leaf(&ca);
        let chain = vec![first.cert.der().to_vec(), second.cert.der().to_vec()];
        assert_eq!(
            select_thumbprint(&chain).unwrap(),
            sha1_hex(second.cert.der())
        );
    }

    #[test]
    fn empty_chain() {
        assert!(select_thumbprint::<Vec<u8>>(&[]).is_err());
    }

    #[tokio::test]
    #[allow(clippy::panic)]
    async fn panics_become_errors() {
        let result: Result<String> = recover_panics(async { panic!("boom") }).await;
        assert_eq!(result.unwrap_err().to_string(), "recovering from: \"boom\"");
    }

    #[tokio::test]
    async fn invalid_url() {
        let fetcher = TlsThumbprintFetcher::new().unwrap();
        assert!(fetcher.thumbprint("not a url").await.is_err());
    }

    #[tokio::test]
    async fn thumbprint_from_handshake() {
        let ca = ca();
        let leaf = leaf(&ca);
        let provider = Arc::new(rustls::crypto::ring::default_provider());
        let server_config = ServerConfig::builder_with_provider(provider)
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(
                vec![leaf.cert.der().clone(), ca.cert.der().clone()],
                PrivateKeyDer::from(PrivatePkcs8KeyDer::from(leaf.key_pair.serialize_der())),
            )
            .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(server_config));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let _ = acceptor.accept(stream).await;
        });

        let mut roots = RootCertStore::empty();
        roots.add(ca.cert.der().clone()).unwrap();
        let fetcher = TlsThumbprintFetcher::with_root_certificates(roots).unwrap();
        let thumbprint = fetcher
            .thumbprint(&format!("https://localhost:{}/oidc", port))
            .await
            .unwrap();
        assert_eq!(thumbprint, sha1_hex(ca.cert.der()));
        server.await.unwrap();
    }
}
