use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;

use crate::data::{ResponseMetadata, ValidatedUrl};
use crate::error::Result;

/// A boxed stream type for HTTP response bodies.
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = T> + Send + 'a>>;

/// A response whose head has arrived and whose status is 2xx.
pub struct OpenResponse {
    pub metadata: ResponseMetadata,
    /// Body chunks in arrival order. Dropping the stream closes the connection.
    pub body:     BoxStream<'static, Result<Bytes>>,
}

impl std::fmt::Debug for OpenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenResponse")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Asynchronous HTTP client abstraction.
///
/// Implementations verify the server certificate chain and hostname on every
/// HTTPS connection, follow redirects only to `http`/`https` targets, and map
/// transport failures onto [`FetchError`](crate::FetchError) variants.
///
/// # Implementations
///
/// - [`ReqwestClient`]: Production implementation using `reqwest`
/// - Mock implementations for testing
pub trait HttpClient: Send + Sync {
    /// Send a GET for `url` and return once the response head has arrived.
    ///
    /// # Errors
    ///
    /// Connection failures, timeouts, certificate failures, redirect
    /// violations and non-2xx statuses.
    fn open(&self, url: &ValidatedUrl) -> impl Future<Output = Result<OpenResponse>> + Send;
}

#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::error::Error as StdError;
    use std::fmt;

    use futures_util::{StreamExt, future};
    use reqwest::header::LOCATION;
    use reqwest::redirect::Policy;
    use tracing::debug;

    use super::*;
    use crate::data::{FetchOptions, Scheme};
    use crate::error::FetchError;

    /// Production HTTP client implementation using reqwest over rustls.
    ///
    /// Certificate and hostname verification cannot be turned off. Trusted
    /// roots are the bundled Mozilla set (unless disabled) plus any PEM
    /// bundles from [`FetchOptions::add_root_certificate`].
    #[derive(Debug, Clone)]
    pub struct ReqwestClient {
        client:        reqwest::Client,
        max_redirects: usize,
    }

    impl ReqwestClient {
        pub fn new(options: &FetchOptions) -> Result<Self> {
            options.validate()?;

            let mut builder = reqwest::Client::builder()
                .use_rustls_tls()
                .min_tls_version(reqwest::tls::Version::TLS_1_2)
                .tls_built_in_root_certs(options.builtin_roots)
                .connect_timeout(options.connect_timeout)
                .read_timeout(options.read_timeout)
                .user_agent(options.user_agent.clone())
                .redirect(redirect_policy(options.max_redirects));

            if !options.system_proxy {
                builder = builder.no_proxy();
            }

            for pem in &options.extra_root_certificates {
                for certificate in parse_certificates(pem)? {
                    builder = builder.add_root_certificate(certificate);
                }
            }

            let client = builder
                .build()
                .map_err(|e| FetchError::Config(format!("cannot build HTTP client: {e}")))?;

            Ok(Self {
                client,
                max_redirects: options.max_redirects,
            })
        }
    }

    impl HttpClient for ReqwestClient {
        async fn open(&self, url: &ValidatedUrl) -> Result<OpenResponse> {
            debug!("GET {url}");
            let response = self
                .client
                .get(url.url().clone())
                .send()
                .await
                .map_err(|e| classify(url.as_str(), self.max_redirects, &e))?;

            let status = response.status();
            let final_url = response.url().clone();
            if !status.is_success() {
                if let Some(rejected) = rejected_redirect(&response) {
                    return Err(rejected);
                }
                debug!("{final_url} answered {status}");
                return Err(FetchError::HttpStatus {
                    url:    final_url.to_string(),
                    status: status.as_u16(),
                });
            }

            let scheme = Scheme::from_scheme(final_url.scheme()).ok_or_else(|| {
                FetchError::UnsupportedScheme {
                    url:    final_url.to_string(),
                    scheme: final_url.scheme().to_string(),
                }
            })?;
            let metadata = ResponseMetadata::from_headers(
                status.as_u16(),
                scheme,
                final_url.as_str(),
                response.headers(),
            );
            debug!(
                "{} answered {status}, declared length {:?}",
                metadata.url, metadata.declared_length
            );

            // A body cut short of its Content-Length ends the stream; the
            // reconciler judges the received count.
            let body_url = metadata.url.clone();
            let max_redirects = self.max_redirects;
            let body = response.bytes_stream().scan((), move |_, chunk| {
                future::ready(match chunk {
                    Err(e) if is_truncated_body(&e) => {
                        debug!("{body_url} closed before its declared length: {e}");
                        None
                    }
                    other => Some(other.map_err(|e| classify(&body_url, max_redirects, &e))),
                })
            });

            Ok(OpenResponse {
                metadata,
                body: Box::pin(body),
            })
        }
    }

    /// Why the redirect policy refused to follow.
    #[derive(Debug)]
    enum RedirectRejected {
        Scheme { url: String, scheme: String },
        TooMany { limit: usize },
    }

    impl fmt::Display for RedirectRejected {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self {
                RedirectRejected::Scheme { url, scheme } => {
                    write!(f, "redirect to unsupported scheme {scheme:?} ({url})")
                }
                RedirectRejected::TooMany { limit } => write!(f, "more than {limit} redirects"),
            }
        }
    }

    impl StdError for RedirectRejected {}

    fn redirect_policy(limit: usize) -> Policy {
        Policy::custom(move |attempt| {
            let target = attempt.url();
            if Scheme::from_scheme(target.scheme()).is_none() {
                let rejected = RedirectRejected::Scheme {
                    url:    target.to_string(),
                    scheme: target.scheme().to_string(),
                };
                attempt.error(rejected)
            } else if attempt.previous().len() > limit {
                attempt.error(RedirectRejected::TooMany { limit })
            } else {
                attempt.follow()
            }
        })
    }

    /// reqwest hands back a 3xx unfollowed when its `Location` is not a
    /// valid HTTP URI, which is the case for `file:///...`.
    fn rejected_redirect(response: &reqwest::Response) -> Option<FetchError> {
        if !response.status().is_redirection() {
            return None;
        }
        let location = response.headers().get(LOCATION)?.to_str().ok()?;
        let target = response.url().join(location).ok()?;
        if Scheme::from_scheme(target.scheme()).is_some() {
            return None;
        }
        Some(FetchError::UnsupportedScheme {
            url:    target.to_string(),
            scheme: target.scheme().to_string(),
        })
    }

    fn parse_certificates(pem: &[u8]) -> Result<Vec<reqwest::Certificate>> {
        let mut reader = pem;
        let mut certificates = Vec::new();
        for der in rustls_pemfile::certs(&mut reader) {
            let der = der.map_err(|e| FetchError::Config(format!("invalid PEM root certificate: {e}")))?;
            let certificate = reqwest::Certificate::from_der(der.as_ref())
                .map_err(|e| FetchError::Config(format!("invalid root certificate: {e}")))?;
            certificates.push(certificate);
        }
        if certificates.is_empty() {
            return Err(FetchError::Config("root certificate bundle contains no certificates".into()));
        }
        Ok(certificates)
    }

    fn sources(err: &reqwest::Error) -> impl Iterator<Item = &(dyn StdError + 'static)> {
        std::iter::successors(Some(err as &(dyn StdError + 'static)), |&e| e.source())
    }

    fn describe(err: &reqwest::Error) -> String {
        sources(err)
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(": ")
    }

    /// The TLS failure behind `err`, if any.
    ///
    /// rustls errors usually arrive wrapped in an `io::Error`, whose
    /// `source()` skips the wrapped error, so `get_ref()` is checked too.
    fn tls_failure(err: &reqwest::Error) -> Option<String> {
        for source in sources(err) {
            if let Some(tls) = source.downcast_ref::<rustls::Error>() {
                return Some(tls.to_string());
            }
            if let Some(tls) = source
                .downcast_ref::<std::io::Error>()
                .and_then(|io| io.get_ref())
                .and_then(|inner| inner.downcast_ref::<rustls::Error>())
            {
                return Some(tls.to_string());
            }
        }
        let description = describe(err);
        description
            .contains("invalid peer certificate")
            .then_some(description)
    }

    /// Whether the server closed the body before its declared length.
    ///
    /// hyper reports this as an `UnexpectedEof` I/O error under the body error.
    fn is_truncated_body(err: &reqwest::Error) -> bool {
        if err.is_timeout() {
            return false;
        }
        sources(err).any(|e| {
            e.downcast_ref::<std::io::Error>()
                .is_some_and(|io| io.kind() == std::io::ErrorKind::UnexpectedEof)
        }) || describe(err).contains("end of file before message length reached")
    }

    fn classify(url: &str, max_redirects: usize, err: &reqwest::Error) -> FetchError {
        if let Some(rejected) = sources(err).find_map(|e| e.downcast_ref::<RedirectRejected>()) {
            return match rejected {
                RedirectRejected::Scheme { url: target, scheme } => FetchError::UnsupportedScheme {
                    url:    target.clone(),
                    scheme: scheme.clone(),
                },
                RedirectRejected::TooMany { limit } => FetchError::TooManyRedirects {
                    url:   url.to_string(),
                    limit: *limit,
                },
            };
        }

        if let Some(target) = err.url().filter(|u| Scheme::from_scheme(u.scheme()).is_none()) {
            return FetchError::UnsupportedScheme {
                url:    target.to_string(),
                scheme: target.scheme().to_string(),
            };
        }

        if let Some(reason) = tls_failure(err) {
            return FetchError::SslValidation {
                url: url.to_string(),
                reason,
            };
        }

        if err.is_timeout() {
            return FetchError::Timeout { url: url.to_string() };
        }

        if err.is_redirect() {
            return FetchError::TooManyRedirects {
                url:   url.to_string(),
                limit: max_redirects,
            };
        }

        FetchError::Connection {
            url:    url.to_string(),
            reason: describe(err),
        }
    }

}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestClient;
