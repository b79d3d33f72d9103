//! Request payload acquisition
//!
//! The payload of a validation request is turned into a request-scoped
//! temporary file before anything is parsed. The file is deleted when its
//! [`ContentFile`] is dropped, so every exit path of a request cleans up.
//!
//! Classification of a payload without an explicit embedding method is
//! syntactic: a string with a URI scheme is fetched (only `http`/`https`),
//! anything else is Base64 when it decodes strictly and raw text otherwise.

use crate::error::ValidatorError;
use crate::model::Input;
use crate::rdf::{RdfSyntax, select_syntax};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Url;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Accept header sent when fetching remote RDF.
const RDF_ACCEPT: &str = "text/turtle, application/rdf+xml;q=0.9, application/ld+json;q=0.8, application/n-triples;q=0.7, */*;q=0.1";

/// Response size limit used unless the server is configured otherwise.
pub const DEFAULT_MAX_FETCH_BYTES: u64 = 32 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum EmbeddingMethod {
    String,
    Url,
    Base64,
}

#[derive(Debug, Error)]
pub enum MaterializeError {
    #[error("external rules are not supported")]
    ExternalRules,

    #[error("unknown embedding method {0:?}")]
    EmbeddingMethod(String),

    #[error("no content to validate was provided")]
    EmptyContent,

    #[error("a content syntax is required for {0} content")]
    MissingSyntax(&'static str),

    #[error("content syntax could not be determined (declared: {declared:?})")]
    UnknownSyntax { declared: Option<String> },

    #[error("content is not valid Base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid content URL {url:?}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetching {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("{url} is larger than the {limit} byte limit for remote content")]
    TooLarge { url: String, limit: u64 },

    #[error("failed to store request content: {0}")]
    Io(#[from] std::io::Error),
}

impl From<MaterializeError> for ValidatorError {
    fn from(error: MaterializeError) -> Self {
        let builder = match &error {
            MaterializeError::ExternalRules => ValidatorError::unsupported("externalRules"),
            MaterializeError::EmbeddingMethod(_) => ValidatorError::bad_parameter("embeddingMethod")
                .suggestion("Use one of STRING, URL or BASE64"),
            MaterializeError::MissingSyntax(_) | MaterializeError::UnknownSyntax { .. } => {
                ValidatorError::bad_parameter("contentSyntax")
                    .suggestion("Declare the content media type, for example text/turtle")
            }
            MaterializeError::EmptyContent
            | MaterializeError::Base64(_)
            | MaterializeError::InvalidUrl { .. }
            | MaterializeError::Fetch { .. }
            | MaterializeError::HttpStatus { .. }
            | MaterializeError::TooLarge { .. } => {
                ValidatorError::bad_parameter("contentToValidate")
            }
            MaterializeError::Io(_) => ValidatorError::engine_failure(),
        };
        builder.message(error.to_string()).build()
    }
}

/// Remote bytes plus the media type the server declared for them.
#[derive(Debug)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub media_type: Option<String>,
}

/// HTTP client for URL-embedded content and owl:imports targets.
#[derive(Debug, Clone)]
pub struct ContentFetcher {
    client: reqwest::Client,
    max_bytes: u64,
}

impl ContentFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("shacl-validator/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            max_bytes: DEFAULT_MAX_FETCH_BYTES,
        })
    }

    /// Caps the response body; larger responses fail with [`MaterializeError::TooLarge`].
    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub async fn fetch(&self, url: &Url) -> Result<Fetched, MaterializeError> {
        let fetch_error = |source: reqwest::Error| MaterializeError::Fetch {
            url: url.to_string(),
            source,
        };
        let too_large = || MaterializeError::TooLarge {
            url: url.to_string(),
            limit: self.max_bytes,
        };
        let mut response = self
            .client
            .get(url.clone())
            .header(ACCEPT, RDF_ACCEPT)
            .send()
            .await
            .map_err(fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(MaterializeError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let media_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if response
            .content_length()
            .is_some_and(|length| length > self.max_bytes)
        {
            return Err(too_large());
        }

        // Content-Length may be absent or wrong, so the limit is enforced while reading.
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(fetch_error)? {
            if (bytes.len() + chunk.len()) as u64 > self.max_bytes {
                return Err(too_large());
            }
            bytes.extend_from_slice(&chunk);
        }
        tracing::debug!(url = %url, bytes = bytes.len(), "fetched remote content");
        Ok(Fetched { bytes, media_type })
    }
}

/// Materialized request content. Dropping it deletes the backing file.
#[derive(Debug)]
pub struct ContentFile {
    file: NamedTempFile,
    syntax: RdfSyntax,
    base_iri: Option<String>,
}

impl ContentFile {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Syntax chosen from the declared content type or the URL extension.
    pub fn syntax(&self) -> RdfSyntax {
        self.syntax
    }

    /// Source URL for fetched content, used to resolve relative IRIs.
    pub fn base_iri(&self) -> Option<&str> {
        self.base_iri.as_deref()
    }

    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        fs::read(self.file.path())
    }
}

enum Payload {
    Remote(Url),
    Inline(Vec<u8>),
}

/// Acquires the content of `input` as a temporary file under `temp_dir`.
///
/// Parameter problems are reported before any network or disk access:
/// external rules first, then the embedding method, then a missing syntax
/// for Base64 content.
pub async fn materialize(
    input: &Input,
    fetcher: &ContentFetcher,
    temp_dir: &Path,
) -> Result<ContentFile, MaterializeError> {
    if input.has_external_rules() {
        return Err(MaterializeError::ExternalRules);
    }
    let method = input
        .embedding_method
        .as_deref()
        .map(|method| {
            EmbeddingMethod::from_str(method.trim())
                .map_err(|_| MaterializeError::EmbeddingMethod(method.to_string()))
        })
        .transpose()?;
    let declared = input
        .content_syntax
        .as_deref()
        .map(str::trim)
        .filter(|syntax| !syntax.is_empty());
    if method == Some(EmbeddingMethod::Base64) && declared.is_none() {
        return Err(MaterializeError::MissingSyntax("BASE64"));
    }

    let content = input.content_to_validate.trim();
    if content.is_empty() {
        return Err(MaterializeError::EmptyContent);
    }

    let payload = match method {
        Some(EmbeddingMethod::Url) => Payload::Remote(parse_remote(content)?),
        Some(EmbeddingMethod::Base64) => Payload::Inline(decode_base64(content)?),
        Some(EmbeddingMethod::String) => Payload::Inline(input.content_to_validate.clone().into_bytes()),
        None => classify(&input.content_to_validate)?,
    };

    match payload {
        Payload::Remote(url) => {
            let extension = url_extension(&url);
            let syntax = choose_syntax(declared, extension.as_deref())?;
            let fetched = fetcher.fetch(&url).await?;
            tracing::info!(url = %url, syntax = %syntax, "validating remote content");
            write_content(&fetched.bytes, temp_dir, extension.as_deref(), syntax, Some(url.to_string()))
        }
        Payload::Inline(bytes) => {
            if declared.is_none() {
                return Err(MaterializeError::MissingSyntax("inline"));
            }
            let syntax = choose_syntax(declared, None)?;
            write_content(&bytes, temp_dir, syntax_extension(syntax), syntax, None)
        }
    }
}

fn classify(content: &str) -> Result<Payload, MaterializeError> {
    let trimmed = content.trim();
    if has_uri_scheme(trimmed) {
        return parse_remote(trimmed).map(Payload::Remote);
    }
    match decode_base64(trimmed) {
        Ok(bytes) => Ok(Payload::Inline(bytes)),
        Err(_) => Ok(Payload::Inline(content.as_bytes().to_vec())),
    }
}

/// `scheme://` prefix check, RFC 3986 scheme characters only.
fn has_uri_scheme(content: &str) -> bool {
    let Some((scheme, _)) = content.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn parse_remote(content: &str) -> Result<Url, MaterializeError> {
    let url = Url::parse(content.trim()).map_err(|error| MaterializeError::InvalidUrl {
        url: content.to_string(),
        message: error.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(MaterializeError::InvalidUrl {
            url: content.to_string(),
            message: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    Ok(url)
}

fn decode_base64(content: &str) -> Result<Vec<u8>, MaterializeError> {
    let compact: String = content
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(STANDARD.decode(compact)?)
}

fn choose_syntax(
    declared: Option<&str>,
    extension: Option<&str>,
) -> Result<RdfSyntax, MaterializeError> {
    select_syntax(declared, extension).map_err(|_| MaterializeError::UnknownSyntax {
        declared: declared.map(str::to_string),
    })
}

fn url_extension(url: &Url) -> Option<String> {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

fn syntax_extension(syntax: RdfSyntax) -> Option<&'static str> {
    syntax.extensions().first().copied()
}

fn write_content(
    bytes: &[u8],
    temp_dir: &Path,
    extension: Option<&str>,
    syntax: RdfSyntax,
    base_iri: Option<String>,
) -> Result<ContentFile, MaterializeError> {
    fs::create_dir_all(temp_dir)?;
    let suffix = extension.map(|ext| format!(".{ext}")).unwrap_or_default();
    let mut file = tempfile::Builder::new()
        .prefix("shacl-content-")
        .suffix(&suffix)
        .tempfile_in(temp_dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    Ok(ContentFile {
        file,
        syntax,
        base_iri,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use assert_matches::assert_matches;

    const TURTLE: &str = "@prefix ex: <http://example.org/> . ex:a ex:b ex:c .";

    fn fetcher() -> ContentFetcher {
        ContentFetcher::new(Duration::from_secs(1)).expect("client")
    }

    fn input(content: &str) -> Input {
        Input {
            content_to_validate: content.to_string(),
            ..Input::default()
        }
    }

    #[test]
    fn embedding_method_parses_case_insensitively() {
        assert_eq!(EmbeddingMethod::from_str("base64").ok(), Some(EmbeddingMethod::Base64));
        assert_eq!(EmbeddingMethod::from_str("URL").ok(), Some(EmbeddingMethod::Url));
        assert!(EmbeddingMethod::from_str("FILE").is_err());
        assert_eq!(EmbeddingMethod::Base64.to_string(), "BASE64");
    }

    #[tokio::test]
    async fn external_rules_win_over_other_problems() {
        let dir = tempfile::tempdir().expect("tempdir");
        let request = Input {
            embedding_method: Some("nonsense".into()),
            external_rules: Some(vec![Default::default()]),
            ..input("")
        };
        let err = materialize(&request, &fetcher(), dir.path())
            .await
            .expect_err("unsupported");
        assert_matches!(err, MaterializeError::ExternalRules);
        assert_eq!(ValidatorError::from(err).code, ErrorCode::UnsupportedFeature);
    }

    #[tokio::test]
    async fn base64_without_syntax_fails_before_decoding() {
        let dir = tempfile::tempdir().expect("tempdir");
        let request = Input {
            embedding_method: Some("BASE64".into()),
            ..input("%%% definitely not base64 %%%")
        };
        let err = materialize(&request, &fetcher(), dir.path())
            .await
            .expect_err("missing syntax");
        assert_matches!(err, MaterializeError::MissingSyntax(_));
        let err = ValidatorError::from(err);
        assert_eq!(err.code, ErrorCode::BadParameter);
        assert_eq!(err.context.parameter.as_deref(), Some("contentSyntax"));
    }

    #[tokio::test]
    async fn inline_base64_is_decoded_and_cleaned_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        let request = Input {
            content_syntax: Some("text/turtle".into()),
            ..input(&STANDARD.encode(TURTLE))
        };
        let file = materialize(&request, &fetcher(), dir.path())
            .await
            .expect("materialize");
        assert_eq!(file.syntax(), RdfSyntax::Turtle);
        assert_eq!(file.read().expect("read"), TURTLE.as_bytes());
        let path = file.path().to_path_buf();
        assert!(path.exists());
        drop(file);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn raw_text_falls_through_base64() {
        let dir = tempfile::tempdir().expect("tempdir");
        let request = Input {
            content_syntax: Some("text/turtle".into()),
            ..input(TURTLE)
        };
        let file = materialize(&request, &fetcher(), dir.path())
            .await
            .expect("materialize");
        assert_eq!(file.read().expect("read"), TURTLE.as_bytes());
    }

    #[tokio::test]
    async fn inline_content_needs_a_syntax() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = materialize(&input(TURTLE), &fetcher(), dir.path())
            .await
            .expect_err("no syntax");
        assert_matches!(err, MaterializeError::MissingSyntax(_));
    }

    #[tokio::test]
    async fn scheme_like_content_must_be_fetchable() {
        let dir = tempfile::tempdir().expect("tempdir");
        for content in ["ftp://example.org/data.ttl", "http://exa mple.org/data.ttl"] {
            let request = Input {
                content_syntax: Some("text/turtle".into()),
                ..input(content)
            };
            let err = materialize(&request, &fetcher(), dir.path())
                .await
                .expect_err("bad url");
            assert_matches!(err, MaterializeError::InvalidUrl { .. });
            let err = ValidatorError::from(err);
            assert_eq!(err.context.parameter.as_deref(), Some("contentToValidate"));
        }
    }

    #[tokio::test]
    async fn unknown_embedding_method_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let request = Input {
            embedding_method: Some("FILE".into()),
            ..input(TURTLE)
        };
        let err = ValidatorError::from(
            materialize(&request, &fetcher(), dir.path())
                .await
                .expect_err("bad method"),
        );
        assert_eq!(err.context.parameter.as_deref(), Some("embeddingMethod"));
    }

    #[test]
    fn scheme_detection_is_syntactic() {
        assert!(has_uri_scheme("https://example.org/a.ttl"));
        assert!(has_uri_scheme("svn+ssh://host/repo"));
        assert!(!has_uri_scheme(TURTLE));
        assert!(!has_uri_scheme("<http://example.org/a> <http://example.org/b> \"c\" ."));
    }

    #[test]
    fn url_extension_uses_last_segment() {
        let url = Url::parse("https://example.org/data/person.TTL?x=1").expect("url");
        assert_eq!(url_extension(&url).as_deref(), Some("ttl"));
        let url = Url::parse("https://example.org/").expect("url");
        assert_eq!(url_extension(&url), None);
    }
}
