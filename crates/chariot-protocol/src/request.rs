//! CoAP-style request URLs.
//!
//! The peer performs the actual CoAP exchange. The host only hands it a URL:
//!
//! ```text
//! coap://<host>/<name>?<verb>[;ct=<code>][&<options>]
//! ```
//!
//! Plain text is the peer's implicit content format and is never rendered.

use crate::codec::encode_record_line;
use crate::constants::{COAP_SCHEME, PATH_SEARCH};
use crate::error::{ProtocolError, ProtocolResult};

/// Request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoapMethod {
    /// GET
    Get,
    /// GET with the observe option.
    Observe,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl CoapMethod {
    /// Verb used in the URL query.
    pub fn verb(&self) -> &'static str {
        match self {
            CoapMethod::Get => "get",
            CoapMethod::Observe => "obs",
            CoapMethod::Post => "post",
            CoapMethod::Put => "put",
            CoapMethod::Delete => "del",
        }
    }
}

/// Registered CoAP content formats (RFC 7252 §12.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentFormat {
    /// `text/plain; charset=utf-8`
    TextPlain,
    /// `application/link-format`
    LinkFormat,
    /// `application/xml`
    Xml,
    /// `application/octet-stream`
    OctetStream,
    /// `application/exi`
    Exi,
    /// `application/json`
    Json,
    /// `application/cbor`
    Cbor,
}

impl ContentFormat {
    /// Registered numeric code.
    pub fn code(&self) -> u16 {
        match self {
            ContentFormat::TextPlain => 0,
            ContentFormat::LinkFormat => 40,
            ContentFormat::Xml => 41,
            ContentFormat::OctetStream => 42,
            ContentFormat::Exi => 47,
            ContentFormat::Json => 50,
            ContentFormat::Cbor => 60,
        }
    }

    /// Whether the peer accepts this format.
    pub fn is_supported(&self) -> bool {
        matches!(self, ContentFormat::TextPlain | ContentFormat::Json)
    }
}

/// An outbound request to a node reachable through the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoapRequest {
    /// Request method.
    pub method: CoapMethod,
    /// Target host name.
    pub host: String,
    /// Target resource name.
    pub name: String,
    /// Payload content format.
    pub content: ContentFormat,
    /// Extra query options, `key=value` pairs joined by `&`.
    pub options: String,
}

impl CoapRequest {
    /// Create a plain-text request with no options.
    pub fn new(method: CoapMethod, host: impl Into<String>, name: impl Into<String>) -> Self {
        CoapRequest {
            method,
            host: host.into(),
            name: name.into(),
            content: ContentFormat::TextPlain,
            options: String::new(),
        }
    }

    /// Search `mote` for resources named `resource`.
    pub fn search(mote: impl Into<String>, resource: &str) -> ProtocolResult<Self> {
        if resource.is_empty() {
            return Err(ProtocolError::MissingRequestTarget);
        }
        Ok(CoapRequest::new(CoapMethod::Get, mote, PATH_SEARCH)
            .with_options(format!("name={resource}")))
    }

    /// Set the content format.
    pub fn with_content(mut self, content: ContentFormat) -> Self {
        self.content = content;
        self
    }

    /// Set the query options.
    pub fn with_options(mut self, options: impl Into<String>) -> Self {
        self.options = options.into();
        self
    }

    /// Build the request URL.
    pub fn to_url(&self) -> ProtocolResult<String> {
        if self.host.is_empty() || self.name.is_empty() {
            return Err(ProtocolError::MissingRequestTarget);
        }

        let mut url = format!("{COAP_SCHEME}{}/{}?{}", self.host, self.name, self.method.verb());

        if !self.content.is_supported() {
            return Err(ProtocolError::UnsupportedContentType(self.content));
        }
        // text/plain is the peer's implicit default
        if self.content != ContentFormat::TextPlain {
            url.push_str(&format!(";ct={}", self.content.code()));
        }

        if !self.options.is_empty() {
            url.push('&');
            url.push_str(&self.options);
        }
        Ok(url)
    }

    /// Build the URL and encode it as a bounded line.
    pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
        encode_record_line(&self.to_url()?)
    }
}
