//! HTTP download surface: response abstraction and filename encoding.

use std::io::Write;

use http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use http::{HeaderName, HeaderValue, Response, StatusCode};

use crate::conf::C_CONTENT_TYPE_DOWNLOAD;
use crate::error::{ExportError, ExportResult};
use crate::spec::SpecDownloadPolicy;

/// Response the workbook is streamed into as an attachment.
pub trait DownloadResponse {
    /// Drop headers and body written so far.
    fn reset(&mut self);
    /// Set (replace) a header from raw bytes.
    fn set_header(&mut self, name: &str, value: &[u8]) -> ExportResult<()>;
    /// Body sink.
    fn body(&mut self) -> &mut dyn Write;
}

impl DownloadResponse for Response<Vec<u8>> {
    fn reset(&mut self) {
        *self.status_mut() = StatusCode::OK;
        self.headers_mut().clear();
        self.body_mut().clear();
    }

    fn set_header(&mut self, name: &str, value: &[u8]) -> ExportResult<()> {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|err| ExportError::Header(format!("invalid header name {name:?}: {err}")))?;
        let header_value = HeaderValue::from_bytes(value)
            .map_err(|err| ExportError::Header(format!("invalid value for {name}: {err}")))?;
        self.headers_mut().insert(header_name, header_value);
        Ok(())
    }

    fn body(&mut self) -> &mut dyn Write {
        self.body_mut()
    }
}

/// Set the attachment headers for `file_name`.
pub fn apply_download_headers<R>(
    response: &mut R,
    file_name: &str,
    user_agent: Option<&str>,
    policy: &SpecDownloadPolicy,
) -> ExportResult<()>
where
    R: DownloadResponse + ?Sized,
{
    response.set_header(CONTENT_TYPE.as_str(), C_CONTENT_TYPE_DOWNLOAD.as_bytes())?;

    let mut v_disposition = b"attachment; filename=".to_vec();
    v_disposition.extend(encode_download_filename(file_name, user_agent, policy));
    response.set_header(CONTENT_DISPOSITION.as_str(), &v_disposition)
}

/// Encode a download filename for the `Content-Disposition` header.
///
/// The name is percent-encoded as UTF-8. Legacy agents cap header length, so
/// when the agent matches a legacy marker and the encoded name is longer than
/// the policy limit, the raw legacy-charset bytes are sent instead with spaces
/// as `%20`. Names the legacy charset cannot represent stay percent-encoded.
pub fn encode_download_filename(
    name: &str,
    user_agent: Option<&str>,
    policy: &SpecDownloadPolicy,
) -> Vec<u8> {
    let c_encoded = urlencoding::encode(name).into_owned();

    let if_legacy_agent = user_agent.is_some_and(|agent| {
        policy
            .legacy_agent_markers
            .iter()
            .any(|marker| agent.contains(marker.as_str()))
    });
    if !if_legacy_agent || c_encoded.len() <= policy.len_encoded_max {
        return c_encoded.into_bytes();
    }

    let (v_bytes, _, if_unmappable) = policy.legacy_encoding.encode(name);
    if if_unmappable {
        return c_encoded.into_bytes();
    }

    let mut v_out = Vec::with_capacity(v_bytes.len());
    for byte in v_bytes.iter() {
        if *byte == b' ' {
            v_out.extend_from_slice(b"%20");
        } else {
            v_out.push(*byte);
        }
    }
    v_out
}
