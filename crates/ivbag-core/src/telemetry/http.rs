//! Minimal HTTP/1.1 codec for the ThingSpeak update endpoint
//!
//! Only what a single `POST /update` exchange needs: request framing with a
//! known `Content-Length`, and response parsing for status line, the two
//! framing headers and a plain or chunked body.

use core::fmt::Write;

use heapless::{String, Vec};
use thiserror_no_std::Error;

use super::payload::{PayloadError, TelemetryPayload};
use super::ChannelCredentials;

pub const REQUEST_CAPACITY: usize = 512;
/// Bodies longer than this are truncated; an update answer is an entry id.
pub const BODY_CAPACITY: usize = 64;

/// Reported for a `200` whose body is `0`: the channel refused the entry.
pub const STATUS_NOT_INSERTED: i32 = -401;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    #[error("payload encoding failed: {0}")]
    Payload(PayloadError),
    #[error("request exceeds buffer capacity")]
    Capacity,
    #[error("response ended before headers or body were complete")]
    Incomplete,
    #[error("malformed status line")]
    MalformedStatusLine,
    #[error("malformed header")]
    MalformedHeader,
    #[error("malformed chunk")]
    MalformedChunk,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8, BODY_CAPACITY>,
}

impl HttpResponse {
    pub fn body_str(&self) -> &str {
        core::str::from_utf8(&self.body).unwrap_or("").trim()
    }

    /// Status as the channel client reports it, see [`STATUS_NOT_INSERTED`].
    pub fn write_status(&self) -> i32 {
        if self.status == 200 && self.body_str() == "0" {
            STATUS_NOT_INSERTED
        } else {
            i32::from(self.status)
        }
    }
}

pub fn build_update_request(
    host: &str,
    credentials: &ChannelCredentials<'_>,
    payload: &TelemetryPayload,
) -> Result<String<REQUEST_CAPACITY>, HttpError> {
    let form = payload
        .encode_form(credentials.write_key)
        .map_err(HttpError::Payload)?;

    let mut request = String::new();
    write!(
        request,
        "POST /update HTTP/1.1\r\n\
         Host: {}\r\n\
         Connection: close\r\n\
         Content-Type: application/x-www-form-urlencoded\r\n\
         Content-Length: {}\r\n\
         \r\n\
         {}",
        host,
        form.len(),
        form
    )
    .map_err(|_| HttpError::Capacity)?;
    Ok(request)
}

pub fn parse_response(raw: &[u8]) -> Result<HttpResponse, HttpError> {
    let header_end = find(raw, b"\r\n\r\n").ok_or(HttpError::Incomplete)?;
    let head = core::str::from_utf8(&raw[..header_end]).map_err(|_| HttpError::MalformedHeader)?;

    let mut lines = head.split("\r\n");
    let status = parse_status_line(lines.next().unwrap_or(""))?;

    let mut chunked = false;
    let mut content_length = None;
    for line in lines {
        let (name, value) = line.split_once(':').ok_or(HttpError::MalformedHeader)?;
        let (name, value) = (name.trim(), value.trim());
        if name.eq_ignore_ascii_case("transfer-encoding") {
            chunked = value.eq_ignore_ascii_case("chunked");
        } else if name.eq_ignore_ascii_case("content-length") {
            let length = value.parse::<usize>().map_err(|_| HttpError::MalformedHeader)?;
            content_length = Some(length);
        }
    }

    let rest = &raw[header_end + 4..];
    let mut body = Vec::new();
    if chunked {
        decode_chunked(rest, &mut body)?;
    } else {
        let content = match content_length {
            Some(length) => rest.get(..length).ok_or(HttpError::Incomplete)?,
            None => rest,
        };
        extend_truncated(&mut body, content);
    }

    Ok(HttpResponse { status, body })
}

fn parse_status_line(line: &str) -> Result<u16, HttpError> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some(version), Some(code)) if version.starts_with("HTTP/") => {
            code.parse().map_err(|_| HttpError::MalformedStatusLine)
        }
        _ => Err(HttpError::MalformedStatusLine),
    }
}

fn decode_chunked(mut rest: &[u8], body: &mut Vec<u8, BODY_CAPACITY>) -> Result<(), HttpError> {
    loop {
        let line_end = find(rest, b"\r\n").ok_or(HttpError::Incomplete)?;
        let size_line =
            core::str::from_utf8(&rest[..line_end]).map_err(|_| HttpError::MalformedChunk)?;
        // chunk extensions after ';' are ignored
        let size_text = size_line.split(';').next().unwrap_or("").trim();
        let size = usize::from_str_radix(size_text, 16).map_err(|_| HttpError::MalformedChunk)?;
        if size == 0 {
            return Ok(());
        }

        let data_start = line_end + 2;
        let data_end = data_start
            .checked_add(size)
            .ok_or(HttpError::MalformedChunk)?;
        let data = rest
            .get(data_start..data_end)
            .ok_or(HttpError::Incomplete)?;
        extend_truncated(body, data);

        rest = rest
            .get(data_end..)
            .and_then(|tail| tail.strip_prefix(b"\r\n"))
            .ok_or(HttpError::MalformedChunk)?;
    }
}

fn extend_truncated(body: &mut Vec<u8, BODY_CAPACITY>, data: &[u8]) {
    let room = BODY_CAPACITY - body.len();
    let take = data.len().min(room);
    // cannot fail, `take` fits the remaining capacity
    let _ = body.extend_from_slice(&data[..take]);
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::Measurement;

    const CREDENTIALS: ChannelCredentials<'static> = ChannelCredentials {
        channel_id: 123_456,
        write_key: "WRITEKEY",
    };

    #[test]
    fn builds_update_request() {
        let payload = TelemetryPayload::from_measurement(&Measurement {
            weight_units: 0.3,
            volume_ml: 300,
            fill_percent: 59,
        });
        let request = build_update_request("api.thingspeak.com", &CREDENTIALS, &payload).unwrap();

        let body = "api_key=WRITEKEY&field1=300&field2=59";
        assert!(request.starts_with("POST /update HTTP/1.1\r\nHost: api.thingspeak.com\r\n"));
        assert!(request.contains("Content-Type: application/x-www-form-urlencoded\r\n"));
        assert!(request.contains(&std::format!("Content-Length: {}\r\n\r\n", body.len())));
        assert!(request.ends_with(body));
    }

    #[test]
    fn parses_plain_response() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 4\r\n\r\n1234";
        let response = parse_response(raw).unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body_str(), "1234");
        assert_eq!(response.write_status(), 200);
    }

    #[test]
    fn parses_chunked_response() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\n98\r\n1;x=y\r\n7\r\n0\r\n\r\n";
        let response = parse_response(raw).unwrap();

        assert_eq!(response.body_str(), "987");
    }

    #[test]
    fn refused_entry_maps_to_not_inserted() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Length: 1\r\n\r\n0";
        assert_eq!(parse_response(raw).unwrap().write_status(), STATUS_NOT_INSERTED);
    }

    #[test]
    fn server_errors_pass_through() {
        let raw = b"HTTP/1.1 500 Internal Server Error\r\nConnection: close\r\n\r\n";
        let response = parse_response(raw).unwrap();

        assert_eq!(response.write_status(), 500);
        assert!(response.body.is_empty());
    }

    #[test]
    fn rejects_truncated_and_malformed() {
        assert_eq!(parse_response(b"HTTP/1.1 200 OK\r\n"), Err(HttpError::Incomplete));
        assert_eq!(
            parse_response(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc"),
            Err(HttpError::Incomplete)
        );
        assert_eq!(
            parse_response(b"garbage\r\n\r\n"),
            Err(HttpError::MalformedStatusLine)
        );
        assert_eq!(
            parse_response(b"HTTP/1.1 200 OK\r\nno-colon\r\n\r\n"),
            Err(HttpError::MalformedHeader)
        );
    }

    #[test]
    fn rejects_chunk_size_past_address_space() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nFFFFFFFFFFFFFFFF\r\n1\r\n0\r\n\r\n";
        assert_eq!(parse_response(raw), Err(HttpError::MalformedChunk));
    }

    #[test]
    fn truncates_long_bodies() {
        let mut raw = std::vec::Vec::from(&b"HTTP/1.1 200 OK\r\n\r\n"[..]);
        raw.extend(core::iter::repeat_n(b'x', BODY_CAPACITY * 2));

        assert_eq!(parse_response(&raw).unwrap().body.len(), BODY_CAPACITY);
    }
}
