use bytes::{Buf, BufMut, Bytes};

use http::{HeaderMap, Method, StatusCode};

use super::{Error, Head, Kind, StreamId};

const END_STREAM: u8 = 0x1;
const END_HEADERS: u8 = 0x4;
const PADDED: u8 = 0x8;
const PRIORITY: u8 = 0x20;

/// The HTTP/2 pseudo-headers, which must be serialized before any regular
/// header field (RFC 7540 §8.1.2.1).
#[derive(Debug, Default, Clone)]
pub struct Pseudo {
    pub method: Option<Method>,
    pub scheme: Option<String>,
    pub authority: Option<String>,
    pub path: Option<String>,
    pub status: Option<StatusCode>,
}

impl Pseudo {
    pub fn request(method: Method, scheme: String, authority: Option<String>, path: String) -> Pseudo {
        Pseudo {
            method: Some(method),
            scheme: Some(scheme),
            authority,
            path: Some(path),
            status: None,
        }
    }

    pub fn response(status: StatusCode) -> Pseudo {
        Pseudo {
            status: Some(status),
            ..Pseudo::default()
        }
    }

    pub fn is_informational(&self) -> bool {
        self.status
            .map(|s| s.is_informational())
            .unwrap_or(false)
    }
}

/// Uncompressed header-list size, RFC 7541 §4.1's accounting convention (32
/// bytes of overhead per entry, on top of the name/value bytes themselves).
/// Used for the header byte counters in [`crate::streams::StreamMetrics`],
/// which track what went into HPACK, not what came out of it.
pub(crate) fn header_list_size(pseudo: &Pseudo, fields: &HeaderMap) -> u64 {
    const ENTRY_OVERHEAD: u64 = 32;

    let mut total = 0u64;

    if let Some(ref method) = pseudo.method {
        total += method.as_str().len() as u64 + b":method".len() as u64 + ENTRY_OVERHEAD;
    }
    if let Some(ref scheme) = pseudo.scheme {
        total += scheme.len() as u64 + b":scheme".len() as u64 + ENTRY_OVERHEAD;
    }
    if let Some(ref authority) = pseudo.authority {
        total += authority.len() as u64 + b":authority".len() as u64 + ENTRY_OVERHEAD;
    }
    if let Some(ref path) = pseudo.path {
        total += path.len() as u64 + b":path".len() as u64 + ENTRY_OVERHEAD;
    }
    if let Some(status) = pseudo.status {
        total += status.as_str().len() as u64 + b":status".len() as u64 + ENTRY_OVERHEAD;
    }

    for (name, value) in fields.iter() {
        total += name.as_str().len() as u64 + value.len() as u64 + ENTRY_OVERHEAD;
    }

    total
}

/// A `HEADERS` frame: carries either request or response pseudo/regular
/// headers for a single stream.
///
/// CONTINUATION frames are not supported: a peer whose header block does
/// not fit into one HEADERS frame is rejected with
/// [`Error::ContinuationUnsupported`]. Real deployments keep header lists
/// well under one frame; this is a deliberate scope cut for this engine,
/// not a spec requirement (see DESIGN.md).
#[derive(Debug)]
pub struct Headers {
    stream_id: StreamId,
    pseudo: Pseudo,
    fields: HeaderMap,
    end_stream: bool,
}

impl Headers {
    pub fn new(stream_id: StreamId, pseudo: Pseudo, fields: HeaderMap, end_stream: bool) -> Headers {
        Headers {
            stream_id,
            pseudo,
            fields,
            end_stream,
        }
    }

    pub fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    pub fn pseudo(&self) -> &Pseudo {
        &self.pseudo
    }

    pub fn fields(&self) -> &HeaderMap {
        &self.fields
    }

    pub fn is_end_stream(&self) -> bool {
        self.end_stream
    }

    pub fn into_parts(self) -> (Pseudo, HeaderMap) {
        (self.pseudo, self.fields)
    }

    pub fn load(
        head: Head,
        mut payload: Bytes,
        decoder: &mut hpack::Decoder<'static>,
    ) -> Result<Headers, Error> {
        if head.stream_id().is_zero() {
            return Err(Error::InvalidStreamId);
        }

        if head.flag() & END_HEADERS == 0 {
            return Err(Error::ContinuationUnsupported);
        }

        if head.flag() & PADDED != 0 {
            if payload.is_empty() {
                return Err(Error::TooMuchPadding);
            }
            let pad_len = payload[0] as usize;
            payload.advance(1);
            if pad_len > payload.len() {
                return Err(Error::TooMuchPadding);
            }
            payload.truncate(payload.len() - pad_len);
        }

        if head.flag() & PRIORITY != 0 {
            if payload.len() < 5 {
                return Err(Error::PayloadTooShort);
            }
            // Stream dependency/weight is advisory for a response; this
            // engine does not act on server-advertised priority.
            payload.advance(5);
        }

        let decoded = decoder.decode(&payload).map_err(|_| Error::Hpack)?;

        let mut pseudo = Pseudo::default();
        let mut fields = HeaderMap::new();

        for (name, value) in decoded {
            if name.first() == Some(&b':') {
                match &name[..] {
                    b":status" => {
                        let code = std::str::from_utf8(&value)
                            .ok()
                            .and_then(|s| s.parse::<u16>().ok())
                            .and_then(|c| StatusCode::from_u16(c).ok())
                            .ok_or(Error::Hpack)?;
                        pseudo.status = Some(code);
                    }
                    b":method" => {
                        pseudo.method =
                            Some(Method::from_bytes(&value).map_err(|_| Error::Hpack)?);
                    }
                    b":scheme" => {
                        pseudo.scheme = Some(String::from_utf8(value).map_err(|_| Error::Hpack)?);
                    }
                    b":authority" => {
                        pseudo.authority =
                            Some(String::from_utf8(value).map_err(|_| Error::Hpack)?);
                    }
                    b":path" => {
                        pseudo.path = Some(String::from_utf8(value).map_err(|_| Error::Hpack)?);
                    }
                    _ => return Err(Error::Hpack),
                }
            } else {
                let hname =
                    http::HeaderName::from_bytes(&name).map_err(|_| Error::Hpack)?;
                let hvalue =
                    http::HeaderValue::from_bytes(&value).map_err(|_| Error::Hpack)?;
                fields.append(hname, hvalue);
            }
        }

        Ok(Headers {
            stream_id: head.stream_id(),
            pseudo,
            fields,
            end_stream: head.flag() & END_STREAM != 0,
        })
    }

    pub fn encode(&self, encoder: &mut hpack::Encoder<'static>, dst: &mut bytes::BytesMut) {
        let flag = {
            let mut f = END_HEADERS;
            if self.end_stream {
                f |= END_STREAM;
            }
            f
        };
        let head = Head::new(Kind::Headers, flag, self.stream_id);
        let pos = dst.len();
        head.encode(0, dst);

        let mut pairs: Vec<(&[u8], &[u8])> = Vec::new();

        if let Some(ref method) = self.pseudo.method {
            pairs.push((b":method", method.as_str().as_bytes()));
        }
        if let Some(ref scheme) = self.pseudo.scheme {
            pairs.push((b":scheme", scheme.as_bytes()));
        }
        if let Some(ref authority) = self.pseudo.authority {
            pairs.push((b":authority", authority.as_bytes()));
        }
        if let Some(ref path) = self.pseudo.path {
            pairs.push((b":path", path.as_bytes()));
        }

        for (name, value) in self.fields.iter() {
            pairs.push((name.as_str().as_bytes(), value.as_bytes()));
        }

        let encoded = encoder.encode(pairs.into_iter());
        dst.put_slice(&encoded);

        let len = dst.len() - pos - super::HEADER_LEN;
        let len_bytes = (len as u32).to_be_bytes();
        dst[pos] = len_bytes[1];
        dst[pos + 1] = len_bytes[2];
        dst[pos + 2] = len_bytes[3];
    }
}

impl From<Headers> for super::Frame {
    fn from(src: Headers) -> Self {
        super::Frame::Headers(src)
    }
}
