use bytes::{BufMut, BytesMut};

use super::{
    error::{Error, Result},
    header::{Header, Headers},
    interleaved::{Data, MAGIC},
    message::{Bytes, Message},
    request::Request,
    response::Response,
};

pub trait Serialize {
    fn serialize(self, dst: &mut BytesMut) -> Result<()>;
}

impl Serialize for Message {
    fn serialize(self, dst: &mut BytesMut) -> Result<()> {
        match self {
            Message::Request(request) => request.serialize(dst),
            Message::Response(response) => response.serialize(dst),
            Message::Data(data) => data.serialize(dst),
        }
    }
}

impl Serialize for Request {
    fn serialize(self, dst: &mut BytesMut) -> Result<()> {
        dst.put(self.method.as_str().as_bytes());
        dst.put_u8(b' ');
        dst.put(self.uri.to_string().as_bytes());
        dst.put_u8(b' ');
        dst.put(self.version.as_str().as_bytes());
        dst.put(&b"\r\n"[..]);

        serialize_head_and_body(&self.headers, self.body, dst);
        Ok(())
    }
}

impl Serialize for Response {
    fn serialize(self, dst: &mut BytesMut) -> Result<()> {
        dst.put(self.version.as_str().as_bytes());
        dst.put_u8(b' ');
        dst.put(self.status.to_string().as_bytes());
        dst.put_u8(b' ');
        dst.put(self.reason.as_bytes());
        dst.put(&b"\r\n"[..]);

        serialize_head_and_body(&self.headers, self.body, dst);
        Ok(())
    }
}

impl Serialize for Data {
    fn serialize(self, dst: &mut BytesMut) -> Result<()> {
        let len = u16::try_from(self.payload.len()).map_err(|_| Error::InterleavedPayloadTooLarge)?;
        dst.reserve(4 + self.payload.len());
        dst.put_u8(MAGIC);
        dst.put_u8(self.channel);
        dst.put_u16(len);
        dst.put(self.payload);
        Ok(())
    }
}

/// Headers in wire order: `CSeq`, `Session`, everything else, then a
/// `Content-Length` computed from the body.
fn serialize_head_and_body(headers: &Headers, body: Option<Bytes>, dst: &mut BytesMut) {
    let leading = [Header::CSeq, Header::Session];
    for header in leading {
        for value in headers.get_all(header) {
            put_header(dst, header, value);
        }
    }

    for (header, value) in headers.iter() {
        if !leading.contains(&header) && header != Header::ContentLength {
            put_header(dst, header, value);
        }
    }

    match body {
        Some(body) if !body.is_empty() => {
            put_header(dst, Header::ContentLength, &body.len().to_string());
            dst.put(&b"\r\n"[..]);
            dst.put(body);
        }
        _ => {
            dst.put(&b"\r\n"[..]);
        }
    }
}

fn put_header(dst: &mut BytesMut, header: Header, value: &str) {
    dst.put(header.as_str().as_bytes());
    dst.put(&b": "[..]);
    dst.put(value.as_bytes());
    dst.put(&b"\r\n"[..]);
}
