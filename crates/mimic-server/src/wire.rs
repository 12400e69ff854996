use std::io;

use bson::Document;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const OP_MSG: i32 = 2013;

/// Frames larger than this are rejected outright.
const MAX_MESSAGE_SIZE: usize = 48 * 1024 * 1024;

const HEADER_LEN: usize = 16;

/// The fixed message header carried by every frame.
#[derive(Debug, Clone, Copy)]
pub struct MsgHeader {
    pub request_id: i32,
    pub response_to: i32,
}

/// A kind-0 `OP_MSG` frame: a single top-level command document.
///
/// Kind-1 document sequences and frame checksums are not supported; the
/// codec rejects them instead of misreading them.
#[derive(Debug, Clone)]
pub struct OpMsg {
    document: Document,
}

impl OpMsg {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// The top-level command document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Replace the frame's body with a reply document.
    pub fn set_sections(&mut self, document: Document) {
        self.document = document;
    }
}

/// Read one frame. `Ok(None)` means the peer closed cleanly between frames.
pub async fn read_message<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> io::Result<Option<(MsgHeader, OpMsg)>> {
    let mut head = [0u8; HEADER_LEN];
    match reader.read_exact(&mut head).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e),
    }

    let message_length = read_i32(&head[0..4])? as usize;
    let header = MsgHeader {
        request_id: read_i32(&head[4..8])?,
        response_to: read_i32(&head[8..12])?,
    };
    let op_code = read_i32(&head[12..16])?;

    if op_code != OP_MSG {
        return Err(invalid(format!("unsupported opcode {op_code}")));
    }
    // flags (4) + section kind (1) + an empty document (5)
    if message_length < HEADER_LEN + 10 {
        return Err(invalid("frame too short"));
    }
    if message_length > MAX_MESSAGE_SIZE {
        return Err(invalid("frame exceeds the maximum message size"));
    }

    let mut body = vec![0u8; message_length - HEADER_LEN];
    reader.read_exact(&mut body).await?;

    let flags = u32::from_le_bytes([body[0], body[1], body[2], body[3]]);
    if flags & 0x1 != 0 {
        return Err(invalid("checksummed frames are not supported"));
    }
    if body[4] != 0 {
        return Err(invalid("only kind-0 sections are supported"));
    }

    let document =
        Document::from_reader(&mut &body[5..]).map_err(|e| invalid(e.to_string()))?;

    Ok(Some((header, OpMsg::new(document))))
}

/// Write one reply frame, echoing `response_to` from the request.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    msg: &OpMsg,
    request_id: i32,
    response_to: i32,
) -> io::Result<()> {
    let mut doc_bytes = Vec::new();
    msg.document
        .to_writer(&mut doc_bytes)
        .map_err(|e| invalid(e.to_string()))?;

    let message_length = (HEADER_LEN + 4 + 1 + doc_bytes.len()) as i32;
    let mut frame = Vec::with_capacity(message_length as usize);
    frame.extend_from_slice(&message_length.to_le_bytes());
    frame.extend_from_slice(&request_id.to_le_bytes());
    frame.extend_from_slice(&response_to.to_le_bytes());
    frame.extend_from_slice(&OP_MSG.to_le_bytes());
    frame.extend_from_slice(&0u32.to_le_bytes());
    frame.push(0);
    frame.extend_from_slice(&doc_bytes);

    writer.write_all(&frame).await?;
    writer.flush().await
}

fn read_i32(buf: &[u8]) -> io::Result<i32> {
    buf.try_into()
        .map(i32::from_le_bytes)
        .map_err(|_| invalid("truncated header"))
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}
