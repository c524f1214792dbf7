use std::fmt;

use bytes::BufMut;
use bytes::Bytes;
use bytes::BytesMut;

use crate::ChangeKind;
use crate::RawChangeNotification;
use crate::TranslationError;

/// Client-facing event name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventName {
    Upsert,
    Delete,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::Upsert => "Upsert",
            EventName::Delete => "Delete",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sequenced event as written to the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireEvent {
    /// Position within the owning subscription, starting at 0
    pub id: u64,
    pub name: EventName,
    /// Serialized route record, passed through untouched
    pub data: Bytes,
}

impl WireEvent {
    /// Serializes the event in server-sent event framing.
    ///
    /// Payload lines are split on `\n` and each gets its own `data:` line.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.data.len() + 32);

        buf.put_slice(b"id: ");
        buf.put_slice(self.id.to_string().as_bytes());
        buf.put_slice(b"\nevent: ");
        buf.put_slice(self.name.as_str().as_bytes());
        buf.put_u8(b'\n');

        for line in self.data.split(|b| *b == b'\n') {
            buf.put_slice(b"data: ");
            buf.put_slice(line);
            buf.put_u8(b'\n');
        }

        buf.put_u8(b'\n');
        buf.freeze()
    }
}

/// Maps a store notification onto the wire.
///
/// | kind            | name   | data          |
/// |-----------------|--------|---------------|
/// | Create, Update  | Upsert | new value     |
/// | Delete, Expire  | Delete | previous value|
/// | anything else   | error  |               |
///
/// A notification whose data source is absent is rejected as well, so
/// nothing half-formed ever reaches a client.
pub fn translate(
    notification: RawChangeNotification,
    id: u64,
) -> Result<WireEvent, TranslationError> {
    let kind = notification.kind;
    let (name, source) = match kind {
        ChangeKind::Create | ChangeKind::Update => (EventName::Upsert, notification.node),
        ChangeKind::Delete | ChangeKind::Expire => (EventName::Delete, notification.prev_node),
        ChangeKind::Invalid => return Err(TranslationError::InvalidKind),
        ChangeKind::Unrecognized(code) => return Err(TranslationError::UnrecognizedKind(code)),
    };

    let node = source.ok_or(TranslationError::MissingPayload { kind })?;

    Ok(WireEvent {
        id,
        name,
        data: node.value,
    })
}
