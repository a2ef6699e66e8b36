//! Message decoder
//!
//! Wire format: UTF-8 text, fields joined by `;`, field 0 is the source id.
//!
//! | listener            | minimum shape                              |
//! |---------------------|--------------------------------------------|
//! | task failure        | `sourceId;taskName;appName`                |
//! | session/connection  | `sourceId;subType;userDirectory;userId`    |
//!
//! Fields past the minimum are ignored. Field values are kept verbatim.

use chrono::{DateTime, Utc};
use contracts::{Event, ListenerKind, SessionSubType};

use crate::error::{DecodeError, MalformedReason};

pub const FIELD_DELIMITER: char = ';';

/// Minimum field count (source id included) for a listener's datagrams
pub fn min_fields(listener: ListenerKind) -> usize {
    match listener {
        ListenerKind::TaskFailure => 3,
        ListenerKind::SessionConnection => 4,
    }
}

/// Decode a raw datagram, stamping it with the current time
pub fn decode(listener: ListenerKind, raw: &[u8]) -> Result<Event, DecodeError> {
    decode_at(listener, raw, Utc::now())
}

/// Decode a raw datagram with an explicit capture time
pub fn decode_at(
    listener: ListenerKind,
    raw: &[u8],
    timestamp: DateTime<Utc>,
) -> Result<Event, DecodeError> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| DecodeError::malformed(listener, MalformedReason::InvalidUtf8))?;

    let fields: Vec<&str> = text.split(FIELD_DELIMITER).collect();
    let expected = min_fields(listener);
    if fields.len() < expected {
        return Err(DecodeError::malformed(
            listener,
            MalformedReason::TooFewFields {
                expected,
                found: fields.len(),
            },
        ));
    }

    let event = match listener {
        ListenerKind::TaskFailure => Event::task_failure(fields[0], fields[1], fields[2]),
        ListenerKind::SessionConnection => {
            let sub_type: SessionSubType = fields[1].parse().map_err(|_| {
                DecodeError::malformed(
                    listener,
                    MalformedReason::UnknownSubType(fields[1].to_string()),
                )
            })?;
            Event::session(fields[0], sub_type, fields[2], fields[3])
        }
    };

    Ok(event.with_timestamp(timestamp))
}
