//! Record metadata: stamps, headers and the schema header line.

use super::codec::{HeaderDecoder, HeaderEncoder};
use super::error::DecodeError;
use super::fields::{FieldReader, FieldWriter};
use crate::utils::current_time_millis;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A `(timestamp, counter)` pair giving every record a total order.
///
/// Stamps compare by timestamp first, then by counter. The text form is
/// `<timestamp>:<counter>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Stamp {
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Disambiguates stamps created within the same millisecond.
    pub counter: u32,
}

impl Stamp {
    /// Creates a stamp.
    #[must_use]
    pub const fn new(timestamp: u64, counter: u32) -> Self {
        Self { timestamp, counter }
    }
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.timestamp, self.counter)
    }
}

impl FromStr for Stamp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (timestamp, counter) = s
            .split_once(':')
            .ok_or_else(|| format!("expected <timestamp>:<counter>, got {s:?}"))?;
        let timestamp = timestamp
            .parse::<u64>()
            .map_err(|e| format!("timestamp: {e}"))?;
        let counter = counter.parse::<u32>().map_err(|e| format!("counter: {e}"))?;
        Ok(Self { timestamp, counter })
    }
}

/// Direction of a command relative to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// Sent by a client to the service.
    Upward,
    /// Sent by the service to a client.
    Downward,
    /// Produced and consumed inside the service.
    Internal,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Upward => "UPWARD",
            Kind::Downward => "DOWNWARD",
            Kind::Internal => "INTERNAL",
        })
    }
}

impl FromStr for Kind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UPWARD" => Ok(Kind::Upward),
            "DOWNWARD" => Ok(Kind::Downward),
            "INTERNAL" => Ok(Kind::Internal),
            other => Err(format!("unknown kind {other:?}")),
        }
    }
}

/// Metadata recorded in front of every command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Total order of the record.
    pub stamp: Stamp,
    /// Session the command belongs to.
    pub session_id: String,
    /// Direction of the command.
    pub kind: Kind,
    /// Stamp of the command that caused this one, if any.
    pub cause: Option<Stamp>,
    /// Tag assigned by the client, if any.
    pub tag: Option<String>,
}

impl Header {
    /// Creates an upward header with no cause and no tag.
    #[must_use]
    pub fn upward(stamp: Stamp, session_id: impl Into<String>) -> Self {
        Self {
            stamp,
            session_id: session_id.into(),
            kind: Kind::Upward,
            cause: None,
            tag: None,
        }
    }

    /// Sets the causing stamp.
    #[must_use]
    pub fn with_cause(mut self, cause: Stamp) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Sets the client tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Sets the kind.
    #[must_use]
    pub fn with_kind(mut self, kind: Kind) -> Self {
        self.kind = kind;
        self
    }
}

/// The bundled [`Header`] codec.
///
/// Layout: `<stamp> <session-id> <kind> <cause> <tag> `, with absent
/// `cause` / `tag` written as the null token.
///
/// Files written with it are not readable with [`SessionHeaderCodec`] and
/// the other way round: the compact `<stamp> <session-id> <command> ...`
/// layout has no kind token, so `HeaderCodec` fails on the command name
/// with an invalid `kind` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderCodec;

impl HeaderEncoder for HeaderCodec {
    type Header = Header;

    fn encode(&self, header: &Header, writer: &mut FieldWriter<'_>) {
        writer.write_display(&header.stamp);
        writer.write_str(&header.session_id);
        writer.write_display(&header.kind);
        writer.write_opt_display(header.cause.as_ref());
        writer.write_opt_str(header.tag.as_deref());
    }
}

impl HeaderDecoder for HeaderCodec {
    type Header = Header;

    fn decode(&self, reader: &mut FieldReader<'_>) -> Result<Header, DecodeError> {
        Ok(Header {
            stamp: reader.read_parsed("stamp")?,
            session_id: reader.read_string("session_id")?,
            kind: reader.read_parsed("kind")?,
            cause: reader.read_opt_parsed("cause")?,
            tag: reader.read_opt_string("tag")?,
        })
    }
}

/// Header of the compact layout: a stamp and a session id only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionHeader {
    /// Total order of the record.
    pub stamp: Stamp,
    /// Session the command belongs to.
    pub session_id: String,
}

impl SessionHeader {
    #[must_use]
    pub fn new(stamp: Stamp, session_id: impl Into<String>) -> Self {
        Self {
            stamp,
            session_id: session_id.into(),
        }
    }
}

impl From<Header> for SessionHeader {
    fn from(header: Header) -> Self {
        Self {
            stamp: header.stamp,
            session_id: header.session_id,
        }
    }
}

/// Codec for [`SessionHeader`], writing `<stamp> <session-id> `.
///
/// Data lines then read `<timestamp>:<counter> <session-id> <command> <field>... `.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionHeaderCodec;

impl HeaderEncoder for SessionHeaderCodec {
    type Header = SessionHeader;

    fn encode(&self, header: &SessionHeader, writer: &mut FieldWriter<'_>) {
        writer.write_display(&header.stamp);
        writer.write_str(&header.session_id);
    }
}

impl HeaderDecoder for SessionHeaderCodec {
    type Header = SessionHeader;

    fn decode(&self, reader: &mut FieldReader<'_>) -> Result<SessionHeader, DecodeError> {
        Ok(SessionHeader {
            stamp: reader.read_parsed("stamp")?,
            session_id: reader.read_string("session_id")?,
        })
    }
}

const SCHEMA_VERSION_KEYWORD: &[u8] = b"SchemaVersion";
const APPLICATION_VERSION_KEYWORD: &[u8] = b"ApplicationVersion";

/// The first line of every journal file.
///
/// Text form: `SchemaVersion <n> ApplicationVersion <string> `.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaHeader {
    /// Version of the record layout.
    pub schema_version: u32,
    /// Version of the application that wrote the file (informational).
    pub application_version: String,
}

impl SchemaHeader {
    /// Creates a schema header.
    #[must_use]
    pub fn new(schema_version: u32, application_version: impl Into<String>) -> Self {
        Self {
            schema_version,
            application_version: application_version.into(),
        }
    }

    /// Writes the header line fields.
    pub fn encode(&self, writer: &mut FieldWriter<'_>) {
        writer.write_raw(SCHEMA_VERSION_KEYWORD);
        writer.write_u64(u64::from(self.schema_version));
        writer.write_raw(APPLICATION_VERSION_KEYWORD);
        writer.write_str(&self.application_version);
    }

    /// Parses the header line fields.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] if a keyword is wrong, a field is missing or
    /// malformed, or extra fields follow.
    pub fn decode(reader: &mut FieldReader<'_>) -> Result<Self, DecodeError> {
        expect_keyword(reader, SCHEMA_VERSION_KEYWORD, "SchemaVersion")?;
        let schema_version = reader.read_parsed("schema_version")?;
        expect_keyword(reader, APPLICATION_VERSION_KEYWORD, "ApplicationVersion")?;
        let application_version = reader.read_string("application_version")?;
        reader.expect_end()?;
        Ok(Self {
            schema_version,
            application_version,
        })
    }
}

fn expect_keyword(
    reader: &mut FieldReader<'_>,
    keyword: &[u8],
    field: &'static str,
) -> Result<(), DecodeError> {
    let token = reader.read_raw(field)?;
    if token != keyword {
        return Err(DecodeError::InvalidField {
            field,
            value: String::from_utf8_lossy(token).into_owned(),
            reason: format!("expected keyword {field}"),
        });
    }
    Ok(())
}

/// Produces strictly increasing [`Stamp`]s from the wall clock.
///
/// Within one millisecond the counter is bumped; if the clock goes backwards
/// the last timestamp is kept. After replay, [`observe`](Self::observe) the
/// replayed stamps (or build the clock with
/// [`resume_after`](Self::resume_after)) so new stamps sort after them.
#[derive(Debug, Clone, Default)]
pub struct StampClock {
    last: Option<Stamp>,
}

impl StampClock {
    /// Creates a clock with no history.
    #[must_use]
    pub fn new() -> Self {
        Self { last: None }
    }

    /// Creates a clock whose next stamp is greater than `last`.
    #[must_use]
    pub fn resume_after(last: Stamp) -> Self {
        Self { last: Some(last) }
    }

    /// Records a stamp produced elsewhere (e.g. during replay).
    pub fn observe(&mut self, stamp: Stamp) {
        if self.last.is_none_or(|last| stamp > last) {
            self.last = Some(stamp);
        }
    }

    /// The most recent stamp produced or observed.
    #[must_use]
    pub fn last(&self) -> Option<Stamp> {
        self.last
    }

    /// Returns the next stamp for the current time.
    pub fn next_stamp(&mut self) -> Stamp {
        self.next_at(current_time_millis())
    }

    /// Returns the next stamp given the current time in milliseconds.
    pub fn next_at(&mut self, now_millis: u64) -> Stamp {
        let stamp = match self.last {
            Some(last) if now_millis <= last.timestamp => match last.counter.checked_add(1) {
                Some(counter) => Stamp::new(last.timestamp, counter),
                None => Stamp::new(last.timestamp.saturating_add(1), 0),
            },
            _ => Stamp::new(now_millis, 0),
        };
        self.last = Some(stamp);
        stamp
    }
}
