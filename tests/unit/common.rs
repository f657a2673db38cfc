//! Session command set shared by the integration tests.

use journal_rs::journal::{
    CommandBodyDecoder, CommandBodyEncoder, DecodeError, FieldReader, FieldWriter, Header,
    HeaderCodec, JournalConfig, JournalWriter, RecordDecoder, RecordEncoder,
};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Login { user: String, admin: bool },
    Message { text: String, priority: i64 },
    Logout,
    /// Only known to the newer codec.
    Ping { nonce: u64 },
}

/// The current codec: knows every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionCodec;

/// An older codec that predates `Ping`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacySessionCodec;

fn decode_known(
    command_name: &str,
    reader: &mut FieldReader<'_>,
    with_ping: bool,
) -> Result<Option<SessionCommand>, DecodeError> {
    let command = match command_name {
        "Login" => SessionCommand::Login {
            user: reader.read_string("user")?,
            admin: reader.read_bool("admin")?,
        },
        "Message" => SessionCommand::Message {
            text: reader.read_string("text")?,
            priority: reader.read_i64("priority")?,
        },
        "Logout" => SessionCommand::Logout,
        "Ping" if with_ping => SessionCommand::Ping {
            nonce: reader.read_u64("nonce")?,
        },
        _ => return Ok(None),
    };
    Ok(Some(command))
}

impl CommandBodyDecoder for SessionCodec {
    type Header = Header;
    type Command = SessionCommand;

    fn decode_body(
        &self,
        _header: &Header,
        command_name: &str,
        reader: &mut FieldReader<'_>,
    ) -> Result<Option<SessionCommand>, DecodeError> {
        decode_known(command_name, reader, true)
    }
}

impl CommandBodyDecoder for LegacySessionCodec {
    type Header = Header;
    type Command = SessionCommand;

    fn decode_body(
        &self,
        _header: &Header,
        command_name: &str,
        reader: &mut FieldReader<'_>,
    ) -> Result<Option<SessionCommand>, DecodeError> {
        decode_known(command_name, reader, false)
    }
}

impl CommandBodyEncoder for SessionCodec {
    type Command = SessionCommand;

    fn command_name<'a>(&'a self, command: &'a SessionCommand) -> &'a str {
        match command {
            SessionCommand::Login { .. } => "Login",
            SessionCommand::Message { .. } => "Message",
            SessionCommand::Logout => "Logout",
            SessionCommand::Ping { .. } => "Ping",
        }
    }

    fn encode_body(&self, command: &SessionCommand, writer: &mut FieldWriter<'_>) {
        match command {
            SessionCommand::Login { user, admin } => {
                writer.write_str(user);
                writer.write_bool(*admin);
            }
            SessionCommand::Message { text, priority } => {
                writer.write_str(text);
                writer.write_i64(*priority);
            }
            SessionCommand::Logout => {}
            SessionCommand::Ping { nonce } => writer.write_u64(*nonce),
        }
    }
}

pub fn decoder() -> RecordDecoder<HeaderCodec, SessionCodec> {
    RecordDecoder::new(HeaderCodec, SessionCodec)
}

pub fn legacy_decoder() -> RecordDecoder<HeaderCodec, LegacySessionCodec> {
    RecordDecoder::new(HeaderCodec, LegacySessionCodec)
}

pub fn open_writer(
    path: &Path,
    config: &JournalConfig,
) -> JournalWriter<HeaderCodec, SessionCodec> {
    let encoder = RecordEncoder::new(HeaderCodec, SessionCodec, config.line_break);
    JournalWriter::create(path, config, encoder).unwrap_or_else(|_| panic!("create journal writer"))
}

/// Writes every `(header, command)` pair and closes the journal.
pub fn write_all(path: &Path, config: &JournalConfig, records: &[(Header, SessionCommand)]) {
    let mut writer = open_writer(path, config);
    for (header, command) in records {
        writer.accept(header, command).unwrap_or_else(|_| panic!("accept"));
    }
    writer.close().unwrap_or_else(|_| panic!("close"));
}
