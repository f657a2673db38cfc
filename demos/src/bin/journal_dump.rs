// demos/src/bin/journal_dump.rs
//
// Dumps a journal without knowing its command set. Every record is printed
// with its header, command name and raw body fields.
//
// Run this demo with:
//   cargo run --bin journal_dump -- path/to/config.json
//
// Without an argument a small journal is written to a scratch directory
// first, using `|#` as the line break, and dumped from there.

use journal_rs::prelude::*;
use tracing::{info, warn};

/// A command seen only through its name and unescaped body tokens.
#[derive(Debug)]
struct RawCommand {
    name: String,
    fields: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct RawCodec;

impl CommandBodyDecoder for RawCodec {
    type Header = Header;
    type Command = RawCommand;

    fn decode_body(
        &self,
        _header: &Header,
        command_name: &str,
        reader: &mut FieldReader<'_>,
    ) -> Result<Option<RawCommand>, DecodeError> {
        let mut fields = Vec::with_capacity(reader.remaining_fields());
        while !reader.is_exhausted() {
            fields.push(reader.read_string("field")?);
        }
        Ok(Some(RawCommand {
            name: command_name.to_string(),
            fields,
        }))
    }
}

impl CommandBodyEncoder for RawCodec {
    type Command = RawCommand;

    fn command_name<'a>(&'a self, command: &'a RawCommand) -> &'a str {
        &command.name
    }

    fn encode_body(&self, command: &RawCommand, writer: &mut FieldWriter<'_>) {
        for field in &command.fields {
            writer.write_str(field);
        }
    }
}

fn write_sample(config: &JournalConfig) -> Result<(), JournalError> {
    let encoder = RecordEncoder::new(HeaderCodec, RawCodec, config.line_break);
    let mut writer = JournalWriter::create(config.active_path(), config, encoder)?;
    let mut clock = StampClock::new();

    let login = clock.next_stamp();
    writer.accept(
        &Header::upward(login, "desk-7").with_tag("morning shift"),
        &RawCommand {
            name: "Login".into(),
            fields: vec!["trader one".into(), "true".into()],
        },
    )?;
    writer.accept(
        &Header::upward(clock.next_stamp(), "desk-7")
            .with_kind(Kind::Downward)
            .with_cause(login),
        &RawCommand {
            name: "Welcome".into(),
            fields: vec!["pipes | and # hashes".into()],
        },
    )?;
    writer.accept(
        &Header::upward(clock.next_stamp(), "desk-7"),
        &RawCommand {
            name: "Logout".into(),
            fields: Vec::new(),
        },
    )?;
    writer.close()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let scratch = tempfile::tempdir()?;
    let config = match std::env::args().nth(1) {
        Some(path) => JournalConfig::load(path)?,
        None => {
            let mut config = JournalConfig::new(scratch.path().join("sample.journal"));
            config.line_break = LineBreak::double(b'|', b'#');
            config.application_version = env!("CARGO_PKG_VERSION").to_string();
            write_sample(&config)?;
            config
        }
    };
    info!("config: {}", serde_json::to_string_pretty(&config)?);

    let path = match FileIdentity::detect(&config)? {
        FileIdentity::Absent => {
            warn!(base = %config.base_path.display(), "no journal found");
            return Ok(());
        }
        FileIdentity::Active => config.active_path(),
        FileIdentity::Recovering => config.recovery_path(),
        FileIdentity::Recovered => config.recovered_path(),
    };

    let mut reader =
        JournalReader::open(&path, 0, &config, RecordDecoder::new(HeaderCodec, RawCodec))?;
    if let Some(schema) = reader.schema() {
        info!(
            schema_version = schema.schema_version,
            application_version = %schema.application_version,
            path = %path.display(),
            "schema header"
        );
    }

    for record in reader.by_ref() {
        let JournalRecord { header, command } = record?;
        info!(
            stamp = %header.stamp,
            session = %header.session_id,
            kind = %header.kind,
            cause = ?header.cause.map(|c| c.to_string()),
            tag = ?header.tag,
            command = %command.name,
            fields = ?command.fields,
            "record"
        );
    }
    info!(records = reader.records_consumed(), "done");
    Ok(())
}
