// demos/src/bin/recovery_demo.rs
//
// This demo walks a small account ledger through two process lifetimes:
//
// 1. The first run journals deposits and withdrawals, flushes, and then
//    "crashes" without closing the journal.
// 2. The second run recovers: it moves the journal aside, replays it to
//    rebuild the balances, marks it recovered and opens a fresh journal.
//
// Run this demo with:
//   cargo run --bin recovery_demo
//   (from the demos directory)

use journal_rs::prelude::*;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Debug, Clone)]
enum LedgerCommand {
    Deposit { account: String, amount: u64 },
    Withdraw { account: String, amount: u64 },
}

#[derive(Debug, Clone, Copy)]
struct LedgerCodec;

impl CommandBodyEncoder for LedgerCodec {
    type Command = LedgerCommand;

    fn command_name<'a>(&'a self, command: &'a LedgerCommand) -> &'a str {
        match command {
            LedgerCommand::Deposit { .. } => "Deposit",
            LedgerCommand::Withdraw { .. } => "Withdraw",
        }
    }

    fn encode_body(&self, command: &LedgerCommand, writer: &mut FieldWriter<'_>) {
        match command {
            LedgerCommand::Deposit { account, amount }
            | LedgerCommand::Withdraw { account, amount } => {
                writer.write_str(account);
                writer.write_u64(*amount);
            }
        }
    }
}

impl CommandBodyDecoder for LedgerCodec {
    type Header = Header;
    type Command = LedgerCommand;

    fn decode_body(
        &self,
        _header: &Header,
        command_name: &str,
        reader: &mut FieldReader<'_>,
    ) -> Result<Option<LedgerCommand>, DecodeError> {
        Ok(match command_name {
            "Deposit" => Some(LedgerCommand::Deposit {
                account: reader.read_string("account")?,
                amount: reader.read_u64("amount")?,
            }),
            "Withdraw" => Some(LedgerCommand::Withdraw {
                account: reader.read_string("account")?,
                amount: reader.read_u64("amount")?,
            }),
            _ => None,
        })
    }
}

#[derive(Debug, Default)]
struct Ledger {
    balances: BTreeMap<String, i128>,
}

impl Ledger {
    fn apply(&mut self, command: &LedgerCommand) {
        match command {
            LedgerCommand::Deposit { account, amount } => {
                *self.balances.entry(account.clone()).or_default() += i128::from(*amount);
            }
            LedgerCommand::Withdraw { account, amount } => {
                *self.balances.entry(account.clone()).or_default() -= i128::from(*amount);
            }
        }
    }
}

fn first_run(config: &JournalConfig) -> Result<(), JournalError> {
    info!("first run: journaling ledger commands");
    let encoder = RecordEncoder::new(HeaderCodec, LedgerCodec, config.line_break);
    let mut writer = JournalWriter::create(config.active_path(), config, encoder)?;
    let mut clock = StampClock::new();

    let commands = [
        LedgerCommand::Deposit { account: "alice".into(), amount: 500 },
        LedgerCommand::Deposit { account: "bob".into(), amount: 120 },
        LedgerCommand::Withdraw { account: "alice".into(), amount: 75 },
        LedgerCommand::Deposit { account: "carol smith".into(), amount: 1_000 },
        LedgerCommand::Withdraw { account: "bob".into(), amount: 20 },
    ];
    for (i, command) in commands.iter().enumerate() {
        let header = Header::upward(clock.next_stamp(), format!("session-{}", i % 2));
        writer.accept(&header, command)?;
    }
    writer.flush()?;
    info!(records = writer.records_written(), "flushed, simulating a crash");

    // Skip close(): the process dies with the journal still open.
    std::mem::forget(writer);
    Ok(())
}

fn second_run(config: &JournalConfig) -> Result<Ledger, JournalError> {
    info!(identity = ?FileIdentity::detect(config)?, "second run: recovering");

    let mut coordinator = RecoveryCoordinator::new(config.clone())?;
    if let Some(path) = coordinator.resolve_recovery_file()? {
        info!(path = %path.display(), "replaying");
    }

    let mut ledger = Ledger::default();
    let mut clock = StampClock::new();
    let decoder = RecordDecoder::new(HeaderCodec, LedgerCodec);
    let stats = coordinator.replay(0, decoder, |record| {
        clock.observe(record.header.stamp);
        ledger.apply(&record.command);
        Ok::<(), JournalError>(())
    })?;
    info!(
        applied = stats.records_applied,
        skipped_unknown = stats.skipped_unknown,
        "replay finished"
    );
    coordinator.rename_recovery_file_to_recovered()?;

    let encoder = RecordEncoder::new(HeaderCodec, LedgerCodec, config.line_break);
    let mut writer = JournalWriter::create(config.active_path(), config, encoder)?;
    let command = LedgerCommand::Deposit { account: "alice".into(), amount: 1 };
    writer.accept(&Header::upward(clock.next_stamp(), "session-0"), &command)?;
    ledger.apply(&command);
    writer.close()?;

    info!(identity = ?FileIdentity::detect(config)?, "fresh journal opened and closed");
    Ok(ledger)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let dir = tempfile::tempdir()?;
    let mut config = JournalConfig::new(dir.path().join("ledger.intraday"));
    config.flush_policy = FlushPolicy::SizeThreshold(4 * 1024);
    config.schema_version = 1;

    first_run(&config)?;
    let ledger = second_run(&config)?;

    for (account, balance) in &ledger.balances {
        info!(account = %account, balance, "balance");
    }
    Ok(())
}
