//! Dumps textual LIR listings.
//!
//! Options default to the `ARMLIR_*` environment variables; flags override
//! them. Lines go to the `log` facade at info level unless `--stdout` is given.

use std::path::PathBuf;
use std::process::ExitCode;

use armlir::arm::UnitDumper;
use armlir::core::config::parse_address;
use armlir::core::{DumpOptions, DumpResult, DumpSession, LineSink, LogSink, WriterSink};
use armlir::lir::parser::load_listing;
use bumpalo::Bump;
use clap::Parser;

#[derive(Parser)]
#[command(name = "lirdump")]
#[command(about = "Disassemble ARM LIR listings", long_about = None)]
struct Cli {
    /// Listing files to dump
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Also print squashed and no-op instructions
    #[arg(long)]
    dump_nops: bool,

    /// Print use/def resource masks after each instruction
    #[arg(long)]
    dump_masks: bool,

    /// Code base address, 32-bit (decimal or 0x hex)
    #[arg(long, value_parser = parse_base_address)]
    base_address: Option<u32>,

    /// Write lines to stdout instead of the log
    #[arg(long)]
    stdout: bool,

    /// Print session statistics at the end
    #[arg(long)]
    stats: bool,
}

fn parse_base_address(text: &str) -> Result<u32, String> {
    parse_address(text).ok_or_else(|| format!("invalid 32-bit address '{text}'"))
}

impl Cli {
    fn options(&self) -> DumpOptions {
        let mut options = DumpOptions::from_env();
        if self.dump_nops {
            options.dump_nops = true;
        }
        if self.dump_masks {
            options.dump_resource_masks = true;
        }
        if let Some(base) = self.base_address {
            options.base_address = base;
        }
        options
    }
}

fn run(cli: &Cli) -> DumpResult<()> {
    let options = cli.options();
    let arena = Bump::new();
    let session = DumpSession::new(&arena);

    let mut stdout_sink = WriterSink::new(std::io::stdout().lock());
    let mut log_sink = LogSink;
    let sink: &mut dyn LineSink = if cli.stdout {
        &mut stdout_sink
    } else {
        &mut log_sink
    };

    for path in &cli.files {
        log::debug!("reading {}", path.display());
        let listing = load_listing(&session, path)?;
        UnitDumper::new(options, &listing.symbols, &session).dump(&listing.unit, sink);
    }
    stdout_sink.finish()?;

    if cli.stats {
        eprint!("{}", session.stats());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
