//! `bintable` command line tool.
//!
//! ```text
//! bintable --input stars.csv --output stars.btbl --byte-order big
//! bintable --input stars.btbl --output subset.csv --input-columns ra,dec
//! bintable --input stars.btbl            # print the file summary as JSON
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, ValueEnum};
use flexi_logger::{Logger, LoggerHandle};
use minarrow::Table as MinarrowTable;

use bintable::models::decoders::csv::CsvDecodeOptions;
use bintable::models::encoders::csv::CsvEncodeOptions;
use bintable::models::readers::csv_reader::read_csv_file;
use bintable::models::writers::csv_writer::write_csv_file;
use bintable::{
    encode_with, inspect, write_table_to_file, AlignmentPolicy, BintableError, ByteOrder,
    DecodeOptions, EncodeOptions, FileSummary, FromTable, Result, Table,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OrderArg {
    Little,
    Big,
    Native,
}

impl From<OrderArg> for ByteOrder {
    fn from(arg: OrderArg) -> Self {
        match arg {
            OrderArg::Little => ByteOrder::Little,
            OrderArg::Big => ByteOrder::Big,
            OrderArg::Native => ByteOrder::native(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AlignArg {
    Natural,
    Simd64,
}

impl From<AlignArg> for AlignmentPolicy {
    fn from(arg: AlignArg) -> Self {
        match arg {
            AlignArg::Natural => AlignmentPolicy::Natural,
            AlignArg::Simd64 => AlignmentPolicy::Simd64,
        }
    }
}

/// Convert between CSV and bintable files, or inspect a bintable file.
#[derive(Parser, Debug)]
#[command(name = "bintable", version, about, long_about = None)]
struct Cli {
    /// Input file: `.csv`, or a bintable file
    #[arg(short = 'i', long = "input")]
    input: PathBuf,

    /// Output file: `.csv`, or a bintable file. Prints a summary when absent
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Comma-separated columns to keep, in output order
    #[arg(long = "input-columns", value_delimiter = ',')]
    input_columns: Vec<String>,

    /// Byte order of written bintable files
    #[arg(long = "byte-order", value_enum, default_value_t = OrderArg::Native)]
    byte_order: OrderArg,

    /// Column alignment of written bintable files
    #[arg(long = "align", value_enum, default_value_t = AlignArg::Natural)]
    align: AlignArg,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            byte_order: self.byte_order.into(),
            alignment: self.align.into(),
        }
    }

    fn projection(&self) -> Option<&[String]> {
        (!self.input_columns.is_empty()).then_some(self.input_columns.as_slice())
    }
}

fn init_logging(verbose: u8) -> std::result::Result<LoggerHandle, flexi_logger::FlexiLoggerError> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    Logger::try_with_env_or_str(level)?.log_to_stderr().start()
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

fn print_summary(summary: &FileSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary)
        .map_err(|e| BintableError::CorruptPayload(format!("cannot render summary: {e}")))?;
    println!("{json}");
    Ok(())
}

async fn emit(cli: &Cli, table: Table) -> Result<()> {
    match &cli.output {
        Some(out) if is_csv(out) => {
            let host = MinarrowTable::from_table(&table)?;
            write_csv_file(out, &host, &CsvEncodeOptions::default()).await
        }
        Some(out) => write_table_to_file(out, &table, &cli.encode_options()).await,
        None => print_summary(&inspect(&encode_with(&table, &cli.encode_options())?)?),
    }
}

#[cfg(feature = "mmap")]
fn read_bintable(path: &Path, options: &DecodeOptions) -> Result<Table> {
    bintable::MmapTableReader::open(path)?.read_table_with(options)
}

#[cfg(not(feature = "mmap"))]
fn read_bintable(path: &Path, options: &DecodeOptions) -> Result<Table> {
    bintable::FileTableReader::open(path)?.read_table_with(options)
}

async fn run(cli: &Cli) -> Result<()> {
    if is_csv(&cli.input) {
        let host = read_csv_file(&cli.input, &CsvDecodeOptions::default()).await?;
        let mut table = Table::from_source(&host)?;
        if let Some(names) = cli.projection() {
            table = table.select(names)?;
        }
        log::info!(
            "read {} rows x {} columns from {}",
            table.n_rows(),
            table.n_cols(),
            cli.input.display()
        );
        return emit(cli, table).await;
    }

    if cli.output.is_none() {
        let bytes = std::fs::read(&cli.input)?;
        return print_summary(&inspect(&bytes)?);
    }

    let options = match cli.projection() {
        Some(names) => DecodeOptions::with_columns(names.iter().cloned()),
        None => DecodeOptions::default(),
    };
    let table = read_bintable(&cli.input, &options)?;
    emit(cli, table).await
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let logger = match init_logging(cli.verbose) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("bintable: logging disabled: {e}");
            None
        }
    };

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if logger.is_some() => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("bintable: {e}");
            ExitCode::FAILURE
        }
    }
}
