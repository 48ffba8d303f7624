use clap::{Parser, ValueEnum};
use dab_core::soft_bits::{hard_to_soft, soft_to_hard};
use std::io::{Read, Write, BufWriter};
use std::process::ExitCode;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ConversionType {
    SoftToHard,
    HardToSoft,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct AppArguments {
    /// Direction of the conversion.
    #[arg(long, value_enum)]
    r#type: ConversionType,
    /// Input filepath. If not provided uses stdin.
    #[arg(short, long)]
    input_filepath: Option<String>,
    /// Output filepath. If not provided uses stdout.
    #[arg(short, long)]
    output_filepath: Option<String>,
    /// Number of input bytes read per block. For `soft_to_hard` this must be a
    /// multiple of 8, since every 8 soft bytes collapse into 1 hard byte.
    #[arg(short = 'n', long, default_value_t = 8192)]
    block_bytes: usize,
}

#[derive(Debug, Error)]
enum AppError {
    #[error("block-bytes must be a multiple of 8 for soft_to_hard, got {0}")]
    BadBlockSize(usize),
    #[error("failed to open input file {path}: {source}")]
    OpenInput { path: String, source: std::io::Error },
    #[error("failed to create output file {path}: {source}")]
    CreateOutput { path: String, source: std::io::Error },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("convert_viterbi: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), AppError> {
    let args = AppArguments::parse();

    if args.r#type == ConversionType::SoftToHard && args.block_bytes % 8 != 0 {
        return Err(AppError::BadBlockSize(args.block_bytes));
    }

    let mut input: Box<dyn Read> = match &args.input_filepath {
        None => Box::new(std::io::stdin()),
        Some(path) => Box::new(std::fs::File::open(path).map_err(|source| AppError::OpenInput { path: path.clone(), source })?),
    };
    let mut output: Box<dyn Write> = match &args.output_filepath {
        None => Box::new(BufWriter::new(std::io::stdout())),
        Some(path) => Box::new(BufWriter::new(std::fs::File::create(path).map_err(|source| AppError::CreateOutput { path: path.clone(), source })?)),
    };

    let mut buf = vec![0u8; args.block_bytes];
    loop {
        let total_read = read_fully(&mut input, &mut buf)?;
        if total_read == 0 {
            break;
        }
        let chunk = &buf[..total_read];
        match args.r#type {
            ConversionType::HardToSoft => {
                let soft = hard_to_soft(chunk);
                let soft_bytes: &[u8] = unsafe { std::slice::from_raw_parts(soft.as_ptr() as *const u8, soft.len()) };
                output.write_all(soft_bytes)?;
            }
            ConversionType::SoftToHard => {
                let soft: Vec<i8> = chunk.iter().map(|&b| b as i8).collect();
                let hard = soft_to_hard(&soft);
                output.write_all(&hard)?;
            }
        }
        if total_read < buf.len() {
            break;
        }
    }
    output.flush()?;
    Ok(())
}

/// Reads until `buf` is full or the input is exhausted, unlike a single `Read::read` call
/// which may return fewer bytes than requested even mid-stream.
fn read_fully(input: &mut dyn Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        match input.read(&mut buf[total..])? {
            0 => break,
            n => total += n,
        }
    }
    Ok(total)
}
