use clap::Parser;
use std::io::{Read, Seek, SeekFrom, Write, BufWriter};
use std::process::ExitCode;
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct AppArguments {
    /// File to replay in an infinite loop.
    input_filepath: String,
    /// Output filepath. If not provided uses stdout.
    #[arg(short, long)]
    output_filepath: Option<String>,
    /// Number of bytes read/written per block.
    #[arg(short = 'n', long, default_value_t = 8192)]
    block_bytes: usize,
}

#[derive(Debug, Error)]
enum AppError {
    #[error("failed to open input file {path}: {source}")]
    OpenInput { path: String, source: std::io::Error },
    #[error("failed to create output file {path}: {source}")]
    CreateOutput { path: String, source: std::io::Error },
    #[error("input file {path} is empty, nothing to loop")]
    EmptyInput { path: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("loop_file: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), AppError> {
    let args = AppArguments::parse();

    let mut input = std::fs::File::open(&args.input_filepath)
        .map_err(|source| AppError::OpenInput { path: args.input_filepath.clone(), source })?;
    if input.metadata()?.len() == 0 {
        return Err(AppError::EmptyInput { path: args.input_filepath.clone() });
    }
    let mut output: Box<dyn Write> = match &args.output_filepath {
        None => Box::new(BufWriter::new(std::io::stdout())),
        Some(path) => Box::new(BufWriter::new(std::fs::File::create(path).map_err(|source| AppError::CreateOutput { path: path.clone(), source })?)),
    };

    let mut buf = vec![0u8; args.block_bytes];
    loop {
        let total_read = input.read(&mut buf)?;
        if total_read == 0 {
            input.seek(SeekFrom::Start(0))?;
            continue;
        }
        output.write_all(&buf[..total_read])?;
    }
}
