use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Arg, ArgAction, Command, value_parser};
use graybmp::{GrayscaleRequest, Limits, RowLayout, Unstoppable};

fn cli() -> Command {
    Command::new("graybmp")
        .about("Convert an uncompressed 24-bit BMP to grayscale")
        .arg(
            Arg::new("input")
                .help("Source BMP file")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .help("Destination BMP file")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("packed-rows")
                .long("packed-rows")
                .help("Treat pixel rows as unpadded (width * 3 bytes)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("sequential")
                .long("sequential")
                .help("Convert on the calling thread only")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("rows-per-chunk")
                .long("rows-per-chunk")
                .help("Rows handed to each worker at a time")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("max-pixels")
                .long("max-pixels")
                .help("Reject images with more pixels than this")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Do not print phase timings")
                .action(ArgAction::SetTrue),
        )
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let matches = cli().get_matches();
    let input = matches
        .get_one::<PathBuf>("input")
        .expect("input is required");
    let output = matches
        .get_one::<PathBuf>("output")
        .expect("output is required");

    let mut limits = Limits::default();
    if let Some(&max) = matches.get_one::<u64>("max-pixels") {
        limits.max_pixels = Some(max);
    }

    let row_layout = if matches.get_flag("packed-rows") {
        RowLayout::Packed
    } else {
        RowLayout::Padded
    };

    let mut request = GrayscaleRequest::new()
        .with_limits(&limits)
        .with_row_layout(row_layout)
        .with_parallel(!matches.get_flag("sequential"));
    if let Some(&rows) = matches.get_one::<usize>("rows-per-chunk") {
        request = request.with_rows_per_chunk(rows);
    }

    match request.convert_file(input, output, &Unstoppable) {
        Ok(timings) => {
            if !matches.get_flag("quiet") {
                eprintln!("{timings}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} -> {}: {e}", input.display(), output.display());
            ExitCode::FAILURE
        }
    }
}
