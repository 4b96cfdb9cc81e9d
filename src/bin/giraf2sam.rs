use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::time::Instant;
use std::{env, process};

use gengraph::projection::{self, SamRecord};
use gengraph::{formats, utils, GirafRecord, Graph};

use getopts::Options;
use log::{info, warn};

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::new();

    let mut output: Box<dyn Write> = match config.output_file.as_ref() {
        Some(filename) => Box::new(BufWriter::new(File::create(filename).map_err(|x| x.to_string())?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    // The graph is only needed for the @SQ lines.
    if let Some(graph_file) = config.graph_file.as_ref() {
        let graph = Graph::read_file(graph_file).map_err(|x| x.to_string())?;
        info!("Loaded a graph with {} contigs", graph.contigs().len());
        projection::write_sam_header(&graph, &mut output).map_err(|x| x.to_string())?;
    }

    let mut input = utils::open_file(&config.giraf_file).map_err(|x| x.to_string())?;
    let headers = formats::read_header_lines(&mut input).map_err(|x| x.to_string())?;
    info!("Skipped {} GIRAF header lines", headers.len());

    let mut converted = 0;
    let mut skipped = 0;
    let mut pending: Option<GirafRecord> = None;
    let mut line_num = headers.len();
    loop {
        let mut buf: Vec<u8> = Vec::new();
        let len = input.read_until(b'\n', &mut buf).map_err(|x| x.to_string())?;
        if len == 0 {
            break;
        }
        line_num += 1;
        if buf.iter().all(|c| c.is_ascii_whitespace()) {
            continue;
        }
        let record = match GirafRecord::from_line(&buf) {
            Ok(record) => record,
            Err(message) => {
                warn!("Skipping line {}: {}", line_num, message);
                skipped += 1;
                continue;
            }
        };

        // A first mate waits for the next record.
        if let Some(first) = pending.take() {
            if record.name == first.name && !projection::is_first_mate(&record) {
                let (a, b) = SamRecord::from_giraf_pair(&first, &record);
                write_line(&a, &mut output)?;
                write_line(&b, &mut output)?;
                converted += 2;
                continue;
            }
            warn!("No mate found for {}", first.name);
            write_line(&SamRecord::from_giraf(&first), &mut output)?;
            converted += 1;
        }
        if projection::is_first_mate(&record) {
            pending = Some(record);
        } else {
            write_line(&SamRecord::from_giraf(&record), &mut output)?;
            converted += 1;
        }
    }
    if let Some(first) = pending.take() {
        warn!("No mate found for {}", first.name);
        write_line(&SamRecord::from_giraf(&first), &mut output)?;
        converted += 1;
    }
    output.flush().map_err(|x| x.to_string())?;

    eprintln!("Converted {} records, skipped {} lines", converted, skipped);
    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    eprintln!("Used {:.3} seconds", seconds);

    Ok(())
}

fn write_line<T: Write>(record: &SamRecord, output: &mut T) -> Result<(), String> {
    output.write_all(&record.to_line()).map_err(|x| x.to_string())?;
    output.write_all(b"\n").map_err(|x| x.to_string())
}

//-----------------------------------------------------------------------------

struct Config {
    pub giraf_file: String,
    pub graph_file: Option<String>,
    pub output_file: Option<String>,
}

impl Config {
    pub fn new() -> Config {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("g", "graph", "graph file for the SAM header", "FILE");
        opts.optopt("o", "output", "output file name (default: stdout)", "FILE");
        let matches = match opts.parse(&args[1..]) {
            Ok(m) => m,
            Err(f) => {
                eprintln!("{}", f);
                process::exit(1);
            }
        };

        let header = format!("Usage: {} [options] alignments.giraf", program);
        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }
        let giraf_file = if let Some(s) = matches.free.first() {
            s.clone()
        } else {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        };

        Config {
            giraf_file,
            graph_file: matches.opt_str("g"),
            output_file: matches.opt_str("o"),
        }
    }
}

//-----------------------------------------------------------------------------
