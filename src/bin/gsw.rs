use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::sync::atomic::AtomicBool;
use std::time::Instant;
use std::{env, process};

use gengraph::formats::FastqReader;
use gengraph::pipeline::{self, OutputFormat, PipelineParams};
use gengraph::{utils, Aligner, AlignerParams, Graph, Scoring};

use getopts::Options;
use log::info;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::new();

    // Inputs.
    let graph = Graph::read_file(&config.graph_file).map_err(|x| x.to_string())?;
    eprintln!(
        "Loaded a graph with {} nodes, {} edges, and {} contigs",
        graph.len(), graph.edge_count(), graph.contigs().len()
    );
    let scoring = Scoring::preset(&config.preset).map_err(|x| x.to_string())?;
    let aligner = Aligner::new(&graph, scoring, config.aligner.clone()).map_err(|x| x.to_string())?;
    let index_time = Instant::now();
    eprintln!(
        "Indexed {} k-mer occurrences in {:.3} seconds",
        aligner.index().len(), index_time.duration_since(start_time).as_secs_f64()
    );

    // Output.
    let mut output: Box<dyn Write> = match config.output_file.as_ref() {
        Some(filename) => Box::new(BufWriter::new(File::create(filename).map_err(|x| x.to_string())?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    pipeline::write_header(&graph, config.pipeline.format, &mut output).map_err(|x| x.to_string())?;

    // Map the reads.
    let cancel = AtomicBool::new(false);
    let reads = FastqReader::new(utils::open_file(&config.reads_file).map_err(|x| x.to_string())?);
    let result = if let Some(mates_file) = config.mates_file.as_ref() {
        info!("Mapping read pairs from {} and {}", config.reads_file, mates_file);
        let mates = FastqReader::new(utils::open_file(mates_file).map_err(|x| x.to_string())?);
        pipeline::map_pairs(&aligner, reads, mates, &mut output, &config.pipeline, &cancel)
    } else {
        info!("Mapping reads from {}", config.reads_file);
        pipeline::map_reads(&aligner, reads, &mut output, &config.pipeline, &cancel)
    };
    let stats = result.map_err(|x| x.to_string())?;
    output.flush().map_err(|x| x.to_string())?;

    eprintln!("Mapped {} reads: {} aligned, {} unmapped", stats.reads, stats.mapped, stats.unmapped);
    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    let reads_per_second = if seconds > 0.0 { stats.reads as f64 / seconds } else { 0.0 };
    eprintln!("Used {:.3} seconds ({:.1} reads/second)", seconds, reads_per_second);

    Ok(())
}

//-----------------------------------------------------------------------------

struct Config {
    pub graph_file: String,
    pub reads_file: String,
    pub mates_file: Option<String>,
    pub output_file: Option<String>,
    pub preset: String,
    pub aligner: AlignerParams,
    pub pipeline: PipelineParams,
}

impl Config {
    pub fn new() -> Config {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("k", "seed-length", &format!("seed length (default: {})", AlignerParams::SEED_LEN), "INT");
        opts.optopt("s", "step", &format!("k-mer sampling step in the nodes (default: {})", AlignerParams::STEP), "INT");
        opts.optopt("m", "min-score", &format!("flag alignments below this score as unmapped (default: {})", AlignerParams::MIN_SCORE), "INT");
        opts.optopt("S", "scoring", "scoring preset: default, hoxd55, mouse-rat, human-chimp-two (default: default)", "STR");
        opts.optopt("t", "threads", &format!("number of worker threads (default: {})", PipelineParams::THREADS), "INT");
        opts.optopt("", "queue", &format!("capacity of the work queues (default: {})", PipelineParams::QUEUE_CAPACITY), "INT");
        opts.optopt("o", "output", "output file name (default: stdout)", "FILE");
        opts.optflag("", "sam", "write SAM instead of GIRAF");
        opts.optflag("", "ordered", "write the alignments in input order");
        let matches = match opts.parse(&args[1..]) {
            Ok(m) => m,
            Err(f) => {
                eprintln!("{}", f);
                process::exit(1);
            }
        };

        let header = format!("Usage: {} [options] graph.gg reads.fq [mates.fq]", program);
        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }
        if matches.free.len() < 2 || matches.free.len() > 3 {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        }

        let mut aligner = AlignerParams::default();
        if let Some(value) = parse_option(&matches, "k", &opts, &header) {
            aligner.seed_len = value;
        }
        if let Some(value) = parse_option(&matches, "s", &opts, &header) {
            aligner.step = value;
        }
        if let Some(value) = parse_option(&matches, "m", &opts, &header) {
            aligner.min_score = value;
        }

        let mut pipeline = PipelineParams::default();
        if let Some(value) = parse_option(&matches, "t", &opts, &header) {
            pipeline.threads = value;
        }
        if let Some(value) = parse_option(&matches, "queue", &opts, &header) {
            pipeline.queue_capacity = value;
        }
        pipeline.ordered = matches.opt_present("ordered");
        if matches.opt_present("sam") {
            pipeline.format = OutputFormat::Sam;
        }

        Config {
            graph_file: matches.free[0].clone(),
            reads_file: matches.free[1].clone(),
            mates_file: matches.free.get(2).cloned(),
            output_file: matches.opt_str("o"),
            preset: matches.opt_str("S").unwrap_or_else(|| String::from("default")),
            aligner,
            pipeline,
        }
    }
}

// Parses a numeric option or exits with the usage text.
fn parse_option<T: std::str::FromStr>(matches: &getopts::Matches, name: &str, opts: &Options, header: &str) -> Option<T> {
    let value = matches.opt_str(name)?;
    match value.parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            eprintln!("Invalid value for option {}: {}", name, value);
            eprint!("{}", opts.usage(header));
            process::exit(1);
        }
    }
}

//-----------------------------------------------------------------------------
