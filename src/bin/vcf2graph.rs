use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Instant;
use std::{env, process};

use gengraph::construct::{self, BuildParams, DeletionEnd};
use gengraph::utils;

use getopts::Options;
use log::info;

//-----------------------------------------------------------------------------

fn main() -> Result<(), String> {
    let start_time = Instant::now();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::new();

    // Build the graph.
    let params = BuildParams { deletion_end: config.deletion_end };
    let (graph, stats) = construct::build_graph_from_files(&config.fasta_file, &config.vcf_file, &params)
        .map_err(|x| x.to_string())?;
    eprintln!(
        "Built a graph with {} nodes, {} edges, and {} bases from {} contigs",
        graph.len(), graph.edge_count(), graph.total_bases(), stats.contigs
    );
    eprintln!(
        "Added {} variants, skipped {}, merged {} adjacent SNPs",
        stats.added, stats.missed, stats.coalesced
    );

    // Write the outputs.
    graph.write_file(&config.output_file).map_err(|x| x.to_string())?;
    info!("Wrote the graph to {}", config.output_file);
    if let Some(filename) = config.gfa_file.as_ref() {
        let mut output = BufWriter::new(File::create(filename).map_err(|x| x.to_string())?);
        graph.write_gfa(&mut output).map_err(|x| x.to_string())?;
        output.flush().map_err(|x| x.to_string())?;
        info!("Wrote GFA to {}", filename);
    }
    if let Some(filename) = config.fasta_output.as_ref() {
        let mut output = BufWriter::new(File::create(filename).map_err(|x| x.to_string())?);
        graph.write_fasta(&mut output).map_err(|x| x.to_string())?;
        output.flush().map_err(|x| x.to_string())?;
        info!("Wrote node sequences to {}", filename);
    }
    if let Some(size) = utils::file_size(&config.output_file) {
        eprintln!("Graph file size: {}", size);
    }

    let end_time = Instant::now();
    let seconds = end_time.duration_since(start_time).as_secs_f64();
    eprintln!("Used {:.3} seconds", seconds);

    Ok(())
}

//-----------------------------------------------------------------------------

struct Config {
    pub fasta_file: String,
    pub vcf_file: String,
    pub output_file: String,
    pub deletion_end: DeletionEnd,
    pub gfa_file: Option<String>,
    pub fasta_output: Option<String>,
}

impl Config {
    pub fn new() -> Config {
        let args: Vec<String> = env::args().collect();
        let program = args[0].clone();

        let mut opts = Options::new();
        opts.optflag("h", "help", "print this help");
        opts.optopt("o", "output", "output graph file name (default: <reference>.gg)", "FILE");
        opts.optopt("", "deletion-end", "deletion end strategy: ref-allele, info-end, clamp (default: ref-allele)", "STR");
        opts.optopt("", "gfa", "also write the graph in GFA format", "FILE");
        opts.optopt("", "fasta", "also write the node sequences in FASTA format", "FILE");
        let matches = match opts.parse(&args[1..]) {
            Ok(m) => m,
            Err(f) => {
                eprintln!("{}", f);
                process::exit(1);
            }
        };

        let header = format!("Usage: {} [options] reference.fa variants.vcf", program);
        if matches.opt_present("h") {
            eprint!("{}", opts.usage(&header));
            process::exit(0);
        }

        let (fasta_file, vcf_file) = if matches.free.len() == 2 {
            (matches.free[0].clone(), matches.free[1].clone())
        } else {
            eprint!("{}", opts.usage(&header));
            process::exit(1);
        };
        let output_file = matches.opt_str("o").unwrap_or_else(|| format!("{}.gg", fasta_file));

        let deletion_end = match matches.opt_str("deletion-end").as_deref() {
            None | Some("ref-allele") => DeletionEnd::RefAllele,
            Some("info-end") => DeletionEnd::InfoEnd,
            Some("clamp") => DeletionEnd::ClampToNext,
            Some(s) => {
                eprintln!("Unknown deletion end strategy: {}", s);
                eprint!("{}", opts.usage(&header));
                process::exit(1);
            }
        };

        Config {
            fasta_file,
            vcf_file,
            output_file,
            deletion_end,
            gfa_file: matches.opt_str("gfa"),
            fasta_output: matches.opt_str("fasta"),
        }
    }
}

//-----------------------------------------------------------------------------
