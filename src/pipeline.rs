//! Multi-threaded read mapping.
//!
//! The pipeline has three stages connected by bounded channels:
//!
//! * A reader thread pulls reads (or read pairs) from the input iterators and numbers them.
//! * Worker threads align the reads with a shared [`Aligner`] and format the output lines.
//!   Each worker owns its own [`Workspace`].
//! * The calling thread writes the lines to the output.
//!
//! The bounded channels throttle the faster stages.
//! By default, the output is written in the order the workers finish.
//! With [`PipelineParams::ordered`], the writer buffers the results and writes them in input order.
//!
//! The pipeline checks the cancellation flag between reads in every stage and between seeds in the aligner.
//! A cancelled run stops early and returns the statistics for the reads written so far.

use crate::alignment::GirafRecord;
use crate::formats::{self, FastqRecord};
use crate::graph::Graph;
use crate::mapper::{Aligner, Workspace};
use crate::projection::{self, SamRecord};
use crate::{Error, Result};

use std::collections::BTreeMap;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, info, warn};


//-----------------------------------------------------------------------------

/// Output format for the mapped reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Graph-native GIRAF lines.
    #[default]
    Giraf,
    /// SAM lines projected to reference coordinates.
    Sam,
}

/// Parameters for the mapping pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineParams {
    /// Number of worker threads.
    pub threads: usize,
    /// Capacity of each channel between the stages.
    pub queue_capacity: usize,
    /// Write the output in input order.
    pub ordered: bool,
    pub format: OutputFormat,
}

impl PipelineParams {
    /// Default number of worker threads.
    pub const THREADS: usize = 4;

    /// Default capacity of the channels.
    pub const QUEUE_CAPACITY: usize = 256;

    // Checks that the parameters can be used.
    fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(Error::Config(String::from("The number of threads must be positive")));
        }
        if self.queue_capacity == 0 {
            return Err(Error::Config(String::from("The queue capacity must be positive")));
        }
        Ok(())
    }
}

impl Default for PipelineParams {
    fn default() -> Self {
        PipelineParams {
            threads: Self::THREADS,
            queue_capacity: Self::QUEUE_CAPACITY,
            ordered: false,
            format: OutputFormat::default(),
        }
    }
}

/// Statistics on a mapping run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Number of reads written, counting both mates of a pair.
    pub reads: usize,
    /// Number of reads written as mapped.
    pub mapped: usize,
    /// Number of reads written as unmapped, including low-scoring reads.
    pub unmapped: usize,
}

impl PipelineStats {
    fn add(&mut self, record: &GirafRecord) {
        self.reads += 1;
        if record.is_unmapped() {
            self.unmapped += 1;
        } else {
            self.mapped += 1;
        }
    }

    fn merge(&mut self, other: &PipelineStats) {
        self.reads += other.reads;
        self.mapped += other.mapped;
        self.unmapped += other.unmapped;
    }
}

//-----------------------------------------------------------------------------

/// Writes the file header for the output format.
///
/// GIRAF output gets a `@HD` line, and SAM output gets the header from [`projection::write_sam_header`].
pub fn write_header<W: Write>(graph: &Graph, format: OutputFormat, output: &mut W) -> Result<()> {
    match format {
        OutputFormat::Giraf => formats::write_giraf_file_header(output)?,
        OutputFormat::Sam => projection::write_sam_header(graph, output)?,
    }
    Ok(())
}

/// Maps single-end reads and writes the results to the output.
///
/// The header is not written; see [`write_header`].
/// Returns an error if the parameters are invalid, the input cannot be read, or the output cannot be written.
/// Reads that cannot be aligned are written as unmapped records.
///
/// # Examples
///
/// ```
/// use gengraph::{Aligner, AlignerParams, FastqRecord, Graph, Scoring};
/// use gengraph::pipeline::{self, PipelineParams};
/// use std::sync::atomic::AtomicBool;
///
/// let mut graph = Graph::new();
/// graph.add_node(b"GATTACAGATTACACATTAG".to_vec(), None);
/// let params = AlignerParams { seed_len: 8, step: 1, min_score: 0, ..AlignerParams::default() };
/// let aligner = Aligner::new(&graph, Scoring::default(), params).unwrap();
///
/// let reads = vec![
///     FastqRecord { name: String::from("read"), seq: b"ACAGATTACACA".to_vec(), qual: None },
/// ];
/// let mut output: Vec<u8> = Vec::new();
/// let cancel = AtomicBool::new(false);
/// let stats = pipeline::map_reads(
///     &aligner, reads.into_iter().map(Ok), &mut output, &PipelineParams::default(), &cancel
/// ).unwrap();
/// assert_eq!(stats.mapped, 1);
/// assert!(output.starts_with(b"read\t0\t12\t4\t+\t4:0:16\t:12\t"));
/// ```
pub fn map_reads<I, W>(
    aligner: &Aligner, reads: I, output: &mut W, params: &PipelineParams, cancel: &AtomicBool
) -> Result<PipelineStats>
where
    I: Iterator<Item = Result<FastqRecord>> + Send,
    W: Write,
{
    let tasks = reads.map(|read| read.map(Task::Single));
    run(aligner, tasks, output, params, cancel)
}

/// Maps paired-end reads and writes the results to the output.
///
/// The mates are read in parallel from the two iterators, and the two lines for a pair are always written together.
/// Returns an error if the iterators have a different number of reads.
/// See [`map_reads`] for the other errors.
pub fn map_pairs<I, J, W>(
    aligner: &Aligner, first: I, second: J, output: &mut W, params: &PipelineParams, cancel: &AtomicBool
) -> Result<PipelineStats>
where
    I: Iterator<Item = Result<FastqRecord>> + Send,
    J: Iterator<Item = Result<FastqRecord>> + Send,
    W: Write,
{
    let tasks = Pairs { first, second, done: false };
    run(aligner, tasks, output, params, cancel)
}

//-----------------------------------------------------------------------------

// A unit of work for the workers.
enum Task {
    Single(FastqRecord),
    Pair(FastqRecord, FastqRecord),
}

// Formatted output for a task.
struct Output {
    index: usize,
    lines: Vec<u8>,
    stats: PipelineStats,
}

// Combines two read iterators into pairs.
struct Pairs<I, J> {
    first: I,
    second: J,
    done: bool,
}

impl<I, J> Iterator for Pairs<I, J>
where
    I: Iterator<Item = Result<FastqRecord>>,
    J: Iterator<Item = Result<FastqRecord>>,
{
    type Item = Result<Task>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let result = match (self.first.next(), self.second.next()) {
            (None, None) => None,
            (Some(Err(err)), _) | (_, Some(Err(err))) => Some(Err(err)),
            (Some(Ok(first)), Some(Ok(second))) => Some(Ok(Task::Pair(first, second))),
            (Some(Ok(read)), None) | (None, Some(Ok(read))) => Some(Err(Error::Config(format!(
                "Mate files have a different number of reads: no mate for {}", read.name
            )))),
        };
        if !matches!(result, Some(Ok(_))) {
            self.done = true;
        }
        result
    }
}

//-----------------------------------------------------------------------------

fn run<T, W>(aligner: &Aligner, tasks: T, output: &mut W, params: &PipelineParams, cancel: &AtomicBool) -> Result<PipelineStats>
where
    T: Iterator<Item = Result<Task>> + Send,
    W: Write,
{
    params.validate()?;
    info!("Mapping reads with {} worker threads", params.threads);

    // The reader sends numbered tasks to the workers, and the workers send formatted lines to the writer.
    // A stage stops when its input channel is closed or all receivers of its output channel are gone.
    // The calling thread is the writer.
    let (to_workers, from_reader) = bounded::<(usize, Task)>(params.queue_capacity);
    let (to_writer, from_workers) = bounded::<Output>(params.queue_capacity);

    let (read_result, write_result) = thread::scope(|scope| {
        let reader = scope.spawn(move || read_tasks(tasks, to_workers, cancel));
        for _ in 0..params.threads {
            let from_reader = from_reader.clone();
            let to_writer = to_writer.clone();
            scope.spawn(move || map_tasks(aligner, params.format, from_reader, to_writer, cancel));
        }
        drop(from_reader);
        drop(to_writer);

        let write_result = write_output(from_workers, output, params.ordered, cancel);
        let read_result = reader.join().unwrap_or_else(|_| {
            Err(Error::Config(String::from("The reader thread panicked")))
        });
        (read_result, write_result)
    });

    // Report the write error first, as it may have caused the reader to stop.
    let stats = write_result?;
    let tasks = read_result?;
    if cancel.load(Ordering::Relaxed) {
        warn!("Mapping was cancelled after {} reads", stats.reads);
    } else {
        info!("Mapped {} tasks: {} reads, {} mapped, {} unmapped", tasks, stats.reads, stats.mapped, stats.unmapped);
    }
    Ok(stats)
}

// Returns the number of tasks sent to the workers.
fn read_tasks<T>(tasks: T, to_workers: Sender<(usize, Task)>, cancel: &AtomicBool) -> Result<usize>
where
    T: Iterator<Item = Result<Task>>,
{
    let mut sent = 0;
    for task in tasks {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let task = task?;
        if to_workers.send((sent, task)).is_err() {
            // The workers have stopped.
            break;
        }
        sent += 1;
    }
    Ok(sent)
}

fn map_tasks(
    aligner: &Aligner, format: OutputFormat,
    from_reader: Receiver<(usize, Task)>, to_writer: Sender<Output>, cancel: &AtomicBool
) {
    let mut workspace = Workspace::new();
    let graph = aligner.graph();
    while let Ok((index, task)) = from_reader.recv() {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let mut result = Output { index, lines: Vec::new(), stats: PipelineStats::default() };
        match task {
            Task::Single(read) => {
                let record = aligner.map_read_until(&read, &mut workspace, cancel);
                result.stats.add(&record);
                match format {
                    OutputFormat::Giraf => append_giraf(graph, &record, &mut result.lines),
                    OutputFormat::Sam => append_line(&SamRecord::from_giraf(&record).to_line(), &mut result.lines),
                }
            },
            Task::Pair(first, second) => {
                let (first, second) = aligner.map_pair_until(&first, &second, &mut workspace, cancel);
                result.stats.add(&first);
                result.stats.add(&second);
                match format {
                    OutputFormat::Giraf => {
                        append_giraf(graph, &first, &mut result.lines);
                        append_giraf(graph, &second, &mut result.lines);
                    },
                    OutputFormat::Sam => {
                        let (first, second) = SamRecord::from_giraf_pair(&first, &second);
                        append_line(&first.to_line(), &mut result.lines);
                        append_line(&second.to_line(), &mut result.lines);
                    },
                }
            },
        }
        if to_writer.send(result).is_err() {
            // The writer has stopped.
            break;
        }
    }
}

fn append_line(line: &[u8], buffer: &mut Vec<u8>) {
    buffer.extend_from_slice(line);
    buffer.push(b'\n');
}

// A record that cannot be written is replaced with an unmapped record.
fn append_giraf(graph: &Graph, record: &GirafRecord, buffer: &mut Vec<u8>) {
    let line = record.to_line(graph).or_else(|err| {
        warn!("Could not write the alignment of {}: {}", record.name, err);
        GirafRecord::unmapped(&record.name, &record.seq, record.qual.as_deref()).to_line(graph)
    });
    if let Ok(line) = line {
        append_line(&line, buffer);
    }
}

// Writes the results until the workers stop or writing fails.
fn write_output<W: Write>(from_workers: Receiver<Output>, output: &mut W, ordered: bool, cancel: &AtomicBool) -> Result<PipelineStats> {
    let mut stats = PipelineStats::default();
    let mut pending: BTreeMap<usize, Output> = BTreeMap::new();
    let mut next = 0;
    for result in from_workers.iter() {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        if !ordered {
            output.write_all(&result.lines)?;
            stats.merge(&result.stats);
            continue;
        }
        pending.insert(result.index, result);
        while let Some(result) = pending.remove(&next) {
            output.write_all(&result.lines)?;
            stats.merge(&result.stats);
            next += 1;
        }
    }
    if !pending.is_empty() {
        debug!("Dropped {} out-of-order results", pending.len());
    }
    output.flush()?;
    Ok(stats)
}

//-----------------------------------------------------------------------------
