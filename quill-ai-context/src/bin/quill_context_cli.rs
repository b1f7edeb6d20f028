use clap::Parser;
use quill_ai_context::document::{flatten_pages, parse_extraction};
use quill_ai_context::text::{ChunkingConfig, clean_for_embedding};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};

/// A CLI tool to flatten and chunk extractor output into JSON using quill-ai-context.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the extraction JSON file. If not provided, reads from stdin.
    #[arg(short, long)]
    input: Option<String>,

    /// Source document identifier attached to each chunk.
    #[arg(short, long, default_value = "unknown_document")]
    source: String,

    /// Maximum number of words per chunk.
    #[arg(long, default_value_t = 250)]
    max_words: usize,

    /// Number of words shared by consecutive chunks.
    #[arg(long, default_value_t = 50)]
    overlap: usize,
}

#[derive(Serialize)]
struct ChunkOutput<'a> {
    source: &'a str,
    topic: &'a str,
    page: i64,
    sequence: usize,
    chunk_text: String,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let raw = if let Some(input_path) = args.input {
        fs::read_to_string(input_path)?
    } else {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    };

    let config = ChunkingConfig::new(args.max_words, args.overlap)?;
    let pages = parse_extraction(&raw)?;
    let rows = flatten_pages(&pages);

    let mut output = Vec::new();
    for row in &rows {
        for (sequence, chunk) in config.chunk(&row.context).into_iter().enumerate() {
            output.push(ChunkOutput {
                source: &args.source,
                topic: &row.keyword,
                page: row.page_number,
                sequence,
                chunk_text: clean_for_embedding(&chunk),
            });
        }
    }

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
