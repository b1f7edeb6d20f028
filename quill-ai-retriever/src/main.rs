use clap::{Parser, Subcommand};
use quill_ai_context::text::ChunkingConfig;
use quill_ai_llm::{LlmConfig, OpenAiProvider};
use quill_ai_retriever::retrieval::{
    KnowledgeBaseBuilder, Retriever, SelectionPolicy, SourceDocument,
};
use quill_ai_retriever::storage;
use quill_ai_retriever::synthesis::AnswerSynthesizer;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// A CLI tool to build a document knowledge base and answer questions over it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build a vectorized knowledge base from extraction JSON files
    Build {
        /// Extraction JSON files (one per source document)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Output CSV path for the knowledge base
        #[arg(short, long, default_value = "vectorized_kb.csv")]
        output: PathBuf,
        /// Maximum number of words per chunk
        #[arg(long, default_value_t = 250)]
        max_words: usize,
        /// Number of words shared by consecutive chunks
        #[arg(long, default_value_t = 50)]
        overlap: usize,
        /// Number of embedding requests allowed in flight
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },
    /// Retrieve context sets for questions against a knowledge base
    Retrieve {
        /// Path to the knowledge base CSV
        #[arg(long)]
        kb: PathBuf,
        /// Questions to retrieve context for
        questions: Vec<String>,
        /// File with one question per line (used when no questions are given)
        #[arg(long)]
        questions_file: Option<PathBuf>,
        /// Select a fixed number of entries instead of the adaptive cutoff
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Cumulative-mass threshold for adaptive selection
        #[arg(short = 'p', long, default_value_t = 0.9)]
        top_p: f32,
        /// Sum only non-negative similarity scores in the top-p denominator
        #[arg(long, default_value_t = false)]
        positive_mass_only: bool,
        /// Output JSON path for retrieval results
        #[arg(short, long, default_value = "query_results.json")]
        output: PathBuf,
    },
    /// Generate answers for previously retrieved context sets
    Answer {
        /// Retrieval results JSON produced by `retrieve`
        #[arg(short, long)]
        input: PathBuf,
        /// Output JSON path for generated answers
        #[arg(short, long, default_value = "generated_answers.json")]
        output: PathBuf,
    },
    /// Answer a single question end-to-end
    Ask {
        /// Path to the knowledge base CSV
        #[arg(long)]
        kb: PathBuf,
        /// The question to answer
        question: String,
        /// Select a fixed number of entries instead of the adaptive cutoff
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
        /// Cumulative-mass threshold for adaptive selection
        #[arg(short = 'p', long, default_value_t = 0.9)]
        top_p: f32,
        /// Sum only non-negative similarity scores in the top-p denominator
        #[arg(long, default_value_t = false)]
        positive_mass_only: bool,
    },
    /// Show knowledge base statistics
    Stats {
        /// Path to the knowledge base CSV
        #[arg(short, long)]
        kb: PathBuf,
    },
}

fn policy(top_k: Option<usize>, top_p: f32, positive_mass_only: bool) -> SelectionPolicy {
    match top_k {
        Some(k) => SelectionPolicy::TopK(k),
        None => SelectionPolicy::TopP {
            top_p,
            positive_mass_only,
        },
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Commands::Build {
            inputs,
            output,
            max_words,
            overlap,
            concurrency,
        } => {
            let chunking = ChunkingConfig::new(max_words, overlap)?;
            let provider = Arc::new(OpenAiProvider::new(LlmConfig::from_env()?)?);

            let mut documents = Vec::with_capacity(inputs.len());
            for input in &inputs {
                let source = input
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| "unknown_document".to_string());
                let json = std::fs::read_to_string(input)?;
                documents.push(SourceDocument::from_extraction_json(source, &json)?);
            }

            let kb = KnowledgeBaseBuilder::new(provider)
                .with_chunking(chunking)
                .with_concurrency(concurrency)
                .build(&documents)
                .await?;

            storage::save_knowledge_base(&kb, &output)?;
            println!(
                "Built knowledge base: {} chunks from {} documents -> {}",
                kb.len(),
                documents.len(),
                output.display()
            );
            Ok(())
        }
        Commands::Retrieve {
            kb,
            questions,
            questions_file,
            top_k,
            top_p,
            positive_mass_only,
            output,
        } => {
            let questions = if !questions.is_empty() {
                questions
            } else if let Some(path) = questions_file {
                std::fs::read_to_string(path)?
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(String::from)
                    .collect()
            } else {
                return Err(anyhow::anyhow!(
                    "provide questions as arguments or via --questions-file"
                ));
            };

            let kb = storage::load_knowledge_base(&kb)?;
            let provider = Arc::new(OpenAiProvider::new(LlmConfig::from_env()?)?);
            let retriever = Retriever::new(provider, policy(top_k, top_p, positive_mass_only))?;

            let results = retriever.retrieve(&questions, &kb).await;
            storage::save_results(&results, &output)?;
            println!(
                "Retrieval complete: {}/{} questions -> {}",
                results.len(),
                questions.len(),
                output.display()
            );
            Ok(())
        }
        Commands::Answer { input, output } => {
            let results = storage::load_results(&input)?;
            let provider = Arc::new(OpenAiProvider::new(LlmConfig::from_env()?)?);
            let synthesizer = AnswerSynthesizer::new(provider);

            let answers = synthesizer.answer_all(&results).await;
            let failed = answers.iter().filter(|a| a.answer.is_error()).count();
            storage::save_answers(&answers, &output)?;
            println!(
                "Generated {} answers ({failed} failed) -> {}",
                answers.len(),
                output.display()
            );
            Ok(())
        }
        Commands::Ask {
            kb,
            question,
            top_k,
            top_p,
            positive_mass_only,
        } => {
            let kb = storage::load_knowledge_base(&kb)?;
            let config = LlmConfig::from_env()?;
            let provider = Arc::new(OpenAiProvider::new(config)?);

            let retriever = Retriever::new(
                Arc::clone(&provider) as Arc<dyn quill_ai_llm::EmbeddingProvider>,
                policy(top_k, top_p, positive_mass_only),
            )?;
            let result = retriever.retrieve_one(&question, &kb).await?;

            let synthesizer = AnswerSynthesizer::new(provider);
            let answer = synthesizer.answer(&result).await;

            println!("{}", answer.answer.text());
            println!("\n--- Retrieved context ---");
            for ctx in &answer.contexts {
                println!(
                    "  [{:.3}] {} > {} (Page {})",
                    ctx.score, ctx.source, ctx.section, ctx.page
                );
            }
            Ok(())
        }
        Commands::Stats { kb } => {
            let kb = storage::load_knowledge_base(&kb)?;
            println!("Knowledge base statistics:");
            println!("  Entries: {}", kb.len());
            println!(
                "  Embedding dimension: {}",
                kb.dimension()
                    .map(|d| d.to_string())
                    .unwrap_or_else(|| "n/a".to_string())
            );
            let sources = kb.sources();
            println!("  Sources ({}):", sources.len());
            for source in sources {
                println!("    {source}");
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_mapping() {
        assert_eq!(policy(Some(5), 0.9, false), SelectionPolicy::TopK(5));
        assert_eq!(
            policy(None, 0.8, false),
            SelectionPolicy::TopP {
                top_p: 0.8,
                positive_mass_only: false,
            }
        );
        assert_eq!(
            policy(None, 0.9, true),
            SelectionPolicy::TopP {
                top_p: 0.9,
                positive_mass_only: true,
            }
        );
    }

    #[test]
    fn test_ask_accepts_positive_mass_only_flag() {
        let args = Args::try_parse_from([
            "quill-ai-retriever",
            "ask",
            "--kb",
            "kb.csv",
            "--positive-mass-only",
            "who approves expenses?",
        ])
        .unwrap();

        match args.command {
            Commands::Ask {
                top_k,
                top_p,
                positive_mass_only,
                ..
            } => {
                assert_eq!(
                    policy(top_k, top_p, positive_mass_only),
                    SelectionPolicy::TopP {
                        top_p: 0.9,
                        positive_mass_only: true,
                    }
                );
            }
            other => panic!("parsed unexpected command: {other:?}"),
        }
    }
}
