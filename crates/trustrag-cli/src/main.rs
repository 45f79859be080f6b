//! Command-line front end for the trustrag pipeline.
//!
//! `trustrag ask` answers one query in a chosen mode; `trustrag
//! compare` answers it under every mode side by side. Both load a
//! plain-text corpus from a directory and talk to the OpenAI API via
//! `OPENAI_API_KEY`.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use trustrag_core::{Corpus, CorpusRetriever, ResponseBundle};
use trustrag_runtime::{OpenAiProvider, Pipeline, PipelineConfig};

#[derive(Parser)]
#[command(name = "trustrag", version, about = "Trust-annotated RAG answer pipeline")]
struct Cli {
    /// Directory of .txt documents to retrieve from
    #[arg(long, global = true, default_value = "data")]
    corpus: PathBuf,

    /// Optional YAML pipeline configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the number of evidence items to retrieve
    #[arg(short, global = true)]
    k: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer a query in one mode
    Ask {
        query: String,

        /// baseline, rag, or responsible
        #[arg(long, default_value = "responsible")]
        mode: String,

        /// Emit the full bundle as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Answer a query under every mode and compare
    Compare {
        query: String,

        /// Write the full comparison JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(k) = cli.k {
        config.k = k;
    }
    let corpus = Corpus::load_dir(&cli.corpus)
        .with_context(|| format!("failed to load corpus from {}", cli.corpus.display()))?;
    tracing::info!(chunks = corpus.len(), path = %cli.corpus.display(), "corpus loaded");
    let provider = OpenAiProvider::from_env().context("model provider is not configured")?;
    let pipeline = Pipeline::new(
        Arc::new(provider),
        Arc::new(CorpusRetriever::from(corpus)),
        config,
    );

    match cli.command {
        Command::Ask { query, mode, json } => {
            let result = pipeline.run_str(&query, &mode).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result.bundle)?);
            } else {
                print_bundle(&result.bundle);
                eprintln!(
                    "model calls: {} ({} cached), tokens: {}",
                    result.usage.llm_calls, result.usage.cache_hits, result.usage.total_tokens
                );
            }
        }
        Command::Compare { query, output } => {
            let comparison = pipeline.compare_modes(&query).await?;
            let json = serde_json::to_string_pretty(&comparison)?;
            match output {
                Some(path) => {
                    fs::write(&path, &json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    eprintln!("comparison written to {}", path.display());
                }
                None => println!("{json}"),
            }
            for bundle in [
                &comparison.baseline,
                &comparison.rag,
                &comparison.responsible,
            ] {
                let overall = bundle
                    .trust
                    .as_ref()
                    .map(|t| t.overall.to_string())
                    .unwrap_or_else(|| "-".to_string());
                eprintln!(
                    "{:<12} overall trust {:<8} findings {:<2} degradations {}",
                    bundle.mode.to_string(),
                    overall,
                    bundle.findings.len(),
                    bundle.degradations.len()
                );
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&std::path::Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_yaml::from_str(&raw)
                .with_context(|| format!("invalid pipeline config in {}", path.display()))
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn print_bundle(bundle: &ResponseBundle) {
    println!("mode: {}", bundle.mode);

    if let Some(answer) = &bundle.final_answer {
        println!("\n{}\n", answer.text);
    } else {
        println!("\n(no final answer)\n");
    }

    if !bundle.evidence.is_empty() {
        println!("sources:");
        for item in &bundle.evidence {
            println!("  [S{}] {} ({:.2})", item.rank, item.source_id, item.similarity);
        }
    }

    if !bundle.findings.is_empty() {
        println!("findings:");
        for finding in &bundle.findings {
            println!(
                "  [{}] {}: {}",
                finding.severity, finding.category, finding.description
            );
        }
    }
    if let Some(summary) = &bundle.critic_summary {
        println!("critic: {summary}");
    }

    if let Some(trust) = &bundle.trust {
        println!(
            "trust: overall {} | grounding {} | safety {} | evidence {}",
            trust.overall, trust.grounding, trust.safety, trust.evidence
        );
    }

    for degradation in &bundle.degradations {
        println!("degraded: {degradation:?}");
    }

    if bundle.outcome.is_cancelled() {
        println!("note: request was cancelled; results are partial");
    }
}
