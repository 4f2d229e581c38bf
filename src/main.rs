use std::env;
use std::path::PathBuf;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use ragdesk::{AgentManager, Config};

/// Ingest the files given on the command line, then answer questions read
/// from stdin, one per line.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    ragdesk::logging::init(&config);

    let manager = AgentManager::new(config).context("failed to initialize the pipeline")?;

    match manager.check_connection().await {
        Ok(models) => tracing::info!("connected to Ollama; available models: {:?}", models),
        Err(err) => tracing::warn!("Ollama is not reachable yet: {}", err),
    }

    let paths: Vec<PathBuf> = env::args().skip(1).map(PathBuf::from).collect();
    if !paths.is_empty() {
        let report = manager
            .process_documents(&paths)
            .await
            .context("document processing failed")?;
        tracing::info!(
            "ingested {} document(s) as {} chunk(s) ({} degraded)",
            report.documents_processed,
            report.chunks_created,
            report.degraded_chunks
        );
    }

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    stdout.write_all(b"question> ").await?;
    stdout.flush().await?;
    while let Some(line) = lines.next_line().await? {
        let question = line.trim();
        if question.is_empty() {
            stdout.write_all(b"question> ").await?;
            stdout.flush().await?;
            continue;
        }

        match manager.ask_question(question).await {
            Ok(answer) => {
                stdout.write_all(answer.text.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                for source in &answer.sources {
                    let line = format!(
                        "  [{}] {} (relevance {:.2}{})\n",
                        source.chunk_id,
                        source.source,
                        source.score,
                        if source.degraded { ", degraded" } else { "" }
                    );
                    stdout.write_all(line.as_bytes()).await?;
                }
            }
            Err(err) => tracing::error!("could not answer: {}", err),
        }

        stdout.write_all(b"question> ").await?;
        stdout.flush().await?;
    }

    Ok(())
}
