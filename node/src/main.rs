//! Lensq command line.

mod cli;
mod logging;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, EnqueueCmd, ListCmd, RunCmd};
use dotenv::dotenv;
use lc_read_cache::PublicationCache;
use lc_reconcile::{QueueEvent, QueueOutcome, QueueSupervisor, QueuedPublicationView, ReconcileContext};
use lp_optimistic::{OptimisticTransaction, ProfileId};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    logging::init_logging()?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { run_command } => run((*run_command).load()?).await,
        Commands::Enqueue { enqueue_command } => enqueue(enqueue_command).await,
        Commands::List { list_command } => list(list_command).await,
    }
}

async fn run(run_cmd: RunCmd) -> anyhow::Result<()> {
    let queue = Arc::new(run_cmd.queue_params.open_store().await?);
    let lens = Arc::new(run_cmd.lens_params.provider()?);
    let config = run_cmd.reconcile_params.reconcile_config();

    tracing::info!("🌿 Lensq");
    tracing::info!("🌐 Lens API: {}", lens.api_url());
    tracing::info!("💾 Queue file: {}", run_cmd.queue_params.queue_file.display());
    if let Some(viewer) = &config.viewer {
        tracing::info!("👤 Viewer profile: {viewer}");
    }
    tracing::info!("⏳ {} pending transactions", queue.snapshot().len());

    let ctx = Arc::new(ReconcileContext::new(lens, queue, Arc::new(PublicationCache::new()), config));
    let supervisor = Arc::new(QueueSupervisor::new(ctx));
    let events = supervisor.subscribe_events();
    let supervisor_task = tokio::spawn({
        let supervisor = Arc::clone(&supervisor);
        async move { supervisor.run().await }
    });

    let settled = follow_events(events, tokio::signal::ctrl_c()).await?;

    tracing::info!("🛑 Shutting down, {settled} transactions settled");
    supervisor.shutdown();
    supervisor_task.await.context("Waiting for the poll tasks to stop")?;
    Ok(())
}

/// Logs queue events until `shutdown` resolves or the supervisor goes away. Returns how many
/// events were logged.
async fn follow_events(
    mut events: broadcast::Receiver<QueueEvent>,
    shutdown: impl Future<Output = std::io::Result<()>>,
) -> anyhow::Result<usize> {
    tokio::pin!(shutdown);
    let mut logged = 0;
    loop {
        tokio::select! {
            biased;
            event = events.recv() => match event {
                Ok(event) => {
                    log_event(&event);
                    logged += 1;
                }
                Err(RecvError::Lagged(skipped)) => tracing::warn!("Missed {skipped} queue events"),
                Err(RecvError::Closed) => break,
            },
            signal = &mut shutdown => {
                signal.context("Listening for ctrl-c")?;
                break;
            }
        }
    }
    Ok(logged)
}

fn log_event(event: &QueueEvent) {
    match &event.outcome {
        QueueOutcome::Reconciled { publication_id } => {
            tracing::info!("✅ {} is now publication {publication_id}", event.key)
        }
        QueueOutcome::Failed { reason } => {
            tracing::warn!("❌ {} failed: {}", event.key, reason.as_deref().unwrap_or("no reason given"))
        }
        QueueOutcome::Invalid { status } => tracing::warn!("❌ {} has invalid metadata ({status})", event.key),
        QueueOutcome::Abandoned { reason } => tracing::warn!("⚠️ Gave up on {}: {reason}", event.key),
    }
}

async fn enqueue(cmd: EnqueueCmd) -> anyhow::Result<()> {
    let txn = OptimisticTransaction::new(cmd.tx_hash, cmd.tx_id, cmd.content, cmd.attachment)?;
    let queue = cmd.queue_params.open_store().await?;
    let key = txn.effective_key().unwrap_or_default().to_owned();
    queue.enqueue(txn).await.context("Enqueuing transaction")?;
    tracing::info!("📥 Enqueued {key}, {} pending transactions", queue.snapshot().len());
    Ok(())
}

async fn list(cmd: ListCmd) -> anyhow::Result<()> {
    let queue = cmd.queue_params.open_store().await?;
    let viewer = cmd.profile_id.as_deref().map(ProfileId::from);
    let pending = queue.get().await;
    tracing::info!("⏳ {} pending transactions", pending.len());
    for view in pending.iter().filter_map(|txn| QueuedPublicationView::new(txn, viewer.as_ref())) {
        tracing::info!(
            tx_key = %view.key,
            author = ?view.author.as_ref().map(ToString::to_string),
            embed = ?view.embed,
            indexing = view.indexing,
            "📝 {}",
            view.content
        );
    }
    Ok(())
}
