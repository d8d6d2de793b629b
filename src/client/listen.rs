use cache::Connection;
use clap::Args;
use cms_models::ContentSource;
use tokio::io::AsyncBufRead;

use crate::events::ContentEvent;
use crate::events::EventQueue;
use crate::events::read_events;
use crate::events::run_worker;
use crate::projection::Projector;

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Projects every document and synchronizes the references before the first event
    #[arg(long)]
    pub sweep_on_start: bool,
    /// Number of events read ahead of the one being handled
    #[arg(long, env, default_value_t = 64, value_parser = clap::value_parser!(u16).range(1..))]
    pub queue_capacity: u16,
}

/// Handles the events of stdin until it is closed
pub async fn listen<S: ContentSource>(
    args: ListenArgs,
    projector: &Projector<S>,
    conn: &mut Connection,
) -> anyhow::Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    handle_stream(stdin, args, projector, conn).await
}

async fn handle_stream<R: AsyncBufRead + Unpin, S: ContentSource>(
    reader: R,
    ListenArgs {
        sweep_on_start,
        queue_capacity,
    }: ListenArgs,
    projector: &Projector<S>,
    conn: &mut Connection,
) -> anyhow::Result<()> {
    let (queue, receiver) = EventQueue::new(queue_capacity.into());
    if sweep_on_start {
        queue.push(ContentEvent::ApplicationReady).await?;
    }
    tracing::info!("waiting for content events");
    let (nb_events, stats) = tokio::join!(
        read_events(reader, queue),
        run_worker(projector, conn, receiver)
    );
    let nb_events = nb_events?;
    tracing::info!(
        nb_events,
        handled = stats.handled,
        failed = stats.failed,
        "event stream closed"
    );
    Ok(())
}
