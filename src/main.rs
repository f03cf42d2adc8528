/*!
 * Multiwait - Receive Loop Demo
 *
 * Runs the classic service receive loop on the wait core:
 * - wait on "shutdown requested OR inbound queue non-empty OR stats tick"
 * - a producer thread queues messages, then requests shutdown
 */

use anyhow::Context;
use multiwait::{
    init_tracing, Event, MatchCondition, Semaphore, SyncConfig, Timer, WaitOutcome, WaitRegistry,
};
use parking_lot::Mutex as QueueLock;
use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

const MESSAGES: usize = 25;
const QUEUE_DEPTH: usize = 8;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = SyncConfig::from_env().context("loading MULTIWAIT_* configuration")?;
    info!(?config, "multiwait demo starting");
    let registry = WaitRegistry::new(config)?;

    let shutdown = Event::manual(&registry);
    let inbound = Semaphore::new(&registry, 0, QUEUE_DEPTH)?;
    let stats_tick = Timer::new(&registry, false)?;
    stats_tick.set(Duration::from_millis(50), Some(Duration::from_millis(50)))?;

    let queue: Arc<QueueLock<VecDeque<usize>>> = Arc::new(QueueLock::new(VecDeque::new()));

    let producer = {
        let inbound = inbound.clone();
        let shutdown = shutdown.clone();
        let queue = queue.clone();
        thread::Builder::new()
            .name("producer".into())
            .spawn(move || {
                for message in 0..MESSAGES {
                    // Back off while the queue is full
                    while queue.lock().len() >= QUEUE_DEPTH {
                        thread::sleep(Duration::from_millis(1));
                    }
                    queue.lock().push_back(message);
                    inbound.release(1);
                    thread::sleep(Duration::from_millis(5));
                }
                shutdown.set();
            })
            .context("spawning producer thread")?
    };

    let mut received = 0usize;
    loop {
        let outcome = registry.wait_for_multiple(
            // Inbound first so queued messages drain before shutdown wins
            &[&*inbound, &*shutdown, &*stats_tick],
            MatchCondition::AnyOne,
            Some(Duration::from_secs(5)),
        )?;

        match outcome {
            WaitOutcome::Index(0) => {
                if let Some(message) = queue.lock().pop_front() {
                    received += 1;
                    tracing::debug!(message, "message received");
                }
            }
            WaitOutcome::Index(1) => {
                info!(received, "shutdown requested");
                break;
            }
            WaitOutcome::Index(_) => {
                let stats = registry.stats();
                info!(
                    received,
                    waits = stats.waits,
                    blocked = stats.blocked,
                    fast_path = stats.fast_path,
                    "receive loop stats"
                );
            }
            WaitOutcome::Timeout => {
                warn!("no activity for 5s, stopping");
                break;
            }
            other => {
                warn!(%other, "unexpected wake");
                break;
            }
        }
    }

    stats_tick.cancel();
    producer
        .join()
        .map_err(|_| anyhow::anyhow!("producer thread panicked"))?;

    if received != MESSAGES {
        warn!(received, expected = MESSAGES, "messages left undelivered");
    }
    let stats = serde_json::to_string(&registry.stats()).context("encoding wait stats")?;
    info!(received, %stats, "multiwait demo finished");
    Ok(())
}
