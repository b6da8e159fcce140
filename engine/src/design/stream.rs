//! Result Streaming Adapter
//!
//! Carries per-round results from a design agent to a consumer one at a time.
//! The channel holds a single item and every item carries a one-shot
//! acknowledgement: the producer resumes only after the consumer has taken
//! the previous result. A round of [`SENTINEL_ROUND`](sdk::SENTINEL_ROUND)
//! ends the stream.
//!
//! Producer and relay share a [`CancellationToken`]. When the transport
//! fails the relay cancels it, and the producing loop is dropped at its next
//! suspension point.

use async_trait::async_trait;
use sdk::{EngineError, FinalTaskDesignResult, TaskDesignResult};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::agent::DesignAgent;

/// One result in flight, waiting for acknowledgement
#[derive(Debug)]
pub struct Delivery {
    result: TaskDesignResult,
    ack: oneshot::Sender<()>,
}

impl Delivery {
    pub fn result(&self) -> &TaskDesignResult {
        &self.result
    }

    /// Release the producer and take the result
    pub fn acknowledge(self) -> TaskDesignResult {
        // The producer may already be gone; the result is still valid.
        let _ = self.ack.send(());
        self.result
    }
}

/// Producer half of a result channel
#[derive(Debug, Clone)]
pub struct ResultSender {
    tx: mpsc::Sender<Delivery>,
}

impl ResultSender {
    /// Push a result and wait until the consumer acknowledges it
    ///
    /// # Errors
    /// `StreamClosed` if the receiver is dropped, or if the delivery is
    /// dropped without being acknowledged
    pub async fn send(&self, result: TaskDesignResult) -> Result<(), EngineError> {
        let round = result.conversation_round;
        let (ack, acked) = oneshot::channel();
        self.tx
            .send(Delivery { result, ack })
            .await
            .map_err(|_| EngineError::StreamClosed)?;
        acked.await.map_err(|_| EngineError::StreamClosed)?;
        tracing::trace!("Round {} acknowledged", round);
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half of a result channel
#[derive(Debug)]
pub struct ResultReceiver {
    rx: mpsc::Receiver<Delivery>,
}

impl ResultReceiver {
    /// Next delivery, or `None` once every sender is gone
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.rx.recv().await
    }

    /// Next delivery if one is already waiting
    pub fn try_recv(&mut self) -> Option<Delivery> {
        self.rx.try_recv().ok()
    }
}

/// Bounded result channel with room for a single unacknowledged result
pub fn result_channel() -> (ResultSender, ResultReceiver) {
    let (tx, rx) = mpsc::channel(1);
    (ResultSender { tx }, ResultReceiver { rx })
}

/// Outbound side of a streaming session (a WebSocket, stdout, a test buffer)
#[async_trait]
pub trait ResultTransport: Send {
    async fn send(&mut self, result: &TaskDesignResult) -> Result<(), EngineError>;

    /// Called once after the sentinel has been sent
    async fn finish(&mut self) -> Result<(), EngineError>;
}

/// Forward results from `receiver` to `transport` in order
///
/// Each result is acknowledged only after the transport accepted it. The
/// sentinel is forwarded too, then `finish()` is called and the relay stops.
///
/// # Errors
/// - `TransportDisconnected` if the transport fails; the token is cancelled
/// - `Cancelled` if the token is cancelled elsewhere
/// - `StreamClosed` if the producer hangs up before sending the sentinel
pub async fn relay_results<T>(
    mut receiver: ResultReceiver,
    transport: &mut T,
    token: CancellationToken,
) -> Result<(), EngineError>
where
    T: ResultTransport + ?Sized,
{
    loop {
        let delivery = tokio::select! {
            _ = token.cancelled() => return Err(EngineError::Cancelled),
            delivery = receiver.recv() => delivery,
        };

        let Some(delivery) = delivery else {
            tracing::debug!("Producer closed the result stream without a sentinel");
            return Err(EngineError::StreamClosed);
        };

        let is_sentinel = delivery.result().is_sentinel();
        if let Err(e) = transport.send(delivery.result()).await {
            tracing::warn!("Result transport failed: {}", e);
            token.cancel();
            return Err(EngineError::TransportDisconnected(e.to_string()));
        }
        let result = delivery.acknowledge();

        if is_sentinel {
            tracing::debug!("Sentinel relayed, closing transport");
            return transport.finish().await.map_err(|e| {
                token.cancel();
                EngineError::TransportDisconnected(e.to_string())
            });
        }
        tracing::debug!("Relayed round {}", result.conversation_round);
    }
}

/// Run `agent` with its results streamed to `transport`
///
/// Producer and relay run concurrently on the current task. A cancelled
/// token drops the producing loop, so no summary is returned.
pub async fn run_streaming_session<T>(
    agent: &mut dyn DesignAgent,
    transport: &mut T,
    token: CancellationToken,
) -> Result<FinalTaskDesignResult, EngineError>
where
    T: ResultTransport + ?Sized,
{
    let (sender, receiver) = result_channel();

    let producer = async {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(EngineError::Cancelled),
            result = agent.handle_task(Some(sender)) => result,
        }
    };
    let relay = relay_results(receiver, transport, token.clone());

    let (produced, relayed) = tokio::join!(producer, relay);

    // A producer failure explains why the relay stopped, so it wins.
    let summary = produced?;
    relayed?;
    Ok(summary)
}
