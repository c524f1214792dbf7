use std::convert::Infallible;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::StoreNode;
use crate::StreamTermination;

/// Upper bound for any single wait in async tests
pub(crate) const WAIT: Duration = Duration::from_secs(2);

pub(crate) fn route_node(value: &'static str) -> StoreNode {
    StoreNode::new("/routes/r1", value)
}

pub(crate) async fn next_chunk(body_rx: &mut mpsc::Receiver<Result<Bytes, Infallible>>) -> Bytes {
    match timeout(WAIT, body_rx.recv()).await {
        Ok(Some(Ok(chunk))) => chunk,
        other => panic!("expected a body chunk, got {other:?}"),
    }
}

pub(crate) async fn finish(task: JoinHandle<StreamTermination>) -> StreamTermination {
    timeout(WAIT, task)
        .await
        .expect("subscription should terminate")
        .expect("subscription task should not panic")
}
