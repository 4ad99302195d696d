//! Pending JavaScript-execution futures, keyed by short random UIDs.

use parking_lot::Mutex;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rmpv::Value;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;

use lively_core::JsExecutionError;

/// Length of the execution-tracking UID.
const UID_LEN: usize = 6;

/// Generate a short unique ID for tracking JS execution results.
pub fn generate_uid() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(UID_LEN)
        .map(char::from)
        .collect()
}

type JsResult = Result<Value, JsExecutionError>;

/// The per-connection future table. The reader task completes entries as
/// `JS_EXECUTION_RESULT` messages arrive; closing the connection cancels
/// everything outstanding.
#[derive(Default)]
pub(crate) struct JsFutures {
    pending: Mutex<FxHashMap<String, oneshot::Sender<JsResult>>>,
}

impl JsFutures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register interest in the result for `uid`.
    pub fn register(&self, uid: &str) -> oneshot::Receiver<JsResult> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().insert(uid.to_owned(), tx);
        rx
    }

    /// Deliver a result. Unknown or already-expired UIDs are dropped.
    pub fn complete(&self, uid: &str, result: JsResult) {
        if let Some(sender) = self.pending.lock().remove(uid) {
            let _ = sender.send(result);
        }
    }

    /// Forget a pending entry (timeout expiry).
    pub fn forget(&self, uid: &str) {
        self.pending.lock().remove(uid);
    }

    /// Fail every outstanding future; awaiters see a disconnect error.
    pub fn cancel_all(&self) {
        let pending = std::mem::take(&mut *self.pending.lock());
        for (_, sender) in pending {
            let _ = sender.send(Err(JsExecutionError::Failed(
                "websocket disconnected".into(),
            )));
        }
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }
}

impl std::fmt::Debug for JsFutures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsFutures")
            .field("pending", &self.len())
            .finish()
    }
}
