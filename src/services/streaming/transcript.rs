use crate::types::StreamOutcome;

/// Everything a stream forwarded before it closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcript {
    pub text: String,
    pub fragments: usize,
    pub outcome: StreamOutcome,
}

/// Runs once when the forwarded stream closes, whatever the exit path.
pub type CompletionHook = Box<dyn FnOnce(Transcript) + Send + 'static>;

/// Accumulates forwarded fragments and fires the completion hook exactly once.
///
/// The hook fires on [`finish`](Self::finish) or, failing that, on drop. A
/// guard dropped without `finish` means the transport let go of the stream
/// early, so the outcome defaults to [`StreamOutcome::ClientAbort`].
pub struct TranscriptGuard {
    text: String,
    fragments: usize,
    outcome: StreamOutcome,
    hook: Option<CompletionHook>,
}

impl TranscriptGuard {
    pub fn new(hook: CompletionHook) -> Self {
        Self {
            text: String::new(),
            fragments: 0,
            outcome: StreamOutcome::ClientAbort,
            hook: Some(hook),
        }
    }

    pub fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.fragments += 1;
    }

    /// Drop the hook without running it.
    pub fn disarm(mut self) {
        self.hook = None;
    }

    pub fn finish(&mut self, outcome: StreamOutcome) {
        self.outcome = outcome;
        self.fire();
    }

    fn fire(&mut self) {
        let Some(hook) = self.hook.take() else {
            return;
        };
        tracing::debug!(
            outcome = %self.outcome,
            fragments = self.fragments,
            chars = self.text.len(),
            "stream closed"
        );
        hook(Transcript {
            text: std::mem::take(&mut self.text),
            fragments: self.fragments,
            outcome: self.outcome,
        });
    }
}

impl Drop for TranscriptGuard {
    fn drop(&mut self) {
        self.fire();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording_hook() -> (CompletionHook, Arc<Mutex<Vec<Transcript>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let hook: CompletionHook = Box::new(move |t| sink.lock().unwrap().push(t));
        (hook, seen)
    }

    #[test]
    fn test_finish_fires_once() {
        let (hook, seen) = recording_hook();
        let mut guard = TranscriptGuard::new(hook);
        guard.push("a");
        guard.push("b");
        guard.finish(StreamOutcome::Completed);
        guard.finish(StreamOutcome::UpstreamError);
        drop(guard);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].text, "ab");
        assert_eq!(seen[0].fragments, 2);
        assert_eq!(seen[0].outcome, StreamOutcome::Completed);
    }

    #[test]
    fn test_drop_without_finish_is_client_abort() {
        let (hook, seen) = recording_hook();
        let mut guard = TranscriptGuard::new(hook);
        guard.push("partial");
        assert!(seen.lock().unwrap().is_empty());
        drop(guard);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].outcome, StreamOutcome::ClientAbort);
        assert_eq!(seen[0].text, "partial");
    }

    #[test]
    fn test_disarmed_guard_never_fires() {
        let (hook, seen) = recording_hook();
        let mut guard = TranscriptGuard::new(hook);
        guard.push("unused");
        guard.disarm();
        assert!(seen.lock().unwrap().is_empty());
    }
}
