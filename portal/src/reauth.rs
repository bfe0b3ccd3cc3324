//! Modal re-authentication.
//!
//! The prompt only collects credentials. The coordinator verifies them and
//! makes sure at most one prompt is open: callers that hit an expired
//! session while a prompt is already up wait for that prompt's result.

use std::future::Future;

use async_trait::async_trait;
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::{watch, Notify};

/// Reason shown when a call is rejected as unauthenticated.
pub const SESSION_EXPIRED_MESSAGE: &str = "Session expired. Please sign in again";
/// Shown inside the prompt when the backend rejects a submission.
pub const SIGNIN_FAILED_MESSAGE: &str = "Signin failed";

pub struct PromptSubmission {
    pub identity: String,
    pub secret: SecretString,
}

impl PromptSubmission {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: SecretString::from(secret.into()),
        }
    }
}

impl std::fmt::Debug for PromptSubmission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptSubmission")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl Clone for PromptSubmission {
    fn clone(&self) -> Self {
        Self {
            identity: self.identity.clone(),
            secret: SecretString::from(self.secret.expose_secret().to_owned()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PromptOutcome {
    Submitted(PromptSubmission),
    Cancelled,
}

/// Front-end side of the modal. Implementations never see pending actions.
#[async_trait]
pub trait ReauthPrompt: Send + Sync {
    /// Show the overlay with `reason` and wait for the first answer.
    async fn open(&self, reason: &str) -> PromptOutcome;

    /// Report a rejected submission inside the open overlay and wait again.
    async fn reject(&self, message: &str) -> PromptOutcome;

    /// Dismiss the overlay: credentials were accepted, or the session ended
    /// while it was open.
    fn close(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReauthResult {
    Restored,
    Abandoned,
}

/// Result of [`ReauthCoordinator::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReauthRun {
    pub result: ReauthResult,
    /// `true` when this caller waited on a prompt opened by another caller.
    pub joined: bool,
}

pub struct ReauthCoordinator<P> {
    prompt: P,
    in_flight: Mutex<Option<watch::Receiver<Option<ReauthResult>>>>,
    interrupt: Notify,
}

impl<P: ReauthPrompt> ReauthCoordinator<P> {
    pub fn new(prompt: P) -> Self {
        Self {
            prompt,
            in_flight: Mutex::new(None),
            interrupt: Notify::new(),
        }
    }

    pub fn prompt(&self) -> &P {
        &self.prompt
    }

    pub fn is_open(&self) -> bool {
        self.in_flight.lock().is_some()
    }

    /// Close the open prompt without verifying anything. Every caller of the
    /// interrupted run sees [`ReauthResult::Abandoned`]. Returns `false` when
    /// no prompt was open.
    pub fn cancel(&self) -> bool {
        if !self.is_open() {
            return false;
        }
        self.interrupt.notify_waiters();
        true
    }

    /// Open the prompt, or join the one already open.
    ///
    /// `verify` is called for each submission; `Err(message)` keeps the
    /// prompt open with that message.
    pub async fn run<F, Fut>(&self, reason: &str, verify: F) -> ReauthRun
    where
        F: Fn(PromptSubmission) -> Fut,
        Fut: Future<Output = Result<(), String>>,
    {
        let joined = {
            let mut slot = self.in_flight.lock();
            match slot.as_ref() {
                Some(receiver) => Err(receiver.clone()),
                None => {
                    let (sender, receiver) = watch::channel(None);
                    *slot = Some(receiver);
                    Ok(sender)
                }
            }
        };

        let sender = match joined {
            Ok(sender) => sender,
            Err(receiver) => {
                log::debug!("Joining the reauthentication prompt already open");
                return ReauthRun {
                    result: wait_for(receiver).await,
                    joined: true,
                };
            }
        };

        let result = tokio::select! {
            // an interrupt wins over a submission that became ready with it
            biased;
            _ = self.interrupt.notified() => {
                log::info!("Reauthentication interrupted, closing the prompt");
                self.prompt.close();
                ReauthResult::Abandoned
            }
            result = self.drive(reason, verify) => result,
        };
        self.in_flight.lock().take();
        // joined callers may have gone away
        let _ = sender.send(Some(result));
        ReauthRun {
            result,
            joined: false,
        }
    }

    async fn drive<F, Fut>(&self, reason: &str, verify: F) -> ReauthResult
    where
        F: Fn(PromptSubmission) -> Fut,
        Fut: Future<Output = Result<(), String>>,
    {
        let mut outcome = self.prompt.open(reason).await;
        loop {
            let submission = match outcome {
                PromptOutcome::Cancelled => {
                    log::info!("Reauthentication cancelled");
                    return ReauthResult::Abandoned;
                }
                PromptOutcome::Submitted(submission) => submission,
            };

            match verify(submission).await {
                Ok(()) => {
                    self.prompt.close();
                    return ReauthResult::Restored;
                }
                Err(message) => {
                    log::debug!("Reauthentication attempt rejected: {}", message);
                    outcome = self.prompt.reject(&message).await;
                }
            }
        }
    }
}

async fn wait_for(mut receiver: watch::Receiver<Option<ReauthResult>>) -> ReauthResult {
    loop {
        if let Some(result) = *receiver.borrow_and_update() {
            return result;
        }
        if receiver.changed().await.is_err() {
            return receiver.borrow().unwrap_or(ReauthResult::Abandoned);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct ScriptedPrompt {
        answers: Mutex<VecDeque<PromptOutcome>>,
        opened: AtomicUsize,
        rejections: Mutex<Vec<String>>,
        closed: AtomicUsize,
        gate: Option<Arc<Notify>>,
    }

    impl ScriptedPrompt {
        fn with(answers: Vec<PromptOutcome>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
                ..Self::default()
            }
        }

        fn next(&self) -> PromptOutcome {
            self.answers
                .lock()
                .pop_front()
                .unwrap_or(PromptOutcome::Cancelled)
        }
    }

    #[async_trait]
    impl ReauthPrompt for ScriptedPrompt {
        async fn open(&self, _reason: &str) -> PromptOutcome {
            self.opened.fetch_add(1, Ordering::SeqCst);
            match &self.gate {
                Some(gate) => gate.notified().await,
                None => tokio::task::yield_now().await,
            }
            self.next()
        }

        async fn reject(&self, message: &str) -> PromptOutcome {
            self.rejections.lock().push(message.to_string());
            self.next()
        }

        fn close(&self) {
            self.closed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn submitted(identity: &str, secret: &str) -> PromptOutcome {
        PromptOutcome::Submitted(PromptSubmission::new(identity, secret))
    }

    #[tokio::test]
    async fn cancelled_prompt_abandons() {
        let coordinator = ReauthCoordinator::new(ScriptedPrompt::with(vec![]));
        let run = coordinator
            .run(SESSION_EXPIRED_MESSAGE, |_| async { Ok(()) })
            .await;
        assert_eq!(run.result, ReauthResult::Abandoned);
        assert!(!run.joined);
        assert!(!coordinator.is_open());
    }

    #[tokio::test]
    async fn rejected_submission_keeps_prompt_open() {
        let prompt = ScriptedPrompt::with(vec![submitted("a", "wrong"), submitted("a", "right")]);
        let coordinator = ReauthCoordinator::new(prompt);
        let attempts = Arc::new(AtomicUsize::new(0));

        let run = coordinator
            .run(SESSION_EXPIRED_MESSAGE, |submission| {
                let attempts = attempts.clone();
                async move {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    if submission.secret.expose_secret() == "right" {
                        Ok(())
                    } else {
                        Err(SIGNIN_FAILED_MESSAGE.to_string())
                    }
                }
            })
            .await;

        assert_eq!(run.result, ReauthResult::Restored);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        let prompt = coordinator.prompt();
        assert_eq!(prompt.opened.load(Ordering::SeqCst), 1);
        assert_eq!(*prompt.rejections.lock(), vec![SIGNIN_FAILED_MESSAGE]);
        assert_eq!(prompt.closed.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_prompt() {
        let coordinator = ReauthCoordinator::new(ScriptedPrompt::with(vec![submitted("a", "b")]));

        let (first, second) = tokio::join!(
            coordinator.run(SESSION_EXPIRED_MESSAGE, |_| async { Ok(()) }),
            coordinator.run(SESSION_EXPIRED_MESSAGE, |_| async { Ok(()) }),
        );

        assert_eq!(coordinator.prompt().opened.load(Ordering::SeqCst), 1);
        assert_eq!(first.result, ReauthResult::Restored);
        assert_eq!(second.result, ReauthResult::Restored);
        assert!(!first.joined);
        assert!(second.joined);
    }

    #[tokio::test]
    async fn cancel_abandons_every_waiting_caller() {
        let prompt = ScriptedPrompt {
            gate: Some(Arc::new(Notify::new())),
            ..ScriptedPrompt::with(vec![submitted("a", "b")])
        };
        let coordinator = ReauthCoordinator::new(prompt);
        let verified = Arc::new(AtomicUsize::new(0));
        let verify = |_: PromptSubmission| {
            let verified = verified.clone();
            async move {
                verified.fetch_add(1, Ordering::SeqCst);
                Ok::<(), String>(())
            }
        };

        let (first, second, cancelled) = tokio::join!(
            coordinator.run(SESSION_EXPIRED_MESSAGE, verify),
            coordinator.run(SESSION_EXPIRED_MESSAGE, verify),
            async { coordinator.cancel() },
        );

        assert!(cancelled);
        assert_eq!(first.result, ReauthResult::Abandoned);
        assert_eq!(second.result, ReauthResult::Abandoned);
        assert!(second.joined);
        assert_eq!(verified.load(Ordering::SeqCst), 0);
        assert_eq!(coordinator.prompt().closed.load(Ordering::SeqCst), 1);
        assert!(!coordinator.is_open());
        assert!(!coordinator.cancel());
    }

    #[test]
    fn submission_debug_hides_secret() {
        let rendered = format!("{:?}", PromptSubmission::new("ann", "hunter2"));
        assert!(rendered.contains("ann"));
        assert!(!rendered.contains("hunter2"));
    }
}
