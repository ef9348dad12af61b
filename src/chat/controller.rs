use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{unbounded, Receiver, Sender};

use super::interpreter::{handle_command, Effect, JobOutcome, ModelJob, Services};
use super::types::{
    conversation_turns, mentions_assistant, ChatMessage, MentionMatch, CONTEXT_TURNS, SYSTEM,
};
use crate::notify::Notifier;
use crate::store::{subscribe, MessageStore, Subscription};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AuthState {
    Unauthenticated,
    Authenticated,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FeedState {
    Inactive,
    Active,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum IdentityEvent {
    SignedIn(String),
    SignedOut,
}

/// Model jobs normally get their own thread; `Inline` runs them on the
/// caller so outcomes are observable without waiting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum JobMode {
    Threaded,
    #[cfg(test)]
    Inline,
}

#[derive(Debug)]
pub(crate) enum SessionEvent {
    ModelFinished(JobOutcome),
}

/// Ids in `snapshot` that were not in `previous`, in feed order, plus the id
/// set to carry into the next delivery. The first delivery (`previous` is
/// `None`) reports nothing as fresh.
pub(crate) fn diff_snapshot<'a>(
    previous: Option<&HashSet<String>>,
    snapshot: &'a [ChatMessage],
) -> (HashSet<String>, Vec<&'a ChatMessage>) {
    let current = snapshot.iter().map(|m| m.id.clone()).collect::<HashSet<_>>();
    let fresh = match previous {
        Some(previous) => snapshot
            .iter()
            .filter(|m| !previous.contains(&m.id))
            .collect(),
        None => Vec::new(),
    };
    (current, fresh)
}

fn should_notify(msg: &ChatMessage, identity: Option<&str>) -> bool {
    msg.user != SYSTEM && identity != Some(msg.user.as_str())
}

/// Owns everything the chat screen shows: identity, the persisted feed, the
/// local-only messages and the bookkeeping for notifications.
pub(crate) struct ChatSession {
    identity: Option<String>,
    services: Services,
    notifier: Box<dyn Notifier>,
    mention: MentionMatch,
    poll_interval: Duration,
    job_mode: JobMode,

    events_tx: Sender<SessionEvent>,
    events_rx: Receiver<SessionEvent>,
    subscription: Option<Subscription>,

    persisted: Vec<ChatMessage>,
    local: Vec<ChatMessage>,
    hidden: HashSet<String>,
    seen_ids: Option<HashSet<String>>,
    local_seq: u64,
    pending_jobs: usize,
    /// Bumped whenever the visible feed changes.
    revision: u64,
}

impl ChatSession {
    pub(crate) fn new(
        services: Services,
        notifier: Box<dyn Notifier>,
        mention: MentionMatch,
        poll_interval: Duration,
    ) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            identity: None,
            services,
            notifier,
            mention,
            poll_interval,
            job_mode: JobMode::Threaded,
            events_tx,
            events_rx,
            subscription: None,
            persisted: Vec::new(),
            local: Vec::new(),
            hidden: HashSet::new(),
            seen_ids: None,
            local_seq: 0,
            pending_jobs: 0,
            revision: 0,
        }
    }

    pub(crate) fn with_job_mode(mut self, job_mode: JobMode) -> Self {
        self.job_mode = job_mode;
        self
    }

    pub(crate) fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub(crate) fn auth_state(&self) -> AuthState {
        if self.identity.is_some() {
            AuthState::Authenticated
        } else {
            AuthState::Unauthenticated
        }
    }

    pub(crate) fn feed_state(&self) -> FeedState {
        if self.subscription.is_some() {
            FeedState::Active
        } else {
            FeedState::Inactive
        }
    }

    pub(crate) fn pending_jobs(&self) -> usize {
        self.pending_jobs
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn apply_identity(&mut self, event: IdentityEvent) {
        let next = match event {
            IdentityEvent::SignedIn(identity) => Some(identity),
            IdentityEvent::SignedOut => None,
        };
        if self.identity != next {
            tracing::info!(identity = ?next, "identity changed");
            self.identity = next;
            self.revision = self.revision.wrapping_add(1);
        }
    }

    /// Starts the feed. The first snapshot afterwards is treated as history.
    pub(crate) fn mount(&mut self) {
        if self.subscription.is_some() {
            return;
        }
        self.notifier.request_permission();
        let store: Arc<dyn MessageStore> = self.services.store.clone();
        self.subscription = Some(subscribe(store, self.poll_interval));
        self.seen_ids = None;
        tracing::info!("feed subscription active");
    }

    /// Stops the feed. Jobs still in flight finish, but their outcomes are
    /// no longer delivered here.
    pub(crate) fn unmount(&mut self) {
        if self.subscription.take().is_none() {
            return;
        }
        let (events_tx, events_rx) = unbounded();
        self.events_tx = events_tx;
        self.events_rx = events_rx;
        self.pending_jobs = 0;
        tracing::info!("feed subscription inactive");
    }

    /// Drains feed snapshots and job outcomes. Returns true if anything
    /// was processed.
    pub(crate) fn poll(&mut self) -> bool {
        let snapshots = self
            .subscription
            .as_ref()
            .map(|sub| sub.receiver().try_iter().collect::<Vec<_>>())
            .unwrap_or_default();
        let events = self.events_rx.try_iter().collect::<Vec<_>>();
        let processed_any = !snapshots.is_empty() || !events.is_empty();

        for snapshot in snapshots {
            self.apply_snapshot(snapshot);
        }
        for event in events {
            match event {
                SessionEvent::ModelFinished(outcome) => self.finish_job(outcome),
            }
        }
        processed_any
    }

    pub(crate) fn apply_snapshot(&mut self, snapshot: Vec<ChatMessage>) {
        let (ids, fresh) = diff_snapshot(self.seen_ids.as_ref(), &snapshot);
        for msg in fresh {
            if should_notify(msg, self.identity.as_deref()) {
                self.notifier.notify(&msg.user, &msg.text);
            }
        }
        self.seen_ids = Some(ids);
        self.persisted = snapshot;
        self.revision = self.revision.wrapping_add(1);
    }

    /// Single entry point for composer input.
    pub(crate) fn send_message(&mut self, raw: &str) {
        let text = raw.trim();
        if text.is_empty() {
            return;
        }
        let Some(identity) = self.identity.clone() else {
            return;
        };

        if text.starts_with('/') {
            let effects = handle_command(text, Some(&identity));
            self.apply_effects(effects);
            return;
        }

        if !self.persist(&identity, text) {
            return;
        }
        if mentions_assistant(text, self.mention) {
            let history = conversation_turns(&self.persisted, &identity, CONTEXT_TURNS);
            self.start_job(ModelJob {
                prompt: text.to_string(),
                history,
            });
        }
    }

    pub(crate) fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ClearView => self.clear_view(),
                Effect::Local { user, text } => self.push_local(user, text),
                Effect::Persist { user, text } => {
                    if !self.persist(&user, &text) {
                        return;
                    }
                }
                Effect::AskModel(job) => self.start_job(job),
            }
        }
    }

    /// Persisted messages not hidden by `/clear`, merged with local ones by
    /// timestamp. Pending timestamps count as now.
    pub(crate) fn visible_messages(&self) -> Vec<&ChatMessage> {
        let now = Utc::now();
        let mut visible = self
            .persisted
            .iter()
            .filter(|m| !self.hidden.contains(&m.id))
            .chain(self.local.iter())
            .collect::<Vec<_>>();
        visible.sort_by_key(|m| m.timestamp.unwrap_or(now));
        visible
    }

    fn clear_view(&mut self) {
        self.hidden.extend(self.persisted.iter().map(|m| m.id.clone()));
        self.local.clear();
        self.revision = self.revision.wrapping_add(1);
    }

    fn push_local(&mut self, user: impl Into<String>, text: impl Into<String>) {
        self.local_seq += 1;
        self.local
            .push(ChatMessage::local(self.local_seq, user, text));
        self.revision = self.revision.wrapping_add(1);
    }

    fn persist(&mut self, user: &str, text: &str) -> bool {
        match self.services.store.append(user, text) {
            Ok(id) => {
                tracing::debug!(%id, %user, "message stored");
                true
            }
            Err(err) => {
                tracing::error!(error = %err, "message write failed");
                self.push_local(SYSTEM, format!("메시지 전송 실패: {err:#}"));
                false
            }
        }
    }

    fn start_job(&mut self, job: ModelJob) {
        self.pending_jobs += 1;
        match self.job_mode {
            #[cfg(test)]
            JobMode::Inline => {
                let outcome = job.run(&self.services);
                self.finish_job(outcome);
            }
            JobMode::Threaded => {
                let services = self.services.clone();
                let tx = self.events_tx.clone();
                std::thread::spawn(move || {
                    let outcome = job.run(&services);
                    let _ = tx.send(SessionEvent::ModelFinished(outcome));
                });
            }
        }
    }

    fn finish_job(&mut self, outcome: JobOutcome) {
        self.pending_jobs = self.pending_jobs.saturating_sub(1);
        if let JobOutcome::Failed(detail) = outcome {
            self.push_local(SYSTEM, detail);
        }
    }
}
