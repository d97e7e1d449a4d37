//! Match formation: the atomic transition from two reciprocal likes to one
//! Match, plus the reconciliation pass for conversation-less matches.

use anyhow::Result;
use tracing::{info, warn};

use crate::models::{Match, PairKey};
use crate::store::{ConversationStore, MatchStore, NotificationDispatch};

pub struct MatchFormation<M, C, N> {
    matches: M,
    chat: C,
    notify: N,
}

impl<M, C, N> MatchFormation<M, C, N>
where
    M: MatchStore,
    C: ConversationStore,
    N: NotificationDispatch,
{
    pub fn new(matches: M, chat: C, notify: N) -> Self {
        Self {
            matches,
            chat,
            notify,
        }
    }

    /// Idempotent. Formation triggered from either side converges on the
    /// canonical pair key; a racing loser observes the winner's match instead
    /// of erroring. Conversation creation and the notification are
    /// best-effort and happen only on first creation.
    pub async fn form_match(&self, x: &str, y: &str) -> Result<Match> {
        let pair = PairKey::new(x, y);
        let (mut m, created) = self.matches.create(&pair).await?;
        if !created {
            return Ok(m);
        }

        info!(
            match_id = %m.id,
            user_a = %pair.a(),
            user_b = %pair.b(),
            "match formed"
        );

        match self.chat.create_conversation(&pair).await {
            Ok(conversation_id) => {
                if let Err(err) = self.matches.set_conversation(&pair, conversation_id).await {
                    warn!(match_id = %m.id, "failed to record conversation id: {err:#}");
                } else {
                    m.conversation_id = Some(conversation_id);
                }
            }
            Err(err) => {
                // The match stands; the reconciler retries conversation
                // creation later.
                warn!(match_id = %m.id, "conversation creation failed: {err:#}");
            }
        }

        self.notify.notify_match(&pair, m.id).await;

        Ok(m)
    }
}

/// One reconciliation sweep: retry conversation creation for matches that
/// still lack one. Returns how many were repaired. Per-match failures are
/// logged and skipped so one bad pair cannot stall the sweep.
pub async fn reconcile_conversations(
    matches: &impl MatchStore,
    chat: &impl ConversationStore,
    batch_size: i64,
) -> Result<usize> {
    let pending = matches.without_conversation(batch_size).await?;
    let mut repaired = 0;

    for m in pending {
        let pair = m.pair_key();
        match chat.create_conversation(&pair).await {
            Ok(conversation_id) => {
                matches.set_conversation(&pair, conversation_id).await?;
                info!(match_id = %m.id, %conversation_id, "backfilled conversation");
                repaired += 1;
            }
            Err(err) => {
                warn!(match_id = %m.id, "conversation retry failed: {err:#}");
            }
        }
    }

    Ok(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{MemoryConversationStore, MemoryMatchStore, MemoryNotifier};

    fn formation() -> (
        MatchFormation<MemoryMatchStore, MemoryConversationStore, MemoryNotifier>,
        MemoryMatchStore,
        MemoryConversationStore,
        MemoryNotifier,
    ) {
        let matches = MemoryMatchStore::new();
        let chat = MemoryConversationStore::new();
        let notifier = MemoryNotifier::new();
        let formation = MatchFormation::new(matches.clone(), chat.clone(), notifier.clone());
        (formation, matches, chat, notifier)
    }

    #[tokio::test]
    async fn pair_key_is_canonical() {
        assert_eq!(PairKey::new("bob", "alice"), PairKey::new("alice", "bob"));
        assert_eq!(PairKey::new("alice", "bob").a(), "alice");
        assert_eq!(PairKey::new("bob", "alice").b(), "bob");
    }

    #[tokio::test]
    async fn formation_from_either_side_yields_the_same_match() {
        let (formation, _, chat, notifier) = formation();

        let first = formation.form_match("bob", "alice").await.unwrap();
        let second = formation.form_match("alice", "bob").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(chat.conversation_count(), 1);
        // Side effects fire on first creation only.
        assert_eq!(notifier.delivered(), 1);
    }

    #[tokio::test]
    async fn reconcile_backfills_missing_conversations() {
        let (formation, matches, chat, _) = formation();

        chat.set_failing(true);
        let m = formation.form_match("alice", "bob").await.unwrap();
        assert!(m.conversation_id.is_none());

        // Chat store still down: nothing repaired, nothing lost.
        let repaired = reconcile_conversations(&matches, &chat, 10).await.unwrap();
        assert_eq!(repaired, 0);

        chat.set_failing(false);
        let repaired = reconcile_conversations(&matches, &chat, 10).await.unwrap();
        assert_eq!(repaired, 1);

        let stored = matches.find(&m.pair_key()).await.unwrap().unwrap();
        assert!(stored.conversation_id.is_some());

        // Nothing left to reconcile.
        let repaired = reconcile_conversations(&matches, &chat, 10).await.unwrap();
        assert_eq!(repaired, 0);
    }
}
