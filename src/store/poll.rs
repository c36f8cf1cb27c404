//! Poll store.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::ident;
use crate::persist::{self, PersistError};
use crate::types::{Poll, PollOption, PublishOutcome, VoteOutcome, DEV_USER};

impl Poll {
    pub fn new(submitter: &str, id: &str, category: &str, text: &str, options: Vec<PollOption>) -> Self {
        Self {
            submitter: submitter.to_string(),
            id: id.to_string(),
            text: text.to_string(),
            category: category.to_string(),
            options,
            responses: std::collections::HashMap::new(),
            published: false,
            just_published: false,
        }
    }

    pub fn publish(&mut self) -> bool {
        if self.published {
            return false;
        }
        self.published = true;
        self.just_published = true;
        true
    }

    pub fn display_id(&self) -> String {
        ident::display_id(&self.id, &self.category)
    }

    /// The poll and its options, keys sorted as strings.
    pub fn pretty_print(&self) -> String {
        let mut output = format!("({}): {}\n", self.display_id(), self.text);
        let mut options: Vec<&PollOption> = self.options.iter().collect();
        options.sort_by(|a, b| a.key.cmp(&b.key));
        for option in options {
            output.push_str(&format!("    ({}): {}\n", option.key, option.label));
        }
        output
    }

    /// Render vote tallies. Zero-count options are included, and the
    /// rendered lines (header included) sort in reverse lexicographic
    /// order before joining.
    pub fn display_results(&self) -> String {
        let mut output = format!("({}): {}\n", self.display_id(), self.text);
        for option in &self.options {
            let count = self.responses.values().filter(|v| *v == &option.key).count();
            output.push_str(&format!("    {} - {}\n", count, option.label));
        }
        let mut lines: Vec<&str> = output.split('\n').collect();
        lines.sort_by(|a, b| b.cmp(a));
        lines.join("\n")
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PollsSnapshot {
    polls: Vec<Poll>,
}

/// Store of live polls. Expired polls are dropped outright, with no
/// history hand-off.
pub struct PollKeeper {
    polls: RwLock<Vec<Poll>>,
    path: PathBuf,
}

impl PollKeeper {
    pub fn load(data_dir: &Path) -> Result<Self, PersistError> {
        let path = data_dir.join("polls.json");
        let snapshot: PollsSnapshot = persist::load_or_init(&path)?;
        Ok(Self {
            polls: RwLock::new(snapshot.polls),
            path,
        })
    }

    fn save(&self, polls: &[Poll]) -> Result<(), PersistError> {
        let snapshot = PollsSnapshot {
            polls: polls.to_vec(),
        };
        persist::write_snapshot(&self.path, &snapshot)
    }

    pub async fn add_poll(
        &self,
        submitter: &str,
        raw_id: &str,
        text: &str,
        options: Vec<PollOption>,
    ) -> Result<bool, PersistError> {
        let (id, category) = ident::split_category(raw_id);
        let mut polls = self.polls.write().await;
        if polls.iter().any(|p| ident::ids_match(&p.id, id)) {
            return Ok(false);
        }
        polls.push(Poll::new(submitter, id, category, text, options));
        info!(id, submitter, "poll added");
        self.save(&polls)?;
        Ok(true)
    }

    /// Remove a poll. Only the submitter (or the developer) may remove.
    pub async fn remove_poll(&self, raw_id: &str, user: &str) -> Result<Option<Poll>, PersistError> {
        let (id, _) = ident::split_category(raw_id);
        let mut polls = self.polls.write().await;
        let pos = polls
            .iter()
            .position(|p| ident::ids_match(&p.id, id) && (p.submitter == user || user == DEV_USER));
        match pos {
            Some(i) => {
                let removed = polls.remove(i);
                self.save(&polls)?;
                Ok(Some(removed))
            }
            None => Ok(None),
        }
    }

    pub async fn get_poll_by_id(&self, raw_id: &str) -> Option<Poll> {
        let (id, _) = ident::split_category(raw_id);
        self.polls
            .read()
            .await
            .iter()
            .find(|p| ident::ids_match(&p.id, id))
            .cloned()
    }

    pub async fn get_submitter_by_pid(&self, raw_id: &str) -> Option<String> {
        self.get_poll_by_id(raw_id).await.map(|p| p.submitter)
    }

    /// Record a vote. The poll must exist and be published; an unknown
    /// option key is rejected; a repeat vote replaces the previous one.
    pub async fn submit_response(
        &self,
        raw_id: &str,
        user: &str,
        vote: &str,
    ) -> Result<VoteOutcome, PersistError> {
        let (id, _) = ident::split_category(raw_id);
        let mut polls = self.polls.write().await;
        let p = match polls
            .iter_mut()
            .find(|p| ident::ids_match(&p.id, id) && p.published)
        {
            Some(p) => p,
            None => return Ok(VoteOutcome::NotFound),
        };
        if !p.options.iter().any(|o| o.key == vote) {
            return Ok(VoteOutcome::BadVote);
        }
        p.responses.insert(user.to_string(), vote.to_string());
        self.save(&polls)?;
        Ok(VoteOutcome::Accepted)
    }

    pub async fn publish_by_id(&self, raw_id: &str) -> Result<PublishOutcome, PersistError> {
        let (id, _) = ident::split_category(raw_id);
        let mut polls = self.polls.write().await;
        let found = polls.iter_mut().find(|p| ident::ids_match(&p.id, id));
        match found {
            Some(p) => {
                if p.publish() {
                    self.save(&polls)?;
                    Ok(PublishOutcome::Published)
                } else {
                    Ok(PublishOutcome::AlreadyPublished)
                }
            }
            None => Ok(PublishOutcome::NotFound),
        }
    }

    pub async fn publish_all_by_user(&self, user: &str) -> Result<Vec<String>, PersistError> {
        let mut polls = self.polls.write().await;
        let mut published = Vec::new();
        for p in polls.iter_mut().filter(|p| p.submitter == user) {
            if p.publish() {
                published.push(p.display_id());
            }
        }
        if !published.is_empty() {
            self.save(&polls)?;
        }
        Ok(published)
    }

    /// Drain polls flagged as freshly published, returning their pretty
    /// prints for announcement. Empty when nothing is fresh.
    pub async fn first_time_display(&self) -> Result<String, PersistError> {
        let mut polls = self.polls.write().await;
        let mut output = String::new();
        for p in polls.iter_mut().filter(|p| p.just_published) {
            p.just_published = false;
            output.push_str(&p.pretty_print());
            output.push('\n');
        }
        if !output.is_empty() {
            self.save(&polls)?;
        }
        Ok(output)
    }

    /// Remove the caller's polls. With an id, only that poll; with an empty
    /// id, all of the caller's polls. Owner-scoped, no developer bypass.
    /// Returns the removed polls' pretty prints.
    pub async fn expire_polls(&self, raw_id: &str, user: &str) -> Result<Vec<String>, PersistError> {
        let (id, _) = ident::split_category(raw_id);
        let mut polls = self.polls.write().await;
        let mut removed = Vec::new();
        let mut i = 0;
        while i < polls.len() {
            let matches = id.is_empty() || ident::ids_match(&polls[i].id, id);
            if polls[i].submitter == user && matches {
                removed.push(polls.remove(i).pretty_print());
            } else {
                i += 1;
            }
        }
        if !removed.is_empty() {
            info!(user, count = removed.len(), "polls expired");
            self.save(&polls)?;
        }
        Ok(removed)
    }

    /// All published polls, pretty printed.
    pub async fn list_polls(&self) -> String {
        let mut output = String::new();
        for p in self.polls.read().await.iter().filter(|p| p.published) {
            output.push_str(&p.pretty_print());
            output.push('\n');
        }
        output
    }

    /// All of a user's polls, published ones marked.
    pub async fn list_polls_by_user(&self, user: &str) -> String {
        let mut output = String::new();
        for p in self.polls.read().await.iter().filter(|p| p.submitter == user) {
            let mut text = p.pretty_print();
            if p.published {
                text.pop();
                text.push_str(" (published)\n");
            }
            output.push_str(&text);
            output.push('\n');
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> Vec<PollOption> {
        vec![
            PollOption {
                key: "1".into(),
                label: "Team Cats".into(),
            },
            PollOption {
                key: "2".into(),
                label: "Team Dogs".into(),
            },
        ]
    }

    #[tokio::test]
    async fn vote_requires_published_poll() {
        let dir = tempfile::tempdir().unwrap();
        let k = PollKeeper::load(dir.path()).unwrap();
        k.add_poll("U1", "p1", "Cats or dogs?", options()).await.unwrap();
        assert_eq!(
            k.submit_response("p1", "U2", "1").await.unwrap(),
            VoteOutcome::NotFound
        );
        k.publish_by_id("p1").await.unwrap();
        assert_eq!(
            k.submit_response("p1", "U2", "1").await.unwrap(),
            VoteOutcome::Accepted
        );
    }

    #[tokio::test]
    async fn unknown_key_is_a_bad_vote() {
        let dir = tempfile::tempdir().unwrap();
        let k = PollKeeper::load(dir.path()).unwrap();
        k.add_poll("U1", "p1", "Cats or dogs?", options()).await.unwrap();
        k.publish_by_id("p1").await.unwrap();
        assert_eq!(
            k.submit_response("p1", "U2", "3").await.unwrap(),
            VoteOutcome::BadVote
        );
    }

    #[tokio::test]
    async fn last_vote_wins() {
        let dir = tempfile::tempdir().unwrap();
        let k = PollKeeper::load(dir.path()).unwrap();
        k.add_poll("U1", "p1", "Cats or dogs?", options()).await.unwrap();
        k.publish_by_id("p1").await.unwrap();
        k.submit_response("p1", "U2", "2").await.unwrap();
        k.submit_response("p1", "U2", "1").await.unwrap();
        let p = k.get_poll_by_id("p1").await.unwrap();
        assert_eq!(p.responses["U2"], "1");
        assert_eq!(p.responses.len(), 1);
    }

    #[tokio::test]
    async fn results_sort_reverse_lexicographically() {
        let dir = tempfile::tempdir().unwrap();
        let k = PollKeeper::load(dir.path()).unwrap();
        k.add_poll("U1", "p1", "Cats or dogs?", options()).await.unwrap();
        k.publish_by_id("p1").await.unwrap();
        k.submit_response("p1", "U2", "2").await.unwrap();

        let p = k.get_poll_by_id("p1").await.unwrap();
        let rendered = p.display_results();
        let lines: Vec<&str> = rendered.split('\n').collect();
        // Header sorts above the indented tally lines, "1 - Team Dogs"
        // above "0 - Team Cats", and the trailing blank line last. Zero
        // counts stay visible.
        assert_eq!(
            lines,
            vec![
                "(p1): Cats or dogs?",
                "    1 - Team Dogs",
                "    0 - Team Cats",
                "",
            ]
        );
    }

    #[tokio::test]
    async fn pretty_print_sorts_keys_as_strings() {
        let dir = tempfile::tempdir().unwrap();
        let k = PollKeeper::load(dir.path()).unwrap();
        let mut opts = options();
        opts.push(PollOption {
            key: "10".into(),
            label: "Team Birds".into(),
        });
        k.add_poll("U1", "p1", "Favorite?", opts).await.unwrap();
        let p = k.get_poll_by_id("p1").await.unwrap();
        let rendered = p.pretty_print();
        // String ordering puts "10" between "1" and "2".
        let pos1 = rendered.find("(1):").unwrap();
        let pos10 = rendered.find("(10):").unwrap();
        let pos2 = rendered.find("(2):").unwrap();
        assert!(pos1 < pos10 && pos10 < pos2);
    }

    #[tokio::test]
    async fn expire_without_id_clears_all_owned() {
        let dir = tempfile::tempdir().unwrap();
        let k = PollKeeper::load(dir.path()).unwrap();
        k.add_poll("U1", "p1", "a", options()).await.unwrap();
        k.add_poll("U1", "p2", "b", options()).await.unwrap();
        k.add_poll("U2", "p3", "c", options()).await.unwrap();
        let removed = k.expire_polls("", "U1").await.unwrap();
        assert_eq!(removed.len(), 2);
        assert!(k.get_poll_by_id("p1").await.is_none());
        assert!(k.get_poll_by_id("p3").await.is_some());
    }

    #[tokio::test]
    async fn snapshot_round_trips_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let k = PollKeeper::load(dir.path()).unwrap();
            k.add_poll("U1", "\"Fun\"p1", "Cats or dogs?", options())
                .await
                .unwrap();
            k.publish_by_id("p1").await.unwrap();
            k.submit_response("p1", "U2", "1").await.unwrap();
        }
        let k = PollKeeper::load(dir.path()).unwrap();
        let p = k.get_poll_by_id("p1").await.unwrap();
        assert_eq!(p.category, "Fun");
        assert!(p.published);
        assert_eq!(p.responses["U2"], "1");
    }
}
