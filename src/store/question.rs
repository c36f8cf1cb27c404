//! Question lifecycle store.

use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use crate::ident;
use crate::normalize;
use crate::persist::{self, PersistError};
use crate::store::HistoryLog;
use crate::types::{
    AnswerOutcome, PublishOutcome, Question, UserId, DEV_USER, EXPIRY_SECONDS, MAX_GUESSES,
};

impl Question {
    pub fn new(submitter: &str, id: &str, category: &str, text: &str, answers: Vec<String>) -> Self {
        Self {
            submitter: submitter.to_string(),
            id: id.to_string(),
            text: text.to_string(),
            correct_answers: answers,
            category: category.to_string(),
            init_time: Utc::now().timestamp(),
            publish_time: 0,
            expire_time: 0,
            published: false,
            just_published: false,
            answered_by: Vec::new(),
            guesses: std::collections::HashMap::new(),
        }
    }

    /// Add an accepted answer. Exact duplicates are allowed, matching the
    /// snapshot layout where answers are a plain list.
    pub fn add_answer(&mut self, answer: &str) {
        self.correct_answers.push(answer.to_string());
    }

    /// Remove an accepted answer by exact string match only.
    pub fn remove_answer(&mut self, answer: &str) -> bool {
        match self.correct_answers.iter().position(|a| a == answer) {
            Some(i) => {
                self.correct_answers.remove(i);
                true
            }
            None => false,
        }
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    /// Publish, idempotently. Re-publishing never resets the publish time.
    pub fn publish(&mut self, now: i64) -> bool {
        if self.published {
            return false;
        }
        self.published = true;
        self.just_published = true;
        self.publish_time = now;
        true
    }

    /// Manually credit a user. False when they were already credited.
    pub fn add_user_who_answered(&mut self, user: &str) -> bool {
        if self.answered_by.iter().any(|u| u == user) {
            return false;
        }
        self.answered_by.push(user.to_string());
        true
    }

    pub fn count_answers(&self) -> usize {
        self.answered_by.len()
    }

    pub fn count_guesses(&self) -> u32 {
        self.guesses.values().sum()
    }

    pub fn time_to_expire(&self, now: i64) -> bool {
        self.published && now - self.publish_time >= EXPIRY_SECONDS
    }

    /// True when `user` may still guess: not the submitter, not already
    /// credited, and guesses not exhausted.
    pub fn attemptable_by(&self, user: &str) -> bool {
        self.submitter != user
            && !self.answered_by.iter().any(|u| u == user)
            && self.guesses.get(user).copied().unwrap_or(0) < MAX_GUESSES
    }

    /// The id with its category prefix restored.
    pub fn display_id(&self) -> String {
        ident::display_id(&self.id, &self.category)
    }

    pub fn pretty_print(&self) -> String {
        format!("({}): {}", self.display_id(), self.text)
    }

    pub fn pretty_print_with_answers(&self) -> String {
        format!(
            "({}): {} : {}",
            self.display_id(),
            self.text,
            self.correct_answers.join(", ")
        )
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct QuestionsSnapshot {
    questions: Vec<Question>,
}

/// Store of live questions plus the expired-question history log.
///
/// All mutation goes through `&self` methods behind an `RwLock`, and every
/// mutating method ends in a snapshot write before returning.
pub struct QuestionKeeper {
    questions: RwLock<Vec<Question>>,
    path: PathBuf,
    history: HistoryLog,
}

impl QuestionKeeper {
    pub fn load(data_dir: &std::path::Path) -> Result<Self, PersistError> {
        let path = data_dir.join("questions.json");
        let snapshot: QuestionsSnapshot = persist::load_or_init(&path)?;
        let history = HistoryLog::load(data_dir.join("history.json"))?;
        Ok(Self {
            questions: RwLock::new(snapshot.questions),
            path,
            history,
        })
    }

    fn save(&self, questions: &[Question]) -> Result<(), PersistError> {
        let snapshot = QuestionsSnapshot {
            questions: questions.to_vec(),
        };
        persist::write_snapshot(&self.path, &snapshot)
    }

    /// Add a question. False when the id is already taken (ids compare
    /// case-insensitively, ignoring category).
    pub async fn add_question(
        &self,
        submitter: &str,
        raw_id: &str,
        text: &str,
        answers: Vec<String>,
    ) -> Result<bool, PersistError> {
        let (id, category) = ident::split_category(raw_id);
        let mut questions = self.questions.write().await;
        if questions.iter().any(|q| ident::ids_match(&q.id, id)) {
            return Ok(false);
        }
        questions.push(Question::new(submitter, id, category, text, answers));
        info!(id, submitter, "question added");
        self.save(&questions)?;
        Ok(true)
    }

    /// Remove a question. Only the submitter (or the developer) may remove.
    pub async fn remove_question(
        &self,
        raw_id: &str,
        user: &str,
    ) -> Result<Option<Question>, PersistError> {
        let (id, _) = ident::split_category(raw_id);
        let mut questions = self.questions.write().await;
        let pos = questions
            .iter()
            .position(|q| ident::ids_match(&q.id, id) && (q.submitter == user || user == DEV_USER));
        match pos {
            Some(i) => {
                let removed = questions.remove(i);
                self.save(&questions)?;
                Ok(Some(removed))
            }
            None => Ok(None),
        }
    }

    pub async fn get_question_by_id(&self, raw_id: &str) -> Option<Question> {
        let (id, _) = ident::split_category(raw_id);
        self.questions
            .read()
            .await
            .iter()
            .find(|q| ident::ids_match(&q.id, id))
            .cloned()
    }

    pub async fn get_submitter_by_qid(&self, raw_id: &str) -> Option<UserId> {
        self.get_question_by_id(raw_id).await.map(|q| q.submitter)
    }

    /// Look up a question only if `user` owns it (or is the developer).
    pub async fn get_user_question_by_id(&self, raw_id: &str, user: &str) -> Option<Question> {
        let (id, _) = ident::split_category(raw_id);
        self.questions
            .read()
            .await
            .iter()
            .find(|q| ident::ids_match(&q.id, id) && (q.submitter == user || user == DEV_USER))
            .cloned()
    }

    async fn mutate_owned<F>(
        &self,
        raw_id: &str,
        user: &str,
        f: F,
    ) -> Result<bool, PersistError>
    where
        F: FnOnce(&mut Question) -> bool,
    {
        let (id, _) = ident::split_category(raw_id);
        let mut questions = self.questions.write().await;
        let found = questions
            .iter_mut()
            .find(|q| ident::ids_match(&q.id, id) && (q.submitter == user || user == DEV_USER));
        match found {
            Some(q) => {
                let changed = f(q);
                if changed {
                    self.save(&questions)?;
                }
                Ok(changed)
            }
            None => Ok(false),
        }
    }

    pub async fn add_answer(
        &self,
        raw_id: &str,
        user: &str,
        answer: &str,
    ) -> Result<bool, PersistError> {
        self.mutate_owned(raw_id, user, |q| {
            q.add_answer(answer);
            true
        })
        .await
    }

    pub async fn remove_answer(
        &self,
        raw_id: &str,
        user: &str,
        answer: &str,
    ) -> Result<bool, PersistError> {
        self.mutate_owned(raw_id, user, |q| q.remove_answer(answer)).await
    }

    pub async fn set_question_text(
        &self,
        raw_id: &str,
        user: &str,
        text: &str,
    ) -> Result<bool, PersistError> {
        self.mutate_owned(raw_id, user, |q| {
            q.set_text(text);
            true
        })
        .await
    }

    /// Grade a guess against a published question.
    ///
    /// The guess counter increments before the zero-answer branch is checked,
    /// so a question that needs manual validation still consumes a guess.
    pub async fn check_answer(
        &self,
        raw_id: &str,
        user: &str,
        guess: &str,
    ) -> Result<AnswerOutcome, PersistError> {
        let (id, _) = ident::split_category(raw_id);
        let mut questions = self.questions.write().await;
        let q = match questions
            .iter_mut()
            .find(|q| ident::ids_match(&q.id, id) && q.published)
        {
            Some(q) => q,
            None => return Ok(AnswerOutcome::NotFound),
        };

        if q.answered_by.iter().any(|u| u == user) {
            return Ok(AnswerOutcome::AlreadyAnswered);
        }

        if normalize::is_forfeit(guess, &q.correct_answers) {
            q.guesses.insert(user.to_string(), MAX_GUESSES);
            self.save(&questions)?;
            return Ok(AnswerOutcome::GaveUp);
        }

        let count = q.guesses.entry(user.to_string()).or_insert(0);
        *count += 1;
        if *count > MAX_GUESSES {
            *count = MAX_GUESSES;
            self.save(&questions)?;
            return Ok(AnswerOutcome::MaxGuesses);
        }

        if q.correct_answers.is_empty() {
            self.save(&questions)?;
            return Ok(AnswerOutcome::NeedsManual);
        }

        if normalize::answers_match(guess, &q.correct_answers) {
            q.answered_by.push(user.to_string());
            self.save(&questions)?;
            return Ok(AnswerOutcome::Correct);
        }

        let guesses_left = MAX_GUESSES - *count;
        self.save(&questions)?;
        Ok(AnswerOutcome::Incorrect { guesses_left })
    }

    pub async fn publish_by_id(
        &self,
        raw_id: &str,
        now: i64,
    ) -> Result<PublishOutcome, PersistError> {
        let (id, _) = ident::split_category(raw_id);
        let mut questions = self.questions.write().await;
        let found = questions.iter_mut().find(|q| ident::ids_match(&q.id, id));
        match found {
            Some(q) => {
                if q.publish(now) {
                    self.save(&questions)?;
                    Ok(PublishOutcome::Published)
                } else {
                    Ok(PublishOutcome::AlreadyPublished)
                }
            }
            None => Ok(PublishOutcome::NotFound),
        }
    }

    /// Publish all of a user's unpublished questions, returning their
    /// display ids.
    pub async fn publish_all_by_user(
        &self,
        user: &str,
        now: i64,
    ) -> Result<Vec<String>, PersistError> {
        let mut questions = self.questions.write().await;
        let mut published = Vec::new();
        for q in questions.iter_mut().filter(|q| q.submitter == user) {
            if q.publish(now) {
                published.push(q.display_id());
            }
        }
        if !published.is_empty() {
            self.save(&questions)?;
        }
        Ok(published)
    }

    /// Drain questions flagged as freshly published, returning their pretty
    /// prints for the "new questions" announcement. Empty when nothing is
    /// fresh.
    pub async fn first_time_display(&self) -> Result<String, PersistError> {
        let mut questions = self.questions.write().await;
        let mut output = String::new();
        for q in questions.iter_mut().filter(|q| q.just_published) {
            q.just_published = false;
            output.push_str(&q.pretty_print());
            output.push('\n');
        }
        if !output.is_empty() {
            self.save(&questions)?;
        }
        Ok(output)
    }

    /// Expire the caller's overdue published questions, moving them to the
    /// history log. Returns the expired questions for announcement.
    pub async fn expire_questions(
        &self,
        user: &str,
        now: i64,
    ) -> Result<Vec<Question>, PersistError> {
        let mut questions = self.questions.write().await;
        let mut expired = Vec::new();
        let mut i = 0;
        while i < questions.len() {
            if questions[i].submitter == user && questions[i].time_to_expire(now) {
                let mut q = questions.remove(i);
                q.expire_time = now;
                expired.push(q);
            } else {
                i += 1;
            }
        }
        if !expired.is_empty() {
            info!(user, count = expired.len(), "questions expired");
            self.history.record(&expired).await?;
            self.save(&questions)?;
        }
        Ok(expired)
    }

    /// Manually credit a user on a question. `None` when the question does
    /// not exist, `Some(false)` when the user was already credited.
    pub async fn credit_user(
        &self,
        raw_id: &str,
        user: &str,
    ) -> Result<Option<bool>, PersistError> {
        let (id, _) = ident::split_category(raw_id);
        let mut questions = self.questions.write().await;
        let found = questions.iter_mut().find(|q| ident::ids_match(&q.id, id));
        match found {
            Some(q) => {
                let credited = q.add_user_who_answered(user);
                if credited {
                    self.save(&questions)?;
                }
                Ok(Some(credited))
            }
            None => Ok(None),
        }
    }

    /// All published questions, one pretty print per line.
    pub async fn list_questions(&self) -> String {
        let mut output = String::new();
        for q in self.questions.read().await.iter().filter(|q| q.published) {
            output.push_str(&q.pretty_print());
            output.push('\n');
        }
        output
    }

    /// Published questions with a bullet marking the ones the viewer can
    /// still attempt.
    pub async fn list_questions_private(&self, user: &str) -> String {
        let mut output = String::new();
        for q in self.questions.read().await.iter().filter(|q| q.published) {
            if q.attemptable_by(user) {
                output.push_str("• ");
            }
            output.push_str(&q.pretty_print());
            output.push('\n');
        }
        output
    }

    /// Only the published questions the viewer can still attempt.
    pub async fn list_incomplete_questions_private(&self, user: &str) -> String {
        let mut output = String::new();
        for q in self
            .questions
            .read()
            .await
            .iter()
            .filter(|q| q.published && q.attemptable_by(user))
        {
            output.push_str("• ");
            output.push_str(&q.pretty_print());
            output.push('\n');
        }
        output
    }

    /// All of a user's questions, answers included, published ones marked.
    pub async fn list_questions_by_user(&self, user: &str) -> String {
        let mut output = String::new();
        for q in self.questions.read().await.iter().filter(|q| q.submitter == user) {
            output.push_str(&q.pretty_print_with_answers());
            if q.published {
                output.push_str(" (published)");
            }
            output.push('\n');
        }
        output
    }

    pub async fn all_questions(&self) -> Vec<Question> {
        self.questions.read().await.clone()
    }

    /// Expired questions from the trailing 24 hours, newest first.
    pub async fn old_questions(&self, now: i64) -> Vec<Question> {
        self.history.recent(now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn keeper(dir: &std::path::Path) -> QuestionKeeper {
        QuestionKeeper::load(dir).unwrap()
    }

    #[tokio::test]
    async fn duplicate_ids_rejected_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        let k = keeper(dir.path()).await;
        assert!(k.add_question("U1", "q7", "t", vec!["a".into()]).await.unwrap());
        assert!(!k.add_question("U2", "Q7", "other", vec![]).await.unwrap());
        assert!(!k
            .add_question("U2", "\"Cat\"q7", "other", vec![])
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn category_lookup_by_bare_id() {
        let dir = tempfile::tempdir().unwrap();
        let k = keeper(dir.path()).await;
        k.add_question("U1", "\"Cat1\"q7", "t", vec!["a".into()])
            .await
            .unwrap();
        let q = k.get_question_by_id("q7").await.unwrap();
        assert_eq!(q.category, "Cat1");
        assert_eq!(q.display_id(), "\"Cat1\"q7");
    }

    #[tokio::test]
    async fn only_owner_or_dev_removes() {
        let dir = tempfile::tempdir().unwrap();
        let k = keeper(dir.path()).await;
        k.add_question("U1", "q1", "t", vec![]).await.unwrap();
        assert!(k.remove_question("q1", "U2").await.unwrap().is_none());
        assert!(k.remove_question("q1", "DEV").await.unwrap().is_some());
        k.add_question("U1", "q2", "t", vec![]).await.unwrap();
        assert!(k.remove_question("q2", "U1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unpublished_questions_cannot_be_answered() {
        let dir = tempfile::tempdir().unwrap();
        let k = keeper(dir.path()).await;
        k.add_question("U1", "q1", "t", vec!["a".into()]).await.unwrap();
        assert_eq!(
            k.check_answer("q1", "U2", "a").await.unwrap(),
            AnswerOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn correct_answer_credits_once() {
        let dir = tempfile::tempdir().unwrap();
        let k = keeper(dir.path()).await;
        k.add_question("U1", "q1", "t", vec!["The Moon".into()]).await.unwrap();
        k.publish_by_id("q1", 100).await.unwrap();
        assert_eq!(
            k.check_answer("q1", "U2", "moon!").await.unwrap(),
            AnswerOutcome::Correct
        );
        assert_eq!(
            k.check_answer("q1", "U2", "moon").await.unwrap(),
            AnswerOutcome::AlreadyAnswered
        );
    }

    #[tokio::test]
    async fn guesses_cap_then_lock_out() {
        let dir = tempfile::tempdir().unwrap();
        let k = keeper(dir.path()).await;
        k.add_question("U1", "q1", "t", vec!["right".into()]).await.unwrap();
        k.publish_by_id("q1", 100).await.unwrap();
        assert_eq!(
            k.check_answer("q1", "U2", "wrong").await.unwrap(),
            AnswerOutcome::Incorrect { guesses_left: 2 }
        );
        assert_eq!(
            k.check_answer("q1", "U2", "wrong").await.unwrap(),
            AnswerOutcome::Incorrect { guesses_left: 1 }
        );
        assert_eq!(
            k.check_answer("q1", "U2", "wrong").await.unwrap(),
            AnswerOutcome::Incorrect { guesses_left: 0 }
        );
        assert_eq!(
            k.check_answer("q1", "U2", "right").await.unwrap(),
            AnswerOutcome::MaxGuesses
        );
        let q = k.get_question_by_id("q1").await.unwrap();
        assert_eq!(q.guesses["U2"], MAX_GUESSES);
    }

    #[tokio::test]
    async fn forfeit_jumps_to_max_in_one_step() {
        let dir = tempfile::tempdir().unwrap();
        let k = keeper(dir.path()).await;
        k.add_question("U1", "q1", "t", vec!["right".into()]).await.unwrap();
        k.publish_by_id("q1", 100).await.unwrap();
        assert_eq!(
            k.check_answer("q1", "U2", "I give up").await.unwrap(),
            AnswerOutcome::GaveUp
        );
        let q = k.get_question_by_id("q1").await.unwrap();
        assert_eq!(q.guesses["U2"], MAX_GUESSES);
        assert_eq!(
            k.check_answer("q1", "U2", "right").await.unwrap(),
            AnswerOutcome::MaxGuesses
        );
    }

    #[tokio::test]
    async fn forfeit_phrase_as_answer_grades_correct() {
        let dir = tempfile::tempdir().unwrap();
        let k = keeper(dir.path()).await;
        k.add_question("U1", "q1", "t", vec!["I give up".into()]).await.unwrap();
        k.publish_by_id("q1", 100).await.unwrap();
        assert_eq!(
            k.check_answer("q1", "U2", "i give up").await.unwrap(),
            AnswerOutcome::Correct
        );
    }

    #[tokio::test]
    async fn manual_validation_still_consumes_a_guess() {
        // The counter increments before the zero-answer branch is seen.
        // Quirk, not a guarantee.
        let dir = tempfile::tempdir().unwrap();
        let k = keeper(dir.path()).await;
        k.add_question("U1", "q1", "t", vec![]).await.unwrap();
        k.publish_by_id("q1", 100).await.unwrap();
        assert_eq!(
            k.check_answer("q1", "U2", "anything").await.unwrap(),
            AnswerOutcome::NeedsManual
        );
        let q = k.get_question_by_id("q1").await.unwrap();
        assert_eq!(q.guesses["U2"], 1);
    }

    #[tokio::test]
    async fn publish_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let k = keeper(dir.path()).await;
        k.add_question("U1", "q1", "t", vec![]).await.unwrap();
        assert_eq!(
            k.publish_by_id("q1", 100).await.unwrap(),
            PublishOutcome::Published
        );
        assert_eq!(
            k.publish_by_id("q1", 200).await.unwrap(),
            PublishOutcome::AlreadyPublished
        );
        let q = k.get_question_by_id("q1").await.unwrap();
        assert_eq!(q.publish_time, 100);
    }

    #[tokio::test]
    async fn expiration_is_owner_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let k = keeper(dir.path()).await;
        k.add_question("U1", "q1", "t", vec![]).await.unwrap();
        k.add_question("U2", "q2", "t", vec![]).await.unwrap();
        k.publish_by_id("q1", 0).await.unwrap();
        k.publish_by_id("q2", 0).await.unwrap();

        let now = EXPIRY_SECONDS + 1;
        let expired = k.expire_questions("U1", now).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, "q1");
        assert!(k.get_question_by_id("q1").await.is_none());
        assert!(k.get_question_by_id("q2").await.is_some());
        assert_eq!(k.old_questions(now).await.len(), 1);
    }

    #[tokio::test]
    async fn fresh_published_questions_drain_once() {
        let dir = tempfile::tempdir().unwrap();
        let k = keeper(dir.path()).await;
        k.add_question("U1", "q1", "t", vec![]).await.unwrap();
        k.publish_all_by_user("U1", 100).await.unwrap();
        let fresh = k.first_time_display().await.unwrap();
        assert!(fresh.contains("(q1): t"));
        assert!(k.first_time_display().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn credit_refuses_double_credit() {
        let dir = tempfile::tempdir().unwrap();
        let k = keeper(dir.path()).await;
        k.add_question("U1", "q1", "t", vec![]).await.unwrap();
        assert_eq!(k.credit_user("q1", "U2").await.unwrap(), Some(true));
        assert_eq!(k.credit_user("q1", "U2").await.unwrap(), Some(false));
        assert_eq!(k.credit_user("missing", "U2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn snapshot_round_trips_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        {
            let k = keeper(dir.path()).await;
            k.add_question("U1", "\"Cat\"q1", "text", vec!["ans".into()])
                .await
                .unwrap();
            k.publish_by_id("q1", 100).await.unwrap();
            k.check_answer("q1", "U2", "wrong").await.unwrap();
        }
        let k = keeper(dir.path()).await;
        let q = k.get_question_by_id("q1").await.unwrap();
        assert_eq!(q.category, "Cat");
        assert!(q.published);
        assert_eq!(q.guesses["U2"], 1);
    }
}
