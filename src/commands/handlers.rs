//! One handler per command.
//!
//! Handlers reply in the channel the command came from. Point awards and
//! publish announcements additionally go to the main channel so the whole
//! room sees them.

use chrono::Utc;

use crate::bot::{Bot, BotError};
use crate::client::MessageEvent;
use crate::types::{AnswerOutcome, PollOption, PublishOutcome, UserId, VoteOutcome, MAX_GUESSES};

const QUESTION_NOT_FOUND: &str =
    "I couldn't find a question with that ID.\n Use `questions` to find the proper ID.\n";
const NOT_YOUR_QUESTION: &str = "I couldn't find a question of yours with that ID";

async fn needs_more_args(bot: &Bot, channel: &str) -> Result<(), BotError> {
    bot.say(
        channel,
        "This command needs more arguments! Type \"(command) help\" for usage",
    )
    .await;
    Ok(())
}

fn score_entries(scores: &[(UserId, String, i64)]) -> Vec<String> {
    scores
        .iter()
        .map(|(id, name, score)| {
            let name = if name.is_empty() { id } else { name };
            format!("{name} - {score}")
        })
        .collect()
}

fn format_today_scores(scores: &[(UserId, String, i64)]) -> String {
    let entries = score_entries(scores);
    if entries.is_empty() {
        "No new scores from today.\n".to_string()
    } else {
        format!("Today's scores: {}\n", entries.join(", "))
    }
}

fn format_total_scores(scores: &[(UserId, String, i64)]) -> String {
    format!("Total scores: {}", score_entries(scores).join(", "))
}

pub async fn scores(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    let target = args.split(' ').next().unwrap_or("");
    if !target.is_empty() {
        let user = Bot::id_from_reference(target);
        if bot.client.get_name_by_id(user).await == user {
            bot.say(
                &event.channel,
                "I couldn't find that user. Use `scores help` for usage instructions",
            )
            .await;
            return Ok(());
        }
        let response = match bot.scores.get_user_scores(user).await {
            Some((today, total)) => {
                let name = bot.name_for(user).await;
                format!("{name}'s points from today: {today}\n{name}'s total points: {total}")
            }
            None => "I couldn't find any score data for that user".to_string(),
        };
        bot.say(&event.channel, &response).await;
        return Ok(());
    }

    let mut response = format_today_scores(&bot.scores.get_today_scores_ranked().await);
    response.push_str(&format_total_scores(&bot.scores.get_total_scores_ranked().await));
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn scores_unranked(bot: &Bot, event: &MessageEvent) -> Result<(), BotError> {
    let mut response = format_today_scores(&bot.scores.get_today_scores().await);
    response.push_str(&format_total_scores(&bot.scores.get_total_scores().await));
    bot.say(&event.channel, &response).await;
    Ok(())
}

async fn do_remove_question(
    bot: &Bot,
    channel: &str,
    user: &str,
    identifier: &str,
) -> Result<(), BotError> {
    let removed = bot
        .questions
        .remove_question(identifier, bot.acting_id(user))
        .await?;
    let response = if removed.is_some() {
        "Okay, I removed that question"
    } else {
        NOT_YOUR_QUESTION
    };
    bot.say(channel, response).await;
    Ok(())
}

async fn question_count(
    bot: &Bot,
    event: &MessageEvent,
    identifier: &str,
) -> Result<(), BotError> {
    let q = match bot
        .questions
        .get_user_question_by_id(identifier, bot.acting_id(&event.user))
        .await
    {
        Some(q) => q,
        None => {
            bot.say(&event.channel, NOT_YOUR_QUESTION).await;
            return Ok(());
        }
    };

    let num_answers = q.count_answers();
    let num_guesses = q.count_guesses();
    let mut response = format!(
        "{num_answers} {} answered question {} correctly",
        if num_answers == 1 { "person" } else { "people" },
        q.display_id()
    );
    if num_answers > 0 {
        response.push_str(":\n");
        let mut names = Vec::new();
        for user in &q.answered_by {
            names.push(format!("-{}", bot.name_for(user).await));
        }
        response.push_str(&names.join("\n"));
        response.push_str("\n\n");
    }
    response.push_str(&format!(
        "{num_guesses} {} guessed {}",
        if num_guesses == 1 { "person" } else { "people" },
        q.display_id()
    ));
    if num_guesses > 0 {
        response.push_str(":\n");
        let mut names = Vec::new();
        for user in q.guesses.keys() {
            names.push(format!("-{}", bot.name_for(user).await));
        }
        response.push_str(&names.join("\n"));
        response.push_str("\n\n");
    }
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn question(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    if args.is_empty() {
        return needs_more_args(bot, &event.channel).await;
    }
    let (identifier, rest) = match args.split_once(' ') {
        Some((identifier, rest)) => (identifier, rest),
        None => (args, ""),
    };
    if identifier == "remove" {
        bot.say(
            &event.channel,
            "You probably meant to use `question [identifier] remove`\n",
        )
        .await;
        return Ok(());
    }
    if rest.is_empty() {
        return needs_more_args(bot, &event.channel).await;
    }

    // Everything after the last colon is the answer, so question text may
    // itself contain colons.
    let (text, answer) = match rest.rfind(':') {
        Some(i) => (rest[..i].trim(), rest[i + 1..].trim()),
        None => (rest.trim(), ""),
    };

    if text == "remove" {
        return do_remove_question(bot, &event.channel, &event.user, identifier).await;
    }
    if text == "count" {
        return question_count(bot, event, identifier).await;
    }

    let answers = if answer.is_empty() {
        Vec::new()
    } else {
        vec![answer.to_string()]
    };
    let added = bot
        .questions
        .add_question(&event.user, identifier, text, answers)
        .await?;
    let response = if added {
        format!(
            "Okay, I added your question with ID {identifier}.\nUse `publish` to make your questions publicly available, or `question {identifier} remove` to remove it"
        )
    } else {
        "A question with this ID already exists right now. Please use a different one".to_string()
    };
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn questions(bot: &Bot, event: &MessageEvent) -> Result<(), BotError> {
    let listing = if super::is_channel_private(&event.channel) {
        bot.questions.list_questions_private(&event.user).await
    } else {
        bot.questions.list_questions().await
    };
    let response = if listing.is_empty() {
        "There are no currently active questions".to_string()
    } else {
        format!("Here are all the currently active questions:\n{listing}")
    };
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn questions_remaining(bot: &Bot, event: &MessageEvent) -> Result<(), BotError> {
    let listing = bot
        .questions
        .list_incomplete_questions_private(&event.user)
        .await;
    let response = if listing.is_empty() {
        "There are no active questions left for you to answer".to_string()
    } else {
        format!("Here are the questions you can still answer:\n{listing}")
    };
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn remove_question(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    if args.is_empty() {
        return needs_more_args(bot, &event.channel).await;
    }
    let identifier = args.split(' ').next().unwrap_or("");
    do_remove_question(bot, &event.channel, &event.user, identifier).await
}

pub async fn my_questions(bot: &Bot, event: &MessageEvent) -> Result<(), BotError> {
    let listing = bot.questions.list_questions_by_user(&event.user).await;
    let response = if listing.is_empty() {
        "You have no questions right now. Use `question` to add some".to_string()
    } else {
        format!("Here are all of your questions:\n{listing}")
    };
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn publish(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    let identifier = args.split(' ').next().unwrap_or("");
    let now = Utc::now().timestamp();
    let response = if !identifier.is_empty() {
        match bot.questions.publish_by_id(identifier, now).await? {
            PublishOutcome::Published => format!("Okay, I published question {identifier}.\n"),
            PublishOutcome::AlreadyPublished => format!("{identifier} is already published.\n"),
            PublishOutcome::NotFound => "I couldn't find a question with that ID.\n".to_string(),
        }
    } else {
        bot.questions.publish_all_by_user(&event.user, now).await?;
        "Okay, I've published all of your questions\n".to_string()
    };

    let fresh = bot.questions.first_time_display().await?;
    if !fresh.is_empty() {
        bot.say(&bot.qotd_channel, &format!("New questions:\n{fresh}")).await;
    }
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn answer(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    let (identifier, guess) = match args.split_once(' ') {
        Some((identifier, guess)) => (identifier, guess),
        None => return needs_more_args(bot, &event.channel).await,
    };

    let outcome = bot.questions.check_answer(identifier, &event.user, guess).await?;
    let response = match outcome {
        AnswerOutcome::Correct => {
            let q = bot.questions.get_question_by_id(identifier).await;
            bot.react(&event.channel, &event.ts, "white_check_mark").await;
            bot.award_points(&event.user, 1).await?;
            let name = bot.name_for(&event.user).await;
            let mut announcement = match &q {
                Some(q) => format!("Point for {name} on question {}!", q.display_id()),
                None => format!("Point for {name}!"),
            };
            if q.as_ref().is_some_and(|q| q.submitter == event.user) {
                announcement.push_str("\nThough they are the one who submitted it :wha:...");
            }
            bot.say(&bot.qotd_channel, &announcement).await;
            "Correct! I'll give you a point\n".to_string()
        }
        AnswerOutcome::Incorrect { guesses_left } => {
            let mut response = format!(
                "Incorrect. You have {guesses_left} {}.\n",
                if guesses_left == 1 { "guess left" } else { "guesses left" }
            );
            if guesses_left == 0 {
                if let Some(q) = bot.questions.get_question_by_id(identifier).await {
                    response.push_str(&format!(
                        "The correct answer was \"{}\". If you think your guess(es) should have been correct, contact {}, who submitted the question.\n",
                        q.correct_answers.join(", "),
                        Bot::reference(&q.submitter)
                    ));
                }
            }
            response
        }
        AnswerOutcome::AlreadyAnswered => "You already answered that question!".to_string(),
        AnswerOutcome::MaxGuesses => {
            format!("You've already guessed the maximum number of times, {MAX_GUESSES}.")
        }
        AnswerOutcome::NeedsManual => match bot.questions.get_question_by_id(identifier).await {
            Some(q) => {
                let submitter_name = bot.name_for(&q.submitter).await;
                let guesser_name = bot.name_for(&event.user).await;
                bot.dm(
                    &q.submitter,
                    &format!(
                        "{guesser_name} has answered \"{guess}\" for your question,\n{}\nIs this correct? Use `approve {} {}` to give them a point.",
                        q.pretty_print(),
                        Bot::reference(&event.user),
                        q.display_id()
                    ),
                )
                .await;
                format!(
                    "This question needs to be validated manually. I'll ask {submitter_name} to check your answer."
                )
            }
            None => QUESTION_NOT_FOUND.to_string(),
        },
        AnswerOutcome::GaveUp => {
            let mut response = "Okay, no more guesses for you on that question.\n".to_string();
            if let Some(q) = bot.questions.get_question_by_id(identifier).await {
                if !q.correct_answers.is_empty() {
                    response.push_str(&format!(
                        "The correct answer was \"{}\".\n",
                        q.correct_answers.join(", ")
                    ));
                }
            }
            response
        }
        AnswerOutcome::NotFound => QUESTION_NOT_FOUND.to_string(),
    };
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn add_answer(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    let (identifier, answer) = match args.split_once(' ') {
        Some((identifier, answer)) => (identifier, answer),
        None => return needs_more_args(bot, &event.channel).await,
    };
    let changed = bot
        .questions
        .add_answer(identifier, bot.acting_id(&event.user), answer)
        .await?;
    let response = if changed {
        format!("Okay, I added that answer to question {identifier}")
    } else {
        NOT_YOUR_QUESTION.to_string()
    };
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn remove_answer(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    let (identifier, answer) = match args.split_once(' ') {
        Some((identifier, answer)) => (identifier, answer),
        None => return needs_more_args(bot, &event.channel).await,
    };
    let changed = bot
        .questions
        .remove_answer(identifier, bot.acting_id(&event.user), answer)
        .await?;
    let response = if changed {
        format!("Okay, I removed that answer from question {identifier}")
    } else {
        "I couldn't find that answer on a question of yours with that ID".to_string()
    };
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn edit(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    let (identifier, text) = match args.split_once(' ') {
        Some((identifier, text)) => (identifier, text),
        None => return needs_more_args(bot, &event.channel).await,
    };
    let changed = bot
        .questions
        .set_question_text(identifier, bot.acting_id(&event.user), text)
        .await?;
    let response = if changed {
        format!("Okay, I updated the text of question {identifier}")
    } else {
        NOT_YOUR_QUESTION.to_string()
    };
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn approve(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    let mut parts = args.split(' ');
    let target_ref = parts.next().unwrap_or("");
    let identifier = parts.next().unwrap_or("");
    if target_ref.is_empty() || identifier.is_empty() {
        return needs_more_args(bot, &event.channel).await;
    }
    let target = Bot::id_from_reference(target_ref);

    let q = match bot
        .questions
        .get_user_question_by_id(identifier, bot.acting_id(&event.user))
        .await
    {
        Some(q) => q,
        None => {
            bot.say(&event.channel, NOT_YOUR_QUESTION).await;
            return Ok(());
        }
    };

    let response = match bot.questions.credit_user(identifier, target).await? {
        Some(true) => {
            bot.award_points(target, 1).await?;
            let name = bot.name_for(target).await;
            bot.say(
                &bot.qotd_channel,
                &format!("Point for {name} on question {}!", q.display_id()),
            )
            .await;
            format!("Okay, I gave {name} a point on question {}", q.display_id())
        }
        Some(false) => "They already have credit for that question".to_string(),
        None => NOT_YOUR_QUESTION.to_string(),
    };
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn old_questions(bot: &Bot, event: &MessageEvent) -> Result<(), BotError> {
    let old = bot.questions.old_questions(Utc::now().timestamp()).await;
    let response = if old.is_empty() {
        "No questions have expired in the last 24 hours".to_string()
    } else {
        let mut out = "Here are the questions that expired in the last 24 hours:\n".to_string();
        for q in &old {
            out.push_str(&q.pretty_print_with_answers());
            out.push('\n');
        }
        out
    };
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn hello(bot: &Bot, event: &MessageEvent) -> Result<(), BotError> {
    let name = bot.name_for(&event.user).await;
    let response = format!(
        "Hello {name}, I'm QOTD Bot!\nYour User ID is: {}\nThis channel's ID is: {}\nUse the `help` command for usage instructions.\n",
        event.user, event.channel
    );
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn add_points(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    let mut parts = args.split(' ');
    let target_ref = parts.next().unwrap_or("");
    if target_ref.is_empty() {
        return needs_more_args(bot, &event.channel).await;
    }
    let raw_points = match parts.next() {
        Some(p) if !p.is_empty() => p,
        _ => "1",
    };
    let target = Bot::id_from_reference(target_ref);

    if bot.client.get_name_by_id(target).await == target {
        bot.say(
            &event.channel,
            "I couldn't find that user. Use `add-point help` for usage instructions",
        )
        .await;
        return Ok(());
    }

    // Keep the digits, then restore a leading minus sign if one was given.
    let digits: String = raw_points.chars().filter(char::is_ascii_digit).collect();
    let digits = if raw_points.starts_with('-') && !digits.is_empty() {
        format!("-{digits}")
    } else {
        digits
    };
    if digits.is_empty() {
        bot.say(
            &event.channel,
            &format!("I couldn't interpret {raw_points} as a number. Try again\n"),
        )
        .await;
        return Ok(());
    }
    let points: i64 = digits.parse().unwrap_or(0);

    bot.award_points(target, points).await?;
    let name = bot.name_for(target).await;
    bot.say(
        &bot.qotd_channel,
        &format!(
            "Okay, I gave {points} point{} to {name}",
            if points == 1 { "" } else { "s" }
        ),
    )
    .await;
    Ok(())
}

pub async fn expire_old_questions(bot: &Bot, event: &MessageEvent) -> Result<(), BotError> {
    let expired = bot
        .questions
        .expire_questions(&event.user, Utc::now().timestamp())
        .await?;
    if expired.is_empty() {
        bot.say(
            &event.channel,
            "No questions of yours older than 18 hours were found",
        )
        .await;
        return Ok(());
    }
    let listing: Vec<String> = expired.iter().map(|q| q.pretty_print()).collect();
    let response = format!("The following questions have expired:\n{}", listing.join("\n"));
    if event.channel != bot.qotd_channel {
        bot.say(&bot.qotd_channel, &response).await;
    }
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn poll(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    let (identifier, rest) = match args.split_once(' ') {
        Some((identifier, rest)) => (identifier, rest),
        None => return needs_more_args(bot, &event.channel).await,
    };

    let mut sections = rest.split(':').map(str::trim);
    let text = sections.next().unwrap_or("");
    let labels: Vec<&str> = sections.filter(|s| !s.is_empty()).collect();
    if text.is_empty() || labels.len() < 2 {
        bot.say(
            &event.channel,
            "A poll needs a question and at least two options, separated by `:`",
        )
        .await;
        return Ok(());
    }

    let options: Vec<PollOption> = labels
        .iter()
        .enumerate()
        .map(|(i, label)| PollOption {
            key: (i + 1).to_string(),
            label: (*label).to_string(),
        })
        .collect();
    let added = bot.polls.add_poll(&event.user, identifier, text, options).await?;
    let response = if added {
        format!(
            "Okay, I added your poll with ID {identifier}.\nUse `publish-poll` to make your polls publicly available, or `remove-poll {identifier}` to remove it"
        )
    } else {
        "A poll with this ID already exists right now. Please use a different one".to_string()
    };
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn polls(bot: &Bot, event: &MessageEvent) -> Result<(), BotError> {
    let listing = bot.polls.list_polls().await;
    let response = if listing.is_empty() {
        "There are no currently active polls".to_string()
    } else {
        format!("Here are all the currently active polls:\n{listing}")
    };
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn my_polls(bot: &Bot, event: &MessageEvent) -> Result<(), BotError> {
    let listing = bot.polls.list_polls_by_user(&event.user).await;
    let response = if listing.is_empty() {
        "You have no polls right now. Use `poll` to add some".to_string()
    } else {
        format!("Here are all of your polls:\n{listing}")
    };
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn vote(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    let (identifier, choice) = match args.split_once(' ') {
        Some((identifier, choice)) => (identifier, choice),
        None => return needs_more_args(bot, &event.channel).await,
    };
    let response = match bot
        .polls
        .submit_response(identifier, &event.user, choice.trim())
        .await?
    {
        VoteOutcome::Accepted => "Okay, I recorded your vote",
        VoteOutcome::BadVote => "That isn't one of the options. Use `polls` to see them",
        VoteOutcome::NotFound => {
            "I couldn't find a poll with that ID.\n Use `polls` to find the proper ID.\n"
        }
    };
    bot.say(&event.channel, response).await;
    Ok(())
}

pub async fn publish_poll(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    let identifier = args.split(' ').next().unwrap_or("");
    let response = if !identifier.is_empty() {
        match bot.polls.publish_by_id(identifier).await? {
            PublishOutcome::Published => format!("Okay, I published poll {identifier}.\n"),
            PublishOutcome::AlreadyPublished => format!("{identifier} is already published.\n"),
            PublishOutcome::NotFound => "I couldn't find a poll with that ID.\n".to_string(),
        }
    } else {
        bot.polls.publish_all_by_user(&event.user).await?;
        "Okay, I've published all of your polls\n".to_string()
    };

    let fresh = bot.polls.first_time_display().await?;
    if !fresh.is_empty() {
        bot.say(&bot.qotd_channel, &format!("New polls:\n{fresh}")).await;
    }
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn poll_results(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    let identifier = args.split(' ').next().unwrap_or("");
    if identifier.is_empty() {
        return needs_more_args(bot, &event.channel).await;
    }
    let response = match bot.polls.get_poll_by_id(identifier).await {
        Some(p) => p.display_results(),
        None => "I couldn't find a poll with that ID.\n".to_string(),
    };
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn expire_poll(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    let identifier = args.split(' ').next().unwrap_or("");
    let removed = bot.polls.expire_polls(identifier, &event.user).await?;
    let response = if removed.is_empty() {
        "No polls of yours were found to expire".to_string()
    } else {
        format!("The following polls have expired:\n{}", removed.join("\n"))
    };
    bot.say(&event.channel, &response).await;
    Ok(())
}

pub async fn remove_poll(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    let identifier = args.split(' ').next().unwrap_or("");
    if identifier.is_empty() {
        return needs_more_args(bot, &event.channel).await;
    }
    let removed = bot
        .polls
        .remove_poll(identifier, bot.acting_id(&event.user))
        .await?;
    let response = if removed.is_some() {
        "Okay, I removed that poll"
    } else {
        "I couldn't find a poll of yours with that ID"
    };
    bot.say(&event.channel, response).await;
    Ok(())
}

pub async fn tell(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    let (target_ref, message) = match args.split_once(' ') {
        Some((target_ref, message)) => (target_ref, message),
        None => {
            bot.say(&event.channel, "this command needs more arguments!").await;
            return Ok(());
        }
    };
    let target = Bot::id_from_reference(target_ref);
    if bot.client.get_name_by_id(target).await == target {
        bot.say(&event.channel, "I couldn't find that user").await;
        return Ok(());
    }
    bot.say(
        &bot.qotd_channel,
        &format!(
            "Hey {}, {} says {message}",
            Bot::reference(target),
            Bot::reference(&event.user)
        ),
    )
    .await;
    Ok(())
}

pub async fn dev_tell(bot: &Bot, event: &MessageEvent, args: &str) -> Result<(), BotError> {
    let (target_ref, message) = match args.split_once(' ') {
        Some((target_ref, message)) => (target_ref, message),
        None => {
            bot.say(&event.channel, "this command needs more arguments!").await;
            return Ok(());
        }
    };
    let target = Bot::id_from_reference(target_ref);
    if bot.client.get_name_by_id(target).await == target {
        bot.say(&event.channel, "I couldn't find that user").await;
        return Ok(());
    }
    bot.dm(target, message).await;
    Ok(())
}

pub async fn announce(bot: &Bot, _event: &MessageEvent, args: &str) -> Result<(), BotError> {
    bot.say(&bot.qotd_channel, args).await;
    Ok(())
}

pub async fn refresh_user_list(bot: &Bot, event: &MessageEvent) -> Result<(), BotError> {
    let count = bot.client.refresh_user_list().await?;
    bot.say(&event.channel, &format!("Okay, I know {count} names now")).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_lines_fall_back_to_ids() {
        let scores = vec![
            ("U1".to_string(), "Ada".to_string(), 3),
            ("U2".to_string(), String::new(), 1),
        ];
        assert_eq!(
            format_today_scores(&scores),
            "Today's scores: Ada - 3, U2 - 1\n"
        );
        assert_eq!(format_total_scores(&scores), "Total scores: Ada - 3, U2 - 1");
    }

    #[test]
    fn empty_sheet_has_no_today_scores() {
        assert_eq!(format_today_scores(&[]), "No new scores from today.\n");
    }
}
