//! Command table and dispatch.
//!
//! Commands are looked up by alias on the first word of a message. Each one
//! carries gating flags (developer-only, public-channel-only,
//! private-channel-only) that are checked before its handler runs.

pub mod handlers;

use tracing::debug;

use crate::bot::{Bot, BotError};
use crate::client::MessageEvent;

pub struct Command {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    /// Empty for hidden commands, which are also left out of the help
    /// listing.
    pub help: &'static str,
    pub public_only: bool,
    pub private_only: bool,
    pub dev_only: bool,
}

const fn command(name: &'static str, aliases: &'static [&'static str], help: &'static str) -> Command {
    Command {
        name,
        aliases,
        help,
        public_only: false,
        private_only: false,
        dev_only: false,
    }
}

const fn public_only(mut cmd: Command) -> Command {
    cmd.public_only = true;
    cmd
}

const fn private_only(mut cmd: Command) -> Command {
    cmd.private_only = true;
    cmd
}

const fn dev_only(mut cmd: Command) -> Command {
    cmd.dev_only = true;
    cmd
}

pub const COMMANDS: &[Command] = &[
    command(
        "scores",
        &["points", "score", "scores"],
        "`scores <@ user>` - prints a list of today's scores and running totals, for `<@ user>` if given, for everyone otherwise",
    ),
    command(
        "scores-unranked",
        &["score-unranked", "scores-unranked"],
        "`scores-unranked` - prints a list of today's scores and running totals, sorted alphabetically instead of by ranking",
    ),
    private_only(command(
        "question",
        &["q", "question"],
        "`question [identifier] [question] : <answer>` - creates a question with a reference tag `identifier`.\n`question [identifier] remove` - removes the question with the corresponding ID.\n`question [identifier] count` - shows stats on who has answered/guessed a question.",
    )),
    command(
        "questions",
        &["qs", "questions"],
        "`questions` - prints a list of today's published questions",
    ),
    command(
        "questions-remaining",
        &["questions-remaining"],
        "`questions-remaining` - prints the published questions you can still answer",
    ),
    command(
        "remove-question",
        &["rq", "remove", "remove-question"],
        "`remove [identifier]` removes the question with the corresponding ID",
    ),
    command(
        "my-questions",
        &["my-questions"],
        "`my-questions` - prints a list of your questions, published or not",
    ),
    command(
        "publish",
        &["publish"],
        "`publish <identifier>` - publishes the corresponding question if `identifier` given. Publishes all of your questions otherwise.",
    ),
    private_only(command(
        "answer",
        &["a", "answer"],
        "`answer [identifier] [your answer]` - Must be used in a private channel. Checks your `answer` for the corresponding question.",
    )),
    command(
        "add-answer",
        &["add-answer"],
        "`add-answer [identifier] [answer]` - adds another accepted answer to your question",
    ),
    command(
        "remove-answer",
        &["remove-answer"],
        "`remove-answer [identifier] [answer]` - removes an accepted answer from your question (exact match)",
    ),
    command(
        "edit",
        &["edit"],
        "`edit [identifier] [new question text]` - rewrites the text of your question",
    ),
    command(
        "approve",
        &["approve"],
        "`approve [@ user] [identifier]` - gives `@ user` credit and a point for your question",
    ),
    command(
        "old-questions",
        &["old-questions"],
        "`old-questions` - prints the questions that expired in the last 24 hours, answers included",
    ),
    command(
        "hello",
        &["hi", "hello", "hola"],
        "`hello` - says hi back and some basic information",
    ),
    public_only(command(
        "add-points",
        &["add-point", "add-points"],
        "`add-point(s) [@ user] <# points>` - gives `# points` to `@ user` if specified, 1 point by default",
    )),
    command(
        "expire-old-questions",
        &["expire-old-questions"],
        "`expire-old-questions` - removes all questions published more than 18 hours ago",
    ),
    private_only(command(
        "poll",
        &["poll"],
        "`poll [identifier] [question] : [option] : [option]` - creates a poll with numbered options",
    )),
    command(
        "polls",
        &["polls"],
        "`polls` - prints a list of the currently published polls",
    ),
    command(
        "my-polls",
        &["my-polls"],
        "`my-polls` - prints a list of your polls, published or not",
    ),
    private_only(command(
        "vote",
        &["vote"],
        "`vote [identifier] [option number]` - Must be used in a private channel. Records your vote for the corresponding poll",
    )),
    command(
        "publish-poll",
        &["publish-poll"],
        "`publish-poll <identifier>` - publishes the corresponding poll if `identifier` given. Publishes all of your polls otherwise.",
    ),
    command(
        "poll-results",
        &["poll-results"],
        "`poll-results [identifier]` - prints the current vote tallies for the corresponding poll",
    ),
    command(
        "expire-poll",
        &["expire-poll"],
        "`expire-poll <identifier>` - removes the corresponding poll of yours, or all of your polls if no `identifier` given",
    ),
    command(
        "remove-poll",
        &["remove-poll"],
        "`remove-poll [identifier]` - removes the poll with the corresponding ID",
    ),
    command("tell", &["tell", "say", "trash-talk"], ""),
    dev_only(command("dev-tell", &["dev-say", "dev-tell", "dev-talk"], "")),
    dev_only(command("announce", &["announce"], "")),
    dev_only(command("refresh-user-list", &["refresh-user-list"], "")),
];

pub fn command_by_alias(alias: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|c| c.aliases.contains(&alias))
}

pub fn is_channel_private(channel: &str) -> bool {
    channel.starts_with('D')
}

/// The full help listing: every help line from every non-hidden command,
/// sorted alphabetically.
pub fn global_help() -> String {
    let mut lines: Vec<&str> = COMMANDS
        .iter()
        .flat_map(|c| c.help.split('\n'))
        .filter(|line| !line.is_empty())
        .collect();
    lines.sort_unstable();
    format!("Here's a list of commands I know:\n\n{}", lines.join("\n\n"))
}

/// Route one inbound message to its command handler.
///
/// Unknown first words are ignored without a reply, so ordinary chatter
/// near the bot stays unanswered.
pub async fn handle_event(bot: &Bot, event: &MessageEvent) -> Result<(), BotError> {
    let text = event.text.split_whitespace().collect::<Vec<_>>().join(" ");
    let (alias, args) = match text.split_once(' ') {
        Some((first, rest)) => (first.to_lowercase(), rest),
        None => (text.to_lowercase(), ""),
    };

    if alias == "help" {
        bot.say(&event.channel, &global_help()).await;
        return Ok(());
    }

    let cmd = match command_by_alias(&alias) {
        Some(cmd) => cmd,
        None => {
            debug!(alias, "ignoring unknown command");
            return Ok(());
        }
    };

    if args == "help" && !cmd.help.is_empty() {
        bot.say(&event.channel, cmd.help).await;
        return Ok(());
    }

    if cmd.dev_only && !bot.is_dev(&event.user) {
        let response = format!(
            "I'm sorry, {}, I'm afraid I can't let you do that.",
            Bot::reference(&event.user)
        );
        bot.say(&event.channel, &response).await;
        return Ok(());
    }

    let private = is_channel_private(&event.channel);
    if cmd.public_only && private {
        bot.say(
            &event.channel,
            "You can't use this command in a private channel. Use the public channel instead",
        )
        .await;
        return Ok(());
    }
    if cmd.private_only && !private {
        bot.say(
            &event.channel,
            "You can't use this command in a public channel. Message me directly instead",
        )
        .await;
        return Ok(());
    }

    match cmd.name {
        "scores" => handlers::scores(bot, event, args).await,
        "scores-unranked" => handlers::scores_unranked(bot, event).await,
        "question" => handlers::question(bot, event, args).await,
        "questions" => handlers::questions(bot, event).await,
        "questions-remaining" => handlers::questions_remaining(bot, event).await,
        "remove-question" => handlers::remove_question(bot, event, args).await,
        "my-questions" => handlers::my_questions(bot, event).await,
        "publish" => handlers::publish(bot, event, args).await,
        "answer" => handlers::answer(bot, event, args).await,
        "add-answer" => handlers::add_answer(bot, event, args).await,
        "remove-answer" => handlers::remove_answer(bot, event, args).await,
        "edit" => handlers::edit(bot, event, args).await,
        "approve" => handlers::approve(bot, event, args).await,
        "old-questions" => handlers::old_questions(bot, event).await,
        "hello" => handlers::hello(bot, event).await,
        "add-points" => handlers::add_points(bot, event, args).await,
        "expire-old-questions" => handlers::expire_old_questions(bot, event).await,
        "poll" => handlers::poll(bot, event, args).await,
        "polls" => handlers::polls(bot, event).await,
        "my-polls" => handlers::my_polls(bot, event).await,
        "vote" => handlers::vote(bot, event, args).await,
        "publish-poll" => handlers::publish_poll(bot, event, args).await,
        "poll-results" => handlers::poll_results(bot, event, args).await,
        "expire-poll" => handlers::expire_poll(bot, event, args).await,
        "remove-poll" => handlers::remove_poll(bot, event, args).await,
        "tell" => handlers::tell(bot, event, args).await,
        "dev-tell" => handlers::dev_tell(bot, event, args).await,
        "announce" => handlers::announce(bot, event, args).await,
        "refresh-user-list" => handlers::refresh_user_list(bot, event).await,
        _ => Ok(()),
    }
}
