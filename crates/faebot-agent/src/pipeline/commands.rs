//! Chat command router, intercepted before the reply pipeline.
//!
//! Every command is an entry in [`COMMANDS`] tagged with the [`Tier`] a caller
//! needs. The dispatcher checks the tier before running the handler, so
//! handlers never see a caller they should refuse. Handlers only mutate the
//! channel state they are given; process-wide effects (joining or leaving a
//! channel) are returned as an [`Effect`] for the runtime to apply.

use faebot_core::config::BotConfig;
use faebot_core::ChannelName;
use tracing::info;

use crate::roster::ModelRoster;
use crate::state::ChannelState;

/// Permission level. Ordered: an administrator may run moderator commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Anyone,
    Moderator,
    Administrator,
}

impl Tier {
    /// Fixed reply for a caller below this tier.
    pub fn refusal(self) -> &'static str {
        match self {
            Tier::Anyone => "",
            Tier::Moderator => "sorry, you need to be a mod to use that command",
            Tier::Administrator => "sorry, only my admins can use that command",
        }
    }
}

/// Who sent a command, with their tier already resolved.
#[derive(Debug, Clone)]
pub struct Caller {
    pub name: String,
    pub display: String,
    pub tier: Tier,
}

impl Caller {
    pub fn resolve(name: &str, display: &str, is_moderator: bool, bot: &BotConfig) -> Self {
        let tier = if bot.is_admin(name) {
            Tier::Administrator
        } else if is_moderator {
            Tier::Moderator
        } else {
            Tier::Anyone
        };
        Self {
            name: name.to_string(),
            display: display.to_string(),
            tier,
        }
    }
}

/// A prefixed message split into command name and argument text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'a> {
    /// Lowercased; empty when the prefix stood alone.
    pub name: String,
    pub args: &'a str,
}

/// Recognise command syntax. Any message starting with a prefix is a command,
/// even if the name turns out to be unknown.
pub fn parse_command<'a>(text: &'a str, prefixes: &[String]) -> Option<Invocation<'a>> {
    let text = text.trim();
    let rest = prefixes
        .iter()
        .filter(|p| !p.is_empty())
        .find_map(|p| text.strip_prefix(p.as_str()))?;
    let (name, args) = match rest.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (rest, ""),
    };
    Some(Invocation {
        name: name.to_ascii_lowercase(),
        args,
    })
}

/// Process-wide side effect requested by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Join(ChannelName),
    Part(ChannelName),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    pub text: String,
    pub effect: Option<Effect>,
}

impl CommandReply {
    fn say(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            effect: None,
        }
    }

    fn then(mut self, effect: Effect) -> Self {
        self.effect = Some(effect);
        self
    }
}

/// Everything a handler may read or change.
pub struct CommandContext<'a> {
    pub state: &'a mut ChannelState,
    pub caller: &'a Caller,
    pub args: &'a str,
    pub bot: &'a BotConfig,
    pub roster: &'a ModelRoster,
    /// Snapshot of the channels the bot is currently in.
    pub joined: &'a [ChannelName],
}

impl CommandContext<'_> {
    fn prefix(&self) -> &str {
        self.bot.prefixes.first().map(String::as_str).unwrap_or("!")
    }
}

type Handler = fn(&mut CommandContext<'_>) -> CommandReply;

pub struct Command {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    pub tier: Tier,
    pub usage: &'static str,
    handler: Handler,
}

impl Command {
    const fn new(
        name: &'static str,
        aliases: &'static [&'static str],
        tier: Tier,
        usage: &'static str,
        handler: Handler,
    ) -> Self {
        Self {
            name,
            aliases,
            tier,
            usage,
            handler,
        }
    }
}

pub const COMMANDS: &[Command] = &[
    Command::new("hello", &[], Tier::Anyone, "", hello),
    Command::new("help", &["commands"], Tier::Anyone, "", help),
    Command::new("ping", &[], Tier::Anyone, "[text]", ping),
    Command::new("invite", &[], Tier::Anyone, "", invite),
    Command::new("mods", &[], Tier::Anyone, "", mods),
    Command::new("freq", &["setfreq"], Tier::Moderator, "[n]", freq),
    Command::new("hist", &[], Tier::Moderator, "[n]", hist),
    Command::new("prompt", &[], Tier::Moderator, "[text]", prompt),
    Command::new("clear", &[], Tier::Moderator, "", clear),
    Command::new("silence", &[], Tier::Moderator, "[on|off]", silence),
    Command::new("switch", &[], Tier::Moderator, "", switch),
    Command::new("part", &["leave"], Tier::Moderator, "", part),
    Command::new("model", &[], Tier::Administrator, "[id]", model),
    Command::new("join", &[], Tier::Administrator, "[channel]", join),
];

pub fn lookup(name: &str) -> Option<&'static Command> {
    COMMANDS
        .iter()
        .find(|c| c.name == name || c.aliases.iter().any(|a| *a == name))
}

/// Run a command. `None` means the name is unknown and nothing should be said.
pub fn dispatch(name: &str, ctx: &mut CommandContext<'_>) -> Option<CommandReply> {
    let cmd = lookup(name)?;
    if ctx.caller.tier < cmd.tier {
        info!(
            channel = %ctx.state.channel(),
            caller = %ctx.caller.name,
            command = cmd.name,
            "command refused"
        );
        return Some(CommandReply::say(cmd.tier.refusal()));
    }
    info!(
        channel = %ctx.state.channel(),
        caller = %ctx.caller.name,
        command = cmd.name,
        "command"
    );
    Some((cmd.handler)(ctx))
}

fn listing(ctx: &CommandContext<'_>, tier: impl Fn(Tier) -> bool) -> String {
    let p = ctx.prefix();
    COMMANDS
        .iter()
        .filter(|c| tier(c.tier))
        .map(|c| {
            if c.usage.is_empty() {
                format!("{p}{}", c.name)
            } else {
                format!("{p}{} {}", c.name, c.usage)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn hello(ctx: &mut CommandContext<'_>) -> CommandReply {
    CommandReply::say(format!("Hello {}!", ctx.caller.display))
}

fn help(ctx: &mut CommandContext<'_>) -> CommandReply {
    let caller = ctx.caller.tier;
    CommandReply::say(format!("commands: {}", listing(ctx, |t| t <= caller)))
}

fn ping(ctx: &mut CommandContext<'_>) -> CommandReply {
    if ctx.args.is_empty() {
        CommandReply::say("pong")
    } else {
        CommandReply::say(format!("pong {}", ctx.args))
    }
}

fn invite(ctx: &mut CommandContext<'_>) -> CommandReply {
    let who = if ctx.bot.admins.is_empty() {
        "my owner".to_string()
    } else {
        ctx.bot.admins.join(" or ")
    };
    CommandReply::say(format!(
        "want {} in your chat? ask {who} to run {}join <your channel>",
        ctx.bot.name,
        ctx.prefix()
    ))
}

fn mods(ctx: &mut CommandContext<'_>) -> CommandReply {
    CommandReply::say(format!(
        "mod commands: {}",
        listing(ctx, |t| t == Tier::Moderator)
    ))
}

fn freq(ctx: &mut CommandContext<'_>) -> CommandReply {
    match first_arg(ctx.args).parse::<u32>() {
        Ok(n) => {
            ctx.state.frequency = n;
            CommandReply::say(format!("changed message frequency in this channel to {n}"))
        }
        Err(_) => CommandReply::say(format!("current frequency is {}", ctx.state.frequency)),
    }
}

fn hist(ctx: &mut CommandContext<'_>) -> CommandReply {
    match first_arg(ctx.args).parse::<usize>() {
        Ok(n) if ctx.state.set_history_limit(n) => {
            CommandReply::say(format!("now remembering the last {n} messages"))
        }
        _ => CommandReply::say(format!(
            "currently remembering the last {} messages",
            ctx.state.history_limit()
        )),
    }
}

fn prompt(ctx: &mut CommandContext<'_>) -> CommandReply {
    if ctx.args.is_empty() {
        return CommandReply::say(format!("current prompt: {}", ctx.state.persona_prompt));
    }
    ctx.state.persona_prompt = ctx.args.to_string();
    CommandReply::say("updated the prompt for this channel")
}

fn clear(ctx: &mut CommandContext<'_>) -> CommandReply {
    let n = ctx.state.clear_transcript();
    CommandReply::say(format!("cleared {n} messages from my memory"))
}

fn first_arg(args: &str) -> &str {
    args.split_whitespace().next().unwrap_or("")
}

fn parse_flag(arg: &str) -> Option<bool> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

fn silence(ctx: &mut CommandContext<'_>) -> CommandReply {
    match parse_flag(first_arg(ctx.args)) {
        Some(true) => {
            ctx.state.silenced = true;
            CommandReply::say(format!(
                "ok, staying quiet until a mod runs {}silence off",
                ctx.prefix()
            ))
        }
        Some(false) => {
            ctx.state.silenced = false;
            CommandReply::say("I'm back!")
        }
        None => CommandReply::say(if ctx.state.silenced {
            "silence is on"
        } else {
            "silence is off"
        }),
    }
}

fn switch(ctx: &mut CommandContext<'_>) -> CommandReply {
    let next = ctx.roster.next_after(&ctx.state.current_model).to_string();
    ctx.state.current_model = next;
    CommandReply::say(format!("switched model to {}", ctx.state.current_model))
}

fn part(ctx: &mut CommandContext<'_>) -> CommandReply {
    let channel = ctx.state.channel().clone();
    CommandReply::say(format!("bye bye {channel}! 👋")).then(Effect::Part(channel))
}

fn model(ctx: &mut CommandContext<'_>) -> CommandReply {
    if ctx.args.is_empty() {
        return CommandReply::say(format!("current model is {}", ctx.state.current_model));
    }
    ctx.state.current_model = ctx.args.to_string();
    CommandReply::say(format!("model set to {}", ctx.state.current_model))
}

fn join(ctx: &mut CommandContext<'_>) -> CommandReply {
    let target = ChannelName::new(ctx.args.split_whitespace().next().unwrap_or(""));
    if target.is_empty() {
        if ctx.joined.is_empty() {
            return CommandReply::say("I'm not in any channels");
        }
        let names: Vec<&str> = ctx.joined.iter().map(ChannelName::as_str).collect();
        return CommandReply::say(format!("I'm in: {}", names.join(", ")));
    }
    if ctx.joined.contains(&target) {
        return CommandReply::say(format!("I'm already in {target}"));
    }
    CommandReply::say(format!("joining {target}")).then(Effect::Join(target))
}
