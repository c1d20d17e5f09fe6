use crate::config::DiscordConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `!seattleaf [target]`; `None` means the default community.
    Simulate { target: Option<String> },
    /// `!seattlehelp`
    Help,
}

/// Prefix and command names recognised in chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSet {
    pub prefix: String,
    pub simulate: String,
    pub help: String,
}

impl Default for CommandSet {
    fn default() -> Self {
        Self::from(&DiscordConfig::default())
    }
}

impl From<&DiscordConfig> for CommandSet {
    fn from(config: &DiscordConfig) -> Self {
        Self {
            prefix: config.command_prefix.clone(),
            simulate: config.simulate_command.to_lowercase(),
            help: config.help_command.to_lowercase(),
        }
    }
}

impl CommandSet {
    /// `None` for plain chatter and unknown commands.
    pub fn parse(&self, input: &str) -> Option<Command> {
        let rest = input.trim().strip_prefix(self.prefix.as_str())?;

        let mut parts = rest.splitn(2, char::is_whitespace);
        let cmd = parts.next()?.to_lowercase();
        let args = parts.next().unwrap_or("").trim();

        if cmd == self.simulate {
            let target = args.split_whitespace().next().map(ToString::to_string);
            Some(Command::Simulate { target })
        } else if cmd == self.help {
            Some(Command::Help)
        } else {
            None
        }
    }

    pub fn help_text(&self) -> String {
        let p = &self.prefix;
        let sim = &self.simulate;
        format!(
            "**Seattle-Simulator Commands:**\n\n\
             `{p}{sim}` - Generate a satirical r/Seattle post\n\
             `{p}{sim} <subreddit>` - Simulate any subreddit (e.g., `{p}{sim} SeattleWA`)\n\
             `{p}{sim} u/<username>` - Simulate a Reddit user's style\n\n\
             *Powered by Groq + Llama 3.1*"
        )
    }
}
