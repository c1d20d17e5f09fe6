use super::Config;

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Some(id) = non_empty_var("REDDIT_CLIENT_ID") {
            self.reddit.client_id = Some(id);
        }

        if let Some(secret) = non_empty_var("REDDIT_CLIENT_SECRET") {
            self.reddit.client_secret = Some(secret);
        }

        if let Some(agent) = non_empty_var("REDDIT_USER_AGENT") {
            self.reddit.user_agent = agent;
        }

        if let Some(username) = non_empty_var("REDDIT_USERNAME") {
            self.reddit.username = Some(username);
        }

        if let Some(password) = non_empty_var("REDDIT_PASSWORD") {
            self.reddit.password = Some(password);
        }

        if let Some(key) = non_empty_var("GROQ_API_KEY") {
            self.llm.api_key = Some(key);
        }

        if let Some(model) = non_empty_var("GROQ_MODEL") {
            self.llm.model = model;
        }

        if let Some(token) = non_empty_var("DISCORD_TOKEN") {
            self.discord.bot_token = Some(token);
        }

        if let Some(subreddit) = non_empty_var("DEFAULT_SUBREDDIT") {
            self.default_subreddit = subreddit;
        }

        if let Some(subreddit) = non_empty_var("POST_SUBREDDIT") {
            self.post_subreddit = subreddit;
        }

        if let Some(limit) =
            non_empty_var("SEATTLE_SIMULATOR_RESULT_LIMIT").and_then(|v| v.parse::<usize>().ok())
        {
            self.result_limit = limit;
        }

        if let Some(temp) =
            non_empty_var("SEATTLE_SIMULATOR_TEMPERATURE").and_then(|v| v.parse::<f64>().ok())
            && (0.0..=2.0).contains(&temp)
        {
            self.llm.temperature = temp;
        }
    }
}
