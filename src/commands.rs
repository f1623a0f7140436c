/// One line of operator input, classified before it reaches the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Clear,
    Help,
    /// `/add <path>`
    Add(String),
    /// `/add` without a path
    MissingPath,
    Empty,
    Message(String),
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let lowered = trimmed.to_lowercase();

        match lowered.as_str() {
            "" => return Command::Empty,
            "exit" | "quit" | "/exit" | "/quit" => return Command::Exit,
            "/clear" => return Command::Clear,
            "/help" => return Command::Help,
            "/add" => return Command::MissingPath,
            _ => {}
        }

        if lowered.starts_with("/add ") {
            let path = trimmed[4..].trim();
            return Command::Add(path.to_string());
        }

        Command::Message(trimmed.to_string())
    }
}
