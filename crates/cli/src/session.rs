/// Words that end the chat without reaching the assistant.
pub const QUIT_WORDS: [&str; 4] = ["quit", "exit", "bye", "goodbye"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionCommand {
    Quit,
    /// Blank input.
    Skip,
    Utterance(String),
}

impl SessionCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Self::Skip;
        }
        if QUIT_WORDS.iter().any(|word| trimmed.eq_ignore_ascii_case(word)) {
            return Self::Quit;
        }
        Self::Utterance(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::SessionCommand;

    #[test]
    fn quit_words_match_whole_input_only() {
        assert_eq!(SessionCommand::parse("  Goodbye \n"), SessionCommand::Quit);
        assert_eq!(SessionCommand::parse("EXIT"), SessionCommand::Quit);
        assert_eq!(
            SessionCommand::parse("bye for now"),
            SessionCommand::Utterance("bye for now".to_string())
        );
    }

    #[test]
    fn whitespace_only_lines_are_skipped() {
        assert_eq!(SessionCommand::parse(" \t "), SessionCommand::Skip);
    }
}
