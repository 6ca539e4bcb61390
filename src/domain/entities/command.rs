use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::traits::CommandHandler;

/// One token of a command pattern
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(String),
    Param(String),
}

/// Parsed command pattern such as `query - <message>`.
///
/// Literal tokens match whole words case-insensitively. A `<name>` token
/// captures one word, except in last position where it captures the rest of
/// the input verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPattern {
    source: String,
    tokens: Vec<Token>,
}

/// Result of a successful pattern match
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandMatch {
    pub parameters: HashMap<String, String>,
}

impl CommandMatch {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }
}

impl CommandPattern {
    pub fn parse(pattern: impl Into<String>) -> Self {
        let source = pattern.into();
        let tokens = source
            .split_whitespace()
            .map(|t| match t.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
                Some(name) if !name.is_empty() => Token::Param(name.to_string()),
                _ => Token::Literal(t.to_string()),
            })
            .collect();
        Self { source, tokens }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Names of the parameters in pattern order
    pub fn params(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .filter_map(|t| match t {
                Token::Param(name) => Some(name.as_str()),
                Token::Literal(_) => None,
            })
            .collect()
    }

    pub fn matches(&self, input: &str) -> Option<CommandMatch> {
        if self.tokens.is_empty() {
            return None;
        }

        let mut rest = input.trim_start();
        let mut parameters = HashMap::new();
        let last = self.tokens.len() - 1;

        for (i, token) in self.tokens.iter().enumerate() {
            if let (true, Token::Param(name)) = (i == last, token) {
                if rest.trim().is_empty() {
                    return None;
                }
                parameters.insert(name.clone(), rest.to_string());
                return Some(CommandMatch { parameters });
            }

            let (word, tail) = split_word(rest)?;
            match token {
                Token::Literal(lit) if lit.eq_ignore_ascii_case(word) => {}
                Token::Literal(_) => return None,
                Token::Param(name) => {
                    parameters.insert(name.clone(), word.to_string());
                }
            }
            rest = tail.trim_start();
        }

        rest.is_empty().then_some(CommandMatch { parameters })
    }
}

fn split_word(input: &str) -> Option<(&str, &str)> {
    if input.is_empty() {
        return None;
    }
    match input.find(char::is_whitespace) {
        Some(idx) => Some((&input[..idx], &input[idx..])),
        None => Some((input, "")),
    }
}

/// A command the bot responds to
#[derive(Clone)]
pub struct CommandDefinition {
    pub pattern: CommandPattern,
    pub description: Option<String>,
    pub examples: Vec<String>,
    pub handler: Arc<dyn CommandHandler>,
}

impl CommandDefinition {
    pub fn new(pattern: impl Into<String>, handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            pattern: CommandPattern::parse(pattern),
            description: None,
            examples: Vec::new(),
            handler,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_example(mut self, example: impl Into<String>) -> Self {
        self.examples.push(example.into());
        self
    }

    /// Help text shown for this command
    pub fn usage(&self) -> String {
        let mut help = format!(
            "`{}` - {}",
            self.pattern.as_str(),
            self.description.as_deref().unwrap_or("No description")
        );
        for example in &self.examples {
            help.push_str(&format!("\n    Example: {}", example));
        }
        help
    }
}

/// Registered commands, matched in registration order
#[derive(Default, Clone)]
pub struct CommandRegistry {
    commands: Vec<CommandDefinition>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, command: CommandDefinition) {
        self.commands.push(command);
    }

    pub fn find(&self, input: &str) -> Option<(&CommandDefinition, CommandMatch)> {
        self.commands
            .iter()
            .find_map(|c| c.pattern.matches(input).map(|m| (c, m)))
    }

    pub fn all(&self) -> impl Iterator<Item = &CommandDefinition> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
