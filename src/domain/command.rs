// Outbound configuration commands (host -> device)
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Threshold,
    Calibration,
}

impl CommandKind {
    fn prefix(self) -> char {
        match self {
            CommandKind::Threshold => 'T',
            CommandKind::Calibration => 'C',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CommandKind::Threshold => "Threshold",
            CommandKind::Calibration => "Calibration",
        }
    }
}

impl std::str::FromStr for CommandKind {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "threshold" => Ok(CommandKind::Threshold),
            "calibration" => Ok(CommandKind::Calibration),
            _ => Err(CommandError::UnknownKind(s.to_string())),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("Invalid input for {0}. Please enter a valid number.")]
    Empty(&'static str),
    #[error("Invalid input for {kind}: {input:?} is not a non-negative integer")]
    NotANumber { kind: &'static str, input: String },
    #[error("Invalid input for {kind}: {input} is out of range")]
    OutOfRange { kind: &'static str, input: String },
    #[error("Unknown command kind: {0}")]
    UnknownKind(String),
}

/// A validated command. Only obtainable from a checked operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Threshold(u32),
    Calibration(u32),
}

impl Command {
    pub fn new(kind: CommandKind, value: u32) -> Self {
        match kind {
            CommandKind::Threshold => Command::Threshold(value),
            CommandKind::Calibration => Command::Calibration(value),
        }
    }

    /// Validate user text. Only plain ASCII digits are accepted, so signs,
    /// decimals and whitespace inside the number are all rejected.
    pub fn parse(kind: CommandKind, input: &str) -> Result<Self, CommandError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CommandError::Empty(kind.label()));
        }
        if !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CommandError::NotANumber {
                kind: kind.label(),
                input: input.to_string(),
            });
        }

        let value = input.parse::<u32>().map_err(|_| CommandError::OutOfRange {
            kind: kind.label(),
            input: input.to_string(),
        })?;

        Ok(Self::new(kind, value))
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Threshold(_) => CommandKind::Threshold,
            Command::Calibration(_) => CommandKind::Calibration,
        }
    }

    pub fn value(&self) -> u32 {
        match self {
            Command::Threshold(v) | Command::Calibration(v) => *v,
        }
    }

    /// Wire form, no terminator
    pub fn encode(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind().prefix(), self.value())
    }
}
