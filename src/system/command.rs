//! Command Module
//!
//! The closed set of directives the robot understands, and their wire tokens
//! as sent by the control panel.

/// Enum representing robot commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "pico2_w", derive(defmt::Format))]
pub enum Command {
    /// Hold both drive motors still
    Stop,
    /// Drive both motors full forward
    Forward,
    /// Drive both motors full reverse
    Backward,
    /// Spin left in place
    TurnLeft,
    /// Spin right in place
    TurnRight,
    /// Run the spray sequence once
    Spray,
}

impl Command {
    /// Every command, in panel order
    pub const ALL: [Command; 6] = [
        Command::Stop,
        Command::Forward,
        Command::Backward,
        Command::TurnLeft,
        Command::TurnRight,
        Command::Spray,
    ];

    /// Parses a wire token. Matching is exact and case-sensitive.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "stop" => Some(Command::Stop),
            "forward" => Some(Command::Forward),
            "back" => Some(Command::Backward),
            "turn_left" => Some(Command::TurnLeft),
            "turn_right" => Some(Command::TurnRight),
            "spray" => Some(Command::Spray),
            _ => None,
        }
    }

    /// Wire token of this command
    pub fn token(self) -> &'static str {
        match self {
            Command::Stop => "stop",
            Command::Forward => "forward",
            Command::Backward => "back",
            Command::TurnLeft => "turn_left",
            Command::TurnRight => "turn_right",
            Command::Spray => "spray",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokens_parse_back_to_their_command() {
        for command in Command::ALL {
            assert_eq!(Command::from_token(command.token()), Some(command));
        }
    }

    #[test]
    fn test_panel_tokens() {
        assert_eq!(Command::from_token("back"), Some(Command::Backward));
        assert_eq!(Command::from_token("turn_left"), Some(Command::TurnLeft));
    }

    #[test]
    fn test_unknown_tokens_are_rejected() {
        assert_eq!(Command::from_token("xyz"), None);
        assert_eq!(Command::from_token(""), None);
        assert_eq!(Command::from_token("Forward"), None);
        assert_eq!(Command::from_token("backward"), None);
        assert_eq!(Command::from_token(" stop"), None);
    }
}
