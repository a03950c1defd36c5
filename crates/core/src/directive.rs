//! The engine's answer to one round trip.

use serde::{Deserialize, Serialize};

/// Whether the dialogue goes on after this response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectiveKind {
    /// More input expected (`CON`)
    Continue,
    /// Dialogue over, session purged (`END`)
    Terminate,
}

impl DirectiveKind {
    /// The wire prefix for this kind.
    pub fn prefix(&self) -> &'static str {
        match self {
            DirectiveKind::Continue => "CON",
            DirectiveKind::Terminate => "END",
        }
    }
}

/// A response to render back to the handset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directive {
    pub kind: DirectiveKind,
    pub message: String,
}

impl Directive {
    pub fn proceed(message: impl Into<String>) -> Self {
        Self {
            kind: DirectiveKind::Continue,
            message: message.into(),
        }
    }

    pub fn terminate(message: impl Into<String>) -> Self {
        Self {
            kind: DirectiveKind::Terminate,
            message: message.into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == DirectiveKind::Terminate
    }

    /// Plain-text body: `CON <message>` or `END <message>`.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl std::fmt::Display for Directive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind.prefix(), self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_continue_with_con_prefix() {
        let d = Directive::proceed("Enter your full name:");
        assert_eq!(d.render(), "CON Enter your full name:");
        assert!(!d.is_terminal());
    }

    #[test]
    fn renders_terminate_with_end_prefix_and_keeps_newlines() {
        let d = Directive::terminate("Registration cancelled.\nGoodbye");
        assert_eq!(d.render(), "END Registration cancelled.\nGoodbye");
        assert!(d.is_terminal());
        assert_eq!(d.to_string(), d.render());
    }
}
