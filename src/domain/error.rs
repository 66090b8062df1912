//! Domain error types.

/// A parse error with position information for instrument kind-specs.
#[derive(Debug, Clone, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct KindParseError {
    pub message: String,
    pub position: usize,
}

impl KindParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!("{input}\n{caret}\n{}", self)
    }
}

/// Top-level error type for nokfolio.
#[derive(Debug, thiserror::Error)]
pub enum FolioError {
    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    KindParse(#[from] KindParseError),

    #[error("ledger references {symbol} but [instruments] has no entry for it")]
    UnknownInstrument { symbol: String },

    #[error("no usable rows in ledger {file}: {skipped} skipped")]
    LedgerUnusable { file: String, skipped: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&FolioError> for std::process::ExitCode {
    fn from(err: &FolioError) -> Self {
        let code: u8 = match err {
            FolioError::Io(_) => 1,
            FolioError::ConfigParse { .. }
            | FolioError::ConfigMissing { .. }
            | FolioError::ConfigInvalid { .. } => 2,
            FolioError::Data { .. } | FolioError::LedgerUnusable { .. } => 3,
            FolioError::KindParse(_) | FolioError::UnknownInstrument { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parse_error_context_points_at_position() {
        let err = KindParseError {
            message: "expected number".into(),
            position: 6,
        };
        let rendered = err.display_with_context("fixed:abc");
        assert!(rendered.contains("fixed:abc"));
        assert!(rendered.contains("      ^"));
        assert!(rendered.contains("position 6"));
    }

    #[test]
    fn error_messages_name_the_offender() {
        let err = FolioError::UnknownInstrument {
            symbol: "AMD".into(),
        };
        assert!(err.to_string().contains("AMD"));

        let err = FolioError::ConfigMissing {
            section: "portfolio".into(),
            key: "ledger_path".into(),
        };
        assert_eq!(err.to_string(), "missing config key [portfolio] ledger_path");
    }
}
