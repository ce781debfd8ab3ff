use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeSitterError {
    #[error("failed to set language for parser")]
    LanguageSet,

    #[error("failed to parse source code")]
    ParseFailed,

    #[error("malformed {kind} node at byte {offset}: missing {anchor}")]
    MissingAnchor {
        kind: &'static str,
        anchor: &'static str,
        offset: usize,
    },
}
