use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SessionError {
    #[snafu(display("session id '{raw}' is not in xxxx-xxxx-xxxx-xxxx form"))]
    InvalidId { stage: &'static str, raw: String },
    #[snafu(display("session storage failed for key '{key}' on `{stage}`: {details}"))]
    Storage {
        stage: &'static str,
        key: String,
        details: String,
    },
    #[snafu(display("session already established as '{existing}', refusing to adopt '{attempted}'"))]
    AlreadyEstablished {
        stage: &'static str,
        existing: String,
        attempted: String,
    },
}

pub type SessionResult<T> = Result<T, SessionError>;
