use derive_more::From;
use k8s_openapi::serde_json;

use crate::k8s::informer::resource::SelectorError;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, From)]
pub enum Error {
    #[from]
    Json(serde_json::Error),

    #[from]
    Kube(kube::Error),

    #[from]
    Infer(kube::config::InferConfigError),

    #[from]
    InvalidHeader(hyper::http::header::InvalidHeaderValue),

    #[from]
    Selector(SelectorError),

    /// A handler returned an error or panicked
    Handler(String),

    /// Custom error message
    Custom(String),
}

impl core::fmt::Display for Error {
    fn fmt(&self, fmt: &mut core::fmt::Formatter) -> core::result::Result<(), core::fmt::Error> {
        match self {
            Self::Selector(e) => write!(fmt, "{e}"),
            Self::Handler(msg) => write!(fmt, "handler failed: {msg}"),
            Self::Custom(msg) => write!(fmt, "{msg}"),
            _ => write!(fmt, "{self:?}"),
        }
    }
}

impl std::error::Error for Error {}
