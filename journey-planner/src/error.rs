use journey_model::PinId;

/// Shown when the server doesn't explain why it refused a journey.
pub const SUBMIT_FAILED: &str = "旅路登録に失敗しました";
/// Shown for transport failures.
pub const NETWORK_FAILED: &str = "通信に失敗しました";
pub const EMPTY_SELECTION: &str = "少なくとも1つのピンを選択してください";
pub const ROUTES_FETCH_FAILED: &str = "旅路一覧の取得に失敗しました";
pub const PINS_FETCH_FAILED: &str = "ピンの取得に失敗しました";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with status {0}")]
    Status(u16),

    #[error("couldn't decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("server rejected the request: {}", .0.as_deref().unwrap_or("no reason given"))]
    Rejected(Option<String>),

    #[error("couldn't read the cover image: {0}")]
    Cover(String),
}

impl ApiError {
    /// What to tell the user. A reason given by the server is passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Rejected(Some(reason)) => reason.clone(),
            ApiError::Rejected(None) | ApiError::Cover(_) => SUBMIT_FAILED.to_string(),
            ApiError::Transport(_) | ApiError::Status(_) | ApiError::Decode(_) => {
                NETWORK_FAILED.to_string()
            }
        }
    }
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum WizardError {
    #[error("no pins selected")]
    EmptySelection,

    #[error("can't {action} while {step}")]
    WrongStep {
        action: &'static str,
        step: &'static str,
    },

    #[error("pin {0:?} isn't in the current list")]
    UnknownPin(PinId),

    #[error("no category with id {0}")]
    UnknownCategory(u32),

    #[error("a submission is already in flight")]
    Busy,
}

impl WizardError {
    pub fn user_message(&self) -> String {
        match self {
            WizardError::EmptySelection => EMPTY_SELECTION.to_string(),
            other => other.to_string(),
        }
    }
}
