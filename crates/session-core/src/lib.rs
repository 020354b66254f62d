pub mod api;
pub mod config;
mod config_env;
pub mod guard;
pub mod operation;
pub mod session;
pub mod source;
pub mod transcript;
pub mod validation;

pub use api::{BackendError, DocumentBackend, RagApiClient, VideoBackend};
pub use config::{ClientConfig, ConfigError, StaleResponsePolicy, load_dotenv};
pub use session::{
    DocumentSession, IngestOutcome, QueryOutcome, SessionError, SessionPhase, VideoSession,
};
