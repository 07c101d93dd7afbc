mod cors;
mod engine;
mod server;
mod streaming;
mod translate;

pub use cors::{ALLOW_HEADERS, ALLOW_METHODS, ALLOW_ORIGIN, apply_cors_headers};
pub use engine::{ChatApi, ChatTarget, Provider, missing_key_hint, require_openai_key};
pub use server::{AppState, RelayServer, create_router};
pub use streaming::{DATA_PREFIX, DONE_MARKER, StreamRelay};
pub use translate::{Envelope, translate, translate_slice};
