pub mod error;
pub mod id;
pub mod pattern;
pub mod redact;
pub mod time;

pub use error::{CoreError, Result};
pub use id::{IdStrategy, fold_uuid, generate_id, generate_numeric_id};
pub use pattern::{glob_match, has_wildcard, like_match, sanitize_key, translate_pattern};
pub use redact::mask_url;
pub use time::{epoch_after, now_epoch};
