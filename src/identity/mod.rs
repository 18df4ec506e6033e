//! Client-side identity: credential decoding, role extraction, the persisted
//! session and the access guard. Keep the public surface thin and split
//! implementation across sub-modules.

mod credential;
mod role;
mod session;
mod authorizer;

pub use credential::{decode_claims, Claims, DecodeError};
pub use role::{extract_role, Role};
pub use session::{
    FileBackend, MemoryBackend, Session, SessionBackend, SessionContext, ROLE_KEY, TOKEN_KEY, USER_ID_KEY,
};
pub use authorizer::{AccessGuard, GuardDecision, Navigation, RequiredRoles};
