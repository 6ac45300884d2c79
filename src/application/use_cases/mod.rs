pub mod authorize;
pub mod token;
pub mod webauthn_engine;
