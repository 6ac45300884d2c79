pub mod oauth_controller;
pub mod webauthn_controller;

