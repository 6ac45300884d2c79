use std::env;

#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,

    // WebAuthn relying party identity (SPEC_FULL.md §4.C).
    pub rp_origin: String,
    pub rp_id: String,
    pub rp_name: String,

    // Default client seeded at boot (SPEC_FULL.md §2 supplement).
    pub seed_client_id: String,
    pub seed_client_secret: String,
    pub seed_redirect_uri: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid u16");

        let rp_origin = env::var("RP_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let rp_id = env::var("RP_ID").unwrap_or_else(|_| "localhost".to_string());
        let rp_name = env::var("RP_NAME").unwrap_or_else(|_| "Auth Service".to_string());

        let seed_client_id = env::var("SEED_CLIENT_ID").unwrap_or_else(|_| "demo-client".to_string());
        let seed_client_secret =
            env::var("SEED_CLIENT_SECRET").unwrap_or_else(|_| "demo-secret".to_string());
        let seed_redirect_uri = env::var("SEED_REDIRECT_URI")
            .unwrap_or_else(|_| "http://localhost:3000/callback".to_string());

        Self {
            port,
            rp_origin,
            rp_id,
            rp_name,
            seed_client_id,
            seed_client_secret,
            seed_redirect_uri,
        }
    }
}
