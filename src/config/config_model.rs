#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub server: Server,
    pub database: Database,
    pub identity: Identity,
    pub razorpay: Option<Razorpay>,
}

#[derive(Debug, Clone)]
pub struct Server {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone)]
pub struct Database {
    pub url: String,
}

/// Shared secret for the identity provider's HS256 session tokens.
#[derive(Debug, Clone)]
pub struct Identity {
    pub jwt_secret: String,
}

/// Optional: without these the service still runs, but real-mode payment
/// intents are refused while mock mode keeps working.
#[derive(Debug, Clone)]
pub struct Razorpay {
    pub key_id: String,
    pub key_secret: String,
}
