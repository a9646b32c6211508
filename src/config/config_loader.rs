use anyhow::Result;

use super::config_model::{Database, DotEnvyConfig, Identity, Razorpay, Server};

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let server = Server {
        port: std::env::var("SERVER_PORT")
            .expect("SERVER_PORT is invalid")
            .parse()?,
        body_limit: std::env::var("SERVER_BODY_LIMIT")
            .expect("SERVER_BODY_LIMIT is invalid")
            .parse()?,
        timeout: std::env::var("SERVER_TIMEOUT")
            .expect("SERVER_TIMEOUT is invalid")
            .parse()?,
    };

    let database = Database {
        url: std::env::var("DATABASE_URL").expect("DATABASE_URL is invalid"),
    };

    let identity = Identity {
        jwt_secret: std::env::var("IDENTITY_JWT_SECRET").expect("IDENTITY_JWT_SECRET is invalid"),
    };

    let razorpay = match (
        std::env::var("RAZORPAY_KEY_ID"),
        std::env::var("RAZORPAY_KEY_SECRET"),
    ) {
        (Ok(key_id), Ok(key_secret)) => Some(Razorpay { key_id, key_secret }),
        _ => None,
    };

    Ok(DotEnvyConfig {
        server,
        database,
        identity,
        razorpay,
    })
}
