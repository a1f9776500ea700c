mod settings;

pub use settings::{
    DatabaseConfig, JwtConfig, PushConfig, RateLimitConfig, ServerConfig, Settings, VapidConfig,
};
