use std::env;
use std::str::FromStr;
use tracing::warn;

pub const DEFAULT_MEDICAL_RECORDS_BUCKET: &str = "medical-records";
pub const DEFAULT_MEETING_BASE_URL: &str = "https://meet.jit.si";
pub const DEFAULT_SIGNED_URL_TTL_SECS: u64 = 60;
pub const DEFAULT_MAX_RECORD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub supabase_service_role_key: String,
    pub medical_records_bucket: String,
    pub signed_url_ttl_secs: u64,
    pub meeting_base_url: String,
    pub max_record_bytes: usize,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, doctor registration is disabled");
                    String::new()
                }),
            medical_records_bucket: env::var("MEDICAL_RECORDS_BUCKET")
                .unwrap_or_else(|_| DEFAULT_MEDICAL_RECORDS_BUCKET.to_string()),
            signed_url_ttl_secs: parse_or("SIGNED_URL_TTL_SECS", DEFAULT_SIGNED_URL_TTL_SECS),
            meeting_base_url: env::var("MEETING_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_MEETING_BASE_URL.to_string()),
            max_record_bytes: parse_or("MAX_RECORD_BYTES", DEFAULT_MAX_RECORD_BYTES),
            port: parse_or("PORT", DEFAULT_PORT),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    /// Privileged operations (creating doctor accounts) need the service-role key.
    pub fn has_service_role(&self) -> bool {
        !self.supabase_service_role_key.is_empty()
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", key, raw);
            default
        }),
        Err(_) => default,
    }
}
