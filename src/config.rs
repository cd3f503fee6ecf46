use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    /// Generate the demo roster and attendance history on first run.
    pub seed_demo: bool,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let seed_demo = std::env::var("SEED_DEMO_DATA")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);
        Ok(Self {
            database_url,
            seed_demo,
        })
    }
}
