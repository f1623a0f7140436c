use super::base::ProviderConfig;
use anyhow::Result;

pub const DEEPSEEK_HOST: &str = "https://api.deepseek.com";

#[derive(Clone)]
pub struct DeepSeekProviderConfig {
    pub api_key: String,
    pub host: String,
}

impl DeepSeekProviderConfig {
    pub fn new(api_key: String, host: String) -> Self {
        Self { api_key, host }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.host.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for DeepSeekProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeepSeekProviderConfig")
            .field("api_key", &"<redacted>")
            .field("host", &self.host)
            .finish()
    }
}

impl ProviderConfig for DeepSeekProviderConfig {
    fn from_env() -> Result<Self> {
        let api_key = Self::get_env("DEEPSEEK_API_KEY", true, None)?
            .ok_or_else(|| anyhow::anyhow!("DeepSeek API key should be present"))?;

        let host = Self::get_env("DEEPSEEK_API_HOST", false, Some(DEEPSEEK_HOST.to_string()))?
            .unwrap_or_else(|| DEEPSEEK_HOST.to_string());

        Ok(Self::new(api_key, host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_host() {
        let config = DeepSeekProviderConfig::new("key".into(), "https://api.deepseek.com/".into());
        assert_eq!(config.endpoint(), "https://api.deepseek.com/chat/completions");

        let config = DeepSeekProviderConfig::new("key".into(), "http://127.0.0.1:1234".into());
        assert_eq!(config.endpoint(), "http://127.0.0.1:1234/chat/completions");
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = DeepSeekProviderConfig::new("sk-secret".into(), DEEPSEEK_HOST.into());
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
