pub mod base;
pub mod deepseek;

pub use base::ProviderConfig;
pub use deepseek::DeepSeekProviderConfig;
