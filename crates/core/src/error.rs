use thiserror::Error;

#[derive(Error, Debug)]
pub enum LullError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}
