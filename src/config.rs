use serde::Deserialize;
use anyhow::Result;
use std::fs;

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&text)?;
        Ok(config)
    }
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub services: ServicesConfig,
    pub wallet: WalletConfig,
    pub collections: Vec<String>,
    pub storage: StorageConfig,
}

/// 各バックエンドのベース URL（末尾スラッシュなし）
#[derive(Debug, Deserialize)]
pub struct ServicesConfig {
    pub backend_url: String,
    pub balance_url: String,
    pub assistant_url: String,
    pub network: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize)]
pub struct WalletConfig {
    /// 未設定ならウォレット機能は無効
    pub provider_url: Option<String>,
    pub payment_address: String,
    /// ETH 建ての固定手数料。小数文字列のまま持ち、送信時に wei へ厳密変換する
    pub payment_amount_eth: String,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub artifact_dir: String,
    pub download_dir: String,
    pub png_compression: Option<PngCompressionConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PngCompressionConfig {
    pub enabled: bool,
    pub level: u8,
}
