use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// 上流リスティングサービスから取得する NFT 1 件分。取得後は不変
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NftAsset {
    pub identifier: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub display_image_url: Option<String>,
    #[serde(default)]
    pub opensea_url: Option<String>,
    #[serde(default)]
    pub token_standard: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
}

impl NftAsset {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Unnamed NFT")
    }

    /// 表示用画像の解決。image_url → display_image_url → 空文字の順
    pub fn resolve_image(&self) -> &str {
        self.image_url
            .as_deref()
            .or(self.display_image_url.as_deref())
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwnerAccount {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenBalance {
    pub name: String,
    pub amount: f64,
}

/// 1 回のカスタマイズ操作ごとに作り直す。永続化しない
#[derive(Debug, Clone)]
pub struct CustomizationRequest {
    pub asset: NftAsset,
    pub brand: String,
}

/// 編集サーバーが返した画像。data URL（または完成済み画像参照）をそのまま保持する
#[derive(Debug, Clone)]
pub struct CustomizationResult {
    pub image: String,
    pub brand: String,
    pub created_ms: u64,
}

impl CustomizationResult {
    pub fn new(image: String, brand: String) -> Self {
        Self {
            image,
            brand,
            created_ms: epoch_ms(),
        }
    }
}

/// 支払い結果。成功フラグとトランザクションハッシュのみ。永続化しない
#[derive(Debug, Clone, Default)]
pub struct PaymentOutcome {
    pub success: bool,
    pub tx_hash: Option<String>,
}

pub fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(image_url: Option<&str>, display: Option<&str>) -> NftAsset {
        NftAsset {
            identifier: "1".to_string(),
            name: None,
            image_url: image_url.map(str::to_string),
            display_image_url: display.map(str::to_string),
            opensea_url: None,
            token_standard: None,
            collection: None,
        }
    }

    #[test]
    fn resolve_image_prefers_image_url() {
        let a = asset(Some("https://img/a.png"), Some("https://img/b.png"));
        assert_eq!(a.resolve_image(), "https://img/a.png");
    }

    #[test]
    fn resolve_image_falls_back_to_display_image() {
        let a = asset(None, Some("https://img/b.png"));
        assert_eq!(a.resolve_image(), "https://img/b.png");
    }

    #[test]
    fn resolve_image_without_any_url_is_empty_placeholder() {
        let a = asset(None, None);
        assert_eq!(a.resolve_image(), "");
    }

    #[test]
    fn display_name_defaults_to_unnamed() {
        let a = asset(None, None);
        assert_eq!(a.display_name(), "Unnamed NFT");
    }

    #[test]
    fn asset_deserializes_with_missing_optionals() {
        let a: NftAsset = serde_json::from_str(r#"{"identifier":"42"}"#).unwrap();
        assert_eq!(a.identifier, "42");
        assert!(a.name.is_none());
        assert_eq!(a.resolve_image(), "");
    }
}
