use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::blocking::multipart::{Form, Part};
use serde::Deserialize;

use crate::config::ServicesConfig;
use crate::errors::{StudioError, StudioResult};
use crate::nft::{CustomizationRequest, CustomizationResult};

/// 編集バックエンドへのクライアント。リトライなしの 1 回勝負
pub struct EditClient {
    http: Client,
    backend_url: String,
}

/// バックエンドが返しうる 3 形状を順序付きで判別した結果
#[derive(Debug, PartialEq, Eq)]
enum EditResponse {
    /// `{ "error": .. }` — 最優先で拾い、結果は作らない
    Error(String),
    /// `{ "image_base64": .. }` — PNG の data URL に包む
    ImageBase64(String),
    /// `{ "metadata": { "image": .. } }` — 完成済み参照をそのまま使う
    Metadata(String),
}

#[derive(Debug, Deserialize)]
struct EditBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    image_base64: Option<String>,
    #[serde(default)]
    metadata: Option<EditMetadata>,
}

#[derive(Debug, Deserialize)]
struct EditMetadata {
    #[serde(default)]
    image: Option<String>,
}

impl EditClient {
    pub fn new(cfg: &ServicesConfig) -> StudioResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            backend_url: cfg.backend_url.clone(),
        })
    }

    /// 画像 URL とブランド名を送り、編集済み画像を受け取る。
    /// 画像バイナリは送らない。取得はバックエンド側の責務
    pub fn edit_asset(&self, request: &CustomizationRequest) -> StudioResult<CustomizationResult> {
        let mut form = Form::new()
            .text("file_url", request.asset.resolve_image().to_string())
            .text("brand", request.brand.clone());
        if let Some(url) = &request.asset.opensea_url {
            form = form.text("metadata_url", url.clone());
        }

        let response = self
            .http
            .post(format!("{}/api/edit-nft", self.backend_url))
            .multipart(form)
            .send()?;
        let http_ok = response.status().is_success();
        let body = response.text()?;

        let image = interpret_response(http_ok, &body)?;
        Ok(CustomizationResult::new(image, request.brand.clone()))
    }

    /// 編集済み画像をミントに回す。返ってきた JSON は整形してそのまま呼び出し側へ渡す
    pub fn mint_asset(&self, image_bytes: Vec<u8>, brand: &str) -> StudioResult<String> {
        let part = Part::bytes(image_bytes)
            .file_name("edited.png")
            .mime_str("image/png")?;
        let form = Form::new().part("file", part).text("brand", brand.to_string());

        let response = self
            .http
            .post(format!("{}/api/mint-nft", self.backend_url))
            .multipart(form)
            .send()?;
        let http_ok = response.status().is_success();
        let body = response.text()?;

        if !http_ok {
            return Err(StudioError::EditFailed(body));
        }
        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|err| StudioError::MalformedResponse(err.to_string()))?;
        serde_json::to_string_pretty(&value)
            .map_err(|err| StudioError::MalformedResponse(err.to_string()))
    }
}

/// HTTP ステータス → error → image_base64 → metadata.image の優先順で判別する。
/// ステータス失敗時は成功形のフィールドが混ざっていても本文ごと失敗にする
fn interpret_response(http_ok: bool, body: &str) -> StudioResult<String> {
    if !http_ok {
        return Err(StudioError::EditFailed(body.to_string()));
    }
    match decode_edit_body(body)? {
        EditResponse::Error(message) => Err(StudioError::EditFailed(message)),
        EditResponse::ImageBase64(b64) => Ok(format!("data:image/png;base64,{b64}")),
        EditResponse::Metadata(image) => Ok(image),
    }
}

fn decode_edit_body(body: &str) -> StudioResult<EditResponse> {
    let parsed: EditBody = serde_json::from_str(body)
        .map_err(|err| StudioError::MalformedResponse(err.to_string()))?;

    if let Some(message) = parsed.error {
        return Ok(EditResponse::Error(message));
    }
    if let Some(b64) = parsed.image_base64 {
        return Ok(EditResponse::ImageBase64(b64));
    }
    if let Some(image) = parsed.metadata.and_then(|m| m.image) {
        return Ok(EditResponse::Metadata(image));
    }
    Err(StudioError::MalformedResponse(
        "既知の応答形に一致しません".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_field_takes_precedence_over_image() {
        let body = r#"{"error":"x","image_base64":"QUJD"}"#;
        assert_eq!(
            decode_edit_body(body).unwrap(),
            EditResponse::Error("x".to_string())
        );
    }

    #[test]
    fn image_base64_is_wrapped_into_png_data_url() {
        let image = interpret_response(true, r#"{"image_base64":"QUJD"}"#).unwrap();
        assert_eq!(image, "data:image/png;base64,QUJD");
    }

    #[test]
    fn metadata_image_passes_through_unchanged() {
        let body = r#"{"metadata":{"image":"data:image/png;base64,ZZZ"}}"#;
        let image = interpret_response(true, body).unwrap();
        assert_eq!(image, "data:image/png;base64,ZZZ");
    }

    #[test]
    fn http_failure_wins_even_with_success_shaped_body() {
        let body = r#"{"image_base64":"QUJD"}"#;
        match interpret_response(false, body) {
            Err(StudioError::EditFailed(raw)) => assert_eq!(raw, body),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn explicit_error_body_fails_without_result() {
        match interpret_response(true, r#"{"error":"quota exceeded"}"#) {
            Err(StudioError::EditFailed(message)) => assert_eq!(message, "quota exceeded"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn unparseable_body_is_malformed() {
        assert!(matches!(
            interpret_response(true, "<html>502</html>"),
            Err(StudioError::MalformedResponse(_))
        ));
    }

    #[test]
    fn empty_object_matches_no_known_shape() {
        assert!(matches!(
            interpret_response(true, "{}"),
            Err(StudioError::MalformedResponse(_))
        ));
    }

    #[test]
    fn metadata_without_image_is_malformed() {
        assert!(matches!(
            interpret_response(true, r#"{"metadata":{}}"#),
            Err(StudioError::MalformedResponse(_))
        ));
    }
}
