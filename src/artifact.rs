use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use oxipng::{InFile, Options, OutFile};

use crate::config::{PngCompressionConfig, StorageConfig};
use crate::errors::{StudioError, StudioResult};
use crate::nft::{CustomizationResult, epoch_ms};

/// 保存キーの名前空間。`<namespace>_<brand|Unnamed>_<epoch-ms>`
pub const KEY_NAMESPACE: &str = "Generated_NFTs";

/// 生成画像のローカル保存とダウンロード書き出し。
/// キーごとに 1 ファイル、値は data URL 文字列そのまま
pub struct ArtifactStore {
    artifact_dir: String,
    download_dir: String,
    compression: Option<PngCompressionConfig>,
    clock: fn() -> u64,
}

impl ArtifactStore {
    pub fn new(cfg: &StorageConfig) -> Self {
        Self::with_clock(cfg, epoch_ms)
    }

    /// テスト用に時計を差し替えられるコンストラクタ
    pub fn with_clock(cfg: &StorageConfig, clock: fn() -> u64) -> Self {
        Self {
            artifact_dir: cfg.artifact_dir.clone(),
            download_dir: cfg.download_dir.clone(),
            compression: cfg.png_compression.clone(),
            clock,
        }
    }

    pub fn artifact_dir(&self) -> &str {
        &self.artifact_dir
    }

    /// 結果を導出キーで保存し、キーを返す。
    /// 同一ミリ秒でのキー衝突は既知の制限としてそのまま上書きになる
    pub fn persist(&self, result: &CustomizationResult) -> StudioResult<String> {
        fs::create_dir_all(&self.artifact_dir)?;
        let key = artifact_key(&result.brand, (self.clock)());
        fs::write(Path::new(&self.artifact_dir).join(&key), &result.image)?;
        Ok(key)
    }

    /// data URL を復号してダウンロード先へ書き出す。
    /// 何度呼んでも保存済みアーティファクトには触れず、一時ファイルも残さない
    pub fn trigger_download(
        &self,
        result: &CustomizationResult,
        filename: &str,
    ) -> StudioResult<PathBuf> {
        let bytes = decode_data_url(&result.image)?;
        fs::create_dir_all(&self.download_dir)?;
        let path = Path::new(&self.download_dir).join(filename);
        fs::write(&path, &bytes)?;

        if let Some(c) = &self.compression {
            if c.enabled && filename.ends_with(".png") {
                compress_png(&path, c.level)?;
            }
        }
        Ok(path)
    }

    /// ミント応答などのテキストをそのまま書き出す
    pub fn save_text_artifact(&self, filename: &str, text: &str) -> StudioResult<PathBuf> {
        fs::create_dir_all(&self.download_dir)?;
        let path = Path::new(&self.download_dir).join(filename);
        fs::write(&path, text)?;
        Ok(path)
    }
}

pub fn artifact_key(brand: &str, epoch_ms: u64) -> String {
    let brand = if brand.is_empty() { "Unnamed" } else { brand };
    format!("{KEY_NAMESPACE}_{brand}_{epoch_ms}")
}

/// `data:<mime>;base64,<payload>` からバイナリを取り出す
pub fn decode_data_url(url: &str) -> StudioResult<Vec<u8>> {
    let Some((header, payload)) = url.split_once(";base64,") else {
        return Err(StudioError::MalformedResponse(
            "data URL ではありません".to_string(),
        ));
    };
    if !header.starts_with("data:") {
        return Err(StudioError::MalformedResponse(
            "data URL ではありません".to_string(),
        ));
    }
    STANDARD
        .decode(payload)
        .map_err(|err| StudioError::MalformedResponse(err.to_string()))
}

fn compress_png(path: &Path, level: u8) -> StudioResult<()> {
    let level = level.min(6);
    let mut options = Options::from_preset(level);
    options.fix_errors = true;

    let in_file = InFile::Path(path.to_path_buf());
    let out_file = OutFile::Path {
        path: Some(path.to_path_buf()),
        preserve_attrs: true,
    };
    oxipng::optimize(&in_file, &out_file, &options)
        .map_err(|err| StudioError::Storage(io::Error::other(err.to_string())))
}
