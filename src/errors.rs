use std::io;

use thiserror::Error;

/// ワークフロー境界で利用者に通知されるエラー種別
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("入力が不足しています: {0}")]
    Validation(String),
    #[error("ウォレットプロバイダが見つかりません")]
    WalletUnavailable,
    #[error("支払いが拒否されました")]
    PaymentDeclined,
    #[error("通信エラー: {0}")]
    Network(#[from] reqwest::Error),
    #[error("編集サーバーがエラーを返しました: {0}")]
    EditFailed(String),
    #[error("応答を解釈できません: {0}")]
    MalformedResponse(String),
    #[error("別の処理が実行中です")]
    Busy,
    #[error("保存エラー: {0}")]
    Storage(#[from] io::Error),
}

pub type StudioResult<T> = Result<T, StudioError>;
