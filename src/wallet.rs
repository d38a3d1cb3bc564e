use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::WalletConfig;
use crate::errors::{StudioError, StudioResult};
use crate::nft::PaymentOutcome;

const WEI_PER_ETH_DECIMALS: usize = 18;

/// 接続済みアカウント。ページ全域のグローバルではなく明示的に引き回す
#[derive(Debug, Clone)]
pub struct WalletSession {
    pub address: String,
}

/// 注入型プロバイダ（eth_* JSON-RPC）へのゲートウェイ
pub struct WalletGateway {
    http: Client,
    provider_url: Option<String>,
    payment_address: String,
    payment_amount_eth: String,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope<T> {
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    message: String,
}

impl WalletGateway {
    pub fn new(cfg: &WalletConfig) -> StudioResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            http,
            provider_url: cfg.provider_url.clone(),
            payment_address: cfg.payment_address.clone(),
            payment_amount_eth: cfg.payment_amount_eth.clone(),
        })
    }

    pub fn payment_address(&self) -> &str {
        &self.payment_address
    }

    pub fn payment_amount_eth(&self) -> &str {
        &self.payment_amount_eth
    }

    /// eth_requestAccounts でアカウント接続を要求する
    pub fn request_account(&self) -> StudioResult<WalletSession> {
        let Some(provider) = self.provider_url.as_deref() else {
            return Err(StudioError::WalletUnavailable);
        };
        let accounts: Vec<String> = self
            .rpc_call(provider, "eth_requestAccounts", json!([]))
            .map_err(|_| StudioError::WalletUnavailable)?;
        let Some(address) = accounts.into_iter().next() else {
            return Err(StudioError::WalletUnavailable);
        };
        Ok(WalletSession { address })
    }

    /// 固定手数料を設定済みの受取先へ送金する。
    /// アカウント未接続・プロバイダ未設定時はネットワークを触らず失敗を返す。
    /// この境界より外へ例外は投げない
    pub fn send_payment(
        &self,
        session: Option<&WalletSession>,
        to: &str,
        amount_eth: &str,
    ) -> PaymentOutcome {
        let Some(session) = session else {
            return PaymentOutcome::default();
        };
        let Some(provider) = self.provider_url.as_deref() else {
            return PaymentOutcome::default();
        };
        let Ok(wei) = eth_to_wei(amount_eth) else {
            return PaymentOutcome::default();
        };

        let params = json!([{
            "from": session.address,
            "to": to,
            "value": format!("0x{wei:x}"),
        }]);
        match self.rpc_call::<String>(provider, "eth_sendTransaction", params) {
            Ok(tx_hash) => PaymentOutcome {
                success: true,
                tx_hash: Some(tx_hash),
            },
            Err(_) => PaymentOutcome::default(),
        }
    }

    fn rpc_call<T: serde::de::DeserializeOwned + std::default::Default>(
        &self,
        provider: &str,
        method: &str,
        params: Value,
    ) -> Result<T, String> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let envelope: RpcEnvelope<T> = self
            .http
            .post(provider)
            .json(&request)
            .send()
            .map_err(|err| err.to_string())?
            .json()
            .map_err(|err| err.to_string())?;

        if let Some(err) = envelope.error {
            return Err(err.message);
        }
        envelope
            .result
            .ok_or_else(|| "result がありません".to_string())
    }
}

/// ETH 建て小数文字列を wei へ厳密変換する。浮動小数点は使わない
pub fn eth_to_wei(amount: &str) -> StudioResult<u128> {
    let amount = amount.trim();
    let (int_part, frac_part) = match amount.split_once('.') {
        Some((i, f)) => (i, f),
        None => (amount, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(StudioError::Validation(format!(
            "支払い額の形式が不正です: {amount:?}"
        )));
    }
    if frac_part.len() > WEI_PER_ETH_DECIMALS {
        return Err(StudioError::Validation(format!(
            "支払い額の小数部は {WEI_PER_ETH_DECIMALS} 桁までです: {amount:?}"
        )));
    }

    let int_value: u128 = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| {
            StudioError::Validation(format!("支払い額の形式が不正です: {amount:?}"))
        })?
    };

    let mut padded = frac_part.to_string();
    while padded.len() < WEI_PER_ETH_DECIMALS {
        padded.push('0');
    }
    let frac_value: u128 = padded.parse().map_err(|_| {
        StudioError::Validation(format!("支払い額の形式が不正です: {amount:?}"))
    })?;

    int_value
        .checked_mul(10u128.pow(WEI_PER_ETH_DECIMALS as u32))
        .and_then(|v| v.checked_add(frac_value))
        .ok_or_else(|| StudioError::Validation(format!("支払い額が大きすぎます: {amount:?}")))
}
