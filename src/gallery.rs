use std::time::Duration;

use rayon::prelude::*;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::config::ServicesConfig;
use crate::errors::StudioResult;
use crate::nft::{NftAsset, OwnerAccount, TokenBalance};

/// リスティング / 残高サービスへの読み取り専用クライアント
pub struct GalleryClient {
    http: Client,
    backend_url: String,
    balance_url: String,
    network: String,
}

/// `{ "nfts": { "nfts": [...] } }` の二重ネストをそのまま受ける
#[derive(Debug, Deserialize)]
struct NftEnvelope {
    #[serde(default)]
    nfts: Option<NftList>,
}

#[derive(Debug, Deserialize)]
struct NftList {
    #[serde(default)]
    nfts: Vec<NftAsset>,
}

#[derive(Debug, Deserialize)]
struct OwnedEnvelope {
    #[serde(default)]
    account: Option<OwnerAccount>,
    #[serde(default)]
    nfts: Option<NftList>,
}

#[derive(Debug, Deserialize)]
struct BalancesEnvelope {
    #[serde(default)]
    balances: Vec<TokenBalance>,
}

impl GalleryClient {
    pub fn new(cfg: &ServicesConfig) -> StudioResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            backend_url: cfg.backend_url.clone(),
            balance_url: cfg.balance_url.clone(),
            network: cfg.network.clone(),
        })
    }

    /// コレクション名から NFT 一覧を取得
    pub fn collection(&self, name: &str) -> StudioResult<Vec<NftAsset>> {
        let url = format!("{}/collection/{}", self.backend_url, name);
        let envelope: NftEnvelope = self.http.get(url).send()?.error_for_status()?.json()?;
        Ok(envelope.nfts.map(|l| l.nfts).unwrap_or_default())
    }

    /// ユーザー名から保有 NFT とアカウント情報を取得
    pub fn owned_by(&self, username: &str) -> StudioResult<(Option<OwnerAccount>, Vec<NftAsset>)> {
        let url = format!("{}/nfts/{}", self.backend_url, username);
        let envelope: OwnedEnvelope = self.http.get(url).send()?.error_for_status()?.json()?;
        let nfts = envelope.nfts.map(|l| l.nfts).unwrap_or_default();
        Ok((envelope.account, nfts))
    }

    pub fn balances(&self, address: &str) -> StudioResult<Vec<TokenBalance>> {
        let url = format!("{}/balances", self.balance_url);
        let envelope: BalancesEnvelope = self
            .http
            .get(url)
            .query(&[("address", address), ("network", self.network.as_str())])
            .send()?
            .error_for_status()?
            .json()?;
        Ok(envelope.balances)
    }

    /// 設定済みコレクションを並列で一括取得する。
    /// 個々の失敗は結果に残し、呼び出し側で通知する
    pub fn fetch_collections(
        &self,
        names: &[String],
    ) -> Vec<(String, StudioResult<Vec<NftAsset>>)> {
        names
            .par_iter()
            .map(|name| (name.clone(), self.collection(name)))
            .collect()
    }
}
