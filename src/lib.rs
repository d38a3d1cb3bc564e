//! NFT のコレクション閲覧・ブランドカスタマイズ用クレート。
//! バイナリ側（ダッシュボード / アーティファクト検査）から利用する。

pub mod artifact;
pub mod assistant;
pub mod config;
pub mod edit;
pub mod errors;
pub mod gallery;
pub mod nft;
pub mod wallet;
pub mod workflow;
