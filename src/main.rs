use nft_brand_studio::artifact::{ArtifactStore, decode_data_url};
use nft_brand_studio::assistant::AssistantClient;
use nft_brand_studio::config::Config;
use nft_brand_studio::edit::EditClient;
use nft_brand_studio::gallery::GalleryClient;
use nft_brand_studio::nft::NftAsset;
use nft_brand_studio::wallet::{WalletGateway, WalletSession};
use nft_brand_studio::workflow::CustomizeWorkflow;

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

/// ダッシュボード 1 セッション分の UI 状態。ワークフローへ明示的に渡す
struct Dashboard {
    collections: Vec<(String, Vec<NftAsset>)>,
    open: Option<usize>,
    selected: Option<NftAsset>,
    brand: String,
    wallet: Option<WalletSession>,
}

fn main() -> Result<()> {
    let cfg = Config::load("config.yaml")
        .context("config.yaml の読み込みに失敗しました")?;

    let gallery = GalleryClient::new(&cfg.services)?;
    let edit = EditClient::new(&cfg.services)?;
    let assistant = AssistantClient::new(&cfg.services)?;
    let wallet_gateway = WalletGateway::new(&cfg.wallet)?;
    let store = ArtifactStore::new(&cfg.storage);
    let mut workflow = CustomizeWorkflow::new(&wallet_gateway, &edit);

    println!(
        "Fetching {} collections in parallel...",
        cfg.collections.len()
    );
    let mut collections = Vec::new();
    for (name, result) in gallery.fetch_collections(&cfg.collections) {
        match result {
            Ok(nfts) => collections.push((name, nfts)),
            Err(err) => {
                eprintln!("❌ Error in collection {}: {}", name, err);
                collections.push((name, Vec::new()));
            }
        }
    }

    let mut dashboard = Dashboard {
        collections,
        open: None,
        selected: None,
        brand: String::new(),
        wallet: None,
    };

    print_gallery(&dashboard);
    println!("Type `help` for commands.");

    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else { continue };
        let rest = parts.collect::<Vec<_>>().join(" ");

        match command {
            "help" => print_help(),
            "collections" => print_gallery(&dashboard),
            "open" => open_collection(&mut dashboard, &rest),
            "select" => select_nft(&mut dashboard, &rest),
            "brand" => {
                dashboard.brand = rest;
                println!("Brand set: {}", dashboard.brand);
            }
            "connect" => connect_wallet(&mut dashboard, &wallet_gateway, &gallery),
            "owner" => show_owner(&gallery, &rest),
            "edit" => run_edit(&dashboard, &mut workflow, &store),
            "download" => download_result(&dashboard, &workflow, &store),
            "mint" => mint_result(&dashboard, &workflow, &edit, &store),
            "recommend" => recommend(&assistant, &dashboard, &rest),
            "chat" => send_chat(&assistant, &rest),
            "close" => {
                workflow.reset();
                dashboard.selected = None;
                dashboard.open = None;
                println!("Panel closed.");
            }
            "quit" | "exit" => break,
            other => println!("Unknown command: {} (try `help`)", other),
        }
    }

    Ok(())
}

fn print_help() {
    println!("  collections        コレクション一覧を再表示");
    println!("  open <n>           n 番目のコレクションを展開");
    println!("  select <n>         展開中のコレクションから NFT を選択");
    println!("  brand <name>       ブランド名を設定");
    println!("  connect            ウォレットを接続して残高を表示");
    println!("  owner <username>   ユーザーの保有 NFT を表示");
    println!("  edit               支払い → 編集 → 保存を実行");
    println!("  download           編集済み画像を再ダウンロード");
    println!("  mint               編集済み画像をミント");
    println!("  recommend [brand]  ブランド向けのコレクション推薦");
    println!("  chat <message>     アシスタントに質問");
    println!("  close              詳細パネルを閉じて状態を破棄");
    println!("  quit               終了");
}

fn print_gallery(dashboard: &Dashboard) {
    println!("==============================");
    println!(" NFT Collections");
    println!("==============================");
    for (i, (name, nfts)) in dashboard.collections.iter().enumerate() {
        let cover = nfts
            .first()
            .map(|n| n.display_name())
            .unwrap_or("(empty)");
        println!("  [{}] {:24} {:4} items  cover: {}", i, name, nfts.len(), cover);
    }
}

fn open_collection(dashboard: &mut Dashboard, arg: &str) {
    let Ok(index) = arg.parse::<usize>() else {
        println!("Usage: open <n>");
        return;
    };
    let Some((name, nfts)) = dashboard.collections.get(index) else {
        println!("❌ No such collection: {}", index);
        return;
    };

    println!("▶ {} Collection", name);
    for (i, nft) in nfts.iter().enumerate() {
        println!("  [{:3}] {:30} {}", i, nft.display_name(), nft.resolve_image());
    }
    dashboard.open = Some(index);
}

fn select_nft(dashboard: &mut Dashboard, arg: &str) {
    let Some(open) = dashboard.open else {
        println!("Open a collection first (`open <n>`).");
        return;
    };
    let Ok(index) = arg.parse::<usize>() else {
        println!("Usage: select <n>");
        return;
    };
    let Some(nft) = dashboard.collections[open].1.get(index) else {
        println!("❌ No such NFT: {}", index);
        return;
    };

    dashboard.selected = Some(nft.clone());
    print_detail(nft);
}

fn print_detail(nft: &NftAsset) {
    println!("▶ Selected: {}", nft.display_name());
    println!("  identifier : {}", nft.identifier);
    println!("  image      : {}", nft.resolve_image());
    if let Some(standard) = &nft.token_standard {
        println!("  standard   : {}", standard);
    }
    if let Some(url) = &nft.opensea_url {
        println!("  marketplace: {}", url);
    }
}

fn connect_wallet(dashboard: &mut Dashboard, gateway: &WalletGateway, gallery: &GalleryClient) {
    match gateway.request_account() {
        Ok(session) => {
            println!("✅ Connected: {}", session.address);
            match gallery.balances(&session.address) {
                Ok(balances) if !balances.is_empty() => {
                    println!("▶ Token Balances");
                    for balance in balances {
                        println!("  {:20} {:.6}", balance.name, balance.amount);
                    }
                }
                Ok(_) => println!("  (no balances)"),
                Err(err) => eprintln!("❌ Error fetching balances: {}", err),
            }
            dashboard.wallet = Some(session);
        }
        Err(err) => eprintln!("❌ Wallet connection failed: {}", err),
    }
}

fn show_owner(gallery: &GalleryClient, username: &str) {
    if username.is_empty() {
        println!("Usage: owner <username>");
        return;
    }
    match gallery.owned_by(username) {
        Ok((account, nfts)) => {
            if let Some(account) = account {
                println!(
                    "▶ {} ({})",
                    account.username.as_deref().unwrap_or(username),
                    account.address.as_deref().unwrap_or("-")
                );
            }
            for (i, nft) in nfts.iter().enumerate() {
                println!("  [{:3}] {:30} {}", i, nft.display_name(), nft.resolve_image());
            }
            if nfts.is_empty() {
                println!("  (no NFTs found)");
            }
        }
        Err(err) => eprintln!("❌ Error fetching NFTs: {}", err),
    }
}

fn run_edit(
    dashboard: &Dashboard,
    workflow: &mut CustomizeWorkflow<&WalletGateway, &EditClient>,
    store: &ArtifactStore,
) {
    println!("Processing...");
    let key = match workflow.run(
        dashboard.wallet.as_ref(),
        dashboard.selected.as_ref(),
        &dashboard.brand,
        store,
    ) {
        Ok(key) => key,
        Err(err) => {
            eprintln!("❌ {}", err);
            return;
        }
    };
    println!("✅ NFT saved to local store with key: {}", key);

    // 編集が終わったらそのまま自動ダウンロードする
    download_result(dashboard, workflow, store);
}

fn download_result(
    dashboard: &Dashboard,
    workflow: &CustomizeWorkflow<&WalletGateway, &EditClient>,
    store: &ArtifactStore,
) {
    let Some(result) = workflow.result() else {
        println!("No edited image yet (`edit` first).");
        return;
    };
    let filename = format!(
        "{}.png",
        dashboard
            .selected
            .as_ref()
            .and_then(|nft| nft.name.as_deref())
            .unwrap_or("edited-nft")
    );
    match store.trigger_download(result, &filename) {
        Ok(path) => {
            match image::open(&path) {
                Ok(img) => println!(
                    "✅ Edited NFT downloaded: {:?} ({}x{})",
                    path,
                    img.width(),
                    img.height()
                ),
                Err(_) => println!("✅ Edited NFT downloaded: {:?}", path),
            }
        }
        Err(err) => eprintln!("❌ Download failed: {}", err),
    }
}

fn mint_result(
    dashboard: &Dashboard,
    workflow: &CustomizeWorkflow<&WalletGateway, &EditClient>,
    edit: &EditClient,
    store: &ArtifactStore,
) {
    let Some(result) = workflow.result() else {
        println!("No edited image yet (`edit` first).");
        return;
    };
    let bytes = match decode_data_url(&result.image) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("❌ {}", err);
            return;
        }
    };

    match edit.mint_asset(bytes, &dashboard.brand) {
        Ok(receipt) => {
            match store.save_text_artifact("nft-info.txt", &receipt) {
                Ok(path) => println!("✅ Mint receipt saved: {:?}", path),
                Err(err) => eprintln!("❌ Could not save receipt: {}", err),
            }
            match store.persist(result) {
                Ok(key) => println!("✅ NFT Minted & Saved Locally! (key: {})", key),
                Err(err) => eprintln!("❌ Could not persist minted NFT: {}", err),
            }
        }
        Err(err) => eprintln!("❌ Mint failed: {}", err),
    }
}

fn recommend(assistant: &AssistantClient, dashboard: &Dashboard, arg: &str) {
    let brand = if arg.is_empty() {
        dashboard.brand.as_str()
    } else {
        arg
    };
    if brand.is_empty() {
        println!("Please enter a brand name to continue.");
        return;
    }
    match assistant.recommendations(brand) {
        Ok(recommendation) => {
            println!("▶ Suggested Collections for {}", brand);
            for collection in &recommendation.collections {
                println!("  - {}", collection);
            }
            if !recommendation.rationale.is_empty() {
                println!("  rationale: {}", recommendation.rationale);
            }
        }
        Err(err) => eprintln!("❌ Recommendation error: {}", err),
    }
}

fn send_chat(assistant: &AssistantClient, message: &str) {
    if message.is_empty() {
        println!("Usage: chat <message>");
        return;
    }
    match assistant.chat(message) {
        Ok(answer) => println!("assistant: {}", answer),
        Err(err) => eprintln!("❌ Chat error: {}", err),
    }
}
