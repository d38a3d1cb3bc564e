use anyhow::{Context, Result};
use nft_brand_studio::artifact::{KEY_NAMESPACE, decode_data_url};
use nft_brand_studio::config::Config;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

fn main() -> Result<()> {
    let cfg = Config::load("config.yaml").ok();

    let artifact_dir = cfg
        .as_ref()
        .map(|c| c.storage.artifact_dir.as_str())
        .unwrap_or("output/artifacts");
    let dir = Path::new(artifact_dir);

    if !dir.exists() {
        println!("(アーティファクトディレクトリ {:?} がまだありません)", dir);
        return Ok(());
    }

    let mut total = 0usize;
    let mut stats: HashMap<String, (usize, u64)> = HashMap::new();
    let mut foreign_keys = 0usize;
    let mut reference_entries = 0usize;
    let mut corrupt_count = 0usize;
    let mut corrupt_examples: Vec<(String, String)> = Vec::new();
    let max_examples = 20usize;

    for entry in WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.into_path();
        let key = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("<unknown>")
            .to_string();

        total += 1;

        // キーは <namespace>_<brand>_<epoch-ms>。外れたものは集計から除外する
        let Some(rest) = key.strip_prefix(&format!("{}_", KEY_NAMESPACE)) else {
            foreign_keys += 1;
            continue;
        };
        let brand = match rest.rsplit_once('_') {
            Some((brand, timestamp)) if timestamp.chars().all(|c| c.is_ascii_digit()) => brand,
            _ => {
                foreign_keys += 1;
                continue;
            }
        };

        let value = fs::read_to_string(&path)
            .with_context(|| format!("アーティファクトが読めません: {:?}", path))?;

        let size = value.len() as u64;
        let slot = stats.entry(brand.to_string()).or_insert((0, 0));
        slot.0 += 1;
        slot.1 += size;

        if !value.starts_with("data:") {
            // metadata 経由の完成済み参照はそのままの URL で保存される
            reference_entries += 1;
            continue;
        }

        let broken = match decode_data_url(&value) {
            Ok(bytes) => image::load_from_memory(&bytes).is_err(),
            Err(_) => true,
        };
        if broken {
            corrupt_count += 1;
            if corrupt_examples.len() < max_examples {
                corrupt_examples.push((key, "data URL を画像として復号できません".to_string()));
            }
        }
    }

    println!("==============================");
    println!(" Artifact Store Check");
    println!(" Total entries: {}", total);
    println!("==============================\n");

    let mut sorted: Vec<_> = stats.into_iter().collect();
    sorted.sort_by(|a, b| b.1.0.cmp(&a.1.0));

    for (brand, (count, bytes)) in sorted {
        println!("▶ Brand: {}", brand);
        println!("  {:5} entries, {:10} bytes", count, bytes);
    }
    println!();

    if reference_entries > 0 {
        println!("(参照のみのエントリ: {} 件)", reference_entries);
    }
    if foreign_keys > 0 {
        println!("(キー形式が異なるファイル: {} 件)", foreign_keys);
    }

    println!("==============================");
    println!(" Integrity Check");
    println!(" Corrupt entries: {}", corrupt_count);
    println!("==============================");

    if corrupt_count == 0 {
        println!("✅ 壊れたアーティファクトは見つかりませんでした");
    } else {
        println!("❌ 壊れたアーティファクトが見つかりました（最大 {} 件表示）:", max_examples);
        for (key, msg) in &corrupt_examples {
            println!("  - {} : {}", key, msg);
        }
    }

    if corrupt_count > 0 {
        std::process::exit(1);
    }

    Ok(())
}
