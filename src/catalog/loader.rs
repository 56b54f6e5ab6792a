use std::path::Path;

use serde::Deserialize;
use sqlx::PgPool;

use crate::db::{protocol_queries, token_queries, treasury_queries};
use crate::errors::AppError;
use crate::models::HackEvent;

#[derive(Debug, Deserialize)]
struct ProtocolFile {
    rating: String,
    treasury: Vec<String>,
    addresses: Vec<String>,
    #[serde(default)]
    hacks: Vec<HackEvent>,
}

#[derive(Debug, Deserialize)]
struct TokenFile {
    protocol: String,
    symbol: String,
    itin: String,
    decimals: i32,
    #[serde(default)]
    itc_eep: Option<String>,
    #[serde(default)]
    underlying: Option<String>,
}

fn stem(path: &Path) -> Result<String, AppError> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| AppError::Catalog(format!("unreadable file name: {}", path.display())))
}

fn json_files(dir: &Path) -> Result<Vec<std::path::PathBuf>, AppError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)
        .map_err(|e| AppError::Catalog(format!("reading {}: {e}", dir.display())))?
    {
        let entry = entry.map_err(|e| AppError::Catalog(e.to_string()))?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("json") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

/// Upsert every `data/protocols/<protocol_id>.json` descriptor: one
/// Protocol row (rating, combined lowercased addresses, hacks) and one
/// Treasury row per treasury address (spec §4.3, §7).
pub async fn load_protocols(pool: &PgPool, catalog_dir: &Path) -> Result<usize, AppError> {
    let dir = catalog_dir.join("protocols");
    let files = json_files(&dir)?;
    let mut loaded = 0;

    for path in files {
        let id = stem(&path)?;
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| AppError::Catalog(format!("reading {}: {e}", path.display())))?;
        let file: ProtocolFile = serde_json::from_str(&raw)
            .map_err(|e| AppError::Catalog(format!("parsing {}: {e}", path.display())))?;

        let mut addresses: Vec<String> = file
            .addresses
            .iter()
            .chain(file.treasury.iter())
            .map(|a| a.to_lowercase())
            .collect();
        addresses.sort();
        addresses.dedup();

        let hacks_json = serde_json::to_value(&file.hacks)
            .map_err(|e| AppError::Catalog(format!("serialising hacks for {id}: {e}")))?;

        protocol_queries::upsert(pool, &id, &file.rating, &addresses, &hacks_json).await?;

        for treasury_addr in &file.treasury {
            treasury_queries::upsert(pool, &treasury_addr.to_lowercase(), &id).await?;
        }

        loaded += 1;
    }

    Ok(loaded)
}

/// Upsert every `data/tokens/<token_address>.json` descriptor. Per spec
/// §7's catalog-integrity rule, a token file that names an unknown
/// protocol is a hard error, not a skip.
pub async fn load_tokens(pool: &PgPool, catalog_dir: &Path) -> Result<usize, AppError> {
    let dir = catalog_dir.join("tokens");
    let files = json_files(&dir)?;
    let mut loaded = 0;

    for path in files {
        let address = stem(&path)?.to_lowercase();
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| AppError::Catalog(format!("reading {}: {e}", path.display())))?;
        let file: TokenFile = serde_json::from_str(&raw)
            .map_err(|e| AppError::Catalog(format!("parsing {}: {e}", path.display())))?;

        if protocol_queries::fetch_by_id(pool, &file.protocol).await?.is_none() {
            return Err(AppError::Catalog(format!(
                "token {address} references unknown protocol {}",
                file.protocol
            )));
        }

        let underlying = file.underlying.as_deref().map(str::to_lowercase);
        token_queries::upsert(
            pool,
            &address,
            &file.protocol,
            &file.symbol,
            &file.itin,
            file.decimals,
            file.itc_eep.as_deref(),
            underlying.as_deref(),
        )
        .await?;

        loaded += 1;
    }

    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_extracts_file_name_without_extension() {
        let path = Path::new("/tmp/catalog/protocols/aave.json");
        assert_eq!(stem(path).unwrap(), "aave");
    }
}
