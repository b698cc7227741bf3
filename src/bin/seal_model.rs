//! Model sealing utility for MediPredict risk models.
//!
//! Writes `manifest.json` next to `model.json`, binding the model to its
//! SHA-256 digest so it can be verified when the assessment service loads it.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin seal_model -- <model_dir>
//! ```

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use medipredict::adapters::forest::{
    sha256_hex, ExportedForest, ForestModel, ModelManifest, MANIFEST_FILE, MODEL_FILE,
};

fn usage() -> String {
    "Usage: seal_model <model_dir>".to_string()
}

fn parse_args() -> Result<PathBuf, String> {
    let mut model_dir: Option<PathBuf> = None;
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage()),
            _ if model_dir.is_none() => model_dir = Some(PathBuf::from(arg)),
            _ => return Err(usage()),
        }
    }
    model_dir.ok_or_else(usage)
}

fn main() -> Result<(), String> {
    let model_dir = parse_args()?;

    let model_dir = if model_dir.is_file() {
        model_dir
            .parent()
            .ok_or_else(|| "Model path has no parent directory".to_string())?
            .to_path_buf()
    } else {
        model_dir
    };

    let model_path = model_dir.join(MODEL_FILE);
    let bytes = fs::read(&model_path).map_err(|e| format!("Failed to read {model_path:?}: {e}"))?;
    let digest = sha256_hex(&bytes);

    // Refuse to seal an artifact the service would reject anyway.
    let forest: ExportedForest = serde_json::from_slice(&bytes)
        .map_err(|e| format!("{model_path:?} is not a valid model export: {e}"))?;
    ForestModel::from_export(forest, digest.clone()).map_err(|e| e.to_string())?;

    let manifest = ModelManifest {
        version: 1,
        files: BTreeMap::from([(MODEL_FILE.to_string(), digest.clone())]),
    };
    let manifest_bytes = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| format!("Failed to serialize {MANIFEST_FILE}: {e}"))?;

    let manifest_path = model_dir.join(MANIFEST_FILE);
    fs::write(&manifest_path, &manifest_bytes)
        .map_err(|e| format!("Failed to write {manifest_path:?}: {e}"))?;

    println!("Sealed manifest: {manifest_path:?}");
    println!("{MODEL_FILE} sha256={digest}");
    Ok(())
}
