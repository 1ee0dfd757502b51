//! Hugging Face downloads into the local models directory

use crate::error::{Result, ResumeParserError};
use hf_hub::api::tokio::{Api, ApiRepo};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;

const METADATA_FILES: [&str; 3] = ["config.json", "tokenizer_config.json", "generation_config.json"];

/// Tokenizer locations tried in order; some NER repos only ship the ONNX export's copy
const TOKENIZER_CANDIDATES: [&str; 2] = ["tokenizer.json", "onnx/tokenizer.json"];

const WEIGHT_INDEX: &str = "model.safetensors.index.json";
const SAFETENSORS: &str = "model.safetensors";
const PYTORCH_WEIGHTS: &str = "pytorch_model.bin";

pub struct ModelManager {
    models_dir: PathBuf,
}

impl ModelManager {
    pub async fn new(models_dir: PathBuf) -> Result<Self> {
        if !models_dir.exists() {
            fs::create_dir_all(&models_dir).await.map_err(|e| {
                ResumeParserError::ModelLoading(format!("Failed to create models directory: {}", e))
            })?;
        }
        Ok(Self { models_dir })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Directory a repository id is stored under (`org/name` becomes `org--name`)
    pub fn model_path(&self, repo_id: &str) -> PathBuf {
        self.models_dir.join(repo_id.replace('/', "--"))
    }

    pub async fn is_downloaded(&self, repo_id: &str) -> bool {
        is_valid_model_directory(&self.model_path(repo_id)).await
    }

    /// Local directory for a model reference.
    ///
    /// A reference that is itself an existing directory is used as-is; otherwise the
    /// repository must already be downloaded.
    pub async fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let direct = PathBuf::from(reference);
        if direct.is_dir() {
            return Some(direct);
        }
        let stored = self.model_path(reference);
        if is_valid_model_directory(&stored).await {
            Some(stored)
        } else {
            None
        }
    }

    /// Resolve locally, downloading when missing
    pub async fn ensure(&self, reference: &str) -> Result<PathBuf> {
        match self.resolve(reference).await {
            Some(path) => Ok(path),
            None => self.download(reference).await,
        }
    }

    pub async fn download(&self, repo_id: &str) -> Result<PathBuf> {
        let model_dir = self.model_path(repo_id);
        if is_valid_model_directory(&model_dir).await {
            log::info!("{} already present at {}", repo_id, model_dir.display());
            return Ok(model_dir);
        }

        log::info!("Downloading {} into {}", repo_id, model_dir.display());
        fs::create_dir_all(&model_dir).await.map_err(|e| {
            ResumeParserError::ModelLoading(format!("Failed to create model directory: {}", e))
        })?;

        let api = Api::new()
            .map_err(|e| ResumeParserError::ModelLoading(format!("Failed to initialize HF API: {}", e)))?;
        let repo = api.repo(hf_hub::Repo::model(repo_id.to_string()));

        for file in METADATA_FILES {
            if fetch(&repo, file, &model_dir.join(file)).await.is_ok() {
                log::debug!("Downloaded {}", file);
            }
        }

        let mut tokenizer_found = false;
        for candidate in TOKENIZER_CANDIDATES {
            if fetch(&repo, candidate, &model_dir.join("tokenizer.json")).await.is_ok() {
                log::debug!("Downloaded tokenizer from {}", candidate);
                tokenizer_found = true;
                break;
            }
        }
        if !tokenizer_found {
            return Err(ResumeParserError::ModelLoading(format!(
                "{} has no tokenizer.json",
                repo_id
            )));
        }

        self.download_weights(&repo, &model_dir).await?;

        log::info!("{} ready", repo_id);
        Ok(model_dir)
    }

    /// Sharded safetensors first, then a single safetensors file, then PyTorch weights
    async fn download_weights(&self, repo: &ApiRepo, model_dir: &Path) -> Result<()> {
        if let Ok(()) = fetch(repo, WEIGHT_INDEX, &model_dir.join(WEIGHT_INDEX)).await {
            let index = fs::read_to_string(model_dir.join(WEIGHT_INDEX)).await?;
            for shard in shard_files(&index)? {
                fetch(repo, &shard, &model_dir.join(&shard)).await?;
                log::debug!("Downloaded shard {}", shard);
            }
            return Ok(());
        }

        if fetch(repo, SAFETENSORS, &model_dir.join(SAFETENSORS)).await.is_ok() {
            return Ok(());
        }

        fetch(repo, PYTORCH_WEIGHTS, &model_dir.join(PYTORCH_WEIGHTS))
            .await
            .map_err(|_| ResumeParserError::ModelLoading("No model weights found in repository".to_string()))
    }

    /// Repository ids with a complete local copy, sorted
    pub async fn list_downloaded(&self) -> Result<Vec<String>> {
        let mut found = BTreeSet::new();
        let mut entries = fs::read_dir(&self.models_dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() && is_valid_model_directory(&entry.path()).await {
                let name = entry.file_name().to_string_lossy().replacen("--", "/", 1);
                found.insert(name);
            }
        }

        Ok(found.into_iter().collect())
    }
}

async fn fetch(repo: &ApiRepo, file: &str, dest: &Path) -> Result<()> {
    let cached = repo
        .get(file)
        .await
        .map_err(|e| ResumeParserError::ModelLoading(format!("Failed to download {}: {}", file, e)))?;
    fs::copy(&cached, dest)
        .await
        .map_err(|e| ResumeParserError::ModelLoading(format!("Failed to copy {}: {}", file, e)))?;
    Ok(())
}

/// Unique shard filenames named by a safetensors index
pub fn shard_files(index_json: &str) -> Result<Vec<String>> {
    let index: serde_json::Value = serde_json::from_str(index_json)?;
    let weight_map = index
        .get("weight_map")
        .and_then(|v| v.as_object())
        .ok_or_else(|| ResumeParserError::ModelLoading("safetensors index has no weight_map".to_string()))?;

    let shards: BTreeSet<String> = weight_map
        .values()
        .filter_map(|v| v.as_str())
        .map(str::to_string)
        .collect();
    Ok(shards.into_iter().collect())
}

/// A config, a tokenizer and at least one weight file
pub async fn is_valid_model_directory(path: &Path) -> bool {
    for required in ["config.json", "tokenizer.json"] {
        if fs::metadata(path.join(required)).await.is_err() {
            return false;
        }
    }

    let Ok(mut entries) = fs::read_dir(path).await else {
        return false;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.ends_with(".safetensors") || name.ends_with(".bin") {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn fake_model(dir: &Path) {
        fs::create_dir_all(dir).await.unwrap();
        fs::write(dir.join("config.json"), "{}").await.unwrap();
        fs::write(dir.join("tokenizer.json"), "{}").await.unwrap();
        fs::write(dir.join("model.safetensors"), b"").await.unwrap();
    }

    #[tokio::test]
    async fn test_downloaded_models_are_listed_by_repo_id() {
        let temp = TempDir::new().unwrap();
        let manager = ModelManager::new(temp.path().join("models")).await.unwrap();

        fake_model(&manager.model_path("dslim/bert-base-NER")).await;
        fs::create_dir_all(manager.model_path("org/partial")).await.unwrap();

        assert!(manager.is_downloaded("dslim/bert-base-NER").await);
        assert!(!manager.is_downloaded("org/partial").await);
        assert_eq!(manager.list_downloaded().await.unwrap(), vec!["dslim/bert-base-NER"]);
    }

    #[tokio::test]
    async fn test_resolve_prefers_existing_directories() {
        let temp = TempDir::new().unwrap();
        let manager = ModelManager::new(temp.path().join("models")).await.unwrap();
        let local = temp.path().join("my-model");
        fs::create_dir_all(&local).await.unwrap();

        let reference = local.to_string_lossy().to_string();
        assert_eq!(manager.resolve(&reference).await, Some(local));
        assert_eq!(manager.resolve("minishlab/potion-base-8M").await, None);
    }

    #[test]
    fn test_shard_files_are_unique() {
        let index = r#"{"weight_map": {"a": "model-00001.safetensors", "b": "model-00002.safetensors", "c": "model-00001.safetensors"}}"#;
        assert_eq!(
            shard_files(index).unwrap(),
            vec!["model-00001.safetensors", "model-00002.safetensors"]
        );
        assert!(shard_files("{}").is_err());
    }
}
