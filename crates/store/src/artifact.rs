use crate::layout::DataLayout;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use yosoku_core::store::error::StoreError;

/// # Summary
/// 带训练批次标识的持久化产物。
///
/// # Invariants
/// - 同一次训练产出的模型与标准化器拥有相同的 `run_id`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact<T> {
    pub run_id: String,
    pub created_at: DateTime<Utc>,
    pub payload: T,
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".tmp-{}", std::process::id()));
    PathBuf::from(name)
}

/// # Summary
/// 原子发布：先写同目录临时文件并落盘，再重命名覆盖目标文件。
///
/// # Logic
/// 1. 确保父目录存在。
/// 2. 写入临时文件并 `sync_all`。
/// 3. `rename` 到目标路径；失败时清理临时文件。
///
/// # Arguments
/// * `path`: 目标文件路径。
/// * `write`: 向临时文件写入内容的回调。
pub fn publish_atomic<F>(path: &Path, write: F) -> Result<(), StoreError>
where
    F: FnOnce(&mut std::fs::File) -> Result<(), StoreError>,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| StoreError::Io(format!("{}: {}", parent.display(), e)))?;
    }
    let tmp = temp_sibling(path);
    let result = (|| {
        let mut file = std::fs::File::create(&tmp)
            .map_err(|e| StoreError::Io(format!("{}: {}", tmp.display(), e)))?;
        write(&mut file)?;
        file.flush().map_err(|e| StoreError::Io(e.to_string()))?;
        file.sync_all().map_err(|e| StoreError::Io(e.to_string()))?;
        std::fs::rename(&tmp, path)
            .map_err(|e| StoreError::Io(format!("{}: {}", path.display(), e)))
    })();
    if result.is_err() && std::fs::remove_file(&tmp).is_err() {
        debug!("Temp file {} already removed", tmp.display());
    }
    result
}

/// 序列化并原子写出单个产物
pub fn save_artifact<T: Serialize>(path: &Path, artifact: &Artifact<T>) -> Result<(), StoreError> {
    let bytes = bincode::serialize(artifact).map_err(|e| StoreError::Serialize(e.to_string()))?;
    publish_atomic(path, |file| {
        file.write_all(&bytes)
            .map_err(|e| StoreError::Io(e.to_string()))
    })
}

/// # Summary
/// 读取单个产物。
///
/// # Returns
/// 文件不存在返回 `StoreError::NotFound`，内容损坏返回 `StoreError::Deserialize`。
pub fn load_artifact<T: DeserializeOwned>(path: &Path) -> Result<Artifact<T>, StoreError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound(path.display().to_string()));
        }
        Err(e) => return Err(StoreError::Io(format!("{}: {}", path.display(), e))),
    };
    bincode::deserialize(&bytes).map_err(|e| StoreError::Deserialize(e.to_string()))
}

/// # Summary
/// 模型与标准化器的成对存储。
///
/// # Invariants
/// - 写入时两者共享同一 `run_id`；读取时 `run_id` 不一致即拒绝。
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    layout: DataLayout,
}

impl ArtifactStore {
    pub fn new(layout: DataLayout) -> Self {
        Self { layout }
    }

    /// # Summary
    /// 发布一对新的模型与标准化器。
    ///
    /// # Logic
    /// 1. 先发布标准化器，再发布模型，两者各自原子替换。
    /// 2. 两个文件之间的短暂不一致由读取端的 `run_id` 校验拦截。
    pub fn save_pair<M: Serialize, S: Serialize>(
        &self,
        run_id: &str,
        model: &M,
        scaler: &S,
    ) -> Result<(), StoreError> {
        let created_at = Utc::now();
        save_artifact(
            &self.layout.scaler_path(),
            &Artifact {
                run_id: run_id.to_string(),
                created_at,
                payload: scaler,
            },
        )?;
        save_artifact(
            &self.layout.model_path(),
            &Artifact {
                run_id: run_id.to_string(),
                created_at,
                payload: model,
            },
        )?;
        info!(
            "Published model {} and scaler {} (run {})",
            self.layout.model_path().display(),
            self.layout.scaler_path().display(),
            run_id
        );
        Ok(())
    }

    /// # Summary
    /// 读取成对的模型与标准化器。
    ///
    /// # Returns
    /// 任一文件缺失返回 NotFound，`run_id` 不一致返回 PairMismatch。
    pub fn load_pair<M: DeserializeOwned, S: DeserializeOwned>(
        &self,
    ) -> Result<(Artifact<M>, Artifact<S>), StoreError> {
        let model: Artifact<M> = load_artifact(&self.layout.model_path())?;
        let scaler: Artifact<S> = load_artifact(&self.layout.scaler_path())?;
        if model.run_id != scaler.run_id {
            return Err(StoreError::PairMismatch {
                model_run: model.run_id,
                scaler_run: scaler.run_id,
            });
        }
        Ok((model, scaler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/value.bin");
        let artifact = Artifact {
            run_id: "r1".to_string(),
            created_at: Utc::now(),
            payload: vec![1.5f64, -2.0],
        };
        save_artifact(&path, &artifact).unwrap();

        let entries: Vec<_> = std::fs::read_dir(path.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("value.bin")]);

        let loaded: Artifact<Vec<f64>> = load_artifact(&path).unwrap();
        assert_eq!(loaded, artifact);
    }

    #[test]
    fn test_failed_write_keeps_previous_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("value.bin");
        std::fs::write(&path, b"old").unwrap();

        let result = publish_atomic(&path, |_| Err(StoreError::Serialize("boom".into())));
        assert!(result.is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"old");
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_and_corrupt_artifacts() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing.bin");
        let err = load_artifact::<f64>(&path).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        std::fs::write(&path, b"\x01").unwrap();
        let err = load_artifact::<Vec<f64>>(&path).unwrap_err();
        assert!(matches!(err, StoreError::Deserialize(_)));
    }
}
