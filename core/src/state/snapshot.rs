//! 检查点快照的文件存储
//!
//! 布局：`<dir>/<session_id>/<run_id>.json`，先写临时文件再原子重命名。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::checkpoint::CheckpointStore;
use super::run_state::RunState;

const SNAPSHOT_VERSION: &str = "1";

/// 持久化的检查点文件内容
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// 快照版本
    pub version: String,
    /// 写入时间
    pub saved_at: DateTime<Utc>,
    pub state: RunState,
}

impl RunSnapshot {
    pub fn new(state: RunState) -> Self {
        Self {
            version: SNAPSHOT_VERSION.to_string(),
            saved_at: Utc::now(),
            state,
        }
    }

    /// 序列化为 JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize checkpoint")
    }

    /// 从 JSON 反序列化
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self =
            serde_json::from_str(json).context("Failed to deserialize checkpoint")?;
        if snapshot.version != SNAPSHOT_VERSION {
            bail!(
                "Unsupported checkpoint version {} (expected {})",
                snapshot.version,
                SNAPSHOT_VERSION
            );
        }
        Ok(snapshot)
    }

    /// 原子写入文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = self.to_json()?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write checkpoint to {:?}", tmp))?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to move checkpoint into place at {:?}", path))
    }

    /// 从文件加载
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read checkpoint from {:?}", path.as_ref()))?;
        Self::from_json(&json)
    }
}

/// 检查点文件摘要（用于列出）
#[derive(Debug, Clone, Serialize)]
pub struct CheckpointInfo {
    pub session_id: String,
    pub run_id: String,
    pub path: PathBuf,
    pub saved_at: DateTime<Utc>,
    pub status: super::types::RunStatus,
    pub completed: usize,
    pub total: usize,
}

/// 基于文件的检查点存储
///
/// 同一实例（及其克隆）的写入串行执行，后台并发保存不会争用同一个临时文件。
#[derive(Debug, Clone)]
pub struct FileCheckpointStore {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FileCheckpointStore {
    /// 创建存储，目录不存在时自动创建
    pub fn new<P: Into<PathBuf>>(root: P) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            fs::create_dir_all(&root)
                .with_context(|| format!("Failed to create checkpoint directory: {:?}", root))?;
        }
        Ok(Self {
            root,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, run_id: &str, session_id: &str) -> Result<PathBuf> {
        validate_key("run_id", run_id)?;
        validate_key("session_id", session_id)?;
        Ok(self.root.join(session_id).join(format!("{run_id}.json")))
    }

    fn write_blocking(&self, run_id: &str, session_id: &str, state: RunState) -> Result<()> {
        let path = self.path_for(run_id, session_id)?;
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create session directory: {:?}", parent))?;
        }
        RunSnapshot::new(state).save_to_file(&path)
    }

    fn read_blocking(&self, run_id: &str, session_id: &str) -> Result<Option<RunState>> {
        let path = self.path_for(run_id, session_id)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(RunSnapshot::load_from_file(&path)?.state))
    }

    /// 列出检查点（按写入时间倒序）；`session_id` 为 None 时列出全部会话
    pub fn list_runs(&self, session_id: Option<&str>) -> Result<Vec<CheckpointInfo>> {
        let mut sessions = Vec::new();
        match session_id {
            Some(session) => {
                validate_key("session_id", session)?;
                sessions.push(self.root.join(session));
            }
            None => {
                for entry in fs::read_dir(&self.root)? {
                    let path = entry?.path();
                    if path.is_dir() {
                        sessions.push(path);
                    }
                }
            }
        }

        let mut infos = Vec::new();
        for dir in sessions {
            if !dir.is_dir() {
                continue;
            }
            for entry in fs::read_dir(&dir)? {
                let path = entry?.path();
                if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("json") {
                    continue;
                }
                match RunSnapshot::load_from_file(&path) {
                    Ok(snapshot) => infos.push(CheckpointInfo {
                        session_id: snapshot.state.session_id.clone(),
                        run_id: snapshot.state.run_id.clone(),
                        saved_at: snapshot.saved_at,
                        status: snapshot.state.status,
                        completed: snapshot.state.counts.completed,
                        total: snapshot.state.counts.total,
                        path,
                    }),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "unreadable checkpoint skipped");
                    }
                }
            }
        }

        infos.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(infos)
    }

    /// 删除单个检查点，返回是否存在
    pub fn remove(&self, run_id: &str, session_id: &str) -> Result<bool> {
        let path = self.path_for(run_id, session_id)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path)
            .with_context(|| format!("Failed to remove checkpoint: {:?}", path))?;
        Ok(true)
    }

    /// 删除会话下所有检查点，返回删除数量
    pub fn clear_session(&self, session_id: &str) -> Result<usize> {
        let infos = self.list_runs(Some(session_id))?;
        let count = infos.len();
        for info in infos {
            fs::remove_file(&info.path)
                .with_context(|| format!("Failed to remove checkpoint: {:?}", info.path))?;
        }
        Ok(count)
    }
}

/// 拒绝可能逃逸存储目录的 key
fn validate_key(what: &str, key: &str) -> Result<()> {
    if key.is_empty()
        || key == "."
        || key == ".."
        || key.contains(['/', '\\'])
        || key.contains('\0')
    {
        bail!("invalid {what} for checkpoint path: {key:?}");
    }
    Ok(())
}

#[async_trait]
impl CheckpointStore for FileCheckpointStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn save(&self, run_id: &str, session_id: &str, snapshot: &RunState) -> Result<()> {
        let store = self.clone();
        let run_id = run_id.to_string();
        let session_id = session_id.to_string();
        let state = snapshot.clone();
        tokio::task::spawn_blocking(move || store.write_blocking(&run_id, &session_id, state))
            .await
            .context("checkpoint writer task failed")?
    }

    async fn load(&self, run_id: &str, session_id: &str) -> Result<Option<RunState>> {
        let store = self.clone();
        let run_id = run_id.to_string();
        let session_id = session_id.to_string();
        tokio::task::spawn_blocking(move || store.read_blocking(&run_id, &session_id))
            .await
            .context("checkpoint reader task failed")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::NodeStatus;
    use tempfile::TempDir;

    fn sample_state(run_id: &str, session_id: &str) -> RunState {
        let mut state = RunState::new(run_id, session_id);
        state.register(["a", "b"]);
        state.transition("a", NodeStatus::Running).unwrap();
        state.transition("a", NodeStatus::Completed).unwrap();
        state
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(temp_dir.path()).unwrap();
        let state = sample_state("run-1", "s1");

        store.save("run-1", "s1", &state).await.unwrap();
        let path = store.path_for("run-1", "s1").unwrap();
        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());

        let loaded = store.load("run-1", "s1").await.unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[tokio::test]
    async fn test_missing_checkpoint_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(temp_dir.path()).unwrap();
        assert!(store.load("nope", "s1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_remove_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(temp_dir.path()).unwrap();

        store.save("r1", "s1", &sample_state("r1", "s1")).await.unwrap();
        store.save("r2", "s1", &sample_state("r2", "s1")).await.unwrap();
        store.save("r3", "s2", &sample_state("r3", "s2")).await.unwrap();

        assert_eq!(store.list_runs(Some("s1")).unwrap().len(), 2);
        assert_eq!(store.list_runs(None).unwrap().len(), 3);

        let info = &store.list_runs(Some("s2")).unwrap()[0];
        assert_eq!(info.run_id, "r3");
        assert_eq!(info.completed, 1);
        assert_eq!(info.total, 2);

        assert!(store.remove("r3", "s2").unwrap());
        assert!(!store.remove("r3", "s2").unwrap());

        assert_eq!(store.clear_session("s1").unwrap(), 2);
        assert!(store.list_runs(None).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_path_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileCheckpointStore::new(temp_dir.path()).unwrap();
        assert!(store.path_for("../evil", "s1").is_err());
        assert!(store.path_for("ok", "..").is_err());
        assert!(store.path_for("", "s1").is_err());
    }

    #[test]
    fn test_rejects_unknown_version() {
        let mut snapshot = RunSnapshot::new(RunState::new("r", "s"));
        snapshot.version = "99".into();
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(RunSnapshot::from_json(&json).is_err());
    }
}
