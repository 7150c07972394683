//! 检查点存储接口

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use super::run_state::RunState;

/// 按 (session_id, run_id) 持久化/恢复运行状态
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    fn name(&self) -> &str;

    async fn save(&self, run_id: &str, session_id: &str, snapshot: &RunState) -> Result<()>;

    async fn load(&self, run_id: &str, session_id: &str) -> Result<Option<RunState>>;
}

/// 内存检查点存储（测试与嵌入场景）
#[derive(Clone, Default)]
pub struct InMemoryCheckpointStore {
    inner: Arc<Mutex<HashMap<(String, String), RunState>>>,
    saves: Arc<AtomicUsize>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已执行的 save 次数
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn get(&self, run_id: &str, session_id: &str) -> Option<RunState> {
        let map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.get(&(session_id.to_string(), run_id.to_string())).cloned()
    }

    /// 直接写入一个状态（模拟上一次运行留下的检查点）
    pub fn insert(&self, snapshot: RunState) {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(
            (snapshot.session_id.clone(), snapshot.run_id.clone()),
            snapshot,
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn save(&self, run_id: &str, session_id: &str, snapshot: &RunState) -> Result<()> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.insert(
            (session_id.to_string(), run_id.to_string()),
            snapshot.clone(),
        );
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn load(&self, run_id: &str, session_id: &str) -> Result<Option<RunState>> {
        Ok(self.get(run_id, session_id))
    }
}
