use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::entity::import_job::ImportJob;
use crate::domain::repository::ImportJobStore;

/// InMemoryImportJobStore はプロセス内マップによるジョブストア。再起動で消える。
pub struct InMemoryImportJobStore {
    jobs: RwLock<HashMap<String, ImportJob>>,
}

impl InMemoryImportJobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}

impl Default for InMemoryImportJobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImportJobStore for InMemoryImportJobStore {
    async fn get(&self, id: &str) -> anyhow::Result<Option<ImportJob>> {
        let jobs = self.jobs.read().await;
        Ok(jobs.get(id).cloned())
    }

    async fn insert(&self, job: &ImportJob) -> anyhow::Result<()> {
        let mut jobs = self.jobs.write().await;
        jobs.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn replace(&self, job: &ImportJob) -> anyhow::Result<bool> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&job.id) {
            Some(existing) => {
                *existing = job.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn remove(&self, id: &str) -> anyhow::Result<bool> {
        let mut jobs = self.jobs.write().await;
        Ok(jobs.remove(id).is_some())
    }
}
