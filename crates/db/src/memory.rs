//! In-memory [`EntityStore`] for tests and database-less runs.
//!
//! Rows are kept with an insertion sequence so list operations order the same
//! way the SQL queries do. Write counters let tests assert how many creates
//! and updates a pipeline operation issued.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sheetflow_core::types::{new_id, EntityId};
use tokio::sync::RwLock;

use crate::models::cad_file::CadFile;
use crate::models::processing_plan::ProcessingPlan;
use crate::models::project::Project;
use crate::models::task::{CompletionKey, Task};
use crate::models::tool::Tool;
use crate::store::{EntityStore, StoreError, StoreResult};

/// Write counters, by record kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryStoreStats {
    pub cad_file_creates: usize,
    pub cad_file_updates: usize,
    pub task_creates: usize,
    pub task_updates: usize,
    pub plan_creates: usize,
}

#[derive(Default)]
struct Tables {
    seq: u64,
    projects: HashMap<EntityId, (u64, Project)>,
    cad_files: HashMap<EntityId, (u64, CadFile)>,
    tasks: HashMap<EntityId, (u64, Task)>,
    plans: HashMap<EntityId, (u64, ProcessingPlan)>,
    tools: Vec<Tool>,
    completions: HashSet<CompletionKey>,
    stats: MemoryStoreStats,
}

impl Tables {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn replace_cad_file(&mut self, cad_file: &CadFile) -> StoreResult<CadFile> {
        let Some((_, row)) = self.cad_files.get_mut(&cad_file.id) else {
            return Err(StoreError::Missing {
                entity: "CADFile",
                id: cad_file.id,
            });
        };
        *row = CadFile {
            created_at: row.created_at,
            ..cad_file.clone()
        };
        let updated = row.clone();
        self.stats.cad_file_updates += 1;
        Ok(updated)
    }

    fn replace_task(&mut self, task: &Task) -> StoreResult<Task> {
        let Some((_, row)) = self.tasks.get_mut(&task.id) else {
            return Err(StoreError::Missing {
                entity: "Task",
                id: task.id,
            });
        };
        *row = Task {
            created_at: row.created_at,
            ..task.clone()
        };
        let updated = row.clone();
        self.stats.task_updates += 1;
        Ok(updated)
    }

    fn insert_plan(&mut self, plan: &ProcessingPlan) -> ProcessingPlan {
        let seq = self.next_seq();
        self.plans.insert(plan.id, (seq, plan.clone()));
        self.stats.plan_creates += 1;
        plan.clone()
    }
}

/// Sort `(seq, row)` pairs by sequence and strip the sequence.
fn ordered<T: Clone>(rows: impl Iterator<Item = (u64, T)>, newest_first: bool) -> Vec<T> {
    let mut rows: Vec<(u64, T)> = rows.collect();
    rows.sort_by_key(|(seq, _)| *seq);
    if newest_first {
        rows.reverse();
    }
    rows.into_iter().map(|(_, row)| row).collect()
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    unavailable: AtomicBool,
    interrupt_next_completion: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Make the next `apply_completion` fail with
    /// [`StoreError::Unavailable`] after its checks pass, before any write.
    pub fn interrupt_next_completion(&self) {
        self.interrupt_next_completion.store(true, Ordering::SeqCst);
    }

    /// Seed the tool table.
    pub async fn insert_tool(&self, tool_id: &str, angle: i64) -> Tool {
        let tool = Tool {
            id: new_id(),
            tool_id: tool_id.to_string(),
            name: format!("Tool {tool_id}"),
            angle,
            created_at: chrono::Utc::now(),
        };
        self.tables.write().await.tools.push(tool.clone());
        tool
    }

    pub async fn stats(&self) -> MemoryStoreStats {
        self.tables.read().await.stats
    }

    pub async fn cad_file_count(&self) -> usize {
        self.tables.read().await.cad_files.len()
    }

    pub async fn task_count(&self) -> usize {
        self.tables.read().await.tasks.len()
    }

    pub async fn plan_count(&self) -> usize {
        self.tables.read().await.plans.len()
    }

    fn check(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store switched off".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn create_project(&self, project: &Project) -> StoreResult<Project> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let seq = tables.next_seq();
        tables.projects.insert(project.id, (seq, project.clone()));
        Ok(project.clone())
    }

    async fn find_project(&self, id: EntityId) -> StoreResult<Option<Project>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.projects.get(&id).map(|(_, p)| p.clone()))
    }

    async fn list_projects(&self, owner_id: EntityId) -> StoreResult<Vec<Project>> {
        self.check()?;
        let tables = self.tables.read().await;
        let rows = tables
            .projects
            .values()
            .filter(|(_, p)| p.owner_id == owner_id)
            .map(|(seq, p)| (*seq, p.clone()));
        Ok(ordered(rows, true))
    }

    async fn project_title_exists(&self, owner_id: EntityId, title: &str) -> StoreResult<bool> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .values()
            .any(|(_, p)| p.owner_id == owner_id && p.title == title))
    }

    async fn delete_project(&self, id: EntityId) -> StoreResult<bool> {
        self.check()?;
        let mut tables = self.tables.write().await;
        Ok(tables.projects.remove(&id).is_some())
    }

    async fn create_cad_file(&self, cad_file: &CadFile) -> StoreResult<CadFile> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let seq = tables.next_seq();
        tables.cad_files.insert(cad_file.id, (seq, cad_file.clone()));
        tables.stats.cad_file_creates += 1;
        Ok(cad_file.clone())
    }

    async fn find_cad_file(&self, id: EntityId) -> StoreResult<Option<CadFile>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.cad_files.get(&id).map(|(_, c)| c.clone()))
    }

    async fn list_cad_files(&self, project_id: EntityId) -> StoreResult<Vec<CadFile>> {
        self.check()?;
        let tables = self.tables.read().await;
        let rows = tables
            .cad_files
            .values()
            .filter(|(_, c)| c.project_id == project_id)
            .map(|(seq, c)| (*seq, c.clone()));
        Ok(ordered(rows, false))
    }

    async fn update_cad_file(&self, cad_file: &CadFile) -> StoreResult<CadFile> {
        self.check()?;
        self.tables.write().await.replace_cad_file(cad_file)
    }

    async fn delete_cad_file(&self, id: EntityId) -> StoreResult<bool> {
        self.check()?;
        let mut tables = self.tables.write().await;
        Ok(tables.cad_files.remove(&id).is_some())
    }

    async fn create_task(&self, task: &Task) -> StoreResult<Task> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let seq = tables.next_seq();
        tables.tasks.insert(task.id, (seq, task.clone()));
        tables.stats.task_creates += 1;
        Ok(task.clone())
    }

    async fn find_task(&self, id: EntityId) -> StoreResult<Option<Task>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.tasks.get(&id).map(|(_, t)| t.clone()))
    }

    async fn list_tasks(&self) -> StoreResult<Vec<Task>> {
        self.check()?;
        let tables = self.tables.read().await;
        let rows = tables.tasks.values().map(|(seq, t)| (*seq, t.clone()));
        Ok(ordered(rows, true))
    }

    async fn update_task(&self, task: &Task) -> StoreResult<Task> {
        self.check()?;
        self.tables.write().await.replace_task(task)
    }

    async fn create_processing_plan(&self, plan: &ProcessingPlan) -> StoreResult<ProcessingPlan> {
        self.check()?;
        Ok(self.tables.write().await.insert_plan(plan))
    }

    async fn find_processing_plan(
        &self,
        cad_file_id: EntityId,
    ) -> StoreResult<Option<ProcessingPlan>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables
            .plans
            .values()
            .filter(|(_, p)| p.cad_file_id == cad_file_id)
            .max_by_key(|(seq, _)| *seq)
            .map(|(_, p)| p.clone()))
    }

    async fn delete_processing_plans(&self, cad_file_id: EntityId) -> StoreResult<u64> {
        self.check()?;
        let mut tables = self.tables.write().await;
        let before = tables.plans.len();
        tables.plans.retain(|_, (_, p)| p.cad_file_id != cad_file_id);
        Ok((before - tables.plans.len()) as u64)
    }

    async fn find_tool_by_angle(&self, angle: i64) -> StoreResult<Option<Tool>> {
        self.check()?;
        let tables = self.tables.read().await;
        Ok(tables.tools.iter().find(|t| t.angle == angle).cloned())
    }

    async fn completion_recorded(&self, key: &CompletionKey) -> StoreResult<bool> {
        self.check()?;
        Ok(self.tables.read().await.completions.contains(key))
    }

    async fn apply_completion(
        &self,
        key: &CompletionKey,
        cad_file: &CadFile,
        plan: Option<&ProcessingPlan>,
        task: &Task,
    ) -> StoreResult<Option<Task>> {
        self.check()?;
        let mut tables = self.tables.write().await;

        if tables.completions.contains(key) {
            return Ok(None);
        }
        if !tables.cad_files.contains_key(&cad_file.id) {
            return Err(StoreError::Missing {
                entity: "CADFile",
                id: cad_file.id,
            });
        }
        if !tables.tasks.contains_key(&task.id) {
            return Err(StoreError::Missing {
                entity: "Task",
                id: task.id,
            });
        }
        if self.interrupt_next_completion.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("completion write interrupted".into()));
        }

        tables.completions.insert(*key);
        if let Some(plan) = plan {
            tables.insert_plan(plan);
        }
        tables.replace_cad_file(cad_file)?;
        let task = tables.replace_task(task)?;
        Ok(Some(task))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use sheetflow_core::processing::ProcessType;

    #[tokio::test]
    async fn cad_files_list_in_upload_order() {
        let store = MemoryStore::new();
        let project = new_id();
        for name in ["a.stp", "b.stp", "c.stp"] {
            let cad = CadFile::new(new_id(), project, name.into(), "steel".into());
            store.create_cad_file(&cad).await.unwrap();
        }
        let other = CadFile::new(new_id(), new_id(), "z.stp".into(), "steel".into());
        store.create_cad_file(&other).await.unwrap();

        let names: Vec<String> = store
            .list_cad_files(project)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.file_name)
            .collect();
        assert_eq!(names, ["a.stp", "b.stp", "c.stp"]);
    }

    #[tokio::test]
    async fn update_of_missing_row_is_reported() {
        let store = MemoryStore::new();
        let task = Task::processing(new_id(), new_id());
        assert_matches!(
            store.update_task(&task).await,
            Err(StoreError::Missing { entity: "Task", .. })
        );
    }

    #[tokio::test]
    async fn latest_plan_wins() {
        let store = MemoryStore::new();
        let cad_file_id = new_id();
        let mut plan = ProcessingPlan {
            id: new_id(),
            cad_file_id,
            rotations: vec![],
            flips: vec![],
            tools: vec![],
            modules: vec![],
            bending_sequences: vec![],
            processing_time_ns: 1,
            estimated_manufacturing_time_ns: 1,
            total_tool_distance: 0.0,
            quantity: 1,
            created_at: chrono::Utc::now(),
        };
        store.create_processing_plan(&plan).await.unwrap();
        plan.id = new_id();
        plan.quantity = 7;
        store.create_processing_plan(&plan).await.unwrap();

        let found = store.find_processing_plan(cad_file_id).await.unwrap().unwrap();
        assert_eq!(found.quantity, 7);
        assert_eq!(store.delete_processing_plans(cad_file_id).await.unwrap(), 2);
    }

    async fn completion_fixture(store: &MemoryStore) -> (CompletionKey, CadFile, Task) {
        let cad = CadFile::new(new_id(), new_id(), "part.stp".into(), "steel".into());
        store.create_cad_file(&cad).await.unwrap();
        let task = Task::processing(new_id(), new_id());
        store.create_task(&task).await.unwrap();
        let key = CompletionKey {
            task_id: task.id,
            cad_file_id: cad.id,
            process_type: ProcessType::FeatureRecognition,
        };
        (key, cad, task)
    }

    #[tokio::test]
    async fn completion_is_applied_once() {
        let store = MemoryStore::new();
        let (key, mut cad, mut task) = completion_fixture(&store).await;
        cad.feature_props.bend_count = 3;
        task.completed = 1;

        assert!(!store.completion_recorded(&key).await.unwrap());
        let applied = store
            .apply_completion(&key, &cad, None, &task)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(applied.completed, 1);
        assert!(store.completion_recorded(&key).await.unwrap());

        let before = store.stats().await;
        assert!(store
            .apply_completion(&key, &cad, None, &task)
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.stats().await, before);
    }

    #[tokio::test]
    async fn completion_against_missing_task_writes_nothing() {
        let store = MemoryStore::new();
        let (key, cad, _) = completion_fixture(&store).await;
        let stranger = Task::processing(new_id(), new_id());
        let plan = ProcessingPlan {
            id: new_id(),
            cad_file_id: cad.id,
            rotations: vec![],
            flips: vec![],
            tools: vec![],
            modules: vec![],
            bending_sequences: vec![],
            processing_time_ns: 1,
            estimated_manufacturing_time_ns: 1,
            total_tool_distance: 0.0,
            quantity: 1,
            created_at: chrono::Utc::now(),
        };

        assert_matches!(
            store.apply_completion(&key, &cad, Some(&plan), &stranger).await,
            Err(StoreError::Missing { entity: "Task", .. })
        );
        assert_eq!(store.plan_count().await, 0);
        assert_eq!(store.stats().await.cad_file_updates, 0);
        assert!(!store.completion_recorded(&key).await.unwrap());
    }

    #[tokio::test]
    async fn interrupted_completion_leaves_no_trace() {
        let store = MemoryStore::new();
        let (key, cad, task) = completion_fixture(&store).await;
        store.interrupt_next_completion();

        assert_matches!(
            store.apply_completion(&key, &cad, None, &task).await,
            Err(StoreError::Unavailable(_))
        );
        assert!(!store.completion_recorded(&key).await.unwrap());
        assert_eq!(store.stats().await.task_updates, 0);

        assert!(store
            .apply_completion(&key, &cad, None, &task)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn deleting_a_project_reports_whether_it_existed() {
        let store = MemoryStore::new();
        let project = Project {
            id: new_id(),
            owner_id: new_id(),
            title: "Bracket".into(),
            description: "Brackets".into(),
            created_at: chrono::Utc::now(),
        };
        store.create_project(&project).await.unwrap();

        assert!(store.delete_project(project.id).await.unwrap());
        assert!(!store.delete_project(project.id).await.unwrap());
        assert!(store.find_project(project.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn switched_off_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        assert_matches!(store.list_tasks().await, Err(StoreError::Unavailable(_)));
        store.set_unavailable(false);
        assert!(store.list_tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn tool_lookup_matches_exact_angle() {
        let store = MemoryStore::new();
        store.insert_tool("T-90", 90).await;
        store.insert_tool("T-45", 45).await;

        let tool = store.find_tool_by_angle(45).await.unwrap().unwrap();
        assert_eq!(tool.tool_id, "T-45");
        assert!(store.find_tool_by_angle(30).await.unwrap().is_none());
    }
}
