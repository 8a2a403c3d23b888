use std::sync::Mutex;

use async_trait::async_trait;
use shared::{CreateTaskRequest, Task, UpdateTaskRequest};

use super::{new_task, not_found, parse_id, sort_newest_first, TaskStore};
use crate::error::StoreError;

/// Process-local store kept in insertion order.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: Mutex<Vec<Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<Task>>, StoreError> {
        self.tasks
            .lock()
            .map_err(|_| StoreError::Unavailable("task list lock poisoned".to_string()))
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn list_all(&self) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self.lock()?.iter().rev().cloned().collect();
        sort_newest_first(&mut tasks);
        Ok(tasks)
    }

    async fn find_by_id(&self, id: &str) -> Result<Task, StoreError> {
        let id = parse_id(id)?;
        self.lock()?
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn create(&self, fields: CreateTaskRequest) -> Result<Task, StoreError> {
        let task = new_task(fields)?;
        self.lock()?.push(task.clone());
        Ok(task)
    }

    async fn update_by_id(&self, id: &str, patch: UpdateTaskRequest) -> Result<Task, StoreError> {
        let id = parse_id(id)?;
        let mut tasks = self.lock()?;
        let task = tasks.iter_mut().find(|t| t.id == id).ok_or_else(not_found)?;
        task.apply(patch).map_err(StoreError::Validation)?;
        Ok(task.clone())
    }

    async fn delete_by_id(&self, id: &str) -> Result<Task, StoreError> {
        let id = parse_id(id)?;
        let mut tasks = self.lock()?;
        let index = tasks.iter().position(|t| t.id == id).ok_or_else(not_found)?;
        Ok(tasks.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_req(title: &str) -> CreateTaskRequest {
        CreateTaskRequest {
            title: Some(title.to_string()),
            completed: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_defaults() {
        let store = InMemoryTaskStore::new();
        let task = store.create(create_req("Buy milk")).await.unwrap();

        assert_eq!(task.title, "Buy milk");
        assert!(!task.completed);
        assert_eq!(store.find_by_id(&task.id.to_string()).await.unwrap(), task);
    }

    #[tokio::test]
    async fn create_honours_completed_flag() {
        let store = InMemoryTaskStore::new();
        let task = store
            .create(CreateTaskRequest {
                title: Some("Done already".into()),
                completed: Some(true),
            })
            .await
            .unwrap();

        assert!(task.completed);
    }

    #[tokio::test]
    async fn create_without_title_is_rejected() {
        let store = InMemoryTaskStore::new();

        let missing = store.create(CreateTaskRequest::default()).await;
        let blank = store.create(create_req("  ")).await;

        assert!(matches!(missing, Err(StoreError::Validation(_))));
        assert!(matches!(blank, Err(StoreError::Validation(_))));
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = InMemoryTaskStore::new();
        for title in ["A", "B", "C"] {
            store.create(create_req(title)).await.unwrap();
        }

        let titles: Vec<String> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, ["C", "B", "A"]);
    }

    #[tokio::test]
    async fn update_merges_partial_fields() {
        let store = InMemoryTaskStore::new();
        let task = store.create(create_req("Read book")).await.unwrap();
        let id = task.id.to_string();

        let updated = store
            .update_by_id(&id, UpdateTaskRequest { title: None, completed: Some(true) })
            .await
            .unwrap();
        assert!(updated.completed);
        assert_eq!(updated.title, "Read book");
        assert_eq!(updated.created_at, task.created_at);

        let renamed = store
            .update_by_id(&id, UpdateTaskRequest { title: Some("Read two books".into()), completed: None })
            .await
            .unwrap();
        assert_eq!(renamed.title, "Read two books");
        assert!(renamed.completed);
    }

    #[tokio::test]
    async fn update_with_blank_title_is_rejected() {
        let store = InMemoryTaskStore::new();
        let task = store.create(create_req("Keep me")).await.unwrap();

        let result = store
            .update_by_id(&task.id.to_string(), UpdateTaskRequest { title: Some(String::new()), completed: Some(true) })
            .await;

        assert!(matches!(result, Err(StoreError::Validation(_))));
        assert_eq!(store.find_by_id(&task.id.to_string()).await.unwrap(), task);
    }

    #[tokio::test]
    async fn unknown_or_malformed_ids_are_not_found() {
        let store = InMemoryTaskStore::new();
        let unknown = uuid::Uuid::new_v4().to_string();

        for id in [unknown.as_str(), "not-a-uuid"] {
            assert!(matches!(store.find_by_id(id).await, Err(StoreError::NotFound(_))));
            assert!(matches!(
                store.update_by_id(id, UpdateTaskRequest::default()).await,
                Err(StoreError::NotFound(_))
            ));
            assert!(matches!(store.delete_by_id(id).await, Err(StoreError::NotFound(_))));
        }
    }

    #[tokio::test]
    async fn delete_returns_last_state_once() {
        let store = InMemoryTaskStore::new();
        let task = store.create(create_req("Throw away")).await.unwrap();
        let id = task.id.to_string();

        assert_eq!(store.delete_by_id(&id).await.unwrap(), task);
        assert!(matches!(store.delete_by_id(&id).await, Err(StoreError::NotFound(_))));
        assert!(store.list_all().await.unwrap().is_empty());
    }
}
