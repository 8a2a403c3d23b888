use sauron::{
    html::{attributes::*, *},
    prelude::*,
};
use shared::{CreateTaskRequest, ErrorBody, HealthStatus, Task, UpdateTaskRequest};
use uuid::Uuid;
use wasm_bindgen::JsValue;
use wasm_bindgen_futures::JsFuture;
use web_sys::{console, window, Request, RequestInit, Response};

const TASKS_URL: &str = "/api/tasks";
const HEALTH_URL: &str = "/health";

#[derive(Debug, Clone, PartialEq)]
pub enum ApiStatus {
    Checking,
    Connected(String),
    Failed(String),
}

impl ApiStatus {
    fn label(&self) -> String {
        match self {
            ApiStatus::Checking => "Status: checking...".to_string(),
            ApiStatus::Connected(msg) => format!("Status: {}", msg),
            ApiStatus::Failed(msg) => format!("Status: {}", msg),
        }
    }

    fn color_class(&self) -> &'static str {
        match self {
            ApiStatus::Checking => "text-gray-500",
            ApiStatus::Connected(_) => "text-green-500",
            ApiStatus::Failed(_) => "text-red-500",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Msg {
    CheckHealth,
    HealthChecked(Result<HealthStatus, String>),
    LoadTasks,
    TasksLoaded(Vec<Task>),
    LoadFailed(String),
    SetNewTaskTitle(String),
    CreateTask,
    // The input keeps its text until the server accepted the task.
    TaskCreated,
    ToggleTask(Uuid, bool),
    DeleteTask(Uuid),
    // Any successful mutation triggers a full reload.
    Mutated,
    MutationFailed(String),
    Noop,
}

#[derive(Debug, Clone)]
pub struct Model {
    tasks: Vec<Task>,
    new_task_title: String,
    api_status: ApiStatus,
    list_error: Option<String>,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            new_task_title: String::new(),
            api_status: ApiStatus::Checking,
            list_error: None,
        }
    }
}

impl Application for Model {
    type MSG = Msg;

    fn init(&mut self) -> Cmd<Msg> {
        Cmd::batch(vec![
            Cmd::new(async { Msg::CheckHealth }),
            Cmd::new(async { Msg::LoadTasks }),
        ])
    }

    fn update(&mut self, msg: Msg) -> Cmd<Msg> {
        match msg {
            Msg::CheckHealth => Cmd::new(async { Msg::HealthChecked(check_health().await) }),
            Msg::HealthChecked(Ok(health)) => {
                self.api_status = ApiStatus::Connected(format!("Connected (v{})", health.version));
                Cmd::none()
            }
            Msg::HealthChecked(Err(e)) => {
                console::error_1(&format!("Health check failed: {}", e).into());
                self.api_status = ApiStatus::Failed(format!("Disconnected: {}", e));
                Cmd::none()
            }
            Msg::LoadTasks => Cmd::new(async {
                match fetch_tasks().await {
                    Ok(tasks) => Msg::TasksLoaded(tasks),
                    Err(e) => Msg::LoadFailed(e),
                }
            }),
            Msg::TasksLoaded(tasks) => {
                self.tasks = tasks;
                self.list_error = None;
                if !matches!(self.api_status, ApiStatus::Connected(_)) {
                    self.api_status = ApiStatus::Connected("Connected".to_string());
                }
                Cmd::none()
            }
            Msg::LoadFailed(e) => {
                console::error_1(&format!("Failed to load tasks: {}", e).into());
                self.list_error = Some(e.clone());
                self.api_status = ApiStatus::Failed(format!("Error: {}", e));
                Cmd::none()
            }
            Msg::SetNewTaskTitle(task_title) => {
                self.new_task_title = task_title;
                Cmd::none()
            }
            Msg::CreateTask => {
                let task_title = self.new_task_title.clone();
                if shared::validate_title(&task_title).is_err() {
                    return Cmd::none();
                }

                Cmd::new(async move {
                    match create_task(task_title).await {
                        Ok(_) => Msg::TaskCreated,
                        Err(e) => Msg::MutationFailed(format!("Failed to add task: {}", e)),
                    }
                })
            }
            Msg::TaskCreated => {
                self.new_task_title.clear();
                Cmd::new(async { Msg::LoadTasks })
            }
            Msg::ToggleTask(id, completed) => Cmd::new(async move {
                match update_task(id, !completed).await {
                    Ok(_) => Msg::Mutated,
                    Err(e) => Msg::MutationFailed(format!("Failed to update task: {}", e)),
                }
            }),
            Msg::DeleteTask(id) => Cmd::new(async move {
                match delete_task(id).await {
                    Ok(()) => Msg::Mutated,
                    Err(e) => Msg::MutationFailed(format!("Failed to delete task: {}", e)),
                }
            }),
            Msg::Mutated => Cmd::new(async { Msg::LoadTasks }),
            Msg::MutationFailed(e) => {
                console::error_1(&e.clone().into());
                if let Some(window) = window() {
                    let _ = window.alert_with_message(&e);
                }
                Cmd::none()
            }
            Msg::Noop => Cmd::none(),
        }
    }

    fn view(&self) -> Node<Msg> {
        div(
            [class("min-h-screen bg-gray-100 text-gray-900")],
            [div(
                [class("max-w-2xl mx-auto px-6 py-8")],
                [self.view_header(), self.view_create_form(), self.view_task_list()],
            )],
        )
    }
}

impl Model {
    fn view_header(&self) -> Node<Msg> {
        header([class("mb-6")], [
            h1([class("text-3xl font-bold mb-2")], [text("Task Manager")]),
            p(
                [id("api-status"), class(&format!("text-sm {}", self.api_status.color_class()))],
                [text(&self.api_status.label())],
            ),
        ])
    }

    fn view_create_form(&self) -> Node<Msg> {
        div([class("flex gap-2 mb-6")], [
            input([
                id("task-input"),
                r#type("text"),
                placeholder("New task..."),
                value(&self.new_task_title),
                on_input(|event| Msg::SetNewTaskTitle(event.value())),
                on_keydown(|event| {
                    if event.key() == "Enter" {
                        Msg::CreateTask
                    } else {
                        Msg::Noop
                    }
                }),
                class("flex-1 px-3 py-2 border border-gray-300 rounded-md focus:outline-none focus:ring-2 focus:ring-blue-500"),
            ], []),
            button([
                id("add-task"),
                on_click(|_| Msg::CreateTask),
                class("bg-blue-600 hover:bg-blue-700 text-white font-medium px-4 py-2 rounded-md"),
            ], [text("Add")]),
        ])
    }

    fn view_task_list(&self) -> Node<Msg> {
        let items = if let Some(error) = &self.list_error {
            vec![li([class("error text-red-600 py-3")], [text(&format!("Failed to load tasks: {}", error))])]
        } else if self.tasks.is_empty() {
            vec![li([class("empty-list text-gray-500 italic py-3")], [text("No tasks yet. Add one!")])]
        } else {
            self.tasks.iter().map(|task| self.view_task(task)).collect()
        };

        ul([id("tasks-list"), class("divide-y divide-gray-200 bg-white rounded-lg shadow")], items)
    }

    fn view_task(&self, task: &Task) -> Node<Msg> {
        let task_id = task.id;
        let completed = task.completed;

        li(
            [
                key(task.id.to_string()),
                class(&format!(
                    "task-item flex items-center justify-between px-4 py-3 {}",
                    if completed { "completed bg-green-50" } else { "" }
                )),
            ],
            [
                div([class("min-w-0")], [
                    span(
                        [class(if completed { "task-text line-through text-gray-400" } else { "task-text" })],
                        [text(&task.title)],
                    ),
                    p(
                        [class("text-xs text-gray-400")],
                        [text(&task.created_at.format("%Y-%m-%d %H:%M").to_string())],
                    ),
                ]),
                div([class("task-actions flex gap-2")], [
                    button([
                        on_click(move |_| Msg::ToggleTask(task_id, completed)),
                        class("btn btn-complete bg-green-600 hover:bg-green-700 text-white text-sm px-3 py-1 rounded"),
                    ], [text(toggle_label(completed))]),
                    button([
                        on_click(move |_| Msg::DeleteTask(task_id)),
                        class("btn btn-delete bg-red-600 hover:bg-red-700 text-white text-sm px-3 py-1 rounded"),
                    ], [text("Delete")]),
                ]),
            ],
        )
    }
}

fn toggle_label(completed: bool) -> &'static str {
    if completed {
        "Undo"
    } else {
        "Complete"
    }
}

/// Turn a non-2xx response into a message, preferring the server's `{error}`.
fn describe_failure(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody { error }) if !error.is_empty() => error,
        _ => format!("HTTP error: {}", status),
    }
}

async fn send(method: &str, url: &str, body: Option<String>) -> Result<String, String> {
    let opts = RequestInit::new();
    opts.set_method(method);
    if let Some(body) = &body {
        opts.set_body(&JsValue::from_str(body));
    }

    let request = Request::new_with_str_and_init(url, &opts)
        .map_err(|_| "Failed to create request")?;

    if body.is_some() {
        request
            .headers()
            .set("Content-Type", "application/json")
            .map_err(|_| "Failed to set header")?;
    }

    let promise = window()
        .ok_or("No window available")?
        .fetch_with_request(&request);

    let response: Response = JsFuture::from(promise)
        .await
        .map_err(|_| "Failed to send request")?
        .into();

    let text_promise = response.text().map_err(|_| "Failed to read response")?;
    let text = JsFuture::from(text_promise)
        .await
        .map_err(|_| "Failed to get text")?
        .as_string()
        .ok_or("Failed to convert to string")?;

    if !response.ok() {
        return Err(describe_failure(response.status(), &text));
    }
    Ok(text)
}

async fn check_health() -> Result<HealthStatus, String> {
    let text = send("GET", HEALTH_URL, None).await?;
    serde_json::from_str(&text).map_err(|e| format!("Failed to parse JSON: {}", e))
}

async fn fetch_tasks() -> Result<Vec<Task>, String> {
    let text = send("GET", TASKS_URL, None).await?;
    serde_json::from_str(&text).map_err(|e| format!("Failed to parse JSON: {}", e))
}

async fn create_task(task_title: String) -> Result<Task, String> {
    let request = CreateTaskRequest {
        title: Some(task_title),
        completed: None,
    };
    let body = serde_json::to_string(&request).map_err(|_| "Failed to serialize request")?;

    let text = send("POST", TASKS_URL, Some(body)).await?;
    serde_json::from_str(&text).map_err(|e| format!("Failed to parse JSON: {}", e))
}

async fn update_task(id: Uuid, completed: bool) -> Result<Task, String> {
    let request = UpdateTaskRequest {
        title: None,
        completed: Some(completed),
    };
    let body = serde_json::to_string(&request).map_err(|_| "Failed to serialize request")?;

    let text = send("PUT", &format!("{}/{}", TASKS_URL, id), Some(body)).await?;
    serde_json::from_str(&text).map_err(|e| format!("Failed to parse JSON: {}", e))
}

async fn delete_task(id: Uuid) -> Result<(), String> {
    send("DELETE", &format!("{}/{}", TASKS_URL, id), None).await?;
    Ok(())
}

#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    Program::mount_to_body(Model::default());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_prefers_server_message() {
        let body = r#"{"error":"task not found"}"#;
        assert_eq!(describe_failure(404, body), "task not found");
    }

    #[test]
    fn failure_falls_back_to_status() {
        assert_eq!(describe_failure(502, "<html>Bad Gateway</html>"), "HTTP error: 502");
        assert_eq!(describe_failure(500, r#"{"error":""}"#), "HTTP error: 500");
    }

    #[test]
    fn toggle_label_follows_state() {
        assert_eq!(toggle_label(false), "Complete");
        assert_eq!(toggle_label(true), "Undo");
    }

    #[test]
    fn new_task_title_is_cleared_only_after_creation() {
        let mut model = Model::default();
        let _ = model.update(Msg::SetNewTaskTitle("Buy milk".into()));

        let _ = model.update(Msg::CreateTask);
        assert_eq!(model.new_task_title, "Buy milk");

        let _ = model.update(Msg::TaskCreated);
        assert!(model.new_task_title.is_empty());
    }

    #[test]
    fn blank_title_is_not_submitted() {
        let mut model = Model::default();
        let _ = model.update(Msg::SetNewTaskTitle("   ".into()));

        let _ = model.update(Msg::CreateTask);
        assert_eq!(model.new_task_title, "   ");
    }

    #[test]
    fn status_label_reflects_connectivity() {
        let connected = ApiStatus::Connected("Connected (v1.0.0)".into());
        assert_eq!(connected.label(), "Status: Connected (v1.0.0)");
        assert_eq!(connected.color_class(), "text-green-500");
        assert_eq!(ApiStatus::Failed("Disconnected".into()).color_class(), "text-red-500");
    }
}
