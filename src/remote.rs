// Remote collection the task list is mirrored to

use crate::error::RemoteError;
use crate::task::Task;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Example collection used when no base URL is configured
pub const DEFAULT_BASE_URL: &str = "https://jsonplaceholder.typicode.com/todos";

/// Body of a create request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTodo {
    pub title: String,
    pub completed: bool,
}

/// Response to a create request.
///
/// Only `id` is relied upon; remotes that ignore custom fields may echo a
/// different title or none at all.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreatedTodo {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
}

/// Body of an update request: the full task plus `title` mirrored from `text`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TodoPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub text: String,
    pub completed: bool,
    pub title: String,
}

impl From<&Task> for TodoPayload {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            text: task.text.clone(),
            completed: task.completed,
            title: task.text.clone(),
        }
    }
}

/// Item returned when listing the collection
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RemoteTodo {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
}

/// REST-ish collection endpoint
#[async_trait]
pub trait Remote: Send + Sync {
    /// POST a new item, returning the remote-assigned id
    async fn create(&self, todo: &NewTodo) -> Result<CreatedTodo, RemoteError>;

    /// PUT the full item to `base/{id}`
    async fn update(&self, id: i64, todo: &TodoPayload) -> Result<(), RemoteError>;

    /// GET every item in the collection
    async fn list(&self) -> Result<Vec<RemoteTodo>, RemoteError>;
}

/// Remote collection reached over HTTP
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn item_url(&self, id: i64) -> String {
        format!("{}/{}", self.base_url, id)
    }

    fn check(method: &'static str, url: &str, response: &reqwest::Response) -> Result<(), RemoteError> {
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                method,
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Remote for HttpRemote {
    async fn create(&self, todo: &NewTodo) -> Result<CreatedTodo, RemoteError> {
        debug!(url = %self.base_url, title = %todo.title, "create: POST");
        let response = self.client.post(&self.base_url).json(todo).send().await?;
        Self::check("POST", &self.base_url, &response)?;
        Ok(response.json::<CreatedTodo>().await?)
    }

    async fn update(&self, id: i64, todo: &TodoPayload) -> Result<(), RemoteError> {
        let url = self.item_url(id);
        debug!(%url, completed = todo.completed, "update: PUT");
        let response = self.client.put(&url).json(todo).send().await?;
        Self::check("PUT", &url, &response)
    }

    async fn list(&self) -> Result<Vec<RemoteTodo>, RemoteError> {
        debug!(url = %self.base_url, "list: GET");
        let response = self.client.get(&self.base_url).send().await?;
        Self::check("GET", &self.base_url, &response)?;
        Ok(response.json::<Vec<RemoteTodo>>().await?)
    }
}

/// Stand-in for local-only mode; every call fails with `Disabled`
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRemote;

#[async_trait]
impl Remote for NoRemote {
    async fn create(&self, _todo: &NewTodo) -> Result<CreatedTodo, RemoteError> {
        Err(RemoteError::Disabled)
    }

    async fn update(&self, _id: i64, _todo: &TodoPayload) -> Result<(), RemoteError> {
        Err(RemoteError::Disabled)
    }

    async fn list(&self) -> Result<Vec<RemoteTodo>, RemoteError> {
        Err(RemoteError::Disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn remote_for(server: &MockServer) -> HttpRemote {
        HttpRemote::new(format!("{}/todos/", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_payload_mirrors_text_into_title() {
        let mut task = Task::new("buy milk", Some(7));
        task.toggle();

        let payload = TodoPayload::from(&task);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            json!({"id": 7, "text": "buy milk", "completed": true, "title": "buy milk"})
        );
    }

    #[tokio::test]
    async fn test_create_posts_title_and_completed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/todos"))
            .and(body_json(json!({"title": "buy milk", "completed": false})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 201,
                "title": "buy milk",
                "completed": false,
                "userId": 1
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = remote_for(&server)
            .create(&NewTodo {
                title: "buy milk".to_string(),
                completed: false,
            })
            .await
            .unwrap();

        assert_eq!(created.id, 201);
        assert_eq!(created.title.as_deref(), Some("buy milk"));
    }

    #[tokio::test]
    async fn test_create_tolerates_missing_title_echo() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/todos"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 5})))
            .mount(&server)
            .await;

        let created = remote_for(&server)
            .create(&NewTodo {
                title: "x".to_string(),
                completed: false,
            })
            .await
            .unwrap();

        assert_eq!(created, CreatedTodo { id: 5, title: None });
    }

    #[tokio::test]
    async fn test_update_puts_to_item_url() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/todos/7"))
            .and(body_json(json!({
                "id": 7,
                "text": "walk dog",
                "completed": true,
                "title": "walk dog"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 7})))
            .expect(1)
            .mount(&server)
            .await;

        let payload = TodoPayload {
            id: Some(7),
            text: "walk dog".to_string(),
            completed: true,
            title: "walk dog".to_string(),
        };
        remote_for(&server).update(7, &payload).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let payload = TodoPayload {
            id: Some(1),
            text: "t".to_string(),
            completed: false,
            title: "t".to_string(),
        };
        let err = remote_for(&server).update(1, &payload).await.unwrap_err();
        assert!(matches!(err, RemoteError::Status { status: 500, method: "PUT", .. }));
    }

    #[tokio::test]
    async fn test_list_decodes_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 1, "title": "first", "completed": true, "userId": 1},
                {"id": 2, "title": "second", "completed": false, "userId": 1}
            ])))
            .mount(&server)
            .await;

        let items = remote_for(&server).list().await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "first");
        assert!(items[0].completed);
        assert_eq!(items[1].id, 2);
    }

    #[tokio::test]
    async fn test_unreachable_remote_is_transport_error() {
        let remote = HttpRemote::new("http://127.0.0.1:1/todos", Duration::from_secs(2)).unwrap();

        let err = remote.list().await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }

    #[tokio::test]
    async fn test_no_remote_is_disabled() {
        let err = NoRemote.list().await.unwrap_err();
        assert!(matches!(err, RemoteError::Disabled));
    }
}
