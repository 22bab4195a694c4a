// Test doubles shared by the store and view tests

use crate::error::RemoteError;
use crate::remote::{CreatedTodo, NewTodo, Remote, RemoteTodo, TodoPayload};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Create(NewTodo),
    Update(i64, TodoPayload),
    List,
}

/// In-process remote that records calls and answers from a script
#[derive(Default)]
pub struct FakeRemote {
    pub calls: Mutex<Vec<Call>>,
    pub next_id: Mutex<i64>,
    pub echo_title: Mutex<Option<String>>,
    pub items: Mutex<Vec<RemoteTodo>>,
    pub failing: Mutex<bool>,
}

impl FakeRemote {
    pub fn with_next_id(id: i64) -> Self {
        let remote = Self::default();
        *remote.next_id.lock().unwrap() = id;
        remote
    }

    pub fn failing() -> Self {
        let remote = Self::default();
        *remote.failing.lock().unwrap() = true;
        remote
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn fail(&self) -> Result<(), RemoteError> {
        if *self.failing.lock().unwrap() {
            return Err(RemoteError::Status {
                method: "TEST",
                url: "fake://todos".to_string(),
                status: 503,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Remote for FakeRemote {
    async fn create(&self, todo: &NewTodo) -> Result<CreatedTodo, RemoteError> {
        self.calls.lock().unwrap().push(Call::Create(todo.clone()));
        self.fail()?;
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        let title = self.echo_title.lock().unwrap().clone().or_else(|| Some(todo.title.clone()));
        Ok(CreatedTodo { id, title })
    }

    async fn update(&self, id: i64, todo: &TodoPayload) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(Call::Update(id, todo.clone()));
        self.fail()
    }

    async fn list(&self) -> Result<Vec<RemoteTodo>, RemoteError> {
        self.calls.lock().unwrap().push(Call::List);
        self.fail()?;
        Ok(self.items.lock().unwrap().clone())
    }
}
