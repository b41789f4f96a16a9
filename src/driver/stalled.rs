//! Driver whose every call stays pending.

use std::future::pending;

use async_trait::async_trait;
use serde_json::Value;

use super::{ScriptArg, UiDriver};
use crate::error::Result;
use crate::identifiers::{ElementId, WindowHandle};
use crate::locator::By;

/// Models a remote end that accepted the connection and never answers.
pub(crate) struct StalledDriver;

#[async_trait]
impl UiDriver for StalledDriver {
    async fn navigate(&self, _url: &str) -> Result<()> {
        pending().await
    }

    async fn current_url(&self) -> Result<String> {
        pending().await
    }

    async fn title(&self) -> Result<String> {
        pending().await
    }

    async fn back(&self) -> Result<()> {
        pending().await
    }

    async fn window_handles(&self) -> Result<Vec<WindowHandle>> {
        pending().await
    }

    async fn focused_handle(&self) -> Result<WindowHandle> {
        pending().await
    }

    async fn switch_to(&self, _handle: &WindowHandle) -> Result<()> {
        pending().await
    }

    async fn close(&self, _handle: &WindowHandle) -> Result<()> {
        pending().await
    }

    async fn query(&self, _root: Option<&ElementId>, _by: &By) -> Result<Vec<ElementId>> {
        pending().await
    }

    async fn attribute(&self, _element: &ElementId, _name: &str) -> Result<Option<String>> {
        pending().await
    }

    async fn text(&self, _element: &ElementId) -> Result<String> {
        pending().await
    }

    async fn value(&self, _element: &ElementId) -> Result<String> {
        pending().await
    }

    async fn is_displayed(&self, _element: &ElementId) -> Result<bool> {
        pending().await
    }

    async fn is_enabled(&self, _element: &ElementId) -> Result<bool> {
        pending().await
    }

    async fn click(&self, _element: &ElementId) -> Result<()> {
        pending().await
    }

    async fn clear(&self, _element: &ElementId) -> Result<()> {
        pending().await
    }

    async fn send_keys(&self, _element: &ElementId, _text: &str) -> Result<()> {
        pending().await
    }

    async fn execute_in_page(&self, _script: &str, _args: &[ScriptArg]) -> Result<Value> {
        pending().await
    }
}
