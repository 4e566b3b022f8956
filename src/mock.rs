//! In-memory driver double for tests.
//!
//! Holds a flat node table plus scripted query responses. Failure modes
//! (stale nodes, refused interactions, closed windows) are toggled per
//! node or per session so retry paths can be exercised without a real
//! browser.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::driver::{
    DriverError, DriverResult, NodeRef, Query, ScriptArg, WebDriver,
};

// ============================================================================
// State
// ============================================================================

#[derive(Default)]
struct MockNode {
    tag: String,
    attrs: FxHashMap<String, String>,
    text: String,
    displayed: bool,
    enabled: bool,
    stale: bool,
    stale_on_click: bool,
    not_interactable: bool,
    invalid_state: bool,
    failing_clicks: usize,
    clicks: usize,
    double_clicks: usize,
    refuse_frame: bool,
}

struct QueryStub {
    responses: Vec<Vec<NodeRef>>,
    delay: usize,
    calls: usize,
}

impl QueryStub {
    fn next(&mut self) -> Vec<NodeRef> {
        self.calls += 1;
        if self.calls <= self.delay {
            return Vec::new();
        }
        let idx = (self.calls - self.delay - 1).min(self.responses.len() - 1);
        self.responses[idx].clone()
    }
}

#[derive(Default)]
struct MockState {
    nodes: FxHashMap<String, MockNode>,
    queries: FxHashMap<String, QueryStub>,
    scripts: FxHashMap<String, Value>,
    script_not_interactable: bool,
    window_closed: bool,
    switch_log: Vec<String>,
    last_url: Option<String>,
    next_id: usize,
}

/// A scriptable [`WebDriver`] double.
#[derive(Clone)]
pub(crate) struct MockDriver {
    state: Arc<Mutex<MockState>>,
    query_count: Arc<AtomicUsize>,
}

// ============================================================================
// Test API
// ============================================================================

impl MockDriver {
    pub fn new() -> Self {
        MockDriver {
            state: Arc::new(Mutex::new(MockState::default())),
            query_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn insert_node(&self, tag: &str) -> NodeRef {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = format!("node-{}", state.next_id);
        state.nodes.insert(
            id.clone(),
            MockNode {
                tag: tag.to_string(),
                displayed: true,
                enabled: true,
                ..MockNode::default()
            },
        );
        NodeRef::new(id)
    }

    pub fn set_attribute(&self, node: &NodeRef, name: &str, value: &str) {
        self.with_node(node, |n| {
            n.attrs.insert(name.to_string(), value.to_string());
        });
    }

    pub fn set_text(&self, node: &NodeRef, text: &str) {
        self.with_node(node, |n| n.text = text.to_string());
    }

    pub fn set_displayed(&self, node: &NodeRef, displayed: bool) {
        self.with_node(node, |n| n.displayed = displayed);
    }

    pub fn set_enabled(&self, node: &NodeRef, enabled: bool) {
        self.with_node(node, |n| n.enabled = enabled);
    }

    pub fn set_not_interactable(&self, node: &NodeRef, value: bool) {
        self.with_node(node, |n| n.not_interactable = value);
    }

    #[allow(dead_code)]
    pub fn set_invalid_state(&self, node: &NodeRef, value: bool) {
        self.with_node(node, |n| n.invalid_state = value);
    }

    pub fn make_stale(&self, node: &NodeRef) {
        self.with_node(node, |n| n.stale = true);
    }

    pub fn make_stale_on_click(&self, node: &NodeRef) {
        self.with_node(node, |n| n.stale_on_click = true);
    }

    /// The next `count` clicks on the node fail as not interactable.
    pub fn fail_clicks(&self, node: &NodeRef, count: usize) {
        self.with_node(node, |n| n.failing_clicks = count);
    }

    pub fn refuse_frame(&self, node: &NodeRef) {
        self.with_node(node, |n| n.refuse_frame = true);
    }

    pub fn stub_query(&self, expression: &str, nodes: Vec<NodeRef>) {
        self.stub(expression, vec![nodes], 0);
    }

    /// Empty for the first `polls` calls, then `nodes`.
    pub fn stub_query_after(&self, expression: &str, polls: usize, nodes: Vec<NodeRef>) {
        self.stub(expression, vec![nodes], polls);
    }

    /// Successive responses per call; the last repeats.
    pub fn stub_query_sequence(&self, expression: &str, responses: Vec<Vec<NodeRef>>) {
        self.stub(expression, responses, 0);
    }

    fn stub(&self, expression: &str, responses: Vec<Vec<NodeRef>>, delay: usize) {
        self.state.lock().queries.insert(
            expression.to_string(),
            QueryStub {
                responses,
                delay,
                calls: 0,
            },
        );
    }

    pub fn script_result(&self, script: &str, value: Value) {
        self.state.lock().scripts.insert(script.to_string(), value);
    }

    pub fn script_fails_not_interactable(&self) {
        self.state.lock().script_not_interactable = true;
    }

    pub fn close_window(&self) {
        self.state.lock().window_closed = true;
    }

    pub fn clicks(&self, node: &NodeRef) -> usize {
        self.state
            .lock()
            .nodes
            .get(node.as_str())
            .map_or(0, |n| n.clicks)
    }

    pub fn double_clicks(&self, node: &NodeRef) -> usize {
        self.state
            .lock()
            .nodes
            .get(node.as_str())
            .map_or(0, |n| n.double_clicks)
    }

    pub fn switch_log(&self) -> Vec<String> {
        self.state.lock().switch_log.clone()
    }

    pub fn query_count(&self) -> Arc<AtomicUsize> {
        self.query_count.clone()
    }

    pub fn last_url(&self) -> Option<String> {
        self.state.lock().last_url.clone()
    }

    fn with_node(&self, node: &NodeRef, f: impl FnOnce(&mut MockNode)) {
        let mut state = self.state.lock();
        let n = state
            .nodes
            .get_mut(node.as_str())
            .unwrap_or_else(|| panic!("unknown mock node {node}"));
        f(n);
    }

    fn guard_window(&self) -> DriverResult<()> {
        if self.state.lock().window_closed {
            return Err(DriverError::NoSuchWindow);
        }
        Ok(())
    }

    fn live<'a>(
        state: &'a mut MockState,
        node: &NodeRef,
    ) -> DriverResult<&'a mut MockNode> {
        match state.nodes.get_mut(node.as_str()) {
            Some(n) if n.stale => Err(DriverError::Stale),
            Some(n) => Ok(n),
            None => Err(DriverError::Stale),
        }
    }
}

// ============================================================================
// WebDriver Implementation
// ============================================================================

#[async_trait]
impl WebDriver for MockDriver {
    async fn find_element(
        &self,
        scope: Option<&NodeRef>,
        query: &Query,
    ) -> DriverResult<NodeRef> {
        self.find_elements(scope, query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::NotFound(query.expression.clone()))
    }

    async fn find_elements(
        &self,
        _scope: Option<&NodeRef>,
        query: &Query,
    ) -> DriverResult<Vec<NodeRef>> {
        self.guard_window()?;
        self.query_count.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        Ok(state
            .queries
            .get_mut(&query.expression)
            .map(QueryStub::next)
            .unwrap_or_default())
    }

    async fn attribute(&self, node: &NodeRef, name: &str) -> DriverResult<Option<String>> {
        self.guard_window()?;
        let mut state = self.state.lock();
        let n = Self::live(&mut state, node)?;
        Ok(n.attrs.get(name).cloned())
    }

    async fn text(&self, node: &NodeRef) -> DriverResult<String> {
        self.guard_window()?;
        let mut state = self.state.lock();
        let n = Self::live(&mut state, node)?;
        Ok(n.text.clone())
    }

    async fn tag_name(&self, node: &NodeRef) -> DriverResult<String> {
        self.guard_window()?;
        let mut state = self.state.lock();
        let n = Self::live(&mut state, node)?;
        Ok(n.tag.clone())
    }

    async fn is_displayed(&self, node: &NodeRef) -> DriverResult<bool> {
        self.guard_window()?;
        let mut state = self.state.lock();
        let n = Self::live(&mut state, node)?;
        Ok(n.displayed)
    }

    async fn is_enabled(&self, node: &NodeRef) -> DriverResult<bool> {
        self.guard_window()?;
        let mut state = self.state.lock();
        let n = Self::live(&mut state, node)?;
        Ok(n.enabled)
    }

    async fn click(&self, node: &NodeRef) -> DriverResult<()> {
        self.guard_window()?;
        let mut state = self.state.lock();
        let n = Self::live(&mut state, node)?;
        if n.failing_clicks > 0 {
            n.failing_clicks -= 1;
            return Err(DriverError::NotInteractable("element intercepted".into()));
        }
        if n.not_interactable {
            return Err(DriverError::NotInteractable("element not visible".into()));
        }
        if n.invalid_state {
            return Err(DriverError::InvalidState("element state".into()));
        }
        if n.stale_on_click {
            n.stale = true;
            return Err(DriverError::Stale);
        }
        n.clicks += 1;
        Ok(())
    }

    async fn double_click(&self, node: &NodeRef) -> DriverResult<()> {
        self.guard_window()?;
        let mut state = self.state.lock();
        let n = Self::live(&mut state, node)?;
        if n.not_interactable {
            return Err(DriverError::NotInteractable("element not visible".into()));
        }
        n.double_clicks += 1;
        Ok(())
    }

    async fn send_keys(&self, node: &NodeRef, keys: &str) -> DriverResult<()> {
        self.guard_window()?;
        let mut state = self.state.lock();
        let n = Self::live(&mut state, node)?;
        if n.not_interactable {
            return Err(DriverError::NotInteractable("element not visible".into()));
        }
        let current = n.attrs.entry("value".to_string()).or_default();
        current.push_str(keys);
        Ok(())
    }

    async fn clear(&self, node: &NodeRef) -> DriverResult<()> {
        self.guard_window()?;
        let mut state = self.state.lock();
        let n = Self::live(&mut state, node)?;
        if n.not_interactable {
            return Err(DriverError::NotInteractable("element not visible".into()));
        }
        n.attrs.remove("value");
        Ok(())
    }

    async fn execute_script(
        &self,
        script: &str,
        _args: &[ScriptArg],
    ) -> DriverResult<Value> {
        self.guard_window()?;
        let state = self.state.lock();
        if state.script_not_interactable {
            return Err(DriverError::NotInteractable("script target".into()));
        }
        Ok(state.scripts.get(script).cloned().unwrap_or(Value::Null))
    }

    async fn switch_to_default_content(&self) -> DriverResult<()> {
        self.guard_window()?;
        self.state.lock().switch_log.push("default".to_string());
        Ok(())
    }

    async fn switch_to_frame(&self, frame: &NodeRef) -> DriverResult<()> {
        self.guard_window()?;
        let mut state = self.state.lock();
        let n = Self::live(&mut state, frame)?;
        if n.refuse_frame {
            return Err(DriverError::NoSuchFrame);
        }
        state.switch_log.push(format!("frame:{frame}"));
        Ok(())
    }

    async fn switch_to_parent_frame(&self) -> DriverResult<()> {
        self.guard_window()?;
        self.state.lock().switch_log.push("parent".to_string());
        Ok(())
    }

    async fn navigate(&self, url: &str) -> DriverResult<()> {
        self.guard_window()?;
        self.state.lock().last_url = Some(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> DriverResult<String> {
        self.guard_window()?;
        Ok(self.state.lock().last_url.clone().unwrap_or_default())
    }

    async fn title(&self) -> DriverResult<String> {
        self.guard_window()?;
        Ok(String::new())
    }
}
