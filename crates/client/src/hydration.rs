//! Hydration gate.
//!
//! Authenticated views must not render until the session has been restored
//! from durable storage. The gate rehydrates on mount and stays open for the
//! rest of its lifetime once the store reports completion.

use crate::session::{Session, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    NotHydrated,
    Hydrated,
}

#[derive(Debug)]
pub struct HydrationGate {
    session: SessionStore,
    state: GateState,
}

impl HydrationGate {
    pub fn new(session: SessionStore) -> Self {
        Self {
            session,
            state: GateState::NotHydrated,
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Trigger rehydration if it has not happened yet.
    pub fn mount(&mut self) -> GateState {
        if self.state == GateState::NotHydrated && !self.session.is_hydrated() {
            self.session.rehydrate();
        }
        self.observe()
    }

    /// Render `content` once hydrated, `loading` until then.
    pub fn render<T>(
        &mut self,
        loading: impl FnOnce() -> T,
        content: impl FnOnce(&Session) -> T,
    ) -> T {
        match self.mount() {
            GateState::Hydrated => content(&self.session.snapshot()),
            GateState::NotHydrated => loading(),
        }
    }

    /// Wait for hydration triggered elsewhere.
    pub async fn ready(&mut self) -> Session {
        self.session.wait_hydrated().await;
        self.observe();
        self.session.snapshot()
    }

    fn observe(&mut self) -> GateState {
        if self.state == GateState::NotHydrated && self.session.is_hydrated() {
            tracing::debug!("Hydration gate open");
            self.state = GateState::Hydrated;
        }
        self.state
    }
}
