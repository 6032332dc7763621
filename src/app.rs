//! App Core for Smartmark.
//!
//! Composition root: owns the explicitly constructed collaborator handles,
//! wires the session store, synchronizer, and mutation gateway together,
//! and serializes every collection mutation through its event pump and
//! intent handlers — a single logical writer.

use std::sync::Arc;

use crate::backend::{AuthClient, ChangeFeed, DataClient, IdentityFeed};
use crate::managers::mutation_gateway::{MutationGateway, MutationGatewayTrait};
use crate::managers::session_store::{IdentityTransition, SessionStore, SessionStoreTrait};
use crate::managers::synchronizer::{SyncState, Synchronizer, SynchronizerTrait};
use crate::services::backend_config::BackendSettings;
use crate::types::change::{AuthEvent, ChangeEvent};
use crate::types::identity::Identity;
use crate::view::{self, InFlight, Intent, View};

/// Central application struct binding UI state to the backend collaborators.
///
/// Both client handles are constructed by the caller and passed in; the App
/// never reaches for an ambient singleton.
pub struct App {
    auth: Arc<dyn AuthClient>,
    data: Arc<dyn DataClient>,
    pub session: SessionStore,
    pub synchronizer: Synchronizer,
    pub gateway: MutationGateway,
    pub flags: InFlight,
    /// Last backend/sync failure, surfaced to the UI as a message.
    pub last_error: Option<String>,
    /// Provider authorize URL produced by a sign-in intent, for the UI to
    /// open.
    pub sign_in_url: Option<String>,
    provider_id: String,
    redirect_url: String,
    identity_feed: Option<IdentityFeed>,
    change_feed: Option<ChangeFeed>,
}

impl App {
    /// Creates a new App around the given collaborator handles.
    pub fn new(
        auth: Arc<dyn AuthClient>,
        data: Arc<dyn DataClient>,
        settings: &BackendSettings,
    ) -> Self {
        let synchronizer = Synchronizer::new(data.clone());
        let gateway = MutationGateway::new(data.clone());

        Self {
            auth,
            data,
            session: SessionStore::new(),
            synchronizer,
            gateway,
            flags: InFlight::default(),
            last_error: None,
            sign_in_url: None,
            provider_id: settings.provider_id.clone(),
            redirect_url: settings.redirect_url.clone(),
            identity_feed: None,
            change_feed: None,
        }
    }

    /// Startup sequence: subscribe to both collaborator feeds, run the
    /// initial session query, and load the collection when signed in.
    pub async fn startup(&mut self) {
        self.identity_feed = Some(self.auth.subscribe_identity());
        self.change_feed = Some(self.data.subscribe_changes());

        self.flags.checking_session = true;
        let seeded = match self.auth.current_identity().await {
            Ok(identity) => identity,
            Err(e) => {
                self.last_error = Some(e.to_string());
                None
            }
        };
        let transition = self.session.seed(seeded);
        self.apply_transition(transition).await;
        self.flags.checking_session = false;
    }

    /// Shutdown sequence: deregisters both collaborator subscriptions.
    ///
    /// Mandatory before discarding the App, so no handler fires against a
    /// disposed view.
    pub fn shutdown(&mut self) {
        self.identity_feed = None;
        self.change_feed = None;
    }

    /// Folds one session presence event into the application state.
    pub async fn process_auth_event(&mut self, event: AuthEvent) {
        let transition = self.session.apply(event);
        self.apply_transition(transition).await;
    }

    /// Merges one external change notification.
    pub fn process_change_event(&mut self, event: ChangeEvent) {
        self.synchronizer.apply_change(event);
    }

    /// Drains every queued feed event in arrival order.
    ///
    /// Used by tests and the demo for deterministic pumping; a long-running
    /// UI would instead select over the feeds with the same handlers.
    pub async fn pump_pending(&mut self) {
        loop {
            let mut auth_events = Vec::new();
            if let Some(feed) = self.identity_feed.as_mut() {
                while let Some(event) = feed.try_next() {
                    auth_events.push(event);
                }
            }
            let mut change_events = Vec::new();
            if let Some(feed) = self.change_feed.as_mut() {
                while let Some(event) = feed.try_next() {
                    change_events.push(event);
                }
            }
            if auth_events.is_empty() && change_events.is_empty() {
                break;
            }
            for event in auth_events {
                self.process_auth_event(event).await;
            }
            for event in change_events {
                self.process_change_event(event);
            }
        }
    }

    /// Executes one UI intent.
    pub async fn handle_intent(&mut self, intent: Intent) {
        self.last_error = None;
        match intent {
            Intent::RequestSignIn => {
                match self
                    .auth
                    .sign_in_with_provider(&self.provider_id, &self.redirect_url)
                    .await
                {
                    Ok(url) => self.sign_in_url = Some(url),
                    Err(e) => self.last_error = Some(e.to_string()),
                }
            }
            Intent::RequestSignOut => {
                // Apply locally first so the UI reacts even if the echoed
                // presence event is delayed.
                let transition = self.session.apply(AuthEvent::SignedOut);
                self.apply_transition(transition).await;
                if let Err(e) = self.auth.sign_out().await {
                    self.last_error = Some(e.to_string());
                }
            }
            Intent::RequestAdd { title, url } => {
                self.flags.adding = true;
                let identity = self.session.current().cloned();
                match self
                    .gateway
                    .add_bookmark(&title, &url, identity.as_ref())
                    .await
                {
                    Ok(bookmark) => {
                        self.synchronizer.merge_confirmed_insert(bookmark);
                    }
                    Err(e) => self.last_error = Some(e.to_string()),
                }
                self.flags.adding = false;
            }
            Intent::RequestDelete { id } => {
                let op_id = self.synchronizer.begin_local_delete(&id);
                match self.gateway.delete_bookmark(&id).await {
                    Ok(()) => {
                        if let Some(op_id) = op_id {
                            self.synchronizer.confirm_op(&op_id);
                        }
                    }
                    Err(e) => {
                        self.last_error = Some(e.to_string());
                        if let Some(op_id) = op_id {
                            self.synchronizer.fail_op(&op_id);
                        }
                        if let Some(identity) = self.session.current().cloned() {
                            if let Err(reload_err) = self
                                .synchronizer
                                .reconcile_delete_failure(&id, &identity)
                                .await
                            {
                                self.last_error = Some(reload_err.to_string());
                            }
                        }
                    }
                }
            }
        }
    }

    /// Renders the current state for the presentation layer.
    pub fn render(&self) -> View {
        view::render(
            self.session.current(),
            self.synchronizer.collection(),
            &self.flags,
        )
    }

    async fn apply_transition(&mut self, transition: IdentityTransition) {
        match transition {
            IdentityTransition::SignedIn(identity) | IdentityTransition::Switched(identity) => {
                self.synchronizer.handle_identity_change(Some(&identity));
                self.reload(&identity).await;
            }
            IdentityTransition::SignedOut => {
                self.synchronizer.handle_identity_change(None);
            }
            IdentityTransition::Unchanged => {
                // Startup with no session still needs the empty-ready state.
                if !self.session.is_signed_in()
                    && self.synchronizer.state() == SyncState::Uninitialized
                {
                    self.synchronizer.handle_identity_change(None);
                }
            }
        }
    }

    async fn reload(&mut self, identity: &Identity) {
        self.flags.loading_bookmarks = true;
        if let Err(e) = self.synchronizer.load(identity).await {
            self.last_error = Some(e.to_string());
        }
        self.flags.loading_bookmarks = false;
    }
}
