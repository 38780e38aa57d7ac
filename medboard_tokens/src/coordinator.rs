use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
};

use crate::{
    queue::{PendingRequestQueue, RefreshOutcome, WaitForRefresh},
    Credentials, RefreshError, RefreshSource, TokenStore,
};

/// The entry point users are sent to once a session cannot be recovered
pub trait LoginRedirect: Send + Sync {
    /// Sends the user to the login entry point
    fn redirect_to_login(&self);
}

/// A login redirect that only records the event in the log
#[derive(Clone, Copy, Debug, Default)]
pub struct LogRedirect;

impl LoginRedirect for LogRedirect {
    fn redirect_to_login(&self) {
        tracing::warn!("session expired, login required");
    }
}

impl<F> LoginRedirect for F
where
    F: Fn() + Send + Sync,
{
    fn redirect_to_login(&self) {
        self()
    }
}

#[derive(Debug, Default)]
struct RefreshState {
    refreshing: bool,
    cycle: u64,
    queue: PendingRequestQueue,
}

enum Admission<'a> {
    Lead(RefreshLease<'a>),
    Wait(WaitForRefresh),
}

/// Coordinates access token renewal so that at most one refresh is in flight
///
/// The first caller to observe an authentication failure takes the lease and
/// performs the refresh. Every caller arriving while the lease is held is
/// suspended in a FIFO queue and receives the same outcome once the refresh
/// settles.
///
/// The refreshing flag and the queue live under one lock that is never held
/// across an `.await`, so checking and setting the flag is a single step.
pub struct RefreshCoordinator {
    store: Arc<TokenStore>,
    source: Box<dyn RefreshSource>,
    redirect: Box<dyn LoginRedirect>,
    state: Mutex<RefreshState>,
    redirected: AtomicBool,
}

impl RefreshCoordinator {
    /// Constructs a new coordinator over the given store and source
    ///
    /// Unrecoverable session failures are only logged until a redirect is
    /// configured with [`with_redirect()`][Self::with_redirect()].
    pub fn new(store: Arc<TokenStore>, source: impl RefreshSource + 'static) -> Self {
        Self {
            store,
            source: Box::new(source),
            redirect: Box::new(LogRedirect),
            state: Mutex::new(RefreshState::default()),
            redirected: AtomicBool::new(false),
        }
    }

    /// Replaces the login redirect
    pub fn with_redirect(mut self, redirect: impl LoginRedirect + 'static) -> Self {
        self.redirect = Box::new(redirect);
        self
    }

    /// The token store holding the current credentials
    #[inline]
    pub fn store(&self) -> &Arc<TokenStore> {
        &self.store
    }

    /// Whether a refresh is currently in flight
    pub fn is_refreshing(&self) -> bool {
        self.state().refreshing
    }

    /// The number of callers waiting on the in-flight refresh
    pub fn waiting(&self) -> usize {
        self.state().queue.len()
    }

    /// Obtains a fresh access token
    ///
    /// If no refresh is in flight, this caller performs it. Otherwise this
    /// caller waits for the in-flight refresh and shares its outcome.
    ///
    /// A failed refresh clears the stored credentials and redirects to the
    /// login entry point before the error is returned.
    pub async fn refresh(&self) -> RefreshOutcome {
        let lease = match self.admit() {
            Admission::Wait(waiter) => {
                tracing::debug!("refresh already in flight, waiting for its outcome");
                return waiter.outcome().await;
            }
            Admission::Lead(lease) => lease,
        };

        let current = self.store.get();
        let result = self
            .source
            .refresh(current.as_deref())
            .await
            .and_then(|fresh| {
                if fresh.access_token().as_str().trim().is_empty() {
                    Err(RefreshError::MalformedResponse(
                        "access token is empty".to_owned(),
                    ))
                } else {
                    Ok(fresh)
                }
            });

        match result {
            Ok(fresh) => {
                let credentials = match current {
                    Some(current) => current.rotate(fresh),
                    None => fresh,
                };
                let token = credentials.access_token().to_owned();

                self.store.set(credentials).await;
                self.redirected.store(false, Ordering::Release);

                let outcome = Ok(token);
                lease.settle(&outcome);
                outcome
            }
            Err(error) => {
                tracing::warn!(
                    error = (&error as &dyn std::error::Error),
                    "unable to refresh access token"
                );
                self.store.clear().await;

                let outcome = Err(error);
                lease.settle(&outcome);
                self.redirect_once();
                outcome
            }
        }
    }

    /// Starts a new session with credentials obtained from a login
    pub async fn begin_session(&self, credentials: Credentials) {
        self.store.set(credentials).await;
        self.redirected.store(false, Ordering::Release);
    }

    /// Ends the session at the user's request
    pub async fn end_session(&self) {
        self.store.clear().await;
    }

    /// Ends a session that cannot be recovered
    ///
    /// Clears the stored credentials and redirects to the login entry point,
    /// unless a redirect has already happened since the session last changed.
    pub async fn expire_session(&self) {
        self.store.clear().await;
        self.redirect_once();
    }

    fn redirect_once(&self) {
        if self.redirected.swap(true, Ordering::AcqRel) {
            tracing::trace!("already redirected to login");
        } else {
            self.redirect.redirect_to_login();
        }
    }

    fn state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn admit(&self) -> Admission<'_> {
        let mut state = self.state();
        if state.refreshing {
            let waiter = state.queue.enqueue();
            tracing::trace!(
                cycle = state.cycle,
                waiting = state.queue.len(),
                "queued behind in-flight refresh"
            );
            Admission::Wait(waiter)
        } else {
            state.refreshing = true;
            state.cycle += 1;
            tracing::debug!(cycle = state.cycle, "starting token refresh");
            Admission::Lead(RefreshLease {
                coordinator: self,
                settled: false,
            })
        }
    }

    fn settle(&self, outcome: &RefreshOutcome) {
        let mut state = self.state();
        let delivered = state.queue.drain(outcome);
        state.refreshing = false;
        tracing::debug!(
            cycle = state.cycle,
            success = outcome.is_ok(),
            waiters = delivered,
            "token refresh settled"
        );
    }
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.state();
        f.debug_struct("RefreshCoordinator")
            .field("store", &self.store)
            .field("refreshing", &state.refreshing)
            .field("cycle", &state.cycle)
            .field("waiting", &state.queue.len())
            .field("redirected", &self.redirected.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

/// The right to perform the single in-flight refresh
///
/// Dropping an unsettled lease releases every waiter with
/// [`RefreshError::Abandoned`] and returns the coordinator to idle.
struct RefreshLease<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshLease<'_> {
    fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("token refresh dropped before it settled");
            self.coordinator.settle(&Err(RefreshError::Abandoned));
        }
    }
}
