//! Mock ticket store persisted as a single JSON document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use io_protocol::tickets::{Ticket, TicketStatus, ticket_id, ticket_number};

use crate::backend::TicketBackend;
use crate::error::{TicketError, TicketResult};

/// On-disk document: `{"ticket_id_counter": n, "tickets": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreState {
    pub ticket_id_counter: u64,
    #[serde(default)]
    pub tickets: BTreeMap<String, Ticket>,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            ticket_id_counter: 1,
            tickets: BTreeMap::new(),
        }
    }
}

impl StoreState {
    /// Repair a loaded document so the counter is ahead of every issued id.
    /// `None` when no id after the highest stored one is representable.
    fn normalized(mut self) -> Option<Self> {
        let next = match self.tickets.keys().filter_map(|id| ticket_number(id)).max() {
            Some(n) => n.checked_add(1)?,
            None => 1,
        };
        self.ticket_id_counter = self.ticket_id_counter.max(next).max(1);
        Some(self)
    }
}

/// JSON-file ticket store.
///
/// State lives behind a mutex so one instance can be shared by reference
/// between the router and the tool registry. Access is assumed to be
/// single-process; there is no file locking.
pub struct MockTicketStore {
    path: Option<PathBuf>,
    state: Mutex<StoreState>,
}

impl MockTicketStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// A missing, unreadable or corrupted file yields an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = load(&path);
        tracing::debug!(
            path = %path.display(),
            tickets = state.tickets.len(),
            counter = state.ticket_id_counter,
            "ticket store loaded"
        );
        Self {
            path: Some(path),
            state: Mutex::new(state),
        }
    }

    /// Store without a backing file.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: Mutex::new(StoreState::default()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> StoreState {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Persist `next`, then make it the live state. On failure the live
    /// state is left untouched.
    fn commit(&self, guard: &mut MutexGuard<'_, StoreState>, next: StoreState) -> TicketResult<()> {
        if let Some(path) = &self.path {
            save(path, &next)?;
        }
        **guard = next;
        Ok(())
    }
}

impl TicketBackend for MockTicketStore {
    fn create_ticket(
        &self,
        title: &str,
        description: &str,
        severity: &str,
        confirm: bool,
    ) -> TicketResult<String> {
        if !confirm {
            return Ok(format!(
                "Confirmation required. Re-run create_ticket with confirm=True after you verify:\n\
                 - title='{title}'\n- severity='{severity}'\n\
                 This prevents accidental ticket creation."
            ));
        }

        let mut guard = self.lock();
        let mut next = guard.clone();
        let id = ticket_id(next.ticket_id_counter);
        next.tickets
            .insert(id.clone(), Ticket::open(title, description, severity));
        next.ticket_id_counter = next
            .ticket_id_counter
            .checked_add(1)
            .ok_or(TicketError::IdsExhausted)?;
        self.commit(&mut guard, next)?;

        tracing::info!(ticket_id = %id, severity = %severity, "ticket created");
        Ok(format!(
            "Ticket '{id}' created successfully with title: '{title}' and severity: '{severity}'."
        ))
    }

    fn get_ticket_status(&self, ticket_id: &str) -> String {
        let guard = self.lock();
        match guard.tickets.get(ticket_id) {
            Some(t) => format!(
                "Ticket ID: {ticket_id}\nTitle: {}\nDescription: {}\nSeverity: {}\nStatus: {}",
                t.title, t.description, t.severity, t.status
            ),
            None => format!("Error: Ticket '{ticket_id}' not found."),
        }
    }

    fn update_ticket_status(
        &self,
        ticket_id: &str,
        new_status: &str,
        confirm: bool,
    ) -> TicketResult<String> {
        let Some(status) = TicketStatus::parse(new_status) else {
            return Ok(format!(
                "Error: Invalid status '{new_status}'. Valid statuses are: {}.",
                TicketStatus::valid_list()
            ));
        };

        let mut guard = self.lock();
        if !guard.tickets.contains_key(ticket_id) {
            return Ok(format!("Error: Ticket '{ticket_id}' not found."));
        }

        if !confirm {
            return Ok(format!(
                "Confirmation required. Re-run update_ticket_status with confirm=True after you verify:\n\
                 - ticket_id='{ticket_id}'\n- new_status='{new_status}'"
            ));
        }

        let mut next = guard.clone();
        if let Some(ticket) = next.tickets.get_mut(ticket_id) {
            ticket.status = status;
        }
        self.commit(&mut guard, next)?;

        tracing::info!(ticket_id = %ticket_id, status = %status, "ticket status updated");
        Ok(format!("Ticket '{ticket_id}' status updated to '{new_status}'."))
    }

    fn reset_store(&self) -> TicketResult<()> {
        let mut guard = self.lock();
        self.commit(&mut guard, StoreState::default())?;
        tracing::info!("ticket store reset");
        Ok(())
    }
}

fn load(path: &Path) -> StoreState {
    let contents = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return StoreState::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ticket store unreadable, starting empty");
            return StoreState::default();
        }
    };

    match serde_json::from_str::<StoreState>(&contents) {
        Ok(state) => state.normalized().unwrap_or_else(|| {
            tracing::warn!(path = %path.display(), "ticket ids out of range, starting empty");
            StoreState::default()
        }),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ticket store corrupted, starting empty");
            StoreState::default()
        }
    }
}

/// Rewrite the whole document. Writes a sibling temp file then renames it
/// over the target.
fn save(path: &Path, state: &StoreState) -> TicketResult<()> {
    let io_err = |e: std::io::Error| TicketError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    let json =
        serde_json::to_string_pretty(state).map_err(|e| TicketError::Serialize(e.to_string()))?;

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, json).map_err(io_err)?;
    std::fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}
