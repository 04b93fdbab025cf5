pub mod files;
pub mod migrations;
pub mod password;
pub mod queries;

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Result, anyhow};
use tracing::info;

use rollcall_attendance::Ledger;
use rollcall_types::models::{AttendanceRecord, Event, User};

pub const USERS_FILE: &str = "users.json";
pub const EVENTS_FILE: &str = "events.json";
pub const ATTENDANCE_FILE: &str = "attendance.json";

/// The three collections as held in memory.
///
/// Mutable access goes through the `*_mut` accessors so the store knows
/// which files to rewrite.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    users: Vec<User>,
    events: Vec<Event>,
    attendance: Vec<AttendanceRecord>,
    dirty: Dirty,
}

#[derive(Debug, Clone, Copy, Default)]
struct Dirty {
    users: bool,
    events: bool,
    attendance: bool,
}

impl Dataset {
    pub fn new(users: Vec<User>, events: Vec<Event>, attendance: Vec<AttendanceRecord>) -> Self {
        Self {
            users,
            events,
            attendance,
            dirty: Dirty::default(),
        }
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn attendance(&self) -> &[AttendanceRecord] {
        &self.attendance
    }

    pub fn users_mut(&mut self) -> &mut Vec<User> {
        self.dirty.users = true;
        &mut self.users
    }

    pub fn events_mut(&mut self) -> &mut Vec<Event> {
        self.dirty.events = true;
        &mut self.events
    }

    pub fn attendance_mut(&mut self) -> &mut Vec<AttendanceRecord> {
        self.dirty.attendance = true;
        &mut self.attendance
    }

    /// Run the attendance engine over this dataset. Attendance is only marked
    /// for rewrite when the engine actually changed a record.
    pub fn ledger<F, T, E>(&mut self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Ledger<'_>) -> Result<T, E>,
    {
        let mut ledger = Ledger::new(&self.users, &self.events, &mut self.attendance);
        let result = f(&mut ledger);
        if ledger.changed() {
            self.dirty.attendance = true;
        }
        result
    }
}

/// Flat-file repository: one JSON array file per collection.
///
/// Every mutation holds the lock for its whole duration, so mutations never
/// interleave within the process. Nothing coordinates separate processes.
pub struct Store {
    dir: PathBuf,
    data: Mutex<Dataset>,
}

impl Store {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;

        let dataset = Dataset::new(
            files::load(&dir.join(USERS_FILE))?,
            files::load(&dir.join(EVENTS_FILE))?,
            files::load(&dir.join(ATTENDANCE_FILE))?,
        );
        info!(
            "Loaded {} users, {} events, {} attendance records",
            dataset.users.len(),
            dataset.events.len(),
            dataset.attendance.len()
        );

        let store = Self {
            dir: dir.to_path_buf(),
            data: Mutex::new(dataset),
        };

        migrations::run(&store)?;

        info!("Data store opened at {}", dir.display());
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn read<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Dataset) -> T,
    {
        let data = self.lock()?;
        Ok(f(&data))
    }

    /// Run `f` against a working copy and persist the collections it touched.
    ///
    /// The in-memory state only changes once every touched file has been
    /// rewritten. An error from `f` discards the working copy.
    pub fn write<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Dataset) -> Result<T, E>,
        E: From<anyhow::Error>,
    {
        let mut guard = self.lock()?;
        let mut working = guard.clone();
        working.dirty = Dirty::default();

        let value = f(&mut working)?;

        self.persist(&working)?;
        working.dirty = Dirty::default();
        *guard = working;

        Ok(value)
    }

    fn persist(&self, data: &Dataset) -> Result<()> {
        // Dependents first: a failure part-way never leaves records pointing
        // at an event or user that is already gone from disk.
        if data.dirty.attendance {
            files::save(&self.dir.join(ATTENDANCE_FILE), &data.attendance)?;
        }
        if data.dirty.events {
            files::save(&self.dir.join(EVENTS_FILE), &data.events)?;
        }
        if data.dirty.users {
            files::save(&self.dir.join(USERS_FILE), &data.users)?;
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Dataset>> {
        self.data
            .lock()
            .map_err(|e| anyhow!("Store lock poisoned: {}", e))
    }
}
