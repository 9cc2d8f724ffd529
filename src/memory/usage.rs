//! Per-user resident memory measurement

use std::time::Duration;
use sysinfo::{ProcessStatus, System, Users};
use tracing::info;

/// Process states that count toward a user's memory footprint. Zombie and
/// stopped processes are excluded.
fn counts_toward_usage(status: ProcessStatus) -> bool {
    matches!(
        status,
        ProcessStatus::Run
            | ProcessStatus::Sleep
            | ProcessStatus::UninterruptibleDiskSleep
            | ProcessStatus::Waking
            | ProcessStatus::Parked
            | ProcessStatus::Idle
            | ProcessStatus::LockBlocked
    )
}

/// Resolve the name of the user running this process
pub fn current_user() -> String {
    if let Ok(user) = std::env::var("USER") {
        if !user.is_empty() {
            return user;
        }
    }
    let system = System::new_all();
    let users = Users::new_with_refreshed_list();
    sysinfo::get_current_pid()
        .ok()
        .and_then(|pid| system.process(pid))
        .and_then(|process| process.user_id())
        .and_then(|uid| users.get_user_by_id(uid))
        .map(|user| user.name().to_string())
        .unwrap_or_default()
}

/// Sum of resident memory (bytes) over the given user's live processes
pub fn memory_usage(user: &str) -> u64 {
    let mut system = System::new_all();
    system.refresh_all();
    memory_usage_with(&system, &Users::new_with_refreshed_list(), user)
}

/// Like [`memory_usage`] but reusing already-refreshed system state, for
/// callers polling in a loop
pub fn memory_usage_with(system: &System, users: &Users, user: &str) -> u64 {
    system
        .processes()
        .values()
        .filter(|process| counts_toward_usage(process.status()))
        .filter(|process| {
            process
                .user_id()
                .and_then(|uid| users.get_user_by_id(uid))
                .map(|u| u.name() == user)
                .unwrap_or(false)
        })
        .map(|process| process.memory())
        .sum()
}

/// Log the user's memory usage every `interval` until interrupted
pub fn monitor_memory_usage(interval: Duration, user: &str) -> ! {
    let mut system = System::new_all();
    let users = Users::new_with_refreshed_list();
    loop {
        std::thread::sleep(interval);
        system.refresh_all();
        let used = memory_usage_with(&system, &users, user);
        info!(
            "Memory used by {}: {}",
            user,
            humansize::format_size(used, humansize::BINARY)
        );
    }
}
