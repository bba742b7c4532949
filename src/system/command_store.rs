//! Command Store
//!
//! Holds the most recently requested [`Command`]. The control handler writes
//! it, the actuation loop reads it every poll and the spray sequence resets it
//! once it has finished. The last write always wins; nothing is queued.
//!
//! The slot sits behind a blocking critical-section mutex. Every access is a
//! single copy of a `Copy` value, so no reader can observe a partial update
//! and nobody holds the lock across an `.await`.

use crate::system::command::Command;
use core::cell::Cell;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

/// Process-wide command slot, `Stop` at boot
pub static COMMAND: CommandStore = CommandStore::new();

/// Single-slot command store
pub struct CommandStore {
    slot: Mutex<CriticalSectionRawMutex, Cell<Command>>,
}

impl CommandStore {
    pub const fn new() -> Self {
        Self {
            slot: Mutex::new(Cell::new(Command::Stop)),
        }
    }

    /// Replaces the stored command
    pub fn set(&self, command: Command) {
        self.slot.lock(|slot| slot.set(command));
    }

    /// Reads the stored command
    pub fn get(&self) -> Command {
        self.slot.lock(|slot| slot.get())
    }
}

impl Default for CommandStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    #[test]
    fn test_starts_stopped() {
        let store = CommandStore::new();
        assert_eq!(store.get(), Command::Stop);
    }

    #[test]
    fn test_set_then_get() {
        let store = CommandStore::new();
        store.set(Command::Forward);
        assert_eq!(store.get(), Command::Forward);
    }

    #[test]
    fn test_last_write_wins() {
        let store = CommandStore::new();
        store.set(Command::Forward);
        store.set(Command::TurnLeft);
        store.set(Command::Spray);
        assert_eq!(store.get(), Command::Spray);
    }

    #[test]
    fn test_global_slot_boots_stopped() {
        assert_eq!(COMMAND.get(), Command::Stop);
    }

    #[test]
    fn test_concurrent_writers_leave_a_written_value() {
        let store = Arc::new(CommandStore::new());
        let barrier = Arc::new(Barrier::new(2));

        let writers: Vec<_> = [Command::Forward, Command::Stop]
            .into_iter()
            .map(|command| {
                let store = Arc::clone(&store);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    for _ in 0..1000 {
                        store.set(command);
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.join().unwrap();
        }

        let last = store.get();
        assert!(last == Command::Forward || last == Command::Stop);
    }

    #[test]
    fn test_later_write_in_real_time_wins() {
        let store = Arc::new(CommandStore::new());

        let first = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.set(Command::Forward))
        };
        first.join().unwrap();

        let second = {
            let store = Arc::clone(&store);
            thread::spawn(move || store.set(Command::Stop))
        };
        second.join().unwrap();

        assert_eq!(store.get(), Command::Stop);
    }

    #[test]
    fn test_readers_only_see_written_values() {
        let store = Arc::new(CommandStore::new());
        store.set(Command::Forward);

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 0..2000 {
                    let command = if i % 2 == 0 {
                        Command::TurnLeft
                    } else {
                        Command::TurnRight
                    };
                    store.set(command);
                }
            })
        };

        for _ in 0..2000 {
            let seen = store.get();
            assert!(matches!(
                seen,
                Command::Forward | Command::TurnLeft | Command::TurnRight
            ));
        }
        writer.join().unwrap();
    }
}
