//! Background threads for the two blocking operations: scanning and
//! content loading.
//!
//! Workers get an owned ticket/job, never the [`crate::session::Session`],
//! and report back through a channel drained by the controlling thread.

use crate::content_loader::{AggregationJob, AggregationOutput};
use crate::error::ScanError;
use crate::file_scanner::{self, ScanOptions};
use crate::session::ScanTicket;
use crate::tree_model::TreeModel;
use std::io;
use std::sync::mpsc::Sender;
use std::thread;
use tracing::{debug, error};

#[derive(Debug)]
pub enum WorkerEvent {
    ScanFinished {
        generation: u64,
        result: Result<TreeModel, ScanError>,
    },
    ContentReady(AggregationOutput),
}

/// Fails only when the OS refuses a new thread; nothing will be reported on
/// `tx` in that case.
pub fn spawn_scan(
    ticket: ScanTicket,
    options: ScanOptions,
    tx: Sender<WorkerEvent>,
) -> io::Result<()> {
    thread::Builder::new()
        .name("scan".into())
        .spawn(move || {
            let result = file_scanner::scan_tree(&ticket.root, &options);
            let event = WorkerEvent::ScanFinished {
                generation: ticket.generation,
                result,
            };
            if tx.send(event).is_err() {
                debug!("scan finished after the receiver went away");
            }
        })
        .map(drop)
        .inspect_err(|e| error!("could not start scan thread: {}", e))
}

pub fn spawn_aggregation(job: AggregationJob, tx: Sender<WorkerEvent>) -> io::Result<()> {
    thread::Builder::new()
        .name("content".into())
        .spawn(move || {
            if tx.send(WorkerEvent::ContentReady(job.run())).is_err() {
                debug!("content pass finished after the receiver went away");
            }
        })
        .map(drop)
        .inspect_err(|e| error!("could not start content thread: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ScanOutcome, Session};
    use std::fs::{self, File};
    use std::io::Write;
    use std::sync::mpsc;
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn scan_and_content_round_trip_through_the_channel() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("proj");
        fs::create_dir_all(&root).unwrap();
        File::create(root.join("a.txt")).unwrap().write_all(b"alpha").unwrap();

        let (tx, rx) = mpsc::channel();
        let mut session = Session::new();
        spawn_scan(session.begin_scan(root.clone()), ScanOptions::default(), tx.clone()).unwrap();

        match rx.recv_timeout(Duration::from_secs(10)).unwrap() {
            WorkerEvent::ScanFinished { generation, result } => {
                assert_eq!(
                    session.finish_scan(generation, result),
                    ScanOutcome::Loaded { files: 1 }
                );
            }
            other => panic!("unexpected {:?}", other),
        }

        session.select_all();
        spawn_aggregation(session.begin_aggregation().unwrap(), tx).unwrap();
        match rx.recv_timeout(Duration::from_secs(10)).unwrap() {
            WorkerEvent::ContentReady(output) => {
                assert!(session.finish_aggregation(output).is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(session.document().contains("alpha"));
        assert!(session.cache().contains(&root.join("a.txt")));
    }
}
