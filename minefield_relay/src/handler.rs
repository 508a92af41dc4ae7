// Per-connection handler: the receive → update → snapshot → reply loop.
//
// One handler thread runs per admitted connection. Its lifecycle is
//
//   ADMITTED (registered with the default idle record by the acceptor)
//     → ACTIVE (loop below)
//     → CLOSED (socket shut down, registry entry removed, event emitted)
//
// Each loop iteration blocks on reading exactly one record. A short read,
// EOF, read error, or undecodable record all end the loop the same way. A
// decoded record goes through `SharedState::update_and_snapshot` (restart
// request, seed stamp, registry update and copy in one critical section) and
// the returned snapshot is written back to this connection only, after the
// lock has been released.
//
// This is a pull protocol: a peer only hears about everyone else when it
// sends something itself. Idle peers poll with `CellAction::None` records.

use std::io::BufReader;
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use minefield_protocol::{CodecError, read_record, write_batch};
use tracing::debug;

use crate::event_log::{EventRecorder, RelayEvent};
use crate::registry::ConnectionId;
use crate::shared::SharedState;

/// Everything a handler thread needs, moved into the thread at spawn time.
pub struct ConnectionHandler {
    pub id: ConnectionId,
    pub stream: TcpStream,
    pub state: Arc<SharedState>,
    pub events: EventRecorder,
    pub keep_running: Arc<AtomicBool>,
}

impl ConnectionHandler {
    /// Run the protocol loop until the connection closes, then clean up.
    pub fn run(self) {
        debug!(id = %self.id, seed = self.state.seed(), "handler started");

        match self.stream.try_clone() {
            Ok(read_half) => self.serve(BufReader::new(read_half)),
            Err(e) => debug!(id = %self.id, error = %e, "failed to clone stream"),
        }

        let _ = self.stream.shutdown(Shutdown::Both);
        self.state.remove(self.id);
        self.events.emit(RelayEvent::PeerDisconnected { id: self.id });
    }

    fn serve(&self, mut reader: BufReader<TcpStream>) {
        let mut writer = &self.stream;
        while self.keep_running.load(Ordering::SeqCst) {
            let record = match read_record(&mut reader) {
                Ok(record) => record,
                Err(e) => {
                    log_read_end(self.id, &e);
                    return;
                }
            };

            if record.action.is_action() {
                debug!(
                    id = %self.id,
                    x = record.cursor.x,
                    y = record.cursor.y,
                    action = ?record.action,
                    "tile action"
                );
            }

            let snapshot = self.state.update_and_snapshot(self.id, record);

            if let Err(e) = write_batch(&mut writer, &snapshot) {
                debug!(id = %self.id, error = %e, "reply write failed");
                return;
            }
        }
    }
}

fn log_read_end(id: ConnectionId, err: &CodecError) {
    if err.is_eof() {
        debug!(%id, "peer closed the connection");
    } else {
        debug!(%id, error = %err, "dropping peer after bad read");
    }
}
