//! One-shot barrier that holds workers until every one has finished

use parking_lot::{Condvar, Mutex};

/// How a party left the rendezvous
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// Every party arrived; results are complete
    Complete,
    /// The coordinator gave up on the rendezvous before everyone arrived
    Forfeited,
}

#[derive(Debug)]
struct State {
    parties: usize,
    arrived: usize,
    complete: bool,
    forfeited: bool,
}

/// Barrier for exactly `parties` arrivals, used once per run
///
/// Unlike `std::sync::Barrier`, the coordinator can forfeit it when it
/// fails to launch every party, so the ones already waiting are released
/// instead of blocking forever.
#[derive(Debug)]
pub struct Rendezvous {
    state: Mutex<State>,
    released: Condvar,
}

impl Rendezvous {
    pub fn new(parties: usize) -> Self {
        Self {
            state: Mutex::new(State {
                parties,
                arrived: 0,
                complete: parties == 0,
                forfeited: false,
            }),
            released: Condvar::new(),
        }
    }

    /// Arrive and block until all parties have arrived or the rendezvous
    /// is forfeited
    pub fn wait(&self) -> Arrival {
        let mut state = self.state.lock();
        debug_assert!(state.arrived < state.parties, "rendezvous is one-shot");
        state.arrived += 1;

        if state.arrived == state.parties && !state.forfeited {
            state.complete = true;
            self.released.notify_all();
            return Arrival::Complete;
        }

        while !state.complete && !state.forfeited {
            self.released.wait(&mut state);
        }

        if state.complete {
            Arrival::Complete
        } else {
            Arrival::Forfeited
        }
    }

    /// Release every waiting party without completing
    ///
    /// Has no effect once the rendezvous has completed.
    pub fn forfeit(&self) {
        let mut state = self.state.lock();
        if !state.complete {
            state.forfeited = true;
            self.released.notify_all();
        }
    }

    pub fn parties(&self) -> usize {
        self.state.lock().parties
    }

    pub fn arrived(&self) -> usize {
        self.state.lock().arrived
    }
}
