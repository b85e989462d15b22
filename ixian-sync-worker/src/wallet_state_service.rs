// Copyright (c) 2022 MASSA LABS <info@massa.net>

use std::collections::BTreeSet;

use ixian_ledger_exports::WalletStateStore;
use ixian_models::WalletStateChunk;
use ixian_protocol_exports::{PeerId, PeerTransport};
use ixian_sync_exports::WalletStateHeader;
use ixian_time::IxianTime;
use parking_lot::Mutex;
use tracing::{info, warn};

#[derive(Default)]
struct OutgoingState {
    header: Option<WalletStateHeader>,
    chunks: Vec<WalletStateChunk>,
    requesters: BTreeSet<PeerId>,
    last_chunk_request: IxianTime,
}

/// Serves our wallet state to syncing peers.
///
/// Requesters arriving within the cooldown of the last chunk request share
/// one snapshot, which is dropped once every requester fetched the last chunk.
pub(crate) struct OutgoingWalletStateService {
    state: Mutex<OutgoingState>,
}

impl OutgoingWalletStateService {
    pub fn new() -> Self {
        OutgoingWalletStateService {
            state: Mutex::new(OutgoingState::default()),
        }
    }

    /// Registers `peer` and returns the header of the snapshot it will be served
    pub fn start(
        &self,
        peer: &PeerId,
        wallet_state: &dyn WalletStateStore,
        block_num: u64,
        split: usize,
        cooldown: IxianTime,
        now: IxianTime,
    ) -> WalletStateHeader {
        let mut state = self.state.lock();
        let stale = now.saturating_sub(state.last_chunk_request) > cooldown;
        let shared = state
            .header
            .filter(|_| !state.requesters.is_empty() && !stale);
        let header = match shared {
            Some(header) => header,
            None => {
                state.requesters.clear();
                state.chunks = wallet_state.get_chunks(split, block_num);
                let header = WalletStateHeader {
                    version: wallet_state.version(),
                    block_num,
                    wallet_count: state
                        .chunks
                        .iter()
                        .map(|chunk| chunk.wallets.len() as u64)
                        .sum(),
                };
                state.header = Some(header);
                state.last_chunk_request = now;
                header
            }
        };
        state.requesters.insert(peer.clone());
        info!("started outgoing wallet state sync with {}", peer);
        header
    }

    /// Sends chunk `chunk_num` to `peer`
    pub fn serve_chunk(
        &self,
        chunk_num: u64,
        peer: &PeerId,
        transport: &dyn PeerTransport,
        now: IxianTime,
    ) {
        let mut state = self.state.lock();
        state.last_chunk_request = now;
        let count = state.chunks.len() as u64;
        let Some(chunk) = state.chunks.get(chunk_num as usize) else {
            warn!(
                "{} requested wallet state chunk {}, but only {} are available",
                peer, chunk_num, count
            );
            return;
        };
        transport.send_wallet_state_chunk(peer, chunk);
        if chunk_num + 1 == count {
            state.requesters.remove(peer);
            info!("outgoing wallet state sync with {} finished", peer);
            if state.requesters.is_empty() {
                state.chunks.clear();
                state.header = None;
            }
        }
    }

    /// Number of peers being served
    pub fn requester_count(&self) -> usize {
        self.state.lock().requesters.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ixian_ledger_exports::LedgerConfig;
    use ixian_ledger_worker::WalletState;
    use ixian_models::{Address, Amount};
    use ixian_protocol_exports::MockPeerTransport;
    use ixian_signature::KeyPair;
    use std::sync::{Arc, Mutex as StdMutex};

    fn wallet_state(wallets: usize) -> WalletState {
        let state = WalletState::new(LedgerConfig {
            redacted_window_size: 1000,
            max_saved_states: 2,
        });
        for _ in 0..wallets {
            let address = Address::from_public_key(&KeyPair::generate().get_public_key());
            state.set_balance(&address, Amount::from_raw(1), false);
        }
        state
    }

    #[test]
    fn test_requesters_share_a_snapshot() {
        let service = OutgoingWalletStateService::new();
        let state = wallet_state(5);
        let cooldown = IxianTime::from_secs(150);
        let first = service.start(
            &PeerId::from("a"),
            &state,
            40,
            2,
            cooldown,
            IxianTime::from_secs(1000),
        );
        assert_eq!(first.block_num, 40);
        assert_eq!(first.wallet_count, 5);

        // the second requester gets the same snapshot even though the chain moved
        let second = service.start(
            &PeerId::from("b"),
            &state,
            41,
            2,
            cooldown,
            IxianTime::from_secs(1010),
        );
        assert_eq!(second, first);
        assert_eq!(service.requester_count(), 2);

        // past the cooldown a fresh snapshot is taken
        let third = service.start(
            &PeerId::from("c"),
            &state,
            42,
            2,
            cooldown,
            IxianTime::from_secs(2000),
        );
        assert_eq!(third.block_num, 42);
        assert_eq!(service.requester_count(), 1);
    }

    #[test]
    fn test_snapshot_freed_after_last_chunk() {
        let service = OutgoingWalletStateService::new();
        let state = wallet_state(3);
        let peer = PeerId::from("a");
        let now = IxianTime::from_secs(1000);
        service.start(&peer, &state, 10, 2, IxianTime::from_secs(150), now);

        let sent = Arc::new(StdMutex::new(Vec::new()));
        let mut transport = MockPeerTransport::new();
        let sent_clone = sent.clone();
        transport
            .expect_send_wallet_state_chunk()
            .returning(move |_, chunk| {
                sent_clone.lock().unwrap().push(chunk.chunk_num);
                true
            });

        // out of range requests are ignored
        service.serve_chunk(7, &peer, &transport, now);
        service.serve_chunk(0, &peer, &transport, now);
        assert_eq!(service.requester_count(), 1);
        service.serve_chunk(1, &peer, &transport, now);
        assert_eq!(service.requester_count(), 0);
        assert_eq!(*sent.lock().unwrap(), vec![0, 1]);

        // the snapshot is gone
        service.serve_chunk(0, &peer, &transport, now);
        assert_eq!(sent.lock().unwrap().len(), 2);
    }
}
