// Path: crates/tx/src/mempool/ordering.rs

use ahash::AHashMap;
use strata_types::app::Transaction;

/// Orders a candidate block so every sender's transactions run in ascending
/// nonce order, returning indices into `txs`.
///
/// Each sender keeps the slots its transactions already occupy; only the
/// contents of those slots are re-sorted, stably. The relative order of
/// different senders is therefore untouched. A transaction repeating the
/// nonce of the sender's previous entry is dropped.
pub fn order_by_sender_nonce(txs: &[Transaction]) -> Vec<usize> {
    let mut slots: AHashMap<&[u8], Vec<usize>> = AHashMap::new();
    for (i, tx) in txs.iter().enumerate() {
        slots.entry(tx.sender.as_slice()).or_default().push(i);
    }

    let mut placed: Vec<usize> = (0..txs.len()).collect();
    for positions in slots.values() {
        let mut sorted = positions.clone();
        sorted.sort_by_key(|&i| txs.get(i).map_or(0, |tx| tx.body.nonce));
        for (slot, idx) in positions.iter().zip(sorted) {
            if let Some(p) = placed.get_mut(*slot) {
                *p = idx;
            }
        }
    }

    let mut last_nonce: AHashMap<&[u8], u64> = AHashMap::new();
    let mut out = Vec::with_capacity(placed.len());
    for idx in placed {
        let Some(tx) = txs.get(idx) else { continue };
        let sender = tx.sender.as_slice();
        if last_nonce.get(sender) == Some(&tx.body.nonce) {
            tracing::debug!(
                target: "mempool",
                sender = %hex::encode(sender),
                nonce = tx.body.nonce,
                "dropping duplicate nonce"
            );
            continue;
        }
        last_nonce.insert(sender, tx.body.nonce);
        out.push(idx);
    }
    out
}
