use lightwire_core::merge::{HtpFrames, LatestTakesPrecedence, MergeChain, PriorityMap};
use lightwire_core::port::rendezvous;
use lightwire_core::{DmxFrame, ValueSlot};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(2);

#[test]
fn test_latest_registrant_with_value_wins() {
    let chain = MergeChain::<&'static str>::new("ltp", LatestTakesPrecedence).unwrap();
    let merged = chain.output();

    let (p1_tx, p1_rx) = rendezvous();
    let (_p2_tx, p2_rx) = rendezvous();
    let (p3_tx, p3_rx) = rendezvous();
    chain.add_input(p1_rx).unwrap();
    chain.add_input(p2_rx).unwrap();
    chain.add_input(p3_rx).unwrap();

    p1_tx.send("A").unwrap();
    assert_eq!(merged.recv_timeout(TIMEOUT), Ok("A"));

    p3_tx.send("B").unwrap();
    assert_eq!(merged.recv_timeout(TIMEOUT), Ok("B"));
    assert_eq!(chain.value(), Some("B"));

    // Closing P3 removes it; P2 never delivered so P1 takes over
    drop(p3_tx);
    assert_eq!(merged.recv_timeout(TIMEOUT), Ok("A"));
    assert_eq!(chain.value(), Some("A"));
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.available(), 1);
}

#[test]
fn test_all_producers_closed_yields_nothing() {
    let chain = MergeChain::<u8>::new("closed", LatestTakesPrecedence).unwrap();
    let (_id, tx) = chain.open_input().unwrap();
    drop(tx);

    // Removal happens on the node worker
    let deadline = std::time::Instant::now() + TIMEOUT;
    while !chain.is_empty() && std::time::Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert!(chain.is_empty());
    assert_eq!(chain.value(), None);
}

#[test]
fn test_queries_during_churn_do_not_block() {
    let chain = Arc::new(MergeChain::<u32>::new("churn", LatestTakesPrecedence).unwrap());

    let producers: Vec<_> = (0..8)
        .map(|i| {
            let (_, tx) = chain.open_input().unwrap();
            thread::spawn(move || {
                for n in 0..50 {
                    if tx.send(i * 1000 + n).is_err() {
                        break;
                    }
                }
                // tx dropped here: the producer disconnects mid-run
            })
        })
        .collect();

    let reader = {
        let chain = chain.clone();
        thread::spawn(move || {
            for _ in 0..500 {
                let _ = chain.value();
            }
        })
    };

    for p in producers {
        p.join().unwrap();
    }
    reader.join().unwrap();
}

#[test]
fn test_htp_frame_chain() {
    let chain = MergeChain::new("htp", HtpFrames).unwrap();
    let merged = chain.output();
    let (_a, a) = chain.open_input().unwrap();
    let (_b, b) = chain.open_input().unwrap();

    a.send(DmxFrame::from_slice(&[255, 0]).unwrap()).unwrap();
    merged.recv_timeout(TIMEOUT).unwrap();
    b.send(DmxFrame::from_slice(&[0, 128]).unwrap()).unwrap();

    let frame = merged.recv_timeout(TIMEOUT).unwrap();
    assert_eq!(frame.as_slice(), &[255, 128]);
}

#[test]
fn test_priority_map_over_chains() {
    let map = PriorityMap::new(0u8);

    let low = Arc::new(MergeChain::<u8>::new("low", LatestTakesPrecedence).unwrap());
    let low_out = low.output();
    let (_, low_tx) = low.open_input().unwrap();
    low_tx.send(5).unwrap();
    low_out.recv_timeout(TIMEOUT).unwrap();

    let high = Arc::new(ValueSlot::with_value(10u8));

    map.insert(5, low.clone()).unwrap();
    map.insert(10, high).unwrap();
    assert_eq!(map.value(), 10);

    map.remove(10);
    assert_eq!(map.value(), 5);

    map.remove(5);
    assert_eq!(map.value(), 0);
}
