use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::json;

use relay_tenant::TenantId;

use super::*;
use crate::match_filter::MatchFilter;
use crate::modify::ModifyFilter;
use crate::split::SplitFilter;

fn tid() -> TenantId {
    TenantId::new("myorg", "myapp").unwrap()
}

fn match_split_chain() -> FilterChain {
    let matcher =
        MatchFilter::new(tid(), "match", "m", &json!({"pattern": {"foo": "bar"}})).unwrap();
    let splitter = SplitFilter::new(tid(), "split", "s", &json!({"path": ""})).unwrap();
    FilterChain::new(vec![Arc::new(splitter), Arc::new(matcher)])
}

#[tokio::test]
async fn test_empty_chain_passes_through() {
    let chain = FilterChain::empty();
    assert!(chain.is_empty());
    let out = chain.execute(Event::new(tid(), json!({"k": 1}))).await;
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].payload(), &json!({"k": 1}));
}

#[tokio::test]
async fn test_split_then_match_fans_and_drops() {
    let chain = match_split_chain();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.kinds(), vec!["split", "match"]);

    let acked = Arc::new(AtomicUsize::new(0));
    let acked2 = Arc::clone(&acked);
    let event = Event::with_ack(
        tid(),
        json!([{"foo": "bar"}, {"foo": "qux"}, {"foo": "bar"}]),
        Box::new(move || {
            acked2.fetch_add(1, Ordering::SeqCst);
        }),
        Box::new(|_| panic!("unexpected nack")),
    );

    let out = chain.execute(event).await;
    assert_eq!(out.len(), 2);
    for e in &out {
        assert_eq!(e.payload(), &json!({"foo": "bar"}));
    }

    // The dropped middle element was acked by the match filter; the two
    // survivors keep the original open until they terminate.
    assert_eq!(acked.load(Ordering::SeqCst), 0);
    for e in out {
        e.ack();
    }
    assert_eq!(acked.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_chain_short_circuits_on_empty_set() {
    let dropper = MatchFilter::new(tid(), "match", "m", &json!({"pattern": {"never": 1}})).unwrap();
    let modifier =
        ModifyFilter::new(tid(), "modify", "mod", &json!({"path": "a", "toUpper": true})).unwrap();
    let chain = FilterChain::new(vec![Arc::new(dropper), Arc::new(modifier)]);

    let out = chain.execute(Event::new(tid(), json!({"a": "x"}))).await;
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_modify_in_chain_rewrites_survivors() {
    let matcher = MatchFilter::new(tid(), "match", "m", &json!({"pattern": {"a": ".*"}})).unwrap();
    let modifier =
        ModifyFilter::new(tid(), "modify", "mod", &json!({"path": "a", "toUpper": true})).unwrap();
    let chain = FilterChain::new(vec![Arc::new(matcher), Arc::new(modifier)]);

    let out = chain.execute(Event::new(tid(), json!({"a": "hello"}))).await;
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].payload(), &json!({"a": "HELLO"}));
}
